//! System and user prompts sent to generation backends.
//!
//! Initial generations use [`GENERATION_SYSTEM_PROMPT`] plus the user's
//! prompt decorated with style and format hints. Refinements replace both:
//! the user prompt is the scoped text from [`build_refinement_prompt`] and
//! the system prompt is [`REFINEMENT_SYSTEM_PROMPT`].

use crate::types::{GenerationRequest, OutputFormat};

/// Default system prompt for a fresh page generation.
pub const GENERATION_SYSTEM_PROMPT: &str = r#"You are an expert HTML/CSS developer.
Given a user's description, generate a complete, self-contained HTML page with embedded CSS.
Output ONLY the raw HTML, no explanations, no markdown, no code fences.
The HTML must include a <style> block inside <head> for all CSS.
Use semantic HTML5 elements, responsive design, and modern CSS."#;

/// System prompt for targeted edits of an existing page.
pub const REFINEMENT_SYSTEM_PROMPT: &str = r#"You are an expert HTML/CSS developer performing a targeted edit.

You will be given:
1. An existing HTML page (with embedded CSS in a <style> block)
2. A user's refinement instruction

Your task:
- Apply ONLY the change described by the instruction.
- Preserve all other elements, styles, and structure exactly as they are.
- Do not rename, remove, or restructure unrelated elements.
- Return the COMPLETE updated HTML document (full page, including unchanged parts).
- Output ONLY the raw HTML, no explanations, no markdown, no code fences."#;

/// Directive appended to initial prompts in Tailwind mode.
pub const TAILWIND_DIRECTIVE: &str = "Use Tailwind CSS utility classes instead of a <style> block.";

/// Build the user message for a scoped refinement.
///
/// Sections are emitted in a fixed order: the existing page, the existing
/// stylesheet (only when it has non-whitespace content), then the
/// instruction, which is always last.
pub fn build_refinement_prompt(
    previous_html: &str,
    previous_css: &str,
    instruction: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("EXISTING PAGE:\n```html\n");
    prompt.push_str(previous_html.trim());
    prompt.push_str("\n```\n");

    let css = previous_css.trim();
    if !css.is_empty() {
        prompt.push_str("\nEXISTING STYLESHEET:\n```css\n");
        prompt.push_str(css);
        prompt.push_str("\n```\n");
    }

    prompt.push_str("\nREFINEMENT INSTRUCTION:\n");
    prompt.push_str(instruction.trim());

    prompt
}

/// User message for a request.
///
/// Refinement prompts are already complete and returned verbatim.
pub fn user_prompt(request: &GenerationRequest) -> String {
    if request.is_refinement() {
        return request.prompt.clone();
    }

    let mut prompt = request.prompt.clone();
    if let Some(hints) = request.style_hints() {
        prompt.push_str("\n\nStyle hints: ");
        prompt.push_str(hints);
    }
    if request.output_format() == OutputFormat::Tailwind {
        prompt.push_str("\n\n");
        prompt.push_str(TAILWIND_DIRECTIVE);
    }
    prompt
}

/// System message for a request: the refinement override or the default.
pub fn system_prompt(request: &GenerationRequest) -> &str {
    request
        .refinement_override()
        .unwrap_or(GENERATION_SYSTEM_PROMPT)
}
