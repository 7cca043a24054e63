//! Prompt moderation.
//!
//! Every prompt passes through a [`ContentModerator`] before any backend
//! sees it. The shipped [`DenylistModerator`] is a literal substring check;
//! a statistical or remote classifier can replace it by implementing the
//! same trait.

/// Reason reported for a blank prompt.
pub const REASON_EMPTY: &str = "prompt must not be empty";

/// Reason reported when a prompt matches the denylist. The matched term is
/// never revealed.
pub const REASON_DISALLOWED: &str = "prompt contains disallowed content";

/// Minimum prompt length in characters.
pub const MIN_PROMPT_CHARS: usize = 10;

/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Terms that reject a prompt when found in any letter case.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "exploit",
    "hack",
    "malware",
    "phishing",
    "ransomware",
    "ddos",
    "rootkit",
    "spyware",
    "trojan",
    "keylogger",
    "porn",
    "xxx",
    "nude",
    "nsfw",
];

/// Outcome of a moderation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the prompt may proceed
    pub allowed: bool,

    /// Human-readable reason, set only when denied
    pub reason: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

/// Anything that can judge a prompt.
///
/// Implementations must be stateless per call: the gateway shares one
/// instance across all concurrent requests.
pub trait ContentModerator: Send + Sync {
    /// Judge a prompt.
    fn check(&self, prompt: &str) -> Decision;
}

/// Length limits and denylist used by [`DenylistModerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationPolicy {
    pub min_chars: usize,
    pub max_chars: usize,
    pub denylist: Vec<String>,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            min_chars: MIN_PROMPT_CHARS,
            max_chars: MAX_PROMPT_CHARS,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Placeholder moderator: length bounds plus a case-insensitive denylist.
///
/// Checks run in a fixed order and the first failing check decides, so
/// exactly one reason is ever reported.
#[derive(Debug, Clone)]
pub struct DenylistModerator {
    min_chars: usize,
    max_chars: usize,
    // lowercased once at construction
    denylist: Vec<String>,
}

impl DenylistModerator {
    pub fn new(policy: ModerationPolicy) -> Self {
        let denylist = policy
            .denylist
            .into_iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();

        Self {
            min_chars: policy.min_chars,
            max_chars: policy.max_chars,
            denylist,
        }
    }

    /// Number of denylist terms in effect.
    pub fn denylist_len(&self) -> usize {
        self.denylist.len()
    }
}

impl Default for DenylistModerator {
    fn default() -> Self {
        Self::new(ModerationPolicy::default())
    }
}

impl ContentModerator for DenylistModerator {
    fn check(&self, prompt: &str) -> Decision {
        if prompt.trim().is_empty() {
            return Decision::deny(REASON_EMPTY);
        }

        // Untrimmed length, counted in characters.
        let len = prompt.chars().count();
        if len < self.min_chars {
            return Decision::deny(format!(
                "prompt too short — minimum {} characters",
                self.min_chars
            ));
        }
        if len > self.max_chars {
            return Decision::deny(format!(
                "prompt too long — maximum {} characters",
                self.max_chars
            ));
        }

        let lower = prompt.to_lowercase();
        if self.denylist.iter().any(|term| lower.contains(term.as_str())) {
            return Decision::deny(REASON_DISALLOWED);
        }

        Decision::allow()
    }
}
