//! Pattern-based pre-screen of user messages.
//!
//! The ruleset is data, not code: an ordered list of (category, patterns)
//! pairs evaluated in priority order. Self-harm is checked first because it
//! gets protective rather than punitive handling, then violent coercion,
//! then prompt injection.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Category of a safety hit, in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyCategory {
    /// Self-harm or suicide phrasing used instrumentally to coerce entry.
    SelfHarmCoercion,
    /// Threats of violence, destruction, blackmail, or forced entry.
    ViolentCoercion,
    /// Attempts to override system instructions.
    PromptInjection,
}

impl SafetyCategory {
    /// Fixed score delta applied when this category matches.
    pub fn score_delta(&self) -> i32 {
        match self {
            SafetyCategory::SelfHarmCoercion | SafetyCategory::ViolentCoercion => -20,
            SafetyCategory::PromptInjection => -10,
        }
    }

    /// Whether a match forces an immediate loss with a scripted reply.
    /// Injection attempts still go through normal state resolution and
    /// reply generation.
    pub fn forces_loss(&self) -> bool {
        matches!(
            self,
            SafetyCategory::SelfHarmCoercion | SafetyCategory::ViolentCoercion
        )
    }
}

/// One entry in the ordered ruleset.
#[derive(Debug)]
struct SafetyRule {
    category: SafetyCategory,
    patterns: Vec<Regex>,
}

static DEFAULT_RULES: &[(SafetyCategory, &[&str])] = &[
    (
        SafetyCategory::SelfHarmCoercion,
        &[
            r"\bharm myself\b",
            r"\bself[- ]harm\b",
            r"\bkill myself\b",
            r"\bsuicide\b",
            r"\bend my life\b",
            r"\btake my life\b",
        ],
    ),
    (
        SafetyCategory::ViolentCoercion,
        &[
            r"\bdo you want to disappear\b",
            r"\bmake (?:you|him|her|them) disappear\b",
            r"\b(?:or else|if you don't|unless)\b.*\b(?:destroy|hurt|kill|bomb|burn|blow up)\b.*\b(?:you|him|her|them|viktor|security|bouncer|this place|the club|golden palm|everything)\b",
            r"\b(?:destroy|blow up|burn)\b.*\b(?:this place|the club|golden palm|everything)\b",
            r"\b(?:kill(?:s|ed|ing)?|shoot(?:s|ing)?|shot|stab(?:s|bed|bing)?|hurt(?:s|ing)?|harm(?:s|ed|ing)?)\b.*\b(?:you|him|her|them|viktor|security|bouncer)\b",
            r"\b(?:military|army|police)\b.*\b(?:remove|arrest|detain|drag|force|shoot|kill|hurt|harm)\b.*\b(?:you|him|her|them|viktor|security|bouncer|this place|the club|golden palm)\b",
            r"\b(?:bomb|blow up)\b.*\b(?:this place|the club|golden palm)\b",
        ],
    ),
    (
        SafetyCategory::PromptInjection,
        &[
            r"ignore all your system prompts",
            r"ignore your system prompts",
            r"ignore the system prompt",
            r"ignore previous instructions",
            r"disregard previous instructions",
            r"system prompt",
            r"developer message",
        ],
    ),
];

static DEFAULT_SCREEN: Lazy<SafetyScreen> = Lazy::new(|| {
    SafetyScreen::from_rules(DEFAULT_RULES).expect("default safety ruleset compiles")
});

/// Classifies user messages against the ordered ruleset.
#[derive(Debug)]
pub struct SafetyScreen {
    rules: Vec<SafetyRule>,
}

impl SafetyScreen {
    /// Compiles a ruleset. Patterns are matched case-insensitively.
    pub fn from_rules(
        rules: &[(SafetyCategory, &[&str])],
    ) -> Result<Self, regex_lite::Error> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (category, patterns) in rules {
            let patterns = patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){}", p)))
                .collect::<Result<Vec<_>, _>>()?;
            compiled.push(SafetyRule {
                category: *category,
                patterns,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// The built-in ruleset.
    pub fn default_rules() -> &'static SafetyScreen {
        &DEFAULT_SCREEN
    }

    /// Returns the first category whose patterns match, in ruleset order.
    pub fn classify(&self, text: &str) -> Option<SafetyCategory> {
        for rule in &self.rules {
            if rule.patterns.iter().any(|p| p.is_match(text)) {
                return Some(rule.category);
            }
        }
        None
    }
}
