//! Verdict types produced by the rules.

use serde::Serialize;

/// The result of analyzing one command or segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing dangerous was found.
    Allow,
    /// The command must not run.
    Block(BlockInfo),
}

/// Information about why a command was blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    /// Dotted identifier of the rule that matched, e.g. `git.reset.hard`.
    pub rule: String,
    /// Human-readable reason for blocking.
    pub reason: String,
}

impl BlockInfo {
    pub fn new(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

impl Decision {
    /// Create an allow decision.
    pub fn allow() -> Self {
        Decision::Allow
    }

    /// Create a block decision.
    pub fn block(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Decision::Block(BlockInfo::new(rule, reason))
    }

    /// Check if this is a block decision.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Block(_))
    }

    /// Get the block info if blocked.
    pub fn block_info(&self) -> Option<&BlockInfo> {
        match self {
            Decision::Block(info) => Some(info),
            Decision::Allow => None,
        }
    }

    /// The block reason, if any.
    pub fn reason(&self) -> Option<&str> {
        self.block_info().map(|info| info.reason.as_str())
    }

    /// Keep a block, otherwise evaluate the next check.
    pub fn or_else(self, next: impl FnOnce() -> Decision) -> Decision {
        match self {
            Decision::Allow => next(),
            blocked => blocked,
        }
    }
}
