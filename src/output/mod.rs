//! Output formatting and response generation.

mod redaction;
mod response;

pub use redaction::redact_secrets;
pub use response::{
    ClaudeResponse, CopilotResponse, GeminiResponse, HookSpecificOutput, claude_deny, copilot_deny,
    excerpt, format_blocked_message, gemini_deny,
};
