//! Response formatting for hook output.

use serde::Serialize;

use super::redaction::redact_secrets;

const MAX_EXCERPT_LEN: usize = 200;

const ADVICE: &str =
    "If this operation is truly needed, ask the user for explicit permission and have them run the command manually.";

/// Message shown to the agent when a command is denied.
pub fn format_blocked_message(
    reason: &str,
    command: Option<&str>,
    segment: Option<&str>,
) -> String {
    let mut msg = format!("BLOCKED by Safety Net\n\nReason: {reason}");

    if let Some(command) = command {
        msg.push_str(&format!("\n\nCommand: {}", excerpt(command, MAX_EXCERPT_LEN)));
    }
    if let Some(segment) = segment.filter(|s| command.is_none_or(|c| c.trim() != s.trim())) {
        msg.push_str(&format!("\n\nSegment: {}", excerpt(segment, MAX_EXCERPT_LEN)));
    }

    msg.push_str("\n\n");
    msg.push_str(ADVICE);
    msg
}

/// Redact, then cut to `max_chars` characters with a trailing `...`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let redacted = redact_secrets(text.trim());
    if redacted.chars().count() <= max_chars {
        return redacted;
    }
    let kept: String = redacted.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Claude Code PreToolUse response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaudeResponse {
    pub hook_specific_output: HookSpecificOutput,
}

/// The hook-specific output for PreToolUse hooks.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    /// Must be "PreToolUse" for this hook type.
    pub hook_event_name: &'static str,
    pub permission_decision: &'static str,
    /// Message shown to the agent.
    pub permission_decision_reason: String,
}

/// Gemini CLI BeforeTool response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    pub decision: &'static str,
    pub reason: String,
    pub system_message: String,
}

/// Copilot CLI preToolUse response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopilotResponse {
    pub permission_decision: &'static str,
    pub permission_decision_reason: String,
}

pub fn claude_deny(message: String) -> ClaudeResponse {
    ClaudeResponse {
        hook_specific_output: HookSpecificOutput {
            hook_event_name: "PreToolUse",
            permission_decision: "deny",
            permission_decision_reason: message,
        },
    }
}

pub fn gemini_deny(message: String) -> GeminiResponse {
    GeminiResponse {
        decision: "deny",
        reason: message.clone(),
        system_message: message,
    }
}

pub fn copilot_deny(message: String) -> CopilotResponse {
    CopilotResponse {
        permission_decision: "deny",
        permission_decision_reason: message,
    }
}
