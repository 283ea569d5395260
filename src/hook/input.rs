//! Input parsing for agent hook invocations.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when parsing hook input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// The agent whose hook protocol is spoken on stdin/stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    ClaudeCode,
    GeminiCli,
    CopilotCli,
}

/// A shell command an agent is about to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInput {
    pub agent: Agent,
    pub command: String,
    pub cwd: Option<String>,
    pub session_id: Option<String>,
}

const COPILOT_EVENT_FIELDS: &[&[&str]] = &[
    &["hookEventName"],
    &["hook_event_name"],
    &["eventName"],
    &["event_name"],
];
const COPILOT_COMMAND_FIELDS: &[&[&str]] = &[
    &["toolInput", "command"],
    &["tool_input", "command"],
    &["command"],
];
const COPILOT_SESSION_FIELDS: &[&[&str]] = &[&["sessionId"], &["session_id"]];

/// First string found at any of the field paths, in order.
fn first_str(value: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        path.iter()
            .try_fold(value, |v, key| v.get(*key))
            .and_then(Value::as_str)
            .map(String::from)
    })
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    first_str(value, &[&[key]])
}

impl HookInput {
    /// Parse a hook payload.
    ///
    /// Returns `Ok(None)` for payloads about other tools or events.
    pub fn parse(agent: Agent, json: &str) -> Result<Option<Self>, InputError> {
        let value: Value = serde_json::from_str(json)?;
        match agent {
            Agent::ClaudeCode => Self::parse_claude(&value),
            Agent::GeminiCli => Self::parse_gemini(&value),
            Agent::CopilotCli => Self::parse_copilot(&value),
        }
    }

    fn parse_claude(value: &Value) -> Result<Option<Self>, InputError> {
        if str_field(value, "tool_name").as_deref() != Some("Bash") {
            return Ok(None);
        }
        let command = first_str(value, &[&["tool_input", "command"]])
            .ok_or(InputError::MissingField("tool_input.command"))?;
        Ok(Some(Self {
            agent: Agent::ClaudeCode,
            command,
            cwd: str_field(value, "cwd"),
            session_id: str_field(value, "session_id"),
        }))
    }

    fn parse_gemini(value: &Value) -> Result<Option<Self>, InputError> {
        if str_field(value, "hook_event_name").as_deref() != Some("BeforeTool")
            || str_field(value, "tool_name").as_deref() != Some("run_shell_command")
        {
            return Ok(None);
        }
        let command = first_str(value, &[&["tool_input", "command"]])
            .ok_or(InputError::MissingField("tool_input.command"))?;
        Ok(Some(Self {
            agent: Agent::GeminiCli,
            command,
            cwd: str_field(value, "cwd"),
            session_id: str_field(value, "session_id"),
        }))
    }

    fn parse_copilot(value: &Value) -> Result<Option<Self>, InputError> {
        if let Some(event) = first_str(value, COPILOT_EVENT_FIELDS) {
            if !event.eq_ignore_ascii_case("preToolUse") {
                return Ok(None);
            }
        }
        let command = first_str(value, COPILOT_COMMAND_FIELDS)
            .ok_or(InputError::MissingField("toolInput.command"))?;
        Ok(Some(Self {
            agent: Agent::CopilotCli,
            command,
            cwd: str_field(value, "cwd"),
            session_id: first_str(value, COPILOT_SESSION_FIELDS),
        }))
    }
}
