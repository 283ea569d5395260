//! Hook adapters: agent payload in, deny response out.

mod input;

pub use input::{Agent, HookInput, InputError};

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::{AnalysisContext, analyze_command};
use crate::audit::{AuditRecord, default_log_dir, write_audit_log};
use crate::config::load_config;
use crate::output::{claude_deny, copilot_deny, format_blocked_message, gemini_deny};
use crate::rules::is_temp_value;

const REASON_STRICT_INVALID_JSON: &str = "Failed to parse hook input JSON (strict mode)";

/// macOS per-user temp roots, trusted alongside `/tmp`.
const PLATFORM_TEMP_PREFIXES: &[&str] = &["/var/folders/", "/private/var/folders/", "/private/tmp"];

/// Process-level settings for a hook invocation.
#[derive(Debug, Clone, Default)]
pub struct HookSettings {
    pub strict: bool,
    pub paranoid_rm: bool,
    pub paranoid_interpreters: bool,
    pub home_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub tmpdir_overridden: bool,
    /// Used when the payload carries no cwd.
    pub process_cwd: Option<PathBuf>,
    /// `None` disables audit logging.
    pub audit_dir: Option<PathBuf>,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| {
        matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

/// Whether a `TMPDIR` value points somewhere other than a temp location.
pub fn tmpdir_is_overridden(value: &str) -> bool {
    !(is_temp_value(value, None) || PLATFORM_TEMP_PREFIXES.iter().any(|p| value.starts_with(p)))
}

impl HookSettings {
    /// Read flags and directories from the environment.
    pub fn from_env() -> Self {
        let paranoid = env_flag("SAFETY_NET_PARANOID");
        let tmpdir_overridden = std::env::var("TMPDIR").is_ok_and(|v| tmpdir_is_overridden(&v));
        Self {
            strict: env_flag("SAFETY_NET_STRICT"),
            paranoid_rm: paranoid || env_flag("SAFETY_NET_PARANOID_RM"),
            paranoid_interpreters: paranoid || env_flag("SAFETY_NET_PARANOID_INTERPRETERS"),
            home_dir: dirs::home_dir(),
            temp_dir: (!tmpdir_overridden).then(std::env::temp_dir),
            tmpdir_overridden,
            process_cwd: std::env::current_dir().ok(),
            audit_dir: default_log_dir(),
        }
    }

    fn context(&self, cwd: Option<&Path>) -> AnalysisContext {
        AnalysisContext {
            cwd: cwd.map(Path::to_path_buf),
            home_dir: self.home_dir.clone(),
            temp_dir: self.temp_dir.clone(),
            rules: load_config(cwd),
            strict: self.strict,
            paranoid_rm: self.paranoid_rm,
            paranoid_interpreters: self.paranoid_interpreters,
            tmpdir_overridden: self.tmpdir_overridden,
            ..AnalysisContext::default()
        }
    }
}

/// Handle one hook payload. Returns the JSON to print, or `None` to allow.
pub fn run_hook(agent: Agent, raw: &str, settings: &HookSettings) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }

    let input = match HookInput::parse(agent, raw) {
        Ok(Some(input)) => input,
        Ok(None) => return None,
        Err(InputError::Json(e)) if settings.strict => {
            debug!(error = %e, "invalid hook input in strict mode");
            let message = format_blocked_message(REASON_STRICT_INVALID_JSON, None, None);
            return render(agent, message);
        }
        Err(e) => {
            debug!(error = %e, "ignoring hook input");
            return None;
        }
    };

    let cwd = input
        .cwd
        .as_deref()
        .map(PathBuf::from)
        .or_else(|| settings.process_cwd.clone());
    let ctx = settings.context(cwd.as_deref());

    let result = analyze_command(&input.command, &ctx)?;
    let message =
        format_blocked_message(&result.reason, Some(&input.command), Some(&result.segment));

    let audit_target = (input.session_id.as_deref(), settings.audit_dir.as_deref());
    if let (Some(session_id), Some(dir)) = audit_target {
        let record =
            AuditRecord::new(&input.command, &result.segment, &result.reason, cwd.as_deref());
        if let Err(e) = write_audit_log(dir, session_id, &record) {
            warn!(error = %e, "failed to write audit log");
        }
    }

    render(agent, message)
}

fn render(agent: Agent, message: String) -> Option<String> {
    match agent {
        Agent::ClaudeCode => to_json(&claude_deny(message)),
        Agent::GeminiCli => to_json(&gemini_deny(message)),
        Agent::CopilotCli => to_json(&copilot_deny(message)),
    }
}

fn to_json<T: Serialize>(response: &T) -> Option<String> {
    serde_json::to_string(response)
        .inspect_err(|e| warn!(error = %e, "failed to serialize hook response"))
        .ok()
}
