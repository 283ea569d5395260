//! Audit logging for denied commands.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::user_state_dir;
use crate::output::{excerpt, redact_secrets};

const MAX_SESSION_ID_LEN: usize = 128;
const MAX_LOGGED_COMMAND_LEN: usize = 300;

/// One line of a session's audit log.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub ts: DateTime<Utc>,
    /// Redacted and truncated.
    pub command: String,
    /// Redacted and truncated.
    pub segment: String,
    /// Redacted; custom rule reasons are free text.
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl AuditRecord {
    pub fn new(command: &str, segment: &str, reason: &str, cwd: Option<&Path>) -> Self {
        Self {
            ts: Utc::now(),
            command: excerpt(command, MAX_LOGGED_COMMAND_LEN),
            segment: excerpt(segment, MAX_LOGGED_COMMAND_LEN),
            reason: redact_secrets(reason),
            cwd: cwd.map(|p| redact_secrets(&p.display().to_string())),
        }
    }
}

/// Make a session id safe to use as a file name.
///
/// Ids containing path separators or `..` are rejected outright.
pub fn sanitize_session_id(session_id: &str) -> Option<String> {
    let raw = session_id.trim();
    if raw.is_empty() || raw.contains(['/', '\\']) || raw.contains("..") {
        return None;
    }

    let mapped: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = mapped.trim_matches(|c| matches!(c, '.' | '_' | '-'));
    let capped: String = trimmed.chars().take(MAX_SESSION_ID_LEN).collect();

    (!capped.is_empty()).then_some(capped)
}

/// `~/.cc-safety-net/logs`.
pub fn default_log_dir() -> Option<PathBuf> {
    user_state_dir().map(|dir| dir.join("logs"))
}

/// Append a record to `<log_dir>/<session>.jsonl`.
pub fn write_audit_log(log_dir: &Path, session_id: &str, record: &AuditRecord) -> io::Result<()> {
    let session = sanitize_session_id(session_id).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "unusable session id")
    })?;

    fs::create_dir_all(log_dir)?;
    let path = log_dir.join(format!("{session}.jsonl"));
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(record)?;
    writeln!(file, "{json}")?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_session_id() {
        assert_eq!(sanitize_session_id("abc-123").as_deref(), Some("abc-123"));
        assert_eq!(sanitize_session_id("a b:c").as_deref(), Some("a_b_c"));
        assert_eq!(sanitize_session_id("..hidden").as_deref(), None);
        assert_eq!(sanitize_session_id("a/b").as_deref(), None);
        assert_eq!(sanitize_session_id("a\\b").as_deref(), None);
        assert_eq!(sanitize_session_id("").as_deref(), None);
        assert_eq!(sanitize_session_id("-._").as_deref(), None);
        assert_eq!(sanitize_session_id("_x_").as_deref(), Some("x"));
        let long = "a".repeat(500);
        assert_eq!(sanitize_session_id(&long).unwrap().len(), MAX_SESSION_ID_LEN);
    }

    #[test]
    fn test_record_redacts_and_truncates() {
        let command = format!("API_KEY=supersecret rm -rf / {}", "x".repeat(400));
        let record = AuditRecord::new(&command, "rm -rf /", "reason", None);
        assert!(!record.command.contains("supersecret"));
        assert_eq!(record.command.chars().count(), MAX_LOGGED_COMMAND_LEN);
    }

    #[test]
    fn test_record_redacts_reason() {
        let reason = "[no-deploy] ask ops, token=abc123def456 is theirs";
        let record = AuditRecord::new("deploy", "deploy", reason, None);
        assert!(!record.reason.contains("abc123def456"));
        assert!(record.reason.starts_with("[no-deploy] ask ops"));
    }

    #[test]
    fn test_write_audit_log_appends() {
        let dir = TempDir::new().unwrap();
        let record =
            AuditRecord::new("git reset --hard", "git reset --hard", "nope", Some(dir.path()));

        write_audit_log(dir.path(), "session-1", &record).unwrap();
        write_audit_log(dir.path(), "session-1", &record).unwrap();

        let content = std::fs::read_to_string(dir.path().join("session-1.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["command"], "git reset --hard");
        assert_eq!(parsed["reason"], "nope");
        assert!(parsed["ts"].is_string());
    }

    #[test]
    fn test_write_audit_log_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let record = AuditRecord::new("ls", "ls", "r", None);
        assert!(write_audit_log(dir.path(), "../escape", &record).is_err());
    }
}
