//! Hook protocol tests for each supported agent.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd(mode: &str, home: &TempDir) -> assert_cmd::Command {
    let project = home.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let mut cmd = cargo_bin_cmd!("cc-safety-net");
    cmd.arg(mode)
        .env("HOME", home.path())
        .env("SAFETY_NET_USER_CONFIG", home.path().join("nonexistent.json"))
        .env_remove("SAFETY_NET_STRICT")
        .env_remove("SAFETY_NET_PARANOID")
        .env_remove("SAFETY_NET_PARANOID_RM")
        .env_remove("SAFETY_NET_PARANOID_INTERPRETERS")
        .current_dir(project);
    cmd
}

fn parse(stdout: &[u8]) -> serde_json::Value {
    serde_json::from_slice(stdout).unwrap()
}

mod claude_code {
    use super::*;

    #[test]
    fn deny_shape() {
        let home = TempDir::new().unwrap();
        let output = cmd("--claude-code", &home)
            .write_stdin(r#"{"tool_name":"Bash","tool_input":{"command":"git stash drop"}}"#)
            .output()
            .unwrap();
        assert!(output.status.success());

        let json = parse(&output.stdout);
        let out = &json["hookSpecificOutput"];
        assert_eq!(out["hookEventName"], "PreToolUse");
        assert_eq!(out["permissionDecision"], "deny");
        let reason = out["permissionDecisionReason"].as_str().unwrap();
        assert!(reason.starts_with("BLOCKED by Safety Net\n\nReason: git stash drop"));
        assert!(reason.ends_with("have them run the command manually."));
    }

    #[test]
    fn allow_is_silent() {
        let home = TempDir::new().unwrap();
        cmd("--claude-code", &home)
            .write_stdin(r#"{"tool_name":"Bash","tool_input":{"command":"git log --oneline"}}"#)
            .assert()
            .code(0)
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn missing_command_is_silent() {
        let home = TempDir::new().unwrap();
        cmd("--claude-code", &home)
            .write_stdin(r#"{"tool_name":"Bash","tool_input":{}}"#)
            .assert()
            .code(0)
            .stdout(predicate::str::is_empty());
    }
}

mod gemini_cli {
    use super::*;

    #[test]
    fn deny_shape() {
        let home = TempDir::new().unwrap();
        let input = r#"{"hook_event_name":"BeforeTool","tool_name":"run_shell_command","tool_input":{"command":"rm -rf ~"}}"#;
        let output = cmd("--gemini-cli", &home).write_stdin(input).output().unwrap();
        assert!(output.status.success());

        let json = parse(&output.stdout);
        assert_eq!(json["decision"], "deny");
        assert!(json["reason"].as_str().unwrap().contains("extremely dangerous"));
        assert_eq!(json["reason"], json["systemMessage"]);
    }

    #[test]
    fn other_events_ignored() {
        let home = TempDir::new().unwrap();
        let input = r#"{"hook_event_name":"AfterTool","tool_name":"run_shell_command","tool_input":{"command":"rm -rf ~"}}"#;
        cmd("--gemini-cli", &home)
            .write_stdin(input)
            .assert()
            .code(0)
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn other_tools_ignored() {
        let home = TempDir::new().unwrap();
        let input = r#"{"hook_event_name":"BeforeTool","tool_name":"write_file","tool_input":{"command":"rm -rf ~"}}"#;
        cmd("--gemini-cli", &home)
            .write_stdin(input)
            .assert()
            .code(0)
            .stdout(predicate::str::is_empty());
    }
}

mod copilot_cli {
    use super::*;

    #[test]
    fn deny_shape_camel_case() {
        let home = TempDir::new().unwrap();
        let input = r#"{"hookEventName":"preToolUse","toolInput":{"command":"git push -f origin main"}}"#;
        let output = cmd("--copilot-cli", &home).write_stdin(input).output().unwrap();
        assert!(output.status.success());

        let json = parse(&output.stdout);
        assert_eq!(json["permissionDecision"], "deny");
        assert!(json["permissionDecisionReason"]
            .as_str()
            .unwrap()
            .contains("Force push"));
    }

    #[test]
    fn snake_case_fields() {
        let home = TempDir::new().unwrap();
        let input = r#"{"hook_event_name":"PreToolUse","tool_input":{"command":"git clean -f"}}"#;
        cmd("--copilot-cli", &home)
            .write_stdin(input)
            .assert()
            .code(0)
            .stdout(predicate::str::contains("\"permissionDecision\":\"deny\""));
    }

    #[test]
    fn bare_command_field() {
        let home = TempDir::new().unwrap();
        cmd("--copilot-cli", &home)
            .write_stdin(r#"{"command":"find . -delete"}"#)
            .assert()
            .code(0)
            .stdout(predicate::str::contains("deny"));
    }

    #[test]
    fn other_events_ignored() {
        let home = TempDir::new().unwrap();
        cmd("--copilot-cli", &home)
            .write_stdin(r#"{"eventName":"postToolUse","command":"git clean -f"}"#)
            .assert()
            .code(0)
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn session_id_writes_audit_log() {
        let home = TempDir::new().unwrap();
        let input = r#"{"hookEventName":"preToolUse","sessionId":"cp-1","toolInput":{"command":"git reset --hard"}}"#;
        cmd("--copilot-cli", &home).write_stdin(input).assert().code(0);

        let log = home.path().join(".cc-safety-net/logs/cp-1.jsonl");
        let content = std::fs::read_to_string(log).unwrap();
        let first_line = content.lines().next().unwrap();
        let entry: serde_json::Value = serde_json::from_str(first_line).unwrap();
        assert_eq!(entry["segment"], "git reset --hard");
    }
}
