//! Append-only session log.
//!
//! One plain-UTF-8 file per agent, owned explicitly by the agent instance
//! and closed on shutdown. Tasks are delimited by an 80-character rule,
//! iterations by a lesser rule with the chosen model, and every tool
//! invocation is recorded with truncated arguments and the verbatim result.
//! ANSI color codes are stripped from everything written.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;

use codewright::Usage;
use regex::Regex;
use serde_json::Value;

use crate::util::{single_line, timestamp_human, truncate_chars};

const RULE: &str = "================================================================================";
const TASK_RULE: &str = "--------------------------------------------------------------------------------";
const ITER_RULE: &str = "········································";

static ANSI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("static pattern"));

fn strip_ansi(text: &str) -> String {
    ANSI.replace_all(text, "").to_string()
}

pub struct SessionLog {
    file: File,
}

impl SessionLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut log = Self { file };
        log.write(&format!("\n{RULE}\n🚀 NEW SESSION - {}\n{RULE}\n", timestamp_human()));
        Ok(log)
    }

    fn write(&mut self, text: &str) {
        let clean = strip_ansi(text);
        if let Err(e) = self.file.write_all(clean.as_bytes()).and_then(|_| self.file.flush()) {
            log::warn!("session log write failed: {e}");
        }
    }

    pub fn task_start(&mut self, counter: u64, task: &str) {
        self.write(&format!(
            "\n{TASK_RULE}\n📋 TASK #{counter}\n{TASK_RULE}\nTimestamp: {}\nTask: {task}\n{TASK_RULE}\n\n",
            timestamp_human()
        ));
    }

    pub fn iteration(&mut self, iteration: u32, max: u32, model: &str, complex: bool) {
        self.write(&format!(
            "\n{ITER_RULE}\n🔄 ITERATION {iteration}/{max}\nModel: {model} ({})\n{ITER_RULE}\n",
            if complex { "🧠 complex" } else { "⚡ simple" }
        ));
    }

    pub fn tokens(&mut self, usage: &Usage) {
        self.write(&format!(
            "📊 Tokens: prompt {} / completion {} / total {}\n",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        ));
    }

    /// Argument values are truncated to 100 characters each; the result is
    /// recorded verbatim.
    pub fn tool_call(&mut self, ordinal: usize, name: &str, args: &Value, result: &str) {
        let mut entry = format!("🔧 TOOL #{ordinal}: {name}\n");
        if let Value::Object(map) = args {
            for (key, value) in map {
                let rendered = match value {
                    Value::String(s) => single_line(s),
                    other => other.to_string(),
                };
                entry.push_str(&format!("   {key}: {}\n", truncate_chars(&rendered, 100)));
            }
        }
        entry.push_str(&format!("   Result: {result}\n\n"));
        self.write(&entry);
    }

    pub fn note(&mut self, text: &str) {
        self.write(&format!("{text}\n"));
    }

    pub fn final_response(&mut self, response: &str) {
        self.write(&format!(
            "✅ FINAL ASSISTANT RESPONSE:\n{TASK_RULE}\n{response}\n{TASK_RULE}\n\n"
        ));
    }

    pub fn task_summary(
        &mut self,
        counter: u64,
        status: &str,
        iterations: u32,
        tool_calls: usize,
        usage: &Usage,
    ) {
        self.write(&format!(
            "\n{RULE}\n📊 TASK #{counter} SUMMARY\n{RULE}\nStatus: {status}\nIterations: {iterations}\n\
             Tool calls: {tool_calls}\nTokens (prompt): {}\nTokens (completion): {}\nTokens (total): {}\n\
             Time: {}\n{RULE}\n",
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens,
            timestamp_human()
        ));
    }

    /// Explicit shutdown; preferred over relying on drop-time flushing.
    pub fn close(mut self) {
        self.write(&format!("\n{RULE}\n🏁 SESSION END - {}\n{RULE}\n\n", timestamp_human()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn log_is_plain_utf8_with_rules_and_no_ansi() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/agent_session.log");
        let mut log = SessionLog::open(&path).unwrap();
        log.task_start(1, "add a \x1b[31mred\x1b[0m flag");
        log.iteration(1, 30, "gpt-4o-mini", false);
        log.tool_call(1, "read_file", &json!({"path": "a.txt"}), "✓ Contents of a.txt");
        log.close();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(RULE));
        assert!(written.contains("TASK #1"));
        assert!(written.contains("ITERATION 1/30"));
        assert!(written.contains("add a red flag"));
        assert!(!written.contains("\x1b["), "ANSI codes must be stripped");
        assert!(written.contains("SESSION END"));
    }

    #[test]
    fn long_argument_values_are_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.log");
        let mut log = SessionLog::open(&path).unwrap();
        let long = "x".repeat(500);
        log.tool_call(1, "write_file", &json!({"content": long}), "✓ ok");
        log.close();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains(&"x".repeat(150)));
        assert!(written.contains(&"x".repeat(100)));
    }

    #[test]
    fn appends_across_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.log");
        SessionLog::open(&path).unwrap().close();
        SessionLog::open(&path).unwrap().close();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("NEW SESSION").count(), 2);
    }
}
