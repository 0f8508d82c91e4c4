//! The agent execution engine.
//!
//! `execute_task` drives the full pipeline: git session bootstrap, an
//! optional planning call, the ReAct execution loop with deadlock detection
//! and auto-replan, an optional validation verdict, and the end-of-task git
//! review. Execution is strictly sequential; tool calls inside one turn run
//! in the exact order the model supplied them.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use codewright::provider::ChatProvider;
use codewright::{ChatMessage, LLMError, ModelEndpoint, ToolCall, Usage};
use serde_json::Value;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::logging::SessionLog;
use crate::router::ModelRouter;
use crate::tools::builtins::all_builtin_tools;
use crate::tools::registry::ToolRegistry;
use crate::tools::context::ToolCtx;
use crate::util::{single_line, timestamp_human, truncate_chars};

/// How many recorded actions feed the validator.
const VALIDATOR_ACTION_WINDOW: usize = 20;

/// How many recent actions a replan message quotes.
const REPLAN_ACTION_WINDOW: usize = 5;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a code-editing assistant working inside a single workspace directory.

Operating rules:
1. ALWAYS read a file (read_file) before modifying it. Understand the patterns \
it uses (framework, style, structure) and follow them.
2. write_file only CREATES files. It blocks when the target exists with \
different content; modify existing files with the editing tools instead.
3. To ADD code use insert_lines (it never removes anything). To MODIFY \
existing text use search_replace. To REPLACE a line range use edit_lines, \
which REMOVES the range first. Never confuse insert_lines with edit_lines.
4. For a full rewrite of an existing file use update_file, or \
force_write_file with a clear reason.
5. Prefer complete blocks over line-by-line edits. Plan multi-step changes \
before executing them; apply_edits batches several ranged edits safely.
6. Validate after editing: re-read the file or run the project's checks with \
run_command. Stop and fix problems before stacking more edits on top.
7. Shell commands must terminate quickly. Servers and other long-running \
processes must use the nohup background form with a PID file, and are \
stopped with stop_background_process.
8. When a tool reports a block or an error you do not understand, use \
analyze_error or replan_approach instead of retrying the same call.
9. Use git_checkpoint before risky changes and git_rollback to recover.

Paths are relative to the workspace. Explain your reasoning before acting, \
execute the plan, then verify the result.";

const PLANNING_SYSTEM_PROMPT: &str = "\
You are the planning stage of a code-editing agent. Before any tool is used, \
produce a concrete plan for the task: the objective in one sentence, the \
ordered steps (which files to inspect, create, or modify, and with which \
editing operation), the risks or conflicts to check for, and the success \
criteria. Do not call tools and do not write the code yet; reply with the \
plan only.";

const EXECUTE_INSTRUCTION: &str = "\
Proceed with the plan now, step by step. Verify each step's result before \
moving to the next, and adjust the plan if a step fails.";

const VALIDATOR_SYSTEM_PROMPT: &str = "\
You are a strict reviewer of a code-editing agent's work. Given the original \
task, the actions the agent performed, and its final response, judge whether \
the task was accomplished. Answer with a verdict line reading exactly one of: \
VERDICT: passed, VERDICT: failed, or VERDICT: partial, followed by your \
reasoning. Be skeptical: claims without a matching action are not evidence.";

/// Markers in a tool result that identify a policy rejection rather than an
/// ordinary error. Any of these arms the auto-replan path.
const BLOCKING_MARKERS: [&str; 5] = [
    "🚫 BLOCK:",
    "already exists with different content",
    "action blocked",
    "replan required",
    "may hang the process",
];

pub fn has_blocking_marker(result: &str) -> bool {
    let lower = result.to_lowercase();
    BLOCKING_MARKERS.iter().any(|m| lower.contains(&m.to_lowercase()))
}

/// Validator verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
    Partial,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub verdict: Verdict,
    pub reasoning: String,
}

pub fn parse_verdict(reply: &str) -> Verdict {
    let lower = reply.to_lowercase();
    // Look at the verdict line first; fall back to scanning the whole reply.
    let scope = lower
        .lines()
        .find(|l| l.contains("verdict"))
        .map(str::to_string)
        .unwrap_or(lower);
    if scope.contains("partial") {
        Verdict::Partial
    } else if scope.contains("fail") {
        Verdict::Failed
    } else if scope.contains("pass") {
        Verdict::Passed
    } else {
        Verdict::Partial
    }
}

/// Options for one `execute_task` invocation.
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Replaces the default system directive when set.
    pub system_prompt: Option<String>,
    /// Per-task iteration cap; wins over the configured value.
    pub max_iterations: Option<u32>,
    pub skip_planning: bool,
    pub skip_validation: bool,
}

/// Result of one task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub success: bool,
    pub response: String,
    pub iterations: u32,
    pub actions_count: usize,
    pub validation: Option<ValidationReport>,
    pub git_review: Option<String>,
    pub usage: Usage,
}

/// Digest of a completed task, retained for the life of the process.
#[derive(Debug, Clone)]
pub struct TaskSummary {
    pub id: u64,
    pub task: String,
    pub iterations: u32,
    pub tool_calls: usize,
    /// Model chosen for each LLM call, in order.
    pub model_trace: Vec<String>,
    pub response: String,
    pub success: bool,
    pub timestamp: String,
}

/// Consecutive-repeat and blocking-marker detection.
///
/// A verbatim repeat of the previous call, or any blocking marker in a tool
/// result, arms auto-replan: the caller forces the complex model and injects
/// a synthesized steering message. A clean result clears the block counter.
#[derive(Default)]
struct LoopGuard {
    last_signature: Option<String>,
    block_count: u32,
}

impl LoopGuard {
    fn observe(&mut self, call: &ToolCall, result: &str, actions: &[String]) -> Option<String> {
        let signature = format!("{}:{}", call.function.name, canonical_args(&call.function.arguments));
        let repeated = self.last_signature.as_deref() == Some(signature.as_str());
        let blocked = has_blocking_marker(result);

        if !repeated && !blocked {
            self.last_signature = Some(signature);
            self.block_count = 0;
            return None;
        }

        self.block_count += 1;
        self.last_signature = None;

        let recent: Vec<&str> = actions
            .iter()
            .rev()
            .take(REPLAN_ACTION_WINDOW)
            .map(String::as_str)
            .collect();
        let recent = recent.into_iter().rev().collect::<Vec<_>>().join("\n");

        let cause = if repeated && blocked {
            "was repeated verbatim and hit a policy block"
        } else if repeated {
            "was just repeated with identical arguments"
        } else {
            "hit a policy block"
        };

        Some(format!(
            "⚠️ The call to '{tool}' {cause} (block #{count} in this task). Tool result:\n{result}\n\n\
             Recent actions:\n{recent}\n\n\
             Do NOT repeat the same call with the same arguments. Change the approach:\n\
             - read_file the target first, then modify it with edit_lines or search_replace\n\
             - insert_lines adds content without replacing anything\n\
             - ensure_lines appends missing lines idempotently\n\
             - update_file or force_write_file (with a reason) rewrite a file deliberately\n\
             Pick the applicable tool and continue with a corrected plan.",
            tool = call.function.name,
            count = self.block_count,
        ))
    }
}

/// Sorted-key re-serialization so the repeat signature is insensitive to
/// argument ordering.
fn canonical_args(raw: &str) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by_key(|(k, _)| k.as_str());
                let mut out = serde_json::Map::new();
                for (k, v) in entries {
                    out.insert(k.clone(), sort(v));
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => sort(&value).to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

type ProviderFactory =
    Box<dyn Fn(&ModelEndpoint) -> Result<Arc<dyn ChatProvider>, LLMError> + Send + Sync>;

pub struct Agent {
    config: AgentConfig,
    registry: ToolRegistry,
    ctx: ToolCtx,
    router: ModelRouter,
    session_log: Option<SessionLog>,
    factory: ProviderFactory,
    providers: HashMap<String, Arc<dyn ChatProvider>>,
    git_bootstrapped: bool,
    task_counter: u64,
    summaries: Vec<TaskSummary>,
    transcripts: VecDeque<Vec<ChatMessage>>,
}

impl Agent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let factory: ProviderFactory = Box::new(|endpoint: &ModelEndpoint| {
            endpoint
                .resolve()
                .map(|p| Arc::new(p) as Arc<dyn ChatProvider>)
        });
        Self::with_provider_factory(config, factory)
    }

    /// Construction with a custom provider factory; the seam the scenario
    /// tests use to substitute a scripted model.
    pub fn with_provider_factory(config: AgentConfig, factory: ProviderFactory) -> Result<Self, AgentError> {
        let ctx = ToolCtx::new(&config.workspace)?;
        let mut registry = ToolRegistry::new();
        for tool in all_builtin_tools() {
            registry.register(tool)?;
        }
        let router = ModelRouter::new(config.provider.clone(), config.use_multi_model);
        let session_log = match &config.log_file {
            Some(path) => Some(SessionLog::open(path)?),
            None => None,
        };

        Ok(Self {
            config,
            registry,
            ctx,
            router,
            session_log,
            factory,
            providers: HashMap::new(),
            git_bootstrapped: false,
            task_counter: 0,
            summaries: Vec::new(),
            transcripts: VecDeque::new(),
        })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn summaries(&self) -> &[TaskSummary] {
        &self.summaries
    }

    /// Full transcripts of the most recent tasks (bounded by
    /// `max_history_tasks`).
    pub fn recent_transcripts(&self) -> &VecDeque<Vec<ChatMessage>> {
        &self.transcripts
    }

    /// Close the session log. Prefer calling this over relying on drop.
    pub fn shutdown(mut self) {
        if let Some(log) = self.session_log.take() {
            log.close();
        }
    }

    fn provider_for(&mut self, endpoint: &ModelEndpoint) -> Result<Arc<dyn ChatProvider>, LLMError> {
        let key = format!("{}|{}", endpoint.model, endpoint.base_url.as_deref().unwrap_or(""));
        if let Some(provider) = self.providers.get(&key) {
            return Ok(provider.clone());
        }
        let provider = (self.factory)(endpoint)?;
        self.providers.insert(key, provider.clone());
        Ok(provider)
    }

    /// Run one task through the full plan/execute/validate pipeline.
    pub async fn execute_task(&mut self, task: &str, opts: TaskOptions) -> TaskOutcome {
        self.task_counter += 1;
        let task_id = self.task_counter;
        let max_iterations = opts
            .max_iterations
            .unwrap_or(self.config.max_iterations)
            .clamp(1, crate::config::MAX_ITERATIONS_CEILING);

        if let Some(log) = &mut self.session_log {
            log.task_start(task_id, task);
        }
        if self.config.verbose {
            log::info!("task #{task_id}: {}", truncate_chars(task, 120));
        }

        // Phase 1: git session bootstrap, once per process.
        if !self.git_bootstrapped {
            self.git_bootstrapped = true;
            match self.ctx.git.bootstrap_for_task(task).await {
                Ok(Some(branch)) => {
                    log::info!("working on session branch {branch}");
                    if let Some(log) = &mut self.session_log {
                        log.note(&format!("🌿 Session branch: {branch}"));
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("git session bootstrap skipped: {e}"),
            }
        }

        let mut system_prompt = opts
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        system_prompt.push_str(&format!("\n\nWorkspace: {}", self.config.workspace.display()));
        if let Some(history) = self.history_context() {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(&history);
        }

        let mut transcript = vec![ChatMessage::system(system_prompt), ChatMessage::user(task)];

        // Phase 2: single-shot planning on the complex endpoint, tools
        // disabled. Failure is non-fatal.
        if self.config.use_multi_model && !opts.skip_planning {
            match self.plan(task).await {
                Ok(plan) if !plan.trim().is_empty() => {
                    if let Some(log) = &mut self.session_log {
                        log.note(&format!("📝 Plan:\n{plan}"));
                    }
                    transcript.push(ChatMessage::assistant(plan));
                    transcript.push(ChatMessage::user(EXECUTE_INSTRUCTION));
                }
                Ok(_) => {}
                Err(e) => log::warn!("planning call failed, executing unplanned: {e}"),
            }
        }

        // Phase 3: the execution loop.
        let mut guard = LoopGuard::default();
        let mut actions: Vec<String> = Vec::new();
        let mut model_trace: Vec<String> = Vec::new();
        let mut usage = Usage::default();
        let mut last_calls: Vec<ToolCall> = Vec::new();
        let mut iterations: u32 = 0;
        let mut total_tool_calls = 0usize;
        let mut final_response: Option<String> = None;

        while iterations < max_iterations {
            iterations += 1;
            let endpoint = self.router.choose(&last_calls, &self.registry);
            let is_complex = endpoint.model == self.config.provider.complex.model;
            model_trace.push(endpoint.model.clone());
            if let Some(log) = &mut self.session_log {
                log.iteration(iterations, max_iterations, &endpoint.model, is_complex);
            }

            let provider = match self.provider_for(&endpoint) {
                Ok(provider) => provider,
                Err(e) => {
                    return self.finish(
                        task, task_id, false,
                        format!("cannot reach model endpoint '{}': {e}", endpoint.model),
                        iterations, total_tool_calls, model_trace, actions, usage,
                        None, transcript,
                    ).await;
                }
            };

            let schemas = self.registry.definitions();
            let turn = match provider.chat_with_tools(&transcript, Some(&schemas)).await {
                Ok(turn) => turn,
                Err(e) => {
                    // Transport errors abort the task; nothing is retried.
                    log::error!("transport failure on task #{task_id}: {e}");
                    return self.finish(
                        task, task_id, false,
                        format!("execution error: {e}"),
                        iterations, total_tool_calls, model_trace, actions, usage,
                        None, transcript,
                    ).await;
                }
            };

            if let Some(turn_usage) = turn.usage {
                usage.add(turn_usage);
                if let Some(log) = &mut self.session_log {
                    log.tokens(&turn_usage);
                }
            }

            transcript.push(turn.to_message());

            if !turn.has_tool_calls() {
                final_response = Some(turn.content.clone());
                break;
            }

            for call in &turn.tool_calls {
                total_tool_calls += 1;
                if self.config.verbose {
                    log::info!("🔧 {}({})", call.function.name, truncate_chars(&single_line(&call.function.arguments), 80));
                }

                let result = self.registry.dispatch(call, &self.ctx).await;

                actions.push(format!(
                    "[{}] {} → {}",
                    call.function.name,
                    truncate_chars(&single_line(&call.function.arguments), 100),
                    truncate_chars(&single_line(&result), 100),
                ));
                if let Some(log) = &mut self.session_log {
                    let args: Value = serde_json::from_str(&call.function.arguments)
                        .unwrap_or(Value::Null);
                    log.tool_call(total_tool_calls, &call.function.name, &args, &result);
                }

                transcript.push(ChatMessage::tool(call.id.clone(), result.clone()));

                if let Some(replan) = guard.observe(call, &result, &actions) {
                    log::warn!("auto-replan armed after '{}'", call.function.name);
                    self.router.force_complex_next();
                    if let Some(log) = &mut self.session_log {
                        log.note("🔁 Auto-replan triggered; next call forced to the complex model.");
                    }
                    transcript.push(ChatMessage::user(replan));
                }
            }

            last_calls = turn.tool_calls;
        }

        match final_response {
            Some(response) => {
                // Phase 4: validation verdict, advisory only.
                let validation = if self.config.use_multi_model && !opts.skip_validation {
                    self.validate(task, &actions, &response).await
                } else {
                    None
                };
                self.finish(
                    task, task_id, true, response, iterations, total_tool_calls,
                    model_trace, actions, usage, validation, transcript,
                ).await
            }
            None => {
                self.finish(
                    task, task_id, false, "iteration limit reached".to_string(),
                    iterations, total_tool_calls, model_trace, actions, usage,
                    None, transcript,
                ).await
            }
        }
    }

    async fn plan(&mut self, task: &str) -> Result<String, AgentError> {
        let endpoint = self.router.complex_endpoint().clone();
        let provider = self.provider_for(&endpoint)?;
        let transcript = vec![
            ChatMessage::system(PLANNING_SYSTEM_PROMPT),
            ChatMessage::user(task),
        ];
        let turn = provider.chat(&transcript).await?;
        Ok(turn.content)
    }

    async fn validate(&mut self, task: &str, actions: &[String], response: &str) -> Option<ValidationReport> {
        let endpoint = self.router.complex_endpoint().clone();
        let provider = match self.provider_for(&endpoint) {
            Ok(provider) => provider,
            Err(e) => {
                log::warn!("validator endpoint unavailable: {e}");
                return None;
            }
        };

        let start = actions.len().saturating_sub(VALIDATOR_ACTION_WINDOW);
        let recent = actions[start..].join("\n");
        let transcript = vec![
            ChatMessage::system(VALIDATOR_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Task:\n{task}\n\nActions performed ({} most recent):\n{recent}\n\n\
                 Agent's final response:\n{response}",
                actions.len().min(VALIDATOR_ACTION_WINDOW)
            )),
        ];

        match provider.chat(&transcript).await {
            Ok(turn) => Some(ValidationReport {
                verdict: parse_verdict(&turn.content),
                reasoning: turn.content,
            }),
            Err(e) => {
                log::warn!("validation call failed: {e}");
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &mut self,
        task: &str,
        task_id: u64,
        success: bool,
        response: String,
        iterations: u32,
        tool_calls: usize,
        model_trace: Vec<String>,
        actions: Vec<String>,
        usage: Usage,
        validation: Option<ValidationReport>,
        transcript: Vec<ChatMessage>,
    ) -> TaskOutcome {
        // Phase 5: git review appendix.
        let git_review = if self.ctx.git.is_repo().await {
            self.ctx.git.review().await.ok()
        } else {
            None
        };

        self.summaries.push(TaskSummary {
            id: task_id,
            task: truncate_chars(task, 200),
            iterations,
            tool_calls,
            model_trace,
            response: truncate_chars(&response, 200),
            success,
            timestamp: timestamp_human(),
        });

        self.transcripts.push_back(transcript);
        while self.transcripts.len() > self.config.max_history_tasks {
            self.transcripts.pop_front();
        }

        if let Some(log) = &mut self.session_log {
            if success {
                log.final_response(&response);
            }
            let status = if success { "✅ COMPLETED" } else { "⚠️ INCOMPLETE" };
            log.task_summary(task_id, status, iterations, tool_calls, &usage);
        }

        TaskOutcome {
            success,
            response,
            iterations,
            actions_count: actions.len(),
            validation,
            git_review,
            usage,
        }
    }

    /// Compact digests of earlier tasks, injected into the system prompt so
    /// follow-up tasks do not redo finished work.
    fn history_context(&self) -> Option<String> {
        if self.summaries.is_empty() {
            return None;
        }
        let mut out = String::from("Previous tasks in this session:\n");
        for summary in self.summaries.iter().rev().take(10).collect::<Vec<_>>().into_iter().rev() {
            out.push_str(&format!(
                "#{} [{}] {} → {}\n",
                summary.id,
                if summary.success { "done" } else { "incomplete" },
                truncate_chars(&summary.task, 80),
                truncate_chars(&single_line(&summary.response), 120),
            ));
        }
        out.push_str("Use this history for context and avoid repeating completed actions.");
        Some(out)
    }
}
