//! Per-call model selection.
//!
//! Rules, in priority order: a one-shot force-complex flag (armed by the
//! deadlock detector), cognitive stub tools, per-tool overrides, the
//! complexity tag, then the simple endpoint. Routing beyond the force flag
//! only happens in multi-model mode.

use codewright::{ModelEndpoint, ToolCall};

use crate::config::ModelProviderConfig;
use crate::tools::builtins::COGNITIVE_TOOL_NAMES;
use crate::tools::registry::ToolRegistry;
use crate::tools::Complexity;

pub struct ModelRouter {
    provider: ModelProviderConfig,
    use_multi_model: bool,
    force_complex: bool,
}

impl ModelRouter {
    pub fn new(provider: ModelProviderConfig, use_multi_model: bool) -> Self {
        Self {
            provider,
            use_multi_model,
            force_complex: false,
        }
    }

    pub fn provider_config(&self) -> &ModelProviderConfig {
        &self.provider
    }

    /// Arm the one-shot flag: the next call uses the complex endpoint
    /// regardless of tool mix.
    pub fn force_complex_next(&mut self) {
        self.force_complex = true;
    }

    pub fn complex_endpoint(&self) -> &ModelEndpoint {
        &self.provider.complex
    }

    /// Pick the endpoint for the next LLM call based on the previous turn's
    /// tool calls (empty on turn 1). Consumes the force-complex flag.
    pub fn choose(&mut self, previous_calls: &[ToolCall], registry: &ToolRegistry) -> ModelEndpoint {
        if self.force_complex {
            self.force_complex = false;
            return self.provider.complex.clone();
        }

        if !self.use_multi_model {
            return self.provider.simple.clone();
        }

        if previous_calls
            .iter()
            .any(|c| COGNITIVE_TOOL_NAMES.contains(&c.function.name.as_str()))
        {
            return self.provider.complex.clone();
        }

        // First override match wins when several tools map to different
        // endpoints in the same turn.
        for call in previous_calls {
            if let Some(endpoint) = self.provider.tool_overrides.get(&call.function.name) {
                return endpoint.clone();
            }
        }

        if previous_calls
            .iter()
            .any(|c| registry.complexity_of(&c.function.name) == Some(Complexity::Complex))
        {
            return self.provider.complex.clone();
        }

        self.provider.simple.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtins::all_builtin_tools;
    use codewright::ToolCall;

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for tool in all_builtin_tools() {
            registry.register(tool).unwrap();
        }
        registry
    }

    fn provider() -> ModelProviderConfig {
        ModelProviderConfig::from_model_names("m-simple", "m-complex")
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::function("c1", name, "{}")
    }

    #[test]
    fn first_turn_uses_simple_endpoint() {
        let mut router = ModelRouter::new(provider(), true);
        assert_eq!(router.choose(&[], &registry()).model, "m-simple");
    }

    #[test]
    fn simple_tools_stay_on_simple_endpoint() {
        let mut router = ModelRouter::new(provider(), true);
        let calls = vec![call("list_files"), call("read_file")];
        assert_eq!(router.choose(&calls, &registry()).model, "m-simple");
    }

    #[test]
    fn cognitive_tool_routes_to_complex() {
        let mut router = ModelRouter::new(provider(), true);
        let calls = vec![call("list_files"), call("analyze_error")];
        assert_eq!(router.choose(&calls, &registry()).model, "m-complex");
    }

    #[test]
    fn tool_override_beats_complexity_tag() {
        let mut config = provider();
        config
            .tool_overrides
            .insert("edit_lines".to_string(), ModelEndpoint::new("m-override"));
        let mut router = ModelRouter::new(config, true);
        let calls = vec![call("edit_lines")];
        assert_eq!(router.choose(&calls, &registry()).model, "m-override");
    }

    #[test]
    fn first_override_match_wins() {
        let mut config = provider();
        config
            .tool_overrides
            .insert("read_file".to_string(), ModelEndpoint::new("m-a"));
        config
            .tool_overrides
            .insert("list_files".to_string(), ModelEndpoint::new("m-b"));
        let mut router = ModelRouter::new(config, true);
        let calls = vec![call("list_files"), call("read_file")];
        assert_eq!(router.choose(&calls, &registry()).model, "m-b");
    }

    #[test]
    fn force_complex_is_one_shot_and_beats_everything() {
        let mut router = ModelRouter::new(provider(), true);
        router.force_complex_next();
        let calls = vec![call("list_files")];
        assert_eq!(router.choose(&calls, &registry()).model, "m-complex");
        // Flag cleared: same calls now route simple again.
        assert_eq!(router.choose(&calls, &registry()).model, "m-simple");
    }

    #[test]
    fn single_model_mode_ignores_complexity_routing() {
        let mut router = ModelRouter::new(provider(), false);
        let calls = vec![call("analyze_error")];
        assert_eq!(router.choose(&calls, &registry()).model, "m-simple");
        // The force flag still applies even in single-model mode.
        router.force_complex_next();
        assert_eq!(router.choose(&calls, &registry()).model, "m-complex");
    }
}
