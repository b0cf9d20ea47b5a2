//! Builds (and caches) agent graphs per resolved model.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::graph::AgentGraph;
use crate::error::Result;
use crate::models::ResolvedModel;

/// Produces the agent graph that serves a resolved model.
pub trait AgentFactory: Send + Sync {
    fn graph_for(&self, model: &ResolvedModel) -> Result<Arc<dyn AgentGraph>>;
}

/// Memoizes another factory's graphs by [`ResolvedModel::cache_key`].
///
/// Failed builds are not cached, so a later turn retries.
pub struct CachedAgentFactory<F> {
    inner: F,
    graphs: Mutex<HashMap<String, Arc<dyn AgentGraph>>>,
}

impl<F: AgentFactory> CachedAgentFactory<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            graphs: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached(&self) -> usize {
        self.graphs.lock().len()
    }
}

impl<F: AgentFactory> AgentFactory for CachedAgentFactory<F> {
    fn graph_for(&self, model: &ResolvedModel) -> Result<Arc<dyn AgentGraph>> {
        let key = model.cache_key();
        if let Some(graph) = self.graphs.lock().get(&key) {
            return Ok(graph.clone());
        }
        let graph = self.inner.graph_for(model)?;
        tracing::debug!(key = %key, "built agent graph");
        Ok(self.graphs.lock().entry(key).or_insert(graph).clone())
    }
}

#[cfg(feature = "openai")]
pub use openai::OpenAiAgentFactory;

#[cfg(feature = "openai")]
mod openai {
    use std::sync::Arc;

    use super::{AgentFactory, AgentGraph};
    use crate::agent_loop::ToolLoop;
    use crate::config::RuntimeConfig;
    use crate::error::Result;
    use crate::models::ResolvedModel;
    use crate::provider::OpenAiChatModel;
    use crate::tools::{AskHumanTool, ToolRegistry};

    /// OpenAI chat model plus the built-in tools, looped.
    #[derive(Debug, Clone)]
    pub struct OpenAiAgentFactory {
        config: RuntimeConfig,
    }

    impl OpenAiAgentFactory {
        pub fn new(config: RuntimeConfig) -> Self {
            Self { config }
        }
    }

    impl AgentFactory for OpenAiAgentFactory {
        fn graph_for(&self, model: &ResolvedModel) -> Result<Arc<dyn AgentGraph>> {
            let api_key = self.config.require_openai_api_key()?;
            let chat = OpenAiChatModel::new(
                model.model_id.clone(),
                api_key,
                Some(self.config.openai_base_url.clone()),
            );
            let tools = ToolRegistry::new().with(Arc::new(AskHumanTool::new()));
            let graph = ToolLoop::new(Arc::new(chat), tools)
                .with_system_prompt(self.config.system_prompt.clone())
                .with_reasoning(model.reasoning)
                .with_max_iterations(self.config.max_tool_iterations);
            Ok(Arc::new(graph))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::agent_loop::GraphStream;
    use crate::error::TurnkitError;
    use crate::transport::Transport;
    use crate::types::ModelMessage;

    struct Empty;

    impl AgentGraph for Empty {
        fn stream(&self, _: Vec<ModelMessage>, _: Arc<dyn Transport>) -> GraphStream {
            Box::pin(futures::stream::empty())
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl AgentFactory for Counting {
        fn graph_for(&self, model: &ResolvedModel) -> Result<Arc<dyn AgentGraph>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if model.model_id == "broken" {
                return Err(TurnkitError::Configuration("no key".into()));
            }
            Ok(Arc::new(Empty))
        }
    }

    fn resolved(id: &str) -> ResolvedModel {
        ResolvedModel {
            model_id: id.into(),
            reasoning: None,
        }
    }

    #[test]
    fn reuses_graph_per_cache_key() {
        let factory = CachedAgentFactory::new(Counting::default());
        factory.graph_for(&resolved("a")).unwrap();
        factory.graph_for(&resolved("a")).unwrap();
        factory.graph_for(&resolved("b")).unwrap();
        assert_eq!(factory.inner.0.load(Ordering::SeqCst), 2);
        assert_eq!(factory.cached(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let factory = CachedAgentFactory::new(Counting::default());
        assert!(factory.graph_for(&resolved("broken")).is_err());
        assert!(factory.graph_for(&resolved("broken")).is_err());
        assert_eq!(factory.inner.0.load(Ordering::SeqCst), 2);
        assert_eq!(factory.cached(), 0);
    }

    #[cfg(feature = "openai")]
    #[test]
    fn openai_factory_requires_api_key() {
        let config = crate::config::RuntimeConfig::builder().build();
        let err = match OpenAiAgentFactory::new(config).graph_for(&resolved("gpt-5-nano")) {
            Err(err) => err,
            Ok(_) => panic!("expected configuration error"),
        };
        assert!(matches!(err, TurnkitError::Configuration(_)));
    }
}
