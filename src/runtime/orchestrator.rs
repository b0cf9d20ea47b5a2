//! Turn orchestrator: session registry, serialized turns, human-input
//! handshake, and the observer-facing event and log feeds.

use std::collections::HashMap;
use std::sync::Arc;

use bon::Builder;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::hub::{EventHub, Subscription};
use super::logs::{LogBuffer, LogEntry, LogScope};
use super::queue::SerialQueue;
use super::session::{RunStatus, Session, Step, Turn};
use super::turn::{TurnContext, TurnTransport};
use crate::agent_loop::AgentFactory;
use crate::config::RuntimeConfig;
use crate::engine::{Engine, EngineOutcome};
use crate::error::{Result, TurnkitError};
use crate::events::{HumanInputStatus, RuntimeEvent, RuntimeEventKind, SessionId, StreamEnvelope};
use crate::models::{ReasoningOverride, ResolvedModel, SupportedModel, SUPPORTED_MODELS};
use crate::store::{MemorySessionStore, SessionStore};
use crate::transport::{InputSlot, Transport};
use crate::types::ModelMessage;

/// Default number of events or log entries returned by a read.
pub const DEFAULT_READ_LIMIT: usize = 200;
/// Upper bound on a single read.
pub const MAX_READ_LIMIT: usize = 1000;

/// Normalize a caller-supplied read limit into `[1, MAX_READ_LIMIT]`.
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_READ_LIMIT).clamp(1, MAX_READ_LIMIT)
}

/// A request to run one turn.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTurn {
    #[builder(into)]
    pub session_id: String,
    #[builder(into)]
    pub input: String,
    /// Requested model; unknown ids fall back to the configured default.
    #[builder(into)]
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub reasoning: Option<ReasoningOverride>,
    /// Caller correlation id; generated when absent.
    #[builder(into)]
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Returned as soon as a turn is queued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TurnReceipt {
    pub queued: bool,
    pub session_id: SessionId,
    pub turn_id: String,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumanInputReceipt {
    pub accepted: bool,
    pub delivered: bool,
}

impl HumanInputReceipt {
    fn rejected() -> Self {
        Self {
            accepted: false,
            delivered: false,
        }
    }
}

struct TurnJob {
    turn_id: String,
    request_id: String,
    input: String,
    model_id: Option<String>,
    reasoning: Option<ReasoningOverride>,
}

/// Everything the orchestrator keeps per session.
pub(crate) struct SessionRuntime {
    id: SessionId,
    state: Mutex<Session>,
    hub: Arc<EventHub>,
    logs: Arc<LogBuffer>,
    input: InputSlot,
    queue: SerialQueue,
}

impl SessionRuntime {
    fn new(session: Session, config: &RuntimeConfig) -> Self {
        let id = session.id.clone();
        Self {
            hub: EventHub::resume(id.clone(), config.backlog_capacity, session.last_seq),
            logs: Arc::new(LogBuffer::new(id.clone(), config.log_capacity)),
            input: InputSlot::new(),
            queue: SerialQueue::spawn(format!("session:{id}")),
            state: Mutex::new(session),
            id,
        }
    }

    pub(crate) fn publish(&self, ctx: &TurnContext, kind: RuntimeEventKind) -> StreamEnvelope {
        self.hub.publish(RuntimeEvent {
            session_id: self.id.clone(),
            turn_id: ctx.turn_id.clone(),
            request_id: ctx.request_id.clone(),
            timestamp: Utc::now(),
            kind,
        })
    }

    /// Mutate the turn `ctx` points at; `None` if it is gone.
    pub(crate) fn with_turn<R>(&self, ctx: &TurnContext, f: impl FnOnce(&mut Turn) -> R) -> Option<R> {
        let mut session = self.state.lock();
        let result = session.turn_mut(&ctx.turn_id).map(f);
        session.touch();
        result
    }

    pub(crate) fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub(crate) fn input(&self) -> &InputSlot {
        &self.input
    }

    fn running_turn(&self) -> Option<TurnContext> {
        let session = self.state.lock();
        let turn = session.turns.iter().rev().find(|t| t.is_running())?;
        Some(TurnContext {
            turn_id: turn.id.clone(),
            request_id: turn.request_id.clone(),
            step_id: turn
                .steps
                .last()
                .map(|s| s.id.clone())
                .unwrap_or_else(|| format!("{}:step:1", turn.id)),
        })
    }

    fn is_idle(&self) -> bool {
        self.queue.pending() == 0 && !self.input.is_pending()
    }
}

struct Inner {
    config: RuntimeConfig,
    factory: Arc<dyn AgentFactory>,
    store: Arc<dyn SessionStore>,
    sessions: Mutex<HashMap<SessionId, Arc<SessionRuntime>>>,
}

/// Owns every session and runs their turns.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Orchestrator with an in-memory session store.
    pub fn new(config: RuntimeConfig, factory: Arc<dyn AgentFactory>) -> Self {
        Self::with_store(config, factory, Arc::new(MemorySessionStore::new()))
    }

    pub fn with_store(
        config: RuntimeConfig,
        factory: Arc<dyn AgentFactory>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                factory,
                store,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Orchestrator backed by the OpenAI tool loop, graphs cached per model.
    #[cfg(feature = "openai")]
    pub fn openai(config: RuntimeConfig) -> Self {
        let factory = crate::agent_loop::CachedAgentFactory::new(
            crate::agent_loop::OpenAiAgentFactory::new(config.clone()),
        );
        Self::new(config, Arc::new(factory))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// The catalog of models a turn may request.
    pub fn models(&self) -> &'static [SupportedModel] {
        SUPPORTED_MODELS
    }

    /// Queue a turn. Returns once queued, not once run.
    pub async fn submit_turn(&self, request: SubmitTurn) -> Result<TurnReceipt> {
        let session_id = request.session_id.trim();
        if session_id.is_empty() {
            return Err(TurnkitError::InvalidArgument("sessionId is required".into()));
        }
        let input = request.input.trim();
        if input.is_empty() {
            return Err(TurnkitError::InvalidArgument("input is required".into()));
        }

        let job = TurnJob {
            turn_id: Uuid::new_v4().to_string(),
            request_id: request
                .request_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            input: input.to_string(),
            model_id: request.model_id,
            reasoning: request.reasoning.and_then(ReasoningOverride::non_empty),
        };
        let receipt = TurnReceipt {
            queued: true,
            session_id: session_id.to_string(),
            turn_id: job.turn_id.clone(),
            request_id: job.request_id.clone(),
        };
        let scope = LogScope::turn(job.turn_id.clone(), job.request_id.clone());
        let inner = self.inner.clone();

        self.with_runtime(session_id, move |runtime| {
            runtime.logs.info(
                "turn.queued",
                &scope,
                json!({ "inputLength": job.input.chars().count(), "ahead": runtime.queue.pending() }),
            );
            let worker_runtime = runtime.clone();
            runtime.queue.enqueue(async move {
                if let Err(err) = inner.run_turn(&worker_runtime, job).await {
                    worker_runtime.logs.error(
                        "turn.queue.error",
                        &scope,
                        json!({ "error": err.to_string() }),
                    );
                }
            })
        })
        .await?;
        Ok(receipt)
    }

    /// Answer the session's pending human-input request.
    ///
    /// With nothing pending this is a no-op returning
    /// `{ accepted: false, delivered: false }`.
    pub async fn submit_human_input(
        &self,
        session_id: &str,
        input: &str,
    ) -> Result<HumanInputReceipt> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TurnkitError::InvalidArgument("input is required".into()));
        }
        let Some(runtime) = self.existing(session_id) else {
            return Ok(HumanInputReceipt::rejected());
        };
        let Some(responder) = runtime.input.take() else {
            return Ok(HumanInputReceipt::rejected());
        };

        if let Some(ctx) = runtime.running_turn() {
            runtime.publish(
                &ctx,
                RuntimeEventKind::Status {
                    status: HumanInputStatus::Received,
                },
            );
            runtime.logs.info(
                "human_input.received",
                &ctx.scope(),
                json!({ "inputLength": input.chars().count() }),
            );
        }
        let delivered = responder.respond(input);
        Ok(HumanInputReceipt {
            accepted: true,
            delivered,
        })
    }

    /// Snapshot of a session (created empty if unknown).
    pub async fn session(&self, session_id: &str) -> Result<Session> {
        let runtime = self.runtime(session_id).await?;
        let session = runtime.state.lock().clone();
        Ok(session)
    }

    /// The most recent envelopes, oldest first.
    pub async fn events(&self, session_id: &str, limit: Option<usize>) -> Result<Vec<StreamEnvelope>> {
        let runtime = self.runtime(session_id).await?;
        Ok(runtime.hub.recent(clamp_limit(limit)))
    }

    /// The most recent log entries, oldest first.
    pub async fn logs(&self, session_id: &str, limit: Option<usize>) -> Result<Vec<LogEntry>> {
        let runtime = self.runtime(session_id).await?;
        Ok(runtime.logs.recent(clamp_limit(limit)))
    }

    /// Live feed of envelopes published from now on.
    pub async fn stream(&self, session_id: &str) -> Result<Subscription> {
        let (_, subscription) = self
            .with_runtime(session_id, |runtime| Ok(Self::attach(runtime, 0)))
            .await?;
        Ok(subscription)
    }

    /// Backlog snapshot plus a live feed that continues exactly after it.
    pub async fn subscribe(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<(Vec<StreamEnvelope>, Subscription)> {
        let limit = clamp_limit(limit);
        self.with_runtime(session_id, |runtime| Ok(Self::attach(runtime, limit)))
            .await
    }

    /// Forget an idle session's in-memory runtime.
    ///
    /// Refused (returns `false`) while a turn is queued, running, or waiting
    /// for input. The session store keeps its last saved state.
    pub fn evict_session(&self, session_id: &str) -> bool {
        let mut sessions = self.inner.sessions.lock();
        let idle = match sessions.get(session_id) {
            Some(runtime) => runtime.is_idle(),
            None => return false,
        };
        if !idle {
            return false;
        }
        if let Some(runtime) = sessions.remove(session_id) {
            runtime.hub.close();
            tracing::info!(session_id, "session evicted");
        }
        true
    }

    /// Ids of sessions currently held in memory.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.inner.sessions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn attach(runtime: &Arc<SessionRuntime>, limit: usize) -> (Vec<StreamEnvelope>, Subscription) {
        let logs = runtime.logs.clone();
        let (snapshot, subscription) = runtime.hub.subscribe_with(
            limit,
            Some(Box::new(move |listeners| {
                logs.info(
                    "sse.disconnected",
                    &LogScope::default(),
                    json!({ "listeners": listeners }),
                );
            })),
        );
        runtime.logs.info(
            "sse.connected",
            &LogScope::default(),
            json!({ "listeners": runtime.hub.listener_count(), "replayed": snapshot.len() }),
        );
        (snapshot, subscription)
    }

    fn existing(&self, session_id: &str) -> Option<Arc<SessionRuntime>> {
        self.inner.sessions.lock().get(session_id).cloned()
    }

    /// Run `f` on the session's runtime while holding the session map lock,
    /// so `evict_session` cannot drop the runtime between lookup and use.
    /// `f` must not touch the session map.
    async fn with_runtime<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&Arc<SessionRuntime>) -> Result<R>,
    ) -> Result<R> {
        loop {
            {
                let sessions = self.inner.sessions.lock();
                if let Some(runtime) = sessions.get(session_id) {
                    return f(runtime);
                }
            }
            self.runtime(session_id).await?;
        }
    }

    /// Get or lazily create a session runtime, rehydrating from the store.
    async fn runtime(&self, session_id: &str) -> Result<Arc<SessionRuntime>> {
        if let Some(runtime) = self.existing(session_id) {
            return Ok(runtime);
        }

        let session = match self.inner.store.get(session_id).await? {
            Some(session) => session,
            None => self.inner.store.create(session_id).await?,
        };
        let mut sessions = self.inner.sessions.lock();
        let runtime = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "session runtime created");
                Arc::new(SessionRuntime::new(session, &self.inner.config))
            })
            .clone();
        Ok(runtime)
    }
}

impl Inner {
    async fn run_turn(&self, runtime: &Arc<SessionRuntime>, job: TurnJob) -> Result<()> {
        let resolved = ResolvedModel::resolve(
            job.model_id.as_deref(),
            &self.config.default_model,
            job.reasoning,
        );
        let step = Step::first_of(&job.turn_id);
        let ctx = TurnContext {
            turn_id: job.turn_id.clone(),
            request_id: job.request_id.clone(),
            step_id: step.id.clone(),
        };

        let history = {
            let mut session = runtime.state.lock();
            let history = session.history();
            session.turns.push(Turn {
                id: job.turn_id.clone(),
                request_id: job.request_id.clone(),
                input: job.input.clone(),
                model_id: resolved.model_id.clone(),
                reasoning: resolved.reasoning,
                final_text: String::new(),
                status: RunStatus::Running,
                steps: vec![step.clone()],
                error: None,
                created_at: Utc::now(),
                completed_at: None,
            });
            session.touch();
            history
        };

        runtime.publish(
            &ctx,
            RuntimeEventKind::TurnStarted {
                input: job.input.clone(),
                model_id: resolved.model_id.clone(),
                reasoning: resolved.reasoning,
            },
        );
        runtime.publish(
            &ctx,
            RuntimeEventKind::StepStarted {
                step_id: step.id.clone(),
                title: step.title.clone(),
            },
        );
        runtime.logs.info(
            "turn.started",
            &ctx.scope(),
            json!({ "modelId": resolved.model_id, "reasoning": resolved.reasoning }),
        );

        let outcome = self.execute(runtime, &ctx, &resolved, history, job.input).await;
        runtime.input.cancel();

        match outcome {
            Ok(result) => {
                let final_text = runtime
                    .with_turn(&ctx, |turn| {
                        if turn.final_text.is_empty() {
                            turn.final_text = result.final_text.clone();
                        }
                        turn.finish(RunStatus::Completed, None);
                        turn.final_text.clone()
                    })
                    .unwrap_or(result.final_text);
                runtime.logs.info(
                    "turn.completed",
                    &ctx.scope(),
                    json!({ "finalTextLength": final_text.chars().count() }),
                );
                runtime.publish(&ctx, RuntimeEventKind::TurnCompleted { final_text });
            }
            Err(err) => {
                let message = err.to_string();
                runtime.with_turn(&ctx, |turn| {
                    if !turn.finish(RunStatus::Error, Some(message.clone())) {
                        turn.error.get_or_insert_with(|| message.clone());
                    }
                });
                runtime.logs.error(
                    "turn.failed",
                    &ctx.scope(),
                    json!({ "error": message, "category": format!("{:?}", err.category()) }),
                );
                runtime.publish(&ctx, RuntimeEventKind::TurnFailed { error: message });
            }
        }

        self.persist(runtime).await
    }

    async fn execute(
        &self,
        runtime: &Arc<SessionRuntime>,
        ctx: &TurnContext,
        resolved: &ResolvedModel,
        mut history: Vec<ModelMessage>,
        input: String,
    ) -> Result<EngineOutcome> {
        let graph = self.factory.graph_for(resolved)?;
        history.push(ModelMessage::user(input));

        let transport: Arc<dyn Transport> = Arc::new(TurnTransport::new(runtime.clone(), ctx.clone()));
        let engine = Engine::new(graph);
        let timeout_ms = self.config.turn_timeout_ms;
        match tokio::time::timeout(self.config.turn_timeout(), engine.run(history, transport)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(turn_id = %ctx.turn_id, timeout_ms, "turn timed out");
                Err(TurnkitError::TurnTimeout { timeout_ms })
            }
        }
    }

    async fn persist(&self, runtime: &SessionRuntime) -> Result<()> {
        let mut snapshot = {
            let mut session = runtime.state.lock();
            session.last_seq = runtime.hub.last_seq();
            session.clone()
        };
        self.store.save(&mut snapshot).await?;
        let mut session = runtime.state.lock();
        session.revision = snapshot.revision;
        session.updated_at = snapshot.updated_at;
        Ok(())
    }
}
