//! `turnkit ask`: one prompt run straight through the engine over the
//! in-process event bus, without a session.

use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::render;
use super::AskArgs;
use crate::agent_loop::{AgentFactory, OpenAiAgentFactory};
use crate::engine::Engine;
use crate::error::{Result, TurnkitError};
use crate::models::ResolvedModel;
use crate::transport::{EventBusTransport, Transport};
use crate::types::ModelMessage;

pub async fn run(args: AskArgs) -> Result<()> {
    let config = args.opts.load_config()?;
    let resolved = ResolvedModel::resolve(
        args.opts.model.as_deref(),
        &config.default_model,
        args.opts.reasoning(),
    );
    let graph = OpenAiAgentFactory::new(config.clone()).graph_for(&resolved)?;
    tracing::info!(model_id = %resolved.model_id, "ask");

    let bus = Arc::new(EventBusTransport::new());
    let mut events = bus.subscribe();
    let transport: Arc<dyn Transport> = bus.clone();
    let timeout = config.turn_timeout();
    let timeout_ms = config.turn_timeout_ms;
    let prompt = args.prompt;
    let mut run = tokio::spawn(async move {
        let engine = Engine::new(graph);
        match tokio::time::timeout(timeout, engine.run(vec![ModelMessage::user(prompt)], transport)).await {
            Ok(result) => result,
            Err(_) => Err(TurnkitError::TurnTimeout { timeout_ms }),
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let outcome = loop {
        tokio::select! {
            finished = &mut run => break finished,
            Some(event) = events.next() => {
                if let Some(output) = render::agent_event(&event) {
                    output.write();
                }
                if bus.awaiting_input() {
                    render::Output::Stderr("\n> ".to_string()).write();
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) if bus.awaiting_input() => {
                        bus.send_input(line.trim());
                    }
                    Some(_) => eprintln!("(no question is pending)"),
                    None => stdin_open = false,
                }
            }
        }
    };

    while let Some(Some(event)) = events.next().now_or_never() {
        if let Some(output) = render::agent_event(&event) {
            output.write();
        }
    }
    println!();

    match outcome {
        Ok(result) => result.map(|_| ()),
        Err(err) => Err(TurnkitError::Stream(format!("engine task failed: {err}"))),
    }
}
