//! `turnkit chat`: a session REPL driven through the orchestrator.

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::render;
use super::{ChatArgs, OutputFormat};
use crate::error::Result;
use crate::events::{HumanInputStatus, RuntimeEventKind, SseEvent};
use crate::runtime::{Orchestrator, SubmitTurn};
use crate::transport::forward_events;

/// Submitted turns, awaited replies, and the terminal state of stdin.
#[derive(Debug, Default)]
struct ReplState {
    in_flight: usize,
    awaiting_input: bool,
    stdin_open: bool,
}

pub async fn run(args: ChatArgs) -> Result<()> {
    let config = args.opts.load_config()?;
    let orchestrator = Orchestrator::openai(config);
    let session_id = args.session.clone();
    let one_shot = args.prompt.is_some();

    let mut events = orchestrator.stream(&session_id).await?;
    let (frames, writer) = match args.format {
        OutputFormat::Sse => {
            let (tx, rx) = mpsc::unbounded_channel::<SseEvent>();
            let writer = tokio::spawn(async move {
                let mut stdout = tokio::io::stdout();
                forward_events(UnboundedReceiverStream::new(rx), &mut stdout).await
            });
            (Some(tx), Some(writer))
        }
        OutputFormat::Text => (None, None),
    };

    let mut state = ReplState {
        stdin_open: true,
        ..ReplState::default()
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match args.prompt.clone() {
        Some(prompt) => {
            submit(&orchestrator, &args, prompt).await?;
            state.in_flight += 1;
        }
        None => eprintln!("turnkit chat (session {session_id}), /quit to exit"),
    }

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                let kind = event.data.event.kind.clone();
                match &frames {
                    Some(frames) => {
                        let _ = frames.send(event);
                    }
                    None => {
                        if let Some(output) = render::runtime_event(&kind) {
                            output.write();
                        }
                    }
                }
                match kind {
                    RuntimeEventKind::Status { status: HumanInputStatus::Requested } => {
                        state.awaiting_input = true;
                    }
                    RuntimeEventKind::Status { status: HumanInputStatus::Received } => {
                        state.awaiting_input = false;
                    }
                    kind if kind.is_terminal() => {
                        state.in_flight = state.in_flight.saturating_sub(1);
                        state.awaiting_input = false;
                        if state.in_flight == 0 && (one_shot || !state.stdin_open) {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            line = lines.next_line(), if state.stdin_open => {
                let Some(line) = line? else {
                    state.stdin_open = false;
                    if state.in_flight == 0 {
                        break;
                    }
                    continue;
                };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if text == "/quit" || text == "/exit" {
                    break;
                }
                if state.awaiting_input {
                    let receipt = orchestrator.submit_human_input(&session_id, text).await?;
                    if !receipt.delivered {
                        eprintln!("(no question is pending)");
                    }
                    state.awaiting_input = false;
                } else if one_shot {
                    eprintln!("(waiting for the current turn)");
                } else {
                    submit(&orchestrator, &args, text.to_string()).await?;
                    state.in_flight += 1;
                }
            }
        }
    }

    drop(frames);
    if let Some(writer) = writer {
        match writer.await {
            Ok(result) => {
                result?;
            }
            Err(err) => tracing::warn!(error = %err, "sse writer task failed"),
        }
    }
    Ok(())
}

async fn submit(orchestrator: &Orchestrator, args: &ChatArgs, input: String) -> Result<()> {
    let request = SubmitTurn::builder()
        .session_id(args.session.clone())
        .input(input)
        .maybe_model_id(args.opts.model.clone())
        .maybe_reasoning(args.opts.reasoning())
        .build();
    let receipt = orchestrator.submit_turn(request).await?;
    tracing::info!(turn_id = %receipt.turn_id, request_id = %receipt.request_id, "turn queued");
    Ok(())
}
