//! Headless `--agent` mode: a blocking synchronous loop that reads JSON
//! requests from stdin and writes JSON responses to stdout.
//!
//! The app is built without the schedule runner, so every tick is an explicit
//! `FixedUpdate` run driven by the requests.
//!
//! ## Protocol
//!
//! Each line of stdin is a JSON object with a `"cmd"` discriminator:
//!
//! - `{"cmd":"command","command":{...}}` queues one `SignalCommand`, runs a
//!   tick and answers with its `CommandResult`.
//! - `{"cmd":"step","ticks":N}` runs N ticks (capped at 10 000).
//! - `{"cmd":"status"}` returns a `SignalStatus` per junction.
//! - `{"cmd":"quit"}` ends the session.

use std::io::{BufRead, Write};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use signals::commands::{CommandResult, CommandResultLog, CommandSource, SignalCommand, SignalCommandQueue};
use signals::ids::JunctionId;
use signals::junction_control::JunctionSignalState;
use signals::phases::SignalPhases;
use signals::signal_delay::EdgeSignalDelays;
use signals::status::SignalStatus;
use signals::TickCounter;

const MAX_STEP_TICKS: u32 = 10_000;

#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum AgentRequest {
    Command { command: SignalCommand },
    Step { ticks: u32 },
    Status,
    Quit,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AgentResponse {
    Ready,
    CommandResult { tick: u64, result: CommandResult },
    StepComplete { tick: u64 },
    Status { tick: u64, junctions: Vec<(JunctionId, SignalStatus)> },
    Error { message: String },
    Goodbye,
}

pub fn run_agent_mode(mut app: App) {
    // Initial update so Startup systems execute and resources initialize.
    app.update();

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    send(&mut stdout, &AgentResponse::Ready);
    // Log to stderr so it does not interfere with the JSON protocol on stdout.
    eprintln!("signal-demo agent mode ready, waiting for requests on stdin");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("stdin read error: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<AgentRequest>(&line) {
            Ok(request) => process_request(request, &mut app),
            Err(e) => AgentResponse::Error {
                message: format!("Parse error: {e}"),
            },
        };
        let is_goodbye = matches!(response, AgentResponse::Goodbye);
        send(&mut stdout, &response);
        if is_goodbye {
            break;
        }
    }

    eprintln!("signal-demo agent mode shutting down");
}

fn send(out: &mut impl Write, response: &AgentResponse) {
    match serde_json::to_string(response) {
        Ok(json) => {
            let _ = writeln!(out, "{json}");
            let _ = out.flush();
        }
        Err(e) => eprintln!("response encode error: {e}"),
    }
}

fn current_tick(app: &App) -> u64 {
    app.world()
        .get_resource::<TickCounter>()
        .map(|t| t.0)
        .unwrap_or(0)
}

fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn process_request(request: AgentRequest, app: &mut App) -> AgentResponse {
    match request {
        AgentRequest::Command { command } => {
            let queued_at = current_tick(app);
            app.world_mut()
                .resource_mut::<SignalCommandQueue>()
                .push(queued_at, CommandSource::Agent, command);

            // Run one tick so the executor processes the command.
            tick(app);

            let result = app
                .world()
                .get_resource::<CommandResultLog>()
                .and_then(|log| log.last_result().cloned())
                .unwrap_or(CommandResult::Success);
            AgentResponse::CommandResult {
                tick: current_tick(app),
                result,
            }
        }

        AgentRequest::Step { ticks } => {
            for _ in 0..ticks.min(MAX_STEP_TICKS) {
                tick(app);
            }
            AgentResponse::StepComplete {
                tick: current_tick(app),
            }
        }

        AgentRequest::Status => {
            let world = app.world_mut();
            let mut query = world.query::<(
                &JunctionId,
                &JunctionSignalState,
                &SignalPhases,
                Option<&EdgeSignalDelays>,
            )>();
            let mut junctions: Vec<(JunctionId, SignalStatus)> = query
                .iter(world)
                .map(|(&id, signal, phases, delays)| {
                    (id, SignalStatus::capture(signal, phases, delays))
                })
                .collect();
            junctions.sort_by_key(|(id, _)| *id);
            AgentResponse::Status {
                tick: current_tick(app),
                junctions,
            }
        }

        AgentRequest::Quit => AgentResponse::Goodbye,
    }
}
