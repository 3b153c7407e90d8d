mod agent_mode;
mod demo;

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::{Level, LogPlugin};
use bevy::prelude::*;
use clap::Parser;

use demo::{DemoPlugin, DemoSettings};

/// Fixed ticks per second of the demo loop.
const TICK_RATE: f64 = 64.0;

/// Headless adaptive signal controller demo.
#[derive(Parser, Debug)]
#[command(name = "signal-demo", version)]
struct Args {
    /// Fixed ticks to run before exiting; 0 runs until interrupted.
    #[arg(long, default_value_t = DemoSettings::default().ticks)]
    ticks: u64,

    /// Seed for the generated lane demand.
    #[arg(long, default_value_t = DemoSettings::default().seed)]
    seed: u64,

    /// Log a status line every N ticks; 0 disables reports.
    #[arg(long, default_value_t = DemoSettings::default().report_every)]
    report_every: u64,

    /// Read JSON-lines requests from stdin instead of running freely.
    #[arg(long)]
    agent: bool,
}

impl Args {
    fn settings(&self) -> DemoSettings {
        if self.agent {
            // Requests drive the ticks; no auto-exit or periodic reports.
            return DemoSettings {
                ticks: 0,
                seed: self.seed,
                report_every: 0,
            };
        }
        DemoSettings {
            ticks: self.ticks,
            seed: self.seed,
            report_every: self.report_every,
        }
    }
}

fn main() {
    let args = Args::parse();
    let settings = args.settings();
    let agent = args.agent;

    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / TICK_RATE,
        ))),
    )
    .add_plugins(LogPlugin {
        filter: "warn,signals=info,signal_demo=info".to_string(),
        level: Level::INFO,
        ..default()
    })
    .insert_resource(Time::<Fixed>::from_hz(TICK_RATE))
    .add_plugins((signals::SignalsPlugin, DemoPlugin { settings }));

    if agent {
        agent_mode::run_agent_mode(app);
    } else {
        app.run();
    }
}
