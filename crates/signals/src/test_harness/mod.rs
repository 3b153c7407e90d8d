//! # TestNetwork: headless integration test harness for signal control
//!
//! Wraps `bevy::app::App` + `SignalsPlugin` so tests can build a small
//! network of signalized junctions, feed lane samples, queue commands and
//! step the `FixedUpdate` schedule without a window or time source.

mod assertions;
mod queries;
mod setup;

use bevy::app::App;
use bevy::prelude::*;

use crate::SignalsPlugin;

/// A headless Bevy App wrapping `SignalsPlugin` for integration testing.
///
/// Use builder methods to set up junctions and groups, then call `tick()` to
/// advance the schedule and query/assert on the resulting ECS state.
pub struct TestNetwork {
    app: App,
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl TestNetwork {
    /// Create an empty network: no junctions, no groups, default parameters.
    pub fn new() -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(SignalsPlugin);

        // Run one update so plugin setup and Startup complete.
        app.update();

        Self { app }
    }
}
