//! Integration tests for signal control using the `TestNetwork` harness.
//!
//! These tests spin up a headless Bevy App with `SignalsPlugin` and verify
//! behavior across metrics, controllers, coordination and commands working
//! together.

mod coordination_tests;
