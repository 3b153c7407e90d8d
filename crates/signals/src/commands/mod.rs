pub mod actions;
pub mod executor;
pub mod plugin;
pub mod queue;
pub mod result_log;
pub mod results;

pub use actions::*;
pub use executor::execute_signal_commands;
pub use plugin::SignalCommandsPlugin;
pub use queue::*;
pub use result_log::CommandResultLog;
pub use results::*;
