//! Per-junction signal state machine.
//!
//! ```text
//! None → Beginning → Ongoing → Ending → Changing → Beginning → …
//! ```
//!
//! `Beginning` commits the selected phase, `Ongoing` runs it until a change is
//! warranted, and `Ending`/`Changing` are clearance states. `None` is both the
//! initial state and the fault state for an empty or malformed phase list; it
//! re-enters `Beginning` on the next tick with phases available.

mod machine;
mod systems;
mod types;


pub use machine::{dynamic_change_due, fixed_change_due, update_junction};
pub use systems::update_junction_states;
pub use types::{JunctionSignalState, SignalState, TrafficSignalJunction};
