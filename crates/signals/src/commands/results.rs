use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Encode, Decode)]
pub enum CommandResult {
    Success,
    /// The command succeeded but adjusted its input (e.g. a clamped delay).
    SuccessWithWarning(String),
    Error(CommandError),
}

impl CommandResult {
    /// Returns `true` for both `Success` and `SuccessWithWarning`.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            CommandResult::Success | CommandResult::SuccessWithWarning(_)
        )
    }

    /// Extract the warning string if present.
    pub fn warning(&self) -> Option<&str> {
        match self {
            CommandResult::SuccessWithWarning(w) => Some(w.as_str()),
            _ => None,
        }
    }
}

impl From<Result<(), CommandError>> for CommandResult {
    fn from(result: Result<(), CommandError>) -> Self {
        match result {
            Ok(()) => CommandResult::Success,
            Err(error) => CommandResult::Error(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Encode, Decode)]
pub enum CommandError {
    /// Junction, group, phase or edge does not exist.
    NotFound,
    /// The junction already has the maximum number of phases.
    PhaseLimit,
    InvalidParameter(String),
    /// The junction already belongs to a group.
    AlreadyMember,
    /// The junction is not a member of the addressed group.
    NotMember,
    /// A group cannot be joined with itself.
    SameGroup,
    /// The operation needs at least one phase.
    EmptyPhaseList,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NotFound => write!(f, "not found"),
            CommandError::PhaseLimit => write!(f, "phase limit reached"),
            CommandError::InvalidParameter(reason) => write!(f, "invalid parameter: {reason}"),
            CommandError::AlreadyMember => write!(f, "junction already belongs to a group"),
            CommandError::NotMember => write!(f, "junction is not a member of the group"),
            CommandError::SameGroup => write!(f, "cannot join a group with itself"),
            CommandError::EmptyPhaseList => write!(f, "junction has no phases"),
        }
    }
}

impl std::error::Error for CommandError {}
