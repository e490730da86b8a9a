mod buffer;
mod mission;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use buffer::{BufferManager, BufferPhase};
pub use mission::{
    AnswerResponse, MissionAdvance, MissionController, MissionProgress, MissionStatus, Verdict,
};
