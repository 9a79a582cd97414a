mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::QuizError;
pub use view::{HistoryStats, ResultHistoryService, ResultId, ResultListItem};
pub use workflow::{QuizAdvance, QuizLoopService, SessionCompletion};
