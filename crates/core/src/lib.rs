#![forbid(unsafe_code)]

pub mod draw;
pub mod model;
pub mod session;
pub mod time;

pub use draw::{DrawRequest, SelectionError, candidate_pool, draw_questions};
pub use session::{Advance, Session, SessionProgress, SessionState, SessionStateError};
pub use time::Clock;
