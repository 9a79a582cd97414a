#![forbid(unsafe_code)]

pub mod app_services;
pub mod bank_source;
pub mod error;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use bank_source::BankSource;
pub use error::{AppServicesError, BankLoadError, QuizError};
pub use sessions::{
    HistoryStats, QuizAdvance, QuizLoopService, ResultHistoryService, ResultId, ResultListItem,
    SessionCompletion,
};
