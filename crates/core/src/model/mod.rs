mod bank;
mod ids;
mod mode;
mod question;
mod result;
mod settings;

pub use bank::{BankDocument, BankError, QuestionBank, QuestionDocument, Theme, ThemeDocument, ThemeOverview};
pub use ids::{ParseIdError, QuestionId};
pub use mode::{ParseModeError, SessionMode};
pub use question::{MAX_OPTIONS, MIN_OPTIONS, Question, QuestionError};
pub use result::{OptionMark, QuestionRecord, ResultSummary, ResultSummaryError, SessionResult};
pub use settings::{ScoringRule, SessionSettings, SettingsError};
