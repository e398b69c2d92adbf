pub mod controller;
pub mod payload;

pub use controller::{
    LoadError, Progress, SessionController, SessionError, SubmitMode, SubmitOutcome,
    WriteOutcome,
};
pub use payload::SubmissionPayload;
