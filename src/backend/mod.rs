pub mod client;
pub mod credentials;
pub mod errors;

pub use client::{AssessmentBackend, HttpBackend};
pub use credentials::{CredentialProvider, StaticToken};
pub use errors::ClientError;
