mod parsing;
mod settings;
mod types;

pub use types::{
    ApiSettings, ConfigError, EndpointSettings, Environment, ProctoringSettings, RuntimeSettings,
    SessionSettings, Settings, TelemetrySettings,
};
