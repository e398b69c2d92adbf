use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) api: ApiSettings,
    pub(super) endpoints: EndpointSettings,
    pub(super) session: SessionSettings,
    pub(super) proctoring: ProctoringSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub execution_timeout_seconds: u64,
}

/// Path templates relative to `ApiSettings::base_url`. `{id}` is replaced
/// with the test or submission id.
#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub test_path: String,
    pub submit_path: String,
    pub results_path: String,
    pub execute_path: String,
    pub draft_path: String,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub auto_submit_max_retries: u32,
    pub auto_submit_retry_base_seconds: u64,
    pub auto_save_interval_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ProctoringSettings {
    pub require_camera: bool,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
    pub strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid url for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("path template {field} must contain {{id}}: {value}")]
    MissingPlaceholder { field: &'static str, value: String },
}
