use super::parsing::{
    env_optional, env_or_default, normalize_path, parse_base_url, parse_bool, parse_environment,
    parse_u32, parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, EndpointSettings, ProctoringSettings, RuntimeSettings,
    SessionSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(env_optional("ASSESSMENT_ENV"));
        let strict_config = env_optional("ASSESSMENT_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let base_url = parse_base_url(
            "ASSESSMENT_API_BASE_URL",
            env_or_default("ASSESSMENT_API_BASE_URL", "http://localhost:8000/api/v1"),
        )?;
        let token = env_optional("ASSESSMENT_API_TOKEN");
        let request_timeout_seconds =
            parse_u64("REQUEST_TIMEOUT_SECONDS", env_or_default("REQUEST_TIMEOUT_SECONDS", "30"))?;
        let connect_timeout_seconds =
            parse_u64("CONNECT_TIMEOUT_SECONDS", env_or_default("CONNECT_TIMEOUT_SECONDS", "10"))?;
        let execution_timeout_seconds = parse_u64(
            "EXECUTION_TIMEOUT_SECONDS",
            env_or_default("EXECUTION_TIMEOUT_SECONDS", "60"),
        )?;

        let test_path = normalize_path(env_or_default("ASSESSMENT_TEST_PATH", "/tests/{id}"));
        let submit_path =
            normalize_path(env_or_default("ASSESSMENT_SUBMIT_PATH", "/tests/{id}/submit"));
        let results_path =
            normalize_path(env_or_default("ASSESSMENT_RESULTS_PATH", "/submissions/{id}/results"));
        let execute_path = normalize_path(env_or_default("ASSESSMENT_EXECUTE_PATH", "/code/execute"));
        let draft_path = normalize_path(env_or_default("ASSESSMENT_DRAFT_PATH", "/tests/{id}/draft"));

        let auto_submit_max_retries =
            parse_u32("AUTO_SUBMIT_MAX_RETRIES", env_or_default("AUTO_SUBMIT_MAX_RETRIES", "3"))?;
        let auto_submit_retry_base_seconds = parse_u64(
            "AUTO_SUBMIT_RETRY_BASE_SECONDS",
            env_or_default("AUTO_SUBMIT_RETRY_BASE_SECONDS", "2"),
        )?;
        let auto_save_interval_seconds = parse_u64(
            "AUTO_SAVE_INTERVAL_SECONDS",
            env_or_default("AUTO_SAVE_INTERVAL_SECONDS", "0"),
        )?;

        let require_camera = env_optional("PROCTORING_REQUIRE_CAMERA")
            .map(|value| parse_bool(&value))
            .unwrap_or(true);

        let log_level = env_or_default("ASSESSMENT_LOG_LEVEL", "info");
        let json =
            env_optional("ASSESSMENT_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings {
                base_url,
                token,
                request_timeout_seconds,
                connect_timeout_seconds,
                execution_timeout_seconds,
            },
            endpoints: EndpointSettings {
                test_path,
                submit_path,
                results_path,
                execute_path,
                draft_path,
            },
            session: SessionSettings {
                auto_submit_max_retries,
                auto_submit_retry_base_seconds,
                auto_save_interval_seconds,
            },
            proctoring: ProctoringSettings { require_camera },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub fn endpoints(&self) -> &EndpointSettings {
        &self.endpoints
    }

    pub fn session(&self) -> &SessionSettings {
        &self.session
    }

    pub fn proctoring(&self) -> &ProctoringSettings {
        &self.proctoring
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("ASSESSMENT_TEST_PATH", &self.endpoints.test_path),
            ("ASSESSMENT_SUBMIT_PATH", &self.endpoints.submit_path),
            ("ASSESSMENT_RESULTS_PATH", &self.endpoints.results_path),
            ("ASSESSMENT_DRAFT_PATH", &self.endpoints.draft_path),
        ] {
            if !value.contains("{id}") {
                return Err(ConfigError::MissingPlaceholder { field, value: value.clone() });
            }
        }

        if self.api.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "REQUEST_TIMEOUT_SECONDS",
                value: String::from("0"),
            });
        }
        if self.api.execution_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXECUTION_TIMEOUT_SECONDS",
                value: String::from("0"),
            });
        }

        if self.runtime.strict_config {
            if !self.api.base_url.starts_with("https://") {
                return Err(ConfigError::InvalidUrl {
                    field: "ASSESSMENT_API_BASE_URL",
                    value: self.api.base_url.clone(),
                });
            }
        } else if !self.api.base_url.starts_with("https://") {
            tracing::warn!(
                base_url = %self.api.base_url,
                "Assessment API base URL is not https; bearer tokens will travel in clear text"
            );
        }

        Ok(())
    }

    /// Settings for unit tests and embedding shells that do not read the
    /// process environment.
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            runtime: RuntimeSettings {
                environment: super::types::Environment::Test,
                strict_config: false,
            },
            api: ApiSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                token: None,
                request_timeout_seconds: 5,
                connect_timeout_seconds: 2,
                execution_timeout_seconds: 5,
            },
            endpoints: EndpointSettings {
                test_path: "/tests/{id}".to_string(),
                submit_path: "/tests/{id}/submit".to_string(),
                results_path: "/submissions/{id}/results".to_string(),
                execute_path: "/code/execute".to_string(),
                draft_path: "/tests/{id}/draft".to_string(),
            },
            session: SessionSettings {
                auto_submit_max_retries: 3,
                auto_submit_retry_base_seconds: 2,
                auto_save_interval_seconds: 0,
            },
            proctoring: ProctoringSettings { require_camera: true },
            telemetry: TelemetrySettings {
                log_level: "info".to_string(),
                json: false,
                prometheus_enabled: false,
            },
        }
    }
}
