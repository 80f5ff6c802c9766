use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// What the gatekeeper does when progress cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateFailurePolicy {
    /// Log and let the student through.
    #[default]
    Open,
    /// Refuse with 503.
    Closed,
}

impl FromStr for GateFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" | "fail_open" | "fail-open" => Ok(Self::Open),
            "closed" | "fail_closed" | "fail-closed" => Ok(Self::Closed),
            other => Err(format!("unknown gate failure policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_url: String,
    pub db_name: String,
    pub server_addr: String,
    /// `["*"]` allows any origin.
    pub cors_origins: Vec<String>,
    pub teacher_access_code: String,
    pub admin_key: String,
    pub gate_failure_policy: GateFailurePolicy,
    pub curriculum_seed_file: Option<String>,
    /// `user:password` expected on `/metrics`.
    pub metrics_auth: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_url: "mongodb://localhost:27017".to_string(),
            db_name: "inequalities_tutor".to_string(),
            server_addr: "0.0.0.0:8001".to_string(),
            cors_origins: vec!["*".to_string()],
            teacher_access_code: "teacher2024".to_string(),
            admin_key: "admin123".to_string(),
            gate_failure_policy: GateFailurePolicy::Open,
            curriculum_seed_file: None,
            metrics_auth: "admin:changeme".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml first, APP__SECTION__KEY env vars override it
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let defaults = Config::default();
        let lookup = |key: &str, var: &str| settings.get_string(key).or_else(|_| env::var(var));

        let gate_failure_policy = match lookup("gate.failure_policy", "GATE_FAILURE_POLICY") {
            Ok(raw) => raw.parse().map_err(config::ConfigError::Message)?,
            Err(_) => defaults.gate_failure_policy,
        };

        let curriculum_seed_file = lookup("curriculum.seed_file", "CURRICULUM_SEED_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty());

        Ok(Config {
            mongo_url: lookup("database.mongo_url", "MONGO_URL").unwrap_or(defaults.mongo_url),
            db_name: lookup("database.name", "DB_NAME").unwrap_or(defaults.db_name),
            server_addr: lookup("server.addr", "SERVER_ADDR").unwrap_or(defaults.server_addr),
            cors_origins: lookup("server.cors_origins", "CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or(defaults.cors_origins),
            teacher_access_code: lookup("auth.teacher_access_code", "TEACHER_ACCESS_CODE")
                .unwrap_or(defaults.teacher_access_code),
            admin_key: lookup("auth.admin_key", "ADMIN_KEY").unwrap_or(defaults.admin_key),
            gate_failure_policy,
            curriculum_seed_file,
            metrics_auth: lookup("metrics.auth", "METRICS_AUTH").unwrap_or(defaults.metrics_auth),
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|origin| origin == "*")
    }
}

/// Comma-separated allow-list; an empty list falls back to `*`.
pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}
