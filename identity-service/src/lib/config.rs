use std::env;
use std::time::Duration;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::identity::models::Role;
use crate::domain::identity::models::Roles;
use crate::domain::identity::service::RegistrationPolicy;
use crate::identity::errors::RoleError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
}

/// Credential store settings. Without a `url` the service keeps identities
/// in memory.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    /// Grace window applied to `exp` checks
    #[serde(default)]
    pub leeway_seconds: u64,
}

impl JwtConfig {
    /// Lifetime of every issued token.
    ///
    /// # Errors
    /// `expiration_hours` is not positive or does not fit a duration
    pub fn token_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        if self.expiration_hours <= 0 {
            return Err(ConfigError::Message(format!(
                "jwt.expiration_hours must be positive, got {}",
                self.expiration_hours
            )));
        }

        // Expiry timestamps are computed as now + ttl, which must stay representable.
        chrono::Duration::try_hours(self.expiration_hours)
            .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| {
                ConfigError::Message(format!(
                    "jwt.expiration_hours is out of range: {}",
                    self.expiration_hours
                ))
            })
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistrationConfig {
    pub default_role: String,
    pub allowed_roles: Vec<String>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            default_role: "USER".to_string(),
            allowed_roles: vec!["USER".to_string(), "BUSINESSUSER".to_string()],
        }
    }
}

impl RegistrationConfig {
    /// Parse the configured labels into a policy.
    ///
    /// # Errors
    /// * `NotAllowed` - The default role is not among the allowed roles
    /// * `Blank` / `InvalidCharacters` / `Empty` - A label cannot be parsed
    pub fn policy(&self) -> Result<RegistrationPolicy, RoleError> {
        let default_role = Role::new(&self.default_role)?;
        let allowed_roles = Roles::parse(&self.allowed_roles)?;

        if !allowed_roles.contains(&default_role) {
            return Err(RoleError::NotAllowed(default_role.to_string()));
        }

        Ok(RegistrationPolicy::new(default_role, allowed_roles))
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_seconds() -> u64 {
    5
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // REGISTRATION__ALLOWED_ROLES=USER,BUSINESSUSER overrides registration.allowed_roles
            .add_source(
                Environment::with_prefix("")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("registration.allowed_roles"),
            )
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.jwt.token_ttl()?;

        Ok(config)
    }
}
