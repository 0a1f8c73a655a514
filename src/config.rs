use crate::cache::CachePolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Base URLs for the backend collaborators. Unset fields resolve to the
/// local development topology: the auth server directly, everything else
/// through the API gateway.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceEndpoints {
    pub auth: Option<String>,
    pub orders: Option<String>,
    pub payments: Option<String>,
    pub restaurants: Option<String>,
}

fn default_auth_url() -> String {
    "http://localhost:7777".to_string()
}

fn default_gateway_url() -> String {
    "http://localhost:1111".to_string()
}

impl ServiceEndpoints {
    pub fn auth_url(&self) -> String {
        self.auth.clone().unwrap_or_else(default_auth_url)
    }

    pub fn orders_url(&self) -> String {
        self.orders.clone().unwrap_or_else(default_gateway_url)
    }

    pub fn payments_url(&self) -> String {
        self.payments.clone().unwrap_or_else(default_gateway_url)
    }

    pub fn restaurants_url(&self) -> String {
        self.restaurants.clone().unwrap_or_else(default_gateway_url)
    }

    fn merge(&mut self, other: ServiceEndpoints) {
        if other.auth.is_some() {
            self.auth = other.auth;
        }
        if other.orders.is_some() {
            self.orders = other.orders;
        }
        if other.payments.is_some() {
            self.payments = other.payments;
        }
        if other.restaurants.is_some() {
            self.restaurants = other.restaurants;
        }
    }
}

/// Bounds on the local order cache; unset fields fall back to the
/// built-in policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    pub max_entries: Option<usize>,
    pub max_age_days: Option<i64>,
}

impl CacheConfig {
    pub fn policy(&self) -> CachePolicy {
        let defaults = CachePolicy::default();
        CachePolicy {
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            max_age_days: self.max_age_days.unwrap_or(defaults.max_age_days),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub services: ServiceEndpoints,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Override for the state directory holding the session token, order
    /// cache, and activity journal
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    /// Delay before the local delivery simulation fires, in milliseconds
    #[serde(default)]
    pub delivery_simulation_ms: Option<u64>,
}

impl Config {
    /// Load configuration from default paths.
    /// Priority: project (.expressbite/config.toml) > user
    /// (~/.expressbite/config.toml) > built-in defaults.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".expressbite").join("config.toml");
            if user_config.exists() {
                config = Self::load_from(&user_config)?;
            }
        }

        let project_config = Path::new(".expressbite").join("config.toml");
        if project_config.exists() {
            let project = Self::load_from(&project_config)?;
            config.merge(project);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority).
    /// Fields left unset in `other` keep their current values, so a
    /// partial project file layers over the user-level file.
    pub fn merge(&mut self, other: Config) {
        self.services.merge(other.services);
        if other.cache.max_entries.is_some() {
            self.cache.max_entries = other.cache.max_entries;
        }
        if other.cache.max_age_days.is_some() {
            self.cache.max_age_days = other.cache.max_age_days;
        }
        if other.state_dir.is_some() {
            self.state_dir = other.state_dir;
        }
        if other.delivery_simulation_ms.is_some() {
            self.delivery_simulation_ms = other.delivery_simulation_ms;
        }
    }

    pub fn delivery_delay_ms(&self) -> u64 {
        self.delivery_simulation_ms.unwrap_or(2_000)
    }

    /// The directory holding all durable client state. The session token,
    /// order cache, and journal live here under disjoint file names.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".expressbite")
            .join("state")
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let urls = [
            ("services.auth", self.services.auth_url()),
            ("services.orders", self.services.orders_url()),
            ("services.payments", self.services.payments_url()),
            ("services.restaurants", self.services.restaurants_url()),
        ];
        for (field, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("Expected an http(s) URL, got '{}'", url),
                });
            }
        }

        let policy = self.cache.policy();
        if policy.max_entries == 0 {
            errors.push(ValidationError {
                field: "cache.max_entries".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }
        if policy.max_age_days <= 0 {
            errors.push(ValidationError {
                field: "cache.max_age_days".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
