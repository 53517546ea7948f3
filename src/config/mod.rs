use chrono_tz::Tz;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub clock: ClockConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string, or `memory://` for the in-process driver
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    pub admin: Option<AdminAccount>,
}

/// Admin account created at startup when it does not exist yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAccount {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub base_path: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    pub timezone: String,
}

impl ClockConfig {
    /// Configured civil time zone, falling back to Asia/Jakarta on bad input
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone '{}', using Asia/Jakarta", self.timezone);
            chrono_tz::Asia::Jakarta
        })
    }
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Server overrides
        if let Some(v) = env::var("APP_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = v.parse().unwrap_or(self.server.request_timeout_secs);
        }
        if let Ok(v) = env::var("SERVER_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = v.parse().unwrap_or(self.server.max_upload_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let (Ok(email), Ok(password)) = (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            let username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
            self.security.admin = Some(AdminAccount { email, username, password });
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BASE_PATH") {
            self.storage.base_path = v;
        }
        if let Ok(v) = env::var("STORAGE_BASE_URL") {
            self.storage.base_url = v;
        }

        if let Ok(v) = env::var("APP_TIMEZONE") {
            self.clock.timezone = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: "memory://".to_string(),
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            server: ServerConfig {
                port: 3000,
                request_timeout_secs: 60,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: "development-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                admin: None,
            },
            storage: StorageConfig {
                base_path: "./public/images".to_string(),
                base_url: "/images".to_string(),
            },
            clock: ClockConfig {
                timezone: "Asia/Jakarta".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            server: ServerConfig {
                port: 3000,
                request_timeout_secs: 30,
                max_upload_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
                admin: None,
            },
            storage: StorageConfig {
                base_path: "./public/images".to_string(),
                base_url: "/images".to_string(),
            },
            clock: ClockConfig {
                timezone: "Asia/Jakarta".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: false,
            },
            server: ServerConfig {
                port: 3000,
                request_timeout_secs: 15,
                max_upload_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://app.example.com".to_string()],
                admin: None,
            },
            storage: StorageConfig {
                base_path: "./public/images".to_string(),
                base_url: "/images".to_string(),
            },
            clock: ClockConfig {
                timezone: "Asia/Jakarta".to_string(),
            },
        }
    }

    /// Development preset without environment overrides, for tests and local tooling
    pub fn for_testing() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.database.is_memory());
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert!(!config.security.jwt_secret.is_empty());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.is_memory());
        assert!(!config.database.run_migrations);
        assert_eq!(config.security.jwt_expiry_hours, 4);
    }

    #[test]
    fn test_timezone_falls_back_to_jakarta() {
        let clock = ClockConfig { timezone: "Mars/Olympus".to_string() };
        assert_eq!(clock.tz(), chrono_tz::Asia::Jakarta);

        let clock = ClockConfig { timezone: "Europe/Berlin".to_string() };
        assert_eq!(clock.tz(), chrono_tz::Europe::Berlin);
    }
}
