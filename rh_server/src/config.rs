//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use referral_hub::auth::{DefaultAdmin, MIN_PASSWORD_LEN};
use referral_hub::db::DatabaseConfig;
use referral_hub::utils::validate_email;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Where uploaded payment screenshots go
    pub uploads: UploadConfig,
    /// Whether `POST /auth/admin-signup` is open
    pub allow_admin_signup: bool,
    /// Whether `/metrics` serves a Prometheus exposition
    pub metrics_enabled: bool,
    /// Admin account seeded at startup, when all three variables are set
    pub default_admin: Option<DefaultAdmin>,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
}

/// Upload storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Directory the image files are written to
    pub dir: PathBuf,
    /// URL prefix the stored files are served under
    pub public_url: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            public_url: "/uploads".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => {
                let raw = std::env::var("SERVER_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{raw}' is not a socket address"),
                })?
            }
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper =
            std::env::var("PASSWORD_PEPPER").map_err(|_| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let defaults = UploadConfig::default();
        let uploads = UploadConfig {
            dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
            public_url: std::env::var("PUBLIC_UPLOAD_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_url),
        };

        let default_admin = match (
            std::env::var("DEFAULT_ADMIN_EMAIL"),
            std::env::var("DEFAULT_ADMIN_NAME"),
            std::env::var("DEFAULT_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(name), Ok(password)) => Some(DefaultAdmin {
                email,
                name,
                password,
            }),
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            security: SecurityConfig {
                jwt_secret,
                password_pepper,
            },
            uploads,
            allow_admin_signup: parse_env_or("ALLOW_ADMIN_SIGNUP", false),
            metrics_enabled: parse_env_or("METRICS_ENABLED", false),
            default_admin,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.security.password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.uploads.public_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "PUBLIC_UPLOAD_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if let Some(admin) = &self.default_admin {
            if !validate_email(&admin.email) {
                return Err(ConfigError::Invalid {
                    var: "DEFAULT_ADMIN_EMAIL".to_string(),
                    reason: "Not a valid email address".to_string(),
                });
            }
            if admin.password.len() < MIN_PASSWORD_LEN {
                return Err(ConfigError::Invalid {
                    var: "DEFAULT_ADMIN_PASSWORD".to_string(),
                    reason: format!("Must be at least {MIN_PASSWORD_LEN} characters"),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "SERVER_BIND",
        "JWT_SECRET",
        "PASSWORD_PEPPER",
        "UPLOAD_DIR",
        "PUBLIC_UPLOAD_URL",
        "ALLOW_ADMIN_SIGNUP",
        "DEFAULT_ADMIN_EMAIL",
        "DEFAULT_ADMIN_NAME",
        "DEFAULT_ADMIN_PASSWORD",
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: env-touching tests are serialized with #[serial]
            unsafe { std::env::remove_var(var) };
        }
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: env-touching tests are serialized with #[serial]
        unsafe { std::env::set_var(key, value) };
    }

    fn valid_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            database: DatabaseConfig::development(),
            security: SecurityConfig {
                jwt_secret: "a".repeat(32),
                password_pepper: "a".repeat(16),
            },
            uploads: UploadConfig::default(),
            allow_admin_signup: false,
            metrics_enabled: false,
            default_admin: None,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = valid_config();
        config.security.jwt_secret = "short".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "JWT_SECRET"));
    }

    #[test]
    fn test_short_pepper_rejected() {
        let mut config = valid_config();
        config.security.password_pepper = "a".repeat(15);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "PASSWORD_PEPPER"));
    }

    #[test]
    fn test_pool_bounds_checked() {
        let mut config = valid_config();
        config.database.min_connections = config.database.max_connections + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_admin_checked() {
        let mut config = valid_config();
        config.default_admin = Some(DefaultAdmin {
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            password: "123".to_string(),
        });
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { ref var, .. } if var == "DEFAULT_ADMIN_PASSWORD")
        );
    }

    #[test]
    #[serial]
    fn test_missing_secret_is_reported() {
        clear_env();
        set_env("PASSWORD_PEPPER", &"p".repeat(16));

        let err = ServerConfig::from_env(None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref var, .. } if var == "JWT_SECRET"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_reads_optional_settings() {
        clear_env();
        set_env("JWT_SECRET", &"j".repeat(32));
        set_env("PASSWORD_PEPPER", &"p".repeat(16));
        set_env("PUBLIC_UPLOAD_URL", "https://cdn.example.com/proofs/");
        set_env("ALLOW_ADMIN_SIGNUP", "true");
        set_env("DEFAULT_ADMIN_EMAIL", "root@example.com");
        set_env("DEFAULT_ADMIN_NAME", "Root");
        set_env("DEFAULT_ADMIN_PASSWORD", "rootpass");

        let config = ServerConfig::from_env(
            Some("0.0.0.0:9000".parse().unwrap()),
            Some("postgres://override/db".to_string()),
        )
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.database.database_url, "postgres://override/db");
        assert_eq!(config.uploads.public_url, "https://cdn.example.com/proofs");
        assert!(config.allow_admin_signup);
        assert_eq!(
            config.default_admin.as_ref().map(|a| a.email.as_str()),
            Some("root@example.com")
        );
        assert!(config.validate().is_ok());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_partial_default_admin_is_ignored() {
        clear_env();
        set_env("JWT_SECRET", &"j".repeat(32));
        set_env("PASSWORD_PEPPER", &"p".repeat(16));
        set_env("DEFAULT_ADMIN_EMAIL", "root@example.com");

        let config = ServerConfig::from_env(None, None).unwrap();
        assert!(config.default_admin.is_none());
        assert!(!config.allow_admin_signup);
        assert_eq!(config.bind, DEFAULT_BIND.parse::<SocketAddr>().unwrap());
        clear_env();
    }
}
