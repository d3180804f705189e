use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Secret used when `SECRET_KEY` is unset in development
const DEV_SECRET_KEY: &str = "docvault-development-secret-key-change-me";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// JWT signing configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

/// Uploaded file storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub media_root: PathBuf,
    pub media_url: String,
    pub max_upload_bytes: usize,
}

/// Administrator account ensured at startup
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub admin: Option<AdminConfig>,
    pub log_level: String,
    pub log_format: String,
    pub http_port: u16,
    pub environment: String,
    pub migrations_path: String,
}

/// Parse an optional raw value; a present but unparseable value is an error
fn parse_var<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, String> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid {}: {}", key, raw)),
    }
}

fn parse_flag(key: &str, raw: Option<String>) -> Result<Option<bool>, String> {
    match raw {
        None => Ok(None),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(format!("Invalid {}: {}. Must be a boolean", key, raw)),
        },
    }
}

/// Blank values count as unset
fn env_raw(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, String> {
    parse_var(key, env_raw(key))
}

fn env_flag(key: &str) -> Result<Option<bool>, String> {
    parse_flag(key, env_raw(key))
}

/// Build a Postgres URL from the `POSTGRES_*` variables used by the compose files
fn postgres_url_from_parts() -> Option<String> {
    let user = env::var("POSTGRES_USER").ok()?;
    let db = env::var("POSTGRES_DB").ok()?;
    let password = env::var("POSTGRES_PASSWORD").unwrap_or_default();
    let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());

    Some(if password.is_empty() {
        format!("postgresql://{}@{}:{}/{}", user, host, port, db)
    } else {
        format!("postgresql://{}:{}@{}:{}/{}", user, password, host, port, db)
    })
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(postgres_url_from_parts)
            .ok_or("DATABASE_URL or POSTGRES_USER/POSTGRES_DB environment variables are required")?;

        let max_connections = env_parse::<u32>("DATABASE_MAX_CONNECTIONS")?.unwrap_or(10);
        let acquire_timeout_secs = env_parse::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS")?.unwrap_or(30);
        let idle_timeout_secs = env_parse::<u64>("DATABASE_IDLE_TIMEOUT_SECS")?.unwrap_or(600); // 10 minutes
        let max_lifetime_secs = env_parse::<u64>("DATABASE_MAX_LIFETIME_SECS")?.unwrap_or(1800); // 30 minutes
        let test_before_acquire = env_flag("DATABASE_TEST_BEFORE_ACQUIRE")?.unwrap_or(true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/docvault".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl AuthConfig {
    fn from_env(environment: &str) -> Result<Self, String> {
        let secret_key = match env::var("SECRET_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ if environment == "development" => DEV_SECRET_KEY.to_string(),
            _ => return Err("SECRET_KEY environment variable is required".to_string()),
        };

        let access_ttl_secs = env_parse::<i64>("JWT_ACCESS_TTL_SECS")?.unwrap_or(300);
        let refresh_ttl_secs = env_parse::<i64>("JWT_REFRESH_TTL_SECS")?.unwrap_or(86_400);

        if access_ttl_secs <= 0 || refresh_ttl_secs <= 0 {
            return Err("JWT token lifetimes must be greater than 0".to_string());
        }

        Ok(Self {
            secret_key,
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: DEV_SECRET_KEY.to_string(),
            access_ttl_secs: 300,
            refresh_ttl_secs: 86_400,
        }
    }
}

/// Ensure a media URL prefix starts and ends with `/`
pub fn normalize_media_url(url: &str) -> String {
    let trimmed = url.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.contains("://") {
        format!("{}/", trimmed)
    } else {
        format!("/{}/", trimmed)
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, String> {
        let media_root = PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()));
        let media_url = normalize_media_url(&env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string()));
        let max_upload_bytes = env_parse::<usize>("MAX_UPLOAD_BYTES")?.unwrap_or(50 * 1024 * 1024);

        if max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than 0".to_string());
        }

        Ok(Self {
            media_root,
            media_url,
            max_upload_bytes,
        })
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("./media"),
            media_url: "/media/".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl AdminConfig {
    /// `ADMIN_USERNAME` and `ADMIN_PASSWORD` must be set together
    fn from_env() -> Result<Option<Self>, String> {
        let username = env::var("ADMIN_USERNAME").ok().filter(|s| !s.trim().is_empty());
        let password = env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty());

        match (username, password) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => Ok(Some(Self {
                username: username.trim().to_string(),
                password,
                email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            })),
            _ => Err("ADMIN_USERNAME and ADMIN_PASSWORD must be set together".to_string()),
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        let http_port = env_parse::<u16>("HTTP_PORT")?.unwrap_or(8000);

        // DEBUG from the compose .env selects development when ENVIRONMENT is absent
        let environment = match env::var("ENVIRONMENT") {
            Ok(env) => env,
            Err(_) if env_flag("DEBUG")?.unwrap_or(false) => "development".to_string(),
            Err(_) => "production".to_string(),
        };

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["text", "json"];
        if !valid_log_formats.contains(&log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_log_formats
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        let environment = environment.to_lowercase();
        if !valid_environments.contains(&environment.as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        let auth = AuthConfig::from_env(&environment)?;
        let storage = StorageConfig::from_env()?;
        let admin = AdminConfig::from_env()?;
        let migrations_path = env::var("MIGRATIONS_PATH").unwrap_or_else(|_| "./migrations".to_string());

        Ok(Self {
            database,
            auth,
            storage,
            admin,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
            http_port,
            environment,
            migrations_path,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            admin: None,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            http_port: 8000,
            environment: "development".to_string(),
            migrations_path: "./migrations".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert_eq!(config.idle_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.http_port, 8000);
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.auth.access_ttl_secs, 300);
        assert_eq!(config.storage.media_url, "/media/");
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        assert_eq!(parse_var::<usize>("MAX_UPLOAD_BYTES", None).unwrap(), None);
        assert_eq!(
            parse_var::<usize>("MAX_UPLOAD_BYTES", Some(" 1024 ".to_string())).unwrap(),
            Some(1024)
        );

        let err = parse_var::<usize>("MAX_UPLOAD_BYTES", Some("10MB".to_string())).unwrap_err();
        assert_eq!(err, "Invalid MAX_UPLOAD_BYTES: 10MB");
        assert!(parse_var::<i64>("JWT_ACCESS_TTL_SECS", Some("five minutes".to_string())).is_err());
        assert!(parse_var::<u32>("DATABASE_MAX_CONNECTIONS", Some("-1".to_string())).is_err());
        assert!(parse_var::<u16>("HTTP_PORT", Some("70000".to_string())).is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("DEBUG", None).unwrap(), None);
        assert_eq!(parse_flag("DEBUG", Some("True".to_string())).unwrap(), Some(true));
        assert_eq!(parse_flag("DEBUG", Some("1".to_string())).unwrap(), Some(true));
        assert_eq!(parse_flag("DEBUG", Some("off".to_string())).unwrap(), Some(false));
        assert!(parse_flag("DATABASE_TEST_BEFORE_ACQUIRE", Some("maybe".to_string())).is_err());
    }

    #[test]
    fn test_normalize_media_url() {
        assert_eq!(normalize_media_url("media"), "/media/");
        assert_eq!(normalize_media_url("/media"), "/media/");
        assert_eq!(normalize_media_url("/files/uploads/"), "/files/uploads/");
        assert_eq!(normalize_media_url(""), "/");
        assert_eq!(
            normalize_media_url("https://cdn.example.com/media"),
            "https://cdn.example.com/media/"
        );
    }
}
