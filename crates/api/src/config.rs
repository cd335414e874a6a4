//! Application configuration

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub public_url: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Attachment storage
    pub upload_dir: String,

    // CORS
    pub allowed_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Attachment storage
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),

            // CORS
            allowed_origin: env::var("ALLOWED_ORIGIN").ok(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (they modify shared env vars)
    static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_from_env() {
        let _lock = CONFIG_TEST_MUTEX.lock().unwrap();

        // === Missing DATABASE_URL fails ===
        env::remove_var("DATABASE_URL");
        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));

        // === Defaults applied when only DATABASE_URL is set ===
        env::set_var("DATABASE_URL", "postgres://test");
        env::remove_var("BIND_ADDRESS");
        env::remove_var("UPLOAD_DIR");
        env::remove_var("DATABASE_MAX_CONNECTIONS");
        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.upload_dir, "./uploads");
        assert_eq!(config.database_max_connections, 10);

        // === Unparseable pool size falls back to the default ===
        env::set_var("DATABASE_MAX_CONNECTIONS", "not-a-number");
        let config = Config::from_env().unwrap();
        assert_eq!(config.database_max_connections, 10);

        env::remove_var("DATABASE_URL");
        env::remove_var("DATABASE_MAX_CONNECTIONS");
    }
}
