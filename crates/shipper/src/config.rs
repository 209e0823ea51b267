//! Configuration for the shipper process.
//!
//! Priority: Environment Variables > Config File > Defaults. The
//! environment keys mirror what the deployment provides (`DB_*`,
//! `ACCESS_LOG_PATH`, `ERROR_LOG_PATH`); the TOML form exists for
//! installations that prefer a file.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipperConfig {
    pub db: DbConfig,
    /// Path pattern of the access log; the directory portion is watched.
    pub access_log_path: String,
    /// Path pattern of the error log; the directory portion is watched.
    pub error_log_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl ShipperConfig {
    /// Load configuration from file or environment variables.
    ///
    /// Environment variables always override config file settings.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("SHIPPER_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/logship/shipper.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!(
                "Config file not found at {}, using environment variables",
                config_path
            );
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from TOML file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: ShipperConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("DB_HOST") {
            self.db.host = host;
        }
        if let Ok(port) = std::env::var("DB_PORT") {
            if let Ok(port) = port.parse() {
                self.db.port = port;
            }
        }
        if let Ok(name) = std::env::var("DB_NAME") {
            self.db.name = name;
        }
        if let Ok(user) = std::env::var("DB_USER") {
            self.db.user = user;
        }
        if let Ok(password) = std::env::var("DB_PASSWORD") {
            self.db.password = password;
        }
        if let Ok(path) = std::env::var("ACCESS_LOG_PATH") {
            self.access_log_path = path;
        }
        if let Ok(path) = std::env::var("ERROR_LOG_PATH") {
            self.error_log_path = path;
        }
    }

    /// Validate configuration values (no I/O; missing directories surface
    /// when the watch is registered).
    pub fn validate(&self) -> Result<(), String> {
        if self.db.host.is_empty() {
            return Err("db.host must not be empty".to_string());
        }
        if self.db.name.is_empty() {
            return Err("db.name must not be empty".to_string());
        }
        if self.access_log_path.is_empty() {
            return Err("access_log_path must not be empty".to_string());
        }
        if self.error_log_path.is_empty() {
            return Err("error_log_path must not be empty".to_string());
        }
        Ok(())
    }

    /// Deduplicated directories to watch: the directory portion of each
    /// configured log path pattern.
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut dirs = Vec::new();
        for path in [&self.access_log_path, &self.error_log_path] {
            let dir = Path::new(path)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            if seen.insert(dir.clone()) {
                dirs.push(dir);
            }
        }
        dirs
    }
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            access_log_path: "/var/log/nginx/*-access.log".to_string(),
            error_log_path: "/var/log/nginx/*-error.log".to_string(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            name: "nginx_logs".to_string(),
            user: "loguser".to_string(),
            password: "securepassword".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ShipperConfig::default();
        assert_eq!(config.db.host, "localhost");
        assert_eq!(config.db.port, 3306);
        assert_eq!(config.db.name, "nginx_logs");
        assert_eq!(config.access_log_path, "/var/log/nginx/*-access.log");
    }

    #[test]
    fn test_validate_empty_host() {
        let mut config = ShipperConfig::default();
        config.db.host = String::new();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("db.host"));
    }

    #[test]
    fn test_validate_empty_log_path() {
        let mut config = ShipperConfig::default();
        config.error_log_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watch_dirs_deduplicates_shared_directory() {
        let config = ShipperConfig::default();
        let dirs = config.watch_dirs();
        assert_eq!(dirs, vec![PathBuf::from("/var/log/nginx")]);
    }

    #[test]
    fn test_watch_dirs_distinct_directories() {
        let config = ShipperConfig {
            access_log_path: "/srv/a/access.log".to_string(),
            error_log_path: "/srv/b/error.log".to_string(),
            ..ShipperConfig::default()
        };
        let dirs = config.watch_dirs();
        assert_eq!(
            dirs,
            vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
        );
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            access_log_path = "/srv/logs/access.log"

            [db]
            host = "db.internal"
            port = 3307
        "#;
        let config: ShipperConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.db.host, "db.internal");
        assert_eq!(config.db.port, 3307);
        // Unspecified keys fall back to defaults.
        assert_eq!(config.db.name, "nginx_logs");
        assert_eq!(config.error_log_path, "/var/log/nginx/*-error.log");
    }
}
