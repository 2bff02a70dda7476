use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "lifedesk")]
#[command(about = "Runs the lifedesk service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// Overrides `app.port` from the config file.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lifedesk")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    pub static_dir: Option<String>,
}

fn default_database() -> String {
    "lifedesk.db".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for App {
    fn default() -> Self {
        App {
            database: default_database(),
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    /// Loads the config at `path`. A missing file is only tolerated when
    /// `required` is false, in which case defaults are used.
    pub fn new(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            tracing::warn!(path = ?path, "config file not found, using defaults");
            return Ok(Config::default());
        }
        Config::load_config(path)
    }

    fn load_config(path: &Path) -> Result<Config> {
        let yaml_str =
            fs::read_to_string(path).with_context(|| format!("failed to read config file {:?}", path))?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str);
        if yaml_with_env.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    /// Expands `${VAR}` and `${VAR:-default}` placeholders.
    fn substitute_env_vars(yaml_str: &str) -> String {
        let mut result = String::with_capacity(yaml_str.len());
        let mut rest = yaml_str;

        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            result.push_str(&rest[..start]);

            let placeholder = &rest[start + 2..start + len];
            let value = match placeholder.split_once(":-") {
                Some((var, default)) => env::var(var).unwrap_or_else(|_| default.to_string()),
                None => env::var(placeholder).unwrap_or_else(|_| {
                    tracing::warn!(var = placeholder, "environment variable not found");
                    String::new()
                }),
            };
            result.push_str(&value);
            rest = &rest[start + len + 1..];
        }

        result.push_str(rest);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_app_section_missing() {
        let cfg = Config::from_yaml("{}").unwrap();
        assert_eq!(cfg.app.get_db(), "lifedesk.db");
        assert_eq!(cfg.app.address(), "127.0.0.1:3001");
        assert!(cfg.app.static_dir.is_none());
    }

    #[test]
    fn test_partial_app_section() {
        let cfg = Config::from_yaml("app:\n  port: 8080\n  static_dir: ./web\n").unwrap();
        assert_eq!(cfg.app.get_port(), 8080);
        assert_eq!(cfg.app.get_host(), "127.0.0.1");
        assert_eq!(cfg.app.static_dir.as_deref(), Some("./web"));
    }

    #[test]
    fn test_env_default_substitution() {
        let yaml = "app:\n  database: ${LIFEDESK_TEST_SURELY_UNSET_DB:-planner.db}\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_db(), "planner.db");
    }

    #[test]
    fn test_unset_variable_expands_to_empty() {
        let out = Config::substitute_env_vars("a: '${LIFEDESK_TEST_SURELY_UNSET}'");
        assert_eq!(out, "a: ''");
    }

    #[test]
    fn test_unterminated_placeholder_left_alone() {
        let out = Config::substitute_env_vars("a: ${OOPS");
        assert_eq!(out, "a: ${OOPS");
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = Config::new(&dir.path().join("config.yaml"), false).unwrap();
        assert_eq!(cfg.app.get_port(), 3001);
    }

    #[test]
    fn test_missing_required_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(Config::new(&dir.path().join("config.yaml"), true).is_err());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "").unwrap();
        let cfg = Config::new(&path, true).unwrap();
        assert_eq!(cfg.app.get_db(), "lifedesk.db");
    }
}
