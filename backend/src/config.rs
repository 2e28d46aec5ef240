//! Runtime configuration, read from the environment (and a `.env` file when
//! present).
//!
//! | Variable                   | Default     |
//! |----------------------------|-------------|
//! | `SITESMITH_HOST`           | `127.0.0.1` |
//! | `SITESMITH_PORT`           | `8080`      |
//! | `SITESMITH_DATA_DIR`       | `.`         |
//! | `SITESMITH_UPLOAD_LIMIT_MB`| `50`        |
//! | `SITESMITH_OPEN_BROWSER`   | `false`     |
//! | `GITHUB_TOKEN`             | unset       |
//! | `VERCEL_TOKEN`             | unset       |

use crate::error::ConfigError;
use crate::pipeline::materialize::OutputLayout;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub upload_limit_bytes: usize,
    pub open_browser: bool,
    pub github_token: Option<String>,
    pub vercel_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is the normal case outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("SITESMITH_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SITESMITH_PORT",
                    value,
                })?,
            None => 8080,
        };

        let upload_limit_mb: usize = match get("SITESMITH_UPLOAD_LIMIT_MB") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SITESMITH_UPLOAD_LIMIT_MB",
                    value,
                })?,
            None => 50,
        };

        let open_browser = match get("SITESMITH_OPEN_BROWSER") {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "SITESMITH_OPEN_BROWSER",
                        value,
                    })
                }
            },
            None => false,
        };

        Ok(Config {
            host: get("SITESMITH_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            data_dir: get("SITESMITH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            upload_limit_bytes: upload_limit_mb * 1024 * 1024,
            open_browser,
            github_token: get("GITHUB_TOKEN"),
            vercel_token: get("VERCEL_TOKEN"),
        })
    }

    pub fn layout(&self) -> OutputLayout {
        let public = self.data_dir.join("public");
        OutputLayout::new(public.join("templates"), public.join("client-previews"))
    }

    pub fn media_root(&self) -> PathBuf {
        self.data_dir.join("media")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("sitesmith.sqlite")
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config(&[]).unwrap();
        assert_eq!(config.url(), "http://127.0.0.1:8080");
        assert_eq!(config.upload_limit_bytes, 50 * 1024 * 1024);
        assert!(!config.open_browser);
        assert!(config.github_token.is_none());
        assert_eq!(
            config.layout().previews_root,
            PathBuf::from("./public/client-previews")
        );
        assert_eq!(config.database_path(), PathBuf::from("./sitesmith.sqlite"));
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("SITESMITH_HOST", "0.0.0.0"),
            ("SITESMITH_PORT", "9000"),
            ("SITESMITH_DATA_DIR", "/srv/sites"),
            ("SITESMITH_OPEN_BROWSER", "yes"),
            ("GITHUB_TOKEN", "gh"),
            ("VERCEL_TOKEN", " "),
        ])
        .unwrap();
        assert_eq!(config.url(), "http://0.0.0.0:9000");
        assert_eq!(
            config.layout().templates_root,
            PathBuf::from("/srv/sites/public/templates")
        );
        assert_eq!(config.media_root(), PathBuf::from("/srv/sites/media"));
        assert!(config.open_browser);
        assert_eq!(config.github_token.as_deref(), Some("gh"));
        assert!(config.vercel_token.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            config(&[("SITESMITH_PORT", "eighty")]),
            Err(ConfigError::InvalidValue {
                key: "SITESMITH_PORT",
                ..
            })
        ));
        assert!(config(&[("SITESMITH_OPEN_BROWSER", "maybe")]).is_err());
    }
}
