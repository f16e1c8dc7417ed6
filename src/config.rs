use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Remote,
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(StoreKind::Remote),
            "memory" | "mock" => Ok(StoreKind::Memory),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

// Shape of config.toml; every key is optional
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    store: Option<StoreKind>,
    instance_url: Option<String>,
    api_key: Option<String>,
    project_id: Option<u64>,
    seed: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StoreConfig {
    Remote {
        instance_url: String,
        api_key: String,
        project_id: u64,
    },
    Memory {
        seed: Option<PathBuf>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub store: StoreConfig,
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskdeck").join("config.toml"))
}

impl Config {
    /// `.env`, then the config file, then environment variables, later
    /// sources overriding earlier ones.
    pub fn load() -> Result<Config, ConfigError> {
        dotenv::dotenv().ok();

        let file = match config_path() {
            Some(path) if path.exists() => read_file(&path)?,
            _ => FileConfig::default(),
        };
        Config::resolve(file, |key| env::var(key).ok())
    }

    pub fn from_toml(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let file: FileConfig = toml::from_str(raw)?;
        Config::resolve(file, lookup)
    }

    fn resolve(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let store = match lookup("TASKDECK_STORE") {
            Some(raw) => raw.parse()?,
            None => file.store.unwrap_or_default(),
        };

        let store = match store {
            StoreKind::Memory => StoreConfig::Memory {
                seed: lookup("TASKDECK_SEED").map(PathBuf::from).or(file.seed),
            },
            StoreKind::Remote => {
                let instance_url = lookup("INSTANCE_URL")
                    .or(file.instance_url)
                    .ok_or(ConfigError::Missing("INSTANCE_URL"))?;
                let api_key = lookup("API_KEY")
                    .or(file.api_key)
                    .ok_or(ConfigError::Missing("API_KEY"))?;
                let project_id = match lookup("TASKDECK_PROJECT_ID") {
                    Some(raw) => raw
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidProjectId(raw))?,
                    None => file.project_id.unwrap_or(1),
                };
                StoreConfig::Remote {
                    instance_url,
                    api_key,
                    project_id,
                }
            }
        };

        Ok(Config { store })
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_remote_from_file() {
        let raw = r#"
            instance_url = "https://records.example.com"
            api_key = "secret"
            project_id = 7
        "#;
        let config = Config::from_toml(raw, env_of(&[])).unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Remote {
                instance_url: "https://records.example.com".into(),
                api_key: "secret".into(),
                project_id: 7,
            }
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let raw = r#"
            store = "remote"
            instance_url = "https://a.example.com"
            api_key = "file-key"
        "#;
        let config = Config::from_toml(raw, env_of(&[("API_KEY", "env-key")])).unwrap();
        match config.store {
            StoreConfig::Remote { api_key, project_id, .. } => {
                assert_eq!(api_key, "env-key");
                assert_eq!(project_id, 1);
            }
            other => panic!("unexpected store: {:?}", other),
        }
    }

    #[test]
    fn test_memory_store_needs_no_credentials() {
        let config = Config::from_toml(
            "",
            env_of(&[("TASKDECK_STORE", "memory"), ("TASKDECK_SEED", "/tmp/seed.json")]),
        )
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Memory {
                seed: Some(PathBuf::from("/tmp/seed.json"))
            }
        );
    }

    #[test]
    fn test_missing_credentials_and_bad_values() {
        assert!(matches!(
            Config::from_toml("", env_of(&[])),
            Err(ConfigError::Missing("INSTANCE_URL"))
        ));
        assert!(matches!(
            Config::from_toml("", env_of(&[("TASKDECK_STORE", "sqlite")])),
            Err(ConfigError::UnknownStore(_))
        ));
        assert!(matches!(
            Config::from_toml(
                "",
                env_of(&[
                    ("INSTANCE_URL", "http://x"),
                    ("API_KEY", "k"),
                    ("TASKDECK_PROJECT_ID", "abc")
                ])
            ),
            Err(ConfigError::InvalidProjectId(_))
        ));
    }
}
