//! # Configuration du client SOAP
//!
//! Values are resolved in this order, later ones winning:
//! 1. the embedded default (`pmosoap.yaml`)
//! 2. a YAML file, given explicitly or through `PMOSOAP_CONFIG`
//! 3. `PMOSOAP_CONFIG__<SECTION>__<KEY>` environment variables
//!
//! ```no_run
//! use pmosoap::ClientConfig;
//!
//! let config = ClientConfig::load(None)?;
//! println!("WSDL: {}", config.wsdl_url);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::Path;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmosoap.yaml");

const ENV_CONFIG_FILE: &str = "PMOSOAP_CONFIG";
const ENV_PREFIX: &str = "PMOSOAP_CONFIG__";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WSDL_TIMEOUT_SECS: u64 = 5;
const DEFAULT_USER_AGENT: &str = "pmosoap/0.1";

/// Paramètres du client SOAP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL du document WSDL
    pub wsdl_url: String,

    /// Timeout global d'un appel SOAP, en secondes
    pub timeout_secs: u64,

    /// Timeout du téléchargement du WSDL, en secondes
    pub wsdl_timeout_secs: u64,

    /// En-tête User-Agent des requêtes SOAP
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            wsdl_url: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            wsdl_timeout_secs: DEFAULT_WSDL_TIMEOUT_SECS,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    client: ClientConfig,
}

impl ClientConfig {
    pub fn new(wsdl_url: impl Into<String>) -> Self {
        Self {
            wsdl_url: wsdl_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn wsdl_timeout(&self) -> Duration {
        Duration::from_secs(self.wsdl_timeout_secs)
    }

    /// Charge la configuration (défaut + fichier + environnement).
    ///
    /// `path` wins over the `PMOSOAP_CONFIG` variable. A missing file is not
    /// an error: the embedded default is used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| env::var(ENV_CONFIG_FILE).ok());

        let external = match &path {
            Some(path) => match fs::read_to_string(path) {
                Ok(yaml) => {
                    info!(config_file = %path, "Loaded config file");
                    Some(yaml)
                }
                Err(_) => {
                    info!(config_file = %path, "Config file not found, using default embedded config");
                    None
                }
            },
            None => None,
        };

        Self::resolve(external.as_deref(), env::vars())
    }

    /// Parse un YAML fusionné avec la configuration par défaut, sans environnement.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::resolve(Some(yaml), std::iter::empty())
    }

    fn resolve(
        external: Option<&str>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        if let Some(yaml) = external {
            let external_value: Value =
                serde_yaml::from_str(yaml).context("Invalid YAML configuration")?;
            merge_yaml(&mut value, &external_value);
        }

        let mut value = lower_keys_value(value);
        apply_overrides(&mut value, vars);

        let file: ConfigFile = serde_yaml::from_value(value)?;
        Ok(file.client)
    }
}

fn apply_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let key_path = stripped.split("__").collect::<Vec<_>>();
            let yaml_value = convert_env_value(&value);
            if let Err(err) = set_value(config, &key_path, yaml_value) {
                warn!(variable = %key, error = %err, "Ignoring configuration override");
            }
        }
    }
}

fn set_value(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    if let Value::Mapping(map) = data {
        let key_value = Value::String(path[0].to_lowercase());
        if path.len() == 1 {
            map.insert(key_value, value);
        } else {
            let entry = map
                .entry(key_value)
                .or_insert(Value::Mapping(Mapping::new()));
            set_value(entry, &path[1..], value)?;
        }
        Ok(())
    } else {
        Err(anyhow!("Current node is not a map"))
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| match k {
                    Value::String(s) => (Value::String(s.to_lowercase()), lower_keys_value(v)),
                    k => (k, lower_keys_value(v)),
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_embedded_default() {
        let config = ClientConfig::resolve(None, Vec::new()).unwrap();
        assert_eq!(config.wsdl_url, "");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.wsdl_timeout(), Duration::from_secs(5));
        assert_eq!(config.user_agent.as_deref(), Some("pmosoap/0.1"));
    }

    #[test]
    fn test_file_overrides_default() {
        let config = ClientConfig::from_yaml_str(
            "client:\n  wsdl_url: http://example.com/svc?wsdl\n  timeout_secs: 12\n",
        )
        .unwrap();
        assert_eq!(config.wsdl_url, "http://example.com/svc?wsdl");
        assert_eq!(config.timeout(), Duration::from_secs(12));
        assert_eq!(config.wsdl_timeout_secs, 5);
    }

    #[test]
    fn test_env_overrides_file() {
        let config = ClientConfig::resolve(
            Some("client:\n  timeout_secs: 12\n"),
            vars(&[
                ("PMOSOAP_CONFIG__CLIENT__TIMEOUT_SECS", "3"),
                ("PMOSOAP_CONFIG__CLIENT__WSDL_URL", "http://other/wsdl"),
                ("UNRELATED", "x"),
            ]),
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.wsdl_url, "http://other/wsdl");
    }

    #[test]
    fn test_embedded_default_matches_default_impl() {
        let loaded = ClientConfig::resolve(None, Vec::new()).unwrap();
        assert_eq!(loaded, ClientConfig::default());
        assert_eq!(
            ClientConfig::new("http://example.com/svc?wsdl").user_agent,
            loaded.user_agent
        );
    }

    #[test]
    fn test_override_through_scalar_is_ignored() {
        let config = ClientConfig::resolve(
            None,
            vars(&[
                ("PMOSOAP_CONFIG__CLIENT__TIMEOUT_SECS__NESTED", "3"),
                ("PMOSOAP_CONFIG__CLIENT__WSDL_TIMEOUT_SECS", "9"),
            ]),
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.wsdl_timeout_secs, 9);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(ClientConfig::from_yaml_str("client: [unclosed").is_err());
    }
}
