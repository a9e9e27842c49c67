use crate::constants::{
    DEFAULT_API_URL, SCW_ACCESS_KEY, SCW_API_URL, SCW_CONFIG_PATH, SCW_DEFAULT_PROJECT_ID, SCW_DEFAULT_REGION,
    SCW_DEFAULT_ZONE, SCW_ORGANIZATION, SCW_PROFILE, SCW_REGION, SCW_SECRET_KEY, SCW_TOKEN,
};
use crate::errors::{ProviderError, ProviderResult};
use crate::locality::{ScwRegion, ScwZone};
use derivative::Derivative;
use serde_derive::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use strum_macros::Display;

/// ProviderConfig: provider level settings, resolved once per session and never modified afterwards.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct ProviderConfig {
    pub access_key: Option<String>,
    #[derivative(Debug = "ignore")]
    pub secret_key: Option<String>,
    pub default_project_id: Option<String>,
    pub default_region: ScwRegion,
    pub default_zone: ScwZone,
    pub api_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            access_key: None,
            secret_key: None,
            default_project_id: None,
            default_region: ScwRegion::Paris,
            default_zone: ScwRegion::Paris.default_zone(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Values set explicitly in the provider block of the host.
#[derive(Derivative, Clone, Default)]
#[derivative(Debug)]
pub struct ExplicitConfig {
    pub access_key: Option<String>,
    #[derivative(Debug = "ignore")]
    pub secret_key: Option<String>,
    pub project_id: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConfigSource {
    Explicit,
    Environment,
    LegacyEnvironment,
    ConfigFile,
    LegacyConfigFile,
}

impl ConfigSource {
    fn is_deprecated(&self) -> bool {
        matches!(self, ConfigSource::LegacyEnvironment | ConfigSource::LegacyConfigFile)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct ConfigFileProfile {
    access_key: Option<String>,
    secret_key: Option<String>,
    default_project_id: Option<String>,
    default_region: Option<String>,
    default_zone: Option<String>,
    api_url: Option<String>,
}

impl ConfigFileProfile {
    /// Fields of `self` win over the ones of `fallback`.
    fn merge(self, fallback: ConfigFileProfile) -> ConfigFileProfile {
        ConfigFileProfile {
            access_key: self.access_key.or(fallback.access_key),
            secret_key: self.secret_key.or(fallback.secret_key),
            default_project_id: self.default_project_id.or(fallback.default_project_id),
            default_region: self.default_region.or(fallback.default_region),
            default_zone: self.default_zone.or(fallback.default_zone),
            api_url: self.api_url.or(fallback.api_url),
        }
    }
}

/// `config.yaml` of the Scaleway tooling, top level values plus named profiles.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(flatten)]
    default_profile: ConfigFileProfile,
    active_profile: Option<String>,
    #[serde(default)]
    profiles: HashMap<String, ConfigFileProfile>,
}

/// `~/.scwrc` of the deprecated CLI.
#[derive(Debug, Default, Deserialize)]
struct LegacyConfigFile {
    token: Option<String>,
    organization: Option<String>,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// ConfigLoader: resolves each setting with the precedence explicit value, environment variable,
/// deprecated environment variable, config file, deprecated config file.
pub struct ConfigLoader {
    env: EnvLookup,
    config_path: Option<PathBuf>,
    legacy_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn from_process_env() -> Self {
        ConfigLoader::with_env(|key| std::env::var(key).ok())
    }

    pub fn with_env(env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        ConfigLoader {
            env: Box::new(env),
            config_path: None,
            legacy_config_path: None,
        }
    }

    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn with_legacy_config_path(mut self, path: PathBuf) -> Self {
        self.legacy_config_path = Some(path);
        self
    }

    fn var(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|v| !v.trim().is_empty())
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.config_path
            .clone()
            .or_else(|| self.var(SCW_CONFIG_PATH).map(PathBuf::from))
            .or_else(|| dirs::config_dir().map(|dir| dir.join("scw").join("config.yaml")))
    }

    fn legacy_config_path(&self) -> Option<PathBuf> {
        self.legacy_config_path
            .clone()
            .or_else(|| dirs::home_dir().map(|dir| dir.join(".scwrc")))
    }

    /// Active profile of the config file. Missing, unreadable or invalid files are ignored.
    fn read_config_file(&self) -> ConfigFileProfile {
        let path = match self.config_path() {
            Some(path) if path.exists() => path,
            _ => return ConfigFileProfile::default(),
        };

        let config_file: ConfigFile = match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_yaml::from_str(&content).map_err(|e| e.to_string()))
        {
            Ok(config_file) => config_file,
            Err(e) => {
                warn!("ignoring Scaleway config file `{}`: {}", path.display(), e);
                return ConfigFileProfile::default();
            }
        };

        let profile_name = self.var(SCW_PROFILE).or(config_file.active_profile);
        match profile_name {
            Some(name) => match config_file.profiles.get(&name) {
                Some(profile) => profile.clone().merge(config_file.default_profile),
                None => {
                    warn!("profile `{}` not found in `{}`, using top level values", name, path.display());
                    config_file.default_profile
                }
            },
            None => config_file.default_profile,
        }
    }

    fn read_legacy_config_file(&self) -> LegacyConfigFile {
        let path = match self.legacy_config_path() {
            Some(path) if path.exists() => path,
            _ => return LegacyConfigFile::default(),
        };

        match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
        {
            Ok(legacy) => legacy,
            Err(e) => {
                warn!("ignoring legacy Scaleway config file `{}`: {}", path.display(), e);
                LegacyConfigFile::default()
            }
        }
    }

    pub fn load(&self, explicit: &ExplicitConfig) -> ProviderResult<ProviderConfig> {
        let file = self.read_config_file();
        let legacy_file = self.read_legacy_config_file();

        let access_key = resolve(
            "access_key",
            vec![
                (ConfigSource::Explicit, explicit.access_key.clone()),
                (ConfigSource::Environment, self.var(SCW_ACCESS_KEY)),
                (ConfigSource::ConfigFile, file.access_key),
            ],
        );
        let secret_key = resolve(
            "secret_key",
            vec![
                (ConfigSource::Explicit, explicit.secret_key.clone()),
                (ConfigSource::Environment, self.var(SCW_SECRET_KEY)),
                (ConfigSource::LegacyEnvironment, self.var(SCW_TOKEN)),
                (ConfigSource::ConfigFile, file.secret_key),
                (ConfigSource::LegacyConfigFile, legacy_file.token),
            ],
        );
        let default_project_id = resolve(
            "project_id",
            vec![
                (ConfigSource::Explicit, explicit.project_id.clone()),
                (ConfigSource::Environment, self.var(SCW_DEFAULT_PROJECT_ID)),
                (ConfigSource::LegacyEnvironment, self.var(SCW_ORGANIZATION)),
                (ConfigSource::ConfigFile, file.default_project_id),
                (ConfigSource::LegacyConfigFile, legacy_file.organization),
            ],
        );
        let region = resolve(
            "region",
            vec![
                (ConfigSource::Explicit, explicit.region.clone()),
                (ConfigSource::Environment, self.var(SCW_DEFAULT_REGION)),
                (ConfigSource::LegacyEnvironment, self.var(SCW_REGION)),
                (ConfigSource::ConfigFile, file.default_region),
            ],
        );
        let zone = resolve(
            "zone",
            vec![
                (ConfigSource::Explicit, explicit.zone.clone()),
                (ConfigSource::Environment, self.var(SCW_DEFAULT_ZONE)),
                (ConfigSource::ConfigFile, file.default_zone),
            ],
        );
        let api_url = resolve(
            "api_url",
            vec![
                (ConfigSource::Explicit, explicit.api_url.clone()),
                (ConfigSource::Environment, self.var(SCW_API_URL)),
                (ConfigSource::ConfigFile, file.api_url),
            ],
        );

        let default_region = match region {
            Some(region) => ScwRegion::from_str(&region)
                .map_err(|e| ProviderError::new_invalid_configuration(&e.to_string()))?,
            None => ScwRegion::Paris,
        };
        let default_zone = match zone {
            Some(zone) => {
                ScwZone::from_str(&zone).map_err(|e| ProviderError::new_invalid_configuration(&e.to_string()))?
            }
            None => default_region.default_zone(),
        };

        Ok(ProviderConfig {
            access_key,
            secret_key,
            default_project_id,
            default_region,
            default_zone,
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }
}

/// First set value among `candidates`, in order. A deprecated source winning is logged.
fn resolve(field: &str, candidates: Vec<(ConfigSource, Option<String>)>) -> Option<String> {
    candidates.into_iter().find_map(|(source, value)| {
        let value = value.filter(|v| !v.trim().is_empty())?;
        if source.is_deprecated() {
            warn!(
                "`{}` is read from a deprecated {} source, please migrate to the SCW_* variables or to the config file",
                field, source
            );
        }
        debug!("`{}` is read from {}", field, source);
        Some(value)
    })
}
