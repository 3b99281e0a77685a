//! Run settings
//!
//! Settings come from an optional TOML file, then command-line flags and
//! environment variables; later sources win. The resolved [`Settings`]
//! value is passed explicitly to the store and the driver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use remodel_engine::{RenameRule, RuleError};
use remodel_store::{ExecutionMode, HttpStoreConfig, RunConfig};
use serde::Deserialize;

/// API root used when none is configured
pub(crate) const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

/// Configuration errors; reported with exit status 2
#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    /// Config file could not be read
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this tool
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A required setting was not given anywhere
    #[error("missing setting '{0}' (flag, environment variable or config file)")]
    Missing(&'static str),

    /// Old/new model names are not a usable rule
    #[error("invalid rename rule: {0}")]
    Rule(#[from] RuleError),

    /// API key cannot be sent in a request header
    #[error("invalid setting 'api_key': contains characters not allowed in a header")]
    InvalidApiKey,
}

/// Settings as given by one source; every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PartialSettings {
    pub(crate) api_url: Option<String>,
    pub(crate) project_uuid: Option<String>,
    pub(crate) api_key: Option<String>,
    pub(crate) old_model: Option<String>,
    pub(crate) new_model: Option<String>,
    pub(crate) apply: Option<bool>,
    pub(crate) concurrency: Option<usize>,
    pub(crate) timeout_secs: Option<u64>,
    pub(crate) verbose: Option<bool>,
}

impl PartialSettings {
    /// Read a TOML config file
    ///
    /// # Errors
    /// `ConfigError::Read` or `ConfigError::Parse`
    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Layer `overrides` on top of `self`
    #[must_use]
    pub(crate) fn merge(self, overrides: Self) -> Self {
        Self {
            api_url: overrides.api_url.or(self.api_url),
            project_uuid: overrides.project_uuid.or(self.project_uuid),
            api_key: overrides.api_key.or(self.api_key),
            old_model: overrides.old_model.or(self.old_model),
            new_model: overrides.new_model.or(self.new_model),
            apply: overrides.apply.or(self.apply),
            concurrency: overrides.concurrency.or(self.concurrency),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            verbose: overrides.verbose.or(self.verbose),
        }
    }

    /// Resolve into complete settings
    ///
    /// # Errors
    /// - `ConfigError::Missing` for an absent project, api key or model name
    /// - `ConfigError::Rule` for an unusable rename rule
    pub(crate) fn resolve(self) -> Result<Settings, ConfigError> {
        let old = self.old_model.ok_or(ConfigError::Missing("old_model"))?;
        let new = self.new_model.ok_or(ConfigError::Missing("new_model"))?;
        let rule = RenameRule::new(old, new)?;

        let project_uuid = self.project_uuid.ok_or(ConfigError::Missing("project_uuid"))?;
        let api_key = self.api_key.ok_or(ConfigError::Missing("api_key"))?;
        let api_url = self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let mut store = HttpStoreConfig::new(api_url, project_uuid, api_key);
        if let Some(secs) = self.timeout_secs {
            store = store.with_timeout(Duration::from_secs(secs));
        }

        let verbose = self.verbose.unwrap_or(false);
        let mut run = RunConfig::new(rule)
            .with_mode(ExecutionMode::from_apply(self.apply.unwrap_or(false)))
            .with_diffs(verbose);
        if let Some(n) = self.concurrency {
            run = run.with_max_concurrency(n);
        }

        Ok(Settings {
            store,
            run,
            verbose,
        })
    }
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    /// Where charts live
    pub(crate) store: HttpStoreConfig,
    /// What to rename and how
    pub(crate) run: RunConfig,
    /// Print before/after documents of changed charts
    pub(crate) verbose: bool,
}
