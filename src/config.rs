//! YAML configuration for the database and every crawled site.
//!
//! ```yaml
//! database:
//!   path: novels.db
//! sites:
//!   example:
//!     urls:
//!       book: https://example.com/book/{id}/
//!       chapter_list: https://example.com/book/{id}/index.html
//!     storage_dir: books/example
//!     selectors:
//!       title: h1
//!       # ...
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::client::{ClientConfig, RetryKind};
use crate::parser::SelectorConfig;

/// Placeholder replaced by the book id in URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

const DEFAULT_DATABASE_PATH: &str = "novelcrawl.db";
const DEFAULT_STORAGE_DIR: &str = "books";
const DEFAULT_BACKUP_DIR: &str = "backup";
const DEFAULT_MAX_WORKERS: usize = 10;
const DEFAULT_MAX_DOWNLOAD_CONCURRENCY: usize = 3;
const DEFAULT_MAX_EXPLORE_ERROR: usize = 1000;
const DEFAULT_END_STALENESS_DAYS: u32 = 365;
const DEFAULT_MAX_FAILED_CHAPTERS: usize = 50;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for [`Config`].
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A value is outside its allowed range.
    #[error("Invalid config value for `{field}` in site `{site}`: {reason}")]
    Invalid {
        site: String,
        field: String,
        reason: String,
    },

    /// No site section is present.
    #[error("config defines no sites")]
    NoSites,
}

impl ConfigError {
    fn invalid(site: &str, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            site: site.to_string(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseOptions,
    #[serde(default)]
    pub sites: BTreeMap<String, SiteConfig>,
}

impl Config {
    /// Reads, parses and validates a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or a
    /// value fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every site section.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::NoSites);
        }
        for (name, site) in &self.sites {
            site.validate(name)?;
        }
        Ok(())
    }

    /// Looks up one site section by name.
    #[must_use]
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.get(name)
    }
}

/// Database location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    pub path: PathBuf,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

/// URL templates of one site. `{id}` is replaced by the book id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteUrls {
    /// Book info page.
    pub book: String,
    /// Chapter index page. Relative chapter links resolve against it.
    pub chapter_list: String,
    /// Prefix for root-relative chapter links (`/...`). When empty, links are
    /// resolved against the chapter index url.
    pub chapter_prefix: String,
    /// Page fetched by the availability check.
    pub availability: String,
}

impl SiteUrls {
    #[must_use]
    pub fn book_url(&self, id: i64) -> String {
        fill_template(&self.book, id)
    }

    #[must_use]
    pub fn chapter_list_url(&self, id: i64) -> String {
        fill_template(&self.chapter_list, id)
    }
}

fn fill_template(template: &str, id: i64) -> String {
    template.replace(ID_PLACEHOLDER, &id.to_string())
}

/// Everything needed to crawl one site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub urls: SiteUrls,
    /// Directory holding the downloaded text files.
    pub storage_dir: PathBuf,
    /// Directory receiving database snapshots.
    pub backup_dir: PathBuf,
    pub selectors: SelectorConfig,
    pub client: ClientConfig,
    /// Worker permits for per-book batches.
    pub max_workers: usize,
    /// Books downloaded at the same time.
    pub max_download_concurrency: usize,
    /// Consecutive failures that end an explore run.
    pub max_explore_error: usize,
    /// Books not updated for this many days are considered finished.
    pub end_staleness_days: u32,
    /// A download is discarded when more chapters than this fail, or when
    /// more than a tenth of them fail.
    pub max_failed_chapters: usize,
    /// Text the availability page must contain.
    pub availability_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            urls: SiteUrls::default(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            selectors: SelectorConfig::default(),
            client: ClientConfig::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            max_download_concurrency: DEFAULT_MAX_DOWNLOAD_CONCURRENCY,
            max_explore_error: DEFAULT_MAX_EXPLORE_ERROR,
            end_staleness_days: DEFAULT_END_STALENESS_DAYS,
            max_failed_chapters: DEFAULT_MAX_FAILED_CHAPTERS,
            availability_marker: String::new(),
        }
    }
}

impl SiteConfig {
    /// Validates ranges and required values for the site called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        validate_template(name, "urls.book", &self.urls.book)?;
        validate_template(name, "urls.chapter_list", &self.urls.chapter_list)?;

        validate_range(name, "max_workers", self.max_workers, 1, 100)?;
        validate_range(
            name,
            "max_download_concurrency",
            self.max_download_concurrency,
            1,
            100,
        )?;
        validate_range(name, "max_explore_error", self.max_explore_error, 1, usize::MAX)?;
        if self.end_staleness_days == 0 {
            return Err(ConfigError::invalid(
                name,
                "end_staleness_days",
                "must be at least 1",
            ));
        }

        self.validate_client(name)
    }

    fn validate_client(&self, name: &str) -> Result<(), ConfigError> {
        let client = &self.client;
        if !(1..=3600).contains(&client.timeout_secs) {
            return Err(ConfigError::invalid(
                name,
                "client.timeout_secs",
                format!("{}. Expected range: 1..=3600", client.timeout_secs),
            ));
        }
        validate_range(name, "client.max_concurrency", client.max_concurrency, 1, 1000)?;

        let breaker = &client.circuit_breaker;
        if breaker.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                name,
                "client.circuit_breaker.failure_threshold",
                "must be at least 1",
            ));
        }
        if breaker.cooldown_secs == 0 {
            return Err(ConfigError::invalid(
                name,
                "client.circuit_breaker.cooldown_secs",
                "must be at least 1",
            ));
        }

        let retry = &client.retry;
        if retry.max_retry_weight == 0 {
            return Err(ConfigError::invalid(
                name,
                "client.retry.max_retry_weight",
                "must be at least 1",
            ));
        }
        for (index, condition) in retry.conditions.iter().enumerate() {
            let field = |suffix: &str| format!("client.retry.conditions[{index}].{suffix}");
            if condition.weight == 0 {
                return Err(ConfigError::invalid(name, field("weight"), "must be at least 1"));
            }
            if condition.pause_base_secs == 0 {
                return Err(ConfigError::invalid(
                    name,
                    field("pause_base_secs"),
                    "must be at least 1",
                ));
            }
            match condition.kind {
                RetryKind::StatusCode if condition.codes.is_empty() => {
                    return Err(ConfigError::invalid(
                        name,
                        field("codes"),
                        "status_code conditions need at least one code",
                    ));
                }
                RetryKind::BodyContains if condition.text.is_empty() => {
                    return Err(ConfigError::invalid(
                        name,
                        field("text"),
                        "body_contains conditions need non-empty text",
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn validate_template(site: &str, field: &str, template: &str) -> Result<(), ConfigError> {
    if template.is_empty() {
        return Err(ConfigError::invalid(site, field, "must not be empty"));
    }
    if !template.contains(ID_PLACEHOLDER) {
        return Err(ConfigError::invalid(
            site,
            field,
            format!("must contain the {ID_PLACEHOLDER} placeholder"),
        ));
    }
    Ok(())
}

fn validate_range(
    site: &str,
    field: &str,
    value: usize,
    min: usize,
    max: usize,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else if max == usize::MAX {
        Err(ConfigError::invalid(
            site,
            field,
            format!("{value}. Expected at least {min}"),
        ))
    } else {
        Err(ConfigError::invalid(
            site,
            field,
            format!("{value}. Expected range: {min}..={max}"),
        ))
    }
}
