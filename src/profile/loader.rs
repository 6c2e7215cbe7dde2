use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, ensure};
use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use super::ProfileStore;

/// Where the profile document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    Http(Url),
    File(PathBuf),
}

impl Display for ProfileSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for ProfileSource {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        ensure!(!value.is_empty(), "profile data source cannot be empty");

        let lowered = value.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            let url = Url::parse(value)
                .with_context(|| format!("invalid profile data URL `{value}`"))?;
            return Ok(Self::Http(url));
        }

        Ok(Self::File(PathBuf::from(value)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileLoadError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("profile source `{url}` returned HTTP {status}")]
    HttpStatus { url: Url, status: StatusCode },

    #[error("failed to read profile file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed profile document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result of one profile fetch. Failures are values so callers can observe
/// them without the widget ever raising.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(ProfileStore),
    Failed(ProfileLoadError),
}

impl LoadOutcome {
    /// Interprets a raw response body the same way a fetched one is.
    pub fn from_payload(raw: &str) -> Self {
        match ProfileStore::from_json_str(raw) {
            Ok(store) => Self::Loaded(store),
            Err(error) => Self::Failed(error.into()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Loaded(_) => "loaded",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileLoader {
    http_client: reqwest::Client,
    source: ProfileSource,
}

impl ProfileLoader {
    pub fn new(source: ProfileSource) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            source,
        }
    }

    /// Fetches the whole document once. No retry and no timeout.
    pub async fn load(&self) -> LoadOutcome {
        match self.fetch().await {
            Ok(store) => {
                info!(source = %self.source, roles = store.len(), "profile document loaded");
                LoadOutcome::Loaded(store)
            }
            Err(error) => {
                warn!(source = %self.source, error = %error, "profile document unavailable");
                LoadOutcome::Failed(error)
            }
        }
    }

    async fn fetch(&self) -> Result<ProfileStore, ProfileLoadError> {
        let raw = match &self.source {
            ProfileSource::Http(url) => self.fetch_http(url).await?,
            ProfileSource::File(path) => {
                debug!(path = %path.display(), "reading profile document");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ProfileLoadError::Read {
                        path: path.clone(),
                        source,
                    })?
            }
        };

        Ok(ProfileStore::from_json_str(&raw)?)
    }

    async fn fetch_http(&self, url: &Url) -> Result<String, ProfileLoadError> {
        debug!(url = %url, "requesting profile document");
        let response = self.http_client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProfileLoadError::HttpStatus {
                url: url.clone(),
                status,
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::role::RoleKey;
    use crate::test_support::{SAMPLE_PROFILES_JSON, remove_dir_if_exists, temp_path};

    use super::*;

    #[test]
    fn source_parses_urls_and_paths() {
        let http = "https://example.com/data/profiles.json"
            .parse::<ProfileSource>()
            .expect("URL source should parse");
        assert!(matches!(http, ProfileSource::Http(_)));

        let file = " data/profiles.json "
            .parse::<ProfileSource>()
            .expect("path source should parse");
        assert_eq!(
            file,
            ProfileSource::File(PathBuf::from("data/profiles.json"))
        );

        assert!("   ".parse::<ProfileSource>().is_err());
        assert!("http://".parse::<ProfileSource>().is_err());
    }

    #[test]
    fn payload_outcome_reports_malformed_documents() {
        assert!(LoadOutcome::from_payload(SAMPLE_PROFILES_JSON).is_loaded());

        let outcome = LoadOutcome::from_payload("{not json");
        assert_eq!(outcome.label(), "failed");
        assert!(matches!(
            outcome,
            LoadOutcome::Failed(ProfileLoadError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn file_source_loads_the_whole_document() {
        let dir = temp_path("loader-file");
        fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join("profiles.json");
        fs::write(&path, SAMPLE_PROFILES_JSON).expect("fixture should be writable");

        let outcome = ProfileLoader::new(ProfileSource::File(path)).load().await;
        let LoadOutcome::Loaded(store) = outcome else {
            panic!("expected loaded outcome");
        };
        assert_eq!(store.len(), 2);
        assert!(store.record_for(&RoleKey::from("citizen")).is_some());

        remove_dir_if_exists(&dir);
    }

    #[tokio::test]
    async fn missing_file_is_a_failed_outcome() {
        let path = temp_path("loader-missing").join("profiles.json");
        let outcome = ProfileLoader::new(ProfileSource::File(path)).load().await;
        assert!(matches!(
            outcome,
            LoadOutcome::Failed(ProfileLoadError::Read { .. })
        ));
    }
}
