use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_DICTIONARY_ENDPOINT: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid dictionary endpoint {0:?}")]
    InvalidEndpoint(String),
    #[error("dictionary request timed out")]
    Timeout,
    #[error("dictionary request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected dictionary response: {0}")]
    Shape(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout
        } else {
            LookupError::Transport(err)
        }
    }
}

/// Remote dictionary keyed by word.
///
/// `Ok(None)` means the service answered but has no usable definition.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    async fn lookup(&self, word: &str) -> Result<Option<String>, LookupError>;
}

/// `GET {endpoint}/{word}` against a dictionaryapi.dev-shaped service.
#[derive(Debug, Clone)]
pub struct HttpDefinitionSource {
    client: Client,
    endpoint: Url,
}

impl HttpDefinitionSource {
    /// `request_timeout` bounds a single request; the resolver applies its
    /// own bounded wait on top.
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, LookupError> {
        let endpoint = Url::parse(endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| LookupError::InvalidEndpoint(endpoint.to_string()))?;
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .build()
            .map_err(LookupError::Transport)?;
        Ok(Self { client, endpoint })
    }

    /// Request URL for `word`, with the word percent-encoded as one path segment.
    pub fn url_for(&self, word: &str) -> Result<Url, LookupError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(word);
        Ok(url)
    }
}

#[async_trait]
impl DefinitionSource for HttpDefinitionSource {
    async fn lookup(&self, word: &str) -> Result<Option<String>, LookupError> {
        let url = self.url_for(word)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(word, %status, "dictionary has no entry");
            return Ok(None);
        }
        let body = response.bytes().await?;
        let entries: Vec<ApiEntry> = serde_json::from_slice(&body)?;
        Ok(first_definition(&entries))
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiEntry {
    #[serde(default)]
    pub meanings: Vec<ApiMeaning>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMeaning {
    #[serde(default)]
    pub definitions: Vec<ApiDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct ApiDefinition {
    #[serde(default)]
    pub definition: Option<String>,
}

/// First entry, first meaning, first definition; nothing else is searched.
pub fn first_definition(entries: &[ApiEntry]) -> Option<String> {
    entries
        .first()?
        .meanings
        .first()?
        .definitions
        .first()?
        .definition
        .as_deref()
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}
