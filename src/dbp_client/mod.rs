// Client for the Digital Bible Platform (DBP v4) content API

pub mod cache;
#[cfg(test)]
pub mod testing;
pub mod users;

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

pub use cache::{CachedFetch, ResponseCache};
pub use users::{AccountUser, SignupForm};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
    /// The API refused the request and said why.
    #[error("{url} rejected the request ({status}): {message}")]
    Rejected { url: String, status: u16, message: String },
}

const GENERIC_REJECTION: &str = "request rejected";

/// Human readable reason from a DBP error body, e.g. `{"error":{"message":".."}}`.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::Object(err)) => err.get("message").and_then(Value::as_str).map(str::to_string),
        Some(Value::String(err)) => Some(err.clone()),
        _ => None,
    }
}

/// Error for a form POST answered with a non-success status. Client errors
/// carry the API's reason; anything else is a plain status failure.
pub(crate) fn form_failure(url: &str, status: u16, body: &str) -> FetchError {
    if !(400..500).contains(&status) {
        return FetchError::Status {
            url: url.to_string(),
            status,
        };
    }
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| {
            error_message(v).or_else(|| v.get("message").and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| GENERIC_REJECTION.to_string());
    FetchError::Rejected {
        url: url.to_string(),
        status,
        message,
    }
}

/// `url` without its `key` query parameter, safe to hand to browsers.
pub fn public_url(url: &str) -> String {
    let Some((path, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("key="))
        .collect();
    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, kept.join("&"))
    }
}

/// Raw access to the network. Only successful bodies are returned.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, FetchError>;

    /// POST `form` url-encoded.
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        (**self).get(url).await
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<String, FetchError> {
        (**self).post_form(url, form).await
    }
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Every request issued through this transport is bounded by `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpTransport { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let transport_err = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let resp = self.client.get(url).send().await.map_err(transport_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(transport_err)
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<String, FetchError> {
        let transport_err = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let resp = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(transport_err)?;
        let status = resp.status();
        let body = resp.text().await.map_err(transport_err)?;
        if !status.is_success() {
            return Err(form_failure(url, status.as_u16(), &body));
        }
        Ok(body)
    }
}

/// A decoded response together with the URL and raw JSON it came from.
/// The raw pair is what a client needs to seed its own cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub url: String,
    pub raw: Value,
    pub data: T,
}

#[derive(Clone)]
pub struct DbpClient {
    base_url: String,
    api_key: String,
    bucket_id: String,
    video_bucket_id: String,
    project_id: String,
    fetch: CachedFetch,
}

impl DbpClient {
    /// Create a new client for the given API root (e.g. "https://api.example.org").
    pub fn new(base_url: impl Into<String>, transport: impl Transport + 'static) -> Self {
        let base_url_str = base_url.into();
        tracing::debug!(base_url = %base_url_str, "creating DbpClient");
        DbpClient {
            base_url: base_url_str.trim_end_matches('/').to_string(),
            api_key: String::new(),
            bucket_id: "dbp-prod".to_string(),
            video_bucket_id: "dbp-vid".to_string(),
            project_id: String::new(),
            fetch: CachedFetch::new(Arc::new(transport), ResponseCache::default()),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_buckets(mut self, bucket_id: impl Into<String>, video_bucket_id: impl Into<String>) -> Self {
        self.bucket_id = bucket_id.into();
        self.video_bucket_id = video_bucket_id.into();
        self
    }

    /// Project the account calls are made for.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.fetch = self.fetch.with_cache(cache);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    pub fn video_bucket_id(&self) -> &str {
        &self.video_bucket_id
    }

    pub fn fetcher(&self) -> &CachedFetch {
        &self.fetch
    }

    pub fn bible_url(&self, bible_id: &str) -> String {
        format!(
            "{}/bibles/{}?bucket={}&key={}&v=4",
            self.base_url, bible_id, self.bucket_id, self.api_key
        )
    }

    pub fn books_url(&self, fileset_id: &str, kind: &FilesetKind) -> String {
        format!(
            "{}/bibles/filesets/{}/books?v=4&key={}&bucket={}&fileset_type={}",
            self.base_url,
            fileset_id,
            self.api_key,
            self.bucket_id,
            kind.as_str()
        )
    }

    pub fn chapter_url(&self, fileset_id: &str, book_id: &str, chapter: &str) -> String {
        format!(
            "{}/bibles/filesets/{}/{}/{}?key={}&v=4&bucket={}",
            self.base_url, fileset_id, book_id, chapter, self.api_key, self.bucket_id
        )
    }

    /// Key under which the chapter text is handed to the client for hydration.
    pub fn text_url(&self, bible_id: &str, book_id: &str, chapter: &str) -> String {
        format!(
            "{}/bibles/filesets/{}/{}/{}?key={}&v=4",
            self.base_url, bible_id, book_id, chapter, self.api_key
        )
    }

    async fn get_data<T: DeserializeOwned + Default>(&self, url: String) -> Result<Fetched<T>, FetchError> {
        let raw = self.fetch.fetch_json(&url).await?;
        let data = match raw.get("data") {
            None | Some(Value::Null) => T::default(),
            Some(inner) => T::deserialize(inner).map_err(|e| {
                tracing::error!(error = %e, %url, "failed to parse DBP response");
                FetchError::Decode {
                    url: url.clone(),
                    message: e.to_string(),
                }
            })?,
        };
        Ok(Fetched { url, raw, data })
    }

    /// GET /bibles/{id}
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_bible(&self, bible_id: &str) -> Result<Fetched<Bible>, FetchError> {
        let url = self.bible_url(bible_id);
        tracing::debug!(%url, "GET bible");
        self.get_data(url).await
    }

    /// GET /bibles/filesets/{id}/books
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_books(
        &self,
        fileset_id: &str,
        kind: &FilesetKind,
    ) -> Result<Fetched<Vec<BookMeta>>, FetchError> {
        let url = self.books_url(fileset_id, kind);
        tracing::debug!(%url, "GET books");
        self.get_data(url).await
    }

    /// GET /bibles/filesets/{id}/{book}/{chapter} for a plain text fileset
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_verses(
        &self,
        fileset_id: &str,
        book_id: &str,
        chapter: &str,
    ) -> Result<Fetched<Vec<Value>>, FetchError> {
        let url = self.chapter_url(fileset_id, book_id, chapter);
        tracing::debug!(%url, "GET verses");
        self.get_data(url).await
    }

    /// GET /bibles/filesets/{id}/{book}/{chapter} for formatted text and audio filesets,
    /// which answer with file locations rather than content.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_file_paths(
        &self,
        fileset_id: &str,
        book_id: &str,
        chapter: &str,
    ) -> Result<Vec<String>, FetchError> {
        let url = self.chapter_url(fileset_id, book_id, chapter);
        tracing::debug!(%url, "GET file paths");
        let fetched: Fetched<Vec<FileLocation>> = self.get_data(url).await?;
        Ok(fetched
            .data
            .into_iter()
            .filter_map(|f| f.path)
            .filter(|p| !p.is_empty())
            .collect())
    }

    /// Fetch a document (formatted chapter markup) by absolute URL.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_document(&self, url: &str) -> Result<String, FetchError> {
        self.fetch.fetch_text(url).await
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Bible {
    pub abbr: Option<String>,
    pub name: Option<String>,
    pub vname: Option<String>,
    pub iso: Option<String>,
    pub language: Option<String>,
    pub language_id: Option<i64>,
    pub alphabet: Option<Alphabet>,
    /// Filesets grouped by storage bucket
    #[serde(default)]
    pub filesets: HashMap<String, Vec<Fileset>>,
    #[serde(default)]
    pub books: Option<Vec<BookMeta>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Alphabet {
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Fileset {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FilesetKind,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum FilesetKind {
    AudioDrama,
    Audio,
    TextPlain,
    TextFormat,
    VideoStream,
    Other(String),
}

impl FilesetKind {
    pub fn as_str(&self) -> &str {
        match self {
            FilesetKind::AudioDrama => "audio_drama",
            FilesetKind::Audio => "audio",
            FilesetKind::TextPlain => "text_plain",
            FilesetKind::TextFormat => "text_format",
            FilesetKind::VideoStream => "video_stream",
            FilesetKind::Other(s) => s,
        }
    }

    /// Whether the site knows how to present this fileset type.
    pub fn is_supported(&self) -> bool {
        !matches!(self, FilesetKind::Other(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FilesetKind::TextPlain | FilesetKind::TextFormat)
    }
}

impl From<String> for FilesetKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "audio_drama" => FilesetKind::AudioDrama,
            "audio" => FilesetKind::Audio,
            "text_plain" => FilesetKind::TextPlain,
            "text_format" => FilesetKind::TextFormat,
            "video_stream" => FilesetKind::VideoStream,
            _ => FilesetKind::Other(value),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BookMeta {
    pub book_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub testament: Option<String>,
    #[serde(default)]
    pub chapters: Vec<u32>,
}

impl BookMeta {
    /// First listed chapter, or 1 for a book that lists none.
    pub fn first_chapter(&self) -> u32 {
        self.chapters.first().copied().unwrap_or(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FileLocation {
    #[serde(default)]
    path: Option<String>,
}
