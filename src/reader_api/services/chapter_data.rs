use futures::future::join_all;
use serde_json::Value;

use crate::{
    dbp_client::{DbpClient, FetchError, Fileset},
    domain::{filesets::audio_filesets, models::ChapterData},
};

/// Outcome of looking a piece of chapter content up across candidate filesets.
#[derive(Debug, Clone, PartialEq)]
pub enum Sourced<T> {
    Found { fileset_id: String, value: T },
    /// No candidate, or candidates that answered without content.
    Empty,
    /// Every candidate failed at the fetch layer; holds the first error.
    Failed(FetchError),
}

impl<T> Sourced<T> {
    /// First candidate (in the given order) that produced content.
    fn first_found(results: Vec<(String, Result<Option<T>, FetchError>)>) -> Self {
        let mut first_error = None;
        let mut answered = false;
        for (fileset_id, result) in results {
            match result {
                Ok(Some(value)) => return Sourced::Found { fileset_id, value },
                Ok(None) => answered = true,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) if !answered => Sourced::Failed(e),
            _ => Sourced::Empty,
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Sourced::Found { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Sourced::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlainText {
    pub verses: Vec<Value>,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct ChapterRequest<'r> {
    pub filesets: &'r [Fileset],
    pub book_id: &'r str,
    pub chapter: &'r str,
    pub plain_fileset_ids: &'r [String],
    pub formatted_fileset_ids: &'r [String],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSources {
    pub plain_text: Sourced<PlainText>,
    pub formatted_text: Sourced<String>,
    pub audio: Sourced<Vec<String>>,
}

impl ChapterSources {
    /// Collapse to content, with empty values wherever nothing was found.
    pub fn into_payload(self) -> ChapterData {
        let mut data = ChapterData::default();
        if let Some(plain) = self.plain_text.value() {
            data.plain_text = plain.verses;
            data.plain_text_json = plain.raw;
        }
        if let Some(formatted) = self.formatted_text.value() {
            data.formatted_text = formatted;
        }
        if let Some(paths) = self.audio.value() {
            data.audio_paths = paths;
        }
        data
    }
}

pub struct ChapterDataResolver<'a> {
    pub client: &'a DbpClient,
}

impl<'a> ChapterDataResolver<'a> {
    pub fn new(client: &'a DbpClient) -> Self {
        Self { client }
    }

    /// Fetch text and audio for a chapter. Plain text, formatted text and audio
    /// are looked up concurrently, as are the candidates inside each lookup.
    #[tracing::instrument(level = "debug", skip(self, req), fields(book = req.book_id, chapter = req.chapter))]
    pub async fn resolve(&self, req: ChapterRequest<'_>) -> ChapterSources {
        let (plain_text, formatted_text, audio) = tokio::join!(
            self.plain_text(&req),
            self.formatted_text(&req),
            self.audio(&req)
        );
        for (what, failed) in [
            ("plain text", plain_text.is_failed()),
            ("formatted text", formatted_text.is_failed()),
            ("audio", audio.is_failed()),
        ] {
            if failed {
                tracing::warn!(book = req.book_id, chapter = req.chapter, "no {} source answered", what);
            }
        }
        ChapterSources {
            plain_text,
            formatted_text,
            audio,
        }
    }

    async fn plain_text(&self, req: &ChapterRequest<'_>) -> Sourced<PlainText> {
        let lookups = req.plain_fileset_ids.iter().map(|id| async move {
            let result = self
                .client
                .get_verses(id, req.book_id, req.chapter)
                .await
                .map(|fetched| {
                    (!fetched.data.is_empty()).then_some(PlainText {
                        verses: fetched.data,
                        raw: fetched.raw,
                    })
                });
            if let Err(e) = &result {
                tracing::debug!(fileset_id = %id, error = %e, "plain text fetch failed");
            }
            (id.clone(), result)
        });
        Sourced::first_found(join_all(lookups).await)
    }

    async fn formatted_text(&self, req: &ChapterRequest<'_>) -> Sourced<String> {
        let lookups = req.formatted_fileset_ids.iter().map(|id| async move {
            let result = self.formatted_document(id, req).await;
            if let Err(e) = &result {
                tracing::debug!(fileset_id = %id, error = %e, "formatted text fetch failed");
            }
            (id.clone(), result)
        });
        Sourced::first_found(join_all(lookups).await)
    }

    async fn formatted_document(&self, fileset_id: &str, req: &ChapterRequest<'_>) -> Result<Option<String>, FetchError> {
        let paths = self
            .client
            .get_file_paths(fileset_id, req.book_id, req.chapter)
            .await?;
        let Some(path) = paths.first() else {
            return Ok(None);
        };
        let document = self.client.get_document(path).await?;
        Ok((!document.trim().is_empty()).then_some(document))
    }

    async fn audio(&self, req: &ChapterRequest<'_>) -> Sourced<Vec<String>> {
        let lookups = audio_filesets(req.filesets).into_iter().map(|set| async move {
            let result = self
                .client
                .get_file_paths(&set.id, req.book_id, req.chapter)
                .await;
            if let Err(e) = &result {
                tracing::debug!(fileset_id = %set.id, error = %e, "audio fetch failed");
            }
            (set.id.clone(), result)
        });
        let results = join_all(lookups).await;

        // Every answering fileset contributes; the first path is the one that plays.
        let mut primary = None;
        let mut paths = Vec::new();
        let mut first_error = None;
        let mut answered = false;
        for (fileset_id, result) in results {
            match result {
                Ok(found) => {
                    answered = true;
                    if !found.is_empty() {
                        primary.get_or_insert(fileset_id);
                    }
                    paths.extend(found);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match (primary, first_error) {
            (Some(fileset_id), _) => Sourced::Found {
                fileset_id,
                value: paths,
            },
            (None, Some(e)) if !answered => Sourced::Failed(e),
            _ => Sourced::Empty,
        }
    }
}
