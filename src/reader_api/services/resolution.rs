use std::collections::BTreeMap;

use futures::future::join_all;

use crate::{
    dbp_client::{Bible, BookMeta, DbpClient, public_url},
    domain::{
        dedupe::remove_duplicates,
        filesets::{FilesetSelection, select_filesets},
        models::{ChapterData, ClientState, RouteTarget},
    },
    reader_api::{
        models::{BookDto, FetchedUrlDto, FilesetDto, InitialStateDto},
        redirect::{RedirectSink, chapter_path},
        services::chapter_data::{ChapterDataResolver, ChapterRequest},
    },
};

/// Entry point used for bibles that carry video; the first book is skipped for them.
const VIDEO_ENTRY_BOOK: &str = "mrk";
const DEFAULT_LANGUAGE_ISO: &str = "eng";
const DEFAULT_LANGUAGE_NAME: &str = "English";
const DEFAULT_LANGUAGE_CODE: i64 = 6414;

/// Facts about the request that are not part of the route.
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    pub is_from_server: bool,
    pub route_location: String,
}

#[derive(Debug)]
pub enum ResolveOutcome {
    /// A redirect was handed to the sink; nothing else was fetched.
    Redirected,
    Rendered(Box<InitialStateDto>),
}

/// Decide whether `target` must be redirected given the published books.
/// Returns the path to redirect to, or `None` when the chapter can be shown.
pub fn redirect_for(books: &[BookMeta], target: &RouteTarget, has_video: bool) -> Option<String> {
    let first = books.first()?;
    let requested = target.book_id.to_uppercase();
    let Some(book) = books.iter().find(|b| b.book_id == requested) else {
        return Some(if has_video {
            chapter_path(&target.bible_id, VIDEO_ENTRY_BOOK, 1)
        } else {
            chapter_path(&target.bible_id, &first.book_id, first.first_chapter())
        });
    };
    match target.chapter_number() {
        Some(chapter) if book.chapters.contains(&chapter) => None,
        _ => Some(chapter_path(&target.bible_id, &book.book_id, book.first_chapter())),
    }
}

pub struct ResolutionService<'a> {
    pub client: &'a DbpClient,
}

impl<'a> ResolutionService<'a> {
    pub fn new(client: &'a DbpClient) -> Self {
        Self { client }
    }

    /// Resolve everything needed to show `target`, or redirect through `sink`.
    /// Upstream failures never abort the pass; they leave parts of the state empty.
    #[tracing::instrument(level = "debug", skip(self, client_state, ctx, sink))]
    pub async fn resolve(
        &self,
        target: RouteTarget,
        client_state: ClientState,
        ctx: PassContext,
        sink: &mut dyn RedirectSink,
    ) -> ResolveOutcome {
        let mut fetched_urls = Vec::new();
        let bible = match self.client.get_bible(&target.bible_id).await {
            Ok(fetched) => {
                fetched_urls.push(FetchedUrlDto {
                    href: public_url(&fetched.url),
                    data: fetched.raw,
                });
                fetched.data
            }
            Err(e) => {
                tracing::warn!(bible_id = %target.bible_id, error = %e, "bible metadata unavailable");
                Bible::default()
            }
        };

        let selection = select_filesets(&bible, self.client.bucket_id(), self.client.video_bucket_id());
        let (books, book_pairs) = self.book_lists(&selection).await;

        if let Some(location) = redirect_for(&books, &target, selection.has_video) {
            tracing::info!(
                bible_id = %target.bible_id,
                book_id = %target.book_id,
                chapter = %target.chapter,
                %location,
                "requested chapter is not published"
            );
            sink.redirect(&location);
            return ResolveOutcome::Redirected;
        }

        let chapter = ChapterDataResolver::new(self.client)
            .resolve(ChapterRequest {
                filesets: &selection.filesets,
                book_id: &target.book_id,
                chapter: &target.chapter,
                plain_fileset_ids: &selection.plain_ids,
                formatted_fileset_ids: &selection.formatted_ids,
            })
            .await
            .into_payload();

        fetched_urls.push(FetchedUrlDto {
            href: public_url(
                &self
                    .client
                    .text_url(&target.bible_id, &target.book_id, &target.chapter),
            ),
            data: chapter.plain_text_json.clone(),
        });
        fetched_urls.extend(book_pairs);

        let books = if books.is_empty() {
            bible.books.clone().unwrap_or_default()
        } else {
            books
        };
        ResolveOutcome::Rendered(Box::new(initial_state(
            target,
            client_state,
            ctx,
            &bible,
            selection,
            books,
            chapter,
            fetched_urls,
        )))
    }

    /// Book lists of every fileset type, fetched concurrently, merged and deduplicated.
    async fn book_lists(&self, selection: &FilesetSelection) -> (Vec<BookMeta>, Vec<FetchedUrlDto>) {
        let lookups = selection
            .book_list_sources
            .iter()
            .map(|(kind, id)| self.client.get_books(id, kind));
        let mut pairs = Vec::new();
        let mut all = Vec::new();
        for ((kind, id), result) in selection.book_list_sources.iter().zip(join_all(lookups).await) {
            match result {
                Ok(fetched) => {
                    all.extend(fetched.data);
                    pairs.push(FetchedUrlDto {
                        href: public_url(&fetched.url),
                        data: fetched.raw,
                    });
                }
                Err(e) => {
                    tracing::warn!(fileset_id = %id, fileset_type = kind.as_str(), error = %e, "book list unavailable");
                }
            }
        }
        let books = remove_duplicates(all, |b| b.book_id.clone());
        tracing::debug!(books = books.len(), "merged book lists");
        (books, pairs)
    }
}

#[allow(clippy::too_many_arguments)]
fn initial_state(
    target: RouteTarget,
    client_state: ClientState,
    ctx: PassContext,
    bible: &Bible,
    selection: FilesetSelection,
    books: Vec<BookMeta>,
    chapter: ChapterData,
    fetched_urls: Vec<FetchedUrlDto>,
) -> InitialStateDto {
    let active_book = books
        .iter()
        .find(|b| b.book_id.eq_ignore_ascii_case(&target.book_id))
        .or(books.first());
    let active_book_name = active_book.and_then(|b| b.name.clone()).unwrap_or_default();
    let testaments: BTreeMap<String, String> = books
        .iter()
        .map(|b| (b.book_id.clone(), b.testament.clone().unwrap_or_default()))
        .collect();

    let mut audio = chapter.audio_paths.into_iter();
    let audio_source = audio.next().unwrap_or_default();
    let audio_paths: Vec<String> = audio.collect();

    InitialStateDto {
        initial_volume: client_state.initial_volume,
        initial_playback_rate: client_state.initial_playback_rate,
        chapter_text: chapter.plain_text,
        plain_text_json: chapter.plain_text_json,
        formatted_text: chapter.formatted_text,
        has_audio: !audio_source.is_empty(),
        audio_source,
        audio_paths,
        has_video: selection.has_video,
        testaments,
        books: books.iter().map(BookDto::from).collect(),
        active_filesets: selection.filesets.iter().map(FilesetDto::from).collect(),
        active_fileset_id: selection.active_fileset_id,
        active_chapter: target.chapter_number().filter(|c| *c > 0).unwrap_or(1),
        active_book_id: target.book_id.to_uppercase(),
        active_book_name,
        verse_number: target.verse.clone(),
        active_text_id: bible.abbr.clone().unwrap_or_default(),
        active_text_name: bible
            .vname
            .clone()
            .or_else(|| bible.name.clone())
            .unwrap_or_default(),
        active_iso_code: bible.iso.clone().unwrap_or_default(),
        active_language_name: bible.language.clone().unwrap_or_default(),
        default_language_iso: bible.iso.clone().unwrap_or_else(|| DEFAULT_LANGUAGE_ISO.into()),
        default_language_name: bible
            .language
            .clone()
            .unwrap_or_else(|| DEFAULT_LANGUAGE_NAME.into()),
        default_language_code: bible.language_id.unwrap_or(DEFAULT_LANGUAGE_CODE),
        text_direction: bible
            .alphabet
            .as_ref()
            .and_then(|a| a.direction.clone())
            .unwrap_or_else(|| "ltr".into()),
        user_settings: client_state.settings,
        user_profile: client_state.profile,
        user_id: client_state.user_id,
        user_authenticated: client_state.user_authenticated,
        is_from_server: ctx.is_from_server,
        route_location: ctx.route_location,
        route: target,
        fetched_urls,
    }
}
