use std::collections::BTreeMap;

use poem_openapi::{ApiResponse, Object, payload::Json};
use serde_json::Value;

use crate::{
    dbp_client::{BookMeta, Fileset},
    domain::models::{RouteTarget, UserProfile, UserSettings},
};

#[derive(Debug, Clone, PartialEq, Object)]
pub struct FilesetDto {
    pub id: String,
    #[oai(rename = "type")]
    pub kind: String,
    pub size: Option<String>,
}

impl From<&Fileset> for FilesetDto {
    fn from(f: &Fileset) -> Self {
        FilesetDto {
            id: f.id.clone(),
            kind: f.kind.as_str().to_string(),
            size: f.size.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Object)]
pub struct BookDto {
    pub book_id: String,
    pub name: Option<String>,
    pub testament: Option<String>,
    pub chapters: Vec<u32>,
}

impl From<&BookMeta> for BookDto {
    fn from(b: &BookMeta) -> Self {
        BookDto {
            book_id: b.book_id.clone(),
            name: b.name.clone(),
            testament: b.testament.clone(),
            chapters: b.chapters.clone(),
        }
    }
}

/// A response fetched while resolving, for seeding the client's cache.
#[derive(Debug, Clone, PartialEq, Object)]
pub struct FetchedUrlDto {
    pub href: String,
    pub data: Value,
}

/// Everything the reader needs to render its first paint of a chapter.
#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct InitialStateDto {
    pub initial_volume: f64,
    pub initial_playback_rate: f64,
    pub chapter_text: Vec<Value>,
    pub plain_text_json: Value,
    pub formatted_text: String,
    /// Source that starts playing
    pub audio_source: String,
    /// Alternate sources, in preference order
    pub audio_paths: Vec<String>,
    pub has_audio: bool,
    pub has_video: bool,
    pub testaments: BTreeMap<String, String>,
    pub books: Vec<BookDto>,
    pub active_filesets: Vec<FilesetDto>,
    pub active_fileset_id: String,
    pub active_chapter: u32,
    pub active_book_id: String,
    pub active_book_name: String,
    pub verse_number: Option<String>,
    pub active_text_id: String,
    pub active_text_name: String,
    pub active_iso_code: String,
    pub active_language_name: String,
    pub default_language_iso: String,
    pub default_language_name: String,
    pub default_language_code: i64,
    pub text_direction: String,
    pub user_settings: UserSettings,
    pub user_profile: UserProfile,
    pub user_id: String,
    pub user_authenticated: bool,
    pub is_from_server: bool,
    pub route_location: String,
    #[oai(rename = "match")]
    pub route: RouteTarget,
    pub fetched_urls: Vec<FetchedUrlDto>,
}

/// Answer to an in-app navigation: either a state to render or a path to go to.
#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct ClientRouteDto {
    pub navigate_to: Option<String>,
    pub state: Option<InitialStateDto>,
}

#[derive(ApiResponse)]
pub enum ChapterPageResponse {
    /// Initial state for the requested chapter
    #[oai(status = 200)]
    Ok(Json<InitialStateDto>),

    /// The requested book or chapter is not published for this bible
    #[oai(status = 302)]
    Found(#[oai(header = "Location")] String),
}

#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    /// Defaults to the part of the email before `@`
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub subscribed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Object)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
    /// Page the emailed link points at
    pub reset_path: Option<String>,
}

/// The account after signup or login, or the confirmation of a reset request.
#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct AccountDto {
    pub user_id: Option<String>,
    pub profile: Option<UserProfile>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Object)]
pub struct AccountErrorDto {
    pub message: String,
}

#[derive(ApiResponse)]
pub enum AccountResponse {
    #[oai(status = 200)]
    Ok(Json<AccountDto>),

    /// Invalid input, or refused by the content API
    #[oai(status = 400)]
    Rejected(Json<AccountErrorDto>),

    /// The content API could not be reached
    #[oai(status = 502)]
    Unavailable(Json<AccountErrorDto>),
}
