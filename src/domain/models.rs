// Reader state models shared between the resolution flow and the API payloads

use poem_openapi::Object;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct ToggleOption {
    pub name: String,
    pub active: bool,
    pub available: bool,
}

impl ToggleOption {
    fn new(name: &str, active: bool, available: bool) -> Self {
        Self {
            name: name.to_string(),
            active,
            available,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct ToggleOptions {
    pub readers_mode: ToggleOption,
    pub cross_references: ToggleOption,
    pub red_letter: ToggleOption,
    pub justified_text: ToggleOption,
    pub one_verse_per_line: ToggleOption,
    pub vertical_scrolling: ToggleOption,
}

impl Default for ToggleOptions {
    fn default() -> Self {
        Self {
            readers_mode: ToggleOption::new("READER'S MODE", false, true),
            cross_references: ToggleOption::new("CROSS REFERENCE", true, true),
            red_letter: ToggleOption::new("RED LETTER", true, true),
            justified_text: ToggleOption::new("JUSTIFIED TEXT", false, true),
            one_verse_per_line: ToggleOption::new("ONE VERSE PER LINE", false, true),
            vertical_scrolling: ToggleOption::new("VERTICAL SCROLLING", false, false),
        }
    }
}

/// Display preferences persisted in cookies by the settings panel.
#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct UserSettings {
    pub active_theme: String,
    pub active_font_type: String,
    pub active_font_size: u32,
    pub toggle_options: ToggleOptions,
    pub auto_play_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            active_theme: "red".to_string(),
            active_font_type: "sans".to_string(),
            active_font_size: 42,
            toggle_options: ToggleOptions::default(),
            auto_play_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub nickname: String,
    pub name: String,
    pub avatar: String,
}

/// Everything recovered from the visitor's cookies.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientState {
    pub settings: UserSettings,
    pub profile: UserProfile,
    pub user_id: String,
    pub user_authenticated: bool,
    pub initial_volume: f64,
    pub initial_playback_rate: f64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            profile: UserProfile::default(),
            user_id: String::new(),
            user_authenticated: false,
            initial_volume: 1.0,
            initial_playback_rate: 1.0,
        }
    }
}

/// The requested location, as taken from the URL.
#[derive(Debug, Clone, PartialEq, Object)]
#[oai(rename_all = "camelCase")]
pub struct RouteTarget {
    pub bible_id: String,
    pub book_id: String,
    /// Kept verbatim; see [`RouteTarget::chapter_number`].
    pub chapter: String,
    pub verse: Option<String>,
    pub token: Option<String>,
}

impl Default for RouteTarget {
    fn default() -> Self {
        Self {
            bible_id: "ENGESV".to_string(),
            book_id: "GEN".to_string(),
            chapter: "7".to_string(),
            verse: None,
            token: None,
        }
    }
}

impl RouteTarget {
    /// Leading decimal digits of the chapter segment ("12abc" is 12).
    pub fn chapter_number(&self) -> Option<u32> {
        let digits: String = self
            .chapter
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse().ok()
    }
}

/// Text and audio resolved for one chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterData {
    pub plain_text: Vec<Value>,
    pub formatted_text: String,
    pub plain_text_json: Value,
    /// First entry plays; the rest are alternates.
    pub audio_paths: Vec<String>,
}

impl Default for ChapterData {
    fn default() -> Self {
        Self {
            plain_text: Vec::new(),
            formatted_text: String::new(),
            plain_text_json: Value::Object(Default::default()),
            audio_paths: Vec::new(),
        }
    }
}
