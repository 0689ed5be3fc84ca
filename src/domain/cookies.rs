// Cookie header parsing and the preferences persisted in it

use std::collections::HashMap;

use super::models::{ClientState, UserProfile, UserSettings};

const USER_ID: &str = "bible_is_user_id";
const VOLUME: &str = "bible_is_volume";
const PLAYBACK_RATE: &str = "bible_is_playbackrate";
const EMAIL: &str = "bible_is_email";
const NICKNAME: &str = "bible_is_nickname";
const NAME: &str = "bible_is_name";
const THEME: &str = "bible_is_theme";
const FONT_FAMILY: &str = "bible_is_font_family";
const FONT_SIZE: &str = "bible_is_font_size";
const AUTOPLAY: &str = "bible_is_autoplay";
const RED_LETTER: &str = "bible_is_words_of_jesus";
const READERS_MODE: &str = "bible_is_userSettings_toggleOptions_readersMode_active";
const CROSS_REFERENCES: &str = "bible_is_userSettings_toggleOptions_crossReferences_active";
const JUSTIFIED_TEXT: &str = "bible_is_userSettings_toggleOptions_justifiedText_active";
const ONE_VERSE_PER_LINE: &str = "bible_is_userSettings_toggleOptions_oneVersePerLine_active";

/// Split a `Cookie` header into name/value pairs.
///
/// Fragments without `=` or with an empty name are ignored. A repeated name
/// keeps its first value.
pub fn parse_cookie(raw: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for fragment in raw.split(';') {
        let Some((name, value)) = fragment.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        out.entry(name.to_string()).or_insert_with(|| value.to_string());
    }
    out
}

fn text(cookies: &HashMap<String, String>, name: &str, default: &str) -> String {
    match cookies.get(name) {
        Some(v) if !v.is_empty() => v.clone(),
        _ => default.to_string(),
    }
}

fn flag(cookies: &HashMap<String, String>, name: &str, default: bool) -> bool {
    match cookies.get(name).map(|v| v.trim()) {
        None | Some("") => default,
        Some(v) => !(v.eq_ignore_ascii_case("false") || v == "0"),
    }
}

fn number<T: std::str::FromStr>(cookies: &HashMap<String, String>, name: &str, default: T) -> T {
    cookies
        .get(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ClientState {
    pub fn from_cookies(cookies: &HashMap<String, String>) -> Self {
        let defaults = UserSettings::default();
        let mut toggles = defaults.toggle_options.clone();
        toggles.readers_mode.active = flag(cookies, READERS_MODE, toggles.readers_mode.active);
        toggles.cross_references.active =
            flag(cookies, CROSS_REFERENCES, toggles.cross_references.active);
        toggles.red_letter.active = flag(cookies, RED_LETTER, toggles.red_letter.active);
        toggles.justified_text.active = flag(cookies, JUSTIFIED_TEXT, toggles.justified_text.active);
        toggles.one_verse_per_line.active =
            flag(cookies, ONE_VERSE_PER_LINE, toggles.one_verse_per_line.active);

        let settings = UserSettings {
            active_theme: text(cookies, THEME, &defaults.active_theme),
            active_font_type: text(cookies, FONT_FAMILY, &defaults.active_font_type),
            active_font_size: number(cookies, FONT_SIZE, defaults.active_font_size),
            toggle_options: toggles,
            auto_play_enabled: flag(cookies, AUTOPLAY, false),
        };

        let user_id = text(cookies, USER_ID, "");
        ClientState {
            settings,
            profile: UserProfile {
                email: text(cookies, EMAIL, ""),
                nickname: text(cookies, NICKNAME, ""),
                name: text(cookies, NAME, ""),
                avatar: String::new(),
            },
            user_authenticated: !user_id.is_empty(),
            user_id,
            initial_volume: number(cookies, VOLUME, 1.0_f64).clamp(0.0, 1.0),
            initial_playback_rate: number(cookies, PLAYBACK_RATE, 1.0_f64),
        }
    }

    /// Recover state from an optional raw `Cookie` header.
    pub fn from_cookie_header(header: Option<&str>) -> Self {
        match header {
            Some(raw) if !raw.trim().is_empty() => Self::from_cookies(&parse_cookie(raw)),
            _ => Self::default(),
        }
    }
}
