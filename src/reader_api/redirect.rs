// Where a resolution pass sends the reader when the requested chapter does not exist

pub fn chapter_path(bible_id: &str, book_id: &str, chapter: u32) -> String {
    format!("/bible/{}/{}/{}", bible_id, book_id, chapter)
}

/// Receives the redirect decided by a resolution pass. The pass does not know
/// whether it answers a page load or an in-app navigation.
pub trait RedirectSink: Send {
    fn redirect(&mut self, location: &str);
}

/// Page loads: answered with `302 Found` and a `Location` header.
#[derive(Debug, Default)]
pub struct HttpRedirect {
    location: Option<String>,
}

impl HttpRedirect {
    pub fn into_location(self) -> Option<String> {
        self.location
    }
}

impl RedirectSink for HttpRedirect {
    fn redirect(&mut self, location: &str) {
        tracing::info!(%location, "redirecting with 302");
        self.location = Some(location.to_string());
    }
}

/// In-app navigation: the client is told which path to route to.
#[derive(Debug, Default)]
pub struct ClientNavigation {
    path: Option<String>,
}

impl ClientNavigation {
    pub fn into_path(self) -> Option<String> {
        self.path
    }
}

impl RedirectSink for ClientNavigation {
    fn redirect(&mut self, location: &str) {
        tracing::debug!(%location, "client navigation");
        self.path = Some(location.to_string());
    }
}
