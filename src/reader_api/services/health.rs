use poem_openapi::payload::PlainText;

use crate::dbp_client::DbpClient;

pub struct HealthService<'a> {
    pub client: &'a DbpClient,
}

impl<'a> HealthService<'a> {
    pub fn new(client: &'a DbpClient) -> Self {
        Self { client }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn status_text(&self) -> PlainText<String> {
        PlainText(format!(
            "bible reader version={} dbp={} bucket={} cached_responses={}",
            env!("CARGO_PKG_VERSION"),
            self.client.base_url(),
            self.client.bucket_id(),
            self.client.fetcher().cache().entry_count()
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::dbp_client::testing::{StubTransport, test_client};

    #[test]
    fn status_reports_upstream_and_cache_size() {
        let c = test_client(Arc::new(StubTransport::new()));
        c.fetcher().override_entry("http://dbp.test/api/x", json!({}));
        let PlainText(text) = HealthService::new(&c).status_text();
        assert!(text.contains("dbp=http://dbp.test/api"));
        assert!(text.contains("bucket=dbp-prod"));
        assert!(text.ends_with("cached_responses=1"));
    }
}
