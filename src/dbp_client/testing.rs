// In-memory transport for tests

use std::{collections::HashMap, sync::Arc, sync::Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::{DbpClient, FetchError, Transport, form_failure};

#[derive(Debug, Clone)]
enum Canned {
    Body(String),
    Status(u16),
    Rejected(u16, String),
}

/// Serves canned bodies per URL and records every request.
/// Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct StubTransport {
    responses: Mutex<HashMap<String, Canned>>,
    calls: Mutex<Vec<String>>,
    forms: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_json(&self, url: &str, value: Value) {
        self.insert_body(url, &value.to_string());
    }

    pub fn insert_body(&self, url: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Canned::Body(body.to_string()));
    }

    pub fn insert_status(&self, url: &str, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Canned::Status(status));
    }

    /// A non-success status with an error body.
    pub fn insert_rejection(&self, url: &str, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Canned::Rejected(status, body.to_string()));
    }

    /// Fields of the most recent form posted to `url`.
    pub fn last_form(&self, url: &str) -> Option<HashMap<String, String>> {
        self.forms
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(u, _)| u == url)
            .map(|(_, form)| form.iter().cloned().collect())
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let canned = self.responses.lock().unwrap().get(url).cloned();
        match canned {
            Some(Canned::Body(body)) => Ok(body),
            Some(Canned::Status(status)) | Some(Canned::Rejected(status, _)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.forms
            .lock()
            .unwrap()
            .push((url.to_string(), form.to_vec()));
        let canned = self.responses.lock().unwrap().get(url).cloned();
        match canned {
            Some(Canned::Body(body)) => Ok(body),
            Some(Canned::Status(status)) => Err(form_failure(url, status, "")),
            Some(Canned::Rejected(status, body)) => Err(form_failure(url, status, &body)),
            None => Err(form_failure(url, 404, "")),
        }
    }
}

pub fn test_client(stub: Arc<StubTransport>) -> DbpClient {
    DbpClient::new("http://dbp.test/api", stub)
        .with_api_key("test-key")
        .with_buckets("dbp-prod", "dbp-vid")
}
