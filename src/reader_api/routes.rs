use std::sync::Arc;

use poem::Request;
use poem_openapi::{
    OpenApi,
    param::{Header, Path, Query},
    payload::{Json, PlainText},
};

use super::models::{
    AccountDto, AccountErrorDto, AccountResponse, ChapterPageResponse, ClientRouteDto, LoginRequest,
    PasswordResetRequest, SignupRequest,
};
use super::redirect::{ClientNavigation, HttpRedirect};
use super::services::{
    account::{AccountError, AccountService},
    health::HealthService,
    resolution::{PassContext, ResolutionService, ResolveOutcome},
};
use crate::{
    dbp_client::{DbpClient, FetchError},
    domain::models::{ClientState, RouteTarget},
};

pub struct ReaderApi {
    pub client: Arc<DbpClient>,
}

#[OpenApi]
impl ReaderApi {
    #[oai(path = "/status", method = "get")]
    #[tracing::instrument(level = "debug", skip(self))]
    async fn status(&self) -> PlainText<String> {
        tracing::debug!("handling /status");
        HealthService::new(&self.client).status_text()
    }

    /// Initial state for a chapter page load
    #[oai(path = "/bible/:bible_id/:book_id/:chapter", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, req, bible_id, book_id, chapter, verse, token, cookie))]
    async fn chapter_page(
        &self,
        req: &Request,
        bible_id: Path<String>,
        book_id: Path<String>,
        chapter: Path<String>,
        /// Verse to highlight
        Query(verse): Query<Option<String>>,
        /// Share token
        Query(token): Query<Option<String>>,
        #[oai(name = "Cookie")] cookie: Header<Option<String>>,
    ) -> ChapterPageResponse {
        let target = RouteTarget {
            bible_id: bible_id.0,
            book_id: book_id.0,
            chapter: chapter.0,
            verse,
            token,
        };
        self.page(req, target, cookie.0).await
    }

    /// Initial state for a book, at the default chapter
    #[oai(path = "/bible/:bible_id/:book_id", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, req, bible_id, book_id, cookie))]
    async fn book_page(
        &self,
        req: &Request,
        bible_id: Path<String>,
        book_id: Path<String>,
        #[oai(name = "Cookie")] cookie: Header<Option<String>>,
    ) -> ChapterPageResponse {
        let target = RouteTarget {
            bible_id: bible_id.0,
            book_id: book_id.0,
            ..Default::default()
        };
        self.page(req, target, cookie.0).await
    }

    /// Initial state for a bible, at the default book and chapter
    #[oai(path = "/bible/:bible_id", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, req, bible_id, cookie))]
    async fn bible_page(
        &self,
        req: &Request,
        bible_id: Path<String>,
        #[oai(name = "Cookie")] cookie: Header<Option<String>>,
    ) -> ChapterPageResponse {
        let target = RouteTarget {
            bible_id: bible_id.0,
            ..Default::default()
        };
        self.page(req, target, cookie.0).await
    }

    /// Initial state for the landing page
    #[oai(path = "/", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, req, cookie))]
    async fn home_page(
        &self,
        req: &Request,
        #[oai(name = "Cookie")] cookie: Header<Option<String>>,
    ) -> ChapterPageResponse {
        self.page(req, RouteTarget::default(), cookie.0).await
    }

    /// Chapter state for in-app navigation. Never redirects; answers with the
    /// path to navigate to instead.
    #[oai(path = "/api/bible/:bible_id/:book_id/:chapter", method = "get")]
    #[tracing::instrument(level = "debug", skip(self, req, bible_id, book_id, chapter, verse, token, cookie))]
    async fn chapter_data(
        &self,
        req: &Request,
        bible_id: Path<String>,
        book_id: Path<String>,
        chapter: Path<String>,
        Query(verse): Query<Option<String>>,
        Query(token): Query<Option<String>>,
        #[oai(name = "Cookie")] cookie: Header<Option<String>>,
    ) -> Json<ClientRouteDto> {
        let target = RouteTarget {
            bible_id: bible_id.0,
            book_id: book_id.0,
            chapter: chapter.0,
            verse,
            token,
        };
        let ctx = PassContext {
            is_from_server: false,
            route_location: route_location(req),
        };
        let mut sink = ClientNavigation::default();
        let outcome = ResolutionService::new(&self.client)
            .resolve(target, ClientState::from_cookie_header(cookie.0.as_deref()), ctx, &mut sink)
            .await;
        match outcome {
            ResolveOutcome::Rendered(state) => Json(ClientRouteDto {
                navigate_to: None,
                state: Some(*state),
            }),
            ResolveOutcome::Redirected => Json(ClientRouteDto {
                navigate_to: sink.into_path(),
                state: None,
            }),
        }
    }

    #[oai(path = "/api/users/signup", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn sign_up(&self, body: Json<SignupRequest>) -> AccountResponse {
        account_response(AccountService::new(&self.client).sign_up(body.0).await)
    }

    #[oai(path = "/api/users/login", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn log_in(&self, body: Json<LoginRequest>) -> AccountResponse {
        account_response(AccountService::new(&self.client).log_in(body.0).await)
    }

    /// Ask for a password reset email
    #[oai(path = "/api/users/password/reset", method = "post")]
    #[tracing::instrument(level = "debug", skip(self, body))]
    async fn reset_password(&self, body: Json<PasswordResetRequest>) -> AccountResponse {
        account_response(AccountService::new(&self.client).reset_password(body.0).await)
    }
}

impl ReaderApi {
    async fn page(&self, req: &Request, target: RouteTarget, cookie: Option<String>) -> ChapterPageResponse {
        let ctx = PassContext {
            is_from_server: true,
            route_location: route_location(req),
        };
        let fallback = format!("/bible/{}", target.bible_id);
        let mut sink = HttpRedirect::default();
        let outcome = ResolutionService::new(&self.client)
            .resolve(target, ClientState::from_cookie_header(cookie.as_deref()), ctx, &mut sink)
            .await;
        match outcome {
            ResolveOutcome::Rendered(state) => ChapterPageResponse::Ok(Json(*state)),
            ResolveOutcome::Redirected => {
                ChapterPageResponse::Found(sink.into_location().unwrap_or(fallback))
            }
        }
    }
}

fn account_response(result: Result<AccountDto, AccountError>) -> AccountResponse {
    match result {
        Ok(dto) => AccountResponse::Ok(Json(dto)),
        Err(AccountError::Invalid(message)) | Err(AccountError::Upstream(FetchError::Rejected { message, .. })) => {
            AccountResponse::Rejected(Json(AccountErrorDto { message }))
        }
        Err(AccountError::Upstream(e)) => {
            tracing::warn!(error = %e, "account request failed");
            AccountResponse::Unavailable(Json(AccountErrorDto {
                message: "account service unavailable".to_string(),
            }))
        }
    }
}

fn route_location(req: &Request) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

#[cfg(test)]
mod tests {
    use poem::{http::StatusCode, test::TestClient};
    use poem_openapi::OpenApiService;
    use serde_json::json;

    use super::*;
    use crate::dbp_client::{
        FilesetKind,
        testing::{StubTransport, test_client},
    };

    fn api() -> OpenApiService<ReaderApi, ()> {
        let stub = Arc::new(StubTransport::new());
        let c = test_client(stub.clone());
        stub.insert_json(
            &c.bible_url("ENGESV"),
            json!({ "data": {
                "abbr": "ENGESV",
                "name": "English Standard Version",
                "filesets": { "dbp-prod": [
                    { "id": "ENGESVO2ET", "type": "text_plain", "size": "C" },
                    { "id": "ENGESVN2DA", "type": "audio", "size": "NT" }
                ]}
            }}),
        );
        stub.insert_json(
            &c.books_url("ENGESVO2ET", &FilesetKind::TextPlain),
            json!({ "data": [
                { "book_id": "GEN", "name": "Genesis", "testament": "OT", "chapters": [1, 2, 3] }
            ]}),
        );
        stub.insert_json(
            &c.chapter_url("ENGESVO2ET", "GEN", "1"),
            json!({ "data": [ { "verse_start": 1, "verse_text": "In the beginning" } ] }),
        );
        OpenApiService::new(ReaderApi { client: Arc::new(c) }, "test", "0")
    }

    #[tokio::test]
    async fn missing_chapter_answers_302() {
        let cli = TestClient::new(api());
        let resp = cli.get("/bible/ENGESV/GEN/999").send().await;
        resp.assert_status(StatusCode::FOUND);
        resp.assert_header("Location", "/bible/ENGESV/GEN/1");
    }

    #[tokio::test]
    async fn page_load_renders_state_with_cookies() {
        let cli = TestClient::new(api());
        let resp = cli
            .get("/bible/ENGESV/GEN/1")
            .query("verse", &"3")
            .header("Cookie", "bible_is_theme=dark; bible_is_user_id=9")
            .send()
            .await;
        resp.assert_status_is_ok();
        let json = resp.json().await;
        let state = json.value().object();
        state.get("activeBookId").assert_string("GEN");
        state.get("activeBookName").assert_string("Genesis");
        state.get("verseNumber").assert_string("3");
        state.get("isFromServer").assert_bool(true);
        state.get("userAuthenticated").assert_bool(true);
        state.get("routeLocation").assert_string("/bible/ENGESV/GEN/1?verse=3");
        state.get("userSettings").object().get("activeTheme").assert_string("dark");
        state.get("match").object().get("chapter").assert_string("1");
        state
            .get("chapterText")
            .array()
            .get(0)
            .object()
            .get("verse_text")
            .assert_string("In the beginning");
    }

    #[tokio::test]
    async fn bible_route_uses_default_book_and_chapter() {
        let cli = TestClient::new(api());
        let resp = cli.get("/bible/ENGESV").send().await;
        // Genesis 7 is not published in the fixture.
        resp.assert_status(StatusCode::FOUND);
        resp.assert_header("Location", "/bible/ENGESV/GEN/1");
    }

    #[tokio::test]
    async fn navigation_route_returns_path_instead_of_302() {
        let cli = TestClient::new(api());
        let resp = cli.get("/api/bible/ENGESV/ZZZ/1").send().await;
        resp.assert_status_is_ok();
        let json = resp.json().await;
        let body = json.value().object();
        body.get("navigateTo").assert_string("/bible/ENGESV/GEN/1");
        body.get("state").assert_null();
    }

    #[tokio::test]
    async fn navigation_route_renders_client_state() {
        let cli = TestClient::new(api());
        let resp = cli.get("/api/bible/ENGESV/gen/1").send().await;
        resp.assert_status_is_ok();
        let json = resp.json().await;
        let state = json.value().object().get("state").object();
        state.get("isFromServer").assert_bool(false);
        state.get("activeBookId").assert_string("GEN");
    }

    #[tokio::test]
    async fn login_forwards_to_dbp_and_returns_profile() {
        let stub = Arc::new(StubTransport::new());
        let c = test_client(stub.clone());
        let url = c.users_url("/login");
        stub.insert_json(&url, json!({ "id": 42, "email": "ruth@example.org", "nickname": "Ruth" }));
        let cli = TestClient::new(OpenApiService::new(ReaderApi { client: Arc::new(c) }, "test", "0"));

        let resp = cli
            .post("/api/users/login")
            .body_json(&json!({ "email": "ruth@example.org", "password": "hunter2" }))
            .send()
            .await;

        resp.assert_status_is_ok();
        let json = resp.json().await;
        let body = json.value().object();
        body.get("userId").assert_string("42");
        body.get("profile").object().get("nickname").assert_string("Ruth");
        assert_eq!(
            stub.last_form(&url).unwrap().get("password").map(String::as_str),
            Some("hunter2")
        );
    }

    #[tokio::test]
    async fn rejected_login_answers_400_with_reason() {
        let stub = Arc::new(StubTransport::new());
        let c = test_client(stub.clone());
        stub.insert_rejection(&c.users_url("/login"), 401, r#"{"error":{"message":"Invalid credentials"}}"#);
        let cli = TestClient::new(OpenApiService::new(ReaderApi { client: Arc::new(c) }, "test", "0"));

        let resp = cli
            .post("/api/users/login")
            .body_json(&json!({ "email": "ruth@example.org", "password": "wrong" }))
            .send()
            .await;

        resp.assert_status(StatusCode::BAD_REQUEST);
        resp.json().await.value().object().get("message").assert_string("Invalid credentials");
    }

    #[tokio::test]
    async fn signup_with_bad_email_is_refused_locally() {
        let cli = TestClient::new(api());
        let resp = cli
            .post("/api/users/signup")
            .body_json(&json!({ "email": "nobody", "password": "secret" }))
            .send()
            .await;
        resp.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unreachable_api_answers_502() {
        let stub = Arc::new(StubTransport::new());
        let c = test_client(stub.clone());
        stub.insert_status(&c.users_url("/password/email"), 503);
        let cli = TestClient::new(OpenApiService::new(ReaderApi { client: Arc::new(c) }, "test", "0"));

        let resp = cli
            .post("/api/users/password/reset")
            .body_json(&json!({ "email": "naomi@example.org" }))
            .send()
            .await;

        resp.assert_status(StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn hydration_urls_never_expose_the_api_key() {
        let cli = TestClient::new(api());
        let resp = cli.get("/bible/ENGESV/GEN/1").send().await;
        resp.assert_status_is_ok();
        let body = resp.0.into_body().into_string().await.unwrap();
        assert!(body.contains("fetchedUrls"));
        assert!(!body.contains("test-key"));
    }

    #[tokio::test]
    async fn status_is_plain_text() {
        let cli = TestClient::new(api());
        let resp = cli.get("/status").send().await;
        resp.assert_status_is_ok();
        let text = resp.0.into_body().into_string().await.unwrap();
        assert!(text.contains("dbp=http://dbp.test/api"));
    }
}
