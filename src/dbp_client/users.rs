// Account calls against the DBP users API

use serde::Deserialize;
use serde_json::Value;

use super::{DbpClient, FetchError, error_message};

#[derive(Debug, Clone, PartialEq)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub subscribed: bool,
}

/// User record returned by signup and login.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AccountUser {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl AccountUser {
    /// DBP sends numeric ids; some deployments send strings.
    pub fn user_id(&self) -> String {
        match &self.id {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

impl DbpClient {
    pub fn users_url(&self, path: &str) -> String {
        format!(
            "{}/users{}?key={}&v=4&project_id={}",
            self.base_url, path, self.api_key, self.project_id
        )
    }

    /// POST /users
    #[tracing::instrument(level = "debug", skip(self, form), fields(email = %form.email))]
    pub async fn sign_up(&self, form: &SignupForm) -> Result<AccountUser, FetchError> {
        let url = self.users_url("");
        let fields = vec![
            ("email".to_string(), form.email.clone()),
            ("password".to_string(), form.password.clone()),
            ("name".to_string(), form.username.clone()),
            ("first_name".to_string(), form.first_name.clone()),
            ("last_name".to_string(), form.last_name.clone()),
            ("subscribed".to_string(), if form.subscribed { "1" } else { "0" }.to_string()),
            ("project_id".to_string(), self.project_id.clone()),
        ];
        let raw = self.post_account(&url, &fields).await?;
        decode_user(&url, &raw)
    }

    /// POST /users/login
    #[tracing::instrument(level = "debug", skip(self, password))]
    pub async fn log_in(&self, email: &str, password: &str) -> Result<AccountUser, FetchError> {
        let url = self.users_url("/login");
        let fields = vec![
            ("email".to_string(), email.to_string()),
            ("password".to_string(), password.to_string()),
            ("project_id".to_string(), self.project_id.clone()),
        ];
        let raw = self.post_account(&url, &fields).await?;
        decode_user(&url, &raw)
    }

    /// POST /users/password/email: asks DBP to mail a reset link.
    /// Returns the confirmation message, if DBP sent one.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn request_password_reset(&self, email: &str, reset_path: &str) -> Result<String, FetchError> {
        let url = self.users_url("/password/email");
        let fields = vec![
            ("email".to_string(), email.to_string()),
            ("project_id".to_string(), self.project_id.clone()),
            ("reset_path".to_string(), reset_path.to_string()),
        ];
        let raw = self.post_account(&url, &fields).await?;
        Ok(raw
            .get("message")
            .or_else(|| raw.get("data"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn post_account(&self, url: &str, fields: &[(String, String)]) -> Result<Value, FetchError> {
        let body = self.fetch.post_form(url, fields).await?;
        let raw: Value = serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        // DBP sometimes answers 200 with an error object.
        if let Some(message) = error_message(&raw) {
            let status = raw
                .pointer("/error/status_code")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(200);
            tracing::debug!(status, "account request rejected");
            return Err(FetchError::Rejected {
                url: url.to_string(),
                status,
                message,
            });
        }
        Ok(raw)
    }
}

fn decode_user(url: &str, raw: &Value) -> Result<AccountUser, FetchError> {
    let user = match raw.get("data") {
        Some(data) if data.is_object() => data,
        _ => raw,
    };
    AccountUser::deserialize(user).map_err(|e| {
        tracing::error!(error = %e, "failed to parse DBP user");
        FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::super::testing::{StubTransport, test_client};
    use super::*;

    fn client(stub: &Arc<StubTransport>) -> DbpClient {
        test_client(stub.clone()).with_project_id("52341")
    }

    #[test]
    fn users_url_carries_project() {
        let c = client(&Arc::new(StubTransport::new()));
        assert_eq!(
            c.users_url("/login"),
            "http://dbp.test/api/users/login?key=test-key&v=4&project_id=52341"
        );
    }

    #[tokio::test]
    async fn login_posts_credentials_and_reads_the_user() {
        let stub = Arc::new(StubTransport::new());
        let c = client(&stub);
        let url = c.users_url("/login");
        stub.insert_json(&url, json!({ "id": 1234, "name": "ruth", "email": "ruth@example.org", "nickname": "Ruth" }));

        let user = c.log_in("ruth@example.org", "hunter2").await.unwrap();

        assert_eq!(user.user_id(), "1234");
        assert_eq!(user.nickname.as_deref(), Some("Ruth"));
        let form = stub.last_form(&url).unwrap();
        assert_eq!(form.get("email").map(String::as_str), Some("ruth@example.org"));
        assert_eq!(form.get("password").map(String::as_str), Some("hunter2"));
        assert_eq!(form.get("project_id").map(String::as_str), Some("52341"));
    }

    #[tokio::test]
    async fn error_object_in_a_200_is_a_rejection() {
        let stub = Arc::new(StubTransport::new());
        let c = client(&stub);
        stub.insert_json(
            &c.users_url("/login"),
            json!({ "error": { "message": "Invalid credentials", "status_code": 401 } }),
        );

        let err = c.log_in("ruth@example.org", "wrong").await.unwrap_err();

        assert!(matches!(
            err,
            FetchError::Rejected { status: 401, ref message, .. } if message == "Invalid credentials"
        ));
    }

    #[tokio::test]
    async fn signup_sends_profile_fields_and_unwraps_data() {
        let stub = Arc::new(StubTransport::new());
        let c = client(&stub);
        let url = c.users_url("");
        stub.insert_json(&url, json!({ "data": { "id": "77", "email": "boaz@example.org" } }));

        let user = c
            .sign_up(&SignupForm {
                email: "boaz@example.org".into(),
                password: "secret".into(),
                username: "boaz".into(),
                first_name: "Boaz".into(),
                last_name: String::new(),
                subscribed: true,
            })
            .await
            .unwrap();

        assert_eq!(user.user_id(), "77");
        let form = stub.last_form(&url).unwrap();
        assert_eq!(form.get("name").map(String::as_str), Some("boaz"));
        assert_eq!(form.get("subscribed").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn password_reset_returns_the_confirmation() {
        let stub = Arc::new(StubTransport::new());
        let c = client(&stub);
        let url = c.users_url("/password/email");
        stub.insert_json(&url, json!({ "message": "Reset link sent" }));

        let message = c.request_password_reset("naomi@example.org", "/reset").await.unwrap();

        assert_eq!(message, "Reset link sent");
        assert_eq!(
            stub.last_form(&url).unwrap().get("reset_path").map(String::as_str),
            Some("/reset")
        );
    }

    #[tokio::test]
    async fn unknown_account_is_rejected_with_reason() {
        let stub = Arc::new(StubTransport::new());
        let c = client(&stub);
        stub.insert_rejection(
            &c.users_url("/password/email"),
            404,
            r#"{"error":{"message":"No user found"}}"#,
        );

        let err = c.request_password_reset("nobody@example.org", "/reset").await.unwrap_err();

        assert!(matches!(err, FetchError::Rejected { status: 404, ref message, .. } if message == "No user found"));
    }
}
