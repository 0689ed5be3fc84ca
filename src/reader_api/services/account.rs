// Signup, login and password reset, forwarded to the content API

use crate::{
    dbp_client::{AccountUser, DbpClient, FetchError, SignupForm},
    domain::models::UserProfile,
    reader_api::models::{AccountDto, LoginRequest, PasswordResetRequest, SignupRequest},
};

const DEFAULT_RESET_PATH: &str = "/reset/password";

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Upstream(#[from] FetchError),
}

pub struct AccountService<'a> {
    pub client: &'a DbpClient,
}

impl<'a> AccountService<'a> {
    pub fn new(client: &'a DbpClient) -> Self {
        Self { client }
    }

    #[tracing::instrument(level = "debug", skip(self, req), fields(email = %req.email))]
    pub async fn sign_up(&self, req: SignupRequest) -> Result<AccountDto, AccountError> {
        let email = checked_email(&req.email)?;
        checked_password(&req.password)?;
        let username = req
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| username_from_email(&email));
        let form = SignupForm {
            email,
            password: req.password,
            username,
            first_name: req.first_name.unwrap_or_default(),
            last_name: req.last_name.unwrap_or_default(),
            subscribed: req.subscribed.unwrap_or(false),
        };
        let user = self.client.sign_up(&form).await?;
        tracing::info!(user_id = %user.user_id(), "account created");
        Ok(account(user))
    }

    #[tracing::instrument(level = "debug", skip(self, req), fields(email = %req.email))]
    pub async fn log_in(&self, req: LoginRequest) -> Result<AccountDto, AccountError> {
        let email = checked_email(&req.email)?;
        checked_password(&req.password)?;
        let user = self.client.log_in(&email, &req.password).await?;
        tracing::info!(user_id = %user.user_id(), "user logged in");
        Ok(account(user))
    }

    #[tracing::instrument(level = "debug", skip(self, req), fields(email = %req.email))]
    pub async fn reset_password(&self, req: PasswordResetRequest) -> Result<AccountDto, AccountError> {
        let email = checked_email(&req.email)?;
        let reset_path = req
            .reset_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RESET_PATH.to_string());
        let message = self.client.request_password_reset(&email, &reset_path).await?;
        Ok(AccountDto {
            user_id: None,
            profile: None,
            message: Some(message),
        })
    }
}

fn checked_email(email: &str) -> Result<String, AccountError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_string()),
        _ => Err(AccountError::Invalid("a valid email address is required".into())),
    }
}

fn checked_password(password: &str) -> Result<(), AccountError> {
    if password.is_empty() {
        return Err(AccountError::Invalid("a password is required".into()));
    }
    Ok(())
}

fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

fn account(user: AccountUser) -> AccountDto {
    let user_id = user.user_id();
    let profile = UserProfile {
        email: user.email.unwrap_or_default(),
        nickname: user.nickname.unwrap_or_default(),
        name: user.name.unwrap_or_default(),
        avatar: user.avatar.unwrap_or_default(),
    };
    AccountDto {
        user_id: Some(user_id),
        profile: Some(profile),
        message: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::dbp_client::testing::{StubTransport, test_client};

    fn signup(email: &str, username: Option<&str>) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: "secret".to_string(),
            username: username.map(str::to_string),
            first_name: None,
            last_name: None,
            subscribed: None,
        }
    }

    #[tokio::test]
    async fn signup_derives_username_from_email() {
        let stub = Arc::new(StubTransport::new());
        let c = test_client(stub.clone());
        let url = c.users_url("");
        stub.insert_json(&url, json!({ "id": 5, "email": "lydia@example.org" }));

        let dto = AccountService::new(&c)
            .sign_up(signup(" lydia@example.org ", None))
            .await
            .unwrap();

        assert_eq!(dto.user_id.as_deref(), Some("5"));
        assert_eq!(dto.profile.unwrap().email, "lydia@example.org");
        let form = stub.last_form(&url).unwrap();
        assert_eq!(form.get("name").map(String::as_str), Some("lydia"));
        assert_eq!(form.get("email").map(String::as_str), Some("lydia@example.org"));
        assert_eq!(form.get("subscribed").map(String::as_str), Some("0"));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_api() {
        let stub = Arc::new(StubTransport::new());
        let c = test_client(stub.clone());
        let service = AccountService::new(&c);

        let bad_email = service.sign_up(signup("not-an-email", Some("x"))).await;
        let no_password = service
            .log_in(LoginRequest {
                email: "a@b.c".into(),
                password: String::new(),
            })
            .await;

        assert!(matches!(bad_email, Err(AccountError::Invalid(_))));
        assert!(matches!(no_password, Err(AccountError::Invalid(_))));
        assert_eq!(stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn reset_uses_default_path() {
        let stub = Arc::new(StubTransport::new());
        let c = test_client(stub.clone());
        let url = c.users_url("/password/email");
        stub.insert_json(&url, json!({ "message": "sent" }));

        let dto = AccountService::new(&c)
            .reset_password(PasswordResetRequest {
                email: "a@b.c".into(),
                reset_path: None,
            })
            .await
            .unwrap();

        assert_eq!(dto.message.as_deref(), Some("sent"));
        assert_eq!(dto.user_id, None);
        assert_eq!(
            stub.last_form(&url).unwrap().get("reset_path").map(String::as_str),
            Some(DEFAULT_RESET_PATH)
        );
    }

    #[tokio::test]
    async fn upstream_rejection_is_passed_through() {
        let stub = Arc::new(StubTransport::new());
        let c = test_client(stub.clone());
        stub.insert_rejection(&c.users_url("/login"), 401, r#"{"error":{"message":"Invalid credentials"}}"#);

        let err = AccountService::new(&c)
            .log_in(LoginRequest {
                email: "a@b.c".into(),
                password: "nope".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::Upstream(FetchError::Rejected { status: 401, .. })));
        assert!(err.to_string().contains("Invalid credentials"));
    }
}
