//! `GoTrue` implementation of the identity provider.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use online_store_core::{Email, Identity};

use super::rows::{
    PasswordGrant, RefreshGrant, SignUpData, SignUpRequest, SignUpResponse, TokenResponse, UserRow,
};
use super::{RawResponse, ServiceErrorBody, SupabaseClient, decode};
use crate::services::auth::{AuthError, AuthSession, IdentityProvider, SignUpOutcome};

/// Identity provider over a Supabase project's auth service.
#[derive(Clone)]
pub struct SupabaseAuth {
    client: SupabaseClient,
}

impl SupabaseAuth {
    #[must_use]
    pub const fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn token<B>(&self, grant_type: &str, body: &B) -> Result<AuthSession, AuthError>
    where
        B: serde::Serialize + Sync,
    {
        let request = self
            .client
            .auth(Method::POST, "token")?
            .query(&[("grant_type", grant_type)])
            .json(body);
        let raw = self.client.send(request).await?;
        if !raw.status.is_success() {
            return Err(classify(raw));
        }
        let token: TokenResponse = decode(&raw.body, "token")?;
        Ok(token.into())
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, AuthError> {
        self.token(
            "password",
            &PasswordGrant {
                email: email.as_str(),
                password: password.expose_secret(),
            },
        )
        .await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        display_name: Option<String>,
    ) -> Result<SignUpOutcome, AuthError> {
        let request = self.client.auth(Method::POST, "signup")?.json(&SignUpRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            data: SignUpData {
                full_name: display_name,
            },
        });
        let raw = self.client.send(request).await?;
        if !raw.status.is_success() {
            return Err(classify(raw));
        }

        match decode(&raw.body, "signup")? {
            SignUpResponse::Session(token) => Ok(SignUpOutcome::SignedIn(token.into())),
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Sign-up awaiting email confirmation");
                Ok(SignUpOutcome::ConfirmationPending)
            }
        }
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError> {
        let request = self
            .client
            .auth(Method::POST, "logout")?
            .bearer_auth(access_token.expose_secret());
        let raw = self.client.send(request).await?;

        // An expired token has nothing left to revoke.
        if raw.status.is_success() || is_rejected_token(raw.status) {
            return Ok(());
        }
        Err(AuthError::Provider(raw.into_error()))
    }

    #[instrument(skip_all)]
    async fn get_identity(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, AuthError> {
        let request = self
            .client
            .auth(Method::GET, "user")?
            .bearer_auth(access_token.expose_secret());
        let raw = self.client.send(request).await?;

        if is_rejected_token(raw.status) {
            return Ok(None);
        }
        if !raw.status.is_success() {
            return Err(AuthError::Provider(raw.into_error()));
        }
        let user: UserRow = decode(&raw.body, "user")?;
        Ok(Some(user.into()))
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, AuthError> {
        self.token(
            "refresh_token",
            &RefreshGrant {
                refresh_token: refresh_token.expose_secret(),
            },
        )
        .await
    }
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        Self {
            identity: token.user.into(),
            access_token: SecretString::from(token.access_token),
            refresh_token: token.refresh_token.map(SecretString::from),
        }
    }
}

const fn is_rejected_token(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Map an auth error response onto the errors a shopper can act on.
fn classify(raw: RawResponse) -> AuthError {
    let body = ServiceErrorBody::parse(&raw.body);
    let message = body.message().unwrap_or_default();
    let lowered = message.to_lowercase();

    match body.code() {
        Some("email_not_confirmed") => return AuthError::EmailNotConfirmed,
        Some("user_already_exists" | "email_exists") => return AuthError::UserAlreadyExists,
        Some("weak_password") => return AuthError::WeakPassword(message),
        Some("invalid_credentials") => return AuthError::InvalidCredentials,
        // Older versions put every token failure under invalid_grant.
        Some("invalid_grant") if lowered.contains("not confirmed") => {
            return AuthError::EmailNotConfirmed;
        }
        Some("invalid_grant") => return AuthError::InvalidCredentials,
        _ => {}
    }

    if lowered.contains("already registered") {
        return AuthError::UserAlreadyExists;
    }

    tracing::error!(status = %raw.status, detail = %message, "Auth provider returned an error");
    AuthError::Provider(raw.into_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_classify_credentials() {
        assert!(matches!(
            classify(raw(400, r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#)),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            classify(raw(400, r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            classify(raw(400, r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#)),
            AuthError::EmailNotConfirmed
        ));
    }

    #[test]
    fn test_classify_sign_up() {
        assert!(matches!(
            classify(raw(422, r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#)),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            classify(raw(422, r#"{"code":422,"msg":"User already registered"}"#)),
            AuthError::UserAlreadyExists
        ));
        let AuthError::WeakPassword(message) = classify(raw(
            422,
            r#"{"code":422,"error_code":"weak_password","msg":"Password should be at least 6 characters."}"#,
        )) else {
            panic!("expected weak password");
        };
        assert_eq!(message, "Password should be at least 6 characters.");
    }

    #[test]
    fn test_classify_other_is_provider_error() {
        assert!(matches!(
            classify(raw(500, "upstream timeout")),
            AuthError::Provider(_)
        ));
    }
}
