//! Authentication route handlers.
//!
//! Email and password sign-in, registration and sign-out. Failed form posts
//! redirect back to the form with an error code, which the page turns into
//! a message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth};
use crate::routes::page::PageContext;
use crate::services::auth::{AuthError, AuthService, MIN_PASSWORD_LENGTH, SignUpResult};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: SecretString,
    pub password_confirm: SecretString,
    pub full_name: Option<String>,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Error code carried in the redirect back to a form.
fn error_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::InvalidEmail(_) => "invalid_email",
        AuthError::InvalidCredentials => "credentials",
        AuthError::EmailNotConfirmed => "unconfirmed",
        AuthError::UserAlreadyExists => "exists",
        AuthError::WeakPassword(_) => "weak_password",
        AuthError::Provider(_) | AuthError::Session(_) => "unavailable",
    }
}

/// Message shown for an error code. Unknown codes show nothing.
fn error_message(code: &str) -> Option<String> {
    let message = match code {
        "invalid_email" => "Please enter a valid email address.".to_string(),
        "credentials" => "Invalid email or password.".to_string(),
        "unconfirmed" => "Please confirm your email address before signing in.".to_string(),
        "exists" => "An account with this email already exists.".to_string(),
        "weak_password" => {
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters.")
        }
        "mismatch" => "Passwords do not match.".to_string(),
        "unavailable" => "Sign-in is temporarily unavailable. Please try again.".to_string(),
        "sign_in_required" => "Please sign in to use your cart.".to_string(),
        _ => return None,
    };
    Some(message)
}

fn success_message(code: &str) -> Option<String> {
    match code {
        "confirm" => Some("Check your email to confirm your account, then sign in.".to_string()),
        "signed_out" => Some("You have been signed out.".to_string()),
        _ => None,
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub min_password_length: usize,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in shoppers go home.
#[instrument(skip(state, nonce))]
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    CspNonce(nonce): CspNonce,
    Query(query): Query<MessageQuery>,
) -> Response {
    if session.is_signed_in() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        page: PageContext::load(&state, session, nonce, "/auth/login").await,
        error: query.error.as_deref().and_then(error_message),
        success: query.success.as_deref().and_then(success_message),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.identity(), state.hub(), &session);

    match auth.sign_in(&form.email, &form.password).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            Redirect::to(&format!("/auth/login?error={}", error_code(&e))).into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page. Signed-in shoppers go home.
#[instrument(skip(state, nonce))]
pub async fn register_page(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    CspNonce(nonce): CspNonce,
    Query(query): Query<MessageQuery>,
) -> Response {
    if session.is_signed_in() {
        return Redirect::to("/").into_response();
    }

    RegisterTemplate {
        page: PageContext::load(&state, session, nonce, "/auth/register").await,
        error: query.error.as_deref().and_then(error_message),
        min_password_length: MIN_PASSWORD_LENGTH,
    }
    .into_response()
}

/// Handle registration form submission.
///
/// Signs the shopper in when the provider allows it; otherwise sends them to
/// the login page to wait for the confirmation email.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    use secrecy::ExposeSecret;

    if form.password.expose_secret() != form.password_confirm.expose_secret() {
        return Redirect::to("/auth/register?error=mismatch").into_response();
    }

    let auth = AuthService::new(state.identity(), state.hub(), &session);
    match auth
        .sign_up(&form.email, &form.password, form.full_name.as_deref())
        .await
    {
        Ok(SignUpResult::SignedIn(_)) => Redirect::to("/").into_response(),
        Ok(SignUpResult::ConfirmationPending) => {
            Redirect::to("/auth/login?success=confirm").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            Redirect::to(&format!("/auth/register?error={}", error_code(&e))).into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    let auth = AuthService::new(state.identity(), state.hub(), &session);
    if let Err(e) = auth.sign_out().await {
        tracing::error!(error = %e, "Failed to clear session on logout");
    }
    Redirect::to("/auth/login?success=signed_out").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_code_has_a_message() {
        let errors = [
            AuthError::InvalidCredentials,
            AuthError::EmailNotConfirmed,
            AuthError::UserAlreadyExists,
            AuthError::WeakPassword("short".to_string()),
            AuthError::Provider(crate::store::BackendError::Unavailable("down".to_string())),
        ];
        for err in &errors {
            assert!(error_message(error_code(err)).is_some(), "{err}");
        }
        assert!(error_message("mismatch").is_some());
        assert!(error_message("<script>").is_none());
    }
}
