//! Portal login and logout.
//!
//! Each portal mounts these handlers under its own prefix; the portal is
//! passed in as a request extension so one set of handlers serves all three.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Extension, Form, Router,
    extract::{Query, State},
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::clear_sentry_user;
use crate::filters;
use crate::middleware::{clear_session_cookie, session_cookie};
use crate::models::Portal;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Query parameters for error display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub portal: Portal,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Message for an `?error=` code set by [`login`].
fn error_message(code: &str) -> Option<&'static str> {
    match code {
        "credentials" => Some("Invalid email or password."),
        "access" => Some("Your account has no active access to this portal."),
        "server" => Some("Something went wrong. Please try again."),
        _ => None,
    }
}

fn success_message(code: &str) -> Option<&'static str> {
    match code {
        "logout" => Some("You have been signed out."),
        _ => None,
    }
}

/// Create login/logout routes for one portal.
pub fn routes(portal: Portal) -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .layer(Extension(portal))
}

/// Display the login page.
pub async fn login_page(
    Extension(portal): Extension<Portal>,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        portal,
        error: query.error.as_deref().and_then(error_message),
        success: query.success.as_deref().and_then(success_message),
    }
}

/// Handle login form submission.
///
/// On success the portal cookie is set and the user lands on the portal
/// dashboard; failures redirect back with an error code.
#[instrument(skip(state, form))]
pub async fn login(
    Extension(portal): Extension<Portal>,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.pool(), state.tokens());

    match auth.login(portal, &form.email, &form.password).await {
        Ok((_session, token)) => {
            let max_age = state.tokens().lifetime().num_seconds();
            let cookie = session_cookie(portal, &token, max_age, state.config().secure_cookies());
            ([(SET_COOKIE, cookie)], Redirect::to(portal.home_path())).into_response()
        }
        Err(e) => {
            let code = match &e {
                AuthError::InvalidEmail(_) | AuthError::InvalidCredentials => "credentials",
                AuthError::NoMembership(_) => "access",
                _ => "server",
            };
            if code == "server" {
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Login failed");
            } else {
                tracing::warn!(error = %e, "Login rejected");
            }
            Redirect::to(&format!("{}?error={code}", portal.login_path())).into_response()
        }
    }
}

/// Clear the portal cookie and return to the login page.
pub async fn logout(Extension(portal): Extension<Portal>, State(state): State<AppState>) -> Response {
    clear_sentry_user();
    let cookie = clear_session_cookie(portal, state.config().secure_cookies());
    (
        [(SET_COOKIE, cookie)],
        Redirect::to(&format!("{}?success=logout", portal.login_path())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(error_message("credentials"), Some("Invalid email or password."));
        assert!(error_message("access").is_some());
        assert_eq!(error_message("<script>"), None);
        assert_eq!(success_message("logout"), Some("You have been signed out."));
    }

    #[test]
    fn test_login_page_renders_portal_form() {
        let html = LoginTemplate {
            portal: Portal::ShopAdmin,
            error: error_message("credentials"),
            success: None,
        }
        .render()
        .unwrap_or_default();
        assert!(html.contains("action=\"/shop-admin/login\""));
        assert!(html.contains("Invalid email or password."));
    }
}
