//! Portal authentication extractors.
//!
//! Each portal keeps its own token cookie. A valid token is not enough on its
//! own: the membership it names is reloaded on every request and must still
//! be active, hold the portal's role, belong to the same user and business,
//! and (for shop roles) point at an active shop.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, header::COOKIE, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use cookie::{Cookie, SameSite};

use hire_purchase_core::{ActionResult, Email, MembershipId, UserId};

use crate::db::MembershipRepository;
use crate::error::set_sentry_user;
use crate::models::{Business, MembershipScope, Portal, Shop};
use crate::state::AppState;

// =============================================================================
// Contexts
// =============================================================================

/// Signed-in business admin.
#[derive(Debug, Clone)]
pub struct BusinessContext {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: Email,
    pub business: Business,
}

/// Signed-in shop admin or collector.
#[derive(Debug, Clone)]
pub struct ShopContext {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: Email,
    pub business: Business,
    pub shop: Shop,
}

/// Extractor that requires a business admin session.
pub struct RequireBusinessAdmin(pub BusinessContext);

/// Extractor that requires a shop admin session.
pub struct RequireShopAdmin(pub ShopContext);

/// Extractor that requires a collector session.
pub struct RequireCollector(pub ShopContext);

// =============================================================================
// Rejection
// =============================================================================

/// Why a portal request was turned away.
#[derive(Debug)]
pub enum PortalRejection {
    /// No usable session: redirect pages to the login form, 401 for actions.
    Unauthenticated { portal: Portal, api: bool },
    /// Session is valid but the membership no longer grants access.
    Forbidden { api: bool },
    /// The membership could not be loaded.
    Internal { api: bool },
}

impl IntoResponse for PortalRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated { portal, api: false } => {
                Redirect::to(portal.login_path()).into_response()
            }
            Self::Unauthenticated { api: true, .. } => (
                StatusCode::UNAUTHORIZED,
                Json(ActionResult::<()>::err("Please sign in again")),
            )
                .into_response(),
            Self::Forbidden { api: false } => (
                StatusCode::FORBIDDEN,
                "Your access to this portal has been revoked",
            )
                .into_response(),
            Self::Forbidden { api: true } => (
                StatusCode::FORBIDDEN,
                Json(ActionResult::<()>::err(
                    "Your access to this portal has been revoked",
                )),
            )
                .into_response(),
            Self::Internal { api: false } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            Self::Internal { api: true } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ActionResult::<()>::err("Internal server error")),
            )
                .into_response(),
        }
    }
}

// =============================================================================
// Session check
// =============================================================================

/// Value of the named cookie, if the request carries it.
#[must_use]
pub fn read_cookie(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Whether the request targets a JSON action. Nested routers see a stripped
/// path, so the original URI decides.
fn is_api(parts: &Parts) -> bool {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(parts.uri.path(), |uri| uri.path())
        .starts_with("/api/")
}

/// Load and check the membership behind the portal cookie.
async fn authorize(
    parts: &Parts,
    state: &AppState,
    portal: Portal,
) -> Result<MembershipScope, PortalRejection> {
    let api = is_api(parts);
    let unauthenticated = PortalRejection::Unauthenticated { portal, api };

    let Some(token) = read_cookie(parts, portal.cookie_name()) else {
        return Err(unauthenticated);
    };
    let session = match state.tokens().validate(&token) {
        Ok(claims) => claims.session(),
        Err(e) => {
            tracing::debug!(error = %e, portal = portal.slug(), "Rejected portal token");
            None
        }
    };
    let Some(session) = session.filter(|s| s.role == portal.role()) else {
        return Err(unauthenticated);
    };

    let scope = MembershipRepository::new(state.pool())
        .get_scope(session.membership_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, membership_id = %session.membership_id, "Membership lookup failed");
            PortalRejection::Internal { api }
        })?
        .ok_or(PortalRejection::Unauthenticated { portal, api })?;

    let membership = &scope.membership;
    let shop_ok = if portal.role().is_shop_scoped() {
        scope.shop.as_ref().is_some_and(|shop| shop.is_active)
            && membership.shop_id == session.shop_id
    } else {
        membership.shop_id.is_none()
    };
    let granted = membership.is_active
        && membership.role == portal.role()
        && membership.user_id == session.user_id
        && membership.business_id == session.business_id
        && shop_ok;

    if !granted {
        tracing::warn!(
            membership_id = %membership.id,
            user_id = %session.user_id,
            portal = portal.slug(),
            "Portal access denied for inactive or mismatched membership"
        );
        return Err(PortalRejection::Forbidden { api });
    }

    set_sentry_user(session.user_id.as_i32(), Some(scope.user_email.as_str()));
    Ok(scope)
}

fn shop_context(scope: MembershipScope, portal: Portal, api: bool) -> Result<ShopContext, PortalRejection> {
    let shop = scope
        .shop
        .ok_or(PortalRejection::Unauthenticated { portal, api })?;
    Ok(ShopContext {
        membership_id: scope.membership.id,
        user_id: scope.membership.user_id,
        user_name: scope.user_name,
        user_email: scope.user_email,
        business: scope.business,
        shop,
    })
}

impl FromRequestParts<AppState> for RequireBusinessAdmin {
    type Rejection = PortalRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let scope = authorize(parts, state, Portal::BusinessAdmin).await?;
        Ok(Self(BusinessContext {
            membership_id: scope.membership.id,
            user_id: scope.membership.user_id,
            user_name: scope.user_name,
            user_email: scope.user_email,
            business: scope.business,
        }))
    }
}

impl FromRequestParts<AppState> for RequireShopAdmin {
    type Rejection = PortalRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let scope = authorize(parts, state, Portal::ShopAdmin).await?;
        let api = is_api(parts);
        shop_context(scope, Portal::ShopAdmin, api).map(Self)
    }
}

impl FromRequestParts<AppState> for RequireCollector {
    type Rejection = PortalRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let scope = authorize(parts, state, Portal::Collector).await?;
        let api = is_api(parts);
        shop_context(scope, Portal::Collector, api).map(Self)
    }
}

// =============================================================================
// Cookies
// =============================================================================

/// `Set-Cookie` value carrying a portal session token.
#[must_use]
pub fn session_cookie(portal: Portal, token: &str, max_age_seconds: i64, secure: bool) -> String {
    Cookie::build((portal.cookie_name(), token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .secure(secure)
        .max_age(cookie::time::Duration::seconds(max_age_seconds))
        .build()
        .to_string()
}

/// `Set-Cookie` value that removes a portal session cookie.
#[must_use]
pub fn clear_session_cookie(portal: Portal, secure: bool) -> String {
    Cookie::build((portal.cookie_name(), ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .secure(secure)
        .max_age(cookie::time::Duration::ZERO)
        .build()
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(value: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .uri("/shop-admin")
            .header(COOKIE, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(Portal::ShopAdmin, "abc.def.ghi", 43_200, true);
        assert!(cookie.starts_with("shop_admin_token=abc.def.ghi"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Max-Age=43200"));
    }

    #[test]
    fn test_session_cookie_without_tls() {
        let cookie = session_cookie(Portal::Collector, "t", 60, false);
        assert!(cookie.starts_with("collector_token=t"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(Portal::BusinessAdmin, false);
        assert!(cookie.starts_with("business_admin_token="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_read_cookie_picks_portal_cookie() {
        let parts = parts_with_cookie("collector_token=one; shop_admin_token=two");
        assert_eq!(read_cookie(&parts, "shop_admin_token").as_deref(), Some("two"));
        assert_eq!(read_cookie(&parts, "collector_token").as_deref(), Some("one"));
        assert_eq!(read_cookie(&parts, "business_admin_token"), None);
    }

    #[test]
    fn test_rejections() {
        let redirect = PortalRejection::Unauthenticated {
            portal: Portal::Collector,
            api: false,
        }
        .into_response();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            redirect.headers().get("location").unwrap(),
            "/collector/login"
        );

        let api = PortalRejection::Unauthenticated {
            portal: Portal::Collector,
            api: true,
        }
        .into_response();
        assert_eq!(api.status(), StatusCode::UNAUTHORIZED);

        let forbidden = PortalRejection::Forbidden { api: false }.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
