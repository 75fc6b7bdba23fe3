//! Portal session types.
//!
//! Each role signs in through its own portal and carries its own token
//! cookie, so one browser can hold a shop admin and a collector session at
//! the same time.

use serde::{Deserialize, Serialize};

use hire_purchase_core::{BusinessId, MembershipId, MembershipRole, ShopId, UserId};

/// One of the three role-gated route groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Portal {
    BusinessAdmin,
    ShopAdmin,
    Collector,
}

impl Portal {
    pub const ALL: [Self; 3] = [Self::BusinessAdmin, Self::ShopAdmin, Self::Collector];

    /// First path segment of the portal.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::BusinessAdmin => "business-admin",
            Self::ShopAdmin => "shop-admin",
            Self::Collector => "collector",
        }
    }

    #[must_use]
    pub const fn cookie_name(&self) -> &'static str {
        match self {
            Self::BusinessAdmin => "business_admin_token",
            Self::ShopAdmin => "shop_admin_token",
            Self::Collector => "collector_token",
        }
    }

    #[must_use]
    pub const fn role(&self) -> MembershipRole {
        match self {
            Self::BusinessAdmin => MembershipRole::BusinessAdmin,
            Self::ShopAdmin => MembershipRole::ShopAdmin,
            Self::Collector => MembershipRole::Collector,
        }
    }

    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::BusinessAdmin => "Business Admin",
            Self::ShopAdmin => "Shop Admin",
            Self::Collector => "Collector",
        }
    }

    #[must_use]
    pub const fn home_path(&self) -> &'static str {
        match self {
            Self::BusinessAdmin => "/business-admin",
            Self::ShopAdmin => "/shop-admin",
            Self::Collector => "/collector",
        }
    }

    #[must_use]
    pub const fn login_path(&self) -> &'static str {
        match self {
            Self::BusinessAdmin => "/business-admin/login",
            Self::ShopAdmin => "/shop-admin/login",
            Self::Collector => "/collector/login",
        }
    }

    #[must_use]
    pub const fn logout_path(&self) -> &'static str {
        match self {
            Self::BusinessAdmin => "/business-admin/logout",
            Self::ShopAdmin => "/shop-admin/logout",
            Self::Collector => "/collector/logout",
        }
    }

    /// Portal owning a request path, for both pages and `/api/` actions.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.strip_prefix("/api").unwrap_or(path);
        let segment = path.trim_start_matches('/').split('/').next()?;
        Self::ALL.into_iter().find(|p| p.slug() == segment)
    }
}

/// Who is signed in to a portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSession {
    pub user_id: UserId,
    pub membership_id: MembershipId,
    pub business_id: BusinessId,
    pub shop_id: Option<ShopId>,
    pub role: MembershipRole,
    pub name: String,
}

/// JWT claims carried by a portal cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID.
    pub sub: String,
    pub membership_id: MembershipId,
    pub business_id: BusinessId,
    pub shop_id: Option<ShopId>,
    pub role: MembershipRole,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

impl SessionClaims {
    /// Session described by these claims, if the subject is a user ID.
    #[must_use]
    pub fn session(&self) -> Option<PortalSession> {
        let user_id = self.sub.parse::<i32>().ok()?;
        Some(PortalSession {
            user_id: UserId::new(user_id),
            membership_id: self.membership_id,
            business_id: self.business_id,
            shop_id: self.shop_id,
            role: self.role,
            name: self.name.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_from_path() {
        assert_eq!(Portal::from_path("/shop-admin/payments"), Some(Portal::ShopAdmin));
        assert_eq!(
            Portal::from_path("/api/collector/payments"),
            Some(Portal::Collector)
        );
        assert_eq!(Portal::from_path("/business-admin"), Some(Portal::BusinessAdmin));
        assert_eq!(Portal::from_path("/static/app.css"), None);
        assert_eq!(Portal::from_path("/"), None);
    }

    #[test]
    fn test_portal_roles_and_cookies_are_distinct() {
        let cookies: Vec<_> = Portal::ALL.iter().map(Portal::cookie_name).collect();
        assert_eq!(
            cookies,
            vec!["business_admin_token", "shop_admin_token", "collector_token"]
        );
        assert_eq!(Portal::Collector.role(), MembershipRole::Collector);
        assert!(Portal::ShopAdmin.login_path().starts_with(Portal::ShopAdmin.home_path()));
    }

    #[test]
    fn test_claims_session_requires_numeric_subject() {
        let mut claims = SessionClaims {
            sub: "12".to_string(),
            membership_id: MembershipId::new(3),
            business_id: BusinessId::new(1),
            shop_id: Some(ShopId::new(2)),
            role: MembershipRole::Collector,
            name: "Amina".to_string(),
            exp: 0,
            iat: 0,
            iss: "hire-purchase".to_string(),
            aud: "hire-purchase".to_string(),
        };
        assert_eq!(claims.session().unwrap().user_id, UserId::new(12));

        claims.sub = "admin".to_string();
        assert!(claims.session().is_none());
    }
}
