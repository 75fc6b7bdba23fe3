//! Portal session tokens (HS256 JWT).
//!
//! The issuer doubles as the audience; tokens from another deployment with a
//! different issuer are rejected even if the secret matches.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::{PortalSession, SessionClaims};

/// Signs and validates portal session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            lifetime: Duration::hours(config.expiry_hours),
        }
    }

    /// Token lifetime, also used as the cookie `Max-Age`.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for `session` starting now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenCreation` if signing fails.
    pub fn issue(&self, session: &PortalSession) -> Result<String, AuthError> {
        self.issue_at(session, Utc::now())
    }

    /// Issue a token as if signed at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenCreation` if signing fails.
    pub fn issue_at(
        &self,
        session: &PortalSession,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = SessionClaims {
            sub: session.user_id.to_string(),
            membership_id: session.membership_id,
            business_id: session.business_id,
            shop_id: session.shop_id,
            role: session.role,
            name: session.name.clone(),
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            aud: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign session token");
            AuthError::TokenCreation
        })
    }

    /// Validate a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for expired tokens and
    /// `AuthError::InvalidToken` for anything else that fails validation.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.issuer]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hire_purchase_core::{BusinessId, MembershipId, MembershipRole, ShopId, UserId};
    use secrecy::SecretString;

    fn config(secret: &str, issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: SecretString::from(secret.to_string()),
            expiry_hours: 12,
            issuer: issuer.to_string(),
        }
    }

    fn session() -> PortalSession {
        PortalSession {
            user_id: UserId::new(7),
            membership_id: MembershipId::new(11),
            business_id: BusinessId::new(1),
            shop_id: Some(ShopId::new(3)),
            role: MembershipRole::ShopAdmin,
            name: "Grace".to_string(),
        }
    }

    #[test]
    fn test_round_trip() {
        let tokens = TokenService::new(&config("kT9#vB2qLm8$Zx4!Rw7pNc5&Hy3*Jd6Q", "hire-purchase"));
        let token = tokens.issue(&session()).unwrap();
        let claims = tokens.validate(&token).unwrap();

        assert_eq!(claims.session().unwrap(), session());
        assert_eq!(claims.aud, "hire-purchase");
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
    }

    #[test]
    fn test_expired_token() {
        let tokens = TokenService::new(&config("kT9#vB2qLm8$Zx4!Rw7pNc5&Hy3*Jd6Q", "hire-purchase"));
        let token = tokens
            .issue_at(&session(), Utc::now() - Duration::days(2))
            .unwrap();

        assert!(matches!(
            tokens.validate(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let signer = TokenService::new(&config("kT9#vB2qLm8$Zx4!Rw7pNc5&Hy3*Jd6Q", "hire-purchase"));
        let verifier = TokenService::new(&config("Pz7@wQ4nKe1%Lr8^Bt5!Vm2&Xc9*Hs3J", "hire-purchase"));
        let token = signer.issue(&session()).unwrap();

        assert!(matches!(
            verifier.validate(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let signer = TokenService::new(&config("kT9#vB2qLm8$Zx4!Rw7pNc5&Hy3*Jd6Q", "other-deployment"));
        let verifier = TokenService::new(&config("kT9#vB2qLm8$Zx4!Rw7pNc5&Hy3*Jd6Q", "hire-purchase"));
        let token = signer.issue(&session()).unwrap();

        assert!(matches!(
            verifier.validate(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token() {
        let tokens = TokenService::new(&config("kT9#vB2qLm8$Zx4!Rw7pNc5&Hy3*Jd6Q", "hire-purchase"));
        assert!(matches!(
            tokens.validate("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }
}
