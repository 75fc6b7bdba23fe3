//! Authentication service.
//!
//! Password login per portal. A user signs in to a portal only while holding
//! an active membership for that portal's role; the session token records
//! which membership was used.

mod error;
mod token;

pub use error::AuthError;
pub use token::TokenService;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use hire_purchase_core::Email;

use crate::db::{MembershipRepository, RepositoryError, UserRepository};
use crate::models::{Portal, PortalSession, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash checked when the email is unknown, so a miss costs as much as a
/// wrong password.
static UNKNOWN_USER_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("unknown-user-password").ok());

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    memberships: MembershipRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(pool),
            memberships: MembershipRepository::new(pool),
            tokens,
        }
    }

    /// Sign in to `portal` and issue its session token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::NoMembership` if the user has no active membership
    /// for the portal's role.
    pub async fn login(
        &self,
        portal: Portal,
        email: &str,
        password: &str,
    ) -> Result<(PortalSession, String), AuthError> {
        let email = Email::parse(email)?;

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            verify_unknown_user(password);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        let scope = self
            .memberships
            .find_for_login(user.id, portal.role())
            .await?
            .ok_or(AuthError::NoMembership(portal.title()))?;

        let session = PortalSession {
            user_id: user.id,
            membership_id: scope.membership.id,
            business_id: scope.business.id,
            shop_id: scope.membership.shop_id,
            role: scope.membership.role,
            name: user.name,
        };
        let token = self.tokens.issue(&session)?;

        tracing::info!(
            user_id = %session.user_id,
            membership_id = %session.membership_id,
            portal = portal.slug(),
            "Portal login"
        );

        Ok((session, token))
    }
}

/// Find a user by email, or create one with `password`.
///
/// Existing users keep their password. Returns whether a user was created.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if a new user's password is too short.
pub async fn find_or_create_user(
    users: &UserRepository<'_>,
    email: &str,
    name: &str,
    phone: Option<&str>,
    password: &str,
) -> Result<(User, bool), AuthError> {
    let email = Email::parse(email)?;

    if let Some(user) = users.get_by_email(&email).await? {
        return Ok((user, false));
    }

    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let user = users
        .create(&email, name.trim(), phone, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

    Ok((user, true))
}

// =============================================================================
// Password Helpers
// =============================================================================

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password doesn't match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Spend a full verification on a login for an unknown email.
fn verify_unknown_user(password: &str) {
    if let Some(hash) = UNKNOWN_USER_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(
            hash_password("same-password").unwrap(),
            hash_password("same-password").unwrap()
        );
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::PasswordHash)
        ));
    }

    #[test]
    fn test_unknown_user_hash_is_a_real_argon2_hash() {
        let hash = UNKNOWN_USER_HASH.as_deref().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(matches!(
            verify_password("correct-horse-battery", hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_ok());
    }
}
