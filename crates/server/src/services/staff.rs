//! Adding shop admins and collectors.
//!
//! Staff are users with a shop membership. Adding someone whose email is
//! already registered with the same business only creates the membership;
//! their password is kept. Accounts of other businesses are never reused.

use serde::Deserialize;
use sqlx::PgPool;

use hire_purchase_core::{BusinessId, Email, MembershipRole, ShopId};

use super::ServiceError;
use super::auth::{self, AuthError};
use crate::db::{MembershipRepository, RepositoryError, UserRepository};
use crate::models::StaffMember;

/// Body of the add-staff actions.
#[derive(Debug, Clone, Deserialize)]
pub struct StaffInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Used only when the email is not registered yet.
    #[serde(default)]
    pub password: String,
}

pub struct StaffService<'a> {
    users: UserRepository<'a>,
    memberships: MembershipRepository<'a>,
}

impl<'a> StaffService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            memberships: MembershipRepository::new(pool),
        }
    }

    /// Give a user `role` in a shop, creating the user if needed.
    ///
    /// The caller must already have checked that the shop belongs to
    /// `business_id`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if the user already holds the role
    /// in this shop, the email belongs to another business's account, or the
    /// input is incomplete.
    pub async fn add(
        &self,
        business_id: BusinessId,
        shop_id: ShopId,
        role: MembershipRole,
        input: &StaffInput,
    ) -> Result<StaffMember, ServiceError> {
        if !role.is_shop_scoped() {
            return Err(ServiceError::Validation(format!(
                "{} is not a shop role",
                role.label()
            )));
        }
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }

        let phone = input
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let (user, created) =
            auth::find_or_create_user(&self.users, &input.email, &input.name, phone, &input.password)
                .await
                .map_err(|e| match e {
                    AuthError::WeakPassword(msg) => {
                        ServiceError::Validation(format!("password {msg}"))
                    }
                    other => ServiceError::Auth(other),
                })?;
        if !created {
            check_reusable(
                self.memberships
                    .is_member_of_business(user.id, business_id)
                    .await?,
                &user.email,
            )?;
        }

        let membership = self
            .memberships
            .create(user.id, business_id, Some(shop_id), role)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ServiceError::Validation(format!(
                    "{} is already a {} of this shop",
                    user.email,
                    role.label().to_lowercase()
                )),
                other => ServiceError::Repository(other),
            })?;

        tracing::info!(
            user_id = %user.id,
            membership_id = %membership.id,
            shop_id = %shop_id,
            role = %role,
            new_user = created,
            "Staff member added"
        );

        self.memberships
            .get_staff_in_shop(shop_id, membership.id, role)
            .await?
            .ok_or(ServiceError::NotFound("staff member"))
    }
}

/// An existing account may only be given a new role inside a business it
/// already belongs to.
fn check_reusable(same_business: bool, email: &Email) -> Result<(), ServiceError> {
    if same_business {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "{email} is registered with another business"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accounts_of_other_businesses_are_not_reused() {
        let email = Email::parse("someone@example.com").unwrap();
        assert!(check_reusable(true, &email).is_ok());
        assert!(matches!(
            check_reusable(false, &email),
            Err(ServiceError::Validation(msg)) if msg.contains("another business")
        ));
    }
}
