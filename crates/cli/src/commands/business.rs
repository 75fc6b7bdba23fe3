//! Tenant bootstrap.
//!
//! Businesses are not created from the web portals; an operator creates the
//! business and its first business admin here, who then adds shops and staff.

use sqlx::PgPool;

use hire_purchase_core::{CurrencyCode, MembershipRole};
use hire_purchase_server::db::{BusinessRepository, MembershipRepository, UserRepository};
use hire_purchase_server::models::Business;
use hire_purchase_server::services::auth;

use super::{CommandError, connect};

/// Arguments of `business create`.
#[derive(Debug)]
pub struct NewBusiness {
    pub name: String,
    pub slug: String,
    pub currency: String,
    pub admin_email: String,
    pub admin_name: String,
    pub admin_password: String,
}

/// Slugs are lowercase ASCII letters, digits and single dashes.
pub fn validate_slug(slug: &str) -> Result<(), CommandError> {
    let valid = !slug.is_empty()
        && slug.len() <= 64
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CommandError::InvalidArgument(format!(
            "slug '{slug}' must be lowercase letters, digits and dashes"
        )))
    }
}

/// Create the business and give the admin user a business-admin membership.
pub async fn create_with_pool(pool: &PgPool, input: &NewBusiness) -> Result<Business, CommandError> {
    if input.name.trim().is_empty() {
        return Err(CommandError::InvalidArgument("name is required".to_string()));
    }
    validate_slug(&input.slug)?;
    let currency = CurrencyCode::parse(&input.currency).map_err(CommandError::InvalidArgument)?;

    let business = BusinessRepository::new(pool)
        .create(input.name.trim(), &input.slug, &currency)
        .await?;

    let (user, created) = auth::find_or_create_user(
        &UserRepository::new(pool),
        &input.admin_email,
        &input.admin_name,
        None,
        &input.admin_password,
    )
    .await?;

    MembershipRepository::new(pool)
        .create(user.id, business.id, None, MembershipRole::BusinessAdmin)
        .await?;

    tracing::info!(
        business_id = %business.id,
        slug = %business.slug,
        admin = %user.email,
        new_user = created,
        "Business created"
    );
    Ok(business)
}

/// `hp-cli business create`.
pub async fn create(input: &NewBusiness) -> Result<(), CommandError> {
    let pool = connect().await?;
    let business = create_with_pool(&pool, input).await?;

    tracing::info!("Business '{}' is ready.", business.name);
    tracing::info!("Sign in at /business-admin/login as {}", input.admin_email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("acme-furniture").is_ok());
        assert!(validate_slug("shop2").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Acme").is_err());
        assert!(validate_slug("-acme").is_err());
        assert!(validate_slug("acme--two").is_err());
        assert!(validate_slug("acme furniture").is_err());
    }
}
