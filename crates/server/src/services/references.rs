//! Human-readable document numbers.
//!
//! `PAY-20250314-7QK2MZ` for payments and `HP-20250314-A9X04T` for
//! purchases. The suffix is random; uniqueness is enforced by the database.

use chrono::{DateTime, Utc};
use rand::Rng;

const SUFFIX_LENGTH: usize = 6;
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET.get(idx).copied().map_or('0', char::from)
        })
        .collect()
}

fn reference(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}-{}-{}", now.format("%Y%m%d"), random_suffix())
}

/// Reference printed on a payment receipt.
#[must_use]
pub fn payment_reference(now: DateTime<Utc>) -> String {
    reference("PAY", now)
}

/// Number printed on a purchase invoice.
#[must_use]
pub fn purchase_number(now: DateTime<Utc>) -> String {
    reference("HP", now)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_payment_reference_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        let reference = payment_reference(now);

        assert!(reference.starts_with("PAY-20250314-"));
        let suffix = reference.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), SUFFIX_LENGTH);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_purchase_number_format() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let number = purchase_number(now);
        assert!(number.starts_with("HP-20241231-"));
        assert_eq!(number.len(), "HP-20241231-".len() + SUFFIX_LENGTH);
    }
}
