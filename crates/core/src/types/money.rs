//! Decimal money amounts.
//!
//! All balances are stored with two decimal places. Rounding is always
//! midpoint-away-from-zero so a receipt printed by hand matches the ledger.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub, SubAssign};
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept for every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// A monetary amount in the business currency.
///
/// The currency itself lives on the business; amounts inside one business are
/// always in the same currency, so the amount carries no code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount without rounding.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build an amount from minor units (e.g. cents).
    #[must_use]
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, MONEY_SCALE))
    }

    /// Build an amount from whole major units.
    #[must_use]
    pub fn from_major(major: i64) -> Self {
        Self(Decimal::from(major))
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Round to two decimal places, midpoint away from zero.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Multiply by a quantity, rounding the result.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity)).rounded()
    }

    /// Take `rate` percent of this amount, rounding the result.
    #[must_use]
    pub fn percent(self, rate: Decimal) -> Self {
        Self(self.0 * rate / Decimal::ONE_HUNDRED).rounded()
    }

    /// Divide into `parts` equal shares, rounding each share.
    ///
    /// Returns zero when `parts` is zero.
    #[must_use]
    pub fn share(self, parts: u32) -> Self {
        if parts == 0 {
            return Self::ZERO;
        }
        Self(self.0 / Decimal::from(parts)).rounded()
    }

    /// Clamp negative amounts to zero.
    #[must_use]
    pub fn non_negative(self) -> Self {
        if self.is_negative() { Self::ZERO } else { self }
    }

    /// Format with thousands separators and two decimals, e.g. `12,500.00`.
    #[must_use]
    pub fn grouped(&self) -> String {
        let rounded = self.rounded().0;
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let text = format!("{:.2}", rounded.abs());
        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, ch) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        if negative {
            format!("-{grouped}.{fraction}")
        } else {
            format!("{grouped}.{fraction}")
        }
    }

    /// Format with a currency symbol prefix, e.g. `KSh 12,500.00`.
    #[must_use]
    pub fn display_with(&self, currency: &CurrencyCode) -> String {
        format!("{} {}", currency.symbol(), self.grouped())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim().replace(',', "").as_str()).map(Self)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        Ok(Self(<Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// ISO 4217 currency code configured on a business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse a three-letter code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns the rejected input when it is not three ASCII letters.
    pub fn parse(code: &str) -> Result<Self, String> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(format!("invalid currency code: {code}"))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display symbol; falls back to the code itself.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self.0.as_str() {
            "USD" => "$",
            "EUR" => "€",
            "GBP" => "£",
            "KES" => "KSh",
            "UGX" => "USh",
            "TZS" => "TSh",
            "NGN" => "₦",
            "GHS" => "GH₵",
            "ZAR" => "R",
            "INR" => "₹",
            other => other,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("USD".to_owned())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn test_rounding_is_midpoint_away_from_zero() {
        assert_eq!(money("10.005").rounded(), money("10.01"));
        assert_eq!(money("10.004").rounded(), money("10.00"));
        assert_eq!(money("-2.345").rounded(), money("-2.35"));
    }

    #[test]
    fn test_percent_and_share() {
        assert_eq!(money("1000").percent(Decimal::new(125, 1)), money("125.00"));
        assert_eq!(money("100").share(3), money("33.33"));
        assert_eq!(money("100").share(0), Money::ZERO);
    }

    #[test]
    fn test_times() {
        assert_eq!(money("19.99").times(3), money("59.97"));
    }

    #[test]
    fn test_grouped_formatting() {
        assert_eq!(money("0").grouped(), "0.00");
        assert_eq!(money("999.5").grouped(), "999.50");
        assert_eq!(money("1234.5").grouped(), "1,234.50");
        assert_eq!(money("1234567.891").grouped(), "1,234,567.89");
        assert_eq!(money("-12500").grouped(), "-12,500.00");
    }

    #[test]
    fn test_parse_accepts_separators() {
        assert_eq!(money(" 12,500.50 "), Money::from_minor(1_250_050));
    }

    #[test]
    fn test_display_with_currency() {
        let kes = CurrencyCode::parse("kes").unwrap();
        assert_eq!(money("2500").display_with(&kes), "KSh 2,500.00");
        let xof = CurrencyCode::parse("XOF").unwrap();
        assert_eq!(money("10").display_with(&xof), "XOF 10.00");
    }

    #[test]
    fn test_currency_code_validation() {
        assert!(CurrencyCode::parse("US").is_err());
        assert!(CurrencyCode::parse("U5D").is_err());
        assert_eq!(CurrencyCode::parse(" gbp ").unwrap().as_str(), "GBP");
    }

    #[test]
    fn test_sum_and_non_negative() {
        let total: Money = [money("1.10"), money("2.20"), money("3.30")].into_iter().sum();
        assert_eq!(total, money("6.60"));
        assert_eq!((money("1") - money("5")).non_negative(), Money::ZERO);
    }

    #[test]
    fn test_serializes_as_string() {
        assert_eq!(serde_json::to_string(&money("12.50")).unwrap(), "\"12.50\"");
    }
}
