use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
///
/// Serializes as a bare integer number of cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole dollar value.
    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars.saturating_mul(100),
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, saturating at the bounds of `i64`.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    /// Returns `basis_points / 10_000` of this amount, rounded half away from zero,
    /// or `None` when the result does not fit.
    ///
    /// `Money::from_cents(10_000).checked_percentage(1_000)` is ten percent of $100.00.
    pub fn checked_percentage(&self, basis_points: u32) -> Option<Money> {
        i64::try_from(Self::scaled(self.cents, basis_points))
            .ok()
            .map(Money::from_cents)
    }

    /// Like [`Money::checked_percentage`] but saturating.
    pub fn percentage(&self, basis_points: u32) -> Money {
        let cents = Self::scaled(self.cents, basis_points)
            .clamp(i128::from(i64::MIN), i128::from(i64::MAX));
        Money {
            cents: cents as i64,
        }
    }

    fn scaled(cents: i64, basis_points: u32) -> i128 {
        // i64 * u32 always fits in i128
        let scaled = i128::from(cents) * i128::from(basis_points);
        let half = 5_000i128 * scaled.signum();
        (scaled + half) / 10_000
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

// Operators saturate; callers that must reject overflow use the checked methods.
impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_sub(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply(3).cents(), 3000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(Money::from_dollars(100).percentage(1_000), Money::from_dollars(10));
        // 10% of $0.05 is half a cent.
        assert_eq!(Money::from_cents(5).percentage(1_000).cents(), 1);
        assert_eq!(Money::from_cents(4).percentage(1_000).cents(), 0);
        assert_eq!(Money::from_cents(-5).percentage(1_000).cents(), -1);
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.checked_multiply(2), None);
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(max.checked_percentage(20_000), None);
        assert_eq!(
            Money::from_cents(250).checked_multiply(4),
            Some(Money::from_cents(1000))
        );
        assert_eq!(
            Money::from_dollars(100).checked_percentage(1_000),
            Some(Money::from_dollars(10))
        );
    }

    #[test]
    fn test_operators_saturate_instead_of_wrapping() {
        let max = Money::from_cents(i64::MAX);
        assert_eq!(max.multiply(2), max);
        assert_eq!(max + Money::from_cents(1), max);
        assert_eq!(max.percentage(20_000), max);
        let total: Money = [max, max].into_iter().sum();
        assert_eq!(total, max);
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [100, 250, 50].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 400);
    }

    #[test]
    fn test_money_serializes_as_cents() {
        assert_eq!(serde_json::to_string(&Money::from_cents(1999)).unwrap(), "1999");
        let parsed: Money = serde_json::from_str("250").unwrap();
        assert_eq!(parsed, Money::from_cents(250));
    }
}
