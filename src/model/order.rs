use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// `pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "rejected" => Ok(OrderStatus::Rejected),
            _ => Err(UnknownVariant::new("order status", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub product_id: Option<Uuid>,
    pub user_id: Uuid,
    pub quantity: i32,
    pub total_amount: Decimal,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const MAX_QUANTITY: i32 = 1_000_000;

/// Unit price (or zero when the product has no priced variation) times quantity, to cents.
/// `None` when the total does not fit the amount column.
pub fn compute_total(unit_price: Option<Decimal>, quantity: i32) -> Option<Decimal> {
    let mut total = unit_price
        .unwrap_or(Decimal::ZERO)
        .checked_mul(Decimal::from(quantity))?
        .round_dp(2);
    total.rescale(2);
    (total <= super::max_amount()).then_some(total)
}

/// `ORD-<unix millis>-<000..999>`.
pub fn generate_order_number() -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("ORD-{}-{:03}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn total_is_first_price_times_quantity() {
        let total = compute_total(Some(Decimal::from_str("50.00").unwrap()), 2).unwrap();
        assert_eq!(total, Decimal::from_str("100.00").unwrap());
        assert_eq!(total.to_string(), "100.00");
    }

    #[test]
    fn missing_price_totals_zero() {
        assert_eq!(compute_total(None, 3).unwrap().to_string(), "0.00");
    }

    #[test]
    fn totals_past_the_amount_column_are_refused() {
        let price = Decimal::from_str("50.00").unwrap();
        assert!(compute_total(Some(price), 1_000_000_000).is_none());
        assert_eq!(
            compute_total(Some(crate::model::max_amount()), 1),
            Some(Decimal::from_str("9999999999.99").unwrap())
        );
    }

    #[test]
    fn order_numbers_have_millis_and_three_digits() {
        let re = regex::Regex::new(r"^ORD-\d+-\d{3}$").unwrap();
        for _ in 0..50 {
            let n = generate_order_number();
            assert!(re.is_match(&n), "{}", n);
        }
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Approved.is_terminal());
        assert_eq!(OrderStatus::try_from("rejected".to_string()).unwrap(), OrderStatus::Rejected);
        assert!(OrderStatus::try_from("shipped".to_string()).is_err());
    }
}
