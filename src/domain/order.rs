//! Pending limit orders.

use chrono::NaiveDateTime;

use super::position::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

/// A resting limit order. Stays `Open` indefinitely until a price check
/// crosses the limit in the order's favor or it is explicitly cancelled.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitOrder {
    pub symbol: String,
    pub quantity: f64,
    pub limit_price: f64,
    pub side: Side,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
}

impl LimitOrder {
    /// Crossing condition: a buy fills at or below the limit, a sell at or
    /// above it.
    pub fn crosses(&self, price: f64) -> bool {
        match self.side {
            Side::Buy => price <= self.limit_price,
            Side::Sell => price >= self.limit_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_order(side: Side, limit_price: f64) -> LimitOrder {
        LimitOrder {
            symbol: "bitcoin".into(),
            quantity: 0.1,
            limit_price,
            side,
            status: OrderStatus::Open,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn buy_crosses_at_or_below_limit() {
        let order = make_order(Side::Buy, 100.0);
        assert!(order.crosses(99.0));
        assert!(order.crosses(100.0));
        assert!(!order.crosses(101.0));
    }

    #[test]
    fn sell_crosses_at_or_above_limit() {
        let order = make_order(Side::Sell, 100.0);
        assert!(order.crosses(101.0));
        assert!(order.crosses(100.0));
        assert!(!order.crosses(99.0));
    }
}
