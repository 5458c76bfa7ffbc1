use serde::ser::{SerializeStruct as _, Serializer};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use super::{B256, ChainInt, Identity};
use crate::Result;

#[non_exhaustive]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Side {
    #[serde(alias = "buy", alias = "BUY")]
    Buy,
    #[serde(alias = "sell", alias = "SELL")]
    Sell,
}

/// Order execution variant.
///
/// `P` is the price representation: [`ChainInt`] once scaled, or a human
/// input such as [`crate::scale::ScaleInput`] before resolution against a
/// market.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderType<P = ChainInt> {
    Limit { price: P, timestamp: u64 },
    Spot,
    FillOrKill,
    PostOnly,
    Market,
    BoundedMarket { max_price: P, min_price: P },
}

impl<P> OrderType<P> {
    /// Wire discriminant, in declaration order.
    #[must_use]
    pub const fn discriminant(&self) -> u64 {
        match self {
            Self::Limit { .. } => 0,
            Self::Spot => 1,
            Self::FillOrKill => 2,
            Self::PostOnly => 3,
            Self::Market => 4,
            Self::BoundedMarket { .. } => 5,
        }
    }

    /// Converts the embedded prices, leaving the variant untouched.
    pub fn try_map<Q, F>(self, mut convert: F) -> Result<OrderType<Q>>
    where
        F: FnMut(P) -> Result<Q>,
    {
        Ok(match self {
            Self::Limit { price, timestamp } => OrderType::Limit {
                price: convert(price)?,
                timestamp,
            },
            Self::Spot => OrderType::Spot,
            Self::FillOrKill => OrderType::FillOrKill,
            Self::PostOnly => OrderType::PostOnly,
            Self::Market => OrderType::Market,
            Self::BoundedMarket {
                max_price,
                min_price,
            } => OrderType::BoundedMarket {
                max_price: convert(max_price)?,
                min_price: convert(min_price)?,
            },
        })
    }
}

impl Serialize for OrderType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Limit { price, timestamp } => serializer.serialize_newtype_variant(
                "OrderType",
                0,
                "Limit",
                &[price.to_string(), timestamp.to_string()],
            ),
            Self::Spot => serializer.serialize_unit_variant("OrderType", 1, "Spot"),
            Self::FillOrKill => serializer.serialize_unit_variant("OrderType", 2, "FillOrKill"),
            Self::PostOnly => serializer.serialize_unit_variant("OrderType", 3, "PostOnly"),
            Self::Market => serializer.serialize_unit_variant("OrderType", 4, "Market"),
            Self::BoundedMarket {
                max_price,
                min_price,
            } => {
                struct Bounds<'a> {
                    max_price: &'a u64,
                    min_price: &'a u64,
                }

                impl Serialize for Bounds<'_> {
                    fn serialize<S: Serializer>(
                        &self,
                        serializer: S,
                    ) -> std::result::Result<S::Ok, S::Error> {
                        let mut state = serializer.serialize_struct("BoundedMarket", 2)?;
                        state.serialize_field("max_price", &self.max_price.to_string())?;
                        state.serialize_field("min_price", &self.min_price.to_string())?;
                        state.end()
                    }
                }

                serializer.serialize_newtype_variant(
                    "OrderType",
                    5,
                    "BoundedMarket",
                    &Bounds {
                        max_price,
                        min_price,
                    },
                )
            }
        }
    }
}

/// A fully resolved trading action, every number already on-chain scaled.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    CreateOrder {
        side: Side,
        price: ChainInt,
        quantity: ChainInt,
        order_type: OrderType,
    },
    CancelOrder {
        order_id: B256,
    },
    SettleBalance {
        to: Identity,
    },
    RegisterReferer {
        to: Identity,
    },
}

#[serde_as]
#[derive(Serialize)]
struct CreateOrderBody<'a> {
    side: Side,
    #[serde_as(as = "DisplayFromStr")]
    price: ChainInt,
    #[serde_as(as = "DisplayFromStr")]
    quantity: ChainInt,
    order_type: &'a OrderType,
}

#[derive(Serialize)]
struct CancelOrderBody<'a> {
    order_id: &'a B256,
}

#[derive(Serialize)]
struct ToBody<'a> {
    to: &'a Identity,
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::CreateOrder {
                side,
                price,
                quantity,
                order_type,
            } => serializer.serialize_newtype_variant(
                "Action",
                0,
                "CreateOrder",
                &CreateOrderBody {
                    side: *side,
                    price: *price,
                    quantity: *quantity,
                    order_type,
                },
            ),
            Self::CancelOrder { order_id } => serializer.serialize_newtype_variant(
                "Action",
                1,
                "CancelOrder",
                &CancelOrderBody { order_id },
            ),
            Self::SettleBalance { to } => {
                serializer.serialize_newtype_variant("Action", 2, "SettleBalance", &ToBody { to })
            }
            Self::RegisterReferer { to } => serializer.serialize_newtype_variant(
                "Action",
                3,
                "RegisterReferer",
                &ToBody { to },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn create_order_json_uses_string_integers() {
        let action = Action::CreateOrder {
            side: Side::Buy,
            price: 1_500_000,
            quantity: 2_000_000_000,
            order_type: OrderType::Limit {
                price: 1_400_000,
                timestamp: 1_700_000_000,
            },
        };
        assert_eq!(
            serde_json::to_value(action).expect("serializes"),
            json!({
                "CreateOrder": {
                    "side": "Buy",
                    "price": "1500000",
                    "quantity": "2000000000",
                    "order_type": { "Limit": ["1400000", "1700000000"] }
                }
            }),
            "create order body"
        );
    }

    #[test]
    fn unit_and_bounded_order_types() {
        assert_eq!(
            serde_json::to_value(OrderType::PostOnly).expect("unit"),
            json!("PostOnly"),
            "unit variant"
        );
        assert_eq!(
            serde_json::to_value(OrderType::BoundedMarket {
                max_price: 9,
                min_price: 3
            })
            .expect("bounded"),
            json!({ "BoundedMarket": { "max_price": "9", "min_price": "3" } }),
            "bounded variant"
        );
    }

    #[test]
    fn settle_balance_carries_identity() {
        let to = Identity::ContractId(B256::repeat_byte(1));
        assert_eq!(
            serde_json::to_value(Action::SettleBalance { to }).expect("serializes"),
            json!({ "SettleBalance": { "to": { "ContractId": format!("0x{}", "01".repeat(32)) } } }),
            "settle body"
        );
    }

    #[test]
    fn side_accepts_lowercase() {
        let side: Side = serde_json::from_str("\"sell\"").expect("lowercase");
        assert_eq!(side, Side::Sell, "alias");
    }

    #[test]
    fn try_map_keeps_variant() {
        let human: OrderType<&str> = OrderType::BoundedMarket {
            max_price: "2",
            min_price: "1",
        };
        let scaled = human
            .try_map(|p| Ok(p.parse::<u64>().expect("digits") * 10))
            .expect("maps");
        assert_eq!(
            scaled,
            OrderType::BoundedMarket {
                max_price: 20,
                min_price: 10
            },
            "prices converted"
        );
        assert_eq!(scaled.discriminant(), 5, "discriminant");
    }
}
