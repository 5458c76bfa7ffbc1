#![allow(clippy::unwrap_used, reason = "Do not need additional syntax for setting up tests")]

use alloy::primitives::Signature;
use o2_client_sdk::codec::{function_selector, order_args};
use o2_client_sdk::error::Kind;
use o2_client_sdk::payload::{self, ContractCall, GAS_MAX};
use o2_client_sdk::scale::validate_order;
use o2_client_sdk::signing::{CompactSignature, Framing, LocalKey, RawSignature, SessionKey};
use o2_client_sdk::types::{Action, B256, Identity, Market, MarketAsset, OrderType, Side, U256};

fn market(base_decimals: u32) -> Market {
    Market::builder()
        .contract_id(B256::repeat_byte(0xc0))
        .market_id(B256::repeat_byte(0xd0))
        .min_order(1)
        .base(
            MarketAsset::builder()
                .symbol("FUEL")
                .asset_id(B256::repeat_byte(0xba))
                .decimals(base_decimals)
                .max_precision(base_decimals)
                .build(),
        )
        .quote(
            MarketAsset::builder()
                .symbol("USDC")
                .asset_id(B256::repeat_byte(0x9e))
                .decimals(9)
                .max_precision(9)
                .build(),
        )
        .build()
}

fn word(bytes: &[u8], at: usize) -> u64 {
    u64::from_be_bytes(bytes[at..at + 8].try_into().unwrap())
}

#[test]
fn session_delegation_vector() {
    let bytes = payload::session_delegation(
        0,
        0,
        &B256::repeat_byte(0xaa),
        &[B256::repeat_byte(0xbb)],
        1_737_504_000,
    );

    assert_eq!(bytes.len(), 131, "payload length");
    assert_eq!(&bytes[16..24], &[0, 0, 0, 0, 0, 0, 0, 0x0b], "selector length");
    assert_eq!(&bytes[24..35], b"set_session", "selector text");
    assert_eq!(word(&bytes, 35), 1, "option some");
    assert_eq!(word(&bytes, 43), 0, "address discriminant");
    assert_eq!(&bytes[51..83], &[0xaa; 32], "session address");
    assert_eq!(word(&bytes, 83), 1_737_504_000, "expiry");
    assert_eq!(word(&bytes, 91), 1, "contract count");
    assert_eq!(&bytes[99..131], &[0xbb; 32], "contract id");
}

#[test]
fn create_order_selector_literal() {
    let mut expected = vec![0, 0, 0, 0, 0, 0, 0, 12];
    expected.extend_from_slice(b"create_order");
    assert_eq!(function_selector("create_order"), expected, "selector");
}

#[test]
fn order_args_are_tightly_packed() {
    assert_eq!(order_args(1, 2, &OrderType::Spot).len(), 24, "spot");
    assert_eq!(
        order_args(
            1,
            2,
            &OrderType::Limit {
                price: 3,
                timestamp: 4
            }
        )
        .len(),
        40,
        "limit"
    );
}

#[test]
fn action_batch_layout() {
    let market = market(9);
    let action = Action::CreateOrder {
        side: Side::Sell,
        price: 2_000_000_000,
        quantity: 5_000_000_000,
        order_type: OrderType::PostOnly,
    };
    let call = ContractCall::from_action(&action, &market, None).unwrap();
    let bytes = payload::action_batch(7, &[call]).unwrap();

    assert_eq!(word(&bytes, 0), 7, "nonce");
    assert_eq!(word(&bytes, 8), 1, "call count");
    assert_eq!(&bytes[16..48], &[0xc0; 32], "market contract");
    // The encoded selector is itself length-prefixed once more.
    assert_eq!(word(&bytes, 48), 20, "outer selector length");
    assert_eq!(word(&bytes, 56), 12, "inner selector length");
    assert_eq!(&bytes[64..76], b"create_order", "selector");
    assert_eq!(word(&bytes, 76), 5_000_000_000, "sell locks quantity");
    assert_eq!(&bytes[84..116], &[0xba; 32], "base asset");
    assert_eq!(word(&bytes, 116), GAS_MAX, "gas");
    assert_eq!(word(&bytes, 124), 1, "call data present");
    assert_eq!(word(&bytes, 132), 24, "call data length");
    assert_eq!(word(&bytes, 140), 2_000_000_000, "price");
    assert_eq!(word(&bytes, 148), 5_000_000_000, "quantity");
    assert_eq!(word(&bytes, 156), 2, "post only discriminant");
    assert_eq!(bytes.len(), 164, "total length");
}

#[test]
fn withdrawal_layout() {
    let to = Identity::ContractId(B256::repeat_byte(0x01));
    let bytes = payload::withdrawal(3, 9889, &to, &B256::repeat_byte(0x02), 500);

    assert_eq!(bytes.len(), 112, "payload length");
    assert_eq!(word(&bytes, 0), 3, "nonce");
    assert_eq!(word(&bytes, 8), 9889, "chain id");
    assert_eq!(&bytes[16..32], b"\0\0\0\0\0\0\0\x08withdraw", "selector");
    assert_eq!(word(&bytes, 32), 1, "contract discriminant");
    assert_eq!(&bytes[40..72], &[0x01; 32], "recipient");
    assert_eq!(&bytes[72..104], &[0x02; 32], "asset");
    assert_eq!(word(&bytes, 104), 500, "amount");
}

#[test]
fn order_validation_vectors() {
    let market = market(9);

    let err = validate_order(100_000_001, 1, &market).unwrap_err();
    assert_eq!(err.kind(), Kind::Constraint, "fractional quote value");

    validate_order(100_000_000, 5_000_000_000, &market).unwrap();
}

#[test]
fn recovery_bit_is_the_only_difference() {
    let r = [0x11; 32];
    let mut s = [0x22; 32];
    s[0] = 0x3f;
    let even = CompactSignature::pack(RawSignature::new(r, s, 0)).unwrap();
    let odd = CompactSignature::pack(RawSignature::new(r, s, 1)).unwrap();

    assert_eq!(&even.as_bytes()[..32], &r, "r preserved");
    assert_eq!(even.as_bytes()[32] & 0x7f, 0x3f, "low bits preserved");
    assert_eq!(even.as_bytes()[32] ^ odd.as_bytes()[32], 0x80, "top bit differs");
    assert_eq!(&even.as_bytes()[33..], &odd.as_bytes()[33..], "rest identical");
}

#[test]
fn signed_batch_recovers_to_session_key() {
    let key = LocalKey::from_bytes(&B256::repeat_byte(0x42)).unwrap();
    let signer = key.evm_address();
    let session = SessionKey::from_key(key);

    let call = ContractCall::from_action(
        &Action::CancelOrder {
            order_id: B256::repeat_byte(0x07),
        },
        &market(9),
        None,
    )
    .unwrap();
    let bytes = payload::action_batch(1, &[call]).unwrap();
    let raw = session.sign_actions(&bytes).unwrap().unpack();

    let recovered = Signature::new(
        U256::from_be_bytes(raw.r),
        U256::from_be_bytes(raw.s),
        raw.recovery_id == 1,
    )
    .recover_address_from_prehash(&Framing::Raw.digest(&bytes))
    .unwrap();
    assert_eq!(recovered, signer, "session key signed the batch");
}
