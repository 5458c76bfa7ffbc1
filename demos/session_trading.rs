//! Establishes a session, places a post-only bid and cancels it.
//!
//! ```sh
//! O2_PRIVATE_KEY=0x... O2_TRADE_ACCOUNT=0x... \
//!     cargo run --example session_trading --features tracing -- FUEL/USDC 0.02 500
//! ```

use std::env;

use o2_client_sdk::session::SessionHandle;
use o2_client_sdk::signing::WalletKind;
use o2_client_sdk::trader::{Network, OrderRequest, Trader, TraderConfig, TradingPolicies};
use o2_client_sdk::types::{OrderType, Side, parse_b256};
use secrecy::SecretString;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_e| "debug".into()))
        .init();

    let mut args = env::args().skip(1);
    let pair = args.next().unwrap_or_else(|| "FUEL/USDC".to_owned());
    let price = args.next().unwrap_or_else(|| "0.02".to_owned());
    let quantity = args.next().unwrap_or_else(|| "500".to_owned());

    let private_key = SecretString::from(env::var("O2_PRIVATE_KEY")?);
    let trade_account_id = parse_b256("O2_TRADE_ACCOUNT", &env::var("O2_TRADE_ACCOUNT")?)?;
    let wallet_kind = env::var("O2_WALLET_KIND")
        .ok()
        .map(|kind| kind.parse::<WalletKind>())
        .transpose()?
        .unwrap_or(WalletKind::Fuel);

    let config = TraderConfig::for_network(
        Network::Testnet,
        private_key,
        wallet_kind,
        TradingPolicies::default().with_collect_orders(true),
    )?;
    let trader = Trader::from_config(config)?;
    info!(owner = %trader.owner().address(), "trader ready");

    let market = trader.market_by_symbol(&pair).await?;
    let session = SessionHandle::new();
    let receipt = trader
        .establish_session(&session, trade_account_id, &[market.market_id])
        .await?;
    info!(tx_id = %receipt.tx_id, expiry = receipt.session_expiry, "session established");

    let order = OrderRequest::new(Side::Buy, price.as_str(), quantity.as_str())
        .with_order_type(OrderType::PostOnly)
        .with_settle_first(true);
    let placed = trader.create_order(&session, &market.market_id, order).await?;
    info!(tx_id = %placed.tx_id, nonce = placed.nonce, orders = ?placed.orders, "order placed");

    let order_ids = placed
        .orders
        .iter()
        .filter_map(|order| order.get("order_id").and_then(|id| id.as_str()))
        .map(|id| parse_b256("order_id", id))
        .collect::<o2_client_sdk::Result<Vec<_>>>()?;
    for receipt in trader
        .cancel_orders(&session, &market.market_id, &order_ids)
        .await?
    {
        info!(tx_id = %receipt.tx_id, nonce = receipt.nonce, "cancelled");
    }

    Ok(())
}
