use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Method, Request, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::{
    ActionBatchRequest, ActionOutcome, OWNER_ID_HEADER, SessionReceipt, SessionRequest,
    Transport, TxReceipt, WithdrawRequest,
};
use crate::Result;
use crate::error::{Error, Kind, OnChainRevert, Preflight, Status};
use crate::serde_helpers::u64_flexible;
use crate::types::{B256, MarketsResponse};

/// REST transport against the exchange API.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    host: Url,
    client: ReqwestClient,
}

#[derive(Deserialize)]
struct AccountResponse {
    #[serde(default)]
    trade_account: Option<TradeAccount>,
}

#[derive(Deserialize)]
struct TradeAccount {
    #[serde(default, deserialize_with = "u64_flexible")]
    nonce: u64,
}

impl HttpTransport {
    #[must_use]
    pub fn new(host: Url) -> Self {
        Self::with_client(host, ReqwestClient::new())
    }

    #[must_use]
    pub fn with_client(host: Url, client: ReqwestClient) -> Self {
        Self { host, client }
    }

    #[must_use]
    pub fn host(&self) -> &Url {
        &self.host
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.host.join(path)?)
    }

    fn owner_headers(owner: &B256) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&owner.to_string())
            .map_err(|e| Error::internal(format!("invalid owner header: {e}")))?;
        headers.insert(OWNER_ID_HEADER, value);
        Ok(headers)
    }

    async fn send(&self, request: Request) -> Result<(Method, String, StatusCode, String)> {
        let method = request.method().clone();
        let path = request.url().path().to_owned();

        #[cfg(feature = "tracing")]
        tracing::debug!(%method, %path, "sending request");

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        #[cfg(feature = "tracing")]
        tracing::debug!(%method, %path, %status, bytes = body.len(), "received response");

        Ok((method, path, status, body))
    }

    /// Sends `request` and decodes a success body, classifying failures into
    /// preflight rejections, on-chain reverts or plain status errors.
    async fn request<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let (method, path, status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(classify_failure(status, method, path, &body));
        }
        decode(&body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_markets(&self) -> Result<MarketsResponse> {
        let request = self
            .client
            .request(Method::GET, self.endpoint("v1/markets")?)
            .build()?;
        self.request(request).await
    }

    async fn fetch_nonce(&self, trade_account_id: &B256) -> Result<u64> {
        let request = self
            .client
            .request(Method::GET, self.endpoint("v1/accounts")?)
            .query(&[("trade_account_id", trade_account_id.to_string())])
            .build()?;
        let account: AccountResponse = self.request(request).await?;
        Ok(account.trade_account.map_or(0, |account| account.nonce))
    }

    async fn submit_session_delegation(
        &self,
        owner: &B256,
        request: &SessionRequest,
    ) -> Result<SessionReceipt> {
        let request = self
            .client
            .request(Method::PUT, self.endpoint("v1/session")?)
            .headers(Self::owner_headers(owner)?)
            .json(request)
            .build()?;
        self.request(request).await
    }

    async fn submit_action_batch(
        &self,
        owner: &B256,
        request: &ActionBatchRequest,
    ) -> Result<ActionOutcome> {
        let request = self
            .client
            .request(Method::POST, self.endpoint("v1/session/actions")?)
            .headers(Self::owner_headers(owner)?)
            .json(request)
            .build()?;
        let (method, path, status, body) = self.send(request).await?;

        let Ok(value) = serde_json::from_str::<Value>(&body) else {
            return Err(status_error(status, method, path, &body));
        };
        if let Some(outcome) = classify_outcome(&value) {
            return Ok(outcome);
        }
        Err(status_error(status, method, path, &body))
    }

    async fn submit_withdrawal(
        &self,
        owner: &B256,
        request: &WithdrawRequest,
    ) -> Result<TxReceipt> {
        let request = self
            .client
            .request(Method::POST, self.endpoint("v1/accounts/withdraw")?)
            .headers(Self::owner_headers(owner)?)
            .json(request)
            .build()?;
        let (method, path, status, body) = self.send(request).await?;

        // Withdrawals can report a coded rejection with a 200 status.
        if let Ok(value) = serde_json::from_str::<Value>(&body) {
            match classify_outcome(&value) {
                Some(ActionOutcome::Success { tx_id, .. }) => return Ok(TxReceipt::new(tx_id)),
                Some(ActionOutcome::Preflight(preflight)) => return Err(preflight.into()),
                Some(ActionOutcome::OnChainRevert(revert)) => return Err(revert.into()),
                None => {}
            }
        }
        Err(status_error(status, method, path, &body))
    }
}

/// `tx_id` means executed, `code` means rejected before submission, and a
/// bare `message` means the transaction reverted.
fn classify_outcome(value: &Value) -> Option<ActionOutcome> {
    let text = |key: &str| value.get(key).and_then(Value::as_str);

    if let Some(tx_id) = text("tx_id") {
        let tx_id = if tx_id.starts_with("0x") {
            tx_id.to_owned()
        } else {
            format!("0x{tx_id}")
        };
        let orders = value
            .get("orders")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        return Some(ActionOutcome::Success { tx_id, orders });
    }

    if let Some(code) = value.get("code").and_then(Value::as_u64) {
        let code = u32::try_from(code).unwrap_or(u32::MAX);
        let message = text("message").unwrap_or("unknown error");
        return Some(ActionOutcome::Preflight(Preflight::new(code, message)));
    }

    text("message").map(|message| {
        ActionOutcome::OnChainRevert(OnChainRevert::new(
            message,
            text("reason").unwrap_or_default(),
            value.get("receipts").cloned(),
        ))
    })
}

fn classify_failure(status: StatusCode, method: Method, path: String, body: &str) -> Error {
    let outcome = serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(classify_outcome);
    match outcome {
        Some(ActionOutcome::Preflight(preflight)) => preflight.into(),
        Some(ActionOutcome::OnChainRevert(revert)) => revert.into(),
        Some(ActionOutcome::Success { .. }) | None => status_error(status, method, path, body),
    }
}

fn status_error(status: StatusCode, method: Method, path: String, body: &str) -> Error {
    Status {
        status_code: status,
        method,
        path,
        message: body.to_owned(),
    }
    .into()
}

#[cfg(feature = "tracing")]
fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(body);
    let mut ignored = Vec::new();
    let value = serde_path_to_error::deserialize(serde_ignored::Deserializer::new(
        &mut deserializer,
        |path| ignored.push(path.to_string()),
    ))
    .map_err(|e| Error::with_source(Kind::Internal, e))?;
    if !ignored.is_empty() {
        tracing::trace!(?ignored, "response carried unmodelled fields");
    }
    Ok(value)
}

#[cfg(not(feature = "tracing"))]
fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::with_source(Kind::Internal, e))
}
