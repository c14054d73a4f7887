//! XRP Ledger WebSocket API client.
//!
//! Requests are JSON objects carrying an `id` and a `command`; the matching
//! response echoes the `id` with `status` set to `success` or `error`. One
//! request is in flight at a time, so the stream lock is held from send until
//! the matching response arrives. Messages without our `id` (ledger-side
//! errors, stray stream events) are logged and skipped. Transactions are
//! signed locally from the wallet seed; only the signed blob is sent.

use crate::adapters::codec::sign_transaction;
use crate::adapters::faucet::FaucetClient;
use crate::adapters::keypair::Keypair;
use crate::config::NetworkConfig;
use crate::domain::currency::drops_to_xrp;
use crate::domain::model::{
    AccountInfo, Asset, PoolInfo, PreparedTransaction, SignedTransaction, Transaction,
    TransactionOutcome, Wallet,
};
use crate::domain::ports::{LedgerClient, LedgerClientFactory};
use crate::utils::error::{LedgerError, LedgerResult};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// autofill 時 LastLedgerSequence 相對於目前 ledger 的偏移
pub const LEDGER_OFFSET: u32 = 20;

/// 只有 NetworkID 大於此值的網路才需要在交易中帶上 NetworkID
const RESTRICTED_NETWORK_ID: u64 = 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccountData {
    account: String,
    #[serde(default)]
    flags: u32,
    sequence: u32,
    balance: String,
}

pub struct WsLedgerClient {
    network: NetworkConfig,
    faucet: FaucetClient,
    stream: Mutex<Option<WsStream>>,
    next_id: AtomicU64,
}

impl WsLedgerClient {
    pub fn new(network: NetworkConfig) -> LedgerResult<Self> {
        let faucet = FaucetClient::new(
            network.faucet_url.clone(),
            Duration::from_secs(network.request_timeout_seconds),
        )?;

        Ok(Self {
            network,
            faucet,
            stream: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.network.ws_url
    }

    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// 送出一個命令並等待對應 id 的回應，回傳其中的 `result`
    pub async fn request(&self, command: &str, params: Value) -> LedgerResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut payload = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        payload.insert("id".to_string(), json!(id));
        payload.insert("command".to_string(), json!(command));

        let mut guard = self.stream.lock().await;
        let ws = guard.as_mut().ok_or(LedgerError::NotConnected)?;

        tracing::trace!(id, command, "Sending ledger request");
        ws.send(Message::Text(Value::Object(payload).to_string()))
            .await?;

        let seconds = self.network.request_timeout_seconds;
        tokio::time::timeout(
            Duration::from_secs(seconds),
            Self::read_response(ws, id, command),
        )
        .await
        .map_err(|_| LedgerError::Timeout {
            command: command.to_string(),
            seconds,
        })?
    }

    async fn read_response(ws: &mut WsStream, id: u64, command: &str) -> LedgerResult<Value> {
        while let Some(frame) = ws.next().await {
            match frame? {
                Message::Text(text) => {
                    let message: Value = match serde_json::from_str(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            tracing::warn!("Failed to parse ledger message: {}", e);
                            continue;
                        }
                    };
                    if let Some(response) = match_response(command, id, &message) {
                        return response;
                    }
                }
                Message::Ping(data) => ws.send(Message::Pong(data)).await?,
                Message::Close(frame) => {
                    tracing::warn!("🚨 Ledger closed the connection: {:?}", frame);
                    return Err(LedgerError::ConnectionClosed);
                }
                _ => {}
            }
        }

        Err(LedgerError::ConnectionClosed)
    }

    async fn account_data(&self, address: &str, ledger_index: &str) -> LedgerResult<AccountInfo> {
        let result = self
            .request(
                "account_info",
                json!({ "account": address, "ledger_index": ledger_index }),
            )
            .await?;

        let data: AccountData = serde_json::from_value(
            result
                .get("account_data")
                .cloned()
                .ok_or_else(|| LedgerError::UnexpectedResponse("account_info without account_data".to_string()))?,
        )?;
        let balance_drops = data.balance.parse::<u64>().map_err(|_| {
            LedgerError::UnexpectedResponse(format!("invalid balance '{}'", data.balance))
        })?;

        Ok(AccountInfo {
            address: data.account,
            flags: data.flags,
            sequence: data.sequence,
            balance_drops,
        })
    }

    /// faucet 注資後帳戶要等下一個 ledger 才會出現
    async fn wait_for_account(&self, address: &str) -> LedgerResult<()> {
        for attempt in 1..=self.network.funding_poll_attempts {
            match self.account_data(address, "current").await {
                Ok(_) => return Ok(()),
                Err(e) if e.rpc_error() == Some("actNotFound") => {
                    tracing::debug!("Waiting for {} to appear on ledger (attempt {})", address, attempt);
                    tokio::time::sleep(self.poll_interval()).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(LedgerError::UnexpectedResponse(format!(
            "account {} not found after funding",
            address
        )))
    }

    async fn current_ledger_index(&self) -> LedgerResult<u32> {
        let result = self.request("ledger_current", json!({})).await?;
        ledger_index_field(&result, &["/ledger_current_index"])
    }

    async fn validated_ledger_index(&self) -> LedgerResult<u32> {
        let result = self
            .request("ledger", json!({ "ledger_index": "validated" }))
            .await?;
        ledger_index_field(&result, &["/ledger_index", "/ledger/ledger_index"])
    }

    async fn open_ledger_fee(&self) -> LedgerResult<String> {
        let result = self.request("fee", json!({})).await?;
        let open = u64_field(&result, "/drops/open_ledger_fee")?;
        let base = u64_field(&result, "/drops/base_fee").unwrap_or(open);
        Ok(open.max(base).to_string())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.network.poll_interval_ms)
    }
}

#[async_trait]
impl LedgerClient for WsLedgerClient {
    async fn connect(&self) -> LedgerResult<()> {
        let mut guard = self.stream.lock().await;
        if guard.is_some() {
            tracing::debug!("Already connected to {}", self.network.ws_url);
            return Ok(());
        }

        tracing::info!(url = %self.network.ws_url, "Connecting to WebSocket");
        let (ws, response) = connect_async(self.network.ws_url.as_str()).await?;
        tracing::info!(status = %response.status(), "WebSocket connected");

        *guard = Some(ws);
        Ok(())
    }

    async fn disconnect(&self) -> LedgerResult<()> {
        let mut guard = self.stream.lock().await;
        let Some(mut ws) = guard.take() else {
            return Ok(());
        };

        match ws.close(None).await {
            Ok(())
            | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn fund_account(&self) -> LedgerResult<Wallet> {
        let wallet = self.faucet.fund().await?;
        self.wait_for_account(&wallet.address).await?;
        Ok(wallet)
    }

    async fn account_info(&self, address: &str) -> LedgerResult<AccountInfo> {
        self.account_data(address, "current").await
    }

    async fn xrp_balance(&self, address: &str) -> LedgerResult<Decimal> {
        let info = self.account_data(address, "validated").await?;
        Ok(drops_to_xrp(info.balance_drops))
    }

    async fn autofill(&self, transaction: Transaction) -> LedgerResult<PreparedTransaction> {
        let info = self.account_data(transaction.account(), "current").await?;
        let server_state = self.request("server_state", json!({})).await?;

        let network_id = server_state
            .pointer("/state/network_id")
            .and_then(Value::as_u64)
            .filter(|id| *id > RESTRICTED_NETWORK_ID)
            .map(|id| id as u32);

        // AMMCreate 的手續費是一個 owner reserve
        let fee = match &transaction {
            Transaction::AmmCreate(_) => {
                u64_field(&server_state, "/state/validated_ledger/reserve_inc")?.to_string()
            }
            _ => self.open_ledger_fee().await?,
        };

        let current = self.current_ledger_index().await?;

        Ok(PreparedTransaction {
            transaction,
            fee,
            sequence: info.sequence,
            last_ledger_sequence: current + LEDGER_OFFSET,
            network_id,
        })
    }

    async fn sign(
        &self,
        transaction: &PreparedTransaction,
        wallet: &Wallet,
    ) -> LedgerResult<SignedTransaction> {
        let keypair = Keypair::from_seed(&wallet.seed)?;
        if keypair.address() != wallet.address {
            return Err(LedgerError::Signing(format!(
                "seed does not belong to {}",
                wallet.address
            )));
        }

        let signed = sign_transaction(transaction, &keypair)?;
        tracing::debug!(
            "Signed {} {}",
            transaction.transaction.transaction_type(),
            signed.hash
        );
        Ok(signed)
    }

    async fn submit_and_wait(&self, signed: &SignedTransaction) -> LedgerResult<TransactionOutcome> {
        let result = self
            .request("submit", json!({ "tx_blob": signed.tx_blob }))
            .await?;
        let engine_result = str_field(&result, "/engine_result")?;
        tracing::debug!("Preliminary result for {}: {}", signed.hash, engine_result);

        if is_never_applied(&engine_result) {
            return Ok(TransactionOutcome {
                hash: signed.hash.clone(),
                result_code: engine_result,
                validated: false,
                ledger_index: None,
            });
        }

        loop {
            tokio::time::sleep(self.poll_interval()).await;

            // 先讀 validated ledger 再查交易，查不到時才能確定已過期
            let validated = self.validated_ledger_index().await?;

            match self
                .request("tx", json!({ "transaction": signed.hash }))
                .await
            {
                Ok(tx) if tx.get("validated").and_then(Value::as_bool) == Some(true) => {
                    return Ok(TransactionOutcome {
                        hash: signed.hash.clone(),
                        result_code: str_field(&tx, "/meta/TransactionResult")?,
                        validated: true,
                        ledger_index: ledger_index_field(&tx, &["/ledger_index"]).ok(),
                    });
                }
                Ok(_) => {}
                Err(e) if e.rpc_error() == Some("txnNotFound") => {}
                Err(e) => return Err(e),
            }

            if validated > signed.last_ledger_sequence {
                return Err(LedgerError::Expired {
                    hash: signed.hash.clone(),
                    last_ledger_sequence: signed.last_ledger_sequence,
                });
            }
        }
    }

    async fn amm_info(&self, asset: &Asset, asset2: &Asset) -> LedgerResult<PoolInfo> {
        let result = self
            .request("amm_info", json!({ "asset": asset, "asset2": asset2 }))
            .await?;
        let amm = result
            .get("amm")
            .cloned()
            .ok_or_else(|| LedgerError::UnexpectedResponse("amm_info without amm".to_string()))?;
        Ok(serde_json::from_value(amm)?)
    }
}

/// 每次建立新的 WebSocket 客戶端
#[derive(Debug, Clone)]
pub struct WsClientFactory {
    network: NetworkConfig,
}

impl WsClientFactory {
    pub fn new(network: NetworkConfig) -> Self {
        Self { network }
    }
}

impl LedgerClientFactory for WsClientFactory {
    type Client = WsLedgerClient;

    fn create(&self) -> LedgerResult<WsLedgerClient> {
        WsLedgerClient::new(self.network.clone())
    }
}

/// 判斷訊息是否為該請求的回應；其他訊息回傳 None
fn match_response(command: &str, id: u64, message: &Value) -> Option<LedgerResult<Value>> {
    if message.get("id").and_then(Value::as_u64) != Some(id) {
        if message.get("type").and_then(Value::as_str) == Some("error") {
            tracing::error!("🚨 XRPL client error: {}", message);
        } else {
            tracing::trace!("Ignoring unrelated ledger message");
        }
        return None;
    }

    if message.get("status").and_then(Value::as_str) == Some("success") {
        return Some(Ok(message.get("result").cloned().unwrap_or(Value::Null)));
    }

    Some(Err(LedgerError::Rpc {
        command: command.to_string(),
        error: message
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        message: message
            .get("error_message")
            .and_then(Value::as_str)
            .map(str::to_string),
    }))
}

/// tem/tef/tel 類結果代表交易不會進入任何 ledger
fn is_never_applied(engine_result: &str) -> bool {
    ["tem", "tef", "tel"]
        .iter()
        .any(|prefix| engine_result.starts_with(prefix))
}

fn str_field(value: &Value, pointer: &str) -> LedgerResult<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LedgerError::UnexpectedResponse(format!("missing field {}", pointer)))
}

/// rippled 的數值有時以字串回傳
fn u64_field(value: &Value, pointer: &str) -> LedgerResult<u64> {
    match value.pointer(pointer) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| LedgerError::UnexpectedResponse(format!("missing numeric field {}", pointer)))
}

fn ledger_index_field(value: &Value, pointers: &[&str]) -> LedgerResult<u32> {
    pointers
        .iter()
        .find_map(|p| u64_field(value, p).ok())
        .and_then(|i| u32::try_from(i).ok())
        .ok_or_else(|| {
            LedgerError::UnexpectedResponse(format!("missing ledger index ({})", pointers.join(", ")))
        })
}
