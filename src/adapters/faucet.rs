use crate::domain::model::Wallet;
use crate::utils::error::{LedgerError, LedgerResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FaucetResponse {
    account: FaucetAccount,
    #[serde(default)]
    balance: Option<serde_json::Value>,
    /// 部分 faucet 版本把 seed 放在最外層
    #[serde(default)]
    seed: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaucetAccount {
    address: Option<String>,
    classic_address: Option<String>,
    secret: Option<String>,
    seed: Option<String>,
}

/// 測試網 faucet：每次請求產生一個已注資的新帳戶
#[derive(Debug, Clone)]
pub struct FaucetClient {
    url: String,
    client: Client,
}

impl FaucetClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> LedgerResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub async fn fund(&self) -> LedgerResult<Wallet> {
        tracing::debug!("Requesting funded account from {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "userAgent": "retreat-amm" }))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Faucet response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Faucet {
                status: status.as_u16(),
                body,
            });
        }

        let body: FaucetResponse = response.json().await?;
        let account = body.account;

        let address = account
            .classic_address
            .or(account.address)
            .ok_or_else(|| LedgerError::UnexpectedResponse("faucet response has no address".to_string()))?;
        let seed = account
            .seed
            .or(account.secret)
            .or(body.seed)
            .ok_or_else(|| LedgerError::UnexpectedResponse("faucet response has no seed".to_string()))?;

        tracing::debug!(
            "Faucet funded {} (balance {})",
            address,
            body.balance.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string())
        );

        Ok(Wallet::new(address, seed))
    }
}
