use futures_util::{SinkExt, StreamExt};
use httpmock::prelude::*;
use retreat_amm::core::{AmmCreate, Asset, IssuedAmount, LedgerClient, Payment, Transaction, Wallet};
use retreat_amm::domain::model::Amount;
use retreat_amm::{LedgerError, NetworkConfig, WsLedgerClient};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

const ISSUER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
const ISSUER_SEED: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";
const LP: &str = "rLUEXYuLiQptky37CqLcm9USQpPiz5rkpD";
const LP_SEED: &str = "sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r";
const CURRENCY: &str = "5245545245415400000000000000000000000000";
const TX_HASH: &str = "C53ECF838647FA5A4C780377025FEC7999AB4182590510CA461444B207AB74A9";

type Requests = Arc<Mutex<Vec<Value>>>;

/// 本機的假 rippled：handler 收到請求與同一命令先前出現的次數，回傳要送出的訊息
async fn spawn_rippled<H>(handler: H) -> (String, Requests)
where
    H: Fn(&Value, usize) -> Vec<Value> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(message)) = ws.next().await {
                let Message::Text(text) = message else {
                    continue;
                };
                let request: Value = serde_json::from_str(&text).unwrap();
                let seen = {
                    let mut log = log.lock().unwrap();
                    let seen = log
                        .iter()
                        .filter(|r| r["command"] == request["command"])
                        .count();
                    log.push(request.clone());
                    seen
                };
                for reply in handler(&request, seen) {
                    ws.send(Message::Text(reply.to_string())).await.unwrap();
                }
            }
        }
    });

    (format!("ws://{}", addr), requests)
}

fn success(request: &Value, result: Value) -> Vec<Value> {
    vec![json!({
        "id": request["id"],
        "status": "success",
        "type": "response",
        "result": result
    })]
}

fn failure(request: &Value, error: &str) -> Vec<Value> {
    vec![json!({
        "id": request["id"],
        "status": "error",
        "type": "response",
        "error": error
    })]
}

fn network(ws_url: String, faucet_url: String) -> NetworkConfig {
    NetworkConfig {
        ws_url,
        faucet_url,
        poll_interval_ms: 10,
        request_timeout_seconds: 5,
        funding_poll_attempts: 3,
    }
}

async fn connected_client(ws_url: String) -> WsLedgerClient {
    let client = WsLedgerClient::new(network(ws_url, "http://127.0.0.1:9/accounts".to_string())).unwrap();
    client.connect().await.unwrap();
    client
}

fn commands(requests: &Requests) -> Vec<String> {
    requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r["command"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// 一般節點的回應：帳戶、手續費與 ledger 序號
fn standard_reply(request: &Value, seen: usize) -> Vec<Value> {
    match request["command"].as_str().unwrap_or_default() {
        "account_info" => success(
            request,
            json!({
                "account_data": {
                    "Account": request["account"],
                    "Flags": 0,
                    "Sequence": 7,
                    "Balance": "25500000"
                },
                "ledger_current_index": 500
            }),
        ),
        "server_state" => success(
            request,
            json!({
                "state": {
                    "network_id": 21338,
                    "validated_ledger": { "base_fee": 10, "reserve_base": 1000000, "reserve_inc": 200000, "seq": 499 }
                }
            }),
        ),
        "fee" => success(
            request,
            json!({ "drops": { "open_ledger_fee": "10", "base_fee": "12" } }),
        ),
        "ledger_current" => {
            let mut replies = vec![json!({ "type": "ledgerClosed", "ledger_index": 499 })];
            replies.extend(success(request, json!({ "ledger_current_index": 500 })));
            replies
        }
        "submit" => success(request, json!({ "engine_result": "tesSUCCESS" })),
        "tx" if seen == 0 => failure(request, "txnNotFound"),
        "tx" => success(
            request,
            json!({
                "hash": TX_HASH,
                "validated": true,
                "ledger_index": 502,
                "meta": { "TransactionResult": "tesSUCCESS" }
            }),
        ),
        "ledger" => success(request, json!({ "ledger_index": 501 })),
        _ => failure(request, "unknownCmd"),
    }
}

fn amm_create() -> Transaction {
    Transaction::AmmCreate(AmmCreate {
        account: LP.to_string(),
        amount: IssuedAmount {
            currency: CURRENCY.to_string(),
            issuer: ISSUER.to_string(),
            value: "20".to_string(),
        },
        amount2: "20000000".to_string(),
        trading_fee: 100,
    })
}

#[tokio::test]
async fn test_autofill_uses_owner_reserve_for_amm_create() {
    let (url, _requests) = spawn_rippled(standard_reply).await;
    let client = connected_client(url).await;

    let prepared = client.autofill(amm_create()).await.unwrap();

    assert_eq!(prepared.fee, "200000");
    assert_eq!(prepared.sequence, 7);
    assert_eq!(prepared.last_ledger_sequence, 520);
    assert_eq!(prepared.network_id, Some(21338));

    let payment = Transaction::Payment(Payment {
        account: ISSUER.to_string(),
        destination: LP.to_string(),
        amount: IssuedAmount {
            currency: CURRENCY.to_string(),
            issuer: ISSUER.to_string(),
            value: "50".to_string(),
        },
    });
    let prepared = client.autofill(payment).await.unwrap();
    assert_eq!(prepared.fee, "12");

    client.disconnect().await.unwrap();
    assert!(!client.is_connected().await);
}

#[tokio::test]
async fn test_sign_and_submit_waits_for_validation() {
    let (url, requests) = spawn_rippled(standard_reply).await;
    let client = connected_client(url).await;
    let lp = Wallet::new(LP, LP_SEED);

    let mut prepared = client.autofill(amm_create()).await.unwrap();
    prepared.extend_validity(10);
    let signed = client.sign(&prepared, &lp).await.unwrap();

    assert_eq!(signed.hash.len(), 64);
    assert_eq!(signed.last_ledger_sequence, 530);
    // AMMCreate, TradingFee 100, NetworkID 21338, Sequence 7, LastLedgerSequence 530
    assert!(signed.tx_blob.starts_with("120023150064210000535A2400000007201B00000212"));
    assert!(!commands(&requests).contains(&"sign".to_string()));

    let outcome = client.submit_and_wait(&signed).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.result_code, "tesSUCCESS");
    assert_eq!(outcome.ledger_index, Some(502));

    let log = requests.lock().unwrap().clone();
    let submit = log.iter().find(|r| r["command"] == "submit").unwrap();
    assert_eq!(submit["tx_blob"], signed.tx_blob);
    let lookup = log.iter().find(|r| r["command"] == "tx").unwrap();
    assert_eq!(lookup["transaction"], signed.hash);

    let sent = commands(&requests);
    assert_eq!(sent.iter().filter(|c| *c == "submit").count(), 1);
    assert_eq!(sent.iter().filter(|c| *c == "tx").count(), 2);

    client.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_issuer_signs_with_family_seed() {
    let (url, _requests) = spawn_rippled(standard_reply).await;
    let client = connected_client(url).await;
    let issuer = Wallet::new(ISSUER, ISSUER_SEED);

    let payment = Transaction::Payment(Payment {
        account: ISSUER.to_string(),
        destination: LP.to_string(),
        amount: IssuedAmount {
            currency: CURRENCY.to_string(),
            issuer: ISSUER.to_string(),
            value: "50".to_string(),
        },
    });
    let prepared = client.autofill(payment).await.unwrap();
    let signed = client.sign(&prepared, &issuer).await.unwrap();

    // 創世帳戶的 SigningPubKey
    assert!(signed
        .tx_blob
        .contains("73210330E7FC9D56BB25D6893BA3F317AE5BCF33B3291BD63DB32654A313222F7FD020"));
}

#[tokio::test]
async fn test_sign_rejects_seed_of_another_account() {
    let (url, requests) = spawn_rippled(standard_reply).await;
    let client = connected_client(url).await;

    let prepared = client.autofill(amm_create()).await.unwrap();
    let err = client
        .sign(&prepared, &Wallet::new(LP, ISSUER_SEED))
        .await
        .unwrap_err();

    assert!(matches!(err, LedgerError::Signing(_)));
    assert!(err.to_string().contains(LP));

    let err = client
        .sign(&prepared, &Wallet::new(LP, "not-a-seed"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Signing(_)));
    assert!(!commands(&requests).contains(&"submit".to_string()));
}

#[tokio::test]
async fn test_never_applied_result_returns_without_polling() {
    let (url, requests) = spawn_rippled(|request, seen| {
        if request["command"] == "submit" {
            return success(request, json!({ "engine_result": "temBAD_AMOUNT" }));
        }
        standard_reply(request, seen)
    })
    .await;
    let client = connected_client(url).await;
    let lp = Wallet::new(LP, LP_SEED);

    let prepared = client.autofill(amm_create()).await.unwrap();
    let signed = client.sign(&prepared, &lp).await.unwrap();
    let outcome = client.submit_and_wait(&signed).await.unwrap();

    assert!(!outcome.validated);
    assert!(!outcome.is_success());
    assert_eq!(outcome.result_code, "temBAD_AMOUNT");
    assert!(!commands(&requests).contains(&"tx".to_string()));
}

#[tokio::test]
async fn test_submit_expires_after_last_ledger_sequence() {
    let (url, _requests) = spawn_rippled(|request, seen| match request["command"].as_str() {
        Some("tx") => success(request, json!({ "validated": false })),
        Some("ledger") => success(request, json!({ "ledger": { "ledger_index": "600" } })),
        _ => standard_reply(request, seen),
    })
    .await;
    let client = connected_client(url).await;
    let lp = Wallet::new(LP, LP_SEED);

    let prepared = client.autofill(amm_create()).await.unwrap();
    let signed = client.sign(&prepared, &lp).await.unwrap();
    let err = client.submit_and_wait(&signed).await.unwrap_err();

    assert!(matches!(
        err,
        LedgerError::Expired {
            last_ledger_sequence: 520,
            ..
        }
    ));
}

#[tokio::test]
async fn test_validation_in_closing_ledger_is_not_expired() {
    // 交易落在 LastLedgerSequence (520) 那個 ledger，tx 查詢要等 ledger 521 驗證後才看得到
    let ledger_advanced = Arc::new(AtomicBool::new(false));
    let advanced = ledger_advanced.clone();
    let (url, requests) = spawn_rippled(move |request, seen| match request["command"].as_str() {
        Some("ledger") => {
            advanced.store(true, Ordering::SeqCst);
            success(request, json!({ "ledger_index": 521 }))
        }
        Some("tx") if advanced.load(Ordering::SeqCst) => success(
            request,
            json!({
                "validated": true,
                "ledger_index": 520,
                "meta": { "TransactionResult": "tesSUCCESS" }
            }),
        ),
        Some("tx") => success(request, json!({ "validated": false })),
        _ => standard_reply(request, seen),
    })
    .await;
    let client = connected_client(url).await;
    let lp = Wallet::new(LP, LP_SEED);

    let prepared = client.autofill(amm_create()).await.unwrap();
    assert_eq!(prepared.last_ledger_sequence, 520);
    let signed = client.sign(&prepared, &lp).await.unwrap();
    let outcome = client.submit_and_wait(&signed).await.unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.ledger_index, Some(520));
    assert!(ledger_advanced.load(Ordering::SeqCst));
    assert_eq!(
        commands(&requests).iter().filter(|c| *c == "tx").count(),
        1
    );
}

#[tokio::test]
async fn test_account_info_and_balance() {
    let (url, _requests) = spawn_rippled(|request, seen| {
        if request["command"] == "account_info" && request["account"] == ISSUER {
            return success(
                request,
                json!({
                    "account_data": {
                        "Account": ISSUER,
                        "Flags": 8388608,
                        "Sequence": 3,
                        "Balance": "1000000000"
                    }
                }),
            );
        }
        standard_reply(request, seen)
    })
    .await;
    let client = connected_client(url).await;

    let issuer = client.account_info(ISSUER).await.unwrap();
    assert!(issuer.has_flag(retreat_amm::domain::model::LSF_DEFAULT_RIPPLE));
    assert_eq!(issuer.sequence, 3);

    let balance = client.xrp_balance(LP).await.unwrap();
    assert_eq!(balance, Decimal::new(255, 1));
}

#[tokio::test]
async fn test_rpc_error_is_reported() {
    let (url, _requests) = spawn_rippled(|request, _| failure(request, "actMalformed")).await;
    let client = connected_client(url).await;

    let err = client.account_info("not-an-address").await.unwrap_err();

    assert_eq!(err.rpc_error(), Some("actMalformed"));
    assert!(err.to_string().contains("account_info"));
}

#[tokio::test]
async fn test_fund_account_waits_until_account_exists() {
    let faucet = MockServer::start();
    let faucet_mock = faucet.mock(|when, then| {
        when.method(POST).path("/accounts");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "account": {
                    "classicAddress": LP,
                    "secret": LP_SEED
                },
                "amount": 100,
                "balance": 100
            }));
    });

    let (url, requests) = spawn_rippled(|request, seen| {
        if request["command"] == "account_info" && seen == 0 {
            return failure(request, "actNotFound");
        }
        standard_reply(request, seen)
    })
    .await;

    let client = WsLedgerClient::new(network(url, faucet.url("/accounts"))).unwrap();
    client.connect().await.unwrap();

    let wallet = client.fund_account().await.unwrap();

    faucet_mock.assert();
    assert_eq!(wallet.address, LP);
    assert_eq!(
        commands(&requests)
            .iter()
            .filter(|c| *c == "account_info")
            .count(),
        2
    );
}

#[tokio::test]
async fn test_amm_info_parses_pool() {
    let (url, requests) = spawn_rippled(|request, seen| {
        if request["command"] == "amm_info" {
            return success(
                request,
                json!({
                    "amm": {
                        "account": "rAMMPoolAccount111111111111111111",
                        "amount": { "currency": CURRENCY, "issuer": ISSUER, "value": "20" },
                        "amount2": "20000000",
                        "lp_token": {
                            "currency": "03930D02208264E2E40EC1B0C09E4DB96EE197B1",
                            "issuer": "rAMMPoolAccount111111111111111111",
                            "value": "20000"
                        },
                        "trading_fee": 100,
                        "vote_slots": []
                    },
                    "validated": false
                }),
            );
        }
        standard_reply(request, seen)
    })
    .await;
    let client = connected_client(url).await;

    let pool = client
        .amm_info(&Asset::issued(CURRENCY, ISSUER), &Asset::xrp())
        .await
        .unwrap();

    assert_eq!(pool.trading_fee, 100);
    assert_eq!(pool.amount2, Amount::Drops("20000000".to_string()));
    assert!(pool.lp_token.is_some());

    let request = requests.lock().unwrap().last().cloned().unwrap();
    assert_eq!(request["asset"]["currency"], CURRENCY);
    assert_eq!(request["asset"]["issuer"], ISSUER);
    assert_eq!(request["asset2"], json!({ "currency": "XRP" }));
}
