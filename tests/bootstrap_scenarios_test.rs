use retreat_amm::core::{BootstrapStep, Transaction};
use retreat_amm::domain::currency::CurrencyCode;
use retreat_amm::testkit::{FakeLedger, LedgerCall};
use retreat_amm::{BootstrapError, PoolBootstrap, PoolConfig};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_end_to_end_pool_bootstrap() {
    let ledger = FakeLedger::new();
    let outcome = PoolBootstrap::new(ledger.clone(), PoolConfig::default())
        .run()
        .await
        .unwrap();

    let issuer = ledger.issuer();
    let lp = ledger.liquidity_provider();
    assert_eq!(outcome.issuer_address, issuer.address);
    assert_eq!(outcome.lp_address, lp.address);
    assert_eq!(outcome.token_currency, "5245545245415400000000000000000000000000");

    let submitted = ledger.submitted();
    assert_eq!(
        ledger.submitted_types(),
        vec!["AccountSet", "TrustSet", "Payment", "AMMCreate"]
    );

    match &submitted[1].transaction {
        Transaction::TrustSet(trust) => {
            assert_eq!(trust.account, lp.address);
            assert_eq!(trust.limit_amount.issuer, issuer.address);
            assert_eq!(trust.limit_amount.value, "100");
        }
        other => panic!("expected TrustSet, got {:?}", other),
    }

    match &submitted[2].transaction {
        Transaction::Payment(payment) => {
            assert_eq!(payment.account, issuer.address);
            assert_eq!(payment.destination, lp.address);
            assert_eq!(payment.amount.value, "50");
        }
        other => panic!("expected Payment, got {:?}", other),
    }
    assert_eq!(submitted[2].signer, issuer.address);

    let amm = &submitted[3];
    match &amm.transaction {
        Transaction::AmmCreate(create) => {
            assert_eq!(create.account, lp.address);
            assert_eq!(create.amount.currency, outcome.token_currency);
            assert_eq!(create.amount.value, "20");
            assert_eq!(create.amount2, "20000000");
            assert_eq!(create.trading_fee, 100);
        }
        other => panic!("expected AMMCreate, got {:?}", other),
    }
    assert_eq!(amm.fee, FakeLedger::OWNER_RESERVE_DROPS);
    assert_eq!(amm.hash, outcome.pool_transaction_hash);
    assert_eq!(
        amm.last_ledger_sequence,
        FakeLedger::AUTOFILL_LAST_LEDGER_SEQUENCE + 10
    );

    let pool = outcome.pool.expect("pool info should be attached");
    assert_eq!(pool.trading_fee, 100);

    assert_eq!(ledger.connect_count(), 1);
    assert_eq!(ledger.disconnect_count(), 1);
}

#[tokio::test]
async fn test_insufficient_balance_blocks_pool_creation() {
    let ledger = FakeLedger::new().with_lp_balance(Decimal::from(5));
    let err = PoolBootstrap::new(ledger.clone(), PoolConfig::default())
        .run()
        .await
        .unwrap_err();

    match err {
        BootstrapError::InsufficientBalance {
            required,
            available,
            shortfall,
        } => {
            assert_eq!(required, Decimal::from(20));
            assert_eq!(available, Decimal::from(5));
            assert_eq!(shortfall, Decimal::from(15));
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }

    assert!(!ledger
        .calls()
        .iter()
        .any(|c| matches!(c, LedgerCall::Autofill(t) if t == "AMMCreate")));
    assert_eq!(ledger.disconnect_count(), 1);
}

#[tokio::test]
async fn test_balance_equal_to_deposit_is_enough() {
    let ledger = FakeLedger::new().with_lp_balance(Decimal::from(20));
    let result = PoolBootstrap::new(ledger.clone(), PoolConfig::default())
        .run()
        .await;

    assert!(result.is_ok());
    assert!(ledger.submitted_types().contains(&"AMMCreate".to_string()));
}

#[tokio::test]
async fn test_pool_rejection_reports_result_code() {
    let ledger = FakeLedger::new().with_result_code("AMMCreate", "tecUNFUNDED_AMM");
    let err = PoolBootstrap::new(ledger.clone(), PoolConfig::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::TransactionFailed { .. }));
    assert_eq!(err.step(), BootstrapStep::CreatePool);
    assert_eq!(err.result_code(), Some("tecUNFUNDED_AMM"));
    assert!(err.to_string().contains("tecUNFUNDED_AMM"));
    assert_eq!(ledger.disconnect_count(), 1);
    assert!(!ledger.calls().contains(&LedgerCall::AmmInfo));
}

#[tokio::test]
async fn test_custom_pool_parameters() {
    let ledger = FakeLedger::new();
    let config = PoolConfig {
        token_name: "USD".to_string(),
        xrp_amount: Decimal::new(125, 1),
        trading_fee: 500,
        ..PoolConfig::default()
    };
    let outcome = PoolBootstrap::new(ledger.clone(), config)
        .run()
        .await
        .unwrap();

    assert_eq!(
        outcome.token_currency,
        CurrencyCode::from_token_name("USD").unwrap().as_str()
    );

    let amm = ledger.submitted().pop().unwrap();
    match amm.transaction {
        Transaction::AmmCreate(create) => {
            assert_eq!(create.amount2, "12500000");
            assert_eq!(create.trading_fee, 500);
        }
        other => panic!("expected AMMCreate, got {:?}", other),
    }
}

#[test]
fn test_currency_code_is_padded_uppercase_hex() {
    for name in ["RETREAT", "USD", "A", "TWENTYCHARACTERSLONG"] {
        let code = CurrencyCode::from_token_name(name).unwrap();
        let code = code.as_str();

        assert_eq!(code.len(), 40);
        assert!(code.starts_with(&hex::encode_upper(name)));
        assert!(code[name.len() * 2..].chars().all(|c| c == '0'));
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
