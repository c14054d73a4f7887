use anyhow::Context;
use clap::Parser;
use retreat_amm::core::bootstrap::planned_transactions;
use retreat_amm::utils::error::ErrorCategory;
use retreat_amm::utils::{logger, validation::Validate};
use retreat_amm::{AppConfig, BootstrapOutcome, CliConfig, PoolBootstrap, WsLedgerClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("🚀 Starting retreat-amm");

    let config = match cli.load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be submitted");
        return perform_dry_run(&config);
    }

    let client = WsLedgerClient::new(config.network.clone())
        .context("failed to build ledger client")?;
    tracing::info!("🌐 Ledger endpoint: {}", client.endpoint());

    let bootstrap = PoolBootstrap::new(client, config.pool.clone());

    match bootstrap.run().await {
        Ok(outcome) => {
            report_outcome(&outcome, cli.json)?;
            Ok(())
        }
        Err(e) => {
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ Critical error at {}: {}", e.step(), e);
            if let Some(code) = e.result_code() {
                eprintln!("🧾 Result code: {}", code);
            }
            eprintln!("💡 {}", e.recovery_suggestion());

            // 依錯誤分類決定退出碼
            let exit_code = match e.category() {
                ErrorCategory::Configuration => 1,
                ErrorCategory::Network => 2,
                ErrorCategory::Ledger => 3,
                ErrorCategory::Funds => 4,
            };
            std::process::exit(exit_code);
        }
    }
}

fn report_outcome(outcome: &BootstrapOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    println!("✅ Pool created successfully!");
    println!("🧾 AMM transaction: {}", outcome.pool_transaction_hash);
    println!("🔑 Issuer: {}", outcome.issuer_address);
    println!("👛 LP Provider: {}", outcome.lp_address);
    println!("🪙 Token currency: {}", outcome.token_currency);
    if let Some(pool) = &outcome.pool {
        println!("🏦 Pool account: {}", pool.account);
        println!("📊 Trading fee: {}", pool.trading_fee);
    }
    Ok(())
}

fn perform_dry_run(config: &AppConfig) -> anyhow::Result<()> {
    let pool = &config.pool;
    let currency = pool.currency_code()?;

    println!("🔍 Dry run");
    println!("🌐 Ledger: {}", config.network.ws_url);
    println!("💧 Faucet: {}", config.network.faucet_url);
    println!("🪙 Token: {} ({})", pool.token_name, currency);
    println!("💰 Pool deposit: {} tokens + {} XRP ({} drops)", pool.token_amount, pool.xrp_amount, pool.xrp_drops()?);
    println!("⏳ LastLedgerSequence buffer: {}", pool.last_ledger_buffer);
    println!();

    // 帳戶尚未建立，以佔位地址顯示交易內容
    let transactions = planned_transactions(pool, "<issuer>", "<lp>")?;
    for (i, tx) in transactions.iter().enumerate() {
        println!("{}. {}", i + 1, tx.transaction_type());
        println!("{}", serde_json::to_string_pretty(tx)?);
    }

    Ok(())
}
