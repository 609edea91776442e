//! Wallet Risk CLI
//!
//! Usage:
//!   wallet_risk <address> [--json] [--dump <out.json>]
//!   wallet_risk --record <dump.json> [address] [--json]
//!
//! Live mode fetches from Etherscan (ETHERSCAN_API_KEY, CHAIN_ID, ...).
//! `--record` scores wallets from a recorded dump without network access.

use chrono::Utc;
use clap::Parser;
use eyre::{eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wallet_risk::api::RiskAnalysisResponse;
use wallet_risk::utils::constants::get_native_symbol;
use wallet_risk::{
    normalize_address, AnalyzerConfig, EtherscanClient, StaticWalletSource, WalletAnalysis,
    WalletAnalyzer,
};

/// Score a wallet's fraud risk from its transaction history
#[derive(Debug, Parser)]
#[command(name = "wallet_risk", version)]
struct CliArgs {
    /// Wallet address; with --record, restricts output to this wallet
    #[arg(required_unless_present = "record")]
    address: Option<String>,

    /// Score wallets from a recorded dump instead of the explorer
    #[arg(long, value_name = "DUMP")]
    record: Option<PathBuf>,

    /// Write the fetched wallet record to this file
    #[arg(long, value_name = "OUT", conflicts_with = "record")]
    dump: Option<PathBuf>,

    /// Print the API response shape as JSON
    #[arg(long)]
    json: bool,
}

fn print_analysis(analysis: WalletAnalysis, json: bool, symbol: &str) -> Result<()> {
    if json {
        let response = RiskAnalysisResponse::from(analysis);
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let verdict = &analysis.verdict;
    let f = &analysis.features;
    println!();
    println!("  Wallet:        {}", analysis.address);
    println!(
        "  Risk:          {} {} ({}/100)",
        verdict.risk_level.emoji(),
        verdict.risk_level.as_str().to_uppercase(),
        verdict.risk_score
    );
    println!("  Factors:");
    for factor in &verdict.risk_factors {
        println!("    - {}", factor);
    }
    println!("  Balance:       {:.6} {}", f.balance, symbol);
    println!("  Transactions:  {} ({} / day)", f.total_txns, f.txn_frequency);
    println!("  Account age:   {} days", f.account_age_days);
    println!("  Counterparties:{:>5}", f.unique_addresses);
    println!("  Token txs:     {} ({} tokens)", f.token_transfer_count, f.unique_tokens);
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = CliArgs::parse();
    let config = AnalyzerConfig::from_env()?;
    let symbol = get_native_symbol(config.explorer.chain_id);

    if let Some(path) = &cli.record {
        let source = Arc::new(StaticWalletSource::from_json_file(path)?);
        if source.is_empty() {
            return Err(eyre!("No wallet records in {}", path.display()));
        }
        let addresses = match &cli.address {
            Some(address) => vec![normalize_address(address)?],
            None => source.addresses(),
        };
        let analyzer = WalletAnalyzer::with_source(source, &config)?;

        for address in addresses {
            let analysis = analyzer.analyze(&address).await?;
            print_analysis(analysis, cli.json, symbol)?;
        }
        return Ok(());
    }

    let address = normalize_address(cli.address.as_deref().unwrap_or_default())?;
    let client = Arc::new(EtherscanClient::new(config.explorer.clone())?);
    let analyzer = WalletAnalyzer::with_source(client.clone(), &config)?;

    let record = client.get_full_wallet_data(&address).await?;
    if let Some(path) = &cli.dump {
        std::fs::write(path, serde_json::to_string_pretty(&record)?)?;
        info!("💾 Wallet record written to {}", path.display());
    }

    print_analysis(analyzer.assess(&record, Utc::now()), cli.json, symbol)
}
