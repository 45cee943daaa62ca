//! StealthSwap CLI
//!
//! Command-line interface for simulating the StealthSwap stealth-address payment ledger.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stealthswap_core::{format_units, Address, LedgerEvent, PaymentNote, ReceiverTag, ETHER_DECIMALS};
use stealthswap_ledger::LedgerConfig;

mod scenario;

use scenario::{Report, Scenario};

/// StealthSwap - stealth-address payment ledger
#[derive(Parser)]
#[command(name = "stealthswap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario against an in-memory ledger
    Simulate {
        /// Scenario file (JSON)
        scenario: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the deployment configuration
    Config {
        /// Configuration file (JSON); environment variables are used if omitted
        #[arg(short, long, env = "STEALTHSWAP_CONFIG_FILE")]
        file: Option<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the addresses derived from account labels
    Address {
        /// Account labels
        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Build a payment note from its hex-encoded parts
    Note {
        /// Uncompressed ephemeral public key (65 bytes)
        #[arg(short, long)]
        ephemeral_key: String,
        /// Ciphertext (32 bytes packed, up to 96 bytes unpacked)
        #[arg(short, long)]
        ciphertext: String,
        /// ECIES IV (16 bytes); selects the unpacked scheme
        #[arg(long, requires = "mac")]
        iv: Option<String>,
        /// ECIES MAC (32 bytes)
        #[arg(long, requires = "iv")]
        mac: Option<String>,
        /// Receiver to show the event tag for
        #[arg(short, long)]
        receiver: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "stealthswap=debug,stealthswap_ledger=debug,info"
    } else {
        "stealthswap=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Simulate { scenario, json } => cmd_simulate(&scenario, json),
        Commands::Config { file, json } => cmd_config(file, json),
        Commands::Address { labels } => cmd_address(&labels),
        Commands::Note {
            ephemeral_key,
            ciphertext,
            iv,
            mac,
            receiver,
        } => cmd_note(&ephemeral_key, &ciphertext, iv.zip(mac), receiver.as_deref()),
    }
}

/// Replay a scenario
fn cmd_simulate(path: &Path, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    if !json {
        println!(
            "{} {} ({} steps)",
            "▶ Simulating".cyan().bold(),
            path.display(),
            scenario.steps.len()
        );
    }

    let report = scenario::run(&scenario)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    let unexpected = report.unexpected().count();
    if unexpected > 0 {
        bail!("{} step(s) did not behave as expected", unexpected);
    }
    Ok(())
}

fn print_report(report: &Report) {
    println!();
    for step in &report.steps {
        let mark = if step.as_expected { "✓".green() } else { "✗".red() };
        match (&step.events, &step.reverted) {
            (Some(events), _) => {
                println!("{} {:>2}. {} by {}", mark, step.index, step.call.bold(), step.caller);
                for event in events {
                    println!("       {}", describe(event).dimmed());
                }
            }
            (None, Some(reason)) => {
                println!(
                    "{} {:>2}. {} reverted: {}",
                    mark,
                    step.index,
                    step.call.bold(),
                    reason.yellow()
                );
            }
            (None, None) => {}
        }
    }

    println!();
    println!("{}", "Escrow".bold());
    println!("  Protocol fees: {}", report.fee_escrow);
    println!("  Native tolls:  {}", report.toll_escrow);

    println!();
    println!("{}", "Balances".bold());
    for (account, row) in &report.balances {
        let assets: Vec<String> = row.iter().map(|(s, a)| format!("{} {}", a, s)).collect();
        let assets = if assets.is_empty() { "-".to_string() } else { assets.join(", ") };
        println!("  {:<14} {}", account, assets);
    }
}

fn describe(event: &LedgerEvent) -> String {
    let units = |a| format_units(a, ETHER_DECIMALS);
    match event {
        LedgerEvent::PaymentNote {
            receiver,
            token,
            amount,
            ..
        } => format!("PaymentNote {} of {} to {}", units(*amount), token, receiver),
        LedgerEvent::Withdrawal {
            receiver,
            interim,
            amount,
            token,
        } => format!(
            "Withdrawal {} of {} from {} to {}",
            units(*amount),
            token,
            receiver,
            interim
        ),
        LedgerEvent::FeesCollected {
            fee_taker,
            token_amount,
            native_amount,
        } => format!(
            "FeesCollected {} fee tokens and {} native to {}",
            units(*token_amount),
            units(*native_amount),
            fee_taker
        ),
        other => format!("{} {}", other.name(), serde_json::to_string(other).unwrap_or_default()),
    }
}

/// Show the deployment configuration
fn cmd_config(file: Option<PathBuf>, json: bool) -> Result<()> {
    let config = match &file {
        Some(path) => LedgerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => LedgerConfig::from_env().context("Failed to load configuration from environment")?,
    };
    config.validate().context("Invalid configuration")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{}", "⚙ StealthSwap configuration".cyan().bold());
    println!();
    println!("  Owner:          {}", config.owner);
    println!("  Fee token:      {}", config.fee_token);
    println!("  Protocol fee:   {}", format_units(config.protocol_fee, ETHER_DECIMALS));
    println!("  Ether toll:     {}", format_units(config.ether_toll, ETHER_DECIMALS));
    println!("  Fee manager:    {}", config.fee_manager);
    println!("  Fee taker:      {}", config.fee_taker);
    match config.trusted_forwarder {
        Some(forwarder) => println!("  Forwarder:      {}", forwarder),
        None => println!("  Forwarder:      {}", "none".dimmed()),
    }
    println!("  Disclosure:     {:?}", config.receiver_disclosure);
    println!("  Toll policy:    {:?}", config.toll_policy);
    Ok(())
}

/// Show label addresses
fn cmd_address(labels: &[String]) -> Result<()> {
    for label in labels {
        let address = Address::from_label(label);
        println!("{:<14} {}", label.bold(), address);
    }
    Ok(())
}

/// Build a payment note
fn cmd_note(
    ephemeral_key: &str,
    ciphertext: &str,
    ecies: Option<(String, String)>,
    receiver: Option<&str>,
) -> Result<()> {
    let key = decode_hex(ephemeral_key).context("Invalid ephemeral key")?;
    let ciphertext = decode_hex(ciphertext).context("Invalid ciphertext")?;

    let note = match ecies {
        Some((iv, mac)) => {
            let iv = decode_hex(&iv).context("Invalid IV")?;
            let mac = decode_hex(&mac).context("Invalid MAC")?;
            PaymentNote::unpacked_from_parts(&iv, &key, &ciphertext, &mac)?
        }
        None => PaymentNote::packed_from_parts(&key, &ciphertext)?,
    };

    println!("{}", serde_json::to_string_pretty(&note)?);

    if let Some(receiver) = receiver {
        let receiver = scenario::account(receiver)?;
        println!();
        println!("  Plain tag:  {}", ReceiverTag::Plain(receiver));
        println!("  Hashed tag: {}", ReceiverTag::Hashed(receiver.keccak256()));
    }
    Ok(())
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    let value = value.strip_prefix("0x").unwrap_or(value);
    Ok(hex::decode(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_simulate() {
        let cli = Cli::try_parse_from(["stealthswap", "-v", "simulate", "s.json", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Simulate { json: true, .. }));
    }

    #[test]
    fn test_note_requires_both_iv_and_mac() {
        let parsed = Cli::try_parse_from([
            "stealthswap", "note", "-e", "04", "-c", "00", "--iv", "00",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_decode_hex_accepts_prefix() {
        assert_eq!(decode_hex("0xabcd").unwrap(), vec![0xab, 0xcd]);
        assert_eq!(decode_hex("abcd").unwrap(), vec![0xab, 0xcd]);
        assert!(decode_hex("xyz").is_err());
    }

    #[test]
    fn test_describe_withdrawal_goes_from_stealth_address() {
        let stealth = Address::from_label("receiver2");
        let destination = Address::from_label("outReceiver");
        let event = LedgerEvent::Withdrawal {
            receiver: stealth,
            interim: destination,
            amount: 100_000_000_000_000_000_000,
            token: Address::from_label("TestToken"),
        };
        let line = describe(&event);
        assert!(line.ends_with(&format!("from {} to {}", stealth, destination)));
        assert!(line.starts_with("Withdrawal 100 of"));
    }

    #[test]
    fn test_describe_payment_note() {
        let event = LedgerEvent::PaymentNote {
            receiver: ReceiverTag::Plain(Address::from_label("receiver")),
            token: stealthswap_core::NATIVE_TOKEN,
            amount: 1_200_000_000_000_000_000,
            note: PaymentNote::Packed {
                x_coord: [0; 32],
                y_coord: [0; 32],
                note: [0; 32],
            },
        };
        assert!(describe(&event).starts_with("PaymentNote 1.2 of"));
    }
}
