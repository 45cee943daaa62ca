//! Scenario files for the simulator.
//!
//! A scenario deploys a ledger on a fresh in-memory chain, seeds balances and
//! approvals, then replays an ordered list of calls. Accounts are written either as
//! `0x` addresses or as labels (`"payer1"`), which map to `Address::from_label`.
//! Amounts are decimal strings in whole units (`"1.2"`): ether for native values,
//! the token's own decimals for token amounts.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use stealthswap_chain::{MemoryChain, MemoryToken};
use stealthswap_core::{
    format_units, parse_units, Address, Amount, CallContext, Erc20, Host, LedgerEvent,
    PaymentNote, ReceiverDisclosure, ETHER_DECIMALS,
};
use stealthswap_ledger::{LedgerConfig, StealthLedger, TollPolicy};

// ═══════════════════════════════════════════════════════════════════════════════
// FILE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// A complete simulation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Scenario {
    /// Account of the ledger itself.
    #[serde(default = "default_ledger")]
    pub ledger: String,
    /// Tokens to deploy, keyed by account. The fee token must be one of them.
    pub tokens: BTreeMap<String, TokenInfo>,
    /// Ledger deployment parameters.
    pub config: DeploySettings,
    /// Starting native balances.
    #[serde(default)]
    pub native: BTreeMap<String, String>,
    /// Token mints.
    #[serde(default)]
    pub mints: Vec<Mint>,
    /// Approvals granted to the ledger.
    #[serde(default)]
    pub approvals: Vec<Approval>,
    /// Calls in order.
    pub steps: Vec<Step>,
}

fn default_ledger() -> String {
    "stealth".into()
}

/// Token metadata.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenInfo {
    /// Token name.
    pub name: String,
    /// Token symbol.
    pub symbol: String,
    /// Token decimals.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    ETHER_DECIMALS as u8
}

/// Deployment parameters with accounts and amounts in scenario notation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DeploySettings {
    /// Initial owner.
    pub owner: String,
    /// Fee token account.
    pub fee_token: String,
    /// Fee manager.
    pub fee_manager: String,
    /// Fee taker.
    pub fee_taker: String,
    /// Protocol fee in whole fee tokens.
    #[serde(default)]
    pub protocol_fee: Option<String>,
    /// Native toll in ether.
    #[serde(default)]
    pub ether_toll: Option<String>,
    /// Trusted forwarder.
    #[serde(default)]
    pub trusted_forwarder: Option<String>,
    /// Receiver disclosure.
    #[serde(default)]
    pub receiver_disclosure: ReceiverDisclosure,
    /// Toll policy.
    #[serde(default)]
    pub toll_policy: TollPolicy,
}

/// Mint `amount` of `token` to `to`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Mint {
    /// Token account.
    pub token: String,
    /// Recipient.
    pub to: String,
    /// Whole tokens.
    pub amount: String,
}

/// `owner` approves the ledger for `amount` of `token`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Approval {
    /// Token account.
    pub token: String,
    /// Approving account.
    pub owner: String,
    /// Whole tokens.
    pub amount: String,
}

/// One ledger call.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Step {
    /// Principal making the call.
    pub from: String,
    /// Relay submitting the call on behalf of `from`.
    #[serde(default)]
    pub via: Option<String>,
    /// Native value attached, in ether.
    #[serde(default)]
    pub value: Option<String>,
    /// Revert reason the call must fail with.
    #[serde(default)]
    pub expect_revert: Option<String>,
    /// The call itself.
    #[serde(flatten)]
    pub call: Call,
}

/// Ledger entry points.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    /// `send_ether(receiver, note)`
    SendEther {
        /// Stealth address.
        receiver: String,
        /// Payment note; an all-zero packed note if omitted.
        #[serde(default)]
        note: Option<PaymentNote>,
    },
    /// `send_erc20(receiver, token, amount, note)`
    SendErc20 {
        /// Stealth address.
        receiver: String,
        /// Token account.
        token: String,
        /// Whole tokens.
        amount: String,
        /// Payment note; an all-zero packed note if omitted.
        #[serde(default)]
        note: Option<PaymentNote>,
    },
    /// `withdraw(destination)`
    Withdraw {
        /// Destination of the tokens.
        destination: String,
    },
    /// `collect_paid_fees()`
    CollectPaidFees,
    /// `set_protocol_fee(fee)`
    SetProtocolFee {
        /// Whole fee tokens.
        fee: String,
    },
    /// `set_ether_toll(toll)`
    SetEtherToll {
        /// Ether.
        toll: String,
    },
    /// `set_forwarder(forwarder)`
    SetForwarder {
        /// New forwarder.
        forwarder: String,
    },
    /// `transfer_ownership(new_owner)`
    TransferOwnership {
        /// New owner.
        new_owner: String,
    },
    /// `renounce_ownership()`
    RenounceOwnership,
    /// `set_fee_manager(fee_manager)`
    SetFeeManager {
        /// New fee manager.
        fee_manager: String,
    },
    /// `set_fee_taker(fee_taker)`
    SetFeeTaker {
        /// New fee taker.
        fee_taker: String,
    },
}

impl Call {
    /// Entry-point name.
    pub fn name(&self) -> &'static str {
        match self {
            Call::SendEther { .. } => "send_ether",
            Call::SendErc20 { .. } => "send_erc20",
            Call::Withdraw { .. } => "withdraw",
            Call::CollectPaidFees => "collect_paid_fees",
            Call::SetProtocolFee { .. } => "set_protocol_fee",
            Call::SetEtherToll { .. } => "set_ether_toll",
            Call::SetForwarder { .. } => "set_forwarder",
            Call::TransferOwnership { .. } => "transfer_ownership",
            Call::RenounceOwnership => "renounce_ownership",
            Call::SetFeeManager { .. } => "set_fee_manager",
            Call::SetFeeTaker { .. } => "set_fee_taker",
        }
    }
}

/// Parses an account written as `0x…` or as a label.
pub fn account(value: &str) -> Result<Address> {
    let value = value.trim();
    if value.starts_with("0x") || value.starts_with("0X") {
        return Address::from_hex(value).with_context(|| format!("invalid address '{}'", value));
    }
    if value.is_empty() {
        bail!("empty account");
    }
    Ok(Address::from_label(value))
}

fn amount(value: &str) -> Result<Amount> {
    parse_units(value, ETHER_DECIMALS).with_context(|| format!("invalid amount '{}'", value))
}

/// Decimals of the token deployed at `token`, 18 if there is none.
fn decimals_of(chain: &MemoryChain, token: &Address) -> u32 {
    chain
        .token(token)
        .map(|t| u32::from(t.decimals()))
        .unwrap_or(ETHER_DECIMALS)
}

fn token_amount(chain: &MemoryChain, token: &Address, value: &str) -> Result<Amount> {
    parse_units(value, decimals_of(chain, token))
        .with_context(|| format!("invalid amount '{}' of {}", value, token))
}

impl Scenario {
    /// Loads a scenario from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    fn ledger_config(&self, chain: &MemoryChain) -> Result<LedgerConfig> {
        let c = &self.config;
        let fee_token = account(&c.fee_token)?;
        let mut config = LedgerConfig::new(
            account(&c.owner)?,
            fee_token,
            account(&c.fee_manager)?,
            account(&c.fee_taker)?,
        )
        .with_disclosure(c.receiver_disclosure)
        .with_toll_policy(c.toll_policy);

        if let Some(fee) = &c.protocol_fee {
            config = config.with_protocol_fee(token_amount(chain, &fee_token, fee)?);
        }
        if let Some(toll) = &c.ether_toll {
            config = config.with_ether_toll(amount(toll)?);
        }
        if let Some(forwarder) = &c.trusted_forwarder {
            config = config.with_forwarder(account(forwarder)?);
        }
        Ok(config)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of one step.
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    /// Position in the scenario, from 1.
    pub index: usize,
    /// Entry point.
    pub call: &'static str,
    /// Principal the ledger attributed the call to (or `from` if it reverted).
    pub caller: Address,
    /// Events on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<LedgerEvent>>,
    /// Revert reason on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted: Option<String>,
    /// Whether the outcome matched `expect_revert`.
    pub as_expected: bool,
}

/// Final state of a simulation.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// Per-step outcomes.
    pub steps: Vec<StepReport>,
    /// Fee tokens held for the fee taker at the end.
    pub fee_escrow: String,
    /// Native tolls held for the fee taker at the end.
    pub toll_escrow: String,
    /// End balances: account → asset symbol → amount.
    pub balances: BTreeMap<String, BTreeMap<String, String>>,
}

impl Report {
    /// Steps whose outcome differed from the expectation.
    pub fn unexpected(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.as_expected)
    }
}

/// Runs a scenario to completion.
///
/// Fails only on malformed scenarios; reverted calls are recorded in the report.
pub fn run(scenario: &Scenario) -> Result<Report> {
    let mut chain = MemoryChain::new();
    let ledger_address = account(&scenario.ledger)?;

    for (label, info) in &scenario.tokens {
        chain.deploy_token(
            account(label)?,
            MemoryToken::new(&info.name, &info.symbol).with_decimals(info.decimals),
        );
    }
    let config = scenario.ledger_config(&chain)?;
    if !chain.is_deployed(&config.fee_token) {
        bail!("fee token {} is not among the scenario tokens", scenario.config.fee_token);
    }
    let mut ledger = StealthLedger::deploy(ledger_address, config).context("Failed to deploy ledger")?;

    for (who, value) in &scenario.native {
        chain.credit_native(&account(who)?, amount(value)?);
    }
    for mint in &scenario.mints {
        let token = account(&mint.token)?;
        let value = token_amount(&chain, &token, &mint.amount)?;
        chain
            .mint(&token, &account(&mint.to)?, value)
            .map_err(|e| anyhow!("mint of {} to {} failed: {}", mint.token, mint.to, e))?;
    }
    for approval in &scenario.approvals {
        let token = account(&approval.token)?;
        let value = token_amount(&chain, &token, &approval.amount)?;
        chain
            .approve(&token, &account(&approval.owner)?, &ledger_address, value)
            .map_err(|e| anyhow!("approval by {} failed: {}", approval.owner, e))?;
    }
    info!(steps = scenario.steps.len(), "Scenario deployed");

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (i, step) in scenario.steps.iter().enumerate() {
        let report = run_step(&mut ledger, &mut chain, i + 1, step)
            .with_context(|| format!("step {} ({})", i + 1, step.call.name()))?;
        steps.push(report);
    }

    Ok(Report {
        steps,
        fee_escrow: format_units(ledger.fee_escrow(), decimals_of(&chain, &ledger.fee_token())),
        toll_escrow: format_units(ledger.toll_escrow(), ETHER_DECIMALS),
        balances: balances(scenario, &chain, ledger_address)?,
    })
}

fn run_step(
    ledger: &mut StealthLedger,
    chain: &mut MemoryChain,
    index: usize,
    step: &Step,
) -> Result<StepReport> {
    let principal = account(&step.from)?;
    let mut ctx = match &step.via {
        Some(relay) => CallContext::relayed(account(relay)?, principal),
        None => CallContext::from(principal),
    };
    if let Some(value) = &step.value {
        ctx = ctx.with_value(amount(value)?);
    }

    let default_note = || PaymentNote::Packed {
        x_coord: [0u8; 32],
        y_coord: [0u8; 32],
        note: [0u8; 32],
    };

    let outcome = match &step.call {
        Call::SendEther { receiver, note } => ledger.send_ether(
            chain,
            &ctx,
            account(receiver)?,
            note.clone().unwrap_or_else(default_note),
        ),
        Call::SendErc20 {
            receiver,
            token,
            amount: value,
            note,
        } => {
            let token = account(token)?;
            let value = token_amount(chain, &token, value)?;
            ledger.send_erc20(
                chain,
                &ctx,
                account(receiver)?,
                token,
                value,
                note.clone().unwrap_or_else(default_note),
            )
        }
        Call::Withdraw { destination } => ledger.withdraw(chain, &ctx, account(destination)?),
        Call::CollectPaidFees => ledger.collect_paid_fees(chain, &ctx),
        Call::SetProtocolFee { fee } => {
            let fee = token_amount(chain, &ledger.fee_token(), fee)?;
            ledger.set_protocol_fee(&ctx, fee)
        }
        Call::SetEtherToll { toll } => ledger.set_ether_toll(&ctx, amount(toll)?),
        Call::SetForwarder { forwarder } => ledger.set_forwarder(&ctx, account(forwarder)?),
        Call::TransferOwnership { new_owner } => {
            ledger.transfer_ownership(&ctx, account(new_owner)?)
        }
        Call::RenounceOwnership => ledger.renounce_ownership(&ctx),
        Call::SetFeeManager { fee_manager } => ledger.set_fee_manager(&ctx, account(fee_manager)?),
        Call::SetFeeTaker { fee_taker } => ledger.set_fee_taker(&ctx, account(fee_taker)?),
    };

    let report = match outcome {
        Ok(receipt) => StepReport {
            index,
            call: step.call.name(),
            caller: receipt.caller,
            events: Some(receipt.events),
            reverted: None,
            as_expected: step.expect_revert.is_none(),
        },
        Err(err) => {
            let reason = err.revert_reason();
            StepReport {
                index,
                call: step.call.name(),
                caller: principal,
                events: None,
                as_expected: step.expect_revert.as_deref() == Some(reason.as_str()),
                reverted: Some(reason),
            }
        }
    };

    debug!(index, call = report.call, as_expected = report.as_expected, "Step finished");
    Ok(report)
}

/// Balances of every account the scenario mentions, for every deployed token.
fn balances(
    scenario: &Scenario,
    chain: &MemoryChain,
    ledger: Address,
) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
    let mut accounts: Vec<String> = vec![scenario.ledger.clone()];
    accounts.extend(scenario.native.keys().cloned());
    accounts.extend(scenario.mints.iter().map(|m| m.to.clone()));
    for step in &scenario.steps {
        accounts.push(step.from.clone());
        match &step.call {
            Call::SendEther { receiver, .. } | Call::SendErc20 { receiver, .. } => {
                accounts.push(receiver.clone())
            }
            Call::Withdraw { destination } => accounts.push(destination.clone()),
            _ => {}
        }
    }
    accounts.push(scenario.config.fee_taker.clone());

    let mut out = BTreeMap::new();
    for label in accounts {
        let address = account(&label)?;
        let mut row = BTreeMap::new();
        let native = chain.native_balance(&address);
        if native > 0 {
            row.insert("ETH".to_string(), format_units(native, ETHER_DECIMALS));
        }
        for (token_label, info) in &scenario.tokens {
            let token = account(token_label)?;
            let balance = chain.token_balance(&token, &address);
            if balance > 0 {
                row.insert(info.symbol.clone(), format_units(balance, decimals_of(chain, &token)));
            }
        }
        if !row.is_empty() || address == ledger {
            out.insert(label, row);
        }
    }
    Ok(out)
}
