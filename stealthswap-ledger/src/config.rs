//! Deployment configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use stealthswap_core::units::amount_string;
use stealthswap_core::{
    parse_units, Address, Amount, LedgerError, ReceiverDisclosure, Result, DEFAULT_ETHER_TOLL,
    DEFAULT_PROTOCOL_FEE, ENV_PREFIX, ETHER_DECIMALS,
};

/// What happens to the native value attached to a token payment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TollPolicy {
    /// The ledger keeps it in the toll escrow; fee collection sweeps it to the fee taker.
    #[default]
    Retain,
    /// Sent on to the stealth address so the recipient can pay for its withdrawal.
    ForwardToReceiver,
}

impl std::str::FromStr for TollPolicy {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(TollPolicy::Retain),
            "forward" | "forward_to_receiver" => Ok(TollPolicy::ForwardToReceiver),
            other => Err(LedgerError::Config(format!("unknown toll policy '{}'", other))),
        }
    }
}

/// Ledger deployment parameters.
///
/// Amounts serialize as decimal strings of the smallest unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Initial owner.
    pub owner: Address,
    /// Token the protocol fee is paid in.
    pub fee_token: Address,
    /// Fee-token amount charged per payment.
    #[serde(with = "amount_string", default = "default_protocol_fee")]
    pub protocol_fee: Amount,
    /// Minimum native value attached to token payments.
    #[serde(with = "amount_string", default = "default_ether_toll")]
    pub ether_toll: Amount,
    /// Principal allowed to collect fees.
    pub fee_manager: Address,
    /// Recipient of collected fees.
    pub fee_taker: Address,
    /// Relay allowed to act on behalf of other principals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_forwarder: Option<Address>,
    /// How receivers appear in `PaymentNote` events.
    #[serde(default)]
    pub receiver_disclosure: ReceiverDisclosure,
    /// Where token-payment tolls go.
    #[serde(default)]
    pub toll_policy: TollPolicy,
}

fn default_protocol_fee() -> Amount {
    DEFAULT_PROTOCOL_FEE
}

fn default_ether_toll() -> Amount {
    DEFAULT_ETHER_TOLL
}

impl LedgerConfig {
    /// Creates a configuration with default fees and no forwarder.
    pub fn new(owner: Address, fee_token: Address, fee_manager: Address, fee_taker: Address) -> Self {
        Self {
            owner,
            fee_token,
            protocol_fee: DEFAULT_PROTOCOL_FEE,
            ether_toll: DEFAULT_ETHER_TOLL,
            fee_manager,
            fee_taker,
            trusted_forwarder: None,
            receiver_disclosure: ReceiverDisclosure::default(),
            toll_policy: TollPolicy::default(),
        }
    }

    /// Sets the protocol fee.
    pub fn with_protocol_fee(mut self, fee: Amount) -> Self {
        self.protocol_fee = fee;
        self
    }

    /// Sets the native toll.
    pub fn with_ether_toll(mut self, toll: Amount) -> Self {
        self.ether_toll = toll;
        self
    }

    /// Sets the trusted forwarder. The zero address means no forwarder.
    pub fn with_forwarder(mut self, forwarder: Address) -> Self {
        self.trusted_forwarder = (!forwarder.is_zero()).then_some(forwarder);
        self
    }

    /// Sets the receiver disclosure mode.
    pub fn with_disclosure(mut self, disclosure: ReceiverDisclosure) -> Self {
        self.receiver_disclosure = disclosure;
        self
    }

    /// Sets the toll policy.
    pub fn with_toll_policy(mut self, policy: TollPolicy) -> Self {
        self.toll_policy = policy;
        self
    }

    /// Loads configuration from the environment.
    ///
    /// Reads a `.env` file if present, then `STEALTHSWAP_*` variables:
    ///
    /// | Variable | Required | Format |
    /// |---|---|---|
    /// | `STEALTHSWAP_OWNER` | yes | address |
    /// | `STEALTHSWAP_FEE_TOKEN` | yes | address |
    /// | `STEALTHSWAP_FEE_MANAGER` | yes | address |
    /// | `STEALTHSWAP_FEE_TAKER` | yes | address |
    /// | `STEALTHSWAP_PROTOCOL_FEE` | no | decimal tokens, e.g. `0.1` |
    /// | `STEALTHSWAP_ETHER_TOLL` | no | decimal ether, e.g. `0.025` |
    /// | `STEALTHSWAP_TRUSTED_FORWARDER` | no | address |
    /// | `STEALTHSWAP_RECEIVER_DISCLOSURE` | no | `plain` or `hashed` |
    /// | `STEALTHSWAP_TOLL_POLICY` | no | `retain` or `forward` |
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    ///
    /// `lookup` receives full variable names including the prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required_address = |name: &str| -> Result<Address> {
            let value = var(name)
                .ok_or_else(|| LedgerError::Config(format!("{}{} is not set", ENV_PREFIX, name)))?;
            Address::from_hex(&value)
                .map_err(|e| LedgerError::Config(format!("{}{}: {}", ENV_PREFIX, name, e)))
        };
        let amount = |name: &str, default: Amount| -> Result<Amount> {
            match var(name) {
                Some(value) => parse_units(&value, ETHER_DECIMALS)
                    .map_err(|e| LedgerError::Config(format!("{}{}: {}", ENV_PREFIX, name, e))),
                None => Ok(default),
            }
        };

        let mut config = Self::new(
            required_address("OWNER")?,
            required_address("FEE_TOKEN")?,
            required_address("FEE_MANAGER")?,
            required_address("FEE_TAKER")?,
        );
        config.protocol_fee = amount("PROTOCOL_FEE", DEFAULT_PROTOCOL_FEE)?;
        config.ether_toll = amount("ETHER_TOLL", DEFAULT_ETHER_TOLL)?;

        if let Some(forwarder) = var("TRUSTED_FORWARDER") {
            let forwarder = Address::from_hex(&forwarder).map_err(|e| {
                LedgerError::Config(format!("{}TRUSTED_FORWARDER: {}", ENV_PREFIX, e))
            })?;
            config = config.with_forwarder(forwarder);
        }
        if let Some(disclosure) = var("RECEIVER_DISCLOSURE") {
            config.receiver_disclosure = match disclosure.to_ascii_lowercase().as_str() {
                "plain" => ReceiverDisclosure::Plain,
                "hashed" => ReceiverDisclosure::Hashed,
                other => {
                    return Err(LedgerError::Config(format!(
                        "{}RECEIVER_DISCLOSURE: unknown mode '{}'",
                        ENV_PREFIX, other
                    )))
                }
            };
        }
        if let Some(policy) = var("TOLL_POLICY") {
            config.toll_policy = policy.parse()?;
        }

        config.validate()?;
        debug!(owner = %config.owner, fee_token = %config.fee_token, "Loaded config from environment");
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.trusted_forwarder = config.trusted_forwarder.filter(|f| !f.is_zero());
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero addresses in required roles.
    pub fn validate(&self) -> Result<()> {
        let roles = [
            ("owner", &self.owner),
            ("fee_token", &self.fee_token),
            ("fee_manager", &self.fee_manager),
            ("fee_taker", &self.fee_taker),
        ];
        for (name, address) in roles {
            if address.is_zero() {
                return Err(LedgerError::Config(format!("{} must not be the zero address", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (format!("{}{}", ENV_PREFIX, k), v.to_string()))
            .collect()
    }

    fn base_env() -> Vec<(&'static str, String)> {
        vec![
            ("OWNER", Address::from_label("owner").to_hex_string()),
            ("FEE_TOKEN", Address::from_label("owl").to_hex_string()),
            ("FEE_MANAGER", Address::from_label("feeManager").to_hex_string()),
            ("FEE_TAKER", Address::from_label("feeTaker").to_hex_string()),
        ]
    }

    fn lookup_from(vars: &[(&str, String)]) -> HashMap<String, String> {
        let pairs: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        env(&pairs)
    }

    #[test]
    fn test_from_lookup_defaults() {
        let vars = lookup_from(&base_env());
        let config = LedgerConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.owner, Address::from_label("owner"));
        assert_eq!(config.protocol_fee, DEFAULT_PROTOCOL_FEE);
        assert_eq!(config.ether_toll, DEFAULT_ETHER_TOLL);
        assert_eq!(config.trusted_forwarder, None);
        assert_eq!(config.receiver_disclosure, ReceiverDisclosure::Hashed);
        assert_eq!(config.toll_policy, TollPolicy::Retain);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let mut pairs = base_env();
        pairs.push(("PROTOCOL_FEE", "0.01".into()));
        pairs.push(("ETHER_TOLL", "0".into()));
        pairs.push(("TRUSTED_FORWARDER", Address::from_label("forwarder").to_hex_string()));
        pairs.push(("RECEIVER_DISCLOSURE", "Plain".into()));
        pairs.push(("TOLL_POLICY", "forward".into()));
        let vars = lookup_from(&pairs);

        let config = LedgerConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.protocol_fee, 10_000_000_000_000_000);
        assert_eq!(config.ether_toll, 0);
        assert_eq!(config.trusted_forwarder, Some(Address::from_label("forwarder")));
        assert_eq!(config.receiver_disclosure, ReceiverDisclosure::Plain);
        assert_eq!(config.toll_policy, TollPolicy::ForwardToReceiver);
    }

    #[test]
    fn test_zero_forwarder_means_none() {
        let mut pairs = base_env();
        pairs.push(("TRUSTED_FORWARDER", Address::ZERO.to_hex_string()));
        let vars = lookup_from(&pairs);

        let config = LedgerConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.trusted_forwarder, None);

        let built = config.with_forwarder(Address::ZERO);
        assert_eq!(built.trusted_forwarder, None);

        let mut json = serde_json::to_value(&built).unwrap();
        json["trusted_forwarder"] = serde_json::json!(Address::ZERO.to_hex_string());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.to_string().as_bytes()).unwrap();
        let loaded = LedgerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.trusted_forwarder, None);
    }

    #[test]
    fn test_from_lookup_missing_required() {
        let mut pairs = base_env();
        pairs.retain(|(k, _)| *k != "FEE_TAKER");
        let vars = lookup_from(&pairs);

        let err = LedgerConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
        assert!(err.to_string().contains("STEALTHSWAP_FEE_TAKER"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let mut pairs = base_env();
        pairs.push(("PROTOCOL_FEE", "-1".into()));
        let vars = lookup_from(&pairs);
        assert!(LedgerConfig::from_lookup(|k| vars.get(k).cloned()).is_err());

        let mut pairs = base_env();
        pairs.push(("TOLL_POLICY", "burn".into()));
        let vars = lookup_from(&pairs);
        assert!(LedgerConfig::from_lookup(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_roles() {
        let config = LedgerConfig::new(
            Address::from_label("owner"),
            Address::ZERO,
            Address::from_label("feeManager"),
            Address::from_label("feeTaker"),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fee_token"));
    }

    #[test]
    fn test_json_file_roundtrip() {
        let config = LedgerConfig::new(
            Address::from_label("owner"),
            Address::from_label("owl"),
            Address::from_label("feeManager"),
            Address::from_label("feeTaker"),
        )
        .with_toll_policy(TollPolicy::ForwardToReceiver);

        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"protocol_fee\": \"100000000000000000\""));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = LedgerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_defaults_for_optional_fields() {
        let json = format!(
            r#"{{"owner":"{}","fee_token":"{}","fee_manager":"{}","fee_taker":"{}"}}"#,
            Address::from_label("owner"),
            Address::from_label("owl"),
            Address::from_label("feeManager"),
            Address::from_label("feeTaker"),
        );
        let config: LedgerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.protocol_fee, DEFAULT_PROTOCOL_FEE);
        assert_eq!(config.toll_policy, TollPolicy::Retain);
    }
}
