use crate::utils::error::{DeployError, Result};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

pub const IMMORTAL_DIARY: &str = "ImmortalDiary";
pub const DIARY_NAME: &str = "The Immortal Diary of Dario and Nati";
pub const DIARY_DESCRIPTION: &str = "Immortal Diary of Dario Anongba Varela and Nativity Carol. Most important moments of our live. Use it wisely, as you cannot go back!";

/// 支援的網路
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Ropsten,
    Rinkeby,
    Kovan,
    Development,
}

impl Network {
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Ropsten,
        Network::Rinkeby,
        Network::Kovan,
        Network::Development,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Ropsten => "ropsten",
            Network::Rinkeby => "rinkeby",
            Network::Kovan => "kovan",
            Network::Development => "development",
        }
    }

    pub fn chain_id(&self) -> ChainId {
        match self {
            Network::Mainnet => ChainId::Id(1),
            Network::Ropsten => ChainId::Id(3),
            Network::Rinkeby => ChainId::Id(4),
            Network::Kovan => ChainId::Id(42),
            Network::Development => ChainId::Any,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Network::Development)
    }
}

impl FromStr for Network {
    type Err = DeployError;

    fn from_str(name: &str) -> Result<Self> {
        Network::ALL
            .into_iter()
            .find(|network| network.name() == name)
            .ok_or_else(|| DeployError::UnknownNetwork {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `Any` 對應 truffle 的 `network_id: "*"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainId {
    Any,
    Id(u64),
}

impl ChainId {
    pub fn matches(&self, actual: u64) -> bool {
        match self {
            ChainId::Any => true,
            ChainId::Id(expected) => *expected == actual,
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainId::Any => f.write_str("*"),
            ChainId::Id(id) => write!(f, "{}", id),
        }
    }
}

/// Signing secret (the wallet mnemonic). Never printed.
pub struct Credential(SecretString);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::from(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_owned())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[derive(Clone)]
pub enum Connection {
    Local { host: String, port: u16 },
    Remote { url: Url, mnemonic: Credential },
}

impl Connection {
    pub fn endpoint(&self) -> Result<Url> {
        match self {
            Connection::Local { host, port } => {
                let raw = format!("http://{}:{}", host, port);
                Url::parse(&raw).map_err(|e| DeployError::InvalidConfigValueError {
                    field: "networks.development".to_string(),
                    value: raw,
                    reason: e.to_string(),
                })
            }
            Connection::Remote { url, .. } => Ok(url.clone()),
        }
    }

    /// 遠端 URL 的路徑帶有 API key，輸出前先遮蔽
    pub fn redacted_endpoint(&self) -> String {
        match self {
            Connection::Local { host, port } => format!("http://{}:{}", host, port),
            Connection::Remote { url, .. } => {
                let mut redacted = url.clone();
                redacted.set_path("/v3/***");
                redacted.to_string()
            }
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Local { host, port } => f
                .debug_struct("Local")
                .field("host", host)
                .field("port", port)
                .finish(),
            Connection::Remote { mnemonic, .. } => f
                .debug_struct("Remote")
                .field("url", &self.redacted_endpoint())
                .field("mnemonic", mnemonic)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkDescriptor {
    pub network: Network,
    pub chain_id: ChainId,
    pub connection: Connection,
}

impl NetworkDescriptor {
    pub fn name(&self) -> &'static str {
        self.network.name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    Always,
    SkipIfExists,
}

impl OverwritePolicy {
    /// mainnet 只部署一次，其餘網路每次都重新部署
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => OverwritePolicy::SkipIfExists,
            Network::Ropsten | Network::Rinkeby | Network::Kovan | Network::Development => {
                OverwritePolicy::Always
            }
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverwritePolicy::Always => f.write_str("always"),
            OverwritePolicy::SkipIfExists => f.write_str("skip-if-exists"),
        }
    }
}

/// What `SkipIfExists` does when a live instance is already recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ExistingDeployment {
    #[default]
    Reuse,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    contract_name: String,
    constructor_args: Vec<String>,
    overwrite: Option<OverwritePolicy>,
}

impl DeploymentSpec {
    pub fn new(contract_name: impl Into<String>, constructor_args: Vec<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            constructor_args,
            overwrite: None,
        }
    }

    pub fn immortal_diary() -> Self {
        Self::new(
            IMMORTAL_DIARY,
            vec![DIARY_NAME.to_string(), DIARY_DESCRIPTION.to_string()],
        )
    }

    pub fn with_overwrite(mut self, overwrite: Option<OverwritePolicy>) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn constructor_args(&self) -> &[String] {
        &self.constructor_args
    }

    pub fn overwrite(&self) -> Option<OverwritePolicy> {
        self.overwrite
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub contract_address: String,
    pub network: NetworkDescriptor,
    pub tx_hash: Option<String>,
    pub reused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub enabled: bool,
    pub runs: u64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            runs: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    pub optimizer: OptimizerSettings,
}

#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub bytecode: Vec<u8>,
    pub optimizer: Option<OptimizerSettings>,
}

/// One entry of an artifact's `networks` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub contract_name: String,
    pub bytecode: Vec<u8>,
    pub constructor_args: Vec<String>,
    pub policy: OverwritePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    pub address: String,
    pub transaction_hash: String,
}
