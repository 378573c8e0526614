use crate::core::{ChainId, Connection, Credential, Network, NetworkDescriptor};
use crate::utils::error::{DeployError, Result};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

pub const MNEMONIC_VAR: &str = "MNEMONIC";
pub const INFURA_API_KEY_VAR: &str = "INFURA_API_KEY";

/// Secrets read from the environment. Empty values count as absent.
#[derive(Debug, Default)]
pub struct Secrets {
    mnemonic: Option<SecretString>,
    infura_api_key: Option<SecretString>,
}

impl Secrets {
    pub fn new(mnemonic: Option<&str>, infura_api_key: Option<&str>) -> Self {
        Self {
            mnemonic: mnemonic.map(|s| SecretString::from(s.to_owned())),
            infura_api_key: infura_api_key.map(|s| SecretString::from(s.to_owned())),
        }
    }

    pub fn from_env() -> Self {
        Self {
            mnemonic: std::env::var(MNEMONIC_VAR).ok().map(SecretString::from),
            infura_api_key: std::env::var(INFURA_API_KEY_VAR)
                .ok()
                .map(SecretString::from),
        }
    }
}

/// Static part of the network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkTable {
    pub development_host: String,
    pub development_port: u16,
    pub provider_host: String,
}

impl Default for NetworkTable {
    fn default() -> Self {
        Self {
            development_host: "127.0.0.1".to_string(),
            development_port: 7545,
            provider_host: "infura.io".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkResolver {
    table: NetworkTable,
}

impl NetworkResolver {
    pub fn new(table: NetworkTable) -> Self {
        Self { table }
    }

    pub fn resolve(&self, network_name: &str, secrets: &Secrets) -> Result<NetworkDescriptor> {
        let network: Network = network_name.parse()?;

        let connection = match network {
            Network::Development => Connection::Local {
                host: self.table.development_host.clone(),
                port: self.table.development_port,
            },
            Network::Mainnet | Network::Ropsten | Network::Rinkeby | Network::Kovan => {
                // 先檢查憑證，缺少時不組出未授權的 URL
                let mnemonic = require(&secrets.mnemonic, network, MNEMONIC_VAR)?;
                let api_key = require(&secrets.infura_api_key, network, INFURA_API_KEY_VAR)?;

                Connection::Remote {
                    url: self.remote_endpoint(network, api_key)?,
                    mnemonic: Credential::new(mnemonic),
                }
            }
        };

        tracing::debug!(
            "Resolved network {} (chain id {}) to {}",
            network,
            network.chain_id(),
            connection.redacted_endpoint()
        );

        Ok(NetworkDescriptor {
            network,
            chain_id: network.chain_id(),
            connection,
        })
    }

    fn remote_endpoint(&self, network: Network, api_key: &str) -> Result<Url> {
        let raw = format!(
            "https://{}.{}/v3/{}",
            network.name(),
            self.table.provider_host,
            api_key
        );
        Url::parse(&raw).map_err(|e| DeployError::ConfigValidationError {
            field: "provider.host".to_string(),
            message: format!("cannot build endpoint for {}: {}", network, e),
        })
    }
}

fn require<'a>(
    secret: &'a Option<SecretString>,
    network: Network,
    variable: &str,
) -> Result<&'a str> {
    secret
        .as_ref()
        .map(|s| s.expose_secret().trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DeployError::MissingCredential {
            network: network.name().to_string(),
            variable: variable.to_string(),
        })
}

/// Development descriptors never need secrets, so tests and dry runs can build
/// one without going through the resolver.
pub fn local_descriptor(host: &str, port: u16) -> NetworkDescriptor {
    NetworkDescriptor {
        network: Network::Development,
        chain_id: ChainId::Any,
        connection: Connection::Local {
            host: host.to_string(),
            port,
        },
    }
}
