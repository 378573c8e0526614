use crate::core::{
    Connection, ContractDeployer, DeployRequest, DeployedContract, NetworkDescriptor,
};
use crate::utils::error::{DeployError, Result};
use alloy::dyn_abi::DynSolValue;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder};
use async_trait::async_trait;
use std::str::FromStr;

/// JSON-RPC chain client.
///
/// Local nodes sign with their own unlocked accounts (the first one deploys);
/// remote networks sign locally with an HD wallet derived from the mnemonic.
pub struct RpcDeployer {
    provider: DynProvider,
    sender: Option<Address>,
}

impl RpcDeployer {
    pub fn new(provider: DynProvider, sender: Option<Address>) -> Self {
        Self { provider, sender }
    }

    pub fn connect(descriptor: &NetworkDescriptor, account_index: u32) -> Result<Self> {
        let url = descriptor.connection.endpoint()?;

        match &descriptor.connection {
            Connection::Local { .. } => {
                let provider = ProviderBuilder::new().connect_http(url).erased();
                Ok(Self::new(provider, None))
            }
            Connection::Remote { mnemonic, .. } => {
                let invalid = |e: alloy::signers::local::LocalSignerError| {
                    DeployError::InvalidCredential {
                        network: descriptor.name().to_string(),
                        reason: e.to_string(),
                    }
                };
                let signer = MnemonicBuilder::<English>::default()
                    .phrase(mnemonic.expose())
                    .index(account_index)
                    .map_err(invalid)?
                    .build()
                    .map_err(invalid)?;
                let sender = signer.address();
                tracing::debug!("Using HD wallet account #{} ({})", account_index, sender);

                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url)
                    .erased();
                Ok(Self::new(provider, Some(sender)))
            }
        }
    }

    async fn sender(&self) -> Result<Address> {
        if let Some(sender) = self.sender {
            return Ok(sender);
        }

        self.provider
            .get_accounts()
            .await
            .map_err(rpc_error)?
            .first()
            .copied()
            .ok_or_else(|| DeployError::RpcError {
                message: "node exposes no unlocked accounts".to_string(),
            })
    }
}

/// Creation code followed by the ABI-encoded constructor arguments.
pub fn creation_code(bytecode: &[u8], constructor_args: &[String]) -> Vec<u8> {
    let mut code = bytecode.to_vec();
    if !constructor_args.is_empty() {
        let args = DynSolValue::Tuple(
            constructor_args
                .iter()
                .cloned()
                .map(DynSolValue::String)
                .collect(),
        );
        code.extend_from_slice(&args.abi_encode_params());
    }
    code
}

fn rpc_error(e: impl std::fmt::Display) -> DeployError {
    DeployError::RpcError {
        message: e.to_string(),
    }
}

#[async_trait]
impl ContractDeployer for RpcDeployer {
    async fn chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.map_err(rpc_error)
    }

    async fn network_id(&self) -> Result<u64> {
        self.provider.get_net_version().await.map_err(rpc_error)
    }

    async fn accounts(&self) -> Result<Vec<String>> {
        let accounts = match self.sender {
            Some(sender) => vec![sender],
            None => self.provider.get_accounts().await.map_err(rpc_error)?,
        };
        Ok(accounts.iter().map(ToString::to_string).collect())
    }

    async fn has_code(&self, address: &str) -> Result<bool> {
        let address = Address::from_str(address).map_err(|e| DeployError::RpcError {
            message: format!("invalid address {}: {}", address, e),
        })?;
        let code = self
            .provider
            .get_code_at(address)
            .await
            .map_err(rpc_error)?;
        Ok(!code.is_empty())
    }

    async fn deploy(&self, request: DeployRequest) -> Result<DeployedContract> {
        let from = self.sender().await?;
        let code = creation_code(&request.bytecode, &request.constructor_args);

        tracing::debug!(
            "Sending creation transaction for {} from {} ({} bytes, overwrite: {})",
            request.contract_name,
            from,
            code.len(),
            request.policy
        );

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_deploy_code(code);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(rpc_error)?;
        let tx_hash = *pending.tx_hash();
        tracing::info!("⏳ Waiting for transaction {} to be mined", tx_hash);

        let receipt = pending.get_receipt().await.map_err(rpc_error)?;
        if !receipt.status() {
            return Err(DeployError::RpcError {
                message: format!("transaction {} reverted", tx_hash),
            });
        }

        let address = receipt.contract_address.ok_or_else(|| DeployError::RpcError {
            message: format!("receipt of {} has no contract address", tx_hash),
        })?;

        Ok(DeployedContract {
            address: address.to_string(),
            transaction_hash: tx_hash.to_string(),
        })
    }
}
