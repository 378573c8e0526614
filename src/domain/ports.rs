use crate::domain::model::{ContractArtifact, DeployRequest, DeployedContract, DeploymentRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The chain a contract is published to.
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    /// `net_version`; deployment records are keyed by it.
    async fn network_id(&self) -> Result<u64>;

    /// Accounts available for signing (node accounts or the HD wallet).
    async fn accounts(&self) -> Result<Vec<String>>;

    async fn has_code(&self, address: &str) -> Result<bool>;

    /// Submits one creation transaction and waits for it to be mined.
    async fn deploy(&self, request: DeployRequest) -> Result<DeployedContract>;
}

/// Compiled contracts and the record of where they were deployed,
/// keyed by network id.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn load(&self, contract_name: &str) -> Result<ContractArtifact>;

    async fn deployment(
        &self,
        contract_name: &str,
        network_id: u64,
    ) -> Result<Option<DeploymentRecord>>;

    async fn record(
        &self,
        contract_name: &str,
        network_id: u64,
        record: &DeploymentRecord,
    ) -> Result<()>;
}
