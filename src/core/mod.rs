pub mod orchestrator;
pub mod resolver;

pub use crate::domain::model::{
    ChainId, CompilerSettings, Connection, ContractArtifact, Credential, DeployRequest,
    DeployedContract, DeploymentRecord, DeploymentResult, DeploymentSpec, ExistingDeployment,
    Network, NetworkDescriptor, OptimizerSettings, OverwritePolicy, DIARY_DESCRIPTION, DIARY_NAME,
    IMMORTAL_DIARY,
};
pub use crate::domain::ports::{ArtifactStore, ContractDeployer};
pub use crate::utils::error::Result;
