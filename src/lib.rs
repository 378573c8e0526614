pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::DeployConfig;

pub use adapters::{artifacts::TruffleArtifacts, rpc::RpcDeployer};
pub use core::{
    orchestrator::{DeploymentOrchestrator, DeploymentPlan, PlannedAction},
    resolver::{NetworkResolver, NetworkTable, Secrets},
};
pub use domain::model::{DeploymentResult, DeploymentSpec, Network, NetworkDescriptor};
pub use utils::error::{DeployError, Result};
