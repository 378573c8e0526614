use crate::core::{
    ArtifactStore, ChainId, ContractDeployer, DeployRequest, DeploymentRecord, DeploymentResult,
    DeploymentSpec, ExistingDeployment, NetworkDescriptor, OverwritePolicy,
};
use crate::utils::error::{DeployError, Result};
use chrono::Utc;

/// What a run would do, computed without sending a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub chain_id: u64,
    pub network_id: u64,
    pub policy: OverwritePolicy,
    pub action: PlannedAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Deploy { bytecode_len: usize },
    Reuse { address: String },
    Refuse { address: String },
}

impl DeploymentPlan {
    /// A refused plan fails the same way the real run would.
    pub fn check(&self, descriptor: &NetworkDescriptor, spec: &DeploymentSpec) -> Result<()> {
        match &self.action {
            PlannedAction::Refuse { address } => Err(DeployError::AlreadyDeployed {
                contract: spec.contract_name().to_string(),
                network: descriptor.name().to_string(),
                address: address.clone(),
            }),
            PlannedAction::Deploy { .. } | PlannedAction::Reuse { .. } => Ok(()),
        }
    }
}

pub struct DeploymentOrchestrator<D: ContractDeployer, A: ArtifactStore> {
    deployer: D,
    artifacts: A,
    on_existing: ExistingDeployment,
}

impl<D: ContractDeployer, A: ArtifactStore> DeploymentOrchestrator<D, A> {
    pub fn new(deployer: D, artifacts: A) -> Self {
        Self {
            deployer,
            artifacts,
            on_existing: ExistingDeployment::default(),
        }
    }

    pub fn with_existing(mut self, on_existing: ExistingDeployment) -> Self {
        self.on_existing = on_existing;
        self
    }

    /// 明確指定的策略優先，否則依網路決定
    pub fn overwrite_policy(
        descriptor: &NetworkDescriptor,
        spec: &DeploymentSpec,
    ) -> OverwritePolicy {
        spec.overwrite()
            .unwrap_or_else(|| OverwritePolicy::for_network(descriptor.network))
    }

    pub async fn plan(
        &self,
        descriptor: &NetworkDescriptor,
        spec: &DeploymentSpec,
    ) -> Result<DeploymentPlan> {
        let chain_id = self.verify_chain(descriptor).await?;
        let network_id = self.deployer.network_id().await?;
        let policy = Self::overwrite_policy(descriptor, spec);

        if policy == OverwritePolicy::SkipIfExists {
            if let Some(record) = self.live_deployment(spec, network_id).await? {
                let action = match self.on_existing {
                    ExistingDeployment::Reuse => PlannedAction::Reuse {
                        address: record.address,
                    },
                    ExistingDeployment::Fail => PlannedAction::Refuse {
                        address: record.address,
                    },
                };
                return Ok(DeploymentPlan {
                    chain_id,
                    network_id,
                    policy,
                    action,
                });
            }
        }

        let artifact = self.artifacts.load(spec.contract_name()).await?;
        Ok(DeploymentPlan {
            chain_id,
            network_id,
            policy,
            action: PlannedAction::Deploy {
                bytecode_len: artifact.bytecode.len(),
            },
        })
    }

    pub async fn deploy(
        &self,
        descriptor: &NetworkDescriptor,
        spec: &DeploymentSpec,
    ) -> Result<DeploymentResult> {
        let chain_id = self.verify_chain(descriptor).await?;
        let network_id = self.deployer.network_id().await?;
        let policy = Self::overwrite_policy(descriptor, spec);

        tracing::info!(
            "🚀 Deploying {} to {} (chain id {}, overwrite: {})",
            spec.contract_name(),
            descriptor.name(),
            chain_id,
            policy
        );

        if policy == OverwritePolicy::SkipIfExists {
            if let Some(record) = self.live_deployment(spec, network_id).await? {
                return match self.on_existing {
                    ExistingDeployment::Reuse => {
                        tracing::info!(
                            "⏭️  {} already deployed at {}, skipping",
                            spec.contract_name(),
                            record.address
                        );
                        Ok(DeploymentResult {
                            contract_address: record.address,
                            network: descriptor.clone(),
                            tx_hash: None,
                            reused: true,
                        })
                    }
                    ExistingDeployment::Fail => Err(DeployError::AlreadyDeployed {
                        contract: spec.contract_name().to_string(),
                        network: descriptor.name().to_string(),
                        address: record.address,
                    }),
                };
            }
        }

        let artifact = self.artifacts.load(spec.contract_name()).await?;
        let request = DeployRequest {
            contract_name: spec.contract_name().to_string(),
            bytecode: artifact.bytecode,
            constructor_args: spec.constructor_args().to_vec(),
            policy,
        };

        let deployed = self
            .deployer
            .deploy(request)
            .await
            .map_err(|e| match e {
                DeployError::DeploymentFailed { .. } => e,
                other => DeployError::DeploymentFailed {
                    contract: spec.contract_name().to_string(),
                    network: descriptor.name().to_string(),
                    message: other.to_string(),
                },
            })?;

        tracing::info!(
            "✅ {} deployed at {} (tx {})",
            spec.contract_name(),
            deployed.address,
            deployed.transaction_hash
        );

        let record = DeploymentRecord {
            address: deployed.address.clone(),
            transaction_hash: Some(deployed.transaction_hash.clone()),
            updated_at: Some(Utc::now()),
        };
        // 沒有記錄，下一次執行就會再部署一份
        if let Err(e) = self
            .artifacts
            .record(spec.contract_name(), network_id, &record)
            .await
        {
            if policy == OverwritePolicy::SkipIfExists {
                return Err(DeployError::RecordFailed {
                    contract: spec.contract_name().to_string(),
                    network: descriptor.name().to_string(),
                    address: deployed.address,
                    tx_hash: deployed.transaction_hash,
                    message: e.to_string(),
                });
            }
            tracing::warn!("⚠️  Could not record deployment: {}", e);
        }

        Ok(DeploymentResult {
            contract_address: deployed.address,
            network: descriptor.clone(),
            tx_hash: Some(deployed.transaction_hash),
            reused: false,
        })
    }

    async fn verify_chain(&self, descriptor: &NetworkDescriptor) -> Result<u64> {
        let actual = self.deployer.chain_id().await?;
        if !descriptor.chain_id.matches(actual) {
            return Err(DeployError::ChainMismatch {
                network: descriptor.name().to_string(),
                expected: match descriptor.chain_id {
                    ChainId::Id(id) => id,
                    ChainId::Any => actual,
                },
                actual,
            });
        }
        Ok(actual)
    }

    /// A recorded deployment counts only while the chain still holds its code.
    async fn live_deployment(
        &self,
        spec: &DeploymentSpec,
        network_id: u64,
    ) -> Result<Option<DeploymentRecord>> {
        let Some(record) = self
            .artifacts
            .deployment(spec.contract_name(), network_id)
            .await?
        else {
            return Ok(None);
        };

        if self.deployer.has_code(&record.address).await? {
            Ok(Some(record))
        } else {
            tracing::warn!(
                "Recorded address {} for {} has no code, deploying again",
                record.address,
                spec.contract_name()
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::local_descriptor;
    use crate::core::{Connection, ContractArtifact, Credential, DeployedContract, Network};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeDeployer {
        chain_id: u64,
        network_id: u64,
        requests: Arc<Mutex<Vec<DeployRequest>>>,
        code: Arc<Mutex<Vec<String>>>,
        fail_with: Option<String>,
    }

    impl FakeDeployer {
        fn on_chain(chain_id: u64) -> Self {
            Self {
                chain_id,
                network_id: chain_id,
                ..Self::default()
            }
        }

        // Ganache: eth_chainId 1337, net_version 5777
        fn ganache() -> Self {
            Self {
                chain_id: 1337,
                network_id: 5777,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<DeployRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContractDeployer for FakeDeployer {
        async fn chain_id(&self) -> Result<u64> {
            Ok(self.chain_id)
        }

        async fn network_id(&self) -> Result<u64> {
            Ok(self.network_id)
        }

        async fn accounts(&self) -> Result<Vec<String>> {
            Ok(vec!["0x0000000000000000000000000000000000000001".to_string()])
        }

        async fn has_code(&self, address: &str) -> Result<bool> {
            Ok(self.code.lock().unwrap().iter().any(|a| a == address))
        }

        async fn deploy(&self, request: DeployRequest) -> Result<DeployedContract> {
            if let Some(message) = &self.fail_with {
                return Err(DeployError::RpcError {
                    message: message.clone(),
                });
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            let address = format!("0x{:040x}", requests.len());
            self.code.lock().unwrap().push(address.clone());
            Ok(DeployedContract {
                address,
                transaction_hash: format!("0x{:064x}", requests.len()),
            })
        }
    }

    #[derive(Clone, Default)]
    struct MemoryArtifacts {
        records: Arc<Mutex<HashMap<(String, u64), DeploymentRecord>>>,
        read_only: bool,
    }

    impl MemoryArtifacts {
        fn read_only() -> Self {
            Self {
                read_only: true,
                ..Self::default()
            }
        }

        fn recorded(&self, contract_name: &str, network_id: u64) -> Option<DeploymentRecord> {
            self.records
                .lock()
                .unwrap()
                .get(&(contract_name.to_string(), network_id))
                .cloned()
        }
    }

    #[async_trait]
    impl ArtifactStore for MemoryArtifacts {
        async fn load(&self, contract_name: &str) -> Result<ContractArtifact> {
            Ok(ContractArtifact {
                contract_name: contract_name.to_string(),
                bytecode: vec![0x60, 0x80, 0x60, 0x40],
                optimizer: None,
            })
        }

        async fn deployment(
            &self,
            contract_name: &str,
            network_id: u64,
        ) -> Result<Option<DeploymentRecord>> {
            Ok(self.recorded(contract_name, network_id))
        }

        async fn record(
            &self,
            contract_name: &str,
            network_id: u64,
            record: &DeploymentRecord,
        ) -> Result<()> {
            if self.read_only {
                return Err(DeployError::IoError(std::io::Error::other(
                    "read-only build dir",
                )));
            }
            self.records
                .lock()
                .unwrap()
                .insert((contract_name.to_string(), network_id), record.clone());
            Ok(())
        }
    }

    fn mainnet() -> NetworkDescriptor {
        NetworkDescriptor {
            network: Network::Mainnet,
            chain_id: ChainId::Id(1),
            connection: Connection::Remote {
                url: url::Url::parse("https://mainnet.infura.io/v3/key").unwrap(),
                mnemonic: Credential::new("phrase"),
            },
        }
    }

    #[tokio::test]
    async fn test_mainnet_selects_skip_if_exists() {
        let deployer = FakeDeployer::on_chain(1);
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::default());

        orchestrator
            .deploy(&mainnet(), &DeploymentSpec::immortal_diary())
            .await
            .unwrap();

        assert_eq!(deployer.calls()[0].policy, OverwritePolicy::SkipIfExists);
    }

    #[tokio::test]
    async fn test_development_selects_always() {
        let deployer = FakeDeployer::ganache();
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::default());

        orchestrator
            .deploy(
                &local_descriptor("127.0.0.1", 7545),
                &DeploymentSpec::immortal_diary(),
            )
            .await
            .unwrap();

        assert_eq!(deployer.calls()[0].policy, OverwritePolicy::Always);
    }

    #[tokio::test]
    async fn test_development_redeploys_every_run() {
        let deployer = FakeDeployer::ganache();
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::default());
        let descriptor = local_descriptor("127.0.0.1", 7545);
        let spec = DeploymentSpec::immortal_diary();

        let first = orchestrator.deploy(&descriptor, &spec).await.unwrap();
        let second = orchestrator.deploy(&descriptor, &spec).await.unwrap();

        assert_eq!(deployer.calls().len(), 2);
        assert_ne!(first.contract_address, second.contract_address);
    }

    #[tokio::test]
    async fn test_explicit_overwrite_wins_over_network_default() {
        let deployer = FakeDeployer::on_chain(1);
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::default());
        let spec = DeploymentSpec::immortal_diary().with_overwrite(Some(OverwritePolicy::Always));

        orchestrator.deploy(&mainnet(), &spec).await.unwrap();
        orchestrator.deploy(&mainnet(), &spec).await.unwrap();

        assert_eq!(deployer.calls().len(), 2);
        assert!(deployer
            .calls()
            .iter()
            .all(|r| r.policy == OverwritePolicy::Always));
    }

    #[tokio::test]
    async fn test_fail_mode_refuses_live_deployment() {
        let deployer = FakeDeployer::on_chain(1);
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::default())
            .with_existing(ExistingDeployment::Fail);
        let spec = DeploymentSpec::immortal_diary();

        orchestrator.deploy(&mainnet(), &spec).await.unwrap();
        let second = orchestrator.deploy(&mainnet(), &spec).await;

        assert!(matches!(second, Err(DeployError::AlreadyDeployed { .. })));
        assert_eq!(deployer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_record_is_redeployed() {
        let deployer = FakeDeployer::on_chain(1);
        let artifacts = MemoryArtifacts::default();
        artifacts
            .record(
                "ImmortalDiary",
                1,
                &DeploymentRecord {
                    address: "0x00000000000000000000000000000000000000ff".to_string(),
                    transaction_hash: None,
                    updated_at: None,
                },
            )
            .await
            .unwrap();
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), artifacts);

        let result = orchestrator
            .deploy(&mainnet(), &DeploymentSpec::immortal_diary())
            .await
            .unwrap();

        assert!(!result.reused);
        assert_eq!(deployer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_chain_mismatch_sends_nothing() {
        let deployer = FakeDeployer::on_chain(3);
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::default());

        let result = orchestrator
            .deploy(&mainnet(), &DeploymentSpec::immortal_diary())
            .await;

        assert!(matches!(
            result,
            Err(DeployError::ChainMismatch {
                expected: 1,
                actual: 3,
                ..
            })
        ));
        assert!(deployer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_error_becomes_deployment_failed() {
        let deployer = FakeDeployer {
            chain_id: 1,
            fail_with: Some("insufficient funds for gas".to_string()),
            ..FakeDeployer::default()
        };
        let orchestrator = DeploymentOrchestrator::new(deployer, MemoryArtifacts::default());

        let result = orchestrator
            .deploy(&mainnet(), &DeploymentSpec::immortal_diary())
            .await;

        match result {
            Err(DeployError::DeploymentFailed {
                contract,
                network,
                message,
            }) => {
                assert_eq!(contract, "ImmortalDiary");
                assert_eq!(network, "mainnet");
                assert!(message.contains("insufficient funds for gas"));
            }
            other => panic!("expected DeploymentFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_plan_reports_reuse_without_deploying() {
        let deployer = FakeDeployer::on_chain(1);
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::default());
        let spec = DeploymentSpec::immortal_diary();

        let before = orchestrator.plan(&mainnet(), &spec).await.unwrap();
        assert_eq!(before.action, PlannedAction::Deploy { bytecode_len: 4 });

        let deployed = orchestrator.deploy(&mainnet(), &spec).await.unwrap();
        let after = orchestrator.plan(&mainnet(), &spec).await.unwrap();

        assert_eq!(
            after.action,
            PlannedAction::Reuse {
                address: deployed.contract_address
            }
        );
        assert_eq!(deployer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_records_are_keyed_by_network_id() {
        let artifacts = MemoryArtifacts::default();
        let orchestrator = DeploymentOrchestrator::new(FakeDeployer::ganache(), artifacts.clone());
        let descriptor = local_descriptor("127.0.0.1", 7545);
        let spec = DeploymentSpec::immortal_diary();

        let result = orchestrator.deploy(&descriptor, &spec).await.unwrap();

        assert_eq!(
            artifacts.recorded("ImmortalDiary", 5777).map(|r| r.address),
            Some(result.contract_address)
        );
        assert!(artifacts.recorded("ImmortalDiary", 1337).is_none());

        let plan = orchestrator.plan(&descriptor, &spec).await.unwrap();
        assert_eq!((plan.chain_id, plan.network_id), (1337, 5777));
    }

    #[tokio::test]
    async fn test_mainnet_record_failure_is_an_error_with_the_address() {
        let deployer = FakeDeployer::on_chain(1);
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::read_only());

        let result = orchestrator
            .deploy(&mainnet(), &DeploymentSpec::immortal_diary())
            .await;

        match result {
            Err(DeployError::RecordFailed {
                network,
                address,
                tx_hash,
                message,
                ..
            }) => {
                assert_eq!(network, "mainnet");
                assert_eq!(address, format!("0x{:040x}", 1));
                assert_eq!(tx_hash, format!("0x{:064x}", 1));
                assert!(message.contains("read-only build dir"));
            }
            other => panic!("expected RecordFailed, got {other:?}"),
        }
        assert_eq!(deployer.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_development_record_failure_only_warns() {
        let orchestrator =
            DeploymentOrchestrator::new(FakeDeployer::ganache(), MemoryArtifacts::read_only());

        let result = orchestrator
            .deploy(
                &local_descriptor("127.0.0.1", 7545),
                &DeploymentSpec::immortal_diary(),
            )
            .await
            .unwrap();

        assert!(!result.reused);
        assert!(result.tx_hash.is_some());
    }

    #[tokio::test]
    async fn test_refused_plan_fails_like_the_real_run() {
        let deployer = FakeDeployer::on_chain(1);
        let orchestrator = DeploymentOrchestrator::new(deployer.clone(), MemoryArtifacts::default())
            .with_existing(ExistingDeployment::Fail);
        let spec = DeploymentSpec::immortal_diary();

        let fresh = orchestrator.plan(&mainnet(), &spec).await.unwrap();
        assert!(fresh.check(&mainnet(), &spec).is_ok());

        let deployed = orchestrator.deploy(&mainnet(), &spec).await.unwrap();
        let plan = orchestrator.plan(&mainnet(), &spec).await.unwrap();

        assert_eq!(
            plan.action,
            PlannedAction::Refuse {
                address: deployed.contract_address.clone()
            }
        );
        match plan.check(&mainnet(), &spec) {
            Err(DeployError::AlreadyDeployed { address, .. }) => {
                assert_eq!(address, deployed.contract_address)
            }
            other => panic!("expected AlreadyDeployed, got {other:?}"),
        }
        assert_eq!(deployer.calls().len(), 1);
    }
}
