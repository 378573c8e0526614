use crate::core::{
    ArtifactStore, CompilerSettings, ContractArtifact, DeploymentRecord, OptimizerSettings,
};
use crate::utils::error::{DeployError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Compiled contract JSON files (`<build_dir>/<Contract>.json`).
///
/// Deployments are written back into the artifact's `networks` map keyed by
/// network id (`net_version`), leaving every other field untouched.
#[derive(Debug, Clone)]
pub struct TruffleArtifacts {
    build_dir: PathBuf,
    compiler: Option<CompilerSettings>,
}

impl TruffleArtifacts {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            compiler: None,
        }
    }

    /// Expected compiler settings; a mismatching artifact is reported, not rejected.
    pub fn with_compiler(mut self, compiler: CompilerSettings) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn artifact_path(&self, contract_name: &str) -> PathBuf {
        self.build_dir.join(format!("{}.json", contract_name))
    }

    async fn read_document(&self, path: &Path) -> Result<Value> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DeployError::ArtifactError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let document: Value = serde_json::from_str(&content)?;
        if !document.is_object() {
            return Err(DeployError::ArtifactError {
                path: path.display().to_string(),
                message: "artifact is not a JSON object".to_string(),
            });
        }
        Ok(document)
    }

    fn check_compiler(&self, path: &Path, found: Option<OptimizerSettings>) {
        let (Some(expected), Some(found)) = (self.compiler, found) else {
            return;
        };
        if expected.optimizer != found {
            tracing::warn!(
                "⚠️  {} was compiled with optimizer enabled={} runs={}, configuration says enabled={} runs={}",
                path.display(),
                found.enabled,
                found.runs,
                expected.optimizer.enabled,
                expected.optimizer.runs
            );
        }
    }
}

#[async_trait]
impl ArtifactStore for TruffleArtifacts {
    async fn load(&self, contract_name: &str) -> Result<ContractArtifact> {
        let path = self.artifact_path(contract_name);
        let document = self.read_document(&path).await?;

        let bytecode = document
            .get("bytecode")
            .and_then(Value::as_str)
            .ok_or_else(|| DeployError::ArtifactError {
                path: path.display().to_string(),
                message: "missing bytecode".to_string(),
            })?;
        let bytecode = decode_bytecode(bytecode).map_err(|message| DeployError::ArtifactError {
            path: path.display().to_string(),
            message,
        })?;

        let optimizer = document
            .get("metadata")
            .and_then(Value::as_str)
            .and_then(optimizer_from_metadata);
        self.check_compiler(&path, optimizer);

        tracing::debug!(
            "Loaded {} ({} bytes of bytecode) from {}",
            contract_name,
            bytecode.len(),
            path.display()
        );

        Ok(ContractArtifact {
            contract_name: document
                .get("contractName")
                .and_then(Value::as_str)
                .unwrap_or(contract_name)
                .to_string(),
            bytecode,
            optimizer,
        })
    }

    async fn deployment(
        &self,
        contract_name: &str,
        network_id: u64,
    ) -> Result<Option<DeploymentRecord>> {
        let path = self.artifact_path(contract_name);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        let document = self.read_document(&path).await?;
        match document
            .get("networks")
            .and_then(|networks| networks.get(network_id.to_string()))
        {
            Some(entry) => Ok(Some(serde_json::from_value(entry.clone())?)),
            None => Ok(None),
        }
    }

    async fn record(
        &self,
        contract_name: &str,
        network_id: u64,
        record: &DeploymentRecord,
    ) -> Result<()> {
        let path = self.artifact_path(contract_name);
        let mut document = self.read_document(&path).await?;

        if let Value::Object(root) = &mut document {
            let networks = root
                .entry("networks")
                .or_insert_with(|| Value::Object(Map::new()));
            if !networks.is_object() {
                *networks = Value::Object(Map::new());
            }

            if let Value::Object(networks) = networks {
                let entry = networks
                    .entry(network_id.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                // 保留 events / links 等既有欄位
                if let (Value::Object(entry), Value::Object(fields)) =
                    (entry, serde_json::to_value(record)?)
                {
                    entry.extend(fields);
                }
            }

            root.insert(
                "updatedAt".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        let content = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(&path, content).await?;

        tracing::debug!(
            "Recorded {} at {} for network {} in {}",
            contract_name,
            record.address,
            network_id,
            path.display()
        );
        Ok(())
    }
}

fn decode_bytecode(raw: &str) -> std::result::Result<Vec<u8>, String> {
    let hex = raw.trim().trim_start_matches("0x");
    if hex.is_empty() {
        return Err("bytecode is empty (abstract contract or not compiled)".to_string());
    }
    // 未連結的 library 以 __Name__ 佔位
    if hex.contains("__") {
        return Err("bytecode has unlinked library placeholders".to_string());
    }
    alloy::primitives::hex::decode(hex).map_err(|e| format!("invalid bytecode hex: {}", e))
}

fn optimizer_from_metadata(metadata: &str) -> Option<OptimizerSettings> {
    let metadata: Value = serde_json::from_str(metadata).ok()?;
    let optimizer = metadata.get("settings")?.get("optimizer")?;
    serde_json::from_value(optimizer.clone()).ok()
}
