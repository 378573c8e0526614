use crate::core::resolver::NetworkTable;
use crate::core::{
    CompilerSettings, DeploymentSpec, ExistingDeployment, OverwritePolicy, DIARY_DESCRIPTION,
    DIARY_NAME, IMMORTAL_DIARY,
};
use crate::utils::error::{DeployError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 部署設定；所有區段都可省略，預設值與原本的 truffle 設定相同
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub deployment: DeploymentConfig,
    pub networks: NetworksConfig,
    pub provider: ProviderConfig,
    pub compiler: CompilerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub contract: String,
    pub name: String,
    pub description: String,
    pub build_dir: String,
    pub existing: ExistingDeployment,
    pub overwrite: Option<OverwritePolicy>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            contract: IMMORTAL_DIARY.to_string(),
            name: DIARY_NAME.to_string(),
            description: DIARY_DESCRIPTION.to_string(),
            build_dir: "build/contracts".to_string(),
            existing: ExistingDeployment::default(),
            overwrite: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworksConfig {
    pub development: LocalNetworkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalNetworkConfig {
    pub host: String,
    pub port: u16,
}

impl Default for LocalNetworkConfig {
    fn default() -> Self {
        let table = NetworkTable::default();
        Self {
            host: table.development_host,
            port: table.development_port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub host: String,
    pub account_index: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            host: NetworkTable::default().provider_host,
            account_index: 0,
        }
    }
}

impl DeployConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| DeployError::ConfigError {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DeployError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${INFURA_API_KEY})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DeployError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("deployment.contract", &self.deployment.contract)?;
        validation::validate_non_empty_string("deployment.name", &self.deployment.name)?;
        validation::validate_non_empty_string(
            "deployment.description",
            &self.deployment.description,
        )?;
        validation::validate_path("deployment.build_dir", &self.deployment.build_dir)?;

        validation::validate_host("networks.development.host", &self.networks.development.host)?;
        validation::validate_positive_number(
            "networks.development.port",
            u64::from(self.networks.development.port),
            1,
        )?;

        validation::validate_host("provider.host", &self.provider.host)?;

        if self.compiler.optimizer.enabled {
            validation::validate_positive_number(
                "compiler.optimizer.runs",
                self.compiler.optimizer.runs,
                1,
            )?;
        }

        Ok(())
    }

    pub fn network_table(&self) -> NetworkTable {
        NetworkTable {
            development_host: self.networks.development.host.clone(),
            development_port: self.networks.development.port,
            provider_host: self.provider.host.clone(),
        }
    }

    pub fn deployment_spec(&self) -> DeploymentSpec {
        DeploymentSpec::new(
            self.deployment.contract.clone(),
            vec![
                self.deployment.name.clone(),
                self.deployment.description.clone(),
            ],
        )
        .with_overwrite(self.deployment.overwrite)
    }
}

impl Validate for DeployConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
