use crate::config::toml_config::DeployConfig;
use crate::core::{ExistingDeployment, OverwritePolicy};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "deploy")]
#[command(about = "Deploy the ImmortalDiary contract to an Ethereum network")]
pub struct CliConfig {
    /// mainnet, ropsten, rinkeby, kovan or development
    #[arg(long)]
    pub network: String,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the compiled contract artifacts
    #[arg(long)]
    pub build_dir: Option<String>,

    /// Override the overwrite policy derived from the network
    #[arg(long, value_enum)]
    pub overwrite: Option<OverwritePolicy>,

    /// What skip-if-exists does when the contract is already live
    #[arg(long, value_enum)]
    pub on_existing: Option<ExistingDeployment>,

    /// HD wallet account index used on remote networks
    #[arg(long)]
    pub account_index: Option<u32>,

    /// Print the available accounts before deploying
    #[arg(long)]
    pub list_accounts: bool,

    /// Resolve and check everything, but send no transaction
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    /// 命令列參數覆蓋設定檔
    pub fn apply_overrides(&self, config: &mut DeployConfig) {
        if let Some(build_dir) = &self.build_dir {
            config.deployment.build_dir = build_dir.clone();
            tracing::info!("🔧 Build directory overridden to: {}", build_dir);
        }
        if let Some(overwrite) = self.overwrite {
            config.deployment.overwrite = Some(overwrite);
            tracing::info!("🔧 Overwrite policy overridden to: {}", overwrite);
        }
        if let Some(on_existing) = self.on_existing {
            config.deployment.existing = on_existing;
            tracing::info!("🔧 Existing deployment handling overridden to: {:?}", on_existing);
        }
        if let Some(account_index) = self.account_index {
            config.provider.account_index = account_index;
        }
    }
}
