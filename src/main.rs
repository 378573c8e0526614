use clap::Parser;
use immortal_diary_deploy::domain::ports::ContractDeployer;
use immortal_diary_deploy::utils::{logger, validation::Validate};
use immortal_diary_deploy::{
    CliConfig, DeployConfig, DeploymentOrchestrator, NetworkResolver, PlannedAction,
    Result, RpcDeployer, Secrets, TruffleArtifacts,
};

#[tokio::main]
async fn main() {
    // 載入 .env (MNEMONIC, INFURA_API_KEY)
    let dotenv = dotenvy::dotenv();

    let args = CliConfig::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    if let Err(e) = run(args).await {
        tracing::error!(
            "❌ Deployment failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        std::process::exit(e.severity().exit_code());
    }
}

async fn run(args: CliConfig) -> Result<()> {
    tracing::info!("Starting deployment to {}", args.network);

    // 載入設定，沒有指定檔案時使用預設值
    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            DeployConfig::from_file(path)?
        }
        None => DeployConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate()?;
    if args.verbose {
        tracing::debug!("Configuration: {:?}", config);
    }

    let resolver = NetworkResolver::new(config.network_table());
    let descriptor = resolver.resolve(&args.network, &Secrets::from_env())?;
    tracing::info!(
        "🌐 Network {} (chain id {}) via {}",
        descriptor.name(),
        descriptor.chain_id,
        descriptor.connection.redacted_endpoint()
    );

    let deployer = RpcDeployer::connect(&descriptor, config.provider.account_index)?;

    if args.list_accounts || (args.verbose && descriptor.network.is_local()) {
        let accounts = deployer.accounts().await?;
        println!("Accounts:");
        for (index, account) in accounts.iter().enumerate() {
            println!("  ({}) {}", index, account);
        }
    }

    let artifacts =
        TruffleArtifacts::new(&config.deployment.build_dir).with_compiler(config.compiler);
    let spec = config.deployment_spec();
    let orchestrator =
        DeploymentOrchestrator::new(deployer, artifacts).with_existing(config.deployment.existing);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no transaction will be sent");
        let plan = orchestrator.plan(&descriptor, &spec).await?;
        println!(
            "Network:   {} (chain id {}, network id {})",
            descriptor.name(),
            plan.chain_id,
            plan.network_id
        );
        println!("Contract:  {}", spec.contract_name());
        println!("Overwrite: {}", plan.policy);
        match &plan.action {
            PlannedAction::Deploy { bytecode_len } => {
                println!("Action:    deploy ({} bytes of bytecode)", bytecode_len)
            }
            PlannedAction::Reuse { address } => println!("Action:    reuse {}", address),
            PlannedAction::Refuse { address } => {
                println!("Action:    refuse, already deployed at {}", address)
            }
        }
        return plan.check(&descriptor, &spec);
    }

    let result = orchestrator.deploy(&descriptor, &spec).await?;

    if result.reused {
        println!("✅ {} already deployed", spec.contract_name());
    } else {
        println!("✅ {} deployed", spec.contract_name());
    }
    println!("📍 Address: {}", result.contract_address);
    if let Some(tx_hash) = &result.tx_hash {
        println!("🧾 Transaction: {}", tx_hash);
    }

    Ok(())
}
