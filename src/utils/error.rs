use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Unknown network: {name}")]
    UnknownNetwork { name: String },

    #[error("Missing credential {variable} for network {network}")]
    MissingCredential { network: String, variable: String },

    #[error("Invalid credential for network {network}: {reason}")]
    InvalidCredential { network: String, reason: String },

    #[error("Chain id mismatch on {network}: expected {expected}, node reports {actual}")]
    ChainMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },

    #[error("{contract} is already deployed on {network} at {address}")]
    AlreadyDeployed {
        contract: String,
        network: String,
        address: String,
    },

    #[error("Deployment of {contract} on {network} failed: {message}")]
    DeploymentFailed {
        contract: String,
        network: String,
        message: String,
    },

    #[error(
        "{contract} was deployed on {network} at {address} (tx {tx_hash}) but the record could not be saved: {message}"
    )]
    RecordFailed {
        contract: String,
        network: String,
        address: String,
        tx_hash: String,
        message: String,
    },

    #[error("RPC request failed: {message}")]
    RpcError { message: String },

    #[error("Artifact error ({path}): {message}")]
    ArtifactError { path: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Credentials,
    Network,
    Artifact,
    Deployment,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 對應 CLI 的退出碼
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl DeployError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DeployError::UnknownNetwork { .. }
            | DeployError::ConfigError { .. }
            | DeployError::ConfigValidationError { .. }
            | DeployError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DeployError::MissingCredential { .. } | DeployError::InvalidCredential { .. } => {
                ErrorCategory::Credentials
            }
            DeployError::ChainMismatch { .. } | DeployError::RpcError { .. } => {
                ErrorCategory::Network
            }
            DeployError::ArtifactError { .. } | DeployError::SerializationError(_) => {
                ErrorCategory::Artifact
            }
            DeployError::AlreadyDeployed { .. }
            | DeployError::DeploymentFailed { .. }
            | DeployError::RecordFailed { .. } => ErrorCategory::Deployment,
            DeployError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Deployment => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Credentials | ErrorCategory::Artifact => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            DeployError::UnknownNetwork { .. } => {
                "Use one of: mainnet, ropsten, rinkeby, kovan, development".to_string()
            }
            DeployError::MissingCredential { variable, .. } => {
                format!("Set {} in the environment or in a .env file", variable)
            }
            DeployError::InvalidCredential { .. } => {
                "Check that MNEMONIC is a valid BIP-39 phrase".to_string()
            }
            DeployError::ChainMismatch { .. } => {
                "Make sure the RPC endpoint belongs to the selected network".to_string()
            }
            DeployError::AlreadyDeployed { .. } => {
                "Pass --on-existing reuse or --overwrite always to redeploy".to_string()
            }
            DeployError::DeploymentFailed { .. } => {
                "Check the deployer balance and the node logs, then run again".to_string()
            }
            DeployError::RecordFailed {
                address, network, ..
            } => format!(
                "Record {} for {} in the artifact's networks map before running again",
                address, network
            ),
            DeployError::RpcError { .. } => {
                "Check that the node is running and reachable".to_string()
            }
            DeployError::ArtifactError { .. } | DeployError::SerializationError(_) => {
                "Compile the contracts so the build directory holds a valid artifact".to_string()
            }
            DeployError::ConfigError { .. }
            | DeployError::ConfigValidationError { .. }
            | DeployError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command line options".to_string()
            }
            DeployError::IoError(_) => "Check file permissions and disk space".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Credentials => format!("Credential problem: {}", self),
            ErrorCategory::Network => format!("Could not talk to the chain: {}", self),
            ErrorCategory::Artifact => format!("Contract artifact problem: {}", self),
            ErrorCategory::Deployment => format!("Deployment did not complete: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
