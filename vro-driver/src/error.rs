use thiserror::Error;
use vro_client::ClientError;

/// Everything `create`/`destroy` can fail with.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The execution request was rejected or never reached the service.
    #[error(transparent)]
    Submission(ClientError),

    /// Reading the execution token failed while waiting for it.
    #[error(transparent)]
    Query(ClientError),

    #[error(
        "Workflow did not complete in {seconds} seconds. Please check the vRO UI for more information."
    )]
    Timeout { seconds: u64 },

    #[error(
        "The workflow did not complete successfully (state: {state}). Check the vRO UI for more info."
    )]
    Unsuccessful { state: String },

    #[error("The workflow output did not contain a server_id and ip_address parameter.")]
    MissingOutputs,

    #[error("The server_id parameter was empty.")]
    EmptyServerId,

    #[error("The ip_address parameter was empty.")]
    EmptyIpAddress,

    #[error("workflow parameter '{name}' cannot be bound: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The server was created but never became reachable. `compensation`
    /// holds the error of the follow-up destroy, if that failed too.
    #[error("Server {server} not reachable")]
    Readiness {
        server: String,
        #[source]
        source: anyhow::Error,
        compensation: Option<Box<DriverError>>,
    },

    #[error("failed to build the {backend} workflow client")]
    ClientSetup {
        backend: String,
        #[source]
        source: ClientError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("state file error: {0}")]
    StateFile(#[from] std::io::Error),

    #[error("state file is not valid JSON: {0}")]
    StateFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;
