use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwarmgateError {
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SwarmgateError>;
