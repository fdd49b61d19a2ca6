use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Failed to spawn collaborator process '{0}'")]
    Spawn(PathBuf, #[source] std::io::Error),

    #[error("Collaborator produced no parseable JSON output")]
    UnparseableOutput,

    #[error("Collaborator output is missing a finite numeric '{0}' field")]
    NonNumericValue(&'static str),
}
