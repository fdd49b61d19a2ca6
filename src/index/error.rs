use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// No build has completed yet; lookups cannot be answered.
    #[error("Identifier index has not been built yet")]
    NotReady,

    #[error("Failed to read index backing file '{0}'")]
    SourceRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to read metadata for index backing file '{0}'")]
    SourceMetadata(PathBuf, #[source] std::io::Error),
}
