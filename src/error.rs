use crate::archive::ArchiveError;
use crate::index::error::IndexError;
use crate::types::query::InputError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RaincheckError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Failed to create data directory '{0}'")]
    DataDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine data directory")]
    DataDirResolution(#[source] std::io::Error),
}
