use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors produced by a cleanup pass.
///
/// Only [`Error::DirectoryRead`] is ever returned to a caller. The per-entry
/// variants are rendered into warnings and counted in the pass report.
#[derive(Debug, Error)]
pub enum Error {
    #[error("can't read directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't retrieve last modification time for file {}: {source}", .path.display())]
    FileStat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("can't remove file {}: {source}", .path.display())]
    FileDelete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
