use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest {} is neither a document list nor an object with `documents`", path.display())]
    Shape { path: PathBuf },

    #[error("table {} contains no usable rows", path.display())]
    EmptyTable { path: PathBuf },

    #[error("no manifest or table source is available")]
    NoSource,
}
