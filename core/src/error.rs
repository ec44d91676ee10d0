use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("document length file {0} is empty, nothing to search")]
    EmptyCorpus(PathBuf),

    #[error("corrupt {artifact}: {reason}")]
    Corrupt { artifact: &'static str, reason: String },

    #[error("{what} value {value} does not fit a 32-bit signed field")]
    Overflow { what: &'static str, value: u64 },
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn corrupt(artifact: &'static str, reason: impl Into<String>) -> Self {
        Self::Corrupt { artifact, reason: reason.into() }
    }
}
