use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("pdf construction failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("i/o failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("merge input {path} is missing or unreadable: {source}")]
    MergeInput {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("merge inputs contain no pages")]
    NothingToMerge,
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
