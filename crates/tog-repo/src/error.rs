use std::path::PathBuf;

use tog_hash::ObjectId;

/// Errors from repository discovery, ref resolution, and commit-graph
/// traversal.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not a got repository (or any parent up to the root): {0}")]
    NotFound(PathBuf),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{oid} is not a commit")]
    NotACommit { oid: ObjectId },

    #[error(transparent)]
    Odb(#[from] tog_odb::OdbError),

    #[error(transparent)]
    Object(#[from] tog_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] tog_hash::HashError),

    #[error("I/O error on {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
