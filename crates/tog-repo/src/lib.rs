//! Repository discovery, reference resolution, and commit-graph traversal
//! on top of `tog-odb`'s object store — the layer every `tog` view is
//! built against.

mod commit_graph;
mod discover;
mod error;
mod refname;
mod refs;
mod repository;

pub use commit_graph::{CommitGraph, RevWalk};
pub use discover::{discover, Discovered};
pub use error::RepoError;
pub use refname::RefName;
pub use refs::{RefStore, Reference};
pub use repository::Repository;
