/// Errors from diff computation.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("context size {0} exceeds max_context {1}")]
    ContextTooLarge(u32, u32),
}
