/// Errors surfaced by the interactive browser core.
///
/// Mirrors spec §7's tagged-error design (`Cancelled`/`Range` are
/// distinguished because callers treat them specially: `Cancelled` maps
/// to a clean exit, `Range` flags a malformed blame callback), collapsing
/// everything else into the lower layers' own error types via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum TuiError {
    /// A background worker observed its cancellation flag. Mapped to a
    /// successful join by the caller (§7: "converted to success at
    /// join").
    #[error("cancelled")]
    Cancelled,

    /// A blame callback reported a line number outside `lines[]`.
    #[error("line number {0} out of range")]
    Range(i64),

    /// `/` with no compiled pattern, or an invalid regular expression.
    #[error("invalid search pattern: {0}")]
    BadPattern(String),

    #[error("terminal width {0} is too narrow for a split layout")]
    TooNarrowForSplit(u16),

    #[error("no path filter is active")]
    NoPathFilter,

    #[error(transparent)]
    Repo(#[from] tog_repo::RepoError),

    #[error(transparent)]
    Diff(#[from] tog_diff::DiffError),

    #[error(transparent)]
    Odb(#[from] tog_odb::OdbError),

    #[error(transparent)]
    Object(#[from] tog_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
