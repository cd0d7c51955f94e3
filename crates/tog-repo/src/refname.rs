use std::fmt;

use bstr::{BStr, BString, ByteSlice};

use crate::error::RepoError;

/// A validated reference name, grounded on `git-check-ref-format(1)` rules.
///
/// Trimmed to the checks that matter for a read-only browser: the ones that
/// would make a name ambiguous or unparseable on disk. The teacher's
/// write-path checks (`.lock` suffix collision, directory/file conflict
/// detection) are dropped — nothing here ever creates a ref.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefName(BString);

const FORBIDDEN_CHARS: &[u8] = b" ~^:?*[\\";

const SPECIAL_REFS: &[&str] = &[
    "HEAD",
    "MERGE_HEAD",
    "CHERRY_PICK_HEAD",
    "REVERT_HEAD",
    "BISECT_HEAD",
    "ORIG_HEAD",
    "FETCH_HEAD",
    "REBASE_HEAD",
];

impl RefName {
    pub fn new(name: impl Into<BString>) -> Result<Self, RepoError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    pub(crate) fn new_unchecked(name: impl Into<BString>) -> Self {
        Self(name.into())
    }

    /// Short display name: `main` from `refs/heads/main`, `v1.0` from
    /// `refs/tags/v1.0`.
    pub fn short_name(&self) -> &BStr {
        let s = self.0.as_bstr();
        if let Some(rest) = s.strip_prefix(b"refs/heads/") {
            rest.as_bstr()
        } else if let Some(rest) = s.strip_prefix(b"refs/tags/") {
            rest.as_bstr()
        } else if let Some(rest) = s.strip_prefix(b"refs/remotes/") {
            rest.as_bstr()
        } else {
            s
        }
    }

    pub fn is_branch(&self) -> bool {
        self.0.starts_with(b"refs/heads/")
    }

    pub fn is_tag(&self) -> bool {
        self.0.starts_with(b"refs/tags/")
    }

    pub fn is_special(&self) -> bool {
        SPECIAL_REFS.contains(&self.as_str())
    }

    pub fn as_bstr(&self) -> &BStr {
        self.0.as_bstr()
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("<invalid-utf8>")
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn validate(name: &[u8]) -> Result<(), RepoError> {
    let name_str = || String::from_utf8_lossy(name).into_owned();

    if name.is_empty() {
        return Err(RepoError::InvalidRefName("ref name is empty".into()));
    }
    if name.contains(&0) {
        return Err(RepoError::InvalidRefName(format!(
            "'{}': contains NUL byte",
            name_str()
        )));
    }
    if name == b"@" {
        return Err(RepoError::InvalidRefName("'@' is not a valid ref name".into()));
    }
    for (i, &b) in name.iter().enumerate() {
        if b < 0x20 || b == 0x7f {
            return Err(RepoError::InvalidRefName(format!(
                "'{}': contains control character at position {i}",
                name_str()
            )));
        }
        if FORBIDDEN_CHARS.contains(&b) {
            return Err(RepoError::InvalidRefName(format!(
                "'{}': contains forbidden character '{}' at position {i}",
                name_str(),
                b as char
            )));
        }
    }
    if name.starts_with(b"/") || name.ends_with(b"/") {
        return Err(RepoError::InvalidRefName(format!(
            "'{}': cannot start or end with '/'",
            name_str()
        )));
    }
    if name.ends_with(b".") {
        return Err(RepoError::InvalidRefName(format!(
            "'{}': ends with '.'",
            name_str()
        )));
    }
    if name.find(b"..").is_some() {
        return Err(RepoError::InvalidRefName(format!(
            "'{}': contains '..'",
            name_str()
        )));
    }
    if name.find(b"//").is_some() {
        return Err(RepoError::InvalidRefName(format!(
            "'{}': contains '//'",
            name_str()
        )));
    }
    if name.find(b"@{").is_some() {
        return Err(RepoError::InvalidRefName(format!(
            "'{}': contains '@{{'",
            name_str()
        )));
    }
    for component in name.split_str(b"/") {
        if component.starts_with(b".") {
            return Err(RepoError::InvalidRefName(format!(
                "'{}': component starts with '.'",
                name_str()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        assert!(RefName::new("refs/heads/main").is_ok());
        assert!(RefName::new("refs/tags/v1.0").is_ok());
        assert!(RefName::new("HEAD").is_ok());
    }

    #[test]
    fn rejects_double_dot_and_double_slash() {
        assert!(RefName::new("refs/heads/a..b").is_err());
        assert!(RefName::new("refs/heads//b").is_err());
    }

    #[test]
    fn rejects_forbidden_chars() {
        assert!(RefName::new("refs/heads/a~b").is_err());
        assert!(RefName::new("refs/heads/a^b").is_err());
    }

    #[test]
    fn short_name_strips_known_prefixes() {
        let n = RefName::new("refs/heads/feature/x").unwrap();
        assert_eq!(n.short_name(), "feature/x");
        let t = RefName::new("refs/tags/v2").unwrap();
        assert_eq!(t.short_name(), "v2");
    }

    #[test]
    fn classification() {
        assert!(RefName::new("refs/heads/main").unwrap().is_branch());
        assert!(RefName::new("refs/tags/v1").unwrap().is_tag());
        assert!(RefName::new("HEAD").unwrap().is_special());
    }
}
