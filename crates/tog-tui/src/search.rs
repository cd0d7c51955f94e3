//! Regex search state machine, grounded on DESIGN NOTES §9: "the
//! re-implementation may choose an explicit state machine
//! (`{Idle, HaveMore, NoMore, HaveNone}`) with a 'resume from
//! `search_entry`' pointer, matching the source behavior" — in place of
//! the teacher source's coroutine-over-the-queue approach, which Rust
//! has no direct equivalent for.

use regex::Regex;

use crate::error::TuiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

/// Where a search currently stands relative to the data it searches:
/// `Idle` before the first search or after a fresh pattern is compiled;
/// `HaveMore` mid-walk, there may be more candidates past `resume_from`;
/// `NoMore` the walk reached the end (or start) without a hit this pass;
/// `HaveNone` the whole collection was searched with zero matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    HaveMore,
    NoMore,
    HaveNone,
}

/// A compiled search plus its resume state. Shared by every view that
/// supports `/`/`n`/`N` — Log, Diff, Tree, Ref.
pub struct Search {
    pattern: Option<Regex>,
    direction: SearchDirection,
    state: SearchState,
    /// Index (into whatever sequence the owning view searches) to
    /// resume a forward/backward walk from.
    resume_from: usize,
}

impl Search {
    pub fn new() -> Self {
        Self {
            pattern: None,
            direction: SearchDirection::Forward,
            state: SearchState::Idle,
            resume_from: 0,
        }
    }

    /// Compile `pattern` as a POSIX-style extended regular expression
    /// (spec §4.6) and start a new search from `start` in `direction`.
    pub fn start(&mut self, pattern: &str, direction: SearchDirection, start: usize) -> Result<(), TuiError> {
        let re = Regex::new(pattern).map_err(|e| TuiError::BadPattern(e.to_string()))?;
        self.pattern = Some(re);
        self.direction = direction;
        self.state = SearchState::HaveMore;
        self.resume_from = start;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    pub fn direction(&self) -> SearchDirection {
        self.direction
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn matches(&self, haystack: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(haystack))
    }

    /// The compiled pattern, for callers whose match predicate needs to
    /// test several fields against the same regex (e.g. the Log view's
    /// author/committer/id/message search).
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Walk `len` candidates (indices `0..len`), calling `is_match(i)`
    /// for each, starting at `resume_from` and wrapping around exactly
    /// once. Returns the first matching index and advances
    /// `resume_from` past it for a subsequent `n`; if nothing matches,
    /// leaves `resume_from` where it started and reports `HaveNone`
    /// (first search) or `NoMore` (subsequent one, collection
    /// unchanged).
    pub fn advance(&mut self, len: usize, mut is_match: impl FnMut(usize) -> bool) -> Option<usize> {
        if len == 0 || self.pattern.is_none() {
            self.state = SearchState::HaveNone;
            return None;
        }

        let indices: Box<dyn Iterator<Item = usize>> = match self.direction {
            SearchDirection::Forward => Box::new((0..len).map(|i| (self.resume_from + 1 + i) % len)),
            SearchDirection::Backward => {
                Box::new((0..len).map(move |i| (self.resume_from + len - 1 - i) % len))
            }
        };

        for idx in indices {
            if is_match(idx) {
                self.resume_from = idx;
                self.state = SearchState::HaveMore;
                return Some(idx);
            }
        }

        self.state = if self.state == SearchState::Idle { SearchState::HaveNone } else { SearchState::NoMore };
        None
    }

    pub fn reset(&mut self) {
        self.pattern = None;
        self.state = SearchState::Idle;
        self.resume_from = 0;
    }
}

impl Default for Search {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_next_match_forward_and_advances_resume_point() {
        let haystacks = vec!["alpha", "beta", "gamma", "delta"];
        let mut search = Search::new();
        search.start("a$", SearchDirection::Forward, 0).unwrap();
        let found = search.advance(haystacks.len(), |i| search_matches(&haystacks, i));
        assert_eq!(found, Some(2));
        assert_eq!(search.state(), SearchState::HaveMore);
    }

    fn search_matches(haystacks: &[&str], i: usize) -> bool {
        haystacks[i].ends_with('a')
    }

    #[test]
    fn wraps_around_when_nothing_past_resume_point() {
        let haystacks = vec!["xa", "yb", "zc"];
        let mut search = Search::new();
        search.start("^x", SearchDirection::Forward, 2).unwrap();
        let found = search.advance(haystacks.len(), |i| haystacks[i].starts_with('x'));
        assert_eq!(found, Some(0));
    }

    #[test]
    fn no_match_reports_have_none_on_first_search() {
        let haystacks = vec!["a", "b", "c"];
        let mut search = Search::new();
        search.start("zzz", SearchDirection::Forward, 0).unwrap();
        let found = search.advance(haystacks.len(), |i| haystacks[i] == "zzz");
        assert_eq!(found, None);
        assert_eq!(search.state(), SearchState::HaveNone);
    }

    #[test]
    fn backward_search_walks_in_reverse() {
        let haystacks = vec!["a", "b", "c", "d"];
        let mut search = Search::new();
        search.start("b", SearchDirection::Backward, 3).unwrap();
        let found = search.advance(haystacks.len(), |i| haystacks[i] == "b");
        assert_eq!(found, Some(1));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let mut search = Search::new();
        assert!(search.start("(unclosed", SearchDirection::Forward, 0).is_err());
    }
}
