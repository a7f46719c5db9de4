//! Call eligibility filters.
//!
//! A [`CallFilter`] decides, per callee identity, whether a call site gets
//! rewritten. Three layers apply in order:
//!
//! 1. frame-sensitive calls are always excluded (wrapping them would change
//!    what they observe),
//! 2. the optional std snapshot excludes standard-library callables,
//! 3. the user's blacklist or whitelist, with `[*]` wildcard support.
//!
//! Blacklist and whitelist are mutually exclusive; supplying both is a
//! construction error. Filtering never inspects call arguments, only the
//! identity string.

use std::collections::HashSet;

use crate::error::RewriteError;

/// Calls whose behavior depends on the exact frame they run in. Wrapping
/// them moves the observation point into the wrapper closure, so they are
/// excluded regardless of filter configuration.
const FRAME_SENSITIVE_CALLS: &[&str] = &[
    "Location::caller",
    "std::panic::Location::caller",
    "core::panic::Location::caller",
    "Backtrace::capture",
    "std::backtrace::Backtrace::capture",
    "Backtrace::force_capture",
    "std::backtrace::Backtrace::force_capture",
];

/// Path prefixes that identify standard-library callables when written with
/// an explicit crate root.
const STD_PATH_PREFIXES: &[&str] = &["std::", "core::", "alloc::"];

/// Callables reachable without a `use` because the prelude exports them.
///
/// A static snapshot, compiled in. Matching is textual: a user item that
/// happens to share one of these names is excluded too, same as shadowing.
const STD_PRELUDE_CALLABLES: &[&str] = &[
    "Some",
    "Ok",
    "Err",
    "Option::Some",
    "Result::Ok",
    "Result::Err",
    "drop",
    "Box::new",
    "Rc::new",
    "Arc::new",
    "Vec::new",
    "Vec::with_capacity",
    "Vec::from",
    "String::new",
    "String::from",
    "Default::default",
    "From::from",
    "Into::into",
    "TryFrom::try_from",
    "Clone::clone",
    "ToString::to_string",
];

/// Method names the prelude traits provide on arbitrary receivers. A method
/// call whose final segment matches is treated as standard-library.
const STD_PRELUDE_METHODS: &[&str] = &[
    "clone",
    "to_string",
    "to_owned",
    "into",
    "try_into",
    "as_ref",
    "as_mut",
    "default",
    "iter",
    "iter_mut",
    "into_iter",
    "next",
    "collect",
    "len",
    "is_empty",
    "unwrap",
    "unwrap_or",
    "unwrap_or_else",
    "expect",
];

#[derive(Debug, Clone)]
enum FilterMode {
    /// No user filter: every call is eligible.
    Open,
    /// Named calls are excluded, everything else is eligible.
    Blacklist(HashSet<String>),
    /// Only named calls are eligible.
    Whitelist(HashSet<String>),
}

/// Decides which call identities get rewritten.
#[derive(Debug, Clone)]
pub struct CallFilter {
    mode: FilterMode,
    ignore_std: bool,
}

impl CallFilter {
    /// Build a filter from user options.
    ///
    /// Exactly one of `blacklist` / `whitelist` may be non-empty.
    pub fn new(
        blacklist: HashSet<String>,
        whitelist: HashSet<String>,
        ignore_std: bool,
    ) -> Result<Self, RewriteError> {
        let mode = match (blacklist.is_empty(), whitelist.is_empty()) {
            (false, false) => return Err(RewriteError::ConflictingFilters),
            (false, true) => FilterMode::Blacklist(blacklist),
            (true, false) => FilterMode::Whitelist(whitelist),
            (true, true) => FilterMode::Open,
        };
        Ok(Self { mode, ignore_std })
    }

    /// A filter that wraps everything except frame-sensitive calls.
    pub fn open() -> Self {
        Self {
            mode: FilterMode::Open,
            ignore_std: false,
        }
    }

    /// Whether a call with this identity should be rewritten.
    pub fn should_wrap(&self, identity: &str) -> bool {
        if FRAME_SENSITIVE_CALLS.contains(&identity) {
            return false;
        }
        if self.ignore_std && is_std_callable(identity) {
            return false;
        }
        match &self.mode {
            FilterMode::Open => true,
            FilterMode::Blacklist(set) => !matches_with_wildcards(set, identity),
            FilterMode::Whitelist(set) => matches_with_wildcards(set, identity),
        }
    }
}

fn is_std_callable(identity: &str) -> bool {
    if STD_PATH_PREFIXES
        .iter()
        .any(|prefix| identity.starts_with(prefix))
    {
        return true;
    }
    if STD_PRELUDE_CALLABLES.contains(&identity) {
        return true;
    }
    if let Some((_, method)) = identity.rsplit_once('.') {
        return STD_PRELUDE_METHODS.contains(&method);
    }
    false
}

/// Match an identity against a pattern set, trying `[*]` wildcard variants.
///
/// The exact identity is checked first. Then every combination of bracketed
/// segments is replaced with `[*]`, from single replacements up to all of
/// them, and each candidate is checked. First hit wins. Cost grows with
/// 2^(bracket count); identities with many subscripts are rare enough that
/// the exhaustive enumeration is acceptable.
pub fn matches_with_wildcards(patterns: &HashSet<String>, identity: &str) -> bool {
    if patterns.contains(identity) {
        return true;
    }
    let spans = bracket_spans(identity);
    if spans.is_empty() {
        return false;
    }
    for count in 1..=spans.len() {
        let mut chosen: Vec<usize> = (0..count).collect();
        loop {
            let candidate = replace_segments(identity, &spans, &chosen);
            if patterns.contains(&candidate) {
                return true;
            }
            if !next_combination(&mut chosen, spans.len()) {
                break;
            }
        }
    }
    false
}

/// Byte ranges of the contents of each top-level `[...]` segment.
fn bracket_spans(identity: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, byte) in identity.bytes().enumerate() {
        match byte {
            b'[' => {
                if depth == 0 {
                    start = i + 1;
                }
                depth += 1;
            }
            b']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i));
                }
            }
            _ => {}
        }
    }
    spans
}

fn replace_segments(identity: &str, spans: &[(usize, usize)], chosen: &[usize]) -> String {
    let mut out = String::with_capacity(identity.len());
    let mut cursor = 0usize;
    for (index, &(start, end)) in spans.iter().enumerate() {
        if chosen.contains(&index) {
            out.push_str(&identity[cursor..start]);
            out.push('*');
            cursor = end;
        }
    }
    out.push_str(&identity[cursor..]);
    out
}

/// Advance to the next k-combination of `0..n` in lexicographic order.
fn next_combination(combo: &mut [usize], n: usize) -> bool {
    let k = combo.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if combo[i] != i + n - k {
            combo[i] += 1;
            for j in i + 1..k {
                combo[j] = combo[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn open_filter_wraps_everything_but_frame_sensitive() {
        let filter = CallFilter::open();
        assert!(filter.should_wrap("other_function"));
        assert!(filter.should_wrap("a.b.c.c_1"));
        assert!(!filter.should_wrap("std::panic::Location::caller"));
        assert!(!filter.should_wrap("Backtrace::capture"));
    }

    #[test]
    fn blacklist_excludes_named_calls() {
        let filter = CallFilter::new(set(&["A", "a.b.c.c_2"]), HashSet::new(), false).unwrap();
        assert!(!filter.should_wrap("A"));
        assert!(!filter.should_wrap("a.b.c.c_2"));
        assert!(filter.should_wrap("a.b.c.c_1"));
        assert!(filter.should_wrap("B"));
    }

    #[test]
    fn whitelist_includes_only_named_calls() {
        let filter = CallFilter::new(HashSet::new(), set(&["target"]), false).unwrap();
        assert!(filter.should_wrap("target"));
        assert!(!filter.should_wrap("other"));
    }

    #[test]
    fn both_lists_is_an_error() {
        let err = CallFilter::new(set(&["a"]), set(&["b"]), false).unwrap_err();
        assert!(matches!(err, RewriteError::ConflictingFilters));
    }

    #[test]
    fn wildcard_matches_any_one_segment() {
        let patterns = set(&["a.b[0].c[*].c_2"]);
        assert!(matches_with_wildcards(&patterns, "a.b[0].c[c].c_2"));
        assert!(matches_with_wildcards(&patterns, "a.b[0].c[9].c_2"));
        assert!(!matches_with_wildcards(&patterns, "a.b[1].c[c].c_2"));
        assert!(!matches_with_wildcards(&patterns, "a.b[0].c[c].c_1"));
    }

    #[test]
    fn wildcard_combinations_cover_multiple_segments() {
        let patterns = set(&["a[*].b[*].f"]);
        assert!(matches_with_wildcards(&patterns, "a[x].b[y].f"));
        let partial = set(&["a[0].b[*].f"]);
        assert!(matches_with_wildcards(&partial, "a[0].b[anything].f"));
        assert!(!matches_with_wildcards(&partial, "a[1].b[anything].f"));
    }

    #[test]
    fn exact_match_wins_without_brackets() {
        let patterns = set(&["plain"]);
        assert!(matches_with_wildcards(&patterns, "plain"));
        assert!(!matches_with_wildcards(&patterns, "plainer"));
    }

    #[test]
    fn std_snapshot_excludes_prefixes_and_prelude() {
        let filter = CallFilter::new(HashSet::new(), HashSet::new(), true).unwrap();
        assert!(!filter.should_wrap("std::mem::take"));
        assert!(!filter.should_wrap("core::mem::size_of"));
        assert!(!filter.should_wrap("Some"));
        assert!(!filter.should_wrap("Vec::new"));
        assert!(!filter.should_wrap("values.iter"));
        assert!(!filter.should_wrap("name.to_string"));
        assert!(filter.should_wrap("my_helper"));
        assert!(filter.should_wrap("client.fetch"));
    }
}
