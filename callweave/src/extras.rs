//! Per-call-site provenance.

use std::fmt;

/// Where a wrapped call came from.
///
/// Built at compile time for each rewritten call site and passed by
/// reference to the wrapper on every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallExtras {
    /// Canonical callee identity, e.g. `parse_row` or `self.client.fetch`.
    pub name: &'static str,
    /// First and last line of the call expression in the original file.
    pub ln_range: (u32, u32),
    /// The call expression as written, compactly rendered.
    pub source: &'static str,
}

impl CallExtras {
    /// Whether the call sat on a single source line.
    pub fn single_line(&self) -> bool {
        self.ln_range.0 == self.ln_range.1
    }
}

impl fmt::Display for CallExtras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lo, hi) = self.ln_range;
        if lo == hi {
            write!(f, "{} (line {lo})", self.source)
        } else {
            write!(f, "{} (lines {lo}-{hi})", self.source)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_collapses_single_line_ranges() {
        let extras = CallExtras {
            name: "range",
            ln_range: (23, 23),
            source: "range(count)",
        };
        assert_eq!(extras.to_string(), "range(count) (line 23)");
        assert!(extras.single_line());

        let extras = CallExtras {
            name: "int",
            ln_range: (24, 26),
            source: "int(v)",
        };
        assert_eq!(extras.to_string(), "int(v) (lines 24-26)");
        assert!(!extras.single_line());
    }
}
