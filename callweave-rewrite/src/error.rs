//! Error types for the rewriting engine.
//!
//! Every failure here is a construction-time failure: it surfaces while the
//! attribute expands, never while the rewritten function runs. Runtime
//! errors and panics inside wrapped calls propagate untouched.

use proc_macro2::Span;
use thiserror::Error;

/// Fatal conditions raised while rewriting a function.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The rewrite subject is not a single `fn` item.
    #[error("only fn items can be rewritten")]
    NotAFunction { span: Span },

    /// The subject is a `fn` item the engine refuses to rewrite.
    #[error("cannot rewrite {reason}")]
    UnsupportedTarget { reason: String, span: Span },

    /// Source text could not be parsed into a function definition.
    #[error("source for `{file}` is not parseable: {message}")]
    SourceUnavailable { file: String, message: String },

    /// A call's callee has a shape the name-matcher does not recognize.
    ///
    /// Fatal by design: silently mis-identifying a callee could route a
    /// side-effecting call past the filters.
    #[error("unsupported callee expression kind `{kind}`")]
    UnsupportedCallee { kind: &'static str, span: Span },

    /// The attribute named for removal is not on the function.
    #[error("attribute `{name}` not found on target function")]
    AttrNotFound { name: String, span: Span },

    /// Both a blacklist and a whitelist were supplied.
    #[error("blacklist and whitelist are mutually exclusive")]
    ConflictingFilters,
}

impl RewriteError {
    /// Best span to report the error at.
    pub fn span(&self) -> Span {
        match self {
            RewriteError::NotAFunction { span }
            | RewriteError::UnsupportedTarget { span, .. }
            | RewriteError::UnsupportedCallee { span, .. }
            | RewriteError::AttrNotFound { span, .. } => *span,
            RewriteError::SourceUnavailable { .. } | RewriteError::ConflictingFilters => {
                Span::call_site()
            }
        }
    }
}

impl From<RewriteError> for syn::Error {
    fn from(err: RewriteError) -> Self {
        syn::Error::new(err.span(), err.to_string())
    }
}
