//! # callweave
//!
//! Rewrite a function's body so every call in it routes through a wrapper
//! of your choosing, at compile time:
//!
//! ```ignore
//! use callweave::{wrap_calls, TraceCalls};
//!
//! #[wrap_calls(wrapper = TraceCalls)]
//! fn process(batch: &[u32]) -> u32 {
//!     let cleaned = validate(batch);
//!     total(cleaned)
//! }
//! ```
//!
//! Both `validate(batch)` and `total(cleaned)` now run inside
//! [`CallWrap::wrap`], which receives a [`CallExtras`] describing the call
//! site (callee identity, source line range, source text) and a thunk that
//! performs the original call. Arguments are still evaluated in their
//! original order, before the wrapper runs.
//!
//! Built on top of the same rewrite, [`flat_profile`] times every call and
//! reports a per-callee breakdown when the function returns, through the
//! machinery in [`profile`].
//!
//! Call filtering (`ignore_std`, `blacklist(..)`, `whitelist(..)` with
//! `[*]` subscript wildcards) and rewrite introspection
//! (`rewrite_details = IDENT`, producing a [`RewriteDetails`]) are
//! documented on the attributes themselves.

mod extras;
pub mod profile;
mod wrap;

pub use extras::CallExtras;
pub use wrap::{CallWrap, Passthrough, TraceCalls};

#[cfg(feature = "macros")]
pub use callweave_macros::{flat_profile, wrap_calls};

/// What a rewrite did to a function, captured at compile time.
///
/// Emitted as a `static` next to the function when the attribute carries
/// `rewrite_details = IDENT`.
#[derive(Debug, Clone, Copy)]
pub struct RewriteDetails {
    /// Fully qualified name of the rewritten function.
    pub function: &'static str,
    /// The function source as written.
    pub original_source: &'static str,
    /// The function source after the rewrite.
    pub new_source: &'static str,
    /// Number of call sites routed through the wrapper.
    pub wrapped_calls: usize,
}

pub mod prelude {
    //! One-stop imports for the common case.
    pub use crate::{CallExtras, CallWrap, Passthrough, TraceCalls};

    #[cfg(feature = "macros")]
    pub use crate::{flat_profile, wrap_calls};
}
