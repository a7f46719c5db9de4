//! # callweave-rewrite
//!
//! The rewriting engine behind the `callweave` attribute macros.
//!
//! Given a function item, the engine rewrites every eligible call expression
//! in its body so the call routes through an injected wrapper binding:
//!
//! ```text
//! other_function(val)
//!   becomes
//! ::callweave::CallWrap::wrap(
//!     __call_wrap,
//!     &::callweave::CallExtras { name: "other_function", ln_range: (12, 12), source: "other_function(val)" },
//!     || other_function(val),
//! )
//! ```
//!
//! The pipeline mirrors its pieces one module each:
//!
//! - [`ident`] resolves a callee expression to a canonical identity string.
//! - [`filter`] decides eligibility (blacklist/whitelist, `[*]` wildcards,
//!   the std-prelude snapshot, always-excluded frame-sensitive calls).
//! - [`transform`] holds the tree transformers: [`transform::StripAttr`]
//!   (decorator removal) and [`transform::WrapCalls`] (the call rewrite).
//! - [`rewrite`] owns the tree between transformations and the line-number
//!   bookkeeping ([`rewrite::FunctionRewriter`], [`rewrite::LineMap`]).
//! - [`orchestrate`] wires a target, wrapper expression and options into one
//!   rewritten item.
//!
//! This crate contains no proc-macro code; `callweave-macros` is the thin
//! attribute layer on top, and the `callweave` facade crate provides the
//! runtime types (`CallWrap`, `CallExtras`) that rewritten code references.

pub mod error;
pub mod filter;
pub mod ident;
pub mod orchestrate;
pub mod rewrite;
pub mod transform;

pub use error::RewriteError;
pub use filter::CallFilter;
pub use orchestrate::{rewrite_wrap_calls, RewriteOptions, RewriteSummary, Rewritten};
pub use rewrite::{FunctionRewriter, LineMap};
pub use transform::{StripAttr, Transform, WrapCalls};

/// Name of the wrapper binding injected into rewritten functions.
///
/// The orchestrator pre-seeds the function's local scope with
/// `let __call_wrap = &(<wrapper>);` and every rewritten call site resolves
/// the wrapper through this name.
pub const WRAP_IDENT: &str = "__call_wrap";
