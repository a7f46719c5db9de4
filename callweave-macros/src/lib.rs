//! Attribute macros for `callweave`.
//!
//! The heavy lifting lives in `callweave-rewrite`; this crate only parses
//! attribute arguments and converts engine errors into compile errors at
//! the attribute site.

use proc_macro::TokenStream;

mod args;
mod expand;
mod profile;

/// Rewrite every eligible call in the function body to route through a
/// wrapper value.
///
/// ```ignore
/// #[wrap_calls(wrapper = TraceCalls)]
/// fn process(batch: &[Item]) -> usize {
///     validate(batch);
///     store(batch)
/// }
/// ```
///
/// Options:
/// - `wrapper = <expr>` (required): evaluates to a value implementing
///   `CallWrap`; evaluated once per invocation before the original body.
/// - `ignore_std`: skip standard-library callables.
/// - `blacklist("name", ...)` / `whitelist("name", ...)`: exclude or
///   restrict by callee identity; `[*]` matches any one subscript segment.
/// - `rewrite_details = IDENT`: emit a `static IDENT: RewriteDetails` with
///   the before/after source of the rewrite.
///
/// Evaluation order: compound arguments of a wrapped call are evaluated in
/// their written order before the wrapper runs; a method call's receiver is
/// evaluated inside the wrapper's thunk, after them. A call whose receiver
/// and arguments both have side effects observes that inversion.
#[proc_macro_attribute]
pub fn wrap_calls(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand_wrap_calls(attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Profile every call in the function body and report the breakdown when
/// the function finishes.
///
/// ```ignore
/// #[flat_profile(time_limit = 0.5)]
/// fn handle(request: Request) -> Response {
///     let user = lookup(request.user_id);
///     render(user)
/// }
/// ```
///
/// `time_limit = <seconds>` is required. When total runtime stays below the
/// limit the below-callback fires, otherwise the above-callback; both
/// default to log writers and either (but not both) can be disabled with
/// `below_callback = none` / `above_callback = none`, or replaced with a
/// path to a `ProfilerCallback` function. Filter options are the same as
/// for [`macro@wrap_calls`].
#[proc_macro_attribute]
pub fn flat_profile(attr: TokenStream, item: TokenStream) -> TokenStream {
    profile::expand_flat_profile(attr.into(), item.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
