//! End-to-end rewrite pipeline.
//!
//! Strips the triggering attribute when asked, wraps the eligible calls,
//! injects the wrapper binding at the top of the body, and hands back the
//! rewritten item together with a before/after summary.

use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use std::collections::HashSet;
use syn::{parse_quote, Expr, Ident, ItemFn, Stmt};

use crate::error::RewriteError;
use crate::filter::CallFilter;
use crate::rewrite::FunctionRewriter;
use crate::transform::{StripAttr, WrapCalls};
use crate::WRAP_IDENT;

/// Options controlling one rewrite.
pub struct RewriteOptions {
    /// Expression producing the wrapper value. Evaluated once per function
    /// invocation, before any statement of the original body.
    pub wrapper: Expr,
    /// Attribute to strip from the target, if the source still carries it.
    pub decorator_name: Option<String>,
    /// Exclude standard-library callables (path prefixes plus the prelude
    /// snapshot).
    pub ignore_std: bool,
    /// Identities to exclude. Mutually exclusive with `whitelist`.
    pub blacklist: HashSet<String>,
    /// The only identities to include. Mutually exclusive with `blacklist`.
    pub whitelist: HashSet<String>,
}

impl RewriteOptions {
    pub fn new(wrapper: Expr) -> Self {
        Self {
            wrapper,
            decorator_name: None,
            ignore_std: false,
            blacklist: HashSet::new(),
            whitelist: HashSet::new(),
        }
    }
}

/// What the rewrite did, for introspection and logging.
#[derive(Debug, Clone)]
pub struct RewriteSummary {
    /// Name of the rewritten function.
    pub function: String,
    /// Source text as supplied.
    pub original_source: String,
    /// Rendered source of the rewritten function.
    pub new_source: String,
    /// Number of call sites routed through the wrapper.
    pub wrapped_calls: usize,
}

/// A rewritten function plus its summary.
#[derive(Debug)]
pub struct Rewritten {
    pub item: ItemFn,
    pub summary: RewriteSummary,
}

impl Rewritten {
    pub fn into_tokens(self) -> TokenStream {
        self.item.into_token_stream()
    }
}

/// Run the full pipeline over a prepared rewriter.
pub fn rewrite_wrap_calls(
    mut rewriter: FunctionRewriter,
    options: &RewriteOptions,
) -> Result<Rewritten, RewriteError> {
    let filter = CallFilter::new(
        options.blacklist.clone(),
        options.whitelist.clone(),
        options.ignore_std,
    )?;

    if let Some(name) = &options.decorator_name {
        let mut strip = StripAttr::new(name.clone());
        rewriter.transform(&mut strip)?;
    }

    let mut wrap = WrapCalls::new(&filter);
    rewriter.transform(&mut wrap)?;
    let wrapped_calls = wrap.wrapped_calls();

    // Seed the body with the wrapper bound under the name every rewritten
    // call site resolves. Bound by reference so thunk closures capturing it
    // stay `Copy` and the wrapper value lives for the whole invocation.
    let wrapper = &options.wrapper;
    let wrap_ident = Ident::new(WRAP_IDENT, Span::mixed_site());
    let binding: Stmt = parse_quote! {
        #[allow(unused_variables)]
        let #wrap_ident = &(#wrapper);
    };
    rewriter.target_fn_mut()?.block.stmts.insert(0, binding);

    // Validates the tree holds exactly one fn item before splicing.
    rewriter.compile()?;

    let function = rewriter.target_fn()?.sig.ident.to_string();
    let summary = RewriteSummary {
        function,
        original_source: rewriter.original_source().to_string(),
        new_source: rewriter.current_source(),
        wrapped_calls,
    };
    let item = rewriter.target_fn()?.clone();
    Ok(Rewritten { item, summary })
}
