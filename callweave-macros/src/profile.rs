//! Expansion for `#[flat_profile]`.
//!
//! Builds a `FlatProfiler` wrapper expression from the attribute options,
//! runs the call rewrite with it, then restructures the body so the
//! profiler reports after the last statement:
//!
//! ```text
//! fn f() -> T {
//!     let __call_wrap = &(FlatProfiler::new(..));
//!     let __cw_out = (|| -> T { /* rewritten body */ })();
//!     ::callweave::profile::FlatProfiler::finish(__call_wrap);
//!     __cw_out
//! }
//! ```
//!
//! If the body panics instead, the profiler's drop reports with whatever
//! was recorded up to that point.

use proc_macro2::{Span, TokenStream, TokenTree};
use quote::{quote, ToTokens};
use syn::{parse_quote, Expr, Ident, ItemFn, ReturnType, Type};

use callweave_rewrite::{rewrite_wrap_calls, FunctionRewriter, RewriteOptions, WRAP_IDENT};

use crate::args::{CallbackArg, FlatProfileArgs};
use crate::expand::{apply_filters, details_static, parse_target};

pub fn expand_flat_profile(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let args: FlatProfileArgs = syn::parse2(attr)?;
    let target = parse_target(item)?;
    let fn_name = target.sig.ident.to_string();

    let wrapper = profiler_expr(&args, &fn_name);
    let rewriter = FunctionRewriter::from_item(target)?;
    let mut options = RewriteOptions::new(wrapper);
    apply_filters(&mut options, &args.filters);
    let mut rewritten = rewrite_wrap_calls(rewriter, &options)?;
    install_reporting(&mut rewritten.item);

    let mut tokens = rewritten.item.to_token_stream();
    if let Some(ident) = &args.filters.rewrite_details {
        tokens.extend(details_static(ident, &fn_name, &rewritten.summary));
    }
    Ok(tokens)
}

fn profiler_expr(args: &FlatProfileArgs, fn_name: &str) -> Expr {
    let limit = args.time_limit;
    let below = callback_tokens(&args.below, quote!(::callweave::profile::log_below));
    let above = callback_tokens(&args.above, quote!(::callweave::profile::log_above));
    parse_quote! {
        ::callweave::profile::FlatProfiler::new(::callweave::profile::ProfileConfig {
            limit: ::core::time::Duration::from_secs_f64(#limit),
            below_callback: #below,
            above_callback: #above,
            function: ::callweave::profile::FnDescriptor {
                name: concat!(module_path!(), "::", #fn_name),
            },
        })
    }
}

fn callback_tokens(slot: &CallbackArg, default: TokenStream) -> TokenStream {
    match slot {
        CallbackArg::Default => quote!(::core::option::Option::Some(#default)),
        CallbackArg::None => quote!(::core::option::Option::None),
        CallbackArg::Path(path) => quote!(::core::option::Option::Some(#path)),
    }
}

/// Move the rewritten body into an immediately-invoked closure and report
/// once it returns. Statement 0 is the wrapper binding and stays put.
fn install_reporting(fun: &mut ItemFn) {
    let body = fun.block.stmts.split_off(1);
    let closure: Expr = match closure_return(&fun.sig.output) {
        Some(ty) => parse_quote!(move || -> #ty { #(#body)* }),
        None => parse_quote!(move || { #(#body)* }),
    };
    let wrap_ident = Ident::new(WRAP_IDENT, Span::mixed_site());
    let tail: syn::Block = parse_quote! {{
        let __cw_out = (#closure)();
        ::callweave::profile::FlatProfiler::finish(#wrap_ident);
        __cw_out
    }};
    fun.block.stmts.extend(tail.stmts);
}

/// Return type annotation for the body closure. `impl Trait` cannot appear
/// in a closure's return position, so those bodies rely on inference.
fn closure_return(output: &ReturnType) -> Option<&Type> {
    match output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => {
            if contains_impl(ty.to_token_stream()) {
                None
            } else {
                Some(ty)
            }
        }
    }
}

fn contains_impl(tokens: TokenStream) -> bool {
    tokens.into_iter().any(|tree| match tree {
        TokenTree::Ident(ident) => ident == "impl",
        TokenTree::Group(group) => contains_impl(group.stream()),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_with_default_callbacks() {
        let out = expand_flat_profile(
            quote!(time_limit = 0.5),
            quote!(
                fn f(x: u32) -> u32 {
                    slow(x)
                }
            ),
        )
        .unwrap()
        .to_string();
        assert!(out.contains("FlatProfiler :: new"));
        assert!(out.contains("from_secs_f64"));
        assert!(out.contains("log_below"));
        assert!(out.contains("log_above"));
        assert!(out.contains("__cw_out"));
        assert!(out.contains("FlatProfiler :: finish"));
    }

    #[test]
    fn disabled_callback_becomes_none() {
        let out = expand_flat_profile(
            quote!(time_limit = 1, below_callback = none),
            quote!(
                fn f() {
                    g();
                }
            ),
        )
        .unwrap()
        .to_string();
        assert!(out.contains("below_callback : :: core :: option :: Option :: None"));
        assert!(out.contains("log_above"));
    }

    #[test]
    fn custom_callback_path_is_used() {
        let out = expand_flat_profile(
            quote!(time_limit = 1, above_callback = crate::report_slow),
            quote!(
                fn f() {
                    g();
                }
            ),
        )
        .unwrap()
        .to_string();
        assert!(out.contains("report_slow"));
    }

    #[test]
    fn annotates_closure_return_type() {
        let out = expand_flat_profile(
            quote!(time_limit = 1),
            quote!(
                fn f() -> u32 {
                    g()
                }
            ),
        )
        .unwrap()
        .to_string();
        assert!(out.contains("move || -> u32"));
    }

    #[test]
    fn impl_trait_returns_skip_the_annotation() {
        let out = expand_flat_profile(
            quote!(time_limit = 1),
            quote!(
                fn f() -> impl Iterator<Item = u32> {
                    build()
                }
            ),
        )
        .unwrap()
        .to_string();
        assert!(!out.contains("move || -> impl"));
    }
}
