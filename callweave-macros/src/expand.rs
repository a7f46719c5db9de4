//! Expansion for `#[wrap_calls]` and shared target handling.

use proc_macro2::{Span, TokenStream};
use quote::{quote, ToTokens};
use syn::{Ident, ItemFn};

use callweave_rewrite::{rewrite_wrap_calls, FunctionRewriter, RewriteOptions, RewriteSummary};

use crate::args::{FilterArgs, WrapCallsArgs};

pub fn expand_wrap_calls(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let args: WrapCallsArgs = syn::parse2(attr)?;
    let target = parse_target(item)?;
    let fn_name = target.sig.ident.to_string();

    let rewriter = FunctionRewriter::from_item(target)?;
    let mut options = RewriteOptions::new(args.wrapper);
    apply_filters(&mut options, &args.filters);
    let rewritten = rewrite_wrap_calls(rewriter, &options)?;

    let mut tokens = rewritten.item.to_token_stream();
    if let Some(ident) = &args.filters.rewrite_details {
        tokens.extend(details_static(ident, &fn_name, &rewritten.summary));
    }
    Ok(tokens)
}

pub fn apply_filters(options: &mut RewriteOptions, filters: &FilterArgs) {
    options.ignore_std = filters.ignore_std;
    options.blacklist = filters.blacklist.clone();
    options.whitelist = filters.whitelist.clone();
}

/// Parse the annotated item as a function.
///
/// Free functions parse directly; methods arrive as impl items and convert
/// to the same shape. Anything else cannot be rewritten because only `fn`
/// items have a definition to splice back.
pub fn parse_target(item: TokenStream) -> syn::Result<ItemFn> {
    if let Ok(fun) = syn::parse2::<ItemFn>(item.clone()) {
        return Ok(fun);
    }
    match syn::parse2::<syn::ImplItemFn>(item) {
        Ok(method) => Ok(ItemFn {
            attrs: method.attrs,
            vis: method.vis,
            sig: method.sig,
            block: Box::new(method.block),
        }),
        Err(_) => Err(syn::Error::new(
            Span::call_site(),
            "this attribute can only be applied to fn items",
        )),
    }
}

/// Emit the introspection static requested via `rewrite_details = IDENT`.
pub fn details_static(ident: &Ident, fn_name: &str, summary: &RewriteSummary) -> TokenStream {
    let original = &summary.original_source;
    let new = &summary.new_source;
    let wrapped = summary.wrapped_calls;
    quote! {
        #[allow(non_upper_case_globals)]
        static #ident: ::callweave::RewriteDetails = ::callweave::RewriteDetails {
            function: concat!(module_path!(), "::", #fn_name),
            original_source: #original,
            new_source: #new,
            wrapped_calls: #wrapped,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_a_free_function() {
        let out = expand_wrap_calls(
            quote!(wrapper = Passthrough),
            quote!(
                fn f(x: u32) -> u32 {
                    double(x)
                }
            ),
        )
        .unwrap()
        .to_string();
        assert!(out.contains("__call_wrap"));
        assert!(out.contains("CallWrap"));
        assert!(!out.contains("wrap_calls"));
    }

    #[test]
    fn expands_a_method() {
        let out = expand_wrap_calls(
            quote!(wrapper = Passthrough),
            quote!(
                pub fn get(&self) -> u32 {
                    self.fetch()
                }
            ),
        )
        .unwrap()
        .to_string();
        assert!(out.contains("self . fetch"));
        assert!(out.contains("__call_wrap"));
    }

    #[test]
    fn emits_details_static_when_asked() {
        let out = expand_wrap_calls(
            quote!(wrapper = Passthrough, rewrite_details = F_DETAILS),
            quote!(
                fn f() {
                    g();
                }
            ),
        )
        .unwrap()
        .to_string();
        assert!(out.contains("static F_DETAILS"));
        assert!(out.contains("RewriteDetails"));
    }

    #[test]
    fn rejects_non_fn_items() {
        let err = expand_wrap_calls(quote!(wrapper = W), quote!(struct S;)).unwrap_err();
        assert!(err.to_string().contains("fn items"));
    }

    #[test]
    fn rejects_async_fns() {
        let err = expand_wrap_calls(
            quote!(wrapper = W),
            quote!(
                async fn f() {}
            ),
        )
        .unwrap_err();
        assert!(err.to_string().contains("async"));
    }
}
