//! Attribute argument parsing.

use std::collections::HashSet;

use proc_macro2::Span;
use syn::parse::{Parse, ParseStream};
use syn::{parenthesized, Expr, Ident, Lit, LitBool, LitStr, Token};

/// Options shared by both attributes.
#[derive(Debug, Default)]
pub struct FilterArgs {
    pub ignore_std: bool,
    pub blacklist: HashSet<String>,
    pub whitelist: HashSet<String>,
    /// Emit a `static` of this name holding the before/after sources.
    pub rewrite_details: Option<Ident>,
}

impl FilterArgs {
    fn check(&self) -> syn::Result<()> {
        if !self.blacklist.is_empty() && !self.whitelist.is_empty() {
            return Err(syn::Error::new(
                Span::call_site(),
                "blacklist and whitelist are mutually exclusive",
            ));
        }
        Ok(())
    }
}

/// `#[wrap_calls(wrapper = <expr>, ...)]`
#[derive(Debug)]
pub struct WrapCallsArgs {
    pub wrapper: Expr,
    pub filters: FilterArgs,
}

impl Parse for WrapCallsArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut wrapper = None;
        let mut filters = FilterArgs::default();
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            match key.to_string().as_str() {
                "wrapper" => {
                    input.parse::<Token![=]>()?;
                    wrapper = Some(input.parse()?);
                }
                _ => parse_filter_option(input, &key, &mut filters)?,
            }
            eat_comma(input)?;
        }
        let wrapper = wrapper.ok_or_else(|| {
            syn::Error::new(Span::call_site(), "wrap_calls requires `wrapper = <expr>`")
        })?;
        filters.check()?;
        Ok(Self { wrapper, filters })
    }
}

/// A profiler callback slot: the built-in default, explicitly disabled, or a
/// user function path.
#[derive(Debug)]
pub enum CallbackArg {
    Default,
    None,
    Path(syn::Path),
}

/// `#[flat_profile(time_limit = <seconds>, ...)]`
#[derive(Debug)]
pub struct FlatProfileArgs {
    pub time_limit: f64,
    pub below: CallbackArg,
    pub above: CallbackArg,
    pub filters: FilterArgs,
}

impl Parse for FlatProfileArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut time_limit = None;
        let mut below = CallbackArg::Default;
        let mut above = CallbackArg::Default;
        let mut filters = FilterArgs::default();
        while !input.is_empty() {
            let key: Ident = input.parse()?;
            match key.to_string().as_str() {
                "time_limit" => {
                    input.parse::<Token![=]>()?;
                    time_limit = Some(parse_seconds(input)?);
                }
                "below_callback" => {
                    input.parse::<Token![=]>()?;
                    below = parse_callback(input)?;
                }
                "above_callback" => {
                    input.parse::<Token![=]>()?;
                    above = parse_callback(input)?;
                }
                _ => parse_filter_option(input, &key, &mut filters)?,
            }
            eat_comma(input)?;
        }
        let time_limit = time_limit.ok_or_else(|| {
            syn::Error::new(
                Span::call_site(),
                "flat_profile requires `time_limit = <seconds>`",
            )
        })?;
        if matches!(below, CallbackArg::None) && matches!(above, CallbackArg::None) {
            return Err(syn::Error::new(
                Span::call_site(),
                "at least one of below_callback / above_callback must remain set",
            ));
        }
        filters.check()?;
        Ok(Self {
            time_limit,
            below,
            above,
            filters,
        })
    }
}

fn parse_filter_option(
    input: ParseStream,
    key: &Ident,
    filters: &mut FilterArgs,
) -> syn::Result<()> {
    match key.to_string().as_str() {
        "ignore_std" => filters.ignore_std = parse_flag(input)?,
        "blacklist" => filters.blacklist = parse_name_set(input)?,
        "whitelist" => filters.whitelist = parse_name_set(input)?,
        "rewrite_details" => {
            input.parse::<Token![=]>()?;
            filters.rewrite_details = Some(input.parse()?);
        }
        other => {
            return Err(syn::Error::new(
                key.span(),
                format!("unknown option `{other}`"),
            ))
        }
    }
    Ok(())
}

/// A bare flag means `true`; `= <bool>` is also accepted.
fn parse_flag(input: ParseStream) -> syn::Result<bool> {
    if input.peek(Token![=]) {
        input.parse::<Token![=]>()?;
        let value: LitBool = input.parse()?;
        Ok(value.value)
    } else {
        Ok(true)
    }
}

/// `blacklist("a", "b.c[0].d")` or `blacklist = ("a")`.
fn parse_name_set(input: ParseStream) -> syn::Result<HashSet<String>> {
    if input.peek(Token![=]) {
        input.parse::<Token![=]>()?;
    }
    let content;
    parenthesized!(content in input);
    let names = content.parse_terminated(|p| p.parse::<LitStr>(), Token![,])?;
    Ok(names.into_iter().map(|lit| lit.value()).collect())
}

fn parse_seconds(input: ParseStream) -> syn::Result<f64> {
    let lit: Lit = input.parse()?;
    match &lit {
        Lit::Float(f) => f.base10_parse(),
        Lit::Int(i) => i.base10_parse(),
        _ => Err(syn::Error::new(
            lit.span(),
            "time_limit must be a number of seconds",
        )),
    }
}

fn parse_callback(input: ParseStream) -> syn::Result<CallbackArg> {
    let path: syn::Path = input.parse()?;
    if path.is_ident("none") {
        Ok(CallbackArg::None)
    } else {
        Ok(CallbackArg::Path(path))
    }
}

fn eat_comma(input: ParseStream) -> syn::Result<()> {
    if !input.is_empty() {
        input.parse::<Token![,]>()?;
    }
    Ok(())
}
