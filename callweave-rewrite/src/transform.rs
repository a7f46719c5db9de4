//! Tree transformers.
//!
//! [`WrapCalls`] rewrites every eligible call expression in a function body
//! to route through the injected wrapper binding. [`StripAttr`] removes the
//! attribute that triggered the rewrite so the emitted item does not expand
//! itself again. Both plug into the function rewriter through the
//! [`Transform`] trait.

use proc_macro2::Span;
use quote::format_ident;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit_mut::{self, VisitMut};
use syn::{parse_quote_spanned, Attribute, Expr, Ident, ItemFn, Stmt, Token};

use crate::error::RewriteError;
use crate::filter::CallFilter;
use crate::ident::{call_identity, compact_tokens, method_identity};
use crate::rewrite::LineMap;
use crate::WRAP_IDENT;

/// A single pass over the target function's tree.
pub trait Transform {
    fn apply(&mut self, fun: &mut ItemFn, lines: &LineMap) -> Result<(), RewriteError>;

    /// Net source lines this pass removed above the function body.
    fn line_adjust(&self) -> i64 {
        0
    }
}

/// Removes one named attribute from the target function.
///
/// Failing to find the attribute is an error: it means the pipeline was
/// handed a function that did not ask for this rewrite.
pub struct StripAttr {
    name: String,
    removed: usize,
}

impl StripAttr {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            removed: 0,
        }
    }
}

impl Transform for StripAttr {
    fn apply(&mut self, fun: &mut ItemFn, _lines: &LineMap) -> Result<(), RewriteError> {
        let before = fun.attrs.len();
        fun.attrs.retain(|attr| !attr_matches(attr, &self.name));
        let removed = before - fun.attrs.len();
        if removed == 0 {
            return Err(RewriteError::AttrNotFound {
                name: self.name.clone(),
                span: fun.sig.ident.span(),
            });
        }
        self.removed += removed;
        Ok(())
    }

    fn line_adjust(&self) -> i64 {
        -(self.removed as i64)
    }
}

fn attr_matches(attr: &Attribute, name: &str) -> bool {
    attr.path()
        .segments
        .last()
        .is_some_and(|segment| segment.ident == name)
}

/// Rewrites eligible call expressions to route through the wrapper binding.
///
/// A call `f(a, b())` becomes
///
/// ```text
/// ({
///     let __cw_arg1 = b();
///     ::callweave::CallWrap::wrap(__call_wrap, &extras, || f(a, __cw_arg1))
/// })
/// ```
///
/// Compound arguments are bound to temporaries first so their evaluation
/// order and side effects are identical to the original call; only the
/// final invocation moves into the thunk. Calls with no compound arguments
/// skip the block.
///
/// Nested `fn` items are left untouched (they cannot see the wrapper
/// binding); closures are descended into. Calls inside macro invocations
/// are opaque tokens and stay as written.
pub struct WrapCalls<'f> {
    filter: &'f CallFilter,
    wrapped: usize,
}

impl<'f> WrapCalls<'f> {
    pub fn new(filter: &'f CallFilter) -> Self {
        Self { filter, wrapped: 0 }
    }

    /// Number of call sites rewritten so far.
    pub fn wrapped_calls(&self) -> usize {
        self.wrapped
    }
}

impl Transform for WrapCalls<'_> {
    fn apply(&mut self, fun: &mut ItemFn, lines: &LineMap) -> Result<(), RewriteError> {
        // Attributes stay out of the rewrite, including any stacked ones
        // that expand after this pass.
        let attrs = std::mem::take(&mut fun.attrs);
        let mut visitor = CallSiteVisitor {
            filter: self.filter,
            lines,
            error: None,
            wrapped: 0,
        };
        visitor.visit_block_mut(&mut fun.block);
        fun.attrs = attrs;
        if let Some(err) = visitor.error.take() {
            return Err(err);
        }
        self.wrapped += visitor.wrapped;
        Ok(())
    }
}

struct CallSiteVisitor<'a> {
    filter: &'a CallFilter,
    lines: &'a LineMap,
    error: Option<RewriteError>,
    wrapped: usize,
}

impl VisitMut for CallSiteVisitor<'_> {
    fn visit_item_mut(&mut self, _item: &mut syn::Item) {
        // Nested items have their own scope without the wrapper binding.
    }

    fn visit_attribute_mut(&mut self, _attr: &mut Attribute) {}

    fn visit_type_mut(&mut self, _ty: &mut syn::Type) {
        // Expressions in type position (array lengths, const generics) are
        // const contexts; a wrapper call cannot live there.
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if self.error.is_some() {
            return;
        }
        if matches!(expr, Expr::Const(_)) {
            return;
        }
        // Identity, source text and line range come from the node before
        // nested rewrites alter its argument tokens.
        let identity = match expr {
            Expr::Call(call) => call_identity(&call.func),
            Expr::MethodCall(call) => method_identity(call),
            _ => {
                visit_mut::visit_expr_mut(self, expr);
                return;
            }
        };
        let identity = match identity {
            Ok(identity) => identity,
            Err(err) => {
                self.error = Some(err);
                return;
            }
        };
        let source = compact_tokens(expr);
        let span = expr.span();
        let (line_lo, line_hi) = self.lines.resolve_tokens(expr);

        // Innermost calls first, so nested calls are themselves wrapped
        // before this one is lifted into a thunk.
        visit_mut::visit_expr_mut(self, expr);
        if self.error.is_some() {
            return;
        }
        if !self.filter.should_wrap(&identity) {
            return;
        }
        rewrite_call(expr, &identity, &source, (line_lo, line_hi), span);
        self.wrapped += 1;
    }
}

fn rewrite_call(expr: &mut Expr, identity: &str, source: &str, lines: (u32, u32), span: Span) {
    let original = std::mem::replace(expr, Expr::Verbatim(proc_macro2::TokenStream::new()));
    let (temps, rebuilt) = match original {
        Expr::Call(mut call) => {
            let args = std::mem::take(&mut call.args);
            let (temps, names) = bind_args(args, span);
            call.args = names;
            (temps, Expr::Call(call))
        }
        Expr::MethodCall(mut call) => {
            let args = std::mem::take(&mut call.args);
            let (temps, names) = bind_args(args, span);
            call.args = names;
            (temps, Expr::MethodCall(call))
        }
        other => {
            *expr = other;
            return;
        }
    };

    // Mixed-site hygiene: the binding and its call sites resolve together
    // within one expansion, and stacked expansions keep separate bindings.
    let wrap_ident = Ident::new(WRAP_IDENT, span.resolved_at(Span::mixed_site()));
    let (line_lo, line_hi) = lines;
    let wrapped: Expr = parse_quote_spanned! {span=>
        ::callweave::CallWrap::wrap(
            #wrap_ident,
            &::callweave::CallExtras {
                name: #identity,
                ln_range: (#line_lo, #line_hi),
                source: #source,
            },
            || #rebuilt,
        )
    };
    // Parenthesized so the replacement is valid in receiver and operand
    // positions where a bare block would change how the parser binds.
    *expr = if temps.is_empty() {
        wrapped
    } else {
        parse_quote_spanned! {span=>
            ({
                #(#temps)*
                #wrapped
            })
        }
    };
}

/// Bind compound arguments to locals so they are evaluated, in order,
/// before the wrapper runs, then call with the bound names inside the
/// thunk.
///
/// Bare paths and literals stay in the call: they have no effects to
/// sequence, and leaving a `&mut` parameter in place lets the closure
/// capture it by reborrow instead of moving it out of scope.
fn bind_args(
    args: Punctuated<Expr, Token![,]>,
    span: Span,
) -> (Vec<Stmt>, Punctuated<Expr, Token![,]>) {
    let mut temps = Vec::with_capacity(args.len());
    let mut names = Punctuated::new();
    for (index, arg) in args.into_iter().enumerate() {
        if matches!(arg, Expr::Path(_) | Expr::Lit(_)) {
            names.push(arg);
            continue;
        }
        let name = format_ident!("__cw_arg{}", index, span = span);
        temps.push(parse_quote_spanned! {span=> let #name = #arg; });
        names.push(parse_quote_spanned! {span=> #name });
    }
    (temps, names)
}
