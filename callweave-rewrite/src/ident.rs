//! Callee identity resolution.
//!
//! Every call expression has a textual identity used for filter matching and
//! for the provenance record attached to rewritten call sites. Identity is
//! derived recursively from the callee expression:
//!
//! - paths render as written: `foo`, `module::foo`
//! - field access and method calls join with `.`: `a.b.c_1`
//! - index access renders as `base[key]`, with literal string keys unquoted
//!   so filter patterns never need to escape quoting: `a["c"]` -> `a[c]`
//! - a call used as a callee resolves to the identity of its own callee
//! - parentheses, `?` and references are transparent
//!
//! Shapes outside this set are a fatal error: an unanticipated callee shape
//! means the rewrite could mis-route a call, and that is never recoverable.

use proc_macro2::{Delimiter, TokenStream, TokenTree};
use quote::ToTokens;
use syn::spanned::Spanned;
use syn::{Expr, ExprMethodCall, Lit, Member};

use crate::error::RewriteError;

/// Resolve the canonical identity of a callee expression.
pub fn call_identity(callee: &Expr) -> Result<String, RewriteError> {
    match callee {
        Expr::Path(path) => Ok(path_identity(path)),
        Expr::Field(field) => Ok(format!(
            "{}.{}",
            call_identity(&field.base)?,
            member_text(&field.member)
        )),
        Expr::Index(index) => Ok(format!(
            "{}[{}]",
            call_identity(&index.expr)?,
            index_key(&index.index)
        )),
        Expr::MethodCall(call) => method_identity(call),
        // A call used as a callee: `factory()(x)` identifies as `factory`.
        Expr::Call(call) => call_identity(&call.func),
        Expr::Lit(lit) => Ok(lit_text(&lit.lit)),
        // Transparent wrappers around a name-like chain.
        Expr::Paren(paren) => call_identity(&paren.expr),
        Expr::Group(group) => call_identity(&group.expr),
        Expr::Try(try_expr) => call_identity(&try_expr.expr),
        Expr::Reference(reference) => call_identity(&reference.expr),
        Expr::Unary(unary) => call_identity(&unary.expr),
        Expr::Cast(cast) => call_identity(&cast.expr),
        // Not name-like, but still a stable receiver text: `(0..n).map(..)`,
        // `vec![].iter()`. Rendered compactly so identity stays deterministic.
        Expr::Range(_) | Expr::Macro(_) | Expr::Array(_) | Expr::Tuple(_) => {
            Ok(compact_tokens(callee))
        }
        other => Err(RewriteError::UnsupportedCallee {
            kind: expr_kind(other),
            span: other.span(),
        }),
    }
}

/// Identity of a method call: receiver identity joined with the method name.
pub fn method_identity(call: &ExprMethodCall) -> Result<String, RewriteError> {
    Ok(format!(
        "{}.{}",
        call_identity(&call.receiver)?,
        call.method
    ))
}

fn path_identity(path: &syn::ExprPath) -> String {
    if path.qself.is_some() {
        // `<T as Trait>::f` has no simple dotted spelling; use the raw text.
        return compact_tokens(path);
    }
    path.path
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

fn member_text(member: &Member) -> String {
    match member {
        Member::Named(ident) => ident.to_string(),
        Member::Unnamed(index) => index.index.to_string(),
    }
}

fn index_key(index: &Expr) -> String {
    match index {
        Expr::Lit(lit) => lit_text(&lit.lit),
        other => compact_tokens(other),
    }
}

fn lit_text(lit: &Lit) -> String {
    match lit {
        Lit::Str(s) => s.value(),
        Lit::Char(c) => c.value().to_string(),
        Lit::Int(i) => i.base10_digits().to_string(),
        Lit::Float(f) => f.base10_digits().to_string(),
        Lit::Bool(b) => b.value.to_string(),
        other => other.to_token_stream().to_string(),
    }
}

/// Human-readable node kind for error reporting.
fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Assign(_) => "assignment",
        Expr::Async(_) => "async block",
        Expr::Await(_) => "await",
        Expr::Binary(_) => "binary expression",
        Expr::Block(_) => "block",
        Expr::Break(_) => "break",
        Expr::Closure(_) => "closure",
        Expr::Const(_) => "const block",
        Expr::Continue(_) => "continue",
        Expr::ForLoop(_) => "for loop",
        Expr::If(_) => "if expression",
        Expr::Infer(_) => "inferred expression",
        Expr::Let(_) => "let guard",
        Expr::Loop(_) => "loop",
        Expr::Match(_) => "match expression",
        Expr::Repeat(_) => "array repeat",
        Expr::Return(_) => "return",
        Expr::Struct(_) => "struct literal",
        Expr::Unsafe(_) => "unsafe block",
        Expr::While(_) => "while loop",
        Expr::Yield(_) => "yield",
        _ => "expression",
    }
}

/// Render tokens without the whitespace noise of `TokenStream::to_string`.
///
/// Used for index keys, non-name-like receivers, and the `source` field of
/// the call-extras record. Deterministic over token structure, so identical
/// input always renders identically.
pub fn compact_tokens<T: ToTokens>(tokens: &T) -> String {
    let mut out = String::new();
    push_stream(&mut out, tokens.to_token_stream());
    out
}

fn push_stream(out: &mut String, stream: TokenStream) {
    for tree in stream {
        match tree {
            TokenTree::Group(group) => {
                let (open, close) = match group.delimiter() {
                    Delimiter::Parenthesis => ('(', ')'),
                    Delimiter::Bracket => ('[', ']'),
                    Delimiter::Brace => ('{', '}'),
                    Delimiter::None => {
                        push_stream(out, group.stream());
                        continue;
                    }
                };
                let opened = out.len();
                out.push(open);
                push_stream(out, group.stream());
                while out.ends_with(' ') {
                    out.pop();
                }
                // Trailing commas are syntax, not content.
                if out.ends_with(',') && out.len() > opened + 1 {
                    out.pop();
                }
                out.push(close);
            }
            TokenTree::Ident(ident) => push_word(out, &ident.to_string()),
            TokenTree::Literal(lit) => push_word(out, &lit.to_string()),
            TokenTree::Punct(punct) => {
                let ch = punct.as_char();
                out.push(ch);
                if ch == ',' {
                    out.push(' ');
                }
            }
        }
    }
}

fn push_word(out: &mut String, word: &str) {
    let needs_gap = out
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '"');
    if needs_gap {
        out.push(' ');
    }
    out.push_str(word);
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn identity_of(expr: Expr) -> String {
        call_identity(&expr).unwrap()
    }

    #[test]
    fn plain_names_and_paths() {
        assert_eq!(identity_of(parse_quote!(foo)), "foo");
        assert_eq!(identity_of(parse_quote!(module::foo)), "module::foo");
        assert_eq!(identity_of(parse_quote!(::std::mem::drop)), "std::mem::drop");
    }

    #[test]
    fn field_chains_join_with_dots() {
        assert_eq!(identity_of(parse_quote!(a.b.c)), "a.b.c");
        assert_eq!(identity_of(parse_quote!(self.handler)), "self.handler");
        assert_eq!(identity_of(parse_quote!(pair.0)), "pair.0");
    }

    #[test]
    fn subscripts_render_bracketed_and_unquoted() {
        assert_eq!(identity_of(parse_quote!(a.b[0].c)), "a.b[0].c");
        assert_eq!(identity_of(parse_quote!(a.b[0].c["c"])), "a.b[0].c[c]");
        assert_eq!(identity_of(parse_quote!(table[key])), "table[key]");
    }

    #[test]
    fn call_as_callee_uses_inner_callee() {
        let expr: Expr = parse_quote!(factory(1));
        assert_eq!(identity_of(expr), "factory");
    }

    #[test]
    fn method_chain_identity() {
        let call: ExprMethodCall = parse_quote!(a.b[0].c["c"].c_2());
        assert_eq!(method_identity(&call).unwrap(), "a.b[0].c[c].c_2");
    }

    #[test]
    fn try_and_parens_are_transparent() {
        let call: ExprMethodCall = parse_quote!(x.foo()?.bar());
        assert_eq!(method_identity(&call).unwrap(), "x.foo.bar");
        assert_eq!(identity_of(parse_quote!((f))), "f");
    }

    #[test]
    fn resolution_is_deterministic() {
        let expr: Expr = parse_quote!(a.b[0].c["c"].c_2);
        assert_eq!(identity_of(expr.clone()), identity_of(expr));
    }

    #[test]
    fn closures_are_unsupported_shapes() {
        let err = call_identity(&parse_quote!(|x| x + 1)).unwrap_err();
        assert!(err.to_string().contains("closure"), "{err}");
    }

    #[test]
    fn compact_rendering() {
        let expr: Expr = parse_quote!(int(v,));
        assert_eq!(compact_tokens(&expr), "int(v)");
        let expr: Expr = parse_quote!(a.b[0].c["c"].c_2());
        assert_eq!(compact_tokens(&expr), "a.b[0].c[\"c\"].c_2()");
        let expr: Expr = parse_quote!(other(0, val2));
        assert_eq!(compact_tokens(&expr), "other(0, val2)");
    }
}
