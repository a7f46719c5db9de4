//! Function rewriter and line-number bookkeeping.
//!
//! [`FunctionRewriter`] owns the parsed tree of a single target function
//! across a sequence of transformations and renders or compiles the result.
//! [`LineMap`] translates parse-relative line numbers back to positions in
//! the original source file.

use proc_macro2::{Span, TokenStream, TokenTree};
use quote::ToTokens;
use syn::spanned::Spanned;
use syn::{Item, ItemFn};

use crate::error::RewriteError;
use crate::transform::Transform;

/// Line-number accounting for a rewritten function.
///
/// Spans inside the tree are relative to the parsed text (first line = 1)
/// and stay fixed while transformers edit the tree, so resolving a span
/// against the original file only needs the offset of the parsed text.
///
/// `adjust` accumulates the net lines transformers have removed above the
/// function body (attribute removal reports -1 per attribute). It does not
/// participate in span resolution; it maps lines of the re-rendered source
/// back to the original file via [`LineMap::original_line_of_rendered`].
#[derive(Debug, Clone, Copy)]
pub struct LineMap {
    /// File line the parsed text starts on (1-based).
    pub first_line: u32,
    /// Net lines removed from the rendered output, relative to the input.
    pub adjust: i64,
}

impl LineMap {
    pub fn new(first_line: u32) -> Self {
        Self {
            first_line,
            adjust: 0,
        }
    }

    /// For trees whose spans are already file-absolute (attribute input).
    pub fn identity() -> Self {
        Self::new(1)
    }

    /// Original-file line range covered by a node's tokens.
    ///
    /// A node's own span can degrade to its first token when the compiler
    /// cannot join spans, so the range is folded over every token instead
    /// of read off a single joined span.
    pub fn resolve_tokens<T: ToTokens>(&self, node: &T) -> (u32, u32) {
        let mut lo = usize::MAX;
        let mut hi = 0;
        fold_token_lines(node.to_token_stream(), &mut lo, &mut hi);
        if lo == usize::MAX {
            return (self.first_line, self.first_line);
        }
        (self.absolute(lo), self.absolute(hi))
    }

    fn absolute(&self, relative: usize) -> u32 {
        (relative as u32).saturating_add(self.first_line).saturating_sub(1)
    }

    /// Map a line of the re-rendered source to its original-file line.
    pub fn original_line_of_rendered(&self, rendered: u32) -> u32 {
        let line = i64::from(rendered) + i64::from(self.first_line) - 1 - self.adjust;
        line.max(1) as u32
    }
}

fn fold_token_lines(stream: TokenStream, lo: &mut usize, hi: &mut usize) {
    for tree in stream {
        let span = tree.span();
        let start = span.start();
        // Spans without location info report line 0; they carry nothing.
        if start.line > 0 {
            *lo = (*lo).min(start.line);
            *hi = (*hi).max(span.end().line);
        }
        if let TokenTree::Group(group) = tree {
            fold_token_lines(group.stream(), lo, hi);
        }
    }
}

/// Owns the tree of one target function through a transformation pipeline.
#[derive(Debug)]
pub struct FunctionRewriter {
    file: syn::File,
    file_name: String,
    lines: LineMap,
    original: String,
}

impl FunctionRewriter {
    /// Parse source text containing a function definition.
    ///
    /// `first_line` is the 1-based file line the text starts on, so call
    /// extras can report positions in the original file. Indented text (a
    /// method lifted out of an impl block) is dedented before parsing.
    pub fn from_source(
        source: &str,
        file_name: &str,
        first_line: u32,
    ) -> Result<Self, RewriteError> {
        let text = dedent(source);
        let file = syn::parse_file(&text).map_err(|err| RewriteError::SourceUnavailable {
            file: file_name.to_string(),
            message: err.to_string(),
        })?;
        let rewriter = Self {
            file,
            file_name: file_name.to_string(),
            lines: LineMap::new(first_line),
            original: source.to_string(),
        };
        check_subject(rewriter.target_fn()?)?;
        Ok(rewriter)
    }

    /// Adopt an already-parsed function item (the attribute-macro path).
    ///
    /// Spans on attribute input are file-absolute, so the line map is the
    /// identity. The original source is recovered by rendering the item.
    pub fn from_item(item: ItemFn) -> Result<Self, RewriteError> {
        check_subject(&item)?;
        let file = syn::File {
            shebang: None,
            attrs: Vec::new(),
            items: vec![Item::Fn(item)],
        };
        let original = prettyplease::unparse(&file);
        Ok(Self {
            file,
            file_name: "<attribute input>".to_string(),
            lines: LineMap::identity(),
            original,
        })
    }

    /// Apply one transformer to the target function.
    pub fn transform(&mut self, transformer: &mut dyn Transform) -> Result<(), RewriteError> {
        let lines = self.lines;
        let fun = self.target_fn_mut()?;
        transformer.apply(fun, &lines)?;
        self.lines.adjust += transformer.line_adjust();
        Ok(())
    }

    /// The target function item.
    pub fn target_fn(&self) -> Result<&ItemFn, RewriteError> {
        self.file
            .items
            .iter()
            .find_map(|item| match item {
                Item::Fn(fun) => Some(fun),
                _ => None,
            })
            .ok_or(RewriteError::NotAFunction {
                span: Span::call_site(),
            })
    }

    pub(crate) fn target_fn_mut(&mut self) -> Result<&mut ItemFn, RewriteError> {
        self.file
            .items
            .iter_mut()
            .find_map(|item| match item {
                Item::Fn(fun) => Some(fun),
                _ => None,
            })
            .ok_or(RewriteError::NotAFunction {
                span: Span::call_site(),
            })
    }

    /// Current line accounting.
    pub fn line_map(&self) -> LineMap {
        self.lines
    }

    /// Name of the file the source came from.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The source text as supplied, before any transformation.
    pub fn original_source(&self) -> &str {
        &self.original
    }

    /// Render the current state of the tree as formatted source.
    pub fn current_source(&self) -> String {
        prettyplease::unparse(&self.file)
    }

    /// Emit the rewritten function as tokens.
    ///
    /// Fails unless the tree holds exactly one `fn` item: sibling items in
    /// the source would be spliced into the caller's scope unseen.
    pub fn compile(&self) -> Result<TokenStream, RewriteError> {
        match self.file.items.as_slice() {
            [Item::Fn(fun)] => Ok(fun.to_token_stream()),
            [first, ..] => Err(RewriteError::NotAFunction { span: first.span() }),
            [] => Err(RewriteError::NotAFunction {
                span: Span::call_site(),
            }),
        }
    }
}

fn check_subject(fun: &ItemFn) -> Result<(), RewriteError> {
    if let Some(asyncness) = &fun.sig.asyncness {
        return Err(RewriteError::UnsupportedTarget {
            reason: "async functions".to_string(),
            span: asyncness.span,
        });
    }
    if let Some(variadic) = &fun.sig.variadic {
        return Err(RewriteError::UnsupportedTarget {
            reason: "variadic functions".to_string(),
            span: variadic.span(),
        });
    }
    Ok(())
}

/// Strip the common leading whitespace from every non-blank line.
fn dedent(source: &str) -> String {
    let margin = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    if margin == 0 {
        return source.to_string();
    }
    source
        .lines()
        .map(|line| if line.len() >= margin { &line[margin..] } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_function() {
        let rewriter = FunctionRewriter::from_source("fn f() {}", "t.rs", 1).unwrap();
        assert_eq!(rewriter.target_fn().unwrap().sig.ident, "f");
    }

    #[test]
    fn dedents_method_source() {
        let source = "    fn method(&self) -> u32 {\n        self.count\n    }";
        let rewriter = FunctionRewriter::from_source(source, "t.rs", 40).unwrap();
        assert_eq!(rewriter.target_fn().unwrap().sig.ident, "method");
        assert_eq!(rewriter.original_source(), source);
    }

    #[test]
    fn rejects_non_function_source() {
        let err = FunctionRewriter::from_source("struct S;", "t.rs", 1).unwrap_err();
        assert!(matches!(err, RewriteError::NotAFunction { .. }));
    }

    #[test]
    fn rejects_async_functions() {
        let err = FunctionRewriter::from_source("async fn f() {}", "t.rs", 1).unwrap_err();
        assert!(matches!(err, RewriteError::UnsupportedTarget { .. }));
        assert!(err.to_string().contains("async"));
    }

    #[test]
    fn compile_requires_single_item() {
        let rewriter =
            FunctionRewriter::from_source("fn f() {}\nfn helper() {}", "t.rs", 1).unwrap();
        assert!(rewriter.compile().is_err());
    }

    #[test]
    fn line_map_resolves_with_offset() {
        let source = "fn f() {\n    g();\n}";
        let rewriter = FunctionRewriter::from_source(source, "t.rs", 20).unwrap();
        let map = rewriter.line_map();
        // Relative line 2 sits on file line 21.
        assert_eq!(map.original_line_of_rendered(2), 21);
        assert_eq!(map.first_line, 20);
    }

    #[test]
    fn resolve_tokens_covers_multi_line_expressions() {
        let expr: syn::Expr = syn::parse_str("int(\n    v,\n)").unwrap();
        let map = LineMap::new(24);
        assert_eq!(map.resolve_tokens(&expr), (24, 26));
    }

    #[test]
    fn resolve_tokens_survives_unjoinable_spans() {
        // Sub-expressions parsed separately carry spans that cannot be
        // joined into one, so the node's own span stops at its first
        // token. The fold still sees every token.
        let mut call: syn::ExprCall = syn::parse_str("f(0)").unwrap();
        let arg: syn::Expr = syn::parse_str("(\n    v\n)").unwrap();
        call.args = std::iter::once(arg).collect();
        let expr = syn::Expr::Call(call);
        assert_eq!(LineMap::new(1).resolve_tokens(&expr), (1, 3));
    }

    #[test]
    fn rendered_lines_shift_with_adjust() {
        let mut map = LineMap::new(10);
        map.adjust = -1;
        // One line removed above the body: rendered line 1 maps to input
        // line 2, which sits on file line 11.
        assert_eq!(map.original_line_of_rendered(1), 11);
    }
}
