//! Translation engine: source AST in, target script text out.
//!
//! Translating a node is a pure function of (node, state); every node kind has
//! exactly one rule, and rules compose through `combine`, which recurses into
//! an ordered list of children and splices their output into a template.
//! Rules that depend on project type information go through the scene
//! resolver rather than re-deriving anything.

use lazy_static::lazy_static;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::ast::{AstKind, AstNode, Span};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, InternalError};
use crate::project::{Asset, Project};
use crate::resolve::Resolver;

// ═══════════════════════════════════════════════════════════════════════════════
// OPERATOR MAPPING
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref BINARY_OPERATORS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("&&", "and");
        m.insert("||", "or");
        m.insert("===", "==");
        m.insert("!==", "!=");
        m.insert("==", "==");
        m.insert("!=", "!=");
        m.insert("<", "<");
        m.insert("<=", "<=");
        m.insert(">", ">");
        m.insert(">=", ">=");
        m.insert("+", "+");
        m.insert("-", "-");
        m.insert("*", "*");
        m.insert("/", "/");
        m.insert("%", "%");
        m
    };
    static ref UNARY_OPERATORS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("!", "not ");
        m.insert("-", "-");
        m.insert("+", "+");
        m
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSLATION STATE
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TranslationContext<'a> {
    pub project: &'a Project,
    pub sink: &'a DiagnosticSink,
    /// Name used when attaching diagnostics to the file under translation.
    pub file: String,
}

impl<'a> TranslationContext<'a> {
    pub fn new(project: &'a Project, sink: &'a DiagnosticSink, file: &str) -> Self {
        TranslationContext {
            project,
            sink,
            file: file.to_string(),
        }
    }

    fn report(&self, kind: DiagnosticKind, message: &str, span: Span) {
        self.sink.report(
            Diagnostic::new(kind, message, &self.file).at(span.line, span.column),
        );
    }
}

/// Immutable snapshot threaded through recursive translation. Deriving a
/// child state (deeper indent, extra bindings) never mutates the parent's.
#[derive(Debug, Clone, Default)]
pub struct ParseState {
    pub indent: usize,
    pub bindings: HashSet<String>,
    pub enclosing_class: Option<String>,
    pub span: Span,
}

impl ParseState {
    pub fn root() -> Self {
        ParseState::default()
    }

    pub fn indented(&self) -> Self {
        let mut next = self.clone();
        next.indent += 1;
        next
    }

    pub fn at(&self, span: Span) -> Self {
        let mut next = self.clone();
        next.span = span;
        next
    }

    pub fn with_bindings(&self, names: &[String]) -> Self {
        let mut next = self.clone();
        next.bindings.extend(names.iter().cloned());
        next
    }

    pub fn inside_class(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.enclosing_class = Some(name.to_string());
        next
    }

    pub fn indent_str(&self) -> String {
        "\t".repeat(self.indent)
    }
}

/// Output of one rule: the text fragment plus any bindings introduced that
/// later siblings in the same block must see.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub content: String,
    pub new_bindings: Vec<String>,
}

impl ParseResult {
    fn text(content: impl Into<String>) -> Self {
        ParseResult {
            content: content.into(),
            new_bindings: Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMBINATOR CORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Generic reduction behind every composite rule: translates `children` in
/// order under `state` (each child seeing the bindings its earlier siblings
/// introduced), then applies `template` to the rendered fragments.
pub fn combine<F>(
    ctx: &TranslationContext,
    state: &ParseState,
    children: &[&AstNode],
    template: F,
) -> Result<ParseResult, InternalError>
where
    F: FnOnce(&[String]) -> String,
{
    let mut rendered = Vec::with_capacity(children.len());
    let mut introduced = Vec::new();
    let mut current = state.clone();
    for child in children {
        let result = translate(ctx, child, &current)?;
        current = current.with_bindings(&result.new_bindings);
        introduced.extend(result.new_bindings);
        rendered.push(result.content);
    }
    Ok(ParseResult {
        content: template(&rendered),
        new_bindings: introduced,
    })
}

/// Renders a statement sequence, one statement per line at `state`'s indent,
/// with sibling binding propagation. An empty body still needs a statement in
/// the target language, so it renders as `pass`.
fn translate_block(
    ctx: &TranslationContext,
    statements: &[AstNode],
    state: &ParseState,
) -> Result<String, InternalError> {
    if statements.is_empty() {
        return Ok(format!("{}pass", state.indent_str()));
    }
    let mut lines = Vec::with_capacity(statements.len());
    let mut current = state.clone();
    for statement in statements {
        let result = translate(ctx, statement, &current)?;
        current = current.with_bindings(&result.new_bindings);
        lines.push(format!("{}{}", state.indent_str(), result.content));
    }
    Ok(lines.join("\n"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

/// Translates one AST node. The match is exhaustive over `AstKind`: adding a
/// kind without a rule is a compile error, not a runtime fallthrough.
pub fn translate(
    ctx: &TranslationContext,
    node: &AstNode,
    state: &ParseState,
) -> Result<ParseResult, InternalError> {
    let state = state.at(node.span);
    match &node.kind {
        // ── terminals ──────────────────────────────────────────────────────
        AstKind::SelfRef => Ok(ParseResult::text("self")),
        AstKind::Ident(name) => Ok(ParseResult::text(name.clone())),
        AstKind::StringLit(value) => Ok(ParseResult::text(format!(
            "\"{}\"",
            value.replace('\\', "\\\\").replace('"', "\\\"")
        ))),
        AstKind::NumberLit(value) => Ok(ParseResult::text(value.clone())),
        AstKind::BoolLit(value) => Ok(ParseResult::text(if *value { "true" } else { "false" })),
        AstKind::NullLit => Ok(ParseResult::text("null")),
        AstKind::Break => Ok(ParseResult::text("break")),
        AstKind::Continue => Ok(ParseResult::text("continue")),
        AstKind::PassStmt => Ok(ParseResult::text("pass")),

        // ── expressions ────────────────────────────────────────────────────
        AstKind::Conditional {
            condition,
            consequent,
            alternate,
        } => combine(
            ctx,
            &state,
            &[consequent, condition, alternate],
            |parts| format!("{} if {} else {}", parts[0], parts[1], parts[2]),
        ),
        AstKind::Index { base, index } => combine(ctx, &state, &[base, index], |parts| {
            format!("{}[{}]", parts[0], parts[1])
        }),
        AstKind::Member { base, property } => {
            let property = property.clone();
            combine(ctx, &state, &[base], move |parts| {
                format!("{}.{}", parts[0], property)
            })
        }
        AstKind::Call { callee, args } => {
            let mut children: Vec<&AstNode> = Vec::with_capacity(args.len() + 1);
            children.push(callee);
            children.extend(args.iter());
            combine(ctx, &state, &children, |parts| {
                format!("{}({})", parts[0], parts[1..].join(", "))
            })
        }
        AstKind::Binary { op, lhs, rhs } => {
            let target_op = match BINARY_OPERATORS.get(op.as_str()) {
                Some(mapped) => (*mapped).to_string(),
                None => {
                    ctx.report(
                        DiagnosticKind::UnsupportedSyntax,
                        &format!("operator \"{}\" has no target equivalent", op),
                        state.span,
                    );
                    op.clone()
                }
            };
            combine(ctx, &state, &[lhs, rhs], move |parts| {
                format!("{} {} {}", parts[0], target_op, parts[1])
            })
        }
        AstKind::Unary { op, operand } => {
            let target_op = match UNARY_OPERATORS.get(op.as_str()) {
                Some(mapped) => (*mapped).to_string(),
                None => {
                    ctx.report(
                        DiagnosticKind::UnsupportedSyntax,
                        &format!("unary operator \"{}\" has no target equivalent", op),
                        state.span,
                    );
                    op.clone()
                }
            };
            combine(ctx, &state, &[operand], move |parts| {
                format!("{}{}", target_op, parts[0])
            })
        }
        AstKind::Paren(inner) => {
            combine(ctx, &state, &[inner], |parts| format!("({})", parts[0]))
        }
        AstKind::ArrayLit(items) => {
            let children: Vec<&AstNode> = items.iter().collect();
            combine(ctx, &state, &children, |parts| {
                format!("[{}]", parts.join(", "))
            })
        }
        AstKind::Preload { path } => translate_preload(ctx, path, &state),

        // ── statements ─────────────────────────────────────────────────────
        AstKind::VarDecl { name, init } => {
            let init = translate(ctx, init, &state)?;
            Ok(ParseResult {
                content: format!("var {} = {}", name, init.content),
                new_bindings: vec![name.clone()],
            })
        }
        AstKind::Assign { target, value } => combine(ctx, &state, &[target, value], |parts| {
            format!("{} = {}", parts[0], parts[1])
        }),
        AstKind::Return(value) => match value {
            Some(inner) => combine(ctx, &state, &[inner], |parts| {
                format!("return {}", parts[0])
            }),
            None => Ok(ParseResult::text("return")),
        },
        AstKind::ExprStmt(inner) => translate(ctx, inner, &state),
        AstKind::Block(statements) => {
            Ok(ParseResult::text(translate_block(ctx, statements, &state)?))
        }
        AstKind::If {
            condition,
            then_body,
            else_body,
        } => {
            let condition = translate(ctx, condition, &state)?;
            let then_text = translate_block(ctx, then_body, &state.indented())?;
            let mut content = format!("if {}:\n{}", condition.content, then_text);
            if !else_body.is_empty() {
                let else_text = translate_block(ctx, else_body, &state.indented())?;
                content.push_str(&format!("\n{}else:\n{}", state.indent_str(), else_text));
            }
            Ok(ParseResult::text(content))
        }
        AstKind::While { condition, body } => {
            let condition = translate(ctx, condition, &state)?;
            let body_text = translate_block(ctx, body, &state.indented())?;
            Ok(ParseResult::text(format!(
                "while {}:\n{}",
                condition.content, body_text
            )))
        }
        AstKind::FuncDecl { name, params, body } => {
            let body_state = state.indented().with_bindings(params);
            let body_text = translate_block(ctx, body, &body_state)?;
            Ok(ParseResult::text(format!(
                "func {}({}):\n{}",
                name,
                params.join(", "),
                body_text
            )))
        }
        AstKind::ClassDecl {
            name,
            extends,
            body,
        } => translate_class(ctx, name, extends.as_deref(), body, &state),
    }
}

fn translate_class(
    ctx: &TranslationContext,
    name: &str,
    extends: Option<&str>,
    body: &[AstNode],
    state: &ParseState,
) -> Result<ParseResult, InternalError> {
    if state.enclosing_class.is_none() {
        // Top-level class: one per output file, unindented.
        let body_state = state.inside_class(name);
        let body_text = translate_block(ctx, body, &body_state)?;
        let extends = extends.unwrap_or("Node");
        Ok(ParseResult::text(format!(
            "class_name {}\nextends {}\n\n{}",
            name, extends, body_text
        )))
    } else {
        let body_state = state.indented().inside_class(name);
        let body_text = translate_block(ctx, body, &body_state)?;
        let header = match extends {
            Some(base) => format!("class {} extends {}:", name, base),
            None => format!("class {}:", name),
        };
        Ok(ParseResult::text(format!("{}\n{}", header, body_text)))
    }
}

/// Asset loads are the seam between the engine and the resolver: a resolvable
/// asset emits an eager `preload`, and scene targets additionally have their
/// exported type resolved so stale script references surface here rather than
/// at runtime. Unresolvable paths degrade to a deferred `load`.
fn translate_preload(
    ctx: &TranslationContext,
    path: &str,
    state: &ParseState,
) -> Result<ParseResult, InternalError> {
    let resolved = ctx.project.path_map.to_filesystem(path);
    match ctx.project.asset_by_path(&resolved) {
        Some(Asset::Scene(scene)) => {
            // Called for its diagnostics only: a stale script reference in
            // the target scene gets reported here, at translation time.
            Resolver::new(scene, ctx.project, ctx.sink).ts_type()?;
            Ok(ParseResult::text(format!("preload(\"{}\")", path)))
        }
        Some(_) => Ok(ParseResult::text(format!("preload(\"{}\")", path))),
        None => {
            ctx.report(
                DiagnosticKind::MissingAsset,
                &format!("preload target {} does not exist in the project", path),
                state.span,
            );
            Ok(ParseResult::text(format!("load(\"{}\")", path)))
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Translates one file's AST root under an initial state.
pub fn translate_root(ctx: &TranslationContext, root: &AstNode) -> Result<String, InternalError> {
    translate(ctx, root, &ParseState::root()).map(|result| result.content)
}

/// Translates a batch of independent files in parallel. The sink is the only
/// shared structure. An internal error halts its own file (recorded, output
/// dropped) without affecting the rest of the batch.
pub fn translate_files(
    ctx: &TranslationContext,
    files: &[(String, AstNode)],
) -> Vec<(String, Option<String>)> {
    files
        .par_iter()
        .map(|(name, root)| {
            let file_ctx = TranslationContext::new(ctx.project, ctx.sink, name);
            match translate_root(&file_ctx, root) {
                Ok(text) => (name.clone(), Some(text)),
                Err(error) => {
                    ctx.sink.report(Diagnostic::new(
                        DiagnosticKind::InternalBug,
                        &error.message,
                        name,
                    ));
                    (name.clone(), None)
                }
            }
        })
        .collect()
}
