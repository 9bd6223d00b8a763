//! Source-language AST as consumed from the front end.
//!
//! The parser/type-checker producing this tree lives outside the crate; what
//! crosses the boundary is a closed tagged union of node kinds. Every kind has
//! exactly one translation rule, and the exhaustive match in `emit` means a
//! new kind cannot be added without the compiler demanding its rule.

/// Position in the original source file, for attaching diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: AstKind,
    pub span: Span,
}

impl AstNode {
    pub fn new(kind: AstKind) -> Self {
        AstNode {
            kind,
            span: Span::default(),
        }
    }

    pub fn at(kind: AstKind, span: Span) -> Self {
        AstNode { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstKind {
    // ── terminals ──────────────────────────────────────────────────────────
    /// The source language's self-reference keyword.
    SelfRef,
    Ident(String),
    StringLit(String),
    /// Numeric literals pass through verbatim; the front end has already
    /// validated them.
    NumberLit(String),
    BoolLit(bool),
    NullLit,
    Break,
    Continue,
    PassStmt,

    // ── expressions ────────────────────────────────────────────────────────
    Conditional {
        condition: Box<AstNode>,
        consequent: Box<AstNode>,
        alternate: Box<AstNode>,
    },
    Index {
        base: Box<AstNode>,
        index: Box<AstNode>,
    },
    Member {
        base: Box<AstNode>,
        property: String,
    },
    Call {
        callee: Box<AstNode>,
        args: Vec<AstNode>,
    },
    Binary {
        op: String,
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
    },
    Unary {
        op: String,
        operand: Box<AstNode>,
    },
    Paren(Box<AstNode>),
    ArrayLit(Vec<AstNode>),
    /// Engine asset load by virtual path. The one expression kind whose
    /// lowering consults the project and scene resolver.
    Preload {
        path: String,
    },

    // ── statements ─────────────────────────────────────────────────────────
    VarDecl {
        name: String,
        init: Box<AstNode>,
    },
    Assign {
        target: Box<AstNode>,
        value: Box<AstNode>,
    },
    Return(Option<Box<AstNode>>),
    If {
        condition: Box<AstNode>,
        then_body: Vec<AstNode>,
        else_body: Vec<AstNode>,
    },
    While {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
    },
    ExprStmt(Box<AstNode>),
    /// Statement sequence sharing one scope, e.g. a file body.
    Block(Vec<AstNode>),
    FuncDecl {
        name: String,
        params: Vec<String>,
        body: Vec<AstNode>,
    },
    ClassDecl {
        name: String,
        extends: Option<String>,
        body: Vec<AstNode>,
    },
}
