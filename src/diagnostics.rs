//! Diagnostics sink for the transpiler core.
//!
//! Every user-data problem funnels here instead of being thrown: the sink is
//! append-only for the duration of a run, and a non-empty sink at end-of-run
//! means the run failed. Internal invariant violations are a separate type
//! (`InternalError`) and abort the current file only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_MISSING_ASSET: &str = "GD-ERR-ASSET-001";
pub const ERR_UNRESOLVED_TYPE: &str = "GD-ERR-TYPE-001";
pub const ERR_UNSUPPORTED_SYNTAX: &str = "GD-ERR-SYNTAX-001";
pub const ERR_MALFORMED_SCENE: &str = "GD-ERR-SCENE-001";
pub const ERR_INTERNAL_BUG: &str = "GD-ERR-INTERNAL-001";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A scene references an asset that is not in the project any more.
    MissingAsset,
    /// A node's effective type could not be determined.
    UnresolvedType,
    /// A source construct has no target-language equivalent.
    UnsupportedSyntax,
    /// A scene file violates the format's structural expectations.
    MalformedScene,
    /// A resolver/engine invariant was broken. Never caused by project data.
    InternalBug,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::MissingAsset => ERR_MISSING_ASSET,
            DiagnosticKind::UnresolvedType => ERR_UNRESOLVED_TYPE,
            DiagnosticKind::UnsupportedSyntax => ERR_UNSUPPORTED_SYNTAX,
            DiagnosticKind::MalformedScene => ERR_MALFORMED_SCENE,
            DiagnosticKind::InternalBug => ERR_INTERNAL_BUG,
        }
    }

    pub fn guarantee(&self) -> &'static str {
        match self {
            DiagnosticKind::MissingAsset => {
                "Every asset referenced by a scene resolves to a project file."
            }
            DiagnosticKind::UnresolvedType => {
                "Every node resolves to a concrete script or engine type."
            }
            DiagnosticKind::UnsupportedSyntax => {
                "Every source construct lowers to target-language text."
            }
            DiagnosticKind::MalformedScene => {
                "Every scene declares exactly one root node."
            }
            DiagnosticKind::InternalBug => {
                "Resolver queries are only made on structurally valid inputs."
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC RECORD
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: String,
    pub message: String,
    pub guarantee: String,
    /// Offending scene or source file, project-relative where possible.
    pub file: String,
    /// Slash-joined node path within the scene, when the problem is node-scoped.
    pub node_path: Option<String>,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    /// Rust backtrace at the report site. Only populated meaningfully when
    /// RUST_BACKTRACE is set.
    pub stack: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: &str, file: &str) -> Self {
        Diagnostic {
            kind,
            code: kind.code().to_string(),
            message: message.to_string(),
            guarantee: kind.guarantee().to_string(),
            file: file.to_string(),
            node_path: None,
            line: 0,
            column: 0,
            context: None,
            stack: std::backtrace::Backtrace::capture().to_string(),
        }
    }

    pub fn for_node(mut self, node_path: &str) -> Self {
        self.node_path = Some(node_path.to_string());
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.file, self.message)?;
        if let Some(path) = &self.node_path {
            write!(f, " (node {})", path)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SINK
// ═══════════════════════════════════════════════════════════════════════════════

/// Process-wide append-only log, created at run start and drained at the end.
/// Append is safe under concurrent translation of independent files.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Consume the accumulated diagnostics for end-of-run reporting.
    pub fn drain(&self) -> Vec<Diagnostic> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *entries)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INTERNAL ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Unrecoverable invariant violation inside the resolver or engine. These are
/// never producible from valid project data; hitting one halts the current
/// file's translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        InternalError {
            message: message.into(),
        }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal invariant violation: {}", self.message)
    }
}

impl std::error::Error for InternalError {}
