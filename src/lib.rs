//! # gdscribe core
//!
//! Translates a statically-typed source language into the script language a
//! game engine consumes, and models the engine's project structure (scene
//! graphs, instanced sub-scenes, resource tables) so translation can resolve
//! cross-file type information.
//!
//! ## Invariants
//!
//! 1. **One rule per node kind**: translation dispatch is an exhaustive match
//!    over a closed AST union; an unmatched kind is a compile error.
//! 2. **Scenes are immutable**: built once from the config layer's section
//!    tree, rebuilt wholesale on change, never patched in place.
//! 3. **Diagnostics never abort**: user-data problems degrade to sentinel
//!    values and accumulate in the sink; only resolver-invariant violations
//!    halt a file, and only that file.
//! 4. **Absent is never zero**: optional ids are `Option`, and id 0 is a
//!    valid resource id.

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod project;
pub mod resolve;
pub mod scene;

#[cfg(test)]
mod resolve_tests;

pub use ast::{AstKind, AstNode, Span};
pub use config::{ConfigFile, Section};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, InternalError};
pub use emit::{
    translate, translate_files, translate_root, ParseResult, ParseState, TranslationContext,
};
pub use project::{Asset, ExportedClass, PathMap, Project, SourceFile};
pub use resolve::{EffectiveType, InstanceTarget, Resolver};
pub use scene::{ResourceRef, Scene, SceneNode};
