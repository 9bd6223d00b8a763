//! Scene/asset resolver: read-only derived facts over a scene and its project.
//!
//! Answers "what type is this node", "what script backs it", and "is this
//! entry a property override", following instancing chains across scenes.
//! Stale project references degrade to the unknown-type sentinel and a
//! diagnostic; a scene contradicting its own resource table is an internal
//! error and halts the current file. Instancing cycles between scene files
//! are reported and degrade like any other malformed input.

use std::fmt;
use std::path::Path;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, InternalError};
use crate::project::{Asset, ExportedClass, Project, SourceFile};
use crate::scene::{Scene, SceneNode};

/// Engine type instanced model resources present as.
const MODEL_NODE_TYPE: &str = "Node3D";

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVED TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// The resolved source-language type backing a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectiveType {
    /// A built-in engine type, straight from the node's type tag.
    Native(String),
    /// The exported class of the script backing the node.
    Script(ExportedClass),
    /// Degraded sentinel: resolution failed and was reported.
    Unknown,
}

impl fmt::Display for EffectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectiveType::Native(name) => write!(f, "{}", name),
            EffectiveType::Script(class) => write!(f, "{}", class),
            EffectiveType::Unknown => write!(f, "any"),
        }
    }
}

/// What an instance node stamps into the hierarchy.
#[derive(Debug, Clone, Copy)]
pub enum InstanceTarget<'a> {
    Scene(&'a Scene),
    Model(&'a Path),
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLVER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Resolver<'a> {
    scene: &'a Scene,
    project: &'a Project,
    sink: &'a DiagnosticSink,
    /// Virtual paths of the scenes on the active instancing chain, this
    /// scene included. Guards transitive resolution against cycles.
    trail: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(scene: &'a Scene, project: &'a Project, sink: &'a DiagnosticSink) -> Self {
        Resolver {
            scene,
            project,
            sink,
            trail: vec![scene.virtual_path.clone()],
        }
    }

    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    /// Resolver for an instanced sub-scene, carrying the instancing chain.
    /// A sub-scene already on the chain means two scene files instance each
    /// other; that gets reported and resolution degrades instead of looping.
    fn descend(&self, sub_scene: &'a Scene, node: &SceneNode) -> Option<Resolver<'a>> {
        if self.trail.iter().any(|p| p == &sub_scene.virtual_path) {
            self.sink.report(
                Diagnostic::new(
                    DiagnosticKind::MalformedScene,
                    &format!(
                        "scene instancing cycle: {} -> {}",
                        self.trail.join(" -> "),
                        sub_scene.virtual_path
                    ),
                    &self.scene.virtual_path,
                )
                .for_node(node.scene_path()),
            );
            return None;
        }
        let mut trail = self.trail.clone();
        trail.push(sub_scene.virtual_path.clone());
        Some(Resolver {
            scene: sub_scene,
            project: self.project,
            sink: self.sink,
            trail,
        })
    }

    /// Structural children of a node: same-scene nodes whose parent path is
    /// this node's path, excluding override entries. Overrides are property
    /// patches on already-instanced nodes, not declarations, and must never
    /// surface in derived views.
    pub fn children(&self, node: &SceneNode) -> Result<Vec<&'a SceneNode>, InternalError> {
        let mut children = Vec::new();
        for candidate in &self.scene.nodes {
            if candidate.parent_path() != Some(node.scene_path()) {
                continue;
            }
            if self.is_instance_override(candidate)? {
                continue;
            }
            children.push(candidate);
        }
        Ok(children)
    }

    /// The node's instance resource id. Id 0 is a valid id; absence is the
    /// `None` case, never a numeric sentinel.
    pub fn instance_id(&self, node: &SceneNode) -> Option<u32> {
        node.instance_resource_id
    }

    /// Resolves the node's instance reference to a project asset.
    ///
    /// `Ok(None)` means either "not an instance" or "instance of an asset no
    /// longer in the project"; callers distinguish via `instance_id`. An id
    /// that is absent from the scene's own resource table is a structurally
    /// corrupt file and an internal error, not a user diagnostic.
    pub fn instance(
        &self,
        node: &SceneNode,
    ) -> Result<Option<InstanceTarget<'a>>, InternalError> {
        let Some(id) = self.instance_id(node) else {
            return Ok(None);
        };
        let Some(resource) = self.scene.resource(id) else {
            return Err(InternalError::new(format!(
                "node {} of {} references resource id {} absent from the scene's resource table",
                node.scene_path(),
                self.scene.virtual_path,
                id
            )));
        };
        match self.project.asset_by_path(&resource.resolved_path) {
            Some(Asset::Scene(scene)) => Ok(Some(InstanceTarget::Scene(scene))),
            Some(Asset::Model(path)) => Ok(Some(InstanceTarget::Model(path))),
            // A script is not something a node can stamp in.
            Some(Asset::Script(_)) | None => Ok(None),
        }
    }

    /// Authoritative override test: no declared type and no resolvable
    /// instance. An instanced node legitimately lacks a type tag, so absence
    /// of the tag alone proves nothing.
    pub fn is_instance_override(&self, node: &SceneNode) -> Result<bool, InternalError> {
        if node.declared_type.is_some() {
            return Ok(false);
        }
        Ok(self.instance(node)?.is_none() && self.instance_id(node).is_none())
    }

    /// The effective type of a node, following instancing chains.
    ///
    /// Callers must not ask overrides for their type; doing so is a defect in
    /// the traversal, reported as an internal bug with a degraded result so
    /// the rest of the project still processes.
    pub fn effective_type(&self, node: &SceneNode) -> Result<EffectiveType, InternalError> {
        if let Some(declared) = &node.declared_type {
            return Ok(EffectiveType::Native(declared.clone()));
        }
        match self.instance(node)? {
            Some(InstanceTarget::Scene(sub_scene)) => match self.descend(sub_scene, node) {
                Some(sub) => sub.ts_type(),
                None => Ok(EffectiveType::Unknown),
            },
            Some(InstanceTarget::Model(_)) => {
                Ok(EffectiveType::Native(MODEL_NODE_TYPE.to_string()))
            }
            None => {
                if self.instance_id(node).is_some() {
                    self.sink.report(
                        Diagnostic::new(
                            DiagnosticKind::MissingAsset,
                            "scene references an asset that no longer exists",
                            &self.scene.virtual_path,
                        )
                        .for_node(node.scene_path()),
                    );
                } else {
                    self.sink.report(
                        Diagnostic::new(
                            DiagnosticKind::InternalBug,
                            "effective_type queried on an override entry",
                            &self.scene.virtual_path,
                        )
                        .for_node(node.scene_path()),
                    );
                }
                Ok(EffectiveType::Unknown)
            }
        }
    }

    /// The script resource effectively attached to a node.
    ///
    /// A node with no script of its own but instancing another scene inherits
    /// that scene's root script: the engine does not duplicate the script
    /// resource onto the instancing node. One level of indirection per
    /// instance; deeper chains recurse through `instance` again.
    pub fn backing_script(
        &self,
        node: &SceneNode,
    ) -> Result<Option<&'a SourceFile>, InternalError> {
        if let Some(id) = node.script_resource_id {
            let Some(resource) = self.scene.resource(id) else {
                return Err(InternalError::new(format!(
                    "node {} of {} references script id {} absent from the scene's resource table",
                    node.scene_path(),
                    self.scene.virtual_path,
                    id
                )));
            };
            match self.project.script_by_path(&resource.resolved_path) {
                Some(script) => return Ok(Some(script)),
                None => {
                    self.sink.report(
                        Diagnostic::new(
                            DiagnosticKind::MissingAsset,
                            &format!(
                                "script {} is not part of the project",
                                resource.declared_path
                            ),
                            &self.scene.virtual_path,
                        )
                        .for_node(node.scene_path()),
                    );
                    return Ok(None);
                }
            }
        }
        match self.instance(node)? {
            Some(InstanceTarget::Scene(sub_scene)) => match sub_scene.root() {
                Some(root) => match self.descend(sub_scene, node) {
                    Some(sub) => sub.backing_script(root),
                    None => Ok(None),
                },
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// The scene's resolved exported type: the exported class of the root
    /// node's backing script, falling back to the root's effective type when
    /// no script resolves.
    pub fn ts_type(&self) -> Result<EffectiveType, InternalError> {
        let Some(root) = self.scene.root() else {
            self.sink.report(Diagnostic::new(
                DiagnosticKind::UnresolvedType,
                "scene has no root node to resolve a type from",
                &self.scene.virtual_path,
            ));
            return Ok(EffectiveType::Unknown);
        };
        match self.backing_script(root)? {
            Some(script) => match &script.exported_class {
                Some(class) => Ok(EffectiveType::Script(class.clone())),
                None => {
                    self.sink.report(
                        Diagnostic::new(
                            DiagnosticKind::UnresolvedType,
                            &format!("{} exports no class", script.virtual_path),
                            &self.scene.virtual_path,
                        )
                        .for_node(root.scene_path()),
                    );
                    self.effective_type(root)
                }
            },
            None => self.effective_type(root),
        }
    }
}
