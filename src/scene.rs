//! Scene model: node graphs and external resource tables.
//!
//! A scene is built once from a parsed config tree at project-load time and is
//! immutable afterward; file changes rebuild the scene wholesale. Hierarchy is
//! encoded in the source format as flattened path-from-root strings, so
//! parent/child/root relations are derived from paths, never stored.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::config::ConfigFile;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::project::PathMap;

// ═══════════════════════════════════════════════════════════════════════════════
// RESOURCE TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// One external resource table entry. Ids are unique within a scene; id 0 is
/// a valid id and is distinct from "no id".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: u32,
    /// Engine-virtual path as declared in the scene file.
    pub declared_path: String,
    pub resolved_path: PathBuf,
    pub kind: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCENE NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Engine type tag. Absent on instanced nodes and on override entries.
    pub declared_type: Option<String>,
    /// Slash-joined path from the scene root; the root itself is ".".
    pub path_from_root: String,
    pub groups: HashSet<String>,
    /// Resource id of the scene/model this node stamps in, if any.
    pub instance_resource_id: Option<u32>,
    /// Resource id of a script declared directly on this node, if any.
    pub script_resource_id: Option<u32>,
    /// Open bag of typed properties, passed through uninterpreted.
    pub raw_properties: HashMap<String, Value>,
}

impl SceneNode {
    pub fn is_root(&self) -> bool {
        self.path_from_root == "."
    }

    /// The node's slash-joined path: "." for the root, the bare name for a
    /// direct child of the root, parent + "/" + name below that.
    pub fn scene_path(&self) -> &str {
        &self.path_from_root
    }

    /// Path of the parent node: the path with its last segment removed, "."
    /// for direct children of the root, None for the root itself.
    pub fn parent_path(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        match self.path_from_root.rfind('/') {
            Some(idx) => Some(&self.path_from_root[..idx]),
            None => Some("."),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCENE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Scene {
    pub resolved_path: PathBuf,
    pub virtual_path: String,
    pub nodes: Vec<SceneNode>,
    pub resources: Vec<ResourceRef>,
    /// Index of the unique root node. None only for malformed input, which is
    /// reported at construction time.
    pub root_index: Option<usize>,
}

impl Scene {
    pub fn root(&self) -> Option<&SceneNode> {
        self.root_index.map(|i| &self.nodes[i])
    }

    pub fn resource(&self, id: u32) -> Option<&ResourceRef> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Builds a scene from the config layer's section tree.
    ///
    /// A node section without a `parent` attribute is root-shaped. Well-formed
    /// files have exactly one; zero or several is malformed input and gets
    /// reported, with the first-found node used when several exist.
    pub fn from_config(
        resolved_path: PathBuf,
        virtual_path: &str,
        config: &ConfigFile,
        paths: &PathMap,
        sink: &DiagnosticSink,
    ) -> Scene {
        let mut resources = Vec::new();
        for section in config.sections_of("ext_resource") {
            let (Some(id), Some(path)) = (section.header_u32("id"), section.header_str("path"))
            else {
                sink.report(Diagnostic::new(
                    DiagnosticKind::MalformedScene,
                    "ext_resource section is missing its id or path",
                    virtual_path,
                ));
                continue;
            };
            resources.push(ResourceRef {
                id,
                declared_path: path.to_string(),
                resolved_path: paths.to_filesystem(path),
                kind: section.header_str("type").map(str::to_string),
            });
        }

        let mut nodes = Vec::new();
        for section in config.sections_of("node") {
            let Some(name) = section.header_str("name") else {
                sink.report(Diagnostic::new(
                    DiagnosticKind::MalformedScene,
                    "node section is missing its name",
                    virtual_path,
                ));
                continue;
            };
            let path_from_root = match section.header_str("parent") {
                None => ".".to_string(),
                Some(".") => name.to_string(),
                Some(parent) => format!("{}/{}", parent, name),
            };
            let groups = section
                .header
                .get("groups")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            nodes.push(SceneNode {
                name: name.to_string(),
                declared_type: section.header_str("type").map(str::to_string),
                path_from_root,
                groups,
                instance_resource_id: section.resource_id("instance"),
                script_resource_id: section.resource_id("script"),
                raw_properties: section.properties.clone(),
            });
        }

        let root_index = discover_root(&nodes, virtual_path, sink);

        Scene {
            resolved_path,
            virtual_path: virtual_path.to_string(),
            nodes,
            resources,
            root_index,
        }
    }
}

fn discover_root(nodes: &[SceneNode], virtual_path: &str, sink: &DiagnosticSink) -> Option<usize> {
    let mut roots = nodes.iter().enumerate().filter(|(_, n)| n.is_root());
    let first = roots.next();
    match (first, roots.next()) {
        (Some((index, _)), None) => Some(index),
        (Some((index, node)), Some(_)) => {
            sink.report(
                Diagnostic::new(
                    DiagnosticKind::MalformedScene,
                    "scene declares more than one root node; using the first",
                    virtual_path,
                )
                .for_node(&node.name),
            );
            Some(index)
        }
        (None, _) => {
            sink.report(Diagnostic::new(
                DiagnosticKind::MalformedScene,
                "scene declares no root node",
                virtual_path,
            ));
            None
        }
    }
}
