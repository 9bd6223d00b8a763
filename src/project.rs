//! Project model: the full set of assets translation can resolve against.
//!
//! Holds every scene, source file and opaque model resource discovered under
//! the project root, plus the virtual-path mapping used by scene resource
//! tables. The resolver reads this and never mutates it.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ConfigFile;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::scene::Scene;

const VIRTUAL_PREFIX: &str = "res://";
const SOURCE_EXTENSION: &str = "ts";
const SCENE_EXTENSION: &str = "tscn";
const MODEL_EXTENSIONS: &[&str] = &["glb", "gltf", "obj"];

// ═══════════════════════════════════════════════════════════════════════════════
// VIRTUAL PATHS
// ═══════════════════════════════════════════════════════════════════════════════

/// Pure bidirectional mapping between engine-virtual `res://` paths and
/// filesystem paths under the project root.
#[derive(Debug, Clone)]
pub struct PathMap {
    project_root: PathBuf,
}

impl PathMap {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        PathMap {
            project_root: project_root.into(),
        }
    }

    pub fn to_filesystem(&self, virtual_path: &str) -> PathBuf {
        let relative = virtual_path.strip_prefix(VIRTUAL_PREFIX).unwrap_or(virtual_path);
        self.project_root.join(relative)
    }

    pub fn to_virtual(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
        format!(
            "{}{}",
            VIRTUAL_PREFIX,
            relative.to_string_lossy().replace('\\', "/")
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE FILES
// ═══════════════════════════════════════════════════════════════════════════════

/// Qualified reference to the class a source file exports: the file's module
/// path plus the exported symbol name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedClass {
    pub module_path: String,
    pub name: String,
}

impl fmt::Display for ExportedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module_path, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub resolved_path: PathBuf,
    pub virtual_path: String,
    pub exported_class: Option<ExportedClass>,
}

lazy_static! {
    static ref EXPORT_CLASS_RE: Regex = Regex::new(
        r"export\s+(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][A-Za-z0-9_$]*)"
    )
    .unwrap();
}

/// Extracts the exported class identifier from source text, if one exists.
pub fn extract_exported_class(source: &str, module_path: &str) -> Option<ExportedClass> {
    EXPORT_CLASS_RE.captures(source).map(|cap| ExportedClass {
        module_path: module_path.to_string(),
        name: cap[1].to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT
// ═══════════════════════════════════════════════════════════════════════════════

/// One project asset, looked up by resolved filesystem path.
#[derive(Debug, Clone, Copy)]
pub enum Asset<'a> {
    Scene(&'a Scene),
    Script(&'a SourceFile),
    /// Binary model resources are opaque: identified by path only.
    Model(&'a Path),
}

#[derive(Debug)]
pub struct Project {
    pub path_map: PathMap,
    scenes: HashMap<PathBuf, Scene>,
    scripts: HashMap<PathBuf, SourceFile>,
    models: HashSet<PathBuf>,
}

impl Project {
    pub fn new(path_map: PathMap) -> Self {
        Project {
            path_map,
            scenes: HashMap::new(),
            scripts: HashMap::new(),
            models: HashSet::new(),
        }
    }

    pub fn insert_scene(&mut self, scene: Scene) {
        self.scenes.insert(scene.resolved_path.clone(), scene);
    }

    pub fn insert_script(&mut self, script: SourceFile) {
        self.scripts.insert(script.resolved_path.clone(), script);
    }

    pub fn insert_model(&mut self, path: impl Into<PathBuf>) {
        self.models.insert(path.into());
    }

    pub fn scene_by_path(&self, path: &Path) -> Option<&Scene> {
        self.scenes.get(path)
    }

    pub fn script_by_path(&self, path: &Path) -> Option<&SourceFile> {
        self.scripts.get(path)
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    pub fn asset_by_path(&self, path: &Path) -> Option<Asset<'_>> {
        if let Some(scene) = self.scenes.get(path) {
            return Some(Asset::Scene(scene));
        }
        if let Some(found) = self.models.get(path) {
            return Some(Asset::Model(found.as_path()));
        }
        self.scripts.get(path).map(Asset::Script)
    }

    /// Walks the project tree and registers every recognized asset.
    ///
    /// Scene files are handed to `load_scene` (the section-format parser lives
    /// outside this crate); source files get their exported class extracted
    /// inline; model resources are registered by path only. Unreadable files
    /// are reported and skipped, never fatal.
    pub fn scan<F>(root: &Path, load_scene: F, sink: &DiagnosticSink) -> Project
    where
        F: Fn(&Path, &str) -> Option<ConfigFile>,
    {
        let mut project = Project::new(PathMap::new(root));

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let location = e
                        .path()
                        .map(|p| project.path_map.to_virtual(p))
                        .unwrap_or_else(|| root.to_string_lossy().into_owned());
                    eprintln!("[gdscribe] skipping unwalkable entry {}: {}", location, e);
                    sink.report(Diagnostic::new(
                        DiagnosticKind::MalformedScene,
                        &format!("failed to walk project tree: {}", e),
                        &location,
                    ));
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let virtual_path = project.path_map.to_virtual(path);

            if extension == SOURCE_EXTENSION {
                match fs::read_to_string(path) {
                    Ok(source) => project.insert_script(SourceFile {
                        resolved_path: path.to_path_buf(),
                        exported_class: extract_exported_class(&source, &virtual_path),
                        virtual_path,
                    }),
                    Err(e) => {
                        eprintln!("[gdscribe] skipping unreadable source {:?}: {}", path, e);
                        sink.report(Diagnostic::new(
                            DiagnosticKind::MalformedScene,
                            &format!("failed to read source file: {}", e),
                            &virtual_path,
                        ));
                    }
                }
            } else if extension == SCENE_EXTENSION {
                match fs::read_to_string(path) {
                    Ok(text) => {
                        if let Some(config) = load_scene(path, &text) {
                            project.insert_scene(Scene::from_config(
                                path.to_path_buf(),
                                &virtual_path,
                                &config,
                                &project.path_map,
                                sink,
                            ));
                        }
                    }
                    Err(e) => {
                        eprintln!("[gdscribe] skipping unreadable scene {:?}: {}", path, e);
                        sink.report(Diagnostic::new(
                            DiagnosticKind::MalformedScene,
                            &format!("failed to read scene file: {}", e),
                            &virtual_path,
                        ));
                    }
                }
            } else if MODEL_EXTENSIONS.contains(&extension) {
                project.insert_model(path);
            }
        }

        project
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_paths_round_trip() {
        let map = PathMap::new("/proj");
        let fs_path = map.to_filesystem("res://scenes/main.tscn");
        assert_eq!(fs_path, PathBuf::from("/proj/scenes/main.tscn"));
        assert_eq!(map.to_virtual(&fs_path), "res://scenes/main.tscn");
    }

    #[test]
    fn extracts_exported_class_name() {
        let source = "import { Node2D } from \"engine\";\nexport default class Player extends Node2D {\n}\n";
        let class = extract_exported_class(source, "res://player.ts").unwrap();
        assert_eq!(class.name, "Player");
        assert_eq!(class.module_path, "res://player.ts");
        assert_eq!(class.to_string(), "res://player.ts::Player");
    }

    #[test]
    fn source_without_exported_class_yields_none() {
        assert!(extract_exported_class("const x = 1;", "res://util.ts").is_none());
    }

    #[test]
    #[cfg(unix)]
    fn scan_reports_broken_links_and_keeps_walking() {
        let root = std::env::temp_dir().join("gdscribe-scan-broken-link");
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("player.ts"), "export class Player extends Node2D {}").unwrap();
        std::os::unix::fs::symlink(root.join("missing.ts"), root.join("dangling.ts")).unwrap();

        let sink = DiagnosticSink::new();
        let project = Project::scan(&root, |_, _| None, &sink);

        assert!(project.script_by_path(&root.join("player.ts")).is_some());
        let diagnostics = sink.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MalformedScene);

        let _ = fs::remove_dir_all(&root);
    }
}
