use serde_json::json;

use crate::config::{ConfigFile, Section};
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::project::{extract_exported_class, PathMap, Project, SourceFile};
use crate::resolve::{EffectiveType, Resolver};
use crate::scene::Scene;

fn ext_resource(id: u32, path: &str, kind: &str) -> Section {
    Section::new("ext_resource")
        .with_header("id", json!(id))
        .with_header("path", json!(path))
        .with_header("type", json!(kind))
}

fn node(name: &str, ty: Option<&str>, parent: Option<&str>) -> Section {
    let mut section = Section::new("node").with_header("name", json!(name));
    if let Some(ty) = ty {
        section = section.with_header("type", json!(ty));
    }
    if let Some(parent) = parent {
        section = section.with_header("parent", json!(parent));
    }
    section
}

fn scene_from(virtual_path: &str, sections: Vec<Section>, sink: &DiagnosticSink) -> Scene {
    let paths = PathMap::new("/proj");
    Scene::from_config(
        paths.to_filesystem(virtual_path),
        virtual_path,
        &ConfigFile::new(sections),
        &paths,
        sink,
    )
}

fn script_file(virtual_path: &str, source: &str) -> SourceFile {
    let paths = PathMap::new("/proj");
    SourceFile {
        resolved_path: paths.to_filesystem(virtual_path),
        virtual_path: virtual_path.to_string(),
        exported_class: extract_exported_class(source, virtual_path),
    }
}

fn project_with(scenes: Vec<Scene>, scripts: Vec<SourceFile>) -> Project {
    let mut project = Project::new(PathMap::new("/proj"));
    for scene in scenes {
        project.insert_scene(scene);
    }
    for script in scripts {
        project.insert_script(script);
    }
    project
}

/// Scene A instances scene B which instances scene C, whose root carries the
/// only concrete script in the chain.
fn instancing_chain(sink: &DiagnosticSink) -> Project {
    let scene_c = scene_from(
        "res://c.tscn",
        vec![
            ext_resource(1, "res://boss.ts", "Script"),
            node("C", Some("Node2D"), None).with_header("script", json!({ "id": 1 })),
        ],
        sink,
    );
    let scene_b = scene_from(
        "res://b.tscn",
        vec![
            ext_resource(1, "res://c.tscn", "PackedScene"),
            node("B", None, None).with_header("instance", json!({ "id": 1 })),
        ],
        sink,
    );
    let scene_a = scene_from(
        "res://a.tscn",
        vec![
            ext_resource(1, "res://b.tscn", "PackedScene"),
            node("A", None, None).with_header("instance", json!({ "id": 1 })),
        ],
        sink,
    );
    let boss = script_file("res://boss.ts", "export class Boss extends Node2D {}");
    project_with(vec![scene_a, scene_b, scene_c], vec![boss])
}

#[test]
fn children_exclude_override_entries() {
    let sink = DiagnosticSink::new();
    let sub_scene = scene_from(
        "res://enemy.tscn",
        vec![node("Enemy", Some("Node2D"), None)],
        &sink,
    );
    let scene = scene_from(
        "res://main.tscn",
        vec![
            ext_resource(1, "res://enemy.tscn", "PackedScene"),
            node("Main", Some("Node2D"), None),
            node("Hud", Some("Control"), Some(".")),
            node("Enemy", None, Some(".")).with_header("instance", json!({ "id": 1 })),
            // Property patch on a node inside the instanced sub-scene.
            node("Health", None, Some("Enemy")).with_property("value", json!(50)),
        ],
        &sink,
    );
    let project = project_with(vec![sub_scene], vec![]);
    let resolver = Resolver::new(&scene, &project, &sink);

    let root = scene.root().unwrap();
    let root_children = resolver.children(root).unwrap();
    let names: Vec<&str> = root_children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Hud", "Enemy"]);

    // The override is not a child of anything.
    let mut all_children = Vec::new();
    for n in &scene.nodes {
        all_children.extend(resolver.children(n).unwrap());
    }
    assert!(all_children.iter().all(|c| c.name != "Health"));
    assert!(sink.is_empty());
}

#[test]
fn override_test_requires_both_conditions() {
    let sink = DiagnosticSink::new();
    let sub_scene = scene_from(
        "res://enemy.tscn",
        vec![node("Enemy", Some("Node2D"), None)],
        &sink,
    );
    let scene = scene_from(
        "res://main.tscn",
        vec![
            ext_resource(1, "res://enemy.tscn", "PackedScene"),
            node("Main", Some("Node2D"), None),
            node("Typed", Some("Sprite2D"), Some(".")),
            node("Stamped", None, Some(".")).with_header("instance", json!({ "id": 1 })),
            node("Patched", None, Some("Stamped")),
        ],
        &sink,
    );
    let project = project_with(vec![sub_scene], vec![]);
    let resolver = Resolver::new(&scene, &project, &sink);

    // Type present, no instance: a plain declaration.
    assert!(!resolver.is_instance_override(&scene.nodes[1]).unwrap());
    // Type absent but a valid instance id: an instance, not an override.
    assert!(!resolver.is_instance_override(&scene.nodes[2]).unwrap());
    // Type absent, no instance: the override case.
    assert!(resolver.is_instance_override(&scene.nodes[3]).unwrap());
    assert!(sink.is_empty());
}

#[test]
fn instancing_resolves_transitively_to_the_scripted_type() {
    let sink = DiagnosticSink::new();
    let project = instancing_chain(&sink);
    let scene_a = project
        .scene_by_path(&PathMap::new("/proj").to_filesystem("res://a.tscn"))
        .unwrap();
    let resolver = Resolver::new(scene_a, &project, &sink);

    let resolved = resolver.effective_type(scene_a.root().unwrap()).unwrap();
    match resolved {
        EffectiveType::Script(class) => {
            assert_eq!(class.name, "Boss");
            assert_eq!(class.module_path, "res://boss.ts");
        }
        other => panic!("expected script type, got {:?}", other),
    }
    assert!(sink.is_empty());
}

#[test]
fn backing_script_is_inherited_from_the_instanced_root() {
    let sink = DiagnosticSink::new();
    let project = instancing_chain(&sink);
    let paths = PathMap::new("/proj");
    let scene_b = project.scene_by_path(&paths.to_filesystem("res://b.tscn")).unwrap();
    let scene_c = project.scene_by_path(&paths.to_filesystem("res://c.tscn")).unwrap();

    let via_instance = Resolver::new(scene_b, &project, &sink)
        .backing_script(scene_b.root().unwrap())
        .unwrap()
        .unwrap();
    let direct = Resolver::new(scene_c, &project, &sink)
        .backing_script(scene_c.root().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(via_instance.resolved_path, direct.resolved_path);
    assert!(sink.is_empty());
}

#[test]
fn mutually_instancing_scenes_degrade_with_a_report() {
    let sink = DiagnosticSink::new();
    // Hand-edited files can instance each other; resolution must not loop.
    let scene_a = scene_from(
        "res://a.tscn",
        vec![
            ext_resource(1, "res://b.tscn", "PackedScene"),
            node("A", None, None).with_header("instance", json!({ "id": 1 })),
        ],
        &sink,
    );
    let scene_b = scene_from(
        "res://b.tscn",
        vec![
            ext_resource(1, "res://a.tscn", "PackedScene"),
            node("B", None, None).with_header("instance", json!({ "id": 1 })),
        ],
        &sink,
    );
    let project = project_with(vec![scene_a, scene_b], vec![]);
    let scene_a = project
        .scene_by_path(&PathMap::new("/proj").to_filesystem("res://a.tscn"))
        .unwrap();
    let resolver = Resolver::new(scene_a, &project, &sink);

    let resolved = resolver.effective_type(scene_a.root().unwrap()).unwrap();
    assert_eq!(resolved, EffectiveType::Unknown);

    let diagnostics = sink.diagnostics();
    assert!(!diagnostics.is_empty());
    assert!(diagnostics
        .iter()
        .all(|d| d.kind == DiagnosticKind::MalformedScene));
}

#[test]
fn dangling_resource_id_is_an_internal_error() {
    let sink = DiagnosticSink::new();
    // Instance id 7 with no matching resource table entry: the file
    // contradicts itself, which no valid input can produce.
    let scene = scene_from(
        "res://broken.tscn",
        vec![node("Main", None, None).with_header("instance", json!({ "id": 7 }))],
        &sink,
    );
    let project = project_with(vec![], vec![]);
    let resolver = Resolver::new(&scene, &project, &sink);

    let root = scene.root().unwrap();
    assert!(resolver.instance(root).is_err());
    assert!(resolver.effective_type(root).is_err());
}

#[test]
fn missing_asset_degrades_with_a_diagnostic() {
    let sink = DiagnosticSink::new();
    // The table entry is fine; the file it points at left the project.
    let scene = scene_from(
        "res://stale.tscn",
        vec![
            ext_resource(1, "res://deleted.tscn", "PackedScene"),
            node("Main", None, None).with_header("instance", json!({ "id": 1 })),
        ],
        &sink,
    );
    let project = project_with(vec![], vec![]);
    let resolver = Resolver::new(&scene, &project, &sink);

    let root = scene.root().unwrap();
    let resolved = resolver.effective_type(root).unwrap();
    assert_eq!(resolved, EffectiveType::Unknown);
    assert_eq!(resolved.to_string(), "any");

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::MissingAsset);
    assert_eq!(diagnostics[0].node_path.as_deref(), Some("."));
}

#[test]
fn dangling_script_id_is_an_internal_error() {
    let sink = DiagnosticSink::new();
    let scene = scene_from(
        "res://broken.tscn",
        vec![node("Main", Some("Node2D"), None).with_header("script", json!({ "id": 5 }))],
        &sink,
    );
    let project = project_with(vec![], vec![]);
    let resolver = Resolver::new(&scene, &project, &sink);

    let root = scene.root().unwrap();
    assert!(resolver.backing_script(root).is_err());
    assert!(resolver.ts_type().is_err());
}

#[test]
fn scene_type_without_a_root_degrades_with_a_report() {
    let build_sink = DiagnosticSink::new();
    let scene = scene_from(
        "res://rootless.tscn",
        vec![node("Orphan", Some("Node2D"), Some("."))],
        &build_sink,
    );
    let project = project_with(vec![], vec![]);

    let sink = DiagnosticSink::new();
    let resolver = Resolver::new(&scene, &project, &sink);
    assert_eq!(resolver.ts_type().unwrap(), EffectiveType::Unknown);

    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnresolvedType);
}

#[test]
fn asking_an_override_for_its_type_is_an_internal_bug() {
    let sink = DiagnosticSink::new();
    let scene = scene_from(
        "res://main.tscn",
        vec![
            node("Main", Some("Node2D"), None),
            node("Patched", None, Some(".")),
        ],
        &sink,
    );
    let project = project_with(vec![], vec![]);
    let resolver = Resolver::new(&scene, &project, &sink);

    let resolved = resolver.effective_type(&scene.nodes[1]).unwrap();
    assert_eq!(resolved, EffectiveType::Unknown);
    assert_eq!(sink.diagnostics()[0].kind, DiagnosticKind::InternalBug);
}

#[test]
fn scene_type_falls_back_to_the_declared_root_type() {
    let sink = DiagnosticSink::new();
    let scene = scene_from(
        "res://plain.tscn",
        vec![node("Main", Some("Node2D"), None)],
        &sink,
    );
    let project = project_with(vec![], vec![]);
    let resolver = Resolver::new(&scene, &project, &sink);

    assert_eq!(
        resolver.ts_type().unwrap(),
        EffectiveType::Native("Node2D".to_string())
    );
    assert!(sink.is_empty());
}

#[test]
fn resolution_is_idempotent_over_an_unmodified_scene() {
    let sink = DiagnosticSink::new();
    let project = instancing_chain(&sink);
    let scene_a = project
        .scene_by_path(&PathMap::new("/proj").to_filesystem("res://a.tscn"))
        .unwrap();
    let resolver = Resolver::new(scene_a, &project, &sink);
    let root = scene_a.root().unwrap();

    let first = resolver.effective_type(root).unwrap();
    let second = resolver.effective_type(root).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        resolver.children(root).unwrap(),
        resolver.children(root).unwrap()
    );
    assert!(sink.is_empty());
}
