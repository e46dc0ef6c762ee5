//! Element synchronization
//!
//! Reconciles the stage with resolved settings. When nodes matching the
//! target class already exist they are adopted as-is, no creation happens
//! and the stage never ends up mixed. Otherwise one surface node is
//! created per resolved entry, classes and metadata applied, and all of
//! them inserted under the container in a single batch.
//!
//! Every light's bag is then rebuilt from the node it points at (global
//! settings overlaid by the node's attribute metadata), so created and
//! adopted lights flow through one code path.

use serde_json::Value;

use tracing::debug;

use crate::light::Light;
use crate::render;
use crate::settings::{LightSettings, Settings};
use crate::stage::{NodeId, NodeKind, Stage};

/// What synchronization produced. `Unavailable` is the no-collection
/// sentinel for a target class that cannot be queried at all; a valid but
/// empty collection is `Collection(vec![])`.
#[derive(Debug)]
pub enum SyncResult {
    Collection(Vec<Light>),
    Unavailable,
}

/// Reconcile the stage with the resolved settings.
///
/// `container` is the resolved parent for created nodes; `None` means the
/// configured parent was not found, in which case creation is skipped
/// outright and the collection holds only adopted nodes.
pub fn synchronize(stage: &mut Stage, settings: &Settings, container: Option<NodeId>) -> SyncResult {
    let target = settings.target_class.trim_start_matches('.');
    if target.is_empty() {
        debug!(selector = settings.target_class, "target class unqueryable");
        return SyncResult::Unavailable;
    }

    let existing = stage.query_class(target);
    if !existing.is_empty() {
        debug!(count = existing.len(), "adopting existing nodes");
        let lights = existing
            .into_iter()
            .map(|node| Light::new(node, render::bag_from_node(stage, node, settings), true))
            .collect();
        return SyncResult::Collection(lights);
    }

    if let Some(parent) = container {
        let mut created = Vec::new();
        for entry in &settings.lights {
            let node = stage.create(NodeKind::Surface);
            let classes = class_string(&entry.classes, &settings.target_class);
            stage.set_classes(node, classes.split_whitespace().map(String::from).collect());
            write_metadata(stage, node, entry);
            created.push(node);
        }
        if !created.is_empty() {
            stage.insert_batch(parent, &created);
        }
    } else if !settings.lights.is_empty() {
        debug!(count = settings.lights.len(), "no container, creation skipped");
    }

    // Refreshed collection from the stage, not the list we just built
    let refreshed = stage.query_class(target);
    let lights = refreshed
        .into_iter()
        .map(|node| Light::new(node, render::bag_from_node(stage, node, settings), false))
        .collect();
    SyncResult::Collection(lights)
}

/// Assemble the class string for a created node: entry classes plus the
/// target class, whitespace-trimmed, empties dropped, deduplicated
/// preserving first occurrence, literal periods stripped.
pub fn class_string(classes: &[String], target_class: &str) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut push = |raw: &str| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }
        let cleaned = trimmed.replace('.', "");
        if cleaned.is_empty() {
            return;
        }
        if !seen.iter().any(|c| c == &cleaned) {
            seen.push(cleaned);
        }
    };
    for class in classes {
        push(class);
    }
    push(target_class);
    seen.join(" ")
}

/// Write every present field of the entry onto the node as metadata.
/// Zero and empty-string values are written like any other; only absent
/// fields are skipped.
fn write_metadata(stage: &mut Stage, node: NodeId, entry: &LightSettings) {
    let mut set = |key: &str, value: String| {
        stage.set_attr(node, &format!("data-{key}"), &value);
    };
    set("dia", attr_value(&entry.dia));
    set("blur", attr_value(&entry.blur));
    set("blend", entry.blend.clone());
    set("opacity", attr_value(&entry.opacity));
    set("easing", entry.easing.clone());
    set("timing", attr_value(&entry.timing));
    set("zindex", attr_value(&entry.zindex));
    if let Some(color) = &entry.color {
        set("color", color.clone());
    }
    if let Some(width) = &entry.width {
        set("width", attr_value(width));
    }
    if let Some(height) = &entry.height {
        set("height", attr_value(height));
    }
    for (key, value) in &entry.extras {
        set(key, attr_value(value));
    }
}

/// Attribute text for a resolved value. Whole numbers drop the decimal
/// point so a numeric 100 round-trips as "100".
fn attr_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
