//! Disc rasterization
//!
//! Each light is a filled circle softened by a Gaussian-like blur,
//! rasterized on the CPU into the premultiplied ARGB buffer its stage node
//! owns. Geometry always uses absolute values: a negative diameter or blur
//! never produces a negative surface.
//!
//! A draw context carries the "searchlight bag": resolved global settings
//! overlaid by the node's own metadata attributes, metadata winning, so
//! paint and the show path never re-read settings. Non-surface nodes pass
//! through untouched and paint skips them.

use serde_json::Value;

use crate::color::Rgba;
use crate::constants::{defaults, names};
use crate::settings::{LightSettings, Settings};
use crate::stage::{NodeId, NodeKind, SkipReason, Stage, StyleOutcome, Surface};

/// Outcome of [`create_draw_context`]: a paintable context, or the node
/// handed back unchanged
#[derive(Debug)]
pub enum DrawTarget {
    Context(DrawContext),
    Passthrough(NodeId),
}

/// A surface node ready to paint, with its merged bag
#[derive(Debug)]
pub struct DrawContext {
    pub node: NodeId,
    pub bag: LightSettings,
    side: usize,
}

impl DrawContext {
    /// Square surface side in px
    pub fn side(&self) -> usize {
        self.side
    }
}

/// Merge resolved global settings with a node's metadata attributes,
/// metadata winning. Attribute values stay raw strings, coerced at point
/// of use; unrecognized keys ride along as extras.
pub fn bag_from_node(stage: &Stage, node: NodeId, settings: &Settings) -> LightSettings {
    let mut bag = LightSettings::from_globals(settings);
    if let Some(n) = stage.node(node) {
        for (key, value) in &n.attrs {
            if let Some(field) = key.strip_prefix(names::DATA_PREFIX) {
                apply_attr(&mut bag, field, value);
            }
        }
    }
    bag
}

fn apply_attr(bag: &mut LightSettings, key: &str, value: &str) {
    let raw = || Value::String(value.to_string());
    match key {
        "dia" => bag.dia = raw(),
        "blur" => bag.blur = raw(),
        "timing" => bag.timing = raw(),
        "zindex" => bag.zindex = raw(),
        "opacity" => bag.opacity = raw(),
        "blend" => bag.blend = value.to_string(),
        "easing" => bag.easing = value.to_string(),
        "color" => bag.color = Some(value.to_string()),
        "width" => bag.width = Some(raw()),
        "height" => bag.height = Some(raw()),
        _ => {
            bag.extras.insert(key.to_string(), raw());
        }
    }
}

/// Prepare a node for painting. Non-surface nodes pass through unchanged;
/// surface nodes are marked hidden pending first reveal and get their bag
/// and geometry resolved.
pub fn create_draw_context(stage: &mut Stage, node: NodeId, settings: &Settings) -> DrawTarget {
    match stage.node(node) {
        Some(n) if n.kind == NodeKind::Surface => {}
        _ => return DrawTarget::Passthrough(node),
    }
    let bag = bag_from_node(stage, node, settings);
    let dia = bag.dia_px().abs();
    let blur = bag.blur_px().abs();
    let side = (dia + 2.0 * blur).round() as usize;
    stage.set_hidden(node, true);
    DrawTarget::Context(DrawContext { node, bag, side })
}

/// Paint the disc into the node's surface buffer. Passthrough targets and
/// vanished nodes skip silently.
pub fn paint(stage: &mut Stage, target: &DrawTarget) -> StyleOutcome {
    let ctx = match target {
        DrawTarget::Context(ctx) => ctx,
        DrawTarget::Passthrough(_) => return StyleOutcome::Skipped(SkipReason::NotSurface),
    };
    let fill = ctx
        .bag
        .color
        .as_deref()
        .and_then(Rgba::parse)
        .or_else(|| Rgba::parse(defaults::COLOR))
        .unwrap_or(Rgba::WHITE);
    let surface = rasterize_disc(ctx.side, ctx.bag.dia_px().abs(), ctx.bag.blur_px().abs(), fill);
    stage.set_surface(ctx.node, surface)
}

/// Apply the center-on-point translate so positioning can use the raw
/// pointer coordinates. Passthrough targets skip.
pub fn center_on_point(stage: &mut Stage, target: &DrawTarget) -> StyleOutcome {
    match target {
        DrawTarget::Context(ctx) => {
            let half = ctx.side as f64 / 2.0;
            stage.set_translate(ctx.node, -half, -half)
        }
        DrawTarget::Passthrough(_) => StyleOutcome::Skipped(SkipReason::NotSurface),
    }
}

/// Hard disc coverage followed by three box-blur passes, which together
/// approximate a Gaussian of standard deviation `blur`
fn rasterize_disc(side: usize, dia: f64, blur: f64, fill: Rgba) -> Surface {
    if side == 0 {
        return Surface::default();
    }
    let radius = dia / 2.0;
    let center = radius + blur;
    let mut coverage = vec![0.0f64; side * side];
    for y in 0..side {
        for x in 0..side {
            let dx = x as f64 + 0.5 - center;
            let dy = y as f64 + 0.5 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            // 1px linear edge keeps the unblurred disc antialiased
            coverage[y * side + x] = (radius - dist + 0.5).clamp(0.0, 1.0);
        }
    }

    let r = blur.round() as usize;
    if r > 0 {
        let mut scratch = vec![0.0f64; side * side];
        for _ in 0..3 {
            box_pass_rows(&coverage, &mut scratch, side, r);
            box_pass_cols(&scratch, &mut coverage, side, r);
        }
    }

    let data = coverage.iter().map(|&c| fill.premultiplied(c)).collect();
    Surface { width: side as u32, height: side as u32, data }
}

/// Horizontal sliding-window average; pixels outside the row count as
/// transparent, which darkens edges the way blur onto empty padding should
fn box_pass_rows(src: &[f64], dst: &mut [f64], side: usize, r: usize) {
    let window = (2 * r + 1) as f64;
    for y in 0..side {
        let row = y * side;
        let mut acc = 0.0;
        for x in 0..=r.min(side - 1) {
            acc += src[row + x];
        }
        for x in 0..side {
            dst[row + x] = acc / window;
            let enter = x + r + 1;
            if enter < side {
                acc += src[row + enter];
            }
            if x >= r {
                acc -= src[row + x - r];
            }
        }
    }
}

fn box_pass_cols(src: &[f64], dst: &mut [f64], side: usize, r: usize) {
    let window = (2 * r + 1) as f64;
    for x in 0..side {
        let mut acc = 0.0;
        for y in 0..=r.min(side - 1) {
            acc += src[y * side + x];
        }
        for y in 0..side {
            dst[y * side + x] = acc / window;
            let enter = y + r + 1;
            if enter < side {
                acc += src[enter * side + x];
            }
            if y >= r {
                acc -= src[(y - r) * side + x];
            }
        }
    }
}
