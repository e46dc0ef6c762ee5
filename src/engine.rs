//! Engine lifecycle
//!
//! Owns the resolved settings, the live light collection, and the records
//! of adopted nodes lifted out at destroy time. Init always tears down the
//! previous session first, so repeated calls converge on the caller's
//! latest options instead of stacking lights.

use std::collections::HashSet;
use std::time::Instant;

use tracing::{debug, info};

use crate::constants::names;
use crate::interact::{self, Callbacks, PointerEvent};
use crate::light::Light;
use crate::render;
use crate::settings::{resolve, Options, Settings};
use crate::stage::{DetachedNode, NodeId, Stage};
use crate::sync::{synchronize, SyncResult};

/// What the display layer reported it can do. Blending is the hard
/// requirement; without it the engine refuses to start.
#[derive(Debug, Clone, Copy)]
pub struct PlatformCaps {
    pub blending: bool,
}

#[derive(Default)]
pub struct Searchlights {
    settings: Option<Settings>,
    lights: Vec<Light>,
    captured_preexisting: Vec<DetachedNode>,
    callbacks: Callbacks,
    active: bool,
}

impl Searchlights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn on_move(&mut self, cb: impl FnMut(&PointerEvent, &[Light]) + 'static) {
        self.callbacks.on_move = Some(Box::new(cb));
    }

    pub fn on_enter(&mut self, cb: impl FnMut(&PointerEvent, &[Light]) + 'static) {
        self.callbacks.on_enter = Some(Box::new(cb));
    }

    pub fn on_leave(&mut self, cb: impl FnMut(&PointerEvent, &[Light]) + 'static) {
        self.callbacks.on_leave = Some(Box::new(cb));
    }

    /// Start (or restart) a session from caller options.
    ///
    /// Without blend support this logs and leaves the engine inactive;
    /// nothing is created and no error is raised.
    pub fn init(&mut self, stage: &mut Stage, caps: PlatformCaps, opts: &Options) {
        self.destroy(stage);

        if !caps.blending {
            info!("display lacks blend support, searchlights stay off");
            return;
        }
        stage.add_class(stage.root(), names::BLEND_CLASS);

        let selector = opts
            .target_class
            .clone()
            .unwrap_or_else(|| names::TARGET_CLASS.to_string());
        let stage_has_targets = !stage.query_class(selector.trim_start_matches('.')).is_empty();
        let settings = resolve(opts, stage_has_targets);

        if settings.use_inline_styles {
            stage.install_base_style(names::SENTINEL, base_style_rule(&settings.target_class));
        }

        let container = stage.find_named(&settings.parent);
        if container.is_none() {
            debug!(parent = settings.parent, "container not found");
        }

        let lights = match synchronize(stage, &settings, container) {
            SyncResult::Collection(lights) => lights,
            SyncResult::Unavailable => {
                debug!("nothing to collect, init abandoned");
                stage.remove_base_style(names::SENTINEL);
                return;
            }
        };

        for light in &lights {
            let target = render::create_draw_context(stage, light.node, &settings);
            render::center_on_point(stage, &target);
            if settings.use_inline_styles {
                let bag = &light.bag;
                stage.set_blend(light.node, &bag.blend);
                stage.set_opacity(light.node, bag.opacity_value());
                stage.set_transition(light.node, bag.timing_ms(), &bag.easing);
                stage.set_zindex(light.node, bag.zindex_value());
            }
            render::paint(stage, &target);
        }

        info!(lights = lights.len(), "searchlights ready");
        self.lights = lights;
        self.settings = Some(settings);
        self.active = true;
    }

    /// Tear the session down: every node bearing the target class leaves
    /// the stage, the injected base style goes with it, and callbacks are
    /// cleared. Records of adopted nodes are kept for [`Self::build`].
    /// Without a live session this is a no-op, so nodes that merely look
    /// like targets are never scrubbed before they can be adopted.
    pub fn destroy(&mut self, stage: &mut Stage) {
        let Some(settings) = self.settings.take() else {
            return;
        };
        self.callbacks.reset();

        let adopted: HashSet<NodeId> = self
            .lights
            .iter()
            .filter(|l| l.preexisting)
            .map(|l| l.node)
            .collect();
        for id in stage.query_class(settings.target_class.trim_start_matches('.')) {
            if let Some(detached) = stage.remove(id) {
                if adopted.contains(&id) {
                    self.captured_preexisting.push(detached);
                }
            }
        }

        stage.remove_base_style(names::SENTINEL);
        self.lights.clear();
        self.active = false;
    }

    /// Put nodes captured at destroy back on the stage. With a target they
    /// all land under it, otherwise each returns to its recorded parent.
    /// Returns how many were restored; consumed records are gone.
    pub fn build(&mut self, stage: &mut Stage, target: Option<NodeId>) -> usize {
        if self.captured_preexisting.is_empty() {
            debug!("nothing captured, build skipped");
            return 0;
        }
        let mut restored = 0;
        for detached in self.captured_preexisting.drain(..) {
            match target {
                Some(parent) => stage.attach_under(detached, parent),
                None => {
                    let fallback = stage.root();
                    stage.attach(detached, fallback)
                }
            };
            restored += 1;
        }
        info!(restored, "rebuilt adopted nodes");
        restored
    }

    /// Forward a pointer event. Inactive sessions ignore input.
    pub fn handle_pointer(&mut self, stage: &mut Stage, event: &PointerEvent, now: Instant) {
        let Some(settings) = &self.settings else {
            return;
        };
        interact::handle_event(
            stage,
            &mut self.lights,
            &mut self.callbacks,
            settings.enable_show_hide,
            event,
            now,
        );
    }

    /// Fire any due show/hide timers
    pub fn tick(&mut self, stage: &mut Stage, now: Instant) {
        interact::tick(stage, &mut self.lights, now);
    }

    /// Earliest pending timer, for event loop timeouts
    pub fn next_deadline(&self) -> Option<Instant> {
        interact::next_deadline(&self.lights)
    }
}

fn base_style_rule(target_class: &str) -> String {
    format!(
        ".{} {} {{ position: absolute; will-change: transform, opacity, left, top; }}",
        names::BLEND_CLASS,
        target_class
    )
}
