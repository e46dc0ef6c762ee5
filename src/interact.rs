//! Pointer interaction
//!
//! Stateless event forwarding over three pointer events. Move repositions
//! every light to the pointer point and re-triggers the show transition;
//! enter reveals; leave dims immediately and hides after each light's own
//! debounce. Timers are driven by [`tick`], which the engine calls with
//! the current instant.

use std::time::Instant;

use crate::light::Light;
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Move,
    Enter,
    Leave,
}

#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: f64,
    pub y: f64,
}

pub type PointerCallback = Box<dyn FnMut(&PointerEvent, &[Light])>;

/// User callbacks, explicit named slots; an absent slot is a no-op.
/// Destroy resets all three.
#[derive(Default)]
pub struct Callbacks {
    pub on_move: Option<PointerCallback>,
    pub on_enter: Option<PointerCallback>,
    pub on_leave: Option<PointerCallback>,
}

impl Callbacks {
    pub fn reset(&mut self) {
        self.on_move = None;
        self.on_enter = None;
        self.on_leave = None;
    }
}

/// Dispatch one pointer event across the live lights
pub fn handle_event(
    stage: &mut Stage,
    lights: &mut [Light],
    callbacks: &mut Callbacks,
    enable_show_hide: bool,
    event: &PointerEvent,
    now: Instant,
) {
    match event.kind {
        PointerKind::Move => {
            for light in lights.iter() {
                stage.set_position(light.node, event.x, event.y);
            }
            show_lights(stage, lights, now);
            if let Some(cb) = &mut callbacks.on_move {
                cb(event, lights);
            }
        }
        PointerKind::Enter => {
            show_lights(stage, lights, now);
            if let Some(cb) = &mut callbacks.on_enter {
                cb(event, lights);
            }
        }
        PointerKind::Leave => {
            if enable_show_hide {
                hide_lights(stage, lights, now);
            }
            if let Some(cb) = &mut callbacks.on_leave {
                cb(event, lights);
            }
        }
    }
}

/// Reveal every light now and schedule its opacity for after its quiet
/// period. A pending hide is cancelled; the reveal must win.
fn show_lights(stage: &mut Stage, lights: &mut [Light], now: Instant) {
    for light in lights.iter_mut() {
        stage.set_hidden(light.node, false);
        light.hide.cancel();
        light.show.trigger(now);
    }
}

/// Dim every light now and schedule the hidden flag for after its quiet
/// period
fn hide_lights(stage: &mut Stage, lights: &mut [Light], now: Instant) {
    for light in lights.iter_mut() {
        stage.set_opacity(light.node, 0.0);
        light.hide.trigger(now);
    }
}

/// Fire any due timers. Show applies the light's resolved opacity, hide
/// sets the hidden flag.
pub fn tick(stage: &mut Stage, lights: &mut [Light], now: Instant) {
    for light in lights.iter_mut() {
        if light.show.fire(now) {
            stage.set_opacity(light.node, light.bag.opacity_value());
        }
        if light.hide.fire(now) {
            stage.set_hidden(light.node, true);
        }
    }
}

/// Earliest pending timer deadline across all lights, for loop timeouts
pub fn next_deadline(lights: &[Light]) -> Option<Instant> {
    lights
        .iter()
        .flat_map(|l| [l.show.deadline(), l.hide.deadline()])
        .flatten()
        .min()
}
