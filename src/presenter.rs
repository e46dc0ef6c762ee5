//! X11 presentation of stage state
//!
//! Mirrors attached surface nodes onto override-redirect ARGB windows.
//! The stage stays authoritative; each sync pass diffs its state against
//! what was last pushed and sends only the changes. Opacity transitions
//! are stepped here with the node's easing curve, which is what turns the
//! engine's instant style writes into fades.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, error};
use x11rb::connection::Connection;
use x11rb::protocol::shape::{ConnectionExt as ShapeExt, SK, SO};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::constants::x11;
use crate::easing::Easing;
use crate::stage::{NodeId, NodeKind, Stage, Surface};
use crate::x11_utils::{set_window_opacity, DisplayContext};

/// An in-flight opacity fade
#[derive(Debug, Clone)]
struct OpacityAnim {
    from: f64,
    to: f64,
    start: Instant,
    duration_ms: f64,
    easing: Easing,
}

impl OpacityAnim {
    /// Eased value at `now` and whether the fade has finished. A finished
    /// fade reports the target exactly, never a float neighbour of it.
    fn value(&self, now: Instant) -> (f64, bool) {
        if self.duration_ms <= 0.0 {
            return (self.to, true);
        }
        let elapsed = now.duration_since(self.start).as_secs_f64() * 1000.0;
        let t = elapsed / self.duration_ms;
        if t >= 1.0 {
            return (self.to, true);
        }
        (self.from + (self.to - self.from) * self.easing.apply(t), false)
    }
}

#[derive(Debug)]
struct LightWindow {
    window: Window,
    gc: Gcontext,
    width: u16,
    height: u16,
    mapped: bool,
    pos: Option<(i32, i32)>,
    zindex: f64,
    target_opacity: f64,
    presented_opacity: f64,
    anim: Option<OpacityAnim>,
    needs_upload: bool,
}

pub struct Presenter<'a> {
    ctx: DisplayContext<'a>,
    windows: HashMap<NodeId, LightWindow>,
    stack_dirty: bool,
    seen_revision: Option<u64>,
}

impl<'a> Presenter<'a> {
    pub fn new(ctx: DisplayContext<'a>) -> Self {
        Presenter { ctx, windows: HashMap::new(), stack_dirty: false, seen_revision: None }
    }

    /// Push the current stage state to the display. Windows appear for
    /// newly attached surfaces, leave with detached ones, and track the
    /// position, opacity and visibility of their nodes in between. A frame
    /// with an unchanged stage revision and no pending fade or re-upload
    /// is skipped without touching the connection.
    pub fn sync(&mut self, stage: &Stage, now: Instant) -> Result<()> {
        let revision = stage.revision();
        if frame_clean(self.seen_revision, revision, &self.windows) {
            return Ok(());
        }

        let mut seen = Vec::new();
        for id in stage.tree_order() {
            let Some(node) = stage.node(id) else { continue };
            if node.kind != NodeKind::Surface {
                continue;
            }
            let Some(surface) = &node.surface else { continue };
            if surface.width == 0 || surface.height == 0 {
                continue;
            }
            seen.push(id);

            if !self.windows.contains_key(&id) {
                let win = Self::create_light_window(
                    &self.ctx,
                    surface.width as u16,
                    surface.height as u16,
                )?;
                self.windows.insert(id, win);
                self.stack_dirty = true;
            }
            let win = self
                .windows
                .get_mut(&id)
                .context("light window must exist after creation")?;

            let (w, h) = (surface.width as u16, surface.height as u16);
            if win.width != w || win.height != h {
                self.ctx
                    .conn
                    .configure_window(
                        win.window,
                        &ConfigureWindowAux::new().width(w as u32).height(h as u32),
                    )
                    .context(format!("Failed to resize light window {}", win.window))?;
                win.width = w;
                win.height = h;
                win.needs_upload = true;
            }
            if win.needs_upload {
                Self::upload(&self.ctx, win, surface)?;
                win.needs_upload = false;
            }

            let style = &node.style;
            let (dx, dy) = style.translate.unwrap_or((0.0, 0.0));
            let x = (style.left.unwrap_or(0.0) + dx).round() as i32;
            let y = (style.top.unwrap_or(0.0) + dy).round() as i32;
            if win.pos != Some((x, y)) {
                self.ctx
                    .conn
                    .configure_window(win.window, &ConfigureWindowAux::new().x(x).y(y))
                    .context(format!("Failed to move light window {}", win.window))?;
                win.pos = Some((x, y));
            }

            let zindex = style.zindex.unwrap_or(0.0);
            if zindex != win.zindex {
                win.zindex = zindex;
                self.stack_dirty = true;
            }

            let target = style.opacity.unwrap_or(1.0);
            if target != win.target_opacity {
                let (duration_ms, easing) = style
                    .transition
                    .as_ref()
                    .map(|t| (t.duration_ms.max(0.0), Easing::from_name(&t.easing)))
                    .unwrap_or((0.0, Easing::Linear));
                win.anim = Some(OpacityAnim {
                    from: win.presented_opacity,
                    to: target,
                    start: now,
                    duration_ms,
                    easing,
                });
                win.target_opacity = target;
            }
            if let Some(anim) = &win.anim {
                let (value, done) = anim.value(now);
                if value != win.presented_opacity {
                    set_window_opacity(self.ctx.conn, self.ctx.atoms, win.window, value)?;
                    win.presented_opacity = value;
                }
                if done {
                    win.anim = None;
                }
            }

            if style.hidden && win.mapped {
                self.ctx
                    .conn
                    .unmap_window(win.window)
                    .context(format!("Failed to unmap light window {}", win.window))?;
                win.mapped = false;
            } else if !style.hidden && !win.mapped {
                self.ctx
                    .conn
                    .map_window(win.window)
                    .context(format!("Failed to map light window {}", win.window))?;
                win.mapped = true;
            }
        }

        let stale: Vec<NodeId> =
            self.windows.keys().copied().filter(|id| !seen.contains(id)).collect();
        for id in stale {
            if let Some(win) = self.windows.remove(&id) {
                self.release(&win);
            }
        }

        if self.stack_dirty {
            self.restack(&seen)?;
            self.stack_dirty = false;
        }

        self.ctx.conn.flush().context("Failed to flush X11 connection after sync")?;
        self.seen_revision = Some(revision);
        Ok(())
    }

    /// Re-upload a window's pixels on the next sync, for Expose events
    pub fn mark_damaged(&mut self, window: Window) {
        if let Some(win) = self.windows.values_mut().find(|w| w.window == window) {
            win.needs_upload = true;
        }
    }

    fn create_light_window(
        ctx: &DisplayContext,
        width: u16,
        height: u16,
    ) -> Result<LightWindow> {
        let conn = ctx.conn;
        let window = conn.generate_id().context("Failed to generate light window id")?;
        conn.create_window(
            ctx.visual.depth,
            window,
            ctx.screen.root,
            0,
            0,
            width,
            height,
            0,
            WindowClass::INPUT_OUTPUT,
            ctx.visual.visual,
            &CreateWindowAux::new()
                .background_pixel(0)
                .border_pixel(0)
                .colormap(ctx.visual.colormap)
                .override_redirect(x11::OVERRIDE_REDIRECT)
                .event_mask(EventMask::EXPOSURE),
        )
        .context("Failed to create light window")?;

        // Cleanup guard so a failure below does not leak the window
        struct WindowGuard<'g> {
            conn: &'g RustConnection,
            window: Window,
            armed: bool,
        }

        impl Drop for WindowGuard<'_> {
            fn drop(&mut self) {
                if self.armed {
                    if let Err(e) = self.conn.destroy_window(self.window) {
                        error!("Failed to cleanup window {} after failed setup: {}", self.window, e);
                    }
                    let _ = self.conn.flush();
                }
            }
        }

        let mut guard = WindowGuard { conn, window, armed: true };

        // Empty input shape makes clicks fall through to whatever is below
        conn.shape_rectangles(SO::SET, SK::INPUT, ClipOrdering::UNSORTED, window, 0, 0, &[])
            .context("Failed to clear input shape")?;

        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            b"searchlights\0searchlights\0",
        )
        .context("Failed to set WM_CLASS")?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            ctx.atoms.wm_window_type,
            AtomEnum::ATOM,
            &[ctx.atoms.wm_window_type_notification],
        )
        .context("Failed to set window type")?;

        let gc = conn.generate_id().context("Failed to generate gc id")?;
        conn.create_gc(gc, window, &CreateGCAux::new().graphics_exposures(0))
            .context("Failed to create gc for light window")?;

        guard.armed = false;
        debug!(window = window, width = width, height = height, "light window created");
        Ok(LightWindow {
            window,
            gc,
            width,
            height,
            mapped: false,
            pos: None,
            zindex: 0.0,
            target_opacity: 0.0,
            presented_opacity: 0.0,
            anim: None,
            needs_upload: true,
        })
    }

    /// Upload the surface buffer in horizontal bands so no single request
    /// exceeds the server limit
    fn upload(ctx: &DisplayContext, win: &LightWindow, surface: &Surface) -> Result<()> {
        let width = surface.width as usize;
        let rows_per_band = rows_per_band(width * 4);
        let mut y = 0usize;
        while y < surface.height as usize {
            let rows = rows_per_band.min(surface.height as usize - y);
            let band = &surface.data[y * width..(y + rows) * width];
            ctx.conn
                .put_image(
                    ImageFormat::Z_PIXMAP,
                    win.window,
                    win.gc,
                    surface.width as u16,
                    rows as u16,
                    0,
                    y as i16,
                    0,
                    ctx.visual.depth,
                    &bgra_bytes(band),
                )
                .context(format!("Failed to upload image band at row {}", y))?;
            y += rows;
        }
        Ok(())
    }

    /// Stack windows bottom-up by zindex; ties keep tree order
    fn restack(&self, seen: &[NodeId]) -> Result<()> {
        let mut order: Vec<(f64, Window)> = seen
            .iter()
            .filter_map(|id| self.windows.get(id).map(|w| (w.zindex, w.window)))
            .collect();
        order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        for pair in order.windows(2) {
            self.ctx
                .conn
                .configure_window(
                    pair[1].1,
                    &ConfigureWindowAux::new().sibling(pair[0].1).stack_mode(StackMode::ABOVE),
                )
                .context(format!("Failed to restack light window {}", pair[1].1))?;
        }
        Ok(())
    }

    fn release(&self, win: &LightWindow) {
        if let Err(e) = self.ctx.conn.free_gc(win.gc) {
            error!("Failed to free GC {}: {}", win.gc, e);
        }
        if let Err(e) = self.ctx.conn.destroy_window(win.window) {
            error!("Failed to destroy window {}: {}", win.window, e);
        }
    }
}

impl Drop for Presenter<'_> {
    fn drop(&mut self) {
        for win in self.windows.values() {
            self.release(win);
        }
        if let Err(e) = self.ctx.conn.flush() {
            error!("Failed to flush X11 connection during cleanup: {}", e);
        }
    }
}

/// A frame is clean when the stage revision was already presented and no
/// window still has a fade or re-upload pending
fn frame_clean(seen: Option<u64>, revision: u64, windows: &HashMap<NodeId, LightWindow>) -> bool {
    seen == Some(revision) && windows.values().all(|w| w.anim.is_none() && !w.needs_upload)
}

/// Convert premultiplied ARGB u32 pixels to X11 native little-endian BGRA
fn bgra_bytes(pixels: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * 4);
    for pixel in pixels {
        out.push(*pixel as u8); // B
        out.push((pixel >> 8) as u8); // G
        out.push((pixel >> 16) as u8); // R
        out.push((pixel >> 24) as u8); // A
    }
    out
}

fn rows_per_band(row_bytes: usize) -> usize {
    if row_bytes == 0 {
        return 1;
    }
    (x11::UPLOAD_BAND_BYTES / row_bytes).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn anim(from: f64, to: f64, duration_ms: f64, easing: Easing) -> OpacityAnim {
        OpacityAnim { from, to, start: Instant::now(), duration_ms, easing }
    }

    fn settled_window() -> LightWindow {
        LightWindow {
            window: 1,
            gc: 1,
            width: 8,
            height: 8,
            mapped: true,
            pos: Some((0, 0)),
            zindex: 0.0,
            target_opacity: 0.8,
            presented_opacity: 0.8,
            anim: None,
            needs_upload: false,
        }
    }

    #[test]
    fn test_anim_zero_duration_jumps_to_target() {
        let a = anim(0.0, 0.8, 0.0, Easing::Linear);
        let (value, done) = a.value(a.start);
        assert_eq!(value, 0.8);
        assert!(done);
    }

    #[test]
    fn test_anim_linear_midpoint() {
        let a = anim(0.0, 1.0, 100.0, Easing::Linear);
        let (value, done) = a.value(a.start + Duration::from_millis(50));
        assert!((value - 0.5).abs() < 1e-9);
        assert!(!done);
    }

    #[test]
    fn test_anim_clamps_past_the_end() {
        let a = anim(0.2, 0.9, 100.0, Easing::EaseOut);
        let (value, done) = a.value(a.start + Duration::from_millis(250));
        assert_eq!(value, 0.9);
        assert!(done);
    }

    #[test]
    fn test_anim_fade_out_descends() {
        let a = anim(0.8, 0.0, 100.0, Easing::Linear);
        let (early, _) = a.value(a.start + Duration::from_millis(25));
        let (late, _) = a.value(a.start + Duration::from_millis(75));
        assert!(early > late);
        assert!(late > 0.0);
    }

    #[test]
    fn test_settled_frame_with_same_revision_is_clean() {
        let mut windows = HashMap::new();
        windows.insert(Stage::new().root(), settled_window());
        assert!(frame_clean(Some(4), 4, &windows));
        assert!(!frame_clean(Some(3), 4, &windows), "stage changed");
        assert!(!frame_clean(None, 4, &windows), "nothing presented yet");
    }

    #[test]
    fn test_pending_fade_or_upload_blocks_the_skip() {
        let id = Stage::new().root();

        let mut fading = settled_window();
        fading.anim = Some(anim(0.0, 0.8, 100.0, Easing::Linear));
        let windows = HashMap::from([(id, fading)]);
        assert!(!frame_clean(Some(4), 4, &windows));

        let mut damaged = settled_window();
        damaged.needs_upload = true;
        let windows = HashMap::from([(id, damaged)]);
        assert!(!frame_clean(Some(4), 4, &windows));
    }

    #[test]
    fn test_bgra_byte_order() {
        let bytes = bgra_bytes(&[0xAA112233]);
        assert_eq!(bytes, vec![0x33, 0x22, 0x11, 0xAA]);
    }

    #[test]
    fn test_rows_per_band_never_zero() {
        assert_eq!(rows_per_band(0), 1);
        assert!(rows_per_band(x11::UPLOAD_BAND_BYTES * 10) >= 1);
        assert_eq!(rows_per_band(4), x11::UPLOAD_BAND_BYTES / 4);
    }
}
