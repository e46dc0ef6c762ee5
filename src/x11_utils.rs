use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::render::{self, ConnectionExt as RenderExt};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::constants::x11;
use crate::engine::PlatformCaps;

/// Shared display state threaded through the presenter
pub struct DisplayContext<'a> {
    pub conn: &'a RustConnection,
    pub screen: &'a Screen,
    pub atoms: &'a CachedAtoms,
    pub visual: ArgbVisual,
}

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub wm_window_opacity: Atom,
    pub wm_window_type: Atom,
    pub wm_window_type_notification: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        // Do all intern_atom roundtrips once at startup
        Ok(Self {
            wm_window_opacity: conn
                .intern_atom(false, b"_NET_WM_WINDOW_OPACITY")
                .context("Failed to intern _NET_WM_WINDOW_OPACITY atom")?
                .reply()
                .context("Failed to get reply for _NET_WM_WINDOW_OPACITY atom")?
                .atom,
            wm_window_type: conn
                .intern_atom(false, b"_NET_WM_WINDOW_TYPE")
                .context("Failed to intern _NET_WM_WINDOW_TYPE atom")?
                .reply()
                .context("Failed to get reply for _NET_WM_WINDOW_TYPE atom")?
                .atom,
            wm_window_type_notification: conn
                .intern_atom(false, b"_NET_WM_WINDOW_TYPE_NOTIFICATION")
                .context("Failed to intern _NET_WM_WINDOW_TYPE_NOTIFICATION atom")?
                .reply()
                .context("Failed to get reply for _NET_WM_WINDOW_TYPE_NOTIFICATION atom")?
                .atom,
        })
    }
}

/// A 32-bit visual with its colormap, for windows carrying real alpha
#[derive(Debug, Clone, Copy)]
pub struct ArgbVisual {
    pub visual: Visualid,
    pub colormap: Colormap,
    pub depth: u8,
}

pub fn create_argb_visual(conn: &RustConnection, screen: &Screen) -> Result<ArgbVisual> {
    let depth_info = screen
        .allowed_depths
        .iter()
        .find(|d| d.depth == x11::ARGB_DEPTH && !d.visuals.is_empty())
        .with_context(|| format!("no {}-bit visual on this screen", x11::ARGB_DEPTH))?;
    let visual = depth_info.visuals[0].visual_id;
    let colormap = conn.generate_id().context("Failed to allocate colormap id")?;
    conn.create_colormap(ColormapAlloc::NONE, colormap, screen.root, visual)
        .context("Failed to create ARGB colormap")?;
    debug!(visual = visual, "using ARGB visual");
    Ok(ArgbVisual { visual, colormap, depth: x11::ARGB_DEPTH })
}

/// Probe what the display can do. Blending requires RENDER at or past
/// the version that introduced the extended operators; an older server
/// reports its own version in the reply.
pub fn probe_caps(conn: &RustConnection) -> Result<PlatformCaps> {
    if conn
        .extension_information(render::X11_EXTENSION_NAME)
        .context("Failed to query extension table")?
        .is_none()
    {
        debug!("RENDER extension absent");
        return Ok(PlatformCaps { blending: false });
    }
    let reply = conn
        .render_query_version(x11::RENDER_BLEND_MAJOR, x11::RENDER_BLEND_MINOR)
        .context("Failed to query RENDER version")?
        .reply()
        .context("Failed to get reply for RENDER version query")?;
    let blending = (reply.major_version, reply.minor_version)
        >= (x11::RENDER_BLEND_MAJOR, x11::RENDER_BLEND_MINOR);
    debug!(
        major = reply.major_version,
        minor = reply.minor_version,
        blending = blending,
        "RENDER version probed"
    );
    Ok(PlatformCaps { blending })
}

/// Set _NET_WM_WINDOW_OPACITY; compositors scale the whole window by it
pub fn set_window_opacity(
    conn: &RustConnection,
    atoms: &CachedAtoms,
    window: Window,
    opacity: f64,
) -> Result<()> {
    let scaled = (opacity.clamp(0.0, 1.0) * x11::OPACITY_OPAQUE as f64).round() as u32;
    conn.change_property32(
        PropMode::REPLACE,
        window,
        atoms.wm_window_opacity,
        AtomEnum::CARDINAL,
        &[scaled],
    )
    .context("Failed to set window opacity property")?;
    Ok(())
}

/// One pointer poll against the root window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    pub x: i16,
    pub y: i16,
    pub on_screen: bool,
}

pub fn sample_pointer(conn: &RustConnection, root: Window) -> Result<PointerSample> {
    let reply = conn
        .query_pointer(root)
        .context("Failed to query pointer")?
        .reply()
        .context("Failed to get reply for pointer query")?;
    Ok(PointerSample { x: reply.root_x, y: reply.root_y, on_screen: reply.same_screen })
}
