//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Resolved-settings default values
pub mod defaults {
    /// Default blur radius in pixels
    pub const BLUR: f64 = 3.0;

    /// Default disc diameter in pixels
    pub const DIA: f64 = 100.0;

    /// Default blend mode name
    pub const BLEND: &str = "screen";

    /// Default shown opacity
    pub const OPACITY: f64 = 0.8;

    /// Default opacity transition easing name
    pub const EASING: &str = "ease-out";

    /// Default opacity transition duration in milliseconds
    pub const TIMING: f64 = 90.0;

    /// Default stacking order hint
    pub const ZINDEX: f64 = 0.0;

    /// Renderer fill used when a light resolves no color
    pub const COLOR: &str = "rgb(255, 255, 255)";
}

/// Class and attribute names attached to stage nodes
pub mod names {
    /// Class selector lights are found and created under
    pub const TARGET_CLASS: &str = ".searchlight";

    /// Class stamped on every template-created light
    pub const TEMPLATE_CLASS: &str = "srchLts-def";

    /// Class added to the stage root once blend support is confirmed
    pub const BLEND_CLASS: &str = "mix-blend-mode";

    /// Attribute marking the injected base style, and the attr-key prefix
    /// for per-light metadata
    pub const SENTINEL: &str = "srchlts";

    /// Prefix for per-light metadata attributes
    pub const DATA_PREFIX: &str = "data-";

    /// Default parent node name for created lights
    pub const PARENT: &str = "body";
}

/// Environment variable names read at startup
pub mod env {
    /// Log filter level for the fmt subscriber
    pub const LOG_LEVEL: &str = "LOG_LEVEL";

    /// Override for the disc diameter
    pub const DIA: &str = "SEARCHLIGHTS_DIA";

    /// Override for the blur radius
    pub const BLUR: &str = "SEARCHLIGHTS_BLUR";

    /// Override for the shown opacity
    pub const OPACITY: &str = "SEARCHLIGHTS_OPACITY";

    /// Override for the show/hide debounce duration
    pub const TIMING: &str = "SEARCHLIGHTS_TIMING";

    /// Override for the blend mode name
    pub const BLEND: &str = "SEARCHLIGHTS_BLEND";
}

/// Validation bounds applied to loaded configuration
pub mod limits {
    /// Largest accepted disc diameter in pixels
    pub const MAX_DIA: f64 = 4096.0;

    /// Largest accepted blur radius in pixels
    pub const MAX_BLUR: f64 = 512.0;

    /// Largest accepted debounce duration in milliseconds
    pub const MAX_TIMING: f64 = 60_000.0;
}

/// X11 protocol and rendering constants
pub mod x11 {
    /// ARGB color depth (32-bit: 8 bits each for Alpha, Red, Green, Blue)
    pub const ARGB_DEPTH: u8 = 32;

    /// Override redirect flag for unmanaged windows
    pub const OVERRIDE_REDIRECT: u32 = 1;

    /// RENDER major version carrying the extended blend operators
    pub const RENDER_BLEND_MAJOR: u32 = 0;

    /// RENDER minor version carrying the extended blend operators
    pub const RENDER_BLEND_MINOR: u32 = 11;

    /// Full-opacity value for _NET_WM_WINDOW_OPACITY
    pub const OPACITY_OPAQUE: u32 = u32::MAX;

    /// Cap on bytes per image upload request, kept under the server's
    /// maximum request size
    pub const UPLOAD_BAND_BYTES: usize = 262_144;
}

/// Animation stepping constants
pub mod animation {
    /// Presenter frame interval in milliseconds
    pub const FRAME_MS: u64 = 16;
}
