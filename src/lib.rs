#![forbid(unsafe_code)]

//! Pointer-following glow discs for X11. The engine mutates a retained
//! stage of styled nodes; the presenter mirrors that stage onto
//! override-redirect ARGB windows.

pub mod color;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod easing;
pub mod engine;
pub mod interact;
pub mod light;
pub mod presenter;
pub mod render;
pub mod settings;
pub mod stage;
pub mod sync;
pub mod x11_utils;
