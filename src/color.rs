//! Color parsing and packing
//!
//! Lights describe their fill in css-ish notation (`rgb(255, 0, 0)`,
//! `#ff0000`, a handful of keywords). This module parses those forms and
//! packs channels into the ARGB32 layout the renderer and X11 expect.

/// A parsed fill color, unpremultiplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 255 };

    /// Parse a css-ish color string. Returns None for anything unrecognized;
    /// callers fall back to their resolved default fill.
    ///
    /// Accepted forms: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` (a in 0..=1), and a small keyword set.
    pub fn parse(s: &str) -> Option<Rgba> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let lower = s.to_ascii_lowercase();
        if let Some(body) = lower.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
            return Self::parse_channels(body, true);
        }
        if let Some(body) = lower.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            return Self::parse_channels(body, false);
        }
        Self::keyword(&lower)
    }

    fn parse_hex(hex: &str) -> Option<Rgba> {
        let nib = |c: u8| (c as char).to_digit(16).map(|d| d as u8);
        let bytes = hex.as_bytes();
        match bytes.len() {
            // #rgb expands each nibble, css-style
            3 => {
                let r = nib(bytes[0])?;
                let g = nib(bytes[1])?;
                let b = nib(bytes[2])?;
                Some(Rgba { r: r * 17, g: g * 17, b: b * 17, a: 255 })
            }
            6 | 8 => {
                let byte = |i: usize| Some(nib(bytes[i])? * 16 + nib(bytes[i + 1])?);
                let r = byte(0)?;
                let g = byte(2)?;
                let b = byte(4)?;
                let a = if bytes.len() == 8 { byte(6)? } else { 255 };
                Some(Rgba { r, g, b, a })
            }
            _ => None,
        }
    }

    fn parse_channels(body: &str, with_alpha: bool) -> Option<Rgba> {
        let mut parts = body.split(',').map(str::trim);
        let mut chan = || parts.next()?.parse::<f64>().ok();
        let r = chan()?;
        let g = chan()?;
        let b = chan()?;
        let a = if with_alpha { chan()? * 255.0 } else { 255.0 };
        if parts.next().is_some() {
            return None;
        }
        let clamp = |v: f64| v.clamp(0.0, 255.0).round() as u8;
        Some(Rgba { r: clamp(r), g: clamp(g), b: clamp(b), a: clamp(a) })
    }

    fn keyword(name: &str) -> Option<Rgba> {
        let (r, g, b) = match name {
            "red" => (255, 0, 0),
            "green" => (0, 128, 0),
            "lime" => (0, 255, 0),
            "blue" => (0, 0, 255),
            "white" => (255, 255, 255),
            "black" => (0, 0, 0),
            "yellow" => (255, 255, 0),
            "cyan" | "aqua" => (0, 255, 255),
            "magenta" | "fuchsia" => (255, 0, 255),
            "orange" => (255, 165, 0),
            _ => return None,
        };
        Some(Rgba { r, g, b, a: 255 })
    }

    /// Pack into ARGB32 with channels premultiplied by `coverage` (0..=1)
    /// and the color's own alpha. X RENDER expects premultiplied pixels.
    pub fn premultiplied(self, coverage: f64) -> u32 {
        let a = (self.a as f64 / 255.0) * coverage.clamp(0.0, 1.0);
        let mul = |c: u8| ((c as f64) * a).round() as u32;
        ((a * 255.0).round() as u32) << 24 | mul(self.r) << 16 | mul(self.g) << 8 | mul(self.b)
    }
}
