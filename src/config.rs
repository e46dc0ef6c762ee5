//! Caller options from disk and environment
//!
//! Options live in a TOML file under the user config directory. A missing
//! file means built-in defaults, a malformed one is logged and ignored
//! rather than taking the process down. `SEARCHLIGHTS_*` environment
//! variables override file values, and numeric fields are clamped to sane
//! ranges before resolution sees them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::constants::{env as env_vars, limits};
use crate::settings::{coerce_number, LightOptions, Options};

const APP_DIR: &str = "searchlights";
const FILENAME: &str = "config.toml";

pub fn config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path.push(FILENAME);
    path
}

pub fn from_toml(contents: &str) -> Result<Options> {
    toml::from_str(contents).context("invalid options TOML")
}

/// Load options from `explicit` or the default path, fold environment
/// overrides on top, and clamp. Never fails; the worst input degrades to
/// defaults.
pub fn load(explicit: Option<&Path>) -> Options {
    let path = explicit.map(Path::to_path_buf).unwrap_or_else(config_path);
    let mut opts = match fs::read_to_string(&path) {
        Ok(contents) => match from_toml(&contents) {
            Ok(opts) => {
                debug!(path = %path.display(), "options file loaded");
                opts
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to parse options file, using defaults");
                Options::default()
            }
        },
        Err(_) => {
            debug!(path = %path.display(), "no options file, using defaults");
            Options::default()
        }
    };
    apply_env_overrides(&mut opts);
    validate_and_clamp(&mut opts);
    opts
}

fn parse_env_num(var: &str) -> Option<f64> {
    let raw = env::var(var).ok()?;
    raw.trim()
        .parse::<f64>()
        .inspect_err(|e| error!(var = var, error = %e, "failed to parse env var"))
        .ok()
        .filter(|n| n.is_finite())
}

fn apply_env_overrides(opts: &mut Options) {
    if let Some(dia) = parse_env_num(env_vars::DIA) {
        debug!(var = env_vars::DIA, value = dia, "environment override");
        opts.dia = Some(number(dia));
    }
    if let Some(blur) = parse_env_num(env_vars::BLUR) {
        debug!(var = env_vars::BLUR, value = blur, "environment override");
        opts.blur = Some(number(blur));
    }
    if let Some(opacity) = parse_env_num(env_vars::OPACITY) {
        debug!(var = env_vars::OPACITY, value = opacity, "environment override");
        opts.opacity = Some(number(opacity));
    }
    if let Some(timing) = parse_env_num(env_vars::TIMING) {
        debug!(var = env_vars::TIMING, value = timing, "environment override");
        opts.timing = Some(number(timing));
    }
    if let Ok(blend) = env::var(env_vars::BLEND) {
        debug!(var = env_vars::BLEND, value = blend.as_str(), "environment override");
        opts.blend = Some(blend);
    }
}

/// Clamp numeric fields to safe ranges. Anything that does not coerce to
/// a number is left alone; resolution falls back to defaults for those.
fn validate_and_clamp(opts: &mut Options) {
    clamp_field(&mut opts.opacity, "opacity", 0.0, 1.0);
    clamp_field(&mut opts.dia, "dia", -limits::MAX_DIA, limits::MAX_DIA);
    clamp_field(&mut opts.blur, "blur", -limits::MAX_BLUR, limits::MAX_BLUR);
    clamp_field(&mut opts.timing, "timing", 0.0, limits::MAX_TIMING);
    if let Some(lights) = &mut opts.lights {
        for entry in lights.iter_mut() {
            clamp_light(entry);
        }
    }
}

fn clamp_light(entry: &mut LightOptions) {
    clamp_field(&mut entry.opacity, "lights.opacity", 0.0, 1.0);
    clamp_field(&mut entry.dia, "lights.dia", -limits::MAX_DIA, limits::MAX_DIA);
    clamp_field(&mut entry.blur, "lights.blur", -limits::MAX_BLUR, limits::MAX_BLUR);
    clamp_field(&mut entry.timing, "lights.timing", 0.0, limits::MAX_TIMING);
}

fn clamp_field(field: &mut Option<Value>, name: &str, min: f64, max: f64) {
    let Some(value) = field.as_ref() else { return };
    let Some(n) = coerce_number(value) else { return };
    if n < min {
        warn!(field = name, value = n, min = min, "value below minimum, clamping");
        *field = Some(number(min));
    } else if n > max {
        warn!(field = name, value = n, max = max, "value exceeds maximum, clamping");
        *field = Some(number(max));
    }
}

/// Whole numbers become integer values so round-trips stay clean
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_toml_reads_globals_and_lights() {
        let opts = from_toml(
            r#"
dia = 80
blend = "overlay"
glow = "extra"

[[lights]]
color = "rgb(255,0,0)"
timing = 400

[[lights]]
color = "rgb(0,0,255)"
"#,
        )
        .unwrap();

        assert_eq!(opts.dia, Some(json!(80)));
        assert_eq!(opts.blend.as_deref(), Some("overlay"));
        assert_eq!(opts.extras.get("glow"), Some(&json!("extra")));
        let lights = opts.lights.unwrap();
        assert_eq!(lights.len(), 2);
        assert_eq!(lights[0].timing, Some(json!(400)));
        assert_eq!(lights[1].color.as_deref(), Some("rgb(0,0,255)"));
    }

    #[test]
    fn test_from_toml_rejects_bad_syntax() {
        assert!(from_toml("dia = [unclosed").is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let opts = load(Some(Path::new("/nonexistent/searchlights.toml")));
        assert_eq!(opts.dia, None);
        assert_eq!(opts.lights, None);
    }

    #[test]
    fn test_clamp_opacity_into_unit_range() {
        let mut opts = Options { opacity: Some(json!(1.5)), ..Default::default() };
        validate_and_clamp(&mut opts);
        assert_eq!(opts.opacity, Some(json!(1)));

        let mut opts = Options { opacity: Some(json!(-0.2)), ..Default::default() };
        validate_and_clamp(&mut opts);
        assert_eq!(opts.opacity, Some(json!(0)));
    }

    #[test]
    fn test_clamp_dia_magnitude_both_signs() {
        let mut opts = Options { dia: Some(json!(99999)), ..Default::default() };
        validate_and_clamp(&mut opts);
        assert_eq!(opts.dia, Some(json!(4096)));

        let mut opts = Options { dia: Some(json!(-99999)), ..Default::default() };
        validate_and_clamp(&mut opts);
        assert_eq!(opts.dia, Some(json!(-4096)));
    }

    #[test]
    fn test_clamp_negative_timing_to_zero() {
        let mut opts = Options { timing: Some(json!(-50)), ..Default::default() };
        validate_and_clamp(&mut opts);
        assert_eq!(opts.timing, Some(json!(0)));
    }

    #[test]
    fn test_clamp_leaves_string_values_alone() {
        let mut opts = Options { opacity: Some(json!("max")), ..Default::default() };
        validate_and_clamp(&mut opts);
        assert_eq!(opts.opacity, Some(json!("max")));
    }

    #[test]
    fn test_clamp_applies_to_light_entries() {
        let mut opts = Options {
            lights: Some(vec![LightOptions {
                blur: Some(json!(10_000)),
                ..Default::default()
            }]),
            ..Default::default()
        };
        validate_and_clamp(&mut opts);
        assert_eq!(opts.lights.unwrap()[0].blur, Some(json!(512)));
    }

    #[test]
    fn test_in_range_values_pass_untouched() {
        let mut opts = Options {
            dia: Some(json!(120.5)),
            opacity: Some(json!(0.4)),
            ..Default::default()
        };
        validate_and_clamp(&mut opts);
        assert_eq!(opts.dia, Some(json!(120.5)));
        assert_eq!(opts.opacity, Some(json!(0.4)));
    }
}
