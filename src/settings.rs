//! Options model and settings resolution
//!
//! Callers hand in a sparse [`Options`] bag; resolution folds it over the
//! built-in defaults into a fully populated [`Settings`] value. Per-light
//! entries resolve through a three-way chain: the entry's own field wins,
//! then the caller's global field, then the default. The template light
//! list only participates when the caller supplies no per-light array.
//!
//! Numeric-ish fields (`dia`, `blur`, `timing`, `zindex`, `opacity`) are
//! kept exactly as supplied, number or string, and coerced at point of
//! use; a value that fails coercion falls back to the default for that
//! key, never to zero.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{defaults, names};

/// Caller-supplied options, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dia: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zindex: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Global-level classes never flow into per-light entries; the field
    /// exists so the key is captured instead of landing in `extras`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,

    /// Per-light overrides; when present, replaces the template list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lights: Option<Vec<LightOptions>>,

    /// Parent node created lights are inserted under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Class selector lights are found and created with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_inline_styles: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_show_hide: Option<bool>,

    /// Unrecognized keys ride along untouched
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

/// One caller-supplied per-light entry, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dia: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zindex: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

/// Fully resolved settings; every light in `lights` is complete
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub blur: Value,
    pub dia: Value,
    pub blend: String,
    pub opacity: Value,
    pub easing: String,
    pub timing: Value,
    pub zindex: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub lights: Vec<LightSettings>,
    pub parent: String,
    pub target_class: String,
    pub use_inline_styles: bool,
    pub enable_show_hide: bool,
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

/// Resolved per-light settings bag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightSettings {
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub dia: Value,
    pub blur: Value,
    pub blend: String,
    pub opacity: Value,
    pub easing: String,
    pub timing: Value,
    pub zindex: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

/// The template light list used when a caller supplies no per-light array
pub fn template_lights() -> Vec<LightOptions> {
    vec![
        template_light("red", "rgb(255,0,0)", 400),
        template_light("green", "rgb(0,255,0)", 425),
        template_light("blue", "rgb(0,0,255)", 475),
    ]
}

fn template_light(name: &str, color: &str, timing: u64) -> LightOptions {
    LightOptions {
        classes: Some(vec![name.to_string(), names::TEMPLATE_CLASS.to_string()]),
        color: Some(color.to_string()),
        dia: Some(Value::from(defaults::DIA)),
        blur: Some(Value::from(defaults::BLUR)),
        blend: Some(defaults::BLEND.to_string()),
        opacity: Some(Value::from(defaults::OPACITY)),
        timing: Some(Value::from(timing)),
        ..Default::default()
    }
}

/// Resolve caller options over the defaults table.
///
/// `stage_has_targets` reports whether nodes matching the target class
/// already exist; when they do and the caller supplied no per-light array,
/// the template is dropped so adoption does not spawn extra lights.
pub fn resolve(opts: &Options, stage_has_targets: bool) -> Settings {
    let lights = match &opts.lights {
        Some(callers) => callers
            .iter()
            .map(|entry| resolve_light(Some(entry), opts, None))
            .collect(),
        None if stage_has_targets => Vec::new(),
        None => template_lights()
            .iter()
            .map(|entry| resolve_light(None, opts, Some(entry)))
            .collect(),
    };

    Settings {
        blur: opts.blur.clone().unwrap_or_else(|| Value::from(defaults::BLUR)),
        dia: opts.dia.clone().unwrap_or_else(|| Value::from(defaults::DIA)),
        blend: opts.blend.clone().unwrap_or_else(|| defaults::BLEND.to_string()),
        opacity: opts.opacity.clone().unwrap_or_else(|| Value::from(defaults::OPACITY)),
        easing: opts.easing.clone().unwrap_or_else(|| defaults::EASING.to_string()),
        timing: opts.timing.clone().unwrap_or_else(|| Value::from(defaults::TIMING)),
        zindex: opts.zindex.clone().unwrap_or_else(|| Value::from(defaults::ZINDEX)),
        width: opts.width.clone(),
        height: opts.height.clone(),
        color: opts.color.clone(),
        lights,
        parent: opts.parent.clone().unwrap_or_else(|| names::PARENT.to_string()),
        target_class: opts
            .target_class
            .clone()
            .unwrap_or_else(|| names::TARGET_CLASS.to_string()),
        use_inline_styles: opts.use_inline_styles.unwrap_or(true),
        enable_show_hide: opts.enable_show_hide.unwrap_or(true),
        extras: opts.extras.clone(),
    }
}

/// Resolve one light through the chain: entry field, then caller global,
/// then template field, then default. `classes` only ever comes from the
/// entry (or the template standing in for it), never from the global level.
fn resolve_light(
    entry: Option<&LightOptions>,
    globals: &Options,
    template: Option<&LightOptions>,
) -> LightSettings {
    let pick = |c: &Option<Value>, g: &Option<Value>, t: &Option<Value>, d: Value| {
        c.clone().or_else(|| g.clone()).or_else(|| t.clone()).unwrap_or(d)
    };
    let pick_str = |c: &Option<String>, g: &Option<String>, t: &Option<String>, d: &str| {
        c.clone()
            .or_else(|| g.clone())
            .or_else(|| t.clone())
            .unwrap_or_else(|| d.to_string())
    };
    let none_v = None;
    let none_s = None;
    let none_c = None;
    let (c_dia, c_blur, c_blend, c_opacity, c_easing, c_timing, c_zindex, c_width, c_height) =
        match entry {
            Some(e) => (
                &e.dia, &e.blur, &e.blend, &e.opacity, &e.easing, &e.timing, &e.zindex, &e.width,
                &e.height,
            ),
            None => (
                &none_v, &none_v, &none_s, &none_v, &none_s, &none_v, &none_v, &none_v, &none_v,
            ),
        };
    let (t_dia, t_blur, t_blend, t_opacity, t_easing, t_timing, t_zindex) = match template {
        Some(t) => (&t.dia, &t.blur, &t.blend, &t.opacity, &t.easing, &t.timing, &t.zindex),
        None => (&none_v, &none_v, &none_s, &none_v, &none_s, &none_v, &none_v),
    };

    let classes = entry
        .map(|e| &e.classes)
        .unwrap_or(&none_c)
        .clone()
        .or_else(|| template.and_then(|t| t.classes.clone()))
        .unwrap_or_default();
    let color = entry
        .and_then(|e| e.color.clone())
        .or_else(|| globals.color.clone())
        .or_else(|| template.and_then(|t| t.color.clone()));

    // Lowest layer first so higher layers override on key collision
    let mut extras = template.map(|t| t.extras.clone()).unwrap_or_default();
    extras.extend(globals.extras.clone());
    if let Some(e) = entry {
        extras.extend(e.extras.clone());
    }
    // An entry cannot nest its own per-light array
    extras.remove("lights");

    LightSettings {
        classes,
        color,
        dia: pick(c_dia, &globals.dia, t_dia, Value::from(defaults::DIA)),
        blur: pick(c_blur, &globals.blur, t_blur, Value::from(defaults::BLUR)),
        blend: pick_str(c_blend, &globals.blend, t_blend, defaults::BLEND),
        opacity: pick(c_opacity, &globals.opacity, t_opacity, Value::from(defaults::OPACITY)),
        easing: pick_str(c_easing, &globals.easing, t_easing, defaults::EASING),
        timing: pick(c_timing, &globals.timing, t_timing, Value::from(defaults::TIMING)),
        zindex: pick(c_zindex, &globals.zindex, t_zindex, Value::from(defaults::ZINDEX)),
        width: c_width.clone().or_else(|| globals.width.clone()),
        height: c_height.clone().or_else(|| globals.height.clone()),
        extras,
    }
}

/// Coerce a resolved value to a finite number. Numbers pass through,
/// numeric strings parse, everything else (including NaN) is None.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

impl LightSettings {
    /// Baseline bag for an adopted node: global scalars, no classes.
    /// Attribute metadata is layered on top by the synchronizer.
    pub fn from_globals(settings: &Settings) -> Self {
        LightSettings {
            classes: Vec::new(),
            color: settings.color.clone(),
            dia: settings.dia.clone(),
            blur: settings.blur.clone(),
            blend: settings.blend.clone(),
            opacity: settings.opacity.clone(),
            easing: settings.easing.clone(),
            timing: settings.timing.clone(),
            zindex: settings.zindex.clone(),
            width: settings.width.clone(),
            height: settings.height.clone(),
            extras: settings.extras.clone(),
        }
    }

    /// Diameter in px; invalid values fall back to the default, never zero
    pub fn dia_px(&self) -> f64 {
        coerce_number(&self.dia).unwrap_or(defaults::DIA)
    }

    /// Blur radius in px; invalid values fall back to the default
    pub fn blur_px(&self) -> f64 {
        coerce_number(&self.blur).unwrap_or(defaults::BLUR)
    }

    /// Debounce and transition duration in ms; invalid values fall back
    /// to the default, negatives are treated as zero
    pub fn timing_ms(&self) -> f64 {
        coerce_number(&self.timing).unwrap_or(defaults::TIMING).max(0.0)
    }

    /// Shown opacity in 0..=1; invalid values fall back to the default
    pub fn opacity_value(&self) -> f64 {
        coerce_number(&self.opacity).unwrap_or(defaults::OPACITY).clamp(0.0, 1.0)
    }

    /// Stacking hint; invalid values fall back to the default
    pub fn zindex_value(&self) -> f64 {
        coerce_number(&self.zindex).unwrap_or(defaults::ZINDEX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn light(entries: &[(&str, Value)]) -> LightOptions {
        let mut opts = LightOptions::default();
        for (key, value) in entries {
            match *key {
                "dia" => opts.dia = Some(value.clone()),
                "blur" => opts.blur = Some(value.clone()),
                "blend" => opts.blend = value.as_str().map(String::from),
                "opacity" => opts.opacity = Some(value.clone()),
                "easing" => opts.easing = value.as_str().map(String::from),
                "timing" => opts.timing = Some(value.clone()),
                "zindex" => opts.zindex = Some(value.clone()),
                "color" => opts.color = value.as_str().map(String::from),
                other => {
                    opts.extras.insert(other.to_string(), value.clone());
                }
            }
        }
        opts
    }

    #[test]
    fn test_empty_options_resolve_to_template() {
        let s = resolve(&Options::default(), false);
        assert_eq!(s.blur, json!(3.0));
        assert_eq!(s.dia, json!(100.0));
        assert_eq!(s.blend, "screen");
        assert_eq!(s.opacity, json!(0.8));
        assert_eq!(s.easing, "ease-out");
        assert_eq!(s.timing, json!(90.0));
        assert_eq!(s.zindex, json!(0.0));
        assert!(s.width.is_none());
        assert!(s.color.is_none());
        assert_eq!(s.parent, "body");
        assert_eq!(s.target_class, ".searchlight");
        assert!(s.use_inline_styles);
        assert!(s.enable_show_hide);

        assert_eq!(s.lights.len(), 3);
        let red = &s.lights[0];
        assert_eq!(red.classes, vec!["red", "srchLts-def"]);
        assert_eq!(red.color.as_deref(), Some("rgb(255,0,0)"));
        assert_eq!(red.timing, json!(400));
        assert_eq!(red.dia, json!(100.0));
        assert_eq!(s.lights[1].timing, json!(425));
        assert_eq!(s.lights[2].timing, json!(475));
        assert_eq!(s.lights[2].classes[0], "blue");
    }

    #[test]
    fn test_caller_globals_override_template_scalars() {
        let opts = Options {
            timing: Some(json!(20)),
            blur: Some(json!(2)),
            ..Default::default()
        };
        let s = resolve(&opts, false);
        assert_eq!(s.lights.len(), 3);
        for l in &s.lights {
            assert_eq!(l.timing, json!(20));
            assert_eq!(l.blur, json!(2));
        }
        // Template still owns what the caller did not touch
        assert_eq!(s.lights[0].color.as_deref(), Some("rgb(255,0,0)"));
        assert_eq!(s.lights[1].classes, vec!["green", "srchLts-def"]);
    }

    #[test]
    fn test_caller_lights_replace_template() {
        let opts = Options {
            blur: Some(json!(2)),
            dia: Some(json!(200)),
            blend: Some("difference".into()),
            opacity: Some(json!(0.2)),
            easing: Some("ease".into()),
            timing: Some(json!(20)),
            zindex: Some(json!(1)),
            lights: Some(vec![
                LightOptions {
                    classes: Some(vec!["test-a".into(), "blue".into()]),
                    color: Some("rgb(33, 27, 27)".into()),
                    dia: Some(json!(300)),
                    blur: Some(json!(1)),
                    opacity: Some(json!(0.5)),
                    blend: Some("screen".into()),
                    easing: Some("ease-in".into()),
                    timing: Some(json!(200)),
                    ..Default::default()
                },
                LightOptions {
                    classes: Some(vec!["test-a".into(), " red".into()]),
                    color: Some("rgb(15,30,200)".into()),
                    dia: Some(json!(250)),
                    blur: Some(json!(2)),
                    blend: Some("normal".into()),
                    opacity: Some(json!(1)),
                    ..Default::default()
                },
                LightOptions {
                    classes: Some(vec!["test-a".into(), "green".into()]),
                    color: Some("rgb(15,200,30)".into()),
                    opacity: Some(json!(0.5)),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let s = resolve(&opts, false);
        assert_eq!(s.lights.len(), 3);

        let a = &s.lights[0];
        assert_eq!(a.dia, json!(300));
        assert_eq!(a.blur, json!(1));
        assert_eq!(a.blend, "screen");
        assert_eq!(a.easing, "ease-in");
        assert_eq!(a.timing, json!(200));
        // Entry omitted zindex, so the caller global fills it
        assert_eq!(a.zindex, json!(1));

        let b = &s.lights[1];
        assert_eq!(b.dia, json!(250));
        assert_eq!(b.blend, "normal");
        // Omitted fields fall to the caller globals, not the raw defaults
        assert_eq!(b.easing, "ease");
        assert_eq!(b.timing, json!(20));
        // Stray whitespace survives resolution; cleanup happens at class
        // string assembly
        assert_eq!(b.classes, vec!["test-a", " red"]);

        let c = &s.lights[2];
        assert_eq!(c.dia, json!(200));
        assert_eq!(c.blur, json!(2));
        assert_eq!(c.blend, "difference");
        assert_eq!(c.opacity, json!(0.5));
    }

    #[test]
    fn test_caller_lights_longer_than_template() {
        let opts = Options {
            timing: Some(json!(55)),
            lights: Some(vec![
                LightOptions::default(),
                LightOptions::default(),
                LightOptions::default(),
                LightOptions::default(),
                light(&[("timing", json!(7))]),
            ]),
            ..Default::default()
        };
        let s = resolve(&opts, false);
        assert_eq!(s.lights.len(), 5);
        assert_eq!(s.lights[3].timing, json!(55));
        assert_eq!(s.lights[4].timing, json!(7));
        // No template bleed into caller entries
        assert!(s.lights[0].classes.is_empty());
        assert!(s.lights[0].color.is_none());
    }

    #[test]
    fn test_caller_lights_empty_array_resolves_empty() {
        let opts = Options { lights: Some(Vec::new()), ..Default::default() };
        assert!(resolve(&opts, false).lights.is_empty());
    }

    #[test]
    fn test_preexisting_targets_drop_template() {
        let s = resolve(&Options::default(), true);
        assert!(s.lights.is_empty());
    }

    #[test]
    fn test_preexisting_targets_keep_caller_lights() {
        let opts = Options {
            lights: Some(vec![LightOptions::default(), LightOptions::default()]),
            ..Default::default()
        };
        assert_eq!(resolve(&opts, true).lights.len(), 2);
    }

    #[test]
    fn test_repeated_resolution_is_stable() {
        let loud = Options {
            timing: Some(json!(1)),
            color: Some("#123456".into()),
            ..Default::default()
        };
        let first = resolve(&Options::default(), false);
        let _ = resolve(&loud, false);
        let second = resolve(&Options::default(), false);
        assert_eq!(first, second);
        assert_eq!(second.lights[0].timing, json!(400));
    }

    #[test]
    fn test_global_classes_never_reach_lights() {
        let opts = Options {
            classes: Some(vec!["global-stray".into()]),
            lights: Some(vec![light(&[("color", json!("red"))])]),
            ..Default::default()
        };
        let s = resolve(&opts, false);
        assert!(s.lights[0].classes.is_empty());
    }

    #[test]
    fn test_extras_ride_along_with_precedence() {
        let mut opts = Options::default();
        opts.extras.insert("food".into(), json!("tacos"));
        opts.extras.insert("speed".into(), json!(3));
        opts.lights = Some(vec![light(&[("speed", json!(9)), ("z", json!("1"))])]);
        let s = resolve(&opts, false);
        assert_eq!(s.extras["food"], json!("tacos"));
        let l = &s.lights[0];
        assert_eq!(l.extras["food"], json!("tacos"));
        assert_eq!(l.extras["speed"], json!(9));
        assert_eq!(l.extras["z"], json!("1"));
    }

    #[test]
    fn test_nested_lights_key_is_stripped() {
        let opts = Options {
            lights: Some(vec![light(&[
                ("lights", json!([{"color": "red"}])),
                ("z", json!(1)),
            ])]),
            ..Default::default()
        };
        let l = resolve(&opts, false).lights.remove(0);
        assert!(!l.extras.contains_key("lights"));
        assert_eq!(l.extras["z"], json!(1));
    }

    #[test]
    fn test_numeric_strings_preserved_then_coerced() {
        let opts = Options {
            lights: Some(vec![light(&[("dia", json!("30")), ("timing", json!("900"))])]),
            ..Default::default()
        };
        let s = resolve(&opts, false);
        let l = &s.lights[0];
        assert_eq!(l.dia, json!("30"));
        assert_eq!(l.dia_px(), 30.0);
        assert_eq!(l.timing_ms(), 900.0);
    }

    #[test]
    fn test_coercion_falls_back_to_default_not_zero() {
        let opts = Options {
            lights: Some(vec![light(&[
                ("dia", json!("wide")),
                ("blur", json!([1, 2])),
                ("timing", json!("NaN")),
                ("opacity", json!("")),
            ])]),
            ..Default::default()
        };
        let l = resolve(&opts, false).lights.remove(0);
        assert_eq!(l.dia_px(), 100.0);
        assert_eq!(l.blur_px(), 3.0);
        assert_eq!(l.timing_ms(), 90.0);
        assert_eq!(l.opacity_value(), 0.8);
    }

    #[test]
    fn test_negative_values_pass_through_resolution() {
        let opts = Options {
            lights: Some(vec![light(&[("dia", json!(-50)), ("blur", json!(-2))])]),
            ..Default::default()
        };
        let l = resolve(&opts, false).lights.remove(0);
        assert_eq!(l.dia_px(), -50.0);
        assert_eq!(l.blur_px(), -2.0);
    }

    #[test]
    fn test_from_globals_carries_scalars_only() {
        let opts = Options {
            dia: Some(json!(42)),
            color: Some("lime".into()),
            ..Default::default()
        };
        let s = resolve(&opts, true);
        let bag = LightSettings::from_globals(&s);
        assert_eq!(bag.dia, json!(42));
        assert_eq!(bag.color.as_deref(), Some("lime"));
        assert!(bag.classes.is_empty());
    }

    #[test]
    fn test_options_deserialize_with_extras() {
        let opts: Options = serde_json::from_str(
            r#"{"dia": 20, "food": "tacos", "lights": [{"color": "red", "z": 1}]}"#,
        )
        .unwrap();
        assert_eq!(opts.dia, Some(json!(20)));
        assert_eq!(opts.extras["food"], json!("tacos"));
        let lights = opts.lights.as_ref().unwrap();
        assert_eq!(lights[0].extras["z"], json!(1));
    }
}
