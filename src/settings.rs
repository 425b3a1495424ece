//! Tunable simulation properties and colour themes
//!
//! Keys are camelCase so the host can pass its own property names through
//! unchanged (`[{ "property": "mainColor", "value": "#813bf5" }]`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::COMPLETE_LEVELS;
use crate::error::{Result, SwarmError};

/// Colour theme presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

/// One host-side override: `{ "property": "goboIntensity", "value": 0.75 }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyOverride {
    pub property: String,
    pub value: Value,
}

/// Simulation tunables plus renderer pass-through values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    // === Pacing ===
    /// Spawn/move ratio advance per second
    pub animation_speed: f32,
    /// Speed multiplier targeted while a success result plays
    pub result_speed_multiplier: f32,
    /// How fast the speed multiplier converges on its target (per second)
    pub speed_ramp_rate: f32,
    /// Extra start delay per moving block within a cycle (seconds of ratio).
    ///
    /// The k-th block that actually gets a target waits `k * step`; blocks
    /// that stay put do not advance k, so there are no gaps in the stagger.
    pub path_start_delay_step: f32,

    // === Pathing ===
    /// Chance that a block on the main tile moves this cycle
    pub main_tile_move_chance: f32,
    /// Chance that an idle border block becomes the error block
    pub error_block_chance: f32,
    pub error_pre_fall_duration: f32,
    pub error_fall_duration: f32,

    // === Result animations ===
    /// Complete animation length per level (seconds)
    pub complete_durations: [f32; COMPLETE_LEVELS],
    /// Delay before a completed result may move on to the restart animation.
    /// Never shorter than the matching duration, or the reset would cut the
    /// animation off before it ends.
    pub complete_hold_delays: [f32; COMPLETE_LEVELS],
    pub stop_duration: f32,
    pub error_duration: f32,

    // === Renderer pass-through ===
    pub bg_color1: String,
    pub bg_color2: String,
    pub neutral_color: String,
    pub main_color: String,
    pub success_color: String,
    pub fail_color: String,
    pub particles_color: String,
    pub gobo_intensity: f32,
    pub particles_opacity: f32,
    pub particles_size: f32,
}

impl Default for Properties {
    fn default() -> Self {
        Self::from_theme(Theme::Dark)
    }
}

impl Properties {
    /// Properties with the given theme's colours and default pacing
    pub fn from_theme(theme: Theme) -> Self {
        let mut properties = Self {
            animation_speed: 0.75,
            result_speed_multiplier: 2.0,
            speed_ramp_rate: 2.0,
            path_start_delay_step: 0.2,

            main_tile_move_chance: 0.8,
            error_block_chance: 0.5,
            error_pre_fall_duration: 1.0,
            error_fall_duration: 0.8,

            complete_durations: [1.8, 3.6, 5.4],
            complete_hold_delays: [2.0, 4.0, 6.0],
            stop_duration: 1.5,
            error_duration: 2.0,

            bg_color1: String::new(),
            bg_color2: String::new(),
            neutral_color: String::new(),
            main_color: String::new(),
            success_color: String::new(),
            fail_color: String::new(),
            particles_color: String::new(),
            gobo_intensity: 0.0,
            particles_opacity: 0.0,
            particles_size: 0.0,
        };
        properties.apply_theme(theme);
        properties
    }

    /// Replace the colour set with a theme preset (pacing is untouched)
    pub fn apply_theme(&mut self, theme: Theme) {
        let (bg1, bg2, neutral, main, success, fail, particles, gobo, opacity, size) = match theme
        {
            Theme::Light => (
                "#ffffff", "#d0d0d0", "#ffffff", "#0096ff", "#00c881", "#ca0101", "#505050",
                0.45, 0.75, 0.01,
            ),
            Theme::Dark => (
                "#212121", "#212121", "#040723", "#813bf5", "#c9eb00", "#ff5610", "#813bf5",
                0.75, 0.95, 0.015,
            ),
        };
        self.bg_color1 = bg1.to_string();
        self.bg_color2 = bg2.to_string();
        self.neutral_color = neutral.to_string();
        self.main_color = main.to_string();
        self.success_color = success.to_string();
        self.fail_color = fail.to_string();
        self.particles_color = particles.to_string();
        self.gobo_intensity = gobo;
        self.particles_opacity = opacity;
        self.particles_size = size;
    }

    /// Complete animation duration for a 1-based level
    pub fn complete_duration(&self, level: u8) -> f32 {
        self.complete_durations[level_index(level)]
    }

    /// Hold delay for a 1-based level
    pub fn complete_hold_delay(&self, level: u8) -> f32 {
        self.complete_hold_delays[level_index(level)]
    }

    /// Set a single property by its camelCase name.
    ///
    /// The change is only kept if the resulting properties validate.
    pub fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        let mut tree = serde_json::to_value(&*self)?;
        let slot = tree
            .get_mut(name)
            .ok_or_else(|| SwarmError::UnknownProperty(name.to_string()))?;
        *slot = value;

        let candidate: Properties =
            serde_json::from_value(tree).map_err(|e| SwarmError::InvalidProperty {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        candidate.validate()?;

        *self = candidate;
        log::debug!("Property {} updated", name);
        Ok(())
    }

    /// Apply a JSON list of `{ property, value }` overrides in order.
    ///
    /// Stops at the first invalid entry; earlier entries stay applied.
    pub fn apply_json(&mut self, json: &str) -> Result<()> {
        let overrides: Vec<PropertyOverride> = serde_json::from_str(json)?;
        for o in overrides {
            self.set_property(&o.property, o.value)?;
        }
        Ok(())
    }

    /// Check ranges and colour formats
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("animationSpeed", self.animation_speed),
            ("resultSpeedMultiplier", self.result_speed_multiplier),
            ("speedRampRate", self.speed_ramp_rate),
            ("errorPreFallDuration", self.error_pre_fall_duration),
            ("errorFallDuration", self.error_fall_duration),
            ("stopDuration", self.stop_duration),
            ("errorDuration", self.error_duration),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(name, format!("expected a positive number, got {value}")));
            }
        }
        for (name, values) in [
            ("completeDurations", &self.complete_durations),
            ("completeHoldDelays", &self.complete_hold_delays),
        ] {
            if values.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
                return Err(invalid(name, "expected positive durations".to_string()));
            }
        }

        for (level, (duration, hold)) in self
            .complete_durations
            .iter()
            .zip(&self.complete_hold_delays)
            .enumerate()
        {
            if duration > hold {
                return Err(invalid(
                    "completeDurations",
                    format!(
                        "level {} lasts {duration}s but is held for only {hold}s",
                        level + 1
                    ),
                ));
            }
        }

        let unit = [
            ("mainTileMoveChance", self.main_tile_move_chance),
            ("errorBlockChance", self.error_block_chance),
            ("goboIntensity", self.gobo_intensity),
            ("particlesOpacity", self.particles_opacity),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, format!("expected a value in [0, 1], got {value}")));
            }
        }
        if !(self.path_start_delay_step >= 0.0 && self.path_start_delay_step.is_finite()) {
            return Err(invalid("pathStartDelayStep", "expected a non-negative number".to_string()));
        }
        if !(self.particles_size >= 0.0) {
            return Err(invalid("particlesSize", "expected a non-negative number".to_string()));
        }

        let colors = [
            ("bgColor1", &self.bg_color1),
            ("bgColor2", &self.bg_color2),
            ("neutralColor", &self.neutral_color),
            ("mainColor", &self.main_color),
            ("successColor", &self.success_color),
            ("failColor", &self.fail_color),
            ("particlesColor", &self.particles_color),
        ];
        for (name, color) in colors {
            if !is_hex_color(color) {
                return Err(invalid(name, format!("expected #rrggbb, got {color:?}")));
            }
        }
        Ok(())
    }
}

fn level_index(level: u8) -> usize {
    (level.max(1) as usize - 1).min(COMPLETE_LEVELS - 1)
}

fn invalid(name: &str, reason: String) -> SwarmError {
    SwarmError::InvalidProperty {
        name: name.to_string(),
        reason,
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_validate() {
        assert!(Properties::default().validate().is_ok());
        assert!(Properties::from_theme(Theme::Light).validate().is_ok());
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!(Theme::from_str("LIGHT"), Some(Theme::Light));
        assert_eq!(Theme::from_str("dark"), Some(Theme::Dark));
        assert_eq!(Theme::from_str("sepia"), None);
        assert_eq!(Theme::Dark.as_str(), "Dark");
    }

    #[test]
    fn test_set_property_by_host_name() {
        let mut props = Properties::default();
        props.set_property("mainColor", json!("#0096ff")).unwrap();
        props.set_property("goboIntensity", json!(0.3)).unwrap();
        assert_eq!(props.main_color, "#0096ff");
        assert!((props.gobo_intensity - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_set_property_rejects_unknown_and_invalid() {
        let mut props = Properties::default();
        let before = props.clone();

        assert!(matches!(
            props.set_property("cameraFov", json!(45)),
            Err(SwarmError::UnknownProperty(_))
        ));
        assert!(matches!(
            props.set_property("mainColor", json!("purple")),
            Err(SwarmError::InvalidProperty { .. })
        ));
        assert!(matches!(
            props.set_property("animationSpeed", json!(-1.0)),
            Err(SwarmError::InvalidProperty { .. })
        ));
        assert!(matches!(
            props.set_property("completeDurations", json!([1.0, 2.0])),
            Err(SwarmError::InvalidProperty { .. })
        ));
        assert_eq!(props, before);
    }

    #[test]
    fn test_apply_json_list() {
        let mut props = Properties::default();
        props
            .apply_json(
                r##"[
                    { "property": "bgColor1", "value": "#ffffff" },
                    { "property": "particlesSize", "value": 0.02 }
                ]"##,
            )
            .unwrap();
        assert_eq!(props.bg_color1, "#ffffff");
        assert!((props.particles_size - 0.02).abs() < 1e-6);

        assert!(matches!(props.apply_json("not json"), Err(SwarmError::Parse(_))));
    }

    #[test]
    fn test_complete_duration_must_fit_its_hold() {
        let mut props = Properties::default();
        let err = props
            .set_property("completeDurations", json!([1.8, 5.0, 5.4]))
            .unwrap_err();
        assert!(matches!(err, SwarmError::InvalidProperty { name, .. } if name == "completeDurations"));
        assert_eq!(props.complete_durations, [1.8, 3.6, 5.4]);

        // Raising the hold first makes room
        props
            .apply_json(
                r#"[
                    { "property": "completeHoldDelays", "value": [2.0, 6.0, 6.0] },
                    { "property": "completeDurations", "value": [1.8, 5.0, 5.4] }
                ]"#,
            )
            .unwrap();
        assert_eq!(props.complete_duration(2), 5.0);
    }

    #[test]
    fn test_level_lookup_clamps() {
        let props = Properties::default();
        assert_eq!(props.complete_hold_delay(0), 2.0);
        assert_eq!(props.complete_hold_delay(2), 4.0);
        assert_eq!(props.complete_hold_delay(9), 6.0);
        assert!(props.complete_duration(3) < props.complete_hold_delay(3));
    }
}
