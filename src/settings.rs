//! Game settings
//!
//! Read by the rule engine at construction, on `apply_settings`, and on every
//! reset. Persisting them is the shell's business; JSON helpers are provided
//! for the native demo.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_BALLS, MAX_BRICKS};
use crate::error::ConfigError;
use crate::sim::BrickKind;

/// Tunable game parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Physics (applied immediately) ===
    /// Gravity magnitude (1.0 = 1000 points/s²)
    pub gravity: f32,
    /// Ball restitution
    pub elasticity: f32,

    // === Layout (applied on next reset) ===
    /// Balls served at the start of a game
    pub ball_count: u32,
    /// Bricks in the field
    pub total_bricks: u32,
    /// How many of them are special (must not exceed `total_bricks`)
    pub special_bricks: u32,

    // === Special brick types ===
    pub smaller_paddle_enabled: bool,
    pub larger_paddle_enabled: bool,
    pub add_ball_enabled: bool,
    pub hard_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gravity: 0.25,
            elasticity: 1.0,

            ball_count: 2,
            total_bricks: 18,
            special_bricks: 6,

            smaller_paddle_enabled: true,
            larger_paddle_enabled: true,
            add_ball_enabled: true,
            hard_enabled: true,
        }
    }
}

impl Settings {
    /// Check the invariants the layout builder relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err(ConfigError::InvalidGravity(self.gravity));
        }
        if !self.elasticity.is_finite() || self.elasticity < 0.0 {
            return Err(ConfigError::InvalidElasticity(self.elasticity));
        }
        if self.ball_count == 0 {
            return Err(ConfigError::NoBalls);
        }
        if self.ball_count > MAX_BALLS {
            return Err(ConfigError::TooManyBalls {
                count: self.ball_count,
                max: MAX_BALLS,
            });
        }
        if self.total_bricks == 0 {
            return Err(ConfigError::NoBricks);
        }
        if self.total_bricks > MAX_BRICKS {
            return Err(ConfigError::TooManyBricks {
                total: self.total_bricks,
                max: MAX_BRICKS,
            });
        }
        if self.special_bricks > self.total_bricks {
            return Err(ConfigError::TooManySpecialBricks {
                special: self.special_bricks,
                total: self.total_bricks,
            });
        }
        Ok(())
    }

    /// Non-regular brick kinds the player has switched on
    pub fn enabled_special_kinds(&self) -> Vec<BrickKind> {
        let toggles = [
            (self.smaller_paddle_enabled, BrickKind::SmallerPaddle),
            (self.larger_paddle_enabled, BrickKind::LargerPaddle),
            (self.add_ball_enabled, BrickKind::AddBall),
            (self.hard_enabled, BrickKind::Hard),
        ];
        toggles
            .into_iter()
            .filter_map(|(enabled, kind)| enabled.then_some(kind))
            .collect()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring malformed settings {}: {}", path.display(), e),
            },
            Err(e) => log::info!("No settings at {} ({}), using defaults", path.display(), e),
        }
        Self::default()
    }

    /// Save settings as JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.enabled_special_kinds().len(), 4);
    }

    #[test]
    fn test_special_bricks_bounded_by_total() {
        let settings = Settings {
            total_bricks: 4,
            special_bricks: 5,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ConfigError::TooManySpecialBricks {
                special: 5,
                total: 4
            })
        );
    }

    #[test]
    fn test_counts_have_upper_bounds() {
        let settings = Settings {
            ball_count: u32::MAX,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ConfigError::TooManyBalls {
                count: u32::MAX,
                max: MAX_BALLS
            })
        );

        let settings = Settings {
            total_bricks: 400_000,
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ConfigError::TooManyBricks {
                total: 400_000,
                max: MAX_BRICKS
            })
        );

        let settings = Settings {
            ball_count: MAX_BALLS,
            total_bricks: MAX_BRICKS,
            special_bricks: MAX_BRICKS,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_physics() {
        let settings = Settings {
            elasticity: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidElasticity(_))
        ));

        let settings = Settings {
            gravity: -1.0,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::InvalidGravity(-1.0)));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(r#"{ "ball_count": 3, "hard_enabled": false }"#)
            .expect("valid json");
        assert_eq!(settings.ball_count, 3);
        assert_eq!(settings.total_bricks, 18);
        assert!(!settings.enabled_special_kinds().contains(&BrickKind::Hard));
    }
}
