use bevy::prelude::*;
use bevy_inspector_egui::{prelude::ReflectInspectorOptions, InspectorOptions};

use crate::error::ConfigError;

pub const WINDOW_WIDTH: f32 = 800.0;
pub const WINDOW_HEIGHT: f32 = 600.0;
pub const WINDOW_TITLE: &str = "Newton's Cradle";

pub const TICK_RATE: u32 = 60;
pub const TIME_STEP: f32 = 1.0 / TICK_RATE as f32;

/// Cleared to white every frame.
pub const BACKGROUND: [u8; 3] = [255, 255, 255];

/// Angle the number keys lift balls to.
pub const LIFT_ANGLE_DEGREES: f32 = -30.0;

/// Contacts slower than this (px/s) are neither logged nor heard.
pub const COLLISION_LOG_THRESHOLD: f32 = 1.0;

/// Closing speed (px/s) at which a click plays at full volume.
pub const FULL_VOLUME_SPEED: f32 = 200.0;

/// Minimum time between two clicks of the same pair of balls.
pub const CLICK_DEBOUNCE_SECS: f64 = 0.1;

/// Scene parameters. Editable in the inspector, applied on the next reset.
#[derive(Reflect, Resource, InspectorOptions, Clone, Debug, PartialEq)]
#[reflect(Resource, InspectorOptions)]
pub struct CradleConfig {
    #[inspector(min = 1, max = 12)]
    pub ball_count: u32,
    #[inspector(min = 1.0, max = 100.0)]
    pub radius: f32,
    #[inspector(min = 1.0, max = 500.0)]
    pub rod_length: f32,
    #[inspector(min = 1.0, max = 200.0)]
    pub ball_spacing: f32,
    #[inspector(min = -90.0, max = 90.0)]
    pub initial_angle_degrees: f32,
    pub displaced_balls: u32,
    /// Screen space, y grows downwards.
    pub gravity: Vec2,
    pub anchor_position: Vec2,
    pub anchor_half_length: f32,
    #[inspector(min = 0.1, max = 100.0)]
    pub mass: f32,
    #[inspector(min = 0.0, max = 1.0)]
    pub restitution: f32,
    #[inspector(min = 0.0)]
    pub friction: f32,
    #[inspector(min = 1, max = 500)]
    pub sub_steps: u32,
}

impl Default for CradleConfig {
    fn default() -> Self {
        Self {
            ball_count: 5,
            radius: 15.0,
            rod_length: 150.0,
            ball_spacing: 30.0,
            initial_angle_degrees: -30.0,
            displaced_balls: 1,
            gravity: Vec2::new(0.0, 981.0),
            anchor_position: Vec2::new(400.0, 100.0),
            anchor_half_length: 120.0,
            mass: 1.0,
            restitution: 1.0,
            friction: 0.0,
            sub_steps: 20,
        }
    }
}

impl CradleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ball_count == 0 {
            return Err(ConfigError::NoBalls);
        }
        for (field, value) in [
            ("radius", self.radius),
            ("rod_length", self.rod_length),
            ("ball_spacing", self.ball_spacing),
            ("mass", self.mass),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::NotFinite { field: "gravity" });
        }
        if !self.anchor_position.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "anchor_position",
            });
        }
        if !self.anchor_half_length.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "anchor_half_length",
            });
        }
        if !self.initial_angle_degrees.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "initial_angle_degrees",
            });
        }
        if self.sub_steps == 0 {
            return Err(ConfigError::NoSubSteps);
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Restitution(self.restitution));
        }
        if !(self.friction >= 0.0 && self.friction.is_finite()) {
            return Err(ConfigError::Friction(self.friction));
        }
        if self.displaced_balls > self.ball_count {
            return Err(ConfigError::TooManyDisplaced {
                displaced: self.displaced_balls,
                count: self.ball_count,
            });
        }
        Ok(())
    }

    pub fn initial_angle(&self) -> f32 {
        self.initial_angle_degrees.to_radians()
    }

    /// Anchor-local x offset of the pivot for ball `index`, centred on the anchor.
    pub fn pivot_offset(&self, index: u32) -> f32 {
        let middle = (self.ball_count as f32 - 1.0) * 0.5;
        (index as f32 - middle) * self.ball_spacing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(CradleConfig::default().validate(), Ok(()));
    }

    #[test]
    fn pivots_are_centred() {
        let config = CradleConfig::default();
        let offsets: Vec<f32> = (0..5).map(|i| config.pivot_offset(i)).collect();
        assert_eq!(offsets, vec![-60.0, -30.0, 0.0, 30.0, 60.0]);

        let even = CradleConfig {
            ball_count: 2,
            ..default()
        };
        assert_eq!(even.pivot_offset(0), -15.0);
        assert_eq!(even.pivot_offset(1), 15.0);
    }

    #[test]
    fn rejects_bad_values() {
        let cases = [
            (
                CradleConfig {
                    ball_count: 0,
                    ..default()
                },
                ConfigError::NoBalls,
            ),
            (
                CradleConfig {
                    radius: -1.0,
                    ..default()
                },
                ConfigError::NotPositive {
                    field: "radius",
                    value: -1.0,
                },
            ),
            (
                CradleConfig {
                    rod_length: 0.0,
                    ..default()
                },
                ConfigError::NotPositive {
                    field: "rod_length",
                    value: 0.0,
                },
            ),
            (
                CradleConfig {
                    sub_steps: 0,
                    ..default()
                },
                ConfigError::NoSubSteps,
            ),
            (
                CradleConfig {
                    restitution: 1.5,
                    ..default()
                },
                ConfigError::Restitution(1.5),
            ),
            (
                CradleConfig {
                    friction: -0.1,
                    ..default()
                },
                ConfigError::Friction(-0.1),
            ),
            (
                CradleConfig {
                    displaced_balls: 6,
                    ..default()
                },
                ConfigError::TooManyDisplaced {
                    displaced: 6,
                    count: 5,
                },
            ),
            (
                CradleConfig {
                    gravity: Vec2::new(0.0, f32::NAN),
                    ..default()
                },
                ConfigError::NotFinite { field: "gravity" },
            ),
        ];

        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn nan_radius_is_rejected() {
        let config = CradleConfig {
            radius: f32::NAN,
            ..default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "radius", .. })
        ));
    }
}
