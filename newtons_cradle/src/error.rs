use thiserror::Error;

use crate::physics::BodyId;

/// Invalid scene parameters, caught before a world is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("ball_count must be at least 1")]
    NoBalls,
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
    #[error("sub_steps must be at least 1")]
    NoSubSteps,
    #[error("restitution must be within 0..=1, got {0}")]
    Restitution(f32),
    #[error("friction must not be negative, got {0}")]
    Friction(f32),
    #[error("cannot displace {displaced} balls out of {count}")]
    TooManyDisplaced { displaced: u32, count: u32 },
}

/// Failure inside the physics or render collaborators. Always fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),
    #[error("world has no anchor")]
    NoAnchor,
    #[error("pin joint for {0:?} has zero length")]
    DegenerateJoint(BodyId),
    #[error("invalid body: {0}")]
    InvalidBody(&'static str),
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("render failed: {0}")]
    Render(String),
}

/// Malformed event from the input source. Logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("keyboard event without a key code (scan code {0})")]
    UnmappedKey(u32),
}

#[derive(Debug, Error)]
pub enum CradleError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),
}
