//! Data model of the cradle world and the engine seam the driver steps through.

mod pbd;

pub use pbd::PbdEngine;

use bevy::prelude::*;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub usize);

/// The static bar the pendulums hang from.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub position: Vec2,
    pub half_length: f32,
    pub thickness: f32,
}

impl Anchor {
    pub fn to_world(&self, local: Vec2) -> Vec2 {
        self.position + local
    }
}

/// A circular point mass.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub prev_position: Vec2,
    pub velocity: Vec2,
    pub mass: f32,
    pub radius: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Held bodies are moved by hand and ignore forces.
    pub held: bool,
}

impl Body {
    pub fn ball(position: Vec2, radius: f32, mass: f32) -> Self {
        Self {
            position,
            prev_position: position,
            velocity: Vec2::ZERO,
            mass,
            radius,
            restitution: 1.0,
            friction: 0.0,
            held: false,
        }
    }

    pub fn with_material(mut self, restitution: f32, friction: f32) -> Self {
        self.restitution = restitution;
        self.friction = friction;
        self
    }

    pub fn inverse_mass(&self) -> f32 {
        if self.held || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance_squared(point) <= self.radius * self.radius
    }

    /// Moves the body without giving it velocity.
    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
        self.prev_position = position;
        self.velocity = Vec2::ZERO;
    }
}

/// Keeps a body attachment point at a fixed distance from an anchor point.
#[derive(Debug, Clone, PartialEq)]
pub struct PinJoint {
    pub anchor_offset: Vec2,
    pub body: BodyId,
    pub body_offset: Vec2,
    pub length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: BodyId,
    pub b: BodyId,
    /// Closing speed along the contact normal before the impulse.
    pub speed: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    gravity: Vec2,
    anchor: Option<Anchor>,
    bodies: Vec<Body>,
    joints: Vec<PinJoint>,
}

impl World {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            anchor: None,
            bodies: Vec::new(),
            joints: Vec::new(),
        }
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn joints(&self) -> &[PinJoint] {
        &self.joints
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.0)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id.0)
    }

    pub fn joint(&self, id: JointId) -> Option<&PinJoint> {
        self.joints.get(id.0)
    }

    /// World position of the anchor side of `joint`.
    pub fn anchor_point(&self, joint: &PinJoint) -> Option<Vec2> {
        self.anchor
            .as_ref()
            .map(|anchor| anchor.to_world(joint.anchor_offset))
    }

    /// World position of the body side of `joint`.
    pub fn body_point(&self, joint: &PinJoint) -> Option<Vec2> {
        self.body(joint.body)
            .map(|body| body.position + joint.body_offset)
    }

    pub fn kinetic_energy(&self) -> f32 {
        self.bodies
            .iter()
            .map(|b| 0.5 * b.mass * b.velocity.length_squared())
            .sum()
    }

    /// Relative to the world origin; only differences are meaningful.
    pub fn potential_energy(&self) -> f32 {
        self.bodies
            .iter()
            .map(|b| -b.mass * self.gravity.dot(b.position))
            .sum()
    }

    pub fn total_energy(&self) -> f32 {
        self.kinetic_energy() + self.potential_energy()
    }

    pub(crate) fn parts_mut(&mut self) -> (Vec2, Option<&Anchor>, &mut [Body], &[PinJoint]) {
        (
            self.gravity,
            self.anchor.as_ref(),
            &mut self.bodies,
            &self.joints,
        )
    }
}

/// Creates and advances worlds. The driver and scene builder only see this trait.
pub trait PhysicsEngine {
    fn create_world(&self, gravity: Vec2) -> World {
        World::new(gravity)
    }

    fn add_anchor(&self, world: &mut World, anchor: Anchor) {
        world.anchor = Some(anchor);
    }

    fn add_body(&self, world: &mut World, body: Body) -> Result<BodyId, EngineError> {
        if !body.position.is_finite() {
            return Err(EngineError::InvalidBody("position must be finite"));
        }
        if !(body.mass.is_finite() && body.mass > 0.0) {
            return Err(EngineError::InvalidBody("mass must be positive"));
        }
        if !(body.radius.is_finite() && body.radius > 0.0) {
            return Err(EngineError::InvalidBody("radius must be positive"));
        }
        world.bodies.push(body);
        Ok(BodyId(world.bodies.len() - 1))
    }

    /// Pins `body` to the anchor. The rest length is the distance at creation.
    fn add_joint(
        &self,
        world: &mut World,
        anchor_offset: Vec2,
        body: BodyId,
        body_offset: Vec2,
    ) -> Result<JointId, EngineError> {
        let anchor = world.anchor.as_ref().ok_or(EngineError::NoAnchor)?;
        let target = world.body(body).ok_or(EngineError::UnknownBody(body))?;
        let length = anchor
            .to_world(anchor_offset)
            .distance(target.position + body_offset);
        if !(length.is_finite() && length > 0.0) {
            return Err(EngineError::DegenerateJoint(body));
        }
        world.joints.push(PinJoint {
            anchor_offset,
            body,
            body_offset,
            length,
        });
        Ok(JointId(world.joints.len() - 1))
    }

    fn step(&mut self, world: &mut World, dt: f32) -> Result<StepReport, EngineError>;
}
