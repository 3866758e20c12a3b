use bevy::prelude::*;

use super::{Body, BodyId, Contact, PhysicsEngine, StepReport, World};
use crate::error::EngineError;

/// Sub-stepped position based dynamics: predict, project pins, derive
/// velocities, then resolve ball contacts on the velocities.
#[derive(Debug, Clone, PartialEq)]
pub struct PbdEngine {
    pub sub_steps: u32,
}

impl Default for PbdEngine {
    fn default() -> Self {
        Self { sub_steps: 20 }
    }
}

impl PbdEngine {
    pub fn new(sub_steps: u32) -> Self {
        Self {
            sub_steps: sub_steps.max(1),
        }
    }
}

impl PhysicsEngine for PbdEngine {
    fn step(&mut self, world: &mut World, dt: f32) -> Result<StepReport, EngineError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(EngineError::InvalidTimeStep(dt));
        }

        let mut report = StepReport::default();
        let sub_steps = self.sub_steps.max(1);
        let sdt = dt / sub_steps as f32;
        let (gravity, anchor, bodies, joints) = world.parts_mut();

        for _ in 0..sub_steps {
            for body in bodies.iter_mut() {
                if body.held {
                    body.velocity = Vec2::ZERO;
                    continue;
                }
                body.velocity += gravity * sdt;
                body.prev_position = body.position;
                body.position += body.velocity * sdt;
            }

            if let Some(anchor) = anchor {
                for joint in joints {
                    let body = bodies
                        .get_mut(joint.body.0)
                        .ok_or(EngineError::UnknownBody(joint.body))?;
                    let w = body.inverse_mass();
                    if w == 0.0 {
                        continue;
                    }
                    let pivot = anchor.to_world(joint.anchor_offset);
                    let dist = body.position + joint.body_offset - pivot;
                    let d = dist.length();
                    if d == 0.0 {
                        continue;
                    }
                    // anchor is static, so the body takes the whole correction
                    let corr = (joint.length - d) / d;
                    body.position += dist * corr;
                }
            }

            for body in bodies.iter_mut() {
                if !body.held {
                    body.velocity = (body.position - body.prev_position) / sdt;
                }
            }

            for a in 0..bodies.len() {
                let (head, tail) = bodies.split_at_mut(a + 1);
                let body_a = &mut head[a];
                for (offset, body_b) in tail.iter_mut().enumerate() {
                    if let Some(speed) = resolve_contact(body_a, body_b) {
                        report.contacts.push(Contact {
                            a: BodyId(a),
                            b: BodyId(a + 1 + offset),
                            speed,
                        });
                    }
                }
            }
        }

        Ok(report)
    }
}

/// Velocity level ball-ball response. Returns the closing speed if the pair
/// was touching and approaching.
fn resolve_contact(a: &mut Body, b: &mut Body) -> Option<f32> {
    let dir = b.position - a.position;
    let d = dir.length();
    if d == 0.0 || d > a.radius + b.radius {
        return None;
    }

    let w_a = a.inverse_mass();
    let w_b = b.inverse_mass();
    let w = w_a + w_b;
    if w == 0.0 {
        return None;
    }

    let normal = dir / d;
    let approach = (a.velocity - b.velocity).dot(normal);
    if approach <= 0.0 {
        return None;
    }

    let restitution = a.restitution.min(b.restitution);
    let normal_impulse = (1.0 + restitution) * approach / w;
    a.velocity -= normal * normal_impulse * w_a;
    b.velocity += normal * normal_impulse * w_b;

    let friction = a.friction.min(b.friction);
    if friction > 0.0 {
        let relative = a.velocity - b.velocity;
        let slip = relative - normal * relative.dot(normal);
        let slip_speed = slip.length();
        if slip_speed > 0.0 {
            let tangent = slip / slip_speed;
            let impulse = (slip_speed / w).min(friction * normal_impulse);
            a.velocity -= tangent * impulse * w_a;
            b.velocity += tangent * impulse * w_b;
        }
    }

    Some(approach)
}
