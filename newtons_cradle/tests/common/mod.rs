#![allow(dead_code)]

use bevy::prelude::*;
use newtons_cradle::{
    driver::{Event, EventSource, FramePacer, Renderer},
    error::{EngineError, InputError},
    physics::{BodyId, PhysicsEngine, StepReport, World},
};

/// Free fall with no pins or contacts, so positions follow `p0 + g t^2 / 2`.
#[derive(Debug, Default)]
pub struct BallisticEngine {
    pub steps: usize,
}

impl PhysicsEngine for BallisticEngine {
    fn step(&mut self, world: &mut World, dt: f32) -> Result<StepReport, EngineError> {
        let gravity = world.gravity();
        for index in 0..world.bodies().len() {
            let body = world
                .body_mut(BodyId(index))
                .ok_or(EngineError::UnknownBody(BodyId(index)))?;
            body.position += body.velocity * dt + 0.5 * gravity * dt * dt;
            body.velocity += gravity * dt;
        }
        self.steps += 1;
        Ok(StepReport::default())
    }
}

/// Fails on the given step.
#[derive(Debug)]
pub struct FailingEngine {
    pub fail_on: usize,
    pub steps: usize,
}

impl PhysicsEngine for FailingEngine {
    fn step(&mut self, _world: &mut World, _dt: f32) -> Result<StepReport, EngineError> {
        self.steps += 1;
        if self.steps == self.fail_on {
            return Err(EngineError::Render("solver blew up".to_string()));
        }
        Ok(StepReport::default())
    }
}

/// Hands out one batch per poll, nothing once the script runs out.
#[derive(Default)]
pub struct ScriptedEvents {
    pub batches: Vec<Vec<Result<Event, InputError>>>,
    pub polls: usize,
}

impl ScriptedEvents {
    /// Quit arrives on poll number `iteration` (1-based).
    pub fn quit_on(iteration: usize) -> Self {
        let mut batches = vec![Vec::new(); iteration - 1];
        batches.push(vec![Ok(Event::Quit)]);
        Self { batches, polls: 0 }
    }
}

impl EventSource for ScriptedEvents {
    fn poll_events(&mut self) -> Vec<Result<Event, InputError>> {
        self.polls += 1;
        if self.batches.is_empty() {
            Vec::new()
        } else {
            self.batches.remove(0)
        }
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub clears: usize,
    pub draws: usize,
    pub presents: usize,
    pub last_color: Option<Color>,
    pub frames: Vec<Vec<Vec2>>,
}

impl Renderer for RecordingRenderer {
    fn clear(&mut self, color: Color) -> Result<(), EngineError> {
        self.clears += 1;
        self.last_color = Some(color);
        Ok(())
    }

    fn draw(&mut self, world: &World) -> Result<(), EngineError> {
        self.draws += 1;
        self.frames
            .push(world.bodies().iter().map(|b| b.position).collect());
        Ok(())
    }

    fn present(&mut self) -> Result<(), EngineError> {
        self.presents += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingPacer {
    pub ticks: usize,
    pub last_fps: Option<u32>,
}

impl FramePacer for CountingPacer {
    fn tick(&mut self, target_fps: u32) {
        self.ticks += 1;
        self.last_fps = Some(target_fps);
    }
}
