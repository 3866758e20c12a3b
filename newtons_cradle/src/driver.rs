//! Fixed-step loop: poll, clear, draw, step, present.
//!
//! [`Driver::tick`] never looks at a clock, so tests can drive any number of
//! frames back to back. Pacing lives behind [`FramePacer`].

use std::time::{Duration, Instant};

use bevy::prelude::*;

use crate::{
    config::{CradleConfig, BACKGROUND, COLLISION_LOG_THRESHOLD, TICK_RATE, TIME_STEP},
    error::{CradleError, EngineError, InputError},
    physics::{Contact, PhysicsEngine, StepReport, World},
    scene::{build_scene, Cradle},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Quit,
    Other,
}

pub trait EventSource {
    /// Drains everything that arrived since the last poll.
    fn poll_events(&mut self) -> Vec<Result<Event, InputError>>;
}

pub trait Renderer {
    fn clear(&mut self, color: Color) -> Result<(), EngineError>;
    fn draw(&mut self, world: &World) -> Result<(), EngineError>;
    fn present(&mut self) -> Result<(), EngineError>;
}

pub trait FramePacer {
    /// Blocks until the current frame's budget at `target_fps` is used up.
    fn tick(&mut self, target_fps: u32);
}

/// Sleeps away whatever is left of each frame.
#[derive(Debug, Default)]
pub struct SleepPacer {
    last: Option<Instant>,
}

impl FramePacer for SleepPacer {
    fn tick(&mut self, target_fps: u32) {
        let budget = Duration::from_secs_f64(1.0 / target_fps.max(1) as f64);
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Everything one run owns: the engine, its world and the cradle built in it.
#[derive(Debug)]
pub struct Simulation<E> {
    pub engine: E,
    pub world: World,
    pub cradle: Cradle,
    pub config: CradleConfig,
}

impl<E: PhysicsEngine> Simulation<E> {
    pub fn new(engine: E, config: CradleConfig) -> Result<Self, CradleError> {
        config.validate()?;
        let mut world = engine.create_world(config.gravity);
        let cradle = build_scene(&engine, &mut world, &config)?;
        info!(
            "built cradle with {} balls, first {} at {} degrees",
            cradle.ball_count(),
            config.displaced_balls,
            config.initial_angle_degrees
        );
        Ok(Self {
            engine,
            world,
            cradle,
            config,
        })
    }

    pub fn step(&mut self, dt: f32) -> Result<StepReport, EngineError> {
        self.engine.step(&mut self.world, dt)
    }
}

#[derive(Debug)]
pub struct Driver<E> {
    simulation: Simulation<E>,
    state: RunState,
    paused: bool,
    background: Color,
    frames: u64,
    steps: u64,
    contacts: u64,
    /// Contacts above the threshold from the latest step.
    recent: Vec<Contact>,
}

impl<E: PhysicsEngine> Driver<E> {
    pub fn new(simulation: Simulation<E>) -> Self {
        let [r, g, b] = BACKGROUND;
        Self {
            simulation,
            state: RunState::Running,
            paused: false,
            background: Color::rgb_u8(r, g, b),
            frames: 0,
            steps: 0,
            contacts: 0,
            recent: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn simulation(&self) -> &Simulation<E> {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation<E> {
        &mut self.simulation
    }

    pub fn world(&self) -> &World {
        &self.simulation.world
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn contacts(&self) -> u64 {
        self.contacts
    }

    pub fn recent_contacts(&self) -> &[Contact] {
        &self.recent
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!("paused: {paused}");
        }
        self.paused = paused;
    }

    /// Runs one iteration of the loop. A quit seen while polling stops the
    /// driver before anything is drawn or stepped.
    pub fn tick(
        &mut self,
        events: &mut impl EventSource,
        renderer: &mut impl Renderer,
    ) -> Result<RunState, CradleError> {
        if self.state == RunState::Stopped {
            return Ok(RunState::Stopped);
        }

        for event in events.poll_events() {
            match event {
                Ok(Event::Quit) => {
                    info!("quit after {} frames", self.frames);
                    self.state = RunState::Stopped;
                }
                Ok(Event::Other) => {}
                Err(err) => warn!("ignoring input: {err}"),
            }
        }
        if self.state == RunState::Stopped {
            return Ok(RunState::Stopped);
        }

        renderer.clear(self.background)?;
        renderer.draw(&self.simulation.world)?;

        self.recent.clear();
        if !self.paused {
            let report = self.simulation.step(TIME_STEP)?;
            self.steps += 1;
            for contact in report
                .contacts
                .into_iter()
                .filter(|c| c.speed > COLLISION_LOG_THRESHOLD)
            {
                debug!(
                    "ball {} hit ball {} at {:.1} px/s",
                    contact.a.0, contact.b.0, contact.speed
                );
                self.recent.push(contact);
            }
            self.contacts += self.recent.len() as u64;
        }

        renderer.present()?;
        self.frames += 1;
        trace!("frame {}", self.frames);

        Ok(self.state)
    }

    /// Ticks until a quit arrives, pacing at [`TICK_RATE`]. Collaborator
    /// failures end the loop with an error.
    pub fn run(
        &mut self,
        events: &mut impl EventSource,
        renderer: &mut impl Renderer,
        pacer: &mut impl FramePacer,
    ) -> Result<(), CradleError> {
        while self.tick(events, renderer)? == RunState::Running {
            pacer.tick(TICK_RATE);
        }
        Ok(())
    }
}
