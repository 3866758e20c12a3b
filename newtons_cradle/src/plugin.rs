use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bevy::{
    app::AppExit, input::keyboard::KeyboardInput, prelude::*, sprite::MaterialMesh2dBundle,
    window::WindowCloseRequested,
};
use bevy_prototype_debug_lines::{DebugLines, DebugLinesPlugin};

use crate::{
    config::{
        CradleConfig, BACKGROUND, LIFT_ANGLE_DEGREES, TIME_STEP, WINDOW_HEIGHT, WINDOW_WIDTH,
    },
    driver::{Driver, Event, EventSource, Renderer, RunState, Simulation},
    error::{CradleError, EngineError, InputError},
    grab::GrabPlugin,
    physics::{PbdEngine, World},
    reset::{ResetPlugin, ResetState},
    sound::{CollisionSounds, SoundPlugin},
};

pub struct CradlePlugin;

impl Plugin for CradlePlugin {
    fn build(&self, app: &mut App) {
        let [r, g, b] = BACKGROUND;
        app.add_plugin(DebugLinesPlugin::default())
            .add_plugin(ResetPlugin)
            .add_plugin(GrabPlugin)
            .add_plugin(SoundPlugin)
            .insert_resource(ClearColor(Color::rgb_u8(r, g, b)))
            .insert_resource(FixedTime::new_from_secs(TIME_STEP))
            .init_resource::<CradleConfig>()
            .init_resource::<PendingEvents>()
            .init_resource::<ExitStatus>()
            .init_resource::<Frame>()
            .register_type::<CradleConfig>()
            .add_startup_system(setup)
            .add_system(spawn_cradle.in_schedule(OnEnter(ResetState::Playing)))
            .add_systems((collect_events, lift_listen, pause_listen, draw_frame))
            .add_system(
                drive
                    .in_schedule(CoreSchedule::FixedUpdate)
                    .run_if(resource_exists::<CradleDriver>()),
            );
    }
}

#[derive(Resource, Deref, DerefMut)]
pub struct CradleDriver(pub Driver<PbdEngine>);

impl CradleDriver {
    pub fn build(config: &CradleConfig) -> Result<Self, CradleError> {
        let simulation = Simulation::new(PbdEngine::new(config.sub_steps), config.clone())?;
        Ok(Self(Driver::new(simulation)))
    }
}

/// Marks entities that belong to one built cradle and go away on reset.
#[derive(Component)]
pub struct SceneEntity;

#[derive(Component)]
pub struct BallVisual {
    pub index: usize,
}

/// Shared with `main` so a fatal error can set the process exit code after
/// the event loop returns.
#[derive(Resource, Clone, Default)]
pub struct ExitStatus(Arc<AtomicBool>);

impl ExitStatus {
    pub fn fail(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn failed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Input gathered every frame, drained by the fixed-rate driver.
#[derive(Resource, Default)]
pub struct PendingEvents(Vec<Result<Event, InputError>>);

impl EventSource for PendingEvents {
    fn poll_events(&mut self) -> Vec<Result<Event, InputError>> {
        std::mem::take(&mut self.0)
    }
}

/// The last presented frame in world space. Written at the tick rate,
/// drawn at the display rate.
#[derive(Resource, Default, Debug, Clone, PartialEq)]
pub struct Frame {
    pub bar: Option<(Vec2, Vec2)>,
    pub rods: Vec<(Vec2, Vec2)>,
    pub balls: Vec<Vec2>,
}

/// World space has its origin at the window's top left with y pointing down.
pub fn to_screen(position: Vec2) -> Vec3 {
    Vec3::new(
        position.x - WINDOW_WIDTH * 0.5,
        WINDOW_HEIGHT * 0.5 - position.y,
        0.0,
    )
}

/// Cursor positions are measured from the bottom left of the window.
pub fn cursor_to_world(window: &Window, cursor: Vec2) -> Vec2 {
    Vec2::new(
        cursor.x - window.width() * 0.5 + WINDOW_WIDTH * 0.5,
        window.height() * 0.5 - cursor.y + WINDOW_HEIGHT * 0.5,
    )
}

/// Builds a [`Frame`] and hands it over only once it is presented.
struct BevyRenderer<'a> {
    clear_color: &'a mut ClearColor,
    staged: Frame,
    presented: Option<Frame>,
}

impl Renderer for BevyRenderer<'_> {
    fn clear(&mut self, color: Color) -> Result<(), EngineError> {
        self.clear_color.0 = color;
        self.staged = Frame::default();
        Ok(())
    }

    fn draw(&mut self, world: &World) -> Result<(), EngineError> {
        self.staged.bar = world.anchor().map(|anchor| {
            (
                anchor.to_world(Vec2::new(-anchor.half_length, 0.0)),
                anchor.to_world(Vec2::new(anchor.half_length, 0.0)),
            )
        });
        for joint in world.joints() {
            let (Some(start), Some(end)) = (world.anchor_point(joint), world.body_point(joint))
            else {
                return Err(EngineError::Render(format!(
                    "pin joint for {:?} has nothing to hang from",
                    joint.body
                )));
            };
            self.staged.rods.push((start, end));
        }
        self.staged
            .balls
            .extend(world.bodies().iter().map(|body| body.position));
        Ok(())
    }

    fn present(&mut self) -> Result<(), EngineError> {
        self.presented = Some(std::mem::take(&mut self.staged));
        Ok(())
    }
}

fn setup(mut commands: Commands) {
    commands.spawn((
        Camera2dBundle {
            transform: Transform::from_xyz(0., 0., 100.),
            ..Default::default()
        },
        Name::new("Camera"),
    ));

    info!("Press 'R' to reset");
    info!("Press 'Space' to pause");
    info!("Press 'S' to toggle sound");
    info!("Press '1'-'9' to lift that many balls");
    info!("Drag a ball with the left mouse button");
    info!("Press 'Escape' to quit");
}

fn spawn_cradle(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    config: Res<CradleConfig>,
    driver: Option<Res<CradleDriver>>,
    status: Res<ExitStatus>,
    mut exit: EventWriter<AppExit>,
) {
    // a refused reset comes back to Playing with the cradle still in place
    if driver.is_some() {
        return;
    }

    let driver = match CradleDriver::build(&config) {
        Ok(driver) => driver,
        Err(err) => {
            error!("{err}");
            status.fail();
            exit.send(AppExit);
            return;
        }
    };

    let ball_mesh = meshes.add(shape::Circle::new(config.radius).into());
    let ball_material = materials.add(ColorMaterial::from(Color::DARK_GRAY));
    for (index, body) in driver.world().bodies().iter().enumerate() {
        commands.spawn((
            MaterialMesh2dBundle {
                mesh: ball_mesh.clone().into(),
                material: ball_material.clone(),
                transform: Transform::from_translation(to_screen(body.position)),
                ..default()
            },
            BallVisual { index },
            SceneEntity,
            Name::new(format!("Ball {}", index)),
        ));
    }

    commands.insert_resource(driver);
}

fn collect_events(
    keys: Res<Input<KeyCode>>,
    mut close_requests: EventReader<WindowCloseRequested>,
    mut keyboard: EventReader<KeyboardInput>,
    mut pending: ResMut<PendingEvents>,
) {
    for _ in close_requests.iter() {
        pending.0.push(Ok(Event::Quit));
    }
    if keys.just_pressed(KeyCode::Escape) {
        pending.0.push(Ok(Event::Quit));
    }
    for input in keyboard.iter() {
        pending.0.push(match input.key_code {
            Some(_) => Ok(Event::Other),
            None => Err(InputError::UnmappedKey(input.scan_code)),
        });
    }
}

const LIFT_KEYS: [KeyCode; 9] = [
    KeyCode::Key1,
    KeyCode::Key2,
    KeyCode::Key3,
    KeyCode::Key4,
    KeyCode::Key5,
    KeyCode::Key6,
    KeyCode::Key7,
    KeyCode::Key8,
    KeyCode::Key9,
];

fn lift_listen(keys: Res<Input<KeyCode>>, driver: Option<ResMut<CradleDriver>>) {
    let Some(mut driver) = driver else {
        return;
    };
    if let Some(index) = LIFT_KEYS.iter().position(|key| keys.just_pressed(*key)) {
        let count = index + 1;
        info!("Lifting {} balls", count);
        let simulation = driver.simulation_mut();
        simulation
            .cradle
            .lift(&mut simulation.world, count, LIFT_ANGLE_DEGREES.to_radians());
    }
}

fn pause_listen(keys: Res<Input<KeyCode>>, driver: Option<ResMut<CradleDriver>>) {
    let Some(mut driver) = driver else {
        return;
    };
    if keys.just_pressed(KeyCode::Space) {
        let paused = !driver.is_paused();
        info!("{}", if paused { "Pause" } else { "Resume" });
        driver.set_paused(paused);
    }
}

/// Whether the app should exit after a tick. Failures also mark the exit status.
fn should_exit(outcome: Result<RunState, CradleError>, status: &ExitStatus) -> bool {
    match outcome {
        Ok(RunState::Running) => false,
        Ok(RunState::Stopped) => true,
        Err(err) => {
            error!("{err}");
            status.fail();
            true
        }
    }
}

fn drive(
    mut driver: ResMut<CradleDriver>,
    mut pending: ResMut<PendingEvents>,
    mut clear_color: ResMut<ClearColor>,
    mut frame: ResMut<Frame>,
    mut sounds: ResMut<CollisionSounds>,
    status: Res<ExitStatus>,
    mut exit: EventWriter<AppExit>,
) {
    let mut renderer = BevyRenderer {
        clear_color: &mut clear_color,
        staged: Frame::default(),
        presented: None,
    };

    let outcome = driver.tick(&mut *pending, &mut renderer);
    if let Some(presented) = renderer.presented {
        *frame = presented;
    }
    sounds.queue(driver.recent_contacts());

    if matches!(outcome, Ok(RunState::Stopped)) {
        info!(
            "Stopped after {} steps, {} collisions",
            driver.steps(),
            driver.contacts()
        );
    }
    if should_exit(outcome, &status) {
        exit.send(AppExit);
    }
}

fn draw_frame(
    frame: Res<Frame>,
    mut lines: ResMut<DebugLines>,
    mut balls: Query<(&BallVisual, &mut Transform)>,
) {
    if let Some((start, end)) = frame.bar {
        lines.line_colored(to_screen(start), to_screen(end), 0.0, Color::BLACK);
    }
    for (start, end) in &frame.rods {
        lines.line_colored(to_screen(*start), to_screen(*end), 0.0, Color::GRAY);
    }
    for (visual, mut transform) in balls.iter_mut() {
        if let Some(position) = frame.balls.get(visual.index) {
            transform.translation = to_screen(*position);
        }
    }
}
