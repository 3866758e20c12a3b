use bevy::{prelude::*, window::PrimaryWindow};

use crate::plugin::{cursor_to_world, CradleDriver};

pub struct GrabPlugin;

impl Plugin for GrabPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Grabbed>()
            .add_state::<GrabState>()
            .add_system(handle_grab_none.in_set(OnUpdate(GrabState::None)))
            .add_system(handle_grab_move.in_set(OnUpdate(GrabState::Moving)))
            .add_system(handle_grab_end.in_schedule(OnExit(GrabState::Moving)));
    }
}

#[derive(Resource)]
pub struct Grabbed {
    pub ball: Option<usize>,
    pub mouse_grab: MouseButton,
}

impl Default for Grabbed {
    fn default() -> Self {
        Self {
            ball: None,
            mouse_grab: MouseButton::Left,
        }
    }
}

#[derive(States, PartialEq, Eq, Debug, Clone, Hash, Default)]
pub enum GrabState {
    #[default]
    None,
    Moving,
}

fn cursor_in_world(windows: &Query<&Window, With<PrimaryWindow>>) -> Option<Vec2> {
    let window = windows.get_single().ok()?;
    let cursor = window.cursor_position()?;
    Some(cursor_to_world(window, cursor))
}

fn handle_grab_none(
    mut grabbed: ResMut<Grabbed>,
    mouse_input: Res<Input<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    driver: Option<Res<CradleDriver>>,
    mut grab_next_state: ResMut<NextState<GrabState>>,
) {
    if !mouse_input.just_pressed(grabbed.mouse_grab) {
        return;
    }
    let (Some(driver), Some(point)) = (driver, cursor_in_world(&windows)) else {
        return;
    };

    let simulation = driver.simulation();
    if let Some(index) = simulation.cradle.ball_at(&simulation.world, point) {
        debug!("grabbed ball {index}");
        grabbed.ball = Some(index);
        grab_next_state.set(GrabState::Moving);
    }
}

fn handle_grab_move(
    grabbed: Res<Grabbed>,
    mouse_input: Res<Input<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    driver: Option<ResMut<CradleDriver>>,
    mut grab_next_state: ResMut<NextState<GrabState>>,
) {
    let (true, Some(index), Some(mut driver)) =
        (mouse_input.pressed(grabbed.mouse_grab), grabbed.ball, driver)
    else {
        grab_next_state.set(GrabState::None);
        return;
    };

    if let Some(point) = cursor_in_world(&windows) {
        let simulation = driver.simulation_mut();
        simulation.cradle.drag(&mut simulation.world, index, point);
    }
}

fn handle_grab_end(mut grabbed: ResMut<Grabbed>, driver: Option<ResMut<CradleDriver>>) {
    grabbed.ball = None;
    if let Some(mut driver) = driver {
        let simulation = driver.simulation_mut();
        simulation.cradle.release(&mut simulation.world);
    }
}
