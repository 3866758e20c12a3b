use bevy::prelude::*;

use crate::{
    config::CradleConfig,
    plugin::{CradleDriver, Frame, SceneEntity},
};

pub struct ResetPlugin;

impl Plugin for ResetPlugin {
    fn build(&self, app: &mut App) {
        app.add_state::<ResetState>()
            .add_system(reset_listen.in_set(OnUpdate(ResetState::Playing)))
            .add_system(rebuild.in_schedule(OnEnter(ResetState::Reset)));
    }
}

#[derive(States, PartialEq, Eq, Debug, Clone, Hash, Default)]
pub enum ResetState {
    #[default]
    Playing,
    Reset,
}

fn reset_listen(keys: Res<Input<KeyCode>>, mut app_state: ResMut<NextState<ResetState>>) {
    if keys.just_pressed(KeyCode::R) {
        app_state.set(ResetState::Reset);
    }
}

/// Tears the cradle down so entering `Playing` builds it again from the
/// current config. An invalid config leaves the running cradle alone.
fn rebuild(
    mut commands: Commands,
    config: Res<CradleConfig>,
    scene: Query<Entity, With<SceneEntity>>,
    mut frame: ResMut<Frame>,
    mut app_state: ResMut<NextState<ResetState>>,
) {
    app_state.set(ResetState::Playing);

    if let Err(err) = config.validate() {
        warn!("Keeping the current cradle: {err}");
        return;
    }

    for e in scene.iter() {
        commands.entity(e).despawn_recursive();
    }
    commands.remove_resource::<CradleDriver>();
    *frame = Frame::default();
    info!("Rebuilding cradle");
}
