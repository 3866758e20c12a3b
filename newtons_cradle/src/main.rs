use std::process::ExitCode;

use bevy::{prelude::*, winit::WinitSettings};
use bevy_inspector_egui::quick::ResourceInspectorPlugin;
use newtons_cradle::{
    config::{CradleConfig, WINDOW_HEIGHT, WINDOW_TITLE, WINDOW_WIDTH},
    plugin::{CradlePlugin, ExitStatus},
};

fn main() -> ExitCode {
    let status = ExitStatus::default();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: WINDOW_TITLE.to_string(),
                resolution: (WINDOW_WIDTH, WINDOW_HEIGHT).into(),
                resizable: false,
                ..default()
            }),
            // closing goes through the driver as a quit event
            close_when_requested: false,
            ..default()
        }))
        .insert_resource(WinitSettings {
            return_from_run: true,
            ..default()
        })
        .insert_resource(status.clone())
        .add_plugin(CradlePlugin)
        .add_plugin(ResourceInspectorPlugin::<CradleConfig>::default())
        .run();

    if status.failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
