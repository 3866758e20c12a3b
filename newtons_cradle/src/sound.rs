use bevy::{prelude::*, utils::HashMap};

use crate::{
    config::{CLICK_DEBOUNCE_SECS, COLLISION_LOG_THRESHOLD, FULL_VOLUME_SPEED},
    physics::Contact,
};

pub struct SoundPlugin;

impl Plugin for SoundPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CollisionSounds>()
            .add_startup_system(load_click)
            .add_systems((sound_listen, play_clicks));
    }
}

#[derive(Resource)]
pub struct ClickSound(pub Handle<AudioSource>);

/// Turns contacts into click volumes. Off until toggled, like the desk toy
/// it imitates.
#[derive(Resource, Default)]
pub struct CollisionSounds {
    pub enabled: bool,
    queued: Vec<Contact>,
    /// Last time, in seconds, each pair of balls clicked.
    last_played: HashMap<(usize, usize), f64>,
}

impl CollisionSounds {
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.queued.clear();
        self.enabled
    }

    /// Keeps contacts until the next render frame plays them.
    pub fn queue(&mut self, contacts: &[Contact]) {
        if self.enabled {
            self.queued.extend_from_slice(contacts);
        }
    }

    pub fn take_queued(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.queued)
    }

    /// Volume to click `contact` at, or `None` when muted, too slow, or the
    /// same pair clicked less than [`CLICK_DEBOUNCE_SECS`] ago.
    pub fn cue(&mut self, contact: &Contact, now: f64) -> Option<f32> {
        if !self.enabled || contact.speed <= COLLISION_LOG_THRESHOLD {
            return None;
        }
        let pair = (contact.a.0.min(contact.b.0), contact.a.0.max(contact.b.0));
        if let Some(last) = self.last_played.get(&pair) {
            if now - last < CLICK_DEBOUNCE_SECS {
                return None;
            }
        }
        self.last_played.insert(pair, now);
        Some((contact.speed / FULL_VOLUME_SPEED).min(1.0))
    }
}

fn load_click(mut commands: Commands, asset_server: Res<AssetServer>) {
    commands.insert_resource(ClickSound(asset_server.load("sounds/click.wav")));
}

fn sound_listen(keys: Res<Input<KeyCode>>, mut sounds: ResMut<CollisionSounds>) {
    if keys.just_pressed(KeyCode::S) {
        let enabled = sounds.toggle();
        info!("Sound {}", if enabled { "on" } else { "off" });
    }
}

fn play_clicks(
    time: Res<Time>,
    audio: Res<Audio>,
    click: Option<Res<ClickSound>>,
    mut sounds: ResMut<CollisionSounds>,
) {
    let contacts = sounds.take_queued();
    let Some(click) = click else {
        return;
    };
    let now = time.elapsed_seconds_f64();
    for contact in &contacts {
        if let Some(volume) = sounds.cue(contact, now) {
            audio.play_with_settings(click.0.clone(), PlaybackSettings::ONCE.with_volume(volume));
        }
    }
}
