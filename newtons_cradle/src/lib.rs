//! A Newton's cradle: balls on pin joints under a bar, stepped at a fixed
//! 60 Hz and drawn with Bevy.

pub mod config;
pub mod driver;
pub mod error;
pub mod grab;
pub mod physics;
pub mod plugin;
pub mod reset;
pub mod scene;
pub mod sound;
