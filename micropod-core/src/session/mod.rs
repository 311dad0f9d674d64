pub mod events;
pub mod playback;
pub mod recording;
pub mod resources;
