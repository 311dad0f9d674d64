pub mod config;
pub mod episode;
pub mod error;
pub mod recorded_audio;
pub mod state;
