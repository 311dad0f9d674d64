pub mod capture_backend;
pub mod collaborators;
pub mod observers;
pub mod playback_resource;
