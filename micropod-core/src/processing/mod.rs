pub mod capture_buffer;
pub mod clock;
pub mod waveform;
