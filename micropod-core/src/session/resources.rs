//! Scoped ownership of the recording hardware.
//!
//! Each platform resource a take touches is wrapped the moment it is
//! obtained. Stop, discard, failure and session drop all funnel into the
//! same `take()` + release, so a resource is released exactly once whichever
//! path gets there first.

use std::fmt;
use std::time::Duration;

use crate::models::error::MediaError;
use crate::traits::capture_backend::{CadenceTimer, MicrophoneStream, PreviewPlayer, RecordingEventSink};

/// Exclusive claim on the microphone.
pub struct DeviceLease {
    stream: Option<Box<dyn MicrophoneStream>>,
    label: String,
}

impl DeviceLease {
    pub fn new(stream: Box<dyn MicrophoneStream>) -> Self {
        let label = stream.label();
        Self {
            stream: Some(stream),
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_held(&self) -> bool {
        self.stream.is_some()
    }

    pub(crate) fn start(&mut self, timeslice: Duration, events: RecordingEventSink) -> Result<(), MediaError> {
        match self.stream.as_mut() {
            Some(stream) => stream.start(timeslice, events),
            None => Err(MediaError::DeviceUnavailable(format!(
                "{} was already released",
                self.label
            ))),
        }
    }

    /// Stop every track of the stream now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            log::debug!("Releasing {}", self.label);
            stream.stop();
        }
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for DeviceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLease")
            .field("label", &self.label)
            .field("held", &self.is_held())
            .finish()
    }
}

/// The running elapsed-seconds timer.
pub(crate) struct CadenceGuard {
    timer: Option<Box<dyn CadenceTimer>>,
}

impl CadenceGuard {
    pub(crate) fn new(timer: Box<dyn CadenceTimer>) -> Self {
        Self { timer: Some(timer) }
    }

    pub(crate) fn cancel(mut self) {
        self.cancel_inner();
    }

    fn cancel_inner(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl Drop for CadenceGuard {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

/// The preview player of a finished take.
pub(crate) struct PreviewGuard {
    player: Option<Box<dyn PreviewPlayer>>,
}

impl PreviewGuard {
    pub(crate) fn new(player: Box<dyn PreviewPlayer>) -> Self {
        Self { player: Some(player) }
    }

    pub(crate) fn play(&mut self) -> Result<(), MediaError> {
        match self.player.as_mut() {
            Some(player) => player.play(),
            None => Err(MediaError::PlaybackRejected("preview was revoked".into())),
        }
    }

    pub(crate) fn pause(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
    }

    pub(crate) fn revoke(mut self) {
        self.revoke_inner();
    }

    fn revoke_inner(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.pause();
            player.revoke();
        }
    }
}

impl Drop for PreviewGuard {
    fn drop(&mut self) {
        self.revoke_inner();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CountingStream {
        stops: Arc<AtomicUsize>,
    }

    impl MicrophoneStream for CountingStream {
        fn start(&mut self, _timeslice: Duration, _events: RecordingEventSink) -> Result<(), MediaError> {
            Ok(())
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn lease() -> (DeviceLease, Arc<AtomicUsize>) {
        let stops = Arc::new(AtomicUsize::new(0));
        let lease = DeviceLease::new(Box::new(CountingStream {
            stops: Arc::clone(&stops),
        }));
        (lease, stops)
    }

    #[test]
    fn explicit_release_stops_once() {
        let (lease, stops) = lease();
        lease.release();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases() {
        let (lease, stops) = lease();
        assert!(lease.is_held());
        drop(lease);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lease_dropped_inside_event_is_released() {
        let (lease, stops) = lease();
        let event = crate::traits::capture_backend::RecordingEvent::AccessGranted(lease);
        drop(event);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    struct CountingTimer {
        cancels: Arc<AtomicUsize>,
    }

    impl CadenceTimer for CountingTimer {
        fn cancel(&mut self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn cadence_cancelled_once() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let guard = CadenceGuard::new(Box::new(CountingTimer {
            cancels: Arc::clone(&cancels),
        }));
        guard.cancel();
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }
}
