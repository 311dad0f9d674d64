//! Event channel from the platform into a session.
//!
//! Platform callbacks never touch session state directly. They push events
//! through an [`EventSink`]; the host drains them on its single loop via the
//! session's `process_events()`, so handlers run strictly in delivery order.
//!
//! Every sink is stamped with the generation (load or take) it was issued
//! for. When the session moves on to a new generation, events still in
//! flight for the old one are recognised and dropped.

use std::fmt;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

/// Identifies one load cycle (playback) or one take (recording).
pub type Generation = u64;

/// An event tagged with the generation it belongs to.
#[derive(Debug)]
pub struct Stamped<K> {
    pub generation: Generation,
    pub kind: K,
}

/// Sending half handed to the platform.
pub struct EventSink<K> {
    generation: Generation,
    tx: Sender<Stamped<K>>,
}

impl<K> EventSink<K> {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Deliver an event. If the owning session is gone the event is handed
    /// back so the caller can dispose of whatever it carries.
    pub fn send(&self, kind: K) -> Result<(), K> {
        self.tx
            .send(Stamped {
                generation: self.generation,
                kind,
            })
            .map_err(|e| e.into_inner().kind)
    }
}

impl<K> Clone for EventSink<K> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            tx: self.tx.clone(),
        }
    }
}

impl<K> fmt::Debug for EventSink<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Receiving half owned by a session, plus its generation counter.
pub(crate) struct EventQueue<K> {
    tx: Sender<Stamped<K>>,
    rx: Receiver<Stamped<K>>,
    generation: Generation,
}

impl<K> EventQueue<K> {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            generation: 0,
        }
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    /// Start a new generation and return its sink. Sinks from earlier
    /// generations keep working but their events are recognised as stale.
    pub(crate) fn advance(&mut self) -> EventSink<K> {
        self.generation += 1;
        self.sink()
    }

    pub(crate) fn sink(&self) -> EventSink<K> {
        EventSink {
            generation: self.generation,
            tx: self.tx.clone(),
        }
    }

    pub(crate) fn is_current(&self, event: &Stamped<K>) -> bool {
        event.generation == self.generation
    }

    pub(crate) fn try_next(&self) -> Option<Stamped<K>> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
