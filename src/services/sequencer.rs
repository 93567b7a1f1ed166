use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic generation counter enforcing last-request-wins per panel.
///
/// Each fetch takes a ticket before any network call. A slow response
/// whose ticket is no longer current is dropped instead of overwriting
/// data from a newer request.
#[derive(Debug, Default, Clone)]
pub struct RequestSequencer {
    generation: Arc<AtomicU64>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RequestTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket {
            sequencer: Arc::clone(&self.generation),
            generation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestTicket {
    sequencer: Arc<AtomicU64>,
    generation: u64,
}

impl RequestTicket {
    pub fn is_current(&self) -> bool {
        self.sequencer.load(Ordering::SeqCst) == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
