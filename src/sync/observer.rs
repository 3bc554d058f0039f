use std::sync::{Arc, Mutex};

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

use super::reconciler::ReconcileState;

/// Receives reconciler side effects. Every method defaults to a no-op.
pub trait SyncObserver: Send + Sync {
    /// Editing should be disabled until [`SyncObserver::unfreeze`].
    fn freeze(&self) {}

    fn unfreeze(&self) {}

    fn transition(&self, _state: &ReconcileState) {}

    /// The store was replaced with `count` days; views should reload.
    fn data_replaced(&self, _count: usize) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Records every callback as a line in a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    buffer: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: Arc<Mutex<Vec<String>>>) -> Self {
        Self { buffer }
    }

    /// Snapshot of the lines recorded so far.
    pub fn events(&self) -> Vec<String> {
        self.buffer
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }

    fn push(&self, line: String) {
        let mut lines = self.buffer.lock().unwrap_or_else(|p| p.into_inner());
        lines.push(line);
    }
}

impl SyncObserver for RecordingObserver {
    fn freeze(&self) {
        self.push("freeze".into());
    }

    fn unfreeze(&self) {
        self.push("unfreeze".into());
    }

    fn transition(&self, state: &ReconcileState) {
        self.push(format!("state {}", state));
    }

    fn data_replaced(&self, count: usize) {
        self.push(format!("data-replaced {}", count));
    }
}

/// Forwards callbacks to in-process listeners through an [`EventEmitter`].
///
/// Events: `sync:freeze`, `sync:unfreeze`, `sync:state` (payload is the
/// state name) and `sync:data-replaced` (payload is the day count).
#[cfg(feature = "emitter")]
pub struct EmitterObserver {
    emitter: Mutex<EventEmitter>,
}

#[cfg(feature = "emitter")]
impl EmitterObserver {
    pub const FREEZE: &'static str = "sync:freeze";
    pub const UNFREEZE: &'static str = "sync:unfreeze";
    pub const STATE: &'static str = "sync:state";
    pub const DATA_REPLACED: &'static str = "sync:data-replaced";

    pub fn new(emitter: EventEmitter) -> Self {
        Self {
            emitter: Mutex::new(emitter),
        }
    }

    fn emit(&self, event: &str, payload: String) {
        let mut emitter = self.emitter.lock().unwrap_or_else(|p| p.into_inner());
        emitter.emit(event, payload);
    }
}

#[cfg(feature = "emitter")]
impl SyncObserver for EmitterObserver {
    fn freeze(&self) {
        self.emit(Self::FREEZE, String::new());
    }

    fn unfreeze(&self) {
        self.emit(Self::UNFREEZE, String::new());
    }

    fn transition(&self, state: &ReconcileState) {
        self.emit(Self::STATE, state.to_string());
    }

    fn data_replaced(&self, count: usize) {
        self.emit(Self::DATA_REPLACED, count.to_string());
    }
}
