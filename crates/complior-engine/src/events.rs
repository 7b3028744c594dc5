//! Event Bus (spec §4.J). Single-threaded typed pub/sub over a fixed event
//! map (spec §3: "scan.started, scan.completed, file.changed, score.updated,
//! fix.validated, fix.undone"). Handlers run synchronously, in insertion
//! order, on `emit`; there is no backpressure and no cross-thread delivery.
//!
//! Grounded on the teacher's removed `judge/mod.rs` ordered-dispatch style
//! (a fixed, ordered list walked linearly) adapted here to fan-out rather
//! than first-match.

use crate::api::{AppliedFile, FixValidation, ScoreBreakdown};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ScanStarted {
    pub project_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ScanCompleted {
    pub project_path: PathBuf,
    pub total_score: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct FileChanged {
    pub file: AppliedFile,
}

#[derive(Debug, Clone)]
pub struct ScoreUpdated {
    pub before: f64,
    pub after: ScoreBreakdown,
}

#[derive(Debug, Clone)]
pub struct FixValidated {
    pub validation: FixValidation,
}

#[derive(Debug, Clone)]
pub struct FixUndone {
    pub history_id: u64,
    pub validation: FixValidation,
}

/// One variant per fixed event in the map; handlers match on this rather
/// than subscribing per-name, since the set is closed by spec.
#[derive(Debug, Clone)]
pub enum Event {
    ScanStarted(ScanStarted),
    ScanCompleted(ScanCompleted),
    FileChanged(FileChanged),
    ScoreUpdated(ScoreUpdated),
    FixValidated(FixValidated),
    FixUndone(FixUndone),
}

type Handler = Box<dyn Fn(&Event) + Send>;

/// Not `Sync`: the core is single-threaded (spec §5), so no handler needs
/// to survive being called from more than one thread.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<Handler>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn subscribe(&mut self, handler: impl Fn(&Event) + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Invokes every handler, in subscription order, with the same event.
    /// Handlers must not mutate the payload (spec §4.J); `&Event` enforces
    /// that at the type level.
    pub fn emit(&self, event: Event) {
        for handler in &self.handlers {
            handler(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn handlers_run_in_subscription_order() {
        let mut bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        bus.subscribe(move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        bus.subscribe(move |_| o2.lock().unwrap().push(2));

        bus.emit(Event::ScanStarted(ScanStarted {
            project_path: PathBuf::from("/proj"),
        }));

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn every_handler_receives_every_emitted_event() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(0usize));
        let seen2 = seen.clone();
        bus.subscribe(move |_| *seen2.lock().unwrap() += 1);

        bus.emit(Event::FileChanged(FileChanged {
            file: AppliedFile {
                path: "a.ts".to_string(),
                action: crate::api::FileAction::Create,
                backup_path: String::new(),
            },
        }));
        bus.emit(Event::FileChanged(FileChanged {
            file: AppliedFile {
                path: "b.ts".to_string(),
                action: crate::api::FileAction::Create,
                backup_path: String::new(),
            },
        }));

        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[test]
    fn no_subscribers_is_a_harmless_emit() {
        let bus = EventBus::new();
        bus.emit(Event::ScanStarted(ScanStarted {
            project_path: PathBuf::from("/proj"),
        }));
    }
}
