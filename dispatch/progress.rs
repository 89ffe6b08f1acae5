use crate::stratify::Operation;

/// Observer for reporting dispatch progress. Methods are called from worker
/// threads, so implementations must be `Sync`.
pub trait DispatchObserver: Sync {
    fn on_start(&self, operation: Operation, total_keys: usize) {
        let _ = (operation, total_keys);
    }
    fn on_key_finished(&self, operation: Operation, key: &str, failures: usize) {
        let _ = (operation, key, failures);
    }
    fn on_finish(&self, operation: Operation) {
        let _ = operation;
    }
}

#[derive(Default)]
pub struct NoopDispatchProgress;

impl DispatchObserver for NoopDispatchProgress {}
