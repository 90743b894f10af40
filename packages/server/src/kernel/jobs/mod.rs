// Job lifecycle: the tracked-job model, its durable store, the
// registration/cancel operations, and the periodic reconciler.

pub mod job;
pub mod monitor;
pub mod reconciler;
pub mod store;
pub mod submit;
pub mod testing;

pub use job::{SlurmDirectives, TaskDirs, TaskEnvelope, TrackedJob};
pub use reconciler::{PassOutcome, PassStats, Reconciler};
pub use store::{JobStore, PgJobStore, StoreError};
