// Kernel - infrastructure with dependency injection
//
// ServerDeps holds all process-wide collaborators (store, scheduler
// client, notifier, task registry) and is injected into handlers and the
// reconciler at startup. Infrastructure only; request/response logic
// lives under server/.

pub mod deps;
pub mod jobs;
pub mod notify;
pub mod slurm;
pub mod tasks;
pub mod test_dependencies;

pub use deps::ServerDeps;
pub use tasks::{TaskDescriptor, TaskRegistry};
