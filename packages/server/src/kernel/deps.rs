//! Server dependency container.
//!
//! All process-wide collaborators — store handle, scheduler client,
//! notification transport, task registry — are explicit values carried
//! here and injected into handlers and the reconciler at startup. No
//! ambient singletons.

use std::sync::Arc;

use crate::kernel::jobs::store::JobStore;
use crate::kernel::notify::Notifier;
use crate::kernel::slurm::SchedulerClient;
use crate::kernel::tasks::TaskRegistry;

#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn JobStore>,
    pub scheduler: Arc<dyn SchedulerClient>,
    pub notifier: Arc<dyn Notifier>,
    pub tasks: Arc<TaskRegistry>,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn JobStore>,
        scheduler: Arc<dyn SchedulerClient>,
        notifier: Arc<dyn Notifier>,
        tasks: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            store,
            scheduler,
            notifier,
            tasks,
        }
    }
}
