//! Task registry: the process-wide mapping from task names to the commands
//! they run. Read-only after startup; handlers and the notifier share it
//! through an `Arc` without locking.

use std::collections::HashMap;

/// How a registered task is executed and where its notifications go.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    /// Executable invoked on the scheduler host.
    pub cmd: String,
    /// Parameters always passed before the client-supplied ones.
    pub default_params: Vec<String>,
    pub description: String,
    /// Routing key for terminal-state notifications.
    pub notification_queue: String,
}

/// Name → descriptor table. Submissions naming an unregistered task fail
/// validation.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskDescriptor>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tasks this proxy ships with.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            "echo_hello_world",
            TaskDescriptor {
                cmd: "echo".to_string(),
                default_params: vec![],
                description: "Prints a generic hello world! message".to_string(),
                notification_queue: "tasks.echo_hello_world".to_string(),
            },
        );
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, descriptor: TaskDescriptor) {
        self.tasks.insert(name.into(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&TaskDescriptor> {
        self.tasks.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Routing key for a task name, if registered.
    pub fn notification_queue(&self, name: &str) -> Option<&str> {
        self.tasks
            .get(name)
            .map(|descriptor| descriptor.notification_queue.as_str())
    }

    pub fn registered_names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registers_echo() {
        let registry = TaskRegistry::builtin();
        assert!(registry.is_registered("echo_hello_world"));
        assert_eq!(registry.get("echo_hello_world").unwrap().cmd, "echo");
        assert_eq!(
            registry.notification_queue("echo_hello_world"),
            Some("tasks.echo_hello_world")
        );
    }

    #[test]
    fn unregistered_names_miss() {
        let registry = TaskRegistry::builtin();
        assert!(!registry.is_registered("transcode_video"));
        assert!(registry.get("transcode_video").is_none());
        assert!(registry.notification_queue("transcode_video").is_none());
    }
}
