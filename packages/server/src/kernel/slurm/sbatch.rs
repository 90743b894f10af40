//! Rendering of the submission command.
//!
//! A submission is one shell line executed on the scheduler host: the
//! mkdir calls for the task's directories, then `sbatch --parsable` with
//! the envelope's scheduling directives wrapping the registered command.

use crate::kernel::jobs::TaskEnvelope;
use crate::kernel::tasks::TaskDescriptor;

/// Join a directory and a file name without doubling separators.
fn join_path(dir: &str, file: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), file)
}

/// The command the scheduler runs for this task: registered executable,
/// registry defaults, then the client's params, space-joined.
pub fn render_task_cmd(descriptor: &TaskDescriptor, params: &[String]) -> String {
    let mut parts = Vec::with_capacity(1 + descriptor.default_params.len() + params.len());
    parts.push(descriptor.cmd.clone());
    parts.extend(descriptor.default_params.iter().cloned());
    parts.extend(params.iter().cloned());
    parts.join(" ")
}

/// Render the full submission line for a validated envelope.
///
/// `--time` is emitted only when the envelope carries a non-empty limit.
pub fn render_submission(task: &TaskEnvelope, descriptor: &TaskDescriptor) -> String {
    let dirs = &task.dirs;
    let dir_cmd = [&dirs.input, &dirs.output, &dirs.error]
        .iter()
        .map(|dir| format!("mkdir -p {dir}"))
        .collect::<Vec<_>>()
        .join(" ; ");

    let slurm = &task.slurm;
    let mut sbatch = vec![
        "sbatch".to_string(),
        "--parsable".to_string(),
        format!("--job-name={}", slurm.job_name),
        format!("--output={}", join_path(&dirs.output, &slurm.output)),
        format!("--error={}", join_path(&dirs.error, &slurm.error)),
        format!("--nodes={}", slurm.nodes),
        format!("--mem={}", slurm.mem),
        format!("--cpus-per-task={}", slurm.cpus_per_task),
        format!("--ntasks-per-node={}", slurm.ntasks_per_node),
        format!("--partition={}", slurm.partition),
    ];
    if !slurm.time.is_empty() {
        sbatch.push(format!("--time={}", slurm.time));
    }
    sbatch.push(format!(
        "--wrap='{}'",
        render_task_cmd(descriptor, &task.params)
    ));

    format!("{dir_cmd} ; {}", sbatch.join(" "))
}
