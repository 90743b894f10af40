//! Remote-shell scheduler backend.
//!
//! One authenticated ssh2 session per executor, connected lazily on first
//! use and reconnected once on transport failure. The session is not
//! reentrant, so all callers serialize on its mutex; ssh2 is blocking, so
//! each command runs on the blocking thread pool.

use std::io::Read;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ssh2::Session;

use super::{
    parse_sacct_output, test_override, JobSnapshot, SchedulerClient, SchedulerError, SlurmState,
    SACCT_FORMAT,
};

/// Captured result of one remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// A channel that can run shell commands on the scheduler host.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn exec(&self, command: &str) -> Result<CommandOutput, SchedulerError>;
}

#[derive(Debug, Clone)]
pub struct SshConfig {
    pub hostname: String,
    pub username: String,
    pub key_path: PathBuf,
}

/// Persistent ssh2 session guarded by a mutex. `None` means not yet
/// connected (or dropped after a transport failure).
pub struct SshRemoteSession {
    config: SshConfig,
    session: Arc<Mutex<Option<Session>>>,
}

impl SshRemoteSession {
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            session: Arc::new(Mutex::new(None)),
        }
    }
}

fn transport(err: impl std::fmt::Display) -> SchedulerError {
    SchedulerError::Transport(err.to_string())
}

fn lock_session(slot: &Mutex<Option<Session>>) -> MutexGuard<'_, Option<Session>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn connect(config: &SshConfig) -> Result<Session, SchedulerError> {
    let stream =
        TcpStream::connect((config.hostname.as_str(), 22)).map_err(transport)?;
    let mut session = Session::new().map_err(transport)?;
    session.set_tcp_stream(stream);
    session.handshake().map_err(transport)?;
    session
        .userauth_pubkey_file(&config.username, None, &config.key_path, None)
        .map_err(transport)?;
    Ok(session)
}

fn run_command(session: &Session, command: &str) -> Result<CommandOutput, SchedulerError> {
    let mut channel = session.channel_session().map_err(transport)?;
    channel.exec(command).map_err(transport)?;
    let mut stdout = String::new();
    channel.read_to_string(&mut stdout).map_err(transport)?;
    let mut stderr = String::new();
    channel
        .stderr()
        .read_to_string(&mut stderr)
        .map_err(transport)?;
    channel.wait_close().map_err(transport)?;
    let exit_code = channel.exit_status().map_err(transport)?;
    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
    })
}

/// Run one command while holding the session lock: reuse the live session,
/// otherwise connect; on failure reconnect once and retry before surfacing.
fn exec_serialized(
    slot: &Mutex<Option<Session>>,
    config: &SshConfig,
    command: &str,
) -> Result<CommandOutput, SchedulerError> {
    let mut guard = lock_session(slot);
    let session = match guard.take() {
        Some(session) => session,
        None => connect(config)?,
    };
    match run_command(&session, command) {
        Ok(output) => {
            *guard = Some(session);
            Ok(output)
        }
        Err(err) => {
            tracing::warn!(error = %err, "remote command failed, reconnecting");
            let session = connect(config)?;
            let output = run_command(&session, command)?;
            *guard = Some(session);
            Ok(output)
        }
    }
}

#[async_trait]
impl RemoteSession for SshRemoteSession {
    async fn exec(&self, command: &str) -> Result<CommandOutput, SchedulerError> {
        let slot = Arc::clone(&self.session);
        let config = self.config.clone();
        let command = command.to_string();
        tokio::task::spawn_blocking(move || exec_serialized(&slot, &config, &command))
            .await
            .map_err(|err| transport(format!("ssh worker task failed: {err}")))?
    }
}

/// `SchedulerClient` over a remote shell: sacct for queries, the rendered
/// sbatch line for submission, scancel for cancellation.
pub struct SshSchedulerClient {
    session: Arc<dyn RemoteSession>,
}

impl SshSchedulerClient {
    pub fn new(session: Arc<dyn RemoteSession>) -> Self {
        Self { session }
    }

    pub fn connect_with(config: SshConfig) -> Self {
        Self::new(Arc::new(SshRemoteSession::new(config)))
    }
}

#[async_trait]
impl SchedulerClient for SshSchedulerClient {
    async fn query_job(&self, job_id: i64) -> Result<Option<JobSnapshot>, SchedulerError> {
        if let Some(snapshot) = test_override(job_id) {
            return Ok(Some(snapshot));
        }
        let command =
            format!("sacct -j {job_id} --format={SACCT_FORMAT} --noheader --parsable2");
        let output = self.session.exec(&command).await?;
        Ok(parse_sacct_output(&output.stdout).into_iter().next())
    }

    async fn query_by_state(
        &self,
        state: SlurmState,
    ) -> Result<Vec<JobSnapshot>, SchedulerError> {
        let command =
            format!("sacct --state {state} --format={SACCT_FORMAT} --noheader --parsable2");
        let output = self.session.exec(&command).await?;
        Ok(parse_sacct_output(&output.stdout))
    }

    async fn submit(&self, command: &str) -> Result<i64, SchedulerError> {
        let output = self.session.exec(command).await?;
        if !output.stderr.trim().is_empty() {
            return Err(SchedulerError::CommandFailed(
                output.stderr.trim().to_string(),
            ));
        }
        // --parsable output is `<id>` or `<id>;<cluster>`
        let raw = output.stdout.trim();
        let id_token = raw.split(';').next().unwrap_or("");
        let job_id: i64 = id_token.parse().map_err(|_| {
            SchedulerError::Parse(format!("expected a job id on stdout, got {raw:?}"))
        })?;
        if job_id < 0 {
            return Err(SchedulerError::Parse(format!(
                "scheduler returned an invalid job id {job_id}"
            )));
        }
        Ok(job_id)
    }

    async fn cancel(&self, job_id: i64) -> Result<(), SchedulerError> {
        let output = self.session.exec(&format!("scancel {job_id}")).await?;
        if output.exit_code != 0 {
            return Err(SchedulerError::CommandFailed(format!(
                "scancel {job_id} exited with {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}
