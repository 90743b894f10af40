use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

use crate::kernel::notify::AmqpConfig;
use crate::kernel::slurm::ssh::SshConfig;

/// Which scheduler backend handles submissions and queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBackend {
    Ssh,
    Rest,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub port: u16,
    /// Reconciler period, in minutes.
    pub polling_interval: u64,
    pub database_url: String,
    pub submit_backend: SubmitBackend,
    pub ssh: SshConfig,
    pub slurm_rest_url: Option<String>,
    pub slurm_rest_token: String,
    pub amqp: AmqpConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let username = env::var("SSH_USERNAME").context("SSH_USERNAME must be set")?;
        let key_path = env::var("SSH_KEY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(format!("/home/{username}/.ssh/id_ed25519")));
        let ssh = SshConfig {
            hostname: env::var("SSH_HOSTNAME").context("SSH_HOSTNAME must be set")?,
            username,
            key_path,
        };

        let submit_backend = match env::var("SUBMIT_BACKEND")
            .unwrap_or_else(|_| "ssh".to_string())
            .as_str()
        {
            "ssh" => SubmitBackend::Ssh,
            "rest" => SubmitBackend::Rest,
            other => bail!("SUBMIT_BACKEND must be \"ssh\" or \"rest\", got {other:?}"),
        };
        let slurm_rest_url = env::var("SLURM_REST_URL").ok();
        if submit_backend == SubmitBackend::Rest && slurm_rest_url.is_none() {
            bail!("SLURM_REST_URL must be set when SUBMIT_BACKEND=rest");
        }

        Ok(Self {
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "slurm-proxy".to_string()),
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "5001".to_string())
                .parse()
                .context("APP_PORT must be a valid number")?,
            polling_interval: env::var("MONITOR_POLLING_INTERVAL")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("MONITOR_POLLING_INTERVAL must be a number of minutes")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            submit_backend,
            ssh,
            slurm_rest_url,
            slurm_rest_token: env::var("SLURM_REST_TOKEN").unwrap_or_default(),
            amqp: AmqpConfig {
                host: env::var("RABBITMQ_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: env::var("RABBITMQ_PORT")
                    .unwrap_or_else(|_| "5672".to_string())
                    .parse()
                    .context("RABBITMQ_PORT must be a valid number")?,
                username: env::var("RABBITMQ_USERNAME").unwrap_or_else(|_| "guest".to_string()),
                password: env::var("RABBITMQ_PASSWORD").unwrap_or_else(|_| "guest".to_string()),
                path: env::var("RABBITMQ_PATH").unwrap_or_else(|_| "/".to_string()),
            },
        })
    }
}
