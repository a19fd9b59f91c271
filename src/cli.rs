use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leetcode_tracker_core::command::Command;
use leetcode_tracker_core::push::{PushError, PushOrchestrator};
use leetcode_tracker_core::status::StatusIndicator;
use leetcode_tracker_core::submission::Submission;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use crate::github::GitHubClient;
use crate::load_config::{load_config, AppConfig};
use crate::oauth::{authorize_url, OAuthExchangeClient};
use crate::storage::FileStore;

pub type Orchestrator = PushOrchestrator<GitHubClient, FileStore, OAuthExchangeClient>;

/// CLI for leetcode-tracker: publish accepted submissions to GitHub.
#[derive(Parser)]
#[clap(
    name = "leetcode-tracker",
    version,
    about = "Push accepted LeetCode submissions, stats and a README to your GitHub repository"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push one accepted submission read from a JSON file ("-" for stdin)
    Push {
        #[clap(long)]
        submission: PathBuf,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Read commands as JSON lines on stdin and answer with JSON lines on stdout
    Listen {
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Print the authorize URL, or finish a login with the returned code
    Login {
        #[clap(long)]
        code: Option<String>,
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Forget the cached token and username
    Logout {
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Show the GitHub user the cached token belongs to
    Whoami {
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(AppConfig::from_env()),
    }
}

/// Wire the GitHub client, file store and exchange client into an orchestrator.
pub async fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let api = GitHubClient::new(
        &config.github.api_base,
        &config.github.user_agent,
        config.http_timeout,
    )
    .context("building GitHub client")?;
    let exchange = OAuthExchangeClient::new(&config.oauth.exchange_url, config.http_timeout)
        .context("building OAuth exchange client")?;
    let store = FileStore::new(&config.storage_path);

    let orchestrator = PushOrchestrator::new(api, store, exchange, config.repository.clone())
        .with_status(StatusIndicator::new(config.status_revert));

    if let Some(token) = &config.env_token {
        let identities = orchestrator.identities();
        let cached = identities
            .get_token()
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        if cached.as_deref() != Some(token.as_str()) {
            // A different token may belong to a different user.
            identities.clear().await.map_err(|e| anyhow::anyhow!(e))?;
            identities
                .set_token(token)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            info!("Stored token from the environment");
        }
    }
    Ok(orchestrator)
}

async fn read_submission(path: &Path) -> Result<Submission> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut tokio::io::stdin(), &mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading submission {}", path.display()))?
    };
    serde_json::from_str(&raw).context("parsing submission JSON")
}

async fn listen(orchestrator: &Orchestrator) -> Result<()> {
    let mut status = orchestrator.status().subscribe();
    let status_log = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            info!(status = ?current, "[STATUS] Push status changed");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Command>(&line) {
            Ok(command) => serde_json::to_string(&orchestrator.dispatch(command).await)?,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed command");
                serde_json::json!({
                    "type": "INVALID_COMMAND",
                    "payload": { "message": e.to_string() }
                })
                .to_string()
            }
        };
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    status_log.abort();
    info!("stdin closed, listener stopping");
    Ok(())
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Push { submission, config } => {
            let config = resolve_config(config.as_deref())?;
            let submission = read_submission(&submission).await?;
            let orchestrator = build_orchestrator(&config).await?;
            match orchestrator.push(&submission).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(())
                }
                Err(failure) => {
                    if matches!(failure.source, PushError::NotAuthenticated) {
                        eprintln!("Not logged in: run `leetcode-tracker login` or set the token env var");
                    }
                    Err(failure.into())
                }
            }
        }
        Commands::Listen { config } => {
            let config = resolve_config(config.as_deref())?;
            let orchestrator = build_orchestrator(&config).await?;
            listen(&orchestrator).await
        }
        Commands::Login { code, config } => {
            let config = resolve_config(config.as_deref())?;
            match code {
                None => {
                    let client_id = config
                        .oauth
                        .client_id
                        .as_deref()
                        .context("oauth.client_id is not configured")?;
                    let redirect_uri = config
                        .oauth
                        .redirect_uri
                        .as_deref()
                        .context("oauth.redirect_uri is not configured")?;
                    println!("{}", authorize_url(client_id, redirect_uri)?);
                    Ok(())
                }
                Some(code) => {
                    let orchestrator = build_orchestrator(&config).await?;
                    let identity = orchestrator.login(&code).await.map_err(|e| {
                        error!(error = %e, "Login failed");
                        e
                    })?;
                    println!("Logged in as {}", identity.username);
                    Ok(())
                }
            }
        }
        Commands::Logout { config } => {
            let config = resolve_config(config.as_deref())?;
            let orchestrator = build_orchestrator(&config).await?;
            orchestrator
                .logout()
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Logged out");
            Ok(())
        }
        Commands::Whoami { config } => {
            let config = resolve_config(config.as_deref())?;
            let orchestrator = build_orchestrator(&config).await?;
            let identity = orchestrator.resolve_identity().await?;
            println!("{}", identity.username);
            Ok(())
        }
    }
}
