//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use webpilot_flows::{PrivateKey, SeedPhrase};

use crate::config::PilotConfig;
use crate::session::PilotSession;

#[derive(Parser)]
#[command(
    name = "webpilot",
    version,
    about = "Multi-context UI automation driver for extension/dapp testing"
)]
pub struct Cli {
    /// Optional TOML config file; env vars (WEBPILOT_*) override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Probe the remote end and session liveness.
    Check,
    /// List the flows this binary can run.
    Flows,
    /// Run one flow against a live session and print its report.
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Flow to run.
    #[arg(value_enum)]
    pub flow: FlowName,

    /// Recovery phrase for import-seed.
    #[arg(long)]
    pub seed: Option<String>,

    /// Raw private key for import-key.
    #[arg(long)]
    pub private_key: Option<String>,

    /// External application URL for connect-dapp.
    #[arg(long)]
    pub dapp_url: Option<String>,

    /// Popup route to open before the flow starts.
    #[arg(long, default_value = "home")]
    pub route: String,

    /// Settings subpage test-id for the settings flow.
    #[arg(long)]
    pub subpage: Option<String>,

    /// Asset row test-id for send-chord.
    #[arg(long, default_value = "asset-row-0")]
    pub row: String,

    /// Whole-flow deadline, e.g. "90s" or "2m".
    #[arg(long, value_parser = humantime::parse_duration)]
    pub flow_timeout: Option<Duration>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FlowName {
    /// Import a wallet from a recovery phrase.
    ImportSeed,
    /// Import a wallet from a raw private key.
    ImportKey,
    /// Connect an external application through the approval popup.
    ConnectDapp,
    /// Keyboard-only navigation to the settings section.
    Settings,
    /// Meta+Enter chord from a focused asset row to the send route.
    SendChord,
}

impl FlowName {
    pub fn describe(&self) -> &'static str {
        match self {
            FlowName::ImportSeed => "import-seed: wallet import from a 12/24-word phrase",
            FlowName::ImportKey => "import-key: wallet import from a raw private key",
            FlowName::ConnectDapp => "connect-dapp: dapp connect via the approval popup",
            FlowName::Settings => "settings: keyboard-only settings navigation",
            FlowName::SendChord => "send-chord: Meta+Enter from an asset row to send",
        }
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let mut cfg = PilotConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Command::Check => check(cfg).await,
        Command::Flows => {
            for flow in [
                FlowName::ImportSeed,
                FlowName::ImportKey,
                FlowName::ConnectDapp,
                FlowName::Settings,
                FlowName::SendChord,
            ] {
                println!("{}", flow.describe());
            }
            Ok(())
        }
        Command::Run(args) => {
            if let Some(timeout) = args.flow_timeout {
                cfg.flow_timeout_ms = timeout.as_millis() as u64;
            }
            run(cfg, args).await
        }
    }
}

async fn check(cfg: PilotConfig) -> Result<()> {
    let session = PilotSession::connect(cfg)
        .await
        .context("could not establish a WebDriver session")?;
    session.registry().ensure_live().await?;
    println!("remote end ready, session live");
    session.quit().await?;
    Ok(())
}

async fn run(cfg: PilotConfig, args: RunArgs) -> Result<()> {
    // Validate flow inputs before paying for a session.
    match args.flow {
        FlowName::ImportSeed if args.seed.is_none() => {
            bail!("--seed is required for import-seed")
        }
        FlowName::ImportKey if args.private_key.is_none() => {
            bail!("--private-key is required for import-key")
        }
        FlowName::ConnectDapp if args.dapp_url.is_none() => {
            bail!("--dapp-url is required for connect-dapp")
        }
        _ => {}
    }

    let session = PilotSession::connect(cfg)
        .await
        .context("could not establish a WebDriver session")?;
    info!(flow = ?args.flow, "session established");

    let flows = session.flows();
    let report = match args.flow {
        FlowName::ImportSeed => {
            let Some(seed) = args.seed.as_deref() else {
                bail!("--seed is required for import-seed");
            };
            let phrase = SeedPhrase::parse(seed)?;
            let popup = session.open_popup(&args.route).await?;
            session
                .run_flow("import-seed", |fctx| async move {
                    flows.import_wallet_by_seed(&fctx, &popup, &phrase).await
                })
                .await?
        }
        FlowName::ImportKey => {
            let Some(key) = args.private_key.as_deref() else {
                bail!("--private-key is required for import-key");
            };
            let key = PrivateKey::parse(key)?;
            let popup = session.open_popup(&args.route).await?;
            session
                .run_flow("import-key", |fctx| async move {
                    flows
                        .import_wallet_by_private_key(&fctx, &popup, &key)
                        .await
                })
                .await?
        }
        FlowName::ConnectDapp => {
            let Some(dapp_url) = args.dapp_url.as_deref() else {
                bail!("--dapp-url is required for connect-dapp");
            };
            let dapp = session.open_dapp(dapp_url).await?;
            session
                .run_flow("connect-dapp", |fctx| async move {
                    flows.connect_to_dapp(&fctx, &dapp).await
                })
                .await?
        }
        FlowName::Settings => {
            let popup = session.open_popup(&args.route).await?;
            let subpage = args.subpage.clone();
            session
                .run_flow("settings", |fctx| async move {
                    flows
                        .navigate_to_settings(&fctx, &popup, subpage.as_deref())
                        .await
                })
                .await?
        }
        FlowName::SendChord => {
            let popup = session.open_popup(&args.route).await?;
            let row = args.row.clone();
            session
                .run_flow("send-chord", |fctx| async move {
                    flows.send_via_chord(&fctx, &popup, &row).await
                })
                .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    session.quit().await?;
    Ok(())
}
