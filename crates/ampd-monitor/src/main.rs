//! `ampd-monitor`: watch the player's derived state from a terminal, or send
//! a single command.

mod tcp_channel;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use ampd_proto::config::Config;
use ampd_proto::protocol::Mode;
use ampd_sync::{
    deduplicate, spawn_publisher, ChannelAdapter, CommandDispatcher, DerivedSignals, Intent,
    PublisherOptions, SeekDirection, SyncStats,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tcp_channel::TcpChannel;

/// How long `send` waits for the connection and the first snapshot.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "ampd-monitor", version)]
struct Args {
    /// Bridge address (host:port); overrides the config file.
    #[arg(long)]
    address: Option<String>,

    /// Backend HTTP base URL used for cover links; overrides the config file.
    #[arg(long)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print every derived signal change as JSON lines (default).
    Watch,
    /// Print deduplicated raw snapshots.
    Snapshots,
    /// Send one command and exit.
    Send {
        #[command(subcommand)]
        intent: IntentArg,
    },
}

#[derive(Subcommand, Debug)]
enum IntentArg {
    Play,
    Pause,
    Stop,
    Next,
    Prev,
    /// Jump forward by the configured seek step.
    Forward,
    /// Jump back by the configured seek step.
    Back,
    /// Seek to an absolute position in seconds.
    Seek { secs: f64 },
    /// Add a library directory to the queue.
    AddDir { dir: String },
    /// Add a library directory and start playing.
    PlayDir { dir: String },
    AddPlaylist { name: String },
    Clear,
    Queue,
    /// Flip one of random, consume, single, crossfade, repeat.
    Toggle { mode: String },
}

fn init_logging() -> anyhow::Result<()> {
    let data_dir = ampd_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("monitor.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,ampd_sync=debug")),
        )
        .init();

    eprintln!("ampd-monitor log: {}", log_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging()?;

    let mut config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());
    if let Some(address) = args.address {
        config.backend.address = address;
    }
    if let Some(backend) = args.backend {
        config.backend.base_url = backend;
    }

    let channel = Arc::new(TcpChannel::spawn(
        config.backend.address.clone(),
        Duration::from_secs(config.backend.reconnect_delay_secs),
        config.sync.channel_capacity,
    ));

    let result = match args.command.unwrap_or(Cmd::Watch) {
        Cmd::Watch => watch(channel.as_ref(), &config).await,
        Cmd::Snapshots => snapshots(channel.as_ref()).await,
        Cmd::Send { intent } => send(Arc::clone(&channel), &config, intent).await,
    };

    channel.close();
    result
}

fn print_json<W: Write, T: serde::Serialize>(
    out: &mut W,
    kind: &str,
    value: &T,
) -> anyhow::Result<()> {
    let body = serde_json::to_value(value)?;
    writeln!(out, "{}", serde_json::json!({ "signal": kind, "value": body }))?;
    Ok(())
}

async fn watch(channel: &TcpChannel, config: &Config) -> anyhow::Result<()> {
    let signals = spawn_publisher(channel, PublisherOptions::from_config(config));
    let stop = CancellationToken::new();
    let on_ctrl_c = stop.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        on_ctrl_c.cancel();
    });

    let result = watch_signals(&signals, config, &mut std::io::stdout(), stop).await;
    info!("watch: {:?}", signals.stats().report());
    signals.shutdown().await;
    result
}

/// Print every signal change as a JSON line until `stop` fires.
async fn watch_signals<W: Write>(
    signals: &DerivedSignals,
    config: &Config,
    out: &mut W,
    stop: CancellationToken,
) -> anyhow::Result<()> {
    let mut tracks = signals.track_events();
    let mut modes = signals.mode_panel();
    let mut state = signals.playback_state();
    let mut queue = signals.queue_track_count();
    let mut open = signals.connection_open();
    let mut is_stream = signals.is_current_track_stream();
    let mut errors = signals.decode_errors();

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,

            track = tracks.recv() => match track {
                Ok(track) => print_json(out, "track", &track)?,
                Err(RecvError::Lagged(n)) => eprintln!("skipped {} track events", n),
                Err(RecvError::Closed) => break,
            },

            Ok(()) = modes.changed() => {
                let panel = *modes.borrow_and_update();
                print_json(out, "modes", &panel)?;
            }

            Ok(()) = state.changed() => {
                let value = state.borrow_and_update().map(|s| s.as_str());
                print_json(out, "state", &value)?;
                print_controls(out, signals, config)?;
            }

            Ok(()) = queue.changed() => {
                let count = *queue.borrow_and_update();
                print_json(out, "queue", &count)?;
                print_controls(out, signals, config)?;
            }

            Ok(()) = is_stream.changed() => {
                let stream = *is_stream.borrow_and_update();
                print_json(out, "stream", &stream)?;
                print_controls(out, signals, config)?;
            }

            Ok(()) = open.changed() => {
                let connected = *open.borrow_and_update();
                print_json(out, "connected", &connected)?;
                print_controls(out, signals, config)?;
            }

            Ok(err) = errors.recv() => {
                eprintln!("dropped message: {}", err);
            }
        }
    }
    Ok(())
}

/// Every input of `ControlPanelView` has its own branch in `watch_signals`;
/// each one re-prints the combined flags.
fn print_controls<W: Write>(
    out: &mut W,
    signals: &DerivedSignals,
    config: &Config,
) -> anyhow::Result<()> {
    let view = signals.control_panel(config.controls.seek_step_secs);
    print_json(
        out,
        "controls",
        &serde_json::json!({
            "controlsEnabled": view.controls_enabled,
            "showTrackInfo": view.show_track_info,
            "showSeekButtons": view.show_seek_buttons,
            "canClearQueue": view.can_clear_queue,
        }),
    )
}

async fn snapshots(channel: &TcpChannel) -> anyhow::Result<()> {
    let stats = SyncStats::new();
    let stream = deduplicate(channel.subscribe(), stats.clone());
    tokio::pin!(stream);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            item = stream.next() => match item {
                Some(Ok(payload)) => println!("{}", serde_json::to_string(&payload)?),
                Some(Err(e)) => eprintln!("dropped message: {}", e),
                None => break,
            },
        }
    }

    info!("snapshots: {:?}", stats.report());
    Ok(())
}

async fn send(channel: Arc<TcpChannel>, config: &Config, intent: IntentArg) -> anyhow::Result<()> {
    let signals = spawn_publisher(channel.as_ref(), PublisherOptions::from_config(config));
    let dispatcher = CommandDispatcher::new(
        channel.clone() as Arc<dyn ChannelAdapter>,
        config.controls.seek_step_secs,
    );

    let mut open = signals.connection_open();
    tokio::time::timeout(SEND_TIMEOUT, open.wait_for(|o| *o))
        .await
        .context("Timed out connecting to the bridge")??;

    let intent = match intent {
        IntentArg::Play => Intent::Play,
        IntentArg::Pause => Intent::Pause,
        IntentArg::Stop => Intent::Stop,
        IntentArg::Next => Intent::Next,
        IntentArg::Prev => Intent::Previous,
        IntentArg::Forward => seek_intent(&signals, SeekDirection::Forward).await?,
        IntentArg::Back => seek_intent(&signals, SeekDirection::Backward).await?,
        IntentArg::Seek { secs } => Intent::SeekTo(secs),
        IntentArg::AddDir { dir } => Intent::AddDirectory(dir),
        IntentArg::PlayDir { dir } => Intent::PlayDirectory(dir),
        IntentArg::AddPlaylist { name } => Intent::AddPlaylist(name),
        IntentArg::Clear => Intent::ClearQueue,
        IntentArg::Queue => Intent::RefreshQueue,
        IntentArg::Toggle { mode } => {
            let mode: Mode = mode.parse()?;
            // Mode flags come with the first snapshot.
            let mut state = signals.playback_state();
            tokio::time::timeout(SEND_TIMEOUT, state.wait_for(|s| s.is_some()))
                .await
                .context("No player state received")??;
            let panel = *signals.mode_panel().borrow();
            Intent::SetModes(panel.toggled(mode))
        }
    };

    dispatcher.dispatch(&intent)?;
    tokio::time::timeout(SEND_TIMEOUT, channel.flush())
        .await
        .context("Timed out writing to the bridge")??;
    info!("send: dispatched {:?}", intent);
    signals.shutdown().await;
    Ok(())
}

async fn seek_intent(signals: &DerivedSignals, direction: SeekDirection) -> anyhow::Result<Intent> {
    let mut current = signals.current_track();
    let track = tokio::time::timeout(SEND_TIMEOUT, current.wait_for(|t| t.is_some()))
        .await
        .context("No current track received")??
        .clone()
        .context("No current track")?;
    if track.is_stream() {
        anyhow::bail!("Cannot seek within a stream");
    }
    Ok(Intent::seek_from(&track, direction))
}
