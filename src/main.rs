use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use pose_groove::audio::{MonotonicClock, OscCueScheduler, OscEventPublisher};
use pose_groove::config::Config;
use pose_groove::logging;
use pose_groove::pose::ReplayPoseSource;
use pose_groove::session::{Catalog, SessionController};

/// 録画した検出結果でセッションを実行し、OSCでキューとイベントを送信
#[derive(Parser, Debug)]
#[command(name = "pose_groove", version = env!("GIT_VERSION"))]
struct Args {
    /// 設定ファイル（なければデフォルト）
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// お手本カタログ (JSON)
    #[arg(long, default_value = "poses.json")]
    catalog: PathBuf,

    /// 検出結果の録画 (JSON Lines)
    #[arg(short, long)]
    recording: PathBuf,

    /// カタログの周回数
    #[arg(short, long, default_value_t = 1)]
    loops: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 不正な設定ファイルは起動エラー。ファイルがないときだけデフォルト
    let loaded = Config::load_if_exists(&args.config)?;
    let config_found = loaded.is_some();
    let config = loaded.unwrap_or_default();
    logging::init(&config.logging.level);
    info!("Pose Groove ({})", env!("GIT_VERSION"));
    if !config_found {
        warn!("{} not found, using default config", args.config.display());
    }

    let catalog = Catalog::load(&args.catalog, config.session.min_confidence)?;
    let source = ReplayPoseSource::open(&args.recording)?;
    info!("recording: {} frames", source.frame_count());

    let scheduler = OscCueScheduler::new(&config.osc.cue_addr)?;
    let publisher = OscEventPublisher::new(&config.osc.event_addr)?;
    info!("cues -> {}, events -> {}", config.osc.cue_addr, config.osc.event_addr);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .enable_io()
        .build()?;

    runtime.block_on(async {
        let controller = SessionController::new(
            config.session.clone(),
            catalog,
            source,
            scheduler,
            MonotonicClock::new(),
        )?;
        let (mut handle, session) = controller.start(args.loops);

        let stop = handle.stop_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C, stopping");
                stop.cancel();
            }
        });

        let events = &mut handle.events;
        let forward = async {
            while let Some(event) = events.recv().await {
                if let Err(e) = publisher.publish(&event) {
                    warn!("event publish failed: {:#}", e);
                }
            }
        };
        let (outcome, ()) = tokio::join!(session, forward);

        let telemetry = handle.telemetry.borrow();
        info!(
            "session {:?}: bpm {}, layers {}, {} bars",
            outcome, telemetry.bpm, telemetry.layers, telemetry.section
        );
        anyhow::Ok(())
    })
}
