//! Parcel 会话回放程序
//!
//! 读取编辑器配置、图层目录和已有要素，按脚本回放一次编辑会话，
//! 输出暂存变更与用户提示。

mod script;

use anyhow::{Context, Result};
use clap::Parser;
use parcel_core::layer::FeatureLayer;
use parcel_edit::prelude::*;
use parcel_staging::{persist, FeatureData, StagedChange, StagingBuffer};
use script::{Outcome, Replayer, Script};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Parcel 会话回放
///
/// Examples:
///   parcel replay --layers layers.json --session session.json
///   parcel replay --config editor.json --layers layers.json --features parcels.json \
///                 --session session.json --out staged.json -vv
#[derive(Parser, Debug)]
#[command(name = "parcel", version, about = "Replay a parcel editing session")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 日志详细程度 (-v 调试, -vv 跟踪)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// 回放脚本并输出暂存变更
    Replay {
        /// 编辑器配置 (JSON)，缺省使用默认值
        #[arg(long)]
        config: Option<PathBuf>,

        /// 图层目录 (JSON)
        #[arg(long)]
        layers: PathBuf,

        /// 已有要素 (FeatureData 数组)
        #[arg(long)]
        features: Option<PathBuf>,

        /// 回放脚本
        #[arg(long)]
        session: PathBuf,

        /// 写入暂存区的文件
        #[arg(long)]
        out: Option<PathBuf>,

        /// 写入新要素的用户 ID
        #[arg(long)]
        user: Option<i64>,
    },
}

/// 回放报告
#[derive(Debug, Serialize)]
struct Report<'a> {
    state: String,
    staged: Vec<&'a StagedChange>,
    notices: &'a [Notice],
    one_shots: &'a [Outcome],
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn replay(
    config: Option<PathBuf>,
    layers: PathBuf,
    features: Option<PathBuf>,
    session: PathBuf,
    out: Option<PathBuf>,
    user: Option<i64>,
) -> Result<()> {
    let config = match config {
        Some(path) => EditorConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    let catalog: LayerCatalog = read_json(&layers)?;
    let script: Script = read_json(&session)?;

    let mut map = MapView::new(config.projection);
    for entry in &catalog.layers {
        map.add_layer(FeatureLayer::new(entry.id, entry.name.clone()));
    }
    info!("Loaded {} layers", catalog.layers.len());

    let mut controller = DrawController::new(
        config,
        map,
        StagingBuffer::new(),
        NotificationLog::new(),
        catalog,
        UserSession { user_id: user },
    );

    if let Some(path) = features {
        let records: Vec<FeatureData> = read_json(&path)?;
        controller.load_features(&records)?;
    }

    let mut replayer = Replayer::new();
    replayer.run(&mut controller, &script);
    info!(
        "Replayed {} steps, {} staged changes",
        script.steps.len(),
        controller.staging().len()
    );

    let report = Report {
        state: format!("{:?}", controller.state()),
        staged: controller.staging().pending().collect(),
        notices: controller.notifier().notices(),
        one_shots: replayer.outcomes(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = out {
        persist::save(controller.staging(), &path)
            .with_context(|| format!("saving staged changes to {}", path.display()))?;
        info!("Staged changes saved to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    match cli.command {
        Command::Replay {
            config,
            layers,
            features,
            session,
            out,
            user,
        } => replay(config, layers, features, session, out, user),
    }
}
