//! 2つの姿勢を比較して関節ごとのスコアを表示

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use pose_groove::config::Config;
use pose_groove::pose::{Part, Pose};
use pose_groove::skeleton::{build_skeleton, compare_detailed, Skeleton};

#[derive(Parser, Debug)]
#[command(name = "pose_score", version = env!("GIT_VERSION"))]
struct Args {
    /// お手本の姿勢 JSON ({part, x, y, confidence} のリスト)
    reference: PathBuf,

    /// 比較する姿勢 JSON
    candidate: PathBuf,

    /// 信頼度閾値を読む設定ファイル
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// 比較前に左右ラベルを入れ替える
    #[arg(long)]
    mirror: bool,
}

fn load_pose(path: &Path) -> Result<Pose> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn build(pose: &Pose, min_confidence: f32, path: &Path) -> Result<Skeleton> {
    build_skeleton(pose, min_confidence).with_context(|| {
        format!(
            "{}: shoulders and elbows must all reach confidence {}",
            path.display(),
            min_confidence
        )
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load_if_exists(&args.config)?.unwrap_or_default();
    let min_confidence = config.session.min_confidence;

    let reference = build(&load_pose(&args.reference)?, min_confidence, &args.reference)?;
    let mut candidate_pose = load_pose(&args.candidate)?;
    if args.mirror {
        candidate_pose = candidate_pose.flipped();
    }
    let candidate = build(&candidate_pose, min_confidence, &args.candidate)?;

    let (score, parts) = compare_detailed(&reference, &candidate);

    println!("score: {:.3}", score);
    for part in Part::ALL {
        if let Some(part_score) = parts.get(&part) {
            println!("  {:<14} {:.3}", format!("{:?}", part), part_score);
        }
    }
    Ok(())
}
