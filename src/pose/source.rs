use anyhow::{Context, Result};
use futures::future::{self, BoxFuture};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::keypoint::Pose;
use crate::error::SessionError;

/// 現在のフレームから姿勢を推定するもの。
/// フレーム取得はソース側。0人でもエラーではない。
/// 返すfutureはセッション停止後も完了まで実行されることがある（結果は捨てられる）
pub trait PoseSource {
    fn estimate(&mut self, max_detections: usize) -> BoxFuture<'static, Result<Vec<Pose>>>;
}

/// 録画の1行
#[derive(Debug, Deserialize)]
struct RecordedFrame {
    #[serde(default)]
    poses: Vec<Pose>,
}

/// JSON Lines の録画を1推定1フレームで再生（ループ）
pub struct ReplayPoseSource {
    frames: Vec<Vec<Pose>>,
    cursor: usize,
}

impl ReplayPoseSource {
    pub fn new(frames: Vec<Vec<Pose>>) -> Result<Self, SessionError> {
        if frames.is_empty() {
            return Err(SessionError::Initialization(
                "pose recording contains no frames".to_string(),
            ));
        }
        Ok(Self { frames, cursor: 0 })
    }

    /// 録画を読み込む。各行は `{"poses": [[keypoint, ...], ...]}`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read pose recording {}", path.display()))?;
        let frames = parse_recording(&content)?;
        Ok(Self::new(frames)?)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

fn parse_recording(content: &str) -> Result<Vec<Vec<Pose>>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            let frame: RecordedFrame = serde_json::from_str(line)
                .with_context(|| format!("bad recording line {}", n + 1))?;
            Ok(frame.poses)
        })
        .collect()
}

impl PoseSource for ReplayPoseSource {
    fn estimate(&mut self, max_detections: usize) -> BoxFuture<'static, Result<Vec<Pose>>> {
        let mut poses = self.frames[self.cursor].clone();
        poses.truncate(max_detections);
        self.cursor = (self.cursor + 1) % self.frames.len();
        Box::pin(future::ready(Ok(poses)))
    }
}
