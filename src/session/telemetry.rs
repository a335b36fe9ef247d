use serde::Serialize;
use std::collections::BTreeMap;

use super::pattern::{bar_secs, beat_secs};
use super::state::Phase;

/// セッションのスナップショット（変更ごとに更新）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    pub phase: Phase,
    pub current_id: Option<String>,
    /// スロットごとの最高スコア
    pub best_scores: BTreeMap<usize, f32>,
    /// ラウンドのスコア（最小スロット、未一致は0）
    pub score: f32,
    pub bpm: u32,
    pub layers: usize,
    pub section: u64,
    /// 最後に配置した小節の終了時刻
    pub bar_end: f64,
    /// 直近サンプルのスケルトン数
    pub detections: usize,
}

/// 表示用: 拍に合わせた輪郭の色と太さ
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pulse {
    /// 色相: 0=赤（不一致）〜120=緑（完全一致）
    pub hue: f32,
    /// 明度(%)
    pub lightness: f32,
    pub stroke_width: f32,
}

fn cycle_fraction(t: f64, period: f64) -> f64 {
    let f = t.rem_euclid(period) / period;
    if f >= 1.0 {
        0.0
    } else {
        f
    }
}

impl Telemetry {
    pub fn idle(bpm: u32) -> Self {
        Self {
            phase: Phase::Idle,
            current_id: None,
            best_scores: BTreeMap::new(),
            score: 0.0,
            bpm,
            layers: 0,
            section: 0,
            bar_end: 0.0,
            detections: 0,
        }
    }

    /// 小節内の位置 [0, 1)。判定時刻（小節末の1拍前）で0に戻る
    pub fn bar_progress(&self, now: f64) -> f64 {
        cycle_fraction(now - self.bar_end + beat_secs(self.bpm), bar_secs(self.bpm))
    }

    /// 拍内の位置 [0, 1)
    pub fn beat_progress(&self, now: f64) -> f64 {
        cycle_fraction(now - self.bar_end, beat_secs(self.bpm))
    }

    pub fn pulse(&self, now: f64) -> Pulse {
        let bar = self.bar_progress(now) as f32;
        let beat = self.beat_progress(now) as f32;
        Pulse {
            hue: self.score * 120.0,
            lightness: 40.0 + beat * 40.0,
            stroke_width: bar * bar * 5.0 + beat * beat,
        }
    }

    /// スロットの色相
    pub fn slot_hue(&self, slot: usize) -> f32 {
        let best = self.best_scores.get(&slot).copied().unwrap_or(0.0);
        best * best * 120.0
    }
}
