use serde::Serialize;
use std::collections::BTreeMap;

use super::catalog::{Catalog, Reference};
use super::event::SessionEvent;
use super::pattern::{beat_secs, plan_bar, BarPlan};
use super::telemetry::Telemetry;
use crate::config::SessionConfig;
use crate::pose::Pose;
use crate::skeleton::{build_skeleton, compare, Skeleton};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    /// 開始済み、まだ採点なし
    RoundStarting,
    /// サンプリング中（最高スコアを保持）
    RoundActive,
    Finished,
}

/// セッション状態（同期）。時刻はオーディオ時計の秒で渡す
pub struct Session {
    config: SessionConfig,
    catalog: Catalog,
    loops: usize,
    phase: Phase,
    bpm: u32,
    layers: usize,
    section: u64,
    pose_index: Option<usize>,
    best_scores: BTreeMap<usize, f32>,
    bar_end: f64,
    detections: usize,
}

impl Session {
    pub fn new(config: SessionConfig, catalog: Catalog) -> Self {
        let bpm = config.minimum_bpm;
        Self {
            config,
            catalog,
            loops: 1,
            phase: Phase::Idle,
            bpm,
            layers: 0,
            section: 0,
            pose_index: None,
            best_scores: BTreeMap::new(),
            bar_end: 0.0,
            detections: 0,
        }
    }

    /// 初期化。最初の小節は `now` の `start_delay_secs` 後
    pub fn start(&mut self, loops: usize, now: f64) {
        self.loops = loops;
        self.phase = Phase::RoundStarting;
        self.bpm = self.config.minimum_bpm;
        self.layers = 0;
        self.section = 0;
        self.pose_index = None;
        self.best_scores.clear();
        self.bar_end = now + self.config.start_delay_secs;
        self.detections = 0;
    }

    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
        self.pose_index = None;
        self.best_scores.clear();
        self.detections = 0;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::RoundStarting | Phase::RoundActive)
    }

    /// 現在のテンポ・レイヤーで次の小節を配置
    pub fn schedule_bar(&mut self) -> BarPlan {
        let plan = plan_bar(self.section, self.layers, self.bpm, self.bar_end);
        self.bar_end += plan.bar_secs;
        self.section += 1;
        plan
    }

    /// 判定時刻: 最後に配置した小節の終わりの1拍前
    pub fn boundary_time(&self) -> f64 {
        self.bar_end - beat_secs(self.bpm)
    }

    /// 次の小節を配置する時刻
    pub fn next_tick_time(&self) -> f64 {
        self.bar_end - self.config.lookahead_secs
    }

    fn rounds(&self) -> usize {
        self.catalog.len() * self.loops
    }

    pub fn current_reference(&self) -> Option<&Reference> {
        if !self.is_running() {
            return None;
        }
        self.pose_index.map(|index| self.catalog.cycled(index))
    }

    /// 検出姿勢を現在のお手本と比較。
    /// スケルトンにならない検出は捨てる。スロットごとに最高スコアを保持
    pub fn record_poses(&mut self, poses: &[Pose]) {
        if !self.is_running() {
            return;
        }
        let min_confidence = self.config.min_confidence;
        let candidates: Vec<Skeleton> = poses
            .iter()
            .filter_map(|pose| {
                if self.config.mirror_input {
                    build_skeleton(&pose.flipped(), min_confidence)
                } else {
                    build_skeleton(pose, min_confidence)
                }
            })
            .collect();
        self.detections = candidates.len();

        let Some(index) = self.pose_index else {
            return;
        };
        let reference = self.catalog.cycled(index);
        for candidate in &candidates {
            for (slot, skeleton) in reference.skeletons.iter().enumerate() {
                let score = compare(skeleton, candidate);
                let best = self.best_scores.entry(slot).or_insert(score);
                if *best < score {
                    *best = score;
                }
            }
        }
        self.phase = Phase::RoundActive;
    }

    /// スロットの最高スコアの最小値（未一致は0）
    pub fn overall_score(&self) -> f32 {
        match self.current_reference() {
            Some(reference) => (0..reference.skeletons.len()).fold(1.0f32, |acc, slot| {
                acc.min(self.best_scores.get(&slot).copied().unwrap_or(0.0))
            }),
            None => 0.0,
        }
    }

    fn unlock_layer(&mut self) {
        let next = self.layers + 1;
        if let Some(&period) = self.config.layer_unlock_periods.get(next) {
            if self.section % period == 0 {
                self.layers = next;
            }
        }
    }

    /// ラウンド判定: 成功（または初回）なら次へ、失敗ならテンポ・レイヤーを戻す。
    /// どちらでも最高スコアはクリア
    pub fn decide(&mut self) -> Vec<SessionEvent> {
        if !self.is_running() {
            return Vec::new();
        }

        let mut events = Vec::new();
        let score = self.overall_score();
        let advance = match self.pose_index {
            Some(_) => score > self.config.success_threshold,
            None => true,
        };

        if advance {
            let next = match self.pose_index {
                Some(index) => {
                    self.unlock_layer();
                    self.bpm += 1;
                    events.push(SessionEvent::PoseAchieved {
                        id: self.catalog.cycled(index).id.clone(),
                        overall_score: score,
                    });
                    index + 1
                }
                None => 0,
            };
            self.pose_index = Some(next);

            if next < self.rounds() {
                events.push(SessionEvent::PoseStarted {
                    id: self.catalog.cycled(next).id.clone(),
                });
                self.phase = Phase::RoundStarting;
            } else {
                events.push(SessionEvent::Finished);
                self.phase = Phase::Finished;
            }
        } else {
            self.layers = self.layers.saturating_sub(1);
            self.bpm = self.bpm.saturating_sub(1).max(self.config.minimum_bpm);
        }

        self.best_scores.clear();
        events
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    pub fn section(&self) -> u64 {
        self.section
    }

    pub fn pose_index(&self) -> Option<usize> {
        self.pose_index
    }

    pub fn bar_end(&self) -> f64 {
        self.bar_end
    }

    pub fn best_scores(&self) -> &BTreeMap<usize, f32> {
        &self.best_scores
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            phase: self.phase,
            current_id: self.current_reference().map(|r| r.id.clone()),
            best_scores: self.best_scores.clone(),
            score: self.overall_score(),
            bpm: self.bpm,
            layers: self.layers,
            section: self.section,
            bar_end: self.bar_end,
            detections: self.detections,
        }
    }
}
