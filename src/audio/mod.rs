//! オーディオ側: 時計とキュースケジューラ

pub mod clock;
pub mod osc;

pub use clock::MonotonicClock;
pub use osc::{OscCueScheduler, OscEventPublisher};

use serde::Serialize;

/// オーディオデバイスの時刻（秒）。全タイミングの基準
pub trait Clock {
    fn now(&self) -> f64;
}

/// 指定時刻にキューを再生（送りっぱなし、取り消しなし）
pub trait CueScheduler {
    fn schedule(&mut self, cue: &Cue);
}

/// 楽器ごとのゲインバス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    Drum,
    Snare,
    Bass,
    OpenHat,
    HiHat,
    Orchestra,
    Synth,
}

impl Voice {
    pub fn name(self) -> &'static str {
        match self {
            Voice::Drum => "drum",
            Voice::Snare => "snare",
            Voice::Bass => "bass",
            Voice::OpenHat => "open_hat",
            Voice::HiHat => "hi_hat",
            Voice::Orchestra => "orchestra",
            Voice::Synth => "synth",
        }
    }
}

/// 再生する1音
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    pub bus: Voice,
    /// バス音量 (0.0〜1.0)
    pub gain: f32,
    /// 音色プリセット
    pub preset: &'static str,
    /// 開始時刻（オーディオ時計、秒）
    pub at: f64,
    /// MIDIノート番号
    pub pitch: u8,
    pub duration: f64,
}
