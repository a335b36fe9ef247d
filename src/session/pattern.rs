//! 伴奏パターン: 4小節・16分音符。レイヤー数に応じて楽器が解放される

use crate::audio::{Cue, Voice};

pub const BAR_BEATS: usize = 4;
pub const SUBDIVISIONS: usize = 4;
pub const STEPS_PER_BAR: usize = BAR_BEATS * SUBDIVISIONS;
const PATTERN_BARS: usize = 4;
const PATTERN_STEPS: usize = PATTERN_BARS * STEPS_PER_BAR;

/// ドラム類の長さ（テンポに依らず固定）
const HIT_SECS: f64 = 1.0;

// MIDIノート番号
const G2: u8 = 31;
const AS2: u8 = 34;
const C3: u8 = 36;
const D3: u8 = 38;
const G3: u8 = 43;
const AS3: u8 = 46;
const C4: u8 = 48;
const G4: u8 = 55;
const AS4: u8 = 58;
const C5: u8 = 60;
const D5: u8 = 62;
const DS5: u8 = 63;
const F5: u8 = 65;
const G5: u8 = 67;
const A5: u8 = 69;
const AS5: u8 = 70;
const D6: u8 = 74;
const F6: u8 = 77;

struct VoiceSpec {
    gain: f32,
    presets: &'static [&'static str],
    default_pitch: u8,
    /// 鳴り始めるレイヤー数
    level: usize,
    /// プリセット切り替え周期（小節）
    preset_period: u64,
}

fn voice_spec(
    gain: f32,
    presets: &'static [&'static str],
    default_pitch: u8,
    level: usize,
    preset_period: u64,
) -> VoiceSpec {
    VoiceSpec {
        gain,
        presets,
        default_pitch,
        level,
        preset_period,
    }
}

fn spec(voice: Voice) -> VoiceSpec {
    match voice {
        Voice::Drum => voice_spec(0.5, &["drum_36_JCLive"], D3, 1, 1),
        Voice::Snare => voice_spec(0.5, &["drum_40_JCLive"], D3, 4, 1),
        Voice::Bass => voice_spec(0.7, &["0390_Aspirin", "0380_Chaos"], C3, 4, 12),
        Voice::OpenHat => voice_spec(0.7, &["drum_46_JCLive"], 46, 3, 1),
        Voice::HiHat => voice_spec(0.5, &["drum_42_JCLive"], 42, 3, 1),
        Voice::Orchestra => voice_spec(0.5, &["0550_Chaos"], C5, 5, 1),
        Voice::Synth => voice_spec(0.3, &["0480_Chaos", "0520_Aspirin", "0290_Aspirin"], C4, 5, 8),
    }
}

/// `section` で使うプリセット。未解放なら `None`
pub fn preset_for(voice: Voice, section: u64, layers: usize) -> Option<&'static str> {
    let spec = spec(voice);
    if layers < spec.level {
        return None;
    }
    let rotation = (section / spec.preset_period) as usize % spec.presets.len();
    Some(spec.presets[rotation])
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Note {
    voice: Voice,
    pitch: Option<u8>,
    /// 長さ（小節）。`None` は固定長
    bars: Option<f64>,
}

impl Note {
    fn hit(voice: Voice) -> Self {
        Self {
            voice,
            pitch: None,
            bars: None,
        }
    }

    fn tone(voice: Voice, pitch: u8, bars: f64) -> Self {
        Self {
            voice,
            pitch: Some(pitch),
            bars: Some(bars),
        }
    }
}

/// メロディ: (ステップ, 楽器, 音高, 長さ[小節])
const MELODY: [(usize, Voice, u8, f64); 29] = [
    (0, Voice::Orchestra, C5, 0.25),
    (0, Voice::Synth, C3, 1.0),
    (0, Voice::Synth, C4, 1.0),
    (0, Voice::Synth, G3, 1.0),
    (0, Voice::Synth, C5, 0.5),
    (0, Voice::Synth, DS5, 0.375),
    (6, Voice::Synth, D5, 0.125),
    (8, Voice::Synth, C5, 0.125),
    (9, Voice::Synth, C3, 1.0),
    (10, Voice::Synth, D5, 0.125),
    (12, Voice::Synth, DS5, 0.125),
    (14, Voice::Orchestra, G4, 0.125),
    (14, Voice::Synth, G5, 0.125),
    (16, Voice::Orchestra, AS5, 0.25),
    (16, Voice::Synth, G3, 1.0),
    (16, Voice::Synth, G4, 1.0),
    (16, Voice::Synth, D5, 3.0),
    (16, Voice::Synth, AS5, 0.375),
    (22, Voice::Synth, A5, 0.125),
    (24, Voice::Synth, G5, 0.125),
    (26, Voice::Synth, A5, 0.125),
    (28, Voice::Synth, AS5, 0.125),
    (30, Voice::Orchestra, DS5, 0.125),
    (30, Voice::Synth, D6, 0.125),
    (32, Voice::Orchestra, F5, 1.0),
    (32, Voice::Synth, AS3, 2.0),
    (32, Voice::Synth, AS4, 2.0),
    (32, Voice::Synth, F5, 2.0),
    (32, Voice::Synth, F6, 2.0),
];

/// 小節ごとのベースのルート音
const BASS_ROOTS: [u8; PATTERN_BARS] = [C3, G2, AS2, AS2];

/// ベースを休むステップ（シンセのみ）
const BASS_RESTS: [usize; 1] = [10];

/// ステップ `step` (0..64) で始まる音
fn notes_at(step: usize) -> Vec<Note> {
    let beat_step = step % STEPS_PER_BAR;
    let mut notes = Vec::new();

    match beat_step % SUBDIVISIONS {
        0 | 1 => notes.push(Note::hit(Voice::HiHat)),
        2 => notes.push(Note::hit(Voice::OpenHat)),
        _ => {}
    }
    if beat_step % SUBDIVISIONS == 0 {
        let mut kick = Note::hit(Voice::Drum);
        if beat_step == 12 {
            kick.pitch = Some(C3);
        }
        notes.push(kick);
    }
    if beat_step == 4 || beat_step == 12 {
        notes.push(Note::hit(Voice::Snare));
    }
    if beat_step != 1 && !BASS_RESTS.contains(&step) {
        let root = BASS_ROOTS[step / STEPS_PER_BAR % PATTERN_BARS];
        notes.push(Note::tone(Voice::Bass, root, 1.0 / 16.0));
    }

    notes.extend(
        MELODY
            .iter()
            .filter(|(s, ..)| *s == step)
            .map(|&(_, voice, pitch, bars)| Note::tone(voice, pitch, bars)),
    );
    notes
}

pub fn beat_secs(bpm: u32) -> f64 {
    60.0 / bpm as f64
}

pub fn bar_secs(bpm: u32) -> f64 {
    BAR_BEATS as f64 * beat_secs(bpm)
}

/// 16分音符1つ分のキュー
#[derive(Debug, Clone, PartialEq)]
pub struct CueSlot {
    /// 小節頭からの秒数
    pub offset: f64,
    pub cues: Vec<Cue>,
}

/// 1小節分のキュー
#[derive(Debug, Clone, PartialEq)]
pub struct BarPlan {
    pub section: u64,
    pub start: f64,
    pub bar_secs: f64,
    /// 常に `STEPS_PER_BAR` 個（無音含む）
    pub slots: Vec<CueSlot>,
}

impl BarPlan {
    pub fn cues(&self) -> impl Iterator<Item = &Cue> {
        self.slots.iter().flat_map(|slot| slot.cues.iter())
    }
}

/// `start` から始まる小節 `section` を `bpm` で配置
pub fn plan_bar(section: u64, layers: usize, bpm: u32, start: f64) -> BarPlan {
    let bar = bar_secs(bpm);
    let step = beat_secs(bpm) / SUBDIVISIONS as f64;
    let first = (section as usize * STEPS_PER_BAR) % PATTERN_STEPS;

    let slots = (0..STEPS_PER_BAR)
        .map(|n| {
            let offset = n as f64 * step;
            let cues = notes_at(first + n)
                .into_iter()
                .filter_map(|note| {
                    let preset = preset_for(note.voice, section, layers)?;
                    let spec = spec(note.voice);
                    Some(Cue {
                        bus: note.voice,
                        gain: spec.gain,
                        preset,
                        at: start + offset,
                        pitch: note.pitch.unwrap_or(spec.default_pitch),
                        duration: note.bars.map_or(HIT_SECS, |bars| bars * bar),
                    })
                })
                .collect();
            CueSlot { offset, cues }
        })
        .collect();

    BarPlan {
        section,
        start,
        bar_secs: bar,
        slots,
    }
}
