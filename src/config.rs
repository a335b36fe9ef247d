use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::SessionError;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub osc: OscConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// これ未満のキーポイントはスケルトンに含めない
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// 次へ進むためのスコア閾値（超過）
    #[serde(default = "default_success_threshold")]
    pub success_threshold: f32,
    /// 開始テンポ兼下限
    #[serde(default = "default_minimum_bpm")]
    pub minimum_bpm: u32,
    /// 1サンプルあたりの最大検出人数
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,
    #[serde(default = "default_target_sample_fps")]
    pub target_sample_fps: f64,
    /// サンプリングループを回す表示リフレッシュレート
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: f64,
    /// 次の小節を先読みする秒数
    #[serde(default = "default_lookahead_secs")]
    pub lookahead_secs: f64,
    /// 最初の小節までの待ち（秒）
    #[serde(default = "default_start_delay_secs")]
    pub start_delay_secs: f64,
    /// 検出姿勢の左右ラベルを入れ替える
    #[serde(default = "default_mirror_input")]
    pub mirror_input: bool,
    /// レイヤーごとの解放周期（小節）。0番は無音の基本レイヤー
    #[serde(default = "default_layer_unlock_periods")]
    pub layer_unlock_periods: Vec<u64>,
}

fn default_min_confidence() -> f32 { 0.8 }
fn default_success_threshold() -> f32 { 0.75 }
fn default_minimum_bpm() -> u32 { 110 }
fn default_max_detections() -> usize { 3 }
fn default_target_sample_fps() -> f64 { 60.0 }
fn default_refresh_hz() -> f64 { 60.0 }
fn default_lookahead_secs() -> f64 { 0.1 }
fn default_start_delay_secs() -> f64 { 0.1 }
fn default_mirror_input() -> bool { true }
fn default_layer_unlock_periods() -> Vec<u64> { vec![1, 1, 1, 1, 4, 4, 4, 1] }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            success_threshold: default_success_threshold(),
            minimum_bpm: default_minimum_bpm(),
            max_detections: default_max_detections(),
            target_sample_fps: default_target_sample_fps(),
            refresh_hz: default_refresh_hz(),
            lookahead_secs: default_lookahead_secs(),
            start_delay_secs: default_start_delay_secs(),
            mirror_input: default_mirror_input(),
            layer_unlock_periods: default_layer_unlock_periods(),
        }
    }
}

impl SessionConfig {
    /// 最大レイヤー数
    pub fn max_layers(&self) -> usize {
        self.layer_unlock_periods.len().saturating_sub(1)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        let invalid = |msg: &str| Err(SessionError::Config(msg.to_string()));
        if !(self.success_threshold > 0.0 && self.success_threshold < 1.0) {
            return invalid("success_threshold must be in (0, 1)");
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return invalid("min_confidence must be in [0, 1]");
        }
        if self.minimum_bpm == 0 {
            return invalid("minimum_bpm must be positive");
        }
        if self.max_detections == 0 {
            return invalid("max_detections must be positive");
        }
        if !(self.target_sample_fps > 0.0) || !(self.refresh_hz > 0.0) {
            return invalid("target_sample_fps and refresh_hz must be positive");
        }
        if self.lookahead_secs < 0.0 || self.start_delay_secs < 0.0 {
            return invalid("lookahead_secs and start_delay_secs must not be negative");
        }
        if self.layer_unlock_periods.contains(&0) {
            return invalid("layer_unlock_periods must all be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OscConfig {
    /// キューの送信先（サンプラー）
    #[serde(default = "default_cue_addr")]
    pub cue_addr: String,
    /// イベントの送信先（表示側）
    #[serde(default = "default_event_addr")]
    pub event_addr: String,
}

fn default_cue_addr() -> String { "127.0.0.1:57120".to_string() }
fn default_event_addr() -> String { "127.0.0.1:57121".to_string() }

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            cue_addr: default_cue_addr(),
            event_addr: default_event_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// tracingのフィルタ (e.g. "info", "pose_groove=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.session.validate()?;
        Ok(config)
    }

    /// ファイルがなければ `None`。あるのに読めない・不正ならエラー
    pub fn load_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let config = Self::load(path)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.session.minimum_bpm, 110);
        assert_eq!(config.session.success_threshold, 0.75);
        assert_eq!(config.session.max_layers(), 7);
        assert!(config.session.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [session]
            minimum_bpm = 90
            mirror_input = false

            [osc]
            cue_addr = "10.0.0.2:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.session.minimum_bpm, 90);
        assert!(!config.session.mirror_input);
        assert_eq!(config.session.max_detections, 3);
        assert_eq!(config.osc.cue_addr, "10.0.0.2:9000");
        assert_eq!(config.osc.event_addr, "127.0.0.1:57121");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_zero_period() {
        let mut session = SessionConfig::default();
        session.layer_unlock_periods = vec![1, 0];
        assert!(matches!(session.validate(), Err(SessionError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let mut session = SessionConfig::default();
        session.success_threshold = 1.0;
        assert!(session.validate().is_err());
    }

    #[test]
    fn test_load_if_exists_missing_file() {
        let config = Config::load_if_exists("/nonexistent/pose_groove.toml").unwrap();
        assert!(config.is_none());
    }

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("pose_groove_{}_{}.toml", name, std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_if_exists_rejects_invalid_values() {
        let path = write_temp("invalid", "[session]\nsuccess_threshold = 1.5\n");
        let result = Config::load_if_exists(&path);
        fs::remove_file(&path).ok();
        let err = result.unwrap_err();
        assert!(
            err.chain().any(|e| e.to_string().contains("success_threshold")),
            "{:#}",
            err
        );
    }

    #[test]
    fn test_load_if_exists_rejects_broken_toml() {
        let path = write_temp("broken", "[session\nminimum_bpm = ");
        let result = Config::load_if_exists(&path);
        fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_if_exists_reads_valid_file() {
        let path = write_temp("valid", "[session]\nminimum_bpm = 96\n");
        let result = Config::load_if_exists(&path);
        fs::remove_file(&path).ok();
        assert_eq!(result.unwrap().unwrap().session.minimum_bpm, 96);
    }
}
