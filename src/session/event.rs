use serde::Serialize;

/// 表示側へのイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    PoseStarted {
        id: String,
    },
    PoseAchieved {
        id: String,
        #[serde(rename = "overallScore")]
        overall_score: f32,
    },
    /// 予約（現在のルールでは発生しない）
    PoseFailed {
        id: String,
        #[serde(rename = "overallScore")]
        overall_score: f32,
    },
    Finished,
}
