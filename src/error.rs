/// セッション開始時のエラー。
/// 開始後はエラーにしない（スケルトン不成立はスキップ、推定失敗はログのみ）
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
