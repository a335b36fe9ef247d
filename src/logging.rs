use tracing_subscriber::EnvFilter;

/// グローバルsubscriberを登録。`RUST_LOG` が設定値より優先
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // 2回目以降の呼び出しは最初のsubscriberのまま
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .try_init();
}
