use std::sync::OnceLock;

use veil_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "veil-tests",
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "debug",
            ..LogConfig::default()
        };

        veil_common::observability::init_logging(config).unwrap_or_default()
    });
}
