//! 启动阶段集成测试
//!
//! 失败路径不需要外部服务；完整链路需要本地 TDengine 与模型服务

use std::path::PathBuf;

use auto_classify::config::PathsConfig;
use auto_classify::error::SetupError;
use auto_classify::{App, AppError, Config, ProgressSnapshot, RunOptions, RunStatus};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.paths.progress_file = dir.path().join("progress.json");
    config.paths.state_file = dir.path().join("state.json");
    config.paths.stop_file = dir.path().join("stop");
    config
}

fn read_progress(config: &Config) -> ProgressSnapshot {
    let content = std::fs::read_to_string(&config.paths.progress_file).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn test_missing_input_writes_error_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let mut app = App::new(config.clone());

    let options = RunOptions {
        candidate_file: dir.path().join("missing.csv"),
        resume: false,
    };
    let err = app.run(&options).await.unwrap_err();

    assert!(matches!(
        err,
        AppError::Setup(SetupError::InputNotFound { .. })
    ));
    let progress = read_progress(&config);
    assert_eq!(progress.status, RunStatus::Error);
    assert_eq!(progress.percent, 0);
    assert!(progress.message.contains("missing.csv"));
}

#[tokio::test]
async fn test_invalid_config_is_a_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(&dir);
    config.classification.confidence_threshold = 1.5;
    let mut app = App::new(config.clone());

    let options = RunOptions {
        candidate_file: dir.path().join("candidates.csv"),
        resume: false,
    };
    let err = app.run(&options).await.unwrap_err();

    assert!(matches!(err, AppError::Setup(SetupError::Config(_))));
    assert_eq!(read_progress(&config).status, RunStatus::Error);
}

#[tokio::test]
async fn test_stale_stop_file_is_cleared_on_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    std::fs::write(&config.paths.stop_file, "").unwrap();
    let mut app = App::new(config.clone());

    let options = RunOptions {
        candidate_file: dir.path().join("missing.csv"),
        resume: false,
    };
    let _ = app.run(&options).await;

    assert!(!config.paths.stop_file.exists());
}

#[test]
fn test_unreadable_config_file_writes_error_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("auto_classify.toml");
    std::fs::write(&config_file, "[classification\nbatch_size = ").unwrap();
    let config_err = Config::from_file(&config_file).unwrap_err();

    let paths = PathsConfig {
        progress_file: dir.path().join("progress.json"),
        state_file: dir.path().join("state.json"),
        stop_file: dir.path().join("stop"),
        ..PathsConfig::default()
    };
    std::fs::write(&paths.stop_file, "").unwrap();

    let err = App::report_setup_failure(&paths, SetupError::from(config_err));

    assert!(matches!(err, AppError::Setup(SetupError::Config(_))));
    assert!(!paths.stop_file.exists());
    let content = std::fs::read_to_string(&paths.progress_file).unwrap();
    let progress: ProgressSnapshot = serde_json::from_str(&content).unwrap();
    assert_eq!(progress.status, RunStatus::Error);
    assert_eq!(progress.percent, 0);
    assert!(progress.message.starts_with("Error: "));
}

/// 需要本地 TDengine（6041）与模型服务（8765）
#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_classify_local_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(&dir);
    config.classification.update_database = false;

    let candidate_file = PathBuf::from("candidates.csv");
    let mut app = App::new(config);
    let report = app
        .run(&RunOptions {
            candidate_file,
            resume: false,
        })
        .await
        .expect("运行失败");

    assert_eq!(report.status, RunStatus::Completed);
}
