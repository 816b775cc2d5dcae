/// 日志工具模块
///
/// 提供日志初始化与批处理各阶段的横幅输出
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化全局日志订阅者
///
/// `RUST_LOG` 优先；未设置时使用给定级别
///
/// # 参数
/// - `level`: 默认日志级别，如 `info`、`debug`
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    let classification = &config.classification;
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量光变分类模式");
    info!(
        "🗄️ 时序库: {}:{}/{}",
        config.database.host, config.database.port, config.database.name
    );
    info!("🎯 置信度阈值: {}", classification.confidence_threshold);
    info!(
        "📦 批大小: {} | 执行方式: {:?} | 停止粒度: {:?}",
        classification.batch_size, classification.staging, classification.cancel_granularity
    );
    if !classification.update_database {
        info!("🔒 只读模式：不写回分类标签");
    }
    info!("{}", "=".repeat(60));
}

/// 记录候选加载信息
///
/// # 参数
/// - `total`: 候选总数
/// - `total_batches`: 批次总数
/// - `batch_size`: 批大小
pub fn log_candidates_loaded(total: usize, total_batches: usize, batch_size: usize) {
    info!("✓ 共 {} 个候选", total);
    info!("📋 将以每批 {} 个的方式处理，共 {} 批", batch_size, total_batches);
    info!("💡 每批完成后写入断点\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号（从1开始）
/// - `total_batches`: 批次总数
/// - `start`: 起始候选编号
/// - `end`: 结束候选编号
/// - `total`: 候选总数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批候选: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `classified`: 本批产生结果的候选数
/// - `updated`: 本批写回的候选数
/// - `batch_len`: 本批候选数
pub fn log_batch_complete(batch_num: usize, classified: usize, updated: usize, batch_len: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 分类 {}/{}，写回 {}",
        batch_num, classified, batch_len, updated
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `status`: 运行结束状态
/// - `processed`: 已处理完的候选数（只计已完成批次）
/// - `classified`: 产生结果的候选数
/// - `updated`: 写回的候选数
/// - `total`: 候选总数
pub fn print_final_stats(
    status: &str,
    processed: usize,
    classified: usize,
    updated: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 运行结束统计 ({})", status);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📄 已处理: {}/{}", processed, total);
    info!("✅ 已分类: {}", classified);
    info!("✏️ 已写回: {}", updated);
    info!("⏭️ 跳过: {}", processed.saturating_sub(classified));
    info!("{}", "=".repeat(60));
}
