//! 追踪、请求 ID 与错误关联 ID 生成。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 引擎计数快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub configs_loaded: u64,
    pub resources_skipped: u64,
    pub validation_errors: u64,
    pub datasources_performed: u64,
    pub actions_performed: u64,
    pub actions_failed: u64,
    pub async_tasks_started: u64,
    pub async_tasks_failed: u64,
    pub processing_errors: u64,
    pub redirects: u64,
}

/// 引擎计数。
pub struct EngineMetrics {
    configs_loaded: AtomicU64,
    resources_skipped: AtomicU64,
    validation_errors: AtomicU64,
    datasources_performed: AtomicU64,
    actions_performed: AtomicU64,
    actions_failed: AtomicU64,
    async_tasks_started: AtomicU64,
    async_tasks_failed: AtomicU64,
    processing_errors: AtomicU64,
    redirects: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            configs_loaded: AtomicU64::new(0),
            resources_skipped: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
            datasources_performed: AtomicU64::new(0),
            actions_performed: AtomicU64::new(0),
            actions_failed: AtomicU64::new(0),
            async_tasks_started: AtomicU64::new(0),
            async_tasks_failed: AtomicU64::new(0),
            processing_errors: AtomicU64::new(0),
            redirects: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            configs_loaded: self.configs_loaded.load(Ordering::Relaxed),
            resources_skipped: self.resources_skipped.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
            datasources_performed: self.datasources_performed.load(Ordering::Relaxed),
            actions_performed: self.actions_performed.load(Ordering::Relaxed),
            actions_failed: self.actions_failed.load(Ordering::Relaxed),
            async_tasks_started: self.async_tasks_started.load(Ordering::Relaxed),
            async_tasks_failed: self.async_tasks_failed.load(Ordering::Relaxed),
            processing_errors: self.processing_errors.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<EngineMetrics> = OnceLock::new();

/// 获取全局计数实例。
pub fn metrics() -> &'static EngineMetrics {
    METRICS.get_or_init(EngineMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 生成数字型错误关联 ID（非负，可放入 i64）。
pub fn new_correlation_id() -> u64 {
    (uuid::Uuid::new_v4().as_u128() as u64) & (i64::MAX as u64)
}

/// 记录配置加载次数。
pub fn record_config_loaded() {
    metrics().configs_loaded.fetch_add(1, Ordering::Relaxed);
}

/// 记录跳过的资源（解组失败或根元素未知）。
pub fn record_resource_skipped() {
    metrics().resources_skipped.fetch_add(1, Ordering::Relaxed);
}

/// 记录校验错误数。
pub fn record_validation_errors(count: u64) {
    metrics()
        .validation_errors
        .fetch_add(count, Ordering::Relaxed);
}

pub fn record_datasource_performed() {
    metrics()
        .datasources_performed
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_action_performed() {
    metrics().actions_performed.fetch_add(1, Ordering::Relaxed);
}

pub fn record_action_failed() {
    metrics().actions_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录后台任务启动次数。
pub fn record_async_task_started() {
    metrics()
        .async_tasks_started
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录后台任务失败次数。
pub fn record_async_task_failed() {
    metrics().async_tasks_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录带关联 ID 的处理错误。
pub fn record_processing_error() {
    metrics()
        .processing_errors
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_redirect() {
    metrics().redirects.fetch_add(1, Ordering::Relaxed);
}
