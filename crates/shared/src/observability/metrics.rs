//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。
//! 未安装 recorder 时各记录函数为空操作，测试中可直接调用。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "trigger_events_total",
        "Total number of document change events received"
    );
    metrics::describe_counter!(
        "notifications_classified_total",
        "Total number of change events classified into a notification"
    );
    metrics::describe_counter!(
        "push_dispatch_total",
        "Total number of per-recipient dispatch outcomes"
    );
    metrics::describe_histogram!(
        "trigger_handle_duration_seconds",
        "End-to-end trigger handling duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录收到的变更事件，kind 为文档类别（chat_message / user / socialing / unknown）
#[inline]
pub fn record_trigger_event(kind: &str) {
    metrics::counter!("trigger_events_total", "kind" => kind.to_string()).increment(1);
}

/// 记录分类出的通知类型
#[inline]
pub fn record_classified(notification_type: &str) {
    metrics::counter!(
        "notifications_classified_total",
        "type" => notification_type.to_string()
    )
    .increment(1);
}

/// 记录单个接收者的投递结果
#[inline]
pub fn record_dispatch(outcome: &str) {
    metrics::counter!("push_dispatch_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录一次触发处理的总耗时
#[inline]
pub fn record_handle_duration(duration_secs: f64) {
    metrics::histogram!("trigger_handle_duration_seconds").record(duration_secs);
}
