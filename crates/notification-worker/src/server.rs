//! 触发 HTTP 入口
//!
//! 文档变更由外部触发基础设施以 JSON 投递到 `POST /v1/triggers`。
//! 无论处理结果如何都返回 200，避免上游对同一变更反复重试造成重复推送。

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use notify_shared::events::ChangeEvent;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handler::{HandleReport, NotificationHandler};

pub fn router(handler: Arc<NotificationHandler>) -> Router {
    Router::new()
        .route("/v1/triggers", post(trigger))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

/// 接收一次文档变更
///
/// 请求体按原始字节读取，格式错误时记录日志并返回空报告，而不是 4xx。
async fn trigger(
    State(handler): State<Arc<NotificationHandler>>,
    body: Bytes,
) -> Json<HandleReport> {
    let change: ChangeEvent = match serde_json::from_slice(&body) {
        Ok(change) => change,
        Err(e) => {
            let report = HandleReport::new("");
            warn!(
                invocation_id = %report.invocation_id,
                error = %e,
                "变更事件格式错误，忽略"
            );
            return Json(report);
        }
    };

    Json(handler.handle(change).await)
}

/// 存活探针
async fn health_check() -> &'static str {
    "OK"
}

/// 监听关闭信号：SIGTERM 或 Ctrl+C
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl+C，开始优雅关闭"),
        _ = terminate => info!("收到 SIGTERM，开始优雅关闭"),
    }
}
