//! 推送通知触发服务
//!
//! 启动 HTTP 入口，接收文档变更并推送通知。

use std::sync::Arc;

use anyhow::Context;
use notification_worker::locale::LocalizationTable;
use notification_worker::sender::{FcmSender, LogSender, PushSender};
use notification_worker::server;
use notification_worker::NotificationHandler;
use notify_shared::config::AppConfig;
use notify_shared::observability;
use notify_shared::store::{DocumentStore, FirestoreStore, MemoryDocumentStore};
use tokio::net::TcpListener;
use tracing::{info, warn};

const SERVICE_NAME: &str = "notification-worker";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        store = %config.store.backend,
        push = %config.push.provider,
        default_language = %config.localization.default_language,
        "Starting notification-worker..."
    );

    let store: Arc<dyn DocumentStore> = match config.store.backend.as_str() {
        "memory" => {
            warn!("使用内存文档存储，仅适用于本地开发");
            Arc::new(MemoryDocumentStore::new())
        }
        _ => Arc::new(FirestoreStore::new(&config.store)?),
    };

    let sender: Arc<dyn PushSender> = match config.push.provider.as_str() {
        "log" => {
            warn!("推送渠道为 log，只记录日志不实际发送");
            Arc::new(LogSender)
        }
        _ => Arc::new(FcmSender::new(&config.push)?),
    };

    let table = LocalizationTable::from_default_code(&config.localization.default_language);
    let handler = Arc::new(NotificationHandler::new(store, sender, table));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, server::router(handler))
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
