//! 触发处理入口
//!
//! 把一次文档变更串成完整管道：路径解析 → 分类 → 解析接收者 → 渲染 → 分发。
//! 管道内的任何错误（包括 panic）都在这里截获并记录，调用方总是得到“已处理”的报告，
//! 避免触发基础设施反复重试。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use notify_shared::document::normalize;
use notify_shared::error::Result;
use notify_shared::events::{ChangeEvent, DocumentKind, NotificationType};
use notify_shared::observability::metrics;
use notify_shared::store::DocumentStore;
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::classifier::classify;
use crate::dispatcher::{Dispatcher, RecipientOutcome, panic_message};
use crate::locale::LocalizationTable;
use crate::resolver::RecipientResolver;
use crate::sender::PushSender;
use crate::templates::MessageComposer;

/// 单次触发的处理报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleReport {
    pub invocation_id: String,
    pub document_path: String,
    /// 恒为 true
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<NotificationType>,
    pub outcomes: Vec<RecipientOutcome>,
    /// 管道内被截获的错误
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub handled_at: DateTime<Utc>,
}

impl HandleReport {
    pub fn new(document_path: impl Into<String>) -> Self {
        Self {
            invocation_id: Uuid::now_v7().to_string(),
            document_path: document_path.into(),
            handled: true,
            event: None,
            outcomes: Vec::new(),
            error: None,
            handled_at: Utc::now(),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_sent()).count()
    }
}

/// 通知触发处理器
///
/// 存储和推送网关由调用方注入，处理器本身不持有可变状态。
pub struct NotificationHandler {
    resolver: RecipientResolver,
    composer: MessageComposer,
    dispatcher: Dispatcher,
}

impl NotificationHandler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        sender: Arc<dyn PushSender>,
        table: LocalizationTable,
    ) -> Self {
        Self {
            resolver: RecipientResolver::new(store),
            composer: MessageComposer::new(table),
            dispatcher: Dispatcher::new(sender),
        }
    }

    /// 处理一次文档变更
    pub async fn handle(&self, change: ChangeEvent) -> HandleReport {
        let started = Instant::now();
        let mut report = HandleReport::new(change.document_path.as_str());
        let span = info_span!(
            "trigger",
            invocation_id = %report.invocation_id,
            path = %report.document_path,
            event_time = ?change.timestamp
        );

        let result = AssertUnwindSafe(self.process(change, &mut report).instrument(span.clone()))
            .catch_unwind()
            .await;

        let _entered = span.enter();
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(
                    code = e.code(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "触发处理失败"
                );
                report.error = Some(e.to_string());
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "触发处理发生 panic");
                report.error = Some(format!("panic: {message}"));
            }
        }

        let elapsed = started.elapsed();
        metrics::record_handle_duration(elapsed.as_secs_f64());
        info!(
            event = report.event.map(|e| e.as_str()),
            outcomes = report.outcomes.len(),
            sent = report.sent_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "触发处理完成"
        );
        report
    }

    /// 管道主体；已确定的事件和结局随时写入报告，出错时也能保留
    async fn process(&self, change: ChangeEvent, report: &mut HandleReport) -> Result<()> {
        let kind = match DocumentKind::parse(&change.document_path) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(error = %e, "不受监听的文档路径，忽略");
                metrics::record_trigger_event("unknown");
                return Ok(());
            }
        };
        metrics::record_trigger_event(kind.label());

        let before = normalize_snapshot(change.before)?;
        let after = normalize_snapshot(change.after)?;

        let Some(event) = classify(before.as_ref(), after.as_ref(), &kind) else {
            debug!(kind = kind.label(), "变更无需通知");
            return Ok(());
        };
        let notification_type = event.notification_type();
        report.event = Some(notification_type);
        metrics::record_classified(notification_type.as_str());
        info!(
            event = notification_type.as_str(),
            actor_id = event.actor_id(),
            "识别到通知事件"
        );

        let resolution = self.resolver.resolve(&event).await?;

        let deliveries = resolution
            .targets
            .into_iter()
            .map(|target| {
                let rendered = self.composer.compose(&event, &target, &resolution.context);
                (target, rendered)
            })
            .collect();

        for skipped in &resolution.skipped {
            metrics::record_dispatch(skipped.outcome.label());
        }
        report.outcomes = resolution.skipped;
        let dispatched = self.dispatcher.dispatch_all(deliveries).await;
        report.outcomes.extend(dispatched);
        Ok(())
    }
}

fn normalize_snapshot(snapshot: Option<Value>) -> Result<Option<Value>> {
    snapshot.map(normalize).transpose()
}
