//! 推送分发
//!
//! 并发向每个接收者投递，并把结果折叠为逐接收者的结局。
//! 单个接收者失败不影响其他接收者。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use notify_shared::observability::metrics;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::resolver::RecipientTarget;
use crate::sender::{PushMessage, PushSender};
use crate::templates::RenderedMessage;

/// 单个接收者的推送结局
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { message_id: String },
    SkippedNoToken,
    SkippedNoRecipient,
    Failed { reason: String },
}

impl DispatchOutcome {
    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent { .. } => "sent",
            Self::SkippedNoToken => "skipped_no_token",
            Self::SkippedNoRecipient => "skipped_no_recipient",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOutcome {
    pub user_id: String,
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

impl RecipientOutcome {
    pub fn new(user_id: impl Into<String>, outcome: DispatchOutcome) -> Self {
        Self {
            user_id: user_id.into(),
            outcome,
        }
    }
}

/// 推送分发器
pub struct Dispatcher {
    sender: Arc<dyn PushSender>,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn PushSender>) -> Self {
        Self { sender }
    }

    /// 投递给单个接收者，任何发送错误都收敛为 `Failed`
    ///
    /// 令牌为空白时不调用网关，直接记为 `SkippedNoToken`。
    pub async fn dispatch(
        &self,
        target: &RecipientTarget,
        rendered: &RenderedMessage,
    ) -> RecipientOutcome {
        if target.token.trim().is_empty() {
            debug!(user_id = %target.user_id, "推送令牌为空，跳过");
            let outcome = DispatchOutcome::SkippedNoToken;
            metrics::record_dispatch(outcome.label());
            return RecipientOutcome::new(target.user_id.as_str(), outcome);
        }

        let message = PushMessage::new(target.token.as_str(), rendered);

        let outcome = match self.sender.send(&message).await {
            Ok(message_id) => {
                info!(
                    user_id = %target.user_id,
                    provider = self.sender.provider(),
                    message_id = %message_id,
                    "推送成功"
                );
                DispatchOutcome::Sent { message_id }
            }
            Err(e) => {
                warn!(
                    user_id = %target.user_id,
                    provider = self.sender.provider(),
                    permanent = e.is_permanent(),
                    error = %e,
                    "推送失败"
                );
                DispatchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        metrics::record_dispatch(outcome.label());
        RecipientOutcome::new(target.user_id.as_str(), outcome)
    }

    /// 并发投递，结果顺序与输入一致
    ///
    /// 每个投递单独截获 panic，只影响该接收者的结局。
    pub async fn dispatch_all(
        &self,
        deliveries: Vec<(RecipientTarget, RenderedMessage)>,
    ) -> Vec<RecipientOutcome> {
        join_all(deliveries.iter().map(|(target, rendered)| {
            AssertUnwindSafe(self.dispatch(target, rendered))
                .catch_unwind()
                .map(move |result: std::thread::Result<RecipientOutcome>| {
                    result.unwrap_or_else(|panic: Box<dyn Any + Send>| {
                        let message = panic_message(panic.as_ref());
                        error!(
                            user_id = %target.user_id,
                            provider = self.sender.provider(),
                            panic = %message,
                            "推送发生 panic"
                        );
                        let outcome = DispatchOutcome::Failed {
                            reason: format!("panic: {message}"),
                        };
                        metrics::record_dispatch(outcome.label());
                        RecipientOutcome::new(target.user_id.as_str(), outcome)
                    })
                })
                .boxed()
        }))
        .await
    }
}

/// 提取 panic 载荷中的文本
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
