//! 通知服务错误类型
//!
//! 定义推送发送和消息序列化等场景的错误分类，
//! 便于在单个接收者边界上区分“令牌失效”和“临时失败”。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("推送发送失败: 渠道={provider}, 原因={reason}")]
    SendFailed { provider: String, reason: String },

    #[error("推送令牌无效或已过期: {reason}")]
    InvalidToken { reason: String },

    #[error("推送消息序列化失败: {0}")]
    Serialization(String),

    #[error(transparent)]
    Shared(#[from] notify_shared::error::NotifyError),
}

impl NotificationError {
    /// 令牌失效属于永久失败，重发没有意义
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::InvalidToken { .. })
    }
}
