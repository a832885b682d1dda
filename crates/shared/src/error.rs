//! 统一错误处理模块
//!
//! 定义通知系统中所有共享的错误类型，使用 thiserror 提供良好的错误信息。

use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum NotifyError {
    // ==================== 文档存储错误 ====================
    #[error("文档解码失败: path={path}, 原因={reason}")]
    Decode { path: String, reason: String },

    #[error("无效的文档路径: {0}")]
    InvalidPath(String),

    // ==================== 外部服务错误 ====================
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("外部服务错误: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("外部服务超时: {service}")]
    ExternalServiceTimeout { service: String },

    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, NotifyError>;

impl NotifyError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "DECODE_ERROR",
            Self::InvalidPath(_) => "INVALID_PATH",
            Self::Http(_) => "HTTP_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::ExternalServiceTimeout { .. } => "EXTERNAL_SERVICE_TIMEOUT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 仅用于日志分级；触发器调用本身不会因此重试
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::ExternalServiceTimeout { .. } => true,
            _ => false,
        }
    }

    /// 构造文档解码错误
    pub fn decode(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
