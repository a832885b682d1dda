//! 推送发送器
//!
//! 通过 `PushSender` trait 抽象推送网关，提供 FCM HTTP v1 实现和仅记录日志的演练实现。
//! 单次调用只投递一条消息，不做重试。

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use notify_shared::config::PushConfig;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::NotificationError;
use crate::templates::{CLICK_ACTION, RenderedMessage};

// ---------------------------------------------------------------------------
// 消息结构
// ---------------------------------------------------------------------------

/// 推送消息，字段与 FCM v1 `Message` 对齐
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub token: String,
    pub notification: PushNotification,
    pub data: BTreeMap<String, String>,
    pub android: AndroidConfig,
    pub apns: ApnsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidConfig {
    pub priority: String,
    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AndroidNotification {
    pub click_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aps {
    pub sound: String,
}

impl PushMessage {
    /// 以渲染结果构造发往单个令牌的消息：安卓高优先级，iOS 默认提示音
    pub fn new(token: impl Into<String>, rendered: &RenderedMessage) -> Self {
        Self {
            token: token.into(),
            notification: PushNotification {
                title: rendered.title.clone(),
                body: rendered.body.clone(),
            },
            data: rendered.data.clone(),
            android: AndroidConfig {
                priority: "high".to_string(),
                notification: AndroidNotification {
                    click_action: CLICK_ACTION.to_string(),
                },
            },
            apns: ApnsConfig {
                payload: ApnsPayload {
                    aps: Aps {
                        sound: "default".to_string(),
                    },
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// 发送器 trait
// ---------------------------------------------------------------------------

/// 推送网关
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    /// 投递一条消息，成功时返回网关分配的消息标识
    async fn send(&self, message: &PushMessage) -> Result<String, NotificationError>;

    /// 渠道名称，用于日志
    fn provider(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// FCM HTTP v1
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a PushMessage,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    #[serde(default)]
    error_code: Option<String>,
}

impl ErrorBody {
    fn error_code(&self) -> Option<&str> {
        self.details.iter().find_map(|d| d.error_code.as_deref())
    }
}

/// FCM HTTP v1 发送器
pub struct FcmSender {
    client: reqwest::Client,
    send_url: String,
    access_token: Option<String>,
}

impl FcmSender {
    pub fn new(config: &PushConfig) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(notify_shared::error::NotifyError::from)?;

        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            config.base_url.trim_end_matches('/'),
            config.project_id
        );

        Ok(Self {
            client,
            send_url,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }

    fn classify_failure(status: StatusCode, raw: &str) -> NotificationError {
        let envelope: ErrorEnvelope = serde_json::from_str(raw).unwrap_or_default();
        let body = envelope.error;
        let code = body.error_code().unwrap_or(body.status.as_str());

        if status == StatusCode::NOT_FOUND || code == "UNREGISTERED" {
            return NotificationError::InvalidToken {
                reason: if code.is_empty() {
                    status.to_string()
                } else {
                    code.to_string()
                },
            };
        }

        NotificationError::SendFailed {
            provider: "fcm".to_string(),
            reason: format!("status={status}, code={code}, message={}", body.message),
        }
    }
}

#[async_trait]
impl PushSender for FcmSender {
    async fn send(&self, message: &PushMessage) -> Result<String, NotificationError> {
        let mut request = self
            .client
            .post(&self.send_url)
            .json(&SendRequest { message });
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| NotificationError::SendFailed {
            provider: "fcm".to_string(),
            reason: if e.is_timeout() {
                "请求超时".to_string()
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        if status.is_success() {
            let body: SendResponse = response
                .json()
                .await
                .map_err(|e| NotificationError::Serialization(e.to_string()))?;
            debug!(message_id = %body.name, "FCM 推送成功");
            return Ok(body.name);
        }

        let raw = response.text().await.unwrap_or_default();
        let err = Self::classify_failure(status, &raw);
        warn!(status = %status, error = %err, "FCM 推送失败");
        Err(err)
    }

    fn provider(&self) -> &'static str {
        "fcm"
    }
}

// ---------------------------------------------------------------------------
// 演练发送器
// ---------------------------------------------------------------------------

/// 只记录日志的发送器
///
/// 用于本地开发和演练环境，不访问任何外部服务。
pub struct LogSender;

#[async_trait]
impl PushSender for LogSender {
    async fn send(&self, message: &PushMessage) -> Result<String, NotificationError> {
        let message_id = Uuid::now_v7().to_string();

        info!(
            provider = "log",
            message_id = %message_id,
            title = %message.notification.title,
            body = %message.notification.body,
            "模拟发送推送通知"
        );

        Ok(message_id)
    }

    fn provider(&self) -> &'static str {
        "log"
    }
}
