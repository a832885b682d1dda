//! 文档存储访问
//!
//! `DocumentStore` 是通知核心读取外部文档库的唯一入口。
//! 原始读取只返回普通 JSON，带类型的读取方法负责解码与不变式校验，
//! 并把“文档不存在”和“文档格式非法”统一视为 `None`。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::document;
use crate::error::{NotifyError, Result};
use crate::events::collections;
use crate::models::{ChatRoom, User};

/// 文档存储接口
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 读取文档的普通 JSON 表示，不存在时返回 `Ok(None)`
    async fn get_document(&self, path: &str) -> Result<Option<Value>>;

    /// 读取用户
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let path = collections::user_path(user_id);
        Ok(decode_or_none::<User>(&path, self.get_document(&path).await?).map(|mut user| {
            user.id = user_id.to_string();
            user
        }))
    }

    /// 读取聊天室，参与者不变式不成立时视为不存在
    async fn get_room(&self, room_id: &str) -> Result<Option<ChatRoom>> {
        let path = collections::room_path(room_id);
        let Some(mut room) = decode_or_none::<ChatRoom>(&path, self.get_document(&path).await?)
        else {
            return Ok(None);
        };
        if let Err(reason) = room.validate() {
            warn!(path = %path, reason = %reason, "聊天室数据不满足约束，按不存在处理");
            return Ok(None);
        }
        room.id = room_id.to_string();
        Ok(Some(room))
    }
}

/// 解码快照，失败时记录日志并返回 None
fn decode_or_none<T: serde::de::DeserializeOwned>(path: &str, value: Option<Value>) -> Option<T> {
    let value = value?;
    match document::decode_entity::<T>(path, &value) {
        Ok(entity) => Some(entity),
        Err(e) => {
            warn!(path = %path, error = %e, "文档解码失败，按不存在处理");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Firestore REST 实现
// ---------------------------------------------------------------------------

/// 基于 Firestore REST API 的文档存储
///
/// 访问令牌由外部签发后通过配置注入；令牌为空时不携带 Authorization 头，
/// 便于直接连接本地模拟器。
#[derive(Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    documents_url: String,
    access_token: Option<String>,
}

impl FirestoreStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let documents_url = format!(
            "{}/v1/projects/{}/databases/{}/documents",
            config.base_url.trim_end_matches('/'),
            config.project_id,
            config.database_id
        );

        Ok(Self {
            client,
            documents_url,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// 文档的 REST 地址
    pub fn document_url(&self, path: &str) -> String {
        format!("{}/{}", self.documents_url, path.trim_matches('/'))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_document(&self, path: &str) -> Result<Option<Value>> {
        let url = self.document_url(path);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                NotifyError::ExternalServiceTimeout {
                    service: "firestore".to_string(),
                }
            } else {
                NotifyError::Http(e)
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(path = %path, "文档不存在");
                Ok(None)
            }
            status if status.is_success() => {
                let raw: Value = response.json().await?;
                Ok(Some(document::normalize(raw)?))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(NotifyError::ExternalService {
                    service: "firestore".to_string(),
                    message: format!("status={status}, body={body}"),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 内存实现
// ---------------------------------------------------------------------------

/// 内存文档存储
///
/// 基于 DashMap 实现，按文档路径存放普通 JSON，适用于开发环境和测试。
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    data: Arc<DashMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖文档
    pub fn insert(&self, path: &str, value: Value) {
        self.data.insert(path.trim_matches('/').to_string(), value);
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, path: &str) -> Result<Option<Value>> {
        Ok(self
            .data
            .get(path.trim_matches('/'))
            .map(|v| v.value().clone()))
    }
}
