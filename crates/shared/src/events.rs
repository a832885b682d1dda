//! 事件模型
//!
//! 定义文档变更事件的统一信封、文档路径分类，以及由变更推导出的通知事件。
//! 变更事件由外部触发基础设施投递，通知事件只在一次调用内存在，不落库。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, Result};
use crate::models::{User, UserId};

// ---------------------------------------------------------------------------
// 集合名常量
// ---------------------------------------------------------------------------

/// 集中管理文档集合名，防止字符串散落在各处导致拼写不一致
pub mod collections {
    pub const USERS: &str = "users";
    pub const CHAT_ROOMS: &str = "chat_rooms";
    pub const MESSAGES: &str = "messages";
    pub const SOCIALINGS: &str = "socialings";

    pub fn user_path(user_id: &str) -> String {
        format!("{USERS}/{user_id}")
    }

    pub fn room_path(room_id: &str) -> String {
        format!("{CHAT_ROOMS}/{room_id}")
    }

    pub fn message_path(room_id: &str, message_id: &str) -> String {
        format!("{CHAT_ROOMS}/{room_id}/{MESSAGES}/{message_id}")
    }

    pub fn socialing_path(socialing_id: &str) -> String {
        format!("{SOCIALINGS}/{socialing_id}")
    }
}

// ---------------------------------------------------------------------------
// ChangeEvent — 文档变更信封
// ---------------------------------------------------------------------------

/// 文档变更事件
///
/// 创建事件没有 `before`；删除事件没有 `after`。快照可以是普通 JSON 对象，
/// 也可以是 Firestore REST 文档格式，进入处理管道前统一由
/// [`crate::document::normalize`] 转换。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub document_path: String,
    #[serde(default)]
    pub before: Option<serde_json::Value>,
    #[serde(default)]
    pub after: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChangeEvent {
    pub fn new(
        document_path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            document_path: document_path.into(),
            before,
            after,
            timestamp: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentKind — 被监听的文档类别
// ---------------------------------------------------------------------------

/// 被监听的三类文档路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// `chat_rooms/{roomId}/messages/{messageId}`
    ChatMessage { room_id: String, message_id: String },
    /// `users/{userId}`
    User { user_id: UserId },
    /// `socialings/{socialingId}`
    Socialing { socialing_id: String },
}

impl DocumentKind {
    /// 解析文档路径
    ///
    /// 同时接受相对路径和完整资源名
    /// （`projects/{p}/databases/{d}/documents/users/u1`）。
    pub fn parse(path: &str) -> Result<Self> {
        let relative = path
            .split_once("/documents/")
            .map(|(_, rest)| rest)
            .unwrap_or(path)
            .trim_matches('/');

        let segments: Vec<&str> = relative.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(NotifyError::InvalidPath(path.to_string()));
        }

        match segments.as_slice() {
            [collections::CHAT_ROOMS, room_id, collections::MESSAGES, message_id] => {
                Ok(Self::ChatMessage {
                    room_id: room_id.to_string(),
                    message_id: message_id.to_string(),
                })
            }
            [collections::USERS, user_id] => Ok(Self::User {
                user_id: user_id.to_string(),
            }),
            [collections::SOCIALINGS, socialing_id] => Ok(Self::Socialing {
                socialing_id: socialing_id.to_string(),
            }),
            _ => Err(NotifyError::InvalidPath(path.to_string())),
        }
    }

    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            Self::ChatMessage { .. } => "chat_message",
            Self::User { .. } => "user",
            Self::Socialing { .. } => "socialing",
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationType / NotificationEvent — 推导出的通知
// ---------------------------------------------------------------------------

/// 通知类型，同时作为推送 data 中的 `type` 路由标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Chat,
    Like,
    Match,
    FriendRequest,
    SocialingApplication,
    SocialingApproved,
}

impl NotificationType {
    pub const ALL: [NotificationType; 6] = [
        Self::Chat,
        Self::Like,
        Self::Match,
        Self::FriendRequest,
        Self::SocialingApplication,
        Self::SocialingApproved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Like => "like",
            Self::Match => "match",
            Self::FriendRequest => "friend_request",
            Self::SocialingApplication => "socialing_application",
            Self::SocialingApproved => "socialing_approved",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 由文档变更推导出的语义事件
///
/// 用户文档类事件携带变更后的接收者快照，解析接收者时无需再次读取。
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    ChatMessageCreated {
        room_id: String,
        message_id: String,
        sender_id: UserId,
        text: String,
    },
    LikeReceived {
        recipient: User,
        liker_id: UserId,
    },
    MatchFormed {
        recipient: User,
        partner_id: UserId,
    },
    FriendRequestReceived {
        recipient: User,
        sender_id: UserId,
    },
    GroupApplicationReceived {
        socialing_id: String,
        title: String,
        host_id: UserId,
        applicant_id: UserId,
    },
    GroupApplicationApproved {
        socialing_id: String,
        title: String,
        host_id: UserId,
        member_id: UserId,
    },
}

impl NotificationEvent {
    pub fn notification_type(&self) -> NotificationType {
        match self {
            Self::ChatMessageCreated { .. } => NotificationType::Chat,
            Self::LikeReceived { .. } => NotificationType::Like,
            Self::MatchFormed { .. } => NotificationType::Match,
            Self::FriendRequestReceived { .. } => NotificationType::FriendRequest,
            Self::GroupApplicationReceived { .. } => NotificationType::SocialingApplication,
            Self::GroupApplicationApproved { .. } => NotificationType::SocialingApproved,
        }
    }

    /// 触发该事件的用户（发送者、点赞者、申请者……）
    pub fn actor_id(&self) -> &str {
        match self {
            Self::ChatMessageCreated { sender_id, .. } => sender_id,
            Self::LikeReceived { liker_id, .. } => liker_id,
            Self::MatchFormed { partner_id, .. } => partner_id,
            Self::FriendRequestReceived { sender_id, .. } => sender_id,
            Self::GroupApplicationReceived { applicant_id, .. } => applicant_id,
            Self::GroupApplicationApproved { host_id, .. } => host_id,
        }
    }

    /// 聚会标题（仅聚会类事件）
    pub fn socialing_title(&self) -> Option<&str> {
        match self {
            Self::GroupApplicationReceived { title, .. }
            | Self::GroupApplicationApproved { title, .. } => Some(title),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relative_paths() {
        assert_eq!(
            DocumentKind::parse("chat_rooms/r1/messages/m1").unwrap(),
            DocumentKind::ChatMessage {
                room_id: "r1".to_string(),
                message_id: "m1".to_string()
            }
        );
        assert_eq!(
            DocumentKind::parse("/users/u1").unwrap(),
            DocumentKind::User {
                user_id: "u1".to_string()
            }
        );
        assert_eq!(
            DocumentKind::parse("socialings/s1").unwrap().label(),
            "socialing"
        );
    }

    #[test]
    fn test_parse_full_resource_name() {
        let kind =
            DocumentKind::parse("projects/demo/databases/(default)/documents/users/u42").unwrap();
        assert_eq!(
            kind,
            DocumentKind::User {
                user_id: "u42".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_unwatched_paths() {
        for path in ["chat_rooms/r1", "users", "users//x", "posts/p1", "users/u1/private/x"] {
            let err = DocumentKind::parse(path).unwrap_err();
            assert_eq!(err.code(), "INVALID_PATH", "path {path}");
        }
    }

    #[test]
    fn test_change_event_deserialize_without_before() {
        let event: ChangeEvent = serde_json::from_value(serde_json::json!({
            "documentPath": "chat_rooms/r1/messages/m1",
            "after": { "senderId": "a", "text": "hi" }
        }))
        .unwrap();
        assert!(event.before.is_none());
        assert!(event.after.is_some());
    }

    #[test]
    fn test_notification_type_tags() {
        let tags: Vec<_> = NotificationType::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            tags,
            vec![
                "chat",
                "like",
                "match",
                "friend_request",
                "socialing_application",
                "socialing_approved"
            ]
        );
    }
}
