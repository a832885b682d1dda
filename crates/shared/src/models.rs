//! 应用实体模型
//!
//! 对应文档存储中的聊天室、聊天消息、用户与聚会文档。
//! 这些文档由应用自身维护，通知系统只读取并据此推导通知。
//! 字段名与存储中的 camelCase 保持一致，未列出的字段在反序列化时忽略。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 用户标识
pub type UserId = String;

/// 聊天室类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Direct,
    Group,
}

/// 聊天室 `chat_rooms/{roomId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRoom {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "type")]
    pub room_type: Option<RoomType>,
    pub participants: Vec<UserId>,
    /// 参与者昵称快照，由客户端在建房时写入
    pub participant_names: HashMap<UserId, String>,
    pub title: Option<String>,
}

impl ChatRoom {
    /// 房间类型；未显式声明时按人数推断，超过两人即为群聊
    pub fn kind(&self) -> RoomType {
        self.room_type.unwrap_or(if self.participants.len() > 2 {
            RoomType::Group
        } else {
            RoomType::Direct
        })
    }

    pub fn is_group(&self) -> bool {
        self.kind() == RoomType::Group
    }

    /// 校验参与者不变式：非空，且单聊恰好两人
    pub fn validate(&self) -> Result<(), String> {
        if self.participants.is_empty() {
            return Err("participants 为空".to_string());
        }
        if self.kind() == RoomType::Direct && self.participants.len() != 2 {
            return Err(format!(
                "单聊参与者数量应为 2，实际 {}",
                self.participants.len()
            ));
        }
        Ok(())
    }

    /// 非空的房间标题
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// 房间内记录的参与者昵称
    pub fn participant_name(&self, user_id: &str) -> Option<&str> {
        self.participant_names
            .get(user_id)
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }
}

/// 聊天消息 `chat_rooms/{roomId}/messages/{messageId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_id: UserId,
    #[serde(default)]
    pub text: String,
}

/// 收到的好友请求记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub sender_id: UserId,
}

/// 用户资料 `users/{userId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(skip)]
    pub id: UserId,
    pub display_name: String,
    pub language_code: Option<String>,
    /// 设备推送令牌
    pub fcm_token: Option<String>,
    pub received_likes: Vec<UserId>,
    pub matches: Vec<UserId>,
    pub friend_requests_received: Vec<FriendRequest>,
}

impl User {
    /// 可用的推送令牌，空字符串视为缺失
    pub fn delivery_token(&self) -> Option<&str> {
        self.fcm_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// 非空的显示名
    pub fn name(&self) -> Option<&str> {
        Some(self.display_name.trim()).filter(|n| !n.is_empty())
    }
}

/// 聚会（socialing）`socialings/{socialingId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialGroupEvent {
    pub title: String,
    pub host_id: UserId,
    pub applicants: Vec<UserId>,
    pub members: Vec<UserId>,
}
