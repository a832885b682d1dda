//! 测试工具模块
//!
//! 提供集成测试所需的辅助函数和测试数据生成器。
//! 生成的文档均为普通 JSON（camelCase 字段），可直接写入内存存储或作为变更快照。

use serde_json::{Value, json};
use uuid::Uuid;

use crate::events::{ChangeEvent, collections};
use crate::store::MemoryDocumentStore;

// ==================== 标识辅助 ====================

/// 生成唯一的测试用户 ID
pub fn test_user_id() -> String {
    format!("test-user-{}", Uuid::new_v4())
}

// ==================== 测试数据生成器 ====================

/// 测试数据生成器
///
/// 提供生成测试用用户、聊天室、消息、聚会文档和变更事件的便捷方法
pub struct TestDataGenerator;

impl TestDataGenerator {
    /// 生成用户文档
    pub fn user(display_name: &str, token: Option<&str>, language: Option<&str>) -> Value {
        let mut user = json!({
            "displayName": display_name,
            "receivedLikes": [],
            "matches": [],
            "friendRequestsReceived": []
        });
        if let Some(token) = token {
            user["fcmToken"] = json!(token);
        }
        if let Some(language) = language {
            user["languageCode"] = json!(language);
        }
        user
    }

    /// 生成单聊房间文档
    pub fn direct_room(a: &str, b: &str) -> Value {
        json!({
            "type": "direct",
            "participants": [a, b]
        })
    }

    /// 生成群聊房间文档
    pub fn group_room(title: Option<&str>, participants: &[&str]) -> Value {
        let mut room = json!({
            "type": "group",
            "participants": participants
        });
        if let Some(title) = title {
            room["title"] = json!(title);
        }
        room
    }

    /// 生成聊天消息文档
    pub fn message(sender_id: &str, text: &str) -> Value {
        json!({
            "senderId": sender_id,
            "text": text
        })
    }

    /// 生成聚会文档
    pub fn socialing(title: &str, host_id: &str, applicants: &[&str], members: &[&str]) -> Value {
        json!({
            "title": title,
            "hostId": host_id,
            "applicants": applicants,
            "members": members
        })
    }

    /// 聊天消息创建事件
    pub fn message_created(room_id: &str, message_id: &str, sender_id: &str, text: &str) -> ChangeEvent {
        ChangeEvent::new(
            collections::message_path(room_id, message_id),
            None,
            Some(Self::message(sender_id, text)),
        )
    }

    /// 用户文档更新事件
    pub fn user_updated(user_id: &str, before: Value, after: Value) -> ChangeEvent {
        ChangeEvent::new(collections::user_path(user_id), Some(before), Some(after))
    }

    /// 聚会文档更新事件
    pub fn socialing_updated(socialing_id: &str, before: Value, after: Value) -> ChangeEvent {
        ChangeEvent::new(
            collections::socialing_path(socialing_id),
            Some(before),
            Some(after),
        )
    }
}

// ==================== 测试 Fixture ====================

/// 测试 Fixture 构建器
///
/// 用于快速构建预置了用户、聊天室和聚会的内存存储
pub struct TestFixture {
    store: MemoryDocumentStore,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            store: MemoryDocumentStore::new(),
        }
    }

    /// 添加用户
    pub fn with_user(
        self,
        user_id: &str,
        display_name: &str,
        token: Option<&str>,
        language: Option<&str>,
    ) -> Self {
        self.store.insert(
            &collections::user_path(user_id),
            TestDataGenerator::user(display_name, token, language),
        );
        self
    }

    /// 添加任意聊天室文档
    pub fn with_room(self, room_id: &str, room: Value) -> Self {
        self.store.insert(&collections::room_path(room_id), room);
        self
    }

    /// 添加聚会
    pub fn with_socialing(self, socialing_id: &str, socialing: Value) -> Self {
        self.store
            .insert(&collections::socialing_path(socialing_id), socialing);
        self
    }

    pub fn build(self) -> MemoryDocumentStore {
        self.store
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocumentStore;

    #[tokio::test]
    async fn test_fixture_seeds_store() {
        let store = TestFixture::new()
            .with_user("a", "Alice", Some("tok-a"), Some("en"))
            .with_user("b", "Bob", None, None)
            .with_room("r1", TestDataGenerator::direct_room("a", "b"))
            .build();

        assert_eq!(store.count(), 3);
        let bob = store.get_user("b").await.unwrap().unwrap();
        assert!(bob.delivery_token().is_none());
        let room = store.get_room("r1").await.unwrap().unwrap();
        assert_eq!(room.participants, vec!["a", "b"]);
    }

    #[test]
    fn test_unique_user_ids() {
        assert_ne!(test_user_id(), test_user_id());
    }
}
