//! 接收者解析
//!
//! 把分类出的通知事件映射为需要推送的接收者列表，读取每个接收者的推送令牌和语言偏好，
//! 同时查询触发者的显示名供文案使用。
//!
//! - 没有令牌的接收者记为 `SkippedNoToken`，不报错
//! - 接收者文档不存在记为 `SkippedNoRecipient`
//! - 单个接收者查询失败只影响该接收者（记为 `Failed`）
//! - 触发者资料缺失或查询失败时不填显示名，由文案使用本地化占位名

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{join, join_all};
use notify_shared::error::Result;
use notify_shared::events::NotificationEvent;
use notify_shared::models::{ChatRoom, User, UserId};
use notify_shared::store::DocumentStore;
use tracing::{debug, warn};

use crate::dispatcher::{DispatchOutcome, RecipientOutcome};

/// 可推送的接收者，令牌必然非空
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientTarget {
    pub user_id: UserId,
    pub token: String,
    pub language_code: Option<String>,
    pub display_name: String,
}

impl RecipientTarget {
    /// 从用户资料构造，没有可用令牌时返回 None
    pub fn from_user(user: &User) -> Option<Self> {
        let token = user.delivery_token()?;
        Some(Self {
            user_id: user.id.clone(),
            token: token.to_string(),
            language_code: user.language_code.clone(),
            display_name: user.display_name.clone(),
        })
    }
}

/// 渲染文案所需的上下文
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeContext {
    /// 触发者显示名；缺失时使用本地化占位名
    pub actor_name: Option<String>,
    /// 聊天消息所在的房间
    pub room: Option<ChatRoom>,
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub targets: Vec<RecipientTarget>,
    /// 解析阶段即确定不推送的接收者
    pub skipped: Vec<RecipientOutcome>,
    pub context: ComposeContext,
}

impl Resolution {
    fn admit(&mut self, user: &User) {
        match RecipientTarget::from_user(user) {
            Some(target) => self.targets.push(target),
            None => {
                debug!(user_id = %user.id, "接收者没有推送令牌，跳过");
                self.skipped.push(RecipientOutcome::new(
                    &user.id,
                    DispatchOutcome::SkippedNoToken,
                ));
            }
        }
    }

    fn admit_lookup(&mut self, user_id: &str, lookup: Result<Option<User>>) {
        match lookup {
            Ok(Some(user)) => self.admit(&user),
            Ok(None) => {
                debug!(user_id, "接收者文档不存在，跳过");
                self.skipped.push(RecipientOutcome::new(
                    user_id,
                    DispatchOutcome::SkippedNoRecipient,
                ));
            }
            Err(e) => {
                warn!(user_id, error = %e, "查询接收者失败");
                self.skipped.push(RecipientOutcome::new(
                    user_id,
                    DispatchOutcome::Failed {
                        reason: e.to_string(),
                    },
                ));
            }
        }
    }
}

/// 接收者解析器
pub struct RecipientResolver {
    store: Arc<dyn DocumentStore>,
}

impl RecipientResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 解析事件的接收者
    ///
    /// 只有聊天室本身读取失败会返回错误；逐个接收者的失败都记录在结果里。
    pub async fn resolve(&self, event: &NotificationEvent) -> Result<Resolution> {
        match event {
            NotificationEvent::ChatMessageCreated {
                room_id, sender_id, ..
            } => self.resolve_chat(room_id, sender_id).await,

            NotificationEvent::LikeReceived { recipient, .. }
            | NotificationEvent::MatchFormed { recipient, .. }
            | NotificationEvent::FriendRequestReceived { recipient, .. } => {
                let mut resolution = Resolution::default();
                resolution.admit(recipient);
                if !resolution.targets.is_empty() {
                    resolution.context.actor_name = self.actor_name(event.actor_id()).await;
                }
                Ok(resolution)
            }

            NotificationEvent::GroupApplicationReceived {
                host_id: recipient_id,
                ..
            }
            | NotificationEvent::GroupApplicationApproved {
                member_id: recipient_id,
                ..
            } => {
                let (lookup, actor_name) = join(
                    self.store.get_user(recipient_id),
                    self.actor_name(event.actor_id()),
                )
                .await;

                let mut resolution = Resolution::default();
                resolution.admit_lookup(recipient_id, lookup);
                resolution.context.actor_name = actor_name;
                Ok(resolution)
            }
        }
    }

    /// 聊天消息：通知除发送者外的所有参与者，逐个并发查询
    async fn resolve_chat(&self, room_id: &str, sender_id: &str) -> Result<Resolution> {
        let Some(room) = self.store.get_room(room_id).await? else {
            debug!(room_id, "聊天室不存在，不推送");
            return Ok(Resolution::default());
        };

        let mut seen = HashSet::new();
        let recipient_ids: Vec<&str> = room
            .participants
            .iter()
            .map(String::as_str)
            .filter(|id| *id != sender_id && seen.insert(*id))
            .collect();

        let lookups = join_all(recipient_ids.iter().map(|id| self.store.get_user(id)));
        let (lookups, actor_name) = join(lookups, self.sender_name(&room, sender_id)).await;

        let mut resolution = Resolution::default();
        for (user_id, lookup) in recipient_ids.iter().zip(lookups) {
            resolution.admit_lookup(user_id, lookup);
        }
        resolution.context = ComposeContext {
            actor_name,
            room: Some(room),
        };
        Ok(resolution)
    }

    /// 发送者名优先取房间内记录的昵称，其次取用户资料
    async fn sender_name(&self, room: &ChatRoom, sender_id: &str) -> Option<String> {
        match room.participant_name(sender_id) {
            Some(name) => Some(name.to_string()),
            None => self.actor_name(sender_id).await,
        }
    }

    /// 查询触发者显示名，失败不影响推送
    async fn actor_name(&self, actor_id: &str) -> Option<String> {
        match self.store.get_user(actor_id).await {
            Ok(Some(user)) => user.name().map(str::to_string),
            Ok(None) => {
                debug!(actor_id, "触发者文档不存在，使用占位名");
                None
            }
            Err(e) => {
                warn!(actor_id, error = %e, "查询触发者失败，使用占位名");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use notify_shared::error::NotifyError;
    use notify_shared::store::MemoryDocumentStore;
    use notify_shared::test_utils::{TestDataGenerator, TestFixture};
    use serde_json::Value;

    fn resolver(store: MemoryDocumentStore) -> RecipientResolver {
        RecipientResolver::new(Arc::new(store))
    }

    fn chat_event(room_id: &str, sender_id: &str) -> NotificationEvent {
        NotificationEvent::ChatMessageCreated {
            room_id: room_id.to_string(),
            message_id: "m1".to_string(),
            sender_id: sender_id.to_string(),
            text: "hi".to_string(),
        }
    }

    #[tokio::test]
    async fn test_direct_chat_resolves_other_participant() {
        let store = TestFixture::new()
            .with_user("A", "Alice", Some("tok-a"), Some("en"))
            .with_user("B", "Bob", Some("tok-b"), Some("en"))
            .with_room("r1", TestDataGenerator::direct_room("A", "B"))
            .build();

        let resolution = resolver(store).resolve(&chat_event("r1", "A")).await.unwrap();

        assert_eq!(resolution.targets.len(), 1);
        assert_eq!(resolution.targets[0].user_id, "B");
        assert_eq!(resolution.targets[0].token, "tok-b");
        assert_eq!(resolution.context.actor_name.as_deref(), Some("Alice"));
        assert!(resolution.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_group_chat_skips_users_without_token_or_document() {
        let store = TestFixture::new()
            .with_user("A", "Alice", Some("tok-a"), None)
            .with_user("B", "Bob", Some("tok-b"), None)
            .with_user("C", "Carol", None, None)
            .with_room(
                "g1",
                TestDataGenerator::group_room(Some("Trip"), &["A", "B", "C", "D"]),
            )
            .build();

        let resolution = resolver(store).resolve(&chat_event("g1", "A")).await.unwrap();

        let target_ids: Vec<_> = resolution.targets.iter().map(|t| t.user_id.as_str()).collect();
        assert_eq!(target_ids, vec!["B"]);
        assert!(resolution.targets.iter().all(|t| !t.token.is_empty()));
        assert_eq!(
            resolution.skipped,
            vec![
                RecipientOutcome::new("C", DispatchOutcome::SkippedNoToken),
                RecipientOutcome::new("D", DispatchOutcome::SkippedNoRecipient),
            ]
        );
        assert_eq!(
            resolution.context.room.as_ref().and_then(|r| r.display_title()),
            Some("Trip")
        );
    }

    #[tokio::test]
    async fn test_room_participant_names_take_precedence() {
        let mut room = TestDataGenerator::direct_room("A", "B");
        room["participantNames"] = serde_json::json!({ "A": "앨리스" });
        let store = TestFixture::new()
            .with_user("B", "Bob", Some("tok-b"), None)
            .with_room("r1", room)
            .build();

        let resolution = resolver(store).resolve(&chat_event("r1", "A")).await.unwrap();
        assert_eq!(resolution.context.actor_name.as_deref(), Some("앨리스"));
    }

    #[tokio::test]
    async fn test_missing_room_yields_empty_resolution() {
        let resolution = resolver(MemoryDocumentStore::new())
            .resolve(&chat_event("nope", "A"))
            .await
            .unwrap();
        assert!(resolution.targets.is_empty());
        assert!(resolution.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_user_event_reads_token_from_snapshot() {
        // 接收者本人不在存储中，令牌只能来自快照
        let store = TestFixture::new()
            .with_user("U2", "Jamie", Some("tok-u2"), None)
            .build();
        let recipient = User {
            id: "me".to_string(),
            display_name: "Me".to_string(),
            fcm_token: Some("tok-me".to_string()),
            language_code: Some("en".to_string()),
            ..Default::default()
        };
        let event = NotificationEvent::MatchFormed {
            recipient,
            partner_id: "U2".to_string(),
        };

        let resolution = resolver(store).resolve(&event).await.unwrap();
        assert_eq!(resolution.targets[0].user_id, "me");
        assert_eq!(resolution.targets[0].token, "tok-me");
        assert_eq!(resolution.context.actor_name.as_deref(), Some("Jamie"));
    }

    #[tokio::test]
    async fn test_user_event_without_token_is_skipped() {
        let event = NotificationEvent::LikeReceived {
            recipient: User {
                id: "me".to_string(),
                fcm_token: Some("   ".to_string()),
                ..Default::default()
            },
            liker_id: "x".to_string(),
        };

        let resolution = resolver(MemoryDocumentStore::new()).resolve(&event).await.unwrap();
        assert!(resolution.targets.is_empty());
        assert_eq!(
            resolution.skipped,
            vec![RecipientOutcome::new("me", DispatchOutcome::SkippedNoToken)]
        );
    }

    #[tokio::test]
    async fn test_socialing_recipients() {
        let store = TestFixture::new()
            .with_user("host", "Hana", Some("tok-host"), Some("ko"))
            .with_user("guest", "Gil", Some("tok-guest"), Some("ko"))
            .build();
        let resolver = resolver(store);

        let application = NotificationEvent::GroupApplicationReceived {
            socialing_id: "s1".to_string(),
            title: "Hike".to_string(),
            host_id: "host".to_string(),
            applicant_id: "guest".to_string(),
        };
        let resolution = resolver.resolve(&application).await.unwrap();
        assert_eq!(resolution.targets[0].user_id, "host");
        assert_eq!(resolution.context.actor_name.as_deref(), Some("Gil"));

        let approval = NotificationEvent::GroupApplicationApproved {
            socialing_id: "s1".to_string(),
            title: "Hike".to_string(),
            host_id: "host".to_string(),
            member_id: "guest".to_string(),
        };
        let resolution = resolver.resolve(&approval).await.unwrap();
        assert_eq!(resolution.targets[0].user_id, "guest");
        assert_eq!(resolution.context.actor_name.as_deref(), Some("Hana"));
    }

    struct UnavailableStore;

    #[async_trait]
    impl DocumentStore for UnavailableStore {
        async fn get_document(&self, _path: &str) -> Result<Option<Value>> {
            Err(NotifyError::ExternalServiceTimeout {
                service: "firestore".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_store_failures() {
        let resolver = RecipientResolver::new(Arc::new(UnavailableStore));

        // 房间读取失败向上返回
        assert!(resolver.resolve(&chat_event("r1", "A")).await.is_err());

        // 接收者查询失败只记录在该接收者上
        let approval = NotificationEvent::GroupApplicationApproved {
            socialing_id: "s1".to_string(),
            title: "Hike".to_string(),
            host_id: "host".to_string(),
            member_id: "guest".to_string(),
        };
        let resolution = resolver.resolve(&approval).await.unwrap();
        assert!(resolution.targets.is_empty());
        assert!(matches!(
            resolution.skipped[0].outcome,
            DispatchOutcome::Failed { .. }
        ));
        assert!(resolution.context.actor_name.is_none());
    }
}
