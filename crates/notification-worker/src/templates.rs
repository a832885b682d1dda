//! 通知文案渲染
//!
//! 按接收者语言选取模板，替换 `{{变量}}` 占位符，生成推送标题、正文和附加数据。

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use notify_shared::events::NotificationEvent;
use regex::{Captures, Regex};
use tracing::warn;

use crate::locale::{Catalog, LocalizationTable, MessageTemplates};
use crate::resolver::{ComposeContext, RecipientTarget};

/// 客户端点击通知时打开应用的动作标识
pub const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

static VARIABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("模板变量正则无效"));

/// 模板变量替换
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// 单遍替换模板中的 `{{name}}`
    ///
    /// 替换结果不会被再次扫描，因此消息原文中的 `{{...}}` 原样保留。
    /// 未提供的变量保持原样并记录警告。
    pub fn render(template: &str, vars: &HashMap<&str, &str>) -> String {
        VARIABLE_REGEX
            .replace_all(template, |caps: &Captures| {
                let name = &caps[1];
                match vars.get(name) {
                    Some(value) => (*value).to_string(),
                    None => {
                        warn!(variable = name, "模板变量缺失");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

/// 渲染完成的推送内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
    /// 随推送下发给客户端的键值数据
    pub data: BTreeMap<String, String>,
}

/// 推送文案组装器
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageComposer {
    table: LocalizationTable,
}

impl MessageComposer {
    pub fn new(table: LocalizationTable) -> Self {
        Self { table }
    }

    /// 为单个接收者生成推送内容
    pub fn compose(
        &self,
        event: &NotificationEvent,
        target: &RecipientTarget,
        context: &ComposeContext,
    ) -> RenderedMessage {
        let catalog = self.table.catalog(target.language_code.as_deref());
        let templates = Self::select_templates(catalog, event, context);

        let actor = context
            .actor_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(catalog.unknown_user);
        let room = context
            .room
            .as_ref()
            .and_then(|room| room.display_title())
            .unwrap_or(catalog.group_chat_label);

        let mut vars = HashMap::from([("actor", actor), ("room", room)]);
        if let Some(title) = event.socialing_title() {
            vars.insert("title", title);
        }
        if let NotificationEvent::ChatMessageCreated { text, .. } = event {
            vars.insert("text", text.as_str());
        }

        RenderedMessage {
            title: TemplateRenderer::render(templates.title, &vars),
            body: TemplateRenderer::render(templates.body, &vars),
            data: Self::payload(event),
        }
    }

    fn select_templates(
        catalog: &Catalog,
        event: &NotificationEvent,
        context: &ComposeContext,
    ) -> MessageTemplates {
        let in_group = context.room.as_ref().is_some_and(|room| room.is_group());
        match event {
            NotificationEvent::ChatMessageCreated { .. } if in_group => catalog.group_chat,
            _ => catalog.templates(event.notification_type()),
        }
    }

    /// 客户端路由所需的附加数据
    fn payload(event: &NotificationEvent) -> BTreeMap<String, String> {
        let mut data = BTreeMap::from([
            ("click_action".to_string(), CLICK_ACTION.to_string()),
            (
                "type".to_string(),
                event.notification_type().as_str().to_string(),
            ),
        ]);

        match event {
            NotificationEvent::ChatMessageCreated { room_id, .. } => {
                data.insert("roomId".to_string(), room_id.clone());
            }
            NotificationEvent::GroupApplicationReceived { socialing_id, .. }
            | NotificationEvent::GroupApplicationApproved { socialing_id, .. } => {
                data.insert("socialingId".to_string(), socialing_id.clone());
                data.insert("userId".to_string(), event.actor_id().to_string());
            }
            _ => {
                data.insert("userId".to_string(), event.actor_id().to_string());
            }
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Language;
    use notify_shared::models::{ChatRoom, RoomType, User};

    fn target(language: Option<&str>) -> RecipientTarget {
        RecipientTarget {
            user_id: "B".to_string(),
            token: "tok-b".to_string(),
            language_code: language.map(str::to_string),
            display_name: "Bob".to_string(),
        }
    }

    fn chat(text: &str) -> NotificationEvent {
        NotificationEvent::ChatMessageCreated {
            room_id: "r1".to_string(),
            message_id: "m1".to_string(),
            sender_id: "A".to_string(),
            text: text.to_string(),
        }
    }

    fn room(room_type: RoomType, title: Option<&str>, participants: &[&str]) -> ChatRoom {
        ChatRoom {
            id: "r1".to_string(),
            room_type: Some(room_type),
            participants: participants.iter().map(|p| p.to_string()).collect(),
            title: title.map(str::to_string),
            ..Default::default()
        }
    }

    fn all_events() -> Vec<NotificationEvent> {
        let recipient = User {
            id: "B".to_string(),
            ..Default::default()
        };
        vec![
            chat("hello"),
            NotificationEvent::LikeReceived {
                recipient: recipient.clone(),
                liker_id: "A".to_string(),
            },
            NotificationEvent::MatchFormed {
                recipient: recipient.clone(),
                partner_id: "A".to_string(),
            },
            NotificationEvent::FriendRequestReceived {
                recipient,
                sender_id: "A".to_string(),
            },
            NotificationEvent::GroupApplicationReceived {
                socialing_id: "s1".to_string(),
                title: "Hike".to_string(),
                host_id: "B".to_string(),
                applicant_id: "A".to_string(),
            },
            NotificationEvent::GroupApplicationApproved {
                socialing_id: "s1".to_string(),
                title: "Hike".to_string(),
                host_id: "A".to_string(),
                member_id: "B".to_string(),
            },
        ]
    }

    #[test]
    fn test_render_replaces_known_variables_once() {
        let vars = HashMap::from([("actor", "Alice"), ("text", "{{actor}}")]);
        assert_eq!(
            TemplateRenderer::render("{{actor}}: {{text}}", &vars),
            "Alice: {{actor}}"
        );
        assert_eq!(TemplateRenderer::render("{{missing}}!", &vars), "{{missing}}!");
    }

    #[test]
    fn test_direct_chat_message() {
        let composer = MessageComposer::default();
        let context = ComposeContext {
            actor_name: Some("Alice".to_string()),
            room: Some(room(RoomType::Direct, None, &["A", "B"])),
        };

        let message = composer.compose(&chat("hello"), &target(Some("en")), &context);
        assert_eq!(message.title, "Alice");
        assert_eq!(message.body, "hello");
        assert_eq!(message.data["roomId"], "r1");
        assert_eq!(message.data["click_action"], CLICK_ACTION);
    }

    #[test]
    fn test_group_chat_message() {
        let composer = MessageComposer::default();
        let mut context = ComposeContext {
            actor_name: Some("Alice".to_string()),
            room: Some(room(RoomType::Group, Some("Trip"), &["A", "B", "C"])),
        };

        let message = composer.compose(&chat("hi"), &target(Some("en")), &context);
        assert_eq!(message.title, "Trip");
        assert_eq!(message.body, "Alice: hi");

        // 没有标题的群聊使用本地化默认标题
        context.room = Some(room(RoomType::Group, None, &["A", "B", "C"]));
        let message = composer.compose(&chat("hi"), &target(Some("ko")), &context);
        assert_eq!(message.title, "그룹 채팅");
    }

    #[test]
    fn test_match_uses_placeholder_when_actor_unknown() {
        let composer = MessageComposer::new(LocalizationTable::new(Language::English));
        let event = NotificationEvent::MatchFormed {
            recipient: User::default(),
            partner_id: "U2".to_string(),
        };

        let message = composer.compose(&event, &target(Some("en")), &ComposeContext::default());
        assert_eq!(message.title, "It's a Match! 🎉");
        assert!(message.body.contains("Unknown"));
        assert_eq!(message.data["type"], "match");
        assert_eq!(message.data["userId"], "U2");

        let named = ComposeContext {
            actor_name: Some("Jamie".to_string()),
            room: None,
        };
        let message = composer.compose(&event, &target(Some("en")), &named);
        assert!(message.body.contains("Jamie"));
    }

    #[test]
    fn test_unsupported_language_uses_default() {
        let composer = MessageComposer::default();
        let event = NotificationEvent::LikeReceived {
            recipient: User::default(),
            liker_id: "A".to_string(),
        };
        let context = ComposeContext {
            actor_name: Some("Alice".to_string()),
            room: None,
        };

        let message = composer.compose(&event, &target(Some("fr")), &context);
        assert_eq!(message.body, "Alice님이 회원님을 좋아합니다.");
    }

    #[test]
    fn test_socialing_messages_include_title() {
        let composer = MessageComposer::default();
        let events = all_events();
        let context = ComposeContext {
            actor_name: Some("Alice".to_string()),
            room: None,
        };

        let applied = composer.compose(&events[4], &target(Some("en")), &context);
        assert_eq!(applied.body, "Alice applied to join \"Hike\".");
        assert_eq!(applied.data["socialingId"], "s1");

        let approved = composer.compose(&events[5], &target(Some("ja")), &context);
        assert!(approved.body.contains("Hike"));
        assert_eq!(approved.data["userId"], "A");
    }

    #[test]
    fn test_every_kind_and_language_renders_non_empty() {
        let composer = MessageComposer::default();
        for event in all_events() {
            for language in Language::SUPPORTED {
                let message = composer.compose(
                    &event,
                    &target(Some(language.code())),
                    &ComposeContext::default(),
                );
                assert!(!message.title.is_empty(), "{event:?} / {language:?}");
                assert!(!message.body.is_empty(), "{event:?} / {language:?}");
                assert!(!message.title.contains("{{"), "{event:?} / {language:?}");
                assert!(!message.body.contains("{{"), "{event:?} / {language:?}");
            }
        }
    }
}
