//! 变更分类器
//!
//! 比较文档变更前后的快照，判断发生了哪种需要通知的语义事件。
//! 每次调用最多产生一个事件；无法识别的变更不是错误，只返回 `None`。

use std::collections::HashSet;

use notify_shared::document::decode_entity;
use notify_shared::events::{DocumentKind, NotificationEvent};
use notify_shared::models::{ChatMessage, SocialGroupEvent, User};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// 对一次文档变更分类
///
/// 用户文档按固定优先级检查：好友请求 > 匹配 > 点赞。
/// 同一次更新里多个字段同时增长时只通知优先级最高的一项。
pub fn classify(
    before: Option<&Value>,
    after: Option<&Value>,
    kind: &DocumentKind,
) -> Option<NotificationEvent> {
    match kind {
        DocumentKind::ChatMessage {
            room_id,
            message_id,
        } => {
            // 只有新建消息才通知，已读标记等后续更新不再推送
            if before.is_some() {
                debug!(kind = kind.label(), "消息更新，非新建，忽略");
                return None;
            }
            let message: ChatMessage = decode_snapshot("after", after, kind)?;
            Some(NotificationEvent::ChatMessageCreated {
                room_id: room_id.clone(),
                message_id: message_id.clone(),
                sender_id: message.sender_id,
                text: message.text,
            })
        }
        DocumentKind::User { user_id } => {
            let before: User = decode_snapshot("before", before, kind)?;
            let mut after: User = decode_snapshot("after", after, kind)?;
            after.id = user_id.clone();
            classify_user(&before, after)
        }
        DocumentKind::Socialing { socialing_id } => {
            let before: SocialGroupEvent = decode_snapshot("before", before, kind)?;
            let after: SocialGroupEvent = decode_snapshot("after", after, kind)?;
            classify_socialing(socialing_id, &before, &after)
        }
    }
}

fn classify_user(before: &User, after: User) -> Option<NotificationEvent> {
    if let Some(request) = newly_added(
        &before.friend_requests_received,
        &after.friend_requests_received,
        |r| r.sender_id.as_str(),
    ) {
        let sender_id = request.sender_id.clone();
        return Some(NotificationEvent::FriendRequestReceived {
            recipient: after,
            sender_id,
        });
    }

    if let Some(partner_id) = newly_added(&before.matches, &after.matches, String::as_str) {
        let partner_id = partner_id.clone();
        return Some(NotificationEvent::MatchFormed {
            recipient: after,
            partner_id,
        });
    }

    if let Some(liker_id) = newly_added(&before.received_likes, &after.received_likes, String::as_str)
    {
        let liker_id = liker_id.clone();
        return Some(NotificationEvent::LikeReceived {
            recipient: after,
            liker_id,
        });
    }

    debug!(user_id = %after.id, "用户文档没有被监听字段增长");
    None
}

fn classify_socialing(
    socialing_id: &str,
    before: &SocialGroupEvent,
    after: &SocialGroupEvent,
) -> Option<NotificationEvent> {
    if let Some(applicant_id) = newly_added(&before.applicants, &after.applicants, String::as_str) {
        return Some(NotificationEvent::GroupApplicationReceived {
            socialing_id: socialing_id.to_string(),
            title: after.title.clone(),
            host_id: after.host_id.clone(),
            applicant_id: applicant_id.clone(),
        });
    }

    if let Some(member_id) = newly_added(&before.members, &after.members, String::as_str) {
        // 房主加入自己的聚会不通知
        if *member_id == after.host_id {
            debug!(socialing_id, "新成员为房主本人，跳过");
            return None;
        }
        return Some(NotificationEvent::GroupApplicationApproved {
            socialing_id: socialing_id.to_string(),
            title: after.title.clone(),
            host_id: after.host_id.clone(),
            member_id: member_id.clone(),
        });
    }

    debug!(socialing_id, "聚会文档没有被监听字段增长");
    None
}

/// 字段增长时返回新增的第一个元素
///
/// 只有 `after` 比 `before` 长才视为增长；新元素是 `after` 中第一个按 `key`
/// 不在 `before` 里的元素。长度增长但找不到新元素（例如重复写入）时返回 `None`。
fn newly_added<'a, T>(before: &[T], after: &'a [T], key: impl Fn(&T) -> &str) -> Option<&'a T> {
    if after.len() <= before.len() {
        return None;
    }
    let known: HashSet<&str> = before.iter().map(&key).collect();
    after.iter().find(|item| !known.contains(key(item)))
}

fn decode_snapshot<T: DeserializeOwned>(
    side: &str,
    snapshot: Option<&Value>,
    kind: &DocumentKind,
) -> Option<T> {
    let Some(snapshot) = snapshot else {
        debug!(side, kind = kind.label(), "快照缺失，不产生通知");
        return None;
    };
    match decode_entity::<T>(kind.label(), snapshot) {
        Ok(entity) => Some(entity),
        Err(e) => {
            warn!(side, error = %e, "快照解码失败，不产生通知");
            None
        }
    }
}
