//! 本地化文案表
//!
//! 按语言代码提供各类通知的标题/正文模板。模板中的 `{{actor}}`、`{{title}}`、
//! `{{room}}`、`{{text}}` 由 [`crate::templates::TemplateRenderer`] 替换。

use notify_shared::events::NotificationType;
use tracing::warn;

/// 支持的语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Korean,
    English,
    Japanese,
}

impl Language {
    pub const SUPPORTED: [Language; 3] = [Self::Korean, Self::English, Self::Japanese];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Korean => "ko",
            Self::English => "en",
            Self::Japanese => "ja",
        }
    }

    /// 解析语言代码，忽略大小写和地区后缀（`en-US`、`ko_KR`）
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match primary.as_str() {
            "ko" => Some(Self::Korean),
            "en" => Some(Self::English),
            "ja" => Some(Self::Japanese),
            _ => None,
        }
    }
}

/// 一类通知的标题与正文模板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTemplates {
    pub title: &'static str,
    pub body: &'static str,
}

/// 单聊：标题为发送者，正文为原文
const DIRECT_CHAT: MessageTemplates = MessageTemplates {
    title: "{{actor}}",
    body: "{{text}}",
};

/// 群聊：标题为房间名，正文带发送者前缀
const GROUP_CHAT: MessageTemplates = MessageTemplates {
    title: "{{room}}",
    body: "{{actor}}: {{text}}",
};

/// 单一语言的文案集
#[derive(Debug)]
pub struct Catalog {
    pub language: Language,
    pub direct_chat: MessageTemplates,
    pub group_chat: MessageTemplates,
    pub like: MessageTemplates,
    pub match_formed: MessageTemplates,
    pub friend_request: MessageTemplates,
    pub socialing_application: MessageTemplates,
    pub socialing_approved: MessageTemplates,
    /// 群聊没有标题时使用的默认标题
    pub group_chat_label: &'static str,
    /// 触发者资料缺失时的占位名
    pub unknown_user: &'static str,
}

impl Catalog {
    /// 通知类型对应的模板；聊天消息返回单聊模板，群聊由调用方选用 `group_chat`
    pub fn templates(&self, notification_type: NotificationType) -> MessageTemplates {
        match notification_type {
            NotificationType::Chat => self.direct_chat,
            NotificationType::Like => self.like,
            NotificationType::Match => self.match_formed,
            NotificationType::FriendRequest => self.friend_request,
            NotificationType::SocialingApplication => self.socialing_application,
            NotificationType::SocialingApproved => self.socialing_approved,
        }
    }
}

static KOREAN: Catalog = Catalog {
    language: Language::Korean,
    direct_chat: DIRECT_CHAT,
    group_chat: GROUP_CHAT,
    like: MessageTemplates {
        title: "새로운 좋아요 ❤️",
        body: "{{actor}}님이 회원님을 좋아합니다.",
    },
    match_formed: MessageTemplates {
        title: "매칭 성공! 🎉",
        body: "{{actor}}님과 서로 좋아요를 눌렀어요. 먼저 인사해 보세요!",
    },
    friend_request: MessageTemplates {
        title: "새 친구 요청",
        body: "{{actor}}님이 친구 요청을 보냈습니다.",
    },
    socialing_application: MessageTemplates {
        title: "새 참가 신청",
        body: "{{actor}}님이 「{{title}}」 모임에 참가를 신청했습니다.",
    },
    socialing_approved: MessageTemplates {
        title: "참가 승인",
        body: "「{{title}}」 모임 참가가 승인되었습니다!",
    },
    group_chat_label: "그룹 채팅",
    unknown_user: "알 수 없음",
};

static ENGLISH: Catalog = Catalog {
    language: Language::English,
    direct_chat: DIRECT_CHAT,
    group_chat: GROUP_CHAT,
    like: MessageTemplates {
        title: "New Like ❤️",
        body: "{{actor}} liked you.",
    },
    match_formed: MessageTemplates {
        title: "It's a Match! 🎉",
        body: "You and {{actor}} liked each other. Say hello!",
    },
    friend_request: MessageTemplates {
        title: "New Friend Request",
        body: "{{actor}} sent you a friend request.",
    },
    socialing_application: MessageTemplates {
        title: "New Application",
        body: "{{actor}} applied to join \"{{title}}\".",
    },
    socialing_approved: MessageTemplates {
        title: "Application Approved",
        body: "You're in! Your request to join \"{{title}}\" was approved.",
    },
    group_chat_label: "Group Chat",
    unknown_user: "Unknown",
};

static JAPANESE: Catalog = Catalog {
    language: Language::Japanese,
    direct_chat: DIRECT_CHAT,
    group_chat: GROUP_CHAT,
    like: MessageTemplates {
        title: "新しいいいね ❤️",
        body: "{{actor}}さんがあなたにいいねしました。",
    },
    match_formed: MessageTemplates {
        title: "マッチング成立！🎉",
        body: "{{actor}}さんとマッチしました。あいさつしてみましょう！",
    },
    friend_request: MessageTemplates {
        title: "新しい友達リクエスト",
        body: "{{actor}}さんから友達リクエストが届きました。",
    },
    socialing_application: MessageTemplates {
        title: "新しい参加申請",
        body: "{{actor}}さんが「{{title}}」に参加を申請しました。",
    },
    socialing_approved: MessageTemplates {
        title: "参加承認",
        body: "「{{title}}」への参加が承認されました！",
    },
    group_chat_label: "グループチャット",
    unknown_user: "不明",
};

/// 本地化文案表
///
/// 只持有默认语言，文案本身是静态数据。
#[derive(Debug, Clone, Copy)]
pub struct LocalizationTable {
    default_language: Language,
}

impl LocalizationTable {
    pub fn new(default_language: Language) -> Self {
        Self { default_language }
    }

    /// 按配置中的语言代码构建，代码无效时回退到韩语
    pub fn from_default_code(code: &str) -> Self {
        let language = Language::from_code(code).unwrap_or_else(|| {
            warn!(code, "默认语言不受支持，回退到 ko");
            Language::Korean
        });
        Self::new(language)
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// 解析接收者语言，缺失或不受支持时使用默认语言
    pub fn resolve(&self, code: Option<&str>) -> Language {
        code.and_then(Language::from_code)
            .unwrap_or(self.default_language)
    }

    /// 获取接收者语言对应的文案集
    pub fn catalog(&self, code: Option<&str>) -> &'static Catalog {
        catalog_for(self.resolve(code))
    }
}

impl Default for LocalizationTable {
    fn default() -> Self {
        Self::new(Language::Korean)
    }
}

pub fn catalog_for(language: Language) -> &'static Catalog {
    match language {
        Language::Korean => &KOREAN,
        Language::English => &ENGLISH,
        Language::Japanese => &JAPANESE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code_normalization() {
        assert_eq!(Language::from_code("en"), Some(Language::English));
        assert_eq!(Language::from_code("EN-us"), Some(Language::English));
        assert_eq!(Language::from_code("ko_KR"), Some(Language::Korean));
        assert_eq!(Language::from_code(" ja "), Some(Language::Japanese));
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(Language::from_code(""), None);
    }

    #[test]
    fn test_unsupported_language_falls_back_to_default() {
        let table = LocalizationTable::new(Language::English);
        assert_eq!(table.catalog(Some("de")).language, Language::English);
        assert_eq!(table.catalog(None).language, Language::English);
        assert_eq!(table.catalog(Some("ja-JP")).language, Language::Japanese);
    }

    #[test]
    fn test_invalid_default_code_uses_korean() {
        let table = LocalizationTable::from_default_code("xx");
        assert_eq!(table.default_language(), Language::Korean);
    }

    #[test]
    fn test_every_catalog_is_complete() {
        for language in Language::SUPPORTED {
            let catalog = catalog_for(language);
            assert_eq!(catalog.language, language);
            for notification_type in NotificationType::ALL {
                let templates = catalog.templates(notification_type);
                assert!(!templates.title.is_empty());
                assert!(!templates.body.is_empty());
            }
            assert_eq!(catalog.group_chat, GROUP_CHAT);
            assert!(!catalog.group_chat_label.is_empty());
            assert!(!catalog.unknown_user.is_empty());
        }
    }
}
