//! 推送通知触发服务
//!
//! 接收 Firestore 文档变更，识别点赞、匹配、好友请求、聊天消息和聚会申请等事件，
//! 按接收者语言渲染文案并通过 FCM 推送。单个接收者失败不影响其他接收者。

pub mod classifier;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod locale;
pub mod resolver;
pub mod sender;
pub mod server;
pub mod templates;

pub use handler::{HandleReport, NotificationHandler};
