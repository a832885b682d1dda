//! 共享库
//!
//! 包含通知服务共用的配置、错误处理、可观测性、实体模型、文档解码与存储访问等基础设施代码。

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod models;
pub mod observability;
pub mod store;
pub mod test_utils;
