//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 文档存储配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 存储后端：firestore 或 memory
    pub backend: String,
    pub project_id: String,
    pub database_id: String,
    /// Firestore REST 根地址，测试或模拟器场景可覆盖
    pub base_url: String,
    /// 预先签发的 OAuth 访问令牌；为空时不带 Authorization 头（模拟器）
    pub access_token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "firestore".to_string(),
            project_id: String::new(),
            database_id: "(default)".to_string(),
            base_url: "https://firestore.googleapis.com".to_string(),
            access_token: None,
            timeout_ms: 5000,
        }
    }
}

/// 推送服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// 推送渠道：fcm 或 log（仅记录日志的演练模式）
    pub provider: String,
    pub project_id: String,
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            provider: "fcm".to_string(),
            project_id: String::new(),
            base_url: "https://fcm.googleapis.com".to_string(),
            access_token: None,
            timeout_ms: 5000,
        }
    }
}

/// 本地化配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    /// 接收者语言缺失或不受支持时使用的语言
    pub default_language: String,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            default_language: "ko".to_string(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub push: PushConfig,
    pub localization: LocalizationConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（NOTIFY_ 前缀，双下划线分隔层级，如 NOTIFY_PUSH__ACCESS_TOKEN -> push.access_token）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("NOTIFY_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("NOTIFY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.database_id, "(default)");
        assert_eq!(config.push.provider, "fcm");
        assert_eq!(config.localization.default_language, "ko");
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            ..Default::default()
        };
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        // SAFETY: 测试中指向不存在的目录，仅影响本进程的配置查找
        unsafe {
            std::env::set_var("CONFIG_DIR", "/nonexistent-notify-config");
        }

        let config = AppConfig::load("notification-worker").expect("加载默认配置失败");
        assert_eq!(config.service_name, "notification-worker");
        assert_eq!(config.push.base_url, "https://fcm.googleapis.com");
        assert_eq!(config.environment, "development");

        unsafe {
            std::env::remove_var("CONFIG_DIR");
        }
    }
}
