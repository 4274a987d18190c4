use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 默认日志级别（`RUST_LOG` 存在时以环境变量为准）
    pub level: String,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀（卡片接口同时挂载在根路径与该前缀下）
    pub prefix: String,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default)]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            max_age_secs: None,
        }
    }
}

/// GitHub 上游配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GraphQL 端点
    #[serde(default = "GitHubConfig::default_graphql_url")]
    pub graphql_url: String,
    /// 访问令牌（可通过 `APP_GITHUB__TOKEN` 注入）
    #[serde(default)]
    pub token: Option<String>,
    /// 请求 User-Agent（GitHub 要求必须携带）
    #[serde(default = "GitHubConfig::default_user_agent")]
    pub user_agent: String,
    /// 请求超时（秒）
    #[serde(default = "GitHubConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 统计数据缓存 TTL（秒）
    #[serde(default = "GitHubConfig::default_stats_ttl")]
    pub stats_cache_ttl_secs: u64,
}

impl GitHubConfig {
    fn default_graphql_url() -> String {
        "https://api.github.com/graphql".to_string()
    }
    fn default_user_agent() -> String {
        format!("profile-card/{}", env!("CARGO_PKG_VERSION"))
    }
    fn default_timeout() -> u64 {
        15
    }
    fn default_stats_ttl() -> u64 {
        12 * 60 * 60
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn stats_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_cache_ttl_secs)
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            graphql_url: Self::default_graphql_url(),
            token: None,
            user_agent: Self::default_user_agent(),
            timeout_secs: Self::default_timeout(),
            stats_cache_ttl_secs: Self::default_stats_ttl(),
        }
    }
}

/// 卡片渲染与缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    /// 画布宽度
    #[serde(default = "CardConfig::default_width")]
    pub width: u32,
    /// 画布高度
    #[serde(default = "CardConfig::default_height")]
    pub height: u32,
    /// 卡片缓存 TTL（秒），同时作为响应的 `Cache-Control: max-age`
    #[serde(default = "CardConfig::default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// 缓存最大容量（字节），按条目字节大小加权
    #[serde(default = "CardConfig::default_cache_max_bytes")]
    pub cache_max_bytes: u64,
    /// 是否优先速度渲染（OptimizeSpeed），可能略降画质
    #[serde(default)]
    pub optimize_speed: bool,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
}

impl CardConfig {
    fn default_width() -> u32 {
        1200
    }
    fn default_height() -> u32 {
        800
    }
    fn default_cache_ttl() -> u64 {
        24 * 60 * 60
    }
    fn default_cache_max_bytes() -> u64 {
        256 * 1024 * 1024
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// 实际使用的渲染并发数
    pub fn render_permits(&self) -> usize {
        match self.max_parallel {
            0 => num_cpus::get(),
            m => m as usize,
        }
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            cache_ttl_secs: Self::default_cache_ttl(),
            cache_max_bytes: Self::default_cache_max_bytes(),
            optimize_speed: false,
            max_parallel: 0,
        }
    }
}

/// 单个字体文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontFileConfig {
    /// 相对于字体目录的文件名
    pub file: String,
    /// 字重
    pub weight: u16,
}

/// 字体配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontsConfig {
    /// 字体目录
    #[serde(default = "FontsConfig::default_dir")]
    pub dir: String,
    /// 字体族名（写入 SVG 的 font-family）
    #[serde(default = "FontsConfig::default_family")]
    pub family: String,
    /// 需要加载的字体文件
    #[serde(default = "FontsConfig::default_files")]
    pub files: Vec<FontFileConfig>,
}

impl FontsConfig {
    fn default_dir() -> String {
        "./public/fonts".to_string()
    }
    fn default_family() -> String {
        "BookkMyungjo".to_string()
    }
    fn default_files() -> Vec<FontFileConfig> {
        vec![
            FontFileConfig {
                file: "BookkMyungjo_Light.ttf".to_string(),
                weight: 300,
            },
            FontFileConfig {
                file: "BookkMyungjo_Bold.ttf".to_string(),
                weight: 700,
            },
        ]
    }

    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            family: Self::default_family(),
            files: Self::default_files(),
        }
    }
}

/// 远程图片（头像/背景）优化配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// 输出图片最长边（像素）
    #[serde(default = "ImagesConfig::default_max_dimension")]
    pub max_dimension: u32,
    /// 下载体积上限（字节）
    #[serde(default = "ImagesConfig::default_max_bytes")]
    pub max_download_bytes: usize,
    /// 下载超时（秒）
    #[serde(default = "ImagesConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ImagesConfig {
    fn default_max_dimension() -> u32 {
        1200
    }
    fn default_max_bytes() -> usize {
        8 * 1024 * 1024
    }
    fn default_timeout() -> u64 {
        10
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_dimension: Self::default_max_dimension(),
            max_download_bytes: Self::default_max_bytes(),
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub card: CardConfig,
    #[serde(default)]
    pub fonts: FontsConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 加载配置：内置默认值 → `config.toml`（可选）→ 环境变量覆盖
    ///
    /// 环境变量示例：`APP_GITHUB__TOKEN`、`APP_SERVER__PORT`。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(ConfigBuilder::try_from(&AppConfig::default())?)
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;

        tracing::debug!(
            "配置加载完成: github.token = {}",
            if config.github.token.is_some() {
                "已设置"
            } else {
                "未设置"
            }
        );

        Ok(config)
    }

    /// 获取配置文件路径（可通过 `APP_CONFIG` 指定）
    fn get_config_path() -> PathBuf {
        std::env::var("APP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            api: ApiConfig {
                prefix: "/api".to_string(),
            },
            cors: CorsConfig::default(),
            github: GitHubConfig::default(),
            card: CardConfig::default(),
            fonts: FontsConfig::default(),
            images: ImagesConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, CardConfig};

    #[test]
    fn defaults_match_card_contract() {
        let cfg = AppConfig::default();
        assert_eq!((cfg.card.width, cfg.card.height), (1200, 800));
        assert_eq!(cfg.card.cache_ttl_secs, 86_400);
        assert_eq!(cfg.github.stats_cache_ttl_secs, 43_200);
        assert_eq!(cfg.fonts.files.len(), 2);
    }

    #[test]
    fn render_permits_zero_means_cpu_count() {
        let auto = CardConfig::default();
        assert!(auto.render_permits() >= 1);

        let fixed = CardConfig {
            max_parallel: 3,
            ..CardConfig::default()
        };
        assert_eq!(fixed.render_permits(), 3);
    }
}
