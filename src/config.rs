use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 每个请求对外调用的截止时间（秒）
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory://` 使用进程内存储，其余视为 Postgres 连接串
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 为空时使用进程内缓存
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// 服务账号凭据：文件路径 / JSON 文本 / base64 编码的 JSON
    #[serde(default)]
    pub vision_credentials: Option<String>,
    #[serde(default)]
    pub vision_api_key: Option<String>,
    #[serde(default = "default_vision_endpoint")]
    pub vision_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FirebaseConfig {
    #[serde(default)]
    pub credentials: Option<String>,
    /// 未配置时从凭据的 project_id 推断
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub emails: Vec<String>,
}

/// 积分规则，调用方无需感知具体数值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_points_per_dollar")]
    pub points_per_dollar: f64,
    #[serde(default)]
    pub base_points_per_receipt: i64,
    #[serde(default = "default_welcome_bonus")]
    pub welcome_bonus_points: i64,
    #[serde(default = "default_voucher_validity")]
    pub voucher_validity_months: u32,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_vision_endpoint() -> String {
    "https://vision.googleapis.com/v1/images:annotate".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    [
        "https://paperworth.vercel.app",
        "https://magnificent-reverence-production.up.railway.app",
        "https://paperworth.sgp1.digitaloceanspaces.com",
        "http://localhost:4200",
        "http://localhost:8080",
        "http://localhost",
        "capacitor://localhost",
        "capacitor://paperworth.app",
        "capacitor://firebaseauth",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_points_per_dollar() -> f64 {
    1.0
}

fn default_welcome_bonus() -> i64 {
    100
}

fn default_voucher_validity() -> u32 {
    6
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            vision_credentials: None,
            vision_api_key: None,
            vision_endpoint: default_vision_endpoint(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            points_per_dollar: default_points_per_dollar(),
            base_points_per_receipt: 0,
            welcome_bonus_points: default_welcome_bonus(),
            voucher_validity_months: default_voucher_validity(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

impl AdminConfig {
    pub fn is_admin(&self, email: &str) -> bool {
        self.emails.iter().any(|e| e.eq_ignore_ascii_case(email))
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env_defaults()?,
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    fn from_env_defaults() -> Result<Self, Box<dyn std::error::Error>> {
        // 数据库 URL 在无配置文件时必须提供
        let database_url = get_env("DATABASE_URL")
            .ok_or("DATABASE_URL is not set and no config.toml was found")?;

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
                request_timeout_secs: get_env_parse(
                    "REQUEST_TIMEOUT_SECS",
                    default_request_timeout(),
                ),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            cache: CacheConfig::default(),
            google: GoogleConfig::default(),
            firebase: FirebaseConfig::default(),
            cors: CorsConfig::default(),
            admin: AdminConfig::default(),
            rewards: RewardsConfig::default(),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get_env("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = get_env("REQUEST_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            self.server.request_timeout_secs = n;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get_env("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }

        // 缓存
        if let Some(v) = get_env("REDIS_URL") {
            self.cache.url = v;
        }
        if let Some(v) = get_env("REDIS_USERNAME") {
            self.cache.username = Some(v);
        }
        if let Some(v) = get_env("REDIS_PASSWORD") {
            self.cache.password = Some(v);
        }
        if let Some(v) = get_env("CACHE_TTL_SECS")
            && let Ok(n) = v.parse()
        {
            self.cache.ttl_secs = n;
        }

        // Google Vision
        if let Some(v) = get_env("GOOGLE_APPLICATION_CREDENTIALS") {
            self.google.vision_credentials = Some(v);
        }
        if let Some(v) = get_env("GOOGLE_CREDENTIALS_BASE64") {
            self.google.vision_credentials = Some(v);
        }
        if let Some(v) = get_env("GOOGLE_VISION_API_KEY") {
            self.google.vision_api_key = Some(v);
        }
        if let Some(v) = get_env("GOOGLE_VISION_ENDPOINT") {
            self.google.vision_endpoint = v;
        }

        // Firebase
        if let Some(v) = get_env("FIREBASE_CREDENTIALS") {
            self.firebase.credentials = Some(v);
        }
        if let Some(v) = get_env("FIREBASE_PROJECT_ID") {
            self.firebase.project_id = Some(v);
        }

        if let Some(v) = get_env("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = split_list(&v);
        }
        if let Some(v) = get_env("ADMIN_EMAILS") {
            self.admin.emails = split_list(&v);
        }

        // 积分规则
        if let Some(v) = get_env("POINTS_PER_DOLLAR")
            && let Ok(n) = v.parse()
        {
            self.rewards.points_per_dollar = n;
        }
        if let Some(v) = get_env("BASE_POINTS_PER_RECEIPT")
            && let Ok(n) = v.parse()
        {
            self.rewards.base_points_per_receipt = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_toml_fills_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "memory://"
            max_connections = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.server.request_timeout_secs, 30);
        assert!(config.database.is_memory());
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(config.cache.url.is_empty());
        assert_eq!(config.rewards.points_per_dollar, 1.0);
        assert_eq!(config.rewards.base_points_per_receipt, 0);
        assert_eq!(config.rewards.welcome_bonus_points, 100);
        assert!(
            config
                .cors
                .allowed_origins
                .contains(&"capacitor://localhost".to_string())
        );
    }

    #[test]
    fn test_parse_full_sections() {
        let config = Config::parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 5

            [database]
            url = "postgres://localhost/paperworth"
            max_connections = 10

            [cache]
            url = "redis://localhost:6379"
            username = "default"
            password = "secret"
            ttl_secs = 60

            [admin]
            emails = ["Admin@PaperWorth.app"]

            [rewards]
            points_per_dollar = 2.0
            base_points_per_receipt = 5
            "#,
        )
        .unwrap();

        assert!(!config.database.is_memory());
        assert_eq!(config.cache.password.as_deref(), Some("secret"));
        assert_eq!(config.server.request_timeout().as_secs(), 5);
        assert!(config.admin.is_admin("admin@paperworth.app"));
        assert!(!config.admin.is_admin("someone@else.com"));
        assert_eq!(config.rewards.base_points_per_receipt, 5);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("a@x.com, b@y.com,,"),
            vec!["a@x.com".to_string(), "b@y.com".to_string()]
        );
    }
}
