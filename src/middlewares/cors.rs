use actix_cors::Cors;

use crate::config::CorsConfig;

/// 按配置的来源白名单放行跨域请求
pub fn create_cors(config: &CorsConfig) -> Cors {
    let cors = config
        .allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin));

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        // 客户端需要携带凭据
        .supports_credentials()
        .max_age(3600)
}
