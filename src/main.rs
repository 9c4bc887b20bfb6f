use actix_web::{App, HttpServer, middleware::Logger};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use paperworth_backend::{
    app::AppServices,
    cache::CacheLayer,
    config::Config,
    database::open_repositories,
    external::{FirebaseVerifier, GoogleVisionClient, IdentityVerifier, OcrProvider},
    middlewares::{AuthMiddleware, create_cors},
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");
    let timeout = config.server.request_timeout();

    // 存储：Postgres（含迁移）或进程内
    let repos = open_repositories(&config.database, timeout)
        .await
        .expect("Failed to open storage");

    // 缓存：Redis 或进程内
    let cache = CacheLayer::connect(&config.cache, timeout)
        .await
        .expect("Failed to connect to cache");

    // 外部服务
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(
        FirebaseVerifier::from_config(&config.firebase, timeout)
            .expect("Failed to configure Firebase token verification"),
    );
    let ocr_provider: Arc<dyn OcrProvider> = Arc::new(
        GoogleVisionClient::from_config(&config.google, timeout)
            .expect("Failed to configure Google Vision client"),
    );

    let services = AppServices::new(
        &repos,
        cache,
        verifier.clone(),
        ocr_provider,
        config.rewards.clone(),
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let cors_config = config.cors.clone();
    let admin_config = config.admin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(verifier.clone(), admin_config.clone()))
            .wrap(create_cors(&cors_config))
            .wrap(Logger::default())
            .configure(swagger_config)
            .configure(|cfg| services.configure(cfg))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
