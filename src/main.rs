use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_api::{
    AppState,
    cache::RedisCache,
    config::Config,
    database::{PgUserStore, ensure_schema_with_retry},
    directory::UserDirectory,
    router::create_router,
};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .or_else(|_| std::env::var("LOG_LEVEL"))
                .unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置数据库连接池，连接在第一次使用时建立
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.store_timeout())
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'user_api';").await?;
                Ok(())
            })
        })
        .connect_lazy(&config.database_url)
        .expect("Invalid database URL");
    let store = Arc::new(PgUserStore::new(pool));

    // 启动前建表，数据库不可达时按配置重试
    ensure_schema_with_retry(
        store.as_ref(),
        config.schema_retry_attempts,
        config.schema_retry_delay(),
    )
    .await
    .expect("Failed to prepare database schema");

    // 设置 Redis 缓存，Redis 不可达时服务照常启动
    let cache = Arc::new(RedisCache::open(&config.redis_url()).expect("Invalid Redis URL"));

    let directory = UserDirectory::new(store, cache)
        .with_timeouts(config.store_timeout(), config.cache_timeout());
    let state = AppState::new(directory, config.clone());

    let app = create_router(state);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("API running on http://{}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .await
    .expect("Failed to start server");
}
