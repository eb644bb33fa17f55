//! GAM API Gateway
//!
//! 资产管理平台的 HTTP 入口：动态角色授权引擎在这里拦截
//! 每个受保护路由，业务处理则转发给各业务服务。

mod admin;
mod authn;
mod error;
mod middleware;
mod routing;
mod state;

use axum::{Router, routing::get};
use gam_adapter_postgres::{PostgresConfig, PostgresPolicyRepository, create_pool, ensure_schema};
use gam_authz_core::{DecisionEngine, PolicyStore, RoleSelection};
use gam_config::{AppConfig, RoleSelectionConfig};
use gam_telemetry::{init_metrics, init_tracing, init_tracing_json};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use state::AppState;

fn role_selection(config: RoleSelectionConfig) -> RoleSelection {
    match config {
        RoleSelectionConfig::First => RoleSelection::First,
        RoleSelectionConfig::MostPermissive => RoleSelection::MostPermissive,
        RoleSelectionConfig::AllMustAgree => RoleSelection::AllMustAgree,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // 加载配置
    let config = AppConfig::load("gateway/config")?;

    // 初始化 tracing
    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    // 初始化 Prometheus metrics
    let metrics_handle = init_metrics();

    // 初始化数据库
    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections);
    let pool = create_pool(&pg_config).await?;
    ensure_schema(&pool).await?;

    // 组装授权引擎：仓储 → 策略门面 → 决策引擎
    let repo = Arc::new(PostgresPolicyRepository::new(pool));
    let engine = DecisionEngine::new(
        PolicyStore::new(repo.clone()),
        role_selection(config.authz.role_selection),
    );
    info!(
        role_selection = ?config.authz.role_selection,
        "Authorization engine initialized"
    );

    let state = AppState {
        engine,
        policies: repo,
    };

    // 受保护路由在这里注册；非法的 (模块, 操作) 组合会让启动直接失败
    let app: Router = routing::app_router(state)?
        .route(
            "/metrics",
            get(move || {
                let handle = metrics_handle.clone();
                async move { handle.render() }
            }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Starting gateway");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
