use anyhow::Result;
use axum::Router;
use dailydrop_orderservice::core::{
    bootstrap::{self, bootstrap},
    config, db, swagger,
};
use dailydrop_orderservice::routes;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;
    let state = bootstrap::build_state(&config).await?;

    let routes = routes::coupons::routes_with_openapi()
        .merge(routes::customers::addresses::routes_with_openapi(
            state.clone(),
        ))
        .merge(routes::customers::orders::routes_with_openapi(state.clone()))
        .merge(routes::admin::orders::routes_with_openapi(state.clone()));

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("DailyDrop OrderService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    let app = Router::new().merge(routes).merge(swagger_ui);

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    bootstrap("OrderService", &config, app, state).await?;
    Ok(())
}
