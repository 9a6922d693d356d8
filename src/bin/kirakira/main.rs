use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use env_logger::Env;
use kirakira::app_config;
use kirakira::block::{BlockListStore, VisibilityFilterBuilder};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_lib_mods();

    let config = app_config::get_config();

    let db = kirakira::db::connect(&config.database).await?;
    let store = Data::new(BlockListStore::with_database_identity(
        db.clone(),
        config.block.clone(),
    ));
    let filters = Data::new(VisibilityFilterBuilder::with_database_identity(db.clone()));

    let bind = (config.server.host.clone(), config.server.port);
    log::info!("Listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        // Middleware is applied in reverse order.
        App::new()
            .app_data(store.clone())
            .app_data(filters.clone())
            .wrap(Logger::new("%a %r %s %Dms"))
            .configure(kirakira::web::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}

/// Initialize third party crates we rely on but don't have control over.
fn init_lib_mods() {
    // A missing .env is fine; the environment may already be set.
    if let Err(e) = dotenv::dotenv() {
        eprintln!("No .env loaded: {}", e);
    }
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
