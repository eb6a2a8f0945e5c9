use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};
use std::sync::Arc;

use daovote::auth::IdentityResolver;
use daovote::auth::provider::HttpAuthProvider;
use daovote::config::{AppConfig, MIN_SESSION_KEY_LEN};
use daovote::lifecycle::Lifecycle;
use daovote::store::{MemoryStore, PgStore, Store};
use daovote::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let memory_store = std::env::args().nth(1).as_deref() == Some("--memory");
    let config = AppConfig::from_env(memory_store).unwrap_or_else(|e| {
        log::error!("Invalid configuration: {e}");
        std::process::exit(1);
    });

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) if !config.memory_store => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("Failed to create DB pool");
            db::run_migrations(&pool)
                .await
                .expect("Failed to run migrations");
            Arc::new(PgStore::new(pool))
        }
        _ => {
            log::warn!("Using in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    let provider = Arc::new(HttpAuthProvider::new(&config.auth_url, &config.auth_api_key));
    let lifecycle = web::Data::new(Lifecycle::new(store.clone()));
    let resolver = web::Data::new(IdentityResolver::new(provider, store));

    // Session encryption key: load from SESSION_KEY for persistent sessions across restarts
    let secret_key = match &config.session_key {
        Some(val) if val.len() >= MIN_SESSION_KEY_LEN => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!(
                "SESSION_KEY too short ({} bytes, need {}+), generating random key",
                val.len(),
                MIN_SESSION_KEY_LEN
            );
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let cookie_secure = config.cookie_secure;
    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(lifecycle.clone())
            .app_data(resolver.clone())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
