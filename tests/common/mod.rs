//! Shared test infrastructure.
//!
//! - `TestEnv::new()` - in-memory store, lifecycle managers and an identity
//!   resolver backed by a fixed token table (alice, bob, carol, dave).
//! - `test_app!(env)` - an initialised actix service with the full route table.
//! - `setup_test_db()` - PostgreSQL store in a fresh schema, or `None` when
//!   `TEST_DATABASE_URL` is unset.
#![allow(dead_code)]

use actix_web::web;
use std::sync::Arc;
use uuid::Uuid;

use daovote::auth::identity::{Identity, IdentityResolver};
use daovote::auth::provider::{ProviderUser, StaticAuthProvider};
use daovote::lifecycle::Lifecycle;
use daovote::store::{MemoryStore, Store};

// ============================================================================
// TEST USERS
// ============================================================================

pub const ALICE: (&str, &str) = ("token-alice", "a11ce000-0000-4000-8000-000000000001");
pub const BOB: (&str, &str) = ("token-bob", "b0b00000-0000-4000-8000-000000000002");
pub const CAROL: (&str, &str) = ("token-carol", "ca201000-0000-4000-8000-000000000003");
pub const DAVE: (&str, &str) = ("token-dave", "da7e0000-0000-4000-8000-000000000004");

pub const VALID_DESCRIPTION: &str = "Detailed rationale here";

pub fn user_id(user: (&str, &str)) -> Uuid {
    Uuid::parse_str(user.1).expect("test user id")
}

pub fn bearer(user: (&str, &str)) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", user.0))
}

fn provider_user(user: (&str, &str), name: &str) -> ProviderUser {
    ProviderUser {
        id: user_id(user),
        email: Some(format!("{name}@test.com")),
        username: Some(name.to_string()),
    }
}

pub fn test_provider() -> StaticAuthProvider {
    StaticAuthProvider::new()
        .with_user(ALICE.0, provider_user(ALICE, "alice"))
        .with_user(BOB.0, provider_user(BOB, "bob"))
        .with_user(CAROL.0, provider_user(CAROL, "carol"))
        .with_user(DAVE.0, provider_user(DAVE, "dave"))
}

// ============================================================================
// ENVIRONMENT
// ============================================================================

pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub lifecycle: web::Data<Lifecycle>,
    pub resolver: web::Data<IdentityResolver>,
}

impl TestEnv {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let lifecycle = web::Data::new(Lifecycle::new(store.clone()));
        let resolver = web::Data::new(IdentityResolver::new(Arc::new(test_provider()), store.clone()));
        TestEnv { store, lifecycle, resolver }
    }

    /// Register a user row and return the identity managers expect.
    pub async fn register(&self, user: (&str, &str), name: &str) -> Identity {
        register(self.store.as_ref(), user_id(user), name).await
    }
}

pub async fn register(store: &dyn Store, id: Uuid, name: &str) -> Identity {
    let email = format!("{name}@test.com");
    store
        .ensure_user(id, Some(email.as_str()), Some(name))
        .await
        .expect("register test user");
    Identity { id, email: Some(email), username: Some(name.to_string()) }
}

#[macro_export]
macro_rules! test_app {
    ($env:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::from(&[7u8; 64][..]),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data($env.lifecycle.clone())
                .app_data($env.resolver.clone())
                .configure(daovote::handlers::configure),
        )
        .await
    };
}

// ============================================================================
// POSTGRES
// ============================================================================

pub struct TestDb {
    pool: sqlx::PgPool,
}

impl TestDb {
    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

/// Connect to `TEST_DATABASE_URL` with a throwaway schema on the search path
/// and run migrations. Returns `None` (test skipped) when the variable is unset.
pub async fn setup_test_db() -> Option<TestDb> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL test");
            return None;
        }
    };

    let schema = format!("test_{}", Uuid::new_v4().simple());
    let admin = sqlx::PgPool::connect(&url).await.expect("connect to test database");
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(&admin)
        .await
        .expect("create test schema");
    admin.close().await;

    let search_path = schema.clone();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .after_connect(move |conn, _meta| {
            let stmt = format!("SET search_path TO {search_path}, public");
            Box::pin(async move {
                sqlx::query(&stmt).execute(conn).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .expect("connect with test schema");

    daovote::db::run_migrations(&pool).await.expect("run migrations");
    Some(TestDb { pool })
}
