#[macro_use]
extern crate rocket;

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod request_logger;
pub mod routes;

use crate::config::ImportConfig;
use crate::credentials::{
    CredentialBackend, MemoryCredentialStore, PgCredentialStore, SharedCredentialStore,
};
use crate::db::ContentDb;
use crate::import::{ImportService, PgContentStore};
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket, Route};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_db_pools::sqlx::PgPool;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Every API route, with its OpenAPI document at `openapi.json`.
pub fn api_routes() -> Vec<Route> {
    openapi_get_routes![
        // Health routes
        routes::health::health_check,
        // Import routes
        routes::imports::import_quizzes,
        routes::imports::import_flashcards,
        routes::imports::preview_import,
        // Content routes
        routes::quizzes::get_quiz,
        routes::quizzes::delete_quiz,
        routes::flashcards::get_flashcard_set,
        routes::flashcards::delete_flashcard_set,
        // Tutor routes
        routes::credentials::put_credential,
        routes::credentials::get_credential,
        routes::credentials::delete_credential,
    ]
}

/// Build the import service and credential store on top of `pool`.
pub fn import_state(
    pool: PgPool,
    config: ImportConfig,
) -> (ImportService<PgContentStore>, SharedCredentialStore) {
    let credentials: SharedCredentialStore = match config.credential_backend {
        CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        CredentialBackend::Postgres => Arc::new(PgCredentialStore::new(pool.clone())),
    };
    let store = PgContentStore::new(pool, config.budget());
    (ImportService::new(store, config), credentials)
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Put, Method::Delete]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(ContentDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match ContentDb::fetch(&rocket) {
                    Some(db) => match crate::db::run_migrations(db).await {
                        Ok(_) => Ok(rocket),
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    },
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ))
        .attach(AdHoc::try_on_ignite(
            "Import Services",
            |rocket| async move {
                match ContentDb::fetch(&rocket) {
                    Some(db) => {
                        let pool = (**db).clone();
                        let config = ImportConfig::from_env();
                        log::info!(
                            "import config: quiz chunks of {}, flashcard chunks of {}, {:?} atomicity, {:?} credentials",
                            config.quiz_chunk_size,
                            config.flashcard_chunk_size,
                            config.atomicity,
                            config.credential_backend
                        );

                        let (service, credentials) = import_state(pool.clone(), config);
                        Ok(rocket.manage(pool).manage(service).manage(credentials))
                    }
                    None => Err(rocket),
                }
            },
        ))
        .mount("/api/v1", api_routes())
        .register("/", routes::catchers::all())
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Content Import API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::config::ImportConfig;
    use crate::db::ContentDb;
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use rocket_db_pools::Database;
    use rocket_db_pools::sqlx::{self, PgPool};

    pub use database::{TestDatabase, TestDatabaseError};

    /// Row counts used to assert what an import left behind.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Count rows in one of the content tables.
        pub async fn count(&self, table: &str) -> Result<i64, sqlx::Error> {
            let sql = format!("SELECT COUNT(*) FROM {}", table);
            sqlx::query_scalar(&sql).fetch_one(self.pool).await
        }

        /// Counts for quizzes, questions and options, in that order.
        pub async fn quiz_counts(&self) -> Result<(i64, i64, i64), sqlx::Error> {
            Ok((
                self.count("quizzes").await?,
                self.count("questions").await?,
                self.count("question_options").await?,
            ))
        }

        /// Counts for flashcard sets and cards.
        pub async fn flashcard_counts(&self) -> Result<(i64, i64), sqlx::Error> {
            Ok((
                self.count("flashcard_sets").await?,
                self.count("flashcard_items").await?,
            ))
        }
    }

    pub mod database {
        use log::LevelFilter;
        use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
        use testcontainers_modules::postgres::Postgres;
        use testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("TEST_DATABASE_URL not set")]
            MissingUrl,
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            connect_url: String,
            database_name: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Provision a fresh database from `TEST_DATABASE_URL`, or from a
            /// disposable Postgres container when `TEST_DATABASE_CONTAINER=1`.
            /// Returns [`TestDatabaseError::MissingUrl`] when neither is set so
            /// callers can skip.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
                    return Self::with_base_url(&url, None).await;
                }

                if std::env::var("TEST_DATABASE_CONTAINER").as_deref() == Ok("1") {
                    let container = Postgres::default().start().await?;
                    let host = container.get_host().await?.to_string();
                    let port = container.get_host_port_ipv4(5432).await?;
                    let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
                    return Self::with_base_url(&url, Some(container)).await;
                }

                Err(TestDatabaseError::MissingUrl)
            }

            async fn with_base_url(
                base_url: &str,
                container: Option<ContainerAsync<Postgres>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options: PgConnectOptions = base_url.parse()?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let admin_options = base_options.clone().database("postgres");
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await?;

                let database_name = format!("content_test_{}", Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", database_name);
                sqlx::query(&create_sql).execute(&admin_pool).await?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.clone().database(&database_name))
                    .await?;

                MIGRATOR.run(&pool).await?;

                let connect_url = replace_database(base_url, &database_name);

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    connect_url,
                    database_name,
                    container,
                })
            }

            /// Cloneable connection pool for use in tests and Rocket state.
            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Connection URL of the ephemeral database, for Rocket's figment.
            pub fn url(&self) -> &str {
                &self.connect_url
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database_with_fallback(self.admin_options.clone(), &self.database_name)
                    .await?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        /// Swap the database path segment of a Postgres URL, keeping any query.
        fn replace_database(base_url: &str, database: &str) -> String {
            let (without_query, query) = match base_url.split_once('?') {
                Some((head, query)) => (head, Some(query)),
                None => (base_url, None),
            };
            let authority_end = without_query
                .find("://")
                .map(|scheme| scheme + 3)
                .and_then(|start| without_query[start..].find('/').map(|slash| start + slash))
                .unwrap_or(without_query.len());

            let mut url = format!("{}/{}", &without_query[..authority_end], database);
            if let Some(query) = query {
                url.push('?');
                url.push_str(query);
            }
            url
        }

        async fn drop_database_with_fallback(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_force = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", database_name);
            match sqlx::query(&drop_force).execute(&admin_pool).await {
                Ok(_) => Ok(()),
                Err(err) if force_drop_unsupported(&err) => {
                    let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\"", database_name);
                    sqlx::query(&drop_sql).execute(&admin_pool).await?;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn force_drop_unsupported(err: &sqlx::Error) -> bool {
            matches!(
                err,
                sqlx::Error::Database(db_err)
                    if db_err
                        .code()
                        .map(|code| code == "42601" || code == "0A000")
                        .unwrap_or(false)
            )
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ = drop_database_with_fallback(admin_options, &db_name).await;
                        });
                    } else {
                        std::thread::spawn(move || {
                            if let Ok(rt) = tokio::runtime::Runtime::new() {
                                rt.block_on(async move {
                                    pool.close().await;
                                    let _ =
                                        drop_database_with_fallback(admin_options, &db_name).await;
                                });
                            }
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }

        #[cfg(test)]
        mod tests {
            use super::replace_database;

            #[test]
            fn database_segment_is_replaced() {
                assert_eq!(
                    replace_database("postgres://u:p@localhost:5432/postgres", "t1"),
                    "postgres://u:p@localhost:5432/t1"
                );
                assert_eq!(
                    replace_database("postgres://localhost/app?sslmode=disable", "t2"),
                    "postgres://localhost/t2?sslmode=disable"
                );
                assert_eq!(replace_database("postgres://localhost", "t3"), "postgres://localhost/t3");
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
        import_config: Option<ImportConfig>,
        attach_db: bool,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging disabled.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                ..Default::default()
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Point the `content_db` pool at `url` so `Connection<ContentDb>` guards work.
        pub fn with_database_url(mut self, url: &str) -> Self {
            self.figment = self
                .figment
                .merge(("databases.content_db.url", url))
                .merge(("databases.content_db.max_connections", 5));
            self.attach_db = true;
            self
        }

        /// Manage a `PgPool` plus the import service and credential store built on it.
        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        /// Override the import configuration; defaults apply otherwise.
        pub fn import_config(mut self, config: ImportConfig) -> Self {
            self.import_config = Some(config);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket =
                rocket::custom(self.figment).register("/", crate::routes::catchers::all());

            if self.attach_db {
                rocket = rocket.attach(ContentDb::init());
            }

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                let config = self.import_config.unwrap_or_default();
                let (service, credentials) = crate::import_state(pool.clone(), config);
                rocket = rocket.manage(pool).manage(service).manage(credentials);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
