use std::ops::Deref;

use derive_new::new;
use serde::Deserialize;
use snafu::{Location, ResultExt, Snafu};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth;
use surrealdb::Surreal;

/// Macros for defining table methods.
pub mod macros;

/// Helper for executing arbitrary SurrealQL queries.
mod query;

mod record;

pub use query::Bindings;
pub use record::{Record, Table};
pub use surrealdb::sql::Thing;

const SETUP: &str = include_str!("../schema.surrealql");

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatabaseError {
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    Connect {
        url: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot sign in as `{username}` at {location}: {source}"))]
    Signin {
        username: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot select `{namespace}/{database}` at {location}: {source}"))]
    SelectNamespace {
        namespace: String,
        database: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to apply the schema at {location}: {source}"))]
    Setup {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatabaseQueryError {
    #[snafu(display("failed to query the database at {location}: {source}"))]
    MalformedQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    Deserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: String,
    #[serde(rename = "surreal_ns")]
    pub namespace: String,
    #[serde(rename = "surreal_db")]
    pub database: String,
    #[serde(flatten)]
    pub credentials: Option<DatabaseCredentials>,
}

impl DatabaseConfig {
    /// An in-memory database, handy for local runs and tests.
    pub fn memory() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: "dripcourse".to_string(),
            database: "dripcourse".to_string(),
            credentials: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseCredentials {
    #[serde(rename = "surreal_user")]
    username: String,
    #[serde(rename = "surreal_pass")]
    password: String,
}

/// A cheap-to-clone handle to the SurrealDB connection.
#[derive(Debug, Clone, new)]
pub struct Database {
    inner: Surreal<Any>,
}

impl Database {
    /// Connect, sign in when credentials are configured, and apply `schema.surrealql`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let inner = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .context(ConnectSnafu {
                url: config.url.clone(),
            })?;

        if let Some(credentials) = &config.credentials {
            inner
                .signin(auth::Database {
                    namespace: &config.namespace,
                    database: &config.database,
                    username: &credentials.username,
                    password: &credentials.password,
                })
                .await
                .context(SigninSnafu {
                    username: credentials.username.clone(),
                })?;
        }

        inner
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .context(SelectNamespaceSnafu {
                namespace: config.namespace.clone(),
                database: config.database.clone(),
            })?;

        inner
            .query(SETUP)
            .await
            .and_then(|response| response.check())
            .context(SetupSnafu)?;

        tracing::info!(url = %config.url, namespace = %config.namespace, database = %config.database, "connected to the database");

        Ok(Self { inner })
    }

    /// Create a builder to execute arbitrary SQL code on the database.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let modules: Vec<Module> = db
    ///     .sql("SELECT * FROM modules WHERE course = $course ORDER BY position ASC")
    ///     .bind(("course", course_id))
    ///     .fetch_first()
    ///     .await?;
    /// ```
    pub fn sql(&self, query: &str) -> Bindings<'_> {
        Bindings::new(self.inner.query(query))
    }
}

impl Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
