use derive_new::new;
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use surrealdb::engine::any::Any;
use surrealdb::opt::QueryResult;

use super::{DatabaseQueryError, DeserializeSnafu, MalformedQuerySnafu};

/// A query with its parameters. Parameters can be bound using the [Bindings::bind] method which takes any serializable data structure.
///
/// # Example
/// ```rust,ignore
/// let progress: Vec<Progress> = database.sql("SELECT * FROM progress WHERE membership = $membership")
///     .bind(("membership", membership_id))
///     .fetch_first()
///     .await?;
/// ```
#[derive(Debug, new)]
pub struct Bindings<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Bindings<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the query and return a [surrealdb::Response] which is SurrealDB's way to represent a list of statements returned from the database.
    ///
    /// Statement-level errors are surfaced here instead of on [surrealdb::Response::take].
    pub async fn execute(self) -> Result<surrealdb::Response, DatabaseQueryError> {
        let response = self
            .query
            .await
            .and_then(|response| response.check())
            .context(MalformedQuerySnafu)?;
        tracing::trace!(?response, "executed query");
        Ok(response)
    }

    /// Execute the query and return the first result as a deserialized value.
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<T, DatabaseQueryError>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        let result = statements.take::<T>(0).context(DeserializeSnafu)?;
        Ok(result)
    }
}
