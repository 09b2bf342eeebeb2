use std::future::Future;

use snafu::{Location, ResultExt, Snafu};

use crate::database::{Database, DatabaseQueryError};
use crate::model::{
    Company, CompanyId, Course, CourseId, Membership, MembershipId, Module, ModuleId,
    NotificationLog, Progress,
};

#[cfg(test)]
pub(crate) mod memory;

/// Everything the drip engine reads from and writes to persistent storage.
///
/// Writes are idempotent. `record_notification` and `complete` report whether a
/// new row was written, a pair that already exists is left untouched.
pub trait DripStore: Clone + Send + Sync + 'static {
    /// Memberships in good standing, oldest first.
    fn active_memberships(&self) -> impl Future<Output = Result<Vec<Membership>, StoreError>> + Send;

    fn membership(
        &self, id: &MembershipId,
    ) -> impl Future<Output = Result<Option<Membership>, StoreError>> + Send;

    fn company(&self, id: &CompanyId) -> impl Future<Output = Result<Option<Company>, StoreError>> + Send;

    fn course(&self, id: &CourseId) -> impl Future<Output = Result<Option<Course>, StoreError>> + Send;

    /// Modules of a course ordered by position.
    fn modules(&self, course: &CourseId) -> impl Future<Output = Result<Vec<Module>, StoreError>> + Send;

    fn is_notified(
        &self, membership: &MembershipId, module: &ModuleId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn record_notification(
        &self, log: NotificationLog,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn completed(
        &self, membership: &MembershipId,
    ) -> impl Future<Output = Result<Vec<Progress>, StoreError>> + Send;

    fn complete(&self, progress: Progress) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns whether a completion was removed.
    fn uncomplete(
        &self, membership: &MembershipId, module: &ModuleId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("storage query failed at {location}: {source}"))]
    Query {
        source: DatabaseQueryError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("storage is unavailable at {location}: {message}"))]
    Unavailable {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl DripStore for Database {
    async fn active_memberships(&self) -> Result<Vec<Membership>, StoreError> {
        Membership::active(self).await.context(QuerySnafu)
    }

    async fn membership(&self, id: &MembershipId) -> Result<Option<Membership>, StoreError> {
        Membership::get(id, self).await.context(QuerySnafu)
    }

    async fn company(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        Company::get(id, self).await.context(QuerySnafu)
    }

    async fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        Course::get(id, self).await.context(QuerySnafu)
    }

    async fn modules(&self, course: &CourseId) -> Result<Vec<Module>, StoreError> {
        Module::for_course(course, self).await.context(QuerySnafu)
    }

    async fn is_notified(&self, membership: &MembershipId, module: &ModuleId) -> Result<bool, StoreError> {
        let key = NotificationLog::key(membership, module);
        let log = NotificationLog::get(&key, self).await.context(QuerySnafu)?;
        Ok(log.is_some())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn record_notification(&self, log: NotificationLog) -> Result<bool, StoreError> {
        let created =
            NotificationLog::insert(&log.id, &log.membership, &log.module, &log.sent_at, self).await;

        match created {
            Ok(row) => Ok(row.is_some()),
            // CREATE fails on an existing id, which is the conflict we want to ignore.
            Err(err) => match NotificationLog::get(&log.id, self).await.context(QuerySnafu)? {
                Some(_) => {
                    tracing::debug!(log = ?log.id, "notification already recorded");
                    Ok(false)
                }
                None => Err(err).context(QuerySnafu),
            },
        }
    }

    async fn completed(&self, membership: &MembershipId) -> Result<Vec<Progress>, StoreError> {
        Progress::for_membership(membership, self).await.context(QuerySnafu)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn complete(&self, progress: Progress) -> Result<bool, StoreError> {
        let created = Progress::insert(
            &progress.id,
            &progress.membership,
            &progress.module,
            &progress.completed_at,
            self,
        )
        .await;

        match created {
            Ok(row) => Ok(row.is_some()),
            Err(err) => match Progress::get(&progress.id, self).await.context(QuerySnafu)? {
                Some(_) => Ok(false),
                None => Err(err).context(QuerySnafu),
            },
        }
    }

    async fn uncomplete(&self, membership: &MembershipId, module: &ModuleId) -> Result<bool, StoreError> {
        let key = Progress::key(membership, module);
        // Deleting a missing record yields `[NONE]` rather than an empty list.
        let removed = Progress::remove(&key, self).await.context(QuerySnafu)?;
        Ok(removed.into_iter().flatten().next().is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::database::DatabaseConfig;
    use crate::model::MembershipStatus;
    use crate::time::Timestamp;

    fn at(text: &str) -> Timestamp {
        text.parse().unwrap()
    }

    async fn database() -> Database {
        Database::connect(&DatabaseConfig::memory()).await.unwrap()
    }

    async fn seed(db: &Database) -> (Company, Course, Membership) {
        let company = Company::new("Acme".into(), "token".into());
        let course = Course::new(company.id.clone(), "Rust in 30 days".into());
        let company = company.publish(&course);
        let membership = Membership::new(company.id.clone(), "user_1".into(), at("2026-02-01T15:00:00Z"));

        Company::save(&company.id, &company, db).await.unwrap();
        Course::save(&course.id, &course, db).await.unwrap();
        Membership::save(&membership.id, &membership, db).await.unwrap();

        (company, course, membership)
    }

    #[tokio::test]
    async fn reads_back_saved_rows() {
        let db = database().await;
        let (company, course, membership) = seed(&db).await;

        let found = db.company(&company.id).await.unwrap().unwrap();
        assert_eq!(found.published_course, Some(course.id.clone()));
        assert_eq!(db.course(&course.id).await.unwrap(), Some(course));
        assert_eq!(db.membership(&membership.id).await.unwrap(), Some(membership));
        assert_eq!(db.company(&CompanyId::new("missing")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn modules_come_back_in_position_order() {
        let db = database().await;
        let (_, course, _) = seed(&db).await;

        for (title, unlock_day, position) in [("c", 0, 2), ("a", 30, 0), ("b", 7, 1)] {
            let module = Module::new(course.id.clone(), title.into(), unlock_day, position);
            Module::save(&module.id, &module, &db).await.unwrap();
        }

        let modules = db.modules(&course.id).await.unwrap();
        let titles: Vec<_> = modules.iter().map(|m| m.title.as_str()).collect();

        assert_eq!(titles, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn only_active_memberships_are_listed() {
        let db = database().await;
        let (company, _, active) = seed(&db).await;

        let mut cancelled = Membership::new(company.id.clone(), "user_2".into(), at("2026-01-01T00:00:00Z"));
        cancelled.status = MembershipStatus::Cancelled;
        Membership::save(&cancelled.id, &cancelled, &db).await.unwrap();

        let listed = db.active_memberships().await.unwrap();

        assert_eq!(listed, [active]);
    }

    #[tokio::test]
    async fn notification_is_recorded_once() {
        let db = database().await;
        let (_, _, membership) = seed(&db).await;
        let module = ModuleId::new("week-1");
        let sent_at = at("2026-02-08T09:00:00Z");

        assert!(!db.is_notified(&membership.id, &module).await.unwrap());

        let first = NotificationLog::new(membership.id.clone(), module.clone(), sent_at);
        assert!(db.record_notification(first).await.unwrap());

        let again = NotificationLog::new(membership.id.clone(), module.clone(), sent_at + Duration::days(1));
        assert!(!db.record_notification(again).await.unwrap());

        assert!(db.is_notified(&membership.id, &module).await.unwrap());
    }

    #[tokio::test]
    async fn completion_can_be_toggled() {
        let db = database().await;
        let (_, _, membership) = seed(&db).await;
        let module = ModuleId::new("intro");
        let progress = Progress::new(membership.id.clone(), module.clone(), at("2026-02-02T10:00:00Z"));

        assert!(db.complete(progress.clone()).await.unwrap());
        assert!(!db.complete(progress).await.unwrap());
        assert_eq!(db.completed(&membership.id).await.unwrap().len(), 1);

        assert!(db.uncomplete(&membership.id, &module).await.unwrap());
        assert!(!db.uncomplete(&membership.id, &module).await.unwrap());
        assert!(db.completed(&membership.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn uncompleting_a_module_never_completed() {
        let db = database().await;
        let (_, _, membership) = seed(&db).await;

        let removed = db.uncomplete(&membership.id, &ModuleId::new("never-started")).await;

        assert!(!removed.unwrap());
    }
}
