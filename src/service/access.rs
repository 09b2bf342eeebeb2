use std::collections::HashSet;

use chrono::NaiveDate;
use derive_new::new;
use serde::Serialize;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use tracing::instrument;

use crate::drip::{format_days_remaining, DripCalendar};
use crate::model::{Course, Membership, MembershipId, Module, ModuleId, Progress};
use crate::store::{DripStore, StoreError};
use crate::time::Timestamp;

/// Rejections a member can run into, rendered to them as is.
#[derive(Debug, Snafu, Serialize)]
#[snafu(visibility(pub(crate)))]
#[serde(tag = "error", content = "data")]
pub enum AccessError {
    #[snafu(display("membership `{membership}` does not exist"))]
    MembershipNotFound { membership: String },

    #[snafu(display("membership `{membership}` is not active"))]
    Inactive { membership: String },

    #[snafu(display("no course is published for membership `{membership}`"))]
    NoCourse { membership: String },

    #[snafu(display("module `{module}` is not part of the published course"))]
    ModuleNotFound { module: String },

    #[snafu(display("module `{module}` is locked until {unlock_date}"))]
    Locked {
        module: String,
        unlock_date: NaiveDate,
        days_remaining: Option<i64>,
    },

    #[snafu(display("storage error: {source}"))]
    Store {
        #[serde(skip)]
        source: StoreError,
    },
}

/// The published course as one member sees it right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberCourse {
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    pub joined_at: Timestamp,
    pub unlocked: usize,
    pub completed: usize,
    pub modules: Vec<MemberModule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberModule {
    pub id: String,
    pub title: String,
    pub position: i64,
    pub unlock_day: i64,
    pub is_unlocked: bool,
    pub unlock_date: NaiveDate,
    pub days_remaining: Option<i64>,
    /// Countdown label, only while locked.
    pub countdown: Option<String>,
    pub completed: bool,
    /// Withheld while locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

/// Checks unlock state on the server before a member may see or complete a module.
///
/// Nothing is cached, every call runs the drip calculation against `now`.
#[derive(Debug, Clone, new)]
pub struct AccessGate<S> {
    store: S,
    calendar: DripCalendar,
}

impl<S: DripStore> AccessGate<S> {
    /// Mark a module complete. Returns `false` when it already was.
    #[instrument(skip(self))]
    pub async fn complete_module(
        &self, membership: &MembershipId, module: &ModuleId, now: Timestamp,
    ) -> Result<bool, AccessError> {
        let membership = self.active_membership(membership).await?;
        let (_, modules) = self.published_course(&membership).await?;

        let module = modules
            .iter()
            .find(|candidate| &candidate.id == module)
            .context(ModuleNotFoundSnafu { module: module.key() })?;

        let status = self
            .calendar
            .status_of(membership.joined_at, module.schedule(), now);

        ensure!(
            status.is_unlocked,
            LockedSnafu {
                module: module.id.key(),
                unlock_date: status.unlock_date,
                days_remaining: status.days_remaining,
            }
        );

        let progress = Progress::new(membership.id.clone(), module.id.clone(), now);
        let created = self.store.complete(progress).await.context(StoreSnafu)?;

        tracing::info!(membership = %membership.id, module = %module.id, created, "completed module `{}`", module.title);
        Ok(created)
    }

    /// Clear a completion. Returns `false` when there was none.
    #[instrument(skip(self))]
    pub async fn uncomplete_module(
        &self, membership: &MembershipId, module: &ModuleId,
    ) -> Result<bool, AccessError> {
        let membership = self.membership(membership).await?;
        self.store
            .uncomplete(&membership.id, module)
            .await
            .context(StoreSnafu)
    }

    #[instrument(skip(self))]
    pub async fn member_course(&self, membership: &MembershipId, now: Timestamp) -> Result<MemberCourse, AccessError> {
        let membership = self.active_membership(membership).await?;
        let (course, modules) = self.published_course(&membership).await?;

        let completed: HashSet<ModuleId> = self
            .store
            .completed(&membership.id)
            .await
            .context(StoreSnafu)?
            .into_iter()
            .map(|progress| progress.module)
            .collect();

        let schedule: Vec<_> = modules.iter().map(Module::schedule).collect();
        let statuses = self
            .calendar
            .compute_status(membership.joined_at, &schedule, now);

        let modules: Vec<MemberModule> = statuses
            .into_iter()
            .filter_map(|status| {
                let module = modules.iter().find(|module| module.id == status.module.id)?;
                let unlocked = status.is_unlocked;

                Some(MemberModule {
                    id: module.id.key(),
                    title: module.title.clone(),
                    position: module.position,
                    unlock_day: module.unlock_day,
                    is_unlocked: unlocked,
                    unlock_date: status.unlock_date,
                    days_remaining: status.days_remaining,
                    countdown: status.days_remaining.map(format_days_remaining),
                    completed: completed.contains(&module.id),
                    content: module.content.clone().filter(|_| unlocked),
                    video_url: module.video_url.clone().filter(|_| unlocked),
                })
            })
            .collect();

        Ok(MemberCourse {
            course_id: course.id.key(),
            title: course.title,
            description: course.description,
            joined_at: membership.joined_at,
            unlocked: modules.iter().filter(|module| module.is_unlocked).count(),
            completed: modules.iter().filter(|module| module.completed).count(),
            modules,
        })
    }

    async fn membership(&self, id: &MembershipId) -> Result<Membership, AccessError> {
        self.store
            .membership(id)
            .await
            .context(StoreSnafu)?
            .context(MembershipNotFoundSnafu { membership: id.key() })
    }

    async fn active_membership(&self, id: &MembershipId) -> Result<Membership, AccessError> {
        let membership = self.membership(id).await?;
        ensure!(membership.is_active(), InactiveSnafu { membership: id.key() });
        Ok(membership)
    }

    async fn published_course(&self, membership: &Membership) -> Result<(Course, Vec<Module>), AccessError> {
        let no_course = || NoCourseSnafu {
            membership: membership.id.key(),
        };

        let company = self
            .store
            .company(&membership.company)
            .await
            .context(StoreSnafu)?
            .with_context(no_course)?;
        let course_id = company.published_course.with_context(no_course)?;
        let course = self
            .store
            .course(&course_id)
            .await
            .context(StoreSnafu)?
            .with_context(no_course)?;
        let modules = self.store.modules(&course.id).await.context(StoreSnafu)?;

        Ok((course, modules))
    }
}
