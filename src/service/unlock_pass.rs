use std::time::Duration;

use chrono::NaiveDate;
use dashmap::DashMap;
use derive_new::new;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use snafu::{Location, OptionExt, ResultExt, Snafu};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::drip::{DripCalendar, ModuleWithSchedule};
use crate::model::{Company, CompanyId, Course, CourseId, Membership, MembershipId, Module, ModuleId, NotificationLog};
use crate::notifier::{Notification, Notifier, NotifyError};
use crate::store::{DripStore, StoreError};
use crate::time::Timestamp;

pub const NOTIFICATION_TITLE: &str = "New module unlocked 🎉";

/// Summary of one pass, returned to whoever triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub date: NaiveDate,
    /// Active memberships looked at.
    pub processed: usize,
    pub notified: usize,
    /// Unlocks that were already notified before this pass.
    pub skipped: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PassError {
    #[snafu(display("cannot list active memberships at {location}: {source}"))]
    ActiveMemberships {
        source: StoreError,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Failure confined to a single membership or a single unlock.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum UnlockError {
    #[snafu(display("failed to load the course: {source}"))]
    Load {
        source: StoreError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("company `{company}` does not exist"))]
    MissingCompany {
        company: CompanyId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("published course `{course}` does not exist"))]
    MissingCourse {
        course: CourseId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot check the notification log: {source}"))]
    Lookup {
        source: StoreError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to send the notification: {source}"))]
    Send {
        source: NotifyError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("notification was not delivered within {timeout:?}"))]
    Timeout {
        timeout: Duration,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("notification was sent but could not be recorded: {source}"))]
    Record {
        source: StoreError,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Tells every active member about the modules that unlocked for them, once.
///
/// A module is due from its unlock date until `catch_up_days` days later, so a
/// send that failed or a day the pass did not run is made up on a later pass.
/// Memberships are handled concurrently up to `concurrency`, the modules of one
/// membership one after another. A notification is sent before it is recorded,
/// so a crash in between may repeat it on the next pass but never loses it.
#[derive(Debug, new)]
pub struct UnlockPass<S, N> {
    store: S,
    notifier: N,
    calendar: DripCalendar,
    concurrency: usize,
    catch_up_days: u32,
    /// Held for the whole pass, passes never overlap.
    #[new(default)]
    running: Mutex<()>,
}

#[derive(Debug)]
struct Due {
    company: Company,
    course: Course,
    modules: Vec<ModuleWithSchedule>,
}

enum Delivery {
    Sent,
    AlreadySent,
}

#[derive(Debug, Default)]
struct Outcome {
    notified: usize,
    skipped: usize,
    errors: Vec<String>,
}

impl Outcome {
    fn fail(&mut self, membership: &MembershipId, module: Option<&ModuleId>, err: UnlockError) {
        match module {
            Some(module) => {
                tracing::error!(membership = %membership, module = %module, error = ?err, "unlock failed: {}", err);
                self.errors.push(format!("membership {} module {}: {}", membership.key(), module.key(), err));
            }
            None => {
                tracing::error!(membership = %membership, error = ?err, "membership skipped: {}", err);
                self.errors.push(format!("membership {}: {}", membership.key(), err));
            }
        }
    }
}

type CompanyCache = DashMap<CompanyId, Option<Company>>;

impl<S: DripStore, N: Notifier> UnlockPass<S, N> {
    pub fn calendar(&self) -> DripCalendar {
        self.calendar
    }

    /// Run the pass for the calendar date of `now`.
    ///
    /// A pass started while another one is running waits for it to finish.
    /// Only failing to list the memberships aborts the pass, every other failure
    /// ends up in [PassReport::errors].
    #[instrument(skip(self))]
    pub async fn run(&self, now: Timestamp) -> Result<PassReport, PassError> {
        let _running = self.running.lock().await;

        let date = self.calendar.date_of(now);
        let memberships = self
            .store
            .active_memberships()
            .await
            .context(ActiveMembershipsSnafu)?;
        let processed = memberships.len();

        tracing::info!(%date, memberships = processed, "start the unlock pass for {}", date);

        let companies = CompanyCache::new();
        let outcomes: Vec<Outcome> = stream::iter(memberships)
            .map(|membership| self.process(membership, now, &companies))
            .buffered(self.concurrency.max(1))
            .collect()
            .await;

        let mut report = PassReport {
            date,
            processed,
            notified: 0,
            skipped: 0,
            errors: Vec::new(),
        };

        for outcome in outcomes {
            report.notified += outcome.notified;
            report.skipped += outcome.skipped;
            report.errors.extend(outcome.errors);
        }

        tracing::info!(
            %date,
            processed = report.processed,
            notified = report.notified,
            skipped = report.skipped,
            errors = report.errors.len(),
            "finished the unlock pass for {}", date
        );

        Ok(report)
    }

    #[instrument(skip_all, fields(membership = %membership.id))]
    async fn process(&self, membership: Membership, now: Timestamp, companies: &CompanyCache) -> Outcome {
        let mut outcome = Outcome::default();

        let due = match self.due(&membership, now, companies).await {
            Ok(Some(due)) => due,
            Ok(None) => return outcome,
            Err(err) => {
                outcome.fail(&membership.id, None, err);
                return outcome;
            }
        };

        for module in &due.modules {
            match self.deliver(&membership, &due, module).await {
                Ok(Delivery::AlreadySent) => outcome.skipped += 1,
                Ok(Delivery::Sent) => {
                    outcome.notified += 1;

                    let log = NotificationLog::new(membership.id.clone(), module.id.clone(), now);
                    if let Err(err) = self.store.record_notification(log).await.context(RecordSnafu) {
                        outcome.fail(&membership.id, Some(&module.id), err);
                    }
                }
                Err(err) => outcome.fail(&membership.id, Some(&module.id), err),
            }
        }

        outcome
    }

    /// The company, course and modules due on `now` for one membership.
    async fn due(
        &self, membership: &Membership, now: Timestamp, companies: &CompanyCache,
    ) -> Result<Option<Due>, UnlockError> {
        let company = self
            .company(&membership.company, companies)
            .await
            .context(LoadSnafu)?
            .context(MissingCompanySnafu {
                company: membership.company.clone(),
            })?;

        let Some(course_id) = company.published_course.clone() else {
            tracing::debug!(company = %company.id, "company `{}` has no published course", company.name);
            return Ok(None);
        };

        let course = self
            .store
            .course(&course_id)
            .await
            .context(LoadSnafu)?
            .context(MissingCourseSnafu { course: course_id })?;

        let modules = self.store.modules(&course.id).await.context(LoadSnafu)?;
        let schedule: Vec<_> = modules.iter().map(Module::schedule).collect();
        let modules = self
            .calendar
            .modules_unlocked_within(membership.joined_at, &schedule, now, self.catch_up_days);

        if modules.is_empty() {
            return Ok(None);
        }

        Ok(Some(Due {
            company,
            course,
            modules,
        }))
    }

    async fn company(&self, id: &CompanyId, companies: &CompanyCache) -> Result<Option<Company>, StoreError> {
        let cached = companies.get(id).map(|entry| entry.value().clone());
        if let Some(company) = cached {
            return Ok(company);
        }

        let company = self.store.company(id).await?;
        companies.insert(id.clone(), company.clone());
        Ok(company)
    }

    async fn deliver(
        &self, membership: &Membership, due: &Due, module: &ModuleWithSchedule,
    ) -> Result<Delivery, UnlockError> {
        let notified = self
            .store
            .is_notified(&membership.id, &module.id)
            .await
            .context(LookupSnafu)?;

        if notified {
            tracing::debug!(membership = %membership.id, module = %module.id, "already notified, skipping");
            return Ok(Delivery::AlreadySent);
        }

        let notification = Notification {
            user_id: membership.user_id.clone(),
            access_token: due.company.access_token.clone(),
            title: NOTIFICATION_TITLE.to_string(),
            body: format!("\"{}\" is now available in {}.", module.title, due.course.title),
        };

        let timeout = self.notifier.timeout();
        tokio::time::timeout(timeout, self.notifier.send(&notification))
            .await
            .ok()
            .context(TimeoutSnafu { timeout })?
            .context(SendSnafu)?;

        tracing::info!(
            membership = %membership.id,
            module = %module.id,
            user_id = %membership.user_id,
            "notified `{}` about `{}`", membership.user_id, module.title
        );

        Ok(Delivery::Sent)
    }
}
