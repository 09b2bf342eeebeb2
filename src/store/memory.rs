use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use super::{DripStore, StoreError, UnavailableSnafu};
use crate::database::Record;
use crate::model::{
    Company, CompanyId, Course, CourseId, Membership, MembershipId, Module, ModuleId,
    NotificationLog, Progress,
};
use crate::time::Timestamp;

/// A [DripStore] held in memory, with switches to make individual reads fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    companies: DashMap<CompanyId, Company>,
    courses: DashMap<CourseId, Course>,
    modules: DashMap<ModuleId, Module>,
    memberships: DashMap<MembershipId, Membership>,
    notifications: DashMap<Record<NotificationLog>, NotificationLog>,
    progress: DashMap<Record<Progress>, Progress>,

    fail_memberships: AtomicBool,
    fail_records: AtomicBool,
    broken_courses: DashSet<CourseId>,
}

/// A published course with its modules, as seeded by [MemoryStore::published_course].
#[derive(Debug, Clone)]
pub struct Seeded {
    pub company: Company,
    pub course: Course,
    pub modules: Vec<Module>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A company with a published course whose modules unlock on `unlock_days`,
    /// positioned in the given order.
    pub fn published_course(&self, company: &str, unlock_days: &[i64]) -> Seeded {
        let draft = Company::new(company.to_string(), format!("{company}-token"));
        let course = Course::new(draft.id.clone(), format!("{company} course"));
        let company = draft.publish(&course);

        let modules: Vec<_> = unlock_days
            .iter()
            .enumerate()
            .map(|(position, &unlock_day)| {
                let mut module = Module::new(
                    course.id.clone(),
                    format!("Day {unlock_day}"),
                    unlock_day,
                    position as i64,
                );
                module.content = Some(format!("Lesson for day {unlock_day}"));
                module
            })
            .collect();

        self.insert_company(company.clone());
        self.insert_course(course.clone());
        for module in &modules {
            self.insert_module(module.clone());
        }

        Seeded {
            company,
            course,
            modules,
        }
    }

    pub fn join(&self, company: &Company, user_id: &str, joined_at: Timestamp) -> Membership {
        let membership = Membership::new(company.id.clone(), user_id.to_string(), joined_at);
        self.insert_membership(membership.clone());
        membership
    }

    pub fn insert_company(&self, company: Company) {
        self.inner.companies.insert(company.id.clone(), company);
    }

    pub fn insert_course(&self, course: Course) {
        self.inner.courses.insert(course.id.clone(), course);
    }

    pub fn insert_module(&self, module: Module) {
        self.inner.modules.insert(module.id.clone(), module);
    }

    pub fn insert_membership(&self, membership: Membership) {
        self.inner.memberships.insert(membership.id.clone(), membership);
    }

    pub fn remove_course(&self, id: &CourseId) {
        self.inner.courses.remove(id);
    }

    pub fn notifications(&self) -> Vec<NotificationLog> {
        self.inner.notifications.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn fail_active_memberships(&self) {
        self.inner.fail_memberships.store(true, Ordering::SeqCst);
    }

    pub fn fail_notification_records(&self) {
        self.inner.fail_records.store(true, Ordering::SeqCst);
    }

    /// Make loading the modules of `course` fail.
    pub fn break_course(&self, course: &CourseId) {
        self.inner.broken_courses.insert(course.clone());
    }
}

impl DripStore for MemoryStore {
    async fn active_memberships(&self) -> Result<Vec<Membership>, StoreError> {
        if self.inner.fail_memberships.load(Ordering::SeqCst) {
            return UnavailableSnafu {
                message: "memberships are offline",
            }
            .fail();
        }

        let mut active: Vec<_> = self
            .inner
            .memberships
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| entry.value().clone())
            .collect();

        active.sort_by(|a, b| (a.joined_at, a.user_id.as_str()).cmp(&(b.joined_at, b.user_id.as_str())));
        Ok(active)
    }

    async fn membership(&self, id: &MembershipId) -> Result<Option<Membership>, StoreError> {
        Ok(self.inner.memberships.get(id).map(|entry| entry.value().clone()))
    }

    async fn company(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self.inner.companies.get(id).map(|entry| entry.value().clone()))
    }

    async fn course(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        Ok(self.inner.courses.get(id).map(|entry| entry.value().clone()))
    }

    async fn modules(&self, course: &CourseId) -> Result<Vec<Module>, StoreError> {
        if self.inner.broken_courses.contains(course) {
            return UnavailableSnafu {
                message: format!("modules of {course} are offline"),
            }
            .fail();
        }

        let mut modules: Vec<_> = self
            .inner
            .modules
            .iter()
            .filter(|entry| &entry.course == course)
            .map(|entry| entry.value().clone())
            .collect();

        modules.sort_by_key(|module| module.position);
        Ok(modules)
    }

    async fn is_notified(&self, membership: &MembershipId, module: &ModuleId) -> Result<bool, StoreError> {
        let key = NotificationLog::key(membership, module);
        Ok(self.inner.notifications.contains_key(&key))
    }

    async fn record_notification(&self, log: NotificationLog) -> Result<bool, StoreError> {
        if self.inner.fail_records.load(Ordering::SeqCst) {
            return UnavailableSnafu {
                message: "notification log is read-only",
            }
            .fail();
        }

        match self.inner.notifications.entry(log.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(log);
                Ok(true)
            }
        }
    }

    async fn completed(&self, membership: &MembershipId) -> Result<Vec<Progress>, StoreError> {
        Ok(self
            .inner
            .progress
            .iter()
            .filter(|entry| &entry.membership == membership)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn complete(&self, progress: Progress) -> Result<bool, StoreError> {
        match self.inner.progress.entry(progress.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(progress);
                Ok(true)
            }
        }
    }

    async fn uncomplete(&self, membership: &MembershipId, module: &ModuleId) -> Result<bool, StoreError> {
        let key = Progress::key(membership, module);
        Ok(self.inner.progress.remove(&key).is_some())
    }
}
