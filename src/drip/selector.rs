use chrono::{Days, NaiveDate};

use super::{DripCalendar, ModuleWithSchedule};
use crate::time::Timestamp;

impl DripCalendar {
    /// Modules whose unlock date is the calendar date of `target`, ordered by `position`.
    ///
    /// Dates are compared, not instants, so a module that unlocked yesterday is
    /// not picked up again today.
    pub fn modules_unlocking_on(
        &self, joined_at: Timestamp, modules: &[ModuleWithSchedule], target: Timestamp,
    ) -> Vec<ModuleWithSchedule> {
        self.modules_unlocked_within(joined_at, modules, target, 0)
    }

    /// Modules that unlocked on the date of `target` or on one of the `days` dates before it,
    /// ordered by `position`.
    pub fn modules_unlocked_within(
        &self, joined_at: Timestamp, modules: &[ModuleWithSchedule], target: Timestamp, days: u32,
    ) -> Vec<ModuleWithSchedule> {
        let last = self.date_of(target);
        let first = last
            .checked_sub_days(Days::new(days.into()))
            .unwrap_or(NaiveDate::MIN);

        let mut due: Vec<ModuleWithSchedule> = modules
            .iter()
            .filter(|module| (first..=last).contains(&self.unlock_date(joined_at, module.unlock_day)))
            .cloned()
            .collect();

        due.sort_by_key(|module| module.position);
        due
    }
}

/// [DripCalendar::modules_unlocking_on] with the day boundary at UTC midnight.
pub fn modules_unlocking_on(
    joined_at: Timestamp, modules: &[ModuleWithSchedule], target: Timestamp,
) -> Vec<ModuleWithSchedule> {
    DripCalendar::utc().modules_unlocking_on(joined_at, modules, target)
}
