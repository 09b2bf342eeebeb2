use chrono::NaiveDate;
use derive_new::new;
use serde::{Deserialize, Serialize};

use super::DripCalendar;
use crate::model::ModuleId;
use crate::time::Timestamp;

/// The part of a module the drip schedule cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct ModuleWithSchedule {
    pub id: ModuleId,
    pub title: String,
    /// Whole days after joining at which the module unlocks.
    pub unlock_day: i64,
    /// Display order, unrelated to `unlock_day`.
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    #[serde(flatten)]
    pub module: ModuleWithSchedule,
    pub is_unlocked: bool,
    pub unlock_date: NaiveDate,
    /// `None` exactly when the module is unlocked.
    pub days_remaining: Option<i64>,
}

impl DripCalendar {
    /// Lock state of every module as of `now`, ordered by `position`.
    pub fn compute_status(
        &self, joined_at: Timestamp, modules: &[ModuleWithSchedule], now: Timestamp,
    ) -> Vec<ModuleStatus> {
        let mut ordered = modules.to_vec();
        ordered.sort_by_key(|module| module.position);

        ordered
            .into_iter()
            .map(|module| self.status_of(joined_at, module, now))
            .collect()
    }

    /// Lock state of a single module as of `now`.
    pub fn status_of(
        &self, joined_at: Timestamp, module: ModuleWithSchedule, now: Timestamp,
    ) -> ModuleStatus {
        let unlock_date = self.unlock_date(joined_at, module.unlock_day);
        let is_unlocked = self.is_unlocked(unlock_date, now);
        let days_remaining = if is_unlocked {
            None
        } else {
            self.days_until(unlock_date, now)
        };

        ModuleStatus {
            module,
            is_unlocked,
            unlock_date,
            days_remaining,
        }
    }
}

/// [DripCalendar::compute_status] with the day boundary at UTC midnight.
pub fn compute_status(
    joined_at: Timestamp, modules: &[ModuleWithSchedule], now: Timestamp,
) -> Vec<ModuleStatus> {
    DripCalendar::utc().compute_status(joined_at, modules, now)
}

/// Countdown label shown on a locked module.
pub fn format_days_remaining(days: i64) -> String {
    match days {
        i64::MIN..=0 => "Unlocking soon".to_string(),
        1 => "Unlocks tomorrow".to_string(),
        days => format!("Unlocks in {days} days"),
    }
}
