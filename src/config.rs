use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{NaiveTime, Offset, Utc};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use snafu::ResultExt;

use crate::database::DatabaseConfig;
use crate::drip::DripCalendar;
use crate::error::{ApplicationError, ConfigLoadSnafu};
use crate::notifier::WhopConfig;
use crate::time::{RunAt, UtcOffset};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "host_address")]
    pub host: SocketAddr,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(flatten)]
    pub database: DatabaseConfig,
    #[serde(flatten)]
    pub whop: WhopConfig,
    #[serde(flatten)]
    pub schedule: ScheduleConfig,
    /// Enables `POST /cron/unlock` when set.
    #[serde(rename = "drip_cron_secret", default)]
    pub cron_secret: Option<String>,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    /// Time of day, in UTC, of the daily unlock pass.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "drip_run_at", default = "default_run_at")]
    pub run_at: RunAt,

    /// Offset at which one drip day ends and the next begins.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "drip_utc_offset", default = "default_utc_offset")]
    pub utc_offset: UtcOffset,

    /// Memberships processed at the same time during a pass.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "drip_pass_concurrency", default = "default_concurrency")]
    pub concurrency: usize,

    /// Days after its unlock date that a module is still notified about.
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "drip_catch_up_days", default = "default_catch_up_days")]
    pub catch_up_days: u32,
}

impl ScheduleConfig {
    pub fn calendar(&self) -> DripCalendar {
        DripCalendar::new(self.utc_offset.0)
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_run_at() -> RunAt {
    RunAt(NaiveTime::MIN + chrono::TimeDelta::hours(9))
}

fn default_utc_offset() -> UtcOffset {
    UtcOffset(Utc.fix())
}

fn default_concurrency() -> usize {
    4
}

fn default_catch_up_days() -> u32 {
    7
}

pub fn load() -> Result<Config, ApplicationError> {
    envy::from_env::<Config>().context(ConfigLoadSnafu)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::FixedOffset;

    use super::*;

    fn vars(extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let base = [
            ("HOST_ADDRESS", "127.0.0.1:8080"),
            ("SURREAL_URL", "mem://"),
            ("SURREAL_NS", "drip"),
            ("SURREAL_DB", "courses"),
        ];

        base.iter()
            .chain(extra)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_fill_the_gaps() {
        let config: Config = envy::from_iter(vars(&[])).unwrap();

        assert_eq!(config.host, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.database.namespace, "drip");
        assert!(config.database.credentials.is_none());
        assert!(config.whop.api_base.is_none());
        assert_eq!(*config.whop.send_timeout, Duration::from_secs(10));
        assert_eq!(config.whop.send_retries, 2);
        assert_eq!(config.schedule.run_at, RunAt(NaiveTime::from_hms_opt(9, 0, 0).unwrap()));
        assert_eq!(config.schedule.calendar(), DripCalendar::utc());
        assert_eq!(config.schedule.concurrency, 4);
        assert_eq!(config.schedule.catch_up_days, 7);
        assert_eq!(config.cron_secret, None);
    }

    #[test]
    fn reads_every_setting() {
        let config: Config = envy::from_iter(vars(&[
            ("LOG_DIR", "/var/log/drip"),
            ("SURREAL_USER", "root"),
            ("SURREAL_PASS", "root"),
            ("WHOP_API_BASE", "http://localhost:9000/api/v2"),
            ("WHOP_SEND_TIMEOUT", "3s"),
            ("WHOP_SEND_RETRIES", "5"),
            ("DRIP_RUN_AT", "06:30"),
            ("DRIP_UTC_OFFSET", "+09:00"),
            ("DRIP_PASS_CONCURRENCY", "16"),
            ("DRIP_CATCH_UP_DAYS", "0"),
            ("DRIP_CRON_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.log_dir, PathBuf::from("/var/log/drip"));
        assert!(config.database.credentials.is_some());
        assert_eq!(config.whop.api_base.unwrap().as_str(), "http://localhost:9000/api/v2");
        assert_eq!(*config.whop.send_timeout, Duration::from_secs(3));
        assert_eq!(config.whop.send_retries, 5);
        assert_eq!(config.schedule.run_at, RunAt(NaiveTime::from_hms_opt(6, 30, 0).unwrap()));
        assert_eq!(
            config.schedule.calendar(),
            DripCalendar::new(FixedOffset::east_opt(9 * 3600).unwrap())
        );
        assert_eq!(config.schedule.concurrency, 16);
        assert_eq!(config.schedule.catch_up_days, 0);
        assert_eq!(config.cron_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn rejects_a_malformed_offset() {
        let result = envy::from_iter::<_, Config>(vars(&[("DRIP_UTC_OFFSET", "tokyo")]));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_a_negative_catch_up_window() {
        let result = envy::from_iter::<_, Config>(vars(&[("DRIP_CATCH_UP_DAYS", "-1")]));
        assert!(result.is_err());
    }
}
