//! Dashboard windows and rollup shapes.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};
use serde::Serialize;

use crate::Client;

/// Length of the trailing KPI window.
pub const KPI_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub visits_last_30_days: u64,
    pub redemptions_last_30_days: u64,
    pub total_clients: u64,
}

/// Start (inclusive) of the sliding KPI window ending at `now`.
pub fn kpi_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(KPI_WINDOW_DAYS)
}

/// Calendar month of `now` in the server's reference time zone.
pub fn current_month(now: DateTime<Utc>, reference: FixedOffset) -> u32 {
    now.with_timezone(&reference).month()
}

/// Birthday list order: day of month, then name.
pub fn sort_birthdays(clients: &mut [Client]) {
    clients.sort_by(|a, b| {
        let day = |c: &Client| c.birthday.map(|b| b.day()).unwrap_or(u32::MAX);
        day(a).cmp(&day(b)).then_with(|| a.name.cmp(&b.name))
    });
}
