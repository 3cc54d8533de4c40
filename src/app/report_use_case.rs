use crate::app::ports::AlertStore;
use crate::constants::{CAUSE_KEYWORDS, FALLBACK_CAUSE};
use crate::error::{AlertError, Result};
use crate::types::StoredAlert;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCount {
    pub route: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseCount {
    pub cause: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourProfile {
    pub hour: u32,
    pub average_per_day: f64,
}

/// Summary of recently seen delay alerts
#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    pub window_days: i64,
    pub total_alerts: usize,
    pub distinct_incidents: usize,
    pub routes: Vec<RouteCount>,
    pub causes: Vec<CauseCount>,
    pub daily: Vec<DayCount>,
    pub start_hours: Vec<HourProfile>,
}

pub struct ReportUseCase {
    store: Arc<dyn AlertStore>,
}

impl ReportUseCase {
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self { store }
    }

    /// `window_days` must be positive and small enough to land on a valid date.
    pub async fn run(&self, now: NaiveDateTime, window_days: i64) -> Result<AlertReport> {
        if window_days < 1 {
            return Err(AlertError::Config(format!(
                "report window must be at least one day, got {window_days}"
            )));
        }
        let since = Duration::try_days(window_days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                AlertError::Config(format!("report window of {window_days} days is out of range"))
            })?;
        let alerts = self.store.fetch_seen_since(since).await?;
        Ok(build_report(&alerts, window_days))
    }
}

pub fn build_report(alerts: &[StoredAlert], window_days: i64) -> AlertReport {
    AlertReport {
        window_days,
        total_alerts: alerts.len(),
        distinct_incidents: dedupe_by_routes(alerts).len(),
        routes: route_counts(alerts),
        causes: cause_counts(alerts),
        daily: daily_counts(alerts),
        start_hours: start_hour_profile(alerts),
    }
}

/// Keeps the most recently seen alert for each distinct set of routes.
pub fn dedupe_by_routes(alerts: &[StoredAlert]) -> Vec<&StoredAlert> {
    let mut grouped: BTreeMap<Vec<&str>, &StoredAlert> = BTreeMap::new();
    for alert in alerts {
        let mut key: Vec<&str> = alert.alert.routes.iter().map(String::as_str).collect();
        key.sort_unstable();
        match grouped.get(&key) {
            Some(existing) if existing.alert.last_seen_time >= alert.alert.last_seen_time => {}
            _ => {
                grouped.insert(key, alert);
            }
        }
    }
    grouped.into_values().collect()
}

pub fn route_counts(alerts: &[StoredAlert]) -> Vec<RouteCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for route in alerts.iter().flat_map(|a| &a.alert.routes) {
        *counts.entry(route.as_str()).or_insert(0) += 1;
    }
    let mut out: Vec<RouteCount> = counts
        .into_iter()
        .map(|(route, count)| RouteCount {
            route: route.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.route.cmp(&b.route)));
    out
}

/// Keyword bucket for a description, used when no cause has been predicted yet.
pub fn keyword_cause(description: &str) -> &'static str {
    let lower = description.to_lowercase();
    CAUSE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, cause)| *cause)
        .unwrap_or(FALLBACK_CAUSE)
}

pub fn cause_counts(alerts: &[StoredAlert]) -> Vec<CauseCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for alert in alerts {
        let cause = alert
            .cause
            .as_deref()
            .unwrap_or_else(|| keyword_cause(&alert.alert.description));
        *counts.entry(cause).or_insert(0) += 1;
    }
    let mut out: Vec<CauseCount> = counts
        .into_iter()
        .map(|(cause, count)| CauseCount {
            cause: cause.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.cause.cmp(&b.cause)));
    out
}

/// Alerts per UTC day of `last_seen_time`, with empty days between first and last filled in.
pub fn daily_counts(alerts: &[StoredAlert]) -> Vec<DayCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for alert in alerts {
        *counts.entry(alert.alert.last_seen_time.date()).or_insert(0) += 1;
    }
    let (Some(first), Some(last)) = (
        counts.keys().next().copied(),
        counts.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| DayCount {
            day,
            count: counts.get(&day).copied().unwrap_or(0),
        })
        .collect()
}

/// Average number of alerts starting in each UTC hour, per day that hour saw any.
pub fn start_hour_profile(alerts: &[StoredAlert]) -> Vec<HourProfile> {
    let mut hours: BTreeMap<u32, (usize, BTreeSet<NaiveDate>)> = BTreeMap::new();
    for alert in alerts {
        let start = alert.alert.start_time;
        let entry = hours.entry(start.hour()).or_default();
        entry.0 += 1;
        entry.1.insert(start.date());
    }
    hours
        .into_iter()
        .map(|(hour, (count, days))| HourProfile {
            hour,
            average_per_day: count as f64 / days.len() as f64,
        })
        .collect()
}

impl fmt::Display for AlertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Delay alerts seen in the last {} days", self.window_days)?;
        writeln!(
            f,
            "  total: {}  distinct incidents: {}",
            self.total_alerts, self.distinct_incidents
        )?;
        writeln!(f, "\nRoutes")?;
        for r in &self.routes {
            writeln!(f, "  {:<6} {}", r.route, r.count)?;
        }
        writeln!(f, "\nCauses")?;
        for c in &self.causes {
            writeln!(f, "  {:<12} {}", c.cause, c.count)?;
        }
        writeln!(f, "\nDaily")?;
        for d in &self.daily {
            writeln!(f, "  {} {}", d.day.format("%a %m/%d"), d.count)?;
        }
        writeln!(f, "\nStart hour (UTC), average per day")?;
        for h in &self.start_hours {
            writeln!(f, "  {:02}:00 {:.2}", h.hour, h.average_per_day)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryAlertStore;
    use crate::types::Alert;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn stored(id: &str, routes: &[&str], description: &str, cause: Option<&str>, start: NaiveDateTime, seen: NaiveDateTime) -> StoredAlert {
        StoredAlert {
            alert: Alert {
                alert_id: id.to_string(),
                routes: routes.iter().map(|r| r.to_string()).collect(),
                start_time: start,
                last_seen_time: seen,
                description: description.to_string(),
            },
            cause: cause.map(str::to_string),
        }
    }

    fn sample() -> Vec<StoredAlert> {
        vec![
            stored("1", &["A", "C"], "Trains delayed, we're addressing a signal problem", None, at(1, 8), at(1, 9)),
            stored("2", &["C", "A"], "Trains delayed while EMS treat a customer", Some("EMS"), at(1, 8), at(1, 10)),
            stored("3", &["4"], "Train with mechanical problems", Some("Mechanical"), at(3, 17), at(3, 18)),
            stored("4", &["4", "5"], "Delays after a brake activation", None, at(3, 8), at(3, 9)),
        ]
    }

    #[test]
    fn dedupe_keeps_latest_per_route_set() {
        let alerts = sample();
        let deduped = dedupe_by_routes(&alerts);
        assert_eq!(deduped.len(), 3);
        assert!(deduped.iter().any(|a| a.alert.alert_id == "2"));
        assert!(!deduped.iter().any(|a| a.alert.alert_id == "1"));
    }

    #[test]
    fn route_counts_sorted_by_count_then_name() {
        let counts = route_counts(&sample());
        let pairs: Vec<(&str, usize)> = counts.iter().map(|r| (r.route.as_str(), r.count)).collect();
        assert_eq!(pairs, vec![("4", 2), ("A", 2), ("C", 2), ("5", 1)]);
    }

    #[test]
    fn keyword_fallback_matches_first_rule() {
        assert_eq!(keyword_cause("NYPD and EMS on scene"), "NYPD");
        assert_eq!(keyword_cause("Door problem at Jay St"), "Door");
        assert_eq!(keyword_cause("Trains are running slower"), "Other");
    }

    #[test]
    fn causes_prefer_stored_label() {
        let causes = cause_counts(&sample());
        let total: usize = causes.iter().map(|c| c.count).sum();
        assert_eq!(total, 4);
        assert!(causes.contains(&CauseCount { cause: "EMS".into(), count: 1 }));
        assert!(causes.contains(&CauseCount { cause: "Signal".into(), count: 1 }));
        assert!(causes.contains(&CauseCount { cause: "Brakes".into(), count: 1 }));
    }

    #[test]
    fn daily_counts_fill_gaps() {
        let daily = daily_counts(&sample());
        let counts: Vec<usize> = daily.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![2, 0, 2]);
        assert!(daily_counts(&[]).is_empty());
    }

    #[test]
    fn start_hours_average_over_distinct_days() {
        let profile = start_hour_profile(&sample());
        let eight = profile.iter().find(|h| h.hour == 8).unwrap();
        // three starts at 08:00 spread over two days
        assert!((eight.average_per_day - 1.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn report_reads_window_from_store() {
        let store = Arc::new(InMemoryAlertStore::new());
        for row in sample() {
            store.upsert_alert(&row.alert).await.unwrap();
        }
        let report = ReportUseCase::new(store)
            .run(at(3, 20), 1)
            .await
            .unwrap();
        assert_eq!(report.total_alerts, 2);
        assert!(report.to_string().contains("distinct incidents: 2"));
    }

    #[tokio::test]
    async fn oversized_window_is_a_config_error() {
        let report = ReportUseCase::new(Arc::new(InMemoryAlertStore::new()))
            .run(at(3, 20), 1_000_000_000_000)
            .await;
        assert!(matches!(report, Err(AlertError::Config(msg)) if msg.contains("out of range")));
    }

    #[tokio::test]
    async fn non_positive_window_is_rejected() {
        let use_case = ReportUseCase::new(Arc::new(InMemoryAlertStore::new()));
        for days in [0, -3] {
            let report = use_case.run(at(3, 20), days).await;
            assert!(matches!(report, Err(AlertError::Config(_))));
        }
    }
}
