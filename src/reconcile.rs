//! The displayed alert list and its projection into table rows.
//!
//! The list is never patched locally: after every mutation the whole set is
//! fetched again and handed to [`AlertList::apply`].

use crate::error::{Action, StoreError};
use crate::lifecycle::AlertState;
use crate::models::{Alert, AlertId};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write;
use std::time::Instant;
use tracing::warn;

/// Default chrono format for the created-at column.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One display row. `index` is 1-based and independent of the alert id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRow {
    pub index: usize,
    pub id: AlertId,
    pub ticker: String,
    pub limit_price: f64,
    pub direction: &'static str,
    /// "Yes" or "No"
    pub notified: &'static str,
    pub created_at: String,
    /// Reset is only offered for notified alerts.
    pub can_reset: bool,
}

/// Last known server truth plus fetch status.
#[derive(Debug, Default)]
pub struct AlertList {
    alerts: Vec<Alert>,
    error: Option<String>,
    last_refresh: Option<Instant>,
    loaded: bool,
    newly_notified: Vec<AlertId>,
}

impl AlertList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a fetch result into the list.
    ///
    /// A failure records the error but keeps the last good alerts visible.
    pub fn apply(&mut self, result: Result<Vec<Alert>, StoreError>) {
        match result {
            Ok(alerts) => {
                if self.loaded {
                    let armed: HashSet<AlertId> = self
                        .alerts
                        .iter()
                        .filter(|a| AlertState::of(a).is_armed())
                        .map(|a| a.id)
                        .collect();
                    for alert in &alerts {
                        if alert.is_notified
                            && armed.contains(&alert.id)
                            && !self.newly_notified.contains(&alert.id)
                        {
                            self.newly_notified.push(alert.id);
                        }
                    }
                }
                self.alerts = alerts;
                self.error = None;
                self.loaded = true;
                self.last_refresh = Some(Instant::now());
            }
            Err(e) => {
                warn!(error = %e, "alert list refresh failed");
                self.error = Some(Action::Load.failure_message().to_string());
            }
        }
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn get(&self, id: AlertId) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    /// Alert at a 1-based display index.
    pub fn at_index(&self, index: usize) -> Option<&Alert> {
        index.checked_sub(1).and_then(|i| self.alerts.get(i))
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether at least one fetch has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }

    /// Ids seen going from armed to notified that nobody has announced yet.
    pub fn newly_notified(&self) -> &[AlertId] {
        &self.newly_notified
    }

    /// Drain the unannounced flips, keeping only alerts that are still
    /// listed and still notified.
    pub fn take_newly_notified(&mut self) -> Vec<AlertId> {
        let pending = std::mem::take(&mut self.newly_notified);
        pending
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|a| a.is_notified))
            .collect()
    }

    pub fn notified_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.is_notified).count()
    }

    pub fn armed_count(&self) -> usize {
        self.alerts.len() - self.notified_count()
    }

    /// Project into display rows, in store order.
    pub fn rows(&self, date_format: &str) -> Vec<AlertRow> {
        self.alerts
            .iter()
            .enumerate()
            .map(|(i, alert)| to_row(i + 1, alert, date_format))
            .collect()
    }
}

fn to_row(index: usize, alert: &Alert, date_format: &str) -> AlertRow {
    AlertRow {
        index,
        id: alert.id,
        ticker: alert.ticker.clone(),
        limit_price: alert.limit_price,
        direction: alert.direction.label(),
        notified: notified_badge(alert.is_notified),
        created_at: format_created(alert.created_at, date_format),
        can_reset: alert.is_notified,
    }
}

pub fn notified_badge(is_notified: bool) -> &'static str {
    if is_notified { "Yes" } else { "No" }
}

/// Whether chrono understands every specifier in `date_format`.
pub fn is_valid_date_format(date_format: &str) -> bool {
    StrftimeItems::new(date_format).all(|item| !matches!(item, Item::Error))
}

/// Local-time rendering of a store timestamp, `-` when absent. An unusable
/// format falls back to [`DEFAULT_DATE_FORMAT`].
pub fn format_created(created_at: Option<DateTime<Utc>>, date_format: &str) -> String {
    let Some(ts) = created_at else {
        return "-".to_string();
    };
    let local = ts.with_timezone(&Local);

    let mut out = String::new();
    if is_valid_date_format(date_format) && write!(out, "{}", local.format(date_format)).is_ok() {
        return out;
    }
    local.format(DEFAULT_DATE_FORMAT).to_string()
}

/// Route of the dashboard detail view for `ticker`.
pub fn detail_route(dashboard_path: &str, ticker: &str) -> String {
    format!("{}?ticker={}", dashboard_path, urlencoding::encode(ticker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, UserId};

    fn alert(id: i64, ticker: &str, notified: bool) -> Alert {
        Alert {
            id: AlertId(id),
            ticker: ticker.to_string(),
            limit_price: 100.0,
            direction: Direction::Down,
            user_id: UserId(1),
            is_notified: notified,
            created_at: None,
        }
    }

    #[test]
    fn test_rows_keep_store_order_with_one_based_index() {
        let mut list = AlertList::new();
        list.apply(Ok(vec![alert(30, "TSLA", true), alert(4, "AAPL", false)]));

        let rows = list.rows(DEFAULT_DATE_FORMAT);
        assert_eq!(rows[0].index, 1);
        assert_eq!(rows[0].id, AlertId(30));
        assert_eq!(rows[0].notified, "Yes");
        assert!(rows[0].can_reset);
        assert_eq!(rows[1].index, 2);
        assert_eq!(rows[1].notified, "No");
        assert_eq!(rows[1].direction, "Down");
        assert_eq!(rows[1].created_at, "-");
        assert!(!rows[1].can_reset);
    }

    #[test]
    fn test_failed_refresh_keeps_last_good_list() {
        let mut list = AlertList::new();
        list.apply(Ok(vec![alert(1, "AAPL", false)]));
        list.apply(Err(StoreError::Unavailable("down".into())));

        assert_eq!(list.len(), 1);
        assert_eq!(list.error(), Some("Failed to load alerts."));

        list.apply(Ok(vec![]));
        assert!(list.is_empty());
        assert!(list.error().is_none());
    }

    #[test]
    fn test_newly_notified_tracks_flips_only() {
        let mut list = AlertList::new();
        list.apply(Ok(vec![alert(1, "AAPL", false), alert(2, "MSFT", true)]));
        assert!(list.newly_notified().is_empty());

        list.apply(Ok(vec![alert(1, "AAPL", true), alert(2, "MSFT", true)]));
        assert_eq!(list.newly_notified(), &[AlertId(1)]);

        list.apply(Ok(vec![alert(1, "AAPL", true), alert(2, "MSFT", true)]));
        assert_eq!(list.take_newly_notified(), vec![AlertId(1)]);
        assert!(list.newly_notified().is_empty());
    }

    #[test]
    fn test_unannounced_flips_survive_later_fetches() {
        let mut list = AlertList::new();
        list.apply(Ok(vec![alert(1, "AAPL", false), alert(2, "MSFT", false)]));
        list.apply(Ok(vec![alert(1, "AAPL", true), alert(2, "MSFT", false)]));
        list.apply(Err(StoreError::Unavailable("down".into())));
        list.apply(Ok(vec![alert(1, "AAPL", true)]));

        assert_eq!(list.take_newly_notified(), vec![AlertId(1)]);
        assert!(list.take_newly_notified().is_empty());
    }

    #[test]
    fn test_flip_reset_before_announcement_is_dropped() {
        let mut list = AlertList::new();
        list.apply(Ok(vec![alert(1, "AAPL", false)]));
        list.apply(Ok(vec![alert(1, "AAPL", true)]));
        list.apply(Ok(vec![alert(1, "AAPL", false)]));

        assert!(list.take_newly_notified().is_empty());
    }

    #[test]
    fn test_bad_date_format_falls_back() {
        assert!(is_valid_date_format(DEFAULT_DATE_FORMAT));
        assert!(!is_valid_date_format("%Q"));

        let ts = "2024-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut list = AlertList::new();
        list.apply(Ok(vec![Alert {
            created_at: Some(ts),
            ..alert(1, "AAPL", false)
        }]));

        let rows = list.rows("%Q");
        assert_eq!(
            rows[0].created_at,
            ts.with_timezone(&Local).format(DEFAULT_DATE_FORMAT).to_string()
        );
        assert_eq!(format_created(None, "%Q"), "-");
    }

    #[test]
    fn test_at_index_is_one_based() {
        let mut list = AlertList::new();
        list.apply(Ok(vec![alert(8, "AAPL", false)]));
        assert!(list.at_index(0).is_none());
        assert_eq!(list.at_index(1).map(|a| a.id), Some(AlertId(8)));
        assert!(list.at_index(2).is_none());
    }

    #[test]
    fn test_detail_route_encodes_symbol() {
        assert_eq!(detail_route("/dashboard", "AAPL"), "/dashboard?ticker=AAPL");
        assert_eq!(detail_route("/dashboard", "BRK.B&X"), "/dashboard?ticker=BRK.B%26X");
    }
}
