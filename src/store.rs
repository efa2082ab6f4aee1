//! Store boundaries: the persisted alert collection and the ticker registry.
//!
//! The HTTP implementation lives in [`crate::api`]. [`MemoryStore`] keeps
//! everything in-process and stands in for the server, including the price
//! monitor that flips alerts to notified.

use crate::error::StoreError;
use crate::lifecycle::{AlertState, Event};
use crate::models::{Alert, AlertDraft, AlertId, AlertUpdate, Ticker, UserId};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

/// CRUD gateway to a user's persisted alerts.
pub trait AlertStore {
    /// All alerts owned by `user`, in store order.
    fn list(&self, user: UserId) -> impl Future<Output = Result<Vec<Alert>, StoreError>> + Send;

    fn get(&self, id: AlertId) -> impl Future<Output = Result<Alert, StoreError>> + Send;

    /// Persist a new alert; the store assigns `id` and `createdAt`.
    fn create(&self, draft: &AlertDraft)
    -> impl Future<Output = Result<Alert, StoreError>> + Send;

    /// Replace the mutable fields of an existing alert.
    fn update(
        &self,
        id: AlertId,
        update: &AlertUpdate,
    ) -> impl Future<Output = Result<Alert, StoreError>> + Send;

    /// Permanently remove an alert. Deleting a missing id is an error.
    fn delete(&self, id: AlertId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Re-arm a notified alert without touching ticker, price or direction.
    fn reset(&self, id: AlertId) -> impl Future<Output = Result<Alert, StoreError>> + Send;
}

/// Lookup into the registry of tradable instruments.
pub trait TickerLookup {
    /// `Ok(None)` when the registry does not know the symbol.
    fn find_by_symbol(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<Option<Ticker>, StoreError>> + Send;

    fn list_active(&self) -> impl Future<Output = Result<Vec<Ticker>, StoreError>> + Send;
}

/// Per-operation call counters, for asserting what reached the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub list: usize,
    pub get: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub reset: usize,
    pub lookup: usize,
}

impl CallLog {
    /// Number of mutating calls (create, update, delete, reset).
    pub fn mutations(&self) -> usize {
        self.create + self.update + self.delete + self.reset
    }
}

#[derive(Debug, Default)]
struct Inner {
    alerts: Vec<Alert>,
    tickers: HashMap<String, Ticker>,
    next_id: i64,
    offline: bool,
    calls: CallLog,
}

impl Inner {
    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn position(&self, id: AlertId) -> Result<usize, StoreError> {
        self.alerts
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

/// In-process alert store and ticker registry.
///
/// Cloning shares the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose registry knows `symbols`.
    pub fn with_tickers<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for symbol in symbols {
            store.add_ticker(symbol);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a tradable symbol.
    pub fn add_ticker(&self, symbol: impl Into<String>) {
        let symbol = symbol.into().to_ascii_uppercase();
        let mut inner = self.lock();
        let id = inner.tickers.len() as i64 + 1;
        inner.tickers.insert(
            symbol.clone(),
            Ticker {
                id: Some(id),
                name: format!("{symbol} Inc."),
                symbol,
                sector: None,
                active: true,
            },
        );
    }

    /// Seed an alert as-is, bypassing id assignment.
    pub fn insert(&self, alert: Alert) {
        let mut inner = self.lock();
        inner.next_id = inner.next_id.max(alert.id.0);
        inner.alerts.push(alert);
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn calls(&self) -> CallLog {
        self.lock().calls.clone()
    }

    /// Current contents, bypassing call accounting and the offline switch.
    pub fn snapshot(&self) -> Vec<Alert> {
        self.lock().alerts.clone()
    }

    /// Feed a market price for `ticker`, notifying every armed alert whose
    /// threshold it crosses. Returns the ids that fired.
    pub fn observe_price(&self, ticker: &str, price: f64) -> Vec<AlertId> {
        let mut inner = self.lock();
        let mut fired = Vec::new();

        for alert in inner.alerts.iter_mut() {
            if alert.ticker != ticker || !alert.direction.is_crossed(alert.limit_price, price) {
                continue;
            }
            if let Ok(Some(next)) = AlertState::of(alert).apply(Event::Notify) {
                alert.is_notified = next.is_notified();
                fired.push(alert.id);
            }
        }

        fired
    }
}

impl AlertStore for MemoryStore {
    async fn list(&self, user: UserId) -> Result<Vec<Alert>, StoreError> {
        let mut inner = self.lock();
        inner.calls.list += 1;
        inner.check_online()?;
        Ok(inner
            .alerts
            .iter()
            .filter(|a| a.user_id == user)
            .cloned()
            .collect())
    }

    async fn get(&self, id: AlertId) -> Result<Alert, StoreError> {
        let mut inner = self.lock();
        inner.calls.get += 1;
        inner.check_online()?;
        let idx = inner.position(id)?;
        Ok(inner.alerts[idx].clone())
    }

    async fn create(&self, draft: &AlertDraft) -> Result<Alert, StoreError> {
        let mut inner = self.lock();
        inner.calls.create += 1;
        inner.check_online()?;

        inner.next_id += 1;
        let alert = Alert {
            id: AlertId(inner.next_id),
            ticker: draft.ticker.clone(),
            limit_price: draft.limit_price,
            direction: draft.direction,
            user_id: draft.user_id,
            is_notified: draft.is_notified,
            created_at: Some(Utc::now()),
        };
        inner.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn update(&self, id: AlertId, update: &AlertUpdate) -> Result<Alert, StoreError> {
        let mut inner = self.lock();
        inner.calls.update += 1;
        inner.check_online()?;

        let idx = inner.position(id)?;
        let alert = &mut inner.alerts[idx];
        alert.ticker = update.ticker.clone();
        alert.limit_price = update.limit_price;
        alert.direction = update.direction;
        alert.is_notified = update.is_notified;
        Ok(alert.clone())
    }

    async fn delete(&self, id: AlertId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.delete += 1;
        inner.check_online()?;

        let idx = inner.position(id)?;
        inner.alerts.remove(idx);
        Ok(())
    }

    async fn reset(&self, id: AlertId) -> Result<Alert, StoreError> {
        let mut inner = self.lock();
        inner.calls.reset += 1;
        inner.check_online()?;

        let idx = inner.position(id)?;
        let alert = &mut inner.alerts[idx];
        alert.is_notified = false;
        Ok(alert.clone())
    }
}

impl TickerLookup for MemoryStore {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<Ticker>, StoreError> {
        let mut inner = self.lock();
        inner.calls.lookup += 1;
        inner.check_online()?;
        Ok(inner.tickers.get(symbol).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Ticker>, StoreError> {
        let inner = self.lock();
        inner.check_online()?;
        let mut tickers: Vec<Ticker> = inner.tickers.values().filter(|t| t.active).cloned().collect();
        tickers.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(tickers)
    }
}
