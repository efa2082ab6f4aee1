//! Application state and the alert controller.
//!
//! `App` owns the displayed list and is the only thing that mutates it.
//! Every mutation goes validator -> lifecycle check -> store -> full refetch;
//! nothing is patched locally.

use crate::config::Config;
use crate::error::{Action, AlertError, StoreError};
use crate::lifecycle::{AlertState, Event};
use crate::models::{Alert, AlertDraft, AlertId, AlertUpdate, Ticker, UserId};
use crate::reconcile::{
    AlertList, AlertRow, DEFAULT_DATE_FORMAT, detail_route, is_valid_date_format,
};
use crate::store::{AlertStore, TickerLookup};
use crate::validator::{AlertForm, TickerValidator};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Dismissible message shown after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Edit form: the same fields as create plus an optional notified override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditForm {
    pub fields: AlertForm,
    /// `None` keeps the existing record's value
    pub notified: Option<bool>,
}

impl EditForm {
    /// Form pre-filled from an existing alert.
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            fields: AlertForm::new(
                alert.ticker.clone(),
                alert.limit_price.to_string(),
                alert.direction,
            ),
            notified: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Confirmation was declined; the store was not called.
    Declined,
}

/// View and polling settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub refresh_interval: Duration,
    /// Maximum refreshes before quitting (0 = infinite)
    pub max_iterations: u64,
    pub batch_mode: bool,
    pub audio_alerts: bool,
    pub date_format: String,
    pub dashboard_path: String,
}

impl Settings {
    /// Shortest allowed polling interval.
    pub const MIN_REFRESH: Duration = Duration::from_secs(1);

    pub fn from_config(config: &Config) -> Self {
        Self {
            refresh_interval: clamp_interval(config.watch.refresh_interval),
            max_iterations: 0,
            batch_mode: false,
            audio_alerts: config.watch.audio_alerts,
            date_format: checked_date_format(&config.display.date_format),
            dashboard_path: config.display.dashboard_path.clone(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn checked_date_format(date_format: &str) -> String {
    if is_valid_date_format(date_format) {
        date_format.to_string()
    } else {
        warn!(date_format, "invalid date format, using {DEFAULT_DATE_FORMAT}");
        DEFAULT_DATE_FORMAT.to_string()
    }
}

/// Seconds to a refresh interval, never below [`Settings::MIN_REFRESH`].
pub fn clamp_interval(secs: f64) -> Duration {
    if secs.is_finite() && secs >= 1.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Settings::MIN_REFRESH
    }
}

/// Alert controller plus the view state of the watch screen.
pub struct App<S, L> {
    user: UserId,
    store: S,
    validator: TickerValidator<L>,
    /// Last good alert list and fetch status
    pub list: AlertList,
    /// Active tickers offered for selection
    pub tickers: Vec<Ticker>,
    /// Outcome of the last action
    pub notice: Option<Notice>,
    pub settings: Settings,
    /// When the last list fetch was attempted
    pub last_attempt: Option<Instant>,
    /// Refresh attempts so far
    pub iteration: u64,
    pub running: bool,
    /// Selected row (0-based)
    pub selected: usize,
    pub show_help: bool,
    /// Alert awaiting delete confirmation
    pub pending_delete: Option<AlertId>,
}

impl<S: AlertStore, L: TickerLookup> App<S, L> {
    pub fn new(user: UserId, store: S, lookup: L, settings: Settings) -> Self {
        Self {
            user,
            store,
            validator: TickerValidator::new(lookup),
            list: AlertList::new(),
            tickers: Vec::new(),
            notice: None,
            settings,
            last_attempt: None,
            iteration: 0,
            running: true,
            selected: 0,
            show_help: false,
            pending_delete: None,
        }
    }

    /// Periodic refresh. Announces alerts that fired since they were last
    /// announced, including flips picked up by refetches after mutations,
    /// and returns their ids.
    pub async fn refresh(&mut self) -> Vec<AlertId> {
        self.iteration += 1;
        self.reload().await;

        let fired = self.list.take_newly_notified();
        if !fired.is_empty() {
            let tickers: Vec<&str> = fired
                .iter()
                .filter_map(|id| self.list.get(*id))
                .map(|a| a.ticker.as_str())
                .collect();
            info!(?tickers, "alerts triggered");
            self.notice = Some(Notice::new(
                NoticeLevel::Info,
                format!("Alert triggered: {}", tickers.join(", ")),
            ));
        }
        fired
    }

    /// Refetch the full list from the store.
    async fn reload(&mut self) {
        let result = self.store.list(self.user).await;
        self.list.apply(result);
        self.last_attempt = Some(Instant::now());
        self.clamp_selection();
    }

    /// Fetch active tickers for the selection list. Failure leaves it empty.
    pub async fn load_tickers(&mut self) {
        match self.validator.lookup().list_active().await {
            Ok(mut tickers) => {
                tickers.sort_by(|a, b| a.symbol.cmp(&b.symbol));
                debug!(count = tickers.len(), "active tickers loaded");
                self.tickers = tickers;
            }
            Err(e) => {
                warn!(error = %e, "failed to load available tickers");
                self.tickers.clear();
            }
        }
    }

    /// Fetch a single alert by id.
    pub async fn fetch(&mut self, id: AlertId) -> Result<Alert, AlertError> {
        let result = self.store.get(id).await;
        result.map_err(|e| self.fail(Action::Fetch, e))
    }

    /// Validate and persist a new armed alert, then refetch.
    pub async fn create(&mut self, form: &AlertForm) -> Result<Alert, AlertError> {
        let input = match self.validator.check(form).await {
            Ok(input) => input,
            Err(e) => return Err(self.reject(e)),
        };

        let draft = AlertDraft {
            ticker: input.ticker,
            limit_price: input.limit_price,
            direction: input.direction,
            user_id: self.user,
            is_notified: AlertState::initial().is_notified(),
        };

        let result = self.store.create(&draft).await;
        self.complete(Action::Create, result).await
    }

    /// Replace ticker, price and direction of a listed alert, then refetch.
    ///
    /// The notified flag is carried over unless the form sets it.
    pub async fn edit(&mut self, id: AlertId, form: &EditForm) -> Result<Alert, AlertError> {
        let existing = self.listed(id)?;

        let next = match AlertState::of(&existing).apply(Event::Edit {
            notified: form.notified,
        }) {
            Ok(Some(next)) => next,
            Ok(None) => return Err(self.reject(AlertError::UnknownAlert(id))),
            Err(e) => return Err(self.reject(e)),
        };

        let input = match self.validator.check(&form.fields).await {
            Ok(input) => input,
            Err(e) => return Err(self.reject(e)),
        };

        let update = AlertUpdate {
            id: existing.id,
            ticker: input.ticker,
            limit_price: input.limit_price,
            direction: input.direction,
            user_id: existing.user_id,
            is_notified: next.is_notified(),
            created_at: existing.created_at,
        };

        let result = self.store.update(id, &update).await;
        self.complete(Action::Update, result).await
    }

    /// Remove a listed alert once `confirm` agrees, then refetch.
    pub async fn delete<F>(&mut self, id: AlertId, confirm: F) -> Result<DeleteOutcome, AlertError>
    where
        F: FnOnce(&Alert) -> bool,
    {
        let existing = self.listed(id)?;
        if let Err(e) = AlertState::of(&existing).apply(Event::Delete) {
            return Err(self.reject(e));
        }

        if !confirm(&existing) {
            debug!(%id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        let result = self.store.delete(id).await;
        self.complete(Action::Delete, result)
            .await
            .map(|()| DeleteOutcome::Deleted)
    }

    /// Re-arm a notified alert, then refetch.
    pub async fn reset(&mut self, id: AlertId) -> Result<Alert, AlertError> {
        let existing = self.listed(id)?;
        if let Err(e) = AlertState::of(&existing).apply(Event::Reset) {
            return Err(self.reject(e));
        }

        let result = self.store.reset(id).await;
        self.complete(Action::Reset, result).await
    }

    /// Notice and refetch after a store call.
    async fn complete<T>(
        &mut self,
        action: Action,
        result: Result<T, StoreError>,
    ) -> Result<T, AlertError> {
        match result {
            Ok(value) => {
                info!(%action, "alert action succeeded");
                self.notice = Some(Notice::new(NoticeLevel::Success, action.success_message()));
                self.reload().await;
                Ok(value)
            }
            Err(e) => Err(self.fail(action, e)),
        }
    }

    /// Answer the pending delete confirmation.
    pub async fn answer_delete(&mut self, confirmed: bool) -> Option<Result<DeleteOutcome, AlertError>> {
        let id = self.pending_delete.take()?;
        Some(self.delete(id, |_| confirmed).await)
    }

    /// Reset the selected alert if it has fired.
    pub async fn reset_selected(&mut self) -> Option<Result<Alert, AlertError>> {
        let alert = self.selected_alert()?;
        if !alert.is_notified {
            return None;
        }
        let id = alert.id;
        Some(self.reset(id).await)
    }
}

impl<S, L> App<S, L> {
    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Dashboard route for the ticker at a 1-based display index.
    pub fn open_ticker(&self, index: usize) -> Option<String> {
        self.list
            .at_index(index)
            .map(|a| detail_route(&self.settings.dashboard_path, &a.ticker))
    }

    pub fn rows(&self) -> Vec<AlertRow> {
        self.list.rows(&self.settings.date_format)
    }

    fn listed(&mut self, id: AlertId) -> Result<Alert, AlertError> {
        match self.list.get(id) {
            Some(alert) => Ok(alert.clone()),
            None => Err(self.reject(AlertError::UnknownAlert(id))),
        }
    }

    /// Record a rejected action as an error notice.
    fn reject(&mut self, err: impl Into<AlertError>) -> AlertError {
        let err = err.into();
        debug!(error = %err, "action rejected");
        self.notice = Some(Notice::new(NoticeLevel::Error, err.to_string()));
        err
    }

    fn fail(&mut self, action: Action, source: StoreError) -> AlertError {
        warn!(%action, error = %source, "store call failed");
        self.reject(AlertError::failed(action, source))
    }

    /// Whether the polling interval has elapsed.
    pub fn needs_refresh(&self) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => last.elapsed() >= self.settings.refresh_interval,
        }
    }

    /// Refresh on the next tick.
    pub fn force_refresh(&mut self) {
        self.last_attempt = None;
    }

    pub fn selected_alert(&self) -> Option<&Alert> {
        self.list.alerts().get(self.selected)
    }

    pub fn select_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_down(&mut self) {
        if self.selected < self.list.len().saturating_sub(1) {
            self.selected += 1;
        }
    }

    pub fn select_top(&mut self) {
        self.selected = 0;
    }

    pub fn select_bottom(&mut self) {
        self.selected = self.list.len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.list.len() {
            self.selected = self.list.len().saturating_sub(1);
        }
    }

    /// Ask for confirmation before deleting the selected alert.
    pub fn request_delete(&mut self) {
        self.pending_delete = self.selected_alert().map(|a| a.id);
    }

    /// Show the dashboard route of the selected ticker.
    pub fn open_selected(&mut self) {
        if let Some(route) = self.open_ticker(self.selected + 1) {
            self.notice = Some(Notice::new(NoticeLevel::Info, route));
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Check if we are done (quit requested or max iterations reached).
    pub fn should_quit(&self) -> bool {
        !self.running
            || (self.settings.max_iterations > 0 && self.iteration >= self.settings.max_iterations)
    }

    /// Time since the last good fetch, human readable.
    pub fn time_since_refresh(&self) -> String {
        match self.list.last_refresh() {
            Some(t) => {
                let elapsed = Duration::from_secs(t.elapsed().as_secs());
                format!("{} ago", humantime::format_duration(elapsed))
            }
            None => "never".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use crate::store::MemoryStore;

    fn app(store: &MemoryStore) -> App<MemoryStore, MemoryStore> {
        App::new(UserId(7), store.clone(), store.clone(), Settings::default())
    }

    fn seeded(notified: bool) -> MemoryStore {
        let store = MemoryStore::with_tickers(["AAPL", "MSFT"]);
        store.insert(Alert {
            id: AlertId(42),
            ticker: "AAPL".to_string(),
            limit_price: 150.0,
            direction: Direction::Up,
            user_id: UserId(7),
            is_notified: notified,
            created_at: None,
        });
        store
    }

    #[tokio::test]
    async fn test_create_sets_success_notice_and_refetches() {
        let store = MemoryStore::with_tickers(["AAPL"]);
        let mut app = app(&store);

        let alert = app
            .create(&AlertForm::new("aapl", "150", Direction::Up))
            .await
            .unwrap();

        assert_eq!(alert.ticker, "AAPL");
        assert_eq!(app.list.len(), 1);
        assert_eq!(store.calls().list, 1);
        assert_eq!(
            app.notice,
            Some(Notice::new(NoticeLevel::Success, "Alert created!"))
        );
    }

    #[tokio::test]
    async fn test_store_failure_names_action_and_keeps_list() {
        let store = seeded(false);
        let mut app = app(&store);
        app.refresh().await;

        // validator caches AAPL before the store goes down
        app.create(&AlertForm::new("AAPL", "10", Direction::Down)).await.unwrap();
        store.set_offline(true);

        let err = app
            .create(&AlertForm::new("AAPL", "12", Direction::Down))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to create alert.");
        assert_eq!(app.list.len(), 2);
        assert_eq!(app.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[tokio::test]
    async fn test_reset_on_armed_alert_is_rejected_locally() {
        let store = seeded(false);
        let mut app = app(&store);
        app.refresh().await;

        let err = app.reset(AlertId(42)).await.unwrap_err();
        assert!(matches!(err, AlertError::Lifecycle(_)));
        assert_eq!(store.calls().reset, 0);
    }

    #[tokio::test]
    async fn test_edit_preserves_notified_flag() {
        let store = seeded(true);
        let mut app = app(&store);
        app.refresh().await;

        let mut form = EditForm::from_alert(app.list.get(AlertId(42)).unwrap());
        form.fields.limit_price = "175.5".to_string();
        let updated = app.edit(AlertId(42), &form).await.unwrap();

        assert!(updated.is_notified);
        assert_eq!(updated.limit_price, 175.5);
        assert_eq!(updated.id, AlertId(42));
        assert_eq!(app.notice.as_ref().unwrap().message, "Alert updated!");
    }

    #[tokio::test]
    async fn test_edit_can_rearm_explicitly() {
        let store = seeded(true);
        let mut app = app(&store);
        app.refresh().await;

        let mut form = EditForm::from_alert(app.list.get(AlertId(42)).unwrap());
        form.notified = Some(false);
        let updated = app.edit(AlertId(42), &form).await.unwrap();
        assert!(!updated.is_notified);
    }

    #[tokio::test]
    async fn test_unlisted_alert_is_unknown() {
        let store = seeded(true);
        let mut app = app(&store);

        let err = app.reset(AlertId(42)).await.unwrap_err();
        assert!(matches!(err, AlertError::UnknownAlert(AlertId(42))));
        assert_eq!(store.calls().mutations(), 0);
    }

    #[tokio::test]
    async fn test_refresh_announces_triggered_alerts() {
        let store = seeded(false);
        let mut app = app(&store);
        app.refresh().await;
        assert!(app.notice.is_none());

        store.observe_price("AAPL", 151.0);
        app.refresh().await;
        assert_eq!(
            app.notice,
            Some(Notice::new(NoticeLevel::Info, "Alert triggered: AAPL"))
        );
    }

    #[tokio::test]
    async fn test_pending_delete_flow() {
        let store = seeded(false);
        let mut app = app(&store);
        app.refresh().await;

        app.request_delete();
        assert_eq!(app.pending_delete, Some(AlertId(42)));
        let outcome = app.answer_delete(false).await.unwrap().unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert!(app.pending_delete.is_none());
        assert_eq!(store.calls().delete, 0);

        app.request_delete();
        let outcome = app.answer_delete(true).await.unwrap().unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(app.list.is_empty());
    }

    #[tokio::test]
    async fn test_open_selected_shows_route() {
        let store = seeded(false);
        let mut app = app(&store);
        app.refresh().await;

        app.open_selected();
        assert_eq!(app.notice.unwrap().message, "/dashboard?ticker=AAPL");
    }

    #[test]
    fn test_clamp_interval() {
        assert_eq!(clamp_interval(0.2), Duration::from_secs(1));
        assert_eq!(clamp_interval(f64::NAN), Duration::from_secs(1));
        assert_eq!(clamp_interval(2.5), Duration::from_millis(2500));
        assert_eq!(clamp_interval(1e300), Duration::MAX);
        assert_eq!(clamp_interval(f64::INFINITY), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_date_format_falls_back_to_default() {
        let mut config = Config::default();
        config.display.date_format = "%d/%m %Q".to_string();
        assert_eq!(Settings::from_config(&config).date_format, DEFAULT_DATE_FORMAT);

        config.display.date_format = "%d/%m".to_string();
        assert_eq!(Settings::from_config(&config).date_format, "%d/%m");
    }

    #[tokio::test]
    async fn test_trigger_before_mutation_is_still_announced() {
        let store = seeded(false);
        store.insert(Alert {
            id: AlertId(43),
            ticker: "MSFT".to_string(),
            limit_price: 300.0,
            direction: Direction::Down,
            user_id: UserId(7),
            is_notified: false,
            created_at: None,
        });
        let mut app = app(&store);
        app.refresh().await;

        store.observe_price("AAPL", 151.0);
        app.delete(AlertId(43), |_| true).await.unwrap();
        assert_eq!(
            app.notice,
            Some(Notice::new(NoticeLevel::Success, "Alert has been deleted."))
        );

        assert_eq!(app.refresh().await, vec![AlertId(42)]);
        assert_eq!(
            app.notice,
            Some(Notice::new(NoticeLevel::Info, "Alert triggered: AAPL"))
        );
        assert!(app.refresh().await.is_empty());
    }

    #[tokio::test]
    async fn test_only_polling_refreshes_count_iterations() {
        let store = seeded(true);
        let mut app = app(&store);
        app.refresh().await;

        app.reset(AlertId(42)).await.unwrap();
        app.create(&AlertForm::new("MSFT", "10", Direction::Down))
            .await
            .unwrap();
        assert_eq!(app.iteration, 1);
        assert_eq!(store.calls().list, 3);

        app.refresh().await;
        assert_eq!(app.iteration, 2);
    }

    #[test]
    fn test_should_quit_after_max_iterations() {
        let store = MemoryStore::new();
        let mut app = app(&store);
        app.settings.max_iterations = 2;
        app.iteration = 1;
        assert!(!app.should_quit());
        app.iteration = 2;
        assert!(app.should_quit());
    }
}
