//! Alert form validation and ticker existence checks.

use crate::error::ValidationError;
use crate::models::Direction;
use crate::store::TickerLookup;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Raw user input for creating or editing an alert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertForm {
    pub ticker: String,
    /// Unparsed price text as typed by the user
    pub limit_price: String,
    pub direction: Option<Direction>,
}

impl AlertForm {
    pub fn new(ticker: impl Into<String>, limit_price: impl Into<String>, direction: Direction) -> Self {
        Self {
            ticker: ticker.into(),
            limit_price: limit_price.into(),
            direction: Some(direction),
        }
    }
}

/// Input that passed the synchronous checks.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertInput {
    /// Trimmed, uppercase, non-empty
    pub ticker: String,
    /// Finite and strictly positive
    pub limit_price: f64,
    pub direction: Direction,
}

/// Check the form fields in display order: ticker, price, direction.
pub fn validate_form(form: &AlertForm) -> Result<AlertInput, ValidationError> {
    let ticker = form.ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(ValidationError::EmptyTicker);
    }

    let limit_price = parse_price(&form.limit_price).ok_or(ValidationError::InvalidPrice)?;

    let direction = form.direction.ok_or(ValidationError::MissingDirection)?;

    Ok(AlertInput {
        ticker,
        limit_price,
        direction,
    })
}

fn parse_price(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price > 0.0)
}

/// Confirms symbols against the ticker registry, remembering definite answers.
pub struct TickerValidator<L> {
    lookup: L,
    known: HashMap<String, bool>,
}

impl<L> TickerValidator<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            known: HashMap::new(),
        }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }
}

impl<L: TickerLookup> TickerValidator<L> {
    /// Whether `symbol` is a recognized instrument. Lookup failures count as
    /// unknown and are not remembered.
    pub async fn is_known(&mut self, symbol: &str) -> bool {
        if let Some(&known) = self.known.get(symbol) {
            return known;
        }

        match self.lookup.find_by_symbol(symbol).await {
            Ok(found) => {
                let known = found.is_some();
                debug!(symbol, known, "ticker lookup");
                self.known.insert(symbol.to_string(), known);
                known
            }
            Err(e) => {
                warn!(symbol, error = %e, "ticker lookup failed");
                false
            }
        }
    }

    /// Full gate for create and edit: field checks, then registry lookup.
    pub async fn check(&mut self, form: &AlertForm) -> Result<AlertInput, ValidationError> {
        let input = validate_form(form)?;
        if !self.is_known(&input.ticker).await {
            return Err(ValidationError::UnknownTicker(input.ticker));
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_validate_form_normalizes_ticker() {
        let input = validate_form(&AlertForm::new("  aapl ", "150.00", Direction::Up)).unwrap();
        assert_eq!(input.ticker, "AAPL");
        assert_eq!(input.limit_price, 150.0);
    }

    #[test]
    fn test_validate_form_rejects_bad_prices() {
        for price in ["", "abc", "0", "-5", "NaN", "inf"] {
            let err = validate_form(&AlertForm::new("AAPL", price, Direction::Up)).unwrap_err();
            assert_eq!(err, ValidationError::InvalidPrice, "price {price:?}");
        }
    }

    #[test]
    fn test_validate_form_check_order() {
        let form = AlertForm {
            ticker: " ".to_string(),
            limit_price: "-1".to_string(),
            direction: None,
        };
        assert_eq!(validate_form(&form), Err(ValidationError::EmptyTicker));

        let form = AlertForm {
            ticker: "AAPL".to_string(),
            limit_price: "10".to_string(),
            direction: None,
        };
        assert_eq!(validate_form(&form), Err(ValidationError::MissingDirection));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_rejected() {
        let mut validator = TickerValidator::new(MemoryStore::with_tickers(["AAPL"]));
        let err = validator
            .check(&AlertForm::new("ZZZZ9", "10", Direction::Up))
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownTicker("ZZZZ9".to_string()));
    }

    #[tokio::test]
    async fn test_lookup_results_are_cached() {
        let store = MemoryStore::with_tickers(["AAPL"]);
        let mut validator = TickerValidator::new(store.clone());

        assert!(validator.is_known("AAPL").await);
        assert!(validator.is_known("AAPL").await);
        assert!(!validator.is_known("NOPE").await);
        assert!(!validator.is_known("NOPE").await);
        assert_eq!(store.calls().lookup, 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_false_and_is_retried() {
        let store = MemoryStore::with_tickers(["AAPL"]);
        let mut validator = TickerValidator::new(store.clone());

        store.set_offline(true);
        assert!(!validator.is_known("AAPL").await);

        store.set_offline(false);
        assert!(validator.is_known("AAPL").await);
        assert_eq!(store.calls().lookup, 2);
    }

    #[tokio::test]
    async fn test_invalid_price_skips_lookup() {
        let store = MemoryStore::with_tickers(["AAPL"]);
        let mut validator = TickerValidator::new(store.clone());

        assert!(validator.check(&AlertForm::new("AAPL", "-5", Direction::Up)).await.is_err());
        assert_eq!(store.calls().lookup, 0);
    }
}
