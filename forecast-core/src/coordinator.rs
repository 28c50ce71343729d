//! Decides where a requested city's weather comes from: memory, the local
//! cache, or the network.

use tokio::sync::watch;

use crate::fetcher::WeatherFetcher;
use crate::model::WeatherDocument;
use crate::store::WeatherStore;

/// Snapshot of the coordinator's observable state, pushed to subscribers
/// whenever it changes.
#[derive(Debug, Clone, Default)]
pub struct ForecastState {
    pub document: Option<WeatherDocument>,
    pub error: Option<String>,
}

/// Owns the store and fetcher and serves weather requests.
///
/// Precedence is memory, then cache, then network. A cached record is
/// always preferred over a fresh fetch, however old it is; there is no TTL
/// and no refresh. Callers wanting a new fetch for a cached city must
/// clear the cache themselves.
#[derive(Debug)]
pub struct ForecastCoordinator {
    store: Box<dyn WeatherStore>,
    fetcher: Box<dyn WeatherFetcher>,
    current_city: Option<String>,
    last_document: Option<WeatherDocument>,
    last_error: Option<String>,
    state_tx: watch::Sender<ForecastState>,
}

impl ForecastCoordinator {
    pub fn new(store: Box<dyn WeatherStore>, fetcher: Box<dyn WeatherFetcher>) -> Self {
        let (state_tx, _) = watch::channel(ForecastState::default());
        Self {
            store,
            fetcher,
            current_city: None,
            last_document: None,
            last_error: None,
            state_tx,
        }
    }

    /// Resolve weather for `city` and update the observable state.
    ///
    /// Fetch failures land in `last_error` and leave the previous document
    /// in place. Store failures are logged and swallowed: a broken cache
    /// never blocks serving a freshly fetched document, and a failed
    /// lookup falls through to the network.
    pub async fn request_weather(&mut self, city: &str) {
        // Same city and a document already in memory: nothing to do.
        if self.current_city.as_deref() == Some(city) && self.last_document.is_some() {
            return;
        }

        self.current_city = Some(city.to_string());

        match self.store.lookup(city) {
            Ok(Some(record)) => {
                tracing::debug!(city, "serving weather from cache");
                self.last_document = Some(record.into_document());
                self.last_error = None;
                self.publish();
                return;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(city, "cache lookup failed: {err}");
            }
        }

        match self.fetcher.fetch(city).await {
            Ok(document) => {
                tracing::debug!(city, "fetched weather from network");
                self.last_document = Some(document.clone());
                self.last_error = None;
                if let Err(err) = self.store.upsert(city, &document) {
                    tracing::warn!(city, "failed to cache weather: {err}");
                }
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
            }
        }

        self.publish();
    }

    /// Watch the coordinator's state; the receiver yields a fresh
    /// [`ForecastState`] on every change.
    pub fn subscribe(&self) -> watch::Receiver<ForecastState> {
        self.state_tx.subscribe()
    }

    pub fn current_city(&self) -> Option<&str> {
        self.current_city.as_deref()
    }

    pub fn last_document(&self) -> Option<&WeatherDocument> {
        self.last_document.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn publish(&self) {
        self.state_tx.send_replace(ForecastState {
            document: self.last_document.clone(),
            error: self.last_error.clone(),
        });
    }
}
