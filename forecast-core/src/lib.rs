//! Core library for the `forecast` app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather document model
//! - The cache store and network fetcher adapters
//! - The coordinator deciding memory/cache/network precedence
//!
//! It is used by `forecast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod coordinator;
pub mod fetcher;
pub mod model;
pub mod store;

pub use config::Config;
pub use coordinator::{ForecastCoordinator, ForecastState};
pub use fetcher::{FORECAST_DAYS, FetchError, WeatherApiFetcher, WeatherFetcher};
pub use model::{
    Astro, Condition, Current, Day, Forecast, ForecastDay, Location, WeatherDocument,
};
pub use store::{CacheRecord, SqliteWeatherStore, StoreError, WeatherStore};
