//! SQLite-backed cache of weather documents, one record per city.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::fmt::Debug;
use std::path::Path;
use thiserror::Error;

use crate::model::{Current, Forecast, Location, WeatherDocument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to encode cached weather: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Persisted form of a weather document, keyed by the city name it was
/// requested under. The nested parts are kept whole so nothing is lost on
/// the way back out.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub city: String,
    pub fetched_at: DateTime<Utc>,
    pub location: Option<Location>,
    pub current: Option<Current>,
    pub forecast: Option<Forecast>,
}

impl CacheRecord {
    pub fn from_document(city: &str, document: &WeatherDocument, fetched_at: DateTime<Utc>) -> Self {
        Self {
            city: city.to_string(),
            fetched_at,
            location: document.location.clone(),
            current: document.current.clone(),
            forecast: document.forecast.clone(),
        }
    }

    /// Rebuild the document. A stored record always yields a location with
    /// at least a name, falling back to the cache key.
    pub fn into_document(self) -> WeatherDocument {
        let Self { city, location, current, forecast, .. } = self;
        let location = match location {
            Some(loc) => Location { name: loc.name.or(Some(city)), ..loc },
            None => Location { name: Some(city), ..Location::default() },
        };

        WeatherDocument { location: Some(location), current, forecast }
    }
}

/// Persistence seam for cached weather. Lookup misses are `Ok(None)`, not
/// errors; an upsert fully replaces any prior record for the city.
pub trait WeatherStore: Send + Debug {
    fn lookup(&self, city: &str) -> Result<Option<CacheRecord>, StoreError>;
    fn upsert(&self, city: &str, document: &WeatherDocument) -> Result<(), StoreError>;
}

/// SQLite implementation of [`WeatherStore`].
///
/// `city` is the primary key under the default BINARY collation, so keys
/// are exact and case-sensitive ("Paris" and "paris" are distinct
/// records). The nested document parts live in JSON text columns, which
/// keeps absent fields absent across the round trip.
#[derive(Debug)]
pub struct SqliteWeatherStore {
    conn: Connection,
}

impl SqliteWeatherStore {
    /// Open (or create) the cache database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory cache, used by tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather (
                city TEXT PRIMARY KEY,
                fetched_at INTEGER NOT NULL,
                location TEXT,
                current TEXT,
                forecast TEXT
            );
            "#,
        )?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<(String, i64, Option<String>, Option<String>, Option<String>)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }
}

impl WeatherStore for SqliteWeatherStore {
    fn lookup(&self, city: &str) -> Result<Option<CacheRecord>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT city, fetched_at, location, current, forecast FROM weather WHERE city = ?1",
                params![city],
                Self::row_to_record,
            )
            .optional()?;

        let Some((city, fetched_at_ms, location, current, forecast)) = row else {
            return Ok(None);
        };

        let fetched_at = DateTime::<Utc>::from_timestamp_millis(fetched_at_ms)
            .unwrap_or_else(Utc::now);

        Ok(Some(CacheRecord {
            city,
            fetched_at,
            location: location.as_deref().map(serde_json::from_str).transpose()?,
            current: current.as_deref().map(serde_json::from_str).transpose()?,
            forecast: forecast.as_deref().map(serde_json::from_str).transpose()?,
        }))
    }

    fn upsert(&self, city: &str, document: &WeatherDocument) -> Result<(), StoreError> {
        let location = document.location.as_ref().map(serde_json::to_string).transpose()?;
        let current = document.current.as_ref().map(serde_json::to_string).transpose()?;
        let forecast = document.forecast.as_ref().map(serde_json::to_string).transpose()?;
        let fetched_at_ms = Utc::now().timestamp_millis();

        // Single statement, so readers see either the old record or the new
        // one, never a partial write.
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO weather (city, fetched_at, location, current, forecast)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![city, fetched_at_ms, location, current, forecast],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Astro, Condition, Day, ForecastDay};

    fn sample_document() -> WeatherDocument {
        WeatherDocument {
            location: Some(Location {
                name: Some("Test City".to_string()),
                country: Some("Testland".to_string()),
                ..Location::default()
            }),
            current: Some(Current {
                temp_c: Some(25.0),
                humidity: Some(40),
                wind_kph: Some(12.5),
                condition: Some(Condition {
                    text: Some("Sunny".to_string()),
                    icon: Some("//cdn/113.png".to_string()),
                    code: Some(1000),
                }),
                ..Current::default()
            }),
            forecast: Some(Forecast {
                forecastday: Some(vec![ForecastDay {
                    date: Some("2024-09-20".to_string()),
                    date_epoch: Some(1_726_790_400),
                    day: Some(Day { maxtemp_c: Some(27.0), ..Day::default() }),
                    astro: Some(Astro {
                        sunrise: Some("06:43 AM".to_string()),
                        ..Astro::default()
                    }),
                    hour: Some(vec![Current {
                        temp_c: Some(19.5),
                        humidity: Some(60),
                        condition: Some(Condition {
                            text: Some("Clear".to_string()),
                            ..Condition::default()
                        }),
                        ..Current::default()
                    }]),
                }]),
            }),
        }
    }

    #[test]
    fn lookup_of_missing_city_is_none_not_an_error() {
        let store = SqliteWeatherStore::in_memory().expect("open store");
        let found = store.lookup("Atlantis").expect("lookup should not fail");
        assert!(found.is_none());
    }

    #[test]
    fn upsert_then_lookup_round_trips_every_field() {
        let store = SqliteWeatherStore::in_memory().expect("open store");
        let document = sample_document();

        store.upsert("Test City", &document).expect("upsert");
        let record = store.lookup("Test City").expect("lookup").expect("record present");

        assert_eq!(record.city, "Test City");
        assert_eq!(record.location, document.location);
        assert_eq!(record.current, document.current);
        assert_eq!(record.forecast, document.forecast);

        let restored = record.into_document();
        let current = restored.current.as_ref().expect("current present");
        assert_eq!(current.condition.as_ref().and_then(|c| c.text.as_deref()), Some("Sunny"));
        assert_eq!(current.humidity, Some(40));
        assert_eq!(current.wind_kph, Some(12.5));

        let first_hour = restored
            .forecast
            .as_ref()
            .and_then(|f| f.forecastday.as_ref())
            .and_then(|days| days.first())
            .and_then(|day| day.hour.as_ref())
            .and_then(|hours| hours.first())
            .expect("first hour present");
        assert_eq!(first_hour.temp_c, Some(19.5));
        assert_eq!(first_hour.humidity, Some(60));
    }

    #[test]
    fn absent_fields_stay_absent_after_the_round_trip() {
        let store = SqliteWeatherStore::in_memory().expect("open store");
        let document = WeatherDocument {
            location: Some(Location { name: Some("Sparse".to_string()), ..Location::default() }),
            current: Some(Current { temp_c: Some(10.0), ..Current::default() }),
            forecast: None,
        };

        store.upsert("Sparse", &document).expect("upsert");
        let record = store.lookup("Sparse").expect("lookup").expect("record present");

        let current = record.current.as_ref().expect("current present");
        assert_eq!(current.humidity, None, "humidity must not default to zero");
        assert_eq!(current.wind_kph, None);
        assert!(current.condition.is_none());
        assert!(record.forecast.is_none());
    }

    #[test]
    fn upsert_fully_replaces_a_prior_record() {
        let store = SqliteWeatherStore::in_memory().expect("open store");

        store.upsert("Test City", &sample_document()).expect("first upsert");

        let replacement = WeatherDocument {
            location: Some(Location { name: Some("Test City".to_string()), ..Location::default() }),
            current: Some(Current { temp_c: Some(-3.0), ..Current::default() }),
            forecast: None,
        };
        store.upsert("Test City", &replacement).expect("second upsert");

        let record = store.lookup("Test City").expect("lookup").expect("record present");
        let current = record.current.as_ref().expect("current present");
        assert_eq!(current.temp_c, Some(-3.0));
        assert_eq!(current.humidity, None, "old humidity must not leak through");
        assert!(record.forecast.is_none(), "old forecast must not survive the replace");
    }

    #[test]
    fn city_keys_are_case_sensitive() {
        let store = SqliteWeatherStore::in_memory().expect("open store");
        store.upsert("Paris", &sample_document()).expect("upsert");

        assert!(store.lookup("Paris").expect("lookup").is_some());
        assert!(store.lookup("paris").expect("lookup").is_none());
    }

    #[test]
    fn record_without_location_still_reconstructs_a_name() {
        let record = CacheRecord {
            city: "Nameless".to_string(),
            fetched_at: Utc::now(),
            location: None,
            current: Some(Current { temp_c: Some(7.0), ..Current::default() }),
            forecast: None,
        };

        let document = record.into_document();
        assert_eq!(
            document.location.and_then(|l| l.name),
            Some("Nameless".to_string())
        );
    }

    #[test]
    fn records_survive_reopening_the_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("weather.sqlite3");

        {
            let store = SqliteWeatherStore::new(&path).expect("open store");
            store.upsert("Test City", &sample_document()).expect("upsert");
        }

        let reopened = SqliteWeatherStore::new(&path).expect("reopen store");
        let record = reopened.lookup("Test City").expect("lookup").expect("record present");
        assert_eq!(
            record.current.as_ref().and_then(|c| c.temp_c),
            Some(25.0)
        );
    }
}
