//! Domain model for the weather document returned by WeatherAPI.com's
//! `forecast.json` endpoint.
//!
//! Every field is optional: the upstream API omits fields freely, and an
//! absent field must survive a cache round trip as "absent", not as zero.
//! Decoding a document is all-or-nothing; a type mismatch anywhere fails
//! the whole document.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub name: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub tz_id: Option<String>,
    pub localtime_epoch: Option<i64>,
    pub localtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Condition {
    pub text: Option<String>,
    pub icon: Option<String>,
    pub code: Option<i32>,
}

/// Conditions at one point in time. Used both for the `current` block and
/// for the hourly entries inside a forecast day (the API gives them the
/// same shape).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Current {
    pub last_updated_epoch: Option<i64>,
    pub last_updated: Option<String>,
    pub temp_c: Option<f64>,
    pub temp_f: Option<f64>,
    pub is_day: Option<i32>,
    pub condition: Option<Condition>,
    pub wind_mph: Option<f64>,
    pub wind_kph: Option<f64>,
    pub wind_degree: Option<i32>,
    pub wind_dir: Option<String>,
    pub pressure_mb: Option<f64>,
    pub pressure_in: Option<f64>,
    pub precip_mm: Option<f64>,
    pub precip_in: Option<f64>,
    pub humidity: Option<i32>,
    pub cloud: Option<i32>,
    pub feelslike_c: Option<f64>,
    pub feelslike_f: Option<f64>,
    pub windchill_c: Option<f64>,
    pub windchill_f: Option<f64>,
    pub heatindex_c: Option<f64>,
    pub heatindex_f: Option<f64>,
    pub dewpoint_c: Option<f64>,
    pub dewpoint_f: Option<f64>,
    pub vis_km: Option<f64>,
    pub vis_miles: Option<f64>,
    pub uv: Option<f64>,
    pub gust_mph: Option<f64>,
    pub gust_kph: Option<f64>,
}

/// Aggregated statistics for one forecast day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Day {
    pub maxtemp_c: Option<f64>,
    pub maxtemp_f: Option<f64>,
    pub mintemp_c: Option<f64>,
    pub mintemp_f: Option<f64>,
    pub avgtemp_c: Option<f64>,
    pub avgtemp_f: Option<f64>,
    pub maxwind_mph: Option<f64>,
    pub maxwind_kph: Option<f64>,
    pub totalprecip_mm: Option<f64>,
    pub totalprecip_in: Option<f64>,
    pub totalsnow_cm: Option<f64>,
    pub avgvis_km: Option<f64>,
    pub avgvis_miles: Option<f64>,
    pub avghumidity: Option<i32>,
    pub daily_will_it_rain: Option<i32>,
    pub daily_chance_of_rain: Option<i32>,
    pub daily_will_it_snow: Option<i32>,
    pub daily_chance_of_snow: Option<i32>,
    pub condition: Option<Condition>,
    pub uv: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
    pub moonrise: Option<String>,
    pub moonset: Option<String>,
    pub moon_phase: Option<String>,
    pub moon_illumination: Option<i32>,
    pub is_moon_up: Option<i32>,
    pub is_sun_up: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: Option<String>,
    pub date_epoch: Option<i64>,
    pub day: Option<Day>,
    pub astro: Option<Astro>,
    /// One entry per hour of the day, in order.
    pub hour: Option<Vec<Current>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub forecastday: Option<Vec<ForecastDay>>,
}

/// Full weather payload for one city: identity, current conditions and the
/// multi-day forecast.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherDocument {
    pub location: Option<Location>,
    pub current: Option<Current>,
    pub forecast: Option<Forecast>,
}
