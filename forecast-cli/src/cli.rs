use anyhow::Context;
use clap::{Parser, Subcommand};

use forecast_core::{
    Config, Current, ForecastCoordinator, SqliteWeatherStore, WeatherApiFetcher, WeatherDocument,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather forecast CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the WeatherAPI.com credential.
    Configure,

    /// Show current weather and the forecast for a city.
    Show {
        /// City name, e.g. "London". The lookup key is exact, including case.
        city: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city } => show(&city).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Text::new("WeatherAPI.com API key:")
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(city: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let api_key = config.require_api_key()?.to_string();

    let store = SqliteWeatherStore::new(Config::data_file_path()?)?;
    let fetcher = WeatherApiFetcher::new(api_key);
    let mut coordinator = ForecastCoordinator::new(Box::new(store), Box::new(fetcher));

    coordinator.request_weather(city).await;

    if let Some(err) = coordinator.last_error() {
        anyhow::bail!("{err}");
    }

    match coordinator.last_document() {
        Some(document) => {
            print!("{}", render(document));
            Ok(())
        }
        None => anyhow::bail!("No weather available for {city}"),
    }
}

/// Render a weather document for the terminal.
fn render(document: &WeatherDocument) -> String {
    let mut out = String::new();

    if let Some(location) = &document.location {
        let name = location.name.as_deref().unwrap_or("Unknown location");
        match location.country.as_deref() {
            Some(country) if !country.is_empty() => {
                out.push_str(&format!("{name}, {country}\n"));
            }
            _ => out.push_str(&format!("{name}\n")),
        }
    }

    if let Some(current) = &document.current {
        out.push_str(&format!("  Now: {}\n", describe_conditions(current)));
    }

    let days = document
        .forecast
        .as_ref()
        .and_then(|f| f.forecastday.as_deref())
        .unwrap_or_default();

    for day in days {
        let date = day.date.as_deref().unwrap_or("????-??-??");
        let mut parts = Vec::new();

        if let Some(stats) = &day.day {
            if let (Some(min), Some(max)) = (stats.mintemp_c, stats.maxtemp_c) {
                parts.push(format!("{min:.1} to {max:.1} C"));
            }
            if let Some(text) = stats.condition.as_ref().and_then(|c| c.text.as_deref()) {
                parts.push(text.to_string());
            }
            if let Some(chance) = stats.daily_chance_of_rain {
                parts.push(format!("{chance}% rain"));
            }
        }

        if let Some(astro) = &day.astro {
            if let (Some(sunrise), Some(sunset)) = (&astro.sunrise, &astro.sunset) {
                parts.push(format!("sun {sunrise} to {sunset}"));
            }
        }

        if parts.is_empty() {
            out.push_str(&format!("  {date}\n"));
        } else {
            out.push_str(&format!("  {date}: {}\n", parts.join(", ")));
        }
    }

    out
}

fn describe_conditions(current: &Current) -> String {
    let mut parts = Vec::new();

    if let Some(temp) = current.temp_c {
        match current.feelslike_c {
            Some(feels) => parts.push(format!("{temp:.1} C (feels like {feels:.1} C)")),
            None => parts.push(format!("{temp:.1} C")),
        }
    }
    if let Some(text) = current.condition.as_ref().and_then(|c| c.text.as_deref()) {
        parts.push(text.to_string());
    }
    if let Some(wind) = current.wind_kph {
        match current.wind_dir.as_deref() {
            Some(dir) => parts.push(format!("wind {wind:.1} km/h {dir}")),
            None => parts.push(format!("wind {wind:.1} km/h")),
        }
    }
    if let Some(humidity) = current.humidity {
        parts.push(format!("humidity {humidity}%"));
    }

    if parts.is_empty() { "no data".to_string() } else { parts.join(", ") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::{Condition, Forecast, ForecastDay, Location};

    #[test]
    fn render_includes_location_current_and_forecast() {
        let document = WeatherDocument {
            location: Some(Location {
                name: Some("Lisbon".to_string()),
                country: Some("Portugal".to_string()),
                ..Location::default()
            }),
            current: Some(Current {
                temp_c: Some(21.0),
                feelslike_c: Some(20.5),
                humidity: Some(55),
                wind_kph: Some(9.4),
                condition: Some(Condition { text: Some("Sunny".to_string()), ..Condition::default() }),
                ..Current::default()
            }),
            forecast: Some(Forecast {
                forecastday: Some(vec![ForecastDay {
                    date: Some("2024-09-20".to_string()),
                    ..ForecastDay::default()
                }]),
            }),
        };

        let rendered = render(&document);
        assert!(rendered.contains("Lisbon, Portugal"));
        assert!(rendered.contains("21.0 C"));
        assert!(rendered.contains("Sunny"));
        assert!(rendered.contains("humidity 55%"));
        assert!(rendered.contains("2024-09-20"));
    }

    #[test]
    fn render_copes_with_an_empty_document() {
        let rendered = render(&WeatherDocument::default());
        assert!(rendered.is_empty());
    }

    #[test]
    fn describe_conditions_with_no_fields_says_so() {
        assert_eq!(describe_conditions(&Current::default()), "no data");
    }
}
