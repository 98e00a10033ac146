//! Weather lookup and clothing suggestions.
//!
//! Fetches current conditions from the hosted weather API (temperatures
//! arrive in Kelvin and are converted to Celsius locally), then asks the
//! completion API what to wear.

use serde::Serialize;

use crate::completion::CompletionClient;
use crate::config::Config;
use crate::error::PipelineError;
use crate::models::ChatMessage;

/// Current conditions for a location, temperatures in Celsius.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub location: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
}

/// Convert Kelvin to Celsius, rounded to two decimals.
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    ((kelvin - 273.15) * 100.0).round() / 100.0
}

/// Keep only the city part of "City, Region" inputs.
pub fn normalize_location(location: &str) -> String {
    match location.split_once(',') {
        Some((city, _)) => city.trim().to_string(),
        None => location.trim().to_string(),
    }
}

/// Fetch current weather for `location`. Requires `OPENWEATHER_API_KEY`
/// in the environment.
pub async fn current_weather(config: &Config, location: &str) -> Result<WeatherReport, PipelineError> {
    let api_key = std::env::var("OPENWEATHER_API_KEY").map_err(|_| {
        PipelineError::Upstream("OPENWEATHER_API_KEY environment variable not set".to_string())
    })?;

    let location = normalize_location(location);

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.weather.timeout_secs))
        .build()
        .map_err(|e| PipelineError::Upstream(e.to_string()))?;

    let resp = http
        .get(&config.weather.url)
        .query(&[("q", location.as_str()), ("appid", api_key.as_str())])
        .send()
        .await
        .map_err(|e| PipelineError::Transient(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(PipelineError::Upstream(format!(
            "Failed to get weather data for {} ({}). Please check the location name and try again.",
            location, status
        )));
    }

    let json: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| PipelineError::Upstream(e.to_string()))?;

    parse_weather_response(&location, &json)
}

fn parse_weather_response(
    location: &str,
    json: &serde_json::Value,
) -> Result<WeatherReport, PipelineError> {
    let main = json
        .get("main")
        .ok_or_else(|| PipelineError::Upstream("weather response missing 'main'".to_string()))?;

    let field = |name: &str| -> Result<f64, PipelineError> {
        main.get(name).and_then(|v| v.as_f64()).ok_or_else(|| {
            PipelineError::Upstream(format!("weather response missing 'main.{}'", name))
        })
    };

    Ok(WeatherReport {
        location: location.to_string(),
        temperature: kelvin_to_celsius(field("temp")?),
        feels_like: kelvin_to_celsius(field("feels_like")?),
        temp_min: kelvin_to_celsius(field("temp_min")?),
        temp_max: kelvin_to_celsius(field("temp_max")?),
        humidity: field("humidity")?,
    })
}

/// Prompt sent to the completion API for a clothing suggestion.
pub fn build_clothing_prompt(report: &WeatherReport) -> String {
    format!(
        "The current weather in {} is as follows:\n\
         Temperature: {}°C\n\
         Feels like: {}°C\n\
         Minimum Temperature: {}°C\n\
         Maximum Temperature: {}°C\n\
         Humidity: {}%\n\
         Based on this weather, what type of clothing would you suggest wearing today?",
        report.location,
        report.temperature,
        report.feels_like,
        report.temp_min,
        report.temp_max,
        report.humidity
    )
}

/// Ask the completion API what to wear for the given conditions.
pub async fn suggest_clothing(
    config: &Config,
    report: &WeatherReport,
) -> Result<String, PipelineError> {
    let completer = CompletionClient::new(&config.chat)
        .map_err(|e| PipelineError::Upstream(e.to_string()))?;

    let messages = vec![
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user(build_clothing_prompt(report)),
    ];

    completer.complete(&messages, None).await
}
