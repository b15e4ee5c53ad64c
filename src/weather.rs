//! Weather lookups (wttr.in) and timezone-aware clock answers

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{Error, Result};

const WTTR_BASE_URL: &str = "https://wttr.in";

/// Condition, temperature, humidity, wind
const WTTR_FORMAT: &str = "%C+%t+%h+%w";

const WEATHER_TIMEOUT: Duration = Duration::from_secs(5);

/// Weather boundary
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Spoken weather summary for `city`; failures become an apology
    async fn get_weather(&self, city: &str) -> String;
}

/// [`WeatherService`] backed by wttr.in (no API key needed)
pub struct WttrWeather {
    client: reqwest::Client,
    base_url: String,
}

impl WttrWeather {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(WEATHER_TIMEOUT).build()?,
            base_url: WTTR_BASE_URL.to_string(),
        })
    }

    async fn fetch(&self, city: &str) -> Result<String> {
        let url = format!(
            "{}/{}?format={WTTR_FORMAT}",
            self.base_url,
            urlencoding::encode(city)
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Weather(format!("wttr.in returned {status}")));
        }
        Ok(response.text().await?.trim().to_string())
    }
}

#[async_trait]
impl WeatherService for WttrWeather {
    async fn get_weather(&self, city: &str) -> String {
        match self.fetch(city).await {
            Ok(report) => describe_weather(city, &report),
            Err(Error::Weather(e)) => {
                tracing::warn!(city, error = %e, "weather lookup rejected");
                format!("Sorry, I couldn't get weather for {city}")
            }
            Err(e) => {
                tracing::warn!(city, error = %e, "weather lookup failed");
                "Sorry, I couldn't fetch the weather right now".to_string()
            }
        }
    }
}

/// Turn a one-line wttr.in report into a spoken sentence
///
/// The condition may span several words; temperature, humidity and wind are
/// always the last three fields.
#[must_use]
pub fn describe_weather(city: &str, report: &str) -> String {
    let fields: Vec<&str> = report.split_whitespace().collect();
    let (condition, temperature) = match fields.len() {
        0 | 1 => return format!("Current weather in {city}: {report}"),
        2 | 3 => (fields[0].to_string(), fields[1]),
        n => (fields[..n - 3].join(" "), fields[n - 3]),
    };
    format!("In {city}, it's {condition} with {temperature}")
}

/// Timezone-aware time and date answers
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    timezone: Tz,
}

impl Clock {
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    /// e.g. "09:05 PM"
    #[must_use]
    pub fn current_time(&self) -> String {
        format_time(self.now())
    }

    /// e.g. "Friday, March 14, 2025"
    #[must_use]
    pub fn current_date(&self) -> String {
        format_date(self.now())
    }

    /// e.g. "Friday"
    #[must_use]
    pub fn day_of_week(&self) -> String {
        format_weekday(self.now())
    }
}

#[must_use]
pub fn format_time(at: DateTime<Tz>) -> String {
    at.format("%I:%M %p").to_string()
}

#[must_use]
pub fn format_date(at: DateTime<Tz>) -> String {
    at.format("%A, %B %d, %Y").to_string()
}

#[must_use]
pub fn format_weekday(at: DateTime<Tz>) -> String {
    at.format("%A").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_describe_single_word_condition() {
        assert_eq!(
            describe_weather("Karachi", "Sunny +31°C 40% →13km/h"),
            "In Karachi, it's Sunny with +31°C"
        );
    }

    #[test]
    fn test_describe_multi_word_condition() {
        assert_eq!(
            describe_weather("Lahore", "Partly cloudy +25°C 65% ↗11km/h"),
            "In Lahore, it's Partly cloudy with +25°C"
        );
    }

    #[test]
    fn test_describe_unexpected_report() {
        assert_eq!(
            describe_weather("Quetta", "Unknown"),
            "Current weather in Quetta: Unknown"
        );
    }

    #[test]
    fn test_clock_formats() {
        let at = Tz::Asia__Karachi.with_ymd_and_hms(2025, 3, 14, 7, 30, 0).unwrap();
        assert_eq!(format_time(at), "07:30 AM");
        assert_eq!(format_date(at), "Friday, March 14, 2025");
        assert_eq!(format_weekday(at), "Friday");
    }

    #[test]
    fn test_clock_respects_timezone() {
        let utc_noon = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let karachi = utc_noon.with_timezone(&Tz::Asia__Karachi);
        assert_eq!(format_time(karachi), "05:00 PM");
    }
}
