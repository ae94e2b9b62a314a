//! Public-holiday lookup against the Calendarific API.

use cakeday_core::config::HolidayConfig;
use cakeday_core::error::{CakedayError, Result};
use chrono::{Datelike, NaiveDate};

/// How much of the calendar a lookup covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayScope {
    Today,
    Month,
    Year,
}

impl HolidayScope {
    /// `"Today"` and `"Month"` narrow the lookup; anything else means the year.
    pub fn from_request(data: Option<&str>) -> Self {
        match data {
            Some("Today") => Self::Today,
            Some("Month") => Self::Month,
            _ => Self::Year,
        }
    }
}

pub struct HolidayClient {
    client: reqwest::Client,
    api_key: String,
    country: String,
    api_url: String,
}

impl HolidayClient {
    /// `None` when no API key is configured.
    pub fn from_config(config: &HolidayConfig) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty())?;
        Some(Self {
            client: reqwest::Client::new(),
            api_key,
            country: config.country.clone(),
            api_url: config.api_url.clone(),
        })
    }

    pub fn query(&self, scope: HolidayScope, today: NaiveDate) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("country", self.country.clone()),
            ("year", today.year().to_string()),
        ];
        if matches!(scope, HolidayScope::Today | HolidayScope::Month) {
            params.push(("month", today.month().to_string()));
        }
        if scope == HolidayScope::Today {
            params.push(("day", today.day().to_string()));
        }
        params
    }

    pub async fn fetch(&self, scope: HolidayScope, today: NaiveDate) -> Result<Vec<serde_json::Value>> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(&self.query(scope, today))
            .send()
            .await
            .map_err(|e| CakedayError::Http(format!("Holiday lookup failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CakedayError::Http(format!("Holiday API {status}: {text}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CakedayError::Http(format!("Bad holiday response: {e}")))?;
        Ok(extract_holidays(&json))
    }
}

/// Calendarific answers `{"response": {"holidays": [...]}}`, or an empty
/// `response` array when nothing matches.
pub fn extract_holidays(json: &serde_json::Value) -> Vec<serde_json::Value> {
    json["response"]["holidays"].as_array().cloned().unwrap_or_default()
}
