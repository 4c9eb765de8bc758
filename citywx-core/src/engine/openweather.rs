//! OpenWeather endpoints and their wire formats.

use reqwest::Url;
use serde::Deserialize;

use crate::{
    error::{FetchError, FetchOutcome},
    model::{ConditionDetail, WeatherReading},
};

/// Fixed unit system; temperatures come back in Fahrenheit.
pub const UNITS: &str = "imperial";

/// The reverse geocoder is only ever asked for its best match.
pub const REVERSE_LIMIT: u32 = 1;

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<ConditionDetail>,
}

impl OwCurrentResponse {
    pub(crate) fn into_reading(self, city: &str) -> WeatherReading {
        WeatherReading {
            city: city.to_string(),
            temperature: self.main.temp,
            humidity_percent: self.main.humidity,
            conditions: self.weather,
        }
    }
}

pub(crate) fn weather_by_name_url(base: &str, city: &str, api_key: &str) -> FetchOutcome<Url> {
    let raw = format!(
        "{}/data/2.5/weather?q={}&appid={}&units={UNITS}",
        base.trim_end_matches('/'),
        urlencoding::encode(city),
        urlencoding::encode(api_key),
    );
    parse(&raw)
}

pub(crate) fn reverse_geocode_url(
    base: &str,
    latitude: f64,
    longitude: f64,
    api_key: &str,
) -> FetchOutcome<Url> {
    let raw = format!(
        "{}/geo/1.0/reverse?lat={latitude}&lon={longitude}&limit={REVERSE_LIMIT}&appid={}",
        base.trim_end_matches('/'),
        urlencoding::encode(api_key),
    );
    parse(&raw)
}

pub(crate) fn icon_url(base: &str, icon_id: &str) -> FetchOutcome<Url> {
    let raw = format!(
        "{}/img/wn/{}@2x.png",
        base.trim_end_matches('/'),
        urlencoding::encode(icon_id),
    );
    parse(&raw)
}

fn parse(raw: &str) -> FetchOutcome<Url> {
    let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl(format!("{e}: {raw}")))?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(FetchError::InvalidUrl(format!("missing host: {raw}")));
    }
    Ok(url)
}
