//! Request/response engine.
//!
//! The engine turns a city name or a pair of coordinates into a
//! [`WeatherReading`] and publishes the outcome through two observable slots.
//! Every operation is fire-and-forget: it is spawned on the tokio runtime and
//! the returned handle may be awaited or dropped.
//!
//! Each operation takes a generation token when it is issued. Only the most
//! recently issued operation may publish, so a slow response can never
//! overwrite the result of a newer request.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use anyhow::anyhow;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    config::{API_KEY_ENV, Config},
    error::{FetchError, FetchOutcome},
    model::{GeoPlace, WeatherReading},
    observable::{SequenceClock, Slot},
    transport::{HttpTransport, redacted},
};

pub mod openweather;

use openweather::{OwCurrentResponse, reverse_geocode_url, weather_by_name_url};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub api_key: String,
    pub base_url: String,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `citywx configure` or set {API_KEY_ENV}."
            )
        })?;

        Ok(Self { api_key: api_key.to_owned(), base_url: config.base_url.clone() })
    }
}

/// The two slots observers watch. Both share one sequence clock so their
/// writes can be ordered against each other.
#[derive(Debug)]
pub struct ObservableState {
    pub weather: Slot<WeatherReading>,
    pub error: Slot<String>,
}

impl ObservableState {
    fn new() -> Self {
        let clock = SequenceClock::new();
        Self { weather: Slot::new(clock.clone()), error: Slot::new(clock) }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherEngine {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    settings: EngineSettings,
    transport: Arc<dyn HttpTransport>,
    state: ObservableState,
    generation: AtomicU64,
    publish: Mutex<()>,
}

impl WeatherEngine {
    pub fn new(settings: EngineSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                transport,
                state: ObservableState::new(),
                generation: AtomicU64::new(0),
                publish: Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> &ObservableState {
        &self.inner.state
    }

    pub fn weather(&self) -> &Slot<WeatherReading> {
        &self.inner.state.weather
    }

    pub fn error(&self) -> &Slot<String> {
        &self.inner.state.error
    }

    /// Fetch current weather for `city` and publish the outcome.
    pub fn fetch_weather_by_city(&self, city: &str) -> JoinHandle<()> {
        let token = self.next_generation();
        let engine = self.clone();
        let city = city.to_owned();

        tokio::spawn(async move { engine.run_weather_fetch(token, city).await })
    }

    /// Resolve the nearest place to the coordinates, then fetch its weather.
    pub fn resolve_city_from_coordinates(&self, latitude: f64, longitude: f64) -> JoinHandle<()> {
        let token = self.next_generation();
        let engine = self.clone();

        tokio::spawn(async move { engine.run_reverse_lookup(token, latitude, longitude).await })
    }

    /// Fetch and decode without touching the observable state.
    pub async fn load_weather(&self, city: &str) -> FetchOutcome<WeatherReading> {
        let city = city.trim();
        if city.is_empty() {
            return Err(FetchError::EmptyInput);
        }

        let settings = &self.inner.settings;
        let url = weather_by_name_url(&settings.base_url, city, &settings.api_key)?;
        let payload: OwCurrentResponse = self.execute(&url).await?;

        Ok(payload.into_reading(city))
    }

    /// Reverse-geocode without touching the observable state.
    pub async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> FetchOutcome<Vec<GeoPlace>> {
        if !valid_coordinates(latitude, longitude) {
            return Err(FetchError::InvalidCoordinates { latitude, longitude });
        }

        let settings = &self.inner.settings;
        let url = reverse_geocode_url(&settings.base_url, latitude, longitude, &settings.api_key)?;
        self.execute(&url).await
    }

    async fn run_weather_fetch(&self, token: u64, city: String) {
        let outcome = self.load_weather(&city).await;
        self.publish(token, outcome);
    }

    async fn run_reverse_lookup(&self, token: u64, latitude: f64, longitude: f64) {
        let place = match self.reverse_geocode(latitude, longitude).await {
            Ok(places) => places.into_iter().next(),
            Err(err) => return self.publish(token, Err(err)),
        };

        let Some(place) = place else {
            return self.publish(token, Err(FetchError::NoResult { latitude, longitude }));
        };

        if !self.is_current(token) {
            debug!(token, place = %place.name, "superseded before chaining weather fetch");
            return;
        }

        info!(latitude, longitude, place = %place.name, "resolved coordinates");
        self.run_weather_fetch(token, place.name).await;
    }

    async fn execute<T: DeserializeOwned>(&self, url: &Url) -> FetchOutcome<T> {
        debug!(url = %redacted(url), "GET");
        let body = self.inner.transport.get(url).await?.into_checked_body()?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn publish(&self, token: u64, outcome: FetchOutcome<WeatherReading>) {
        let _guard = self.inner.publish.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.is_current(token) {
            debug!(token, latest = self.latest_generation(), "dropping stale outcome");
            return;
        }

        let state = &self.inner.state;
        match outcome {
            Ok(reading) => {
                info!(city = %reading.city, temperature = reading.temperature, "weather updated");
                state.error.clear_quiet();
                state.weather.set(reading);
            }
            Err(err) => {
                warn!(error = %err, "weather request failed");
                state.error.set(err.user_message());
            }
        }
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn latest_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, token: u64) -> bool {
        self.latest_generation() == token
    }
}

fn valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}
