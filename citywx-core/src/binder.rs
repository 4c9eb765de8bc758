//! Display binding.
//!
//! [`DisplayBinder`] observes the engine's slots and keeps a [`DisplayState`]
//! in step with them. It is driven by whichever task owns the presentation:
//! nothing changes until that task calls [`DisplayBinder::next_update`],
//! [`DisplayBinder::drain`] or [`DisplayBinder::settle`].

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    engine::WeatherEngine,
    error::FetchOutcome,
    icon::{Icon, IconLoader},
    model::WeatherReading,
    observable::{Stamped, SubscribeOptions, Subscription},
    prefs::PreferenceStore,
};

pub const EMPTY_CITY_MESSAGE: &str = "Please enter a city.";

/// What the user currently sees. `None` means the field is blank.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    pub temperature: Option<String>,
    pub humidity: Option<String>,
    pub description: Option<String>,
    pub icon: Option<Arc<Icon>>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Local>>,
}

impl DisplayState {
    fn show_weather(&mut self, reading: &WeatherReading) {
        self.temperature = Some(format!("{} °F", reading.temperature));
        self.humidity = Some(format!("Humidity: {}%", reading.humidity_percent));
        self.description = Some(
            reading
                .primary_condition()
                .map(|c| capitalize_words(&c.description))
                .unwrap_or_default(),
        );
        self.error = None;
        self.touch();
    }

    fn show_error(&mut self, message: String) {
        self.temperature = None;
        self.humidity = None;
        self.description = None;
        self.icon = None;
        self.error = Some(message);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Some(Local::now());
    }
}

/// Presents the display state after every applied change.
pub trait Renderer: Send {
    fn render(&mut self, state: &DisplayState);
}

/// Which change [`DisplayBinder::next_update`] applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayUpdate {
    Weather,
    Error,
    Icon,
    IconFailed,
}

#[derive(Debug)]
enum SlotEvent {
    Weather(Stamped<Option<WeatherReading>>),
    Error(Stamped<Option<String>>),
}

impl SlotEvent {
    fn seq(&self) -> u64 {
        match self {
            SlotEvent::Weather(s) => s.seq,
            SlotEvent::Error(s) => s.seq,
        }
    }
}

#[derive(Debug)]
struct IconEvent {
    revision: u64,
    icon_id: String,
    result: FetchOutcome<Arc<Icon>>,
}

enum Wake {
    Slot(SlotEvent),
    Icon(IconEvent),
    Closed,
}

pub struct DisplayBinder<P, R> {
    engine: WeatherEngine,
    icons: IconLoader,
    prefs: P,
    renderer: R,
    weather_rx: Subscription<WeatherReading>,
    error_rx: Subscription<String>,
    icon_tx: mpsc::UnboundedSender<IconEvent>,
    icon_rx: mpsc::UnboundedReceiver<IconEvent>,
    icons_in_flight: usize,
    pending: Vec<SlotEvent>,
    revision: u64,
    state: DisplayState,
}

impl<P: PreferenceStore, R: Renderer> DisplayBinder<P, R> {
    pub fn new(engine: WeatherEngine, icons: IconLoader, prefs: P, renderer: R) -> Self {
        Self::with_options(engine, icons, prefs, renderer, SubscribeOptions::default())
    }

    pub fn with_options(
        engine: WeatherEngine,
        icons: IconLoader,
        prefs: P,
        renderer: R,
        options: SubscribeOptions,
    ) -> Self {
        let weather_rx = engine.weather().subscribe(options);
        let error_rx = engine.error().subscribe(options);
        let (icon_tx, icon_rx) = mpsc::unbounded_channel();

        Self {
            engine,
            icons,
            prefs,
            renderer,
            weather_rx,
            error_rx,
            icon_tx,
            icon_rx,
            icons_in_flight: 0,
            pending: Vec::new(),
            revision: 0,
            state: DisplayState::default(),
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn prefs(&self) -> &P {
        &self.prefs
    }

    pub fn engine(&self) -> &WeatherEngine {
        &self.engine
    }

    /// Re-fetch the last searched city, if one was saved.
    pub fn activate(&mut self) -> Option<JoinHandle<()>> {
        let city = self.prefs.last_searched_city()?;
        debug!(city = %city, "restoring last searched city");
        Some(self.engine.fetch_weather_by_city(&city))
    }

    /// Search for `text`. Blank input is rejected locally.
    pub fn search(&mut self, text: &str) -> Option<JoinHandle<()>> {
        let city = text.trim();
        if city.is_empty() {
            self.reset_with_error(EMPTY_CITY_MESSAGE.to_string());
            return None;
        }
        Some(self.engine.fetch_weather_by_city(city))
    }

    /// A one-shot location fix from the device.
    pub fn location_fix(&mut self, latitude: f64, longitude: f64) -> JoinHandle<()> {
        self.engine.resolve_city_from_coordinates(latitude, longitude)
    }

    /// Wait for and apply the next visible change. `None` once the engine's
    /// slots are gone.
    pub async fn next_update(&mut self) -> Option<DisplayUpdate> {
        loop {
            self.collect_ready_slots();
            if !self.pending.is_empty() {
                let event = self.pending.remove(0);
                if let Some(update) = self.apply_slot(event) {
                    return Some(update);
                }
                continue;
            }

            let wake = tokio::select! {
                changed = self.weather_rx.changed() => {
                    changed.map_or(Wake::Closed, |s| Wake::Slot(SlotEvent::Weather(s)))
                }
                changed = self.error_rx.changed() => {
                    changed.map_or(Wake::Closed, |s| Wake::Slot(SlotEvent::Error(s)))
                }
                Some(event) = self.icon_rx.recv() => Wake::Icon(event),
            };

            match wake {
                Wake::Slot(event) => self.pending.push(event),
                Wake::Icon(event) => {
                    if let Some(update) = self.apply_icon(event) {
                        return Some(update);
                    }
                }
                Wake::Closed => return None,
            }
        }
    }

    /// Apply every change that is already available, without waiting.
    /// Returns how many visible updates were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;

        loop {
            self.collect_ready_slots();
            if self.pending.is_empty() {
                break;
            }
            for event in std::mem::take(&mut self.pending) {
                applied += usize::from(self.apply_slot(event).is_some());
            }
        }

        while let Ok(event) = self.icon_rx.try_recv() {
            applied += usize::from(self.apply_icon(event).is_some());
        }

        applied
    }

    /// Apply what is available, then wait for outstanding icon loads.
    pub async fn settle(&mut self) {
        self.drain();
        while self.icons_in_flight > 0 {
            match self.icon_rx.recv().await {
                Some(event) => {
                    self.apply_icon(event);
                }
                None => break,
            }
            self.drain();
        }
    }

    fn collect_ready_slots(&mut self) {
        if let Some(s) = self.weather_rx.try_changed() {
            self.pending.push(SlotEvent::Weather(s));
        }
        if let Some(s) = self.error_rx.try_changed() {
            self.pending.push(SlotEvent::Error(s));
        }
        self.pending.sort_by_key(SlotEvent::seq);
    }

    fn apply_slot(&mut self, event: SlotEvent) -> Option<DisplayUpdate> {
        match event {
            SlotEvent::Weather(Stamped { value: Some(reading), .. }) => {
                self.apply_weather(reading);
                Some(DisplayUpdate::Weather)
            }
            SlotEvent::Error(Stamped { value: Some(message), .. }) => {
                self.reset_with_error(message);
                Some(DisplayUpdate::Error)
            }
            // Empty slots carry nothing to show.
            _ => None,
        }
    }

    fn apply_weather(&mut self, reading: WeatherReading) {
        self.revision += 1;
        self.state.show_weather(&reading);

        match reading.primary_condition() {
            Some(condition) => self.spawn_icon_load(condition.icon_id.clone()),
            None => self.state.icon = None,
        }

        if let Err(err) = self.prefs.set_last_searched_city(&reading.city) {
            warn!(error = %err, "failed to save last searched city");
        }

        self.renderer.render(&self.state);
    }

    fn reset_with_error(&mut self, message: String) {
        self.revision += 1;
        self.state.show_error(message);
        self.renderer.render(&self.state);
    }

    fn spawn_icon_load(&mut self, icon_id: String) {
        let revision = self.revision;
        let icons = self.icons.clone();
        let tx = self.icon_tx.clone();

        self.icons_in_flight += 1;
        tokio::spawn(async move {
            let result = icons.load(&icon_id).await;
            // The binder may have been dropped.
            let _ = tx.send(IconEvent { revision, icon_id, result });
        });
    }

    fn apply_icon(&mut self, event: IconEvent) -> Option<DisplayUpdate> {
        self.icons_in_flight = self.icons_in_flight.saturating_sub(1);

        if event.revision != self.revision {
            debug!(icon_id = %event.icon_id, "discarding icon for replaced display");
            return None;
        }

        let update = match event.result {
            Ok(icon) => {
                self.state.icon = Some(icon);
                DisplayUpdate::Icon
            }
            Err(err) => {
                warn!(icon_id = %event.icon_id, error = %err, "failed to load icon");
                self.state.icon = None;
                DisplayUpdate::IconFailed
            }
        };

        self.renderer.render(&self.state);
        Some(update)
    }
}

/// Upper-case the first letter of every word and lower-case the rest.
pub fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;

    for ch in text.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }

    out
}
