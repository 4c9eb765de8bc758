//! Core library for the `citywx` weather lookup.
//!
//! This crate defines:
//! - The request engine that fetches weather by city name or coordinates
//! - Observable slots through which the engine publishes outcomes
//! - The display binder that turns those outcomes into presentable state
//! - Configuration, the last-searched-city preference and the icon cache
//!
//! It is used by `citywx-cli`, but any front-end can drive a
//! [`DisplayBinder`] with its own [`Renderer`].

pub mod binder;
pub mod config;
pub mod engine;
pub mod error;
pub mod icon;
pub mod model;
pub mod observable;
pub mod prefs;
pub mod transport;

pub use binder::{DisplayBinder, DisplayState, DisplayUpdate, Renderer};
pub use config::Config;
pub use engine::{EngineSettings, ObservableState, WeatherEngine};
pub use error::{FetchError, FetchOutcome};
pub use icon::{Icon, IconCache, IconLoader};
pub use model::{ConditionDetail, GeoPlace, WeatherReading};
pub use observable::{Slot, SubscribeOptions, Subscription};
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
