//! Condition icons and their process-lifetime cache.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use image::DynamicImage;
use reqwest::Url;
use tracing::debug;

use crate::{
    engine::openweather::icon_url,
    error::FetchOutcome,
    transport::HttpTransport,
};

pub const DEFAULT_ICON_BASE_URL: &str = "https://openweathermap.org";

/// A decoded condition icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub url: String,
    pub image: DynamicImage,
}

impl Icon {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Unbounded URL → icon map. Clones share the same entries; nothing is
/// evicted until the last handle is dropped.
#[derive(Debug, Clone, Default)]
pub struct IconCache {
    entries: Arc<RwLock<HashMap<String, Arc<Icon>>>>,
}

impl IconCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Arc<Icon>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(url).cloned()
    }

    pub fn insert(&self, url: String, icon: Arc<Icon>) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(url, icon);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct IconLoader {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    cache: IconCache,
}

impl IconLoader {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn HttpTransport>, cache: IconCache) -> Self {
        Self { base_url: base_url.into(), transport, cache }
    }

    pub fn cache(&self) -> &IconCache {
        &self.cache
    }

    pub fn icon_url(&self, icon_id: &str) -> FetchOutcome<Url> {
        icon_url(&self.base_url, icon_id)
    }

    /// Return the icon for `icon_id`, downloading and decoding it on a cache miss.
    pub async fn load(&self, icon_id: &str) -> FetchOutcome<Arc<Icon>> {
        let url = self.icon_url(icon_id)?;
        if let Some(hit) = self.cache.get(url.as_str()) {
            debug!(icon_id, "icon cache hit");
            return Ok(hit);
        }

        debug!(url = %url, "fetching icon");
        let body = self.transport.get(&url).await?.into_checked_body()?;
        let image = image::load_from_memory(&body)?;

        let icon = Arc::new(Icon { url: url.to_string(), image });
        self.cache.insert(url.to_string(), Arc::clone(&icon));
        Ok(icon)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::FetchError, transport::scripted::ScriptedTransport};

    fn loader(transport: ScriptedTransport) -> (IconLoader, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        (IconLoader::new(DEFAULT_ICON_BASE_URL, transport.clone(), IconCache::new()), transport)
    }

    #[tokio::test]
    async fn second_load_is_served_from_cache() {
        let (loader, transport) = loader(ScriptedTransport::new().respond("10d@2x.png", 200, fixtures::png(4, 4)));

        let first = loader.load("10d").await.unwrap();
        let second = loader.load("10d").await.unwrap();

        assert_eq!(transport.requests().len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.cache().len(), 1);
        assert_eq!((first.width(), first.height()), (4, 4));
    }

    #[tokio::test]
    async fn distinct_icons_are_cached_separately() {
        let (loader, transport) = loader(ScriptedTransport::new().respond("@2x.png", 200, fixtures::png(2, 2)));

        loader.load("10d").await.unwrap();
        loader.load("01n").await.unwrap();
        loader.load("10d").await.unwrap();

        assert_eq!(transport.requests().len(), 2);
        assert_eq!(loader.cache().len(), 2);
    }

    #[tokio::test]
    async fn clones_share_one_cache() {
        let (loader, transport) = loader(ScriptedTransport::new().respond("@2x.png", 200, fixtures::png(1, 1)));
        let other = loader.clone();

        loader.load("04d").await.unwrap();
        other.load("04d").await.unwrap();

        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn garbage_payload_is_decode_error_and_not_cached() {
        let (loader, _) = loader(ScriptedTransport::new().respond("@2x.png", 200, "definitely not a png"));

        let err = loader.load("10d").await.unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
        assert!(loader.cache().is_empty());
    }

    #[tokio::test]
    async fn missing_icon_is_status_error() {
        let (loader, _) = loader(ScriptedTransport::new().respond("@2x.png", 404, "Not Found"));

        let err = loader.load("zz").await.unwrap_err();

        assert_eq!(err, FetchError::Status { status: 404, body: "Not Found".into() });
    }
}
