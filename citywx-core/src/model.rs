use serde::{Deserialize, Serialize};

/// One entry of the provider's `weather` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDetail {
    pub description: String,
    #[serde(rename = "icon")]
    pub icon_id: String,
}

/// Current conditions for a named city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReading {
    /// The query that produced this reading, as the user typed it.
    pub city: String,
    /// Degrees Fahrenheit.
    pub temperature: f64,
    pub humidity_percent: i64,
    pub conditions: Vec<ConditionDetail>,
}

impl WeatherReading {
    /// The first reported condition. The provider normally sends at least one.
    pub fn primary_condition(&self) -> Option<&ConditionDetail> {
        self.conditions.first()
    }
}

/// A single reverse-geocoding match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoPlace {
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
}
