use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::Fragments;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Measurement {
    pub id: String,
    #[serde(rename = "type")]
    pub measurement_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<FixedOffset>>,
    #[serde(flatten)]
    pub fragments: Fragments,
}

impl Measurement {
    /// Value of `{fragment: {series: {value}}}`.
    pub fn value(&self, fragment: &str, series: &str) -> Option<f64> {
        self.fragments
            .get(fragment)?
            .get(series)?
            .get("value")?
            .as_f64()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MeasurementCollection {
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_value_lookup() {
        let m: Measurement = serde_json::from_str(
            r#"{
                "id": "1",
                "type": "ThinEdgeMeasurement",
                "time": "2024-01-01T00:00:00Z",
                "temperature": {"temperature": {"value": 21.3}}
            }"#,
        )
        .unwrap();
        assert_eq!(m.value("temperature", "temperature"), Some(21.3));
        assert_eq!(m.value("temperature", "humidity"), None);
        assert_eq!(m.value("pressure", "pressure"), None);
    }
}
