//! Measurement tests

use tedge_it::CountRange;
use tedge_it::cloud::measurements::MeasurementFilter;

use super::fixtures::TestSetup;
use super::helpers::{E2EResult, ensure, mqtt_pub};

async fn tedge_measurement(setup: &mut TestSetup) -> E2EResult<()> {
    mqtt_pub(&setup.session, "tedge/measurements", r#"{"temperature": 21.3}"#).await?;

    let cloud = setup.session.cloud()?;
    let filter = MeasurementFilter::default()
        .with_type("ThinEdgeMeasurement")
        .with_value_fragment("temperature")
        .with_series("temperature")
        .after(setup.session.test_start_time());
    let items = cloud
        .measurements()
        .assert_count(&filter, CountRange::between(1, 1))
        .await?;

    let value = items[0].value("temperature", "temperature");
    ensure(value == Some(21.3), format!("unexpected value {value:?}"))
}

/// Publishing a measurement via MQTT creates exactly one cloud measurement
#[tokio::test]
async fn test_tedge_measurement() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_tedge_measurement").await?;
    let result = tedge_measurement(&mut setup).await;
    setup.finish(result).await
}
