//! Alarm tests

use serde_json::Value;
use tedge_it::CountRange;
use tedge_it::cloud::alarms::AlarmFilter;
use tedge_it_shared::alarm::{AlarmStatus, Severity};

use super::fixtures::TestSetup;
use super::helpers::{E2EError, E2EResult, alarm_topic_parts, ensure, mqtt_pub};

fn filter_for(setup: &TestSetup, topic: &str, payload: &str) -> E2EResult<AlarmFilter> {
    let (severity, alarm_type) = alarm_topic_parts(topic);
    let severity: Severity = severity.parse().map_err(E2EError::Check)?;
    let payload: Value =
        serde_json::from_str(payload).map_err(|e| E2EError::Check(e.to_string()))?;

    let mut filter = AlarmFilter::default()
        .with_type(alarm_type)
        .with_severity(severity)
        .after(setup.session.test_start_time());
    if let Some(text) = payload.get("text").and_then(Value::as_str) {
        filter = filter.with_text(text);
    }
    Ok(filter)
}

async fn tedge_alarm(setup: &mut TestSetup, topic: &str, payload: &str) -> E2EResult<()> {
    mqtt_pub(&setup.session, topic, payload).await?;
    let filter = filter_for(setup, topic, payload)?;
    let items = setup
        .session
        .cloud()?
        .alarms()
        .assert_count(&filter, CountRange::between(1, 1))
        .await?;
    ensure(!items.is_empty(), "alarm was not created")
}

async fn run_alarm_test(name: &str, topic: &str, payload: &str) -> E2EResult<()> {
    let mut setup = TestSetup::init(name).await?;
    let result = tedge_alarm(&mut setup, topic, payload).await;
    setup.finish(result).await
}

#[tokio::test]
async fn test_tedge_alarm_critical_without_timestamp() -> E2EResult<()> {
    run_alarm_test(
        "test_tedge_alarm[critical_alarm_without_timestamp]",
        "tedge/alarms/critical/temperature_high_high",
        r#"{"text": "Temperature is very high"}"#,
    )
    .await
}

#[tokio::test]
async fn test_tedge_alarm_major_with_negative_timestamp() -> E2EResult<()> {
    run_alarm_test(
        "test_tedge_alarm[major_alarm_with_negative_timestamp]",
        "tedge/alarms/major/temperature_high",
        r#"{"text": "Temperature is high", "time": "2099-01-01T00:00:00-05:00"}"#,
    )
    .await
}

#[tokio::test]
async fn test_tedge_alarm_minor() -> E2EResult<()> {
    run_alarm_test(
        "test_tedge_alarm[minor_alarm]",
        "tedge/alarms/minor/temperature_low",
        r#"{"text": "Temperature is low", "time": "2099-01-01T00:00:00+05:00"}"#,
    )
    .await
}

#[tokio::test]
async fn test_tedge_alarm_warning() -> E2EResult<()> {
    run_alarm_test(
        "test_tedge_alarm[warning_alarm]",
        "tedge/alarms/warning/temperature_low",
        r#"{"text": "Temperature is low low", "time": "2099-01-01T00:00:00Z"}"#,
    )
    .await
}

async fn clear_tedge_alarm(setup: &mut TestSetup) -> E2EResult<()> {
    let topic = "tedge/alarms/critical/temperature_high_high";
    let payload = r#"{"text": "Temperature is very high"}"#;

    mqtt_pub(&setup.session, topic, payload).await?;
    let active = filter_for(setup, topic, payload)?.resolved(false);
    let items = setup
        .session
        .cloud()?
        .alarms()
        .assert_count(&active, CountRange::between(1, 1))
        .await?;

    // an empty retained message clears the alarm
    mqtt_pub(&setup.session, topic, "").await?;
    let alarms = setup.session.cloud()?.alarms();
    alarms.assert_count(&active, CountRange::none()).await?;

    let alarm = alarms.assert_exists(&items[0].id).await?;
    ensure(
        alarm.status == AlarmStatus::Cleared,
        "Alarm should be cleared",
    )
}

/// Create then clear an alarm
#[tokio::test]
async fn test_clear_tedge_alarm() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_clear_tedge_alarm").await?;
    let result = clear_tedge_alarm(&mut setup).await;
    setup.finish(result).await
}
