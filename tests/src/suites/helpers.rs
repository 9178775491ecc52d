//! Helper utilities for E2E tests

use tedge_it::HarnessError;
use tedge_it::session::DeviceSession;

/// Error type for E2E tests
#[derive(Debug, thiserror::Error)]
pub enum E2EError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error(transparent)]
    Harness(#[from] HarnessError),

    #[error("Check failed: {0}")]
    Check(String),
}

pub type E2EResult<T> = Result<T, E2EError>;

/// Fail the test with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> E2EResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2EError::Check(message.into()))
    }
}

/// Publish a message on the device's local MQTT broker.
pub async fn mqtt_pub(session: &DeviceSession, topic: &str, payload: &str) -> E2EResult<()> {
    session
        .execute_command(&format!("tedge mqtt pub {topic} '{payload}'"), Some(0))
        .await?;
    Ok(())
}

/// Alarm type and severity encoded in a `tedge/alarms/<severity>/<type>` topic.
pub fn alarm_topic_parts(topic: &str) -> (&str, &str) {
    let mut parts = topic.rsplit('/');
    let alarm_type = parts.next().unwrap_or_default();
    let severity = parts.next().unwrap_or_default();
    (severity, alarm_type)
}
