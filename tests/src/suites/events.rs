//! Event tests

use tedge_it::CountRange;
use tedge_it::cloud::events::EventFilter;

use super::fixtures::TestSetup;
use super::helpers::{E2EResult, mqtt_pub};

async fn tedge_event(setup: &mut TestSetup, payload: &str) -> E2EResult<()> {
    mqtt_pub(&setup.session, "tedge/events/login_event", payload).await?;

    let filter = EventFilter::default()
        .with_type("login_event")
        .with_text("A user just logged in")
        .after(setup.session.test_start_time());
    setup
        .session
        .cloud()?
        .events()
        .assert_count(&filter, CountRange::between(1, 1))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_tedge_event_without_timestamp() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_tedge_event[event_without_timestamp]").await?;
    let result = tedge_event(&mut setup, r#"{"text": "A user just logged in"}"#).await;
    setup.finish(result).await
}

#[tokio::test]
async fn test_tedge_event_with_negative_timestamp() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_tedge_event[event_with_negative_timestamp]").await?;
    let result = tedge_event(
        &mut setup,
        r#"{"text": "A user just logged in", "time": "2099-01-01T00:00:00-05:00"}"#,
    )
    .await;
    setup.finish(result).await
}
