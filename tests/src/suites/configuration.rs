//! Configuration plugin tests

use chrono::Utc;
use tedge_it::CountRange;
use tedge_it::cloud::events::{AttachmentExpectation, EventFilter};
use tedge_it_shared::configuration::Configuration;
use tedge_it_shared::software::Software;

use super::fixtures::TestSetup;
use super::helpers::{E2EResult, ensure};

const PLUGIN_NAME: &str = "c8y-configuration-plugin";
const PLUGIN_CONFIG: &str = r#"
files = [
    { path = '/etc/tedge/tedge.toml', type = 'tedge.toml' },
    { path = '/etc/tedge/mosquitto-conf/c8y-bridge.conf' },
    { path = '/etc/tedge/mosquitto-conf/tedge-mosquitto.conf' },
    { path = '/etc/mosquitto/mosquitto.conf', type = 'mosquitto', user = 'mosquitto', group = 'mosquitto', mode = 0o644 }
]
"#;

async fn set_configuration(setup: &mut TestSetup) -> E2EResult<()> {
    let cloud = setup.session.cloud()?;
    cloud
        .software_management()
        .install(&[Software::new(PLUGIN_NAME)])
        .await?
        .assert_success()
        .await?;

    let config = format!(
        "# Test configuration generated on {}\n{}",
        Utc::now().to_rfc3339(),
        PLUGIN_CONFIG
    );
    cloud
        .configuration()
        .apply_and_wait(&Configuration::new(PLUGIN_NAME), &config)
        .await?;

    cloud
        .configuration()
        .get_configuration(&Configuration::new(PLUGIN_NAME))
        .await?
        .assert_success()
        .await?;

    // the upload creates an event carrying the file
    let filter = EventFilter::default()
        .with_type(PLUGIN_NAME)
        .after(setup.session.test_start_time());
    let events = cloud
        .events()
        .assert_count(&filter, CountRange::between(1, 1))
        .await?;
    cloud.events().assert_attachment_info(&events[0], ".+")?;

    let contents = cloud
        .events()
        .assert_attachment(&events[0].id, &AttachmentExpectation::default())
        .await?;
    ensure(
        String::from_utf8_lossy(&contents) == config,
        "Configuration roundtrip should match",
    )
}

/// Set then get a configuration file through the cloud
#[tokio::test]
async fn test_set_configuration() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_set_configuration").await?;
    let result = set_configuration(&mut setup).await;
    setup.finish(result).await
}
