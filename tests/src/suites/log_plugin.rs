//! Log plugin tests

use regex::Regex;
use tedge_it::CountRange;
use tedge_it::cloud::configuration::LogRequest;
use tedge_it::cloud::events::{AttachmentExpectation, EventFilter};
use tedge_it_shared::configuration::{Configuration, LOGFILE_REQUEST_FRAGMENT};
use tedge_it_shared::software::Software;

use super::fixtures::TestSetup;
use super::helpers::{E2EError, E2EResult, ensure};

const PLUGIN_NAME: &str = "c8y-log-plugin";
const PLUGIN_CONFIG: &str = r#"
files = [
    { type = "mosquitto", path = '/var/log/mosquitto/mosquitto.log' },
    { type = "commands", path = '/var/log/tedge/agent/c8y_Command-*' },
    { type = "software-management", path = '/var/log/tedge/agent/software-*' },
    { type = "c8y_LogRequest", path = '/var/log/tedge/agent/c8y_LogRequest/*' },
    { type = "dummy-log", path = '/var/log/dummy.log' },
]
"#;

const CONFIG_NAME: &str = "c8y-configuration-plugin";
const CONFIG_CONTENTS: &str = r#"
files = [
    { path = '/etc/tedge/tedge.toml', type = 'tedge.toml' },
    { path = '/etc/tedge/c8y/c8y-log-plugin.toml', type = 'c8y-log-plugin' },
]
"#;

const LOG_CONTENTS: &str = "log entry 1\nlog entry 2";
const LOG_TYPE: &str = "dummy-log";

async fn get_log_file(setup: &mut TestSetup) -> E2EResult<()> {
    let cloud = setup.session.cloud()?;
    cloud
        .software_management()
        .install(&[Software::new(PLUGIN_NAME), Software::new(CONFIG_NAME)])
        .await?
        .assert_success()
        .await?;

    // the configuration plugin must know the log plugin's file first
    cloud
        .configuration()
        .apply_and_wait(&Configuration::new(CONFIG_NAME), CONFIG_CONTENTS)
        .await?;
    cloud
        .configuration()
        .apply_and_wait(&Configuration::new(PLUGIN_NAME), PLUGIN_CONFIG)
        .await?;

    setup
        .session
        .execute_command(
            &format!("echo \"{LOG_CONTENTS}\" > /var/log/dummy.log"),
            Some(0),
        )
        .await?;

    let operation = cloud
        .logs()
        .get_logfile(&LogRequest::new(LOG_TYPE))
        .await?
        .assert_success()
        .await?;
    let file = operation
        .fragments
        .get(LOGFILE_REQUEST_FRAGMENT)
        .and_then(|request| request.get("file"))
        .and_then(|file| file.as_str())
        .unwrap_or_default();
    let link = Regex::new(r"^https://.+/event/events/\d+/binaries$")
        .map_err(|e| E2EError::Check(e.to_string()))?;
    ensure(
        link.is_match(file),
        format!("Expected operation to contain a link to the uploaded log file, got {file:?}"),
    )?;

    let filter = EventFilter::default()
        .with_type(LOG_TYPE)
        .with_attachment(true)
        .after(setup.session.test_start_time());
    let events = cloud
        .events()
        .assert_count(&filter, CountRange::between(1, 1))
        .await?;
    cloud.events().assert_attachment_info(&events[0], ".+")?;

    let expected = AttachmentExpectation {
        contents: Some(format!("filename: dummy.log\n{LOG_CONTENTS}\n")),
        ..Default::default()
    };
    cloud
        .events()
        .assert_attachment(&events[0].id, &expected)
        .await?;
    Ok(())
}

/// Request a log file through the cloud and check the uploaded contents
#[tokio::test]
async fn test_get_log_file() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_get_log_file").await?;
    let result = get_log_file(&mut setup).await;
    setup.finish(result).await
}
