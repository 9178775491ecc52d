//! Software installation tests

use std::time::Duration;

use tedge_it_shared::software::Software;

use super::fixtures::TestSetup;
use super::helpers::E2EResult;

const SEMVER_PATTERN: &str = r"\d+\.\d+\.\d+\S*";

async fn plugin_install(setup: &mut TestSetup, plugin_name: &str) -> E2EResult<()> {
    let software = setup.session.cloud()?.software_management();
    software
        .install(&[Software::new(plugin_name)])
        .await?
        .with_timeout(Duration::from_secs(60))
        .assert_success()
        .await?;
    software
        .assert_software_installed(
            &[Software::new(plugin_name).with_version(SEMVER_PATTERN)],
            None,
        )
        .await?;
    Ok(())
}

/// Install a standard plugin through a software update operation
#[tokio::test]
async fn test_plugin_install() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_plugin_install[c8y-remoteaccess-plugin]").await?;
    let result = plugin_install(&mut setup, "c8y-remoteaccess-plugin").await;
    setup.finish(result).await
}
