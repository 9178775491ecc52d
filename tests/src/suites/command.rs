//! Command plugin tests

use std::time::Duration;

use tedge_it::cloud::operations::command_result;
use tedge_it_shared::software::Software;

use super::fixtures::TestSetup;
use super::helpers::{E2EResult, ensure};

async fn execute_shell_command(setup: &mut TestSetup) -> E2EResult<()> {
    let cloud = setup.session.cloud()?;
    cloud
        .software_management()
        .install(&[Software::new("c8y-command-plugin")])
        .await?
        .with_timeout(Duration::from_secs(60))
        .assert_success()
        .await?;

    let operation = cloud.shell().execute("ls -la").await?.assert_success().await?;
    ensure(
        command_result(&operation).is_some_and(|result| !result.is_empty()),
        "Result should not be empty",
    )
}

/// Execute a shell command through the command plugin
#[tokio::test]
#[ignore = "fails with thin-edge.io <= 0.8.1"]
async fn test_execute_shell_command() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_execute_shell_command").await?;
    let result = execute_shell_command(&mut setup).await;
    setup.finish(result).await
}
