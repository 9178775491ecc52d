//! Restart tests

use std::time::Duration;

use super::fixtures::TestSetup;
use super::helpers::E2EResult;

async fn restart(setup: &mut TestSetup) -> E2EResult<()> {
    // give the agent time to come up before asking it to restart
    tokio::time::sleep(Duration::from_secs(5)).await;
    setup
        .session
        .cloud()?
        .restart()
        .execute()
        .await?
        .assert_success()
        .await?;
    Ok(())
}

/// Restart the device via a cloud operation
#[tokio::test]
async fn test_restart() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_restart").await?;
    let result = restart(&mut setup).await;
    setup.finish(result).await
}
