//! Child device tests

use std::time::Duration;

use serde_json::json;
use tedge_it_shared::inventory::DEFAULT_IDENTITY_TYPE;

use super::fixtures::TestSetup;
use super::helpers::E2EResult;

// the mapper picks up new child directories only once it is running
const STARTUP_DELAY: Duration = Duration::from_secs(5);

async fn child_device_registration(setup: &mut TestSetup) -> E2EResult<()> {
    let child_name = setup.session.random_name(None);
    tokio::time::sleep(STARTUP_DELAY).await;
    setup
        .session
        .execute_command(
            &format!("mkdir -p /etc/tedge/operations/c8y/{child_name}"),
            Some(0),
        )
        .await?;

    let inventory = setup.session.cloud()?.inventory();
    inventory.assert_exists().await?;
    inventory.assert_child_device_names(&[child_name.as_str()]).await?;
    Ok(())
}

#[tokio::test]
async fn test_child_device_registration() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_child_device_registration").await?;
    let result = child_device_registration(&mut setup).await;
    setup.finish(result).await
}

async fn child_supported_operations(setup: &mut TestSetup) -> E2EResult<()> {
    let child_name = setup.session.random_name(None);
    tokio::time::sleep(STARTUP_DELAY).await;
    setup
        .session
        .execute_command(
            &format!(
                "mkdir -p /etc/tedge/operations/c8y/{child_name}; \
                 touch /etc/tedge/operations/c8y/{child_name}/c8y_Restart"
            ),
            Some(0),
        )
        .await?;

    let cloud = setup.session.cloud()?;
    cloud.inventory().assert_exists().await?;
    cloud
        .inventory()
        .assert_contains_fragment_values(
            &json!({"c8y_SupportedOperations": ["c8y_Restart", "c8y_SoftwareUpdate"]}),
            None,
        )
        .await?;

    cloud
        .inventory()
        .assert_child_device_names(&[child_name.as_str()])
        .await?;
    let child = cloud
        .identity()
        .assert_exists(&child_name, DEFAULT_IDENTITY_TYPE)
        .await?;
    cloud
        .inventory()
        .assert_contains_fragment_values(
            &json!({"c8y_SupportedOperations": ["c8y_Restart"]}),
            Some(&child.id),
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_child_supported_operations() -> E2EResult<()> {
    let mut setup = TestSetup::init("test_child_supported_operations").await?;
    let result = child_supported_operations(&mut setup).await;
    setup.finish(result).await
}
