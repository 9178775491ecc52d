use tedge_it_shared::inventory::{ExternalId, ManagedObject};
use tracing::debug;

use crate::assertion;
use crate::cloud::DeviceManagement;
use crate::error::Result;

pub struct Identity<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Identity<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    /// Wait for the external id to be registered and return its managed object.
    pub async fn assert_exists(&self, external_id: &str, id_type: &str) -> Result<ManagedObject> {
        let path = format!("/identity/externalIds/{id_type}/{external_id}");
        let identity: ExternalId = assertion::wait_for_result(
            self.ctx.retry_config(),
            &format!("external id {id_type}/{external_id}"),
            || self.ctx.client().find_json(&path),
        )
        .await?;
        debug!(
            "External id {} resolves to managed object {}",
            external_id, identity.managed_object.id
        );
        self.ctx.inventory().get(&identity.managed_object.id).await
    }
}
