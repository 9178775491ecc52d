use serde_json::Value;
use tedge_it_shared::inventory::ManagedObject;
use tracing::{info, warn};

use crate::assertion;
use crate::cloud::DeviceManagement;
use crate::error::{HarnessError, Result};

/// True when every key of `expected` exists in `actual` with a matching value.
///
/// Objects are compared recursively, arrays must contain every expected
/// element, everything else must be equal.
pub fn json_contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected.iter().all(|(key, value)| {
            actual
                .get(key)
                .is_some_and(|found| json_contains(found, value))
        }),
        (Value::Array(actual), Value::Array(expected)) => expected
            .iter()
            .all(|value| actual.iter().any(|found| json_contains(found, value))),
        (actual, expected) => actual == expected,
    }
}

pub struct Inventory<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Inventory<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    pub async fn get(&self, id: &str) -> Result<ManagedObject> {
        self.ctx
            .client()
            .get_json(&format!("/inventory/managedObjects/{id}"), &vec![])
            .await
    }

    async fn find(&self, id: &str) -> Result<Option<ManagedObject>> {
        self.ctx
            .client()
            .find_json(&format!("/inventory/managedObjects/{id}"))
            .await
    }

    /// Wait for the bound device's managed object.
    pub async fn assert_exists(&self) -> Result<ManagedObject> {
        let id = self.ctx.device_id()?;
        assertion::wait_for_result(
            self.ctx.retry_config(),
            &format!("managed object {id}"),
            || self.find(id),
        )
        .await
    }

    /// Wait until the device's child devices are exactly `names`, in any order.
    pub async fn assert_child_device_names(&self, names: &[&str]) -> Result<ManagedObject> {
        let id = self.ctx.device_id()?;
        let mut expected: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        expected.sort();

        let result = assertion::wait_for_result(
            self.ctx.retry_config(),
            &format!("child devices {expected:?} of {id}"),
            || {
                let expected = expected.clone();
                async move {
                    let mo = self.get(id).await?;
                    let mut actual = mo.child_device_names();
                    actual.sort();
                    Ok((actual == expected).then_some(mo))
                }
            },
        )
        .await?;
        info!("Device {} has child devices {:?}", id, expected);
        Ok(result)
    }

    /// Wait until the device has all the named fragments.
    pub async fn assert_contains_fragments(&self, fragments: &[&str]) -> Result<ManagedObject> {
        let id = self.ctx.device_id()?;
        assertion::wait_for_result(
            self.ctx.retry_config(),
            &format!("fragments {fragments:?} on {id}"),
            || async move {
                let mo = self.get(id).await?;
                let missing: Vec<&str> = fragments
                    .iter()
                    .copied()
                    .filter(|f| !mo.has_fragment(f))
                    .collect();
                if !missing.is_empty() {
                    warn!("Managed object {} is missing {:?}", id, missing);
                }
                Ok(missing.is_empty().then_some(mo))
            },
        )
        .await
    }

    /// Wait until the managed object contains `expected` as a JSON subset.
    ///
    /// `mo` selects another managed object than the bound device.
    pub async fn assert_contains_fragment_values(
        &self,
        expected: &Value,
        mo: Option<&str>,
    ) -> Result<ManagedObject> {
        if !expected.is_object() {
            return Err(HarnessError::InvalidArgument(format!(
                "fragment values must be a JSON object, got {expected}"
            )));
        }
        let id = match mo {
            Some(id) => id,
            None => self.ctx.device_id()?,
        };
        assertion::wait_for_result(
            self.ctx.retry_config(),
            &format!("fragment values on {id}"),
            || async move {
                let mo = self.get(id).await?;
                let actual = serde_json::to_value(&mo)?;
                Ok(json_contains(&actual, expected).then_some(mo))
            },
        )
        .await
    }

    pub async fn delete(&self, id: &str, cascade: Option<bool>) -> Result<()> {
        let mut query = vec![];
        if let Some(cascade) = cascade {
            query.push(("cascade", cascade.to_string()));
        }
        self.ctx
            .client()
            .delete(&format!("/inventory/managedObjects/{id}"), &query)
            .await
    }

    /// Delete the device, its children and the device user.
    pub async fn delete_device_and_user(&self, mo: &ManagedObject) -> Result<()> {
        self.delete(&mo.id, Some(true)).await?;
        info!("Deleted managed object {}", mo.id);

        let username = match (&mo.owner, &mo.name) {
            (Some(owner), _) => owner.clone(),
            (None, Some(name)) => format!("device_{name}"),
            (None, None) => {
                warn!("Managed object {} has no owner, skipping user removal", mo.id);
                return Ok(());
            }
        };
        self.ctx.users().delete(&username).await
    }
}
