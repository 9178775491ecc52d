use regex::Regex;
use serde_json::Value;
use tedge_it_shared::Fragments;
use tedge_it_shared::inventory::ManagedObject;
use tedge_it_shared::software::{SOFTWARE_LIST_FRAGMENT, Software, SoftwareAction, SoftwareUpdate};
use tracing::info;

use crate::assertion;
use crate::cloud::DeviceManagement;
use crate::cloud::operations::AssertOperation;
use crate::error::{HarnessError, Result};

pub const SOFTWARE_UPDATE_FRAGMENT: &str = "c8y_SoftwareUpdate";

pub struct SoftwareManagement<'a> {
    ctx: &'a DeviceManagement,
}

/// Expected package: exact name, version given as a regex.
struct Expected {
    name: String,
    version: Option<Regex>,
}

impl Expected {
    fn new(software: &Software) -> Result<Self> {
        let version = if software.version.is_empty() {
            None
        } else {
            let pattern = format!("^(?:{})$", software.version);
            Some(Regex::new(&pattern).map_err(|e| {
                HarnessError::InvalidArgument(format!(
                    "bad version pattern {} for {}: {e}",
                    software.version, software.name
                ))
            })?)
        };
        Ok(Self {
            name: software.name.clone(),
            version,
        })
    }

    fn found_in(&self, installed: &[Software]) -> bool {
        installed.iter().any(|item| {
            item.name == self.name
                && self
                    .version
                    .as_ref()
                    .is_none_or(|re| re.is_match(&item.version))
        })
    }
}

fn installed_software(mo: &ManagedObject) -> Vec<Software> {
    mo.fragments
        .get(SOFTWARE_LIST_FRAGMENT)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

impl<'a> SoftwareManagement<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    async fn update(
        &self,
        description: &str,
        software: &[Software],
        action: SoftwareAction,
    ) -> Result<AssertOperation> {
        if software.is_empty() {
            return Err(HarnessError::InvalidArgument(
                "at least one software package is required".into(),
            ));
        }
        let updates: Vec<SoftwareUpdate> = software
            .iter()
            .map(|s| SoftwareUpdate::new(s, action))
            .collect();

        let mut fragments = Fragments::new();
        fragments.insert(
            SOFTWARE_UPDATE_FRAGMENT.to_string(),
            serde_json::to_value(updates)?,
        );
        self.ctx.operations().create(description, fragments).await
    }

    pub async fn install(&self, software: &[Software]) -> Result<AssertOperation> {
        let names: Vec<&str> = software.iter().map(|s| s.name.as_str()).collect();
        self.update(
            &format!("Install software: {}", names.join(", ")),
            software,
            SoftwareAction::Install,
        )
        .await
    }

    pub async fn remove(&self, software: &[Software]) -> Result<AssertOperation> {
        let names: Vec<&str> = software.iter().map(|s| s.name.as_str()).collect();
        self.update(
            &format!("Remove software: {}", names.join(", ")),
            software,
            SoftwareAction::Delete,
        )
        .await
    }

    /// Wait until every package shows up in the device's software list.
    ///
    /// `mo` selects another managed object than the bound device.
    pub async fn assert_software_installed(
        &self,
        software: &[Software],
        mo: Option<&str>,
    ) -> Result<ManagedObject> {
        let expected = software
            .iter()
            .map(Expected::new)
            .collect::<Result<Vec<_>>>()?;
        let id = match mo {
            Some(id) => id,
            None => self.ctx.device_id()?,
        };
        let expected = &expected;

        let mo = assertion::wait_for_result(
            self.ctx.retry_config(),
            &format!("software list of {id}"),
            || async move {
                let mo = self.ctx.inventory().get(id).await?;
                let installed = installed_software(&mo);
                Ok(expected
                    .iter()
                    .all(|e| e.found_in(&installed))
                    .then_some(mo))
            },
        )
        .await?;
        info!("Device {} has {} expected package(s)", id, software.len());
        Ok(mo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::test_support::context_for;
    use httpmock::prelude::*;
    use serde_json::json;

    const SEMVER_PATTERN: &str = r"\d+\.\d+\.\d+\S*";

    #[test]
    fn test_expected_version_is_full_match() {
        let installed = vec![
            Software::new("c8y-remoteaccess-plugin").with_version("0.9.0"),
            Software::new("jq").with_version("1.6-2.1"),
        ];
        let semver = Expected::new(
            &Software::new("c8y-remoteaccess-plugin").with_version(SEMVER_PATTERN),
        )
        .unwrap();
        assert!(semver.found_in(&installed));

        let any_version = Expected::new(&Software::new("jq")).unwrap();
        assert!(any_version.found_in(&installed));

        let wrong = Expected::new(&Software::new("jq").with_version("1.6")).unwrap();
        assert!(!wrong.found_in(&installed));
    }

    #[tokio::test]
    async fn test_install_sends_software_update() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/devicecontrol/operations")
                .json_body_includes(
                    json!({
                        "deviceId": "12345",
                        "c8y_SoftwareUpdate": [
                            {"name": "c8y-command-plugin", "version": "", "url": "", "action": "install"}
                        ]
                    })
                    .to_string(),
                );
            then.status(201).json_body(json!({
                "id": "77", "deviceId": "12345", "status": "PENDING",
            }));
        });

        let ctx = context_for(&server);
        let operation = ctx
            .software_management()
            .install(&[Software::new("c8y-command-plugin")])
            .await
            .unwrap();
        assert_eq!(operation.id(), "77");
        mock.assert();
    }

    #[tokio::test]
    async fn test_remove_uses_delete_action() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/devicecontrol/operations")
                .body_includes(r#""action":"delete""#);
            then.status(201).json_body(json!({
                "id": "78", "deviceId": "12345", "status": "PENDING",
            }));
        });

        let ctx = context_for(&server);
        ctx.software_management()
            .remove(&[Software::new("jq")])
            .await
            .unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_assert_software_installed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/inventory/managedObjects/12345");
            then.status(200).json_body(json!({
                "id": "12345",
                "c8y_SoftwareList": [
                    {"name": "tedge", "version": "1.0.0", "url": ""},
                    {"name": "c8y-remoteaccess-plugin", "version": "1.0.1~rc1", "url": ""},
                ],
            }));
        });

        let ctx = context_for(&server);
        ctx.software_management()
            .assert_software_installed(
                &[Software::new("c8y-remoteaccess-plugin").with_version(SEMVER_PATTERN)],
                None,
            )
            .await
            .unwrap();
        assert!(
            ctx.software_management()
                .assert_software_installed(&[Software::new("missing")], None)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_empty_install_is_rejected() {
        let server = MockServer::start();
        let ctx = context_for(&server);
        let err = ctx.software_management().install(&[]).await.unwrap_err();
        assert!(matches!(err, HarnessError::InvalidArgument(_)));
    }
}
