use tracing::info;

use crate::cloud::DeviceManagement;
use crate::error::Result;

pub struct TrustedCertificates<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> TrustedCertificates<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    /// Remove a device certificate from the tenant's trust store.
    ///
    /// Fingerprints are compared lower case by the platform.
    pub async fn delete_certificate(&self, fingerprint: &str) -> Result<()> {
        let tenant = self.ctx.client().tenant_id().await?;
        let fingerprint = fingerprint.trim().to_lowercase();
        self.ctx
            .client()
            .delete(
                &format!("/tenant/tenants/{tenant}/trusted-certificates/{fingerprint}"),
                &vec![],
            )
            .await?;
        info!("Deleted trusted certificate {}", fingerprint);
        Ok(())
    }
}

pub struct Users<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Users<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    pub async fn delete(&self, username: &str) -> Result<()> {
        let tenant = self.ctx.client().tenant_id().await?;
        self.ctx
            .client()
            .delete(&format!("/user/{tenant}/users/{username}"), &vec![])
            .await?;
        info!("Deleted user {}", username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::cloud::test_support::context_for;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_delete_certificate_lowercases_fingerprint() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE)
                .path("/tenant/tenants/t100/trusted-certificates/ab12cd34");
            then.status(204);
        });

        let ctx = context_for(&server);
        ctx.trusted_certificates()
            .delete_certificate("AB12CD34\n")
            .await
            .unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_delete_missing_user_is_ok() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/user/t100/users/device_gone");
            then.status(404);
        });

        let ctx = context_for(&server);
        ctx.users().delete("device_gone").await.unwrap();
        mock.assert();
    }
}
