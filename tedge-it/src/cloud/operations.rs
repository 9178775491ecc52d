use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Value, json};
use tedge_it_shared::Fragments;
use tedge_it_shared::operation::{NewOperation, Operation, OperationCollection, OperationStatus};
use tracing::{debug, info};

use crate::assertion::{self, RetryConfig};
use crate::cloud::{CloudClient, DeviceManagement, format_date};
use crate::error::{HarnessError, Result};

pub const RESTART_FRAGMENT: &str = "c8y_Restart";
pub const COMMAND_FRAGMENT: &str = "c8y_Command";

pub struct DeviceControl<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> DeviceControl<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    /// Create an operation for the bound device.
    pub async fn create(&self, description: &str, fragments: Fragments) -> Result<AssertOperation> {
        let request = NewOperation {
            device_id: self.ctx.device_id()?.to_string(),
            description: Some(description.to_string()),
            fragments,
        };
        let operation: Operation = self
            .ctx
            .client()
            .post_json("/devicecontrol/operations", &request)
            .await?;
        info!("Created operation {} ({})", operation.id, description);
        Ok(AssertOperation::new(
            self.ctx.client().clone(),
            operation,
            self.ctx.retry_config(),
        ))
    }

    pub async fn get(&self, id: &str) -> Result<Operation> {
        self.ctx
            .client()
            .get_json(&format!("/devicecontrol/operations/{id}"), &vec![])
            .await
    }

    /// Operations of the bound device created after `after` (test start by default).
    pub async fn list(
        &self,
        status: Option<OperationStatus>,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<Operation>> {
        let date_from = after.unwrap_or(self.ctx.test_start_time());
        let mut query = vec![
            ("deviceId", self.ctx.device_id()?.to_string()),
            ("dateFrom", format_date(&date_from)),
            ("pageSize", "2000".to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        let collection: OperationCollection = self
            .ctx
            .client()
            .get_json("/devicecontrol/operations", &query)
            .await?;
        Ok(collection.operations)
    }
}

/// Handle on a created operation for polling its status.
///
/// Owns a client clone so it can outlive the context borrow that created it.
#[derive(Debug, Clone)]
pub struct AssertOperation {
    client: CloudClient,
    operation: Operation,
    retries: RetryConfig,
}

impl AssertOperation {
    pub fn new(client: CloudClient, operation: Operation, retries: RetryConfig) -> Self {
        Self {
            client,
            operation,
            retries,
        }
    }

    pub fn id(&self) -> &str {
        &self.operation.id
    }

    /// Operation as last fetched.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.retries = self.retries.with_timeout(timeout);
        self
    }

    async fn fetch(&self) -> Result<Operation> {
        self.client
            .get_json(
                &format!("/devicecontrol/operations/{}", self.operation.id),
                &vec![],
            )
            .await
    }

    async fn wait_until<P>(&mut self, description: &str, predicate: P) -> Result<Operation>
    where
        P: Fn(OperationStatus) -> bool + Sync,
    {
        let this = &*self;
        let predicate = &predicate;
        let operation = assertion::wait_for_result(
            self.retries,
            &format!("operation {} to be {}", self.operation.id, description),
            || async move {
                let operation = this.fetch().await?;
                debug!("Operation {} is {}", operation.id, operation.status);
                Ok(predicate(operation.status).then_some(operation))
            },
        )
        .await?;
        self.operation = operation.clone();
        Ok(operation)
    }

    fn failure(operation: &Operation) -> HarnessError {
        HarnessError::OperationFailed {
            id: operation.id.clone(),
            status: operation.status.to_string(),
            reason: operation
                .failure_reason
                .clone()
                .unwrap_or_else(|| "no failure reason".to_string()),
        }
    }

    /// Wait for SUCCESSFUL. Reaching FAILED fails straight away.
    pub async fn assert_success(&mut self) -> Result<Operation> {
        let operation = self.wait_until("SUCCESSFUL", |s| s.is_done()).await?;
        match operation.status {
            OperationStatus::Successful => Ok(operation),
            _ => Err(Self::failure(&operation)),
        }
    }

    /// Wait for FAILED with a failure reason matching `reason_pattern`.
    pub async fn assert_failed(&mut self, reason_pattern: &str) -> Result<Operation> {
        let re = Regex::new(reason_pattern).map_err(|e| {
            HarnessError::InvalidArgument(format!("bad failure reason pattern {reason_pattern}: {e}"))
        })?;
        let operation = self.wait_until("FAILED", |s| s.is_done()).await?;
        if operation.status != OperationStatus::Failed {
            return Err(HarnessError::Assertion(format!(
                "operation {} should have failed but is {}",
                operation.id, operation.status
            )));
        }
        let reason = operation.failure_reason.as_deref().unwrap_or_default();
        if !re.is_match(reason) {
            return Err(HarnessError::Assertion(format!(
                "failure reason of operation {} does not match {}: {}",
                operation.id, reason_pattern, reason
            )));
        }
        Ok(operation)
    }

    pub async fn assert_pending(&mut self) -> Result<Operation> {
        self.wait_until("PENDING", |s| s == OperationStatus::Pending)
            .await
    }

    pub async fn assert_not_pending(&mut self) -> Result<Operation> {
        self.wait_until("not PENDING", |s| s != OperationStatus::Pending)
            .await
    }

    /// Wait for either terminal state.
    pub async fn assert_done(&mut self) -> Result<Operation> {
        self.wait_until("done", |s| s.is_done()).await
    }
}

pub struct Restart<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Restart<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    pub async fn execute(&self) -> Result<AssertOperation> {
        let mut fragments = Fragments::new();
        fragments.insert(RESTART_FRAGMENT.to_string(), json!({}));
        self.ctx
            .operations()
            .create("Restart device", fragments)
            .await
    }
}

pub struct Shell<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Shell<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    /// Run a shell command on the device through the command plugin.
    pub async fn execute(&self, text: &str) -> Result<AssertOperation> {
        let mut fragments = Fragments::new();
        fragments.insert(COMMAND_FRAGMENT.to_string(), json!({ "text": text }));
        self.ctx
            .operations()
            .create(&format!("Execute shell command: {text}"), fragments)
            .await
    }
}

/// Command output recorded by the command plugin, if any.
pub fn command_result(operation: &Operation) -> Option<&str> {
    operation
        .fragments
        .get(COMMAND_FRAGMENT)
        .and_then(|c| c.get("result"))
        .and_then(Value::as_str)
}
