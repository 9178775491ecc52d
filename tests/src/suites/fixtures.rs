//! Device-under-test fixture
//!
//! Every test gets a freshly bootstrapped container bound to its managed
//! object. The test body runs against it, then the device is torn down and
//! its logs are written regardless of the outcome.

use tedge_it::config::HarnessConfig;
use tedge_it::report::TestOutcome;
use tedge_it::session::DeviceSession;
use tedge_it::util::logging::init_test_logging;

use super::helpers::{E2EError, E2EResult};

pub struct TestSetup {
    pub session: DeviceSession,
    pub serial: String,
}

impl TestSetup {
    /// Create, bootstrap and register a device for the test `name`.
    pub async fn init(name: &str) -> E2EResult<Self> {
        init_test_logging();

        let config = HarnessConfig::load()?;
        if config.cloud.is_none() {
            return Err(E2EError::Setup(
                "C8Y_BASEURL must be set to run the e2e suites".into(),
            ));
        }

        let mut session = DeviceSession::new(config)?;
        session.start_test(name);
        let serial = match session.setup_device(false).await {
            Ok(serial) => serial,
            Err(e) => {
                session.end_test(TestOutcome::Failed(e.to_string()));
                session.end_suite().await;
                return Err(e.into());
            }
        };
        tracing::info!("Device ready: {}", serial);

        Ok(Self { session, serial })
    }

    /// Record the outcome, tear everything down and hand the result back.
    pub async fn finish(mut self, result: E2EResult<()>) -> E2EResult<()> {
        let outcome = match &result {
            Ok(()) => TestOutcome::Passed,
            Err(e) => TestOutcome::Failed(e.to_string()),
        };
        self.session.end_test(outcome);
        let report = self.session.end_suite().await;
        tracing::info!("{}", report);
        result
    }
}
