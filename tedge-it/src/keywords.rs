//! Keyword-style entry points, addressed by their human-readable names.
//!
//! Arguments follow the robot convention: positional values first, then
//! `name=value` pairs for any declared parameter of the keyword.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tedge_it_shared::alarm::{AlarmStatus, Severity};
use tedge_it_shared::inventory::DEFAULT_IDENTITY_TYPE;
use tedge_it_shared::software::Software;
use tracing::{debug, info};

use crate::cloud::alarms::AlarmFilter;
use crate::cloud::events::{AttachmentExpectation, EventFilter};
use crate::cloud::measurements::MeasurementFilter;
use crate::cloud::operations::AssertOperation;
use crate::assertion::CountRange;
use crate::error::{HarnessError, Result};
use crate::session::DeviceSession;

const DEFAULT_ARCH: &str = "aarch64";

/// Value handed back to the caller of a keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordOutput {
    None,
    Text(String),
    Json(Value),
}

impl KeywordOutput {
    fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }
}

/// Positional and named arguments of one keyword call.
#[derive(Debug, Default)]
pub struct Args {
    positional: Vec<String>,
    named: HashMap<String, String>,
}

impl Args {
    /// Split `raw` into positional and named values.
    ///
    /// Only `key=value` items whose key is one of `params` are named, so a
    /// command such as `echo a=b` stays positional.
    pub fn parse(raw: Vec<String>, params: &[&str]) -> Self {
        let mut args = Self::default();
        for item in raw {
            match item.split_once('=') {
                Some((key, value)) if params.contains(&key) => {
                    args.named.insert(key.to_string(), value.to_string());
                }
                _ => args.positional.push(item),
            }
        }
        args
    }

    /// Value given by name, or else at position `index`. `None` counts as unset.
    pub fn get(&self, index: usize, name: &str) -> Option<&str> {
        self.named
            .get(name)
            .or_else(|| self.positional.get(index))
            .map(String::as_str)
            .filter(|value| *value != "None")
    }

    pub fn required(&self, index: usize, name: &str) -> Result<&str> {
        self.get(index, name)
            .ok_or_else(|| HarnessError::InvalidArgument(format!("missing argument: {name}")))
    }

    /// Value that can only be given as `name=value`.
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named
            .get(name)
            .map(String::as_str)
            .filter(|value| *value != "None")
    }

    pub fn parse_value<T>(&self, index: usize, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        parse_as(name, self.get(index, name))
    }

    pub fn parse_named<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        parse_as(name, self.named(name))
    }

    pub fn flag(&self, index: usize, name: &str) -> Result<Option<bool>> {
        flag_as(name, self.get(index, name))
    }

    pub fn flag_named(&self, name: &str) -> Result<Option<bool>> {
        flag_as(name, self.named(name))
    }

    /// Positional values from `index` onwards.
    pub fn rest(&self, index: usize) -> Vec<&str> {
        self.positional
            .iter()
            .skip(index)
            .map(String::as_str)
            .collect()
    }
}

fn parse_as<T>(name: &str, value: Option<&str>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|value| {
            value.parse::<T>().map_err(|e| {
                HarnessError::InvalidArgument(format!("invalid value for {name}: {value}: {e}"))
            })
        })
        .transpose()
}

fn flag_as(name: &str, value: Option<&str>) -> Result<Option<bool>> {
    value
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(HarnessError::InvalidArgument(format!(
                "invalid value for {name}: {value}"
            ))),
        })
        .transpose()
}

type Handler = for<'a> fn(&'a mut DeviceSession, Args) -> BoxFuture<'a, Result<KeywordOutput>>;

struct Keyword {
    params: &'static [&'static str],
    handler: Handler,
}

macro_rules! boxed {
    ($handler:path) => {{
        fn boxed<'a>(
            session: &'a mut DeviceSession,
            args: Args,
        ) -> BoxFuture<'a, Result<KeywordOutput>> {
            Box::pin($handler(session, args))
        }
        boxed as Handler
    }};
}

/// Name to handler lookup for every keyword of the harness.
pub struct KeywordRegistry {
    keywords: HashMap<&'static str, Keyword>,
}

impl KeywordRegistry {
    pub fn empty() -> Self {
        Self {
            keywords: HashMap::new(),
        }
    }

    fn register(&mut self, name: &'static str, params: &'static [&'static str], handler: Handler) {
        self.keywords.insert(name, Keyword { params, handler });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keywords.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.keywords.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub async fn run(
        &self,
        session: &mut DeviceSession,
        name: &str,
        args: Vec<String>,
    ) -> Result<KeywordOutput> {
        let keyword = self
            .keywords
            .get(name)
            .ok_or_else(|| HarnessError::UnknownKeyword(name.to_string()))?;
        debug!("Running keyword '{}' with {:?}", name, args);
        (keyword.handler)(session, Args::parse(args, keyword.params)).await
    }

    /// Registry with every device and cloud keyword.
    pub fn standard() -> Self {
        let mut registry = Self::empty();

        // Device lifecycle
        registry.register("Setup Device", &["skip_bootstrap"], boxed!(setup_device));
        registry.register("Stop Device", &[], boxed!(stop_device));
        registry.register("Wait For Device To Be Ready", &[], boxed!(wait_for_ready));
        registry.register("Get Random Name", &["prefix"], boxed!(get_random_name));
        registry.register(
            "Execute Command On Device",
            &["exp_exit_code", "log_output"],
            boxed!(execute_command),
        );
        registry.register("Get Device Logs", &["name"], boxed!(get_device_logs));
        registry.register("Download From GitHub", &["arch"], boxed!(download_from_github));
        registry.register("Transfer To Device", &["src", "dst"], boxed!(transfer_to_device));

        // APT
        registry.register("Update APT Cache", &[], boxed!(apt_update));
        registry.register("Install Package Using APT", &[], boxed!(apt_install));
        registry.register("Remove Package Using APT", &[], boxed!(apt_remove));
        registry.register("Purge Package Using APT", &[], boxed!(apt_purge));

        // Files and directories
        registry.register("Directory Should Be Empty On Device", &["path"], boxed!(directory_empty));
        registry.register(
            "Directory Should Not Be Empty On Device",
            &["path"],
            boxed!(directory_not_empty),
        );
        registry.register("Directory Should Exist on Device", &["path"], boxed!(directory_exists));
        registry.register(
            "Directory Should Not Exist on Device",
            &["path"],
            boxed!(directory_not_exists),
        );
        registry.register("File Should Exist on Device", &["path"], boxed!(file_exists));
        registry.register("File Should Not Exist on Device", &["path"], boxed!(file_not_exists));

        // Services
        registry.register("Start Service", &["name"], boxed!(start_service));
        registry.register("Stop Service", &["name"], boxed!(stop_service));
        registry.register("Restart Service", &["name"], boxed!(restart_service));
        registry.register("Reload Services Manager", &[], boxed!(reload_services_manager));

        // Processes
        registry.register(
            "Process Should Be Running On Device",
            &["pattern"],
            boxed!(process_running),
        );
        registry.register(
            "Process Should Not Be Running On Device",
            &["pattern"],
            boxed!(process_not_running),
        );
        registry.register(
            "Should Match Processes on Device",
            &["pattern", "minimum", "maximum"],
            boxed!(process_count),
        );

        // Cloud
        registry.register("Set API Timeout", &["timeout"], boxed!(set_api_timeout));
        registry.register("Set Device", &["external_id", "external_type"], boxed!(set_device));
        registry.register(
            "Device Should Exist",
            &["external_id", "external_type"],
            boxed!(device_should_exist),
        );
        registry.register(
            "Device Should Have Alarm/s",
            &["minimum", "expected_text", "maximum", "type", "severity", "status", "resolved"],
            boxed!(device_alarms),
        );
        registry.register("Alarm Should Exist", &["alarm_id"], boxed!(alarm_exists));
        registry.register(
            "Device Should Have Event/s",
            &["expected_text", "with_attachment", "minimum", "maximum", "type", "fragmentType"],
            boxed!(device_events),
        );
        registry.register(
            "Event Should Have An Attachment",
            &["event_id", "expected_contents", "expected_pattern", "expected_size_min"],
            boxed!(event_attachment),
        );
        registry.register(
            "Event Should Not Have An Attachment",
            &["event_id"],
            boxed!(event_no_attachment),
        );
        registry.register(
            "Device Should Have Measurements",
            &["minimum", "maximum", "type", "valueFragmentType", "valueFragmentSeries"],
            boxed!(device_measurements),
        );
        registry.register("Device Should Have Child Devices", &[], boxed!(child_devices));
        registry.register("Device Should Have Fragments", &[], boxed!(fragments));
        registry.register(
            "Device Should Have Installed Software",
            &["mo"],
            boxed!(installed_software),
        );
        registry.register("Install Software", &[], boxed!(install_software));
        registry.register(
            "Operation Should Be SUCCESSFUL",
            &["operation"],
            boxed!(operation_successful),
        );
        registry.register("Operation Should Be PENDING", &["operation"], boxed!(operation_pending));
        registry.register(
            "Operation Should Not Be PENDING",
            &["operation"],
            boxed!(operation_not_pending),
        );
        registry.register("Operation Should Be DONE", &["operation"], boxed!(operation_done));
        registry.register(
            "Operation Should Be FAILED",
            &["operation", "failure_reason"],
            boxed!(operation_failed),
        );
        registry.register(
            "Delete Device Certificate From Platform",
            &["fingerprint"],
            boxed!(delete_certificate),
        );

        registry
    }
}

//
// Device lifecycle
//

async fn setup_device(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let skip_bootstrap = args.flag(0, "skip_bootstrap")?.unwrap_or(false);
    let serial = session.setup_device(skip_bootstrap).await?;
    Ok(KeywordOutput::Text(serial))
}

async fn stop_device(session: &mut DeviceSession, _args: Args) -> Result<KeywordOutput> {
    let report = session.teardown().await;
    Ok(KeywordOutput::Text(report.to_string()))
}

async fn wait_for_ready(session: &mut DeviceSession, _args: Args) -> Result<KeywordOutput> {
    session.wait_for_ready().await;
    Ok(KeywordOutput::None)
}

async fn get_random_name(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    Ok(KeywordOutput::Text(session.random_name(args.get(0, "prefix"))))
}

async fn execute_command(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let cmd = args.required(0, "cmd")?;
    let exp_exit_code = args.parse_value::<i64>(1, "exp_exit_code")?.or(Some(0));
    let log_output = args.flag(2, "log_output")?.unwrap_or(true);
    let output = session
        .execute_command_with(cmd, exp_exit_code, log_output)
        .await?;
    Ok(KeywordOutput::Text(output))
}

async fn get_device_logs(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let lines = session.get_logs(args.get(0, "name")).await?;
    Ok(KeywordOutput::Text(lines.join("\n")))
}

/// Run ids may also be given comma separated, e.g. from a variables file.
async fn download_from_github(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let run_ids: Vec<&str> = args
        .rest(0)
        .into_iter()
        .flat_map(|ids| ids.split(','))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    let arch = args.named("arch").unwrap_or(DEFAULT_ARCH);
    session.download_from_github(&run_ids, arch).await?;
    Ok(KeywordOutput::None)
}

async fn transfer_to_device(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let count = session
        .transfer_to_device(args.required(0, "src")?, args.required(1, "dst")?)
        .await?;
    Ok(KeywordOutput::Text(count.to_string()))
}

//
// APT
//

async fn apt_update(session: &mut DeviceSession, _args: Args) -> Result<KeywordOutput> {
    Ok(KeywordOutput::Text(session.apt_update().await?))
}

fn packages(args: &Args) -> Result<Vec<&str>> {
    let packages = args.rest(0);
    if packages.is_empty() {
        return Err(HarnessError::InvalidArgument(
            "at least one package is required".into(),
        ));
    }
    Ok(packages)
}

async fn apt_install(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    Ok(KeywordOutput::Text(session.apt_install(&packages(&args)?).await?))
}

async fn apt_remove(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    Ok(KeywordOutput::Text(session.apt_remove(&packages(&args)?).await?))
}

async fn apt_purge(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    Ok(KeywordOutput::Text(session.apt_purge(&packages(&args)?).await?))
}

//
// Files and directories
//

async fn directory_empty(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session.assert_directory_empty(args.required(0, "path")?).await?;
    Ok(KeywordOutput::None)
}

async fn directory_not_empty(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session
        .assert_directory_not_empty(args.required(0, "path")?)
        .await?;
    Ok(KeywordOutput::None)
}

async fn directory_exists(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session.assert_directory_exists(args.required(0, "path")?).await?;
    Ok(KeywordOutput::None)
}

async fn directory_not_exists(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session
        .assert_directory_not_exists(args.required(0, "path")?)
        .await?;
    Ok(KeywordOutput::None)
}

async fn file_exists(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session.assert_file_exists(args.required(0, "path")?).await?;
    Ok(KeywordOutput::None)
}

async fn file_not_exists(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session.assert_file_not_exists(args.required(0, "path")?).await?;
    Ok(KeywordOutput::None)
}

//
// Services
//

async fn start_service(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session.start_service(args.required(0, "name")?).await?;
    Ok(KeywordOutput::None)
}

async fn stop_service(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session.stop_service(args.required(0, "name")?).await?;
    Ok(KeywordOutput::None)
}

async fn restart_service(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session.restart_service(args.required(0, "name")?).await?;
    Ok(KeywordOutput::None)
}

async fn reload_services_manager(session: &mut DeviceSession, _args: Args) -> Result<KeywordOutput> {
    session.reload_services_manager().await?;
    Ok(KeywordOutput::None)
}

//
// Processes
//

async fn process_running(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session.assert_process_exists(args.required(0, "pattern")?).await?;
    Ok(KeywordOutput::None)
}

async fn process_not_running(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session
        .assert_process_not_exists(args.required(0, "pattern")?)
        .await?;
    Ok(KeywordOutput::None)
}

async fn process_count(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let count = session
        .assert_process_count(
            args.required(0, "pattern")?,
            args.parse_value(1, "minimum")?,
            args.parse_value(2, "maximum")?,
        )
        .await?;
    Ok(KeywordOutput::Text(count.to_string()))
}

//
// Cloud
//

fn count_range(args: &Args, min_index: usize, max_index: usize) -> Result<CountRange> {
    Ok(CountRange::from_bounds(
        args.parse_value(min_index, "minimum")?,
        args.parse_value(max_index, "maximum")?,
    ))
}

async fn set_api_timeout(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let timeout = args.parse_value::<f64>(0, "timeout")?.unwrap_or(30.0);
    if !timeout.is_finite() || timeout < 0.0 {
        return Err(HarnessError::InvalidArgument(format!(
            "invalid timeout: {timeout}"
        )));
    }
    session.set_api_timeout(Duration::from_secs_f64(timeout));
    Ok(KeywordOutput::None)
}

fn check_identity_type(args: &Args) -> Result<()> {
    match args.get(1, "external_type") {
        Some(id_type) if id_type != DEFAULT_IDENTITY_TYPE => Err(HarnessError::InvalidArgument(
            format!("unsupported external id type: {id_type}"),
        )),
        _ => Ok(()),
    }
}

async fn set_device(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    check_identity_type(&args)?;
    let mo = session.bind_cloud(args.get(0, "external_id")).await?;
    Ok(KeywordOutput::Text(mo.id))
}

async fn device_should_exist(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    check_identity_type(&args)?;
    session
        .bind_cloud(Some(args.required(0, "external_id")?))
        .await?;
    let mo = session.cloud()?.inventory().assert_exists().await?;
    KeywordOutput::json(&mo)
}

async fn device_alarms(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let range = CountRange::from_bounds(
        args.parse_value(0, "minimum")?,
        args.parse_named("maximum")?,
    );
    let mut filter = AlarmFilter::default();
    if let Some(text) = args.get(1, "expected_text") {
        filter = filter.with_text(text);
    }
    if let Some(alarm_type) = args.named("type") {
        filter = filter.with_type(alarm_type);
    }
    if let Some(severity) = args.parse_named::<Severity>("severity")? {
        filter = filter.with_severity(severity);
    }
    if let Some(status) = args.parse_named::<AlarmStatus>("status")? {
        filter = filter.with_status(status);
    }
    if let Some(resolved) = args.flag_named("resolved")? {
        filter = filter.resolved(resolved);
    }
    let alarms = session.cloud()?.alarms().assert_count(&filter, range).await?;
    KeywordOutput::json(&alarms)
}

async fn alarm_exists(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let alarm = session
        .cloud()?
        .alarms()
        .assert_exists(args.required(0, "alarm_id")?)
        .await?;
    KeywordOutput::json(&alarm)
}

async fn device_events(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let range = count_range(&args, 2, 3)?;
    let mut filter = EventFilter::default();
    if let Some(text) = args.get(0, "expected_text") {
        filter = filter.with_text(text);
    }
    if let Some(attached) = args.flag(1, "with_attachment")? {
        filter = filter.with_attachment(attached);
    }
    if let Some(event_type) = args.get(4, "type") {
        filter = filter.with_type(event_type);
    }
    if let Some(fragment) = args.get(5, "fragmentType") {
        filter = filter.with_fragment(fragment);
    }
    let events = session.cloud()?.events().assert_count(&filter, range).await?;
    KeywordOutput::json(&events)
}

async fn event_attachment(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let expected = AttachmentExpectation {
        contents: args.get(1, "expected_contents").map(str::to_string),
        pattern: args.get(2, "expected_pattern").map(str::to_string),
        min_size: args.parse_value(3, "expected_size_min")?,
    };
    let data = session
        .cloud()?
        .events()
        .assert_attachment(args.required(0, "event_id")?, &expected)
        .await?;
    Ok(KeywordOutput::Text(String::from_utf8_lossy(&data).into_owned()))
}

async fn event_no_attachment(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let event = session
        .cloud()?
        .events()
        .assert_no_attachment(args.required(0, "event_id")?)
        .await?;
    KeywordOutput::json(&event)
}

async fn device_measurements(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let range = count_range(&args, 0, 1)?;
    let mut filter = MeasurementFilter::default();
    if let Some(measurement_type) = args.get(2, "type") {
        filter = filter.with_type(measurement_type);
    }
    if let Some(fragment) = args.get(3, "valueFragmentType") {
        filter = filter.with_value_fragment(fragment);
    }
    if let Some(series) = args.get(4, "valueFragmentSeries") {
        filter = filter.with_series(series);
    }
    let measurements = session
        .cloud()?
        .measurements()
        .assert_count(&filter, range)
        .await
        .map_err(|e| match e {
            HarnessError::AssertionTimeout { .. } => HarnessError::Assertion(format!(
                "not enough measurements were found. {e}"
            )),
            other => other,
        })?;
    KeywordOutput::json(&measurements)
}

async fn child_devices(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let mo = session
        .cloud()?
        .inventory()
        .assert_child_device_names(&args.rest(0))
        .await?;
    KeywordOutput::json(&mo)
}

async fn fragments(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let mo = session
        .cloud()?
        .inventory()
        .assert_contains_fragments(&args.rest(0))
        .await?;
    KeywordOutput::json(&mo)
}

fn software_list(args: &Args) -> Vec<Software> {
    args.rest(0).into_iter().filter_map(Software::parse).collect()
}

async fn installed_software(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let mo = session
        .cloud()?
        .software_management()
        .assert_software_installed(&software_list(&args), args.named.get("mo").map(String::as_str))
        .await?;
    KeywordOutput::json(&mo)
}

async fn install_software(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let operation = session
        .cloud()?
        .software_management()
        .install(&software_list(&args))
        .await?;
    info!("Created software operation {}", operation.id());
    Ok(KeywordOutput::Text(operation.id().to_string()))
}

/// Operations are passed between keywords by id.
async fn load_operation(session: &DeviceSession, args: &Args) -> Result<AssertOperation> {
    let cloud = session.cloud()?;
    let operation = cloud
        .operations()
        .get(args.required(0, "operation")?)
        .await?;
    Ok(AssertOperation::new(
        cloud.client().clone(),
        operation,
        cloud.retry_config(),
    ))
}

async fn operation_successful(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let operation = load_operation(session, &args).await?.assert_success().await?;
    KeywordOutput::json(&operation)
}

async fn operation_pending(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let operation = load_operation(session, &args).await?.assert_pending().await?;
    KeywordOutput::json(&operation)
}

async fn operation_not_pending(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let operation = load_operation(session, &args)
        .await?
        .assert_not_pending()
        .await?;
    KeywordOutput::json(&operation)
}

async fn operation_done(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let operation = load_operation(session, &args).await?.assert_done().await?;
    KeywordOutput::json(&operation)
}

async fn operation_failed(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    let reason = args.get(1, "failure_reason").unwrap_or(".+").to_string();
    let operation = load_operation(session, &args)
        .await?
        .assert_failed(&reason)
        .await?;
    KeywordOutput::json(&operation)
}

async fn delete_certificate(session: &mut DeviceSession, args: Args) -> Result<KeywordOutput> {
    session
        .cloud()?
        .trusted_certificates()
        .delete_certificate(args.required(0, "fingerprint")?)
        .await?;
    Ok(KeywordOutput::None)
}
