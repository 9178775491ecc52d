use std::fmt::Display;

use chrono::{DateTime, Utc};
use regex::Regex;
use tedge_it_shared::event::{BinaryInfo, Event, EventCollection};
use tracing::{debug, info};

use crate::assertion::{self, CountRange};
use crate::cloud::DeviceManagement;
use crate::error::{HarnessError, Result};

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<String>,
    pub fragment_type: Option<String>,
    /// Exact match on `text`, applied after fetching.
    pub expected_text: Option<String>,
    pub with_attachment: Option<bool>,
    pub after: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment_type = Some(fragment.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.expected_text = Some(text.into());
        self
    }

    pub fn with_attachment(mut self, attached: bool) -> Self {
        self.with_attachment = Some(attached);
        self
    }

    pub fn after(mut self, time: DateTime<Utc>) -> Self {
        self.after = Some(time);
        self
    }

    fn matches(&self, event: &Event) -> bool {
        let text_ok = self
            .expected_text
            .as_deref()
            .is_none_or(|text| event.text == text);
        let attachment_ok = self
            .with_attachment
            .is_none_or(|attached| event.has_attachment() == attached);
        text_ok && attachment_ok
    }
}

impl Display for EventFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type={:?}, fragmentType={:?}, text={:?}, with_attachment={:?}",
            self.event_type, self.fragment_type, self.expected_text, self.with_attachment
        )
    }
}

/// What an event attachment must look like. Unset fields are not checked.
#[derive(Debug, Clone, Default)]
pub struct AttachmentExpectation {
    pub contents: Option<String>,
    pub pattern: Option<String>,
    pub min_size: Option<usize>,
}

impl AttachmentExpectation {
    fn check(&self, event_id: &str, data: &[u8]) -> Result<()> {
        if let Some(min_size) = self.min_size.filter(|min| data.len() < *min) {
            return Err(HarnessError::Assertion(format!(
                "attachment of event {event_id} is {} bytes, expected at least {min_size}",
                data.len()
            )));
        }

        let text = String::from_utf8_lossy(data);
        if self.contents.as_deref().is_some_and(|contents| text != contents) {
            return Err(HarnessError::Assertion(format!(
                "attachment of event {event_id} does not match the expected contents"
            )));
        }
        if let Some(pattern) = &self.pattern {
            let re = Regex::new(pattern)
                .map_err(|e| HarnessError::InvalidArgument(format!("bad pattern {pattern}: {e}")))?;
            if !re.is_match(&text) {
                return Err(HarnessError::Assertion(format!(
                    "attachment of event {event_id} does not match pattern {pattern}"
                )));
            }
        }
        Ok(())
    }
}

pub struct Events<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Events<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut query = self.ctx.source_query(filter.after)?;
        if let Some(event_type) = &filter.event_type {
            query.push(("type", event_type.clone()));
        }
        if let Some(fragment) = &filter.fragment_type {
            query.push(("fragmentType", fragment.clone()));
        }

        let collection: EventCollection = self.ctx.client().get_json("/event/events", &query).await?;
        Ok(collection
            .events
            .into_iter()
            .filter(|event| filter.matches(event))
            .collect())
    }

    pub async fn assert_count(&self, filter: &EventFilter, range: CountRange) -> Result<Vec<Event>> {
        let events = assertion::assert_count(
            self.ctx.retry_config(),
            "events",
            range,
            filter,
            || self.fetch(filter),
        )
        .await?;
        info!("Found {} matching event(s)", events.len());
        Ok(events)
    }

    pub async fn assert_exists(&self, id: &str) -> Result<Event> {
        let path = format!("/event/events/{id}");
        assertion::wait_for_result(self.ctx.retry_config(), &format!("event {id}"), || {
            self.ctx.client().find_json::<Event>(&path)
        })
        .await
    }

    /// Download the event's binary and check it. Returns the raw bytes.
    pub async fn assert_attachment(
        &self,
        id: &str,
        expected: &AttachmentExpectation,
    ) -> Result<Vec<u8>> {
        let event = self.assert_exists(id).await?;
        if !event.has_attachment() {
            return Err(HarnessError::Assertion(format!(
                "event {id} does not have an attachment"
            )));
        }

        let data = self
            .ctx
            .client()
            .get_bytes(&format!("/event/events/{id}/binaries"))
            .await?;
        debug!("Downloaded {} bytes attached to event {}", data.len(), id);
        expected.check(id, &data)?;
        Ok(data)
    }

    /// Check the attachment metadata; `name_pattern` must match the whole name.
    pub fn assert_attachment_info(&self, event: &Event, name_pattern: &str) -> Result<BinaryInfo> {
        let info = event.attachment().ok_or_else(|| {
            HarnessError::Assertion(format!("event {} does not have an attachment", event.id))
        })?;
        let re = Regex::new(&format!("^(?:{name_pattern})$"))
            .map_err(|e| HarnessError::InvalidArgument(format!("bad pattern {name_pattern}: {e}")))?;
        if !re.is_match(&info.name) {
            return Err(HarnessError::Assertion(format!(
                "attachment name {} does not match {}",
                info.name, name_pattern
            )));
        }
        Ok(info)
    }

    pub async fn assert_no_attachment(&self, id: &str) -> Result<Event> {
        let event = self.assert_exists(id).await?;
        if event.has_attachment() {
            return Err(HarnessError::Assertion(format!(
                "event {id} has an unexpected attachment"
            )));
        }
        Ok(event)
    }
}
