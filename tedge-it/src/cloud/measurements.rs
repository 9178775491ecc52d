use std::fmt::Display;

use chrono::{DateTime, Utc};
use tedge_it_shared::measurement::{Measurement, MeasurementCollection};
use tracing::info;

use crate::assertion::{self, CountRange};
use crate::cloud::DeviceManagement;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct MeasurementFilter {
    pub measurement_type: Option<String>,
    pub value_fragment_type: Option<String>,
    pub value_fragment_series: Option<String>,
    pub after: Option<DateTime<Utc>>,
}

impl MeasurementFilter {
    pub fn with_type(mut self, measurement_type: impl Into<String>) -> Self {
        self.measurement_type = Some(measurement_type.into());
        self
    }

    pub fn with_value_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.value_fragment_type = Some(fragment.into());
        self
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.value_fragment_series = Some(series.into());
        self
    }

    pub fn after(mut self, time: DateTime<Utc>) -> Self {
        self.after = Some(time);
        self
    }
}

impl Display for MeasurementFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type={:?}, valueFragmentType={:?}, valueFragmentSeries={:?}",
            self.measurement_type, self.value_fragment_type, self.value_fragment_series
        )
    }
}

pub struct Measurements<'a> {
    ctx: &'a DeviceManagement,
}

impl<'a> Measurements<'a> {
    pub(crate) fn new(ctx: &'a DeviceManagement) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, filter: &MeasurementFilter) -> Result<Vec<Measurement>> {
        let mut query = self.ctx.source_query(filter.after)?;
        if let Some(measurement_type) = &filter.measurement_type {
            query.push(("type", measurement_type.clone()));
        }
        if let Some(fragment) = &filter.value_fragment_type {
            query.push(("valueFragmentType", fragment.clone()));
        }
        if let Some(series) = &filter.value_fragment_series {
            query.push(("valueFragmentSeries", series.clone()));
        }

        let collection: MeasurementCollection = self
            .ctx
            .client()
            .get_json("/measurement/measurements", &query)
            .await?;
        Ok(collection.measurements)
    }

    pub async fn assert_count(
        &self,
        filter: &MeasurementFilter,
        range: CountRange,
    ) -> Result<Vec<Measurement>> {
        let measurements = assertion::assert_count(
            self.ctx.retry_config(),
            "measurements",
            range,
            filter,
            || self.fetch(filter),
        )
        .await?;
        info!("Found {} matching measurement(s)", measurements.len());
        Ok(measurements)
    }
}
