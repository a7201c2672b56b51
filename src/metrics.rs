// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Metrics emitted while uploading documents.
//!
//! The transport of the metrics is up to the caller, through a
//! [MetricsSink].

use std::{fmt, sync::Mutex};
use tracing::info;

/// Namespace of all the metrics
pub const NAMESPACE: &str = "ReferenceDataService/Uploaders";
/// Name of the dimension holding the data source
pub const DIMENSION: &str = "By Data Source";

/// The events worth a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// The document has no operator
    NoOperatorData,
    /// No operator of the document has a National Operator Code
    NoNOCsInFile,
    /// No operator of the document has a service
    NoServiceDataInFile,
    /// The document has no vehicle journey
    NoVehicleJourneysDataInFile,
    /// No service of the document has a line
    NoLineDataInFile,
    /// No line of the document has usable journey patterns
    NoUseableDataInFile,
    /// An operator code is not a known operator
    InvalidNoc,
}

impl Metric {
    /// Name of the metric
    pub fn name(self) -> &'static str {
        use Metric::*;
        match self {
            NoOperatorData => "NoOperatorData",
            NoNOCsInFile => "NoNOCsInFile",
            NoServiceDataInFile => "NoServiceDataInFile",
            NoVehicleJourneysDataInFile => "NoVehicleJourneysDataInFile",
            NoLineDataInFile => "NoLineDataInFile",
            NoUseableDataInFile => "NoUseableDataInFile",
            InvalidNoc => "InvalidNoc",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Destination of the metrics
pub trait MetricsSink {
    /// Emit `value` for `metric`, with the data source as dimension
    fn put_metric(&self, data_source: &str, metric: Metric, value: f64);
}

/// Emit the metrics as log events.
#[derive(Debug, Default)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn put_metric(&self, data_source: &str, metric: Metric, value: f64) {
        info!(
            namespace = NAMESPACE,
            dimension = DIMENSION,
            data_source,
            metric = metric.name(),
            value,
            "Metric {} for data source '{}'",
            metric,
            data_source
        );
    }
}

/// A metric recorded by [InMemoryMetrics]
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDatum {
    /// Value of the dimension
    pub data_source: String,
    /// The metric
    pub metric: Metric,
    /// Its value
    pub value: f64,
}

/// Keep the metrics in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    data: Mutex<Vec<MetricDatum>>,
}

impl InMemoryMetrics {
    /// All the metrics emitted so far
    pub fn data(&self) -> Vec<MetricDatum> {
        self.data
            .lock()
            .map(|data| data.clone())
            .unwrap_or_default()
    }

    /// Sum of the values emitted for `metric`
    pub fn total(&self, metric: Metric) -> f64 {
        self.data()
            .iter()
            .filter(|datum| datum.metric == metric)
            .map(|datum| datum.value)
            .sum()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn put_metric(&self, data_source: &str, metric: Metric, value: f64) {
        if let Ok(mut data) = self.data.lock() {
            data.push(MetricDatum {
                data_source: data_source.to_string(),
                metric,
                value,
            });
        }
    }
}
