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

//! Write a whole TransXChange document to the database, in one transaction.

use crate::{
    configuration::Configuration,
    metrics::{Metric, MetricsSink},
    objects::{Line, Operator, Service, ServiceLine, TransXChange},
    store::{InsertOutcome, ServiceLineOutcome, Store},
    transxchange::{
        self,
        bank_holidays::BankHolidayEntry,
        journey_patterns::{
            collect_journey_patterns, has_usable_data, retain_referenced,
            CollectedJourneyPattern, TrackSource,
        },
        tracks::resolve_track,
        vehicle_journeys::format_vehicle_journeys,
    },
    Result,
};
use rusqlite::Connection;
use serde_json::Value;
use std::{collections::BTreeSet, fmt};
use tracing::{debug, error, info};

/// Why nothing was written for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The document has no operator at all
    NoOperatorData,
    /// No operator has a National Operator Code
    NoNocs,
    /// No operator with a NOC has a service
    NoServiceData,
    /// The document has no vehicle journey
    NoVehicleJourneysData,
    /// No service has a line
    NoLineData,
    /// No line has usable journey patterns
    NoUseableData,
}

impl FailureReason {
    /// The metric emitted for this failure
    pub fn metric(self) -> Metric {
        match self {
            FailureReason::NoOperatorData => Metric::NoOperatorData,
            FailureReason::NoNocs => Metric::NoNOCsInFile,
            FailureReason::NoServiceData => Metric::NoServiceDataInFile,
            FailureReason::NoVehicleJourneysData => Metric::NoVehicleJourneysDataInFile,
            FailureReason::NoLineData => Metric::NoLineDataInFile,
            FailureReason::NoUseableData => Metric::NoUseableDataInFile,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            FailureReason::NoOperatorData => "No operator data found",
            FailureReason::NoNocs => "No NOCs found",
            FailureReason::NoServiceData => "No service data found",
            FailureReason::NoVehicleJourneysData => "No vehicle journeys data found",
            FailureReason::NoLineData => "No line data found",
            FailureReason::NoUseableData => "No useable data found",
        };
        write!(f, "{}", message)
    }
}

/// Result of [write_to_database] when no unexpected error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The document was committed
    Written,
    /// The document was rolled back
    NotWritten(FailureReason),
}

// What was found while walking the document
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct FileFlags {
    has_nocs: bool,
    has_services: bool,
    has_vehicle_journeys: bool,
    has_lines: bool,
    has_usable_data: bool,
}

impl FileFlags {
    fn failure(self) -> Option<FailureReason> {
        if !self.has_nocs {
            Some(FailureReason::NoNocs)
        } else if !self.has_services {
            Some(FailureReason::NoServiceData)
        } else if !self.has_vehicle_journeys {
            Some(FailureReason::NoVehicleJourneysData)
        } else if !self.has_lines {
            Some(FailureReason::NoLineData)
        } else if !self.has_usable_data {
            Some(FailureReason::NoUseableData)
        } else {
            None
        }
    }
}

struct Writer<'a, M> {
    store: Store<'a>,
    transxchange: &'a TransXChange,
    configuration: &'a Configuration,
    metrics: &'a M,
    bank_holidays: &'a [BankHolidayEntry],
}

impl<M: MetricsSink> Writer<'_, M> {
    fn write_operators(&self) -> Result<FileFlags> {
        let key = &self.configuration.key;
        let mut flags = FileFlags::default();
        for operator in &self.transxchange.operators {
            let noc = match &operator.national_operator_code {
                Some(noc) => noc,
                None => {
                    info!(
                        "No NOC found for operator: '{}', in TXC file: '{}'",
                        operator.short_name.as_deref().unwrap_or_default(),
                        key
                    );
                    continue;
                }
            };
            flags.has_nocs = true;

            let services = self.transxchange.services_for_operator(operator);
            if services.is_empty() {
                info!(
                    "No service data found for operator: '{}', in TXC file: '{}'",
                    noc, key
                );
                continue;
            }
            flags.has_services = true;

            if self.transxchange.vehicle_journeys.is_empty() {
                info!(
                    "No vehicle journey data found for operator: '{}', in TXC file: '{}'",
                    noc, key
                );
                continue;
            }
            flags.has_vehicle_journeys = true;

            for service in services {
                if service.lines.is_empty() {
                    info!(
                        "No line data found for service: '{}', for operator: '{}', in TXC file: '{}'",
                        service.service_code.as_deref().unwrap_or_default(),
                        noc,
                        key
                    );
                    continue;
                }
                flags.has_lines = true;
                for line in &service.lines {
                    if self.write_line(operator, service, line)? {
                        flags.has_usable_data = true;
                    }
                }
            }
        }
        Ok(flags)
    }

    // Returns whether the line has usable data
    fn write_line(&self, operator: &Operator, service: &Service, line: &Line) -> Result<bool> {
        let service_line = ServiceLine::new(
            operator,
            service,
            line,
            &self.configuration.data_source,
            self.configuration.region_code.as_deref(),
            &self.configuration.key,
        );
        let service_line_id = match self.store.find_existing_service_line(&service_line)? {
            Some(id) => id,
            None => match self.store.insert_service_line(&service_line)? {
                ServiceLineOutcome::Created(id) => id,
                ServiceLineOutcome::InvalidNoc => {
                    info!(
                        "NOC not found in database - '{}' - '{}'",
                        service_line.noc_code.as_deref().unwrap_or_default(),
                        service_line.operator_short_name.as_deref().unwrap_or_default()
                    );
                    self.metrics.put_metric(
                        &self.configuration.data_source,
                        Metric::InvalidNoc,
                        1.0,
                    );
                    return Ok(false);
                }
            },
        };

        let sections = &self.transxchange.journey_pattern_sections;
        let formatted = format_vehicle_journeys(
            &self.transxchange.vehicle_journeys,
            line.id.as_deref(),
            self.bank_holidays,
            service,
            self.configuration.anchor_date,
        );
        let retained = retain_referenced(
            collect_journey_patterns(service, sections),
            &formatted.vehicle_journeys,
        );
        let usable = has_usable_data(service, sections, &retained);
        if usable {
            self.write_journey_patterns(
                service_line_id,
                &retained,
                formatted.journey_pattern_for_tracks.as_deref(),
            )?;
        }
        let inserted = self
            .store
            .insert_vehicle_journeys(service_line_id, &formatted.vehicle_journeys)?;
        debug!(
            "{} vehicle journeys inserted for line '{}'",
            inserted, service_line.line_id
        );
        Ok(usable)
    }

    fn write_journey_patterns(
        &self,
        service_line_id: i64,
        journey_patterns: &[CollectedJourneyPattern<'_>],
        journey_pattern_for_tracks: Option<&str>,
    ) -> Result<()> {
        let mut admin_area_codes = BTreeSet::new();
        let mut track_source = None;
        for collected in journey_patterns {
            let journey_pattern = collected.journey_pattern;
            let joined_section_refs = journey_pattern.joined_section_refs();
            let journey_pattern_id = match self.store.insert_journey_pattern(
                service_line_id,
                journey_pattern,
                &joined_section_refs,
            )? {
                InsertOutcome::Inserted(id) => id,
                InsertOutcome::Skipped => {
                    info!(
                        "Existing journey pattern found - '{}' - '{}' - '{}' - '{}' - '{}'",
                        service_line_id,
                        journey_pattern.destination_display.as_deref().unwrap_or_default(),
                        journey_pattern.direction.as_deref().unwrap_or_default(),
                        journey_pattern.route_ref.as_deref().unwrap_or_default(),
                        joined_section_refs
                    );
                    continue;
                }
            };

            let timing_links = collected.timing_links();
            self.store
                .insert_journey_pattern_links(journey_pattern_id, &timing_links)?;
            let stop_codes: BTreeSet<&str> = timing_links
                .iter()
                .flat_map(|timing_link| {
                    vec![
                        timing_link.from_atco_code.as_str(),
                        timing_link.to_atco_code.as_str(),
                    ]
                })
                .collect();
            admin_area_codes.extend(self.store.admin_area_codes(&stop_codes)?);

            if journey_pattern_for_tracks.is_some()
                && journey_pattern.id.as_deref() == journey_pattern_for_tracks
            {
                track_source = Some(TrackSource::new(collected));
            }
        }

        if !admin_area_codes.is_empty() {
            self.store
                .insert_admin_area_codes(service_line_id, &admin_area_codes)?;
        }
        if let Some(track_source) = track_source {
            self.write_track_source(service_line_id, &track_source)?;
        }
        Ok(())
    }

    fn write_track_source(&self, service_line_id: i64, track_source: &TrackSource) -> Result<()> {
        if let Some(centre_stop) = &track_source.centre_stop {
            if let Some(centre_point) = self.store.stop_location(centre_stop)? {
                self.store.update_centre_point(service_line_id, centre_point)?;
            }
        }
        if let Some(route_ref) = &track_source.route_ref {
            if !track_source.route_link_refs.is_empty() {
                let track_points =
                    resolve_track(self.transxchange, route_ref, &track_source.route_link_refs);
                if !track_points.is_empty() {
                    self.store.insert_tracks(service_line_id, &track_points)?;
                }
            }
        }
        Ok(())
    }
}

/// Write a normalized TransXChange document.
///
/// Everything is written in a single transaction, committed only when the
/// document has operators with a NOC, services, vehicle journeys, lines and
/// usable journey patterns. Otherwise the transaction is rolled back, the
/// metric of the [FailureReason] is emitted and
/// [WriteOutcome::NotWritten] is returned. Any other error rolls the
/// transaction back and is returned.
pub fn write_to_database<M: MetricsSink>(
    document: &Value,
    configuration: &Configuration,
    connection: &mut Connection,
    metrics: &M,
    bank_holidays: &[BankHolidayEntry],
) -> Result<WriteOutcome> {
    let key = &configuration.key;
    let data_source = &configuration.data_source;
    let transxchange = transxchange::read(document)?;
    if transxchange.operators.is_empty() {
        info!("No operator data found in TXC file: '{}'", key);
        metrics.put_metric(data_source, Metric::NoOperatorData, 1.0);
        return Ok(WriteOutcome::NotWritten(FailureReason::NoOperatorData));
    }

    let transaction = connection.transaction()?;
    let writer = Writer {
        store: Store::new(&transaction),
        transxchange: &transxchange,
        configuration,
        metrics,
        bank_holidays,
    };
    let flags = writer.write_operators();
    drop(writer);
    let flags = match flags {
        Ok(flags) => flags,
        Err(error) => {
            error!(
                "ERROR! Unexpected error. Could not write to database. Error: {:?}",
                error
            );
            if let Err(rollback_error) = transaction.rollback() {
                error!("Failed to roll back: {}", rollback_error);
            }
            return Err(error);
        }
    };

    match flags.failure() {
        Some(reason) => {
            info!("{} in TXC file: '{}'", reason, key);
            transaction.rollback()?;
            metrics.put_metric(data_source, reason.metric(), 1.0);
            Ok(WriteOutcome::NotWritten(reason))
        }
        None => {
            transaction.commit()?;
            Ok(WriteOutcome::Written)
        }
    }
}
