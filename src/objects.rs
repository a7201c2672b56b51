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

//! The typed model of a TransXChange document, as read by
//! [transxchange::read](crate::transxchange::read), and the records written
//! to the database.
#![allow(missing_docs)]

use crate::transxchange::operating_profile::OperatingProfile;

/// Calendar date
pub type Date = chrono::NaiveDate;

/// Everything the uploader needs from one document.
#[derive(Debug, Default)]
pub struct TransXChange {
    /// Operators and licensed operators, in this order
    pub operators: Vec<Operator>,
    /// All the services of the document
    pub services: Vec<Service>,
    /// All the vehicle journeys of the document
    pub vehicle_journeys: Vec<VehicleJourney>,
    /// All the journey pattern sections of the document
    pub journey_pattern_sections: Vec<JourneyPatternSection>,
    /// All the routes of the document
    pub routes: Vec<Route>,
    /// All the route sections of the document
    pub route_sections: Vec<RouteSection>,
}

impl TransXChange {
    /// Services registered to the operator
    pub fn services_for_operator<'a>(&'a self, operator: &Operator) -> Vec<&'a Service> {
        self.services
            .iter()
            .filter(|service| {
                service.registered_operator_ref.is_some()
                    && service.registered_operator_ref == operator.id
            })
            .collect()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Operator {
    pub id: Option<String>,
    /// National Operator Code, required for an operator to be loaded
    pub national_operator_code: Option<String>,
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPeriod {
    pub start_date: Date,
    /// No end date means the service runs until further notice
    pub end_date: Option<Date>,
}

/// A range of days of an operating profile, bounds included
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl DateRange {
    /// A missing bound is replaced by `today`, which is the real current
    /// date and not the date being checked.
    pub fn contains(&self, date: Date, today: Date) -> bool {
        let start_date = self.start_date.unwrap_or(today);
        let end_date = self.end_date.unwrap_or(today);
        start_date <= date && date <= end_date
    }
}

#[derive(Debug, Default)]
pub struct Service {
    pub service_code: Option<String>,
    pub registered_operator_ref: Option<String>,
    pub description: String,
    /// Transport mode, `bus`, `ferry`, etc.
    pub mode: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub operating_period: Option<OperatingPeriod>,
    pub operating_profile: Option<OperatingProfile>,
    pub lines: Vec<Line>,
    pub journey_patterns: Vec<JourneyPattern>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Line {
    pub id: Option<String>,
    pub name: String,
    pub inbound_description: String,
    pub outbound_description: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct JourneyPattern {
    pub id: Option<String>,
    pub destination_display: Option<String>,
    pub direction: Option<String>,
    pub route_ref: Option<String>,
    /// In the order of the document
    pub section_refs: Vec<String>,
}

impl JourneyPattern {
    /// Concatenation of the sorted section references, part of the identity
    /// of a journey pattern
    pub fn joined_section_refs(&self) -> String {
        let mut section_refs: Vec<&str> = self.section_refs.iter().map(String::as_str).collect();
        section_refs.sort_unstable();
        section_refs.concat()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct JourneyPatternSection {
    pub id: String,
    pub timing_links: Vec<TimingLink>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimingLink {
    pub from_atco_code: String,
    pub from_timing_status: Option<String>,
    pub from_sequence_number: Option<String>,
    pub to_atco_code: String,
    pub to_timing_status: Option<String>,
    pub to_sequence_number: Option<String>,
    pub run_time: Option<String>,
    pub route_link_ref: Option<String>,
}

#[derive(Debug, Default)]
pub struct VehicleJourney {
    pub code: Option<String>,
    pub service_ref: Option<String>,
    pub line_ref: Option<String>,
    pub journey_pattern_ref: Option<String>,
    /// Reference to another vehicle journey, which then uses this line
    pub vehicle_journey_ref: Option<String>,
    pub departure_time: Option<String>,
    /// Ticket machine journey code
    pub journey_code: Option<String>,
    pub operating_profile: Option<OperatingProfile>,
}

/// A vehicle journey ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedVehicleJourney {
    pub vehicle_journey_code: Option<String>,
    pub service_ref: Option<String>,
    pub line_ref: Option<String>,
    pub journey_pattern_ref: Option<String>,
    pub departure_time: Option<String>,
    pub journey_code: Option<String>,
    /// Whether the journey runs on the anchor date of the upload
    pub operational_for_today: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub section_refs: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RouteSection {
    pub id: String,
    pub route_links: Vec<RouteLink>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RouteLink {
    pub id: String,
    /// Locations of all the tracks of the link, in order
    pub locations: Vec<Location>,
}

/// Raw coordinates of a track location, as found in the document
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Coordinates {
    pub longitude: Option<String>,
    pub latitude: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Location {
    pub coordinates: Coordinates,
    /// Coordinates given in a `Translation`, preferred when present
    pub translation: Option<Coordinates>,
}

/// A geographic point, WGS84
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// One row of the `services` table: an operator's service for one line.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ServiceLine {
    pub noc_code: Option<String>,
    pub line_name: String,
    pub line_id: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub operator_short_name: Option<String>,
    pub inbound_direction_description: String,
    pub outbound_direction_description: String,
    pub service_description: String,
    pub service_code: Option<String>,
    pub region_code: Option<String>,
    pub data_source: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub mode: String,
    pub file_path: String,
}

const UNIQUE_LINE_ID_PREFIX: &str = "UZ";
const UNIQUE_LINE_ID_PADDING: &str = "000";
const BUS_MODE: &str = "bus";
const TNDS_DATA_SOURCE: &str = "tnds";

/// Build a line identifier for a line which has none (or whose identifier
/// can't be trusted): `UZ000{noc}:{noc}{line_name}`
pub fn create_unique_line_id(noc: &str, line_name: &str) -> String {
    format!(
        "{}{}{}:{}{}",
        UNIQUE_LINE_ID_PREFIX, UNIQUE_LINE_ID_PADDING, noc, noc, line_name
    )
}

impl ServiceLine {
    /// Gather the row of a line of a service of an operator. The line
    /// identifier is synthesized when the line has none or when a non-bus
    /// line comes from TNDS.
    pub fn new(
        operator: &Operator,
        service: &Service,
        line: &Line,
        data_source: &str,
        region_code: Option<&str>,
        file_path: &str,
    ) -> Self {
        let noc_code = operator.national_operator_code.clone();
        let line_id = match &line.id {
            Some(id) if !(service.mode != BUS_MODE && data_source == TNDS_DATA_SOURCE) => {
                id.clone()
            }
            _ => create_unique_line_id(noc_code.as_deref().unwrap_or_default(), &line.name),
        };
        ServiceLine {
            noc_code,
            line_name: line.name.clone(),
            line_id,
            start_date: service.operating_period.map(|period| period.start_date),
            end_date: service.operating_period.and_then(|period| period.end_date),
            operator_short_name: operator.short_name.clone(),
            inbound_direction_description: line.inbound_description.clone(),
            outbound_direction_description: line.outbound_description.clone(),
            service_description: service.description.clone(),
            service_code: service.service_code.clone(),
            region_code: region_code.map(String::from),
            data_source: data_source.to_string(),
            origin: service.origin.clone(),
            destination: service.destination.clone(),
            mode: service.mode.clone(),
            file_path: file_path.to_string(),
        }
    }
}
