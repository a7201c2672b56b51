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

//! Persistence of the uploaded data in a SQLite database.
//!
//! All the operations of [Store] run on the connection they are given,
//! usually a [rusqlite::Transaction] opened for a whole document, so that a
//! rollback undoes everything written for the document.

use crate::{
    objects::{FormattedVehicleJourney, JourneyPattern, ServiceLine, TimingLink, TrackPoint},
    Result,
};
use anyhow::Context;
use rusqlite::{ffi, named_params, params, params_from_iter, Connection, OptionalExtension};
use std::{collections::BTreeSet, path::Path};
use tracing::{debug, info};

const SCHEMA: &str = include_str!("schema.sql");

/// Open a SQLite database, creating it if needed.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    let connection =
        Connection::open(path).with_context(|| format!("Error opening database {:?}", path))?;
    connection.pragma_update(None, "foreign_keys", true)?;
    Ok(connection)
}

/// Open a database in memory.
pub fn open_in_memory() -> Result<Connection> {
    let connection = Connection::open_in_memory()?;
    connection.pragma_update(None, "foreign_keys", true)?;
    Ok(connection)
}

/// Create the tables which do not exist yet.
pub fn create_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(SCHEMA)
        .context("Error creating the database schema")?;
    Ok(())
}

/// Result of the creation of a service line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServiceLineOutcome {
    /// Identifier of the new row
    Created(i64),
    /// The operator code is not a known operator
    InvalidNoc,
}

/// Result of an insertion which is skipped when the row already exists
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsertOutcome {
    /// Identifier of the new row
    Inserted(i64),
    /// An identical row already exists
    Skipped,
}

/// Queries of the uploader.
pub struct Store<'c> {
    connection: &'c Connection,
}

impl<'c> Store<'c> {
    /// Run the queries on `connection`
    pub fn new(connection: &'c Connection) -> Self {
        Store { connection }
    }

    /// Add an operator to the reference data
    pub fn insert_operator(&self, noc_code: &str, operator_short_name: Option<&str>) -> Result<()> {
        self.connection.execute(
            "INSERT INTO operators (noc_code, operator_short_name) VALUES (?1, ?2)",
            params![noc_code, operator_short_name],
        )?;
        Ok(())
    }

    /// Add a locality to the reference data
    pub fn insert_locality(&self, nptg_locality_code: &str, admin_area_code: &str) -> Result<()> {
        self.connection.execute(
            "INSERT INTO localities (nptg_locality_code, administrative_area_code) VALUES (?1, ?2)",
            params![nptg_locality_code, admin_area_code],
        )?;
        Ok(())
    }

    /// Add a stop to the reference data
    pub fn insert_stop(
        &self,
        atco_code: &str,
        nptg_locality_code: &str,
        location: Option<TrackPoint>,
    ) -> Result<()> {
        self.connection.execute(
            "INSERT INTO stops (atco_code, nptg_locality_code, longitude, latitude) VALUES (?1, ?2, ?3, ?4)",
            params![
                atco_code,
                nptg_locality_code,
                location.map(|location| location.longitude),
                location.map(|location| location.latitude),
            ],
        )?;
        Ok(())
    }

    /// Identifier of an already uploaded service line with the same
    /// operator, line name, service code, dates and data source.
    pub fn find_existing_service_line(&self, service_line: &ServiceLine) -> Result<Option<i64>> {
        let id = self
            .connection
            .query_row(
                "SELECT id FROM services
                WHERE noc_code IS :noc_code
                AND line_name IS :line_name
                AND service_code IS :service_code
                AND start_date IS :start_date
                AND end_date IS :end_date
                AND data_source IS :data_source
                LIMIT 1",
                named_params! {
                    ":noc_code": service_line.noc_code,
                    ":line_name": service_line.line_name,
                    ":service_code": service_line.service_code,
                    ":start_date": service_line.start_date,
                    ":end_date": service_line.end_date,
                    ":data_source": service_line.data_source,
                },
                |row| row.get(0),
            )
            .optional()?;
        if id.is_some() {
            info!(
                "Existing line found - '{}' - '{}' - '{}' - '{}' - '{}'",
                service_line.noc_code.as_deref().unwrap_or_default(),
                service_line.line_name,
                service_line.service_code.as_deref().unwrap_or_default(),
                service_line
                    .start_date
                    .map(|date| date.to_string())
                    .unwrap_or_default(),
                service_line.data_source
            );
        }
        Ok(id)
    }

    /// Create a service line. An operator code missing from the operators
    /// gives [ServiceLineOutcome::InvalidNoc], any other failure is an error.
    pub fn insert_service_line(&self, service_line: &ServiceLine) -> Result<ServiceLineOutcome> {
        let result = self.connection.query_row(
            "INSERT INTO services (
                noc_code, line_name, line_id, start_date, end_date, operator_short_name,
                inbound_direction_description, outbound_direction_description,
                service_description, service_code, region_code, data_source, origin,
                destination, mode, file_path
            ) VALUES (
                :noc_code, :line_name, :line_id, :start_date, :end_date, :operator_short_name,
                :inbound_direction_description, :outbound_direction_description,
                :service_description, :service_code, :region_code, :data_source, :origin,
                :destination, :mode, :file_path
            ) RETURNING id",
            named_params! {
                ":noc_code": service_line.noc_code,
                ":line_name": service_line.line_name,
                ":line_id": service_line.line_id,
                ":start_date": service_line.start_date,
                ":end_date": service_line.end_date,
                ":operator_short_name": service_line.operator_short_name,
                ":inbound_direction_description": service_line.inbound_direction_description,
                ":outbound_direction_description": service_line.outbound_direction_description,
                ":service_description": service_line.service_description,
                ":service_code": service_line.service_code,
                ":region_code": service_line.region_code,
                ":data_source": service_line.data_source,
                ":origin": service_line.origin,
                ":destination": service_line.destination,
                ":mode": service_line.mode,
                ":file_path": service_line.file_path,
            },
            |row| row.get(0),
        );
        match result {
            Ok(id) => Ok(ServiceLineOutcome::Created(id)),
            Err(rusqlite::Error::SqliteFailure(error, _))
                if error.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Ok(ServiceLineOutcome::InvalidNoc)
            }
            Err(error) => Err(error).with_context(|| {
                format!(
                    "Error inserting line '{}' of service '{}'",
                    service_line.line_name,
                    service_line.service_code.as_deref().unwrap_or_default()
                )
            }),
        }
    }

    /// Insert a journey pattern unless the same one (same service line,
    /// destination, direction, route, reference and sections) exists.
    pub fn insert_journey_pattern(
        &self,
        service_line_id: i64,
        journey_pattern: &JourneyPattern,
        joined_section_refs: &str,
    ) -> Result<InsertOutcome> {
        let id = self
            .connection
            .query_row(
                "INSERT INTO service_journey_patterns (
                    operator_service_id, destination_display, direction, route_ref,
                    journey_pattern_ref, section_refs
                ) VALUES (
                    :operator_service_id, :destination_display, :direction, :route_ref,
                    :journey_pattern_ref, :section_refs
                )
                ON CONFLICT DO NOTHING
                RETURNING id",
                named_params! {
                    ":operator_service_id": service_line_id,
                    ":destination_display": journey_pattern.destination_display,
                    ":direction": journey_pattern.direction,
                    ":route_ref": journey_pattern.route_ref,
                    ":journey_pattern_ref": journey_pattern.id,
                    ":section_refs": joined_section_refs,
                },
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map_or(InsertOutcome::Skipped, InsertOutcome::Inserted))
    }

    /// Insert the links of a journey pattern, numbered from 0 in their order.
    pub fn insert_journey_pattern_links(
        &self,
        journey_pattern_id: i64,
        timing_links: &[&TimingLink],
    ) -> Result<()> {
        let mut statement = self.connection.prepare_cached(
            "INSERT INTO service_journey_pattern_links (
                journey_pattern_id, from_atco_code, from_timing_status, from_sequence_number,
                to_atco_code, to_timing_status, to_sequence_number, runtime, order_in_sequence
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for (order, timing_link) in timing_links.iter().enumerate() {
            statement.execute(params![
                journey_pattern_id,
                timing_link.from_atco_code,
                timing_link.from_timing_status,
                timing_link.from_sequence_number,
                timing_link.to_atco_code,
                timing_link.to_timing_status,
                timing_link.to_sequence_number,
                timing_link.run_time,
                order as i64,
            ])?;
        }
        debug!(
            "{} links inserted for journey pattern {}",
            timing_links.len(),
            journey_pattern_id
        );
        Ok(())
    }

    /// Insert the vehicle journeys of a service line, skipping those already
    /// present. Returns the number of inserted journeys.
    pub fn insert_vehicle_journeys(
        &self,
        service_line_id: i64,
        vehicle_journeys: &[FormattedVehicleJourney],
    ) -> Result<usize> {
        let mut statement = self.connection.prepare_cached(
            "INSERT INTO vehicle_journeys (
                vehicle_journey_code, service_ref, line_ref, journey_pattern_ref,
                departure_time, journey_code, operator_service_id, operational_for_today
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT DO NOTHING",
        )?;
        let mut inserted = 0;
        for vehicle_journey in vehicle_journeys {
            inserted += statement.execute(params![
                vehicle_journey.vehicle_journey_code,
                vehicle_journey.service_ref,
                vehicle_journey.line_ref,
                vehicle_journey.journey_pattern_ref,
                vehicle_journey.departure_time,
                vehicle_journey.journey_code,
                service_line_id,
                vehicle_journey.operational_for_today,
            ])?;
        }
        Ok(inserted)
    }

    /// Insert the points of the tracks of a service line.
    pub fn insert_tracks(&self, service_line_id: i64, track_points: &[TrackPoint]) -> Result<()> {
        let mut statement = self.connection.prepare_cached(
            "INSERT INTO tracks (operator_service_id, longitude, latitude) VALUES (?1, ?2, ?3)",
        )?;
        for track_point in track_points {
            statement.execute(params![
                service_line_id,
                track_point.longitude,
                track_point.latitude
            ])?;
        }
        Ok(())
    }

    /// Administrative areas of the localities of the stops.
    pub fn admin_area_codes(&self, stop_codes: &BTreeSet<&str>) -> Result<BTreeSet<String>> {
        if stop_codes.is_empty() {
            return Ok(BTreeSet::new());
        }
        let placeholders = vec!["?"; stop_codes.len()].join(", ");
        let query = format!(
            "SELECT DISTINCT localities.administrative_area_code
            FROM localities
            INNER JOIN stops ON localities.nptg_locality_code = stops.nptg_locality_code
            WHERE stops.atco_code IN ({})",
            placeholders
        );
        let mut statement = self.connection.prepare(&query)?;
        let admin_area_codes: BTreeSet<String> = statement
            .query_map(params_from_iter(stop_codes.iter()), |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(admin_area_codes)
    }

    /// Associate administrative areas to a service line, ignoring those
    /// already associated.
    pub fn insert_admin_area_codes(
        &self,
        service_line_id: i64,
        admin_area_codes: &BTreeSet<String>,
    ) -> Result<()> {
        let mut statement = self.connection.prepare_cached(
            "INSERT INTO service_admin_area_codes (service_id, admin_area_code) VALUES (?1, ?2)
            ON CONFLICT DO NOTHING",
        )?;
        for admin_area_code in admin_area_codes {
            statement.execute(params![service_line_id, admin_area_code])?;
        }
        Ok(())
    }

    /// Location of a stop, if the stop is known and located.
    pub fn stop_location(&self, atco_code: &str) -> Result<Option<TrackPoint>> {
        let location = self
            .connection
            .query_row(
                "SELECT longitude, latitude FROM stops WHERE atco_code = ?1",
                params![atco_code],
                |row| {
                    Ok((
                        row.get::<_, Option<f64>>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                    ))
                },
            )
            .optional()?;
        let location = match location {
            Some((Some(longitude), Some(latitude))) => Some(TrackPoint {
                longitude,
                latitude,
            }),
            _ => None,
        };
        Ok(location)
    }

    /// Set the centre point of a service line.
    pub fn update_centre_point(&self, service_line_id: i64, centre_point: TrackPoint) -> Result<()> {
        self.connection.execute(
            "UPDATE services SET centre_point_lon = ?1, centre_point_lat = ?2 WHERE id = ?3",
            params![
                centre_point.longitude,
                centre_point.latitude,
                service_line_id
            ],
        )?;
        Ok(())
    }
}
