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

//! Vehicle journeys of a line, ready to be written.

use crate::{
    objects::{Date, FormattedVehicleJourney, Service, VehicleJourney},
    transxchange::{bank_holidays::BankHolidayEntry, operating_profile::is_service_operational},
};
use std::collections::{BTreeMap, HashSet};

/// The vehicle journeys of a line and the journey pattern whose route is
/// used for the tracks of the line.
#[derive(Debug, Default, PartialEq)]
pub struct FormattedVehicleJourneys {
    /// Journeys of the line which follow a journey pattern
    pub vehicle_journeys: Vec<FormattedVehicleJourney>,
    /// The most used journey pattern among `vehicle_journeys`
    pub journey_pattern_for_tracks: Option<String>,
}

/// Format a vehicle journey, computing whether it runs on `anchor_date`.
pub fn format_vehicle_journey(
    vehicle_journey: &VehicleJourney,
    bank_holidays: &[BankHolidayEntry],
    service: &Service,
    anchor_date: Date,
) -> FormattedVehicleJourney {
    FormattedVehicleJourney {
        vehicle_journey_code: vehicle_journey.code.clone(),
        service_ref: vehicle_journey.service_ref.clone(),
        line_ref: vehicle_journey.line_ref.clone(),
        journey_pattern_ref: vehicle_journey.journey_pattern_ref.clone(),
        departure_time: vehicle_journey.departure_time.clone(),
        journey_code: vehicle_journey.journey_code.clone(),
        operational_for_today: is_service_operational(
            vehicle_journey.operating_profile.as_ref(),
            bank_holidays,
            service.operating_profile.as_ref(),
            service.operating_period.as_ref(),
            Some(anchor_date),
        ),
    }
}

/// The most frequent journey pattern reference. On equal counts the
/// greatest reference wins.
pub fn most_used_journey_pattern(vehicle_journeys: &[FormattedVehicleJourney]) -> Option<String> {
    let mut journey_pattern_count: BTreeMap<&str, usize> = BTreeMap::new();
    for journey_pattern_ref in vehicle_journeys
        .iter()
        .filter_map(|vehicle_journey| vehicle_journey.journey_pattern_ref.as_deref())
    {
        *journey_pattern_count.entry(journey_pattern_ref).or_default() += 1;
    }
    journey_pattern_count
        .into_iter()
        .max_by_key(|(journey_pattern_ref, count)| (*count, *journey_pattern_ref))
        .map(|(journey_pattern_ref, _)| journey_pattern_ref.to_string())
}

/// Vehicle journeys of the line `line_id`.
///
/// A journey belongs to the line when its `LineRef` is the line. A journey
/// without a journey pattern but with a `VehicleJourneyRef` also brings its
/// line to the referenced journey. Only journeys following a journey
/// pattern are kept.
pub fn format_vehicle_journeys(
    vehicle_journeys: &[VehicleJourney],
    line_id: Option<&str>,
    bank_holidays: &[BankHolidayEntry],
    service: &Service,
    anchor_date: Date,
) -> FormattedVehicleJourneys {
    let on_line = |vehicle_journey: &VehicleJourney| {
        line_id.is_some() && vehicle_journey.line_ref.as_deref() == line_id
    };
    let referenced_journeys: HashSet<&str> = vehicle_journeys
        .iter()
        .filter(|vehicle_journey| {
            vehicle_journey.journey_pattern_ref.is_none() && on_line(*vehicle_journey)
        })
        .filter_map(|vehicle_journey| vehicle_journey.vehicle_journey_ref.as_deref())
        .collect();
    let vehicle_journeys: Vec<FormattedVehicleJourney> = vehicle_journeys
        .iter()
        .filter(|vehicle_journey| vehicle_journey.journey_pattern_ref.is_some())
        .filter(|vehicle_journey| {
            on_line(*vehicle_journey)
                || vehicle_journey
                    .code
                    .as_deref()
                    .map(|code| referenced_journeys.contains(code))
                    .unwrap_or(false)
        })
        .map(|vehicle_journey| {
            format_vehicle_journey(vehicle_journey, bank_holidays, service, anchor_date)
        })
        .collect();
    let journey_pattern_for_tracks = most_used_journey_pattern(&vehicle_journeys);
    FormattedVehicleJourneys {
        vehicle_journeys,
        journey_pattern_for_tracks,
    }
}
