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

//! Read the typed model out of a normalized TransXChange document.

use crate::{
    document::{parse_date, text_of, DocumentError, TryChild},
    objects::*,
    transxchange::operating_profile::OperatingProfile,
    Result,
};
use anyhow::Context;
use serde_json::Value;
use std::convert::TryFrom;
use tracing::debug;

// Items of a container, `<Lines><Line/><Line/></Lines>` for example
fn nested<'a>(node: &'a Value, container: &str, item: &str) -> Vec<&'a Value> {
    node.child(container)
        .map(|container| container.children(item))
        .unwrap_or_default()
}

fn required_text(
    node: &Value,
    key: &str,
    element: &str,
) -> std::result::Result<String, DocumentError> {
    text_of(node.try_child(key, element)?).ok_or_else(|| DocumentError::MissingKey {
        key: key.to_string(),
        element: element.to_string(),
    })
}

fn texts(node: &Value, key: &str) -> Vec<String> {
    node.children(key).into_iter().filter_map(text_of).collect()
}

fn read_operator(operator: &Value) -> Operator {
    Operator {
        id: operator.child_text("@id"),
        national_operator_code: operator.child_text("NationalOperatorCode"),
        short_name: operator.child_text("OperatorShortName"),
    }
}

fn read_operators(transxchange: &Value) -> Vec<Operator> {
    let operators = match transxchange.child("Operators") {
        Some(operators) => operators,
        None => return Vec::new(),
    };
    operators
        .children("Operator")
        .into_iter()
        .chain(operators.children("LicensedOperator"))
        .map(read_operator)
        .collect()
}

fn read_operating_period(operating_period: &Value) -> Result<OperatingPeriod> {
    let start_date = required_text(operating_period, "StartDate", "OperatingPeriod")?;
    let end_date = operating_period
        .child_text("EndDate")
        .map(|end_date| parse_date(&end_date, "OperatingPeriod"))
        .transpose()?;
    Ok(OperatingPeriod {
        start_date: parse_date(&start_date, "OperatingPeriod")?,
        end_date,
    })
}

fn read_operating_profile(node: &Value) -> Result<Option<OperatingProfile>> {
    let operating_profile = node
        .child("OperatingProfile")
        .map(OperatingProfile::try_from)
        .transpose()?;
    Ok(operating_profile)
}

fn read_line(line: &Value) -> Line {
    let description = |key: &str| {
        line.child(key)
            .and_then(|direction| direction.child_text("Description"))
            .unwrap_or_default()
    };
    Line {
        id: line.child_text("@id"),
        name: line.child_text("LineName").unwrap_or_default(),
        inbound_description: description("InboundDescription"),
        outbound_description: description("OutboundDescription"),
    }
}

fn read_journey_pattern(journey_pattern: &Value) -> JourneyPattern {
    JourneyPattern {
        id: journey_pattern.child_text("@id"),
        destination_display: journey_pattern.child_text("DestinationDisplay"),
        direction: journey_pattern.child_text("Direction"),
        route_ref: journey_pattern.child_text("RouteRef"),
        section_refs: texts(journey_pattern, "JourneyPatternSectionRefs"),
    }
}

fn read_service(service: &Value) -> Result<Service> {
    let service_code = service.child_text("ServiceCode");
    let standard_service = service
        .try_child("StandardService", "Service")
        .with_context(|| {
            format!(
                "Service '{}' is not valid",
                service_code.as_deref().unwrap_or_default()
            )
        })?;
    let operating_period = service
        .child("OperatingPeriod")
        .map(read_operating_period)
        .transpose()?;
    let operating_profile = read_operating_profile(service)?;
    let journey_patterns = standard_service
        .children("JourneyPattern")
        .into_iter()
        .map(read_journey_pattern)
        .collect();
    Ok(Service {
        registered_operator_ref: service.child_text("RegisteredOperatorRef"),
        description: service.child_text("Description").unwrap_or_default(),
        mode: service.child_text("Mode").unwrap_or_default(),
        origin: standard_service.child_text("Origin"),
        destination: standard_service.child_text("Destination"),
        operating_period,
        operating_profile,
        lines: nested(service, "Lines", "Line")
            .into_iter()
            .map(read_line)
            .collect(),
        journey_patterns,
        service_code,
    })
}

fn read_vehicle_journey(vehicle_journey: &Value) -> Result<VehicleJourney> {
    let journey_code = vehicle_journey
        .child("Operational")
        .and_then(|operational| operational.child("TicketMachine"))
        .and_then(|ticket_machine| ticket_machine.child_text("JourneyCode"));
    let code = vehicle_journey.child_text("VehicleJourneyCode");
    let operating_profile = read_operating_profile(vehicle_journey).with_context(|| {
        format!(
            "Invalid operating profile for vehicle journey '{}'",
            code.as_deref().unwrap_or_default()
        )
    })?;
    Ok(VehicleJourney {
        service_ref: vehicle_journey.child_text("ServiceRef"),
        line_ref: vehicle_journey.child_text("LineRef"),
        journey_pattern_ref: vehicle_journey.child_text("JourneyPatternRef"),
        vehicle_journey_ref: vehicle_journey.child_text("VehicleJourneyRef"),
        departure_time: vehicle_journey.child_text("DepartureTime"),
        journey_code,
        operating_profile,
        code,
    })
}

fn read_timing_link(timing_link: &Value) -> Result<TimingLink> {
    let element = "JourneyPatternTimingLink";
    let from = timing_link.try_child("From", element)?;
    let to = timing_link.try_child("To", element)?;
    Ok(TimingLink {
        from_atco_code: required_text(from, "StopPointRef", "From")?,
        from_timing_status: from.child_text("TimingStatus"),
        from_sequence_number: from.child_text("@SequenceNumber"),
        to_atco_code: required_text(to, "StopPointRef", "To")?,
        to_timing_status: to.child_text("TimingStatus"),
        to_sequence_number: to.child_text("@SequenceNumber"),
        run_time: timing_link.child_text("RunTime"),
        route_link_ref: timing_link.child_text("RouteLinkRef"),
    })
}

fn read_journey_pattern_section(section: &Value) -> Result<JourneyPatternSection> {
    let id = required_text(section, "@id", "JourneyPatternSection")?;
    let timing_links = section
        .children("JourneyPatternTimingLink")
        .into_iter()
        .map(read_timing_link)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Invalid journey pattern section '{}'", id))?;
    Ok(JourneyPatternSection { id, timing_links })
}

fn read_route(route: &Value) -> Result<Route> {
    Ok(Route {
        id: required_text(route, "@id", "Route")?,
        section_refs: texts(route, "RouteSectionRef"),
    })
}

fn read_coordinates(node: &Value) -> Coordinates {
    Coordinates {
        longitude: node.child_text("Longitude"),
        latitude: node.child_text("Latitude"),
    }
}

fn read_route_link(route_link: &Value) -> Result<RouteLink> {
    let locations = route_link
        .children("Track")
        .into_iter()
        .flat_map(|track| track.children("Mapping"))
        .flat_map(|mapping| mapping.children("Location"))
        .map(|location| Location {
            coordinates: read_coordinates(location),
            translation: location.child("Translation").map(read_coordinates),
        })
        .collect();
    Ok(RouteLink {
        id: required_text(route_link, "@id", "RouteLink")?,
        locations,
    })
}

fn read_route_section(route_section: &Value) -> Result<RouteSection> {
    Ok(RouteSection {
        id: required_text(route_section, "@id", "RouteSection")?,
        route_links: route_section
            .children("RouteLink")
            .into_iter()
            .map(read_route_link)
            .collect::<Result<_>>()?,
    })
}

fn read_all<T, F>(transxchange: &Value, container: &str, item: &str, read: F) -> Result<Vec<T>>
where
    F: Fn(&Value) -> Result<T>,
{
    nested(transxchange, container, item)
        .into_iter()
        .map(read)
        .collect()
}

/// Read everything the uploader needs from a document in one pass.
///
/// Optional containers (no vehicle journeys, no routes, ...) give empty
/// lists. A missing required key (like the `StandardService` of a service)
/// is an error.
pub fn read(document: &Value) -> Result<TransXChange> {
    let transxchange = document.try_child("TransXChange", "document")?;
    let transxchange = TransXChange {
        operators: read_operators(transxchange),
        services: read_all(transxchange, "Services", "Service", read_service)?,
        vehicle_journeys: read_all(
            transxchange,
            "VehicleJourneys",
            "VehicleJourney",
            read_vehicle_journey,
        )?,
        journey_pattern_sections: read_all(
            transxchange,
            "JourneyPatternSections",
            "JourneyPatternSection",
            read_journey_pattern_section,
        )?,
        routes: read_all(transxchange, "Routes", "Route", read_route)?,
        route_sections: read_all(
            transxchange,
            "RouteSections",
            "RouteSection",
            read_route_section,
        )?,
    };
    debug!(
        "Read {} operators, {} services and {} vehicle journeys",
        transxchange.operators.len(),
        transxchange.services.len(),
        transxchange.vehicle_journeys.len()
    );
    Ok(transxchange)
}
