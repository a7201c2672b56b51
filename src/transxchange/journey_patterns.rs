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

//! Journey patterns of a service, resolved to their timing links.

use crate::objects::{
    FormattedVehicleJourney, JourneyPattern, JourneyPatternSection, Service, TimingLink,
};
use std::collections::HashSet;

/// A journey pattern with its sections, in the order of its references.
#[derive(Debug, Clone)]
pub struct CollectedJourneyPattern<'a> {
    /// The journey pattern as read from the service
    pub journey_pattern: &'a JourneyPattern,
    /// Resolved sections; references to unknown sections are ignored
    pub sections: Vec<&'a JourneyPatternSection>,
}

impl<'a> CollectedJourneyPattern<'a> {
    /// All the timing links of the journey pattern, section after section
    pub fn timing_links(&self) -> Vec<&'a TimingLink> {
        self.sections
            .iter()
            .flat_map(|section| section.timing_links.iter())
            .collect()
    }
}

/// Resolve the sections of every journey pattern of the service.
pub fn collect_journey_patterns<'a>(
    service: &'a Service,
    sections: &'a [JourneyPatternSection],
) -> Vec<CollectedJourneyPattern<'a>> {
    service
        .journey_patterns
        .iter()
        .map(|journey_pattern| {
            let sections = journey_pattern
                .section_refs
                .iter()
                .flat_map(|section_ref| {
                    sections
                        .iter()
                        .filter(move |section| &section.id == section_ref)
                })
                .collect();
            CollectedJourneyPattern {
                journey_pattern,
                sections,
            }
        })
        .collect()
}

/// Keep the journey patterns followed by at least one of the vehicle
/// journeys.
pub fn retain_referenced<'a>(
    journey_patterns: Vec<CollectedJourneyPattern<'a>>,
    vehicle_journeys: &[FormattedVehicleJourney],
) -> Vec<CollectedJourneyPattern<'a>> {
    let referenced: HashSet<&str> = vehicle_journeys
        .iter()
        .filter_map(|vehicle_journey| vehicle_journey.journey_pattern_ref.as_deref())
        .collect();
    journey_patterns
        .into_iter()
        .filter(|collected| {
            collected
                .journey_pattern
                .id
                .as_deref()
                .map(|id| referenced.contains(id))
                .unwrap_or(false)
        })
        .collect()
}

/// Whether a line has data worth writing: the service has journey patterns,
/// the document has sections, and each retained journey pattern resolves to
/// sections which all have timing links.
pub fn has_usable_data(
    service: &Service,
    sections: &[JourneyPatternSection],
    retained: &[CollectedJourneyPattern<'_>],
) -> bool {
    !service.journey_patterns.is_empty()
        && !sections.is_empty()
        && retained.iter().all(|collected| {
            !collected.sections.is_empty()
                && collected
                    .sections
                    .iter()
                    .all(|section| !section.timing_links.is_empty())
        })
}

/// What is needed to draw the tracks of a line and find its centre.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrackSource {
    /// Route of the journey pattern
    pub route_ref: Option<String>,
    /// Route links of all the timing links, in order
    pub route_link_refs: Vec<String>,
    /// Origin stop of the middle timing link
    pub centre_stop: Option<String>,
}

impl TrackSource {
    /// Track source of a journey pattern
    pub fn new(collected: &CollectedJourneyPattern<'_>) -> Self {
        let timing_links = collected.timing_links();
        TrackSource {
            route_ref: collected.journey_pattern.route_ref.clone(),
            route_link_refs: timing_links
                .iter()
                .filter_map(|timing_link| timing_link.route_link_ref.clone())
                .collect(),
            centre_stop: timing_links
                .get(timing_links.len() / 2)
                .map(|timing_link| timing_link.from_atco_code.clone()),
        }
    }
}
