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

//! Geometry of the routes, as a list of points.

use crate::{
    document::DocumentError,
    objects::{Coordinates, Location, RouteSection, TrackPoint, TransXChange},
};
use skip_error::skip_error_and_warn;

fn coordinate(value: &str, key: &str) -> Result<f64, DocumentError> {
    value
        .trim()
        .parse()
        .map_err(|_| DocumentError::InvalidCoordinate {
            value: value.to_string(),
            key: key.to_string(),
        })
}

/// Geographic point of a location. The coordinates of a `Translation` are
/// preferred, locations without longitude and latitude give nothing.
pub fn track_point(location: &Location) -> Option<Result<TrackPoint, DocumentError>> {
    let Coordinates {
        longitude,
        latitude,
    } = location.translation.as_ref().unwrap_or(&location.coordinates);
    let (longitude, latitude) = (longitude.as_deref()?, latitude.as_deref()?);
    let track_point = coordinate(longitude, "Longitude").and_then(|longitude| {
        Ok(TrackPoint {
            longitude,
            latitude: coordinate(latitude, "Latitude")?,
        })
    });
    Some(track_point)
}

/// Points of the route links `route_link_refs` found in the route sections
/// `route_section_refs`, without consecutive duplicates.
pub fn collect_track_points(
    route_sections: &[RouteSection],
    route_section_refs: &[String],
    route_link_refs: &[String],
) -> Vec<TrackPoint> {
    let mut track_points = Vec::new();
    for route_section_ref in route_section_refs {
        let route_section = match route_sections
            .iter()
            .find(|route_section| &route_section.id == route_section_ref)
        {
            Some(route_section) => route_section,
            None => continue,
        };
        for route_link_ref in route_link_refs {
            let route_link = match route_section
                .route_links
                .iter()
                .find(|route_link| &route_link.id == route_link_ref)
            {
                Some(route_link) => route_link,
                None => continue,
            };
            for location in &route_link.locations {
                if let Some(track_point) = track_point(location) {
                    track_points.push(skip_error_and_warn!(track_point));
                }
            }
        }
    }
    track_points.dedup();
    track_points
}

/// Points of the tracks of a route, following the route links in order.
/// An unknown route has no tracks.
pub fn resolve_track(
    transxchange: &TransXChange,
    route_ref: &str,
    route_link_refs: &[String],
) -> Vec<TrackPoint> {
    transxchange
        .routes
        .iter()
        .find(|route| route.id == route_ref)
        .map(|route| {
            collect_track_points(
                &transxchange.route_sections,
                &route.section_refs,
                route_link_refs,
            )
        })
        .unwrap_or_default()
}
