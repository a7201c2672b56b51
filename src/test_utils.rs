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

//! Helpers shared by the tests of the crate and of the binaries.
#![allow(missing_docs)]

use crate::{
    objects::TrackPoint,
    store::{self, Store},
};
use rusqlite::Connection;
use serde_json::Value;

const MOCK_DOCUMENT: &str = include_str!("../tests/fixtures/documents/mock_txc.json");

/// The operators, localities and stops referenced by the mock document
pub fn seed_reference_data(connection: &Connection) {
    let store = Store::new(connection);
    store
        .insert_operator("ANWE", Some("Arriva North West"))
        .expect("insert operator");
    store
        .insert_locality("E0044252", "060")
        .expect("insert locality");
    store
        .insert_locality("E0057910", "061")
        .expect("insert locality");
    let stops = [
        ("0600MA6022", "E0044252", Some((-2.1300, 53.2600))),
        ("0600MA6020", "E0044252", Some((-2.1245, 53.2596))),
        ("0600MA6001", "E0044252", None),
        ("0600MA6002", "E0057910", Some((-2.1200, 53.2610))),
        ("0600MA6003", "E0057910", None),
    ];
    for (atco_code, locality, location) in stops.iter() {
        let location = location.map(|(longitude, latitude)| TrackPoint {
            longitude,
            latitude,
        });
        store
            .insert_stop(atco_code, locality, location)
            .expect("insert stop");
    }
}

/// An in-memory database with the schema and the reference data
pub fn reference_database() -> Connection {
    let connection = store::open_in_memory().expect("open database");
    store::create_schema(&connection).expect("create schema");
    seed_reference_data(&connection);
    connection
}

/// A small document: one operator, one service with one line, three
/// journey patterns (one of which no vehicle journey follows) and six
/// vehicle journeys
pub fn mock_document() -> Value {
    serde_json::from_str(MOCK_DOCUMENT).expect("parse mock document")
}

pub fn count_rows(connection: &Connection, table: &str) -> i64 {
    connection
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .unwrap_or_else(|_| panic!("count rows of {}", table))
}
