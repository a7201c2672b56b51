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


use pretty_assertions::assert_eq;
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use txc_uploader::{
    metrics::{InMemoryMetrics, Metric},
    objects::Date,
    test_utils::*,
    transxchange::bank_holidays::BankHolidayEntry,
    write_to_database, Configuration, FailureReason, WriteOutcome,
};

const KEY: &str = "20250508/bods/ANW_4.xml";

// A Thursday
fn configuration() -> Configuration {
    Configuration::from_key(KEY, Date::from_ymd_opt(2025, 5, 8).unwrap()).unwrap()
}

fn write(document: &Value, connection: &mut Connection, metrics: &InMemoryMetrics) -> WriteOutcome {
    write_to_database(document, &configuration(), connection, metrics, &[]).unwrap()
}

fn transxchange(document: &mut Value) -> &mut serde_json::Map<String, Value> {
    document["TransXChange"].as_object_mut().unwrap()
}

fn assert_nothing_written(connection: &Connection) {
    for table in &[
        "services",
        "service_journey_patterns",
        "service_journey_pattern_links",
        "vehicle_journeys",
        "tracks",
        "service_admin_area_codes",
    ] {
        assert_eq!(0, count_rows(connection, table), "rows in {}", table);
    }
}

fn assert_not_written(document: &Value, reason: FailureReason) {
    let mut connection = reference_database();
    let metrics = InMemoryMetrics::default();
    assert_eq!(
        WriteOutcome::NotWritten(reason),
        write(document, &mut connection, &metrics)
    );
    assert_eq!(1.0, metrics.total(reason.metric()));
    assert_eq!(1, metrics.data().len());
    assert_eq!("bods", metrics.data()[0].data_source);
    assert_nothing_written(&connection);
}

#[test]
fn write_mock_document() {
    let mut connection = reference_database();
    let metrics = InMemoryMetrics::default();
    assert_eq!(
        WriteOutcome::Written,
        write(&mock_document(), &mut connection, &metrics)
    );
    assert!(metrics.data().is_empty());

    assert_eq!(1, count_rows(&connection, "services"));
    let (line_id, file_path, region_code): (String, String, Option<String>) = connection
        .query_row(
            "SELECT line_id, file_path, region_code FROM services",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!("l_4_ANW", line_id);
    assert_eq!(KEY, file_path);
    assert_eq!(None, region_code);

    // JP3 is not followed by any vehicle journey
    let mut statement = connection
        .prepare("SELECT journey_pattern_ref, section_refs FROM service_journey_patterns ORDER BY journey_pattern_ref")
        .unwrap();
    let journey_patterns: Vec<(String, String)> = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(
        vec![
            ("JP1".to_string(), "JPS1".to_string()),
            ("JP2".to_string(), "JPS2JPS3".to_string())
        ],
        journey_patterns
    );
    assert_eq!(5, count_rows(&connection, "service_journey_pattern_links"));

    // VJ4 has no journey pattern but brings VJ5 to the line
    assert_eq!(5, count_rows(&connection, "vehicle_journeys"));
    let operational = |code: &str| -> bool {
        connection
            .query_row(
                "SELECT operational_for_today FROM vehicle_journeys WHERE vehicle_journey_code = ?1",
                params![code],
                |row| row.get(0),
            )
            .unwrap()
    };
    assert!(operational("VJ1"));
    assert!(!operational("VJ2"));
    assert!(operational("VJ5"));
    let journey_code: Option<String> = connection
        .query_row(
            "SELECT journey_code FROM vehicle_journeys WHERE vehicle_journey_code = 'VJ1'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(Some("0700".to_string()), journey_code);

    let mut statement = connection
        .prepare("SELECT admin_area_code FROM service_admin_area_codes ORDER BY admin_area_code")
        .unwrap();
    let admin_area_codes: Vec<String> = statement
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(vec!["060", "061"], admin_area_codes);

    // Tracks of JP1, the most used journey pattern
    let mut statement = connection
        .prepare("SELECT longitude, latitude FROM tracks ORDER BY id")
        .unwrap();
    let tracks: Vec<(f64, f64)> = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(
        vec![
            (-2.1300, 53.2600),
            (-2.1280, 53.2590),
            (-2.1245, 53.2596),
            (-2.1200, 53.2610)
        ],
        tracks
    );

    // Origin of the middle link of JP1
    let centre_point: (f64, f64) = connection
        .query_row(
            "SELECT centre_point_lon, centre_point_lat FROM services",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((-2.1245, 53.2596), centre_point);
}

#[test]
fn write_same_document_twice() {
    let mut connection = reference_database();
    let metrics = InMemoryMetrics::default();
    let document = mock_document();
    assert_eq!(
        WriteOutcome::Written,
        write(&document, &mut connection, &metrics)
    );
    assert_eq!(
        WriteOutcome::Written,
        write(&document, &mut connection, &metrics)
    );
    assert_eq!(1, count_rows(&connection, "services"));
    assert_eq!(2, count_rows(&connection, "service_journey_patterns"));
    assert_eq!(5, count_rows(&connection, "service_journey_pattern_links"));
    assert_eq!(5, count_rows(&connection, "vehicle_journeys"));
    assert_eq!(4, count_rows(&connection, "tracks"));
    assert_eq!(2, count_rows(&connection, "service_admin_area_codes"));
}

#[test]
fn bank_holiday_non_operation() {
    let mut connection = reference_database();
    let metrics = InMemoryMetrics::default();
    let mut document = mock_document();
    transxchange(&mut document)["Services"]["Service"]["OperatingProfile"]["BankHolidayOperation"] =
        json!({"DaysOfNonOperation": {"MayDay": null}});
    let bank_holidays = vec![BankHolidayEntry {
        title: "Early May bank holiday (VE Day)".into(),
        date: "2025-05-08".into(),
    }];
    let outcome = write_to_database(
        &document,
        &configuration(),
        &mut connection,
        &metrics,
        &bank_holidays,
    )
    .unwrap();
    assert_eq!(WriteOutcome::Written, outcome);
    let operational: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM vehicle_journeys WHERE operational_for_today",
            [],
            |row| row.get(0),
        )
        .unwrap();
    // VJ2 runs on Sundays only, the others follow the service
    assert_eq!(0, operational);
}

#[test]
fn no_operator_data() {
    let mut document = mock_document();
    transxchange(&mut document).remove("Operators");
    assert_not_written(&document, FailureReason::NoOperatorData);
}

#[test]
fn no_nocs_in_file() {
    let mut document = mock_document();
    transxchange(&mut document)["Operators"]["Operator"]
        .as_object_mut()
        .unwrap()
        .remove("NationalOperatorCode");
    assert_not_written(&document, FailureReason::NoNocs);
}

#[test]
fn no_service_data_in_file() {
    let mut document = mock_document();
    transxchange(&mut document)["Services"]["Service"]["RegisteredOperatorRef"] = json!("O9");
    assert_not_written(&document, FailureReason::NoServiceData);
}

#[test]
fn no_vehicle_journeys_data_in_file() {
    let mut document = mock_document();
    transxchange(&mut document).insert("VehicleJourneys".into(), Value::Null);
    assert_not_written(&document, FailureReason::NoVehicleJourneysData);
}

#[test]
fn no_line_data_in_file() {
    let mut document = mock_document();
    transxchange(&mut document)["Services"]["Service"]
        .as_object_mut()
        .unwrap()
        .remove("Lines");
    assert_not_written(&document, FailureReason::NoLineData);
}

#[test]
fn no_useable_data_in_file() {
    let mut document = mock_document();
    transxchange(&mut document).remove("JourneyPatternSections");
    assert_not_written(&document, FailureReason::NoUseableData);
}

#[test]
fn empty_journey_pattern_section() {
    let mut document = mock_document();
    transxchange(&mut document)["JourneyPatternSections"]["JourneyPatternSection"][1] =
        json!({"@id": "JPS2"});
    assert_not_written(&document, FailureReason::NoUseableData);
}

#[test]
fn invalid_noc_does_not_stop_other_operators() {
    let mut connection = reference_database();
    let metrics = InMemoryMetrics::default();
    let mut document = mock_document();
    let transxchange = transxchange(&mut document);
    transxchange["Operators"]["Operator"] = json!([
        {"@id": "O2", "NationalOperatorCode": "XXXX", "OperatorShortName": "Unknown"},
        transxchange["Operators"]["Operator"].clone()
    ]);
    let mut other_service = transxchange["Services"]["Service"].clone();
    other_service["ServiceCode"] = json!("NW_01_XXX_4_1");
    other_service["RegisteredOperatorRef"] = json!("O2");
    transxchange["Services"]["Service"] = json!([other_service, transxchange["Services"]["Service"].clone()]);

    assert_eq!(
        WriteOutcome::Written,
        write(&document, &mut connection, &metrics)
    );
    assert_eq!(1.0, metrics.total(Metric::InvalidNoc));
    let noc_code: String = connection
        .query_row("SELECT noc_code FROM services", [], |row| row.get(0))
        .unwrap();
    assert_eq!("ANWE", noc_code);
}

#[test]
fn only_invalid_noc() {
    let mut document = mock_document();
    transxchange(&mut document)["Operators"]["Operator"]["NationalOperatorCode"] = json!("XXXX");
    let mut connection = reference_database();
    let metrics = InMemoryMetrics::default();
    assert_eq!(
        WriteOutcome::NotWritten(FailureReason::NoUseableData),
        write(&document, &mut connection, &metrics)
    );
    assert_eq!(1.0, metrics.total(Metric::InvalidNoc));
    assert_eq!(1.0, metrics.total(Metric::NoUseableDataInFile));
    assert_nothing_written(&connection);
}

#[test]
fn unexpected_error_rolls_back() {
    let mut connection = reference_database();
    connection.execute_batch("DROP TABLE tracks").unwrap();
    let metrics = InMemoryMetrics::default();
    let error = write_to_database(
        &mock_document(),
        &configuration(),
        &mut connection,
        &metrics,
        &[],
    )
    .unwrap_err();
    assert!(format!("{:?}", error).contains("no such table: tracks"));
    for table in &["services", "service_journey_patterns", "vehicle_journeys"] {
        assert_eq!(0, count_rows(&connection, table), "rows in {}", table);
    }
}

#[test]
#[should_panic(expected = "Failed to find a child 'StandardService' in element 'Service'")]
fn missing_standard_service() {
    let mut document = mock_document();
    transxchange(&mut document)["Services"]["Service"]
        .as_object_mut()
        .unwrap()
        .remove("StandardService");
    let mut connection = reference_database();
    write_to_database(
        &document,
        &configuration(),
        &mut connection,
        &InMemoryMetrics::default(),
        &[],
    )
    .unwrap();
}
