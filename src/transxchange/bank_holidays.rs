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

//! Module to handle Bank Holidays in UK
//! The data structure is based on the JSON provided by the UK government at
//! https://www.gov.uk/bank-holidays.json

use crate::{objects::Date, Result};
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use std::{collections::HashMap, fs::File, io::BufReader, path::Path};
use tracing::info;

/// Calendar code standing for every bank holiday
pub const ALL_BANK_HOLIDAYS: &str = "AllBankHolidays";

const ENGLAND_AND_WALES: &str = "england-and-wales";

/// A bank holiday as published by the UK government
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BankHolidayEntry {
    /// Name of the bank holiday, e.g. `Spring bank holiday`
    pub title: String,
    /// Date of the bank holiday, `YYYY-MM-DD`
    pub date: String,
}

#[derive(Debug, Deserialize)]
struct BankHolidayRegion {
    events: Vec<BankHolidayEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BankHolidaysFile {
    Events(Vec<BankHolidayEntry>),
    Divisions(HashMap<String, BankHolidayRegion>),
}

/// Translate the title of a bank holiday into the TransXChange code used in
/// `BankHolidayOperation`. Anything in parenthesis at the end of the title is
/// ignored, so "Early May bank holiday (VE Day)" is still `MayDay`.
pub fn calendar_code(title: &str) -> Option<&'static str> {
    let parenthesis_offset = title.find('(').unwrap_or_else(|| title.len());
    let title = title[0..parenthesis_offset].trim().replace('\'', "’");
    let code = match title.as_str() {
        "New Year’s Day" => "NewYearsDay",
        "Good Friday" => "GoodFriday",
        "Easter Monday" => "EasterMonday",
        "Early May bank holiday" => "MayDay",
        "Spring bank holiday" => "SpringBank",
        "Summer bank holiday" => "LateSummerBankHolidayNotScotland",
        "Scotland Summer bank holiday" => "AugustBankHolidayScotland",
        "Christmas Day" => "ChristmasDayHoliday",
        "Boxing Day" => "BoxingDayHoliday",
        "2nd January" => "Jan2ndScotland",
        "St Andrew’s Day" => "StAndrewsDayHoliday",
        _ => return None,
    };
    Some(code)
}

/// Bank holidays falling on `date`
pub fn holidays_on(bank_holidays: &[BankHolidayEntry], date: Date) -> Vec<&BankHolidayEntry> {
    let date = date.format("%Y-%m-%d").to_string();
    bank_holidays
        .iter()
        .filter(|bank_holiday| bank_holiday.date == date)
        .collect()
}

/// Read bank holidays from a JSON file, either a list of `{title, date}`
/// entries or the gov.uk document (then the `england-and-wales` division is
/// used).
pub fn read_bank_holidays<P: AsRef<Path>>(path: P) -> Result<Vec<BankHolidayEntry>> {
    let path = path.as_ref();
    info!("Reading bank holidays from {:?}", path);
    let file = File::open(path).with_context(|| format!("Error reading {:?}", path))?;
    let bank_holidays: BankHolidaysFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Error parsing bank holidays in {:?}", path))?;
    let events = match bank_holidays {
        BankHolidaysFile::Events(events) => events,
        BankHolidaysFile::Divisions(mut divisions) => {
            divisions
                .remove(ENGLAND_AND_WALES)
                .ok_or_else(|| anyhow!("No '{}' division in {:?}", ENGLAND_AND_WALES, path))?
                .events
        }
    };
    if events.is_empty() {
        bail!("No data found in {:?}", path);
    }
    Ok(events)
}
