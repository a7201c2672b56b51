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

//! Operating Calendar Resolver: whether a vehicle journey runs on a given
//! date, from its operating profile, the one of its service, the operating
//! period of the service and the bank holidays.

use crate::{
    document::{parse_date, DocumentError, TryChild},
    objects::{Date, DateRange, OperatingPeriod},
    transxchange::bank_holidays::{self, BankHolidayEntry, ALL_BANK_HOLIDAYS},
};
use chrono::{Datelike, Weekday};
use lazy_static::lazy_static;
use serde_json::Value;
use std::{collections::HashSet, convert::TryFrom};
use tracing::warn;

/// Days explicitly added to or removed from a regular pattern
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IncludeExclude<T>
where
    T: Default,
{
    /// Days of operation
    pub include: T,
    /// Days of non operation
    pub exclude: T,
}

/// The rules deciding on which days a vehicle journey runs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OperatingProfile {
    /// Days of the week the journey regularly runs
    pub week_pattern: HashSet<Weekday>,
    /// `SpecialDaysOperation`
    pub special_days: IncludeExclude<Vec<DateRange>>,
    /// `BankHolidayOperation`, as TransXChange bank holiday codes
    pub bank_holidays: IncludeExclude<HashSet<String>>,
}

lazy_static! {
    static ref EVERY_DAY: OperatingProfile = OperatingProfile::every_day();
}

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl OperatingProfile {
    /// Runs every day of the week, without any exception
    pub fn every_day() -> Self {
        OperatingProfile {
            week_pattern: ALL_DAYS.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn regular_days(days_of_week: &Value) -> HashSet<Weekday> {
        use chrono::Weekday::*;
        let all_but = |day: Weekday| -> Vec<Weekday> {
            ALL_DAYS.iter().copied().filter(|d| *d != day).collect()
        };
        let mut regular_days = HashSet::new();
        for tag in days_of_week.key_names() {
            let days: Vec<Weekday> = match tag {
                "Monday" => vec![Mon],
                "Tuesday" => vec![Tue],
                "Wednesday" => vec![Wed],
                "Thursday" => vec![Thu],
                "Friday" => vec![Fri],
                "Saturday" => vec![Sat],
                "Sunday" => vec![Sun],
                "MondayToFriday" => vec![Mon, Tue, Wed, Thu, Fri],
                "MondayToSaturday" => vec![Mon, Tue, Wed, Thu, Fri, Sat],
                "MondayToSunday" => ALL_DAYS.to_vec(),
                "Weekend" => vec![Sat, Sun],
                "HolidaysOnly" => vec![],
                "NotMonday" => all_but(Mon),
                "NotTuesday" => all_but(Tue),
                "NotWednesday" => all_but(Wed),
                "NotThursday" => all_but(Thu),
                "NotFriday" => all_but(Fri),
                "NotSaturday" => all_but(Sat),
                "NotSunday" => all_but(Sun),
                unknown_tag => {
                    warn!("Tag '{}' is not a valid tag for DaysOfWeek", unknown_tag);
                    continue;
                }
            };
            regular_days.extend(days);
        }
        regular_days
    }

    fn date_ranges(days: Option<&Value>) -> Result<Vec<DateRange>, DocumentError> {
        let parse = |date_range: &Value, key: &str| {
            date_range
                .child_text(key)
                .map(|date| parse_date(&date, "DateRange"))
                .transpose()
        };
        days.map(|days| days.children("DateRange"))
            .unwrap_or_default()
            .into_iter()
            .map(|date_range| -> Result<DateRange, DocumentError> {
                Ok(DateRange {
                    start_date: parse(date_range, "StartDate")?,
                    end_date: parse(date_range, "EndDate")?,
                })
            })
            .collect()
    }

    fn bank_holidays(days: Option<&Value>) -> HashSet<String> {
        days.map(|days| days.key_names().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    fn is_operational_on(
        &self,
        date: Date,
        bank_holidays: &[BankHolidayEntry],
        today: Date,
    ) -> bool {
        if self
            .special_days
            .exclude
            .iter()
            .any(|date_range| date_range.contains(date, today))
        {
            return false;
        }
        if self
            .special_days
            .include
            .iter()
            .any(|date_range| date_range.contains(date, today))
        {
            return true;
        }
        let todays_bank_holidays = bank_holidays::holidays_on(bank_holidays, date);
        if !todays_bank_holidays.is_empty() {
            if self.bank_holidays.exclude.contains(ALL_BANK_HOLIDAYS) {
                return false;
            }
            if self.bank_holidays.include.contains(ALL_BANK_HOLIDAYS) {
                return true;
            }
            for code in todays_bank_holidays
                .iter()
                .filter_map(|bank_holiday| bank_holidays::calendar_code(&bank_holiday.title))
            {
                if self.bank_holidays.exclude.contains(code) {
                    return false;
                }
                if self.bank_holidays.include.contains(code) {
                    return true;
                }
            }
        }
        self.week_pattern.contains(&date.weekday())
    }
}

impl TryFrom<&Value> for OperatingProfile {
    type Error = DocumentError;

    fn try_from(operating_profile: &Value) -> Result<Self, Self::Error> {
        let week_pattern = operating_profile
            .child("RegularDayType")
            .and_then(|regular_day_type| regular_day_type.child("DaysOfWeek"))
            .map(OperatingProfile::regular_days)
            .unwrap_or_default();
        let special_days = match operating_profile.child("SpecialDaysOperation") {
            Some(special_days_operation) => IncludeExclude {
                include: OperatingProfile::date_ranges(
                    special_days_operation.child("DaysOfOperation"),
                )?,
                exclude: OperatingProfile::date_ranges(
                    special_days_operation.child("DaysOfNonOperation"),
                )?,
            },
            None => IncludeExclude::default(),
        };
        let bank_holidays = operating_profile
            .child("BankHolidayOperation")
            .map(|bank_holiday_operation| IncludeExclude {
                include: OperatingProfile::bank_holidays(
                    bank_holiday_operation.child("DaysOfOperation"),
                ),
                exclude: OperatingProfile::bank_holidays(
                    bank_holiday_operation.child("DaysOfNonOperation"),
                ),
            })
            .unwrap_or_default();
        Ok(OperatingProfile {
            week_pattern,
            special_days,
            bank_holidays,
        })
    }
}

/// Whether a vehicle journey runs on `anchor_date` (today if `None`).
///
/// The profile of the journey applies if any, else the one of its service,
/// else the journey runs every day. Date ranges without a bound use the
/// current date for that bound, whatever the anchor date.
pub fn is_service_operational(
    journey_profile: Option<&OperatingProfile>,
    bank_holidays: &[BankHolidayEntry],
    service_profile: Option<&OperatingProfile>,
    service_period: Option<&OperatingPeriod>,
    anchor_date: Option<Date>,
) -> bool {
    let today = chrono::Local::now().date_naive();
    is_operational(
        journey_profile,
        bank_holidays,
        service_profile,
        service_period,
        anchor_date.unwrap_or(today),
        today,
    )
}

fn is_operational(
    journey_profile: Option<&OperatingProfile>,
    bank_holidays: &[BankHolidayEntry],
    service_profile: Option<&OperatingProfile>,
    service_period: Option<&OperatingPeriod>,
    date: Date,
    today: Date,
) -> bool {
    if let Some(period) = service_period {
        let ended = period.end_date.map(|end| end < date).unwrap_or(false);
        if period.start_date > date || ended {
            return false;
        }
    }
    journey_profile
        .or(service_profile)
        .unwrap_or(&EVERY_DAY)
        .is_operational_on(date, bank_holidays, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    // 2025-05-08 is a Thursday
    fn thursday() -> Date {
        Date::from_ymd_opt(2025, 5, 8).unwrap()
    }

    fn today() -> Date {
        Date::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn profile(value: Value) -> OperatingProfile {
        OperatingProfile::try_from(&value).unwrap()
    }

    fn period() -> OperatingPeriod {
        OperatingPeriod {
            start_date: Date::from_ymd_opt(2018, 1, 28).unwrap(),
            end_date: None,
        }
    }

    fn bank_holiday(title: &str) -> Vec<BankHolidayEntry> {
        vec![BankHolidayEntry {
            title: title.into(),
            date: "2025-05-08".into(),
        }]
    }

    fn weekly(days_of_week: Value) -> OperatingProfile {
        profile(json!({"RegularDayType": {"DaysOfWeek": days_of_week}}))
    }

    mod regular_days {
        use super::*;
        use pretty_assertions::assert_eq;
        use chrono::Weekday::*;

        #[test]
        fn work_week() {
            let regular_days = OperatingProfile::regular_days(&json!({
                "MondayToFriday": null,
                "UnknownTag": null,
            }));
            let expected: HashSet<Weekday> = vec![Mon, Tue, Wed, Thu, Fri].into_iter().collect();
            assert_eq!(expected, regular_days);
        }

        #[test]
        fn not_saturday_and_weekend() {
            let regular_days = OperatingProfile::regular_days(&json!({
                "NotSaturday": null,
                "Weekend": null,
            }));
            assert_eq!(7, regular_days.len());
        }

        #[test]
        fn empty() {
            assert!(OperatingProfile::regular_days(&json!({})).is_empty());
        }
    }

    mod try_from {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn complete_profile() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"Weekend": null}},
                "SpecialDaysOperation": {
                    "DaysOfNonOperation": {
                        "DateRange": [
                            {"StartDate": "2025-12-25", "EndDate": "2025-12-26"},
                            {"StartDate": "2026-01-01"}
                        ]
                    }
                },
                "BankHolidayOperation": {
                    "DaysOfOperation": {"GoodFriday": null},
                    "DaysOfNonOperation": {"ChristmasDayHoliday": null, "BoxingDayHoliday": null}
                }
            }));
            assert_eq!(2, operating_profile.week_pattern.len());
            assert!(operating_profile.special_days.include.is_empty());
            assert_eq!(
                vec![
                    DateRange {
                        start_date: Some(Date::from_ymd_opt(2025, 12, 25).unwrap()),
                        end_date: Some(Date::from_ymd_opt(2025, 12, 26).unwrap()),
                    },
                    DateRange {
                        start_date: Some(Date::from_ymd_opt(2026, 1, 1).unwrap()),
                        end_date: None,
                    }
                ],
                operating_profile.special_days.exclude
            );
            assert!(operating_profile.bank_holidays.include.contains("GoodFriday"));
            assert_eq!(2, operating_profile.bank_holidays.exclude.len());
        }

        #[test]
        #[should_panic(expected = "Failed to parse '25/12/2025' as a date in element 'DateRange'")]
        fn invalid_date() {
            let value = json!({
                "SpecialDaysOperation": {
                    "DaysOfOperation": {"DateRange": {"StartDate": "25/12/2025"}}
                }
            });
            OperatingProfile::try_from(&value)
                .map_err(|e| e.to_string())
                .unwrap();
        }
    }

    mod is_operational {
        use super::*;

        fn check(
            journey_profile: Option<&OperatingProfile>,
            bank_holidays: &[BankHolidayEntry],
            service_profile: Option<&OperatingProfile>,
        ) -> bool {
            is_operational(
                journey_profile,
                bank_holidays,
                service_profile,
                Some(&period()),
                thursday(),
                today(),
            )
        }

        #[test]
        fn monday_to_friday_on_thursday() {
            let operating_profile = weekly(json!({"MondayToFriday": null}));
            assert!(check(Some(&operating_profile), &[], None));
        }

        #[test]
        fn thursday_on_thursday() {
            let operating_profile = weekly(json!({"Thursday": null}));
            assert!(check(Some(&operating_profile), &[], None));
        }

        #[test]
        fn not_thursday_on_thursday() {
            let operating_profile = weekly(json!({"NotThursday": null}));
            assert!(!check(Some(&operating_profile), &[], None));
        }

        #[test]
        fn without_any_profile() {
            assert!(check(None, &[], None));
        }

        #[test]
        fn journey_profile_over_service_profile() {
            let journey_profile = weekly(json!({"Weekend": null}));
            let service_profile = weekly(json!({"MondayToFriday": null}));
            assert!(!check(Some(&journey_profile), &[], Some(&service_profile)));
            assert!(check(None, &[], Some(&service_profile)));
        }

        #[test]
        fn empty_days_of_week() {
            let operating_profile = weekly(Value::Null);
            assert!(!check(Some(&operating_profile), &[], None));
        }

        #[test]
        fn outside_operating_period() {
            let operating_period = OperatingPeriod {
                start_date: Date::from_ymd_opt(2018, 1, 1).unwrap(),
                end_date: Some(Date::from_ymd_opt(2019, 1, 1).unwrap()),
            };
            assert!(!is_operational(
                None,
                &[],
                None,
                Some(&operating_period),
                thursday(),
                today()
            ));
            let future_period = OperatingPeriod {
                start_date: Date::from_ymd_opt(2025, 5, 9).unwrap(),
                end_date: None,
            };
            assert!(!is_operational(
                None,
                &[],
                None,
                Some(&future_period),
                thursday(),
                today()
            ));
        }

        #[test]
        fn without_operating_period() {
            assert!(is_operational(None, &[], None, None, thursday(), today()));
        }

        #[test]
        fn special_non_operation_over_weekly_pattern() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"MondayToSunday": null}},
                "SpecialDaysOperation": {
                    "DaysOfNonOperation": {"DateRange": {"StartDate": "2025-05-01", "EndDate": "2025-05-10"}},
                    "DaysOfOperation": {"DateRange": {"StartDate": "2025-05-08", "EndDate": "2025-05-08"}}
                }
            }));
            assert!(!check(Some(&operating_profile), &[], None));
        }

        #[test]
        fn special_operation_over_weekly_pattern() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"Weekend": null}},
                "SpecialDaysOperation": {
                    "DaysOfOperation": {"DateRange": {"StartDate": "2025-05-08", "EndDate": "2025-05-08"}}
                }
            }));
            assert!(check(Some(&operating_profile), &[], None));
        }

        #[test]
        fn special_operation_over_bank_holiday() {
            let operating_profile = profile(json!({
                "SpecialDaysOperation": {
                    "DaysOfOperation": {"DateRange": {"StartDate": "2025-05-08", "EndDate": "2025-05-08"}}
                },
                "BankHolidayOperation": {"DaysOfNonOperation": {"AllBankHolidays": null}}
            }));
            assert!(check(
                Some(&operating_profile),
                &bank_holiday("Early May bank holiday"),
                None
            ));
        }

        #[test]
        fn range_without_end_uses_current_date() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"Weekend": null}},
                "SpecialDaysOperation": {
                    "DaysOfOperation": {"DateRange": {"StartDate": "2025-05-01"}}
                }
            }));
            // The range ends on the current date, before the anchor date
            assert!(!check(Some(&operating_profile), &[], None));
            assert!(is_operational(
                Some(&operating_profile),
                &[],
                None,
                Some(&period()),
                thursday(),
                Date::from_ymd_opt(2025, 6, 1).unwrap(),
            ));
        }

        #[test]
        fn all_bank_holidays_non_operation() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"MondayToFriday": null}},
                "BankHolidayOperation": {"DaysOfNonOperation": {"AllBankHolidays": null}}
            }));
            assert!(!check(
                Some(&operating_profile),
                &bank_holiday("Some local holiday"),
                None
            ));
        }

        #[test]
        fn all_bank_holidays_operation() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"Weekend": null}},
                "BankHolidayOperation": {"DaysOfOperation": {"AllBankHolidays": null}}
            }));
            assert!(check(
                Some(&operating_profile),
                &bank_holiday("Some local holiday"),
                None
            ));
        }

        #[test]
        fn named_bank_holiday_operation() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"Weekend": null}},
                "BankHolidayOperation": {"DaysOfOperation": {"MayDay": null}}
            }));
            assert!(check(
                Some(&operating_profile),
                &bank_holiday("Early May bank holiday"),
                None
            ));
        }

        #[test]
        fn named_bank_holiday_non_operation() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"MondayToFriday": null}},
                "BankHolidayOperation": {"DaysOfNonOperation": {"MayDay": null}}
            }));
            assert!(!check(
                Some(&operating_profile),
                &bank_holiday("Early May bank holiday"),
                None
            ));
        }

        #[test]
        fn bank_holiday_without_rule_falls_through() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"MondayToFriday": null}},
                "BankHolidayOperation": {"DaysOfNonOperation": {"ChristmasDayHoliday": null}}
            }));
            assert!(check(
                Some(&operating_profile),
                &bank_holiday("Early May bank holiday"),
                None
            ));
        }

        #[test]
        fn bank_holiday_on_another_date() {
            let operating_profile = profile(json!({
                "RegularDayType": {"DaysOfWeek": {"MondayToFriday": null}},
                "BankHolidayOperation": {"DaysOfNonOperation": {"AllBankHolidays": null}}
            }));
            let bank_holidays = vec![BankHolidayEntry {
                title: "Spring bank holiday".into(),
                date: "2025-05-26".into(),
            }];
            assert!(check(Some(&operating_profile), &bank_holidays, None));
        }
    }

    #[test]
    fn every_day() {
        assert_eq!(7, OperatingProfile::every_day().week_pattern.len());
    }
}
