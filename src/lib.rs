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

//! The `txc_uploader` crate loads [TransXChange](https://www.gov.uk/government/collections/transxchange)
//! documents into a relational reference data store.
//!
//! A document arrives as a normalized tree (see [document]); it is read into
//! the typed model of [objects] by [transxchange::read], then written by
//! [writer::write_to_database] inside a single transaction: services, journey
//! patterns and their links, vehicle journeys (with their operability for the
//! anchor date), tracks, administrative areas and centre points.

#![deny(missing_docs)]

pub mod configuration;
pub mod document;
pub mod metrics;
pub mod objects;
pub mod store;
#[doc(hidden)]
pub mod test_utils;
pub mod transxchange;
mod version_utils;
pub mod writer;

pub use crate::configuration::Configuration;
pub use crate::version_utils::{binary_full_version, GIT_VERSION};
pub use crate::writer::{write_to_database, FailureReason, WriteOutcome};

lazy_static::lazy_static! {
    /// Current date, in ISO 8601 format
    pub static ref CURRENT_DATE: String = chrono::Local::now().format("%F").to_string();
}

/// The error type used by the crate.
pub type Error = anyhow::Error;

/// The corresponding result type used by the crate.
pub type Result<T> = std::result::Result<T, Error>;
