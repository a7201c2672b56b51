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

//! Configuration of the upload of one document.

use crate::{objects::Date, Result};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::{fs::File, path};
use tracing::info;

const TNDS_DATA_SOURCE: &str = "tnds";

fn today() -> Date {
    chrono::Local::now().date_naive()
}

/// Where a document comes from and the date its journeys are checked
/// against.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Configuration {
    /// `bods`, `tnds`, ...
    pub data_source: String,
    /// Region of a TNDS document
    #[serde(default)]
    pub region_code: Option<String>,
    /// Storage key of the document, saved as the file path of the services
    pub key: String,
    /// Date used to compute whether the vehicle journeys run
    #[serde(default = "today")]
    pub anchor_date: Date,
}

impl Configuration {
    /// Derive the configuration from a storage key like
    /// `20250213/tnds/WM/file.xml`: the second segment is the data source and,
    /// for TNDS only, the third one is the region.
    pub fn from_key(key: &str, anchor_date: Date) -> Result<Self> {
        let segments: Vec<&str> = key.split('/').collect();
        let data_source = match segments.get(1) {
            Some(data_source) if !data_source.is_empty() => data_source.to_string(),
            _ => bail!("No data source in key '{}'", key),
        };
        let region_code = if data_source == TNDS_DATA_SOURCE {
            segments.get(2).map(|region_code| region_code.to_string())
        } else {
            None
        };
        Ok(Configuration {
            data_source,
            region_code,
            key: key.to_string(),
            anchor_date,
        })
    }
}

/// Read a JSON configuration file
///
/// Below is an example of this file
/// ```text
/// {
///     "data_source": "tnds",
///     "region_code": "WM",
///     "key": "20250213/tnds/WM/file.xml",
///     "anchor_date": "2025-02-13"
/// }
/// ```
/// `region_code` and `anchor_date` (today by default) are optional.
pub fn read_config<P: AsRef<path::Path>>(config_path: P) -> Result<Configuration> {
    let config_path = config_path.as_ref();
    info!("Reading configuration from {:?}", config_path);
    let json_config_file = File::open(config_path)
        .with_context(|| format!("Error reading {:?}", config_path))?;
    let configuration = serde_json::from_reader(json_config_file)
        .with_context(|| format!("Error parsing configuration {:?}", config_path))?;
    Ok(configuration)
}
