// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of linkmill.
//
// linkmill is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// linkmill is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with linkmill.  If not,
// see <http://www.gnu.org/licenses/>.

//! # configuration
//!
//! Knobs for the enrichment worker. The embedding service deserializes this as one stanza of its
//! own configuration file & hands it to [Worker::start].
//!
//! [Worker::start]: crate::worker::Worker::start

use std::time::Duration;

use serde::Deserialize;

/// Configuration parameters for the enrichment worker
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Name of the queue on which link events are published
    pub queue: String,
    /// Deadline for any single call against the link store; this is the same budget the
    /// platform's RPC handlers use for the store
    #[serde(rename = "storage-timeout")]
    pub storage_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue: "link-events".to_string(),
            storage_timeout: Duration::from_secs(5),
        }
    }
}
