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

//! # updater
//!
//! One enrichment cycle, start to finish: resolve the event's link, scrape its page, fold the
//! scraped metadata into the record, write it back. The [Updater] holds no state of its own beyond
//! its two ports & a deadline; it can be driven as fast or as slow as the consumer loop likes.
//!
//! The failure policy is deliberately blunt. Whatever goes wrong-- the link has been deleted, the
//! page won't fetch, the store won't answer-- the cycle is abandoned & the error handed back to
//! the caller. Nothing is retried here, and a cycle that fails before its final write leaves the
//! stored record exactly as it found it. If the platform ever wants retries, they belong in the
//! delivery layer, not in this logic.

use std::{future::Future, sync::Arc, time::Duration};

use snafu::prelude::*;
use tracing::debug;

use crate::{
    events::LinkEvent,
    scrape::{self, Scraper},
    storage::{self, UpdateLink},
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Failed to scrape the link's page: {source}"))]
    Scrape { source: scrape::Error },
    #[snafu(display("Failed against the link store: {source}"))]
    Storage { source: storage::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The enrichment orchestrator. Construct one with the two ports it drives plus the per-call
/// deadline for the link store (the same budget the platform's gRPC handlers use; on the order of
/// seconds).
pub struct Updater {
    links: Arc<dyn storage::Backend + Send + Sync>,
    scraper: Arc<dyn Scraper + Send + Sync>,
    storage_timeout: Duration,
}

impl Updater {
    pub fn new(
        links: Arc<dyn storage::Backend + Send + Sync>,
        scraper: Arc<dyn Scraper + Send + Sync>,
        storage_timeout: Duration,
    ) -> Updater {
        Updater {
            links,
            scraper,
            storage_timeout,
        }
    }
    /// Run one enrichment cycle.
    ///
    /// Exactly one read & at most one write are issued against the link store; a failed scrape
    /// issues no write at all. Each store call runs under [storage_timeout]; expiry is reported as
    /// [storage::Error::Timeout], which callers may treat as retryable on a later delivery.
    ///
    /// [storage_timeout]: Updater::new
    pub async fn enrich(&self, event: &LinkEvent) -> Result<()> {
        let mut link = self
            .with_deadline(self.links.find_by_id(event.id()))
            .await
            .context(StorageSnafu)?;

        debug!(id = %event.id(), url = %link.url(), "enriching link");

        let meta = self
            .scraper
            .scrape(link.url())
            .await
            .context(ScrapeSnafu)?;
        link.merge_metadata(meta);

        self.with_deadline(self.links.update(event.id(), UpdateLink::from(&link)))
            .await
            .context(StorageSnafu)?;

        Ok(())
    }
    async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = storage::Result<T>>,
    ) -> storage::Result<T> {
        match tokio::time::timeout(self.storage_timeout, fut).await {
            Ok(result) => result,
            Err(_elapsed) => storage::TimeoutSnafu {
                budget: self.storage_timeout,
            }
            .fail(),
        }
    }
}
