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

//! # scrape
//!
//! The worker's view of page scraping: hand over a URL, get back whatever title & tags could be
//! pulled out of the page. How the page is fetched & parsed is the implementor's business; from
//! here every failure mode (DNS, connection refused, non-2xx status, unparseable markup) looks
//! the same, a single [Error] carrying the underlying cause.

use async_trait::async_trait;
use snafu::{prelude::*, Backtrace};
use url::Url;

/// What a scrape produced. Both fields may be empty; an empty page is a successful scrape, not an
/// error.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Snafu)]
#[snafu(display("Failed to scrape {url}: {source}"))]
pub struct Error {
    url: Url,
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
    backtrace: Backtrace,
}

impl Error {
    pub fn new(url: &Url, err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error {
            url: url.clone(),
            source: Box::new(err),
            backtrace: Backtrace::capture(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait Scraper {
    async fn scrape(&self, url: &Url) -> Result<PageMetadata>;
}
