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

//! # storage
//!
//! Abstraction over the link store. The document store behind it belongs to the link service; the
//! worker sees exactly two operations, a point read & a partial write.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use snafu::{prelude::*, Backtrace};

use crate::entities::{Link, LinkId};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // Generic error variant trait implementations can use
    #[snafu(display("{source}"))]
    Backend {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        backtrace: Backtrace,
    },
    #[snafu(display("No link with identifier {id}"))]
    NotFound { id: LinkId, backtrace: Backtrace },
    #[snafu(display("The link store failed to answer within {budget:?}"))]
    Timeout {
        budget: Duration,
        backtrace: Backtrace,
    },
}

impl Error {
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::Backend {
            source: Box::new(err),
            backtrace: Backtrace::capture(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The fields an enrichment cycle is allowed to write back. Everything else on a [Link]-- its URL
/// in particular-- stays whatever the store already holds.
#[derive(Clone, Debug)]
pub struct UpdateLink {
    pub title: String,
    pub tags: Vec<String>,
}

impl From<&Link> for UpdateLink {
    fn from(link: &Link) -> Self {
        UpdateLink {
            title: link.title().to_string(),
            tags: link.tags().to_vec(),
        }
    }
}

#[async_trait]
pub trait Backend {
    /// Retrieve a single link record. [Error::NotFound] means the link no longer exists.
    async fn find_by_id(&self, id: &LinkId) -> Result<Link>;
    /// Overwrite the enrichable fields of a single link record, returning the record as stored.
    async fn update(&self, id: &LinkId, fields: UpdateLink) -> Result<Link>;
}

/// Blanket implementation for [Arc]s; if `T` is a [Backend], then so is `Arc<T>`.
#[async_trait]
impl<T: Backend + Send + Sync + ?Sized> Backend for Arc<T> {
    async fn find_by_id(&self, id: &LinkId) -> Result<Link> {
        self.as_ref().find_by_id(id).await
    }
    async fn update(&self, id: &LinkId, fields: UpdateLink) -> Result<Link> {
        self.as_ref().update(id, fields).await
    }
}
