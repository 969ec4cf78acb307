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

//! # linkmill models
//!
//! The handful of types the worker passes around: link identifiers & the link record itself. The
//! document store owns these records; the worker only ever holds a transient copy for the duration
//! of one enrichment cycle.

use std::{fmt::Display, ops::Deref, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use snafu::{prelude::*, Backtrace};
use url::Url;

use crate::scrape::PageMetadata;

type StdResult<T, E> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{text:?} is not a valid link identifier"))]
    BadLinkId { text: String, backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                             LinkId                                             //
////////////////////////////////////////////////////////////////////////////////////////////////////

fn check_link_id(s: &str) -> bool {
    [!s.is_empty(), !s.contains(char::is_whitespace)]
        .into_iter()
        .all(|x| x)
}

/// A link identifier.
///
/// The document store mints these; to the worker they're opaque text. The only thing we insist on
/// is that an identifier actually identify something: the empty string (and anything containing
/// whitespace) is rejected at construction, which means a deserialized [LinkId] is always usable
/// as a lookup key.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct LinkId(String);

impl LinkId {
    /// Correct-by-construction [LinkId] constructor
    pub fn new(text: &str) -> Result<LinkId> {
        check_link_id(text)
            .then_some(LinkId(text.to_string()))
            .ok_or(
                BadLinkIdSnafu {
                    text: text.to_string(),
                }
                .build(),
            )
    }
}

impl AsRef<str> for LinkId {
    fn as_ref(&self) -> &str {
        self.deref()
    }
}

impl Deref for LinkId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Implement `Deserialize` by hand to fail if the serialized value isn't a legit `LinkId`
impl<'de> Deserialize<'de> for LinkId {
    fn deserialize<D>(deserializer: D) -> StdResult<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        LinkId::try_from(s).map_err(serde::de::Error::custom)
    }
}

impl Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LinkId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        LinkId::new(s)
    }
}

impl TryFrom<String> for LinkId {
    type Error = Error;

    fn try_from(text: String) -> std::result::Result<Self, Self::Error> {
        if check_link_id(&text) {
            Ok(LinkId(text))
        } else {
            BadLinkIdSnafu { text }.fail()
        }
    }
}


////////////////////////////////////////////////////////////////////////////////////////////////////
//                                             OwnerId                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The identifier of the user owning a link. Minted by the user service; opaque here.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(text: &str) -> OwnerId {
        OwnerId(text.to_string())
    }
}

impl AsRef<str> for OwnerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(text: &str) -> Self {
        OwnerId(text.to_string())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                              Link                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A stored link.
///
/// Tags are an ordered sequence, not a set: the store preserves whatever order they were written
/// in, and repeated enrichment may accumulate duplicates (see [merge_metadata]). The URL is set
/// when the link is created & never changes thereafter; enrichment touches only the title & tags.
///
/// [merge_metadata]: Link::merge_metadata
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Link {
    id: LinkId,
    title: String,
    url: Url,
    images: Vec<String>,
    tags: Vec<String>,
    owner_id: OwnerId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Link {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &LinkId,
        title: &str,
        url: &Url,
        images: &[String],
        tags: &[String],
        owner_id: &OwnerId,
        created_at: &DateTime<Utc>,
        updated_at: &DateTime<Utc>,
    ) -> Link {
        Link {
            id: id.clone(),
            title: title.to_string(),
            url: url.clone(),
            images: images.to_vec(),
            tags: tags.to_vec(),
            owner_id: owner_id.clone(),
            created_at: *created_at,
            updated_at: *updated_at,
        }
    }
    pub fn id(&self) -> &LinkId {
        &self.id
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn url(&self) -> &Url {
        &self.url
    }
    pub fn images(&self) -> &[String] {
        &self.images
    }
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    /// Fold scraped page metadata into this record.
    ///
    /// A non-empty scraped title replaces whatever title is stored; scraped tags are appended to
    /// the stored tags in the order the scraper produced them. No de-duplication is performed, so
    /// scraping the same page twice will double its tags.
    pub fn merge_metadata(&mut self, meta: PageMetadata) {
        match meta.title {
            Some(title) if !title.is_empty() => self.title = title,
            _ => (),
        }
        self.tags.extend(meta.tags);
    }
}
