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

//! # linkmill
//!
//! The link-enrichment worker for a small bookmarking platform.
//!
//! When a link is created (or updated), all the platform has for it is whatever the user typed:
//! a URL, maybe a title. The interesting metadata-- the page's real title, its tags-- lives on the
//! other end of that URL, and fetching it is far too slow & far too failure-prone to do while a
//! request handler is on the hook for a response. So the link service just drops a small message
//! on a queue and moves on; this crate is the other end of that queue.
//!
//! linkmill is a library, not a daemon: the services that own the broker connection, the document
//! store & the page scraper hand those capabilities in as trait objects ([`queue::Consumer`],
//! [`storage::Backend`], [`scrape::Scraper`]) and embed the [`worker`] in their own process.

pub mod config;
pub mod entities;
pub mod events;
pub mod metrics;
pub mod queue;
pub mod scrape;
pub mod storage;
pub mod updater;
pub mod worker;
