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

//! # events
//!
//! The wire format of the enrichment queue. A message is a JSON object bearing a single field,
//! the identifier of the link to enrich:
//!
//! ```json
//! {"id": "66f2b716a3a8c2660cbe7e2a"}
//! ```
//!
//! The link service encodes one of these whenever it creates or updates a link; the worker decodes
//! them on the far side of the queue. Both halves go through this module so the two can't drift.
//! Anything that isn't a well-formed event (not JSON, no `id`, an empty `id`) fails with
//! [`Error::De`]; the empty-identifier case is caught by [LinkId]'s deserializer.
//!
//! [LinkId]: crate::entities::LinkId

use serde::{Deserialize, Serialize};
use snafu::{prelude::*, Backtrace};

use crate::entities::LinkId;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Malformed link event: {source}"))]
    De {
        source: serde_json::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Failed to encode a link event: {source}"))]
    Ser {
        source: serde_json::Error,
        backtrace: Backtrace,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Notification that a stored link needs enrichment. Carries nothing but the link's identifier;
/// everything else is looked up when the message is processed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LinkEvent {
    id: LinkId,
}

impl LinkEvent {
    pub fn new(id: LinkId) -> LinkEvent {
        LinkEvent { id }
    }
    pub fn id(&self) -> &LinkId {
        &self.id
    }
}

/// Decode a raw queue payload. Pure; no payload can make this panic.
pub fn decode(raw: &[u8]) -> Result<LinkEvent> {
    serde_json::from_slice(raw).context(DeSnafu)
}

/// Encode an event for publication.
pub fn encode(event: &LinkEvent) -> Result<Vec<u8>> {
    serde_json::to_vec(event).context(SerSnafu)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let event = LinkEvent::new(LinkId::new("66f2b716a3a8c2660cbe7e2a").unwrap());
        let raw = encode(&event).unwrap();
        assert_eq!(decode(&raw).unwrap(), event);
    }

    #[test]
    fn wire_shape() {
        let event = decode(br#"{"id": "L1"}"#).unwrap();
        assert_eq!(event.id().as_ref(), "L1");
    }

    #[test]
    fn bad_payloads() {
        assert!(decode(br#"{"id": ""}"#).is_err());
        assert!(decode(br#"{}"#).is_err());
        assert!(decode(br#"{"id": 42}"#).is_err());
        assert!(decode(b"not json at all").is_err());
        assert!(decode(b"").is_err());
    }
}
