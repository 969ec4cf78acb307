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

//! # queue
//!
//! The worker's view of the message broker: subscribe to a named queue, receive raw payloads in
//! delivery order. Connection management, channels, reconnects-- all of that stays with whoever
//! implements [Consumer]; the worker neither opens nor closes broker resources.
//!
//! Deliveries are acknowledged to the broker as they're handed out (acknowledge-on-delivery, the
//! broker's auto-ack mode), *not* after processing. The consequence: if the process dies between
//! receiving a message & persisting the enrichment, that message is gone-- the broker will not
//! redeliver it & the link simply keeps its unenriched title and tags until its next update event.
//! The platform has always run this way; implementors of [Consumer] should preserve it rather
//! than quietly switching to acknowledge-after-processing, which would change redelivery behavior
//! for every consumer of this trait.

use std::sync::Arc;

use async_trait::async_trait;
use snafu::{prelude::*, Backtrace};
use tokio::sync::mpsc;

/// A single raw message as it came off the queue. Decoding is the receiver's problem; see
/// [decode].
///
/// [decode]: crate::events::decode
#[derive(Clone, Debug)]
pub struct Delivery {
    pub body: Vec<u8>,
}

impl Delivery {
    pub fn new(body: impl Into<Vec<u8>>) -> Delivery {
        Delivery { body: body.into() }
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Failed to subscribe to the {queue} queue: {source}"))]
    Subscribe {
        queue: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        backtrace: Backtrace,
    },
}

impl Error {
    pub fn subscribe(queue: &str, err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::Subscribe {
            queue: queue.to_string(),
            source: Box::new(err),
            backtrace: Backtrace::capture(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait Consumer {
    /// Open a subscription on the named queue. The returned channel yields deliveries in broker
    /// order; it closing means the broker-side subscription is gone.
    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<Delivery>>;
}

/// Blanket implementation for [Arc]s; if `T` is a [Consumer], then so is `Arc<T>`.
#[async_trait]
impl<T: Consumer + Send + Sync + ?Sized> Consumer for Arc<T> {
    async fn subscribe(&self, queue: &str) -> Result<mpsc::Receiver<Delivery>> {
        self.as_ref().subscribe(queue).await
    }
}
