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

//! # The enrichment consumer loop
//!
//! This module owns the queue subscription & the loop that drains it. One might reasonably ask
//! why there's a loop here at all rather than a `tokio::spawn` per delivery: enrichment is
//! I/O-bound & bursty, and a spawn-per-message design would happily open a thousand concurrent
//! fetches against a thousand pages the moment a backfill lands on the queue. Processing is
//! instead strictly sequential on a single task: one delivery, one enrichment cycle, then the
//! next. That also buys us freedom from any per-link locking, since two cycles can never race on
//! the same record.
//!
//! # Lifecycle
//!
//! [Worker::start] subscribes first & spawns the loop second, so a dead broker shows up as an
//! error at startup rather than a silently idle worker. Once running, the loop waits on either a
//! shutdown notification or the next delivery; per-message failures of any stripe are logged &
//! counted, and the loop moves on. Only two things end it: a shutdown request (clean exit) and
//! the delivery channel closing underneath us, which means the broker-side subscription is gone &
//! somebody above us needs to notice ([Error::ChannelClosed]).
//!
//! The worker never owns the broker or store connections; dropping the [Worker] abandons the loop
//! task but closes nothing.

use std::{future::Future, pin::Pin, sync::Arc, task::Poll, time::Duration};

use pin_project::pin_project;
use snafu::{prelude::*, Backtrace};
use tokio::{
    sync::{mpsc, Notify},
    task::{JoinError, JoinHandle},
};
use tracing::{error, info};

use crate::{
    config::Config,
    counter_add, events,
    metrics::{self, Instruments, Sort},
    queue::{self, Consumer, Delivery},
    updater::Updater,
};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       module error type                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("The {queue} queue was closed on the broker side"))]
    ChannelClosed { queue: String, backtrace: Backtrace },
    #[snafu(display("The consumer loop failed to run to completion: {source}"))]
    Join {
        source: tokio::task::JoinError,
        backtrace: Backtrace,
    },
    #[snafu(display("Timeout shutting-down the consumer loop: {source}"))]
    ShutdownTimeout {
        source: tokio::time::error::Elapsed,
        backtrace: Backtrace,
    },
    #[snafu(display("Failed to open the event subscription: {source}"))]
    Subscribe { source: queue::Error },
}

pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        the consumer loop                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

inventory::submit! { metrics::Registration::new("updater.messages.received", Sort::IntegralCounter) }

inventory::submit! { metrics::Registration::new("updater.messages.dropped", Sort::IntegralCounter) }

inventory::submit! { metrics::Registration::new("updater.links.enriched", Sort::IntegralCounter) }

inventory::submit! { metrics::Registration::new("updater.enrichments.failed", Sort::IntegralCounter) }

/// Drain `deliveries` until shutdown is requested or the channel closes. `updater` runs one
/// enrichment cycle per decoded message; its failures (like decode failures) are logged, counted &
/// otherwise swallowed-- the messages are already acknowledged, so there is nothing to give back
/// to the broker.
async fn run(
    mut deliveries: mpsc::Receiver<Delivery>,
    updater: Updater,
    queue: String,
    shutdown: Arc<Notify>,
    instruments: Arc<Instruments>,
) -> Result<()> {
    info!(%queue, "link updater running");
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("link updater shutting down");
                return Ok(());
            },
            next = deliveries.recv() => {
                let delivery = match next {
                    Some(delivery) => delivery,
                    None => return ChannelClosedSnafu { queue }.fail(),
                };
                counter_add!(instruments, "updater.messages.received", 1, &[]);
                let event = match events::decode(&delivery.body) {
                    Ok(event) => event,
                    Err(err) => {
                        error!(err = %err, "dropping an undecodable message");
                        counter_add!(instruments, "updater.messages.dropped", 1, &[]);
                        continue;
                    }
                };
                match updater.enrich(&event).await {
                    Ok(()) => {
                        counter_add!(instruments, "updater.links.enriched", 1, &[]);
                    }
                    Err(err) => {
                        error!(id = %event.id(), err = %err, "enrichment failed");
                        counter_add!(instruments, "updater.enrichments.failed", 1, &[]);
                    }
                }
            }
        }
    }
}

/// Handle on a running consumer loop.
///
/// Resolves (as a [Future]) to the loop's result, for callers driving it inside a `tokio::select!`
/// alongside their other servers; or call [shutdown] to request a stop & wait a bounded amount of
/// time for it.
///
/// [shutdown]: Worker::shutdown
#[pin_project]
pub struct Worker {
    #[pin]
    task: JoinHandle<Result<()>>,
    shutdown: Arc<Notify>,
}

impl Future for Worker {
    type Output = std::result::Result<Result<()>, JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        this.task.poll(cx)
    }
}

impl Worker {
    /// Subscribe to the event queue & spawn the consumer loop.
    ///
    /// The subscription is opened before anything is spawned; if the broker won't give us one, the
    /// worker never starts & the error goes straight back to the caller.
    pub async fn start<C: Consumer + ?Sized>(
        consumer: &C,
        updater: Updater,
        config: Config,
        instruments: Arc<Instruments>,
    ) -> Result<Worker> {
        let deliveries = consumer
            .subscribe(&config.queue)
            .await
            .context(SubscribeSnafu)?;
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(run(
            deliveries,
            updater,
            config.queue,
            shutdown.clone(),
            instruments,
        ));
        Ok(Worker { task, shutdown })
    }
    /// Consume the instance & return the result of the consumer loop.
    ///
    /// This method will signal the loop to shut down, and wait for time `timeout` for it to exit.
    pub async fn shutdown(self, timeout: Duration) -> Result<()> {
        self.shutdown.notify_one();
        tokio::time::timeout(timeout, self.task)
            .await
            .context(ShutdownTimeoutSnafu)?
            .context(JoinSnafu)?
    }
    /// Split the instance back into its parts
    ///
    /// This is convenient when waiting on the loop along with other futures (in a `tokio::select!`
    /// invocation, e.g.)
    pub fn into_parts(self) -> (JoinHandle<Result<()>>, Arc<Notify>) {
        (self.task, self.shutdown)
    }
}

// Drive the loop against in-memory stand-ins for the broker, the store & the scraper.
#[cfg(test)]
mod test {
    use std::{
        collections::HashMap,
        sync::Mutex,
    };

    use async_trait::async_trait;
    use chrono::Utc;
    use url::Url;

    use super::*;
    use crate::{
        entities::{Link, LinkId, OwnerId},
        events::LinkEvent,
        scrape::{self, PageMetadata, Scraper},
        storage::{self, UpdateLink},
    };

    // A queue that hands out one pre-built channel & refuses any second subscription.
    struct StaticQueue {
        rx: Mutex<Option<mpsc::Receiver<Delivery>>>,
    }

    impl StaticQueue {
        fn new(rx: mpsc::Receiver<Delivery>) -> StaticQueue {
            StaticQueue {
                rx: Mutex::new(Some(rx)),
            }
        }
    }

    #[async_trait]
    impl Consumer for StaticQueue {
        async fn subscribe(&self, queue: &str) -> queue::Result<mpsc::Receiver<Delivery>> {
            self.rx.lock().unwrap().take().ok_or(queue::Error::subscribe(
                queue,
                std::io::Error::other("already subscribed"),
            ))
        }
    }

    // A broker that's down.
    struct DeafQueue;

    #[async_trait]
    impl Consumer for DeafQueue {
        async fn subscribe(&self, queue: &str) -> queue::Result<mpsc::Receiver<Delivery>> {
            Err(queue::Error::subscribe(
                queue,
                std::io::Error::other("connection refused"),
            ))
        }
    }

    struct TestLinks {
        links: Mutex<HashMap<LinkId, Link>>,
    }

    impl TestLinks {
        fn holding(links: impl IntoIterator<Item = Link>) -> TestLinks {
            TestLinks {
                links: Mutex::new(links.into_iter().map(|l| (l.id().clone(), l)).collect()),
            }
        }
        fn get(&self, id: &LinkId) -> Option<Link> {
            self.links.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl storage::Backend for TestLinks {
        async fn find_by_id(&self, id: &LinkId) -> storage::Result<Link> {
            self.get(id)
                .ok_or(storage::NotFoundSnafu { id: id.clone() }.build())
        }
        async fn update(&self, id: &LinkId, fields: UpdateLink) -> storage::Result<Link> {
            let mut m = self.links.lock().unwrap();
            let link = m
                .get(id)
                .ok_or(storage::NotFoundSnafu { id: id.clone() }.build())?;
            let updated = Link::new(
                link.id(),
                &fields.title,
                link.url(),
                link.images(),
                &fields.tags,
                link.owner_id(),
                &link.created_at(),
                &Utc::now(),
            );
            m.insert(id.clone(), updated.clone());
            Ok(updated)
        }
    }

    struct TestScraper {
        meta: PageMetadata,
    }

    #[async_trait]
    impl Scraper for TestScraper {
        async fn scrape(&self, _url: &Url) -> scrape::Result<PageMetadata> {
            Ok(self.meta.clone())
        }
    }

    fn l1() -> Link {
        let now = Utc::now();
        Link::new(
            &LinkId::new("L1").unwrap(),
            "",
            &Url::parse("http://example.com").unwrap(),
            &[],
            &["a".to_string()],
            &OwnerId::new("U1"),
            &now,
            &now,
        )
    }

    fn updater(links: Arc<TestLinks>) -> Updater {
        Updater::new(
            links,
            Arc::new(TestScraper {
                meta: PageMetadata {
                    title: Some("Example".to_string()),
                    tags: vec!["b".to_string(), "c".to_string()],
                },
            }),
            Config::default().storage_timeout,
        )
    }

    fn instruments() -> Arc<Instruments> {
        Arc::new(Instruments::new("linkmill"))
    }

    #[test]
    fn metric_names_are_unique() {
        metrics::check_metric_registrations();
    }

    #[tokio::test]
    async fn bad_messages_do_not_stop_the_loop() {
        let (tx, rx) = mpsc::channel(16);
        let links = Arc::new(TestLinks::holding([l1()]));
        let worker = Worker::start(
            &StaticQueue::new(rx),
            updater(links.clone()),
            Config::default(),
            instruments(),
        )
        .await
        .unwrap();

        // Garbage, an event for a link that's gone, then a legitimate event; only the last should
        // produce a write, and none should kill the loop.
        tx.send(Delivery::new(&b"definitely not json"[..]))
            .await
            .unwrap();
        tx.send(Delivery::new(&br#"{"id": ""}"#[..])).await.unwrap();
        tx.send(Delivery::new(
            events::encode(&LinkEvent::new(LinkId::new("L-gone").unwrap())).unwrap(),
        ))
        .await
        .unwrap();
        tx.send(Delivery::new(
            events::encode(&LinkEvent::new(LinkId::new("L1").unwrap())).unwrap(),
        ))
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;

        let stored = links.get(&LinkId::new("L1").unwrap()).unwrap();
        assert_eq!(stored.title(), "Example");
        assert_eq!(stored.tags(), &["a", "b", "c"]);

        worker.shutdown(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn a_dead_broker_prevents_startup() {
        let links = Arc::new(TestLinks::holding([]));
        let err = Worker::start(
            &DeafQueue,
            updater(links),
            Config::default(),
            instruments(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, Error::Subscribe { .. }));
    }

    #[tokio::test]
    async fn a_closed_channel_is_fatal() {
        let (tx, rx) = mpsc::channel(16);
        let links = Arc::new(TestLinks::holding([]));
        let worker = Worker::start(
            &StaticQueue::new(rx),
            updater(links),
            Config::default(),
            instruments(),
        )
        .await
        .unwrap();

        drop(tx);

        let result = tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::ChannelClosed { .. })));
    }

    #[tokio::test]
    async fn shutdown_while_idle_is_clean() {
        let (_tx, rx) = mpsc::channel(16);
        let links = Arc::new(TestLinks::holding([]));
        let worker = Worker::start(
            &StaticQueue::new(rx),
            updater(links),
            Config::default(),
            instruments(),
        )
        .await
        .unwrap();

        worker.shutdown(Duration::from_secs(1)).await.unwrap();
    }
}
