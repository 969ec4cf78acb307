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

//! # linkmill metrics
//!
//! linkmill records its operational counters through [OpenTelemetry]. OTel's advice is to
//! build each instrument once & reuse it, which raises the question of where to keep them all;
//! I'd rather not grow a state type with one `Counter<u64>` field per metric, nor maintain a
//! centralized list of metric names somewhere far from the code that bumps them.
//!
//! [OpenTelemetry]: https://docs.rs/opentelemetry/latest/opentelemetry/index.html
//!
//! So: metric names are declared *at the collection site* with David Tolnay's [inventory] crate,
//!
//! ```ignore
//! inventory::submit! { metrics::Registration::new("updater.links.enriched", Sort::IntegralCounter) }
//! ```
//!
//! an [Instruments] instance pre-builds every registered instrument at startup, and the
//! [counter_add] macro handles the lookup at the collection site:
//!
//! ```ignore
//! counter_add!(instruments, "updater.links.enriched", 1, &[]);
//! ```
//!
//! [counter_add]: crate::counter_add
//!
//! Lookup failures (a name that was never registered, say) panic: with a richer type system they
//! would be compile-time errors, and [check_metric_registrations] gives startup code a chance to
//! catch name collisions before any traffic arrives.

use std::collections::{hash_map::Entry, HashMap, HashSet};

use opentelemetry::{global, metrics::Counter, KeyValue};

/// Instrument type
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Sort {
    /// Corresponds to `Counter<u64>`
    IntegralCounter,
    // more later?
}

/// The type of thing being inventoried
///
/// Register a metric by name & type using
///
/// ```ignore
/// inventory::submit! { metrics::Registration::new("updater.messages.received", Sort::IntegralCounter) }
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Registration {
    name: &'static str,
    sort: Sort,
}

impl Registration {
    pub const fn new(name: &'static str, sort: Sort) -> Registration {
        Registration { name, sort }
    }
    pub fn name(&self) -> String {
        self.name.to_string()
    }
    pub fn sort(&self) -> Sort {
        self.sort
    }
}

inventory::collect!(Registration);

pub fn check_metric_registrations() {
    let mut names: HashSet<String> = HashSet::new();
    IntoIterator::into_iter(inventory::iter::<Registration>).for_each(|reg| {
        if names.contains(&reg.name()) {
            panic!("The metric name {} was used twice", reg.name());
        }
        names.insert(reg.name());
    });
}

enum Instrument {
    CounterU64(Counter<u64>),
}

/// Container for OTel instruments
pub struct Instruments {
    meter: opentelemetry::metrics::Meter,
    map: HashMap<String, Instrument>,
}

impl Instruments {
    pub fn new(prefix: &'static str) -> Instruments {
        let mut m: HashMap<String, Instrument> = HashMap::new();
        let meter = global::meter(prefix);
        // Pre-building all the registered instruments risks building things that may never be
        // used, but means `add` doesn't need `&mut self` & instances can live in an `Arc`.
        IntoIterator::into_iter(inventory::iter::<Registration>).for_each(|reg| {
            let name = reg.name();
            match m.entry(reg.name()) {
                Entry::Occupied(_occupied_entry) => {
                    panic!("The metric name {} was used twice", name)
                }
                Entry::Vacant(vacant_entry) => {
                    vacant_entry.insert(match reg.sort() {
                        Sort::IntegralCounter => {
                            Instrument::CounterU64(meter.u64_counter(name).build())
                        }
                    });
                }
            }
        });

        Instruments { meter, map: m }
    }
    pub fn meter(&self) -> &opentelemetry::metrics::Meter {
        &self.meter
    }
    // panics if `name` doesn't name a counter
    pub fn add(&self, name: &str, count: u64, attributes: &[KeyValue]) {
        if let Some(Instrument::CounterU64(c)) = self.map.get(name) {
            c.add(count, attributes);
        } else {
            panic!("{} does not name a counter", name);
        }
    }
}

#[macro_export]
macro_rules! counter_add {
    ($instr:expr, $name:expr, $count:expr, $attrs:expr) => {
        $instr.add($name, $count, $attrs);
    };
}
