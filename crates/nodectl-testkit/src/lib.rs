//! Test utilities and fixtures for exercising `nodectl` without real nodes.
//!
//! Provides a recording in-memory backend ([`mock::MockNode`]) and small
//! helpers for generating stable node names, addresses and schedules.

pub mod mock;

use mock::MockNodeBuilder;
use nodectl::ScheduleContext;
use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

///
/// Deterministic dummy-value generator for tests.
///
/// Produces stable names/addresses/schedules derived from a numeric seed,
/// which keeps tests reproducible without hardcoding fixtures.
///

pub struct Fake;

impl Fake {
    #[must_use]
    pub fn node_name(seed: u16) -> String {
        format!("node{seed}")
    }

    /// `10.0.<hi>.<lo>` for the seed's two bytes.
    #[must_use]
    pub fn ip(seed: u16) -> IpAddr {
        let [hi, lo] = seed.to_be_bytes();

        IpAddr::V4(Ipv4Addr::new(10, 0, hi, lo))
    }

    #[must_use]
    pub fn schedule(seed: u16) -> ScheduleContext {
        ScheduleContext::after(
            format!("schedule-{seed}"),
            Duration::from_secs(60 * u64::from(seed)),
        )
    }

    /// A mock node builder with seed-derived name and address.
    #[must_use]
    pub fn node(seed: u16) -> MockNodeBuilder {
        MockNodeBuilder::new(Self::node_name(seed)).with_ip(Self::ip(seed))
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use nodectl::NodeBackend;

    #[test]
    fn fake_values_are_deterministic_and_unique() {
        assert_eq!(Fake::node_name(3), Fake::node_name(3));
        assert_ne!(Fake::ip(1), Fake::ip(2));
        assert_eq!(Fake::ip(258), IpAddr::V4(Ipv4Addr::new(10, 0, 1, 2)));
        assert_ne!(Fake::schedule(1), Fake::schedule(2));
    }

    #[test]
    fn fake_node_carries_seeded_identity() {
        let node = Fake::node(7).build();

        assert_eq!(node.name(), "node7");
        assert_eq!(node.ip_address(), Fake::ip(7));
    }
}
