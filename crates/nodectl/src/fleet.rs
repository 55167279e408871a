use crate::{
    control::NodeControl,
    error::NodeControlError,
    log,
    log::Topic,
    readiness::{CancelToken, ReadinessPolicy},
    schedule::ScheduleContext,
};
use std::thread;

///
/// Fleet
///
/// One [`NodeControl`] per node. Fan-out helpers run the per-node work on
/// scoped threads and return results in node order.
///

#[derive(Clone, Debug, Default)]
pub struct Fleet<'a> {
    nodes: Vec<NodeControl<'a>>,
}

impl<'a> Fleet<'a> {
    #[must_use]
    pub const fn new(nodes: Vec<NodeControl<'a>>) -> Self {
        Self { nodes }
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeControl<'a>] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attach (or detach) the same schedule on every node.
    #[must_use]
    pub fn with_schedule(self, schedule: Option<&'a ScheduleContext>) -> Self {
        Self {
            nodes: self
                .nodes
                .into_iter()
                .map(|node| node.with_schedule(schedule))
                .collect(),
        }
    }

    /// Run `f` against every node concurrently.
    pub fn for_each<T, F>(&self, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(&NodeControl<'a>) -> T + Sync,
    {
        let f = &f;

        thread::scope(|scope| {
            let handles: Vec<_> = self
                .nodes
                .iter()
                .map(|node| scope.spawn(move || f(node)))
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(value) => value,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    /// Wait for every node to come up. All nodes are waited on even if some
    /// fail; the first failure in node order is returned.
    pub fn wait_all_up(
        &self,
        policy: &ReadinessPolicy,
        cancel: &CancelToken,
    ) -> Result<(), NodeControlError> {
        log!(Topic::Fleet, Info, "waiting for {} nodes", self.nodes.len());

        self.for_each(|node| node.wait_node_up_with(policy, cancel))
            .into_iter()
            .collect()
    }
}
