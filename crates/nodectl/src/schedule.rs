use derive_more::Display;
use std::time::Duration;

///
/// ScheduleWhen
/// When a deferred batch should fire on the node.
///

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum ScheduleWhen {
    /// A calendar expression understood by the node's timer facility.
    #[display("calendar {_0}")]
    Calendar(String),

    /// A delay relative to when the batch is installed.
    #[display("after {}s", _0.as_secs())]
    After(Duration),
}

///
/// ScheduleContext
///
/// Deferred-execution sink. While a context is attached to a `NodeControl`,
/// backends record commands under `id` instead of running them.
///

#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display("schedule '{id}' ({when})")]
pub struct ScheduleContext {
    id: String,
    when: ScheduleWhen,
}

impl ScheduleContext {
    pub fn new(id: impl Into<String>, when: ScheduleWhen) -> Self {
        Self {
            id: id.into(),
            when,
        }
    }

    pub fn calendar(id: impl Into<String>, spec: impl Into<String>) -> Self {
        Self::new(id, ScheduleWhen::Calendar(spec.into()))
    }

    pub fn after(id: impl Into<String>, delay: Duration) -> Self {
        Self::new(id, ScheduleWhen::After(delay))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn when(&self) -> &ScheduleWhen {
        &self.when
    }
}

///
/// TESTS
///
