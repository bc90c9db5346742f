use log::debug;
use traceflame_protocol::RootCategory;

use super::{ExtractError, resolve_stack};
use crate::model::{Goroutine, GoroutineState, Sample, Trace};

/// Category a span in `state` is filed under, or `None` for states that
/// tell nothing about where the goroutine was stuck.
///
/// The match is exhaustive on purpose: adding a state upstream must fail to
/// compile here instead of silently dropping its time.
pub fn root_category(state: GoroutineState) -> Option<RootCategory> {
    use GoroutineState::*;
    match state {
        Inactive | Active | GcIdle | GcDedicated | GcFractional | GcMarkAssist | GcSweep
        | Done => None,
        Blocked => Some(RootCategory::Blocked),
        BlockedSend => Some(RootCategory::Send),
        BlockedRecv => Some(RootCategory::Recv),
        BlockedSelect => Some(RootCategory::Select),
        BlockedSync => Some(RootCategory::Sync),
        BlockedSyncOnce => Some(RootCategory::SyncOnce),
        BlockedSyncTriggeringGc => Some(RootCategory::TriggeringGc),
        BlockedCond => Some(RootCategory::SyncCond),
        BlockedNet => Some(RootCategory::Io),
        BlockedGc => Some(RootCategory::Gc),
        BlockedSyscall => Some(RootCategory::BlockingSyscall),
        Stuck => Some(RootCategory::Stuck),
        Ready | Created => Some(RootCategory::Ready),
    }
}

/// One sample per interesting state span of `goroutine`.
///
/// Waiting to run has no call stack, so `ready` samples are frameless. All
/// other spans carry the stack of the event that started them, every frame
/// weighted with the span's wall-clock duration.
pub fn state_samples(trace: &Trace, goroutine: &Goroutine) -> Result<Vec<Sample>, ExtractError> {
    let mut samples = Vec::new();
    for span in &goroutine.spans {
        let Some(category) = root_category(span.state) else {
            continue;
        };
        let duration = span.duration();
        let stack = match span.stack {
            Some(id) if category.has_stack() => resolve_stack(trace, id)?,
            _ => Vec::new(),
        };
        samples.push(Sample::uniform(category.label(), duration, stack));
    }
    debug!(
        "goroutine {}: {} of {} spans produced samples",
        goroutine.id,
        samples.len(),
        goroutine.spans.len()
    );
    Ok(samples)
}
