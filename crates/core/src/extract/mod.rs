//! Sample extraction: turns CPU sampling ticks and goroutine state spans
//! into the uniform [`Sample`] stream the flame graph consumes.
//!
//! Extraction is a read-only pass over the trace, so it can be fanned out
//! across threads. Merging into a [`FlameGraph`](crate::graph::FlameGraph)
//! is not, and happens afterwards on a single thread.

pub mod cpu_samples;
pub mod state_spans;

use std::num::NonZeroUsize;
use std::thread;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use traceflame_protocol::Symbol;

use crate::model::{CpuSample, GoroutineId, Pc, Sample, StackId, Trace};

pub use cpu_samples::sample_interval;
pub use state_spans::root_category;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("stack {0} is not in the trace")]
    UnknownStack(StackId),
    #[error("stack {stack} references unknown pc {pc:#x}")]
    UnknownPc { stack: StackId, pc: Pc },
    #[error("goroutine {0} is not in the trace")]
    UnknownGoroutine(GoroutineId),
}

/// Which part of the trace a flame graph covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// CPU samples of every goroutine.
    Global,
    /// CPU samples and state spans of one goroutine.
    Goroutine(GoroutineId),
}

/// Resolve a stack to function names, outermost frame first.
pub(crate) fn resolve_stack(trace: &Trace, id: StackId) -> Result<Vec<Symbol>, ExtractError> {
    let pcs = trace.stacks.get(&id).ok_or(ExtractError::UnknownStack(id))?;
    // Recorded innermost first.
    pcs.iter()
        .rev()
        .map(|pc| {
            trace
                .functions
                .get(pc)
                .cloned()
                .ok_or(ExtractError::UnknownPc { stack: id, pc: *pc })
        })
        .collect()
}

/// Extract every sample for `scope`.
pub fn extract_samples(trace: &Trace, scope: Scope) -> Result<Vec<Sample>, ExtractError> {
    let Some(interval) = sample_interval(trace) else {
        debug!("trace has no CPU samples");
        return match scope {
            Scope::Global => Ok(Vec::new()),
            Scope::Goroutine(id) => {
                let g = trace
                    .goroutine(id)
                    .ok_or(ExtractError::UnknownGoroutine(id))?;
                state_spans::state_samples(trace, g)
            }
        };
    };

    match scope {
        Scope::Global => {
            let mut samples = Vec::with_capacity(trace.total_cpu_samples());
            for ticks in trace.cpu_samples.values() {
                samples.extend(cpu_samples::cpu_samples(trace, ticks, interval)?);
            }
            Ok(samples)
        }
        Scope::Goroutine(id) => {
            let g = trace
                .goroutine(id)
                .ok_or(ExtractError::UnknownGoroutine(id))?;
            let ticks = trace.cpu_samples.get(&id).map_or(&[][..], Vec::as_slice);
            let mut samples = cpu_samples::cpu_samples(trace, ticks, interval)?;
            samples.extend(state_spans::state_samples(trace, g)?);
            Ok(samples)
        }
    }
}

/// Like `extract_samples(trace, Scope::Global)`, with goroutines split over
/// up to `workers` scoped threads. Output order matches the sequential
/// version.
pub fn extract_samples_parallel(
    trace: &Trace,
    workers: NonZeroUsize,
) -> Result<Vec<Sample>, ExtractError> {
    let Some(interval) = sample_interval(trace) else {
        return Ok(Vec::new());
    };
    let slices: Vec<&[CpuSample]> = trace.cpu_samples.values().map(Vec::as_slice).collect();
    if slices.is_empty() {
        return Ok(Vec::new());
    }
    let chunk = slices.len().div_ceil(workers.get());

    let results: Vec<Result<Vec<Sample>, ExtractError>> = thread::scope(|s| {
        let handles: Vec<_> = slices
            .chunks(chunk)
            .map(|group| {
                s.spawn(move || -> Result<Vec<Sample>, ExtractError> {
                    let mut out = Vec::new();
                    for ticks in group {
                        out.extend(cpu_samples::cpu_samples(trace, ticks, interval)?);
                    }
                    Ok(out)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    let mut samples = Vec::with_capacity(trace.total_cpu_samples());
    for result in results {
        samples.extend(result?);
    }
    debug!(
        "extracted {} samples on {} threads",
        samples.len(),
        slices.len().div_ceil(chunk)
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Goroutine, GoroutineState, Processor, ProcessorSpan, StateSpan};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::time::Duration;

    fn trace() -> Trace {
        Trace {
            processors: vec![Processor {
                id: 0,
                spans: vec![ProcessorSpan { start: 0, end: 4_000 }],
            }],
            goroutines: vec![Goroutine {
                id: 1,
                spans: vec![StateSpan {
                    start: 0,
                    end: 500,
                    state: GoroutineState::BlockedRecv,
                    stack: Some(2),
                }],
            }],
            cpu_samples: (1..=4)
                .map(|g| (g, vec![CpuSample { timestamp: 0, stack: 1 }]))
                .collect(),
            stacks: HashMap::from([(1, vec![0xb, 0xa]), (2, vec![0xc, 0xa])]),
            functions: HashMap::from([
                (0xa, "main.main".into()),
                (0xb, "main.spin".into()),
                (0xc, "runtime.chanrecv1".into()),
            ]),
        }
    }

    #[test]
    fn global_scope_has_only_cpu_samples() {
        let samples = extract_samples(&trace(), Scope::Global).unwrap();
        assert_eq!(samples.len(), 4);
        assert!(samples.iter().all(|s| s.category == "Running"));
        assert!(samples.iter().all(|s| s.duration == Duration::from_nanos(1_000)));
    }

    #[test]
    fn goroutine_scope_adds_state_spans() {
        let samples = extract_samples(&trace(), Scope::Goroutine(1)).unwrap();
        let categories: Vec<_> = samples.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(categories, ["Running", "recv"]);
        assert_eq!(samples[1].duration, Duration::from_nanos(500));
    }

    #[test]
    fn unknown_goroutine_is_an_error() {
        let err = extract_samples(&trace(), Scope::Goroutine(42)).unwrap_err();
        assert!(matches!(err, ExtractError::UnknownGoroutine(42)));
    }

    #[test]
    fn goroutine_scope_without_cpu_samples_still_has_spans() {
        let mut t = trace();
        t.cpu_samples.clear();
        let samples = extract_samples(&t, Scope::Goroutine(1)).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].category, "recv");
    }

    #[test]
    fn unknown_pc_names_the_stack() {
        let mut t = trace();
        t.functions.remove(&0xb);
        let err = extract_samples(&t, Scope::Global).unwrap_err();
        assert_eq!(err.to_string(), "stack 1 references unknown pc 0xb");
    }

    #[test]
    fn parallel_matches_sequential() {
        let t = trace();
        let sequential = extract_samples(&t, Scope::Global).unwrap();
        for workers in [1, 2, 3, 8] {
            let parallel =
                extract_samples_parallel(&t, NonZeroUsize::new(workers).unwrap()).unwrap();
            assert_eq!(parallel, sequential);
        }
    }
}
