//! Extract, aggregate and lay out in one cancellable unit of work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use thiserror::Error;

use crate::config::LayoutConfig;
use crate::extract::{ExtractError, Scope, extract_samples};
use crate::graph::{FlameGraph, FlameGraphError};
use crate::model::Trace;

/// How many samples are merged between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 4096;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extract: {0}")]
    Extract(#[from] ExtractError),
    #[error("aggregate: {0}")]
    Graph(#[from] FlameGraphError),
    #[error("cancelled")]
    Cancelled,
}

/// Shared flag an enclosing scheduler flips to abandon a build.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Build and seal the flame graph for `scope`.
///
/// All samples are collected before any is merged. On cancellation the
/// partial graph is dropped; callers never see a half-built tree.
pub fn build_flame_graph(
    trace: &Trace,
    scope: Scope,
    config: LayoutConfig,
    cancel: &CancelToken,
) -> Result<FlameGraph, PipelineError> {
    cancel.check()?;
    let samples = extract_samples(trace, scope)?;
    debug!("{scope:?}: {} samples to merge", samples.len());

    let mut graph = FlameGraph::with_config(config);
    for chunk in samples.chunks(CANCEL_CHECK_INTERVAL) {
        cancel.check()?;
        graph.add_samples(chunk)?;
    }
    cancel.check()?;
    graph.compute()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CpuSample, Processor, ProcessorSpan};
    use std::collections::HashMap;

    fn trace() -> Trace {
        Trace {
            processors: vec![Processor {
                id: 0,
                spans: vec![ProcessorSpan { start: 0, end: 200 }],
            }],
            cpu_samples: [(1, vec![CpuSample { timestamp: 0, stack: 1 }; 2])]
                .into_iter()
                .collect(),
            stacks: HashMap::from([(1, vec![0x1])]),
            functions: HashMap::from([(0x1, "main.main".into())]),
            ..Trace::default()
        }
    }

    #[test]
    fn builds_sealed_graph() {
        let graph = build_flame_graph(
            &trace(),
            Scope::Global,
            LayoutConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(graph.is_sealed());
        let snap = graph.snapshot().unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.entries()[0].width, 1.0);
        assert_eq!(snap.entries()[0].sample_count, 2);
    }

    #[test]
    fn cancelled_build_returns_nothing() {
        let cancel = CancelToken::new();
        cancel.clone().cancel();
        let err = build_flame_graph(&trace(), Scope::Global, LayoutConfig::default(), &cancel)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[test]
    fn extraction_errors_propagate() {
        let err = build_flame_graph(
            &trace(),
            Scope::Goroutine(9),
            LayoutConfig::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "extract: goroutine 9 is not in the trace");
    }
}
