use std::time::Duration;

use log::{debug, warn};
use traceflame_protocol::RootCategory;

use super::{ExtractError, resolve_stack};
use crate::model::{CpuSample, Sample, Trace};

/// Approximate time between two sampling ticks: busy processor time divided
/// by the number of samples in the whole trace, rounded to the nanosecond.
///
/// Samples are taken per thread, not per goroutine, so the same global
/// average is used for every goroutine's flame graph. That keeps bars
/// comparable between goroutines. Returns `None` when the trace has no
/// samples.
pub fn sample_interval(trace: &Trace) -> Option<Duration> {
    let samples = trace.total_cpu_samples() as u128;
    if samples == 0 {
        return None;
    }
    let busy = trace.active_time().as_nanos();
    let nanos = (busy + samples / 2) / samples;
    let interval = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));
    if interval.is_zero() {
        warn!("{samples} CPU samples but no processor time; samples will have no weight");
    }
    Some(interval)
}

/// Turn sampled stacks into `Running` samples, one per tick, every frame
/// weighted with `interval`.
pub fn cpu_samples(
    trace: &Trace,
    ticks: &[CpuSample],
    interval: Duration,
) -> Result<Vec<Sample>, ExtractError> {
    let mut samples = Vec::with_capacity(ticks.len());
    for tick in ticks {
        let stack = resolve_stack(trace, tick.stack)?;
        samples.push(Sample::uniform(
            RootCategory::Running.label(),
            interval,
            stack,
        ));
    }
    debug!("extracted {} CPU samples at {interval:?}", samples.len());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Processor, ProcessorSpan};
    use std::collections::HashMap;

    fn trace() -> Trace {
        Trace {
            processors: vec![Processor {
                id: 0,
                spans: vec![ProcessorSpan { start: 0, end: 1_000 }],
            }],
            cpu_samples: [
                (1, vec![CpuSample { timestamp: 10, stack: 1 }]),
                (
                    2,
                    vec![
                        CpuSample { timestamp: 20, stack: 1 },
                        CpuSample { timestamp: 30, stack: 2 },
                    ],
                ),
            ]
            .into_iter()
            .collect(),
            // Innermost first.
            stacks: HashMap::from([(1, vec![0x30, 0x20, 0x10]), (2, vec![0x10])]),
            functions: HashMap::from([
                (0x10, "main.main".into()),
                (0x20, "main.work".into()),
                (0x30, "runtime.memmove".into()),
            ]),
            ..Trace::default()
        }
    }

    #[test]
    fn interval_is_global_average() {
        // 1000ns over 3 samples, rounded.
        assert_eq!(sample_interval(&trace()), Some(Duration::from_nanos(333)));
    }

    #[test]
    fn interval_rounds_half_up() {
        let mut t = trace();
        t.processors[0].spans[0].end = 1_001;
        t.cpu_samples.remove(&1);
        // 1001 / 2 = 500.5
        assert_eq!(sample_interval(&t), Some(Duration::from_nanos(501)));
    }

    #[test]
    fn no_samples_means_no_interval() {
        let mut t = trace();
        t.cpu_samples.clear();
        assert_eq!(sample_interval(&t), None);
    }

    #[test]
    fn stacks_are_reversed_to_outermost_first() {
        let t = trace();
        let d = Duration::from_nanos(333);
        let samples = cpu_samples(&t, &t.cpu_samples[&1], d).unwrap();
        assert_eq!(samples.len(), 1);
        let names: Vec<_> = samples[0].frames.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["main.main", "main.work", "runtime.memmove"]);
        assert_eq!(samples[0].category, "Running");
        assert_eq!(samples[0].duration, d);
        assert!(samples[0].frames.iter().all(|f| f.duration == d));
    }

    #[test]
    fn missing_stack_is_an_error() {
        let t = trace();
        let ticks = [CpuSample { timestamp: 0, stack: 99 }];
        let err = cpu_samples(&t, &ticks, Duration::ZERO).unwrap_err();
        assert!(matches!(err, ExtractError::UnknownStack(99)));
    }
}
