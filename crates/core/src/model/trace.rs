use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use traceflame_protocol::Symbol;

/// Nanoseconds since the start of the trace.
pub type Timestamp = i64;
pub type GoroutineId = u64;
pub type StackId = u32;
pub type Pc = u64;

fn elapsed(start: Timestamp, end: Timestamp) -> Duration {
    // Malformed spans (end before start) count as empty.
    Duration::from_nanos(u64::try_from(end.saturating_sub(start)).unwrap_or(0))
}

/// Execution state of a goroutine during one span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoroutineState {
    Inactive,
    Active,
    GcIdle,
    GcDedicated,
    GcFractional,
    Blocked,
    BlockedSend,
    BlockedRecv,
    BlockedSelect,
    BlockedSync,
    BlockedSyncOnce,
    BlockedSyncTriggeringGc,
    BlockedCond,
    BlockedNet,
    BlockedGc,
    BlockedSyscall,
    Stuck,
    Ready,
    Created,
    Done,
    GcMarkAssist,
    GcSweep,
}

impl GoroutineState {
    /// Decode the numeric state code used by trace decoders.
    pub fn from_code(code: u8) -> Option<Self> {
        use GoroutineState::*;
        Some(match code {
            0 => Inactive,
            1 => Active,
            2 => GcIdle,
            3 => GcDedicated,
            4 => GcFractional,
            5 => Blocked,
            6 => BlockedSend,
            7 => BlockedRecv,
            8 => BlockedSelect,
            9 => BlockedSync,
            10 => BlockedSyncOnce,
            11 => BlockedSyncTriggeringGc,
            12 => BlockedCond,
            13 => BlockedNet,
            14 => BlockedGc,
            15 => BlockedSyscall,
            16 => Stuck,
            17 => Ready,
            18 => Created,
            19 => Done,
            20 => GcMarkAssist,
            21 => GcSweep,
            _ => return None,
        })
    }

    /// Like [`GoroutineState::from_code`], for callers that have already
    /// validated the trace.
    ///
    /// # Panics
    ///
    /// On a code outside the known set. A decoder producing one means a
    /// state was added upstream and must be given a flame graph category
    /// here, so this is never papered over.
    #[allow(clippy::panic)]
    pub fn from_code_or_panic(code: u8) -> Self {
        match Self::from_code(code) {
            Some(state) => state,
            None => panic!("unhandled goroutine state {code}"),
        }
    }
}

/// A stretch of time a processor spent running goroutines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSpan {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ProcessorSpan {
    pub fn duration(&self) -> Duration {
        elapsed(self.start, self.end)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Processor {
    pub id: u32,
    pub spans: Vec<ProcessorSpan>,
}

/// A stretch of time a goroutine spent in a single state, with the stack
/// of the event that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSpan {
    pub start: Timestamp,
    pub end: Timestamp,
    pub state: GoroutineState,
    pub stack: Option<StackId>,
}

impl StateSpan {
    pub fn duration(&self) -> Duration {
        elapsed(self.start, self.end)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Goroutine {
    pub id: GoroutineId,
    pub spans: Vec<StateSpan>,
}

/// One tick of the CPU sampling profiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSample {
    pub timestamp: Timestamp,
    pub stack: StackId,
}

/// The slice of a decoded execution trace the flame graph needs.
///
/// Stacks are stored innermost frame first, as the runtime records them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    pub processors: Vec<Processor>,
    pub goroutines: Vec<Goroutine>,
    /// CPU samples keyed by the goroutine that was running.
    pub cpu_samples: BTreeMap<GoroutineId, Vec<CpuSample>>,
    pub stacks: HashMap<StackId, Vec<Pc>>,
    /// Function name for each program counter.
    pub functions: HashMap<Pc, Symbol>,
}

impl Trace {
    pub fn goroutine(&self, id: GoroutineId) -> Option<&Goroutine> {
        self.goroutines.iter().find(|g| g.id == id)
    }

    /// Total time any processor was busy.
    pub fn active_time(&self) -> Duration {
        self.processors
            .iter()
            .flat_map(|p| &p.spans)
            .map(ProcessorSpan::duration)
            .sum()
    }

    pub fn total_cpu_samples(&self) -> usize {
        self.cpu_samples.values().map(Vec::len).sum()
    }
}
