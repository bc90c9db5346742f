pub mod sample;
pub mod trace;

pub use sample::{Sample, SampleFrame};
pub use trace::{
    CpuSample, Goroutine, GoroutineId, GoroutineState, Pc, Processor, ProcessorSpan, StackId,
    StateSpan, Timestamp, Trace,
};
