//! Video generation: asynchronous tasks and the vendors built on them.

pub mod kling;
pub mod lifecycle;
pub mod task;

pub use kling::KlingVideoProvider;
pub use lifecycle::{PollPolicy, TaskManager};
pub use task::{GenerationTask, PollObservation, TaskHandle, TaskModality, TaskSnapshot, TaskStatus};
