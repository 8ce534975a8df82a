// src/task/mod.rs

//! Schedulable units of work: single batch tasks and parallel fan-out groups.

pub mod group;
pub mod lifecycle;
pub mod spec;

pub use group::ParallelTaskGroup;
pub use lifecycle::{Task, TaskState};
pub use spec::{Memory, TaskSpec};
