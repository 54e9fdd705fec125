#![doc = include_str!("../README.md")]

pub mod container;
pub mod controller;
pub mod queue;

pub use container::ModelContainer;
pub use controller::{ModelController, ProcessSummary};
pub use queue::ActionQueue;
