//! # Architecture Abstraction Layer
//!
//! Provides a hardware abstraction boundary for the scheduler.
//! Currently implements the reference board's classic ARM IRQ/SVC/USER
//! trap port; extensible to other architectures by adding sibling
//! modules.

pub mod arm;
