//! # ccos — a fixed-priority PCP real-time kernel core
//!
//! The scheduling and synchronization core of a small real-time kernel
//! for a single-core ARM Cortex-M class board: a fixed set of periodic
//! user-mode tasks, preempted by a 1 kHz timer interrupt, synchronized
//! through mutexes under the Priority Ceiling Protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                Trap Dispatch (trap.rs)                  │
//! │   numeric syscall id + args → Kernel method → i32 ABI   │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │    PCP Mutexes     │  Kernel Façade    │
//! │  scheduler.rs│    pcp.rs          │  kernel.rs        │
//! │  ─ tick()    │    ─ mutex_init    │  ─ thread_init    │
//! │  ─ schedule()│    ─ mutex_lock    │  ─ thread_create  │
//! │              │    ─ mutex_unlock  │  ─ scheduler_start│
//! ├──────────────┴────────────────────┴───────────────────┤
//! │       Task Model (tcb.rs) · Frame (frame.rs)            │
//! │    Tcb · Priority · TaskStatus · TaskFrame              │
//! ├────────────────────────────────────────────────────────┤
//! │            Hardware Port (hw.rs, arch/arm.rs)           │
//! │    Timer · disable/enable_interrupts · context switch   │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! Priority is a task's index into the 32-slot TCB pool (0 most
//! urgent, 31 reserved for the always-runnable idle task), so selection
//! is a branch-free scan of a bitset rather than a sort or a heap. A
//! task set is accepted at `scheduler_start` only if it clears the
//! rate-monotonic least-upper-bound (`schedulability.rs`), checked in
//! fixed point so the kernel never touches FPU state.
//!
//! ## Memory model
//!
//! - No heap, no `alloc` — every pool (`[Tcb; 32]`, the mutex registry)
//!   is a fixed-size array sized at compile time.
//! - Per-task stack: `[u32; STACK_WORDS]` inline in its `Tcb`.
//! - Shared state is accessed only inside `hw::critical_section`.

#![cfg_attr(not(test), no_std)]

pub mod bitset;
pub mod config;
pub mod error;
pub mod frame;
pub mod hw;
pub mod kernel;
pub mod pcp;
pub mod schedulability;
pub mod scheduler;
pub mod syscalls_io;
pub mod tcb;
pub mod trap;

#[cfg(target_arch = "arm")]
pub mod arch;

/// Installs `env_logger` once per test binary so `log::error!`/`info!`
/// calls inside kernel code (e.g. the `scheduler_start` rejection path)
/// show up under `cargo test -- --nocapture`. Safe to call from every
/// test; `try_init` ignores the "already initialized" error.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::try_init();
}
