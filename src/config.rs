//! # Kernel Configuration
//!
//! Compile-time constants governing the scheduler, PCP layer, and board
//! timing. All limits are fixed at compile time — no dynamic allocation.

/// Number of priority levels, and therefore the size of the TCB pool.
/// Priority is the TCB's index, so this also bounds `Priority`.
pub const MAX_PRIORITY: usize = 32;

/// Priority reserved for the idle task. Always runnable, never
/// removed from the runnable bitset by the scheduler's accounting.
pub const IDLE_PRIORITY: u8 = 31;

/// Timer tick frequency in Hz. One tick is one millisecond of the
/// kernel's time domain (`wakeup`, `computation`, `period`, ...).
pub const TICK_HZ: u32 = 1000;

/// Per-task supervisor stack size, in 32-bit words. The trap assembly
/// and `init_task_stack` lay the initial register frame out at the top
/// of this region.
pub const STACK_WORDS: usize = 256;

/// Maximum number of mutexes `mutex_init` can register. Mutexes are
/// created before `scheduler_start` and never destroyed.
pub const MAX_MUTEXES: usize = 32;

/// System clock frequency in Hz, used to derive the SysTick reload
/// value for `TICK_HZ`. Set per board; default matches a common
/// Cortex-M4 HSI/HSE configuration.
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
