//! # Kernel Errors
//!
//! Every fallible kernel entry point returns `Result<T, KernelError>`
//! instead of the raw `-1` of the trap ABI. `trap::dispatch` is the one
//! place that flattens a `KernelError` back down to a machine word.

/// Reasons a kernel call can fail. No variant is retried by the kernel
/// itself — a faulting task's own budget accounting (§4.3) is the only
/// mechanism that tolerates misbehaving task code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// `thread_init`/`thread_create` received a null entry point or
    /// stack pointer.
    NullEntry,
    /// A requested priority fell outside `0..MAX_PRIORITY`.
    InvalidPriority,
    /// `thread_create` targeted a priority slot that is already active.
    PriorityTaken,
    /// `mutex_init` was called after the registry reached `MAX_MUTEXES`.
    MutexRegistryFull,
    /// `scheduler_start` rejected the task set: `U > B(N)`.
    Unschedulable,
    /// The trap layer received a syscall number outside the reserved
    /// table.
    UnknownSyscall,
}

impl KernelError {
    /// Flatten to the ABI's single negative return convention.
    pub const fn to_abi(self) -> i32 {
        -1
    }
}
