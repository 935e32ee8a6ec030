//! # Trap Dispatch
//!
//! The supervisor-call ABI: a numeric syscall id, up to three integer
//! arguments, and a fourth slot reserved for `thread_create`'s fifth
//! parameter (period doesn't fit alongside entry/stack/prio/computation
//! in three words). Every syscall returns one `i32` — the C convention
//! of `-1` for failure, `>= 0` for success — which is exactly what
//! [`crate::error::KernelError::to_abi`] produces.
//!
//! `SyscallNumber` is exhaustive by construction, so `dispatch` has no
//! "unknown number" arm; the real boundary, where a raw integer arrives
//! from the trap assembly, is [`SyscallNumber::try_from`].

use crate::error::KernelError;
use crate::kernel::Kernel;

/// Up to three syscall arguments plus the one extra slot
/// `thread_create` needs for its period parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallArgs {
    pub a0: i32,
    pub a1: i32,
    pub a2: i32,
    pub a3: i32,
    /// `thread_create`'s fifth argument (period); unused by every other
    /// syscall.
    pub a4: i32,
}

/// The reserved syscall numbers, matching the original trap table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallNumber {
    Sbrk,
    Write,
    Read,
    Close,
    Fstat,
    Isatty,
    Lseek,
    Exit,
    ThrInit,
    ThrCreate,
    MutInit,
    MutLok,
    MutUlk,
    Wait,
    Time,
    SchdStart,
    Priority,
    SpinWait,
}

impl TryFrom<u32> for SyscallNumber {
    type Error = KernelError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        use SyscallNumber::*;
        Ok(match n {
            0 => Sbrk,
            1 => Write,
            2 => Read,
            3 => Close,
            4 => Fstat,
            5 => Isatty,
            6 => Lseek,
            7 => Exit,
            8 => ThrInit,
            9 => ThrCreate,
            10 => MutInit,
            11 => MutLok,
            12 => MutUlk,
            13 => Wait,
            14 => Time,
            15 => SchdStart,
            16 => Priority,
            17 => SpinWait,
            _ => return Err(KernelError::UnknownSyscall),
        })
    }
}

/// Dispatch one syscall against the live kernel. Blocking calls
/// (`Wait`, `MutLok`, `SpinWait`) busy-loop internally and only return
/// once satisfied — there is no separate "would block" result.
pub fn dispatch(kernel: &mut Kernel, number: SyscallNumber, args: SyscallArgs) -> i32 {
    use SyscallNumber::*;
    match number {
        Sbrk => crate::syscalls_io::sbrk(args.a0),
        Write => {
            let len = args.a1.max(0) as usize;
            let buf = unsafe { core::slice::from_raw_parts(args.a2 as *const u8, len) };
            crate::syscalls_io::write(kernel.console_mut(), args.a0, buf)
        }
        Read => {
            let len = args.a1.max(0) as usize;
            let buf = unsafe { core::slice::from_raw_parts_mut(args.a2 as *mut u8, len) };
            crate::syscalls_io::read(kernel.console_mut(), args.a0, buf)
        }
        Close => crate::syscalls_io::close(args.a0),
        Fstat => crate::syscalls_io::fstat(args.a0),
        Isatty => crate::syscalls_io::isatty(args.a0),
        Lseek => crate::syscalls_io::lseek(args.a0, args.a1, args.a2),
        Exit => {
            log::info!("task exited with status {}", args.a0);
            crate::hw::disable_interrupts();
            loop {
                core::hint::spin_loop();
            }
        }
        ThrInit => ok_or_abi(kernel.thread_init(args.a0 as u32, args.a1 as u32)),
        ThrCreate => ok_or_abi(kernel.thread_create(
            args.a0 as u32,
            args.a1 as u32,
            args.a2 as u8,
            args.a3 as u32,
            args.a4 as u32,
        )),
        MutInit => match kernel.mutex_init(args.a0 as u8) {
            Ok(id) => id as i32,
            Err(e) => e.to_abi(),
        },
        MutLok => {
            kernel.mutex_lock(args.a0 as usize);
            0
        }
        MutUlk => {
            kernel.mutex_unlock(args.a0 as usize);
            0
        }
        Wait => {
            kernel.wait_until_next_period();
            0
        }
        Time => kernel.get_time() as i32,
        SchdStart => ok_or_abi(kernel.scheduler_start()),
        Priority => kernel.get_priority() as i32,
        SpinWait => {
            kernel.spin_wait(args.a0.max(0) as u32);
            0
        }
    }
}

fn ok_or_abi(r: Result<(), KernelError>) -> i32 {
    match r {
        Ok(()) => 0,
        Err(e) => e.to_abi(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syscall_numbers_round_trip() {
        for n in 0u32..=17 {
            let sc = SyscallNumber::try_from(n).unwrap();
            assert_eq!(sc as u32, n);
        }
    }

    #[test]
    fn unknown_number_is_rejected() {
        assert_eq!(SyscallNumber::try_from(18), Err(KernelError::UnknownSyscall));
        assert_eq!(SyscallNumber::try_from(u32::MAX), Err(KernelError::UnknownSyscall));
    }
}
