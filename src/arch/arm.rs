//! # Hardware Port
//!
//! The board-specific half of the trap path: SysTick configuration,
//! the PendSV trigger, and the Rust-side save/restore against
//! [`TaskFrame`]. The actual exception-vector entry stub — the few
//! instructions that run before any Rust code, banking into the right
//! mode and pointing at the right stack — is vendor startup code and
//! isn't reproduced here; this module is what that stub calls into.
//!
//! ## Sequence per tick
//!
//! 1. Timer fires, vendor stub enters the trap, calls [`on_tick`].
//! 2. [`on_tick`] clears the pending bit, runs [`Kernel::tick`], and
//!    copies the outgoing task's live registers into its `TaskFrame`.
//! 3. The newly-selected task's `TaskFrame` is copied back out so the
//!    stub can restore it and return.

use cortex_m::peripheral::syst::SystClkSource;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::frame::{TaskFrame, FRAME_WORDS};
use crate::hw::Timer;
use crate::kernel::KERNEL_PTR;

/// SysTick as the `hw::Timer` the kernel ticks against.
pub struct SysTickTimer<'a>(pub &'a mut cortex_m::peripheral::SYST);

impl Timer for SysTickTimer<'_> {
    fn arm(&mut self, tick_hz: u32) {
        let reload = SYSTEM_CLOCK_HZ / tick_hz - 1;
        self.0.set_reload(reload);
        self.0.clear_current();
        self.0.set_clock_source(SystClkSource::Core);
        self.0.enable_counter();
        self.0.enable_interrupt();
    }

    fn clear_pending(&mut self) {
        const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
        unsafe { core::ptr::write_volatile(ICSR, 1 << 27) }; // PENDSTCLR
    }
}

/// Trigger PendSV so the context switch happens at the lowest
/// priority, after any higher-priority ISR has finished.
pub fn trigger_pendsv() {
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe { core::ptr::write_volatile(ICSR, 1 << 28) }; // PENDSVSET
}

/// Called from the vendor trap stub on every timer tick, with
/// `outgoing_words` pointing at the 20 words the stub captured for the
/// task it interrupted. Advances the kernel clock, runs the scheduler,
/// and returns the incoming task's frame as a flat word array for the
/// stub to restore.
///
/// # Safety
/// Must run with `KERNEL_PTR` already initialized by
/// `kernel::init` and with interrupts otherwise serialized (trap
/// context).
pub unsafe fn on_tick(outgoing_words: [u32; FRAME_WORDS]) -> [u32; FRAME_WORDS] {
    let kernel = &mut *KERNEL_PTR;
    let outgoing = kernel.current_priority_before_tick();
    kernel.save_frame(outgoing, TaskFrame::from_words(outgoing_words));
    kernel.tick();
    kernel.current_frame().as_words()
}

/// Called from the vendor SWI/SVC trap stub. `number` and `args` are
/// decoded by the stub from the instruction/registers; this just hands
/// them to [`crate::trap::dispatch`].
pub unsafe fn on_syscall(number: u32, args: crate::trap::SyscallArgs) -> i32 {
    let kernel = &mut *KERNEL_PTR;
    match crate::trap::SyscallNumber::try_from(number) {
        Ok(sc) => crate::trap::dispatch(kernel, sc, args),
        Err(e) => e.to_abi(),
    }
}
