//! # Hardware Collaborator Boundary
//!
//! The scheduler and PCP layer never touch a register directly; they
//! go through the two seams this module defines. Keeping the seam
//! narrow is what lets the rest of the crate build and test on the
//! host: `cfg(test)` swaps in a plain `AtomicBool` critical section and
//! a no-op timer, while a real board wires `cortex_m::interrupt` and
//! its own timer peripheral behind the same names.
//!
//! Exact MMIO layout, the interrupt controller, and vector table
//! installation are board-specific and out of scope here — this module
//! only draws the line the core schedules against.

/// A periodic interrupt source driving the scheduler tick. `arm` wires
/// it up; `clear_pending` acks the interrupt so it doesn't immediately
/// re-fire.
pub trait Timer {
    fn arm(&mut self, tick_hz: u32);
    fn clear_pending(&mut self);
}

/// Disable interrupts. Pairs with [`enable_interrupts`]; callers are
/// responsible for restoring the prior state — this is an on/off pair,
/// not a nesting-safe mask save/restore, matching the trap ABI's own
/// `disable_interrupts`/`enable_interrupts` pair rather than a
/// closure-scoped critical section.
#[cfg(not(test))]
pub fn disable_interrupts() {
    cortex_m::interrupt::disable();
}

#[cfg(not(test))]
pub fn enable_interrupts() {
    unsafe { cortex_m::interrupt::enable() };
}

#[cfg(test)]
pub fn disable_interrupts() {
    HOST_INTERRUPTS_ENABLED.store(false, core::sync::atomic::Ordering::SeqCst);
}

#[cfg(test)]
pub fn enable_interrupts() {
    HOST_INTERRUPTS_ENABLED.store(true, core::sync::atomic::Ordering::SeqCst);
}

#[cfg(test)]
static HOST_INTERRUPTS_ENABLED: core::sync::atomic::AtomicBool =
    core::sync::atomic::AtomicBool::new(true);

#[cfg(test)]
pub fn interrupts_enabled() -> bool {
    HOST_INTERRUPTS_ENABLED.load(core::sync::atomic::Ordering::SeqCst)
}

/// Run `f` with interrupts disabled, restoring them afterward
/// regardless of how `f` returns. The one place in the crate that
/// should reach for a closure instead of the raw pair above — mutex
/// lock/unlock and scheduler ISR entry use it to keep critical
/// sections visually bounded.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    disable_interrupts();
    let r = f();
    enable_interrupts();
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_section_restores_interrupts_on_return() {
        assert!(interrupts_enabled());
        let v = critical_section(|| {
            assert!(!interrupts_enabled());
            42
        });
        assert_eq!(v, 42);
        assert!(interrupts_enabled());
    }
}
