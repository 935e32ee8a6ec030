//! # Kernel
//!
//! Top-level state and the public API surface: task/mutex creation,
//! `scheduler_start`, and the voluntary primitives. [`crate::trap`] is
//! the only caller in a real boot — everything here is plain
//! `Result`-returning Rust; flattening to the trap ABI's raw `i32`
//! happens one layer up.
//!
//! ## Startup sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()            ← zero global state
//!         ├─► Kernel::thread_init(...)  ← install idle task
//!         ├─► Kernel::thread_create(...) ← register periodic tasks (×N)
//!         └─► Kernel::scheduler_start()  ← validate, arm timer, never returns
//! ```

use crate::error::KernelError;
use crate::frame::TaskFrame;
use crate::hw;
use crate::pcp::{MutexId, PcpRegistry};
use crate::scheduler::Scheduler;
use crate::schedulability;
use crate::syscalls_io::ConsolePort;
use crate::tcb::{Priority, TaskStatus};

/// A console that discards writes and never has input ready. Stands in
/// for the real UART port a board would wire up — see
/// [`crate::syscalls_io`] for why the core doesn't go further than
/// this.
struct NullConsole;

impl ConsolePort for NullConsole {
    fn write_byte(&mut self, _byte: u8) {}
    fn read_byte(&mut self) -> Option<u8> {
        None
    }
}

/// Everything the running system needs: the TCB pool and bitsets (via
/// [`Scheduler`]), the mutex registry, and the console stub syscalls
/// dispatch through.
pub struct Kernel {
    scheduler: Scheduler,
    pcp: PcpRegistry,
    console: NullConsole,
}

impl Kernel {
    pub const fn new() -> Self {
        Self {
            scheduler: Scheduler::new(),
            pcp: PcpRegistry::new(),
            console: NullConsole,
        }
    }

    /// Install the idle task at priority 31. Must be called before any
    /// `thread_create`.
    pub fn thread_init(&mut self, idle_fn: u32, idle_stack_top: u32) -> Result<(), KernelError> {
        if idle_fn == 0 || idle_stack_top == 0 {
            return Err(KernelError::NullEntry);
        }
        hw::critical_section(|| self.scheduler.init_idle(idle_fn, idle_stack_top));
        Ok(())
    }

    /// Register a periodic task. Fails if the priority slot is already
    /// active (see DESIGN.md) or out of range.
    pub fn thread_create(
        &mut self,
        entry: u32,
        stack_top: u32,
        prio: u8,
        computation: u32,
        period: u32,
    ) -> Result<(), KernelError> {
        if entry == 0 || stack_top == 0 {
            return Err(KernelError::NullEntry);
        }
        let p = Priority::new(prio)?;
        hw::critical_section(|| {
            self.scheduler
                .create_task(p, entry, stack_top, computation, period)
        })
    }

    /// Register a mutex with the given priority ceiling, returning its
    /// handle index for the `mutex_lock`/`mutex_unlock` syscalls.
    pub fn mutex_init(&mut self, ceiling: u8) -> Result<usize, KernelError> {
        let c = Priority::new(ceiling)?;
        hw::critical_section(|| self.pcp.init(c)).map(MutexId::raw)
    }

    /// Spin until the PCP gate admits the calling task, then acquire.
    /// The held-check and the gated acquire attempt are two separate
    /// critical sections rather than one, so interrupts aren't
    /// disabled across the whole spin.
    pub fn mutex_lock(&mut self, id: usize) {
        let mid = MutexId::from_raw(id);
        loop {
            if !self.pcp.is_held(mid) {
                let acquired = hw::critical_section(|| {
                    let caller = self.scheduler.current();
                    self.pcp.try_acquire(mid, caller)
                });
                if acquired {
                    return;
                }
            }
            core::hint::spin_loop();
        }
    }

    /// Release a held mutex and reset the caller's effective priority
    /// back to its base (`curr_priority` is diagnostic only — see
    /// DESIGN.md for why the gate itself never reads it).
    pub fn mutex_unlock(&mut self, id: usize) {
        let mid = MutexId::from_raw(id);
        hw::critical_section(|| {
            self.pcp.release(mid);
            let cur = self.scheduler.current();
            let base = self.scheduler.tcb(cur).priority;
            self.scheduler.tcb_mut(cur).curr_priority = base;
        });
    }

    /// Mark the caller WAITING and reselect, then busy-wait until the
    /// timer tick's wake scan moves it back out of WAITING. Relies on
    /// the timer interrupt advancing the tick clock concurrently —
    /// nothing else drives `status` off WAITING.
    pub fn wait_until_next_period(&mut self) {
        let who = hw::critical_section(|| {
            let who = self.scheduler.sleep_current_until_next_period();
            self.scheduler.schedule(&self.pcp);
            who
        });
        while self.scheduler.tcb(who).status == TaskStatus::Waiting {
            core::hint::spin_loop();
        }
    }

    /// Busy-wait until the caller's own `sleep` field — ticks consumed
    /// while the caller itself was RUNNING — reaches `ms`. Unlike the
    /// global tick clock, `sleep` excludes time spent running other
    /// tasks, so this measures the caller's own CPU time rather than
    /// wall-clock time.
    pub fn spin_wait(&mut self, ms: u32) {
        let who = self.scheduler.current();
        self.scheduler.tcb_mut(who).sleep = 0;
        while self.scheduler.tcb(who).sleep < ms {
            core::hint::spin_loop();
        }
    }

    pub fn get_priority(&self) -> u8 {
        self.scheduler.current().get()
    }

    pub fn get_time(&self) -> u32 {
        self.scheduler.time()
    }

    pub fn console_mut(&mut self) -> &mut dyn ConsolePort {
        &mut self.console
    }

    /// One millisecond tick: accounting, wake scan, then reselect.
    /// Called from the timer ISR.
    pub fn tick(&mut self) {
        self.scheduler.tick();
        self.scheduler.schedule(&self.pcp);
    }

    /// The priority that was current *before* this tick's reselection
    /// — the task the trap stub just interrupted and whose live
    /// registers it captured.
    pub fn current_priority_before_tick(&self) -> Priority {
        self.scheduler.current()
    }

    /// Record a task's captured register frame. Called by the arch
    /// port immediately after entry, before `tick()` can reselect.
    pub fn save_frame(&mut self, who: Priority, frame: TaskFrame) {
        self.scheduler.tcb_mut(who).regs = frame;
    }

    /// The frame of whichever task is current right now — read by the
    /// arch port after `tick()`/`schedule()` to hand back to the trap
    /// stub for restore.
    pub fn current_frame(&self) -> TaskFrame {
        self.scheduler.current_tcb().regs
    }

    fn validate_schedulable(&self) -> Result<(), KernelError> {
        let n = self.scheduler.active_task_count();
        let u = schedulability::utilization_permille(self.scheduler.utilization_input());
        if schedulability::is_schedulable(n, u) {
            Ok(())
        } else {
            Err(KernelError::Unschedulable)
        }
    }

    /// Validate the task set, select the first task, and arm the
    /// timer. Host builds return the validation result instead of
    /// diverging, so the rejection path is directly testable.
    #[cfg(test)]
    pub fn scheduler_start(&mut self) -> Result<(), KernelError> {
        self.validate_schedulable()?;
        self.scheduler.schedule(&self.pcp);
        Ok(())
    }

    /// Validate the task set, select the first task, arm the timer,
    /// and enable interrupts. Never returns.
    #[cfg(not(test))]
    pub fn scheduler_start(&mut self) -> ! {
        if self.validate_schedulable().is_err() {
            log::error!("task set fails the rate-monotonic bound; refusing to start");
            loop {
                core::hint::spin_loop();
            }
        }
        self.scheduler.schedule(&self.pcp);
        hw::enable_interrupts();
        loop {
            core::hint::spin_loop();
        }
    }
}

/// Global kernel instance, mirroring the teacher's single-scheduler
/// singleton. Accessed from ISR context only after `init()`.
static mut KERNEL: Kernel = Kernel::new();

/// Raw pointer to the global kernel, for the trap assembly and ISR
/// handlers that cannot hold a borrow across an exception boundary.
///
/// # Safety
/// Set once by `init()` before interrupts are enabled; read only from
/// the trap/ISR path afterward.
#[no_mangle]
pub static mut KERNEL_PTR: *mut Kernel = core::ptr::null_mut();

/// Zero the global kernel state. Must run before `thread_init`.
pub fn init() {
    unsafe {
        KERNEL = Kernel::new();
        KERNEL_PTR = core::ptr::addr_of_mut!(KERNEL);
    }
}

// ---------------------------------------------------------------------------
// Free-function façade over the global kernel — what task code and the
// trap path actually call. Each one forwards to the single `Kernel`
// instance behind `KERNEL_PTR`.
// ---------------------------------------------------------------------------

/// # Safety
/// `init()` must have run first.
pub fn thread_init(idle_fn: u32, idle_stack_top: u32) -> Result<(), KernelError> {
    unsafe { (*KERNEL_PTR).thread_init(idle_fn, idle_stack_top) }
}

pub fn thread_create(
    entry: u32,
    stack_top: u32,
    prio: u8,
    computation: u32,
    period: u32,
) -> Result<(), KernelError> {
    unsafe { (*KERNEL_PTR).thread_create(entry, stack_top, prio, computation, period) }
}

pub fn mutex_init(ceiling: u8) -> Result<usize, KernelError> {
    unsafe { (*KERNEL_PTR).mutex_init(ceiling) }
}

pub fn mutex_lock(id: usize) {
    unsafe { (*KERNEL_PTR).mutex_lock(id) }
}

pub fn mutex_unlock(id: usize) {
    unsafe { (*KERNEL_PTR).mutex_unlock(id) }
}

pub fn wait_until_next_period() {
    unsafe { (*KERNEL_PTR).wait_until_next_period() }
}

pub fn spin_wait(ms: u32) {
    unsafe { (*KERNEL_PTR).spin_wait(ms) }
}

pub fn get_priority() -> u8 {
    unsafe { (*KERNEL_PTR).get_priority() }
}

pub fn get_time() -> u32 {
    unsafe { (*KERNEL_PTR).get_time() }
}

#[cfg(not(test))]
pub fn scheduler_start() -> ! {
    unsafe { (*KERNEL_PTR).scheduler_start() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_start_rejects_overloaded_task_set() {
        crate::init_test_logging();
        let mut k = Kernel::new();
        k.thread_init(0x1000, 0x2000).unwrap();
        k.thread_create(0x3000, 0x4000, 0, 50, 100).unwrap();
        k.thread_create(0x5000, 0x6000, 1, 50, 100).unwrap();
        k.thread_create(0x7000, 0x8000, 2, 50, 100).unwrap();
        assert_eq!(k.scheduler_start(), Err(KernelError::Unschedulable));
    }

    #[test]
    fn scheduler_start_accepts_a_light_task_set() {
        let mut k = Kernel::new();
        k.thread_init(0x1000, 0x2000).unwrap();
        k.thread_create(0x3000, 0x4000, 0, 10, 100).unwrap();
        assert_eq!(k.scheduler_start(), Ok(()));
        assert_eq!(k.get_priority(), 0);
    }

    #[test]
    fn mutex_lock_unlock_round_trips_and_resets_curr_priority() {
        let mut k = Kernel::new();
        k.thread_init(0x1000, 0x2000).unwrap();
        k.thread_create(0x3000, 0x4000, 1, 10, 100).unwrap();
        k.scheduler_start().unwrap();
        assert_eq!(k.get_priority(), 1);

        let m = k.mutex_init(1).unwrap();
        k.mutex_lock(m);
        k.mutex_unlock(m);
        assert!(!k.pcp.is_held(MutexId::from_raw(m)));
    }

    #[test]
    fn thread_create_with_null_entry_is_rejected() {
        let mut k = Kernel::new();
        assert_eq!(
            k.thread_create(0, 0x4000, 1, 10, 100),
            Err(KernelError::NullEntry)
        );
    }
}
