//! # Scheduler
//!
//! Fixed-priority preemptive scheduling over the TCB pool. Priority
//! *is* the task's index, so selection is a branch-free scan of a
//! 32-bit bitset rather than a sort or a heap.
//!
//! ## Tick sequence
//!
//! Called once per millisecond from the timer IRQ (`hw::Timer`):
//!
//! 1. **Budget accounting** — the running task's `execution` is
//!    compared against its `computation` *before* incrementing it; a
//!    task that had already consumed its full budget on the previous
//!    tick transitions to WAITING this tick (`execution <=
//!    computation + 1`, the one-tick overshoot spec.md's invariant
//!    allows).
//! 2. **Period rollover** — a task whose budget is exhausted sleeps
//!    until `wakeup += period`.
//! 3. **Wake scan** — every WAITING task whose `wakeup` has arrived
//!    becomes RUNNABLE.
//!
//! `schedule()` is the separate selection step: scan priorities
//! `0..IDLE_PRIORITY` for the most urgent RUNNABLE task that clears the
//! PCP gate (see [`crate::pcp`]), falling back to the always-runnable
//! idle task at 31.

use crate::bitset::Bitset32;
use crate::config::{IDLE_PRIORITY, MAX_PRIORITY};
use crate::error::KernelError;
use crate::pcp::PcpRegistry;
use crate::tcb::{Priority, TaskStatus, Tcb};

/// All TCBs, the runnable/waiting membership bitsets, and the currently
/// running priority. Stored as a single global in [`crate::kernel`].
pub struct Scheduler {
    tasks: [Tcb; MAX_PRIORITY],
    current: Priority,
    time: u32,
    runnable: Bitset32,
    waiting: Bitset32,
}

impl Scheduler {
    pub const fn new() -> Self {
        let mut tasks = [Tcb::empty(0); MAX_PRIORITY];
        let mut i = 0;
        while i < MAX_PRIORITY {
            tasks[i] = Tcb::empty(i as u8);
            i += 1;
        }
        Self {
            tasks,
            current: Priority::idle(),
            time: 0,
            runnable: Bitset32::new(),
            waiting: Bitset32::new(),
        }
    }

    /// Populate the reserved idle slot (31). Idle is RUNNABLE the
    /// moment it's installed and stays that way forever — it never
    /// moves to the waiting set.
    pub fn init_idle(&mut self, idle_fn: u32, idle_stack_top: u32) {
        self.tasks[IDLE_PRIORITY as usize].init_idle(idle_fn, idle_stack_top);
        self.runnable.set(IDLE_PRIORITY);
        self.current = Priority::idle();
    }

    /// Populate a periodic task's slot. Fails if the slot is already
    /// active — see DESIGN.md for why double-creation is rejected
    /// rather than silently overwritten.
    pub fn create_task(
        &mut self,
        prio: Priority,
        entry: u32,
        stack_top: u32,
        computation: u32,
        period: u32,
    ) -> Result<(), KernelError> {
        let slot = &mut self.tasks[prio.get() as usize];
        if slot.active {
            return Err(KernelError::PriorityTaken);
        }
        slot.init_task(entry, stack_top, computation, period);
        self.runnable.set(prio.get());
        Ok(())
    }

    /// `(computation, period)` pairs for every created, non-idle task —
    /// the input to [`crate::schedulability::utilization_permille`].
    pub fn utilization_input(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.tasks
            .iter()
            .filter(|t| t.active && !t.is_idle())
            .map(|t| (t.computation, t.period))
    }

    /// Number of created, non-idle tasks — `n` in the schedulability
    /// bound lookup.
    pub fn active_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.active && !t.is_idle()).count()
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn current(&self) -> Priority {
        self.current
    }

    pub fn tcb(&self, p: Priority) -> &Tcb {
        &self.tasks[p.get() as usize]
    }

    pub fn tcb_mut(&mut self, p: Priority) -> &mut Tcb {
        &mut self.tasks[p.get() as usize]
    }

    pub fn current_tcb(&self) -> &Tcb {
        self.tcb(self.current)
    }

    pub fn current_tcb_mut(&mut self) -> &mut Tcb {
        self.tcb_mut(self.current)
    }

    /// Advance the tick clock and run steps 1–3. Does not select a new
    /// task — call [`Scheduler::schedule`] after.
    pub fn tick(&mut self) {
        self.time = self.time.wrapping_add(1);

        let cur = self.current;
        if cur != Priority::idle() {
            let tcb = &mut self.tasks[cur.get() as usize];
            let consumed_before = tcb.execution;
            tcb.execution += 1;
            tcb.sleep += 1;

            if consumed_before >= tcb.computation {
                tcb.wakeup = tcb.wakeup.wrapping_add(tcb.period);
                tcb.execution = 0;
                tcb.status = TaskStatus::Waiting;
                self.runnable.clear(cur.get());
                self.waiting.set(cur.get());
            }
        }

        let waiting_now = self.waiting;
        for p in waiting_now.iter() {
            if self.time >= self.tasks[p as usize].wakeup {
                self.tasks[p as usize].status = TaskStatus::Runnable;
                self.waiting.clear(p);
                self.runnable.set(p);
            }
        }
    }

    /// Voluntarily give up the rest of the current period — the
    /// `wait_until_next_period` syscall's effect on scheduler state.
    /// Unlike the tick-driven transition, this fires on request rather
    /// than on budget exhaustion, but the bookkeeping is identical.
    /// Idle never sleeps; calling this while idle is current is a
    /// no-op and returns `Priority::idle()`.
    pub fn sleep_current_until_next_period(&mut self) -> Priority {
        let cur = self.current;
        if cur != Priority::idle() {
            let tcb = &mut self.tasks[cur.get() as usize];
            tcb.wakeup = tcb.wakeup.wrapping_add(tcb.period);
            tcb.execution = 0;
            tcb.status = TaskStatus::Waiting;
            self.runnable.clear(cur.get());
            self.waiting.set(cur.get());
        }
        cur
    }

    /// Select and install the task to run next: the most urgent
    /// RUNNABLE priority that clears the PCP gate, or idle.
    ///
    /// The gate reuses [`PcpRegistry::ceiling_excluding`] — the same
    /// formula the mutex-acquire path uses — so a task already holding
    /// the very mutex that sets the system ceiling is never locked out
    /// of its own critical section.
    pub fn schedule(&mut self, pcp: &PcpRegistry) -> Priority {
        let mut next = Priority::idle();
        for p in 0u8..IDLE_PRIORITY {
            if !self.runnable.is_set(p) {
                continue;
            }
            let candidate = Priority::new(p).expect("bitset only ever holds valid priorities");
            if candidate < pcp.ceiling_excluding(candidate) {
                next = candidate;
                break;
            }
        }
        self.switch_to(next);
        next
    }

    fn switch_to(&mut self, next: Priority) {
        let prev = self.current;
        if prev == next {
            return;
        }
        if self.tasks[prev.get() as usize].status == TaskStatus::Running {
            self.tasks[prev.get() as usize].status = TaskStatus::Runnable;
        }
        self.tasks[next.get() as usize].status = TaskStatus::Running;
        self.current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcb::Priority;

    fn p(n: u8) -> Priority {
        Priority::new(n).unwrap()
    }

    fn booted(sched: &mut Scheduler) {
        sched.init_idle(0xF000, 0xF100);
    }

    #[test]
    fn second_create_on_same_priority_is_rejected() {
        let mut sched = Scheduler::new();
        booted(&mut sched);
        sched.create_task(p(2), 0x1000, 0x2000, 10, 100).unwrap();
        assert_eq!(
            sched.create_task(p(2), 0x3000, 0x4000, 5, 50),
            Err(KernelError::PriorityTaken)
        );
    }

    #[test]
    fn budget_exhaustion_moves_task_to_waiting() {
        let mut sched = Scheduler::new();
        booted(&mut sched);
        sched.create_task(p(1), 0x1000, 0x2000, 3, 10).unwrap();
        let pcp = PcpRegistry::new();

        // Tick 1 only switches idle->p1 in; p1 then needs 4 ticks of
        // its own (execution 0..=3, the one-tick overshoot spec.md's
        // invariant allows) to exhaust a budget of 3.
        for _ in 0..5 {
            sched.tick();
            sched.schedule(&pcp);
        }
        assert_eq!(sched.tcb(p(1)).status, TaskStatus::Waiting);
        assert_eq!(sched.tcb(p(1)).execution, 0);
        assert_eq!(sched.tcb(p(1)).wakeup, 10);
    }

    #[test]
    fn waiting_task_wakes_exactly_at_its_period() {
        let mut sched = Scheduler::new();
        booted(&mut sched);
        sched.create_task(p(1), 0x1000, 0x2000, 2, 5).unwrap();
        let pcp = PcpRegistry::new();

        for tick in 1..=10u32 {
            sched.tick();
            sched.schedule(&pcp);
            if tick == 5 || tick == 10 {
                assert_eq!(
                    sched.tcb(p(1)).status,
                    TaskStatus::Running,
                    "task must be running again at tick {tick}"
                );
            }
        }
    }

    #[test]
    fn schedule_prefers_most_urgent_runnable_task() {
        let mut sched = Scheduler::new();
        booted(&mut sched);
        sched.create_task(p(5), 0x1000, 0x2000, 100, 1000).unwrap();
        sched.create_task(p(1), 0x3000, 0x4000, 100, 1000).unwrap();
        let pcp = PcpRegistry::new();
        assert_eq!(sched.schedule(&pcp), p(1));
    }

    #[test]
    fn falls_back_to_idle_when_nothing_runnable() {
        let mut sched = Scheduler::new();
        booted(&mut sched);
        let pcp = PcpRegistry::new();
        assert_eq!(sched.schedule(&pcp), Priority::idle());
    }

    #[test]
    fn voluntary_sleep_removes_task_from_runnable_set_immediately() {
        let mut sched = Scheduler::new();
        booted(&mut sched);
        sched.create_task(p(1), 0x1000, 0x2000, 100, 1000).unwrap();
        let pcp = PcpRegistry::new();
        sched.schedule(&pcp); // p1 becomes current
        assert_eq!(sched.current(), p(1));

        let slept = sched.sleep_current_until_next_period();
        assert_eq!(slept, p(1));
        assert_eq!(sched.tcb(p(1)).status, TaskStatus::Waiting);
        assert_eq!(sched.tcb(p(1)).wakeup, 1000);
        assert_eq!(sched.schedule(&pcp), Priority::idle());
    }

    #[test]
    fn sleep_advances_only_while_the_task_is_current() {
        let mut sched = Scheduler::new();
        booted(&mut sched);
        sched.create_task(p(1), 0x1000, 0x2000, 100, 1000).unwrap();
        sched.create_task(p(2), 0x3000, 0x4000, 100, 1000).unwrap();
        let pcp = PcpRegistry::new();
        sched.schedule(&pcp);
        assert_eq!(sched.current(), p(1));

        for _ in 0..3 {
            sched.tick();
        }
        assert_eq!(sched.tcb(p(1)).sleep, 3);
        assert_eq!(sched.tcb(p(2)).sleep, 0, "p2 never ran, so its own sleep counter must not move");
    }

    #[test]
    fn pcp_gate_blocks_a_task_that_does_not_dominate_a_foreign_ceiling() {
        let mut sched = Scheduler::new();
        booted(&mut sched);
        // T1 (prio 1) holds a mutex with ceiling 1; T3 (prio 3, lower
        // urgency) must not be selected over idle while locked out,
        // even though it is otherwise the most urgent runnable task —
        // T1 itself isn't in the runnable set here since it's blocked
        // waiting on the resource, so the gate is exercised directly
        // against the registry rather than via tick().
        sched.create_task(p(3), 0x1000, 0x2000, 100, 1000).unwrap();
        let mut pcp = PcpRegistry::new();
        let m = pcp.init(p(1)).unwrap();
        assert!(pcp.try_acquire(m, p(1)));
        assert_eq!(sched.schedule(&pcp), Priority::idle());
    }
}
