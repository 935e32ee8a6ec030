//! # Example Firmware
//!
//! Two periodic tasks sharing one PCP-protected resource, plus the
//! idle task the kernel always needs.
//!
//! | Task | Priority | Period | Computation | Role |
//! |------|----------|--------|-------------|------|
//! | `controller_task` | 0 | 20 ms | 4 ms | reads the shared sample, computes an actuation value |
//! | `sensor_task` | 1 | 50 ms | 6 ms | writes a fresh sample under the shared mutex |
//! | idle | 31 | — | — | `wfi` loop |
//!
//! Both tasks lock `SAMPLE_MUTEX` (ceiling 0, the more urgent of the
//! two) around their access to `SHARED_SAMPLE` — the PCP layer bounds
//! `controller_task`'s blocking time to at most one `sensor_task`
//! critical section, regardless of scheduling order.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use panic_halt as _;

use ccos::arch::arm::SysTickTimer;
use ccos::config::{STACK_WORDS, TICK_HZ};
use ccos::hw::Timer;
use ccos::kernel;

static mut IDLE_STACK: [u32; STACK_WORDS] = [0; STACK_WORDS];
static mut CONTROLLER_STACK: [u32; STACK_WORDS] = [0; STACK_WORDS];
static mut SENSOR_STACK: [u32; STACK_WORDS] = [0; STACK_WORDS];

static mut SHARED_SAMPLE: u32 = 0;
static mut SAMPLE_MUTEX: usize = 0;

fn stack_top(stack: &mut [u32; STACK_WORDS]) -> u32 {
    stack.as_mut_ptr() as u32 + (STACK_WORDS as u32 - 1) * 4
}

extern "C" fn idle_task() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

extern "C" fn sensor_task() -> ! {
    let mut reading: u32 = 0;
    loop {
        reading = reading.wrapping_add(1);
        kernel::mutex_lock(unsafe { SAMPLE_MUTEX });
        unsafe { SHARED_SAMPLE = reading };
        kernel::mutex_unlock(unsafe { SAMPLE_MUTEX });
        kernel::wait_until_next_period();
    }
}

extern "C" fn controller_task() -> ! {
    loop {
        kernel::mutex_lock(unsafe { SAMPLE_MUTEX });
        let sample = unsafe { SHARED_SAMPLE };
        kernel::mutex_unlock(unsafe { SAMPLE_MUTEX });
        let _actuation = sample.wrapping_mul(3);
        kernel::wait_until_next_period();
    }
}

#[entry]
fn main() -> ! {
    let mut cp = cortex_m::Peripherals::take().unwrap();

    kernel::init();

    kernel::thread_init(idle_task as u32, stack_top(unsafe { &mut IDLE_STACK }))
        .expect("idle task installation failed");

    let mutex_id = kernel::mutex_init(0).expect("mutex registry full");
    unsafe { SAMPLE_MUTEX = mutex_id };

    kernel::thread_create(
        controller_task as u32,
        stack_top(unsafe { &mut CONTROLLER_STACK }),
        0,
        4,
        20,
    )
    .expect("controller_task creation failed");

    kernel::thread_create(
        sensor_task as u32,
        stack_top(unsafe { &mut SENSOR_STACK }),
        1,
        6,
        50,
    )
    .expect("sensor_task creation failed");

    SysTickTimer(&mut cp.SYST).arm(TICK_HZ);

    kernel::scheduler_start()
}
