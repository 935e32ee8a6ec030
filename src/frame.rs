//! # Saved Register Frame
//!
//! The context-switch payload is a fixed-layout, 20-word record. The
//! trap assembly must know this layout exactly — rather than index a
//! raw array by number, each slot is a named field, and the compile-time
//! index each corresponds to (for the assembly stub and for any code
//! that must treat the frame as a flat word buffer) lives in
//! [`FrameIndex`].

/// Word offsets into a flattened [`TaskFrame`], matching spec order:
/// `spsr_svc(0)`, `sp_svc(1)`, `lr_svc(2)`, `sp_user(3)`, `lr_user(4)`,
/// `r0..r12(5..17)`, `lr_irq(18)`, `spsr_irq(19)`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameIndex {
    SpsrSvc = 0,
    SpSvc = 1,
    LrSvc = 2,
    SpUser = 3,
    LrUser = 4,
    R0 = 5,
    R1 = 6,
    R2 = 7,
    R3 = 8,
    R4 = 9,
    R5 = 10,
    R6 = 11,
    R7 = 12,
    R8 = 13,
    R9 = 14,
    R10 = 15,
    R11 = 16,
    R12 = 17,
    LrIrq = 18,
    SpsrIrq = 19,
}

/// Number of words in a saved frame.
pub const FRAME_WORDS: usize = 20;

/// A saved supervisor/user register frame, one per TCB. The trap stub
/// populates this on exception entry and restores from it on exit.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFrame {
    pub spsr_svc: u32,
    pub sp_svc: u32,
    pub lr_svc: u32,
    pub sp_user: u32,
    pub lr_user: u32,
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
    pub r12: u32,
    pub lr_irq: u32,
    pub spsr_irq: u32,
}

impl TaskFrame {
    pub const fn zero() -> Self {
        Self {
            spsr_svc: 0,
            sp_svc: 0,
            lr_svc: 0,
            sp_user: 0,
            lr_user: 0,
            r0: 0,
            r1: 0,
            r2: 0,
            r3: 0,
            r4: 0,
            r5: 0,
            r6: 0,
            r7: 0,
            r8: 0,
            r9: 0,
            r10: 0,
            r11: 0,
            r12: 0,
            lr_irq: 0,
            spsr_irq: 0,
        }
    }

    /// Flatten to the 20-word layout the trap assembly expects.
    pub const fn as_words(&self) -> [u32; FRAME_WORDS] {
        [
            self.spsr_svc,
            self.sp_svc,
            self.lr_svc,
            self.sp_user,
            self.lr_user,
            self.r0,
            self.r1,
            self.r2,
            self.r3,
            self.r4,
            self.r5,
            self.r6,
            self.r7,
            self.r8,
            self.r9,
            self.r10,
            self.r11,
            self.r12,
            self.lr_irq,
            self.spsr_irq,
        ]
    }

    /// Rebuild from the flattened 20-word layout.
    pub const fn from_words(w: [u32; FRAME_WORDS]) -> Self {
        Self {
            spsr_svc: w[0],
            sp_svc: w[1],
            lr_svc: w[2],
            sp_user: w[3],
            lr_user: w[4],
            r0: w[5],
            r1: w[6],
            r2: w[7],
            r3: w[8],
            r4: w[9],
            r5: w[10],
            r6: w[11],
            r7: w[12],
            r8: w[13],
            r9: w[14],
            r10: w[15],
            r11: w[16],
            r12: w[17],
            lr_irq: w[18],
            spsr_irq: w[19],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_words() {
        let mut words = [0u32; FRAME_WORDS];
        for (i, w) in words.iter_mut().enumerate() {
            *w = i as u32 * 7;
        }
        let frame = TaskFrame::from_words(words);
        assert_eq!(frame.as_words(), words);
        assert_eq!(frame.lr_irq, FrameIndex::LrIrq as u32 * 7);
        assert_eq!(frame.spsr_irq, FrameIndex::SpsrIrq as u32 * 7);
    }
}
