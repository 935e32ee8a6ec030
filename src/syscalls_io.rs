//! # Newlib-style I/O Syscalls
//!
//! `write`/`read`/`sbrk`/`close`/`fstat`/`isatty`/`lseek` exist only so
//! [`crate::trap::dispatch`]'s match is exhaustive against spec.md §6's
//! numeric table. They forward to a [`ConsolePort`], not a real
//! filesystem or UART — driver depth (buffering, baud config, DMA) is
//! out of scope for the scheduler/PCP core.

/// Single-byte console I/O. A board wires this to its UART; the host
/// test harness wires it to nothing (`write` stubs succeed without
/// output since no test asserts on console bytes).
pub trait ConsolePort {
    fn write_byte(&mut self, byte: u8);
    fn read_byte(&mut self) -> Option<u8>;
}

/// `write(fd, buf, len)` — only `stdout`/`stderr` (fd 1/2) are
/// supported; other descriptors fail like the original newlib stub.
pub fn write(port: &mut dyn ConsolePort, fd: i32, buf: &[u8]) -> i32 {
    if fd != 1 && fd != 2 {
        return -1;
    }
    for &b in buf {
        port.write_byte(b);
    }
    buf.len() as i32
}

/// `read(fd, buf)` — only `stdin` (fd 0) is supported.
pub fn read(port: &mut dyn ConsolePort, fd: i32, buf: &mut [u8]) -> i32 {
    if fd != 0 {
        return -1;
    }
    let mut n = 0;
    while n < buf.len() {
        match port.read_byte() {
            Some(b) => {
                buf[n] = b;
                n += 1;
            }
            None => break,
        }
    }
    n as i32
}

/// `sbrk(increment)` — there is no heap in this kernel; any nonzero
/// request fails, matching a newlib stub built for a no-heap target.
pub fn sbrk(increment: i32) -> i32 {
    if increment == 0 {
        0
    } else {
        -1
    }
}

pub fn close(_fd: i32) -> i32 {
    -1
}

pub fn fstat(_fd: i32) -> i32 {
    -1
}

pub fn isatty(fd: i32) -> i32 {
    (fd == 0 || fd == 1 || fd == 2) as i32
}

pub fn lseek(_fd: i32, _offset: i32, _whence: i32) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingPort {
        written: [u8; 8],
        pending_read: Option<u8>,
    }

    impl ConsolePort for RecordingPort {
        fn write_byte(&mut self, byte: u8) {
            for slot in self.written.iter_mut() {
                if *slot == 0 {
                    *slot = byte;
                    break;
                }
            }
        }

        fn read_byte(&mut self) -> Option<u8> {
            self.pending_read.take()
        }
    }

    #[test]
    fn write_to_stdout_succeeds_and_records_bytes() {
        let mut port = RecordingPort {
            written: [0; 8],
            pending_read: None,
        };
        let n = write(&mut port, 1, b"hi");
        assert_eq!(n, 2);
        assert_eq!(&port.written[..2], b"hi");
    }

    #[test]
    fn write_to_non_console_fd_fails() {
        let mut port = RecordingPort {
            written: [0; 8],
            pending_read: None,
        };
        assert_eq!(write(&mut port, 3, b"x"), -1);
    }

    #[test]
    fn read_from_stdin_returns_available_byte() {
        let mut port = RecordingPort {
            written: [0; 8],
            pending_read: Some(b'x'),
        };
        let mut buf = [0u8; 4];
        assert_eq!(read(&mut port, 0, &mut buf), 1);
        assert_eq!(buf[0], b'x');
    }

    #[test]
    fn sbrk_always_fails_no_heap() {
        assert_eq!(sbrk(16), -1);
        assert_eq!(sbrk(0), 0);
    }

    #[test]
    fn isatty_true_only_for_console_fds() {
        assert_eq!(isatty(0), 1);
        assert_eq!(isatty(5), 0);
    }
}
