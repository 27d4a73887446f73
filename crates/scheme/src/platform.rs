//! The abstract I/O surface a runtime instance consumes. This is the only
//! coupling between the Scheme runtime and the machine it runs on; every
//! concrete implementation (real hardware, a mock for tests) lives outside
//! this crate and is wired in by the caller.

/// Capability record consumed by every runtime instance.
///
/// Implementations must uphold the contracts documented on each method;
/// the evaluator and primitives trust them without further validation.
pub trait PlatformPort {
    /// Write one byte to the console. No failure path.
    fn putc(&mut self, ch: u8);

    /// Diverging. Must not return. Implementations on real hardware halt
    /// the machine after writing `msg`; the host harness exits the process.
    fn panic(&mut self, msg: &str) -> !;

    /// Block until one byte is available, yielding cooperatively while
    /// waiting is the host's responsibility (not this trait's).
    fn read_char(&mut self) -> u8;

    /// `0..=255` on success, negative on out-of-range. Bounded by
    /// `disk_size()`.
    fn read_byte(&mut self, offset: i64) -> i32;

    /// Total bytes of the backing block device.
    fn disk_size(&mut self) -> i64;

    /// Copy `data` into the backing device at `offset`. Returns bytes
    /// written, or negative on failure. May be a no-op on hosts without
    /// persistent storage.
    fn write_bytes(&mut self, offset: i64, data: &[u8]) -> i64;

    /// Integer-only generic side channel. `name` is resolved by convention
    /// (§6); unrecognized names return a negative integer. `args` holds at
    /// most 8 entries, enforced by the primitive that calls this, not here.
    fn foreign_call(&mut self, name: &str, args: &[i32]) -> i32;

    /// Hand a freshly owned program string to the host, which starts it on
    /// its own cooperative thread. Returns a non-negative thread handle, or
    /// negative on failure (e.g. the thread table is full).
    fn spawn_thread(&mut self, code: &str) -> i32;
}

/// Host-side `PlatformPort` used by unit tests and the host harness: console
/// output is captured into a fixed buffer, the block device is a plain byte
/// slice, and `panic` records the message and diverges via an infinite spin
/// rather than aborting the test process — mirroring the real target's
/// "surfaced once, then halt" policy without actually stopping `cargo test`.
#[cfg(any(test, feature = "test-support"))]
pub mod mock {
    use super::PlatformPort;

    pub const OUTPUT_CAP: usize = 4096;

    pub struct MockPlatform<'a> {
        pub output: [u8; OUTPUT_CAP],
        pub output_len: usize,
        pub input: &'a [u8],
        pub input_pos: usize,
        pub disk: &'a mut [u8],
        pub panicked: Option<[u8; 256]>,
        pub foreign_calls: [(i32, [i32; 8], u8); 32],
        pub foreign_call_count: usize,
    }

    impl<'a> MockPlatform<'a> {
        #[must_use]
        pub fn new(input: &'a [u8], disk: &'a mut [u8]) -> Self {
            Self {
                output: [0; OUTPUT_CAP],
                output_len: 0,
                input,
                input_pos: 0,
                disk,
                panicked: None,
                foreign_calls: [(0, [0; 8], 0); 32],
                foreign_call_count: 0,
            }
        }

        #[must_use]
        pub fn output(&self) -> &[u8] {
            &self.output[..self.output_len]
        }
    }

    impl PlatformPort for MockPlatform<'_> {
        fn putc(&mut self, ch: u8) {
            if self.output_len < OUTPUT_CAP {
                self.output[self.output_len] = ch;
                self.output_len += 1;
            }
        }

        #[allow(clippy::panic)] // this is the test-only stand-in for a real halt, not a control-flow shortcut
        fn panic(&mut self, msg: &str) -> ! {
            let mut buf = [0u8; 256];
            let bytes = msg.as_bytes();
            let n = bytes.len().min(255);
            buf[..n].copy_from_slice(&bytes[..n]);
            self.panicked = Some(buf);
            panic!("scheme panic: {msg}");
        }

        fn read_char(&mut self) -> u8 {
            if self.input_pos < self.input.len() {
                let c = self.input[self.input_pos];
                self.input_pos += 1;
                c
            } else {
                0
            }
        }

        fn read_byte(&mut self, offset: i64) -> i32 {
            if offset < 0 || offset as usize >= self.disk.len() {
                -1
            } else {
                i32::from(self.disk[offset as usize])
            }
        }

        fn disk_size(&mut self) -> i64 {
            self.disk.len() as i64
        }

        fn write_bytes(&mut self, offset: i64, data: &[u8]) -> i64 {
            if offset < 0 {
                return -1;
            }
            let start = offset as usize;
            if start + data.len() > self.disk.len() {
                return -1;
            }
            self.disk[start..start + data.len()].copy_from_slice(data);
            data.len() as i64
        }

        fn foreign_call(&mut self, name: &str, args: &[i32]) -> i32 {
            let mut arr = [0i32; 8];
            let n = args.len().min(8);
            arr[..n].copy_from_slice(&args[..n]);
            if self.foreign_call_count < self.foreign_calls.len() {
                self.foreign_calls[self.foreign_call_count] = (0, arr, n as u8);
                self.foreign_call_count += 1;
            }
            match name {
                "putc" if !args.is_empty() => {
                    self.putc(args[0] as u8);
                    0
                }
                "yield" | "shutdown" => 0,
                _ => -1,
            }
        }

        fn spawn_thread(&mut self, _code: &str) -> i32 {
            -1
        }
    }
}
