//! Native host harness for the Scheme runtime: runs a program file (or the
//! built-in factorial demo) against a `PlatformPort` backed by real stdio
//! and an optionally disk-image-backed block device.
//!
//! Grounded on the retrieved `scheme_host/main.c`: same default program,
//! same two positional arguments (program file, then an optional disk
//! image), same `putc`/`exit` foreign calls. Argument parsing itself uses
//! `clap`, the teacher's own CLI crate (see `xtask`), rather than hand
//! parsing `argv`.

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use los_scheme::platform::PlatformPort;
use los_scheme::Runtime;

const DEFAULT_PROGRAM: &str = "(begin\n\
  (define (fact n) (if (< n 2) 1 (* n (fact (- n 1)))))\n\
  (display (fact 5))\n\
  (newline))\n";

#[derive(Parser)]
#[command(name = "slop-scheme")]
#[command(about = "Run a program against the SlopOS Scheme runtime on the host")]
struct Cli {
    /// Scheme source file to evaluate. Defaults to a factorial demo.
    program: Option<PathBuf>,

    /// Backing file for the block-device primitives (disk-read-byte,
    /// disk-write-bytes, ...). Loaded fully into memory and flushed back
    /// on exit.
    disk: Option<PathBuf>,
}

/// `PlatformPort` wired to real stdio and an in-memory, optionally
/// file-backed disk image.
struct HostPlatform {
    disk: Vec<u8>,
    stdin: std::io::Stdin,
}

impl HostPlatform {
    fn new(disk: Vec<u8>) -> Self {
        Self {
            disk,
            stdin: std::io::stdin(),
        }
    }
}

impl PlatformPort for HostPlatform {
    fn putc(&mut self, ch: u8) {
        let _ = std::io::stdout().write_all(&[ch]);
    }

    fn panic(&mut self, msg: &str) -> ! {
        eprintln!("scheme panic: {msg}");
        std::process::exit(1);
    }

    fn read_char(&mut self) -> u8 {
        let mut buf = [0u8; 1];
        match self.stdin.read(&mut buf) {
            Ok(1) => buf[0],
            _ => 0,
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
        let end = start + data.len();
        if end > self.disk.len() {
            self.disk.resize(end, 0);
        }
        self.disk[start..end].copy_from_slice(data);
        data.len() as i64
    }

    fn foreign_call(&mut self, name: &str, args: &[i32]) -> i32 {
        match name {
            "putc" => {
                if let Some(&byte) = args.first() {
                    self.putc(byte as u8);
                    0
                } else {
                    -1
                }
            }
            "exit" => {
                let code = args.first().copied().unwrap_or(0);
                std::process::exit(code);
            }
            _ => -1,
        }
    }

    fn spawn_thread(&mut self, _code: &str) -> i32 {
        // The host harness runs a single Scheme program to completion; it
        // has no scheduler to hand a new thread to.
        -1
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let program = match &cli.program {
        Some(path) => fs::read_to_string(path)
            .map_err(|_| anyhow::Error::new(los_error::HostError::FileRead))
            .with_context(|| format!("reading program file {}", path.display()))?,
        None => DEFAULT_PROGRAM.to_string(),
    };

    let disk = match &cli.disk {
        Some(path) => fs::read(path)
            .map_err(|_| anyhow::Error::new(los_error::HostError::FileRead))
            .with_context(|| format!("reading disk image {}", path.display()))?,
        None => Vec::new(),
    };
    let disk_path = cli.disk.clone();

    let mut rt: Runtime<HostPlatform> = Runtime::new(HostPlatform::new(disk));
    rt.eval_string(&program);

    if let Some(path) = disk_path {
        fs::write(&path, &rt.platform.disk).with_context(|| format!("writing back disk image {}", path.display()))?;
    }

    Ok(())
}
