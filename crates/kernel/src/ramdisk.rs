//! Fixed-capacity RAM-disk block device.
//!
//! Grounded on spec.md's §5/§6 RAM-disk contract rather than any one
//! teacher file (the teacher's own `block.rs` talks to a VirtIO device,
//! which this kernel has no use for): sectors are 512 bytes, `write_bytes`
//! is a read-modify-write over every sector the write touches, and offset
//! 0 holds a little-endian 32-bit length prefix followed by that many
//! bytes of the boot program.
//!
//! Non-reentrant by design (see `DESIGN.md`): no primitive yields mid-read
//! or mid-write, so cooperative scheduling already serializes every caller.

pub const SECTOR_SIZE: usize = 512;

/// Backing capacity. Sized generously over the default factorial demo and
/// any reasonably-sized bootstrap program; a real loader would size this
/// from `BootInfo::ramdisk_size` instead of a compile-time constant.
pub const CAPACITY: usize = 64 * 1024;

pub struct RamDisk {
    bytes: [u8; CAPACITY],
    len: usize,
}

impl RamDisk {
    pub const fn empty() -> Self {
        Self {
            bytes: [0; CAPACITY],
            len: 0,
        }
    }

    /// Load a boot program into the length-prefixed §6 layout: a 4-byte
    /// little-endian length, then the program bytes, recorded as the
    /// image's logical length for `disk_size()`.
    pub fn load_program(&mut self, program: &[u8]) {
        let prefixed_len = 4 + program.len();
        assert!(prefixed_len <= CAPACITY, "boot program exceeds RAM-disk capacity");
        self.bytes[0..4].copy_from_slice(&(program.len() as u32).to_le_bytes());
        self.bytes[4..prefixed_len].copy_from_slice(program);
        self.len = prefixed_len;
    }

    /// Load a whole raw disk image (already in its own §6 layout), e.g.
    /// one staged into the RAM-disk region named by `BootInfo`.
    ///
    /// # Safety
    /// `base`/`len` must describe memory that is mapped, readable for
    /// `len` bytes, and not concurrently written while this call runs.
    pub unsafe fn load_raw(&mut self, base: *const u8, len: usize) {
        let len = len.min(CAPACITY);
        let src = unsafe { core::slice::from_raw_parts(base, len) };
        self.bytes[..len].copy_from_slice(src);
        self.len = len;
    }

    pub fn size(&self) -> i64 {
        self.len as i64
    }

    /// The bootstrap program named by the §6 length prefix at offset 0, or
    /// `None` if the image is too short to hold even the prefix, or claims
    /// a length that runs past the image's own end.
    pub fn program_bytes(&self) -> Option<&[u8]> {
        if self.len < 4 {
            return None;
        }
        let prog_len =
            u32::from_le_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]])
                as usize;
        let end = 4 + prog_len;
        if end > self.len {
            return None;
        }
        Some(&self.bytes[4..end])
    }

    pub fn read_byte(&self, offset: i64) -> i32 {
        if offset < 0 || offset as usize >= self.len {
            -1
        } else {
            i32::from(self.bytes[offset as usize])
        }
    }

    /// Read-modify-write every 512-byte sector overlapping `[offset,
    /// offset + data.len())`, per §6. Extends the logical length (but
    /// never the backing capacity) when the write runs past the current
    /// end of the image.
    pub fn write_bytes(&mut self, offset: i64, data: &[u8]) -> i64 {
        if offset < 0 {
            return -1;
        }
        let start = offset as usize;
        let end = start + data.len();
        if end > CAPACITY {
            return -1;
        }

        let first_sector = start / SECTOR_SIZE;
        let last_sector = (end.saturating_sub(1)) / SECTOR_SIZE;
        for sector in first_sector..=last_sector {
            let sector_start = sector * SECTOR_SIZE;
            let sector_end = (sector_start + SECTOR_SIZE).min(CAPACITY);
            let overlap_start = start.max(sector_start);
            let overlap_end = end.min(sector_end);
            let src_start = overlap_start - start;
            let src_end = overlap_end - start;
            self.bytes[overlap_start..overlap_end].copy_from_slice(&data[src_start..src_end]);
        }

        if end > self.len {
            self.len = end;
        }
        data.len() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_program_prefixes_with_little_endian_length() {
        let mut disk = RamDisk::empty();
        disk.load_program(b"hi");
        assert_eq!(disk.read_byte(0), 2);
        assert_eq!(disk.read_byte(1), 0);
        assert_eq!(disk.read_byte(4), b'h' as i32);
        assert_eq!(disk.read_byte(5), b'i' as i32);
    }

    #[test]
    fn write_bytes_spans_whole_sectors_via_read_modify_write() {
        let mut disk = RamDisk::empty();
        disk.load_program(&[0u8; 16]);
        let before_len = disk.size();

        let written = disk.write_bytes(10, &[1, 2, 3]);
        assert_eq!(written, 3);
        assert_eq!(disk.read_byte(10), 1);
        assert_eq!(disk.read_byte(11), 2);
        assert_eq!(disk.read_byte(12), 3);
        // bytes outside the written range, but inside the touched sector,
        // are untouched.
        assert_eq!(disk.read_byte(9), 0);
        assert_eq!(disk.size(), before_len);
    }

    #[test]
    fn write_bytes_rejects_negative_offset() {
        let mut disk = RamDisk::empty();
        assert_eq!(disk.write_bytes(-1, &[1]), -1);
    }

    #[test]
    fn read_byte_out_of_range_returns_negative_one() {
        let mut disk = RamDisk::empty();
        disk.load_program(b"x");
        assert_eq!(disk.read_byte(1000), -1);
    }

    #[test]
    fn program_bytes_recovers_the_staged_program() {
        let mut disk = RamDisk::empty();
        disk.load_program(b"(+ 1 2)");
        assert_eq!(disk.program_bytes(), Some(&b"(+ 1 2)"[..]));
    }

    #[test]
    fn program_bytes_is_none_on_an_empty_disk() {
        let disk = RamDisk::empty();
        assert_eq!(disk.program_bytes(), None);
    }
}
