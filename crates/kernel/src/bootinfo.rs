//! Boot-info block left behind by whatever loaded this kernel.
//!
//! Grounded on the retrieved `boot.h`: a fixed physical address holding a
//! `{ramdisk_base, ramdisk_size}` pair, read as a plain struct rather than
//! parsed from a richer boot-protocol structure — the boot sector and
//! protected-mode transition are this kernel's explicit non-goal, so all it
//! does on entry is trust this address.

const BOOT_INFO_ADDR: usize = 0x9000;

#[derive(Clone, Copy)]
#[repr(C)]
struct RawBootInfo {
    ramdisk_base: u32,
    ramdisk_size: u32,
}

/// Physical location and size of the RAM disk image, as left by the loader.
#[derive(Clone, Copy, Debug)]
pub struct BootInfo {
    pub ramdisk_base: u32,
    pub ramdisk_size: u32,
}

/// Read the boot-info block from its fixed address.
///
/// # Safety
/// Trusts that the loader placed a valid `RawBootInfo` at `BOOT_INFO_ADDR`
/// before handing control to this kernel, and that nothing has since
/// overwritten that page.
pub unsafe fn read() -> BootInfo {
    let raw = unsafe { &*(BOOT_INFO_ADDR as *const RawBootInfo) };
    BootInfo {
        ramdisk_base: raw.ramdisk_base,
        ramdisk_size: raw.ramdisk_size,
    }
}
