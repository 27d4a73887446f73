//! 8259 PIC remap and acknowledgment. This kernel only rides IRQ0 (the PIT
//! tick), so the timer ISR only ever needs the master-PIC end-of-interrupt
//! write, but both PICs still need remapping away from the CPU exception
//! vectors (0x08-0x0F) before interrupts are enabled at all.

use crate::cpu::{inb, outb};

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;
const EOI: u8 = 0x20;

const ICW1_INIT: u8 = 0x11;
const ICW4_8086: u8 = 0x01;

/// Remap the master/slave PICs so IRQ0-15 land on vectors 0x20-0x2F instead
/// of colliding with the CPU's own exception vectors. Preserves each PIC's
/// existing interrupt mask across the remap.
pub fn remap() {
    let mask1 = inb(PIC1_DATA);
    let mask2 = inb(PIC2_DATA);

    outb(PIC1_COMMAND, ICW1_INIT);
    outb(PIC2_COMMAND, ICW1_INIT);
    outb(PIC1_DATA, 0x20); // master offset: IRQ0 -> vector 0x20
    outb(PIC2_DATA, 0x28); // slave offset: IRQ8 -> vector 0x28
    outb(PIC1_DATA, 0x04); // tell master there's a slave at IRQ2
    outb(PIC2_DATA, 0x02); // tell slave its cascade identity
    outb(PIC1_DATA, ICW4_8086);
    outb(PIC2_DATA, ICW4_8086);

    outb(PIC1_DATA, mask1);
    outb(PIC2_DATA, mask2);
}

/// Acknowledge the current interrupt on the master PIC.
pub fn send_eoi() {
    outb(PIC1_COMMAND, EOI);
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::cpu::{clear_ops, get_ops, IoOp};

    #[test]
    fn test_eoi_writes_master_command_port() {
        clear_ops();
        send_eoi();
        assert_eq!(get_ops(), vec![IoOp::Outb(0x20, 0x20)]);
    }

    #[test]
    fn test_remap_preserves_existing_masks() {
        clear_ops();
        crate::cpu::set_mock_inb(vec![0x0F, 0xFF]); // popped in reverse: mask1 then mask2
        remap();

        let ops = get_ops();
        let writes: Vec<(u16, u8)> = ops
            .iter()
            .filter_map(|op| match op {
                IoOp::Outb(p, d) => Some((*p, *d)),
                IoOp::Inb(_) => None,
            })
            .collect();
        assert_eq!(writes.last(), Some(&(PIC2_DATA, 0xFF)));
        assert_eq!(writes[writes.len() - 2], (PIC1_DATA, 0x0F));
    }
}
