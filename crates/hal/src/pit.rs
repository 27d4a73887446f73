//! 8253/8254 Programmable Interval Timer, channel 0 in rate-generator mode,
//! the source of the scheduler's timer tick.

use crate::cpu::outb;
use los_error::HalError;

const PIT_CHANNEL_0: u16 = 0x40;
const PIT_COMMAND: u16 = 0x43;
const PIT_FREQUENCY: u32 = 1_193_182;

pub struct Pit;

impl Pit {
    /// Program channel 0 to fire at `frequency_hz` via IRQ0.
    ///
    /// `frequency_hz` must divide down to a 16-bit divisor (1..=65535);
    /// zero, or anything slower than ~18.2 Hz, doesn't fit the counter.
    pub fn init(frequency_hz: u32) -> Result<(), HalError> {
        if frequency_hz == 0 {
            return Err(HalError::PitDivisorOutOfRange);
        }
        let divisor = PIT_FREQUENCY / frequency_hz;
        if divisor == 0 || divisor > u32::from(u16::MAX) {
            return Err(HalError::PitDivisorOutOfRange);
        }

        // Channel 0, lobyte/hibyte access, rate generator (mode 2), binary.
        outb(PIT_COMMAND, 0x36);
        outb(PIT_CHANNEL_0, (divisor & 0xFF) as u8);
        outb(PIT_CHANNEL_0, ((divisor >> 8) & 0xFF) as u8);
        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::cpu::{clear_ops, get_ops, IoOp};

    #[test]
    fn test_pit_init_100hz() {
        clear_ops();
        assert!(Pit::init(100).is_ok());

        let ops = get_ops();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0], IoOp::Outb(0x43, 0x36));
        assert_eq!(ops[1], IoOp::Outb(0x40, 0x9b));
        assert_eq!(ops[2], IoOp::Outb(0x40, 0x2e));
    }

    #[test]
    fn test_pit_init_rejects_zero_frequency() {
        assert_eq!(Pit::init(0), Err(HalError::PitDivisorOutOfRange));
    }

    #[test]
    fn test_pit_init_rejects_frequency_too_slow_for_the_divisor() {
        // anything slower than PIT_FREQUENCY / 65535 overflows the 16-bit divisor.
        assert_eq!(Pit::init(1), Err(HalError::PitDivisorOutOfRange));
    }
}
