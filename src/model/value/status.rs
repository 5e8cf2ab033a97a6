use bitflags::bitflags;

use crate::model::constant::Tuple;

bitflags! {
    /// Condition flags produced by flag-setting arithmetic.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        const ZERO = 0b0001;
        const CARRY = 0b0010;
        const OVERFLOW = 0b0100;
        const NEGATIVE = 0b1000;
    }
}

impl StatusFlags {
    pub fn from_bools(zero: bool, carry: bool, overflow: bool, negative: bool) -> Self {
        let mut flags = StatusFlags::empty();
        flags.set(StatusFlags::ZERO, zero);
        flags.set(StatusFlags::CARRY, carry);
        flags.set(StatusFlags::OVERFLOW, overflow);
        flags.set(StatusFlags::NEGATIVE, negative);
        flags
    }

    pub fn zero(self) -> bool {
        self.contains(StatusFlags::ZERO)
    }

    pub fn carry(self) -> bool {
        self.contains(StatusFlags::CARRY)
    }

    pub fn overflow(self) -> bool {
        self.contains(StatusFlags::OVERFLOW)
    }

    pub fn negative(self) -> bool {
        self.contains(StatusFlags::NEGATIVE)
    }

    /// The `(zero, carry, overflow, negative)` status tuple.
    pub fn to_tuple(self) -> Tuple {
        Tuple::status(self.zero(), self.carry(), self.overflow(), self.negative())
    }
}
