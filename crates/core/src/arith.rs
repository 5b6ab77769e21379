//! Shift, rotate, and flag-producing arithmetic primitives.
//!
//! Every boundary case here (`n == 0`, `n == 32`, `n > 32`, the immediate- vs.
//! register-form distinction) is load-bearing: ARM handlers depend on these
//! exact edge behaviors, not just the common case. Grounded directly in the
//! reference interpreter's shift/arithmetic helpers.

/// Result of a shift: the shifted value and the carry-out it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShiftResult {
    /// The shifted value.
    pub result: u32,
    /// The carry flag produced by the shift.
    pub carry_out: bool,
}

/// Logical shift left by `amount` (0..=255, though only 0..=32 is meaningful).
///
/// `amount == 0` leaves `value` and `carry_in` unchanged (this applies to both
/// the immediate and register forms of LSL, unlike LSR/ASR/ROR). `amount ==
/// 32` yields 0 with carry equal to bit 0 of `value`; `amount > 32` yields 0
/// with carry clear.
#[must_use]
pub fn lsl(value: u32, amount: u8, carry_in: bool) -> ShiftResult {
    match amount {
        0 => ShiftResult {
            result: value,
            carry_out: carry_in,
        },
        32 => ShiftResult {
            result: 0,
            carry_out: value & 1 != 0,
        },
        n if n > 32 => ShiftResult {
            result: 0,
            carry_out: false,
        },
        n => ShiftResult {
            result: value << n,
            carry_out: (value >> (32 - u32::from(n))) & 1 != 0,
        },
    }
}

/// Logical shift right by `amount`.
///
/// `imm_form` distinguishes the immediate-operand encoding, where `amount ==
/// 0` is a special encoding for "shift by 32" (LSR with a zero immediate is
/// not a valid direct encoding — `shiftN == 0` in `LSR #0` means 32), from the
/// register-operand encoding, where `amount == 0` truly means "no shift".
#[must_use]
pub fn lsr(value: u32, amount: u8, carry_in: bool, imm_form: bool) -> ShiftResult {
    let amount = if amount == 0 && imm_form { 32 } else { amount };
    match amount {
        0 => ShiftResult {
            result: value,
            carry_out: carry_in,
        },
        32 => ShiftResult {
            result: 0,
            carry_out: value >> 31 != 0,
        },
        n if n > 32 => ShiftResult {
            result: 0,
            carry_out: false,
        },
        n => ShiftResult {
            result: value >> n,
            carry_out: (value >> (u32::from(n) - 1)) & 1 != 0,
        },
    }
}

/// Arithmetic shift right by `amount`, sign-extending. Same `imm_form`
/// zero-means-32 convention as [`lsr`].
#[must_use]
pub fn asr(value: u32, amount: u8, carry_in: bool, imm_form: bool) -> ShiftResult {
    let amount = if amount == 0 && imm_form { 32 } else { amount };
    match amount {
        0 => ShiftResult {
            result: value,
            carry_out: carry_in,
        },
        n if n >= 32 => {
            let filled = if value >> 31 != 0 { 0xFFFF_FFFF } else { 0 };
            ShiftResult {
                result: filled,
                carry_out: value >> 31 != 0,
            }
        }
        n => ShiftResult {
            result: ((value as i32) >> n) as u32,
            carry_out: (value >> (u32::from(n) - 1)) & 1 != 0,
        },
    }
}

/// Rotate right by `amount`.
///
/// In the immediate-operand encoding, `amount == 0` denotes RRX: rotate right
/// by one bit, shifting the current carry flag into bit 31 and producing a
/// new carry equal to the old bit 0. In the register-operand encoding,
/// `amount == 0` leaves the value unchanged; a nonzero `amount` whose low 5
/// bits are zero (i.e. a multiple of 32) leaves the value unchanged but still
/// updates carry to bit 31.
#[must_use]
pub fn ror(value: u32, amount: u8, carry_in: bool, imm_form: bool) -> ShiftResult {
    if amount == 0 {
        return if imm_form {
            let carry_out = value & 1 != 0;
            let result = (value >> 1) | ((carry_in as u32) << 31);
            ShiftResult { result, carry_out }
        } else {
            ShiftResult {
                result: value,
                carry_out: carry_in,
            }
        };
    }
    let rot = amount & 0x1F;
    if rot == 0 {
        return ShiftResult {
            result: value,
            carry_out: value >> 31 != 0,
        };
    }
    let result = value.rotate_right(u32::from(rot));
    ShiftResult {
        result,
        carry_out: result >> 31 != 0,
    }
}

/// Rotates an 8-bit immediate right by `rotate * 2` bits, the ARM
/// data-processing immediate-operand encoding.
#[must_use]
pub fn rotate_imm(imm: u32, rotate: u8) -> u32 {
    imm.rotate_right(u32::from(rotate) * 2)
}

/// Like [`rotate_imm`] but also reports the carry-out fed to the barrel
/// shifter's carry flag (bit 31 of the rotated value; unchanged if `rotate == 0`).
#[must_use]
pub fn rotate_imm_with_carry(imm: u32, rotate: u8, carry_in: bool) -> (u32, bool) {
    if rotate == 0 {
        (imm, carry_in)
    } else {
        let result = rotate_imm(imm, rotate);
        (result, result >> 31 != 0)
    }
}

/// Result of an add/subtract: the 32-bit result plus the carry and overflow
/// flags it produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlaggedResult {
    /// The 32-bit result, wrapping on overflow.
    pub result: u32,
    /// Unsigned carry-out (for ADD: carry out of bit 31; for SUB: NOT borrow).
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
}

/// `augend + addend`, with unsigned-carry and signed-overflow flags.
#[must_use]
pub fn add(augend: u32, addend: u32) -> FlaggedResult {
    let (result, carry) = augend.overflowing_add(addend);
    let overflow = ((augend ^ result) & (addend ^ result)) >> 31 != 0;
    FlaggedResult { result, carry, overflow }
}

/// `minuend - subtrahend`, with carry defined as "no borrow" (`minuend >=
/// subtrahend`) per ARM convention, not the two's-complement-add convention.
#[must_use]
pub fn sub(minuend: u32, subtrahend: u32) -> FlaggedResult {
    let result = minuend.wrapping_sub(subtrahend);
    let carry = minuend >= subtrahend;
    let overflow = ((minuend ^ subtrahend) & (minuend ^ result)) >> 31 != 0;
    FlaggedResult { result, carry, overflow }
}

/// `augend + addend + carry_in`, the ADC operation.
#[must_use]
pub fn adc(augend: u32, addend: u32, carry_in: bool) -> FlaggedResult {
    let wide = u64::from(augend) + u64::from(addend) + u64::from(carry_in);
    let result = wide as u32;
    let carry = wide > 0xFFFF_FFFF;
    let sum_no_carry = augend.wrapping_add(addend);
    let overflow_no_carry = ((augend ^ sum_no_carry) & (addend ^ sum_no_carry)) >> 31 != 0;
    let overflow_carry_add = ((sum_no_carry ^ result) & ((carry_in as u32) ^ result)) >> 31 != 0;
    FlaggedResult {
        result,
        carry,
        overflow: overflow_no_carry ^ overflow_carry_add,
    }
}

/// `minuend - subtrahend - (1 - carry_in)`, the SBC operation (`carry_in ==
/// true` means "no borrow" from a prior subtraction, matching ADC's convention).
#[must_use]
pub fn sbc(minuend: u32, subtrahend: u32, carry_in: bool) -> FlaggedResult {
    let borrow_in: u32 = u32::from(!carry_in);
    let step1 = minuend.wrapping_sub(subtrahend);
    let result = step1.wrapping_sub(borrow_in);
    let carry = (minuend >= subtrahend) && (step1 >= borrow_in);
    // Signed overflow of the combined two-step subtraction, computed directly
    // from the full-precision difference rather than composed from the two
    // partial overflow flags, which double-counts the double-borrow case.
    let full = i64::from(minuend as i32) - i64::from(subtrahend as i32) - i64::from(borrow_in);
    let overflow = full != i64::from(result as i32);
    FlaggedResult { result, carry, overflow }
}

/// Clamps a 64-bit value to the signed 32-bit range, reporting whether
/// clamping changed it (the Q flag).
#[must_use]
pub fn saturate(value: i64) -> (i32, bool) {
    let clamped = value.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
    (clamped as i32, clamped != value)
}
