//! Integer operator semantics shared by symbolic folding and the concrete
//! interpreter. Integers are unbounded; division and remainder are
//! Euclidean, matching SMT-LIB `div` / `mod`.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use sympath_lang::ast::{BinOp, CmpOp};

/// Largest integer, in bits, that folding or the interpreter will build.
/// `**` and `<<` can reach it from small operands.
pub const MAX_INT_BITS: u64 = 1 << 20;

/// Largest exponent expanded for a symbolic base. The product is a term of
/// that degree handed to the solver.
pub const MAX_SYMBOLIC_EXPONENT: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithFault {
    DivisionByZero,
    /// The result would exceed [`MAX_INT_BITS`].
    TooLarge,
    NegativeExponent,
    NegativeShift,
}

pub fn checked_arith(op: BinOp, a: &BigInt, b: &BigInt) -> Result<BigInt, ArithFault> {
    match op {
        BinOp::Add => Ok(a + b),
        BinOp::Sub => Ok(a - b),
        BinOp::Mul => {
            if a.bits() + b.bits() > MAX_INT_BITS {
                return Err(ArithFault::TooLarge);
            }
            Ok(a * b)
        }
        BinOp::Div | BinOp::FloorDiv => euclid(a, b).map(|(q, _)| q),
        BinOp::Mod => euclid(a, b).map(|(_, r)| r),
        BinOp::Pow => checked_pow(a, b),
        BinOp::LShift => shift_left(a, b),
        BinOp::RShift => shift_right(a, b),
    }
}

/// Euclidean quotient and remainder: `0 <= r < |b|` and `a == q * b + r`.
fn euclid(a: &BigInt, b: &BigInt) -> Result<(BigInt, BigInt), ArithFault> {
    if b.is_zero() {
        return Err(ArithFault::DivisionByZero);
    }
    let r = a.mod_floor(&b.abs());
    let q = (a - &r) / b;
    Ok((q, r))
}

pub fn checked_pow(base: &BigInt, exp: &BigInt) -> Result<BigInt, ArithFault> {
    if exp.is_negative() {
        return Err(ArithFault::NegativeExponent);
    }
    if exp.is_zero() {
        return Ok(BigInt::one());
    }
    if base.is_zero() || base.is_one() {
        return Ok(base.clone());
    }
    if *base == BigInt::from(-1) {
        return Ok(if exp.is_even() { BigInt::one() } else { base.clone() });
    }
    let exp = exp
        .to_u64()
        .filter(|e| e.saturating_mul(base.bits()) <= MAX_INT_BITS)
        .and_then(|e| u32::try_from(e).ok())
        .ok_or(ArithFault::TooLarge)?;
    Ok(base.pow(exp))
}

fn shift_left(a: &BigInt, b: &BigInt) -> Result<BigInt, ArithFault> {
    if b.is_negative() {
        return Err(ArithFault::NegativeShift);
    }
    if a.is_zero() {
        return Ok(BigInt::zero());
    }
    let count = b
        .to_u64()
        .filter(|count| count.saturating_add(a.bits()) <= MAX_INT_BITS)
        .ok_or(ArithFault::TooLarge)?;
    Ok(a << count)
}

/// `a >> b` rounds toward negative infinity, like `a // 2**b`.
fn shift_right(a: &BigInt, b: &BigInt) -> Result<BigInt, ArithFault> {
    if b.is_negative() {
        return Err(ArithFault::NegativeShift);
    }
    match b.to_u64().filter(|count| *count <= a.bits()) {
        Some(count) => Ok(a.div_floor(&(BigInt::one() << count))),
        None => Ok(if a.is_negative() {
            BigInt::from(-1)
        } else {
            BigInt::zero()
        }),
    }
}

pub fn compare_ints(op: CmpOp, a: &BigInt, b: &BigInt) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::NotEq => a != b,
        CmpOp::Lt => a < b,
        CmpOp::LtE => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::GtE => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> BigInt {
        BigInt::from(n)
    }

    fn arith(op: BinOp, a: i64, b: i64) -> Result<BigInt, ArithFault> {
        checked_arith(op, &int(a), &int(b))
    }

    #[test]
    fn division_is_euclidean() {
        assert_eq!(arith(BinOp::Div, -7, 2), Ok(int(-4)));
        assert_eq!(arith(BinOp::Mod, -7, 2), Ok(int(1)));
        assert_eq!(arith(BinOp::Div, 7, -2), Ok(int(-3)));
        assert_eq!(arith(BinOp::Mod, 7, -2), Ok(int(1)));
        assert_eq!(arith(BinOp::Div, -7, -2), Ok(int(4)));
        assert_eq!(arith(BinOp::Mod, -7, -2), Ok(int(1)));
        assert_eq!(arith(BinOp::FloorDiv, 9, 2), Ok(int(4)));
    }

    #[test]
    fn division_matches_std_euclid_on_small_values() {
        for a in -20i64..=20 {
            for b in (-6i64..=6).filter(|b| *b != 0) {
                assert_eq!(arith(BinOp::Div, a, b), Ok(int(a.div_euclid(b))), "{a} / {b}");
                assert_eq!(arith(BinOp::Mod, a, b), Ok(int(a.rem_euclid(b))), "{a} % {b}");
            }
        }
    }

    #[test]
    fn machine_word_boundaries_are_exact() {
        let max = int(i64::MAX);
        assert_eq!(arith(BinOp::Add, i64::MAX, 1), Ok(&max + 1));
        assert_eq!(arith(BinOp::Div, i64::MIN, -1), Ok(&max + 1));
        assert_eq!(arith(BinOp::Mul, i64::MAX, i64::MAX), Ok(&max * &max));
        assert_eq!(arith(BinOp::Sub, i64::MIN, 1), Ok(int(i64::MIN) - 1));
    }

    #[test]
    fn faults_are_reported() {
        assert_eq!(arith(BinOp::Div, 1, 0), Err(ArithFault::DivisionByZero));
        assert_eq!(arith(BinOp::Mod, 1, 0), Err(ArithFault::DivisionByZero));
        assert_eq!(arith(BinOp::Pow, 2, -1), Err(ArithFault::NegativeExponent));
        assert_eq!(arith(BinOp::LShift, 1, -1), Err(ArithFault::NegativeShift));
    }

    #[test]
    fn powers() {
        assert_eq!(arith(BinOp::Pow, 3, 4), Ok(int(81)));
        assert_eq!(arith(BinOp::Pow, -2, 3), Ok(int(-8)));
        assert_eq!(arith(BinOp::Pow, 5, 0), Ok(int(1)));
        assert_eq!(arith(BinOp::Pow, 0, 0), Ok(int(1)));
        assert_eq!(arith(BinOp::Pow, -1, i64::MAX), Ok(int(-1)));
        assert_eq!(arith(BinOp::Pow, 1, i64::MAX), Ok(int(1)));
        assert_eq!(arith(BinOp::Pow, 2, 64), Ok(BigInt::one() << 64u32));
    }

    #[test]
    fn large_powers_fold_up_to_the_size_limit() {
        let big = arith(BinOp::Pow, 2, 200_000).unwrap();
        assert_eq!(big.bits(), 200_001);
        assert_eq!(arith(BinOp::Pow, 2, 1 << 21), Err(ArithFault::TooLarge));
        assert_eq!(arith(BinOp::Pow, 10, i64::MAX), Err(ArithFault::TooLarge));
        assert_eq!(
            checked_pow(&int(3), &(int(i64::MAX) * 4)),
            Err(ArithFault::TooLarge)
        );
    }

    #[test]
    fn shifts_follow_python() {
        assert_eq!(arith(BinOp::LShift, 1, 3), Ok(int(8)));
        assert_eq!(arith(BinOp::LShift, -3, 2), Ok(int(-12)));
        assert_eq!(arith(BinOp::LShift, 1, 63), Ok(int(i64::MAX) + 1));
        assert_eq!(arith(BinOp::LShift, 0, i64::MAX), Ok(int(0)));
        assert_eq!(arith(BinOp::LShift, 1, i64::MAX), Err(ArithFault::TooLarge));
        assert_eq!(arith(BinOp::RShift, -5, 1), Ok(int(-3)));
        assert_eq!(arith(BinOp::RShift, -4, 1), Ok(int(-2)));
        assert_eq!(arith(BinOp::RShift, 5, 70), Ok(int(0)));
        assert_eq!(arith(BinOp::RShift, -5, 70), Ok(int(-1)));
        assert_eq!(arith(BinOp::RShift, -5, 3), Ok(int(-1)));
    }

    #[test]
    fn comparisons() {
        assert!(compare_ints(CmpOp::LtE, &int(2), &int(2)));
        assert!(!compare_ints(CmpOp::Gt, &int(2), &int(2)));
        assert!(compare_ints(CmpOp::NotEq, &int(1), &int(2)));
        assert!(compare_ints(CmpOp::Gt, &(int(i64::MAX) + 1), &int(i64::MAX)));
    }
}
