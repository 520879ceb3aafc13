// Copyright (c) 2017-2021 Fabian Schuiki

//! Types of values.

use std::fmt;

/// The type of a value.
///
/// Only scalar integers carry data. Instructions of `void` type produce no
/// result.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    /// The `void` type.
    Void,
    /// Integer types like `i32`.
    Int(usize),
}

/// Create a void type.
pub fn void_ty() -> Type {
    Type::Void
}

/// Create an integer type of the requested width.
///
/// Panics if the width is not between 1 and 64.
pub fn int_ty(width: usize) -> Type {
    assert!(
        width >= 1 && width <= 64,
        "integer width {} out of range",
        width
    );
    Type::Int(width)
}

impl Type {
    /// Check if this is a void type.
    pub fn is_void(self) -> bool {
        self == Type::Void
    }

    /// Check if this is an integer type.
    pub fn is_int(self) -> bool {
        match self {
            Type::Int(_) => true,
            _ => false,
        }
    }

    /// Return the width of an integer type, or panic.
    pub fn unwrap_int(self) -> usize {
        match self {
            Type::Int(w) => w,
            _ => panic!("unwrap_int called on {}", self),
        }
    }

    /// Bring an integer into the canonical form for values of this type.
    ///
    /// The value is truncated to the type's width and sign-extended back to 64
    /// bits, except for `i1` which holds 0 or 1.
    pub fn canonical_int(self, value: i64) -> i64 {
        match self {
            Type::Int(1) => value & 1,
            Type::Int(w) if w < 64 => {
                let shift = 64 - w as u32;
                (value << shift) >> shift
            }
            _ => value,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Type::Void => write!(f, "void"),
            Type::Int(w) => write!(f, "i{}", w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ints() {
        assert_eq!(int_ty(8).canonical_int(255), -1);
        assert_eq!(int_ty(8).canonical_int(128), -128);
        assert_eq!(int_ty(32).canonical_int(1 << 31), -(1 << 31));
        assert_eq!(int_ty(1).canonical_int(-1), 1);
        assert_eq!(int_ty(1).canonical_int(2), 0);
        assert_eq!(int_ty(64).canonical_int(i64::min_value()), i64::min_value());
    }
}
