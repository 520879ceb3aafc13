// Copyright (c) 2017-2021 Fabian Schuiki

//! The constant propagation lattice.

use std::fmt;

/// What is known about a value at compile time.
///
/// The values form a flat lattice of height two: `Top` sits above every
/// constant, and every constant sits above `Bottom`. Facts only ever move
/// downwards during the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    /// Not yet known; no evidence has been seen.
    Top,
    /// Known to always hold this value.
    Constant(i64),
    /// Not a compile-time constant.
    Bottom,
}

impl Default for ConstantValue {
    fn default() -> Self {
        ConstantValue::Top
    }
}

impl ConstantValue {
    /// Compute the greatest lower bound of two lattice values.
    ///
    /// `Top` is the identity, equal values meet to themselves, and anything
    /// else meets to `Bottom`.
    pub fn meet(self, other: ConstantValue) -> ConstantValue {
        use ConstantValue::*;
        match (self, other) {
            (Top, x) | (x, Top) => x,
            (Constant(a), Constant(b)) if a == b => Constant(a),
            _ => Bottom,
        }
    }

    /// Check whether this is `Top`.
    pub fn is_top(self) -> bool {
        self == ConstantValue::Top
    }

    /// Check whether this is `Bottom`.
    pub fn is_bottom(self) -> bool {
        self == ConstantValue::Bottom
    }

    /// Check whether this is a constant.
    pub fn is_constant(self) -> bool {
        self.as_constant().is_some()
    }

    /// Return the constant held, if any.
    pub fn as_constant(self) -> Option<i64> {
        match self {
            ConstantValue::Constant(v) => Some(v),
            _ => None,
        }
    }

    /// Check whether `self` lies at or below `other` in the lattice.
    pub fn is_at_or_below(self, other: ConstantValue) -> bool {
        self.meet(other) == self
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConstantValue::Top => write!(f, "{{ TOP }}"),
            ConstantValue::Constant(v) => write!(f, "{{ {} }}", v),
            ConstantValue::Bottom => write!(f, "{{ BOTTOM }}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConstantValue::{self, *};
    use itertools::iproduct;

    fn samples() -> Vec<ConstantValue> {
        vec![Top, Bottom, Constant(0), Constant(1), Constant(-7), Constant(42)]
    }

    #[test]
    fn meet_laws() {
        for a in samples() {
            assert_eq!(a.meet(Top), a, "top is the identity");
            assert_eq!(a.meet(Bottom), Bottom, "bottom absorbs");
            assert_eq!(a.meet(a), a, "meet is idempotent");
        }
        for (a, b) in iproduct!(samples(), samples()) {
            assert_eq!(a.meet(b), b.meet(a), "meet of {:?} and {:?}", a, b);
        }
        for (a, b, c) in iproduct!(samples(), samples(), samples()) {
            assert_eq!(a.meet(b).meet(c), a.meet(b.meet(c)));
        }
    }

    #[test]
    fn distinct_constants_meet_to_bottom() {
        assert_eq!(Constant(3).meet(Constant(4)), Bottom);
        assert_eq!(Constant(3).meet(Constant(3)), Constant(3));
    }

    #[test]
    fn ordering() {
        assert!(Bottom.is_at_or_below(Constant(5)));
        assert!(Constant(5).is_at_or_below(Top));
        assert!(Constant(5).is_at_or_below(Constant(5)));
        assert!(!Constant(5).is_at_or_below(Constant(6)));
        assert!(!Top.is_at_or_below(Constant(5)));
        assert!(!Constant(5).is_at_or_below(Bottom));
    }

    #[test]
    fn display() {
        assert_eq!(Top.to_string(), "{ TOP }");
        assert_eq!(Bottom.to_string(), "{ BOTTOM }");
        assert_eq!(Constant(-3).to_string(), "{ -3 }");
        assert_eq!(ConstantValue::default(), Top);
    }
}
