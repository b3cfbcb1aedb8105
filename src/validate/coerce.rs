//! The two-pass coercion lattice used while matching an overload signature
//! against its actual argument types.
//!
//! Pass 1 widens a scalar `int` to `float` (never the reverse — narrowing
//! never happens implicitly). Pass 2 widens an int vector to the
//! same-lane-count float vector. Each pass is tried independently; a
//! signature match only ever needs one coercion per argument, never both
//! stacked, since a scalar that needed pass 1 is by definition not a
//! vector pass 2 would touch.

use crate::ir::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    None,
    ScalarIntToFloat,
    VectorIntToFloat,
}

/// Can `from` stand in for `to` in an overload's declared input type,
/// and if so, via which coercion? `None` means no coercion is needed
/// (`from == to`); `Some(_)` names which pass applied.
pub fn coercion_from_to(from: &DataType, to: &DataType) -> Option<Coercion> {
    if from == to {
        return Some(Coercion::None);
    }
    // Pass 1: scalar int -> float.
    if *from == DataType::Int && *to == DataType::Float {
        return Some(Coercion::ScalarIntToFloat);
    }
    // Pass 2: int vector -> float vector of the same lane count.
    if let (Some(fl), Some(tl)) = (from.lanes(), to.lanes()) {
        if fl == tl && fl > 1 && from.is_int_family() && to.is_float_family() {
            return Some(Coercion::VectorIntToFloat);
        }
    }
    None
}

/// `true` when a binary op must reject this operand pair outright, even
/// though each operand individually has a valid coercion path to some
/// shared type: mixing an int vector with a float vector (lane counts
/// equal or not) is never allowed for the ops in
/// [`crate::schema::STRICT_BINARY_OPS`], only scalar/vector broadcast
/// and same-family pairs are.
pub fn violates_strict_vector_rule(op: &str, a: &DataType, b: &DataType) -> bool {
    if !crate::schema::STRICT_BINARY_OPS.contains(&op) {
        return false;
    }
    let a_is_vec = matches!(a.lanes(), Some(n) if n > 1);
    let b_is_vec = matches!(b.lanes(), Some(n) if n > 1);
    if a_is_vec && b_is_vec {
        return a.is_int_family() != b.is_int_family();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_int_widens_to_float() {
        assert_eq!(coercion_from_to(&DataType::Int, &DataType::Float), Some(Coercion::ScalarIntToFloat));
    }

    #[test]
    fn float_never_narrows_to_int() {
        assert_eq!(coercion_from_to(&DataType::Float, &DataType::Int), None);
    }

    #[test]
    fn int_vector_widens_to_float_vector_of_same_lanes() {
        assert_eq!(
            coercion_from_to(&DataType::Int3, &DataType::Float3),
            Some(Coercion::VectorIntToFloat)
        );
        assert_eq!(coercion_from_to(&DataType::Int3, &DataType::Float4), None);
    }

    #[test]
    fn mixed_int_and_float_vectors_violate_strict_ops_but_not_others() {
        assert!(violates_strict_vector_rule("math_add", &DataType::Int3, &DataType::Float3));
        assert!(!violates_strict_vector_rule("vec_dot", &DataType::Int3, &DataType::Float3));
    }

    #[test]
    fn scalar_broadcast_does_not_trip_the_strict_rule() {
        assert!(!violates_strict_vector_rule("math_add", &DataType::Float3, &DataType::Float));
    }
}
