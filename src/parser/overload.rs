//! Rank-based overload resolution (§4.2).
//!
//! Grounded on the real effect compiler's `GetTypeRank`/`GetCallRanks`/
//! `CompareFunctions`: the promotion-cost matrix there only covers
//! int/uint/float/double; this implementation extends it to the full
//! six-member lattice `bool < int < uint < half < float < double` used by
//! the rest of this crate's type system (see DESIGN.md).

use crate::ast::{BaseClass, Type};

/// `ranks[src][dst]`, indexed by [`BaseClass::promotion_rank`]. Diagonal is
/// zero (no cost, exact match); moving toward `double` is progressively
/// cheaper than moving away from it, mirroring "widening is cheap, narrowing
/// is expensive".
const PROMOTION_COST: [[u32; 6]; 6] = [
    // from Bool
    [0, 1, 2, 3, 4, 5],
    // from Int
    [6, 0, 1, 2, 3, 4],
    // from Uint
    [7, 6, 0, 1, 2, 3],
    // from Half
    [8, 7, 6, 0, 1, 2],
    // from Float
    [9, 8, 7, 6, 0, 1],
    // from Double
    [10, 9, 8, 7, 6, 0],
];

/// Rank of converting a value of type `actual` to a parameter of type
/// `formal`. Zero means "not viable"; otherwise lower is better.
pub fn type_rank(actual: &Type, formal: &Type) -> u32 {
    if actual.is_array() != formal.is_array() || actual.array_length != formal.array_length {
        return 0;
    }
    if actual.base_class == BaseClass::Struct || formal.base_class == BaseClass::Struct {
        return if actual.definition == formal.definition && actual.definition.is_some() {
            1
        } else {
            0
        };
    }
    if !actual.base_class.is_numeric() || !formal.base_class.is_numeric() {
        return if actual.base_class == formal.base_class
            && actual.rows == formal.rows
            && actual.cols == formal.cols
        {
            1
        } else {
            0
        };
    }

    if actual.base_class == formal.base_class && actual.rows == formal.rows && actual.cols == formal.cols
    {
        return 1;
    }

    let promotion = PROMOTION_COST[actual.base_class.promotion_rank() as usize]
        [formal.base_class.promotion_rank() as usize];

    let shape_bit = if actual.is_scalar() && !formal.is_scalar() {
        // Scalar broadcasts to a vector/matrix formal parameter.
        2
    } else if !actual.is_scalar() && formal.is_scalar() {
        // Vector/matrix contracted down to a scalar formal parameter: not
        // allowed by implicit conversion.
        return 0;
    } else if actual.rows >= formal.rows && actual.cols >= formal.cols {
        if actual.rows > formal.rows || actual.cols > formal.cols {
            32
        } else {
            0
        }
    } else {
        // Formal parameter is larger on some axis than the actual argument:
        // not a valid implicit conversion.
        return 0;
    };

    ((promotion << 2) | shape_bit).max(1)
}

/// Per-argument ranks for a candidate call. Returns `None` if any argument is
/// not viable (rank 0) or arity mismatches.
pub fn call_ranks(actual: &[Type], formal: &[Type]) -> Option<Vec<u32>> {
    if actual.len() != formal.len() {
        return None;
    }
    let mut ranks = Vec::with_capacity(actual.len());
    for (a, f) in actual.iter().zip(formal) {
        let r = type_rank(a, f);
        if r == 0 {
            return None;
        }
        ranks.push(r);
    }
    Some(ranks)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Better,
    Worse,
    Ambiguous,
}

/// Compares two viable candidates by sorting their rank vectors descending
/// and comparing lexicographically: the candidate with the lexicographically
/// smaller sorted vector is the better match.
pub fn compare_candidates(a: &[u32], b: &[u32]) -> Comparison {
    let mut sa = a.to_vec();
    let mut sb = b.to_vec();
    sa.sort_unstable_by(|x, y| y.cmp(x));
    sb.sort_unstable_by(|x, y| y.cmp(x));

    match sa.cmp(&sb) {
        std::cmp::Ordering::Less => Comparison::Better,
        std::cmp::Ordering::Greater => Comparison::Worse,
        std::cmp::Ordering::Equal => Comparison::Ambiguous,
    }
}

/// Picks the best candidate among a set of viable rank vectors, by index.
/// Returns `Ok(index)` for a unique winner, `Err(())` for "no viable
/// candidate" (empty input) or an ambiguous tie among the best.
pub fn resolve_best(candidates: &[Vec<u32>]) -> Result<usize, OverloadError> {
    if candidates.is_empty() {
        return Err(OverloadError::NoMatch);
    }

    let mut best = 0;
    let mut ambiguous_with: Vec<usize> = Vec::new();

    for i in 1..candidates.len() {
        match compare_candidates(&candidates[i], &candidates[best]) {
            Comparison::Better => {
                best = i;
                ambiguous_with.clear();
            }
            Comparison::Worse => {}
            Comparison::Ambiguous => ambiguous_with.push(i),
        }
    }

    if ambiguous_with.is_empty() {
        Ok(best)
    } else {
        Err(OverloadError::Ambiguous)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadError {
    NoMatch,
    Ambiguous,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BaseClass;

    #[test]
    fn exact_match_ranks_one() {
        let t = Type::scalar(BaseClass::Float);
        assert_eq!(type_rank(&t, &t), 1);
    }

    #[test]
    fn scalar_to_vector_is_viable_but_costly() {
        let scalar = Type::scalar(BaseClass::Float);
        let vector = Type::vector(BaseClass::Float, 2);
        assert!(type_rank(&scalar, &vector) > 1);
    }

    #[test]
    fn vector_to_scalar_formal_is_not_viable() {
        let vector = Type::vector(BaseClass::Float, 2);
        let scalar = Type::scalar(BaseClass::Float);
        assert_eq!(type_rank(&vector, &scalar), 0);
    }

    #[test]
    fn overload_pick_prefers_matching_shape() {
        // f(float) and f(float2), called with a float2 argument: the
        // float2 overload matches exactly and must win.
        let arg = Type::vector(BaseClass::Float, 2);
        let scalar_formal = [Type::scalar(BaseClass::Float)];
        let vector_formal = [Type::vector(BaseClass::Float, 2)];

        // Scalar formal is not viable for a vector argument under our rule
        // (contraction), so only the vector candidate survives.
        assert!(call_ranks(&[arg.clone()], &scalar_formal).is_none());
        let vector_ranks = call_ranks(&[arg], &vector_formal).unwrap();
        assert_eq!(vector_ranks, vec![1]);
    }

    #[test]
    fn ambiguous_candidates_detected() {
        // g(int, float) vs g(float, int) called with (1, 1) converted to
        // (int, int): each has one exact + one promotion, so the sorted
        // rank vectors tie.
        let int_t = Type::scalar(BaseClass::Int);
        let float_t = Type::scalar(BaseClass::Float);

        let args = [int_t.clone(), int_t.clone()];
        let c1 = call_ranks(&args, &[int_t.clone(), float_t.clone()]).unwrap();
        let c2 = call_ranks(&args, &[float_t, int_t]).unwrap();

        assert_eq!(compare_candidates(&c1, &c2), Comparison::Ambiguous);
        assert_eq!(resolve_best(&[c1, c2]), Err(OverloadError::Ambiguous));
    }

    #[test]
    fn unique_winner_resolves() {
        let exact = vec![1, 1];
        let promoted = vec![1, 5];
        assert_eq!(resolve_best(&[exact, promoted]), Ok(0));
    }
}
