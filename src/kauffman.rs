//! Skein-template backtracking engine.
//!
//! This resolves the diagram by brute force over Kauffman's skein
//! template algorithm: walk the link, and at each crossing either pass
//! through, switch the crossing, or splice it. Passes are forced when
//! a crossing is first met on its upper strand; a first meeting on the
//! lower strand branches into a switch and, on backtracking, a splice.
//!
//! Every fully resolved state contributes
//! `(-1)^splicesNeg * y^splices * x^writheAdj * delta^(loops - 1)`
//! to the polynomial, where `writheAdj` accumulates `-2 sign` per
//! switch and `-sign` per splice, and `delta` is the loop value.
//!
//! Exponential time, tiny constant factor; the method of choice for
//! small diagrams.

use crate::bitset::BitSet;
use crate::link::{Link, StrandRef};
use crate::poly::Laurent2;

/// Resolution state of a single crossing during the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrossingState {
    /// Not yet visited; if there is a decision to make, try switching first.
    Unseen,
    /// Not yet visited; switching has been tried, splice next.
    Tried,
    /// First met on the upper strand and kept intact; visited once.
    Keep1,
    /// Kept intact; visited twice.
    Keep2,
    /// First met on the lower strand and switched; visited once.
    Switch1,
    /// Switched; visited twice.
    Switch2,
    /// First met on the lower strand and spliced; visited once.
    Splice1,
    /// Spliced; visited twice.
    Splice2,
}

impl CrossingState {
    /// The state after one more visit, arriving on the given strand
    /// (0 lower, 1 upper). A third visit is a logic defect.
    fn advance(self, strand: usize) -> CrossingState {
        match self {
            CrossingState::Unseen => {
                if strand == 1 {
                    CrossingState::Keep1
                } else {
                    CrossingState::Switch1
                }
            }
            CrossingState::Tried => CrossingState::Splice1,
            CrossingState::Keep1 => CrossingState::Keep2,
            CrossingState::Switch1 => CrossingState::Switch2,
            CrossingState::Splice1 => CrossingState::Splice2,
            CrossingState::Keep2 | CrossingState::Switch2 | CrossingState::Splice2 => {
                unreachable!("visiting a crossing for the third time")
            }
        }
    }

    /// The state after undoing the most recent visit. Note that an
    /// undone switch becomes [`Tried`][CrossingState::Tried], not
    /// unseen: the splice branch is explored next.
    fn retreat(self) -> CrossingState {
        match self {
            CrossingState::Keep1 | CrossingState::Splice1 => CrossingState::Unseen,
            CrossingState::Switch1 => CrossingState::Tried,
            CrossingState::Keep2 => CrossingState::Keep1,
            CrossingState::Switch2 => CrossingState::Switch1,
            CrossingState::Splice2 => CrossingState::Splice1,
            CrossingState::Unseen | CrossingState::Tried => {
                unreachable!("backtracking through an unvisited crossing")
            }
        }
    }
}

/// Mutable state of one traversal of the decision tree. Everything the
/// engine touches lives here, so concurrent computations on different
/// links share nothing.
struct Traversal {
    /// Resolution state per crossing.
    state: Vec<CrossingState>,
    /// Arcs already walked, by strand id.
    seen: BitSet,
    /// The strand each closed-off loop started from, for backtracking.
    first: Vec<StrandRef>,
    /// Number of loops closed off so far.
    comp: usize,
    /// Number of arcs walked so far; 2n means fully resolved.
    pos: isize,
    splices: i64,
    splices_neg: i64,
    writhe_adj: i64,
}

/// Computes the HOMFLY-PT polynomial (alpha-z convention) of a diagram
/// with at least one crossing by exhaustive skein resolution.
pub fn homfly_kauffman(link: &Link) -> Laurent2 {
    let n = link.size();
    debug_assert!(n > 0);

    // Zero-crossing unknot components never enter the traversal; they
    // contribute one factor of delta each at the end.
    let unknots = link.trivial_components();

    // The answer is sum_i coeff[i] * delta^(i + unknots), where i is
    // one less than the number of loops in a resolved state (not
    // counting zero-crossing unknots).
    let max_comp_bound = n + link.components().len();
    let mut coeff = vec![Laurent2::zero(); max_comp_bound];
    let mut max_comp = 0;

    let mut t = Traversal {
        state: vec![CrossingState::Unseen; n],
        seen: BitSet::new(2 * n),
        first: vec![StrandRef::default(); max_comp_bound],
        comp: 0,
        pos: 0,
        splices: 0,
        splices_neg: 0,
        writhe_adj: 0,
    };

    // Arcs are processed in a fixed order: crossing 0 lower, crossing 0
    // upper, crossing 1 lower, ... The traversal below explores the
    // whole decision tree iteratively, backtracking in place.
    let mut s = StrandRef::new(0, 0);

    while t.pos >= 0 {
        if t.seen.contains(s.id()) {
            // Closed off a loop of the (possibly spliced) link.
            t.first[t.comp] = s;
            t.comp += 1;

            if t.pos == 2 * n as isize {
                // A fully determined state; record its contribution.
                let mut term = Laurent2::monomial(t.writhe_adj, t.splices);
                if t.splices_neg % 2 != 0 {
                    term.negate();
                }
                coeff[t.comp - 1] += &term;
                if t.comp > max_comp {
                    max_comp = t.comp;
                }

                // Backtrack to the most recent switch that can still
                // become a splice.
                let mut backtrack = true;
                t.comp -= 1;
                while backtrack {
                    t.pos -= 1;
                    if t.pos < 0 {
                        break;
                    }

                    s = link.prev(s);
                    if matches!(
                        t.state[s.crossing()],
                        CrossingState::Splice1 | CrossingState::Splice2
                    ) {
                        s = s.jump();
                    }

                    if !t.seen.contains(s.id()) {
                        // We stepped back past the start of a loop;
                        // resume from where that loop was closed off.
                        t.comp -= 1;
                        s = t.first[t.comp];
                        t.pos += 1;
                        continue;
                    }
                    t.seen.remove(s.id());

                    let c = s.crossing();
                    match t.state[c] {
                        CrossingState::Switch1 => {
                            // Undo the switch; the retreat to Tried sets
                            // up a splice on the way back down.
                            t.writhe_adj += 2 * link.sign(c) as i64;
                            backtrack = false;
                        }
                        CrossingState::Splice1 => {
                            t.splices -= 1;
                            if link.sign(c) < 0 {
                                t.splices_neg -= 1;
                            }
                            t.writhe_adj += link.sign(c) as i64;
                        }
                        _ => {}
                    }
                    t.state[c] = t.state[c].retreat();
                }
                continue;
            }

            // Move on to the next loop: the first arc not yet seen.
            // Note that s currently equals the strand this loop
            // started from.
            for i in s.id() + 1..2 * n {
                if !t.seen.contains(i) {
                    s = StrandRef::from_id(i);
                    break;
                }
            }
        }

        t.seen.insert(s.id());

        let c = s.crossing();
        let next_state = t.state[c].advance(s.strand());
        match t.state[c] {
            CrossingState::Unseen => {
                if s.strand() == 0 {
                    // First met on the lower strand: switch first.
                    t.writhe_adj -= 2 * link.sign(c) as i64;
                }
            }
            CrossingState::Tried => {
                // The switch has been explored; splice instead, jumping
                // to the other strand.
                t.splices += 1;
                if link.sign(c) < 0 {
                    t.splices_neg += 1;
                }
                t.writhe_adj -= link.sign(c) as i64;
                s = s.jump();
            }
            CrossingState::Splice1 => s = s.jump(),
            _ => {}
        }
        t.state[c] = next_state;

        s = link.next(s);
        t.pos += 1;
    }

    // Piece together the final polynomial.
    let delta = Laurent2::delta();
    let mut ans = Laurent2::zero();
    let mut delta_pow = Laurent2::one();
    for _ in 0..unknots {
        delta_pow *= &delta;
    }
    for c in coeff.iter_mut().take(max_comp) {
        if !c.is_zero() {
            *c *= &delta_pow;
            ans += &*c;
        }
        delta_pow *= &delta;
    }

    log::debug!("kauffman: {} crossings -> {}", n, ans);
    ans
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn expect(terms: &[(i64, i64, i64)]) -> Laurent2 {
        let mut p = Laurent2::zero();
        for &(x, y, c) in terms {
            p.set(x, y, c);
        }
        p
    }

    #[test]
    fn test_state_transitions() {
        // advance encodes the whole decision table; retreat undoes it,
        // except that an undone switch waits as Tried for the splice.
        assert_eq!(CrossingState::Unseen.advance(1), CrossingState::Keep1);
        assert_eq!(CrossingState::Unseen.advance(0), CrossingState::Switch1);
        assert_eq!(CrossingState::Tried.advance(0), CrossingState::Splice1);
        assert_eq!(CrossingState::Keep1.advance(0), CrossingState::Keep2);
        assert_eq!(CrossingState::Switch1.retreat(), CrossingState::Tried);
        assert_eq!(CrossingState::Splice1.retreat(), CrossingState::Unseen);
        assert_eq!(CrossingState::Splice2.retreat(), CrossingState::Splice1);
    }

    #[test]
    fn test_single_twists() {
        // A single Reidemeister I twist is an unknot, whichever the
        // sign of the crossing or the order of the two passes.
        for signs in [[1], [-1]] {
            for seq in [vec![1, -1], vec![-1, 1]] {
                let link = Link::from_data(&signs, &[seq.clone()]);
                assert_eq!(
                    homfly_kauffman(&link),
                    Laurent2::one(),
                    "twist {:?} {:?}",
                    signs,
                    seq
                );
            }
        }
    }

    #[test]
    fn test_cancelling_twist_pair() {
        // Two twists of opposite sign still form an unknot.
        let link = Link::from_data(&[1, -1], &[vec![1, -1, 2, -2]]);
        assert_eq!(homfly_kauffman(&link), Laurent2::one());
    }

    #[test]
    fn test_trefoil_right() {
        let link = Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]]);
        let expected = expect(&[(-2, 0, 2), (-4, 0, -1), (-2, 2, 1)]);
        assert_eq!(homfly_kauffman(&link), expected);
    }

    #[test]
    fn test_trefoil_left() {
        let link = Link::from_data(&[-1, -1, -1], &[vec![1, -2, 3, -1, 2, -3]]);
        let expected = expect(&[(2, 0, 2), (4, 0, -1), (2, 2, 1)]);
        assert_eq!(homfly_kauffman(&link), expected);
    }

    #[test]
    fn test_hopf_positive() {
        let link = Link::from_data(&[1, 1], &[vec![1, -2], vec![-1, 2]]);
        let expected = expect(&[(-1, 1, 1), (-1, -1, 1), (-3, -1, -1)]);
        assert_eq!(homfly_kauffman(&link), expected);
    }

    #[test]
    fn test_hopf_negative() {
        let link = Link::from_data(&[-1, -1], &[vec![1, -2], vec![-1, 2]]);
        let expected = expect(&[(1, 1, -1), (1, -1, -1), (3, -1, 1)]);
        assert_eq!(homfly_kauffman(&link), expected);
    }

    #[test]
    fn test_figure_eight() {
        let link = Link::from_data(&[1, 1, -1, -1], &[vec![-1, 2, -3, 4, -2, 1, -4, 3]]);
        let expected = expect(&[(2, 0, 1), (-2, 0, 1), (0, 0, -1), (0, 2, -1)]);
        assert_eq!(homfly_kauffman(&link), expected);
    }

    #[test]
    fn test_trefoil_with_trivial_component() {
        // A split unknot multiplies the answer by delta.
        let link = Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3], vec![]]);
        let mut expected = expect(&[(-2, 0, 2), (-4, 0, -1), (-2, 2, 1)]);
        expected *= &Laurent2::delta();
        assert_eq!(homfly_kauffman(&link), expected);
    }
}
