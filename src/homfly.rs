//! HOMFLY-PT polynomial entry points.
//!
//! The polynomial is exposed in two variable conventions. The `az`
//! form uses the variables (alpha, z) of the skein relation
//! `alpha P(L+) - alpha^-1 P(L-) = z P(L0)`; the `lm` form substitutes
//! `l = i alpha^-1`, `m = i z`, which negates every term whose exponent
//! difference is 2 modulo 4.
//!
//! Results are cached on the link, so repeated queries are free.

use crate::kauffman::homfly_kauffman;
use crate::link::Link;
use crate::poly::Laurent2;
use crate::treewidth::homfly_treewidth;

/// The engine used to resolve a diagram with at least one crossing.
///
/// Both engines compute the same polynomial. The backtracking engine
/// has a tiny constant factor but runs in time exponential in the
/// number of crossings; the treewidth engine is exponential only in
/// the width of a tree decomposition of the diagram, at the cost of
/// potentially large dynamic programming tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// Exhaustive resolution via Kauffman's skein template algorithm.
    #[default]
    Backtrack,
    /// Dynamic programming over a nice tree decomposition.
    Treewidth,
}

/// Converts between the (alpha, z) and (l, m) conventions by negating
/// every term whose exponent difference is not divisible by 4. The
/// difference is always even, so this map is its own inverse.
fn flip_convention(from: &Laurent2) -> Laurent2 {
    let mut ans = Laurent2::zero();
    for ((x, y), c) in from.terms() {
        if (x - y) % 4 != 0 {
            ans.set(x, y, -c.clone());
        } else {
            ans.set(x, y, c.clone());
        }
    }
    ans
}

impl Link {
    /// The HOMFLY-PT polynomial of this link in the (alpha, z)
    /// convention.
    ///
    /// Diagrams without crossings are answered in closed form: the
    /// empty link maps to zero, and an n-component unlink to
    /// delta^(n-1). Everything else is dispatched to the chosen
    /// engine.
    ///
    /// The result is cached; the engine choice only matters on the
    /// first call for a given link.
    pub fn homfly_az(&self, alg: Algorithm) -> &Laurent2 {
        self.homfly_az.get_or_init(|| {
            if self.size() == 0 {
                if self.components().is_empty() {
                    return Laurent2::zero();
                }

                // An unlink with no crossings at all.
                let delta = Laurent2::delta();
                let mut ans = Laurent2::one();
                for _ in 1..self.components().len() {
                    ans *= &delta;
                }
                return ans;
            }

            match alg {
                Algorithm::Backtrack => homfly_kauffman(self),
                Algorithm::Treewidth => homfly_treewidth(self, true),
            }
        })
    }

    /// The HOMFLY-PT polynomial of this link in the (l, m) convention.
    ///
    /// Derived from [`homfly_az`][Link::homfly_az] on first use and
    /// cached separately.
    pub fn homfly_lm(&self, alg: Algorithm) -> &Laurent2 {
        self.homfly_lm
            .get_or_init(|| flip_convention(self.homfly_az(alg)))
    }

    /// The HOMFLY-PT polynomial in the default (alpha, z) convention.
    pub fn homfly(&self, alg: Algorithm) -> &Laurent2 {
        self.homfly_az(alg)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn trefoil() -> Link {
        Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]])
    }

    #[test]
    fn test_empty_link() {
        let link = Link::from_data(&[], &[]);
        assert!(link.homfly_az(Algorithm::Backtrack).is_zero());
    }

    #[test]
    fn test_unlinks() {
        // An n-component unlink maps to delta^(n-1).
        let delta = Laurent2::delta();
        let mut expected = Laurent2::one();
        for n in 1..=4 {
            let link = Link::from_data(&[], &vec![Vec::new(); n]);
            assert_eq!(link.homfly_az(Algorithm::Treewidth), &expected);
            expected *= &delta;
        }
    }

    #[test]
    fn test_unknot() {
        let link = Link::from_data(&[1], &[vec![1, -1]]);
        assert_eq!(link.homfly(Algorithm::Backtrack), &Laurent2::one());
    }

    #[test]
    fn test_trefoil_az() {
        let mut expected = Laurent2::zero();
        expected.set(-2, 0, 2);
        expected.set(-4, 0, -1);
        expected.set(-2, 2, 1);
        for alg in [Algorithm::Backtrack, Algorithm::Treewidth] {
            assert_eq!(trefoil().homfly_az(alg), &expected);
        }
    }

    #[test]
    fn test_trefoil_lm() {
        let mut expected = Laurent2::zero();
        expected.set(-2, 0, -2);
        expected.set(-4, 0, -1);
        expected.set(-2, 2, 1);
        assert_eq!(trefoil().homfly_lm(Algorithm::Backtrack), &expected);
    }

    #[test]
    fn test_convention_flip_involution() {
        let link = trefoil();
        let az = link.homfly_az(Algorithm::Backtrack);
        assert_eq!(&flip_convention(&flip_convention(az)), az);
    }

    #[test]
    fn test_caching() {
        let link = trefoil();
        let first = link.homfly_az(Algorithm::Backtrack) as *const Laurent2;
        // The second call returns the cached value, whatever the
        // requested engine.
        let second = link.homfly_az(Algorithm::Treewidth) as *const Laurent2;
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_algorithm() {
        assert_eq!(Algorithm::default(), Algorithm::Backtrack);
    }
}
