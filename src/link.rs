//! Combinatorial view of an oriented link diagram.
//!
//! A diagram is a set of crossings, each with a sign and two strands
//! passing through it (lower and upper), plus the wiring that says
//! which strand follows which when walking along the link.

use std::cell::OnceCell;
use std::fmt;

use crate::poly::Laurent2;

/// A reference to one of the two strands passing through a crossing.
///
/// `strand` is 0 for the lower strand and 1 for the upper strand.
/// The reference also identifies the arc that *exits* the crossing at
/// that level; [`Link::next`] follows this arc to the point where it
/// enters the next crossing.
///
/// Strand references are totally ordered by [`id`][StrandRef::id].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrandRef {
    crossing: usize,
    strand: usize,
}

impl StrandRef {
    pub fn new(crossing: usize, strand: usize) -> Self {
        assert!(strand < 2, "strand must be 0 (lower) or 1 (upper)");
        Self { crossing, strand }
    }

    /// Recovers a strand reference from its numeric id.
    pub fn from_id(id: usize) -> Self {
        Self {
            crossing: id / 2,
            strand: id % 2,
        }
    }

    /// The index of the crossing this strand passes through.
    #[inline]
    pub fn crossing(&self) -> usize {
        self.crossing
    }

    /// 0 for the lower strand, 1 for the upper strand.
    #[inline]
    pub fn strand(&self) -> usize {
        self.strand
    }

    /// The unique id of this strand: `2 * crossing + strand`.
    #[inline]
    pub fn id(&self) -> usize {
        2 * self.crossing + self.strand
    }

    /// The other strand at the same crossing.
    #[inline]
    pub fn jump(self) -> Self {
        Self {
            crossing: self.crossing,
            strand: 1 - self.strand,
        }
    }
}

impl fmt::Display for StrandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            if self.strand == 1 { '^' } else { '_' },
            self.crossing
        )
    }
}

#[derive(Debug, Clone)]
struct Crossing {
    sign: i32,
    next: [StrandRef; 2],
    prev: [StrandRef; 2],
}

/// An oriented link diagram.
///
/// Components with no crossings at all (zero-crossing unknots) are
/// recorded separately, since they have no strands to wire up.
#[derive(Debug)]
pub struct Link {
    crossings: Vec<Crossing>,
    /// One entry per link component: the first strand of the component,
    /// or `None` for a zero-crossing unknot.
    components: Vec<Option<StrandRef>>,
    pub(crate) homfly_az: OnceCell<Laurent2>,
    pub(crate) homfly_lm: OnceCell<Laurent2>,
}

impl Link {
    /// Builds a diagram from crossing signs and per-component strand
    /// sequences.
    ///
    /// Each sign must be `+1` or `-1`. Each component is the sequence
    /// of crossings the component passes through, in order: the entry
    /// `±(i + 1)` means the component passes through crossing `i`
    /// (0-based), on the upper strand if positive and on the lower
    /// strand if negative. An empty sequence denotes a zero-crossing
    /// unknot component.
    ///
    /// Panics if any strand is missed or used more than once. The data
    /// must describe a classical planar diagram: sequences that are
    /// combinatorially consistent but not realisable in the plane
    /// (virtual diagrams) are accepted, and the result of any
    /// computation on them is unspecified.
    ///
    /// ```
    /// use homfly_rs::link::Link;
    ///
    /// let trefoil = Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]]);
    /// assert_eq!(trefoil.size(), 3);
    /// ```
    pub fn from_data(signs: &[i32], components: &[Vec<i32>]) -> Self {
        let n = signs.len();
        for &s in signs {
            assert!(s == 1 || s == -1, "crossing sign must be +1 or -1, got {}", s);
        }

        let mut crossings: Vec<Crossing> = signs
            .iter()
            .map(|&sign| Crossing {
                sign,
                next: [StrandRef::default(); 2],
                prev: [StrandRef::default(); 2],
            })
            .collect();

        let mut used = vec![false; 2 * n];
        let mut starts = Vec::with_capacity(components.len());

        for comp in components {
            if comp.is_empty() {
                starts.push(None);
                continue;
            }
            let strands: Vec<StrandRef> = comp
                .iter()
                .map(|&e| {
                    assert!(
                        e != 0 && e.unsigned_abs() as usize <= n,
                        "crossing reference {} out of range",
                        e
                    );
                    StrandRef::new(e.unsigned_abs() as usize - 1, usize::from(e > 0))
                })
                .collect();
            for s in &strands {
                assert!(!used[s.id()], "strand {} used more than once", s);
                used[s.id()] = true;
            }
            for i in 0..strands.len() {
                let a = strands[i];
                let b = strands[(i + 1) % strands.len()];
                crossings[a.crossing()].next[a.strand()] = b;
                crossings[b.crossing()].prev[b.strand()] = a;
            }
            starts.push(Some(strands[0]));
        }

        assert!(
            used.iter().all(|&u| u),
            "every crossing must be passed once from above and once from below"
        );

        Self {
            crossings,
            components: starts,
            homfly_az: OnceCell::new(),
            homfly_lm: OnceCell::new(),
        }
    }

    /// The number of crossings.
    #[inline]
    pub fn size(&self) -> usize {
        self.crossings.len()
    }

    /// The sign (`+1` or `-1`) of the given crossing.
    #[inline]
    pub fn sign(&self, crossing: usize) -> i32 {
        self.crossings[crossing].sign
    }

    /// Follows the arc exiting `s` to where it enters the next crossing.
    #[inline]
    pub fn next(&self, s: StrandRef) -> StrandRef {
        self.crossings[s.crossing()].next[s.strand()]
    }

    /// The strand whose exiting arc enters the diagram at `s`.
    #[inline]
    pub fn prev(&self, s: StrandRef) -> StrandRef {
        self.crossings[s.crossing()].prev[s.strand()]
    }

    /// The starting strands of all components (`None` marks a
    /// zero-crossing unknot).
    #[inline]
    pub fn components(&self) -> &[Option<StrandRef>] {
        &self.components
    }

    /// The number of zero-crossing unknot components.
    pub fn trivial_components(&self) -> usize {
        self.components.iter().filter(|c| c.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_ref() {
        let s = StrandRef::new(3, 1);
        assert_eq!(s.id(), 7);
        assert_eq!(StrandRef::from_id(7), s);
        assert_eq!(s.jump(), StrandRef::new(3, 0));
        assert_eq!(s.jump().jump(), s);
        assert!(StrandRef::new(1, 0) < StrandRef::new(1, 1));
        assert_eq!(s.to_string(), "^3");
        assert_eq!(s.jump().to_string(), "_3");
    }

    #[test]
    fn test_trefoil_wiring() {
        let link = Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]]);
        assert_eq!(link.size(), 3);
        assert_eq!(link.components().len(), 1);
        assert_eq!(link.trivial_components(), 0);

        // Walking from the start must visit all 6 strands and return.
        let start = StrandRef::new(0, 1);
        assert_eq!(link.components()[0], Some(start));
        let mut s = start;
        for _ in 0..6 {
            assert_eq!(link.prev(link.next(s)), s);
            s = link.next(s);
        }
        assert_eq!(s, start);
    }

    #[test]
    fn test_hopf_components() {
        let link = Link::from_data(&[1, 1], &[vec![1, -2], vec![-1, 2]]);
        assert_eq!(link.size(), 2);
        assert_eq!(link.components().len(), 2);
        assert_eq!(link.next(StrandRef::new(0, 1)), StrandRef::new(1, 0));
        assert_eq!(link.next(StrandRef::new(1, 0)), StrandRef::new(0, 1));
    }

    #[test]
    fn test_unlink() {
        let link = Link::from_data(&[], &[vec![], vec![], vec![]]);
        assert_eq!(link.size(), 0);
        assert_eq!(link.trivial_components(), 3);
    }

    #[test]
    #[should_panic(expected = "used more than once")]
    fn test_duplicate_strand() {
        Link::from_data(&[1], &[vec![1, 1]]);
    }

    #[test]
    #[should_panic(expected = "every crossing must be passed")]
    fn test_missing_strand() {
        Link::from_data(&[1, 1], &[vec![1, -1]]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range() {
        Link::from_data(&[1], &[vec![1, -2]]);
    }
}
