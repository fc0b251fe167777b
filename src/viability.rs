//! Viability oracle for the fixed-parameter engine.
//!
//! A key at some bag of the tree decomposition records, in traversal
//! order, the strands that cross the border of the forgotten zone.
//! Most candidate keys can never be completed into a full traversal of
//! the link; this module detects (a superset of) the completable ones
//! so that the dynamic programming tables stay small.
//!
//! The oracle may accept a key that later turns out to be useless, but
//! it must never reject a key that some full traversal realises:
//! pruning must not change the polynomial.

use crate::link::{Link, StrandRef};
use crate::tree::{BagKind, TreeDecomposition};

/// Pre-computed tables for viability testing.
///
/// The per-link tables are filled once in [`ViabilityData::new`]; the
/// per-bag scratch is refreshed by [`init_forget_bag`] and
/// [`init_join_bag`] as the dynamic programming walks the tree.
///
/// [`init_forget_bag`]: ViabilityData::init_forget_bag
/// [`init_join_bag`]: ViabilityData::init_join_bag
pub struct ViabilityData<'a> {
    link: &'a Link,

    /// For each crossing, the index of the bag at which it is forgotten.
    forget_crossing: Vec<i32>,

    /// For each strand id, the endpoint crossing that is forgotten later.
    last_crossing: Vec<i32>,

    /// For each strand id, the bag index at which the entire strand is
    /// forgotten (i.e. where its later endpoint is forgotten).
    forget_strand: Vec<i32>,

    /// The first steps of any traversal are forced for as long as only
    /// pass moves are performed, starting from the root crossing's
    /// upper strand. For each strand id, its position among these
    /// forced steps, or -1 if it is not forced.
    prefix: Vec<i32>,

    /// For each crossing in the current bag, a bitmask of its strands
    /// that border the forgotten zone: 1 = lower incoming from the
    /// zone, 2 = upper incoming from the zone, 4 = lower outgoing into
    /// the zone, 8 = upper outgoing into the zone.
    mask: Vec<u8>,

    /// Number of pairs in a join-bag key (half the key length).
    pairs: usize,

    // Stacks of intermediate values for partial_key_viable(), indexed
    // by pair position with a sentinel at [pairs]. Keeping the history
    // around lets the join-bag search backtrack without recomputation.
    max_forget: Vec<i32>,
    need_start_loop: Vec<i32>,
    could_end_loop: Vec<i32>,
}

impl<'a> ViabilityData<'a> {
    pub fn new(link: &'a Link, d: &TreeDecomposition) -> Self {
        let n = link.size();

        let mut forget_crossing = vec![-1; n];
        for (index, bag) in d.bags().iter().enumerate() {
            if let BagKind::Forget(c) = bag.kind {
                forget_crossing[c] = index as i32;
            }
        }

        let mut last_crossing = vec![-1; 2 * n];
        let mut forget_strand = vec![-1; 2 * n];
        for id in 0..2 * n {
            let from = id / 2;
            let to = link.next(StrandRef::from_id(id)).crossing();
            if forget_crossing[from] >= forget_crossing[to] {
                last_crossing[id] = from as i32;
                forget_strand[id] = forget_crossing[from];
            } else {
                last_crossing[id] = to as i32;
                forget_strand[id] = forget_crossing[to];
            }
        }

        // Follow the traversal from the root crossing's upper strand
        // for as long as every move is a forced pass.
        let mut prefix = vec![-1; 2 * n];
        let start = StrandRef::new(d.root_crossing(), 1);
        let mut s = start;
        let mut pos = 0;
        loop {
            prefix[s.id()] = pos;
            pos += 1;
            s = link.next(s);
            if s == start {
                // Closed off a whole link component.
                break;
            }
            if s.strand() == 0 && prefix[s.id() | 1] < 0 {
                // Entering a crossing from below before its upper
                // strand has been seen: not a forced pass.
                break;
            }
        }

        Self {
            link,
            forget_crossing,
            last_crossing,
            forget_strand,
            prefix,
            mask: vec![0; n],
            pairs: 0,
            max_forget: Vec::new(),
            need_start_loop: Vec::new(),
            could_end_loop: Vec::new(),
        }
    }

    /// Refreshes the per-bag masks for a forget bag at index
    /// `bag_index` that forgets the crossing `forget`. `child_key` is
    /// any key of the child bag (all keys of a bag touch the same
    /// strands).
    pub fn init_forget_bag(&mut self, bag_index: usize, child_key: &[usize], forget: usize) {
        self.mask.iter_mut().for_each(|m| *m = 0);

        // Strands in the child key where one endpoint is forgotten and
        // the other is not.
        for &id in child_key {
            let from = StrandRef::from_id(id);
            let to = self.link.next(from);

            if from.crossing() == forget || to.crossing() == forget {
                // The entire strand is lost in this (the parent) bag.
                continue;
            }

            if self.last_crossing[id] == from.crossing() as i32 {
                // Runs from the bag into the forgotten zone.
                self.mask[from.crossing()] |= if from.strand() == 0 { 4 } else { 8 };
            } else {
                // Runs from the forgotten zone into the bag.
                self.mask[to.crossing()] |= if to.strand() == 0 { 1 } else { 2 };
            }
        }

        // Strands between the newly forgotten crossing and the bag.
        for i in 0..2 {
            let to = self.link.next(StrandRef::new(forget, i));
            if self.forget_crossing[to.crossing()] > bag_index as i32 {
                self.mask[to.crossing()] |= if to.strand() == 0 { 1 } else { 2 };
            }

            let from = self.link.prev(StrandRef::new(forget, i));
            if self.forget_crossing[from.crossing()] > bag_index as i32 {
                self.mask[from.crossing()] |= if from.strand() == 0 { 4 } else { 8 };
            }
        }
    }

    /// Refreshes the per-bag masks and the partial-key stacks for a
    /// join bag whose children hold the given keys.
    pub fn init_join_bag(&mut self, left_key: &[usize], right_key: &[usize]) {
        self.mask.iter_mut().for_each(|m| *m = 0);

        for key in [left_key, right_key] {
            for &id in key {
                let from = StrandRef::from_id(id);
                let to = self.link.next(from);

                if self.last_crossing[id] == from.crossing() as i32 {
                    self.mask[from.crossing()] |= if from.strand() == 0 { 4 } else { 8 };
                } else {
                    self.mask[to.crossing()] |= if to.strand() == 0 { 1 } else { 2 };
                }
            }
        }

        self.pairs = (left_key.len() + right_key.len()) / 2;
        self.max_forget = vec![-1; self.pairs + 1];
        self.need_start_loop = vec![-1; self.pairs + 1];
        self.could_end_loop = vec![-1; self.pairs + 1];
    }

    /// Whether the strands at positions `pos - 1` and `pos` of the key
    /// could follow one another in some traversal of the link. `pos`
    /// must be even, between 0 and `key.len()` inclusive.
    fn could_connect(&self, key: &[usize], pos: usize) -> bool {
        if pos == 0 || pos >= key.len() {
            return false;
        }
        let enter = key[pos] / 2;
        if self.last_crossing[key[pos - 1]] != enter as i32 {
            return false;
        }
        if self.mask[enter] != 6
            && self.link.next(StrandRef::from_id(key[pos - 1])).strand() == 1
            && key[pos] & 1 == 0
        {
            // Entering on the upper strand but exiting on the lower:
            // only possible on the second visit to the crossing, so it
            // must not appear again later in the key.
            //
            // If mask == 6 these two strands are the only ones in the
            // key touching the crossing and the scan can be skipped.
            for &later in &key[pos + 1..] {
                if self.last_crossing[later] == enter as i32 {
                    return false;
                }
            }
        }
        true
    }

    /// Checks `key[pos]` against the forced traversal prefix. Returns
    /// `false` if the placement is inconsistent with the forced steps.
    fn verify_prefix(&self, key: &[usize], pos: usize) -> bool {
        if self.prefix[key[pos]] < 0 {
            // If key[pos] is not forced, key[pos + 1] must not be either.
            return pos == key.len() - 1 || self.prefix[key[pos + 1]] < 0;
        }

        // A forced strand needs enough room before it in the key for
        // the forced steps that precede it.
        if self.prefix[key[pos]] < pos as i32 {
            return false;
        }

        // Consecutive forced strands must appear in forced order.
        pos == key.len() - 1
            || self.prefix[key[pos + 1]] < 0
            || self.prefix[key[pos + 1]] > self.prefix[key[pos]]
    }

    /// Tests whether the data from the given key might survive all the
    /// way up to the root of the tree decomposition. Requires
    /// [`init_forget_bag`][ViabilityData::init_forget_bag] to have set
    /// up the masks for the current bag.
    pub fn key_viable(&self, key: &[usize]) -> bool {
        let n = key.len();

        // Of the strands scanned so far that run between a bag crossing
        // and the forgotten zone, the highest bag at which such a
        // crossing is forgotten.
        let mut max_forget: i32 = -1;

        // If non-negative: we still need to find the beginning of a
        // closed-off loop that ends at this crossing. The crossing id
        // is shifted left one bit; the low bit is 1 if the loop must
        // start on the crossing's upper strand.
        let mut need_start_loop: i32 = -1;

        // If non-negative: the unique crossing that could end a
        // closed-off loop, in the same encoding.
        let mut could_end_loop: i32 = -1;

        let mut pos = n as isize - 2;
        while pos >= 0 {
            let i = pos as usize;

            if !self.verify_prefix(key, i + 1) {
                return false;
            }
            if !self.verify_prefix(key, i) {
                return false;
            }

            if !self.could_connect(key, i + 2) {
                // key[i + 1] ends some closed loop of the traversal and
                // key[i + 2], if present, starts a later one.
                if i < n - 2 {
                    let c = self.last_crossing[key[i + 2]];
                    if self.mask[c as usize] & 3 == 3 {
                        // Both incoming strands at c return from the
                        // forgotten zone, so c must begin a closed loop
                        // whose end we should already have passed.
                        if could_end_loop >> 1 == c {
                            if need_start_loop >= 0 {
                                // Still hunting the start of a
                                // different loop; loops cannot nest.
                                return false;
                            }
                            if could_end_loop & 1 != 0 && key[i + 2] & 1 == 0 {
                                return false;
                            }
                            could_end_loop = -1;
                        } else {
                            return false;
                        }
                    }
                }

                let c = self.last_crossing[key[i + 1]];
                if self.mask[c as usize] & 12 == 12 {
                    // Both outgoing strands at c lead into the
                    // forgotten zone, so c must end a closed loop
                    // beginning at an earlier position in the key.
                    if need_start_loop >= 0 {
                        return false;
                    }
                    if max_forget > self.forget_crossing[c as usize] {
                        return false;
                    }
                    if max_forget == self.forget_crossing[c as usize] {
                        // The loop start is the first traversal through
                        // c, which must pass out over the upper strand.
                        if self.link.next(StrandRef::from_id(key[i + 1])).strand() == 0 {
                            return false;
                        }
                        need_start_loop = (c << 1) | 1;
                    } else {
                        need_start_loop = c << 1;
                    }

                    // Any previously offered loop end is now unusable.
                    could_end_loop = -1;
                }
            }

            if max_forget < self.forget_strand[key[i + 1]] {
                max_forget = self.forget_strand[key[i + 1]];
                could_end_loop = self.last_crossing[key[i + 1]] << 1;
            } else if max_forget == self.forget_strand[key[i + 1]] {
                // If this strand ends a loop, its matching start is the
                // first visit to the crossing and must exit on the
                // upper strand.
                if self.link.next(StrandRef::from_id(key[i + 1])).strand() == 1 {
                    could_end_loop = (self.last_crossing[key[i + 1]] << 1) | 1;
                } else if could_end_loop == self.last_crossing[key[i + 1]] << 1 {
                    could_end_loop |= 1;
                }
            }
            if max_forget < self.forget_strand[key[i]] {
                max_forget = self.forget_strand[key[i]];
                could_end_loop = -1;
            }

            if need_start_loop >= 0 {
                if max_forget > self.forget_crossing[(need_start_loop >> 1) as usize] {
                    return false;
                }
                if need_start_loop >> 1 == self.last_crossing[key[i]] {
                    if need_start_loop & 1 != 0 && key[i] & 1 == 0 {
                        return false;
                    }
                    need_start_loop = -1;
                }
            }

            pos -= 2;
        }

        if need_start_loop >= 0 {
            return false;
        }

        if !key.is_empty() {
            // The first crossing of the key may be forced to begin a
            // closed-off loop whose end we must have found.
            let c = self.last_crossing[key[0]];
            if self.mask[c as usize] & 3 == 3 {
                if could_end_loop >> 1 != c {
                    return false;
                }
                if could_end_loop & 1 != 0 && key[0] & 1 == 0 {
                    return false;
                }
            }

            // Exiting on the lower strand on the first of two visits is
            // a contradiction when the crossing must begin a loop.
            if key[0] & 1 == 0 && (self.mask[c as usize] & 3 == 3 || self.mask[c as usize] & 9 == 9)
            {
                return false;
            }
        }

        true
    }

    /// Incremental version of [`key_viable`][ViabilityData::key_viable]
    /// for join bags, where keys are built up one pair at a time from
    /// the end. `pos` is the index of the pair just written into
    /// `key[2 * pos..2 * pos + 2]`, or -1 once the key is complete.
    ///
    /// Intermediate results are kept on the stacks set up by
    /// [`init_join_bag`][ViabilityData::init_join_bag], so that the
    /// interleaving search can backtrack cheaply.
    pub fn partial_key_viable(&mut self, key: &[usize], pos: isize) -> bool {
        if pos < 0 {
            // The key is complete; run the final checks.
            if self.need_start_loop[0] >= 0 {
                return false;
            }

            if !key.is_empty() {
                let c = self.last_crossing[key[0]];
                if self.mask[c as usize] & 3 == 3 {
                    if self.could_end_loop[0] >> 1 != c {
                        return false;
                    }
                    if self.could_end_loop[0] & 1 != 0 && key[0] & 1 == 0 {
                        return false;
                    }
                }

                if key[0] & 1 == 0
                    && (self.mask[c as usize] & 3 == 3 || self.mask[c as usize] & 9 == 9)
                {
                    return false;
                }
            }

            return true;
        }

        let p = pos as usize;
        let i = 2 * p;

        self.need_start_loop[p] = self.need_start_loop[p + 1];
        self.could_end_loop[p] = self.could_end_loop[p + 1];

        if !self.verify_prefix(key, i + 1) {
            return false;
        }
        if !self.verify_prefix(key, i) {
            return false;
        }

        if !self.could_connect(key, i + 2) {
            if p < self.pairs - 1 {
                let c = self.last_crossing[key[i + 2]];
                if self.mask[c as usize] & 3 == 3 {
                    if self.could_end_loop[p] >> 1 == c {
                        if self.need_start_loop[p] >= 0 {
                            return false;
                        }
                        if self.could_end_loop[p] & 1 != 0 && key[i + 2] & 1 == 0 {
                            return false;
                        }
                        self.could_end_loop[p] = -1;
                    } else {
                        return false;
                    }
                }
            }

            let c = self.last_crossing[key[i + 1]];
            if self.mask[c as usize] & 12 == 12 {
                if self.need_start_loop[p] >= 0 {
                    return false;
                }
                if self.max_forget[p + 1] > self.forget_crossing[c as usize] {
                    return false;
                }
                if self.max_forget[p + 1] == self.forget_crossing[c as usize] {
                    if self.link.next(StrandRef::from_id(key[i + 1])).strand() == 0 {
                        return false;
                    }
                    self.need_start_loop[p] = (c << 1) | 1;
                } else {
                    self.need_start_loop[p] = c << 1;
                }

                self.could_end_loop[p] = -1;
            }
        }

        if self.max_forget[p + 1] < self.forget_strand[key[i + 1]] {
            self.max_forget[p] = self.forget_strand[key[i + 1]];
            self.could_end_loop[p] = self.last_crossing[key[i + 1]] << 1;
        } else if self.max_forget[p + 1] == self.forget_strand[key[i + 1]] {
            self.max_forget[p] = self.max_forget[p + 1];
            if self.link.next(StrandRef::from_id(key[i + 1])).strand() == 1 {
                self.could_end_loop[p] = (self.last_crossing[key[i + 1]] << 1) | 1;
            } else if self.could_end_loop[p] == self.last_crossing[key[i + 1]] << 1 {
                self.could_end_loop[p] |= 1;
            }
        } else {
            self.max_forget[p] = self.max_forget[p + 1];
        }
        if self.max_forget[p] < self.forget_strand[key[i]] {
            self.max_forget[p] = self.forget_strand[key[i]];
            self.could_end_loop[p] = -1;
        }

        if self.need_start_loop[p] >= 0 {
            if self.max_forget[p] > self.forget_crossing[(self.need_start_loop[p] >> 1) as usize] {
                return false;
            }
            if self.need_start_loop[p] >> 1 == self.last_crossing[key[i]] {
                if self.need_start_loop[p] & 1 != 0 && key[i] & 1 == 0 {
                    return false;
                }
                self.need_start_loop[p] = -1;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_precomputed_tables() {
        let link = Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]]);
        let d = TreeDecomposition::nice(&link);
        let vdata = ViabilityData::new(&link, &d);

        // Every crossing is forgotten at exactly one bag.
        for c in 0..link.size() {
            let f = vdata.forget_crossing[c];
            assert!(f >= 0 && (f as usize) < d.bags().len());
            assert!(matches!(d.bags()[f as usize].kind, BagKind::Forget(x) if x == c));
        }

        for id in 0..2 * link.size() {
            let from = id / 2;
            let to = link.next(StrandRef::from_id(id)).crossing();
            let last = vdata.last_crossing[id];
            // last_crossing is the later-forgotten endpoint, and
            // forget_strand the bag that forgets it.
            assert!(last == from as i32 || last == to as i32);
            assert_eq!(
                vdata.forget_strand[id],
                vdata.forget_crossing[last as usize]
            );
            let other = if last == from as i32 { to } else { from };
            assert!(vdata.forget_crossing[last as usize] >= vdata.forget_crossing[other]);
        }

        // The forced prefix starts at the root crossing's upper strand.
        let root = d.root_crossing();
        assert_eq!(vdata.prefix[StrandRef::new(root, 1).id()], 0);
    }

    #[test]
    fn test_empty_key_viable() {
        let link = Link::from_data(&[1, -1], &[vec![1, -1, 2, -2]]);
        let d = TreeDecomposition::nice(&link);
        let mut vdata = ViabilityData::new(&link, &d);

        // The empty key survives any bag; it describes the state where
        // the forgotten zone is traversed with no loose ends.
        assert!(vdata.key_viable(&[]));

        vdata.init_join_bag(&[], &[]);
        assert!(vdata.partial_key_viable(&[], -1));
    }
}
