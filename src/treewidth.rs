//! Fixed-parameter tractable engine over a nice tree decomposition.
//!
//! The crossings of the diagram are arranged into a nice tree
//! decomposition, and partial solutions are propagated from the leaves
//! to the root. A partial solution at a bag is keyed by the ordered
//! sequence of strands that cross the border of the forgotten zone
//! during a link traversal; its value aggregates the contributions of
//! all partial traversals that agree with the key on everything inside
//! the zone.
//!
//! Keys have even length: strands at even positions run from the bag
//! into the forgotten zone, strands at odd positions run back out.
//! Traversals are the same switch/splice resolutions that the
//! brute-force engine enumerates, so both engines compute the same
//! polynomial; this one trades memory for a running time that is
//! exponential only in the width of the decomposition.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::bitset::BitSet;
use crate::link::{Link, StrandRef};
use crate::poly::Laurent2;
use crate::tree::{BagKind, TreeDecomposition};
use crate::viability::ViabilityData;

type Key = Vec<usize>;
type SolnSet = BTreeMap<Key, Laurent2>;

/// Adds `value` into the solution set under `key`, summing with any
/// value already stored there. Distinct resolutions may reach the same
/// key, in particular when viability pruning is disabled.
fn aggregate(solns: &mut SolnSet, key: Key, value: Laurent2) {
    match solns.entry(key) {
        Entry::Occupied(mut e) => *e.get_mut() += &value,
        Entry::Vacant(e) => {
            e.insert(value);
        }
    }
}

/// Value factor for a switch at a crossing of the given sign.
fn switch_value(from: &Laurent2, sign: i32) -> Laurent2 {
    from.shifted(if sign > 0 { -2 } else { 2 }, 0)
}

/// Value factor for a splice at a crossing of the given sign.
fn splice_value(from: &Laurent2, sign: i32) -> Laurent2 {
    let mut ans = from.shifted(if sign > 0 { -1 } else { 1 }, 1);
    if sign < 0 {
        ans.negate();
    }
    ans
}

/// Returns `child` with the pair `(a, b)` inserted before position `at`.
fn insert_pair(child: &[usize], at: usize, a: usize, b: usize) -> Key {
    let mut k = Vec::with_capacity(child.len() + 2);
    k.extend_from_slice(&child[..at]);
    k.push(a);
    k.push(b);
    k.extend_from_slice(&child[at..]);
    k
}

/// Returns `child` with `(a, b)` inserted before position `i` and
/// `(c, d)` inserted before position `j`, where `i <= j` (both measured
/// in `child` coordinates).
fn insert_two_pairs(child: &[usize], i: usize, a: usize, b: usize, j: usize, c: usize, d: usize) -> Key {
    let mut k = Vec::with_capacity(child.len() + 4);
    k.extend_from_slice(&child[..i]);
    k.push(a);
    k.push(b);
    k.extend_from_slice(&child[i..j]);
    k.push(c);
    k.push(d);
    k.extend_from_slice(&child[j..]);
    k
}

/// Returns `child` with the two entries at positions `at` and `at + 1`
/// removed.
fn remove_pair(child: &[usize], at: usize) -> Key {
    let mut k = Vec::with_capacity(child.len() - 2);
    k.extend_from_slice(&child[..at]);
    k.extend_from_slice(&child[at + 2..]);
    k
}

/// Returns `child` with the entry pairs at positions `p` and `q`
/// removed, where `p < q`.
fn remove_pairs(child: &[usize], p: usize, q: usize) -> Key {
    let mut k = Vec::with_capacity(child.len() - 4);
    k.extend_from_slice(&child[..p]);
    k.extend_from_slice(&child[p + 2..q]);
    k.extend_from_slice(&child[q + 2..]);
    k
}

/// Adds the candidate solution to the set, unless pruning is on and the
/// viability oracle rules the key out.
fn emit(solns: &mut SolnSet, vdata: &ViabilityData, prune: bool, key: Key, value: Laurent2) {
    if !prune || vdata.key_viable(&key) {
        aggregate(solns, key, value);
    }
}

/// Computes the HOMFLY-PT polynomial (alpha-z convention) of a diagram
/// with at least one crossing by dynamic programming over a nice tree
/// decomposition.
///
/// With `prune` set, keys that can never complete into a full traversal
/// are discarded as soon as the viability oracle detects them; this
/// does not change the result, only the table sizes.
pub fn homfly_treewidth(link: &Link, prune: bool) -> Laurent2 {
    debug_assert!(link.size() > 0);

    let delta = Laurent2::delta();

    let d = TreeDecomposition::nice(link);
    let n_bags = d.bags().len();

    let mut partial: Vec<Option<SolnSet>> = (0..n_bags).map(|_| None).collect();
    let mut vdata = ViabilityData::new(link, &d);

    for (index, bag) in d.bags().iter().enumerate() {
        match bag.kind {
            BagKind::Leaf => {
                log::debug!("bag {} [{}] leaf", index, bag.contents.len());
                let mut solns = SolnSet::new();
                solns.insert(Vec::new(), Laurent2::one());
                partial[index] = Some(solns);
            }
            BagKind::Introduce(_) => {
                // A newly introduced crossing has no strands into the
                // forgotten zone, so keys and values are unchanged.
                log::debug!("bag {} [{}] introduce", index, bag.contents.len());
                let child = bag.children[0];
                partial[index] = partial[child].take();
            }
            BagKind::Forget(c) => {
                let child = bag.children[0];
                let child_solns = partial[child].take().unwrap_or_default();
                log::debug!(
                    "bag {} [{}] forget {} -> {} solutions",
                    index,
                    bag.contents.len(),
                    c,
                    child_solns.len()
                );

                if prune {
                    if let Some(first) = child_solns.keys().next() {
                        vdata.init_forget_bag(index, first, c);
                    }
                }

                partial[index] = Some(forget_bag(
                    link,
                    &vdata,
                    prune,
                    index,
                    n_bags,
                    c,
                    child_solns,
                    &delta,
                ));
            }
            BagKind::Join => {
                let c1 = bag.children[0];
                let c2 = bag.children[1];
                let solns1 = partial[c1].take().unwrap_or_default();
                let solns2 = partial[c2].take().unwrap_or_default();
                log::debug!(
                    "bag {} [{}] join -> {} x {} solutions",
                    index,
                    bag.contents.len(),
                    solns1.len(),
                    solns2.len()
                );

                partial[index] = Some(join_bag(&mut vdata, prune, solns1, solns2));
            }
        }
    }

    let solns = partial[n_bags - 1].take().unwrap_or_default();
    debug_assert_eq!(solns.len(), 1);
    let mut ans = solns.into_values().next().unwrap_or_else(Laurent2::zero);

    // Factor in any zero-crossing unknot components.
    for _ in 0..link.trivial_components() {
        ans *= &delta;
    }

    log::debug!("treewidth: {} crossings -> {}", link.size(), ans);
    ans
}

/// Processes a forget bag: resolves the crossing `c` in every way
/// consistent with each child key, and rewrites the keys accordingly.
#[allow(clippy::too_many_arguments)]
fn forget_bag(
    link: &Link,
    vdata: &ViabilityData,
    prune: bool,
    index: usize,
    n_bags: usize,
    c: usize,
    child_solns: SolnSet,
    delta: &Laurent2,
) -> SolnSet {
    let lower_loop = link.next(StrandRef::new(c, 0)).crossing() == c;
    let upper_loop = link.next(StrandRef::new(c, 1)).crossing() == c;

    if lower_loop && upper_loop {
        // A complete 1-crossing unknot component. Keys are unchanged;
        // each value picks up one extra loop, except at the very last
        // bag where the loop count is reduced by one overall.
        let mut solns = child_solns;
        if index != n_bags - 1 {
            for v in solns.values_mut() {
                *v *= delta;
            }
        }
        return solns;
    }

    let mut solns = SolnSet::new();

    // The four strands meeting the crossing: id00/id10 enter on the
    // lower/upper strand, id01/id11 exit on the lower/upper strand.
    let id00 = link.prev(StrandRef::new(c, 0)).id();
    let id01 = StrandRef::new(c, 0).id();
    let id10 = link.prev(StrandRef::new(c, 1)).id();
    let id11 = StrandRef::new(c, 1).id();

    // Which of the four strands cross into the forgotten zone (and
    // hence appear in the keys). This is the same for every key of the
    // bag, so read it off the first one.
    let mut mask = 0u8;
    if let Some(first) = child_solns.keys().next() {
        for &s in first {
            if s == id00 {
                mask |= 1;
            } else if s == id01 {
                mask |= 2;
            } else if s == id10 {
                mask |= 4;
            } else if s == id11 {
                mask |= 8;
            }
        }
    }

    let sign = link.sign(c);

    for (k, v) in &child_solns {
        let len = k.len();

        // Positions of the four strands within this particular key.
        let mut p00 = usize::MAX;
        let mut p01 = usize::MAX;
        let mut p10 = usize::MAX;
        let mut p11 = usize::MAX;
        for (i, &s) in k.iter().enumerate() {
            if s == id00 {
                p00 = i;
            } else if s == id01 {
                p01 = i;
            } else if s == id10 {
                p10 = i;
            } else if s == id11 {
                p11 = i;
            }
        }

        if lower_loop {
            // The crossing carries a loop (lower -> upper). Untwist the
            // loop and treat the crossing as a plain piece of strand:
            // every resolution acts as a pass.
            match mask {
                0 => {
                    for i in (0..=len).step_by(2) {
                        emit(&mut solns, vdata, prune, insert_pair(k, i, id00, id11), v.clone());
                    }
                }
                1 => {
                    let mut k2 = k.clone();
                    k2[p00] = id11;
                    emit(&mut solns, vdata, prune, k2, v.clone());
                }
                8 => {
                    let mut k2 = k.clone();
                    k2[p11] = id00;
                    emit(&mut solns, vdata, prune, k2, v.clone());
                }
                9 => {
                    if p11 + 1 == p00 {
                        if p11 == len - 2 {
                            // Closing off a loop of the traversal.
                            let mut v2 = v.clone();
                            if index != n_bags - 1 {
                                v2 *= delta;
                            }
                            emit(&mut solns, vdata, prune, k[..len - 2].to_vec(), v2);
                        }
                    } else if p00 + 1 == p11 {
                        emit(&mut solns, vdata, prune, remove_pair(k, p00), v.clone());
                    }
                }
                _ => unreachable!("impossible strand mask at a looped crossing"),
            }
        } else if upper_loop {
            // The crossing carries a loop (upper -> lower); as above.
            match mask {
                0 => {
                    for i in (0..=len).step_by(2) {
                        emit(&mut solns, vdata, prune, insert_pair(k, i, id10, id01), v.clone());
                    }
                }
                2 => {
                    let mut k2 = k.clone();
                    k2[p01] = id10;
                    emit(&mut solns, vdata, prune, k2, v.clone());
                }
                4 => {
                    let mut k2 = k.clone();
                    k2[p10] = id01;
                    emit(&mut solns, vdata, prune, k2, v.clone());
                }
                6 => {
                    if p01 + 1 == p10 {
                        if p01 == len - 2 {
                            let mut v2 = v.clone();
                            if index != n_bags - 1 {
                                v2 *= delta;
                            }
                            emit(&mut solns, vdata, prune, k[..len - 2].to_vec(), v2);
                        }
                    } else if p10 + 1 == p01 {
                        emit(&mut solns, vdata, prune, remove_pair(k, p10), v.clone());
                    }
                }
                _ => unreachable!("impossible strand mask at a looped crossing"),
            }
        } else {
            // The generic case: all four strands are distinct arcs.
            // Each resolution (pass, switch, splice) wires the incoming
            // strands to the outgoing strands in its own way; the case
            // analysis below rewrites the key for each legal wiring.
            match mask {
                0 => {
                    for i in (0..=len).step_by(2) {
                        for j in (i..=len).step_by(2) {
                            emit(
                                &mut solns,
                                vdata,
                                prune,
                                insert_two_pairs(k, i, id10, id11, j, id00, id01),
                                v.clone(),
                            );
                            emit(
                                &mut solns,
                                vdata,
                                prune,
                                insert_two_pairs(k, i, id00, id01, j, id10, id11),
                                switch_value(v, sign),
                            );
                            emit(
                                &mut solns,
                                vdata,
                                prune,
                                insert_two_pairs(k, i, id00, id11, j, id10, id01),
                                splice_value(v, sign),
                            );
                        }
                    }
                }
                1 => {
                    let mut b1 = k.clone();
                    b1[p00] = id01;
                    let mut b2 = k.clone();
                    b2[p00] = id11;
                    for i in (0..p00).step_by(2) {
                        emit(&mut solns, vdata, prune, insert_pair(&b1, i, id10, id11), v.clone());
                    }
                    for i in (p00 + 1..=len).step_by(2) {
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            insert_pair(&b1, i, id10, id11),
                            switch_value(v, sign),
                        );
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            insert_pair(&b2, i, id10, id01),
                            splice_value(v, sign),
                        );
                    }
                }
                2 => {
                    let mut b1 = k.clone();
                    b1[p01] = id00;
                    let mut b2 = k.clone();
                    b2[p01] = id10;
                    for i in (0..=p01).step_by(2) {
                        emit(&mut solns, vdata, prune, insert_pair(&b1, i, id10, id11), v.clone());
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            insert_pair(&b2, i, id00, id11),
                            splice_value(v, sign),
                        );
                    }
                    for i in (p01 + 2..=len).step_by(2) {
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            insert_pair(&b1, i, id10, id11),
                            switch_value(v, sign),
                        );
                    }
                }
                3 => {
                    if p01 + 1 == p00 {
                        if p01 == len - 2 {
                            // Pass closes off a loop.
                            let trunc = &k[..len - 2];
                            for i in (0..len).step_by(2) {
                                let mut v2 = v.clone();
                                v2 *= delta;
                                emit(&mut solns, vdata, prune, insert_pair(trunc, i, id10, id11), v2);
                            }
                        }
                    } else if p00 < p01 {
                        let mut k2 = k.clone();
                        k2[p00] = id11;
                        k2[p01] = id10;
                        emit(&mut solns, vdata, prune, k2, splice_value(v, sign));

                        if p00 + 1 == p01 {
                            let rem = remove_pair(k, p00);
                            for i in (0..p00).step_by(2) {
                                emit(
                                    &mut solns,
                                    vdata,
                                    prune,
                                    insert_pair(&rem, i, id10, id11),
                                    v.clone(),
                                );
                            }
                            for i in (p01 + 2..=len).step_by(2) {
                                emit(
                                    &mut solns,
                                    vdata,
                                    prune,
                                    insert_pair(&rem, i - 2, id10, id11),
                                    switch_value(v, sign),
                                );
                            }
                        }
                    }
                }
                4 => {
                    let mut b1 = k.clone();
                    b1[p10] = id11;
                    let mut b2 = k.clone();
                    b2[p10] = id01;
                    for i in (0..p10).step_by(2) {
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            insert_pair(&b1, i, id00, id01),
                            switch_value(v, sign),
                        );
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            insert_pair(&b2, i, id00, id11),
                            splice_value(v, sign),
                        );
                    }
                    for i in (p10 + 1..=len).step_by(2) {
                        emit(&mut solns, vdata, prune, insert_pair(&b1, i, id00, id01), v.clone());
                    }
                }
                5 => {
                    let mut k2 = k.clone();
                    k2[p00] = id01;
                    k2[p10] = id11;
                    if p00 < p10 {
                        emit(&mut solns, vdata, prune, k2, switch_value(v, sign));

                        let mut k3 = k.clone();
                        k3[p00] = id11;
                        k3[p10] = id01;
                        emit(&mut solns, vdata, prune, k3, splice_value(v, sign));
                    } else {
                        emit(&mut solns, vdata, prune, k2, v.clone());
                    }
                }
                6 => {
                    if p01 + 1 == p10 {
                        let mut k2 = k.clone();
                        k2[p01] = id00;
                        k2[p10] = id11;
                        emit(&mut solns, vdata, prune, k2, switch_value(v, sign));

                        if p01 == len - 2 {
                            // Splice closes off a loop.
                            let trunc = &k[..len - 2];
                            for i in (0..len).step_by(2) {
                                let mut v2 = splice_value(v, sign);
                                v2 *= delta;
                                emit(&mut solns, vdata, prune, insert_pair(trunc, i, id00, id11), v2);
                            }
                        }
                    } else if p10 < p01 {
                        let mut k2 = k.clone();
                        k2[p01] = id00;
                        k2[p10] = id11;
                        emit(&mut solns, vdata, prune, k2, v.clone());

                        if p10 + 1 == p01 {
                            let rem = remove_pair(k, p10);
                            for i in (0..p10).step_by(2) {
                                emit(
                                    &mut solns,
                                    vdata,
                                    prune,
                                    insert_pair(&rem, i, id00, id11),
                                    splice_value(v, sign),
                                );
                            }
                        }
                    } else {
                        let mut k2 = k.clone();
                        k2[p01] = id00;
                        k2[p10] = id11;
                        emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                    }
                }
                7 => {
                    if p01 + 1 == p10 {
                        if p00 + 1 == p01 {
                            let mut k2 = Vec::with_capacity(len - 2);
                            k2.extend_from_slice(&k[..p00]);
                            k2.push(id11);
                            k2.extend_from_slice(&k[p00 + 3..]);
                            emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                        }
                        if p01 == len - 2 {
                            let mut k2 = k[..len - 2].to_vec();
                            k2[p00] = id11;
                            let mut v2 = splice_value(v, sign);
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        }
                    } else if p01 + 1 == p00 {
                        if p01 == len - 2 {
                            let mut k2 = k[..len - 2].to_vec();
                            k2[p10] = id11;
                            let mut v2 = v.clone();
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        }
                    } else if p00 + 1 == p01 {
                        if p10 < p00 {
                            let mut k2 = remove_pair(k, p00);
                            k2[p10] = id11;
                            emit(&mut solns, vdata, prune, k2, v.clone());
                        } else {
                            let mut k2 = remove_pair(k, p00);
                            k2[p10 - 2] = id11;
                            emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                        }
                    } else if p10 + 1 == p01 && p00 < p10 {
                        let mut k2 = remove_pair(k, p10);
                        k2[p00] = id11;
                        emit(&mut solns, vdata, prune, k2, splice_value(v, sign));
                    }
                }
                8 => {
                    let mut b1 = k.clone();
                    b1[p11] = id10;
                    let mut b2 = k.clone();
                    b2[p11] = id00;
                    for i in (0..=p11).step_by(2) {
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            insert_pair(&b1, i, id00, id01),
                            switch_value(v, sign),
                        );
                    }
                    for i in (p11 + 2..=len).step_by(2) {
                        emit(&mut solns, vdata, prune, insert_pair(&b1, i, id00, id01), v.clone());
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            insert_pair(&b2, i, id10, id01),
                            splice_value(v, sign),
                        );
                    }
                }
                9 => {
                    let mut k2 = k.clone();
                    k2[p11] = id10;
                    k2[p00] = id01;
                    if p11 + 1 == p00 || p11 < p00 {
                        emit(&mut solns, vdata, prune, k2, v.clone());
                    } else {
                        emit(&mut solns, vdata, prune, k2, switch_value(v, sign));

                        if p00 + 1 == p11 {
                            let rem = remove_pair(k, p00);
                            for i in (p11 + 2..=len).step_by(2) {
                                emit(
                                    &mut solns,
                                    vdata,
                                    prune,
                                    insert_pair(&rem, i - 2, id10, id01),
                                    splice_value(v, sign),
                                );
                            }
                        }
                    }
                }
                10 => {
                    let mut k2 = k.clone();
                    k2[p01] = id00;
                    k2[p11] = id10;
                    if p01 < p11 {
                        emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                    } else {
                        emit(&mut solns, vdata, prune, k2, v.clone());

                        let mut k3 = k.clone();
                        k3[p01] = id10;
                        k3[p11] = id00;
                        emit(&mut solns, vdata, prune, k3, splice_value(v, sign));
                    }
                }
                11 => {
                    if p01 + 1 == p00 {
                        if p01 == len - 2 {
                            let mut k2 = k[..len - 2].to_vec();
                            k2[p11] = id10;
                            let mut v2 = v.clone();
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        }
                    } else if p11 + 1 == p00 {
                        if p00 + 1 == p01 {
                            let mut k2 = Vec::with_capacity(len - 2);
                            k2.extend_from_slice(&k[..p11]);
                            k2.push(id10);
                            k2.extend_from_slice(&k[p11 + 3..]);
                            emit(&mut solns, vdata, prune, k2, v.clone());
                        }
                    } else if p00 + 1 == p01 {
                        if p11 < p01 {
                            let mut k2 = remove_pair(k, p00);
                            k2[p11] = id10;
                            emit(&mut solns, vdata, prune, k2, v.clone());
                        } else {
                            let mut k2 = remove_pair(k, p00);
                            k2[p11 - 2] = id10;
                            emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                        }
                    } else if p00 + 1 == p11 && p11 < p01 {
                        let mut k2 = remove_pair(k, p00);
                        k2[p01 - 2] = id10;
                        emit(&mut solns, vdata, prune, k2, splice_value(v, sign));
                    }
                }
                12 => {
                    if p11 + 1 == p10 {
                        let mut k2 = k.clone();
                        k2[p11] = id00;
                        k2[p10] = id01;
                        emit(&mut solns, vdata, prune, k2, splice_value(v, sign));

                        if p11 == len - 2 {
                            // Switch closes off a loop.
                            let trunc = &k[..len - 2];
                            for i in (0..len).step_by(2) {
                                let mut v2 = switch_value(v, sign);
                                v2 *= delta;
                                emit(&mut solns, vdata, prune, insert_pair(trunc, i, id00, id01), v2);
                            }
                        }
                    } else if p11 < p10 {
                        let mut k2 = k.clone();
                        k2[p11] = id00;
                        k2[p10] = id01;
                        emit(&mut solns, vdata, prune, k2, splice_value(v, sign));
                    } else if p10 + 1 == p11 {
                        let rem = remove_pair(k, p10);
                        for i in (0..p10).step_by(2) {
                            emit(
                                &mut solns,
                                vdata,
                                prune,
                                insert_pair(&rem, i, id00, id01),
                                switch_value(v, sign),
                            );
                        }
                        for i in (p11 + 2..=len).step_by(2) {
                            emit(
                                &mut solns,
                                vdata,
                                prune,
                                insert_pair(&rem, i - 2, id00, id01),
                                v.clone(),
                            );
                        }
                    }
                }
                13 => {
                    if p11 + 1 == p00 {
                        if p10 + 1 == p11 {
                            let mut k2 = Vec::with_capacity(len - 2);
                            k2.extend_from_slice(&k[..p10]);
                            k2.push(id01);
                            k2.extend_from_slice(&k[p10 + 3..]);
                            emit(&mut solns, vdata, prune, k2, v.clone());
                        }
                    } else if p11 + 1 == p10 {
                        if p11 == len - 2 {
                            let mut k2 = k[..len - 2].to_vec();
                            k2[p00] = id01;
                            let mut v2 = switch_value(v, sign);
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        }
                        if p00 + 1 == p11 {
                            let mut k2 = Vec::with_capacity(len - 2);
                            k2.extend_from_slice(&k[..p00]);
                            k2.push(id01);
                            k2.extend_from_slice(&k[p00 + 3..]);
                            emit(&mut solns, vdata, prune, k2, splice_value(v, sign));
                        }
                    } else if p10 + 1 == p11 {
                        if p10 < p00 {
                            let mut k2 = remove_pair(k, p10);
                            k2[p00 - 2] = id01;
                            emit(&mut solns, vdata, prune, k2, v.clone());
                        } else {
                            let mut k2 = remove_pair(k, p10);
                            k2[p00] = id01;
                            emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                        }
                    } else if p00 + 1 == p11 && p00 < p10 {
                        let mut k2 = remove_pair(k, p00);
                        k2[p10 - 2] = id01;
                        emit(&mut solns, vdata, prune, k2, splice_value(v, sign));
                    }
                }
                14 => {
                    if p01 + 1 == p10 {
                        if p10 + 1 == p11 {
                            let mut k2 = Vec::with_capacity(len - 2);
                            k2.extend_from_slice(&k[..p01]);
                            k2.push(id00);
                            k2.extend_from_slice(&k[p01 + 3..]);
                            emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                        } else if p01 == len - 2 {
                            let mut k2 = k[..len - 2].to_vec();
                            k2[p11] = id00;
                            let mut v2 = splice_value(v, sign);
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        }
                    } else if p11 + 1 == p10 {
                        if p10 + 1 == p01 {
                            let mut k2 = Vec::with_capacity(len - 2);
                            k2.extend_from_slice(&k[..p11]);
                            k2.push(id00);
                            k2.extend_from_slice(&k[p11 + 3..]);
                            emit(&mut solns, vdata, prune, k2, splice_value(v, sign));
                        } else if p11 == len - 2 {
                            let mut k2 = k[..len - 2].to_vec();
                            k2[p01] = id00;
                            let mut v2 = switch_value(v, sign);
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        }
                    } else if p10 + 1 == p11 {
                        if p11 < p01 {
                            let mut k2 = remove_pair(k, p10);
                            k2[p01 - 2] = id00;
                            emit(&mut solns, vdata, prune, k2, v.clone());
                        } else {
                            let mut k2 = remove_pair(k, p10);
                            k2[p01] = id00;
                            emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                        }
                    } else if p10 + 1 == p01 && p11 < p01 {
                        let mut k2 = remove_pair(k, p10);
                        k2[p11] = id00;
                        emit(&mut solns, vdata, prune, k2, splice_value(v, sign));
                    }
                }
                15 => {
                    if p01 + 1 == p00 {
                        if p11 + 1 == p10 {
                            if p11 == len - 4 && p01 == len - 2 {
                                // Pass closes off two loops; one of them
                                // is not counted at the very last bag.
                                let mut v2 = v.clone();
                                v2 *= delta;
                                if index != n_bags - 1 {
                                    v2 *= delta;
                                }
                                emit(&mut solns, vdata, prune, k[..len - 4].to_vec(), v2);
                            }
                        } else if p01 == len - 2 && p10 + 1 == p11 {
                            let mut k2 = Vec::with_capacity(len - 4);
                            k2.extend_from_slice(&k[..p10]);
                            k2.extend_from_slice(&k[p10 + 2..len - 2]);
                            let mut v2 = v.clone();
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        }
                    } else if p01 + 1 == p10 {
                        if p11 + 1 == p00 {
                            if p11 == len - 4 && p01 == len - 2 {
                                let mut v2 = v.clone();
                                if index != n_bags - 1 {
                                    v2 *= delta;
                                }
                                emit(&mut solns, vdata, prune, k[..len - 4].to_vec(), v2);
                            }
                        } else if p10 + 1 == p11 && p00 + 1 == p01 {
                            let mut k2 = Vec::with_capacity(len - 4);
                            k2.extend_from_slice(&k[..p00]);
                            k2.extend_from_slice(&k[p00 + 4..]);
                            emit(&mut solns, vdata, prune, k2, switch_value(v, sign));
                        } else if p00 + 1 == p11 && p01 == len - 2 {
                            let mut k2 = Vec::with_capacity(len - 4);
                            k2.extend_from_slice(&k[..p00]);
                            k2.extend_from_slice(&k[p00 + 2..len - 2]);
                            let mut v2 = splice_value(v, sign);
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        }
                    } else if p11 + 1 == p10 {
                        if p00 + 1 == p01 && p11 == len - 2 {
                            let mut k2 = Vec::with_capacity(len - 4);
                            k2.extend_from_slice(&k[..p00]);
                            k2.extend_from_slice(&k[p00 + 2..len - 2]);
                            let mut v2 = switch_value(v, sign);
                            v2 *= delta;
                            emit(&mut solns, vdata, prune, k2, v2);
                        } else if p00 + 1 == p11 && p10 + 1 == p01 {
                            let mut k2 = Vec::with_capacity(len - 4);
                            k2.extend_from_slice(&k[..p00]);
                            k2.extend_from_slice(&k[p00 + 4..]);
                            emit(&mut solns, vdata, prune, k2, splice_value(v, sign));
                        }
                    } else if p11 + 1 == p00 {
                        if p10 + 1 == p11 && p00 + 1 == p01 {
                            let mut k2 = Vec::with_capacity(len - 4);
                            k2.extend_from_slice(&k[..p10]);
                            k2.extend_from_slice(&k[p10 + 4..]);
                            emit(&mut solns, vdata, prune, k2, v.clone());
                        }
                    } else if p00 + 1 == p01 && p10 + 1 == p11 {
                        if p10 < p00 {
                            emit(&mut solns, vdata, prune, remove_pairs(k, p10, p00), v.clone());
                        } else {
                            emit(
                                &mut solns,
                                vdata,
                                prune,
                                remove_pairs(k, p00, p10),
                                switch_value(v, sign),
                            );
                        }
                    } else if p00 + 1 == p11 && p10 + 1 == p01 && p00 < p10 {
                        emit(
                            &mut solns,
                            vdata,
                            prune,
                            remove_pairs(k, p00, p10),
                            splice_value(v, sign),
                        );
                    }
                }
                _ => unreachable!("strand mask out of range"),
            }
        }
    }

    solns
}

/// Processes a join bag: interleaves every pair of child keys in all
/// orders that preserve the relative order within each child, and
/// multiplies the corresponding values.
fn join_bag(vdata: &mut ViabilityData, prune: bool, solns1: SolnSet, solns2: SolnSet) -> SolnSet {
    let pairs1 = solns1.keys().next().map_or(0, |k| k.len() / 2);
    let pairs2 = solns2.keys().next().map_or(0, |k| k.len() / 2);
    let pairs = pairs1 + pairs2;

    // If either child has only the empty key, the join is a plain
    // scaling of the other child's values.
    if pairs1 == 0 {
        let scale = solns1.into_values().next().unwrap_or_else(Laurent2::one);
        let mut solns = solns2;
        for v in solns.values_mut() {
            *v *= &scale;
        }
        return solns;
    }
    if pairs2 == 0 {
        let scale = solns2.into_values().next().unwrap_or_else(Laurent2::one);
        let mut solns = solns1;
        for v in solns.values_mut() {
            *v *= &scale;
        }
        return solns;
    }

    if prune {
        if let (Some(k1), Some(k2)) = (solns1.keys().next(), solns2.keys().next()) {
            vdata.init_join_bag(k1, k2);
        }
    }

    let mut solns = SolnSet::new();

    let mut knew = vec![0usize; 2 * pairs];

    // Bit i of choice records whether position i of the combined key
    // takes its pair from the first or the second child key.
    let mut choice = BitSet::new(pairs);

    for (k1, v1) in &solns1 {
        for (k2, v2) in &solns2 {
            let mut val = v1.clone();
            val *= v2;

            // Fill the combined key from the end to the beginning, so
            // that non-viable keys are cut off as early as possible.
            choice.clear();
            let mut pos = pairs as isize - 1;
            let mut pos1 = pairs1 as isize - 1;
            let mut pos2 = pairs2 as isize - 1;

            while pos < pairs as isize {
                if pos < 0 {
                    // The combined key is complete.
                    if !prune || vdata.partial_key_viable(&knew, -1) {
                        aggregate(&mut solns, knew.clone(), val.clone());
                    }
                    // Fall through to the backtrack step.
                } else if !choice.contains(pos as usize) {
                    // Try the next pair of the first key, if any remain.
                    if pos1 >= 0 {
                        knew[2 * pos as usize] = k1[2 * pos1 as usize];
                        knew[2 * pos as usize + 1] = k1[2 * pos1 as usize + 1];
                        if !prune || vdata.partial_key_viable(&knew, pos) {
                            pos1 -= 1;
                            pos -= 1;
                            continue;
                        }
                    }
                    // The first key is unusable here; try the second.
                    choice.insert(pos as usize);
                    continue;
                } else {
                    if pos2 >= 0 {
                        knew[2 * pos as usize] = k2[2 * pos2 as usize];
                        knew[2 * pos as usize + 1] = k2[2 * pos2 as usize + 1];
                        if !prune || vdata.partial_key_viable(&knew, pos) {
                            pos2 -= 1;
                            pos -= 1;
                            continue;
                        }
                    }
                    // Out of options here; fall through to backtrack.
                    choice.remove(pos as usize);
                }

                // Backtrack.
                pos += 1;
                while pos < pairs as isize {
                    if !choice.contains(pos as usize) {
                        pos1 += 1;
                        choice.insert(pos as usize);
                        break;
                    } else {
                        pos2 += 1;
                        choice.remove(pos as usize);
                        pos += 1;
                    }
                }
            }
        }
    }

    solns
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::kauffman::homfly_kauffman;

    fn check_engines_agree(signs: &[i32], components: &[Vec<i32>]) {
        let link = Link::from_data(signs, components);
        let expected = homfly_kauffman(&link);
        for prune in [false, true] {
            assert_eq!(
                homfly_treewidth(&link, prune),
                expected,
                "engines disagree on {:?} {:?} (prune = {})",
                signs,
                components,
                prune
            );
        }
    }

    #[test]
    fn test_single_twists() {
        for signs in [[1], [-1]] {
            for seq in [vec![1, -1], vec![-1, 1]] {
                check_engines_agree(&signs, &[seq]);
            }
        }
    }

    #[test]
    fn test_cancelling_twist_pair() {
        check_engines_agree(&[1, -1], &[vec![1, -1, 2, -2]]);
    }

    #[test]
    fn test_trefoils() {
        check_engines_agree(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]]);
        check_engines_agree(&[-1, -1, -1], &[vec![1, -2, 3, -1, 2, -3]]);
    }

    #[test]
    fn test_hopf_links() {
        check_engines_agree(&[1, 1], &[vec![1, -2], vec![-1, 2]]);
        check_engines_agree(&[-1, -1], &[vec![1, -2], vec![-1, 2]]);
    }

    #[test]
    fn test_figure_eight() {
        check_engines_agree(&[1, 1, -1, -1], &[vec![-1, 2, -3, 4, -2, 1, -4, 3]]);
    }

    #[test]
    fn test_figure_eight_value() {
        let link = Link::from_data(&[1, 1, -1, -1], &[vec![-1, 2, -3, 4, -2, 1, -4, 3]]);
        let mut expected = Laurent2::zero();
        expected.set(2, 0, 1);
        expected.set(-2, 0, 1);
        expected.set(0, 0, -1);
        expected.set(0, 2, -1);
        assert_eq!(homfly_treewidth(&link, true), expected);
    }

    #[test]
    fn test_split_diagrams() {
        // A trefoil with a split zero-crossing unknot.
        check_engines_agree(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3], vec![]]);

        // Two split trefoils: the decomposition has two disconnected
        // pieces, so this exercises the join machinery.
        check_engines_agree(
            &[1, 1, 1, -1, -1, -1],
            &[vec![1, -2, 3, -1, 2, -3], vec![4, -5, 6, -4, 5, -6]],
        );
    }

    #[test]
    fn test_connected_sums() {
        // A connected sum is a single component, so neither side of a
        // join bag can be fully forgotten: the decomposition branches
        // and the join must interleave two non-empty child keys.
        let sum = vec![1, -2, 3, -1, 2, -3, 4, -5, 6, -4, 5, -6];
        check_engines_agree(&[1, 1, 1, 1, 1, 1], &[sum.clone()]);
        check_engines_agree(&[1, 1, 1, -1, -1, -1], &[sum]);
    }

    #[test]
    fn test_granny_knot_value() {
        // The invariant of a connected sum is the product of its
        // parts: the granny knot is the right trefoil's value squared.
        let link = Link::from_data(
            &[1, 1, 1, 1, 1, 1],
            &[vec![1, -2, 3, -1, 2, -3, 4, -5, 6, -4, 5, -6]],
        );
        let mut trefoil = Laurent2::zero();
        trefoil.set(-2, 0, 2);
        trefoil.set(-4, 0, -1);
        trefoil.set(-2, 2, 1);
        let mut expected = trefoil.clone();
        expected *= &trefoil;
        for prune in [false, true] {
            assert_eq!(homfly_treewidth(&link, prune), expected);
        }
    }

    #[test]
    fn test_square_knot_value() {
        // Right trefoil # left trefoil.
        let link = Link::from_data(
            &[1, 1, 1, -1, -1, -1],
            &[vec![1, -2, 3, -1, 2, -3, 4, -5, 6, -4, 5, -6]],
        );
        let mut expected = Laurent2::zero();
        expected.set(-2, 0, 2);
        expected.set(-4, 0, -1);
        expected.set(-2, 2, 1);
        let mut left = Laurent2::zero();
        left.set(2, 0, 2);
        left.set(4, 0, -1);
        left.set(2, 2, 1);
        expected *= &left;
        for prune in [false, true] {
            assert_eq!(homfly_treewidth(&link, prune), expected);
        }
    }

    #[test]
    fn test_trefoil_with_extra_twist() {
        // A trefoil with an extra Reidemeister I twist. Forgetting the
        // twist crossing hits the single-loop cases of the forget-bag
        // analysis, in both loop orientations and both signs.
        for extra in [1, -1] {
            check_engines_agree(&[1, 1, 1, extra], &[vec![1, -2, 3, -1, 2, -3, 4, -4]]);
            check_engines_agree(&[1, 1, 1, extra], &[vec![1, -2, 3, -1, 2, -3, -4, 4]]);
        }
    }

    #[test]
    fn test_one_crossing_unknot_components() {
        // Single twists as separate split components.
        check_engines_agree(&[1, -1], &[vec![1, -1], vec![2, -2]]);
    }
}
