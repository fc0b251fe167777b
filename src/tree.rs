//! Nice tree decompositions of the crossing graph of a link diagram.
//!
//! The crossing graph has one vertex per crossing and one edge per arc
//! of the diagram (self-loops are ignored); it is 4-regular up to
//! multi-edges. The decomposition is built by greedy minimum-fill
//! elimination and then converted to *nice* form, which is what the
//! fixed-parameter HOMFLY engine consumes:
//!
//! - every leaf bag holds a single crossing;
//! - an introduce bag adds exactly one crossing to its child;
//! - a forget bag removes exactly one crossing from its child;
//! - a join bag has two children with identical contents;
//! - the root is an empty forget bag.
//!
//! Bags are stored in processing order: every child precedes its
//! parent, and the root is the last bag. Each crossing is forgotten
//! exactly once across the whole tree.

use std::collections::BTreeSet;

use crate::link::{Link, StrandRef};

/// What a bag does relative to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagKind {
    /// No children; the bag holds a single crossing.
    Leaf,
    /// One child; this bag adds the given crossing.
    Introduce(usize),
    /// One child; this bag removes the given crossing.
    Forget(usize),
    /// Two children with contents identical to this bag.
    Join,
}

/// One bag of a nice tree decomposition.
#[derive(Debug, Clone)]
pub struct TreeBag {
    /// Crossing indices in this bag, sorted ascending.
    pub contents: Vec<usize>,
    pub kind: BagKind,
    /// Indices of child bags; always smaller than this bag's index.
    pub children: Vec<usize>,
}

/// A nice tree decomposition, with bags in processing order.
#[derive(Debug)]
pub struct TreeDecomposition {
    bags: Vec<TreeBag>,
}

impl TreeDecomposition {
    /// Builds a nice tree decomposition of the crossing graph of the
    /// given diagram.
    ///
    /// Panics if the diagram has no crossings.
    pub fn nice(link: &Link) -> Self {
        let n = link.size();
        assert!(n > 0, "tree decomposition requires at least one crossing");

        // Crossing graph adjacency (self-loops dropped, multi-edges merged).
        let mut adj: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        for id in 0..2 * n {
            let from = id / 2;
            let to = link.next(StrandRef::from_id(id)).crossing();
            if from != to {
                adj[from].insert(to);
                adj[to].insert(from);
            }
        }

        // Greedy minimum-fill elimination. Each eliminated vertex yields
        // a raw bag {v} + its remaining neighbours.
        let mut remaining: BTreeSet<usize> = (0..n).collect();
        let mut elim_pos = vec![usize::MAX; n];
        let mut raw_contents: Vec<Vec<usize>> = Vec::with_capacity(n);
        let mut raw_nbrs: Vec<Vec<usize>> = Vec::with_capacity(n);

        while !remaining.is_empty() {
            let mut best = usize::MAX;
            let mut best_fill = usize::MAX;
            for &v in &remaining {
                let nbrs: Vec<usize> = adj[v].iter().copied().collect();
                let mut fill = 0;
                for (i, &a) in nbrs.iter().enumerate() {
                    for &b in &nbrs[i + 1..] {
                        if !adj[a].contains(&b) {
                            fill += 1;
                        }
                    }
                }
                if fill < best_fill {
                    best_fill = fill;
                    best = v;
                }
            }

            let v = best;
            let nbrs: Vec<usize> = adj[v].iter().copied().collect();
            for (i, &a) in nbrs.iter().enumerate() {
                for &b in &nbrs[i + 1..] {
                    adj[a].insert(b);
                    adj[b].insert(a);
                }
            }
            for &u in &nbrs {
                adj[u].remove(&v);
            }
            remaining.remove(&v);

            elim_pos[v] = raw_contents.len();
            let mut contents = nbrs.clone();
            contents.push(v);
            contents.sort_unstable();
            raw_contents.push(contents);
            raw_nbrs.push(nbrs);
        }

        // Raw tree: the parent of a bag is the bag of its earliest
        // eliminated remaining neighbour. Bags with no remaining
        // neighbours are roots, one per connected component; hang all
        // but the last under the last (components share no vertices,
        // so this keeps the decomposition valid).
        let mut raw_children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for i in 0..n {
            match raw_nbrs[i].iter().map(|&u| elim_pos[u]).min() {
                Some(parent) => raw_children[parent].push(i),
                None => roots.push(i),
            }
        }
        let root = n - 1;
        for &r in &roots {
            if r != root {
                raw_children[root].push(r);
            }
        }

        let mut bags = Vec::new();
        let top = build_nice(&raw_contents, &raw_children, root, &mut bags);

        // Forget the root bag's contents one crossing at a time, ending
        // at an empty root bag.
        let mut top = top;
        let full = bags[top].contents.clone();
        for &x in &full {
            let contents: Vec<usize> = bags[top]
                .contents
                .iter()
                .copied()
                .filter(|&y| y != x)
                .collect();
            bags.push(TreeBag {
                contents,
                kind: BagKind::Forget(x),
                children: vec![top],
            });
            top = bags.len() - 1;
        }

        let d = Self { bags };
        log::debug!(
            "nice tree decomposition: {} bags, width {}",
            d.bags.len(),
            d.width()
        );
        d
    }

    /// All bags, in processing order (children before parents, root last).
    #[inline]
    pub fn bags(&self) -> &[TreeBag] {
        &self.bags
    }

    /// The width of the decomposition: largest bag size minus one.
    pub fn width(&self) -> usize {
        self.bags
            .iter()
            .map(|b| b.contents.len())
            .max()
            .unwrap_or(1)
            - 1
    }

    /// The crossing forgotten at the root bag. Traversals of the link
    /// are anchored at this crossing's upper strand.
    pub fn root_crossing(&self) -> usize {
        match self.bags.last() {
            Some(TreeBag {
                kind: BagKind::Forget(c),
                ..
            }) => *c,
            _ => unreachable!("root bag must be a forget bag"),
        }
    }
}

/// Recursively emits nice-form bags for the raw bag `node`, returning
/// the index of the subtree's top bag (whose contents equal the raw
/// bag's contents).
fn build_nice(
    raw_contents: &[Vec<usize>],
    raw_children: &[Vec<usize>],
    node: usize,
    bags: &mut Vec<TreeBag>,
) -> usize {
    let target = &raw_contents[node];

    let mut tops = Vec::with_capacity(raw_children[node].len());
    for &child in &raw_children[node] {
        let mut top = build_nice(raw_contents, raw_children, child, bags);

        // Morph the child's contents into this bag's contents:
        // forget the extras, then introduce what is missing.
        let extras: Vec<usize> = bags[top]
            .contents
            .iter()
            .copied()
            .filter(|x| !target.contains(x))
            .collect();
        for x in extras {
            let contents: Vec<usize> = bags[top]
                .contents
                .iter()
                .copied()
                .filter(|&y| y != x)
                .collect();
            bags.push(TreeBag {
                contents,
                kind: BagKind::Forget(x),
                children: vec![top],
            });
            top = bags.len() - 1;
        }
        let missing: Vec<usize> = target
            .iter()
            .copied()
            .filter(|x| !bags[top].contents.contains(x))
            .collect();
        for x in missing {
            let mut contents = bags[top].contents.clone();
            contents.push(x);
            contents.sort_unstable();
            bags.push(TreeBag {
                contents,
                kind: BagKind::Introduce(x),
                children: vec![top],
            });
            top = bags.len() - 1;
        }
        tops.push(top);
    }

    if tops.is_empty() {
        // Leaf chain: a single-crossing leaf, then introduce the rest.
        bags.push(TreeBag {
            contents: vec![target[0]],
            kind: BagKind::Leaf,
            children: Vec::new(),
        });
        let mut top = bags.len() - 1;
        for &x in &target[1..] {
            let mut contents = bags[top].contents.clone();
            contents.push(x);
            contents.sort_unstable();
            bags.push(TreeBag {
                contents,
                kind: BagKind::Introduce(x),
                children: vec![top],
            });
            top = bags.len() - 1;
        }
        top
    } else {
        // Fold multiple branches together with join bags.
        let mut top = tops[0];
        for &other in &tops[1..] {
            bags.push(TreeBag {
                contents: target.clone(),
                kind: BagKind::Join,
                children: vec![top, other],
            });
            top = bags.len() - 1;
        }
        top
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn check_nice(link: &Link, d: &TreeDecomposition) {
        let n = link.size();
        let bags = d.bags();
        assert!(!bags.is_empty());

        // Root is an empty forget bag; indices are in processing order.
        assert!(bags.last().is_some_and(|b| b.contents.is_empty()));
        assert!(matches!(bags.last().map(|b| b.kind), Some(BagKind::Forget(_))));

        let mut is_child = vec![false; bags.len()];
        let mut forgotten = vec![0usize; n];
        for (index, bag) in bags.iter().enumerate() {
            for &ch in &bag.children {
                assert!(ch < index, "child bags must precede their parents");
                assert!(!is_child[ch], "bags must have a single parent");
                is_child[ch] = true;
            }
            assert!(bag.contents.windows(2).all(|w| w[0] < w[1]));

            match bag.kind {
                BagKind::Leaf => {
                    assert!(bag.children.is_empty());
                    assert_eq!(bag.contents.len(), 1);
                }
                BagKind::Introduce(x) => {
                    assert_eq!(bag.children.len(), 1);
                    let child = &bags[bag.children[0]];
                    assert!(bag.contents.contains(&x));
                    assert!(!child.contents.contains(&x));
                    assert_eq!(bag.contents.len(), child.contents.len() + 1);
                    assert!(child.contents.iter().all(|y| bag.contents.contains(y)));
                }
                BagKind::Forget(x) => {
                    assert_eq!(bag.children.len(), 1);
                    let child = &bags[bag.children[0]];
                    assert!(!bag.contents.contains(&x));
                    assert!(child.contents.contains(&x));
                    assert_eq!(bag.contents.len() + 1, child.contents.len());
                    assert!(bag.contents.iter().all(|y| child.contents.contains(y)));
                    forgotten[x] += 1;
                }
                BagKind::Join => {
                    assert_eq!(bag.children.len(), 2);
                    for &ch in &bag.children {
                        assert_eq!(bags[ch].contents, bag.contents);
                    }
                }
            }
        }

        // Exactly one bag has no parent (the root), and every crossing
        // is forgotten exactly once.
        assert_eq!(is_child.iter().filter(|&&c| !c).count(), 1);
        assert!(!is_child[bags.len() - 1]);
        assert!(forgotten.iter().all(|&f| f == 1));

        // Both endpoints of every arc share a bag.
        for id in 0..2 * n {
            let from = id / 2;
            let to = link.next(StrandRef::from_id(id)).crossing();
            assert!(
                bags.iter()
                    .any(|b| b.contents.contains(&from) && b.contents.contains(&to)),
                "strand {} endpoints never share a bag",
                id
            );
        }
    }

    #[test]
    fn test_trefoil() {
        let link = Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]]);
        let d = TreeDecomposition::nice(&link);
        check_nice(&link, &d);
        assert_eq!(d.width(), 2);
    }

    #[test]
    fn test_figure_eight() {
        let link = Link::from_data(&[1, 1, -1, -1], &[vec![-1, 2, -3, 4, -2, 1, -4, 3]]);
        let d = TreeDecomposition::nice(&link);
        check_nice(&link, &d);
    }

    #[test]
    fn test_single_twist() {
        // One crossing whose strands only connect to itself: the
        // crossing graph has one vertex and no edges.
        let link = Link::from_data(&[1], &[vec![1, -1]]);
        let d = TreeDecomposition::nice(&link);
        check_nice(&link, &d);
        assert_eq!(d.width(), 0);
    }

    #[test]
    fn test_split_diagram() {
        // Two crossings in separate components: a disconnected
        // crossing graph, joined at the raw roots.
        let link = Link::from_data(&[1, -1], &[vec![1, -1], vec![2, -2]]);
        let d = TreeDecomposition::nice(&link);
        check_nice(&link, &d);
    }

    #[test]
    fn test_root_crossing() {
        let link = Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]]);
        let d = TreeDecomposition::nice(&link);
        assert!(d.root_crossing() < link.size());
    }
}
