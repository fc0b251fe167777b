//! # homfly-rs: HOMFLY-PT polynomials in Rust
//!
//! **`homfly-rs`** computes the **HOMFLY-PT polynomial**, a two-variable
//! polynomial invariant of oriented knots and links.
//!
//! ## What is the HOMFLY-PT polynomial?
//!
//! It is the unique invariant that maps the unknot to 1 and satisfies the
//! skein relation `alpha P(L+) - alpha^-1 P(L-) = z P(L0)`, where `L+`,
//! `L-` and `L0` are links differing at a single crossing. It subsumes
//! both the Alexander and Jones polynomials, and distinguishes many links
//! those invariants cannot.
//!
//! ## Key Features
//!
//! - **Two engines**: a brute-force backtracking engine over Kauffman's
//!   skein template algorithm (exponential in the number of crossings,
//!   tiny constants), and a fixed-parameter engine that is exponential
//!   only in the treewidth of the diagram.
//! - **Exact arithmetic**: coefficients are arbitrary-precision integers,
//!   so no diagram is too twisted to evaluate exactly.
//! - **Both conventions**: results are available in the (alpha, z) and
//!   (l, m) variable conventions, cached per link.
//!
//! ## Basic Usage
//!
//! ```rust
//! use homfly_rs::homfly::Algorithm;
//! use homfly_rs::link::Link;
//! use homfly_rs::poly::Laurent2;
//!
//! // The right-handed trefoil: three positive crossings.
//! let trefoil = Link::from_data(&[1, 1, 1], &[vec![1, -2, 3, -1, 2, -3]]);
//!
//! let p = trefoil.homfly_az(Algorithm::Backtrack);
//! assert_eq!(p.to_string(), "x^-2 y^2 + 2 x^-2 - x^-4");
//!
//! // A diagram of the unknot evaluates to 1.
//! let unknot = Link::from_data(&[1], &[vec![1, -1]]);
//! assert_eq!(unknot.homfly(Algorithm::Treewidth), &Laurent2::one());
//! ```
//!
//! ## Core Components
//!
//! - **[`link`]**: the combinatorial link diagram and its constructor.
//! - **[`homfly`]**: the public entry points and engine selection.
//! - **[`kauffman`]**: the backtracking engine.
//! - **[`tree`]**, **[`viability`]**, **[`treewidth`]**: the nice tree
//!   decomposition, the key-pruning oracle, and the dynamic programming
//!   engine built on top of them.
//! - **[`poly`]**: sparse two-variable Laurent polynomials over `BigInt`.

pub mod bitset;
pub mod homfly;
pub mod kauffman;
pub mod link;
pub mod poly;
pub mod tree;
pub mod treewidth;
pub mod viability;
