//! Crossovers: recombine two parents into up to two offspring.
//!
//! Count-limited operators build the sister when `count >= 1` and the
//! brother when `count == 2`. Uniform crossovers always return both.
//!
//! # Sequence crossovers
//!
//! - [`SinglePointCrossover`]: one cut in `[1, L-1]`, tails exchanged
//! - [`TwoPointCrossover`]: two sorted cuts, middle segment exchanged
//! - [`UniformCrossover`]: per-position swap with probability `uniform_prob`
//! - [`OrderCrossover`] (OX): permutation-preserving, Davis (1985)
//!
//! # Tree crossovers
//!
//! - [`TreeSinglePointCrossover`]: swaps two random non-root subtrees
//! - [`TreeStrictCrossover`]: only swaps that keep both offspring within
//!   `max_depth`
//!
//! # References
//!
//! - Davis (1985), "Applying Adaptive Algorithms to Epistatic Domains"
//! - Koza (1992), "Genetic Programming", subtree crossover

use crate::error::{EvolveError, Result};
use crate::genome::params::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_UNIFORM_PROB, MAX_ATTEMPTS, MAX_DEPTH, UNIFORM_PROB,
};
use crate::genome::{
    clone_offspring, Crossover, Genome, ListGenome, MatrixGenome, Offspring, TreeGenome,
};
use crate::random::{self, EvoRng};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

fn fresh<G: Genome>(parent: &G) -> G {
    let mut child = parent.clone();
    child.reset_stats();
    child
}

fn check_same_len(mom: usize, dad: usize) -> Result<()> {
    if mom != dad {
        return Err(EvolveError::invalid(format!(
            "parents differ in length ({mom} vs {dad})"
        )));
    }
    Ok(())
}

/// A cut point in `[1, len-1]`.
fn cut_point(len: usize, what: &str, rng: &mut EvoRng) -> Result<usize> {
    if len < 2 {
        return Err(EvolveError::invalid(format!(
            "{what} crossover needs at least 2 genes, got {len}"
        )));
    }
    Ok(rng.random_range(1..len))
}

// ============================================================================
// Sequence crossovers
// ============================================================================

/// Single-point crossover: `(mom[..cut] + dad[cut..], dad[..cut] + mom[cut..])`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePointCrossover;

impl<A> Crossover<ListGenome<A>> for SinglePointCrossover
where
    A: Clone + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &ListGenome<A>,
        dad: &ListGenome<A>,
        count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<ListGenome<A>>> {
        check_same_len(mom.len(), dad.len())?;
        let len = mom.len();
        let cut = cut_point(len, "single-point", rng)?;

        let sister = if count >= 1 {
            let mut s = fresh(mom);
            s.copy_range_from(dad, cut..len)?;
            Some(s)
        } else {
            None
        };
        let brother = if count == 2 {
            let mut b = fresh(dad);
            b.copy_range_from(mom, cut..len)?;
            Some(b)
        } else {
            None
        };
        Ok((sister, brother))
    }
}

/// Two-point crossover: the segment between two sorted cuts is exchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoPointCrossover;

impl<A> Crossover<ListGenome<A>> for TwoPointCrossover
where
    A: Clone + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &ListGenome<A>,
        dad: &ListGenome<A>,
        count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<ListGenome<A>>> {
        check_same_len(mom.len(), dad.len())?;
        let len = mom.len();
        let c1 = cut_point(len, "two-point", rng)?;
        let c2 = cut_point(len, "two-point", rng)?;
        let (lo, hi) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };

        let sister = if count >= 1 {
            let mut s = fresh(mom);
            s.copy_range_from(dad, lo..hi)?;
            Some(s)
        } else {
            None
        };
        let brother = if count == 2 {
            let mut b = fresh(dad);
            b.copy_range_from(mom, lo..hi)?;
            Some(b)
        } else {
            None
        };
        Ok((sister, brother))
    }
}

/// Uniform crossover. Always returns two children.
///
/// The swap probability is the mother's `uniform_prob` parameter
/// (default 0.5).
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformCrossover;

fn uniform_swap<A>(sister: &mut [A], brother: &mut [A], p: f64, rng: &mut EvoRng) {
    for (s, b) in sister.iter_mut().zip(brother.iter_mut()) {
        if random::flip_coin(rng, p) {
            std::mem::swap(s, b);
        }
    }
}

impl<A> Crossover<ListGenome<A>> for UniformCrossover
where
    A: Clone + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &ListGenome<A>,
        dad: &ListGenome<A>,
        _count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<ListGenome<A>>> {
        check_same_len(mom.len(), dad.len())?;
        let p = mom.params().real_or(UNIFORM_PROB, DEFAULT_UNIFORM_PROB)?;
        let mut sister = fresh(mom);
        let mut brother = fresh(dad);
        uniform_swap(sister.as_mut_slice(), brother.as_mut_slice(), p, rng);
        Ok((Some(sister), Some(brother)))
    }
}

impl<A> Crossover<MatrixGenome<A>> for UniformCrossover
where
    A: Clone + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &MatrixGenome<A>,
        dad: &MatrixGenome<A>,
        _count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<MatrixGenome<A>>> {
        if !mom.same_shape(dad) {
            return Err(EvolveError::invalid("matrix parents differ in shape"));
        }
        let p = mom.params().real_or(UNIFORM_PROB, DEFAULT_UNIFORM_PROB)?;
        let mut sister = fresh(mom);
        let mut brother = fresh(dad);
        uniform_swap(sister.as_mut_slice(), brother.as_mut_slice(), p, rng);
        Ok((Some(sister), Some(brother)))
    }
}

/// Order crossover (OX) for permutation-coded lists.
///
/// # Algorithm (Davis, 1985)
///
/// 1. Pick two distinct cuts `c1 < c2` in `[1, L-1]`
/// 2. The sister keeps the father's segment `[c1, c2)` in place
/// 3. The remaining positions, starting at `c2` and wrapping, are filled
///    with the mother's values read from `c2` onward (wrapping), skipping
///    one occurrence of each value already in the segment
///
/// The brother is built symmetrically. Repeated values are handled as a
/// multiset, so every child is a rearrangement of its parents' content.
///
/// # Errors
/// [`EvolveError::InvalidOperation`] for lists shorter than 3 or parents
/// that are not rearrangements of each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderCrossover;

/// Builds one OX child: `segment_src[c1..c2]` kept, the rest filled from `fill`.
fn ox_build_child<A: Clone + PartialEq>(
    fill: &[A],
    segment_src: &[A],
    c1: usize,
    c2: usize,
) -> Option<Vec<A>> {
    let n = fill.len();
    let mut pending: Vec<&A> = segment_src[c1..c2].iter().collect();
    let mut rest: Vec<A> = Vec::with_capacity(n);

    for offset in 0..n {
        let val = &fill[(c2 + offset) % n];
        match pending.iter().position(|p| *p == val) {
            Some(pos) => {
                pending.swap_remove(pos);
            }
            None => rest.push(val.clone()),
        }
    }

    if rest.len() + (c2 - c1) != n {
        return None;
    }

    // rest[..n - c2] lands on [c2, n), the wrapped remainder on [0, c1)
    let mut child = Vec::with_capacity(n);
    child.extend_from_slice(&rest[n - c2..]);
    child.extend_from_slice(&segment_src[c1..c2]);
    child.extend_from_slice(&rest[..n - c2]);
    Some(child)
}

impl<A> Crossover<ListGenome<A>> for OrderCrossover
where
    A: Clone + PartialEq + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &ListGenome<A>,
        dad: &ListGenome<A>,
        count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<ListGenome<A>>> {
        check_same_len(mom.len(), dad.len())?;
        let n = mom.len();
        if n < 3 {
            return Err(EvolveError::invalid(format!(
                "order crossover needs at least 3 genes, got {n}"
            )));
        }

        let c1 = rng.random_range(1..n);
        let mut c2 = rng.random_range(1..n);
        while c2 == c1 {
            c2 = rng.random_range(1..n);
        }
        let (c1, c2) = if c1 < c2 { (c1, c2) } else { (c2, c1) };

        let mismatch =
            || EvolveError::invalid("order crossover parents are not permutations of each other");

        let sister = if count >= 1 {
            let genes =
                ox_build_child(mom.as_slice(), dad.as_slice(), c1, c2).ok_or_else(mismatch)?;
            let mut s = fresh(mom);
            s.replace_genes(genes)?;
            Some(s)
        } else {
            None
        };
        let brother = if count == 2 {
            let genes =
                ox_build_child(dad.as_slice(), mom.as_slice(), c1, c2).ok_or_else(mismatch)?;
            let mut b = fresh(dad);
            b.replace_genes(genes)?;
            Some(b)
        } else {
            None
        };
        Ok((sister, brother))
    }
}

// ============================================================================
// Matrix crossovers
// ============================================================================

/// Exchanges every row's tail from a column cut in `[1, cols-1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleVerticalPointCrossover;

impl<A> Crossover<MatrixGenome<A>> for SingleVerticalPointCrossover
where
    A: Clone + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &MatrixGenome<A>,
        dad: &MatrixGenome<A>,
        count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<MatrixGenome<A>>> {
        if !mom.same_shape(dad) {
            return Err(EvolveError::invalid("matrix parents differ in shape"));
        }
        let cut = cut_point(mom.cols(), "vertical-point", rng)?;

        let splice = |target: &MatrixGenome<A>, donor: &MatrixGenome<A>| {
            let mut child = fresh(target);
            for r in 0..child.rows() {
                if let (Some(dst), Some(src)) = (child.row_mut(r), donor.row(r)) {
                    dst[cut..].clone_from_slice(&src[cut..]);
                }
            }
            child
        };
        let sister = (count >= 1).then(|| splice(mom, dad));
        let brother = (count == 2).then(|| splice(dad, mom));
        Ok((sister, brother))
    }
}

/// Exchanges whole rows from a row cut in `[1, rows-1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleHorizontalPointCrossover;

impl<A> Crossover<MatrixGenome<A>> for SingleHorizontalPointCrossover
where
    A: Clone + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &MatrixGenome<A>,
        dad: &MatrixGenome<A>,
        count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<MatrixGenome<A>>> {
        if !mom.same_shape(dad) {
            return Err(EvolveError::invalid("matrix parents differ in shape"));
        }
        let cut = cut_point(mom.rows(), "horizontal-point", rng)?;
        let from = cut * mom.cols();

        let splice = |target: &MatrixGenome<A>, donor: &MatrixGenome<A>| {
            let mut child = fresh(target);
            child.as_mut_slice()[from..].clone_from_slice(&donor.as_slice()[from..]);
            child
        };
        let sister = (count >= 1).then(|| splice(mom, dad));
        let brother = (count == 2).then(|| splice(dad, mom));
        Ok((sister, brother))
    }
}

// ============================================================================
// Tree crossovers
// ============================================================================

/// Swaps the subtrees at `m` (in mom) and `d` (in dad).
fn swap_subtrees<T>(
    mom: &TreeGenome<T>,
    dad: &TreeGenome<T>,
    m: usize,
    d: usize,
    count: usize,
) -> Result<Offspring<TreeGenome<T>>>
where
    T: Clone + Send + Sync + 'static,
{
    let missing = || EvolveError::invalid("crossover point is outside the tree");
    let mom_sub = mom.node(m).ok_or_else(missing)?.clone();
    let dad_sub = dad.node(d).ok_or_else(missing)?.clone();

    let sister = if count >= 1 {
        let mut s = fresh(mom);
        s.replace_subtree(m, dad_sub)?;
        s.process_nodes();
        Some(s)
    } else {
        None
    };
    let brother = if count == 2 {
        let mut b = fresh(dad);
        b.replace_subtree(d, mom_sub)?;
        b.process_nodes();
        Some(b)
    } else {
        None
    };
    Ok((sister, brother))
}

/// The tree itself if its node index is current, otherwise a processed copy.
fn processed<T: Clone>(tree: &TreeGenome<T>) -> Cow<'_, TreeGenome<T>> {
    if tree.is_processed() {
        Cow::Borrowed(tree)
    } else {
        let mut t = tree.clone();
        t.process_nodes();
        Cow::Owned(t)
    }
}

/// Swaps one random non-root subtree of each parent. Depth is not limited.
///
/// Parents without a non-root node yield plain clones.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSinglePointCrossover;

impl<T> Crossover<TreeGenome<T>> for TreeSinglePointCrossover
where
    T: Clone + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &TreeGenome<T>,
        dad: &TreeGenome<T>,
        count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<TreeGenome<T>>> {
        let mom = processed(mom);
        let dad = processed(dad);
        let (Some(m), Some(d)) = (mom.random_node(rng, false), dad.random_node(rng, false)) else {
            return Ok(clone_offspring(&*mom, &*dad, count));
        };
        swap_subtrees(&mom, &dad, m, d, count)
    }
}

/// How [`TreeStrictCrossover`] looks for a legal swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrictSearch {
    /// Enumerate every node pair and pick uniformly among the legal ones.
    /// Finds a swap whenever one exists; cost is `|mom| * |dad|`.
    #[default]
    Exhaustive,
    /// Sample random pairs up to an attempt budget (the `max_attempts`
    /// parameter, default 10). Cheap, but may miss rare legal swaps.
    BoundedRetry,
}

/// Subtree crossover that never produces a tree deeper than `max_depth`.
///
/// A pair `(m, d)` is legal when
/// `depth(m) + height(d) <= max_depth` and `depth(d) + height(m) <= max_depth`,
/// except leaf-for-leaf and root-for-root swaps, which change nothing.
/// When no legal pair is found the parents are returned as clones.
///
/// # Errors
/// [`EvolveError::Configuration`] if the `max_depth` parameter is missing
/// or below 2.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeStrictCrossover {
    pub search: StrictSearch,
}

impl TreeStrictCrossover {
    pub fn exhaustive() -> Self {
        Self {
            search: StrictSearch::Exhaustive,
        }
    }

    pub fn bounded_retry() -> Self {
        Self {
            search: StrictSearch::BoundedRetry,
        }
    }
}

fn legal_pair<T>(mom: &TreeGenome<T>, dad: &TreeGenome<T>, m: usize, d: usize, max_depth: usize) -> bool {
    let (Some(rm), Some(rd)) = (mom.record(m), dad.record(d)) else {
        return false;
    };
    if m == 0 && d == 0 {
        return false;
    }
    if rm.height == 0 && rd.height == 0 {
        return false;
    }
    rm.depth + rd.height <= max_depth && rd.depth + rm.height <= max_depth
}

impl<T> Crossover<TreeGenome<T>> for TreeStrictCrossover
where
    T: Clone + Send + Sync + 'static,
{
    fn cross(
        &self,
        mom: &TreeGenome<T>,
        dad: &TreeGenome<T>,
        count: usize,
        rng: &mut EvoRng,
    ) -> Result<Offspring<TreeGenome<T>>> {
        let max_depth = mom.params().require_count(MAX_DEPTH)?;
        if max_depth < 2 {
            return Err(EvolveError::config(format!(
                "strict tree crossover needs max_depth >= 2, got {max_depth}"
            )));
        }
        let mom = processed(mom);
        let dad = processed(dad);
        let (n_mom, n_dad) = (mom.node_count(), dad.node_count());

        let point = match self.search {
            StrictSearch::Exhaustive => {
                let legal = |&(m, d): &(usize, usize)| legal_pair(&mom, &dad, m, d, max_depth);
                let pairs = || (0..n_mom).flat_map(|m| (0..n_dad).map(move |d| (m, d)));
                let total = pairs().filter(legal).count();
                if total == 0 {
                    None
                } else {
                    let k = rng.random_range(0..total);
                    pairs().filter(legal).nth(k)
                }
            }
            StrictSearch::BoundedRetry => {
                let attempts = mom.params().count_or(MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?;
                let mut found = None;
                for _ in 0..attempts {
                    let (Some(m), Some(d)) = (mom.random_node(rng, true), dad.random_node(rng, true)) else {
                        break;
                    };
                    if legal_pair(&mom, &dad, m, d, max_depth) {
                        found = Some((m, d));
                        break;
                    }
                }
                found
            }
        };

        let Some((m, d)) = point else {
            log::debug!(
                "strict tree crossover found no legal swap ({n_mom} x {n_dad} nodes, max_depth {max_depth})"
            );
            return Ok(clone_offspring(&*mom, &*dad, count));
        };

        let offspring = swap_subtrees(&mom, &dad, m, d, count)?;
        debug_assert!(
            mom.height() > max_depth
                || dad.height() > max_depth
                || offspring
                    .0
                    .iter()
                    .chain(offspring.1.iter())
                    .all(|t| t.height() <= max_depth),
            "strict tree crossover exceeded max_depth"
        );
        Ok(offspring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{build_tree, TreeMethod, TreeNode};
    use crate::random::create_rng;
    use proptest::prelude::*;

    // ---- Single point ----

    #[test]
    fn test_single_point_rejects_length_one() {
        let a = ListGenome::from_vec(vec![1]);
        let b = ListGenome::from_vec(vec![2]);
        let mut rng = create_rng(42);
        assert!(matches!(
            SinglePointCrossover.cross(&a, &b, 2, &mut rng),
            Err(EvolveError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_single_point_respects_count() {
        let a = ListGenome::from_vec(vec![0; 5]);
        let b = ListGenome::from_vec(vec![1; 5]);
        let mut rng = create_rng(42);
        let (s, br) = SinglePointCrossover.cross(&a, &b, 1, &mut rng).unwrap();
        assert!(s.is_some());
        assert!(br.is_none());
        let (s, br) = SinglePointCrossover.cross(&a, &b, 0, &mut rng).unwrap();
        assert!(s.is_none() && br.is_none());
    }

    #[test]
    fn test_single_point_resets_scores() {
        let mut a = ListGenome::from_vec(vec![0; 4]);
        a.set_score(9.0);
        let b = ListGenome::from_vec(vec![1; 4]);
        let mut rng = create_rng(42);
        let (s, _) = SinglePointCrossover.cross(&a, &b, 1, &mut rng).unwrap();
        assert_eq!(s.unwrap().score(), 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let a = ListGenome::from_vec(vec![0; 4]);
        let b = ListGenome::from_vec(vec![1; 5]);
        let mut rng = create_rng(42);
        assert!(SinglePointCrossover.cross(&a, &b, 2, &mut rng).is_err());
        assert!(TwoPointCrossover.cross(&a, &b, 2, &mut rng).is_err());
        assert!(UniformCrossover.cross(&a, &b, 2, &mut rng).is_err());
    }

    // ---- Two point / uniform ----

    #[test]
    fn test_two_point_exchanges_middle() {
        let a = ListGenome::from_vec(vec![0; 10]);
        let b = ListGenome::from_vec(vec![1; 10]);
        let mut rng = create_rng(42);
        for _ in 0..50 {
            let (s, br) = TwoPointCrossover.cross(&a, &b, 2, &mut rng).unwrap();
            let s = s.unwrap();
            let br = br.unwrap();
            assert_eq!(s.as_slice()[0], 0);
            assert_eq!(br.as_slice()[0], 1);
            for i in 0..10 {
                assert_eq!(s.as_slice()[i] + br.as_slice()[i], 1);
            }
        }
    }

    #[test]
    fn test_uniform_always_two_children() {
        let a = ListGenome::from_vec(vec![0; 100]);
        let b = ListGenome::from_vec(vec![1; 100]);
        let mut rng = create_rng(42);
        let (s, br) = UniformCrossover.cross(&a, &b, 1, &mut rng).unwrap();
        let s = s.unwrap();
        let br = br.unwrap();
        let swapped = s.iter().filter(|&&v| v == 1).count();
        assert!((25..75).contains(&swapped));
        for i in 0..100 {
            assert_eq!(s.as_slice()[i] + br.as_slice()[i], 1);
        }
    }

    #[test]
    fn test_uniform_prob_param() {
        let mut a = ListGenome::from_vec(vec![0; 20]);
        a.set_param(UNIFORM_PROB, 1.0);
        let b = ListGenome::from_vec(vec![1; 20]);
        let mut rng = create_rng(42);
        let (s, _) = UniformCrossover.cross(&a, &b, 2, &mut rng).unwrap();
        assert!(s.unwrap().iter().all(|&v| v == 1));
    }

    // ---- OX ----

    #[test]
    fn test_ox_known_cuts() {
        // mom = 1 2 3 4 5 6 7 8, dad = 8 7 6 5 4 3 2 1, cuts (3, 6)
        let mom: Vec<u32> = (1..=8).collect();
        let dad: Vec<u32> = (1..=8).rev().collect();
        let child = ox_build_child(&mom, &dad, 3, 6).unwrap();
        // dad[3..6] = 5 4 3 stays; mom from index 6: 7 8 1 2 (3 4 5 skipped) 6
        assert_eq!(child, vec![1, 2, 6, 5, 4, 3, 7, 8]);
    }

    #[test]
    fn test_ox_too_short() {
        let a = ListGenome::from_vec(vec![0, 1]);
        let b = ListGenome::from_vec(vec![1, 0]);
        let mut rng = create_rng(42);
        assert!(OrderCrossover.cross(&a, &b, 2, &mut rng).is_err());
    }

    #[test]
    fn test_ox_not_permutations() {
        let a = ListGenome::from_vec(vec![0, 1, 2, 3]);
        let b = ListGenome::from_vec(vec![7, 7, 7, 7]);
        let mut rng = create_rng(42);
        assert!(matches!(
            OrderCrossover.cross(&a, &b, 2, &mut rng),
            Err(EvolveError::InvalidOperation(_))
        ));
    }

    // ---- Matrix ----

    #[test]
    fn test_matrix_vertical_point() {
        let a = MatrixGenome::from_rows(vec![vec![0; 4]; 3]).unwrap();
        let b = MatrixGenome::from_rows(vec![vec![1; 4]; 3]).unwrap();
        let mut rng = create_rng(42);
        let (s, br) = SingleVerticalPointCrossover.cross(&a, &b, 2, &mut rng).unwrap();
        let s = s.unwrap();
        let br = br.unwrap();
        for r in 0..3 {
            let row = s.row(r).unwrap();
            assert_eq!(row[0], 0);
            assert_eq!(row[3], 1);
            assert_eq!(br.row(r).unwrap()[0], 1);
        }
    }

    #[test]
    fn test_matrix_horizontal_point() {
        let a = MatrixGenome::from_rows(vec![vec![0; 2]; 4]).unwrap();
        let b = MatrixGenome::from_rows(vec![vec![1; 2]; 4]).unwrap();
        let mut rng = create_rng(42);
        let (s, br) = SingleHorizontalPointCrossover.cross(&a, &b, 2, &mut rng).unwrap();
        let s = s.unwrap();
        let br = br.unwrap();
        assert_eq!(s.row(0).unwrap(), &[0, 0]);
        assert_eq!(s.row(3).unwrap(), &[1, 1]);
        assert_eq!(br.row(0).unwrap(), &[1, 1]);
        assert_eq!(br.row(3).unwrap(), &[0, 0]);

        let thin = MatrixGenome::from_rows(vec![vec![0, 0]]).unwrap();
        assert!(SingleHorizontalPointCrossover.cross(&thin, &thin, 2, &mut rng).is_err());
    }

    // ---- Trees ----

    fn random_tree(max_depth: usize, rng: &mut EvoRng) -> TreeGenome<i64> {
        let mut value = |rng: &mut EvoRng| rng.random_range(0..100i64);
        let root = build_tree(0, &mut value, 3, max_depth, TreeMethod::Grow, rng).unwrap();
        let mut t = TreeGenome::from_root(root);
        t.set_param(MAX_DEPTH, max_depth);
        t
    }

    #[test]
    fn test_tree_single_point_root_only_is_noop() {
        let a = TreeGenome::from_root(TreeNode::leaf(1i64));
        let b = TreeGenome::from_root(TreeNode::with_children(2i64, vec![TreeNode::leaf(3)]));
        let mut rng = create_rng(42);
        let (s, br) = TreeSinglePointCrossover.cross(&a, &b, 2, &mut rng).unwrap();
        assert_eq!(s.unwrap(), a);
        assert_eq!(br.unwrap(), b);
    }

    #[test]
    fn test_tree_single_point_conserves_nodes() {
        let mut rng = create_rng(42);
        for _ in 0..50 {
            let a = random_tree(4, &mut rng);
            let b = random_tree(4, &mut rng);
            let (s, br) = TreeSinglePointCrossover.cross(&a, &b, 2, &mut rng).unwrap();
            let (s, br) = (s.unwrap(), br.unwrap());
            assert_eq!(s.node_count() + br.node_count(), a.node_count() + b.node_count());
            assert!(s.is_processed() && br.is_processed());
        }
    }

    #[test]
    fn test_strict_requires_max_depth() {
        let a = TreeGenome::from_root(TreeNode::with_children(1i64, vec![TreeNode::leaf(2)]));
        let mut rng = create_rng(42);
        let xo = TreeStrictCrossover::default();
        assert!(matches!(
            xo.cross(&a, &a, 2, &mut rng),
            Err(EvolveError::Configuration(_))
        ));
        let mut shallow = a.clone();
        shallow.set_param(MAX_DEPTH, 1);
        assert!(xo.cross(&shallow, &shallow, 2, &mut rng).is_err());
    }

    #[test]
    fn test_strict_no_legal_pair_returns_clones() {
        // two leaves only: every pair is root-root
        let mut a = TreeGenome::from_root(TreeNode::leaf(1i64));
        a.set_param(MAX_DEPTH, 2);
        let mut b = TreeGenome::from_root(TreeNode::leaf(2i64));
        b.set_param(MAX_DEPTH, 2);
        let mut rng = create_rng(42);
        for xo in [TreeStrictCrossover::exhaustive(), TreeStrictCrossover::bounded_retry()] {
            let (s, br) = xo.cross(&a, &b, 2, &mut rng).unwrap();
            assert_eq!(s.unwrap(), a);
            assert_eq!(br.unwrap(), b);
        }
    }

    #[test]
    fn test_strict_bounded_retry_within_depth() {
        let mut rng = create_rng(42);
        let xo = TreeStrictCrossover::bounded_retry();
        for _ in 0..100 {
            let a = random_tree(3, &mut rng);
            let b = random_tree(3, &mut rng);
            let (s, br) = xo.cross(&a, &b, 2, &mut rng).unwrap();
            assert!(s.unwrap().height() <= 3);
            assert!(br.unwrap().height() <= 3);
        }
    }

    proptest! {
        #[test]
        fn prop_single_point_content(
            mom in prop::collection::vec(0i32..100, 2..30),
            seed in 0u64..1000,
        ) {
            let dad: Vec<i32> = mom.iter().map(|v| v + 1000).collect();
            let a = ListGenome::from_vec(mom.clone());
            let b = ListGenome::from_vec(dad.clone());
            let mut rng = create_rng(seed);
            let (s, br) = SinglePointCrossover.cross(&a, &b, 2, &mut rng).unwrap();
            let (s, br) = (s.unwrap(), br.unwrap());
            let l = mom.len();
            prop_assert_eq!(s.len(), l);
            prop_assert_eq!(br.len(), l);
            let cut = (1..l).find(|&c| {
                s.as_slice() == [&mom[..c], &dad[c..]].concat().as_slice()
                    && br.as_slice() == [&dad[..c], &mom[c..]].concat().as_slice()
            });
            prop_assert!(cut.is_some());
        }

        #[test]
        fn prop_ox_preserves_multiset(
            values in prop::collection::vec(0u8..6, 3..25),
            seed in 0u64..1000,
        ) {
            let mut rng = create_rng(seed);
            let mut shuffled = values.clone();
            for i in (1..shuffled.len()).rev() {
                let j = rng.random_range(0..=i);
                shuffled.swap(i, j);
            }
            let a = ListGenome::from_vec(values.clone());
            let b = ListGenome::from_vec(shuffled);
            let (s, br) = OrderCrossover.cross(&a, &b, 2, &mut rng).unwrap();
            let mut expect = values.clone();
            expect.sort();
            for child in [s.unwrap(), br.unwrap()] {
                let mut got = child.as_slice().to_vec();
                got.sort();
                prop_assert_eq!(&got, &expect);
            }
        }

        #[test]
        fn prop_strict_never_exceeds_max_depth(seed in 0u64..1000, max_depth in 2usize..5) {
            let mut rng = create_rng(seed);
            let a = random_tree(max_depth, &mut rng);
            let b = random_tree(max_depth, &mut rng);
            let (s, br) = TreeStrictCrossover::exhaustive().cross(&a, &b, 2, &mut rng).unwrap();
            prop_assert!(s.unwrap().height() <= max_depth);
            prop_assert!(br.unwrap().height() <= max_depth);
        }
    }
}
