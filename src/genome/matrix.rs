//! Fixed-size two-dimensional genome.

use super::{Genome, GenomeBase};
use crate::error::{EvolveError, Result};
use crate::operators::{
    IntegerInitializator, RealGaussianMutator, RealInitializator, SingleHorizontalPointCrossover,
    SwapMutator,
};
use serde::{Deserialize, Serialize};

/// A `rows x cols` grid of alleles stored in row-major order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "A: Serialize",
    deserialize = "A: serde::de::DeserializeOwned"
))]
pub struct MatrixGenome<A> {
    base: GenomeBase<MatrixGenome<A>>,
    rows: usize,
    cols: usize,
    cells: Vec<A>,
}

impl<A: Clone + Default> MatrixGenome<A> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            base: GenomeBase::default(),
            rows,
            cols,
            cells: vec![A::default(); rows * cols],
        }
    }
}

impl<A> MatrixGenome<A> {
    /// Builds a matrix from equally long rows.
    ///
    /// # Errors
    /// Returns [`EvolveError::InvalidOperation`] for ragged rows.
    pub fn from_rows(rows: Vec<Vec<A>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != n_cols) {
            return Err(EvolveError::invalid("matrix rows must all have the same length"));
        }
        Ok(Self {
            base: GenomeBase::default(),
            rows: n_rows,
            cols: n_cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&A> {
        self.offset(row, col).map(|i| &self.cells[i])
    }

    /// Sets one cell; returns `false` if the position is out of range.
    pub fn set(&mut self, row: usize, col: usize, value: A) -> bool {
        match self.offset(row, col) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, row: usize) -> Option<&[A]> {
        (row < self.rows).then(|| &self.cells[row * self.cols..(row + 1) * self.cols])
    }

    pub fn row_mut(&mut self, row: usize) -> Option<&mut [A]> {
        if row < self.rows {
            Some(&mut self.cells[row * self.cols..(row + 1) * self.cols])
        } else {
            None
        }
    }

    /// All cells in row-major order.
    pub fn as_slice(&self) -> &[A] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [A] {
        &mut self.cells
    }

    pub fn same_shape(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }
}

impl<A: PartialEq> PartialEq for MatrixGenome<A> {
    fn eq(&self, other: &Self) -> bool {
        self.same_shape(other) && self.cells == other.cells
    }
}

impl<A> Genome for MatrixGenome<A>
where
    A: Clone + Send + Sync + 'static,
{
    fn base(&self) -> &GenomeBase<Self> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut GenomeBase<Self> {
        &mut self.base
    }
}

impl MatrixGenome<i64> {
    /// Integer matrix with uniform initialization, swap mutation and
    /// single horizontal-point crossover.
    pub fn integer(rows: usize, cols: usize) -> Self {
        let mut g = Self::new(rows, cols);
        g.set_initializator(IntegerInitializator);
        g.set_mutator(SwapMutator);
        g.set_crossover(SingleHorizontalPointCrossover);
        g
    }
}

impl MatrixGenome<f64> {
    pub fn real(rows: usize, cols: usize) -> Self {
        let mut g = Self::new(rows, cols);
        g.set_initializator(RealInitializator);
        g.set_mutator(RealGaussianMutator);
        g.set_crossover(SingleHorizontalPointCrossover);
        g
    }
}
