// Feature vector assembly — domains in, numeric matrix out.
//
// Row order follows input order; column order is the registry's frozen
// sorted order, identical for every call on the same registry. Training asks
// for the column names once to store them with the model; scoring only wants
// the numbers.

use std::sync::Arc;

use anyhow::{Context, Result};

use super::normalizer::{Domain, DomainNormalizer};
use super::registry::FeatureRegistry;

/// Dense row-major matrix of feature values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    columns: usize,
    rows: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    pub fn with_columns(columns: usize) -> Self {
        Self {
            columns,
            rows: 0,
            values: Vec::new(),
        }
    }

    /// Build a matrix from rows that must all have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        let mut matrix = Self::with_columns(columns);
        for row in rows {
            matrix.push_row(row)?;
        }
        Ok(matrix)
    }

    pub fn push_row(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.columns {
            anyhow::bail!(
                "Row has {} values but the matrix has {} columns",
                row.len(),
                self.columns
            );
        }
        self.values.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.columns..(index + 1) * self.columns]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Copy the listed rows into a new matrix (used for train/test splits).
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut out = Self::with_columns(self.columns);
        for &i in indices {
            out.values.extend_from_slice(self.row(i));
            out.rows += 1;
        }
        out
    }
}

/// Output of `FeatureVectorBuilder::build`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub values: FeatureMatrix,
    /// Column names, present only when requested.
    pub names: Option<Vec<String>>,
}

/// Runs the normalizer and the registry over batches of hostnames.
#[derive(Clone)]
pub struct FeatureVectorBuilder {
    registry: Arc<FeatureRegistry>,
    normalizer: DomainNormalizer,
}

impl FeatureVectorBuilder {
    pub fn new(registry: Arc<FeatureRegistry>) -> Self {
        let normalizer = DomainNormalizer::new(&registry.config().common_hosts);
        Self {
            registry,
            normalizer,
        }
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    pub fn width(&self) -> usize {
        self.registry.width()
    }

    /// Parse a raw hostname into the sample the extractors see.
    pub fn prepare(&self, raw: &str) -> Result<Domain> {
        self.normalizer.prepare(raw)
    }

    /// Feature values of a single host, in column order.
    pub fn vector(&self, raw: &str) -> Result<Vec<f64>> {
        let mut scratch = Vec::with_capacity(self.width());
        self.vector_with(raw, &mut scratch)
    }

    fn vector_with(&self, raw: &str, scratch: &mut Vec<f64>) -> Result<Vec<f64>> {
        let domain = self.prepare(raw)?;
        self.registry.extract_row(&domain, scratch)
    }

    /// Build the feature matrix for `domains`.
    ///
    /// With `include_names == false` this is a pure numeric pass. With
    /// `include_names == true` the column names are returned as well.
    /// Fails on the first host that cannot be parsed; the scoring path
    /// uses `vector` per host instead so one bad host cannot sink a batch.
    pub fn build<S: AsRef<str>>(&self, domains: &[S], include_names: bool) -> Result<FeatureSet> {
        let mut values = FeatureMatrix::with_columns(self.width());
        let mut scratch = Vec::with_capacity(self.width());

        for raw in domains {
            let raw = raw.as_ref();
            let row = self
                .vector_with(raw, &mut scratch)
                .with_context(|| format!("Failed to compute features for '{raw}'"))?;
            values.push_row(&row)?;
        }

        let names = include_names.then(|| self.registry.feature_names().to_vec());
        Ok(FeatureSet { values, names })
    }
}
