//! Batches of fixed-width feature vectors.
//!
//! A `Frame` is what flows in and out of the engine: training inputs, training labels,
//! prediction inputs and prediction outputs. Rows are stored contiguously (row-major),
//! so a row is always a plain `&[f32]` and the per-example hot path never allocates.

use crate::{Error, Result};

/// An ordered, immutable batch of vectors that all have the same width.
///
/// Stored as a contiguous buffer: `data.len() == len * width`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    data: Vec<f32>,
    len: usize,
    width: usize,
}

impl Frame {
    /// Build a frame from a flat buffer with shape `(len, width)`.
    pub fn from_flat(data: Vec<f32>, width: usize) -> Result<Self> {
        if width == 0 {
            return Err(Error::InvalidData("frame width must be > 0".to_owned()));
        }
        if data.len() % width != 0 {
            return Err(Error::InvalidData(format!(
                "frame buffer length {} is not divisible by width {width}",
                data.len()
            )));
        }

        let len = data.len() / width;
        Ok(Self { data, len, width })
    }

    /// Build a frame from per-example rows.
    ///
    /// The width is taken from the first row, so `rows` must not be empty; use
    /// [`Frame::empty`] for a frame without rows.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(Error::InvalidData(
                "cannot infer frame width from zero rows".to_owned(),
            ));
        };

        let width = first.as_ref().len();
        if width == 0 {
            return Err(Error::InvalidData("frame width must be > 0".to_owned()));
        }

        let mut data = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                return Err(Error::InvalidData(format!(
                    "row {i} has len {}, expected {width}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            data,
            len: rows.len(),
            width,
        })
    }

    /// A frame holding exactly one example.
    pub fn single(row: Vec<f32>) -> Result<Self> {
        let width = row.len();
        Self::from_flat(row, width)
    }

    /// A frame with no rows.
    pub fn empty(width: usize) -> Result<Self> {
        Self::from_flat(Vec::new(), width)
    }

    #[inline]
    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    /// Returns the length of every row.
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    /// Returns the `idx`-th row.
    ///
    /// Panics if `idx >= len`.
    pub fn row(&self, idx: usize) -> &[f32] {
        let start = idx * self.width;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&[f32]> {
        (idx < self.len).then(|| self.row(idx))
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.width)
    }

    #[inline]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// Keep only the first `len` rows.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.data.truncate(len * self.width);
            self.len = len;
        }
    }

    pub fn truncated(mut self, len: usize) -> Self {
        self.truncate(len);
        self
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.rows().map(<[f32]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<f32>>> for Frame {
    type Error = Error;

    fn try_from(rows: Vec<Vec<f32>>) -> Result<Self> {
        Frame::from_rows(&rows)
    }
}

impl std::ops::Index<usize> for Frame {
    type Output = [f32];

    fn index(&self, idx: usize) -> &[f32] {
        self.row(idx)
    }
}
