use itertools::multizip;
use rand::distributions::Distribution;
use rand::Rng;

/// A dense matrix of layer weights.
///
/// Row `j` holds every incoming weight of destination neuron `j`, so the
/// flat storage order is destination-major, source-minor.
#[derive(Clone, Debug, PartialEq)]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<f64>, // row-major array
}

impl Mat {
    #[cfg(test)]
    pub(crate) fn zeros(rows: usize, cols: usize) -> Self {
        Mat {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn random<D, R>(distribution: &D, rng: &mut R, rows: usize, cols: usize) -> Self
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        let data = (0..rows * cols).map(|_| distribution.sample(rng)).collect();
        Mat { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[cfg(test)]
    pub(crate) fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for x in &mut self.data {
            *x *= factor;
        }
    }

    /// Computes `y += A * x`.
    pub fn gemv(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.cols);
        assert_eq!(y.len(), self.rows);
        for (row, out) in self.data.chunks_exact(self.cols).zip(y.iter_mut()) {
            *out += row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
        }
    }

    /// Computes `y += A^T * x`.
    pub fn gemv_trans(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.rows);
        assert_eq!(y.len(), self.cols);
        for (row, &scale) in self.data.chunks_exact(self.cols).zip(x) {
            for (out, w) in y.iter_mut().zip(row) {
                *out += scale * w;
            }
        }
    }

    /// Applies the rank-one update `A += alpha * x * y^T`.
    pub fn ger(&mut self, alpha: f64, x: &[f64], y: &[f64]) {
        assert_eq!(x.len(), self.rows);
        assert_eq!(y.len(), self.cols);
        for (row, &xi) in self.data.chunks_exact_mut(self.cols).zip(x) {
            let scale = alpha * xi;
            for (a, yj) in multizip((row.iter_mut(), y.iter())) {
                *a += scale * yj;
            }
        }
    }
}
