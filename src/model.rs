use std::error::Error;
use std::fmt;

use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

/// Error raised when factor buffers do not agree on shape.
#[derive(Debug)]
pub struct ModelShapeError(pub String);

impl fmt::Display for ModelShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model shape error: {}", self.0)
    }
}

impl Error for ModelShapeError {}

/// Low-rank latent factor model: one length-`rank` vector per user and per
/// item, affinity = inner product. Read-only input to every evaluation
/// routine; nothing in this crate mutates it.
#[derive(Debug, Clone)]
pub struct FactorModel {
    u: Array2<f64>,
    v: Array2<f64>,
}

impl FactorModel {
    /// Build from user factors (n_users x rank) and item factors
    /// (n_items x rank).
    pub fn new(u: Array2<f64>, v: Array2<f64>) -> Result<Self, Box<dyn Error>> {
        if u.ncols() != v.ncols() {
            return Err(Box::new(ModelShapeError(format!(
                "user rank {} != item rank {}",
                u.ncols(),
                v.ncols()
            ))));
        }
        Ok(Self { u, v })
    }

    /// Build from flat row-major buffers, one row of `rank` reals per user
    /// or item.
    pub fn from_flat(u: Vec<f64>, v: Vec<f64>, rank: usize) -> Result<Self, Box<dyn Error>> {
        if rank == 0 {
            return Err(Box::new(ModelShapeError("rank cannot be zero".into())));
        }
        if u.len() % rank != 0 || v.len() % rank != 0 {
            return Err(Box::new(ModelShapeError(format!(
                "buffer lengths {} / {} not divisible by rank {}",
                u.len(),
                v.len(),
                rank
            ))));
        }
        let n_users = u.len() / rank;
        let n_items = v.len() / rank;
        let u = Array2::from_shape_vec((n_users, rank), u)?;
        let v = Array2::from_shape_vec((n_items, rank), v)?;
        Ok(Self { u, v })
    }

    /// All-zero factors; every score and margin is exactly 0.
    pub fn zeros(n_users: usize, n_items: usize, rank: usize) -> Self {
        Self {
            u: Array2::zeros((n_users, rank)),
            v: Array2::zeros((n_items, rank)),
        }
    }

    /// Uniform random factors, for tests and demos.
    pub fn random(n_users: usize, n_items: usize, rank: usize) -> Self {
        Self {
            u: Array2::random((n_users, rank), Uniform::new(-0.5, 0.5)),
            v: Array2::random((n_items, rank), Uniform::new(-0.5, 0.5)),
        }
    }

    pub fn rank(&self) -> usize {
        self.u.ncols()
    }

    pub fn n_users(&self) -> usize {
        self.u.nrows()
    }

    pub fn n_items(&self) -> usize {
        self.v.nrows()
    }

    pub fn user_factors(&self) -> &Array2<f64> {
        &self.u
    }

    pub fn item_factors(&self) -> &Array2<f64> {
        &self.v
    }

    /// Predicted affinity `U_u . V_i`.
    pub fn score(&self, user_id: usize, item_id: usize) -> f64 {
        let mut d = 0.0;
        for k in 0..self.rank() {
            d += self.u[[user_id, k]] * self.v[[item_id, k]];
        }
        d
    }

    /// Pairwise margin `U_u . (V_i1 - V_i2)`: how strongly `item1` is
    /// preferred over `item2`.
    pub fn margin(&self, user_id: usize, item1_id: usize, item2_id: usize) -> f64 {
        let mut d = 0.0;
        for k in 0..self.rank() {
            d += self.u[[user_id, k]] * (self.v[[item1_id, k]] - self.v[[item2_id, k]]);
        }
        d
    }
}
