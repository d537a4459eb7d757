use std::error::Error;
use std::fs::File;

use ndarray::Array2;
use ndarray_npy::ReadNpyExt;

/// Runtime configuration for the evaluation binary: a trained factor model
/// stored as two `.npy` matrices plus a held-out rating file, and optionally
/// an external prediction file to score as well.
pub struct Config {
    user_factors: Array2<f64>,
    item_factors: Array2<f64>,
    ratings_path: String,
    prediction_path: Option<String>,
}

impl Config {
    /// Constructor from an argument iterator.
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- data/U.npy data/V.npy data/test_ratings.txt [data/predictions.txt]
    /// ```
    pub fn new(mut args: impl Iterator<Item = String>) -> Result<Config, Box<dyn Error>> {
        // args:
        // 0: program name
        // 1: user factor matrix (.npy, n_users x rank)
        // 2: item factor matrix (.npy, n_items x rank)
        // 3: held-out ratings file (`user item score` lines)
        // 4: optional prediction file (`item:score` lines, one per user)
        args.next();
        let user_path = args.next().ok_or("missing user factor path")?;
        let item_path = args.next().ok_or("missing item factor path")?;
        let ratings_path = args.next().ok_or("missing ratings path")?;
        let prediction_path = args.next();

        let user_factors = Array2::<f64>::read_npy(File::open(&user_path)?)?;
        let item_factors = Array2::<f64>::read_npy(File::open(&item_path)?)?;

        Ok(Config {
            user_factors,
            item_factors,
            ratings_path,
            prediction_path,
        })
    }

    pub fn into_factors(self) -> (Array2<f64>, Array2<f64>, String, Option<String>) {
        (
            self.user_factors,
            self.item_factors,
            self.ratings_path,
            self.prediction_path,
        )
    }

    pub fn get_user_factors(&self) -> &Array2<f64> {
        &self.user_factors
    }

    pub fn get_item_factors(&self) -> &Array2<f64> {
        &self.item_factors
    }

    pub fn get_ratings_path(&self) -> &str {
        &self.ratings_path
    }

    pub fn get_prediction_path(&self) -> Option<&str> {
        self.prediction_path.as_deref()
    }
}
