use std::env;
use std::error::Error;
use std::process;

use log::{error, info};

use rankeval::config::Config;
use rankeval::{evaluate, ndcg_from_file, timestamp, FactorModel, RatingMatrix};

fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::new(env::args())?;
    let (u, v, ratings_path, prediction_path) = config.into_factors();

    let model = FactorModel::new(u, v)?;
    info!(
        "[{}] Model loaded: {} users, {} items, rank {}",
        timestamp(),
        model.n_users(),
        model.n_items(),
        model.rank()
    );

    let mut test = RatingMatrix::from_file(&ratings_path)?;
    test.compute_dcg_max();
    info!(
        "[{}] Held-out ratings loaded: {} ratings over {} users",
        timestamp(),
        test.ratings.len(),
        test.n_users
    );

    let report = evaluate(&test, &model);
    info!("[{}] Model metrics: {}", timestamp(), report.summary());

    if let Some(path) = prediction_path {
        let file_ndcg = ndcg_from_file(&test, &path)?;
        info!(
            "[{}] Prediction file {}: NDCG {:.4}",
            timestamp(),
            path,
            file_ndcg
        );
    }

    Ok(())
}

fn main() {
    rankeval::init_logger();
    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}
