//! Loss and ranking-quality evaluation for latent-factor rating models.

pub mod config;
pub mod elements;
pub mod evaluate;
pub mod loss;
pub mod model;
pub mod ratings;

use chrono::Local;
use log::LevelFilter;

pub use elements::{
    comp_itemwise, comp_userwise, rating_scorewise, rating_userwise, Comparison, Rating,
};
pub use evaluate::{
    align_scores, evaluate, ndcg, ndcg_from_file, ndcg_model, pairwise_error,
    pairwise_error_model, EvalReport, SCORE_SENTINEL,
};
pub use loss::{compute_loss, compute_loss_bpr, compute_squared_loss, LossKind};
pub use model::FactorModel;
pub use ratings::RatingMatrix;

/// Wall-clock tag for progress log lines.
pub fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Initialize the default logger for binary use. Ignores a second call, so
/// tests can share it.
pub fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init();
}
