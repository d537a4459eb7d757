use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::elements::Rating;
use crate::model::FactorModel;
use crate::ratings::RatingMatrix;

/// Score assigned to items the prediction source knows nothing about:
/// effectively "ranked last". Also used for item ids outside the model's
/// item count.
pub const SCORE_SENTINEL: f64 = -1e10;

/// Align a prediction block against a true block by item id.
///
/// Both blocks must be ascending by item id (the `RatingMatrix` invariant).
/// A single forward cursor walks the prediction block once; the output has
/// one score per true rating, in the true block's item order, with
/// [`SCORE_SENTINEL`] where the prediction block has no matching item.
pub fn align_scores(true_block: &[Rating], pred_block: &[Rating]) -> Vec<f64> {
    let mut scores = Vec::with_capacity(true_block.len());
    let mut j = 0;
    for r in true_block {
        while j < pred_block.len() && pred_block[j].item_id < r.item_id {
            j += 1;
        }
        if j < pred_block.len() && pred_block[j].item_id == r.item_id {
            scores.push(pred_block[j].score);
        } else {
            scores.push(SCORE_SENTINEL);
        }
    }
    scores
}

/// Predicted scores for one user's true block, straight from the model's
/// dot product. Ids outside the model get the sentinel.
fn model_scores(model: &FactorModel, user_id: usize, true_block: &[Rating]) -> Vec<f64> {
    true_block
        .iter()
        .map(|r| {
            if user_id < model.n_users() && r.item_id < model.n_items() {
                model.score(user_id, r.item_id)
            } else {
                SCORE_SENTINEL
            }
        })
        .collect()
}

/// Pairwise error rate for one user: among unordered pairs of the user's
/// true-rated items, the fraction whose predicted order disagrees with or
/// ties a strict true preference. `None` for users with fewer than two
/// ratings; such users carry no pair information and are excluded from the
/// aggregate mean.
fn user_pair_error(true_block: &[Rating], scores: &[f64]) -> Option<f64> {
    let m = true_block.len();
    if m < 2 {
        return None;
    }
    let mut errors: u64 = 0;
    let mut pairs: u64 = 0;
    for i in 0..m - 1 {
        for j in i + 1..m {
            let t1 = true_block[i].score;
            let t2 = true_block[j].score;
            if t1 > t2 && scores[i] <= scores[j] {
                errors += 1;
            }
            if t1 < t2 && scores[i] >= scores[j] {
                errors += 1;
            }
            pairs += 1;
        }
    }
    Some(errors as f64 / pairs as f64)
}

fn mean_pair_error<F>(test: &RatingMatrix, per_user_scores: F) -> f64
where
    F: Fn(usize, &[Rating]) -> Vec<f64> + Sync,
{
    let (sum, counted) = (0..test.n_users)
        .into_par_iter()
        .filter_map(|uid| {
            let block = test.user_range(uid);
            let scores = per_user_scores(uid, block);
            user_pair_error(block, &scores)
        })
        .map(|e| (e, 1usize))
        .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    if counted == 0 {
        warn!("pairwise error: no user has two or more ratings");
        return 0.0;
    }
    sum / counted as f64
}

/// Mean per-user pairwise ranking error of a materialized prediction store
/// against the true store. Both stores must satisfy the sorted-block
/// invariant. Lower is better; range [0, 1].
pub fn pairwise_error(test: &RatingMatrix, predicted: &RatingMatrix) -> f64 {
    mean_pair_error(test, |uid, block| {
        align_scores(block, predicted_block(predicted, uid))
    })
}

/// The prediction store's block for `user_id`, or an empty block when the
/// store knows fewer users than the true store; missing users then score at
/// the sentinel instead of panicking on the offset index.
fn predicted_block(predicted: &RatingMatrix, user_id: usize) -> &[Rating] {
    if user_id < predicted.n_users {
        predicted.user_range(user_id)
    } else {
        &[]
    }
}

/// Mean per-user pairwise ranking error of a live factor model against the
/// true store; scores are computed on demand.
pub fn pairwise_error_model(test: &RatingMatrix, model: &FactorModel) -> f64 {
    mean_pair_error(test, |uid, block| model_scores(model, uid, block))
}

fn mean_ndcg<F>(test: &RatingMatrix, per_user_scores: F) -> f64
where
    F: Fn(usize, &[Rating]) -> Vec<f64> + Sync,
{
    if test.n_users == 0 {
        return 0.0;
    }
    let sum: f64 = (0..test.n_users)
        .into_par_iter()
        .map(|uid| {
            let block = test.user_range(uid);
            let scores = per_user_scores(uid, block);
            test.compute_user_ndcg(uid, &scores)
        })
        .sum();
    sum / test.n_users as f64
}

/// Mean per-user NDCG of a materialized prediction store against the true
/// store. Returns -1.0 when the true store's ideal-DCG normalizer has not
/// been computed; callers must check for the sentinel.
pub fn ndcg(test: &RatingMatrix, predicted: &RatingMatrix) -> f64 {
    if !test.is_dcg_max_computed {
        warn!("ndcg requested before compute_dcg_max; returning sentinel");
        return -1.0;
    }
    mean_ndcg(test, |uid, block| {
        align_scores(block, predicted_block(predicted, uid))
    })
}

/// Mean per-user NDCG of a live factor model against the true store.
/// Returns -1.0 when the ideal-DCG normalizer has not been computed.
pub fn ndcg_model(test: &RatingMatrix, model: &FactorModel) -> f64 {
    if !test.is_dcg_max_computed {
        warn!("ndcg_model requested before compute_dcg_max; returning sentinel");
        return -1.0;
    }
    mean_ndcg(test, |uid, block| model_scores(model, uid, block))
}

/// Scores for one user's block parsed from one prediction line.
///
/// Tokens are `item:score`, space-separated, items 1-based and ascending.
/// A forward cursor walks the tokens exactly like the store-to-store merge;
/// a malformed token stops the cursor, leaving the remaining true items at
/// the sentinel.
fn line_scores(line: &str, true_block: &[Rating]) -> Vec<f64> {
    let mut tokens = line.split_whitespace().map(|tok| {
        let (item, score) = tok.split_once(':')?;
        let item = item.trim().parse::<usize>().ok()?.checked_sub(1)?;
        let score = score.trim().parse::<f64>().ok()?;
        Some((item, score))
    });

    let mut current: Option<(usize, f64)> = None;
    let mut exhausted = false;
    let mut scores = Vec::with_capacity(true_block.len());

    for r in true_block {
        while !exhausted && current.map_or(true, |(iid, _)| iid < r.item_id) {
            match tokens.next() {
                Some(Some(tok)) => current = Some(tok),
                // Either the line ran out or a token failed to parse; in
                // both cases the cursor stops for this user.
                _ => exhausted = true,
            }
        }
        match current {
            Some((iid, sc)) if iid == r.item_id => scores.push(sc),
            _ => scores.push(SCORE_SENTINEL),
        }
    }
    scores
}

/// Mean per-user NDCG of an external prediction file against the true store.
///
/// One line per user in user-id order; missing lines leave every remaining
/// item at the sentinel. An unopenable file is a recoverable error, not a
/// process exit. Returns Ok(-1.0) when the ideal-DCG normalizer has not
/// been computed.
pub fn ndcg_from_file<P: AsRef<Path>>(
    test: &RatingMatrix,
    path: P,
) -> Result<f64, Box<dyn Error>> {
    if !test.is_dcg_max_computed {
        warn!("ndcg_from_file requested before compute_dcg_max; returning sentinel");
        return Ok(-1.0);
    }
    if test.n_users == 0 {
        return Ok(0.0);
    }

    let mut lines = BufReader::new(File::open(path.as_ref())?).lines();
    let mut ndcg_sum = 0.0;
    for uid in 0..test.n_users {
        let line = match lines.next() {
            Some(line) => line?,
            None => String::new(),
        };
        let scores = line_scores(&line, test.user_range(uid));
        ndcg_sum += test.compute_user_ndcg(uid, &scores);
    }
    Ok(ndcg_sum / test.n_users as f64)
}

/// Aggregate ranking quality of one model against one held-out store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub pairwise_error: f64,
    pub ndcg: f64,
}

impl EvalReport {
    pub fn summary(&self) -> String {
        format!(
            "pairwise error: {:.4}, NDCG: {:.4}",
            self.pairwise_error, self.ndcg
        )
    }
}

/// Run both model-based metrics against a held-out store, with progress
/// logging.
pub fn evaluate(test: &RatingMatrix, model: &FactorModel) -> EvalReport {
    let start = Instant::now();
    let pairwise_error = pairwise_error_model(test, model);
    let ndcg = ndcg_model(test, model);
    info!(
        "Evaluated {} users in {:?}: pairwise error {:.4}, NDCG {:.4}",
        test.n_users,
        start.elapsed(),
        pairwise_error,
        ndcg
    );
    EvalReport {
        pairwise_error,
        ndcg,
    }
}
