use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use crate::elements::{rating_userwise, Rating};

#[derive(Debug)]
pub struct RatingFormatError(pub String);

impl fmt::Display for RatingFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rating format error: {}", self.0)
    }
}

impl Error for RatingFormatError {}

/// Read-only rating store: ratings grouped into contiguous blocks by user,
/// each block ascending by item id, with an offset index of length
/// `n_users + 1` giving the half-open block `[idx[u], idx[u+1])`.
///
/// The evaluator's merge cursors depend on this layout; the constructors are
/// the only place the sort happens.
#[derive(Debug, Clone)]
pub struct RatingMatrix {
    pub ratings: Vec<Rating>,
    pub idx: Vec<usize>,
    pub n_users: usize,
    pub n_items: usize,
    dcg_max: Vec<f64>,
    pub is_dcg_max_computed: bool,
}

impl RatingMatrix {
    /// Sort the given ratings userwise and build the per-user offset index.
    /// User and item counts are inferred from the largest ids seen, so a
    /// trailing block of users with no ratings is representable by passing
    /// `n_users` explicitly through [`RatingMatrix::with_counts`].
    pub fn from_ratings(mut ratings: Vec<Rating>) -> Self {
        ratings.sort_by(rating_userwise);
        let n_users = ratings.iter().map(|r| r.user_id + 1).max().unwrap_or(0);
        let n_items = ratings.iter().map(|r| r.item_id + 1).max().unwrap_or(0);
        Self::build(ratings, n_users, n_items)
    }

    /// Like [`RatingMatrix::from_ratings`] with explicit user/item counts,
    /// which must cover every id present.
    pub fn with_counts(mut ratings: Vec<Rating>, n_users: usize, n_items: usize) -> Self {
        ratings.sort_by(rating_userwise);
        Self::build(ratings, n_users, n_items)
    }

    fn build(ratings: Vec<Rating>, n_users: usize, n_items: usize) -> Self {
        let mut idx = vec![0usize; n_users + 1];
        for r in &ratings {
            idx[r.user_id + 1] += 1;
        }
        for u in 0..n_users {
            idx[u + 1] += idx[u];
        }
        debug!(
            "Rating store built: {} ratings, {} users, {} items",
            ratings.len(),
            n_users,
            n_items
        );
        Self {
            ratings,
            idx,
            n_users,
            n_items,
            dcg_max: Vec::new(),
            is_dcg_max_computed: false,
        }
    }

    /// Load whitespace-separated `user item score` lines.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut ratings = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (user, item, score) = match (fields.next(), fields.next(), fields.next()) {
                (Some(u), Some(i), Some(s)) => (u, i, s),
                _ => {
                    return Err(Box::new(RatingFormatError(format!(
                        "line {}: expected `user item score`, got `{}`",
                        lineno + 1,
                        line
                    ))))
                }
            };
            ratings.push(Rating::new(
                user.parse::<usize>()?,
                item.parse::<usize>()?,
                score.parse::<f64>()?,
            ));
        }
        Ok(Self::from_ratings(ratings))
    }

    /// The contiguous, item-sorted block of ratings belonging to `user_id`.
    pub fn user_range(&self, user_id: usize) -> &[Rating] {
        &self.ratings[self.idx[user_id]..self.idx[user_id + 1]]
    }

    /// Precompute each user's ideal DCG: true scores sorted descending,
    /// discounted by log2(rank + 2). Must run before any NDCG query.
    pub fn compute_dcg_max(&mut self) {
        let dcg_max: Vec<f64> = (0..self.n_users)
            .map(|uid| {
                let mut scores: Vec<f64> =
                    self.user_range(uid).iter().map(|r| r.score).collect();
                scores.sort_by(|a, b| b.total_cmp(a));
                dcg(&scores)
            })
            .collect();
        self.dcg_max = dcg_max;
        self.is_dcg_max_computed = true;
    }

    /// NDCG contribution of one user, given predicted scores aligned
    /// one-to-one with that user's block (same item order as stored).
    /// Ranks the block by predicted score descending and discounts the true
    /// scores by log-rank, normalized by the user's ideal DCG.
    ///
    /// Requires [`RatingMatrix::compute_dcg_max`] to have run; returns 0.0
    /// otherwise rather than indexing an empty normalizer table.
    pub fn compute_user_ndcg(&self, user_id: usize, scores: &[f64]) -> f64 {
        if !self.is_dcg_max_computed {
            return 0.0;
        }
        let block = self.user_range(user_id);
        debug_assert_eq!(block.len(), scores.len());

        let mut order: Vec<usize> = (0..block.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let ranked: Vec<f64> = order.iter().map(|&i| block[i].score).collect();
        let ideal = self.dcg_max[user_id];
        if ideal == 0.0 {
            0.0
        } else {
            dcg(&ranked) / ideal
        }
    }
}

fn dcg(scores_in_rank_order: &[f64]) -> f64 {
    scores_in_rank_order
        .iter()
        .enumerate()
        .map(|(r, &s)| s / ((r + 2) as f64).log2())
        .sum()
}
