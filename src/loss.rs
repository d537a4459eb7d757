use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::elements::Comparison;
use crate::model::FactorModel;
use crate::ratings::RatingMatrix;

/// Closed set of per-margin loss formulas. The formula table lives in
/// [`LossKind::margin_loss`] and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossKind {
    L1Hinge,
    L2Hinge,
    Logistic,
    Squared,
}

impl LossKind {
    /// Loss for a single pairwise margin `d = U_u . (V_i1 - V_i2)`.
    pub fn margin_loss(self, d: f64) -> f64 {
        match self {
            LossKind::L1Hinge => (1.0 - d).max(0.0),
            LossKind::L2Hinge => (1.0 - d).max(0.0).powi(2),
            LossKind::Logistic => (1.0 + (-d).exp()).ln(),
            LossKind::Squared => 0.5 * (1.0 - d).powi(2),
        }
    }
}

/// Total pairwise comparison loss over a comparison set, unaveraged.
/// Parallel associative reduction; summation order is unspecified.
pub fn compute_loss(model: &FactorModel, comparisons: &[Comparison], kind: LossKind) -> f64 {
    comparisons
        .par_iter()
        .map(|c| kind.margin_loss(model.margin(c.user_id, c.item1_id, c.item2_id)))
        .sum()
}

/// BPR-style implicit-feedback loss: for every user, logistic loss over the
/// full cross product of favored (`positives`) and unobserved (`negatives`)
/// items. Unaveraged. Cost is the dominant path,
/// O(sum_u |Iu| * |noIu| * rank); callers bound the per-user set sizes.
pub fn compute_loss_bpr(
    model: &FactorModel,
    positives: &[Vec<usize>],
    negatives: &[Vec<usize>],
) -> f64 {
    debug_assert_eq!(positives.len(), negatives.len());
    (0..positives.len())
        .into_par_iter()
        .map(|uid| {
            let mut p = 0.0;
            for &pos in &positives[uid] {
                for &neg in &negatives[uid] {
                    let d = model.margin(uid, pos, neg);
                    p += (1.0 + (-d).exp()).ln();
                }
            }
            p
        })
        .sum()
}

/// Explicit-rating squared loss: sum over the store of
/// `0.5 * (true - U_u . V_i)^2`, unaveraged.
pub fn compute_squared_loss(model: &FactorModel, test: &RatingMatrix) -> f64 {
    test.ratings
        .par_iter()
        .map(|r| {
            let d = model.score(r.user_id, r.item_id);
            0.5 * (r.score - d).powi(2)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::Rating;
    use rand::seq::SliceRandom;

    fn three_comparisons() -> Vec<Comparison> {
        vec![
            Comparison::new(0, 0, 1, 1),
            Comparison::new(1, 2, 0, 1),
            Comparison::new(2, 1, 2, 1),
        ]
    }

    #[test]
    fn test_margin_loss_table_at_zero() {
        assert_eq!(LossKind::L1Hinge.margin_loss(0.0), 1.0);
        assert_eq!(LossKind::L2Hinge.margin_loss(0.0), 1.0);
        assert_eq!(LossKind::Squared.margin_loss(0.0), 0.5);
        assert!((LossKind::Logistic.margin_loss(0.0) - 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_hinge_clamps_past_margin() {
        assert_eq!(LossKind::L1Hinge.margin_loss(2.0), 0.0);
        assert_eq!(LossKind::L2Hinge.margin_loss(1.5), 0.0);
        // Squared loss does not clamp.
        assert_eq!(LossKind::Squared.margin_loss(3.0), 2.0);
    }

    #[test]
    fn test_losses_nonnegative() {
        for kind in [
            LossKind::L1Hinge,
            LossKind::L2Hinge,
            LossKind::Logistic,
            LossKind::Squared,
        ] {
            for d in [-10.0, -1.0, 0.0, 0.3, 1.0, 25.0] {
                assert!(kind.margin_loss(d) >= 0.0, "{:?} at {}", kind, d);
            }
        }
    }

    #[test]
    fn test_empty_sets_are_zero() {
        let model = FactorModel::random(3, 3, 2);
        assert_eq!(compute_loss(&model, &[], LossKind::Logistic), 0.0);
        assert_eq!(compute_loss_bpr(&model, &[], &[]), 0.0);

        let empty = RatingMatrix::from_ratings(vec![]);
        assert_eq!(compute_squared_loss(&model, &empty), 0.0);
    }

    #[test]
    fn test_zero_model_fixed_totals() {
        // All margins are 0, so the totals are per-comparison constants.
        let model = FactorModel::zeros(3, 3, 4);
        let comps = three_comparisons();

        assert!((compute_loss(&model, &comps, LossKind::L1Hinge) - 3.0).abs() < 1e-12);
        assert!((compute_loss(&model, &comps, LossKind::L2Hinge) - 3.0).abs() < 1e-12);
        assert!((compute_loss(&model, &comps, LossKind::Squared) - 1.5).abs() < 1e-12);
        let expected = 3.0 * 2.0f64.ln();
        assert!((compute_loss(&model, &comps, LossKind::Logistic) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_loss_order_independent() {
        let model = FactorModel::random(5, 8, 3);
        let mut comps: Vec<Comparison> = (0..40)
            .map(|i| Comparison::new(i % 5, i % 8, (i + 3) % 8, 1))
            .collect();

        let before = compute_loss(&model, &comps, LossKind::Logistic);
        comps.shuffle(&mut rand::rng());
        let after = compute_loss(&model, &comps, LossKind::Logistic);
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let model = FactorModel::random(4, 6, 3);
        let comps: Vec<Comparison> = (0..30)
            .map(|i| Comparison::new(i % 4, i % 6, (i + 1) % 6, 1))
            .collect();

        let parallel = compute_loss(&model, &comps, LossKind::L2Hinge);
        let sequential: f64 = comps
            .iter()
            .map(|c| {
                LossKind::L2Hinge.margin_loss(model.margin(c.user_id, c.item1_id, c.item2_id))
            })
            .sum();
        assert!((parallel - sequential).abs() < 1e-9);
    }

    #[test]
    fn test_bpr_zero_model() {
        // Every pair contributes ln(2).
        let model = FactorModel::zeros(2, 4, 3);
        let positives = vec![vec![0, 1], vec![2]];
        let negatives = vec![vec![2, 3], vec![0, 1, 3]];

        let expected = 7.0 * 2.0f64.ln();
        assert!((compute_loss_bpr(&model, &positives, &negatives) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_squared_loss_hand_computed() {
        // U_0 = [1, 0], V = [[1, 0], [0, 1]]; scores: (0,0) -> 1, (0,1) -> 0.
        let model = FactorModel::from_flat(vec![1.0, 0.0], vec![1.0, 0.0, 0.0, 1.0], 2).unwrap();
        let test = RatingMatrix::from_ratings(vec![
            Rating::new(0, 0, 3.0),
            Rating::new(0, 1, 1.0),
        ]);

        // 0.5 * (3 - 1)^2 + 0.5 * (1 - 0)^2 = 2.5
        assert!((compute_squared_loss(&model, &test) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_exact_prediction_squared_loss_zero() {
        let model = FactorModel::from_flat(vec![2.0], vec![1.5, -1.0], 1).unwrap();
        let test = RatingMatrix::from_ratings(vec![
            Rating::new(0, 0, 3.0),
            Rating::new(0, 1, -2.0),
        ]);
        assert!(compute_squared_loss(&model, &test).abs() < 1e-12);
    }
}
