use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// One observed (or predicted) user-item affinity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: usize,
    pub item_id: usize,
    pub score: f64,
}

impl Rating {
    pub fn new(user_id: usize, item_id: usize, score: f64) -> Self {
        Self {
            user_id,
            item_id,
            score,
        }
    }

    pub fn set_values(&mut self, user_id: usize, item_id: usize, score: f64) {
        self.user_id = user_id;
        self.item_id = item_id;
        self.score = score;
    }
}

/// A supervisory pairwise judgment: `user_id` prefers `item1_id` over
/// `item2_id`. The sign convention of `comp` is caller-defined; the loss
/// engine only treats the record as a directed preference edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub user_id: usize,
    pub item1_id: usize,
    pub item2_id: usize,
    pub comp: i32,
}

impl Comparison {
    pub fn new(user_id: usize, item1_id: usize, item2_id: usize, comp: i32) -> Self {
        Self {
            user_id,
            item1_id,
            item2_id,
            comp,
        }
    }

    pub fn set_values(&mut self, user_id: usize, item1_id: usize, item2_id: usize, comp: i32) {
        self.user_id = user_id;
        self.item1_id = item1_id;
        self.item2_id = item2_id;
        self.comp = comp;
    }
}

impl Default for Comparison {
    fn default() -> Self {
        Self {
            user_id: 0,
            item1_id: 0,
            item2_id: 0,
            comp: 1,
        }
    }
}

/// User-major order for comparisons: by user, then by first item.
pub fn comp_userwise(a: &Comparison, b: &Comparison) -> Ordering {
    a.user_id
        .cmp(&b.user_id)
        .then(a.item1_id.cmp(&b.item1_id))
}

/// Item-major order for comparisons: by first item, then by user.
pub fn comp_itemwise(a: &Comparison, b: &Comparison) -> Ordering {
    a.item1_id
        .cmp(&b.item1_id)
        .then(a.user_id.cmp(&b.user_id))
}

/// User-major order for ratings: by user, then by item. This is the order
/// that gives `RatingMatrix` its contiguous per-user blocks.
pub fn rating_userwise(a: &Rating, b: &Rating) -> Ordering {
    a.user_id.cmp(&b.user_id).then(a.item_id.cmp(&b.item_id))
}

/// Score-descending order for ratings.
pub fn rating_scorewise(a: &Rating, b: &Rating) -> Ordering {
    b.score.total_cmp(&a.score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let r = Rating::default();
        assert_eq!(r, Rating::new(0, 0, 0.0));

        let c = Comparison::default();
        assert_eq!(c.user_id, 0);
        assert_eq!(c.item1_id, 0);
        assert_eq!(c.item2_id, 0);
        assert_eq!(c.comp, 1);
    }

    #[test]
    fn test_set_values() {
        let mut r = Rating::default();
        r.set_values(3, 7, 4.5);
        assert_eq!(r, Rating::new(3, 7, 4.5));

        let mut c = Comparison::default();
        c.set_values(1, 2, 3, -1);
        assert_eq!(c, Comparison::new(1, 2, 3, -1));
    }

    #[test]
    fn test_rating_userwise_sort() {
        let mut ratings = vec![
            Rating::new(1, 2, 1.0),
            Rating::new(0, 5, 2.0),
            Rating::new(1, 0, 3.0),
            Rating::new(0, 1, 4.0),
        ];
        ratings.sort_by(rating_userwise);

        let keys: Vec<(usize, usize)> = ratings.iter().map(|r| (r.user_id, r.item_id)).collect();
        assert_eq!(keys, vec![(0, 1), (0, 5), (1, 0), (1, 2)]);
    }

    #[test]
    fn test_comparison_orders() {
        let a = Comparison::new(0, 3, 1, 1);
        let b = Comparison::new(1, 2, 0, 1);

        assert_eq!(comp_userwise(&a, &b), Ordering::Less);
        assert_eq!(comp_itemwise(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_rating_scorewise_descending() {
        let mut ratings = vec![
            Rating::new(0, 0, 1.0),
            Rating::new(0, 1, 3.0),
            Rating::new(0, 2, 2.0),
        ];
        ratings.sort_by(rating_scorewise);

        let scores: Vec<f64> = ratings.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![3.0, 2.0, 1.0]);
    }
}
