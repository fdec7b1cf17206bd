use crate::models::comments::{Comment, Sentiment};
use serde::Serialize;

/// Number of comments per sentiment category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentCounts([u64; 5]);

impl SentimentCounts {
    pub fn new(against: u64, slightly_against: u64, neutral: u64, slightly_for: u64, for_: u64) -> Self {
        Self([against, slightly_against, neutral, slightly_for, for_])
    }

    /// Tallies comments by sentiment; comments without one are not counted.
    pub fn tally<'a, I>(comments: I) -> Self
    where
        I: IntoIterator<Item = &'a Comment>,
    {
        let mut counts = Self::default();
        for sentiment in comments.into_iter().filter_map(|c| c.sentiment) {
            counts.add(sentiment, 1);
        }
        counts
    }

    pub fn add(&mut self, sentiment: Sentiment, n: u64) {
        let slot = &mut self.0[sentiment.ordinal()];
        *slot = slot.saturating_add(n);
    }

    pub fn get(&self, sentiment: Sentiment) -> u64 {
        self.0[sentiment.ordinal()]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().fold(0u64, |total, n| total.saturating_add(*n))
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl FromIterator<(Sentiment, u64)> for SentimentCounts {
    fn from_iter<T: IntoIterator<Item = (Sentiment, u64)>>(iter: T) -> Self {
        let mut counts = Self::default();
        for (sentiment, n) in iter {
            counts.add(sentiment, n);
        }
        counts
    }
}

/// Rounded share of each category, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentPercentages {
    pub against: u8,
    pub slightly_against: u8,
    pub neutral: u8,
    pub slightly_for: u8,
    #[serde(rename = "for")]
    pub for_: u8,
}

impl SentimentPercentages {
    /// `round(100 * count / total)` per category, each rounded on its own, so
    /// the sum may drift from 100 by a point or two. A zero total gives zeros.
    pub fn from_counts(counts: &SentimentCounts) -> Self {
        let pct = |s| percentage(counts.get(s), counts.total());
        Self {
            against: pct(Sentiment::Against),
            slightly_against: pct(Sentiment::SlightlyAgainst),
            neutral: pct(Sentiment::Neutral),
            slightly_for: pct(Sentiment::SlightlyFor),
            for_: pct(Sentiment::For),
        }
    }

    pub fn get(&self, sentiment: Sentiment) -> u8 {
        match sentiment {
            Sentiment::Against => self.against,
            Sentiment::SlightlyAgainst => self.slightly_against,
            Sentiment::Neutral => self.neutral,
            Sentiment::SlightlyFor => self.slightly_for,
            Sentiment::For => self.for_,
        }
    }

    pub fn sum(&self) -> u32 {
        Sentiment::ALL.iter().map(|s| u32::from(self.get(*s))).sum()
    }
}

/// Half-up integer rounding of `100 * count / total`.
fn percentage(count: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    // Widened: server-supplied counts can be arbitrarily large.
    let (count, total) = (u128::from(count), u128::from(total));
    let rounded = (200 * count + total) / (2 * total);
    rounded.min(100) as u8
}

/// What the sentiment bar shows. Always derived from the unfiltered set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentSnapshot {
    pub percentages: SentimentPercentages,
    pub show: bool,
}

impl SentimentSnapshot {
    /// The bar is hidden when there are no comments at all, or when none of
    /// them carries a sentiment.
    pub fn compute(counts: &SentimentCounts, comment_count: usize) -> Self {
        Self {
            percentages: SentimentPercentages::from_counts(counts),
            show: comment_count > 0 && !counts.is_empty(),
        }
    }
}

/// Client-side, single-category sentiment filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentFilter {
    selected: Option<Sentiment>,
}

impl SentimentFilter {
    pub fn new(selected: Option<Sentiment>) -> Self {
        Self { selected }
    }

    /// Selecting the active category clears the filter.
    pub fn toggle(&mut self, sentiment: Sentiment) {
        self.selected = if self.selected == Some(sentiment) {
            None
        } else {
            Some(sentiment)
        };
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<Sentiment> {
        self.selected
    }

    pub fn is_active(&self, sentiment: Sentiment) -> bool {
        self.selected == Some(sentiment)
    }

    pub fn matches(&self, comment: &Comment) -> bool {
        match self.selected {
            Some(selected) => comment.sentiment == Some(selected),
            None => true,
        }
    }

    pub fn apply(&self, comments: &[Comment]) -> Vec<Comment> {
        comments.iter().filter(|c| self.matches(c)).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn tagged(id: &str, sentiment: Option<Sentiment>) -> Comment {
        let mut c = Comment::new(id, Utc::now());
        c.sentiment = sentiment;
        c
    }

    #[test]
    fn three_to_one_against() {
        let counts = SentimentCounts::new(3, 1, 0, 0, 0);
        assert_eq!(
            SentimentPercentages::from_counts(&counts),
            SentimentPercentages {
                against: 75,
                slightly_against: 25,
                neutral: 0,
                slightly_for: 0,
                for_: 0,
            }
        );
    }

    #[test]
    fn zero_total_is_all_zero_and_hidden() {
        let counts = SentimentCounts::default();
        let snapshot = SentimentSnapshot::compute(&counts, 4);
        assert_eq!(snapshot.percentages, SentimentPercentages::default());
        assert!(!snapshot.show);
    }

    #[test]
    fn hidden_without_comments_even_with_counts() {
        let counts = SentimentCounts::new(1, 0, 0, 0, 0);
        assert!(!SentimentSnapshot::compute(&counts, 0).show);
        assert!(SentimentSnapshot::compute(&counts, 1).show);
    }

    #[test]
    fn rounding_halves_go_up() {
        // 1/8 = 12.5% -> 13, 7/8 = 87.5% -> 88.
        let counts = SentimentCounts::new(1, 0, 0, 0, 7);
        let pct = SentimentPercentages::from_counts(&counts);
        assert_eq!(pct.against, 13);
        assert_eq!(pct.for_, 88);
        assert_eq!(pct.sum(), 101);
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        let counts = SentimentCounts::new(u64::MAX, u64::MAX, 0, 0, 0);
        assert_eq!(counts.total(), u64::MAX);
        let pct = SentimentPercentages::from_counts(&counts);
        assert_eq!(pct.against, 100);
        assert_eq!(pct.slightly_against, 100);
    }

    #[test]
    fn tally_skips_unset() {
        let comments = [
            tagged("a", Some(Sentiment::For)),
            tagged("b", None),
            tagged("c", Some(Sentiment::For)),
            tagged("d", Some(Sentiment::Neutral)),
        ];
        let counts = SentimentCounts::tally(&comments);
        assert_eq!(counts.get(Sentiment::For), 2);
        assert_eq!(counts.get(Sentiment::Neutral), 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn counts_from_pairs() {
        let counts: SentimentCounts = [(Sentiment::Against, 2), (Sentiment::Against, 1)]
            .into_iter()
            .collect();
        assert_eq!(counts.get(Sentiment::Against), 3);
    }

    #[test]
    fn filter_toggles() {
        let comments = [
            tagged("a", Some(Sentiment::Against)),
            tagged("b", Some(Sentiment::For)),
            tagged("c", None),
        ];
        let mut filter = SentimentFilter::default();
        assert_eq!(filter.apply(&comments).len(), 3);

        filter.toggle(Sentiment::Against);
        assert!(filter.is_active(Sentiment::Against));
        let ids: Vec<_> = filter.apply(&comments).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["a"]);

        filter.toggle(Sentiment::Against);
        assert_eq!(filter.selected(), None);
        assert_eq!(filter.apply(&comments), comments.to_vec());

        filter.toggle(Sentiment::Against);
        filter.toggle(Sentiment::For);
        let ids: Vec<_> = filter.apply(&comments).into_iter().map(|c| c.id).collect();
        assert_eq!(ids, ["b"]);
    }

    proptest! {
        #[test]
        fn percentages_stay_in_bounds(counts in prop::array::uniform5(0u64..10_000)) {
            let counts = SentimentCounts::new(counts[0], counts[1], counts[2], counts[3], counts[4]);
            let pct = SentimentPercentages::from_counts(&counts);
            for s in Sentiment::ALL {
                prop_assert!(pct.get(s) <= 100);
            }
            if counts.total() == 0 {
                prop_assert_eq!(pct.sum(), 0);
            } else {
                // Independent rounding drifts by at most half a point per category.
                prop_assert!((97..=103).contains(&pct.sum()));
            }
        }
    }
}
