// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! User-rated effectiveness of a suggestion type.

use pulse_core::error::EffectivenessError;
use pulse_core::suggestion::SuggestionType;
use serde::Serialize;
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
/// Age in days over which a rating's weight decays by a factor of e.
const DECAY_DAYS: f64 = 30.0;
/// Ratings needed for full confidence.
const FULL_CONFIDENCE_RATINGS: f64 = 10.0;
/// Score reported before any rating is known.
const NEUTRAL_SCORE: f64 = 3.0;
/// Difference between recent and earlier means that counts as a trend.
const TREND_THRESHOLD: f64 = 0.5;

/// Direction of a suggestion type's recent ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EffectivenessTrend {
    /// Recent ratings are clearly better than earlier ones.
    Improving,
    /// No clear change.
    Stable,
    /// Recent ratings are clearly worse than earlier ones.
    Declining,
    /// Fewer than three ratings.
    Unknown,
}

/// One user rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rating {
    /// Rating from 1 to 5.
    pub value: u8,
    /// Free-form user feedback.
    pub feedback: String,
    /// When the rating was given.
    pub timestamp: SystemTime,
}

/// Snapshot of an effectiveness record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectivenessSummary {
    /// The rated suggestion type.
    pub suggestion_type: SuggestionType,
    /// Number of ratings.
    pub rating_count: usize,
    /// Plain mean rating.
    pub average_rating: f64,
    /// Time-weighted score.
    pub current_score: f64,
    /// Confidence in the score, 0 to 1.
    pub confidence: f64,
    /// Direction of recent ratings.
    pub trend: EffectivenessTrend,
    /// Whether the type is considered effective.
    pub is_effective: bool,
    /// Whether the type may still be suggested.
    pub should_recommend: bool,
}

/// Rating history of one suggestion type.
#[derive(Debug, Clone)]
pub struct SuggestionEffectiveness {
    suggestion_type: SuggestionType,
    ratings: Vec<Rating>,
}

impl SuggestionEffectiveness {
    pub fn new(suggestion_type: SuggestionType) -> Self {
        Self {
            suggestion_type,
            ratings: Vec::new(),
        }
    }

    pub fn suggestion_type(&self) -> SuggestionType {
        self.suggestion_type
    }

    /// Records a rating given now.
    pub fn add_rating(
        &mut self,
        rating: u8,
        feedback: impl Into<String>,
    ) -> Result<(), EffectivenessError> {
        self.add_rating_at(rating, feedback, SystemTime::now())
    }

    /// Records a rating given at `timestamp`, e.g. when restoring history.
    pub fn add_rating_at(
        &mut self,
        rating: u8,
        feedback: impl Into<String>,
        timestamp: SystemTime,
    ) -> Result<(), EffectivenessError> {
        if !(1..=5).contains(&rating) {
            return Err(EffectivenessError::InvalidRating(rating));
        }
        self.ratings.push(Rating {
            value: rating,
            feedback: feedback.into(),
            timestamp,
        });
        Ok(())
    }

    pub fn rating_count(&self) -> usize {
        self.ratings.len()
    }

    /// The last `count` ratings, oldest first.
    pub fn recent_ratings(&self, count: usize) -> &[Rating] {
        &self.ratings[self.ratings.len().saturating_sub(count)..]
    }

    /// Plain mean of all ratings, 3.0 before any rating.
    pub fn average_rating(&self) -> f64 {
        if self.ratings.is_empty() {
            return NEUTRAL_SCORE;
        }
        mean(&self.ratings)
    }

    /// Mean rating weighted by `exp(-age_days / 30)`, with ages in whole days.
    pub fn current_score(&self) -> f64 {
        self.score_at(SystemTime::now())
    }

    fn score_at(&self, now: SystemTime) -> f64 {
        let (weighted, total_weight) =
            self.ratings
                .iter()
                .fold((0.0, 0.0), |(weighted, total), rating| {
                    let age = now
                        .duration_since(rating.timestamp)
                        .unwrap_or(Duration::ZERO);
                    let days = (age.as_secs() / SECONDS_PER_DAY) as f64;
                    let weight = (-days / DECAY_DAYS).exp();
                    (weighted + rating.value as f64 * weight, total + weight)
                });

        if total_weight > 0.0 {
            weighted / total_weight
        } else {
            NEUTRAL_SCORE
        }
    }

    /// Confidence in the score, from the rating count and their agreement.
    pub fn confidence(&self) -> f64 {
        if self.ratings.is_empty() {
            return 0.0;
        }
        let count_factor = (self.ratings.len() as f64 / FULL_CONFIDENCE_RATINGS).min(1.0);
        let avg = mean(&self.ratings);
        let variance = self
            .ratings
            .iter()
            .map(|r| (r.value as f64 - avg).powi(2))
            .sum::<f64>()
            / self.ratings.len() as f64;
        let consistency = (1.0 - variance / 4.0).max(0.1);
        count_factor * consistency
    }

    pub fn is_effective(&self) -> bool {
        self.current_score() >= 3.5 && self.confidence() >= 0.3
    }

    /// Unproven types are always recommended; proven ones need a score of 3.
    pub fn should_recommend(&self) -> bool {
        self.confidence() < 0.2 || self.current_score() >= 3.0
    }

    /// Compares the most recent half of the ratings with the earlier half.
    pub fn trend(&self) -> EffectivenessTrend {
        let n = self.ratings.len();
        if n < 3 {
            return EffectivenessTrend::Unknown;
        }
        let recent_count = (n / 2).max(1);
        let (earlier, recent) = self.ratings.split_at(n - recent_count);
        let diff = mean(recent) - mean(earlier);
        if diff > TREND_THRESHOLD {
            EffectivenessTrend::Improving
        } else if diff < -TREND_THRESHOLD {
            EffectivenessTrend::Declining
        } else {
            EffectivenessTrend::Stable
        }
    }

    pub fn summary(&self) -> EffectivenessSummary {
        EffectivenessSummary {
            suggestion_type: self.suggestion_type,
            rating_count: self.rating_count(),
            average_rating: self.average_rating(),
            current_score: self.current_score(),
            confidence: self.confidence(),
            trend: self.trend(),
            is_effective: self.is_effective(),
            should_recommend: self.should_recommend(),
        }
    }
}

fn mean(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| r.value as f64).sum::<f64>() / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn record() -> SuggestionEffectiveness {
        SuggestionEffectiveness::new(SuggestionType::ReduceRenderDistance)
    }

    #[test]
    fn test_rejects_out_of_range_ratings() {
        let mut e = record();
        assert_eq!(e.add_rating(0, ""), Err(EffectivenessError::InvalidRating(0)));
        assert_eq!(e.add_rating(6, ""), Err(EffectivenessError::InvalidRating(6)));
        assert_eq!(e.rating_count(), 0);
        assert!(e.add_rating(1, "").is_ok());
        assert!(e.add_rating(5, "").is_ok());
    }

    #[test]
    fn test_empty_record_is_neutral() {
        let e = record();
        assert_abs_diff_eq!(e.average_rating(), 3.0);
        assert_abs_diff_eq!(e.current_score(), 3.0);
        assert_abs_diff_eq!(e.confidence(), 0.0);
        assert_eq!(e.trend(), EffectivenessTrend::Unknown);
        assert!(e.should_recommend());
        assert!(!e.is_effective());
    }

    #[test]
    fn test_rating_moves_score_toward_itself() {
        let mut e = record();
        e.add_rating(3, "").unwrap();
        let before = e.current_score();
        e.add_rating(5, "").unwrap();
        assert!(e.current_score() > before);

        let before = e.current_score();
        e.add_rating(1, "").unwrap();
        assert!(e.current_score() < before);
    }

    #[test]
    fn test_old_ratings_weigh_less() {
        let mut e = record();
        let now = SystemTime::now();
        let sixty_days = Duration::from_secs(60 * SECONDS_PER_DAY);
        e.add_rating_at(1, "old", now - sixty_days).unwrap();
        e.add_rating_at(5, "new", now).unwrap();
        // w_old = e^-2, w_new = 1
        let w = (-2.0f64).exp();
        assert_abs_diff_eq!(e.score_at(now), (w + 5.0) / (w + 1.0), epsilon = 1e-9);
        assert_abs_diff_eq!(e.average_rating(), 3.0);
    }

    #[test]
    fn test_confidence_grows_and_penalizes_disagreement() {
        let mut e = record();
        for _ in 0..3 {
            e.add_rating(5, "").unwrap();
        }
        assert_abs_diff_eq!(e.confidence(), 0.3, epsilon = 1e-12);

        let mut split = record();
        for i in 0..10 {
            split.add_rating(if i % 2 == 0 { 1 } else { 5 }, "").unwrap();
        }
        // variance 4 clamps consistency to 0.1
        assert_abs_diff_eq!(split.confidence(), 0.1, epsilon = 1e-12);
        // too uncertain to rule the type out
        assert!(split.should_recommend());
    }

    #[test]
    fn test_effective_after_three_top_ratings_then_declining() {
        let mut e = record();
        for _ in 0..3 {
            e.add_rating(5, "great").unwrap();
        }
        assert!(e.is_effective());
        assert!(e.should_recommend());
        assert_eq!(e.trend(), EffectivenessTrend::Stable);

        let mut previous = e.current_score();
        for _ in 0..7 {
            e.add_rating(1, "worse").unwrap();
            let score = e.current_score();
            assert!(score < previous, "{score} should be below {previous}");
            previous = score;
        }
        assert!(previous < 3.0);
        assert_eq!(e.trend(), EffectivenessTrend::Declining);
        assert!(!e.is_effective());
    }

    #[test]
    fn test_improving_trend() {
        let mut e = record();
        for r in [1, 2, 4, 5] {
            e.add_rating(r, "").unwrap();
        }
        assert_eq!(e.trend(), EffectivenessTrend::Improving);
    }

    #[test]
    fn test_recent_ratings_and_summary() {
        let mut e = record();
        for r in [2, 3, 4] {
            e.add_rating(r, format!("r{r}")).unwrap();
        }
        let recent: Vec<u8> = e.recent_ratings(2).iter().map(|r| r.value).collect();
        assert_eq!(recent, vec![3, 4]);
        assert_eq!(e.recent_ratings(10).len(), 3);

        let summary = e.summary();
        assert_eq!(summary.rating_count, 3);
        assert_abs_diff_eq!(summary.average_rating, 3.0);
        assert_eq!(summary.suggestion_type, SuggestionType::ReduceRenderDistance);
    }
}
