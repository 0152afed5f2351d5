//! Answer normalisation: move the correct answer to its planned slot.
//!
//! Two paths, chosen by [`RawQuestion::well_formed_index`]:
//!
//! * **Well-formed**: four non-empty answers and a valid correct index. The
//!   correct text goes to the target slot; the three incorrect answers are
//!   shuffled and fill the remaining slots in order. Answer text is never
//!   edited, only moved.
//! * **Malformed**: answers and index pass through untouched and the record
//!   is flagged `degraded`. Malformed questions are still persisted.

use crate::planner::{TargetPosition, ANSWER_SLOTS};
use crate::question::{FinalQuestion, RawQuestion};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

/// Normalise one raw question for `quiz_id` so its correct answer sits at
/// `target`. Never fails.
pub fn normalize<R: Rng + ?Sized>(
    raw: &RawQuestion,
    target: TargetPosition,
    quiz_id: &str,
    rng: &mut R,
) -> FinalQuestion {
    let Some(correct_idx) = raw.well_formed_index() else {
        warn!(
            "Quiz {}: malformed question ({} answers, correct_answer {:?}) stored without rebalancing",
            quiz_id,
            raw.answers.len(),
            raw.correct_index
        );
        return FinalQuestion {
            quiz_id: quiz_id.to_string(),
            text: raw.text.clone(),
            answers: raw.answers.clone(),
            correct_index: raw.correct_index,
            degraded: true,
        };
    };

    let correct = raw.answers[correct_idx].clone();
    let mut incorrect: Vec<String> = raw
        .answers
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != correct_idx)
        .map(|(_, a)| a.clone())
        .collect();
    incorrect.shuffle(rng);

    let mut incorrect = incorrect.into_iter();
    let mut answers = Vec::with_capacity(ANSWER_SLOTS);
    for slot in 0..ANSWER_SLOTS {
        if slot == target.index() {
            answers.push(correct.clone());
        } else if let Some(a) = incorrect.next() {
            answers.push(a);
        }
    }

    FinalQuestion {
        quiz_id: quiz_id.to_string(),
        text: raw.text.clone(),
        answers,
        correct_index: Some(target.index() as i64),
        degraded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn raw(answers: &[&str], correct: i64) -> RawQuestion {
        RawQuestion::new(
            "Which organelle produces ATP?",
            answers.iter().map(|s| s.to_string()).collect(),
            correct,
        )
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn correct_answer_lands_on_target() {
        let mut rng = StdRng::seed_from_u64(8);
        let q = raw(&["Nucleus", "Mitochondrion", "Ribosome", "Golgi"], 1);
        for t in 0..ANSWER_SLOTS {
            let target = TargetPosition::new(t).unwrap();
            let f = normalize(&q, target, "quiz-1", &mut rng);
            assert_eq!(f.correct_index, Some(t as i64));
            assert_eq!(f.answers[t], "Mitochondrion");
            assert_eq!(f.correct_answer(), Some("Mitochondrion"));
            assert!(!f.degraded);
            assert_eq!(f.quiz_id, "quiz-1");
            assert_eq!(f.text, q.text);
        }
    }

    #[test]
    fn answer_multiset_is_preserved() {
        let mut rng = StdRng::seed_from_u64(21);
        for correct in 0..4 {
            let q = raw(&["alpha", "beta", "gamma", "beta "], correct);
            for t in 0..ANSWER_SLOTS {
                let f = normalize(&q, TargetPosition::new(t).unwrap(), "q", &mut rng);
                assert_eq!(sorted(f.answers.clone()), sorted(q.answers.clone()));
                assert_eq!(f.answers[t], q.answers[correct as usize]);
            }
        }
    }

    #[test]
    fn duplicate_answer_text_is_kept() {
        let mut rng = StdRng::seed_from_u64(4);
        let q = raw(&["same", "same", "other", "same"], 2);
        let f = normalize(&q, TargetPosition::new(0).unwrap(), "q", &mut rng);
        assert_eq!(f.answers[0], "other");
        assert_eq!(f.answers.iter().filter(|a| *a == "same").count(), 3);
    }

    #[test]
    fn incorrect_answers_are_shuffled() {
        let q = raw(&["A", "B", "C", "D"], 0);
        let target = TargetPosition::new(0).unwrap();
        let orders: std::collections::HashSet<Vec<String>> = (0..50)
            .map(|seed| normalize(&q, target, "q", &mut StdRng::seed_from_u64(seed)).answers)
            .collect();
        assert!(orders.len() > 1, "incorrect answers never reordered");
    }

    #[test]
    fn malformed_passes_through() {
        let mut rng = StdRng::seed_from_u64(0);
        let q = raw(&["a", "b", "c"], 2);
        let f = normalize(&q, TargetPosition::new(0).unwrap(), "q", &mut rng);
        assert!(f.degraded);
        assert_eq!(f.answers, q.answers);
        assert_eq!(f.correct_index, Some(2));
    }

    #[test]
    fn missing_index_passes_through() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut q = raw(&["a", "b", "c", "d"], 0);
        q.correct_index = None;
        let f = normalize(&q, TargetPosition::new(3).unwrap(), "q", &mut rng);
        assert!(f.degraded);
        assert_eq!(f.correct_index, None);
        assert_eq!(f.answers, q.answers);
    }

    #[test]
    fn original_correct_text_is_recoverable() {
        let mut rng = StdRng::seed_from_u64(99);
        let q = raw(&["w", "x", "y", "z"], 3);
        let f = normalize(&q, TargetPosition::new(1).unwrap(), "q", &mut rng);
        let recovered = q
            .answers
            .iter()
            .position(|a| Some(a.as_str()) == f.correct_answer());
        assert_eq!(recovered, Some(3));
        assert_eq!(q.answers[recovered.unwrap()], "z");
    }
}
