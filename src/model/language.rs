use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::id::LanguageId;
use crate::rng::mix64;

/// A language is only its seed: words are a pure function of
/// `(language seed, word seed)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: LanguageId,
    pub seed: u64,
    onsets: Vec<String>,
    nuclei: Vec<String>,
    codas: Vec<String>,
}

const ONSETS: &[&str] = &[
    "b", "d", "g", "k", "l", "m", "n", "p", "r", "s", "t", "v", "z", "th", "sh", "kr", "tr",
    "gl", "h", "",
];
const NUCLEI: &[&str] = &["a", "e", "i", "o", "u", "ai", "ei", "ou", "aa", "y"];
const CODAS: &[&str] = &["", "", "n", "m", "r", "l", "s", "k", "th", "nd"];

impl Language {
    /// Derive a phoneme inventory from the seed. Each language keeps a
    /// subset of the shared inventory so languages sound distinct.
    pub fn new(id: LanguageId, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(mix64(seed));
        let pick = |rng: &mut SmallRng, pool: &[&str], keep: usize| -> Vec<String> {
            let mut chosen: Vec<String> = Vec::with_capacity(keep);
            while chosen.len() < keep {
                let s = pool[rng.random_range(0..pool.len())];
                if !chosen.iter().any(|c| c == s) {
                    chosen.push(s.to_string());
                }
            }
            chosen
        };
        let onsets = pick(&mut rng, ONSETS, 8);
        let nuclei = pick(&mut rng, NUCLEI, 4);
        let codas = pick(&mut rng, CODAS, 3);
        Self {
            id,
            seed,
            onsets,
            nuclei,
            codas,
        }
    }

    /// Generate a capitalized word. Same inputs always give the same word.
    pub fn word(&self, word_seed: u64) -> String {
        let mut rng = SmallRng::seed_from_u64(mix64(self.seed ^ mix64(word_seed)));
        let syllables = rng.random_range(1..=3);
        let mut word = String::new();
        for _ in 0..syllables {
            word.push_str(&self.onsets[rng.random_range(0..self.onsets.len())]);
            word.push_str(&self.nuclei[rng.random_range(0..self.nuclei.len())]);
            word.push_str(&self.codas[rng.random_range(0..self.codas.len())]);
        }
        capitalize(&word)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_deterministic() {
        let lang = Language::new(LanguageId(1), 77);
        assert_eq!(lang.word(5), lang.word(5));
        assert_eq!(Language::new(LanguageId(1), 77), lang);
    }

    #[test]
    fn words_are_nonempty_and_capitalized() {
        let lang = Language::new(LanguageId(2), 1234);
        for seed in 0..50 {
            let w = lang.word(seed);
            assert!(!w.is_empty());
            assert!(w.chars().next().unwrap().is_uppercase());
        }
    }

    #[test]
    fn different_languages_differ() {
        let a = Language::new(LanguageId(1), 1);
        let b = Language::new(LanguageId(2), 2);
        let words_a: Vec<String> = (0..10).map(|s| a.word(s)).collect();
        let words_b: Vec<String> = (0..10).map(|s| b.word(s)).collect();
        assert_ne!(words_a, words_b);
    }
}
