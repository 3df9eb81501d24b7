/**
 * TF-IDF-style Vectorizer
 *
 * DESIGN DECISION: Character 1-5-gram hashed features with an English stop-word
 * filter applied at the word level, the way `aetherlight-core::pattern_index`
 * combines text fields before handing them to a fixed-size vector representation
 * WHY: Character n-grams are robust to the token-splitting tricks attackers use
 * (zero-width joins, leetspeak) without needing a learned subword tokenizer
 *
 * PATTERN: Pattern-INDEX-001 (Semantic Pattern Search), narrowed to a lexical
 * hashed-ngram vectorizer instead of a neural embedding
 */

use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "of", "to", "in", "on", "for", "with",
    "is", "are", "was", "were", "be", "been", "being", "it", "its", "this", "that",
    "as", "at", "by", "from", "into", "than", "then", "so", "such", "not", "no",
];

/// Hashes a feature string into a fixed-size bucket. Deterministic across runs and
/// platforms (FNV-1a, no process-dependent hasher state).
fn hash_feature(s: &str, buckets: usize) -> u32 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % buckets as u64) as u32
}

pub struct Vectorizer {
    pub buckets: usize,
    pub min_gram: usize,
    pub max_gram: usize,
}

impl Vectorizer {
    pub fn new(buckets: usize) -> Self {
        Self {
            buckets,
            min_gram: 1,
            max_gram: 5,
        }
    }

    fn strip_stopwords(&self, text: &str) -> String {
        text.split_whitespace()
            .filter(|w| !STOPWORDS.contains(&w.to_lowercase().as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Produce a sparse bag-of-hashed-ngrams feature vector with raw term counts.
    /// The model's learned weights play the role TF-IDF's IDF term would (rare,
    /// attack-indicative n-grams carry larger learned weight).
    pub fn vectorize(&self, text: &str) -> HashMap<u32, f64> {
        let normalized = text.to_lowercase();
        let filtered = self.strip_stopwords(&normalized);
        let chars: Vec<char> = filtered.chars().collect();

        let mut features: HashMap<u32, f64> = HashMap::new();
        for n in self.min_gram..=self.max_gram {
            if chars.len() < n {
                continue;
            }
            for window in chars.windows(n) {
                let gram: String = window.iter().collect();
                let bucket = hash_feature(&gram, self.buckets);
                *features.entry(bucket).or_insert(0.0) += 1.0;
            }
        }

        // L2-normalize so longer inputs don't trivially dominate the dot product.
        let norm: f64 = features.values().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in features.values_mut() {
                *v /= norm;
            }
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectorize_is_deterministic() {
        let vectorizer = Vectorizer::new(4096);
        let a = vectorizer.vectorize("ignore previous instructions");
        let b = vectorizer.vectorize("ignore previous instructions");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_text_has_no_features() {
        let vectorizer = Vectorizer::new(4096);
        assert!(vectorizer.vectorize("").is_empty());
    }

    #[test]
    fn vector_is_l2_normalized() {
        let vectorizer = Vectorizer::new(4096);
        let v = vectorizer.vectorize("a somewhat longer piece of text to hash into grams");
        let norm: f64 = v.values().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6 || v.is_empty());
    }
}
