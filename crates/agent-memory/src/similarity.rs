//! Term-frequency similarity used to rank context records

use agent_core::ContextRecord;
use std::cmp::Ordering;
use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
    "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "what", "with",
];

/// Sparse term-frequency vector
pub type TermVector = HashMap<String, f32>;

/// Lowercased alphanumeric tokens, minus stopwords and single characters
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Build a term-frequency vector
pub fn term_vector(text: &str) -> TermVector {
    let mut vector = TermVector::new();
    for token in tokenize(text) {
        *vector.entry(token).or_insert(0.0) += 1.0;
    }
    vector
}

/// Cosine similarity between two sparse vectors, 0.0 when either is empty
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let dot_product: f32 = small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| x * y))
        .sum();
    let norm_a: f32 = a.values().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.values().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank records against `topic` and keep the best `k`
///
/// Higher similarity first; ties resolve to the most recently committed
/// record. A wildcard (`*`) or blank topic ranks purely by recency.
pub fn rank(records: Vec<ContextRecord>, topic: &str, k: usize) -> Vec<ContextRecord> {
    let topic = topic.trim();
    let query = if topic == "*" {
        TermVector::new()
    } else {
        term_vector(topic)
    };

    let mut scored: Vec<(f32, ContextRecord)> = records
        .into_iter()
        .map(|record| {
            let score = if query.is_empty() {
                0.0
            } else {
                cosine_similarity(&query, &term_vector(&record.content))
            };
            (score, record)
        })
        .collect();

    scored.sort_by(|(sa, ra), (sb, rb)| match sb.total_cmp(sa) {
        Ordering::Equal => rb.sequence.cmp(&ra.sequence),
        other => other,
    });

    scored.into_iter().take(k).map(|(_, record)| record).collect()
}
