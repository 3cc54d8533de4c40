use crate::error::{AlertError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

/// Same token rule as the vectorizer was fitted with: runs of two or more word chars.
static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    #[default]
    L2,
    None,
}

/// A fitted TF-IDF vectorizer.
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f32>,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Norm,
}

fn default_lowercase() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

impl TfidfVectorizer {
    /// Number of features each transformed document has.
    pub fn width(&self) -> usize {
        self.idf.len()
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram_range ({min_n}, {max_n})"));
        }
        if let Some((term, column)) = self.vocabulary.iter().find(|(_, c)| **c >= self.width()) {
            return Err(format!(
                "vocabulary term '{term}' maps to column {column} but idf has {} entries",
                self.width()
            ));
        }
        Ok(())
    }

    fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens: Vec<&str> = TOKEN_PATTERN.find_iter(&text).map(|m| m.as_str()).collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        terms
    }

    /// Dense TF-IDF row for one document. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> Result<Vec<f32>> {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for term in self.analyze(text) {
            if let Some(&column) = self.vocabulary.get(&term) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut row = vec![0.0f32; self.width()];
        for (column, count) in counts {
            let idf = *self.idf.get(column).ok_or_else(|| {
                AlertError::Prediction(format!("vocabulary column {column} outside idf"))
            })?;
            let tf = if self.sublinear_tf { 1.0 + count.ln() } else { count };
            row[column] = tf * idf;
        }

        if self.norm == Norm::L2 {
            let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                row.iter_mut().for_each(|v| *v /= norm);
            }
        }
        Ok(row)
    }
}
