// src/similarity.rs
//! Statistical relevance: TF-IDF vector space over the query plus all candidate
//! texts, cosine similarity between the query row and each candidate row.
//!
//! The space is fitted per call from the corpus passed in. Nothing is kept
//! between calls, so concurrent runs never share a vocabulary.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics::SIMILARITY_FAILURES;

pub const DEFAULT_MAX_FEATURES: usize = 1000;
pub const DEFAULT_NGRAM_MAX: usize = 2;

/// Vectorizer knobs. Defaults: 1000 terms, unigrams + bigrams.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorizerParams {
    pub max_features: usize,
    pub ngram_max: usize,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            ngram_max: DEFAULT_NGRAM_MAX,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    #[error("empty vocabulary; corpus has only stop words or no tokens")]
    EmptyVocabulary,
    #[error("max_features must be positive")]
    NoFeatures,
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
        "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
        "amongst", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
        "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
        "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below",
        "beside", "besides", "between", "beyond", "both", "but", "by", "can", "cannot", "could",
        "did", "do", "does", "doing", "done", "down", "due", "during", "each", "eg", "either",
        "else", "elsewhere", "enough", "etc", "even", "ever", "every", "everyone", "everything",
        "everywhere", "except", "few", "for", "former", "formerly", "from", "further", "had",
        "has", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hers",
        "herself", "him", "himself", "his", "how", "however", "ie", "if", "in", "indeed",
        "into", "is", "it", "its", "itself", "just", "last", "latter", "least", "less", "many",
        "may", "me", "meanwhile", "might", "more", "moreover", "most", "mostly", "much", "must",
        "my", "myself", "namely", "neither", "never", "nevertheless", "next", "no", "nobody",
        "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on",
        "once", "only", "onto", "or", "other", "others", "otherwise", "our", "ours",
        "ourselves", "out", "over", "own", "per", "perhaps", "please", "rather", "re", "same",
        "seem", "seemed", "seeming", "seems", "several", "she", "should", "since", "so", "some",
        "somehow", "someone", "something", "sometime", "sometimes", "somewhere", "still",
        "such", "than", "that", "the", "their", "them", "themselves", "then", "thence", "there",
        "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they", "this",
        "those", "though", "through", "throughout", "thru", "thus", "to", "together", "too",
        "toward", "towards", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
        "well", "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter",
        "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while",
        "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within",
        "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Lowercased word tokens (2+ chars) with stop words removed, then 1..=n-grams.
pub fn analyze(text: &str, ngram_max: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !STOP_WORDS.contains(w))
        .collect();

    let mut terms: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    for n in 2..=ngram_max.max(1) {
        if words.len() < n {
            break;
        }
        for window in words.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

/// Fit a TF-IDF space over `[query] + texts` and return cosine(query, text_i).
pub fn try_similarity_scores(
    query: &str,
    texts: &[String],
    params: VectorizerParams,
) -> Result<Vec<f32>, SimilarityError> {
    if params.max_features == 0 {
        return Err(SimilarityError::NoFeatures);
    }

    // Row 0 is the query.
    let docs: Vec<HashMap<String, u32>> = std::iter::once(query)
        .chain(texts.iter().map(String::as_str))
        .map(|d| {
            let mut counts = HashMap::new();
            for t in analyze(d, params.ngram_max) {
                *counts.entry(t).or_insert(0u32) += 1;
            }
            counts
        })
        .collect();

    // Corpus-wide frequency and document frequency; BTreeMap keeps ties alphabetical.
    let mut total: BTreeMap<&str, (u64, u32)> = BTreeMap::new();
    for doc in &docs {
        for (term, &c) in doc {
            let e = total.entry(term.as_str()).or_insert((0, 0));
            e.0 += c as u64;
            e.1 += 1;
        }
    }
    if total.is_empty() {
        return Err(SimilarityError::EmptyVocabulary);
    }

    let mut ranked: Vec<(&str, u64, u32)> = total.into_iter().map(|(t, (c, df))| (t, c, df)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(params.max_features);

    let n_docs = docs.len() as f32;
    let idf: HashMap<&str, f32> = ranked
        .iter()
        .map(|(t, _, df)| (*t, ((1.0 + n_docs) / (1.0 + *df as f32)).ln() + 1.0))
        .collect();

    // BTreeMap rows keep float summation order stable between runs.
    let vectorize = |doc: &HashMap<String, u32>| -> BTreeMap<&str, f32> {
        let mut v: BTreeMap<&str, f32> = doc
            .iter()
            .filter_map(|(t, &c)| idf.get_key_value(t.as_str()).map(|(k, w)| (*k, c as f32 * w)))
            .collect();
        let norm = v.values().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.values_mut() {
                *x /= norm;
            }
        }
        v
    };

    let q = vectorize(&docs[0]);
    let scores = docs[1..]
        .iter()
        .map(|d| {
            let v = vectorize(d);
            let dot: f32 = v.iter().filter_map(|(t, x)| q.get(t).map(|y| x * y)).sum();
            dot.clamp(0.0, 1.0)
        })
        .collect();
    Ok(scores)
}

/// Infallible wrapper: on degenerate input every candidate scores 0.0.
pub fn similarity_scores(query: &str, texts: &[String], params: VectorizerParams) -> Vec<f32> {
    match try_similarity_scores(query, texts, params) {
        Ok(scores) => {
            debug!(candidates = texts.len(), "similarity scored");
            scores
        }
        Err(e) => {
            counter!(SIMILARITY_FAILURES).increment(1);
            warn!(stage = "similarity", error = %e, candidates = texts.len(), "similarity scoring degraded to zeros");
            vec![0.0; texts.len()]
        }
    }
}
