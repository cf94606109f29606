//! Occasion rules and advice selection
//!
//! Maps an occasion to a rule, matches rule keywords against the image
//! caption and picks one canned piece of advice at random from the bucket
//! that applies.

use crate::{Error, Result};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

const DEFAULT_RULES: &str = include_str!("../data/advice_rules.json");

/// Advice rule for a single occasion.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OccasionRule {
    /// Advice that applies no matter what the photo shows.
    Always { always: Vec<String> },
    /// Keyword-gated advice: `formal` when any keyword is in the caption.
    Conditional {
        keywords: Vec<String>,
        formal: Vec<String>,
        casual: Vec<String>,
    },
}

/// Which bucket a selection was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Always,
    Formal,
    Casual,
}

impl OccasionRule {
    /// Decide which bucket applies to an already lower-cased caption.
    fn bucket_for(&self, description: &str) -> (Bucket, &[String]) {
        match self {
            OccasionRule::Always { always } => (Bucket::Always, always.as_slice()),
            OccasionRule::Conditional {
                keywords,
                formal,
                casual,
            } => {
                if keywords.iter().any(|keyword| description.contains(keyword.as_str())) {
                    (Bucket::Formal, formal.as_slice())
                } else {
                    (Bucket::Casual, casual.as_slice())
                }
            }
        }
    }

    fn validate(&self, occasion: &str) -> Result<()> {
        let buckets: Vec<(&str, &[String])> = match self {
            OccasionRule::Always { always } => vec![("always", always.as_slice())],
            OccasionRule::Conditional {
                keywords,
                formal,
                casual,
            } => {
                if keywords.iter().any(|k| k.trim().is_empty()) {
                    return Err(Error::Config(format!(
                        "Occasion '{}' has an empty keyword",
                        occasion
                    )));
                }
                vec![("formal", formal.as_slice()), ("casual", casual.as_slice())]
            }
        };

        for (name, advice) in buckets {
            if advice.is_empty() {
                return Err(Error::Config(format!(
                    "Occasion '{}' has an empty '{}' advice list",
                    occasion, name
                )));
            }
        }
        Ok(())
    }

    fn lowercase_keywords(&mut self) {
        if let OccasionRule::Conditional { keywords, .. } = self {
            for keyword in keywords.iter_mut() {
                *keyword = keyword.to_lowercase();
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    default_occasion: String,
    occasions: HashMap<String, OccasionRule>,
}

/// Immutable occasion → rule mapping with a fallback occasion.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: HashMap<String, OccasionRule>,
    default_occasion: String,
    fallback: OccasionRule,
}

impl RuleTable {
    /// The rule table bundled with the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_json(DEFAULT_RULES)
    }

    /// Load a rule table from a JSON file on disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: RuleFile = serde_json::from_str(json)?;
        Self::new(file.occasions, file.default_occasion)
    }

    /// Build and validate a table. Every advice list must be non-empty and
    /// `default_occasion` must name one of the rules.
    pub fn new(rules: HashMap<String, OccasionRule>, default_occasion: String) -> Result<Self> {
        let mut rules = rules;
        for (occasion, rule) in rules.iter_mut() {
            rule.validate(occasion)?;
            rule.lowercase_keywords();
        }

        let fallback = rules.get(&default_occasion).cloned().ok_or_else(|| {
            Error::Config(format!(
                "Default occasion '{}' is not defined in the rule table",
                default_occasion
            ))
        })?;

        Ok(Self {
            rules,
            default_occasion,
            fallback,
        })
    }

    /// Resolve an occasion, falling back to the default for unknown names.
    pub fn rule_for(&self, occasion: &str) -> &OccasionRule {
        self.rules.get(occasion).unwrap_or(&self.fallback)
    }

    pub fn default_occasion(&self) -> &str {
        &self.default_occasion
    }

    pub fn occasions(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Pick advice for a caption and occasion using the supplied RNG.
    pub fn select_advice<R: Rng + ?Sized>(
        &self,
        description: &str,
        occasion: &str,
        rng: &mut R,
    ) -> &str {
        self.select_with_bucket(description, occasion, rng).1
    }

    /// Same as [`RuleTable::select_advice`] but also reports the bucket used.
    pub fn select_with_bucket<R: Rng + ?Sized>(
        &self,
        description: &str,
        occasion: &str,
        rng: &mut R,
    ) -> (Bucket, &str) {
        let desc = description.to_lowercase();
        let (bucket, advice) = self.rule_for(occasion).bucket_for(&desc);

        // Buckets are non-empty after validation.
        let choice = advice.choose(rng).map(String::as_str).unwrap_or_default();
        (bucket, choice)
    }
}

/// Thread-safe advice selector owning the rule table and its random source.
pub struct AdviceSelector {
    rules: RuleTable,
    rng: Mutex<StdRng>,
}

impl AdviceSelector {
    pub fn new(rules: RuleTable, rng: StdRng) -> Self {
        Self {
            rules,
            rng: Mutex::new(rng),
        }
    }

    /// Seed from OS entropy, or from `seed` for reproducible runs.
    pub fn with_seed(rules: RuleTable, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rules, rng)
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn advise(&self, description: &str, occasion: &str) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (bucket, advice) = self
            .rules
            .select_with_bucket(description, occasion, &mut *rng);
        tracing::debug!(occasion, ?bucket, "Selected advice");
        advice.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> RuleTable {
        RuleTable::embedded().unwrap()
    }

    fn always_set(table: &RuleTable, occasion: &str) -> Vec<String> {
        match table.rule_for(occasion) {
            OccasionRule::Always { always } => always.clone(),
            other => panic!("expected always rule for {}, got {:?}", occasion, other),
        }
    }

    fn conditional_sets(table: &RuleTable, occasion: &str) -> (Vec<String>, Vec<String>) {
        match table.rule_for(occasion) {
            OccasionRule::Conditional { formal, casual, .. } => (formal.clone(), casual.clone()),
            other => panic!("expected conditional rule for {}, got {:?}", occasion, other),
        }
    }

    #[test]
    fn test_embedded_table_has_all_occasions() {
        let table = table();
        let mut occasions: Vec<&str> = table.occasions().collect();
        occasions.sort_unstable();
        assert_eq!(
            occasions,
            vec!["casual", "date", "formal", "gym", "job_interview", "party"]
        );
        assert_eq!(table.default_occasion(), "casual");
    }

    #[test]
    fn test_unknown_occasion_behaves_like_casual() {
        let table = table();
        for seed in 0..20 {
            let mut a = StdRng::seed_from_u64(seed);
            let mut b = StdRng::seed_from_u64(seed);
            assert_eq!(
                table.select_advice("a man in a suit", "wedding", &mut a),
                table.select_advice("a man in a suit", "casual", &mut b)
            );
        }
        assert_eq!(table.rule_for("wedding"), table.rule_for("casual"));
        assert_eq!(table.rule_for(""), table.rule_for("casual"));
    }

    #[test]
    fn test_always_rules_ignore_description() {
        let table = table();
        let mut rng = StdRng::seed_from_u64(7);

        for occasion in ["party", "casual"] {
            let allowed = always_set(&table, occasion);
            for description in ["a man in a suit and tie", "a dog on a beach", ""] {
                let (bucket, advice) = table.select_with_bucket(description, occasion, &mut rng);
                assert_eq!(bucket, Bucket::Always);
                assert!(allowed.iter().any(|a| a == advice), "{} not allowed", advice);
            }
        }
    }

    #[test]
    fn test_job_interview_suit_is_formal_any_case() {
        let table = table();
        let (formal, _) = conditional_sets(&table, "job_interview");
        let mut rng = StdRng::seed_from_u64(1);

        for description in ["a man wearing a SUIT", "A Suit on a hanger", "suit"] {
            for _ in 0..10 {
                let (bucket, advice) =
                    table.select_with_bucket(description, "job_interview", &mut rng);
                assert_eq!(bucket, Bucket::Formal);
                assert!(formal.iter().any(|a| a == advice));
            }
        }
    }

    #[test]
    fn test_job_interview_without_keywords_is_casual() {
        let table = table();
        let (_, casual) = conditional_sets(&table, "job_interview");
        let mut rng = StdRng::seed_from_u64(2);

        for _ in 0..10 {
            let (bucket, advice) = table.select_with_bucket(
                "a woman in jeans and a hoodie standing in a park",
                "job_interview",
                &mut rng,
            );
            assert_eq!(bucket, Bucket::Casual);
            assert!(casual.iter().any(|a| a == advice));
        }
    }

    #[test]
    fn test_keyword_matches_as_substring() {
        let table = table();
        let mut rng = StdRng::seed_from_u64(3);
        let (bucket, _) = table.select_with_bucket("a boy in a t-shirt", "job_interview", &mut rng);
        assert_eq!(bucket, Bucket::Formal);

        let (bucket, _) = table.select_with_bucket("a runner in sportswear", "gym", &mut rng);
        assert_eq!(bucket, Bucket::Formal);
    }

    #[test]
    fn test_repeated_calls_stay_within_set() {
        let table = table();
        let (formal, _) = conditional_sets(&table, "date");
        let mut rng = StdRng::seed_from_u64(99);
        let mut seen = std::collections::HashSet::new();

        for _ in 0..200 {
            let advice = table.select_advice("an elegant red dress", "date", &mut rng);
            assert!(formal.iter().any(|a| a == advice));
            seen.insert(advice.to_string());
        }
        // All three strings show up over enough draws
        assert_eq!(seen.len(), formal.len());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = AdviceSelector::with_seed(table(), Some(42));
        let b = AdviceSelector::with_seed(table(), Some(42));

        let first: Vec<String> = (0..10).map(|_| a.advise("a suit", "formal")).collect();
        let second: Vec<String> = (0..10).map(|_| b.advise("a suit", "formal")).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_keywords_are_lowercased_on_load() {
        let table = RuleTable::from_json(
            r#"{
                "default_occasion": "casual",
                "occasions": {
                    "casual": { "always": ["ok"] },
                    "beach": { "keywords": ["SWIM"], "formal": ["yes"], "casual": ["no"] }
                }
            }"#,
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(table.select_advice("a swimsuit", "beach", &mut rng), "yes");
        assert_eq!(table.select_advice("a coat", "beach", &mut rng), "no");
    }

    #[test]
    fn test_rejects_missing_default_occasion() {
        let err = RuleTable::from_json(
            r#"{ "default_occasion": "casual", "occasions": { "party": { "always": ["x"] } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_empty_bucket() {
        let err = RuleTable::from_json(
            r#"{
                "default_occasion": "casual",
                "occasions": {
                    "casual": { "always": ["ok"] },
                    "gym": { "keywords": ["shorts"], "formal": [], "casual": ["no"] }
                }
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("gym"));
    }

    #[test]
    fn test_rejects_empty_keyword() {
        let err = RuleTable::from_json(
            r#"{
                "default_occasion": "casual",
                "occasions": {
                    "casual": { "always": ["ok"] },
                    "gym": { "keywords": [" "], "formal": ["a"], "casual": ["b"] }
                }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(&path, DEFAULT_RULES).unwrap();

        let table = RuleTable::from_file(&path).unwrap();
        assert_eq!(table.occasions().count(), 6);
    }
}
