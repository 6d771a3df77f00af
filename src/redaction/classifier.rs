//! PII classification capability and the built-in rule classifier

use std::collections::HashSet;
use std::fs;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::config::ClassifierConfig;
use crate::error::ClassificationError;

/// Decides whether a single whitespace-delimited token is PII.
///
/// Implementations must be deterministic for a given token and loaded state,
/// and must not mutate shared state while classifying: one instance is shared
/// by every pipeline in the process.
pub trait PiiClassifier: Send + Sync {
    fn classify(&self, token: &str) -> Result<bool, ClassificationError>;

    fn name(&self) -> &str {
        "classifier"
    }
}

impl<F> PiiClassifier for F
where
    F: Fn(&str) -> Result<bool, ClassificationError> + Send + Sync,
{
    fn classify(&self, token: &str) -> Result<bool, ClassificationError> {
        self(token)
    }

    fn name(&self) -> &str {
        "fn"
    }
}

lazy_static! {
    static ref BUILTIN_RULES: Vec<(&'static str, Regex)> = vec![
        ("email", Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()),
        ("phone", Regex::new(r"^\+?\(?\d{1,4}\)?[-.]?\d{2,4}[-.]?\d{3,4}[-.]?\d{0,4}$").unwrap()),
        ("ssn", Regex::new(r"^\d{3}-\d{2}-\d{4}$").unwrap()),
        ("date", Regex::new(r"^(\d{1,4}[/.-]\d{1,2}[/.-]\d{1,4})$").unwrap()),
        ("digits", Regex::new(r"\d").unwrap()),
    ];
}

/// Names accepted in `ClassifierConfig::rules`
pub fn builtin_rule_names() -> Vec<&'static str> {
    BUILTIN_RULES.iter().map(|(name, _)| *name).collect()
}

/// Regex and word-list classifier, loaded once and read-only afterwards
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: Vec<(String, Regex)>,
    lexicon: HashSet<String>,
}

impl RuleClassifier {
    pub fn new(rules: Vec<(String, Regex)>, lexicon: HashSet<String>) -> Self {
        Self { rules, lexicon }
    }

    /// Builds the classifier from configuration, reading the lexicon file if any.
    ///
    /// A bad rule name, an invalid pattern or an unreadable lexicon leaves the
    /// classifier unavailable.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassificationError> {
        let mut rules = Vec::new();
        for name in &config.rules {
            let (_, regex) = BUILTIN_RULES
                .iter()
                .find(|(builtin, _)| *builtin == name.as_str())
                .ok_or_else(|| ClassificationError::Unavailable(format!("Unknown rule: {}", name)))?;
            rules.push((name.clone(), regex.clone()));
        }
        for (i, pattern) in config.extra_patterns.iter().enumerate() {
            let regex = Regex::new(pattern).map_err(|e| {
                ClassificationError::Unavailable(format!("Invalid pattern {:?}: {}", pattern, e))
            })?;
            rules.push((format!("pattern{}", i), regex));
        }

        let lexicon = match &config.lexicon_path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    ClassificationError::Unavailable(format!("Cannot load lexicon {}: {}", path.display(), e))
                })?;
                parse_lexicon(&content)
            }
            None => HashSet::new(),
        };

        info!(rules = rules.len(), lexicon = lexicon.len(), "Rule classifier loaded");
        Ok(Self::new(rules, lexicon))
    }

    pub fn with_lexicon_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.lexicon
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
        self
    }
}

impl PiiClassifier for RuleClassifier {
    fn classify(&self, token: &str) -> Result<bool, ClassificationError> {
        if self.lexicon.contains(&token.to_lowercase()) {
            return Ok(true);
        }
        if let Some((name, _)) = self.rules.iter().find(|(_, regex)| regex.is_match(token)) {
            debug!(rule = %name, "Token matched rule");
            return Ok(true);
        }
        Ok(false)
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// One entry per line; blank lines and `#` comments are ignored
pub fn parse_lexicon(content: &str) -> HashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}
