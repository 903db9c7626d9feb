//! Asset name to ticker resolution.
//!
//! Sources are consulted in order and the first one that answers wins:
//!
//! 1. the model's batch answer, unless it is missing or `"N/A"`
//! 2. the override table
//! 3. the market suffix rule, which always answers
//!
//! The first source needs one text generation call per batch. Every failure
//! on that path degrades to an empty answer, never to an error.

use crate::core::prompts::ticker_mapping_prompt;
use crate::domain::model::{TickerMapping, NOT_AVAILABLE};
use crate::domain::ports::TextGenerator;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_TICKER_SUFFIX: &str = ".NS";

/// Names the model and the suffix rule are known to get wrong.
pub static DEFAULT_OVERRIDES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    [
        ("MIDCAPIETF-EQ", "MIDCAP.NS"),
        ("GOLDBEES-EQ", "GOLDBEES.NS"),
        ("NIFTYIETF-EQ", "NIFTYBEES.NS"),
        (
            "ICICI Prudential Nifty LargeMidcap 250 Index Fund - Growth",
            "ICICILARGEMID.NS",
        ),
    ]
    .into_iter()
    .map(|(name, ticker)| (name.to_string(), ticker.to_string()))
    .collect()
});

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```json(.*?)```").expect("fence pattern is valid"));

static JSON_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("array pattern is valid"));

pub trait TickerSource: Send + Sync {
    fn ticker_for(&self, name: &str) -> Option<String>;
}

/// Snapshot of one batch answer from the model.
#[derive(Debug, Clone, Default)]
pub struct GeneratedTickers {
    map: HashMap<String, String>,
}

impl GeneratedTickers {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl TickerSource for GeneratedTickers {
    fn ticker_for(&self, name: &str) -> Option<String> {
        self.map
            .get(name)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty() && *t != NOT_AVAILABLE)
            .map(str::to_string)
    }
}

#[derive(Debug, Clone)]
pub struct OverrideTable {
    overrides: HashMap<String, String>,
}

impl OverrideTable {
    /// Built-in overrides plus `extra`; `extra` wins on conflicts.
    pub fn with_extra(extra: &HashMap<String, String>) -> Self {
        let mut overrides = (*DEFAULT_OVERRIDES).clone();
        overrides.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { overrides }
    }

    pub fn contains_ticker(&self, ticker: &str) -> bool {
        self.overrides.values().any(|t| t == ticker)
    }
}

impl Default for OverrideTable {
    fn default() -> Self {
        Self {
            overrides: (*DEFAULT_OVERRIDES).clone(),
        }
    }
}

impl TickerSource for OverrideTable {
    fn ticker_for(&self, name: &str) -> Option<String> {
        self.overrides.get(name).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct SuffixRule {
    suffix: String,
}

impl SuffixRule {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl TickerSource for SuffixRule {
    fn ticker_for(&self, name: &str) -> Option<String> {
        if name.ends_with(&self.suffix) {
            Some(name.to_string())
        } else {
            Some(format!("{}{}", name, self.suffix))
        }
    }
}

/// Walk `chain` and return the first answer, or `"N/A"` if nobody answers.
pub fn first_answer(chain: &[&dyn TickerSource], name: &str) -> String {
    chain
        .iter()
        .find_map(|source| source.ticker_for(name))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Pull the JSON payload out of a chatty model answer.
///
/// Prefers a fenced ```` ```json ```` block, then the widest `[...]` span.
pub fn extract_json_payload(raw: &str) -> Option<&str> {
    if let Some(inner) = JSON_FENCE.captures(raw).and_then(|c| c.get(1)) {
        return Some(inner.as_str().trim());
    }
    JSON_ARRAY.find(raw).map(|m| m.as_str())
}

/// Parse `[{"name": .., "ticker": ..}, ..]`, skipping incomplete entries.
pub fn parse_ticker_json(raw: &str) -> Option<HashMap<String, String>> {
    let payload = extract_json_payload(raw)?;
    let entries: Vec<Value> = match serde_json::from_str(payload) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("⚠️ Ticker mapping is not valid JSON: {}", e);
            return None;
        }
    };

    let map = entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let ticker = entry.get("ticker")?.as_str()?;
            if name.is_empty() || ticker.is_empty() {
                return None;
            }
            Some((name.to_string(), ticker.to_string()))
        })
        .collect();
    Some(map)
}

pub struct TickerResolver<G: TextGenerator> {
    generator: G,
    overrides: OverrideTable,
    suffix_rule: SuffixRule,
}

impl<G: TextGenerator> TickerResolver<G> {
    pub fn new(generator: G, overrides: OverrideTable, suffix: impl Into<String>) -> Self {
        Self {
            generator,
            overrides,
            suffix_rule: SuffixRule::new(suffix),
        }
    }

    /// Deterministic answer for `name`, no external call.
    pub fn fallback_ticker(&self, name: &str) -> String {
        let chain: [&dyn TickerSource; 2] = [&self.overrides, &self.suffix_rule];
        first_answer(&chain, name)
    }

    /// Ask the model for all names at once. Never fails.
    pub async fn lookup_batch(&self, names: &[String]) -> GeneratedTickers {
        if names.is_empty() {
            return GeneratedTickers::default();
        }

        let prompt = ticker_mapping_prompt(names, self.suffix_rule.suffix());
        tracing::debug!("Requesting tickers for {} names", names.len());

        let raw = match self.generator.generate_text(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("⚠️ Ticker lookup failed, using fallback tickers: {}", e);
                return GeneratedTickers::default();
            }
        };

        match parse_ticker_json(&raw) {
            Some(map) => {
                tracing::debug!("Model returned {} ticker entries", map.len());
                GeneratedTickers::new(map)
            }
            None => {
                tracing::warn!("⚠️ No JSON detected in ticker lookup response");
                GeneratedTickers::default()
            }
        }
    }

    /// Resolve every distinct name in `names`, keeping first-seen order.
    pub async fn resolve(&self, names: &[String]) -> Vec<TickerMapping> {
        let mut seen = HashSet::new();
        let distinct: Vec<String> = names
            .iter()
            .filter(|n| seen.insert(n.as_str()))
            .cloned()
            .collect();

        let generated = self.lookup_batch(&distinct).await;
        let chain: [&dyn TickerSource; 3] = [&generated, &self.overrides, &self.suffix_rule];

        distinct
            .into_iter()
            .map(|name| {
                let ticker = first_answer(&chain, &name);
                tracing::debug!("🔎 {} -> {}", name, ticker);
                TickerMapping {
                    asset_name: name,
                    ticker,
                }
            })
            .collect()
    }
}
