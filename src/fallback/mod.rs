//! Model fallback chains.
//!
//! A fallback chain maps a model identifier to an ordered list of substitute
//! models that are tried once the primary's retries are exhausted. The table is
//! static configuration: lookups never mutate it, and the caller tracks how
//! many fallbacks it has already tried.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Ordered fallback candidates per model identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackChains {
    chains: BTreeMap<String, Vec<String>>,
}

impl FallbackChains {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table used when no configuration overrides it.
    pub fn builtin() -> Self {
        Self::new()
            .with_chain(
                "claude-sonnet-4-20250514",
                ["claude-3-5-sonnet-20241022", "gpt-4o"],
            )
            .with_chain("gpt-4o", ["gpt-4o-mini", "claude-sonnet-4-20250514"])
            .with_chain("ollama/llama3.2", ["ollama/mistral", "gpt-4o-mini"])
    }

    /// Adds or replaces the chain for a model.
    pub fn with_chain<I, S>(mut self, model: impl Into<String>, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains
            .insert(model.into(), fallbacks.into_iter().map(Into::into).collect());
        self
    }

    /// Returns the fallback at position `tried` in the chain for `model`.
    ///
    /// `tried` is the number of fallbacks the caller has already attempted.
    /// Returns `None` when the model has no chain or the chain is exhausted.
    pub fn next_fallback(&self, model: &str, tried: usize) -> Option<&str> {
        self.chains
            .get(model)
            .and_then(|chain| chain.get(tried))
            .map(String::as_str)
    }

    /// Returns the full chain for a model, if one is configured.
    pub fn chain(&self, model: &str) -> Option<&[String]> {
        self.chains.get(model).map(Vec::as_slice)
    }

    /// Iterates over all configured `(model, chain)` pairs in model order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.chains
            .iter()
            .map(|(model, chain)| (model.as_str(), chain.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Finds models that can reach themselves again by repeatedly following
    /// the first entry of each chain, which is what a caller does when it
    /// feeds every fallback back in as the next current model.
    ///
    /// Each returned path starts and ends with the same model. Cycles are
    /// reported, not rejected: keeping chains acyclic is left to whoever
    /// writes the configuration.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut reported: BTreeSet<Vec<String>> = BTreeSet::new();

        for start in self.chains.keys() {
            let mut path = vec![start.clone()];
            let mut current = start.as_str();

            while let Some(next) = self.next_fallback(current, 0) {
                if let Some(pos) = path.iter().position(|m| m == next) {
                    let mut cycle = path[pos..].to_vec();
                    // Rotate so the smallest id leads; one report per cycle.
                    if let Some(min_pos) = cycle
                        .iter()
                        .enumerate()
                        .min_by(|a, b| a.1.cmp(b.1))
                        .map(|(i, _)| i)
                    {
                        cycle.rotate_left(min_pos);
                    }
                    let first = cycle[0].clone();
                    cycle.push(first);
                    reported.insert(cycle);
                    break;
                }
                path.push(next.to_string());
                current = next;
            }
        }

        reported.into_iter().collect()
    }
}

impl<M, S> FromIterator<(M, Vec<S>)> for FallbackChains
where
    M: Into<String>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (M, Vec<S>)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |chains, (model, fallbacks)| {
                chains.with_chain(model, fallbacks)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let chains = FallbackChains::builtin();
        assert_eq!(chains.len(), 3);
        assert_eq!(
            chains.next_fallback("claude-sonnet-4-20250514", 0),
            Some("claude-3-5-sonnet-20241022")
        );
        assert_eq!(
            chains.next_fallback("claude-sonnet-4-20250514", 1),
            Some("gpt-4o")
        );
        assert_eq!(chains.next_fallback("ollama/llama3.2", 0), Some("ollama/mistral"));
    }

    #[test]
    fn test_next_fallback_past_end_or_unknown_model() {
        let chains = FallbackChains::builtin();
        assert_eq!(chains.next_fallback("gpt-4o", 2), None);
        assert_eq!(chains.next_fallback("gpt-4o", usize::MAX), None);
        assert_eq!(chains.next_fallback("mistral-large", 0), None);
    }

    #[test]
    fn test_next_fallback_is_idempotent() {
        let chains = FallbackChains::builtin();
        for tried in 0..3 {
            let first = chains.next_fallback("gpt-4o", tried);
            for _ in 0..5 {
                assert_eq!(chains.next_fallback("gpt-4o", tried), first);
            }
        }
    }

    #[test]
    fn test_empty_chain_yields_nothing() {
        let chains = FallbackChains::new().with_chain("model-A", Vec::<String>::new());
        assert_eq!(chains.chain("model-A"), Some(&[][..]));
        assert_eq!(chains.next_fallback("model-A", 0), None);
    }

    #[test]
    fn test_from_iter() {
        let chains: FallbackChains =
            vec![("model-A", vec!["model-B", "model-C"])].into_iter().collect();
        assert_eq!(chains.next_fallback("model-A", 1), Some("model-C"));
        assert_eq!(chains.iter().count(), 1);
    }

    #[test]
    fn test_builtin_table_has_no_first_entry_cycle() {
        // gpt-4o lists claude-sonnet-4 second; only first entries are followed.
        let cycles = FallbackChains::builtin().cycles();
        assert!(cycles.is_empty(), "{cycles:?}");
    }

    #[test]
    fn test_cycles_detects_two_model_loop_once() {
        let chains = FallbackChains::new()
            .with_chain("model-B", ["model-A"])
            .with_chain("model-A", ["model-B"])
            .with_chain("model-C", ["model-A"]);

        let cycles = chains.cycles();
        assert_eq!(
            cycles,
            vec![vec![
                "model-A".to_string(),
                "model-B".to_string(),
                "model-A".to_string()
            ]]
        );
    }

    #[test]
    fn test_self_loop() {
        let chains = FallbackChains::new().with_chain("model-A", ["model-A"]);
        assert_eq!(
            chains.cycles(),
            vec![vec!["model-A".to_string(), "model-A".to_string()]]
        );
    }

    #[test]
    fn test_deserialize_from_toml_table() {
        let chains: FallbackChains = toml::from_str(
            r#"
            "model-A" = ["model-B"]
            "ollama/llama3.2" = ["ollama/mistral"]
            "#,
        )
        .unwrap();
        assert_eq!(chains.next_fallback("model-A", 0), Some("model-B"));
        assert_eq!(chains.next_fallback("ollama/llama3.2", 0), Some("ollama/mistral"));
    }
}
