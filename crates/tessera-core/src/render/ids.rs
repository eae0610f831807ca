//! # Identifier Mapping
//!
//! Bidirectional mapping between full identifiers (absolute IRIs) and the
//! compact form used on the wire.
//!
//! ```text
//! http://purl.obolibrary.org/obo/GO_0006915  <->  GO:0006915
//! http://example.org/custom#thing            <->  http://example.org/custom#thing
//! ```
//!
//! A full id compacts only when it sits directly under the namespace and its
//! local part is non-empty, contains `_`, and contains neither `:` nor `/`.
//! Everything else passes through unchanged, which keeps
//! `to_full(to_compact(x)) == x` for every absolute IRI.

use crate::IndividualId;
use std::collections::BTreeMap;

/// Compact/full identifier mapping for one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMapper {
    namespace: String,
    /// Shorthand without a colon (`part_of`) -> full id.
    aliases: BTreeMap<String, String>,
}

impl IdMapper {
    /// Create a mapper for the given namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            aliases: BTreeMap::new(),
        }
    }

    /// Register a colon-free shorthand for a full id.
    pub fn insert_alias(&mut self, alias: impl Into<String>, full: impl Into<String>) {
        self.aliases.insert(alias.into(), full.into());
    }

    /// The namespace local parts are resolved against.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Map a full id to its compact form.
    #[must_use]
    pub fn to_compact(&self, full: &str) -> String {
        match full.strip_prefix(self.namespace.as_str()) {
            Some(local) if is_compactable(local) => local.replacen('_', ":", 1),
            _ => full.to_string(),
        }
    }

    /// Map a compact id back to its full form.
    ///
    /// Colon-free ids are resolved through the alias table first and fall
    /// back to a plain local part under the namespace.
    #[must_use]
    pub fn to_full(&self, compact: &str) -> String {
        if compact.contains("://") {
            return compact.to_string();
        }
        if compact.contains(':') {
            return format!("{}{}", self.namespace, compact.replacen(':', "_", 1));
        }
        match self.aliases.get(compact) {
            Some(full) => full.clone(),
            None => format!("{}{}", self.namespace, compact),
        }
    }

    /// Mint the full id of the `sequence`-th individual of a model.
    ///
    /// The result always compacts to `{normalized model id}:{sequence}`.
    #[must_use]
    pub fn mint_individual(&self, model_id: &str, sequence: u64) -> IndividualId {
        IndividualId(format!(
            "{}{}_{}",
            self.namespace,
            normalize_id_part(model_id),
            sequence
        ))
    }
}

fn is_compactable(local: &str) -> bool {
    !local.is_empty() && local.contains('_') && !local.contains(':') && !local.contains('/')
}

/// Replace every non-alphanumeric character with `-`.
#[must_use]
pub fn normalize_id_part(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::DEFAULT_NAMESPACE;

    fn mapper() -> IdMapper {
        let mut mapper = IdMapper::new(DEFAULT_NAMESPACE);
        mapper.insert_alias("part_of", format!("{DEFAULT_NAMESPACE}BFO_0000050"));
        mapper
    }

    #[test]
    fn compacts_namespace_ids() {
        let full = format!("{DEFAULT_NAMESPACE}GO_0006915");
        assert_eq!(mapper().to_compact(&full), "GO:0006915");
        assert_eq!(mapper().to_full("GO:0006915"), full);
    }

    #[test]
    fn only_first_separator_is_replaced() {
        let full = format!("{DEFAULT_NAMESPACE}NCBITaxon_7227_x");
        assert_eq!(mapper().to_compact(&full), "NCBITaxon:7227_x");
        assert_eq!(mapper().to_full("NCBITaxon:7227_x"), full);
    }

    #[test]
    fn foreign_iris_pass_through() {
        let full = "http://example.org/thing_one";
        assert_eq!(mapper().to_compact(full), full);
        assert_eq!(mapper().to_full(full), full);
    }

    #[test]
    fn non_compactable_local_parts_stay_full() {
        for local in ["plain", "a:b_c", "dir/x_y"] {
            let full = format!("{DEFAULT_NAMESPACE}{local}");
            assert_eq!(mapper().to_compact(&full), full);
        }
    }

    #[test]
    fn colon_free_ids_use_aliases() {
        assert_eq!(
            mapper().to_full("part_of"),
            format!("{DEFAULT_NAMESPACE}BFO_0000050")
        );
        assert_eq!(
            mapper().to_full("unknown"),
            format!("{DEFAULT_NAMESPACE}unknown")
        );
    }

    #[test]
    fn minted_individuals_roundtrip() {
        let id = mapper().mint_individual("gomodel:fb-GO-0006915", 3);
        let compact = mapper().to_compact(id.as_str());
        assert_eq!(compact, "gomodel-fb-GO-0006915:3");
        assert_eq!(mapper().to_full(&compact), id.as_str());
    }

    #[test]
    fn normalize_replaces_punctuation() {
        assert_eq!(normalize_id_part("GO:0006915"), "GO-0006915");
        assert_eq!(normalize_id_part("a b/c"), "a-b-c");
    }
}
