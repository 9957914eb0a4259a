use indexmap::IndexMap;

use crate::transform::TokenMapper;
use crate::types::Token;

/// Predicted effect of applying one mapper to an existing vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingEstimate {
    /// Vocabulary after mapping, in first-seen order.
    pub vocabulary: IndexMap<Token, u64>,
    /// Distinct types removed (negative when the mapper adds types).
    pub type_reduction: i64,
    /// Token occurrences merged into an earlier type (reductive mappers) or
    /// split apart (expansive mappers).
    pub tokens_affected: u64,
}

/// Estimate how `mapper` would change `vocabulary` without re-reading the corpus.
///
/// A mapper that splits at least one type is expansive: only the occurrences
/// of types that did not map to exactly one fragment count as affected.
/// Otherwise it is reductive, and a type counts as affected when its mapped
/// form collides with a type already produced.
pub fn estimate_mapping(vocabulary: &IndexMap<Token, u64>, mapper: &TokenMapper) -> MappingEstimate {
    let mapped_types: Vec<(Vec<Token>, u64)> = vocabulary
        .iter()
        .map(|(token, count)| (mapper.map_token(token), *count))
        .collect();
    let expansive = mapped_types
        .iter()
        .any(|(fragments, _)| fragments.len() != 1);

    let mut mapped: IndexMap<Token, u64> = IndexMap::new();
    let mut tokens_affected = 0u64;
    for (fragments, count) in mapped_types {
        let affected = if expansive {
            fragments.len() != 1
        } else {
            mapped.contains_key(&fragments[0])
        };
        if affected {
            tokens_affected += count;
        }
        for fragment in fragments {
            *mapped.entry(fragment).or_insert(0) += count;
        }
    }
    let type_reduction = vocabulary.len() as i64 - mapped.len() as i64;
    MappingEstimate {
        vocabulary: mapped,
        type_reduction,
        tokens_affected,
    }
}
