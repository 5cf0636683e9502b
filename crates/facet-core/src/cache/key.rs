use crate::optimizer::OptimizationSet;
use crate::permutation::Permutation;

/// Builders for the structured cache keys. Each key disambiguates the
/// pipeline stage, the class, and where relevant the permutation and
/// optimization signatures, so no two stages can alias.
pub struct CacheKey;

impl CacheKey {
    /// Identifier of a class; independent of permutations.
    pub fn id(name: &str) -> String {
        format!("id[{}]", name)
    }

    /// Base syntax tree of a class.
    pub fn tree(name: &str) -> String {
        format!("tree[{}]", name)
    }

    /// Dependency set of a class for one permutation.
    pub fn deps(name: &str, permutation: Option<&Permutation>) -> String {
        format!("deps[{}]-{}", name, perm_sig(permutation))
    }

    /// Break-dependency set of a class for one permutation.
    pub fn breaks(name: &str, permutation: Option<&Permutation>) -> String {
        format!("breaks[{}]-{}", name, perm_sig(permutation))
    }

    /// Serialized output of a class for one permutation and
    /// optimization set.
    pub fn compressed(
        name: &str,
        permutation: Option<&Permutation>,
        optimizations: &OptimizationSet,
    ) -> String {
        format!(
            "compressed[{}]-{}-{}",
            name,
            perm_sig(permutation),
            optimizations.signature()
        )
    }
}

fn perm_sig(permutation: Option<&Permutation>) -> String {
    match permutation {
        Some(perm) => perm.signature(),
        None => "none".to_string(),
    }
}
