//! Technique pool builder.
//!
//! Flattens the selected library categories into the deduplicated, weighted
//! list of callable phrases the scheduler draws from. Pure function of its
//! inputs and the injected RNG: the same library, selection, and random
//! draws always produce the same pool (before the optional final shuffle,
//! which uses the same RNG and is therefore reproducible too).

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::techniques::{TechniqueLibrary, CALISTHENICS_CATEGORY, DEFAULT_CATEGORY};

/// Probability that a favorite item gets one extra copy in the pool.
pub const FAVORITE_BOOST_PROBABILITY: f64 = 0.35;

/// One entry of the flattened pool, tagged by its source category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechniqueEntry {
    pub text: String,
    pub category: String,
}

/// Ordered pool of callable phrases. Owned by the scheduler for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechniquePool {
    entries: Vec<TechniqueEntry>,
}

impl TechniquePool {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TechniqueEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[TechniqueEntry] {
        &self.entries
    }
}

/// Builder over a technique library.
#[derive(Debug, Clone)]
pub struct PoolBuilder<'a> {
    library: &'a TechniqueLibrary,
    categories: Vec<String>,
    add_calisthenics: bool,
    shuffle: bool,
}

impl<'a> PoolBuilder<'a> {
    pub fn new(library: &'a TechniqueLibrary) -> Self {
        Self {
            library,
            categories: Vec::new(),
            add_calisthenics: false,
            shuffle: false,
        }
    }

    /// Select categories by key. Unknown keys are skipped at build time.
    pub fn categories<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_calisthenics(mut self, enabled: bool) -> Self {
        self.add_calisthenics = enabled;
        self
    }

    pub fn shuffle(mut self, enabled: bool) -> Self {
        self.shuffle = enabled;
        self
    }

    /// Flatten, boost favorites, deduplicate, and optionally shuffle.
    ///
    /// Dedup is by trimmed exact text; the first occurrence wins the
    /// category tag. Favorite boost copies are appended after dedup so the
    /// boost survives it.
    pub fn build<R: Rng>(&self, rng: &mut R) -> TechniquePool {
        let mut keys: Vec<&str> = if self.categories.is_empty() {
            vec![DEFAULT_CATEGORY]
        } else {
            self.categories.iter().map(String::as_str).collect()
        };
        if self.add_calisthenics && !keys.contains(&CALISTHENICS_CATEGORY) {
            keys.push(CALISTHENICS_CATEGORY);
        }

        let mut entries: Vec<TechniqueEntry> = Vec::new();
        let mut favorites: Vec<TechniqueEntry> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for key in keys {
            let Some(group) = self.library.get(key) else {
                tracing::warn!(category = key, "unknown technique category, skipping");
                continue;
            };
            for item in group.items() {
                let text = item.text().trim();
                if text.is_empty() {
                    continue;
                }
                if !seen.insert(text.to_string()) {
                    continue;
                }
                let entry = TechniqueEntry {
                    text: text.to_string(),
                    category: key.to_string(),
                };
                if item.is_favorite() && rng.gen_bool(FAVORITE_BOOST_PROBABILITY) {
                    favorites.push(entry.clone());
                }
                entries.push(entry);
            }
        }

        entries.extend(favorites);

        if self.shuffle {
            entries.shuffle(rng);
        }

        TechniquePool { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::techniques::{builtin, TechniqueGroup, TechniqueItem};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn rng() -> Pcg64 {
        Pcg64::seed_from_u64(7)
    }

    #[test]
    fn defaults_to_newb_category() {
        let lib = builtin();
        let pool = PoolBuilder::new(&lib).build(&mut rng());
        assert!(!pool.is_empty());
        assert!(pool.entries().iter().all(|e| e.category == "newb"));
    }

    #[test]
    fn dedup_first_occurrence_wins_category() {
        let lib = builtin();
        // khao and mat share the same singles block.
        let pool = PoolBuilder::new(&lib)
            .categories(["khao", "mat"])
            .build(&mut rng());
        let jabs: Vec<_> = pool.entries().iter().filter(|e| e.text == "1").collect();
        assert_eq!(jabs.len(), 1);
        assert_eq!(jabs[0].category, "khao");
    }

    #[test]
    fn trims_and_drops_empty_text() {
        let mut lib = TechniqueLibrary::new();
        lib.insert(
            "custom".into(),
            TechniqueGroup {
                singles: vec![
                    TechniqueItem::Plain("  Jab  ".into()),
                    TechniqueItem::Plain("   ".into()),
                    TechniqueItem::Plain("Jab".into()),
                ],
                combos: vec![],
            },
        );
        let pool = PoolBuilder::new(&lib).categories(["custom"]).build(&mut rng());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(0).unwrap().text, "Jab");
    }

    #[test]
    fn calisthenics_union() {
        let lib = builtin();
        let pool = PoolBuilder::new(&lib)
            .categories(["boxing"])
            .add_calisthenics(true)
            .build(&mut rng());
        assert!(pool.entries().iter().any(|e| e.category == "calisthenics"));
    }

    #[test]
    fn unknown_category_yields_empty_pool() {
        let lib = builtin();
        let pool = PoolBuilder::new(&lib).categories(["nope"]).build(&mut rng());
        assert!(pool.is_empty());
    }

    #[test]
    fn favorite_boost_duplicates_survive() {
        let mut lib = TechniqueLibrary::new();
        lib.insert(
            "favs".into(),
            TechniqueGroup {
                singles: (0..40)
                    .map(|i| TechniqueItem::Detailed {
                        text: format!("Combo {i}"),
                        favorite: true,
                    })
                    .collect(),
                combos: vec![],
            },
        );
        let pool = PoolBuilder::new(&lib).categories(["favs"]).build(&mut rng());
        // 40 base entries plus roughly 35% boosted copies.
        assert!(pool.len() > 40, "expected boost copies, got {}", pool.len());
        assert!(pool.len() < 80);
    }

    #[test]
    fn same_seed_same_pool() {
        let lib = builtin();
        let a = PoolBuilder::new(&lib)
            .categories(["tae", "sok"])
            .shuffle(true)
            .build(&mut Pcg64::seed_from_u64(42));
        let b = PoolBuilder::new(&lib)
            .categories(["tae", "sok"])
            .shuffle(true)
            .build(&mut Pcg64::seed_from_u64(42));
        assert_eq!(a.entries(), b.entries());
    }
}
