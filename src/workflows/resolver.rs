use crate::domain::models::{CatalogEntry, MediaReference};
use crate::error::{Error, Result};
use crate::infra::cache::IdentifierCache;
use crate::infra::CatalogSearch;
use crate::menu::Menu;

/// Turns a parsed reference into a catalog ID, cache first.
pub struct CatalogResolver<'a> {
    search: &'a dyn CatalogSearch,
    menu: &'a dyn Menu,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(search: &'a dyn CatalogSearch, menu: &'a dyn Menu) -> Self {
        Self { search, menu }
    }

    /// Every decision that reaches an ID is written to `cache` before it is
    /// returned, so the same title is never searched twice.
    pub fn resolve(
        &self,
        reference: &MediaReference,
        cache: &mut IdentifierCache,
    ) -> Result<CatalogEntry> {
        let key = reference.cache_key();
        if let Some(id) = cache.get(&key) {
            tracing::info!("Using cached AniList ID {id} for '{}'", reference.title);
            return Ok(CatalogEntry {
                id,
                display_title: reference.title.clone(),
            });
        }

        // The normalized title is both the query and the cache key.
        let query = key;
        let candidates = self.search.search(&query).map_err(|e| Error::Resolution {
            title: query.clone(),
            reason: format!("{e:#}"),
        })?;

        let chosen = match candidates.len() {
            0 => {
                return Err(Error::Resolution {
                    title: query,
                    reason: "no matching anime found".to_string(),
                })
            }
            1 => candidates[0].clone(),
            _ => {
                let labels: Vec<String> = candidates
                    .iter()
                    .map(|c| format!("{} (ID: {})", c.display_title, c.id))
                    .collect();
                let index = self
                    .menu
                    .select_one(&format!("Select anime for '{query}'"), &labels)?;
                candidates[index].clone()
            }
        };

        tracing::info!("Resolved '{query}' to AniList ID {}", chosen.id);
        if let Err(e) = cache.put(&query, chosen.id) {
            tracing::warn!("Failed to save cache: {e:#}");
        }
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ParseRule;
    use crate::workflows::testing::{FakeCatalog, ScriptedMenu};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn reference(title: &str, season: Option<u32>) -> MediaReference {
        MediaReference {
            raw_path: PathBuf::from(format!("{title}.mkv")),
            title: title.to_string(),
            season,
            episode: Some(1),
            is_directory: false,
            rule: ParseRule::Dashed,
        }
    }

    fn entry(id: u64, title: &str) -> CatalogEntry {
        CatalogEntry {
            id,
            display_title: title.to_string(),
        }
    }

    #[test]
    fn test_single_candidate_is_auto_selected_and_cached() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        let catalog = FakeCatalog::new(vec![entry(116, "Bleach")]);
        let menu = ScriptedMenu::new(vec![]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        let resolved = resolver.resolve(&reference("Bleach", None), &mut cache).unwrap();
        assert_eq!(resolved.id, 116);
        assert_eq!(menu.calls(), 0);
        assert_eq!(cache.get("bleach"), Some(116));
    }

    #[test]
    fn test_same_title_searches_once() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        let catalog = FakeCatalog::new(vec![entry(1, "A"), entry(2, "B")]);
        let menu = ScriptedMenu::new(vec![vec![1]]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        let first = resolver.resolve(&reference("Show", None), &mut cache).unwrap();
        let second = resolver.resolve(&reference("show ", Some(1)), &mut cache).unwrap();

        assert_eq!(first.id, 2);
        assert_eq!(second.id, 2);
        assert_eq!(catalog.queries(), vec!["show".to_string()]);
        assert_eq!(menu.calls(), 1);
    }

    #[test]
    fn test_multiple_candidates_keep_catalog_order() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        let catalog = FakeCatalog::new(vec![entry(9, "Zeta"), entry(3, "Alpha")]);
        let menu = ScriptedMenu::new(vec![vec![0]]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        let resolved = resolver.resolve(&reference("Show", None), &mut cache).unwrap();
        assert_eq!(resolved.id, 9);
        assert_eq!(
            menu.last_choices(),
            vec!["Zeta (ID: 9)".to_string(), "Alpha (ID: 3)".to_string()]
        );
    }

    #[test]
    fn test_later_season_queries_with_season() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        let catalog = FakeCatalog::new(vec![entry(5, "Show 2")]);
        let menu = ScriptedMenu::new(vec![]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        resolver.resolve(&reference("Show", Some(2)), &mut cache).unwrap();
        assert_eq!(catalog.queries(), vec!["show season 2".to_string()]);
        assert_eq!(cache.get("show season 2"), Some(5));
        assert_eq!(cache.get("show"), None);
    }

    #[test]
    fn test_query_is_normalized_title() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        let catalog = FakeCatalog::new(vec![entry(154587, "Frieren")]);
        let menu = ScriptedMenu::new(vec![]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        resolver
            .resolve(&reference("Sousou no  FRIEREN", None), &mut cache)
            .unwrap();
        assert_eq!(catalog.queries(), vec!["sousou no frieren".to_string()]);
        assert_eq!(cache.get("sousou no frieren"), Some(154587));
    }

    #[test]
    fn test_cache_hit_skips_search() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        cache.put("bleach", 116).unwrap();
        let catalog = FakeCatalog::new(vec![]);
        let menu = ScriptedMenu::new(vec![]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        let resolved = resolver.resolve(&reference("Bleach", None), &mut cache).unwrap();
        assert_eq!(resolved, entry(116, "Bleach"));
        assert!(catalog.queries().is_empty());
    }

    #[test]
    fn test_no_candidates_is_resolution_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        let catalog = FakeCatalog::new(vec![]);
        let menu = ScriptedMenu::new(vec![]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        assert!(matches!(
            resolver.resolve(&reference("Nothing", None), &mut cache),
            Err(Error::Resolution { .. })
        ));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_search_failure_is_resolution_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        let catalog = FakeCatalog::failing();
        let menu = ScriptedMenu::new(vec![]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        let err = resolver
            .resolve(&reference("Show", None), &mut cache)
            .unwrap_err();
        assert!(err.to_string().contains("Error querying AniList API"));
    }

    #[test]
    fn test_cancelled_choice_is_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = IdentifierCache::load(temp_dir.path().join("cache.json"));
        let catalog = FakeCatalog::new(vec![entry(1, "A"), entry(2, "B")]);
        let menu = ScriptedMenu::new(vec![vec![]]);
        let resolver = CatalogResolver::new(&catalog, &menu);

        assert!(matches!(
            resolver.resolve(&reference("Show", None), &mut cache),
            Err(Error::SelectionCancelled)
        ));
        assert_eq!(cache.get("show"), None);
    }
}
