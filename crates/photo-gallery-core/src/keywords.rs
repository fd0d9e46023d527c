//! Keyword catalog: grouped keywords for the filter picker.

use std::collections::BTreeSet;

use crate::error::GalleryError;
use crate::models::KeywordEntry;
use crate::service::QueryService;

/// Keywords that share a display group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Every known keyword, grouped in the order groups first appear.
#[derive(Debug, Clone, Default)]
pub struct KeywordCatalog {
    groups: Vec<KeywordGroup>,
}

impl KeywordCatalog {
    pub fn new(entries: impl IntoIterator<Item = KeywordEntry>) -> Self {
        let mut groups: Vec<KeywordGroup> = Vec::new();
        for entry in entries {
            match groups.iter_mut().find(|g| g.name == entry.group) {
                Some(group) => {
                    if !group.keywords.contains(&entry.keyword) {
                        group.keywords.push(entry.keyword);
                    }
                }
                None => groups.push(KeywordGroup {
                    name: entry.group,
                    keywords: vec![entry.keyword],
                }),
            }
        }
        Self { groups }
    }

    /// Fetch the catalog from the service.
    pub async fn load<S>(service: &S) -> Result<Self, GalleryError>
    where
        S: QueryService + ?Sized,
    {
        let entries = service.list_keywords().await.map_err(GalleryError::query)?;
        Ok(Self::new(entries))
    }

    pub fn groups(&self) -> &[KeywordGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&KeywordGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.keywords.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Keywords containing `query` (case-insensitive), minus those already
    /// in `selected`. An empty query matches everything.
    pub fn search(&self, query: &str, selected: &BTreeSet<String>) -> Vec<KeywordEntry> {
        let needle = query.trim().to_lowercase();
        self.groups
            .iter()
            .flat_map(|g| {
                g.keywords.iter().map(move |k| KeywordEntry {
                    keyword: k.clone(),
                    group: g.name.clone(),
                })
            })
            .filter(|e| !selected.contains(&e.keyword))
            .filter(|e| e.keyword.to_lowercase().contains(&needle))
            .collect()
    }

    /// Add every keyword of `group` to `selected`. Returns how many were new.
    pub fn select_group(&self, group: &str, selected: &mut BTreeSet<String>) -> usize {
        self.group(group).map_or(0, |g| {
            g.keywords
                .iter()
                .filter(|k| selected.insert((*k).clone()))
                .count()
        })
    }

    /// Remove every keyword of `group` from `selected`. Returns how many went.
    pub fn deselect_group(&self, group: &str, selected: &mut BTreeSet<String>) -> usize {
        self.group(group).map_or(0, |g| {
            g.keywords.iter().filter(|k| selected.remove(*k)).count()
        })
    }
}
