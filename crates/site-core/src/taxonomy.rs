use crate::format::format_category_name;
use crate::grouping::UNCATEGORIZED;
use crate::ids::EntityId;
use crate::records::ProjectCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeSlot {
    Primary,
    Secondary,
    Accent,
    Muted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CategoryColor {
    Theme(ThemeSlot),
    Hex(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    Project,
    Known,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCategory {
    pub display_name: String,
    pub color: CategoryColor,
    pub source: CategorySource,
}

pub const FALLBACK_PALETTE: [&str; 4] = ["#6366f1", "#0ea5e9", "#f59e0b", "#10b981"];

const KNOWN_CATEGORIES: &[(&str, ThemeSlot)] = &[
    ("structural", ThemeSlot::Primary),
    ("foundation", ThemeSlot::Primary),
    ("framing", ThemeSlot::Primary),
    ("roofing", ThemeSlot::Primary),
    ("systems", ThemeSlot::Secondary),
    ("electrical", ThemeSlot::Secondary),
    ("plumbing", ThemeSlot::Secondary),
    ("hvac", ThemeSlot::Secondary),
    ("sheathing", ThemeSlot::Accent),
    ("insulation", ThemeSlot::Accent),
    ("drywall", ThemeSlot::Accent),
    ("siding", ThemeSlot::Accent),
    ("exteriors", ThemeSlot::Accent),
    ("finishings", ThemeSlot::Muted),
    ("windows", ThemeSlot::Muted),
    ("doors", ThemeSlot::Muted),
    ("cabinets", ThemeSlot::Muted),
    ("fixtures", ThemeSlot::Muted),
    ("flooring", ThemeSlot::Muted),
    ("painting", ThemeSlot::Muted),
    ("landscaping", ThemeSlot::Muted),
];

/// Maps free-text tier1/tier2 labels to a display name and a color.
///
/// Lookup order is the project's own category records, then the built-in
/// table, then a hash of the name into [`FALLBACK_PALETTE`]. Every input,
/// including the empty string, resolves to something.
#[derive(Debug, Clone, Default)]
pub struct CategoryResolver {
    project_categories: HashMap<EntityId, Vec<ProjectCategory>>,
}

impl CategoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_project_categories(
        &mut self,
        project_id: EntityId,
        categories: Vec<ProjectCategory>,
    ) {
        self.project_categories.insert(project_id, categories);
    }

    pub fn with_project_categories(
        mut self,
        project_id: EntityId,
        categories: Vec<ProjectCategory>,
    ) -> Self {
        self.set_project_categories(project_id, categories);
        self
    }

    pub fn resolve(&self, key: &str, project_id: Option<EntityId>) -> ResolvedCategory {
        let normalized = key.trim().to_lowercase();

        if let Some(record) = project_id
            .and_then(|id| self.project_categories.get(&id))
            .and_then(|records| {
                records
                    .iter()
                    .find(|record| record.name.trim().to_lowercase() == normalized)
            })
        {
            let color = match record.color.as_deref().map(str::trim) {
                Some(hex) if !hex.is_empty() => CategoryColor::Hex(hex.to_string()),
                _ => builtin_color(&normalized),
            };
            return ResolvedCategory {
                display_name: record.name.trim().to_string(),
                color,
                source: CategorySource::Project,
            };
        }

        let display_name = if normalized.is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            format_category_name(key)
        };

        match known_slot(&normalized) {
            Some(slot) => ResolvedCategory {
                display_name,
                color: CategoryColor::Theme(slot),
                source: CategorySource::Known,
            },
            None => ResolvedCategory {
                display_name,
                color: fallback_color(&normalized),
                source: CategorySource::Fallback,
            },
        }
    }

    pub fn color(&self, key: &str, project_id: Option<EntityId>) -> CategoryColor {
        self.resolve(key, project_id).color
    }
}

fn known_slot(normalized: &str) -> Option<ThemeSlot> {
    KNOWN_CATEGORIES
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, slot)| *slot)
}

fn builtin_color(normalized: &str) -> CategoryColor {
    known_slot(normalized)
        .map(CategoryColor::Theme)
        .unwrap_or_else(|| fallback_color(normalized))
}

pub fn fallback_color(normalized: &str) -> CategoryColor {
    let idx = (name_hash(normalized) % FALLBACK_PALETTE.len() as u64) as usize;
    CategoryColor::Hex(FALLBACK_PALETTE[idx].to_string())
}

// FNV-1a; stable across runs and platforms.
fn name_hash(name: &str) -> u64 {
    let mut hash: u64 = 1469598103934665603;
    for b in name.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_category(name: &str, color: Option<&str>) -> ProjectCategory {
        ProjectCategory {
            id: EntityId::new(40),
            project_id: EntityId::new(2),
            name: name.to_string(),
            tier: Some("tier1".to_string()),
            parent_id: None,
            color: color.map(str::to_string),
            description: None,
        }
    }

    #[test]
    fn project_record_wins_over_builtin_table() {
        let resolver = CategoryResolver::new().with_project_categories(
            EntityId::new(2),
            vec![project_category("Structural", Some("#123456"))],
        );

        let resolved = resolver.resolve("STRUCTURAL", Some(EntityId::new(2)));
        assert_eq!(resolved.source, CategorySource::Project);
        assert_eq!(resolved.display_name, "Structural");
        assert_eq!(resolved.color, CategoryColor::Hex("#123456".to_string()));

        let other_project = resolver.resolve("structural", Some(EntityId::new(3)));
        assert_eq!(other_project.source, CategorySource::Known);
        assert_eq!(other_project.color, CategoryColor::Theme(ThemeSlot::Primary));
    }

    #[test]
    fn project_record_without_color_borrows_builtin_color() {
        let resolver = CategoryResolver::new().with_project_categories(
            EntityId::new(2),
            vec![project_category("Plumbing", None)],
        );
        let resolved = resolver.resolve("plumbing", Some(EntityId::new(2)));
        assert_eq!(resolved.source, CategorySource::Project);
        assert_eq!(resolved.color, CategoryColor::Theme(ThemeSlot::Secondary));
    }

    #[test]
    fn known_names_are_case_insensitive() {
        let resolver = CategoryResolver::new();
        let resolved = resolver.resolve("  HVAC ", None);
        assert_eq!(resolved.source, CategorySource::Known);
        assert_eq!(resolved.color, CategoryColor::Theme(ThemeSlot::Secondary));
        assert_eq!(resolved.display_name, "Hvac");
    }

    #[test]
    fn unknown_names_resolve_deterministically_into_palette() {
        let resolver = CategoryResolver::new();
        let first = resolver.resolve("Masonry Restoration", Some(EntityId::new(9)));
        let second = resolver.resolve("Masonry Restoration", Some(EntityId::new(9)));
        assert_eq!(first, second);
        assert_eq!(first.source, CategorySource::Fallback);
        assert_eq!(
            resolver.color("masonry restoration", None),
            first.color,
            "hash is taken over the lowercased name"
        );
        match first.color {
            CategoryColor::Hex(hex) => assert!(FALLBACK_PALETTE.contains(&hex.as_str())),
            other => panic!("expected palette color, got {other:?}"),
        }
    }

    #[test]
    fn empty_key_still_resolves() {
        let resolved = CategoryResolver::new().resolve("", None);
        assert_eq!(resolved.display_name, UNCATEGORIZED);
        assert_eq!(resolved.source, CategorySource::Fallback);
        assert_eq!(resolved, CategoryResolver::new().resolve("   ", None));
    }
}
