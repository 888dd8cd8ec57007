pub mod color;

use std::fmt::{self, Display};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use color::{DEFAULT_HEADER_BG, DEFAULT_HEADER_FG, contrast_color};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicDefinition {
    pub name: String,
    #[serde(rename = "url", alias = "source_slug")]
    pub source_slug: String,
    pub short_code: String,
    #[serde(default = "default_header_bg")]
    pub header_bg: String,
    #[serde(default)]
    pub header_fg: String,
}

fn default_header_bg() -> String {
    DEFAULT_HEADER_BG.to_string()
}

impl ComicDefinition {
    pub fn new(name: &str, source_slug: &str, short_code: &str) -> Self {
        Self {
            name: name.to_string(),
            source_slug: source_slug.to_string(),
            short_code: short_code.to_string(),
            header_bg: default_header_bg(),
            header_fg: String::new(),
        }
    }

    /// Trims the key fields, rejects empty ones and fills in missing header colors.
    fn normalized(mut self) -> Result<Self, CatalogError> {
        self.name = self.name.trim().to_string();
        self.source_slug = self.source_slug.trim().to_string();
        self.short_code = self.short_code.trim().to_string();

        for field in KeyField::ALL {
            if self.key(field).is_empty() {
                return Err(CatalogError::MissingField(field));
            }
        }
        if self
            .short_code
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '.' || c.is_whitespace())
        {
            return Err(CatalogError::InvalidShortCode(self.short_code));
        }

        self.header_bg = self.header_bg.trim().to_string();
        if self.header_bg.is_empty() {
            self.header_bg = default_header_bg();
        }
        self.header_fg = self.header_fg.trim().to_string();
        if self.header_fg.is_empty() {
            self.header_fg = contrast_color(&self.header_bg).to_string();
        }
        Ok(self)
    }

    fn key(&self, field: KeyField) -> &str {
        match field {
            KeyField::Name => &self.name,
            KeyField::SourceSlug => &self.source_slug,
            KeyField::ShortCode => &self.short_code,
        }
    }
}

pub fn default_comic() -> ComicDefinition {
    ComicDefinition {
        name: "Fox Trot".to_string(),
        source_slug: "foxtrot".to_string(),
        short_code: "ft".to_string(),
        header_bg: DEFAULT_HEADER_BG.to_string(),
        header_fg: DEFAULT_HEADER_FG.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    Name,
    SourceSlug,
    ShortCode,
}

impl KeyField {
    const ALL: [KeyField; 3] = [KeyField::Name, KeyField::SourceSlug, KeyField::ShortCode];
}

impl Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            KeyField::Name => "name",
            KeyField::SourceSlug => "source slug",
            KeyField::ShortCode => "short code",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("comic {field} must be unique: {value}")]
    DuplicateKey { field: KeyField, value: String },

    #[error("comic not found: {0}")]
    NotFound(String),

    #[error("comic {0} is required")]
    MissingField(KeyField),

    #[error("short code cannot be used in a file name: {0}")]
    InvalidShortCode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    Added { name: String },
    Edited { previous_name: String, name: String },
    Selected { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&ComicCatalog, &CatalogEvent) + Send + Sync>;

/// Ordered set of comic definitions with a selected entry.
///
/// The catalog is never empty and the selected index always points at an entry.
/// Entries are never removed, so the index stays valid across mutations.
pub struct ComicCatalog {
    comics: Vec<ComicDefinition>,
    selected: usize,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl ComicCatalog {
    /// Builds a catalog from persisted definitions. Invalid or colliding entries are
    /// dropped, an empty list gets the seed comic, and an unknown selection falls back
    /// to the first entry.
    pub fn new(definitions: Vec<ComicDefinition>, selected: Option<&str>) -> Self {
        let mut catalog = Self {
            comics: Vec::with_capacity(definitions.len().max(1)),
            selected: 0,
            listeners: Vec::new(),
            next_subscription: 0,
        };

        for definition in definitions {
            let definition = match definition.normalized() {
                Ok(d) => d,
                Err(e) => {
                    warn!("Skipping stored comic: {}", e);
                    continue;
                }
            };
            if let Err(e) = catalog.check_unique(&definition, None) {
                warn!("Skipping stored comic {}: {}", definition.name, e);
                continue;
            }
            catalog.comics.push(definition);
        }

        if catalog.comics.is_empty() {
            catalog.comics.push(default_comic());
        }

        catalog.selected = selected
            .and_then(|name| catalog.position(name))
            .unwrap_or(0);
        catalog
    }

    pub fn comics(&self) -> &[ComicDefinition] {
        &self.comics
    }

    pub fn selected(&self) -> &ComicDefinition {
        &self.comics[self.selected]
    }

    pub fn len(&self) -> usize {
        self.comics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comics.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&ComicDefinition> {
        self.comics.iter().find(|c| c.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.comics.iter().position(|c| c.name == name)
    }

    fn check_unique(
        &self,
        candidate: &ComicDefinition,
        skip: Option<usize>,
    ) -> Result<(), CatalogError> {
        for (index, existing) in self.comics.iter().enumerate() {
            if Some(index) == skip {
                continue;
            }
            for field in KeyField::ALL {
                if existing.key(field) == candidate.key(field) {
                    return Err(CatalogError::DuplicateKey {
                        field,
                        value: candidate.key(field).to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Appends a new comic and selects it.
    pub fn add(&mut self, definition: ComicDefinition) -> Result<&ComicDefinition, CatalogError> {
        let definition = definition.normalized()?;
        self.check_unique(&definition, None)?;

        info!("Adding comic: {} ({})", definition.name, definition.short_code);
        let name = definition.name.clone();
        self.comics.push(definition);
        self.selected = self.comics.len() - 1;

        self.emit(CatalogEvent::Added { name });
        Ok(self.selected())
    }

    /// Replaces the fields of the comic named `target` and selects it.
    ///
    /// When no comic is named `target` nothing changes and `Ok(None)` is returned;
    /// this is not reported as an error.
    pub fn edit(
        &mut self,
        target: &str,
        definition: ComicDefinition,
    ) -> Result<Option<&ComicDefinition>, CatalogError> {
        let Some(index) = self.position(target) else {
            warn!("Edit ignored, no comic named {}", target);
            return Ok(None);
        };

        let definition = definition.normalized()?;
        self.check_unique(&definition, Some(index))?;

        info!("Editing comic: {} -> {}", target, definition.name);
        let name = definition.name.clone();
        let previous = std::mem::replace(&mut self.comics[index], definition);
        self.selected = index;

        self.emit(CatalogEvent::Edited {
            previous_name: previous.name,
            name,
        });
        Ok(Some(self.selected()))
    }

    pub fn set_selected(&mut self, name: &str) -> Result<&ComicDefinition, CatalogError> {
        let index = self
            .position(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        self.selected = index;

        self.emit(CatalogEvent::Selected {
            name: name.to_string(),
        });
        Ok(self.selected())
    }

    /// Looks up a comic and makes it the selection. This mutates the catalog; use
    /// [`ComicCatalog::find`] for a side-effect free lookup.
    pub fn select(&mut self, name: &str) -> Result<&ComicDefinition, CatalogError> {
        self.set_selected(name)
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&ComicCatalog, &CatalogEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn emit(&self, event: CatalogEvent) {
        for (_, listener) in &self.listeners {
            listener(self, &event);
        }
    }
}
