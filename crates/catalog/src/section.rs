use serde::{Deserialize, Serialize};

use aula_core::{DomainError, DomainResult, Entity, SectionId};

use crate::search::{matches_any_keyword, matches_any_tag};

/// What a section entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Media,
    Ebook,
}

/// A media file or ebook listed in a section, identified by its url.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionItem {
    pub kind: ContentKind,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSectionItem {
    pub kind: ContentKind,
    pub title: String,
    pub url: String,
}

impl NewSectionItem {
    pub fn validated(self) -> DomainResult<SectionItem> {
        let title = self.title.trim().to_string();
        let url = self.url.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DomainError::validation("url must be an http(s) URL"));
        }
        Ok(SectionItem {
            kind: self.kind,
            title,
            url,
        })
    }
}

/// Second level of the section tree. Subsections do not nest further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subsection {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
    #[serde(default)]
    pub content: Vec<SectionItem>,
}

impl Subsection {
    pub fn add_item(&mut self, item: SectionItem) -> DomainResult<()> {
        push_unique(&mut self.content, item)
    }
}

/// Section document: a named group of content with one level of subsections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
    #[serde(default)]
    pub content: Vec<SectionItem>,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
}

impl Entity for Section {
    type Id = SectionId;
    const COLLECTION: &'static str = "sections";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Section {
    pub fn create(input: NewSection) -> DomainResult<Self> {
        let input = input.validated()?;
        Ok(Self {
            id: SectionId::new(),
            name: input.name,
            description: input.description,
            tags: input.tags,
            is_active: true,
            content: Vec::new(),
            subsections: Vec::new(),
        })
    }

    pub fn apply(&mut self, update: SectionUpdate) {
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
    }

    /// Deactivating a section hides its subsections too.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        for subsection in &mut self.subsections {
            subsection.is_active = false;
        }
    }

    pub fn add_item(&mut self, item: SectionItem) -> DomainResult<()> {
        push_unique(&mut self.content, item)
    }

    pub fn add_subsection(&mut self, input: NewSection) -> DomainResult<&Subsection> {
        let input = input.validated()?;
        if self.subsection(&input.name).is_some() {
            return Err(DomainError::conflict("SUBSECTIONALREADYEXISTS"));
        }
        self.subsections.push(Subsection {
            name: input.name,
            description: input.description,
            tags: input.tags,
            is_active: true,
            content: Vec::new(),
        });
        Ok(&self.subsections[self.subsections.len() - 1])
    }

    pub fn subsection(&self, name: &str) -> Option<&Subsection> {
        self.subsections.iter().find(|s| s.name == name)
    }

    pub fn subsection_mut(&mut self, name: &str) -> Option<&mut Subsection> {
        self.subsections.iter_mut().find(|s| s.name == name)
    }

    pub fn active_subsections(&self) -> impl Iterator<Item = &Subsection> {
        self.subsections.iter().filter(|s| s.is_active)
    }

    /// Keywords match the name or description; tags are any-of.
    pub fn matches(&self, keywords: &[String], tags: &[String]) -> bool {
        let keyword_hit = keywords.is_empty()
            || matches_any_keyword(&self.name, keywords)
            || matches_any_keyword(&self.description, keywords);
        keyword_hit && matches_any_tag(&self.tags, tags)
    }
}

fn push_unique(content: &mut Vec<SectionItem>, item: SectionItem) -> DomainResult<()> {
    if content.iter().any(|existing| existing.url == item.url) {
        return Err(DomainError::conflict("CONTENTALREADYADDED"));
    }
    content.push(item);
    Ok(())
}

/// Input for both sections and subsections.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewSection {
    pub fn validated(mut self) -> DomainResult<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        if self.name.contains('/') {
            return Err(DomainError::validation("name must not contain '/'"));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionUpdate {
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}
