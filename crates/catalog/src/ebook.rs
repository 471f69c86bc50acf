use serde::{Deserialize, Serialize};

use aula_core::{DomainError, DomainResult, EbookId, Entity};

use crate::course::validate_price;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EbookFormat {
    Pdf,
    Epub,
    Mobi,
}

impl EbookFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            EbookFormat::Pdf => "pdf",
            EbookFormat::Epub => "epub",
            EbookFormat::Mobi => "mobi",
        }
    }
}

impl core::fmt::Display for EbookFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for EbookFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(EbookFormat::Pdf),
            "epub" => Ok(EbookFormat::Epub),
            "mobi" => Ok(EbookFormat::Mobi),
            other => Err(DomainError::validation(format!("unknown ebook format '{other}'"))),
        }
    }
}

/// Ebook document. The same title may exist once per format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ebook {
    pub id: EbookId,
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
    pub format: EbookFormat,
    pub price: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
}

impl Entity for Ebook {
    type Id = EbookId;
    const COLLECTION: &'static str = "ebooks";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Ebook {
    pub fn create(input: NewEbook) -> DomainResult<Self> {
        let input = input.validated()?;
        Ok(Self {
            id: EbookId::new(),
            title: input.title,
            description: input.description,
            author: input.author,
            url: input.url,
            format: input.format,
            price: input.price,
            tags: input.tags,
            is_active: true,
        })
    }

    pub fn is_edition(&self, title: &str, format: EbookFormat) -> bool {
        self.title == title && self.format == format
    }

    pub fn apply(&mut self, update: EbookUpdate) -> DomainResult<()> {
        if let Some(price) = update.price {
            validate_price(price)?;
            self.price = price;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEbook {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author: String,
    pub url: String,
    pub format: EbookFormat,
    pub price: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewEbook {
    pub fn validated(mut self) -> DomainResult<Self> {
        self.title = self.title.trim().to_string();
        self.url = self.url.trim().to_string();
        if self.title.is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(DomainError::validation("url must be an http(s) URL"));
        }
        validate_price(self.price)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EbookUpdate {
    pub description: Option<String>,
    pub author: Option<String>,
    pub price: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}
