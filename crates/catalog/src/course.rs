use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use aula_core::{CourseId, DomainError, DomainResult, Entity};

/// Course document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    /// Name or username of the publishing user.
    pub publisher: String,
    pub release_date: Option<NaiveDate>,
    pub price: f64,
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub instructor_list: Vec<String>,
    #[serde(default)]
    pub offers_certificate: bool,
    #[serde(default)]
    pub sales_count: u64,
    pub is_active: bool,
    pub title_page: Option<String>,
}

impl Entity for Course {
    type Id = CourseId;
    const COLLECTION: &'static str = "courses";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Course {
    pub fn create(input: NewCourse) -> DomainResult<Self> {
        let input = input.validated()?;
        Ok(Self {
            id: CourseId::new(),
            title: input.title,
            description: input.description,
            publisher: input.publisher,
            release_date: input.release_date,
            price: input.price,
            language: input.language,
            tags: input.tags,
            instructor_list: input.instructor_list,
            offers_certificate: input.offers_certificate,
            sales_count: 0,
            is_active: true,
            title_page: input.title_page,
        })
    }

    pub fn apply(&mut self, update: CourseUpdate) -> DomainResult<()> {
        if let Some(price) = update.price {
            validate_price(price)?;
            self.price = price;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(release_date) = update.release_date {
            self.release_date = Some(release_date);
        }
        if let Some(language) = update.language {
            self.language = language;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(instructors) = update.instructor_list {
            self.instructor_list = instructors;
        }
        if let Some(offers) = update.offers_certificate {
            self.offers_certificate = offers;
        }
        if let Some(title_page) = update.title_page {
            self.title_page = Some(title_page);
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

pub(crate) fn validate_price(price: f64) -> DomainResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(DomainError::validation("price must be a non-negative number"));
    }
    Ok(())
}

/// Course creation input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub publisher: String,
    pub release_date: Option<NaiveDate>,
    pub price: f64,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub instructor_list: Vec<String>,
    #[serde(default)]
    pub offers_certificate: bool,
    pub title_page: Option<String>,
}

impl NewCourse {
    pub fn validated(mut self) -> DomainResult<Self> {
        self.title = self.title.trim().to_string();
        self.publisher = self.publisher.trim().to_string();
        if self.title.is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if self.publisher.is_empty() {
            return Err(DomainError::validation("publisher must not be empty"));
        }
        validate_price(self.price)?;
        Ok(self)
    }
}

/// Partial course update. The title is the course key and cannot change.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
    pub instructor_list: Option<Vec<String>>,
    pub offers_certificate: Option<bool>,
    pub title_page: Option<String>,
    pub is_active: Option<bool>,
}
