use aula_catalog::{Course, Ebook, EbookFormat, Section};

use super::{Repository, RepositoryError};

impl Repository<Course> {
    pub async fn by_title(&self, title: &str) -> Result<Option<Course>, RepositoryError> {
        self.find(|c| c.title == title).await
    }

    /// Active courses ordered by title.
    pub async fn active_sorted(&self) -> Result<Vec<Course>, RepositoryError> {
        let mut courses = self.filter(|c| c.is_active).await?;
        courses.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(courses)
    }
}

impl Repository<Ebook> {
    pub async fn by_url(&self, url: &str) -> Result<Option<Ebook>, RepositoryError> {
        self.find(|e| e.url == url).await
    }

    pub async fn edition(&self, title: &str, format: EbookFormat) -> Result<Option<Ebook>, RepositoryError> {
        self.find(|e| e.is_edition(title, format)).await
    }

    /// Active ebooks ordered by title.
    pub async fn active_sorted(&self) -> Result<Vec<Ebook>, RepositoryError> {
        let mut ebooks = self.filter(|e| e.is_active).await?;
        ebooks.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(ebooks)
    }
}

impl Repository<Section> {
    pub async fn by_name(&self, name: &str) -> Result<Option<Section>, RepositoryError> {
        self.find(|s| s.name == name).await
    }

    /// Active sections ordered by name.
    pub async fn active_sorted(&self) -> Result<Vec<Section>, RepositoryError> {
        let mut sections = self.filter(|s| s.is_active).await?;
        sections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sections)
    }
}
