//! Catalog domain module: courses, ebooks and the sections that group them.
//!
//! Pure domain logic (no IO, no HTTP, no storage): document shapes, input
//! validation, partial updates and search predicates.

pub mod course;
pub mod ebook;
pub mod search;
pub mod section;

pub use course::{Course, CourseUpdate, NewCourse};
pub use ebook::{Ebook, EbookFormat, EbookUpdate, NewEbook};
pub use search::{matches_any_keyword, matches_any_tag, normalize_terms};
pub use section::{ContentKind, NewSection, NewSectionItem, Section, SectionItem, SectionUpdate, Subsection};
