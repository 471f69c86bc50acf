//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every persisted document type implements this so storage layers can key
/// documents without knowing the concrete type.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Name of the document collection this entity is stored in.
    const COLLECTION: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Identifier rendered as a document key.
    fn document_id(&self) -> String {
        self.id().to_string()
    }
}
