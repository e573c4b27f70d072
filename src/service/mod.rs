//! Request-independent operations over the pool: one module per area, plus the generic
//! descriptor-driven CRUD service.

pub mod catalog;
pub mod collections;
mod crud;
pub mod orders;
pub mod reviews;
pub mod seo;
pub mod sliders;
pub mod stores;
pub mod users;
pub mod validation;

pub use crud::CrudService;
pub use validation::RequestValidator;

/// `%term%` for ILIKE with the LIKE metacharacters escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(like_pattern("red"), "%red%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
