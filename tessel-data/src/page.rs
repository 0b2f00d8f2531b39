use serde::{Deserialize, Serialize};

fn default_page_size() -> u64 {
    20
}

/// Pagination parameters. `page` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
        }
    }
}

impl Pageable {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let total_pages = if pageable.size == 0 {
            0
        } else {
            total_elements.div_ceil(pageable.size)
        };
        Self {
            content,
            page: pageable.page,
            size: pageable.size,
            total_elements,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(vec![1, 2], &Pageable::new(0, 2), 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
    }

    #[test]
    fn last_possible_page_has_no_next() {
        let page: Page<u8> = Page::new(Vec::new(), &Pageable::new(u64::MAX, 1), u64::MAX);
        assert!(!page.has_next());
    }

    #[test]
    fn zero_size_has_no_pages() {
        let page: Page<u8> = Page::new(Vec::new(), &Pageable::new(0, 0), 5);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::new(vec![5], &Pageable::new(2, 2), 5);
        assert!(!page.has_next());
        assert_eq!(Pageable::new(2, 2).offset(), 4);
    }

    #[test]
    fn deserializes_with_defaults() {
        let p: Pageable = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Pageable::default());
        let p: Pageable = serde_json::from_str(r#"{"page":3}"#).unwrap();
        assert_eq!(p.size, 20);
        assert_eq!(p.offset(), 60);
    }
}
