use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Pagination parameters, bindable from query params (`?page=1&size=10&sort=age,desc`).
///
/// `sort` holds one or more `property[,asc|desc]` entries separated by `;`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pageable {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
    #[serde(default)]
    pub sort: Option<String>,
}

pub const DEFAULT_PAGE_SIZE: u64 = 20;

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
            sort: None,
        }
    }
}

/// One parsed `sort` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub property: String,
    pub ascending: bool,
}

impl Pageable {
    pub fn of(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    pub fn validate(&self, max_page_size: u64) -> Result<(), DataError> {
        if self.size == 0 {
            return Err(DataError::InvalidPage("page size must be at least 1".into()));
        }
        if self.size > max_page_size {
            return Err(DataError::InvalidPage(format!(
                "page size {} exceeds the maximum of {max_page_size}",
                self.size
            )));
        }
        // row offsets are bound as signed 64-bit integers
        match self.page.checked_mul(self.size) {
            Some(offset) if offset <= i64::MAX as u64 => {}
            _ => {
                return Err(DataError::InvalidPage(format!(
                    "page {} is out of range",
                    self.page
                )))
            }
        }
        Ok(())
    }

    pub fn sort_orders(&self) -> Result<Vec<SortOrder>, DataError> {
        let Some(sort) = self.sort.as_deref() else {
            return Ok(Vec::new());
        };
        sort.split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(parse_sort_entry)
            .collect()
    }
}

fn parse_sort_entry(entry: &str) -> Result<SortOrder, DataError> {
    let mut parts = entry.split(',').map(str::trim);
    let property = parts.next().unwrap_or_default();
    if property.is_empty() {
        return Err(DataError::InvalidPage(format!("empty sort property in `{entry}`")));
    }
    let ascending = match parts.next().map(str::to_ascii_lowercase).as_deref() {
        None | Some("asc") => true,
        Some("desc") => false,
        Some(other) => {
            return Err(DataError::InvalidPage(format!(
                "unknown sort direction `{other}` in `{entry}`"
            )))
        }
    };
    if parts.next().is_some() {
        return Err(DataError::InvalidPage(format!("malformed sort entry `{entry}`")));
    }
    Ok(SortOrder {
        property: property.to_string(),
        ascending,
    })
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
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

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_query_params() {
        let p: Pageable = serde_json::from_str(r#"{"page":2}"#).unwrap();
        assert_eq!(p, Pageable::of(2, 20));
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_total_pages() {
        let p = Pageable::of(0, 3);
        assert_eq!(Page::new(vec![1, 2, 3], &p, 7).total_pages, 3);
        assert_eq!(Page::new(Vec::<i32>::new(), &p, 0).total_pages, 0);
        assert!(Page::new(vec![1, 2, 3], &p, 7).has_next());
    }

    #[test]
    fn test_validate() {
        assert!(Pageable::of(0, 20).validate(2000).is_ok());
        assert!(matches!(
            Pageable::of(0, 0).validate(2000),
            Err(DataError::InvalidPage(_))
        ));
        assert!(Pageable::of(0, 2001).validate(2000).is_err());
        assert!(Pageable::of(u64::MAX, 2).validate(2000).is_err());
    }

    #[test]
    fn test_validate_rejects_offset_past_signed_range() {
        let last = i64::MAX as u64;
        assert!(Pageable::of(last, 1).validate(2000).is_ok());
        assert!(matches!(
            Pageable::of(u64::MAX / 2, 2).validate(2000),
            Err(DataError::InvalidPage(_))
        ));
        assert!(Pageable::of(last / 2 + 1, 2).validate(2000).is_err());
    }

    #[test]
    fn test_has_next_on_last_representable_page() {
        let p = Pageable::of(u64::MAX, 1);
        let page = Page::new(Vec::<i32>::new(), &p, 3);
        assert!(!page.has_next());
    }

    #[test]
    fn test_sort_orders() {
        let p = Pageable::default().with_sort("username,desc; age");
        assert_eq!(
            p.sort_orders().unwrap(),
            vec![
                SortOrder {
                    property: "username".into(),
                    ascending: false
                },
                SortOrder {
                    property: "age".into(),
                    ascending: true
                },
            ]
        );
        assert!(Pageable::default().with_sort("age,sideways").sort_orders().is_err());
        assert!(Pageable::default().with_sort(",asc").sort_orders().is_err());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], &Pageable::of(1, 2), 4).map(|n| n * 10);
        assert_eq!(page.content, vec![10, 20]);
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next());
    }
}
