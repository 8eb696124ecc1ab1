//! Deciding whether a page needs a count query.

use std::future::Future;

use crate::error::DataError;
use crate::page::{Page, Pageable};

/// Total element count implied by the fetched page alone, if any.
///
/// Valid only when the content query was bounded with `LIMIT pageable.size`
/// (see [`SelectQuery::paged`](crate::query::SelectQuery::paged)).
///
/// - first page shorter than `size`: the total is the content length.
/// - later page, non-empty and shorter than `size`: it is the last page, so
///   the total is `offset + len`.
/// - anything else (full page, or an empty page past the start): unknown.
pub fn infer_total(content_len: usize, pageable: &Pageable) -> Option<u64> {
    let len = content_len as u64;
    if len >= pageable.size {
        return None;
    }
    let offset = pageable.offset();
    if offset == 0 {
        Some(len)
    } else if len > 0 {
        Some(offset + len)
    } else {
        None
    }
}

/// Build a page, awaiting `count` only when the total cannot be inferred.
///
/// `count` is an unpolled future, so an unused count never reaches the engine.
pub async fn page_of<T, C>(content: Vec<T>, pageable: &Pageable, count: C) -> Result<Page<T>, DataError>
where
    C: Future<Output = Result<u64, DataError>>,
{
    let total = match infer_total(content.len(), pageable) {
        Some(total) => total,
        None => {
            tracing::debug!(page = pageable.page, size = pageable.size, "running count query");
            count.await?
        }
    };
    Ok(Page::new(content, pageable, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_infer_total() {
        let first = Pageable::of(0, 3);
        assert_eq!(infer_total(0, &first), Some(0));
        assert_eq!(infer_total(2, &first), Some(2));
        assert_eq!(infer_total(3, &first), None);

        let third = Pageable::of(2, 3);
        assert_eq!(infer_total(1, &third), Some(7));
        assert_eq!(infer_total(3, &third), None);
        assert_eq!(infer_total(0, &third), None);
    }

    #[tokio::test]
    async fn test_count_not_polled_for_short_first_page() {
        let polled = AtomicUsize::new(0);
        let page = page_of(vec!["a", "b"], &Pageable::of(0, 5), async {
            polled.fetch_add(1, Ordering::SeqCst);
            Ok(99)
        })
        .await
        .unwrap();
        assert_eq!(page.total_elements, 2);
        assert_eq!(polled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_count_used_for_full_page() {
        let page = page_of(vec![1, 2], &Pageable::of(0, 2), async { Ok(9) })
            .await
            .unwrap();
        assert_eq!(page.total_elements, 9);
        assert_eq!(page.total_pages, 5);
    }

    #[tokio::test]
    async fn test_count_error_propagates() {
        let err = page_of(Vec::<i32>::new(), &Pageable::of(4, 2), async {
            Err(DataError::Other("boom".into()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Data error: boom");
    }
}
