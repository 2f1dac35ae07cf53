use std::collections::BTreeMap;

use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};
use serde::Serialize;

use crate::error::{AppError, AppResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub number: u64,
    pub size: u64,
}

impl PageRequest {
    /// Reads `page` and `page_size`. An unparseable page is a 404, matching an out-of-range
    /// page; an unparseable size falls back to the default.
    pub fn from_params(
        params: &BTreeMap<String, String>,
        default_size: u64,
        max_size: u64,
    ) -> AppResult<Self> {
        let number = match params.get("page").map(|p| p.trim()).filter(|p| !p.is_empty()) {
            None => 1,
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(invalid_page()),
            },
        };
        let size = params
            .get("page_size")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&s| s > 0)
            .map_or(default_size, |s| s.min(max_size));
        Ok(Self { number, size })
    }
}

fn invalid_page() -> AppError {
    AppError::NotFound("Invalid page.".to_string())
}

/// Absolute URL of the current request, used to derive next/previous links.
#[derive(Clone, Debug)]
pub struct PageLinks {
    pub base: String,
    pub path: String,
    pub params: BTreeMap<String, String>,
}

impl PageLinks {
    fn link(&self, page: u64) -> String {
        let mut params = self.params.clone();
        if page <= 1 {
            params.remove("page");
        } else {
            params.insert("page".to_string(), page.to_string());
        }
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        if query.is_empty() {
            format!("{}{}", self.base, self.path)
        } else {
            format!("{}{}?{}", self.base, self.path, query)
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: u64, results: Vec<T>, request: PageRequest, links: &PageLinks) -> Self {
        let last = count.div_ceil(request.size).max(1);
        Self {
            count,
            next: (request.number < last).then(|| links.link(request.number + 1)),
            previous: (request.number > 1).then(|| links.link(request.number - 1)),
            results,
        }
    }
}

/// Runs `select` for one page. `select` must already carry a total ordering.
pub async fn fetch_page<'db, C, E>(
    conn: &'db C,
    select: Select<E>,
    request: PageRequest,
) -> AppResult<(u64, Vec<E::Model>)>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Sync + 'db,
{
    let paginator = select.paginate(conn, request.size);
    let count = paginator.num_items().await?;
    let offset = (request.number - 1).checked_mul(request.size).ok_or_else(invalid_page)?;
    if request.number > 1 && offset >= count {
        return Err(invalid_page());
    }
    let rows = paginator.fetch_page(request.number - 1).await?;
    Ok((count, rows))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn links(pairs: &[(&str, &str)]) -> PageLinks {
        PageLinks {
            base: "http://testserver".to_string(),
            path: "/api/movies".to_string(),
            params: params(pairs),
        }
    }

    #[test]
    fn page_request_defaults_and_clamps() {
        assert_eq!(
            PageRequest::from_params(&params(&[]), 10, 100).unwrap(),
            PageRequest { number: 1, size: 10 }
        );
        assert_eq!(
            PageRequest::from_params(&params(&[("page", "3"), ("page_size", "500")]), 10, 100)
                .unwrap(),
            PageRequest { number: 3, size: 100 }
        );
        assert_eq!(
            PageRequest::from_params(&params(&[("page_size", "abc")]), 10, 100).unwrap().size,
            10
        );
    }

    #[test]
    fn bad_page_number_is_not_found() {
        for raw in ["0", "-1", "last"] {
            let err = PageRequest::from_params(&params(&[("page", raw)]), 10, 100).unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)), "{raw}");
        }
    }

    #[test]
    fn first_page_links_forward_only() {
        let page = Page::new(15, vec![0; 10], PageRequest { number: 1, size: 10 }, &links(&[("title", "a b")]));
        assert_eq!(page.next.as_deref(), Some("http://testserver/api/movies?page=2&title=a%20b"));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn second_page_previous_drops_page_param() {
        let page = Page::new(
            25,
            vec![0; 10],
            PageRequest { number: 2, size: 10 },
            &links(&[("page", "2"), ("ordering", "-rating")]),
        );
        assert_eq!(page.previous.as_deref(), Some("http://testserver/api/movies?ordering=-rating"));
        assert_eq!(
            page.next.as_deref(),
            Some("http://testserver/api/movies?ordering=-rating&page=3")
        );
    }

    #[test]
    fn empty_result_has_no_links() {
        let page: Page<i32> = Page::new(0, vec![], PageRequest { number: 1, size: 10 }, &links(&[]));
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
        assert_eq!(page.count, 0);
    }
}
