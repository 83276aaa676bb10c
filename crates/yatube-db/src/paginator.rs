use std::num::IntErrorKind;

use yatube_types::api::Page;

/// Splits an ordered result set into fixed-size, 1-based pages.
///
/// Page numbers that are missing or not integers resolve to page 1. Numbers
/// outside `1..=num_pages` clamp to the nearest end rather than erroring, so
/// a stale `?page=` link still renders something. An empty result set has
/// exactly one (empty) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u32,
}

/// Resolved position of one page inside a result set of `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    pub per_page: u32,
}

impl Paginator {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn num_pages(&self, count: u64) -> u32 {
        if count == 0 {
            return 1;
        }
        let pages = count.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn window(&self, requested: Option<&str>, count: u64) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = match requested.and_then(parse_page_number) {
            None => 1,
            Some(n) if n < 1 => 1,
            Some(n) => n.min(i64::from(num_pages)) as u32,
        };

        PageWindow {
            number,
            num_pages,
            count,
            per_page: self.per_page,
        }
    }

}

/// Integers too large for `i64` are still page numbers; they saturate by sign
/// so the caller clamps them like any other out-of-range value.
fn parse_page_number(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

impl PageWindow {
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            per_page: self.per_page,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pages through `0..n`.
    fn page_of(p: Paginator, n: usize, requested: Option<&str>) -> Page<usize> {
        let window = p.window(requested, n as u64);
        let items = (0..n)
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .collect();
        window.into_page(items)
    }

    #[test]
    fn first_page_holds_at_most_per_page() {
        let p = Paginator::new(10);
        for n in [0, 3, 10, 14, 25] {
            let page = page_of(p, n, None);
            assert_eq!(page.items.len(), n.min(10), "n = {n}");
        }
    }

    #[test]
    fn second_page_holds_the_remainder() {
        let p = Paginator::new(10);
        let page = page_of(p, 14, Some("2"));
        assert_eq!(page.items, vec![10, 11, 12, 13]);
        assert!(page.has_previous);
        assert!(!page.has_next);
        assert_eq!(page.num_pages, 2);
    }

    #[test]
    fn invalid_or_missing_number_is_page_one() {
        let p = Paginator::new(10);
        for raw in [None, Some(""), Some("abc"), Some("1.5"), Some("99999999999999999999x")] {
            assert_eq!(p.window(raw, 30).number, 1, "raw = {raw:?}");
        }
    }

    #[test]
    fn out_of_range_clamps_to_nearest_end() {
        let p = Paginator::new(10);
        assert_eq!(p.window(Some("0"), 30).number, 1);
        assert_eq!(p.window(Some("-4"), 30).number, 1);
        assert_eq!(p.window(Some("99"), 30).number, 3);
        assert_eq!(p.window(Some("99999999999999999999"), 30).number, 3);
        assert_eq!(p.window(Some("+99999999999999999999"), 30).number, 3);
        assert_eq!(p.window(Some("-99999999999999999999"), 30).number, 1);

        let page = page_of(p, 30, Some("99"));
        assert_eq!(page.items, (20..30).collect::<Vec<_>>());
    }

    #[test]
    fn empty_set_has_a_single_empty_page() {
        let p = Paginator::new(10);
        let page = page_of(p, 0, Some("5"));
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
        assert!(!page.has_next && !page.has_previous);
    }

    #[test]
    fn zero_page_size_is_raised_to_one() {
        let p = Paginator::new(0);
        assert_eq!(p.per_page(), 1);
        assert_eq!(p.num_pages(3), 3);
    }

    #[test]
    fn window_offsets() {
        let w = Paginator::new(10).window(Some("3"), 45);
        assert_eq!(w.offset(), 20);
        assert_eq!(w.limit(), 10);
        assert!(w.has_next() && w.has_previous());
    }
}
