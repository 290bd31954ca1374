//! Page-number pagination shared by every feed.
//!
//! A request carries an optional, untrusted page string. Anything that does not
//! name an existing page resolves to the first page; pagination never fails.

use serde::Serialize;

/// Fixed page size for every feed.
pub const POSTS_PER_PAGE: u32 = 10;

/// Resolved position inside an ordered sequence of `total_items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    number: u32,
    size: u32,
    total_items: u64,
    total_pages: u32,
}

impl PageWindow {
    /// Resolve the requested page against the current item count.
    pub fn resolve(total_items: u64, page_size: u32, requested: Option<&str>) -> Self {
        let size = page_size.max(1);
        let total_pages = total_pages(total_items, size);
        let number = parse_page_number(requested)
            .filter(|number| *number <= total_pages)
            .unwrap_or(1);

        Self {
            number,
            size,
            total_items,
            total_pages,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Number of items preceding this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    pub fn limit(&self) -> u32 {
        self.size
    }
}

/// Parse a 1-based page number; zero, negatives and garbage yield `None`.
pub fn parse_page_number(raw: Option<&str>) -> Option<u32> {
    raw.map(str::trim)
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|number| *number >= 1)
}

/// `ceil(total_items / page_size)`, with an empty sequence still owning one page.
pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total_items.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// One page of an ordered sequence plus the metadata needed to render navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn from_window(window: PageWindow, mut items: Vec<T>) -> Self {
        items.truncate(window.size() as usize);
        Self {
            items,
            number: window.number(),
            total_pages: window.total_pages(),
            total_items: window.total_items(),
            page_size: window.size(),
        }
    }

    /// Paginate an already-ordered in-memory sequence.
    pub fn from_slice(all: Vec<T>, page_size: u32, requested: Option<&str>) -> Self {
        let window = PageWindow::resolve(all.len() as u64, page_size, requested);
        let start = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(start)
            .take(window.limit() as usize)
            .collect();
        Self::from_window(window, items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn previous_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            total_pages: self.total_pages,
            total_items: self.total_items,
            page_size: self.page_size,
        }
    }
}
