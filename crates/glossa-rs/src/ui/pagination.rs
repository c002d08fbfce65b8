//! Windowed pagination for search results.
//!
//! [`build`] is a pure function from `(current_page, total_pages)` to the
//! entry list a frontend renders. Small result sets list every page; large
//! ones show a window around the current page with the first and last
//! pages always reachable and ellipses for the elided stretches. A gap of
//! exactly one page is never elided — the literal page is shown instead.

/// Largest page count that is rendered without a window.
pub const SIMPLE_MODE_MAX: u32 = 30;

/// One rendered entry of the pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEntry {
    Page {
        number: u32,
        first: bool,
        last: bool,
        current: bool,
    },
    Ellipsis,
}

/// The computed page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub current_page: u32,
    pub total_pages: u32,
    pub entries: Vec<PageEntry>,
}

/// Build the page window for `current_page` of `total_pages`.
pub fn build(current_page: u32, total_pages: u32) -> PageWindow {
    let page = |number: u32| PageEntry::Page {
        number,
        first: number == 1,
        last: number == total_pages,
        current: number == current_page,
    };

    let mut entries = Vec::new();

    if total_pages <= SIMPLE_MODE_MAX {
        entries.extend((1..=total_pages).map(page));
        return PageWindow {
            current_page,
            total_pages,
            entries,
        };
    }

    let left = current_page.saturating_sub(1).max(1);
    let right = (current_page + 1).min(total_pages);

    if current_page != 1 {
        entries.push(page(1));
    }
    let left_gap = left - 1;
    if left_gap > 2 {
        entries.push(PageEntry::Ellipsis);
    } else if left_gap == 2 {
        entries.push(page(2));
    }
    if left_gap > 0 {
        entries.push(page(left));
    }

    entries.push(page(current_page));

    let right_gap = total_pages - right;
    if right_gap > 0 {
        entries.push(page(right));
    }
    if right_gap > 2 {
        entries.push(PageEntry::Ellipsis);
    } else if right_gap == 2 {
        entries.push(page(total_pages - 1));
    }
    if total_pages != current_page {
        entries.push(page(total_pages));
    }

    PageWindow {
        current_page,
        total_pages,
        entries,
    }
}
