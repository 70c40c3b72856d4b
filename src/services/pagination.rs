use serde::Serialize;

/// Pages shown around the current one before gaps are introduced
const WINDOW_PAGES: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageLink {
    Page(u64),
    #[serde(serialize_with = "serialize_gap")]
    Gap,
}

fn serialize_gap<S: serde::Serializer>(serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str("...")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    /// Page numbers start at 1; zero is treated as the first page
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let per_page = per_page.max(1);
        Self {
            page: page.max(1),
            per_page,
            total,
            total_pages: total.div_ceil(per_page).max(1),
        }
    }

    /// Saturates for page numbers far past the end
    pub fn offset(&self) -> usize {
        let offset = (self.page - 1).saturating_mul(self.per_page);
        usize::try_from(offset).unwrap_or(usize::MAX)
    }

    pub fn limit(&self) -> usize {
        self.per_page as usize
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Page links: every page when few, else first, neighbours of the current page and last
    pub fn links(&self) -> Vec<PageLink> {
        let (page, last) = (self.page, self.total_pages);
        if last <= WINDOW_PAGES {
            return (1..=last).map(PageLink::Page).collect();
        }

        let mut links = vec![PageLink::Page(1)];
        if page > 3 {
            links.push(PageLink::Gap);
        }
        let start = page.saturating_sub(1).max(2);
        let end = page.saturating_add(1).min(last - 1);
        links.extend((start..=end).map(PageLink::Page));
        if page.saturating_add(2) < last {
            links.push(PageLink::Gap);
        }
        links.push(PageLink::Page(last));
        links
    }
}
