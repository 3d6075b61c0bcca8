use serde::Serialize;

/// Fixed display grid that sizes a result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub rows: u32,
    pub columns: u32,
}

impl Grid {
    pub fn new(rows: u32, columns: u32) -> Self {
        Self {
            rows: rows.max(1),
            columns: columns.max(1),
        }
    }

    pub fn items_per_page(&self) -> u32 {
        self.rows * self.columns
    }

    /// Clamps `requested` into the valid page range for `total` results.
    pub fn paginate(&self, total: i64, requested: i64) -> Page {
        let per_page = i64::from(self.items_per_page());
        let total = total.max(0);
        let total_pages = ((total + per_page - 1) / per_page).max(1);
        let current = requested.clamp(1, total_pages);
        Page {
            current,
            total_pages,
            limit: per_page,
            offset: (current - 1) * per_page,
        }
    }
}

/// A resolved page: 1-indexed number, page count and the row window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub current: i64,
    pub total_pages: i64,
    pub limit: i64,
    pub offset: i64,
}
