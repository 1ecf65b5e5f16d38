use serde::Serialize;

/// One page of a larger listing plus the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// `limit: None` means everything from `offset` on; the reported limit is then the total.
    pub fn from_items(items: Vec<T>, limit: Option<usize>, offset: usize) -> Self {
        let total = items.len();
        let limit = limit.unwrap_or(total);
        let data = items.into_iter().skip(offset).take(limit).collect();
        Self { total, limit, offset, data }
    }
}
