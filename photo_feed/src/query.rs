//! Pagination and sorting over a store snapshot.
//!
//! Raw query-string values are parsed into a [`PageRequest`] that always
//! holds usable values: anything unparseable falls back to its default and
//! no input ever produces an error.

use serde::Serialize;
use std::cmp::Ordering;

use crate::model::Photo;

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_PAGE: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Fields a client may sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    AlbumId,
    Title,
    Url,
    ThumbnailUrl,
    /// A name that is not a photo field. Every pair compares equal, so the
    /// snapshot order is kept.
    Unknown,
}

impl SortField {
    pub fn from_name(name: &str) -> Self {
        match name {
            "id" => SortField::Id,
            "albumId" => SortField::AlbumId,
            "title" => SortField::Title,
            "url" => SortField::Url,
            "thumbnailUrl" => SortField::ThumbnailUrl,
            _ => SortField::Unknown,
        }
    }

    /// Compare two photos on this field. `None` means one side lacks the
    /// field and the pair has no preferred order.
    fn compare(self, a: &Photo, b: &Photo) -> Option<Ordering> {
        match self {
            SortField::Id => Some(a.id.cmp(&b.id)),
            SortField::AlbumId => cmp_present(a.album_id.as_ref(), b.album_id.as_ref()),
            SortField::Title => cmp_present(a.title.as_ref(), b.title.as_ref()),
            SortField::Url => cmp_present(a.url.as_ref(), b.url.as_ref()),
            SortField::ThumbnailUrl => {
                cmp_present(a.thumbnail_url.as_ref(), b.thumbnail_url.as_ref())
            }
            SortField::Unknown => None,
        }
    }
}

fn cmp_present<T: Ord>(a: Option<&T>, b: Option<&T>) -> Option<Ordering> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: SortField,
    pub direction: SortDirection,
}

impl OrderBy {
    /// Parse `field:direction`. Returns `None` when there is no `:` or the
    /// direction is not exactly `asc` or `desc`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (field, direction) = raw.split_once(':')?;
        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return None,
        };

        Some(Self {
            field: SortField::from_name(field),
            direction,
        })
    }

    fn compare(&self, a: &Photo, b: &Photo) -> Ordering {
        let ordering = self.field.compare(a, b).unwrap_or(Ordering::Equal);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Validated pagination and sort parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub page: usize,
    pub order_by: Option<OrderBy>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: DEFAULT_PAGE,
            order_by: None,
        }
    }
}

impl PageRequest {
    /// Build a request from raw `(key, value)` query pairs. The first
    /// occurrence of a key wins; unknown keys are ignored.
    pub fn from_pairs<K, V>(pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lookup = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key.as_ref() == name)
                .map(|(_, value)| value.as_ref())
        };

        Self {
            limit: parse_limit(lookup("limit")),
            page: parse_page(lookup("page")),
            order_by: lookup("orderBy").and_then(OrderBy::parse),
        }
    }
}

pub fn parse_limit(raw: Option<&str>) -> usize {
    raw.and_then(parse_positive).unwrap_or(DEFAULT_LIMIT)
}

pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(parse_positive).unwrap_or(DEFAULT_PAGE)
}

/// Accept decimal digits only, non-zero, within `usize`.
fn parse_positive(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<usize>().ok().filter(|n| *n > 0)
}

/// One page of results plus the size of the set it was cut from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub photos: Vec<Photo>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

/// Sort (when requested) and slice `snapshot` according to `request`.
pub fn query(snapshot: &[Photo], request: &PageRequest) -> PageResult {
    let mut ordered: Vec<&Photo> = snapshot.iter().collect();
    if let Some(order_by) = request.order_by {
        merge_sort_by(&mut ordered, &|a: &&Photo, b: &&Photo| order_by.compare(a, b));
    }

    let total = ordered.len();
    let start = request.page.saturating_sub(1).saturating_mul(request.limit);
    let photos = if start >= total {
        Vec::new()
    } else {
        let end = start.saturating_add(request.limit).min(total);
        ordered[start..end].iter().map(|p| (*p).clone()).collect()
    };

    PageResult {
        photos,
        page: request.page,
        limit: request.limit,
        total,
    }
}

/// Stable top-down merge sort.
///
/// A missing field makes the comparator non-transitive, which `slice::sort_by`
/// is allowed to panic on. Merging only takes from the right run on a strict
/// `Less`, so equal pairs keep their input order.
fn merge_sort_by<T, F>(items: &mut Vec<T>, compare: &F)
where
    T: Copy,
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return;
    }

    let mut right = items.split_off(items.len() / 2);
    let mut left = std::mem::take(items);
    merge_sort_by(&mut left, compare);
    merge_sort_by(&mut right, compare);

    items.reserve(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if compare(&right[j], &left[i]) == Ordering::Less {
            items.push(right[j]);
            j += 1;
        } else {
            items.push(left[i]);
            i += 1;
        }
    }
    items.extend_from_slice(&left[i..]);
    items.extend_from_slice(&right[j..]);
}
