//! Keyset (cursor) pagination.
//!
//! A page is addressed by the raw id of a boundary row plus a direction; the
//! pager keeps no other state. Stores turn a [`PageRequest`] into a
//! [`KeysetPlan`] (a bound, a scan order, a limit) and hand the fetched rows
//! back to [`KeysetPlan::finish`], which restores display order and derives the
//! next cursor pair.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Upper bound applied to any requested page size.
pub const MAX_LIMIT: u32 = 1000;

/// Paging direction relative to the cursor, in display order.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Next,
    Prev,
}

impl FromStr for Direction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "next" => Ok(Direction::Next),
            "prev" => Ok(Direction::Prev),
            other => Err(DomainError::bad_request(format!(
                "invalid direction '{other}': expected 'next' or 'prev'"
            ))),
        }
    }
}

/// Ordering of ids.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Strict id bound derived from a non-zero cursor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Bound {
    /// `id > value`
    After(i64),
    /// `id < value`
    Before(i64),
}

impl Bound {
    pub fn admits(self, id: i64) -> bool {
        match self {
            Bound::After(v) => id > v,
            Bound::Before(v) => id < v,
        }
    }

    pub fn sql_operator(self) -> &'static str {
        match self {
            Bound::After(_) => ">",
            Bound::Before(_) => "<",
        }
    }

    pub fn value(self) -> i64 {
        match self {
            Bound::After(v) | Bound::Before(v) => v,
        }
    }
}

/// Validated paging parameters.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageRequest {
    cursor: i64,
    limit: u32,
    direction: Direction,
}

impl PageRequest {
    /// Validates raw parameters. `cursor` 0 (or absent) means unbounded.
    pub fn new(
        cursor: Option<i64>,
        limit: Option<i64>,
        direction: Option<&str>,
        default_limit: u32,
    ) -> DomainResult<Self> {
        let cursor = cursor.unwrap_or(0);
        if cursor < 0 {
            return Err(DomainError::bad_request("cursor must not be negative"));
        }

        let limit = match limit {
            None => default_limit,
            Some(l) if l <= 0 => {
                return Err(DomainError::bad_request("limit must be greater than zero"));
            }
            Some(l) => u32::try_from(l).unwrap_or(MAX_LIMIT),
        };

        let direction = match direction {
            Some(raw) => raw.parse()?,
            None => Direction::Next,
        };

        Ok(Self {
            cursor,
            limit: limit.clamp(1, MAX_LIMIT),
            direction,
        })
    }

    pub fn next(cursor: i64, limit: u32) -> Self {
        Self {
            cursor: cursor.max(0),
            limit: limit.clamp(1, MAX_LIMIT),
            direction: Direction::Next,
        }
    }

    pub fn prev(cursor: i64, limit: u32) -> Self {
        Self {
            cursor: cursor.max(0),
            limit: limit.clamp(1, MAX_LIMIT),
            direction: Direction::Prev,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Plans the scan for a listing displayed in `display` order.
    ///
    /// `Prev` scans away from the cursor in reverse display order so that the
    /// `limit` nearest rows are taken, then [`KeysetPlan::finish`] flips them
    /// back.
    pub fn plan(&self, display: SortOrder) -> KeysetPlan {
        let (scan_order, reverse) = match self.direction {
            Direction::Next => (display, false),
            Direction::Prev => (display.reversed(), true),
        };
        let bound = (self.cursor != 0).then(|| match scan_order {
            SortOrder::Ascending => Bound::After(self.cursor),
            SortOrder::Descending => Bound::Before(self.cursor),
        });
        KeysetPlan {
            bound,
            scan_order,
            limit: self.limit,
            reverse,
        }
    }
}

/// What a store has to execute for one page.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeysetPlan {
    pub bound: Option<Bound>,
    pub scan_order: SortOrder,
    pub limit: u32,
    pub reverse: bool,
}

impl KeysetPlan {
    pub fn admits(&self, id: i64) -> bool {
        self.bound.is_none_or(|b| b.admits(id))
    }

    /// Turns rows fetched in scan order into a page in display order.
    pub fn finish<T>(&self, mut rows: Vec<T>, id_of: impl Fn(&T) -> i64) -> Page<T> {
        rows.truncate(self.limit as usize);
        if self.reverse {
            rows.reverse();
        }
        let cursor = match (rows.first(), rows.last()) {
            (Some(first), Some(last)) => Cursor {
                next: id_of(last),
                previous: id_of(first),
            },
            _ => Cursor::default(),
        };
        Page {
            items: rows,
            cursor,
        }
    }
}

/// Boundary ids of a page: `next` is the last row, `previous` the first.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub next: i64,
    pub previous: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Cursor,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            cursor: Cursor::default(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            cursor: self.cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Executes a plan over an in-memory id set, the way a store would.
    fn run(ids: &[i64], req: PageRequest, display: SortOrder) -> Page<i64> {
        let plan = req.plan(display);
        let mut rows: Vec<i64> = ids.iter().copied().filter(|id| plan.admits(*id)).collect();
        match plan.scan_order {
            SortOrder::Ascending => rows.sort_unstable(),
            SortOrder::Descending => rows.sort_unstable_by(|a, b| b.cmp(a)),
        }
        rows.truncate(plan.limit as usize);
        plan.finish(rows, |id| *id)
    }

    #[test]
    fn validates_raw_parameters() {
        let req = PageRequest::new(None, None, None, 10).unwrap();
        assert_eq!((req.cursor(), req.limit(), req.direction()), (0, 10, Direction::Next));

        assert!(PageRequest::new(Some(-1), None, None, 10).unwrap_err().is_bad_request());
        assert!(PageRequest::new(None, Some(0), None, 10).unwrap_err().is_bad_request());
        assert!(PageRequest::new(None, None, Some("sideways"), 10)
            .unwrap_err()
            .is_bad_request());

        let capped = PageRequest::new(Some(5), Some(50_000), Some("PREV"), 10).unwrap();
        assert_eq!(capped.limit(), MAX_LIMIT);
        assert_eq!(capped.direction(), Direction::Prev);
    }

    #[test]
    fn next_and_prev_on_ascending_listing() {
        let ids: Vec<i64> = (1..=7).collect();

        let first = run(&ids, PageRequest::next(0, 3), SortOrder::Ascending);
        assert_eq!(first.items, vec![1, 2, 3]);
        assert_eq!(first.cursor, Cursor { next: 3, previous: 1 });

        let second = run(&ids, PageRequest::next(first.cursor.next, 3), SortOrder::Ascending);
        assert_eq!(second.items, vec![4, 5, 6]);

        let back = run(&ids, PageRequest::prev(second.cursor.previous, 3), SortOrder::Ascending);
        assert_eq!(back.items, first.items);
    }

    #[test]
    fn descending_listing_pages_newest_first() {
        let ids: Vec<i64> = (1..=5).collect();
        let first = run(&ids, PageRequest::next(0, 2), SortOrder::Descending);
        assert_eq!(first.items, vec![5, 4]);
        let second = run(&ids, PageRequest::next(first.cursor.next, 2), SortOrder::Descending);
        assert_eq!(second.items, vec![3, 2]);
        let back = run(&ids, PageRequest::prev(second.cursor.previous, 2), SortOrder::Descending);
        assert_eq!(back.items, vec![5, 4]);
    }

    #[test]
    fn prev_from_zero_returns_last_page() {
        let ids: Vec<i64> = (1..=5).collect();
        let page = run(&ids, PageRequest::prev(0, 2), SortOrder::Ascending);
        assert_eq!(page.items, vec![4, 5]);
    }

    #[test]
    fn empty_page_has_zero_cursor() {
        let page = run(&[1, 2], PageRequest::next(2, 5), SortOrder::Ascending);
        assert!(page.items.is_empty());
        assert_eq!(page.cursor, Cursor::default());
    }

    proptest! {
        #[test]
        fn forward_then_backward_round_trips(
            n in 1i64..60,
            limit in 1u32..8,
            descending in any::<bool>(),
        ) {
            let display = if descending { SortOrder::Descending } else { SortOrder::Ascending };
            let ids: Vec<i64> = (1..=n).collect();

            let p1 = run(&ids, PageRequest::next(0, limit), display);
            prop_assert!(!p1.items.is_empty());
            let p2 = run(&ids, PageRequest::next(p1.cursor.next, limit), display);
            if !p2.items.is_empty() {
                let back = run(&ids, PageRequest::prev(p2.cursor.previous, limit), display);
                prop_assert_eq!(back.items, p1.items.clone());
            }

            // walking forward visits every id exactly once
            let mut seen = Vec::new();
            let mut cursor = 0;
            loop {
                let page = run(&ids, PageRequest::next(cursor, limit), display);
                if page.items.is_empty() { break; }
                cursor = page.cursor.next;
                seen.extend(page.items);
            }
            prop_assert_eq!(seen.len() as i64, n);
        }
    }
}
