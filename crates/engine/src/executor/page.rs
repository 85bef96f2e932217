//! Paging and continuation cookies
//!
//! Every query is paged: the declared page size, or the configured default.
//! A cookie records the page number and the first and last primary ids on
//! the page:
//!
//! ```text
//! <cookie page="2"><accountid last="{...}" first="{...}" /></cookie>
//! ```
//!
//! Ids are upper-case and braced. Paging is positional, so presenting a
//! cookie is equivalent to requesting its page number.

use crate::translate::xml;
use recordfake_core::Record;
use std::fmt;
use uuid::Uuid;

pub(super) struct Page {
    pub records: Vec<Record>,
    pub more_records: bool,
}

/// Cut page `number` (1-based) of `size` rows.
///
/// A page past the end is empty with no further pages.
pub(super) fn slice(mut records: Vec<Record>, number: usize, size: usize) -> Page {
    let start = number.max(1).saturating_sub(1).saturating_mul(size);
    if start >= records.len() {
        return Page {
            records: Vec::new(),
            more_records: false,
        };
    }
    let end = start.saturating_add(size).min(records.len());
    let more_records = end < records.len();
    records.truncate(end);
    Page {
        records: records.split_off(start),
        more_records,
    }
}

/// Cookie for a page, `None` when the page is empty
pub(super) fn cookie(records: &[Record], number: usize, id_attribute: &str) -> Option<String> {
    let first = records.first()?;
    let last = records.last()?;
    Some(
        PagingCookie {
            page: number.max(1),
            id_attribute: id_attribute.to_string(),
            first: first.id,
            last: last.id,
        }
        .to_string(),
    )
}

/// Decoded continuation cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingCookie {
    /// Page the cookie was issued for
    pub page: usize,
    /// Primary id attribute of the paged type
    pub id_attribute: String,
    /// Id of the first record on the page
    pub first: Uuid,
    /// Id of the last record on the page
    pub last: Uuid,
}

impl PagingCookie {
    /// Decode a cookie string; `None` if it is not one this engine issued
    pub fn parse(cookie: &str) -> Option<Self> {
        let root = xml::parse(cookie).ok()?;
        if root.name != "cookie" {
            return None;
        }
        let page = root.number("page").ok()??;
        let ids = root.children.first()?;
        let id = |name: &str| -> Option<Uuid> {
            let raw = ids.attr(name)?;
            Uuid::parse_str(raw.trim_start_matches('{').trim_end_matches('}')).ok()
        };
        Some(Self {
            page,
            id_attribute: ids.name.clone(),
            first: id("first")?,
            last: id("last")?,
        })
    }
}

impl fmt::Display for PagingCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<cookie page=\"{}\"><{} last=\"{{{}}}\" first=\"{{{}}}\" /></cookie>",
            self.page,
            self.id_attribute,
            self.last.as_hyphenated().to_string().to_uppercase(),
            self.first.as_hyphenated().to_string().to_uppercase(),
        )
    }
}
