use crate::parser::RowParser;
use crate::size::format_size;
use crate::{FeedError, FeedResult};
use log::debug;
use std::fmt;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Longest cell value, in characters, kept in a preview.
pub const CELL_CAP: usize = 1024;

/// One page of data rows. Rows are counted from 1, header excluded.
///
/// Both numbers are at least 1; [`PageWindow::new`] is the only way to build
/// one with other values than the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: usize,
    per_page: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl PageWindow {
    pub fn new(page: usize, per_page: usize) -> FeedResult<Self> {
        if page == 0 || per_page == 0 {
            return Err(FeedError::InvalidWindow { page, per_page });
        }
        Ok(Self { page, per_page })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    fn check(&self) -> FeedResult<()> {
        Self::new(self.page, self.per_page).map(drop)
    }

    /// Rows at or before this count precede the window.
    pub fn start_row(&self) -> usize {
        self.per_page.saturating_mul(self.page.saturating_sub(1))
    }

    /// Last row count inside the window.
    pub fn end_row(&self) -> usize {
        self.per_page.saturating_mul(self.page)
    }
}

/// Number of pages needed to show `total_rows`.
pub fn total_pages(total_rows: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    total_rows.div_ceil(per_page)
}

/// A preview cell: at most [`CELL_CAP`] characters plus a note on what was cut.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayCell {
    pub value: String,
    /// `" (<size> more)"` when the value was cut, empty otherwise.
    pub more: String,
}

impl DisplayCell {
    pub fn from_raw(raw: &str) -> Self {
        match raw.char_indices().nth(CELL_CAP) {
            None => Self {
                value: raw.to_owned(),
                more: String::new(),
            },
            Some((cut, _)) => {
                let removed = raw[cut..].chars().count() as u64;
                Self {
                    value: raw[..cut].to_owned(),
                    more: format!(" ({} more)", format_size(removed)),
                }
            }
        }
    }

    pub fn is_truncated(&self) -> bool {
        !self.more.is_empty()
    }
}

impl fmt::Display for DisplayCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.more)
    }
}

/// How far a window read has to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowScan {
    /// Parse to the end to learn the exact row count (first look at a file).
    Full,
    /// Abort as soon as the window is filled (count already known).
    Window,
}

/// Result of [`read_window`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPage {
    pub window: PageWindow,
    pub header: Vec<String>,
    pub rows: Vec<Vec<DisplayCell>>,
    /// Data row count; `None` when the parse stopped before the end.
    pub total_rows: Option<usize>,
    /// Data rows the parser dispatched before stopping.
    pub rows_scanned: usize,
}

impl WindowPage {
    pub fn total_pages(&self) -> Option<usize> {
        self.total_rows
            .map(|total| total_pages(total, self.window.per_page))
    }
}

/// Parses `reader` and returns the header plus the rows inside `window`.
///
/// Rows past the window are only counted, never materialized. With
/// [`RowScan::Window`] the parse is aborted once the window is full.
/// Cancelling `cancel` stops the parse early, even while it waits on input;
/// whatever was buffered so far is still returned, with no total.
pub async fn read_window<R>(
    reader: R,
    window: PageWindow,
    scan: RowScan,
    cancel: &CancellationToken,
) -> FeedResult<WindowPage>
where
    R: AsyncRead + Unpin + Send,
{
    window.check()?;
    let mut parser = RowParser::new(reader, cancel.child_token());
    let start_row = window.start_row();
    let end_row = window.end_row();

    let header = parser.next_row().await?.unwrap_or_default();
    let mut seen = 0usize;
    let mut filled = false;
    let mut rows = Vec::with_capacity(window.per_page.min(1024));

    while let Some(row) = parser.next_row().await? {
        seen += 1;
        if filled {
            continue;
        }
        if seen > start_row {
            rows.push(row.iter().map(|raw| DisplayCell::from_raw(raw)).collect());
        }
        if seen >= end_row {
            filled = true;
            if scan == RowScan::Window {
                parser.abort();
            }
        }
    }

    let total_rows = (!parser.is_aborted()).then_some(seen);
    debug!(
        "window page={} per_page={}: {} rows, scanned {}, total {:?}",
        window.page,
        window.per_page,
        rows.len(),
        seen,
        total_rows
    );

    Ok(WindowPage {
        window,
        header,
        rows,
        total_rows,
        rows_scanned: seen,
    })
}
