use crate::feed::{write_batches, OutputFile};
use crate::io::{reader_from_path, SourceMeta};
use crate::post::FieldMapping;
use crate::window::{read_window, PageWindow, RowScan, WindowPage};
use crate::{FeedError, FeedResult};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct Selection {
    path: PathBuf,
    generation: u64,
}

/// What the last preview learned about the selected file.
#[derive(Debug, Default)]
struct Tracked {
    generation: Option<u64>,
    total_rows: Option<usize>,
}

/// One user's working state: the picked file, what is known about it, and
/// the parse currently running on it.
///
/// Only one parse runs at a time; a request made while another is in flight
/// fails with [`FeedError::Busy`] and changes nothing. Picking a file again,
/// even the same path, counts as a new file and triggers a full row count on
/// the next preview.
pub struct Session {
    mapping: FieldMapping,
    charset: &'static encoding_rs::Encoding,
    selected: Mutex<Option<Selection>>,
    generations: AtomicU64,
    in_flight: Mutex<CancellationToken>,
    tracked: tokio::sync::Mutex<Tracked>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(FieldMapping::default())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            charset: encoding_rs::UTF_8,
            selected: Mutex::new(None),
            generations: AtomicU64::new(0),
            in_flight: Mutex::new(CancellationToken::new()),
            tracked: tokio::sync::Mutex::new(Tracked::default()),
        }
    }

    /// Charset of the files this session reads; UTF-8 unless set.
    pub fn with_charset(mut self, charset: &'static encoding_rs::Encoding) -> Self {
        self.charset = charset;
        self
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn select_file(&self, path: impl Into<PathBuf>) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        *lock(&self.selected) = Some(Selection {
            path: path.into(),
            generation,
        });
    }

    pub fn clear_selection(&self) {
        *lock(&self.selected) = None;
    }

    pub fn selected_file(&self) -> Option<PathBuf> {
        lock(&self.selected).as_ref().map(|s| s.path.clone())
    }

    pub fn is_busy(&self) -> bool {
        // Taken in the same order as `start`, so a busy answer means the
        // running parse's token is already installed.
        let _in_flight = lock(&self.in_flight);
        self.tracked.try_lock().is_err()
    }

    /// Row count of the selected file, if a preview has already counted it.
    /// `None` while a parse is running.
    pub fn known_total(&self) -> Option<usize> {
        let selection = lock(&self.selected).clone()?;
        let tracked = self.tracked.try_lock().ok()?;
        if tracked.generation == Some(selection.generation) {
            tracked.total_rows
        } else {
            None
        }
    }

    /// Stops the parse in flight, if any. Its caller still gets a result
    /// built from the rows read so far.
    pub fn cancel(&self) {
        lock(&self.in_flight).cancel();
    }

    /// Claims the session and installs a fresh token for the new parse.
    ///
    /// Both happen under the `in_flight` lock, which `cancel` also takes: a
    /// cancel either lands before the session turns busy or reaches the new
    /// token.
    fn start(&self) -> FeedResult<(tokio::sync::MutexGuard<'_, Tracked>, CancellationToken)> {
        let mut in_flight = lock(&self.in_flight);
        let tracked = self.tracked.try_lock().map_err(|_| FeedError::Busy)?;
        let token = CancellationToken::new();
        *in_flight = token.clone();
        Ok((tracked, token))
    }

    fn selection(&self) -> FeedResult<Selection> {
        lock(&self.selected).clone().ok_or(FeedError::NoFileSelected)
    }

    fn meta_for(&self, path: &Path) -> SourceMeta {
        SourceMeta::for_path(path).with_charset(self.charset)
    }

    /// Preview one page of the selected file.
    ///
    /// The first preview of a newly selected file reads it to the end to count
    /// its rows; later pages of the same file stop as soon as the window is
    /// filled and report the remembered count.
    pub async fn read_window(&self, window: PageWindow) -> FeedResult<WindowPage> {
        let selection = self.selection()?;
        let (mut tracked, cancel) = self.start()?;

        let is_new_file =
            tracked.generation != Some(selection.generation) || tracked.total_rows.is_none();
        if is_new_file {
            tracked.generation = Some(selection.generation);
            tracked.total_rows = None;
        }
        let scan = if is_new_file {
            RowScan::Full
        } else {
            RowScan::Window
        };

        let reader = reader_from_path(&selection.path, &self.meta_for(&selection.path)).await?;
        let mut page = read_window(reader, window, scan, &cancel).await?;

        match page.total_rows {
            Some(total) => tracked.total_rows = Some(total),
            None => page.total_rows = tracked.total_rows,
        }
        info!(
            "preview {} page {}: {} rows shown, {:?} total ({:?} scan)",
            selection.path.display(),
            window.page(),
            page.rows.len(),
            page.total_rows,
            scan
        );
        Ok(page)
    }

    /// Converts the whole selected file into feed documents.
    pub async fn write_batches(&self, batch_size: usize) -> FeedResult<Vec<OutputFile>> {
        let selection = self.selection()?;
        let (_guard, cancel) = self.start()?;

        let reader = reader_from_path(&selection.path, &self.meta_for(&selection.path)).await?;
        write_batches(reader, &self.mapping, batch_size, &cancel).await
    }
}
