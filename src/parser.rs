use crate::FeedResult;
use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord};
use log::debug;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// One CSV record, fields in column order. No type coercion.
pub type ParsedRow = Vec<String>;

/// Pull-based streaming CSV parser shared by the preview and export
/// pipelines.
///
/// Every non-blank record is dispatched in file order, the header included.
/// The token is checked before each read and raced against reads that wait on
/// input: once it is cancelled no further rows come out and
/// [`RowParser::next_row`] reports end of input.
pub struct RowParser<R> {
    rdr: AsyncReader<R>,
    record: StringRecord,
    cancel: CancellationToken,
    dispatched: usize,
    skipped: usize,
    finished: bool,
}

impl<R> RowParser<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R, cancel: CancellationToken) -> Self {
        let rdr = AsyncReaderBuilder::new()
            .has_headers(false)
            // ragged rows are handed through as-is
            .flexible(true)
            .buffer_capacity(1 << 16)
            .create_reader(reader);
        Self {
            rdr,
            record: StringRecord::new(),
            cancel,
            dispatched: 0,
            skipped: 0,
            finished: false,
        }
    }

    /// Next non-blank record, or `None` at end of input or after abort.
    pub async fn next_row(&mut self) -> FeedResult<Option<ParsedRow>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.cancel.is_cancelled() {
                self.finished = true;
                debug!("parse aborted after {} rows", self.dispatched);
                return Ok(None);
            }
            let more = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                read = self.rdr.read_record(&mut self.record) => Some(read?),
            };
            let Some(more) = more else {
                // input stalled and the token fired meanwhile
                continue;
            };
            if !more {
                self.finished = true;
                debug!(
                    "parse complete: {} rows, {} blank skipped",
                    self.dispatched, self.skipped
                );
                return Ok(None);
            }
            if is_blank(&self.record) {
                self.skipped += 1;
                continue;
            }

            let mut row: ParsedRow = self.record.iter().map(str::to_owned).collect();
            if self.dispatched == 0 {
                if let Some(first) = row.first_mut() {
                    if let Some(rest) = first.strip_prefix('\u{feff}') {
                        *first = rest.to_owned();
                    }
                }
            }
            self.dispatched += 1;
            return Ok(Some(row));
        }
    }

    /// Rows handed out so far, header included.
    pub fn rows_dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the parse; the next call to `next_row` returns `None`.
    pub fn abort(&self) {
        self.cancel.cancel();
    }
}

/// Zero fields, or a single empty one: a blank-line artifact, not data.
fn is_blank(record: &StringRecord) -> bool {
    match record.len() {
        0 => true,
        1 => record.get(0).is_some_and(str::is_empty),
        _ => false,
    }
}
