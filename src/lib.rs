//! Streams a CSV export of blog posts into paged previews and batched
//! Blogger/Atom XML feed files.
//!
//! - Preview: [`read_window`] materializes one page of rows, cutting every
//!   cell to [`CELL_CAP`] characters.
//! - Export: [`write_batches`] turns every data row into a feed entry and
//!   emits one [`OutputFile`] per `batch_size` posts.
//! - [`Session`] ties both to a selected file, caches its row count, and
//!   refuses overlapping requests.
//!
//! Input may be gzip/zstd compressed or in a non-UTF-8 charset; see
//! [`SourceMeta`].
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod codec;
mod feed;
mod io;
mod parser;
mod post;
mod session;
mod size;
mod window;

pub use crate::feed::{planned_file_count, write_all, write_batches, OutputFile, XmlBatch};
pub use crate::io::{build_csv_reader, reader_from_path, Compression, CsvSource, SourceMeta};
pub use crate::parser::{ParsedRow, RowParser};
pub use crate::post::{FieldMapping, HeaderLookup, Post, PostField};
pub use crate::session::Session;
pub use crate::size::format_size;
pub use crate::window::{
    read_window, total_pages, DisplayCell, PageWindow, RowScan, WindowPage, CELL_CAP,
};

/// Re-exported so callers can build the tokens the pipelines accept.
pub use tokio_util::sync::CancellationToken;

use thiserror::Error;

/// Error type returned by this crate when not using `anyhow`.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("a parse is already in progress")]
    Busy,
    #[error("invalid page window: page={page}, per_page={per_page} (both must be >= 1)")]
    InvalidWindow { page: usize, per_page: usize },
    #[error("unknown post field: {0} (expected published, updated, title, content or categories)")]
    UnknownField(String),
    #[error("invalid field mapping {0:?}: expected field=Header")]
    InvalidMapping(String),
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
    #[error("xml: {0}")]
    Xml(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
