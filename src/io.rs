use crate::codec::Utf8Transcoder;
use crate::FeedResult;
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use log::debug;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

/// Boxed byte source handed to the CSV parser.
pub type CsvSource = Box<dyn AsyncRead + Unpin + Send>;

/// Wire compression applied to an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Picks the compression from (in order) the content encoding, the
    /// content type, and the file name suffix.
    pub fn detect(meta: &SourceMeta) -> Self {
        let encoding = meta.content_encoding.to_ascii_lowercase();
        let content_type = meta.content_type.to_ascii_lowercase();
        let has = |name: &str| encoding.split(',').any(|s| s.trim() == name);

        if has("gzip")
            || matches!(content_type.as_str(), "application/gzip" | "application/x-gzip")
            || meta.name_hint.ends_with(".gz")
        {
            Compression::Gzip
        } else if has("zstd")
            || content_type == "application/zstd"
            || meta.name_hint.ends_with(".zst")
        {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

/// What is known about an input before parsing it.
#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// e.g. "text/csv" or "application/gzip"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// file name, used as the last resort for compression detection
    pub name_hint: String,
    /// charset of the CSV text; anything but UTF-8 is transcoded
    pub charset: &'static encoding_rs::Encoding,
}

impl Default for SourceMeta {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_encoding: String::new(),
            name_hint: String::new(),
            charset: encoding_rs::UTF_8,
        }
    }
}

impl SourceMeta {
    /// Metadata derived from a file name only.
    pub fn for_path(path: &Path) -> Self {
        let name_hint = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let (content_type, content_encoding) = match ext {
            "gz" => ("application/gzip", "gzip"),
            "zst" => ("application/zstd", "zstd"),
            _ => ("text/csv", ""),
        };
        Self {
            content_type: content_type.into(),
            content_encoding: content_encoding.into(),
            name_hint,
            ..Default::default()
        }
    }

    pub fn with_charset(mut self, charset: &'static encoding_rs::Encoding) -> Self {
        self.charset = charset;
        self
    }
}

/// Wraps a raw byte stream with decompression and UTF-8 transcoding as
/// described by `meta`.
pub fn build_csv_reader<R>(raw: R, meta: &SourceMeta) -> CsvSource
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let compression = Compression::detect(meta);
    debug!(
        "opening {:?}: compression={:?} charset={}",
        meta.name_hint,
        compression,
        meta.charset.name()
    );

    let buf = BufReader::with_capacity(1 << 16, raw);
    let decompressed: CsvSource = match compression {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    };

    if meta.charset == encoding_rs::UTF_8 {
        decompressed
    } else {
        let framed = FramedRead::new(decompressed, Utf8Transcoder::new(meta.charset));
        Box::new(StreamReader::new(framed))
    }
}

/// Opens a local file and wraps it as described by `meta`, usually built
/// with [`SourceMeta::for_path`].
pub async fn reader_from_path(path: &Path, meta: &SourceMeta) -> FeedResult<CsvSource> {
    let file = File::open(path).await?;
    Ok(build_csv_reader(file, meta))
}
