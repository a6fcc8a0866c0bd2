//! Blogger/Atom export documents, one per batch of posts.
//!
//! Every value that ends up in the markup (dates, titles, bodies, tags) goes
//! through `quick_xml` escaping, either as element text or as an attribute.

use crate::parser::RowParser;
use crate::post::{FieldMapping, HeaderLookup, Post};
use crate::size::format_size;
use crate::{FeedError, FeedResult};
use log::{debug, info};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

const STYLESHEET_PI: &str =
    r#"xml-stylesheet href="https://www.blogger.com/styles/atom.css" type="text/css""#;

const FEED_NAMESPACES: [(&str, &str); 6] = [
    ("xmlns", "http://www.w3.org/2005/Atom"),
    ("xmlns:openSearch", "http://a9.com/-/spec/opensearchrss/1.0/"),
    ("xmlns:gd", "http://schemas.google.com/g/2005"),
    ("xmlns:georss", "http://www.georss.org/georss"),
    ("xmlns:thr", "http://purl.org/syndication/thread/1.0"),
    ("xmlns:blogger", "http://schemas.google.com/blogger/2008"),
];

const FEED_UPDATED: &str = "2021-11-05T18:00:07.900-07:00";
const FEED_TITLE: &str = "Imported posts";
const FEED_SUBTITLE: &str = "Posts imported from a CSV export.";

const ENTRY_ID: &str = "tag:blogger.com,1999:blog-1.post-1";
const KIND_SCHEME: &str = "http://schemas.google.com/g/2005#kind";
const KIND_POST: &str = "http://schemas.google.com/blogger/2008/kind#post";
const TAG_SCHEME: &str = "http://www.blogger.com/atom/ns#";

const AUTHOR_NAME: &str = "admin";
const AUTHOR_EMAIL: &str = "noreply@blogger.com";
const AUTHOR_IMAGE: [(&str, &str); 4] = [
    ("rel", "http://schemas.google.com/g/2005#thumbnail"),
    ("width", "35"),
    ("height", "35"),
    ("src", "//www.blogger.com/img/blogger_logo_round_35.png"),
];
const THUMBNAIL: [(&str, &str); 4] = [
    ("xmlns:media", "http://search.yahoo.com/mrss/"),
    ("url", "https://www.blogger.com/img/blogger_logo_round_35.png"),
    ("height", "72"),
    ("width", "72"),
];

fn xml_err(err: impl fmt::Display) -> FeedError {
    FeedError::Xml(err.to_string())
}

// One element per line, no nesting indent: entry fragments are rendered on
// their own and spliced into the document, so both must agree on layout.
fn new_writer(buf: Vec<u8>) -> Writer<Vec<u8>> {
    Writer::new_with_indent(buf, b' ', 0)
}

fn text_element<W: Write>(
    w: &mut Writer<W>,
    name: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> FeedResult<()> {
    let start = BytesStart::new(name).with_attributes(attrs.iter().copied());
    w.write_event(Event::Start(start)).map_err(xml_err)?;
    w.write_event(Event::Text(BytesText::from_escaped(escape(text))))
        .map_err(xml_err)?;
    w.write_event(Event::End(BytesEnd::new(name))).map_err(xml_err)?;
    Ok(())
}

fn empty_element<W: Write>(w: &mut Writer<W>, name: &str, attrs: &[(&str, &str)]) -> FeedResult<()> {
    let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
    w.write_event(Event::Empty(elem)).map_err(xml_err)
}

fn render_entry(post: &Post) -> FeedResult<Vec<u8>> {
    let mut w = new_writer(Vec::with_capacity(1024 + post.content.len()));
    w.write_event(Event::Start(BytesStart::new("entry")))
        .map_err(xml_err)?;
    text_element(&mut w, "id", &[], ENTRY_ID)?;
    empty_element(&mut w, "category", &[("scheme", KIND_SCHEME), ("term", KIND_POST)])?;
    if let Some(published) = &post.published {
        text_element(&mut w, "published", &[], published)?;
    }
    if let Some(updated) = &post.updated {
        text_element(&mut w, "updated", &[], updated)?;
    }
    for tag in &post.categories {
        empty_element(&mut w, "category", &[("scheme", TAG_SCHEME), ("term", tag.as_str())])?;
    }
    text_element(&mut w, "title", &[("type", "text")], &post.title)?;
    text_element(&mut w, "content", &[("type", "html")], &post.content)?;

    w.write_event(Event::Start(BytesStart::new("author")))
        .map_err(xml_err)?;
    text_element(&mut w, "name", &[], AUTHOR_NAME)?;
    text_element(&mut w, "email", &[], AUTHOR_EMAIL)?;
    empty_element(&mut w, "gd:image", &AUTHOR_IMAGE)?;
    w.write_event(Event::End(BytesEnd::new("author")))
        .map_err(xml_err)?;

    empty_element(&mut w, "media:thumbnail", &THUMBNAIL)?;
    w.write_event(Event::End(BytesEnd::new("entry")))
        .map_err(xml_err)?;
    Ok(w.into_inner())
}

/// Posts collected for the next output document.
#[derive(Debug, Default)]
pub struct XmlBatch {
    categories: BTreeSet<String>,
    post_count: usize,
    content: Vec<u8>,
}

impl XmlBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the post's entry and records its tags.
    pub fn add_post(&mut self, post: &Post) -> FeedResult<()> {
        let entry = render_entry(post)?;
        self.content.push(b'\n');
        self.content.extend_from_slice(&entry);
        self.categories.extend(post.categories.iter().cloned());
        self.post_count += 1;
        Ok(())
    }

    pub fn post_count(&self) -> usize {
        self.post_count
    }

    pub fn is_empty(&self) -> bool {
        self.post_count == 0
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    /// Wraps the collected entries in a complete feed document.
    pub fn seal(self, sequence: usize) -> FeedResult<OutputFile> {
        let mut w = new_writer(Vec::with_capacity(self.content.len() + 4096));
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        w.write_event(Event::PI(BytesPI::new(STYLESHEET_PI)))
            .map_err(xml_err)?;
        let feed = BytesStart::new("feed").with_attributes(FEED_NAMESPACES);
        w.write_event(Event::Start(feed)).map_err(xml_err)?;

        let count = self.post_count.to_string();
        text_element(&mut w, "updated", &[], FEED_UPDATED)?;
        text_element(&mut w, "title", &[("type", "text")], FEED_TITLE)?;
        text_element(&mut w, "subtitle", &[("type", "html")], FEED_SUBTITLE)?;
        text_element(
            &mut w,
            "generator",
            &[("version", "7.00"), ("uri", "https://www.blogger.com")],
            "Blogger",
        )?;
        text_element(&mut w, "openSearch:totalResults", &[], &count)?;
        text_element(&mut w, "openSearch:startIndex", &[], "1")?;
        text_element(&mut w, "openSearch:itemsPerPage", &[], &count)?;

        for tag in &self.categories {
            empty_element(&mut w, "category", &[("term", tag.as_str())])?;
        }
        w.get_mut().extend_from_slice(&self.content);
        w.write_event(Event::End(BytesEnd::new("feed")))
            .map_err(xml_err)?;

        let content = w.into_inner();
        let file = OutputFile {
            name: OutputFile::name_for(sequence),
            size_label: format_size(content.len() as u64),
            post_count: self.post_count,
            content,
        };
        debug!(
            "sealed {}: {} posts, {} categories, {}",
            file.name,
            file.post_count,
            self.categories.len(),
            file.size_label
        );
        Ok(file)
    }
}

/// A finished feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    name: String,
    size_label: String,
    post_count: usize,
    content: Vec<u8>,
}

impl OutputFile {
    /// `file-01.xml`, `file-02.xml`, ...
    pub fn name_for(sequence: usize) -> String {
        format!("file-{sequence:02}.xml")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_label(&self) -> &str {
        &self.size_label
    }

    pub fn post_count(&self) -> usize {
        self.post_count
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub async fn write_to_dir(&self, dir: &Path) -> FeedResult<PathBuf> {
        let path = dir.join(&self.name);
        tokio::fs::write(&path, &self.content).await?;
        Ok(path)
    }
}

/// Stores every file under `dir`, creating it if needed.
pub async fn write_all(dir: &Path, files: &[OutputFile]) -> FeedResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        paths.push(file.write_to_dir(dir).await?);
    }
    Ok(paths)
}

/// How many documents [`write_batches`] will produce for `total_rows` posts.
pub fn planned_file_count(total_rows: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    total_rows.div_ceil(batch_size)
}

/// Converts every data row into a feed entry, sealing a document each time
/// `batch_size` posts have been collected and once more at end of input.
///
/// Cancelling `cancel` stops reading; posts already collected are still
/// sealed into a final document.
pub async fn write_batches<R>(
    reader: R,
    mapping: &FieldMapping,
    batch_size: usize,
    cancel: &CancellationToken,
) -> FeedResult<Vec<OutputFile>>
where
    R: AsyncRead + Unpin + Send,
{
    if batch_size == 0 {
        return Err(FeedError::InvalidBatchSize);
    }
    let mut parser = RowParser::new(reader, cancel.child_token());
    let Some(header) = parser.next_row().await? else {
        return Ok(Vec::new());
    };
    let lookup = HeaderLookup::new(&header, mapping);
    if lookup.unmapped_columns() > 0 {
        debug!(
            "{} of {} columns not mapped to a post field",
            lookup.unmapped_columns(),
            header.len()
        );
    }

    let mut files = Vec::new();
    let mut batch = XmlBatch::new();
    let mut posts = 0usize;
    while let Some(row) = parser.next_row().await? {
        batch.add_post(&Post::from_row(&lookup, &row))?;
        posts += 1;
        if batch.post_count() >= batch_size {
            let full = std::mem::take(&mut batch);
            files.push(full.seal(files.len() + 1)?);
        }
    }
    if !batch.is_empty() {
        files.push(batch.seal(files.len() + 1)?);
    }

    info!(
        "exported {} posts into {} files{}",
        posts,
        files.len(),
        if parser.is_aborted() { " (aborted)" } else { "" }
    );
    Ok(files)
}
