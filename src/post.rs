use crate::{FeedError, FeedResult};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// A feed entry field a CSV column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PostField {
    Published,
    Updated,
    Title,
    Content,
    Categories,
}

impl PostField {
    pub const ALL: [PostField; 5] = [
        PostField::Published,
        PostField::Updated,
        PostField::Title,
        PostField::Content,
        PostField::Categories,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PostField::Published => "published",
            PostField::Updated => "updated",
            PostField::Title => "title",
            PostField::Content => "content",
            PostField::Categories => "categories",
        }
    }
}

impl fmt::Display for PostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PostField {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PostField::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FeedError::UnknownField(s.to_string()))
    }
}

/// Which CSV header name feeds each post field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    headers: BTreeMap<PostField, String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        let headers = [
            (PostField::Published, "Date"),
            (PostField::Updated, "Updated"),
            (PostField::Title, "Title"),
            (PostField::Content, "Content"),
            (PostField::Categories, "Categories"),
        ]
        .into_iter()
        .map(|(field, header)| (field, header.to_string()))
        .collect();
        Self { headers }
    }
}

impl FieldMapping {
    pub fn with(mut self, field: PostField, header: impl Into<String>) -> Self {
        self.set(field, header);
        self
    }

    pub fn set(&mut self, field: PostField, header: impl Into<String>) {
        self.headers.insert(field, header.into());
    }

    pub fn header_for(&self, field: PostField) -> Option<&str> {
        self.headers.get(&field).map(String::as_str)
    }

    /// Applies a `field=Header` override, as given on the command line.
    pub fn apply_override(&mut self, spec: &str) -> FeedResult<()> {
        let (field, header) = spec
            .split_once('=')
            .filter(|(_, header)| !header.trim().is_empty())
            .ok_or_else(|| FeedError::InvalidMapping(spec.to_string()))?;
        self.set(field.parse()?, header.trim());
        Ok(())
    }
}

/// Column index -> post field, resolved once per file from its header row.
#[derive(Debug, Clone)]
pub struct HeaderLookup {
    columns: Vec<Option<PostField>>,
}

impl HeaderLookup {
    /// Header names match case-insensitively; unknown columns resolve to `None`.
    pub fn new(header: &[String], mapping: &FieldMapping) -> Self {
        let by_name: HashMap<String, PostField> = mapping
            .headers
            .iter()
            .map(|(field, name)| (name.to_lowercase(), *field))
            .collect();
        let columns = header
            .iter()
            .map(|name| by_name.get(&name.to_lowercase()).copied())
            .collect();
        Self { columns }
    }

    pub fn field_at(&self, column: usize) -> Option<PostField> {
        self.columns.get(column).copied().flatten()
    }

    pub fn unmapped_columns(&self) -> usize {
        self.columns.iter().filter(|c| c.is_none()).count()
    }
}

/// One blog post built from a CSV data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Post {
    pub published: Option<String>,
    pub updated: Option<String>,
    pub title: String,
    pub content: String,
    /// Trimmed, non-empty, first occurrence order.
    pub categories: Vec<String>,
}

impl Post {
    /// Zips the row against the header lookup. Missing cells leave their
    /// field unset; cells beyond the header are ignored. When two columns
    /// feed the same field the later one wins.
    pub fn from_row(lookup: &HeaderLookup, row: &[String]) -> Self {
        let mut post = Post::default();
        for (column, value) in row.iter().enumerate() {
            let Some(field) = lookup.field_at(column) else {
                continue;
            };
            match field {
                PostField::Published => post.published = non_empty(value),
                PostField::Updated => post.updated = non_empty(value),
                PostField::Title => post.title = value.clone(),
                PostField::Content => post.content = value.clone(),
                PostField::Categories => post.categories = split_tags(value),
            }
        }
        post
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// `"a, b,,a "` -> `["a", "b"]`
pub(crate) fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_match_ignores_case() {
        let lookup = HeaderLookup::new(
            &strings(&["DATE", "title", "Body", "categories"]),
            &FieldMapping::default(),
        );
        assert_eq!(lookup.field_at(0), Some(PostField::Published));
        assert_eq!(lookup.field_at(1), Some(PostField::Title));
        assert_eq!(lookup.field_at(2), None);
        assert_eq!(lookup.field_at(3), Some(PostField::Categories));
        assert_eq!(lookup.field_at(9), None);
        assert_eq!(lookup.unmapped_columns(), 1);
    }

    #[test]
    fn builds_post_from_row() {
        let lookup = HeaderLookup::new(
            &strings(&["Date", "Title", "Content", "Categories", "Extra"]),
            &FieldMapping::default(),
        );
        let post = Post::from_row(
            &lookup,
            &strings(&["2021-01-01", "Hi", "<p>x</p>", " news, ,sport,news ", "ignored"]),
        );
        assert_eq!(post.published.as_deref(), Some("2021-01-01"));
        assert_eq!(post.updated, None);
        assert_eq!(post.title, "Hi");
        assert_eq!(post.content, "<p>x</p>");
        assert_eq!(post.categories, strings(&["news", "sport"]));
    }

    #[test]
    fn short_row_leaves_fields_unset() {
        let lookup = HeaderLookup::new(
            &strings(&["Title", "Content", "Categories"]),
            &FieldMapping::default(),
        );
        let post = Post::from_row(&lookup, &strings(&["only title"]));
        assert_eq!(post.title, "only title");
        assert!(post.content.is_empty());
        assert!(post.categories.is_empty());
    }

    #[test]
    fn empty_date_is_absent() {
        let lookup = HeaderLookup::new(&strings(&["Date", "Title"]), &FieldMapping::default());
        let post = Post::from_row(&lookup, &strings(&["", "t"]));
        assert_eq!(post.published, None);
    }

    #[test]
    fn overrides() {
        let mut mapping = FieldMapping::default();
        mapping.apply_override("content=Body").unwrap();
        mapping.apply_override("TITLE = Headline").unwrap();
        assert_eq!(mapping.header_for(PostField::Content), Some("Body"));
        assert_eq!(mapping.header_for(PostField::Title), Some("Headline"));

        assert!(matches!(
            mapping.apply_override("author=Name"),
            Err(FeedError::UnknownField(_))
        ));
        assert!(matches!(
            mapping.apply_override("content"),
            Err(FeedError::InvalidMapping(_))
        ));
    }
}
