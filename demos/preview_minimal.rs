use csv_blogger_feed::{
    read_window, reader_from_path, write_all, write_batches, CancellationToken, FieldMapping,
    PageWindow, RowScan, SourceMeta,
};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = Path::new("./data/posts.csv");
    let meta = SourceMeta::for_path(path);
    let cancel = CancellationToken::new();

    let reader = reader_from_path(path, &meta).await?;
    let page = read_window(reader, PageWindow::new(1, 5)?, RowScan::Full, &cancel).await?;
    println!("{}", page.header.join(" | "));
    for row in &page.rows {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", cells.join(" | "));
    }
    println!("{:?} rows, {:?} pages", page.total_rows, page.total_pages());

    let reader = reader_from_path(path, &meta).await?;
    let files = write_batches(reader, &FieldMapping::default(), 50, &cancel).await?;
    for (file, written) in files.iter().zip(write_all(Path::new("."), &files).await?) {
        println!("{} ({} posts) ({})", written.display(), file.post_count(), file.size_label());
    }
    Ok(())
}
