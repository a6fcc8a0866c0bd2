mod common;

use async_compression::tokio::write::GzipEncoder;
use common::{cancel_then_send, posts_csv, HEADER};
use csv_blogger_feed::{
    build_csv_reader, read_window, reader_from_path, CancellationToken, PageWindow, RowScan,
    SourceMeta, WindowPage, CELL_CAP,
};
use tokio::io::AsyncWriteExt;

async fn window_of(csv: &str, page: usize, per_page: usize, scan: RowScan) -> WindowPage {
    let window = PageWindow::new(page, per_page).unwrap();
    read_window(csv.as_bytes(), window, scan, &CancellationToken::new())
        .await
        .unwrap()
}

fn titles(page: &WindowPage) -> Vec<String> {
    page.rows.iter().map(|row| row[1].value.clone()).collect()
}

#[tokio::test]
async fn three_rows_two_per_page() {
    let csv = "Date,Title,Content,Categories\n\
               2021-01-01,First,a,x\n\
               2021-01-02,Second,b,y\n\
               2021-01-03,Third,c,z\n";

    let first = window_of(csv, 1, 2, RowScan::Full).await;
    assert_eq!(first.header, vec!["Date", "Title", "Content", "Categories"]);
    assert_eq!(titles(&first), vec!["First", "Second"]);
    assert_eq!(first.total_rows, Some(3));
    assert_eq!(first.total_pages(), Some(2));

    let second = window_of(csv, 2, 2, RowScan::Full).await;
    assert_eq!(second.header, first.header);
    assert_eq!(titles(&second), vec!["Third"]);
}

#[tokio::test]
async fn window_size_matches_formula_on_every_page() {
    let total = 23;
    let csv = posts_csv(total);
    for per_page in [1, 5, 10, 23, 30] {
        for page in 1..=6 {
            let result = window_of(&csv, page, per_page, RowScan::Full).await;
            let expected = per_page.min(total.saturating_sub(per_page * (page - 1)));
            assert_eq!(result.rows.len(), expected, "page={page} per_page={per_page}");
            assert_eq!(result.total_rows, Some(total));

            let first = per_page * (page - 1) + 1;
            let want: Vec<String> = (first..first + expected).map(|i| format!("Post {i}")).collect();
            assert_eq!(titles(&result), want);
        }
    }
}

#[tokio::test]
async fn window_scan_stops_once_filled() {
    let csv = posts_csv(100);
    let result = window_of(&csv, 2, 10, RowScan::Window).await;
    assert_eq!(result.rows.len(), 10);
    assert_eq!(result.rows_scanned, 20);
    assert_eq!(result.total_rows, None);

    let full = window_of(&csv, 2, 10, RowScan::Full).await;
    assert_eq!(full.rows, result.rows);
    assert_eq!(full.rows_scanned, 100);
}

#[tokio::test]
async fn window_scan_reaching_the_end_knows_the_total() {
    let csv = posts_csv(7);
    let result = window_of(&csv, 2, 5, RowScan::Window).await;
    assert_eq!(titles(&result), vec!["Post 6", "Post 7"]);
    assert_eq!(result.total_rows, Some(7));
}

#[tokio::test]
async fn window_past_the_end_is_empty() {
    let result = window_of(&posts_csv(4), 3, 5, RowScan::Full).await;
    assert!(result.rows.is_empty());
    assert_eq!(result.total_rows, Some(4));
}

#[tokio::test]
async fn empty_and_header_only_files() {
    let empty = window_of("", 1, 10, RowScan::Full).await;
    assert!(empty.header.is_empty());
    assert!(empty.rows.is_empty());
    assert_eq!(empty.total_rows, Some(0));

    let header_only = window_of(&format!("{HEADER}\n"), 1, 10, RowScan::Full).await;
    assert_eq!(header_only.header.len(), 4);
    assert!(header_only.rows.is_empty());
    assert_eq!(header_only.total_rows, Some(0));
}

#[tokio::test]
async fn blank_lines_are_not_rows() {
    let csv = "Title\n\nfirst\n\"\"\n\nsecond\n";
    let result = window_of(csv, 1, 10, RowScan::Full).await;
    let values: Vec<&str> = result.rows.iter().map(|r| r[0].value.as_str()).collect();
    assert_eq!(values, vec!["first", "second"]);
    assert_eq!(result.total_rows, Some(2));
}

#[tokio::test]
async fn ragged_rows_are_shown_as_parsed() {
    let csv = "A,B,C\n1\n1,2,3,4\n";
    let result = window_of(csv, 1, 10, RowScan::Full).await;
    assert_eq!(result.rows[0].len(), 1);
    assert_eq!(result.rows[1].len(), 4);
}

#[tokio::test]
async fn oversized_cells_are_cut_and_annotated() {
    let long = "x".repeat(CELL_CAP + 5000);
    let csv = format!("Title,Content\nshort,\"{long}\"\n");
    let result = window_of(&csv, 1, 1, RowScan::Full).await;
    let row = &result.rows[0];

    assert_eq!(row[0].value, "short");
    assert!(row[0].more.is_empty());
    assert_eq!(row[1].value.len(), CELL_CAP);
    // 5000 / 1024 = 4.8828125
    assert_eq!(row[1].more, " (4.88 kb more)");
    assert!(row.iter().all(|cell| cell.value.chars().count() <= CELL_CAP));
}

#[tokio::test]
async fn cancelled_before_start_returns_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = read_window(
        posts_csv(5).as_bytes(),
        PageWindow::default(),
        RowScan::Full,
        &cancel,
    )
    .await
    .unwrap();
    assert!(result.header.is_empty());
    assert!(result.rows.is_empty());
    assert_eq!(result.total_rows, None);
}

#[tokio::test]
async fn reads_gzip_files_from_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("posts.csv.gz");

    let mut encoder = GzipEncoder::new(Vec::new());
    encoder.write_all(posts_csv(1_000).as_bytes()).await?;
    encoder.shutdown().await?;
    std::fs::write(&path, encoder.into_inner())?;

    let reader = reader_from_path(&path, &SourceMeta::for_path(&path)).await?;
    let window = PageWindow::new(100, 10)?;
    let result = read_window(reader, window, RowScan::Full, &CancellationToken::new()).await?;

    assert_eq!(result.total_rows, Some(1_000));
    assert_eq!(result.rows[9][1].value, "Post 1000");
    Ok(())
}

#[tokio::test]
async fn transcodes_legacy_charsets() -> anyhow::Result<()> {
    let latin1 = b"Title\ncaf\xe9\nna\xefve\n".to_vec();

    let meta = SourceMeta::default().with_charset(encoding_rs::WINDOWS_1252);
    let reader = build_csv_reader(std::io::Cursor::new(latin1), &meta);
    let result = read_window(reader, PageWindow::default(), RowScan::Full, &CancellationToken::new()).await?;

    let values: Vec<&str> = result.rows.iter().map(|r| r[0].value.as_str()).collect();
    assert_eq!(values, vec!["café", "naïve"]);
    Ok(())
}

#[tokio::test]
async fn cancel_mid_stream_returns_buffered_rows_without_total() {
    let (mut tx, rx) = tokio::io::duplex(1 << 16);
    tx.write_all(posts_csv(3).as_bytes()).await.unwrap();
    let cancel = CancellationToken::new();

    let (result, ()) = tokio::join!(
        read_window(rx, PageWindow::default(), RowScan::Full, &cancel),
        cancel_then_send(tx, cancel.clone(), "2021-02-01,Late,x,y\n"),
    );
    let page = result.unwrap();

    assert_eq!(page.header, HEADER.split(',').collect::<Vec<_>>());
    assert_eq!(titles(&page), vec!["Post 1", "Post 2", "Post 3"]);
    assert_eq!(page.rows_scanned, 3);
    assert_eq!(page.total_rows, None);
    assert_eq!(page.total_pages(), None);
}

#[tokio::test]
async fn cancel_mid_stream_inside_a_later_window() {
    let (mut tx, rx) = tokio::io::duplex(1 << 16);
    tx.write_all(posts_csv(5).as_bytes()).await.unwrap();
    let cancel = CancellationToken::new();

    let window = PageWindow::new(2, 4).unwrap();
    let (result, ()) = tokio::join!(
        read_window(rx, window, RowScan::Window, &cancel),
        cancel_then_send(tx, cancel.clone(), "2021-02-01,Late,x,y\n"),
    );
    let page = result.unwrap();

    assert_eq!(titles(&page), vec!["Post 5"]);
    assert_eq!(page.total_rows, None);
}
