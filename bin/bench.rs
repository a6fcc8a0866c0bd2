use clap::{Arg, Command};
use csv_blogger_feed::{
    read_window, reader_from_path, write_batches, CancellationToken, FieldMapping, PageWindow,
    RowScan, SourceMeta,
};
use std::path::PathBuf;
use std::time::Instant;

fn report(label: &str, rows: usize, started: Instant) {
    let elapsed = started.elapsed().as_secs_f64();
    let rps = rows as f64 / elapsed.max(f64::EPSILON);
    println!("{label:<14} rows={rows} elapsed={elapsed:.3}s rows/sec={rps:.0}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = Command::new("bench")
        .arg(Arg::new("path").long("path").required(true).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("page").long("page").help("Page used for the early-abort run").default_value("1").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("per-page").long("per-page").default_value("10").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("batch-size").long("batch-size").default_value("50").value_parser(clap::value_parser!(usize)))
        .get_matches();

    let path = matches.get_one::<PathBuf>("path").unwrap();
    let page = *matches.get_one::<usize>("page").unwrap();
    let per_page = *matches.get_one::<usize>("per-page").unwrap();
    let batch_size = *matches.get_one::<usize>("batch-size").unwrap();
    let window = PageWindow::new(page, per_page)?;
    let meta = SourceMeta::for_path(path);
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let reader = reader_from_path(path, &meta).await?;
    let full = read_window(reader, window, RowScan::Full, &cancel).await?;
    report("window/full", full.rows_scanned, started);

    let started = Instant::now();
    let reader = reader_from_path(path, &meta).await?;
    let early = read_window(reader, window, RowScan::Window, &cancel).await?;
    report("window/early", early.rows_scanned, started);

    let started = Instant::now();
    let reader = reader_from_path(path, &meta).await?;
    let files = write_batches(reader, &FieldMapping::default(), batch_size, &cancel).await?;
    let posts = files.iter().map(|f| f.post_count()).sum();
    let bytes: usize = files.iter().map(|f| f.content().len()).sum();
    report("export", posts, started);

    println!(
        "source={} rows={:?} files={} xml_bytes={}",
        path.display(),
        full.total_rows,
        files.len(),
        bytes
    );
    Ok(())
}
