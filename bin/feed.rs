use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use csv_blogger_feed::{
    planned_file_count, write_all, FieldMapping, PageWindow, Session,
};
use std::path::PathBuf;
use std::time::Instant;

fn source_arg() -> Arg {
    Arg::new("path")
        .help("CSV file of posts (.csv, .csv.gz or .csv.zst)")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
}

fn charset_arg() -> Arg {
    Arg::new("charset")
        .long("charset")
        .help("Input charset label, e.g. windows-1252")
        .default_value("utf-8")
}

fn map_arg() -> Arg {
    Arg::new("map")
        .long("map")
        .help("Override a column mapping, e.g. --map content=Body")
        .action(ArgAction::Append)
}

fn session_from(matches: &ArgMatches) -> anyhow::Result<Session> {
    let mut mapping = FieldMapping::default();
    if let Some(overrides) = matches.get_many::<String>("map") {
        for spec in overrides {
            mapping.apply_override(spec)?;
        }
    }
    let label = matches
        .get_one::<String>("charset")
        .map(String::as_str)
        .unwrap_or("utf-8");
    let charset = encoding_rs::Encoding::for_label(label.as_bytes())
        .with_context(|| format!("unknown charset {label:?}"))?;

    let session = Session::new(mapping).with_charset(charset);
    if let Some(path) = matches.get_one::<PathBuf>("path") {
        session.select_file(path.clone());
    }
    Ok(session)
}

async fn preview(matches: &ArgMatches) -> anyhow::Result<()> {
    let session = session_from(matches)?;
    let page = *matches.get_one::<usize>("page").unwrap_or(&1);
    let per_page = *matches.get_one::<usize>("per-page").unwrap_or(&10);
    let window = PageWindow::new(page, per_page)?;

    let start = Instant::now();
    let result = session.read_window(window).await?;

    println!("{}", result.header.join(" | "));
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", cells.join(" | "));
    }
    let total = result.total_rows.unwrap_or(result.rows_scanned);
    println!(
        "page {} of {}  rows={}  elapsed={:.1}s",
        window.page(),
        result.total_pages().unwrap_or(0),
        total,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

async fn export(matches: &ArgMatches) -> anyhow::Result<()> {
    let session = session_from(matches)?;
    let batch_size = *matches.get_one::<usize>("batch-size").unwrap_or(&50);
    let out = matches
        .get_one::<PathBuf>("out")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));

    let start = Instant::now();
    let files = session.write_batches(batch_size).await?;
    let paths = write_all(&out, &files).await?;

    let posts: usize = files.iter().map(|f| f.post_count()).sum();
    for (file, path) in files.iter().zip(&paths) {
        println!(
            "{} ({} posts) ({})",
            path.display(),
            file.post_count(),
            file.size_label()
        );
    }
    println!(
        "posts={} files={} (expected {}) elapsed={:.1}s",
        posts,
        files.len(),
        planned_file_count(posts, batch_size),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("feed")
        .about("Preview a CSV of blog posts or export it as Blogger/Atom XML files")
        .subcommand_required(true)
        .subcommand(
            Command::new("preview")
                .about("Print one page of rows")
                .arg(source_arg())
                .arg(charset_arg())
                .arg(map_arg())
                .arg(Arg::new("page").long("page").default_value("1").value_parser(clap::value_parser!(usize)))
                .arg(Arg::new("per-page").long("per-page").default_value("10").value_parser(clap::value_parser!(usize))),
        )
        .subcommand(
            Command::new("export")
                .about("Write file-NN.xml feed documents")
                .arg(source_arg())
                .arg(charset_arg())
                .arg(map_arg())
                .arg(Arg::new("batch-size").long("batch-size").help("Posts per XML file").default_value("50").value_parser(clap::value_parser!(usize)))
                .arg(Arg::new("out").long("out").help("Output directory").value_parser(clap::value_parser!(PathBuf))),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("preview", sub)) => preview(sub).await,
        Some(("export", sub)) => export(sub).await,
        _ => unreachable!("subcommand_required"),
    }
}
