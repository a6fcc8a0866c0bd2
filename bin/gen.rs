use clap::{Arg, Command};
use std::io::{self, Write};

const TAGS: [&str; 6] = ["news", "sport", "tech", "travel", "food", "music"];

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Write a synthetic CSV of blog posts to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("content-len")
                .long("content-len")
                .help("Approximate characters of HTML per post body")
                .value_parser(clap::value_parser!(usize))
                .default_value("200"),
        )
        .get_matches();

    let rows: u64 = *matches.get_one("rows").unwrap();
    let content_len: usize = *matches.get_one("content-len").unwrap();
    let paragraph = "lorem ipsum, \"dolor\" & sit amet ".repeat(content_len / 32 + 1);

    let mut out = io::BufWriter::new(io::stdout().lock());
    writeln!(&mut out, "Date,Title,Content,Categories")?;

    // Deterministic data; quotes and commas exercise CSV escaping.
    for i in 0..rows {
        let day = i % 28 + 1;
        let month = (i / 28) % 12 + 1;
        let tags = format!(
            "{}, {}",
            TAGS[(i % TAGS.len() as u64) as usize],
            TAGS[((i / 3) % TAGS.len() as u64) as usize]
        );
        let body = format!("<p>Post {i}: {}</p>", &paragraph[..content_len.min(paragraph.len())]);
        writeln!(
            &mut out,
            "2021-{month:02}-{day:02}T10:00:00.000-07:00,\"Post <{i}>\",\"{}\",\"{}\"",
            body.replace('"', "\"\""),
            tags
        )?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
