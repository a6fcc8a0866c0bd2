#![allow(dead_code)]

use csv_blogger_feed::CancellationToken;
use std::fmt::Write as _;
use tokio::io::{AsyncWriteExt, DuplexStream};

pub const HEADER: &str = "Date,Title,Content,Categories";

/// `rows` posts; post `i` is titled `Post i` and tagged `tag-(i % 3)`.
pub fn posts_csv(rows: usize) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 1..=rows {
        writeln!(
            csv,
            "2021-01-{:02},Post {i},\"<p>body, {i}</p>\",\"tag-{}, shared\"",
            i % 28 + 1,
            i % 3
        )
        .unwrap();
    }
    csv
}

/// Values of `attr="..."` on lines that start with `prefix`.
pub fn attr_values(xml: &str, prefix: &str) -> Vec<String> {
    xml.lines()
        .filter_map(|line| line.strip_prefix(prefix))
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_string)
        .collect()
}

/// Gives the reading side of `tx` a few turns to drain what is already
/// buffered, cancels `cancel`, then sends `tail` and closes the stream.
pub async fn cancel_then_send(mut tx: DuplexStream, cancel: CancellationToken, tail: &str) {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    cancel.cancel();
    tx.write_all(tail.as_bytes()).await.unwrap();
}
