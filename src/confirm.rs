//! Interactive download confirmation

use anyhow::{bail, Context, Result};
use humansize::{format_size, DECIMAL};
use std::io::{BufRead, Write};

use crate::record::FileRecord;

/// Print the missing files with their sizes to `out`.
pub fn render_listing<W: Write>(files: &[FileRecord], out: &mut W) -> Result<u64> {
    let mut total = 0u64;
    for file in files {
        writeln!(out, "{:>10} {}", format_size(file.size, DECIMAL), file.path)?;
        total += file.size;
    }
    writeln!(out)?;
    Ok(total)
}

/// List `files` and ask whether to download them, re-prompting until the
/// answer is `y` or `n` (any case). End of input or a read error is fatal.
pub fn prompt_download<R: BufRead, W: Write>(
    files: &[FileRecord],
    input: &mut R,
    out: &mut W,
) -> Result<bool> {
    let total = render_listing(files, out)?;

    let mut line = String::new();
    loop {
        write!(
            out,
            "Download {} new file(s)? ({} total) [y/n]: ",
            files.len(),
            format_size(total, DECIMAL)
        )?;
        out.flush()?;

        line.clear();
        let n = input
            .read_line(&mut line)
            .context("error reading download prompt input")?;
        if n == 0 {
            bail!("error reading download prompt input: end of input");
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "y" => return Ok(true),
            "n" => return Ok(false),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn files() -> Vec<FileRecord> {
        vec![
            FileRecord::new("docs/b.txt", 20),
            FileRecord::new("video.mp4", 1_500_000),
        ]
    }

    #[test]
    fn yes_after_garbage() {
        let mut input = Cursor::new("maybe\n\nY\n");
        let mut out = Vec::new();
        assert!(prompt_download(&files(), &mut input, &mut out).unwrap());

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("docs/b.txt"));
        assert!(out.contains("video.mp4"));
        assert_eq!(out.matches("Download 2 new file(s)?").count(), 3);
        assert!(out.contains("MB total"));
    }

    #[test]
    fn no_declines() {
        let mut input = Cursor::new("N\r\n");
        let mut out = Vec::new();
        assert!(!prompt_download(&files(), &mut input, &mut out).unwrap());
    }

    #[test]
    fn answer_without_newline_is_accepted() {
        let mut input = Cursor::new("y");
        let mut out = Vec::new();
        assert!(prompt_download(&files(), &mut input, &mut out).unwrap());
    }

    #[test]
    fn end_of_input_is_fatal() {
        let mut input = Cursor::new("what\n");
        let mut out = Vec::new();
        assert!(prompt_download(&files(), &mut input, &mut out).is_err());
    }

    #[test]
    fn listing_returns_total() {
        let mut out = Vec::new();
        assert_eq!(render_listing(&files(), &mut out).unwrap(), 1_500_020);
        let out = String::from_utf8(out).unwrap();
        assert!(out.lines().next().unwrap().ends_with(" docs/b.txt"));
    }
}
