//! Random-access line reads on top of a session's line index.
//!
//! A `[start, end)` line request is turned into exactly one positioned read of the
//! covering byte span. Nothing is cached here; the viewport window owns caching.

use crate::error::{LineviewError, Result};
use crate::file_handler::line_index::LineRange;
use crate::file_handler::session::Session;
use bstr::ByteSlice;
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Read lines `[start, end)` (0-based) from the session's file
///
/// Bounds are clamped to `[0, total_lines]`; an empty range returns an empty
/// vector without touching the file. Line terminators are removed, including a
/// trailing `\r` so CRLF files read the same as LF files. Invalid UTF-8 is
/// replaced rather than rejected.
pub async fn read_lines(session: &Session, start: u64, end: u64) -> Result<Vec<String>> {
    let Some((byte_start, byte_end)) = session.line_index().byte_range(LineRange::new(start, end))
    else {
        return Ok(Vec::new());
    };

    let _gate = session.read_gate().await;
    session.check_current().await?;

    let path = session.path();
    let mut file = File::open(path).await.map_err(|e| {
        LineviewError::file_error(format!("Failed to open file: {}", path.display()), e)
    })?;
    file.seek(SeekFrom::Start(byte_start))
        .await
        .map_err(|e| LineviewError::file_error("Failed to seek in file", e))?;

    let mut buffer = vec![0u8; (byte_end - byte_start) as usize];
    file.read_exact(&mut buffer).await.map_err(|e| {
        LineviewError::file_error(
            format!("Failed to read bytes {}..{}", byte_start, byte_end),
            e,
        )
    })?;

    Ok(split_lines(&buffer))
}

/// Split a span of whole lines into strings
///
/// A span ending in `\n` produces one empty trailing piece from the split; that
/// piece is not a line and is dropped.
pub(crate) fn split_lines(buffer: &[u8]) -> Vec<String> {
    let mut lines: Vec<String> = buffer
        .split(|&b| b == b'\n')
        .map(|line| decode_line(line).into_owned())
        .collect();

    if buffer.ends_with(b"\n") {
        lines.pop();
    }
    lines
}

/// Strip one trailing carriage return and decode lossily
pub(crate) fn decode_line(line: &[u8]) -> std::borrow::Cow<'_, str> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line.to_str_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content).expect("Failed to write test content");
        file.flush().expect("Failed to flush test file");
        file
    }

    async fn session_for(content: &[u8]) -> (NamedTempFile, Session) {
        let file = create_test_file(content);
        let session = Session::index(file.path(), 3, |_| {}).await.unwrap();
        (file, session)
    }

    #[tokio::test]
    async fn test_read_all_lines_without_trailing_newline() {
        let (_file, session) = session_for(b"a\nb\nc").await;
        let lines = read_lines(&session, 0, 3).await.unwrap();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_read_middle_and_clamped_ranges() {
        let (_file, session) = session_for(b"first\nsecond\nthird\nfourth\n").await;

        assert_eq!(
            read_lines(&session, 1, 3).await.unwrap(),
            vec!["second", "third"]
        );
        assert_eq!(
            read_lines(&session, 2, 1000).await.unwrap(),
            vec!["third", "fourth"]
        );
        assert!(read_lines(&session, 3, 3).await.unwrap().is_empty());
        assert!(read_lines(&session, 10, 20).await.unwrap().is_empty());
        assert!(read_lines(&session, 3, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_crlf_and_blank_lines() {
        let (_file, session) = session_for(b"one\r\n\r\ntwo\r\n\n").await;
        assert_eq!(session.total_lines(), 4);

        let lines = read_lines(&session, 0, 4).await.unwrap();
        assert_eq!(lines, vec!["one", "", "two", ""]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let (_file, session) = session_for(b"ok\n\xff\xfebad\n").await;
        let lines = read_lines(&session, 1, 2).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("bad"));
        assert!(lines[0].contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_read_after_external_change_is_stale() {
        let (file, session) = session_for(b"a\nb\n").await;
        std::fs::write(file.path(), b"a\nb\nc\nd\n").unwrap();

        let result = read_lines(&session, 0, 2).await;
        assert!(matches!(result, Err(LineviewError::StaleSession { .. })));
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines(b"a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines(b"a\nb"), vec!["a", "b"]);
        assert_eq!(split_lines(b"\n"), vec![""]);
        assert_eq!(split_lines(b"x\r\n"), vec!["x"]);
    }

    proptest! {
        #[test]
        fn prop_split_round_trips_index_ranges(
            lines in proptest::collection::vec("[a-z ]{0,6}", 1..20),
            trailing in any::<bool>(),
            start in 0u64..25,
            len in 0u64..25,
        ) {
            let mut text = lines.join("\n");
            if trailing {
                text.push('\n');
            }
            let data = text.as_bytes();
            let index = crate::file_handler::line_index::LineIndex::from_bytes(data);

            let range = LineRange::new(start, start + len).clamp(index.total_lines());
            match index.byte_range(range) {
                None => prop_assert!(range.is_empty()),
                Some((from, to)) => {
                    let span = &data[from as usize..to as usize];
                    let pieces = split_lines(span);
                    prop_assert_eq!(pieces.len() as u64, range.len());

                    let mut rejoined = pieces.join("\n");
                    if span.ends_with(b"\n") {
                        rejoined.push('\n');
                    }
                    prop_assert_eq!(rejoined.as_bytes(), span);
                }
            }
        }
    }
}
