//! Line-delimited JSON frames exchanged with worker processes.

use crate::error::{Error, Result};
use crate::kwargs::Kwargs;
use crate::outcome::InvocationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, Write};

/// Set on a worker process to the name of the task it should serve.
pub const WORKER_TASK_ENV: &str = "FANMAP_WORKER_TASK";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: usize,
    pub args: Kwargs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: usize,
    pub outcome: std::result::Result<Value, InvocationError>,
}

pub fn write_frame<W: Write, T: Serialize>(output: &mut W, frame: &T) -> Result<()> {
    serde_json::to_writer(&mut *output, frame)?;
    output.write_all(b"\n")?;
    output.flush()?;
    Ok(())
}

/// Reads the next frame, skipping blank lines. `None` means the peer closed the stream.
pub fn read_frame<R: BufRead, T: DeserializeOwned>(input: &mut R) -> Result<Option<T>> {
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.trim().is_empty() {
            continue;
        }
        return serde_json::from_str(&line)
            .map(Some)
            .map_err(|e| Error::worker(format!("malformed frame: {}", e)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;
    use std::io::Cursor;

    #[test]
    fn test_frames_are_single_lines() {
        let mut buf = Vec::new();
        let request = Request {
            id: 3,
            args: crate::kwargs! { "a" => 1, "b" => 2 },
        };
        write_frame(&mut buf, &request).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.starts_with(r#"{"id":3,"args":"#));
    }

    #[test]
    fn test_read_skips_blank_lines_and_reports_eof() {
        let input = "\n\n{\"id\":1,\"outcome\":{\"Err\":{\"index\":1,\"kind\":\"Failed\",\"message\":\"no\"}}}\n";
        let mut cursor = Cursor::new(input.as_bytes());

        let response: Response = read_frame(&mut cursor).unwrap().unwrap();
        assert_eq!(response.id, 1);
        let err = response.outcome.unwrap_err();
        assert_eq!(err.kind, FailureKind::Failed);

        assert!(read_frame::<_, Response>(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_read_rejects_garbage() {
        let mut cursor = Cursor::new(&b"hello from a stray println\n"[..]);
        let err = read_frame::<_, Response>(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::Worker(_)));
    }
}
