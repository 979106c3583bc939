//! `multipart/form-data` bodies.
use std::collections::HashMap;

use hyper::body::Bytes;

use crate::form::{parse_header_fields, parse_headers};

const DEFAULT_FILE_CONTENT_TYPE: &str = "application/unknown";

/// A file submitted through a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub data: Bytes,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Multipart {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

/// Extract the `boundary` parameter of a multipart content type.
pub fn boundary(content_type: &str) -> Option<&str> {
    content_type
        .split_once("boundary=")
        .map(|(_, boundary)| boundary.split(';').next().unwrap_or(boundary))
        .map(|boundary| boundary.trim().trim_matches('"'))
        .filter(|boundary| !boundary.is_empty())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Position of the next delimiter line in `haystack`. `delimiter` includes
/// the line break preceding it and must be followed by another line break or
/// by the closing `--`.
fn find_delimiter(haystack: &[u8], delimiter: &[u8]) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = find(&haystack[offset..], delimiter) {
        let at = offset + pos;
        if ends_delimiter(&haystack[at + delimiter.len()..]) {
            return Some(at);
        }
        offset = at + 1;
    }
    None
}

fn ends_delimiter(rest: &[u8]) -> bool {
    rest.starts_with(b"\r\n") || rest.starts_with(b"--")
}

/// Parse a multipart body delimited by `boundary`.
///
/// Malformed parts are skipped rather than failing the whole body: parts
/// without a header terminator, and parts whose `Content-Disposition` is not
/// `form-data`.
pub fn parse(body: &Bytes, boundary: &str) -> Multipart {
    let delimiter = format!("\r\n--{boundary}");
    let delimiter = delimiter.as_bytes();
    let mut multipart = Multipart::default();

    // the first delimiter may open the body without a preceding line break
    let opening = &delimiter[2..];
    let mut rest = if body.starts_with(opening) && ends_delimiter(&body[opening.len()..]) {
        body.slice(opening.len()..)
    } else {
        match find_delimiter(body, delimiter) {
            Some(start) => body.slice(start + delimiter.len()..),
            None => return multipart,
        }
    };

    loop {
        // closing delimiter
        if rest.starts_with(b"--") {
            break;
        }
        let end = find_delimiter(&rest, delimiter);
        let part = rest.slice(..end.unwrap_or(rest.len()));
        parse_part(strip_line_break(part), &mut multipart);

        match end {
            Some(end) => rest = rest.slice(end + delimiter.len()..),
            None => break,
        }
    }

    multipart
}

/// Strip the line break that ends a delimiter line.
fn strip_line_break(part: Bytes) -> Bytes {
    if part.starts_with(b"\r\n") {
        part.slice(2..)
    } else {
        part
    }
}

fn parse_part(part: Bytes, multipart: &mut Multipart) {
    let Some(header_end) = find(&part, b"\r\n\r\n") else {
        tracing::debug!("skipping multipart part without a header terminator");
        return;
    };

    let headers = parse_headers(&String::from_utf8_lossy(&part[..header_end]));
    let disposition = headers
        .get("content-disposition")
        .map(String::as_str)
        .unwrap_or_default();
    if !disposition.starts_with("form-data") {
        tracing::debug!(disposition, "skipping multipart part that is not form-data");
        return;
    }

    let fields = parse_header_fields(disposition);
    let Some(name) = fields.get("name").cloned().flatten() else {
        return;
    };
    let data = part.slice(header_end + 4..);

    match fields.get("filename").cloned().flatten() {
        Some(filename) => {
            let content_type = headers
                .get("content-type")
                .cloned()
                .unwrap_or_else(|| DEFAULT_FILE_CONTENT_TYPE.to_owned());
            let file = UploadedFile {
                filename,
                content_type,
                size: data.len(),
                data,
            };
            multipart.files.insert(name, file);
        }
        None => {
            let value = String::from_utf8_lossy(&data).into_owned();
            multipart.fields.insert(name, value);
        }
    }
}
