use crate::buffer::ByteBuffer;

use super::error::Error;
use super::message::{Request, Response};

/// Serializes a request into `request-line CRLF headers CRLF CRLF body`.
///
/// If no `Content-Length` header is present and the body is non-empty, one
/// is inserted. `Transfer-Encoding: chunked` bodies are emitted verbatim —
/// the caller is responsible for pre-chunking.
pub fn encode_request(req: &Request) -> Result<Vec<u8>, Error> {
    if req.method.as_str().is_empty() {
        return Err(Error::InvalidField);
    }
    if req.target.is_empty() {
        return Err(Error::InvalidField);
    }

    let mut out = ByteBuffer::new();
    out.append(req.method.as_str().as_bytes());
    out.append_byte(b' ');
    out.append(&req.target);
    out.append_byte(b' ');
    out.append(req.version.as_str().as_bytes());
    out.append(b"\r\n");

    write_headers(&mut out, &req.headers, &req.body);
    out.append(b"\r\n");
    out.append(&req.body);

    Ok(out.into_vec())
}

/// Serializes a response into `status-line CRLF headers CRLF CRLF body`.
pub fn encode_response(resp: &Response) -> Result<Vec<u8>, Error> {
    if !(100..=599).contains(&resp.status_code) {
        return Err(Error::InvalidField);
    }

    let mut out = ByteBuffer::new();
    out.append(resp.version.as_str().as_bytes());
    out.append_byte(b' ');
    out.append(resp.status_code.to_string().as_bytes());
    out.append_byte(b' ');
    out.append(&resp.reason_phrase);
    out.append(b"\r\n");

    write_headers(&mut out, &resp.headers, &resp.body);
    out.append(b"\r\n");
    out.append(&resp.body);

    Ok(out.into_vec())
}

fn write_headers(out: &mut ByteBuffer, headers: &[super::message::Header], body: &[u8]) {
    let has_content_length = headers.iter().any(|h| h.name_eq_ignore_case(b"content-length"));
    let has_chunked_encoding = headers
        .iter()
        .any(|h| h.name_eq_ignore_case(b"transfer-encoding"));

    for h in headers {
        out.append(&h.name);
        out.append(b": ");
        out.append(&h.value);
        out.append(b"\r\n");
    }

    if !has_content_length && !has_chunked_encoding && !body.is_empty() {
        out.append(b"Content-Length: ");
        out.append(body.len().to_string().as_bytes());
        out.append(b"\r\n");
    }
}
