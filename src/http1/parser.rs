use super::error::Error;
use super::message::{is_tchar, Header, Method, Request, Response, Version};

/// Hard cap on any single CRLF-terminated line (request-line, status-line,
/// header line, chunk-size line). Guards against unbounded memory growth
/// from a peer that never sends CRLF.
const MAX_LINE_LEN: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    StartLine,
    HeaderLine,
    Body(BodyStage),
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyStage {
    None,
    ContentLength(u64),
    Chunked(ChunkStage),
    UntilEof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChunkStage {
    Size,
    Data(u64),
    DataCrlf,
    Trailer,
}

/// Which kind of message this parser instance is reading. A single
/// `Parser` is used for either `parse_request` or `parse_response` calls
/// for the lifetime of one message; `reset` clears the distinction along
/// with everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Undetermined,
    Request,
    Response,
}

/// A resumable HTTP/1 request/response parser.
///
/// Feed bytes with [`parse_request`](Parser::parse_request) or
/// [`parse_response`](Parser::parse_response) as they arrive. Every
/// non-`NeedMoreData` error is sticky: call [`reset`](Parser::reset)
/// before reusing the instance for a new message.
#[derive(Debug, Clone)]
pub struct Parser {
    stage: Stage,
    mode: Mode,
    line_scratch: Vec<u8>,
    sticky_error: Option<Error>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            stage: Stage::StartLine,
            mode: Mode::Undetermined,
            line_scratch: Vec::new(),
            sticky_error: None,
        }
    }

    pub fn reset(&mut self) {
        self.stage = Stage::StartLine;
        self.mode = Mode::Undetermined;
        self.line_scratch.clear();
        self.sticky_error = None;
    }

    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    pub fn parse_request(&mut self, input: &[u8], req: &mut Request) -> Result<usize, Error> {
        self.mode = Mode::Request;
        self.run(input, Target::Request(req))
    }

    pub fn parse_response(&mut self, input: &[u8], resp: &mut Response) -> Result<usize, Error> {
        self.mode = Mode::Response;
        self.run(input, Target::Response(resp))
    }

    fn fail(&mut self, err: Error) -> Error {
        self.sticky_error = Some(err.clone());
        err
    }

    fn run(&mut self, input: &[u8], mut target: Target<'_>) -> Result<usize, Error> {
        if let Some(err) = &self.sticky_error {
            return Err(err.clone());
        }

        // EOF signal: an empty feed while the body is framed as "runs
        // until EOF" completes the message with no error.
        if input.is_empty() && self.stage == Stage::Body(BodyStage::UntilEof) {
            self.stage = Stage::Complete;
            return Ok(0);
        }

        let mut pos = 0usize;
        while pos < input.len() && self.stage != Stage::Complete {
            let remaining = &input[pos..];
            match self.stage.clone() {
                Stage::StartLine => match self.feed_line(remaining) {
                    LineResult::NeedMore(n) => {
                        pos += n;
                    }
                    LineResult::Line(line, n) => {
                        pos += n;
                        match &mut target {
                            Target::Request(req) => {
                                self.parse_request_line(&line, req)?;
                            }
                            Target::Response(resp) => {
                                self.parse_status_line(&line, resp)?;
                            }
                        }
                        self.stage = Stage::HeaderLine;
                    }
                    LineResult::BareLf => return Err(self.fail(Error::InvalidVersion)),
                    LineResult::TooLong => return Err(self.fail(Error::MessageTooLarge)),
                },
                Stage::HeaderLine => match self.feed_line(remaining) {
                    LineResult::NeedMore(n) => {
                        pos += n;
                    }
                    LineResult::Line(line, n) => {
                        pos += n;
                        if line.is_empty() {
                            let headers = match &target {
                                Target::Request(req) => &req.headers,
                                Target::Response(resp) => &resp.headers,
                            };
                            let body_stage = self.decide_body_framing(headers)?;
                            self.stage = Stage::Body(body_stage);
                            if self.stage == Stage::Body(BodyStage::None) {
                                self.stage = Stage::Complete;
                            }
                        } else {
                            if line[0] == b' ' || line[0] == b'\t' {
                                return Err(self.fail(Error::InvalidHeader));
                            }
                            let header = parse_header_line(&line)?;
                            match &mut target {
                                Target::Request(req) => req.headers.push(header),
                                Target::Response(resp) => resp.headers.push(header),
                            }
                        }
                    }
                    LineResult::BareLf => return Err(self.fail(Error::InvalidHeader)),
                    LineResult::TooLong => return Err(self.fail(Error::MessageTooLarge)),
                },
                Stage::Body(BodyStage::None) => {
                    self.stage = Stage::Complete;
                }
                Stage::Body(BodyStage::ContentLength(remaining_len)) => {
                    let take = (remaining_len as usize).min(input.len() - pos);
                    let chunk = &input[pos..pos + take];
                    match &mut target {
                        Target::Request(req) => req.body.extend_from_slice(chunk),
                        Target::Response(resp) => resp.body.extend_from_slice(chunk),
                    }
                    pos += take;
                    let left = remaining_len - take as u64;
                    if left == 0 {
                        self.stage = Stage::Complete;
                    } else {
                        self.stage = Stage::Body(BodyStage::ContentLength(left));
                    }
                }
                Stage::Body(BodyStage::UntilEof) => {
                    let chunk = &input[pos..];
                    match &mut target {
                        Target::Request(req) => req.body.extend_from_slice(chunk),
                        Target::Response(resp) => resp.body.extend_from_slice(chunk),
                    }
                    pos = input.len();
                }
                Stage::Body(BodyStage::Chunked(chunk_stage)) => {
                    pos += self.advance_chunked(remaining, chunk_stage, &mut target)?;
                }
                Stage::Complete => unreachable!("loop guard excludes Complete"),
            }
        }

        if self.stage == Stage::Complete {
            Ok(pos)
        } else {
            Err(Error::NeedMoreData)
        }
    }

    fn advance_chunked(
        &mut self,
        input: &[u8],
        chunk_stage: ChunkStage,
        target: &mut Target<'_>,
    ) -> Result<usize, Error> {
        match chunk_stage {
            ChunkStage::Size => match self.feed_line(input) {
                LineResult::NeedMore(n) => Ok(n),
                LineResult::BareLf => Err(self.fail(Error::InvalidBody)),
                LineResult::Line(line, n) => {
                    let size_str = match line.iter().position(|&b| b == b';') {
                        Some(idx) => &line[..idx],
                        None => &line[..],
                    };
                    if size_str.is_empty() {
                        return Err(self.fail(Error::InvalidBody));
                    }
                    let mut size: u64 = 0;
                    for &b in size_str {
                        let digit = match b {
                            b'0'..=b'9' => (b - b'0') as u64,
                            b'a'..=b'f' => (b - b'a' + 10) as u64,
                            b'A'..=b'F' => (b - b'A' + 10) as u64,
                            _ => return Err(self.fail(Error::InvalidBody)),
                        };
                        size = size
                            .checked_mul(16)
                            .and_then(|v| v.checked_add(digit))
                            .ok_or_else(|| self.fail(Error::InvalidBody))?;
                    }
                    self.stage = if size == 0 {
                        Stage::Body(BodyStage::Chunked(ChunkStage::Trailer))
                    } else {
                        Stage::Body(BodyStage::Chunked(ChunkStage::Data(size)))
                    };
                    Ok(n)
                }
                LineResult::TooLong => Err(self.fail(Error::InvalidBody)),
            },
            ChunkStage::Data(remaining_len) => {
                let take = (remaining_len as usize).min(input.len());
                let chunk = &input[..take];
                match target {
                    Target::Request(req) => req.body.extend_from_slice(chunk),
                    Target::Response(resp) => resp.body.extend_from_slice(chunk),
                }
                let left = remaining_len - take as u64;
                self.stage = Stage::Body(BodyStage::Chunked(if left == 0 {
                    ChunkStage::DataCrlf
                } else {
                    ChunkStage::Data(left)
                }));
                Ok(take)
            }
            ChunkStage::DataCrlf => match self.feed_line(input) {
                LineResult::NeedMore(n) => Ok(n),
                LineResult::BareLf => Err(self.fail(Error::InvalidBody)),
                LineResult::Line(line, n) => {
                    if !line.is_empty() {
                        return Err(self.fail(Error::InvalidBody));
                    }
                    self.stage = Stage::Body(BodyStage::Chunked(ChunkStage::Size));
                    Ok(n)
                }
                LineResult::TooLong => Err(self.fail(Error::InvalidBody)),
            },
            ChunkStage::Trailer => match self.feed_line(input) {
                LineResult::NeedMore(n) => Ok(n),
                LineResult::BareLf => Err(self.fail(Error::InvalidHeader)),
                LineResult::Line(line, n) => {
                    if line.is_empty() {
                        self.stage = Stage::Complete;
                    } else {
                        if line[0] == b' ' || line[0] == b'\t' {
                            return Err(self.fail(Error::InvalidHeader));
                        }
                        let header = parse_header_line(&line)?;
                        match target {
                            Target::Request(req) => req.headers.push(header),
                            Target::Response(resp) => resp.headers.push(header),
                        }
                        self.stage = Stage::Body(BodyStage::Chunked(ChunkStage::Trailer));
                    }
                    Ok(n)
                }
                LineResult::TooLong => Err(self.fail(Error::MessageTooLarge)),
            },
        }
    }

    /// Determines body framing per RFC 7230 §3.3.3: chunked wins over
    /// Content-Length whenever both are present.
    fn decide_body_framing(&mut self, headers: &[Header]) -> Result<BodyStage, Error> {
        let is_chunked = headers.iter().any(|h| {
            h.name_eq_ignore_case(b"transfer-encoding") && contains_chunked_token(&h.value)
        });
        if is_chunked {
            return Ok(BodyStage::Chunked(ChunkStage::Size));
        }

        let mut content_length: Option<u64> = None;
        for h in headers.iter().filter(|h| h.name_eq_ignore_case(b"content-length")) {
            let value = std::str::from_utf8(&h.value)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .ok_or_else(|| self.fail(Error::InvalidHeader))?;
            match content_length {
                None => content_length = Some(value),
                Some(existing) if existing == value => {}
                Some(_) => return Err(self.fail(Error::InvalidHeader)),
            }
        }

        if let Some(len) = content_length {
            return Ok(BodyStage::ContentLength(len));
        }

        match self.mode {
            Mode::Request => Ok(BodyStage::None),
            Mode::Response => Ok(BodyStage::UntilEof),
            Mode::Undetermined => unreachable!("mode is set before run() is called"),
        }
    }

    /// Accumulates bytes from `input` into `line_scratch` until a CRLF
    /// terminator is found, a bare LF is seen (rejected, strict), or the
    /// line grows past `MAX_LINE_LEN`.
    fn feed_line(&mut self, input: &[u8]) -> LineResult {
        for (i, &b) in input.iter().enumerate() {
            if b == b'\n' {
                let ends_with_cr = self.line_scratch.last() == Some(&b'\r');
                if !ends_with_cr {
                    self.line_scratch.clear();
                    return LineResult::BareLf;
                }
                self.line_scratch.pop();
                let line = std::mem::take(&mut self.line_scratch);
                return LineResult::Line(line, i + 1);
            }
            if self.line_scratch.len() >= MAX_LINE_LEN {
                self.line_scratch.clear();
                return LineResult::TooLong;
            }
            self.line_scratch.push(b);
        }
        LineResult::NeedMore(input.len())
    }

    fn parse_request_line(&mut self, line: &[u8], req: &mut Request) -> Result<(), Error> {
        let method_end = line
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| self.fail(Error::InvalidMethod))?;
        let method = Method::parse(&line[..method_end]).ok_or_else(|| self.fail(Error::InvalidMethod))?;

        let uri_start = method_end + 1;
        let uri_end = line[uri_start..]
            .iter()
            .position(|&b| b == b' ')
            .map(|p| uri_start + p)
            .ok_or_else(|| self.fail(Error::InvalidUri))?;
        if uri_end == uri_start {
            return Err(self.fail(Error::InvalidUri));
        }
        let target = line[uri_start..uri_end].to_vec();

        let version_bytes = &line[uri_end + 1..];
        let version = parse_version(version_bytes).ok_or_else(|| self.fail(Error::InvalidVersion))?;

        req.method = method;
        req.target = target;
        req.version = version;
        Ok(())
    }

    fn parse_status_line(&mut self, line: &[u8], resp: &mut Response) -> Result<(), Error> {
        let version_end = line
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| self.fail(Error::InvalidVersion))?;
        let version = parse_version(&line[..version_end]).ok_or_else(|| self.fail(Error::InvalidVersion))?;

        let status_start = version_end + 1;
        let rest = &line[status_start..];
        let (status_str, reason) = match rest.iter().position(|&b| b == b' ') {
            Some(p) => (&rest[..p], &rest[p + 1..]),
            None => (rest, &rest[rest.len()..]),
        };
        let status_text = std::str::from_utf8(status_str).map_err(|_| self.fail(Error::BadRequest))?;
        let status_code: u16 = status_text.parse().map_err(|_| self.fail(Error::BadRequest))?;
        if !(100..=599).contains(&status_code) {
            return Err(self.fail(Error::BadRequest));
        }

        resp.version = version;
        resp.status_code = status_code;
        resp.reason_phrase = reason.to_vec();
        Ok(())
    }
}

enum Target<'a> {
    Request(&'a mut Request),
    Response(&'a mut Response),
}

enum LineResult {
    NeedMore(usize),
    Line(Vec<u8>, usize),
    BareLf,
    TooLong,
}

fn parse_version(bytes: &[u8]) -> Option<Version> {
    match bytes {
        b"HTTP/1.0" => Some(Version::Http10),
        b"HTTP/1.1" => Some(Version::Http11),
        _ => None,
    }
}

fn parse_header_line(line: &[u8]) -> Result<Header, Error> {
    let colon = line.iter().position(|&b| b == b':').ok_or(Error::InvalidHeader)?;
    if colon == 0 {
        return Err(Error::InvalidHeader);
    }
    let name = &line[..colon];
    if !name.iter().all(|&b| is_tchar(b)) {
        return Err(Error::InvalidHeader);
    }
    let raw_value = &line[colon + 1..];
    let value = trim_ows(raw_value);
    Ok(Header::new(name.to_vec(), value.to_vec()))
}

fn trim_ows(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != b' ' && b != b'\t').unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != b'\t')
        .map(|p| p + 1)
        .unwrap_or(0);
    if start >= end {
        &[]
    } else {
        &bytes[start..end]
    }
}

fn contains_chunked_token(value: &[u8]) -> bool {
    value
        .split(|&b| b == b',')
        .any(|tok| trim_ows(tok).eq_ignore_ascii_case(b"chunked"))
}
