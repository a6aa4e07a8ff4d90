/// Errors produced by the HTTP/1 parser and encoder.
///
/// `NeedMoreData` is never sticky: the caller just re-enters with more
/// bytes. Every other variant is sticky — once returned, the parser stays
/// in an error state until [`Parser::reset`](super::Parser::reset) is
/// called.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("more data is needed to make progress")]
    NeedMoreData,

    #[error("invalid HTTP method")]
    InvalidMethod,

    #[error("invalid request target")]
    InvalidUri,

    #[error("invalid HTTP version")]
    InvalidVersion,

    #[error("invalid header field")]
    InvalidHeader,

    #[error("invalid message body framing")]
    InvalidBody,

    #[error("message exceeds the configured size limit")]
    MessageTooLarge,

    #[error("well-formed but disallowed request")]
    BadRequest,

    #[error("invalid field value for encoding")]
    InvalidField,
}
