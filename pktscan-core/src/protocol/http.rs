//! HTTP/1.x message head, bound above TCP.
//!
//! Only the start line and header block are measured; the body becomes the
//! record's payload, sized by `Content-Length` when present.

use httparse::{Request, Response, Status, EMPTY_HEADER};

use crate::schema::{FieldDescriptor, FieldKind};

use super::{BindingRule, Header, ProtocolId, Segments};

/// Maximum number of headers parsed per message.
const MAX_HEADERS: usize = 64;

/// Well-known HTTP ports.
pub const HTTP_PORTS: &[u16] = &[80, 8080];

const METHODS: &[&[u8]] = &[
    b"GET ", b"POST ", b"PUT ", b"DELETE ", b"HEAD ", b"OPTIONS ", b"PATCH ", b"CONNECT ",
    b"TRACE ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Head {
    length: usize,
    content_length: Option<usize>,
}

/// HTTP/1.x request or response head.
#[derive(Debug, Clone, Copy)]
pub struct HttpHeader;

impl HttpHeader {
    fn parse(data: &[u8]) -> Option<Head> {
        let mut headers = [EMPTY_HEADER; MAX_HEADERS];
        let status = if data.starts_with(b"HTTP/") {
            Response::new(&mut headers).parse(data)
        } else {
            Request::new(&mut headers).parse(data)
        };

        match status {
            Ok(Status::Complete(length)) => Some(Head {
                length,
                content_length: content_length(&headers),
            }),
            // Head continues in a later segment
            Ok(Status::Partial) => Some(Head {
                length: data.len(),
                content_length: None,
            }),
            Err(httparse::Error::TooManyHeaders) => {
                let end = data.windows(4).position(|w| w == b"\r\n\r\n")?;
                Some(Head {
                    length: end + 4,
                    content_length: None,
                })
            }
            Err(_) => None,
        }
    }

    /// Payload starts like an HTTP/1.x message.
    pub fn looks_like_http(payload: &[u8]) -> bool {
        payload.starts_with(b"HTTP/1.") || METHODS.iter().any(|m| payload.starts_with(m))
    }
}

fn content_length(headers: &[httparse::Header<'_>]) -> Option<usize> {
    let header = headers
        .iter()
        .filter(|h| !h.name.is_empty())
        .find(|h| h.name.eq_ignore_ascii_case("content-length"))?;
    std::str::from_utf8(header.value).ok()?.trim().parse().ok()
}

impl Header for HttpHeader {
    fn name(&self) -> &'static str {
        "http"
    }

    fn display_name(&self) -> &'static str {
        "HTTP"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("start_line", FieldKind::Text).at(0),
            FieldDescriptor::new("method", FieldKind::Text).optional(),
            FieldDescriptor::new("uri", FieldKind::Text).optional(),
            FieldDescriptor::new("status_code", FieldKind::UInt16).optional(),
            FieldDescriptor::new("host", FieldKind::Text).optional(),
            FieldDescriptor::new("content_length", FieldKind::UInt32).optional(),
        ]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        self.segments(data, offset).map_or(0, |seg| seg.header)
    }

    fn segments(&self, data: &[u8], offset: usize) -> Option<Segments> {
        let seg = match data.get(offset..).and_then(Self::parse) {
            Some(head) => {
                Segments::header(head.length).with_payload(head.content_length.unwrap_or(0))
            }
            None => Segments::default(),
        };
        Some(seg)
    }

    fn next_header(&self, _header: &[u8]) -> Option<ProtocolId> {
        Some(ProtocolId::PAYLOAD)
    }

    fn bindings(&self) -> Vec<BindingRule> {
        vec![BindingRule::onto(ProtocolId::TCP, |view| {
            !view.payload().is_empty()
                && [0, 2]
                    .iter()
                    .filter_map(|at| view.header_u16(ProtocolId::TCP, *at))
                    .any(|port| HTTP_PORTS.contains(&port))
        })
        .depends_on(ProtocolId::TCP)]
    }

    fn heuristics(&self) -> Vec<BindingRule> {
        vec![
            BindingRule::onto(ProtocolId::TCP, |view| Self::looks_like_http(view.payload()))
                .depends_on(ProtocolId::TCP),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_head() {
        let data = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let seg = HttpHeader.segments(data, 0).unwrap();
        assert_eq!(seg.header, data.len());
        assert_eq!(seg.payload, 0);
    }

    #[test]
    fn test_response_with_body() {
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        let seg = HttpHeader.segments(data, 0).unwrap();
        assert_eq!(seg.header, data.len() - 5);
        assert_eq!(seg.payload, 5);
    }

    #[test]
    fn test_partial_head() {
        let data = b"POST /upload HTTP/1.1\r\nHost: exa";
        assert_eq!(HttpHeader.header_length(data, 0), data.len());
    }

    #[test]
    fn test_not_http() {
        assert_eq!(HttpHeader.header_length(&[0x16, 0x03, 0x01, 0x00], 0), 0);
        assert_eq!(HttpHeader.header_length(b"", 0), 0);
    }

    #[test]
    fn test_looks_like_http() {
        assert!(HttpHeader::looks_like_http(b"GET / HTTP/1.1\r\n"));
        assert!(HttpHeader::looks_like_http(b"HTTP/1.0 404 Not Found\r\n"));
        assert!(!HttpHeader::looks_like_http(b"GETTING"));
        assert!(!HttpHeader::looks_like_http(b"SSH-2.0-OpenSSH"));
    }

    #[test]
    fn test_declared_rules_target_tcp() {
        for rule in HttpHeader.bindings().iter().chain(&HttpHeader.heuristics()) {
            assert_eq!(rule.target, ProtocolId::TCP);
            assert_eq!(rule.dependencies(), &[ProtocolId::TCP]);
        }
    }
}
