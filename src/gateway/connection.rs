//! Per-connection request handling
//!
//! The gateway speaks just enough HTTP/1.1 to serve a remoting endpoint:
//! one POST per connection, `application/x-amf` both ways. Decoding,
//! message dispatch and encoding all happen synchronously between reading
//! the request body and writing the reply, because decoded value trees are
//! single-threaded.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::amf::decoder::Decoder;
use crate::bundle::{encode_bundle, MessageBundle};
use crate::error::{CodecError, Error, Result};
use crate::gateway::config::GatewayConfig;
use crate::gateway::handler::RemotingHandler;

const MAX_HEADER_SIZE: usize = 16 * 1024;

const REPLY_405: &str = "405 Method Not Allowed\n\n\
    To access this AMF gateway you must use POST requests\n";
const REPLY_500: &str = "500 Internal Server Error\n\n\
    Request bundle could not be decoded\n";

/// One accepted gateway connection
pub(crate) struct Connection<H> {
    session_id: u64,
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: GatewayConfig,
    handler: Arc<H>,
}

impl<H: RemotingHandler> Connection<H> {
    pub(crate) fn new(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: GatewayConfig,
        handler: Arc<H>,
    ) -> Self {
        Self {
            session_id,
            socket,
            peer_addr,
            config,
            handler,
        }
    }

    pub(crate) async fn run(mut self) -> Result<()> {
        if !self.handler.on_connection(self.peer_addr).await {
            return Ok(());
        }

        let request = match timeout(
            self.config.request_timeout,
            read_http_request(&mut self.socket, self.config.max_body_size),
        )
        .await
        {
            Ok(request) => request?,
            Err(_) => return Err(Error::Timeout),
        };

        tracing::debug!(
            session_id = self.session_id,
            peer = %self.peer_addr,
            method = %request.method,
            path = %request.path,
            body = request.body.len(),
            "request received"
        );

        if request.method != "POST" {
            write_http_response(
                &mut self.socket,
                405,
                "Method Not Allowed",
                "text/plain",
                REPLY_405.as_bytes(),
            )
            .await?;
            return Ok(());
        }

        match process_bundle(self.handler.as_ref(), &self.config, &request.body) {
            Ok(reply) => {
                write_http_response(
                    &mut self.socket,
                    200,
                    "OK",
                    "application/x-amf",
                    &reply,
                )
                .await?;
                tracing::debug!(
                    session_id = self.session_id,
                    bytes = reply.len(),
                    "reply bundle written"
                );
                self.handler
                    .on_reply_sent(self.peer_addr, reply.len())
                    .await;
            }
            Err(e) => {
                tracing::warn!(
                    session_id = self.session_id,
                    error = %e,
                    "failed to process request bundle"
                );
                write_http_response(
                    &mut self.socket,
                    500,
                    "Internal Server Error",
                    "text/plain",
                    REPLY_500.as_bytes(),
                )
                .await?;
            }
        }

        Ok(())
    }
}

/// Decode the request bundle, dispatch every message, encode the reply.
///
/// Replies always go out as an AMF3 bundle. A malformed preamble aborts;
/// any other latched decode error is logged and the successfully decoded
/// messages are still answered.
pub(crate) fn process_bundle<H: RemotingHandler>(
    handler: &H,
    config: &GatewayConfig,
    body: &[u8],
) -> Result<Bytes> {
    let mut decoder = Decoder::new(Bytes::copy_from_slice(body), 0);
    decoder.set_reset_per_message(config.reset_tables_per_message);
    handler.register_types(&mut decoder);

    let request_bundle = decoder.read_bundle();
    if let Some(err) = decoder.take_error() {
        if matches!(err, CodecError::MalformedPreamble(_)) {
            return Err(err.into());
        }
        tracing::warn!(error = %err, "request bundle decoded with errors");
    }

    let mut reply = MessageBundle {
        amf_version: 3,
        headers: Vec::new(),
        messages: Vec::with_capacity(request_bundle.messages.len()),
    };

    for request in request_bundle.messages.iter() {
        let outcome = handler.handle_message(request);
        let success = outcome.is_result();
        tracing::debug!(
            target = %request.target_uri,
            success,
            "handled remoting message"
        );
        reply.messages.push(request.reply(outcome.into_body(), success));
    }

    Ok(encode_bundle(&reply)?)
}

/// A parsed HTTP request: method, path, and the full body
pub(crate) struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

/// The interesting parts of a request head
#[derive(Debug)]
struct HttpHead {
    method: String,
    path: String,
    content_length: Option<usize>,
}

fn parse_http_head(head: &str) -> Result<HttpHead> {
    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .ok_or_else(|| Error::Http("empty request".into()))?;

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| Error::Http("missing method".into()))?
        .to_string();
    let path = parts
        .next()
        .ok_or_else(|| Error::Http("missing request path".into()))?
        .to_string();

    let mut content_length = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let parsed = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| Error::Http("bad Content-Length".into()))?;
                content_length = Some(parsed);
            }
        }
    }

    Ok(HttpHead {
        method,
        path,
        content_length,
    })
}

/// Read one HTTP request from the stream
pub(crate) async fn read_http_request<R>(stream: &mut R, max_body: usize) -> Result<HttpRequest>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];

    // Accumulate until the blank line separating head from body.
    let head_end = loop {
        if let Some(pos) = find_head_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEADER_SIZE {
            return Err(Error::Http("request head too large".into()));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = std::str::from_utf8(&buffer[..head_end])
        .map_err(|_| Error::Http("request head is not valid UTF-8".into()))?;
    let head = parse_http_head(head)?;

    let mut body = buffer.split_off(head_end + 4);
    let content_length = match head.content_length {
        Some(len) => len,
        None if head.method == "POST" => {
            return Err(Error::Http("missing Content-Length".into()));
        }
        None => 0,
    };
    if content_length > max_body {
        return Err(Error::Http("request body too large".into()));
    }

    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(HttpRequest {
        method: head.method,
        path: head.path,
        body,
    })
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Write a whole HTTP response
pub(crate) async fn write_http_response<W>(
    stream: &mut W,
    status: u16,
    reason: &str,
    content_type: &str,
    body: &[u8],
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let head = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Server: amf-rs\r\n\
         Connection: close\r\n\r\n",
        status,
        reason,
        content_type,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::io::ByteWriter;
    use crate::amf::value::Value;
    use crate::bundle::{decode_bundle, AmfMessage};
    use crate::gateway::handler::HandlerResult;

    struct EchoHandler;

    #[async_trait::async_trait]
    impl RemotingHandler for EchoHandler {
        fn handle_message(&self, message: &AmfMessage) -> HandlerResult {
            if message.target_uri.starts_with("fail") {
                HandlerResult::Status(Value::String("boom".into()))
            } else {
                HandlerResult::Result(message.body.clone())
            }
        }
    }

    fn request_bundle_bytes(target: &str) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_u16(3);
        w.write_u16(0);
        w.write_u16(1);
        w.write_u16(target.len() as u16);
        w.write_slice(target.as_bytes());
        w.write_u16(2);
        w.write_slice(b"/1");
        w.write_u32(0);
        w.write_u8(0x09);
        w.write_u32(1);
        w.write_slice(&[0x06, 0x07, b'h', b'e', b'y']);
        w.finish().to_vec()
    }

    #[test]
    fn test_parse_http_head() {
        let head = parse_http_head(
            "POST /gateway HTTP/1.1\r\nHost: x\r\nContent-Length: 12\r\nContent-Type: application/x-amf",
        )
        .unwrap();
        assert_eq!(head.method, "POST");
        assert_eq!(head.path, "/gateway");
        assert_eq!(head.content_length, Some(12));
    }

    #[test]
    fn test_parse_http_head_no_length() {
        let head = parse_http_head("GET / HTTP/1.1\r\nHost: x").unwrap();
        assert_eq!(head.method, "GET");
        assert_eq!(head.content_length, None);
    }

    #[test]
    fn test_parse_http_head_bad_length() {
        let err = parse_http_head("POST / HTTP/1.1\r\nContent-Length: nope").unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[test]
    fn test_find_head_end() {
        assert_eq!(find_head_end(b"ab\r\n\r\ncd"), Some(2));
        assert_eq!(find_head_end(b"ab\r\ncd"), None);
    }

    #[test]
    fn test_process_bundle_success() {
        let config = GatewayConfig::default();
        let reply = process_bundle(&EchoHandler, &config, &request_bundle_bytes("Echo/1")).unwrap();

        let (bundle, err) = decode_bundle(&reply);
        assert_eq!(err, None);
        assert_eq!(bundle.amf_version, 3);
        assert_eq!(bundle.messages.len(), 1);
        assert_eq!(bundle.messages[0].target_uri, "Echo/1/onResult");
        assert_eq!(bundle.messages[0].response_uri, "");
        assert_eq!(
            bundle.messages[0].body,
            Value::dense_array(vec![Value::String("hey".into())])
        );
    }

    #[test]
    fn test_process_bundle_status_reply() {
        let config = GatewayConfig::default();
        let reply = process_bundle(&EchoHandler, &config, &request_bundle_bytes("fail/1")).unwrap();

        let (bundle, err) = decode_bundle(&reply);
        assert_eq!(err, None);
        assert_eq!(bundle.messages[0].target_uri, "fail/1/onStatus");
        assert_eq!(bundle.messages[0].body, Value::String("boom".into()));
    }

    #[test]
    fn test_process_bundle_bad_preamble() {
        let config = GatewayConfig::default();
        let err = process_bundle(&EchoHandler, &config, &[0x00, 0x10, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            Error::Codec(CodecError::MalformedPreamble(16))
        ));
    }
}
