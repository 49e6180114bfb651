//! Framed JSON-RPC over a pair of byte streams.
//!
//! A reader thread parses `Content-Length` frames and forwards them over a
//! channel. Before forwarding a request it registers a [`CancelToken`] for its
//! id, and a `$/cancelRequest` notification flips the matching token right
//! away, so a handler running on the main thread observes cancellation without
//! waiting for the queue to drain. Writes happen on the caller's thread.

use std::{
  collections::HashMap,
  io::{
    self,
    BufRead,
    BufReader,
    BufWriter,
    Write,
  },
  sync::{
    Arc,
    mpsc::{
      Receiver,
      RecvError,
      Sender,
      channel,
    },
  },
  thread::{
    self,
    JoinHandle,
  },
};

use parking_lot::Mutex;
use serde::Deserialize;
use the_lib::cancel::CancelToken;
use thiserror::Error;
use tracing::{
  debug,
  warn,
};

use crate::jsonrpc;

pub const CANCEL_REQUEST: &str = "$/cancelRequest";

/// Largest frame body accepted. Longer `Content-Length` values are rejected
/// before any allocation.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub enum TransportEvent {
  Message(jsonrpc::Message),
  /// A frame whose body was not a JSON-RPC message. The stream stays usable.
  Malformed(String),
  ReadError(String),
  Closed,
}

/// Cancellation tokens of requests that have been read but not answered.
#[derive(Debug, Clone, Default)]
pub struct PendingRequests {
  tokens: Arc<Mutex<HashMap<jsonrpc::Id, CancelToken>>>,
}

impl PendingRequests {
  pub fn register(&self, id: jsonrpc::Id) -> CancelToken {
    self.tokens.lock().entry(id).or_default().clone()
  }

  /// Flips the token for `id`. Returns whether the request was still pending.
  pub fn cancel(&self, id: &jsonrpc::Id) -> bool {
    match self.tokens.lock().get(id) {
      Some(token) => {
        token.cancel();
        true
      },
      None => false,
    }
  }

  pub fn token(&self, id: &jsonrpc::Id) -> CancelToken {
    self.register(id.clone())
  }

  pub fn finish(&self, id: &jsonrpc::Id) {
    self.tokens.lock().remove(id);
  }

  pub fn len(&self) -> usize {
    self.tokens.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

pub struct Connection {
  writer:        BufWriter<Box<dyn Write + Send>>,
  event_rx:      Receiver<TransportEvent>,
  pending:       PendingRequests,
  reader_thread: Option<JoinHandle<()>>,
}

impl Connection {
  pub fn new<R, W>(reader: R, writer: W) -> Result<Self, TransportError>
  where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
  {
    let pending = PendingRequests::default();
    let (event_tx, event_rx) = channel();
    let reader_thread = spawn_reader_thread(reader, event_tx, pending.clone())?;

    Ok(Self {
      writer: BufWriter::new(Box::new(writer)),
      event_rx,
      pending,
      reader_thread: Some(reader_thread),
    })
  }

  pub fn stdio() -> Result<Self, TransportError> {
    Self::new(BufReader::new(io::stdin()), io::stdout())
  }

  pub fn pending(&self) -> &PendingRequests {
    &self.pending
  }

  /// Blocks until the next event. A finished reader reads as `Closed`.
  pub fn recv(&self) -> TransportEvent {
    match self.event_rx.recv() {
      Ok(event) => event,
      Err(RecvError) => TransportEvent::Closed,
    }
  }

  pub fn send(&mut self, message: &jsonrpc::Message) -> Result<(), TransportError> {
    if let jsonrpc::Message::Response(response) = message {
      self.pending.finish(&response.id);
    }
    write_frame(&mut self.writer, message)
  }

  /// Joins the reader thread. The reader only stops at end of input, so this
  /// is for streams the caller knows are finished.
  pub fn join(mut self) -> Result<(), TransportError> {
    match self.reader_thread.take() {
      Some(handle) => handle.join().map_err(|_| TransportError::ThreadPanicked),
      None => Ok(()),
    }
  }
}

#[derive(Deserialize)]
struct CancelParamsPayload {
  id: jsonrpc::Id,
}

fn spawn_reader_thread<R>(
  mut reader: R,
  event_tx: Sender<TransportEvent>,
  pending: PendingRequests,
) -> Result<JoinHandle<()>, TransportError>
where
  R: BufRead + Send + 'static,
{
  thread::Builder::new()
    .name("the-scribe-stdin".into())
    .spawn(move || {
      let mut header_buffer = String::new();
      let mut body_buffer = Vec::new();

      loop {
        let event = match read_frame(&mut reader, &mut header_buffer, &mut body_buffer) {
          Ok(Some(message)) => {
            if !observe(&message, &pending) {
              continue;
            }
            TransportEvent::Message(message)
          },
          Ok(None) => {
            let _ = event_tx.send(TransportEvent::Closed);
            break;
          },
          Err(TransportError::ParseJson(err)) => TransportEvent::Malformed(err.to_string()),
          Err(err) => {
            let _ = event_tx.send(TransportEvent::ReadError(err.to_string()));
            break;
          },
        };
        if event_tx.send(event).is_err() {
          break;
        }
      }
    })
    .map_err(TransportError::Spawn)
}

/// Registers requests and applies cancellations. Returns whether the message
/// should be forwarded.
fn observe(message: &jsonrpc::Message, pending: &PendingRequests) -> bool {
  match message {
    jsonrpc::Message::Request(request) => {
      pending.register(request.id.clone());
      true
    },
    jsonrpc::Message::Notification(notification) if notification.method == CANCEL_REQUEST => {
      match notification
        .params
        .clone()
        .map(serde_json::from_value::<CancelParamsPayload>)
      {
        Some(Ok(payload)) => {
          let cancelled = pending.cancel(&payload.id);
          debug!(id = %payload.id, cancelled, "cancel request");
        },
        _ => warn!("malformed $/cancelRequest params"),
      }
      false
    },
    _ => true,
  }
}

pub fn read_frame<R: BufRead>(
  reader: &mut R,
  header_buffer: &mut String,
  body_buffer: &mut Vec<u8>,
) -> Result<Option<jsonrpc::Message>, TransportError> {
  let mut content_length: Option<usize> = None;
  loop {
    header_buffer.clear();
    let read = reader
      .read_line(header_buffer)
      .map_err(TransportError::Read)?;
    if read == 0 {
      return Ok(None);
    }

    if header_buffer == "\r\n" || header_buffer == "\n" {
      if content_length.is_some() {
        break;
      }
      continue;
    }

    let header = header_buffer.trim_end_matches(['\r', '\n']);
    if let Some((name, value)) = header.split_once(':')
      && name.eq_ignore_ascii_case("content-length")
    {
      let value = value.trim();
      let parsed = value
        .parse::<usize>()
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| TransportError::InvalidContentLength(value.to_string()))?;
      content_length = Some(parsed);
    }
  }

  let content_length = content_length.ok_or(TransportError::MissingContentLength)?;
  body_buffer.resize(content_length, 0);
  reader
    .read_exact(body_buffer)
    .map_err(TransportError::ReadBody)?;
  let message = serde_json::from_slice(body_buffer).map_err(TransportError::ParseJson);
  body_buffer.clear();
  message.map(Some)
}

pub fn write_frame<W: Write>(
  writer: &mut W,
  message: &jsonrpc::Message,
) -> Result<(), TransportError> {
  let body = serde_json::to_vec(message).map_err(TransportError::SerializeJson)?;
  write!(writer, "Content-Length: {}\r\n\r\n", body.len()).map_err(TransportError::WriteHeader)?;
  writer.write_all(&body).map_err(TransportError::WriteBody)?;
  writer.flush().map_err(TransportError::Flush)?;
  Ok(())
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("failed to spawn transport thread: {0}")]
  Spawn(io::Error),
  #[error("failed to read frame header: {0}")]
  Read(io::Error),
  #[error("invalid content-length header value: {0}")]
  InvalidContentLength(String),
  #[error("missing content-length header")]
  MissingContentLength,
  #[error("failed to read frame body: {0}")]
  ReadBody(io::Error),
  #[error("failed to parse json-rpc message: {0}")]
  ParseJson(serde_json::Error),
  #[error("failed to serialize json-rpc message: {0}")]
  SerializeJson(serde_json::Error),
  #[error("failed to write frame header: {0}")]
  WriteHeader(io::Error),
  #[error("failed to write frame body: {0}")]
  WriteBody(io::Error),
  #[error("failed to flush frame body: {0}")]
  Flush(io::Error),
  #[error("transport thread panicked")]
  ThreadPanicked,
}
