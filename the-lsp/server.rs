//! Request dispatch for the stdio language server.
//!
//! Messages are handled one at a time in arrival order. The only concurrency
//! is the transport's reader thread flipping cancel tokens underneath a
//! running handler.

use std::{
  collections::HashMap,
  path::PathBuf,
};

use serde::de::DeserializeOwned;
use serde_json::{
  Value,
  json,
};
use the_lib::{
  annotate,
  cancel::CancelToken,
  completion,
  document::Document,
  provider::DeclarationSymbols,
  refactor,
  scaffold,
  transaction::Transaction,
};
use thiserror::Error;
use tracing::{
  debug,
  info,
  warn,
};

use crate::{
  capabilities::{
    ClientCapabilities,
    ClientCapability,
    server_capabilities,
  },
  command::{
    CommandError,
    ScribeCommand,
  },
  config::ServerConfig,
  editing::{
    self,
    ANNOTATE_KIND,
    CodeActionParams,
    DidChangeParams,
    DidCloseParams,
    DidOpenParams,
    ExecuteCommandParams,
    InitializeParams,
    REFACTOR_KIND,
    RenameParams,
    TextDocumentPositionParams,
  },
  jsonrpc::{
    self,
    Id,
    Message,
    code,
  },
  rename::{
    self,
    RenameError,
  },
  text_sync::{
    apply_content_changes,
    path_for_file_uri,
    to_position,
  },
  transport::{
    Connection,
    TransportError,
    TransportEvent,
  },
};

#[derive(Debug, Error)]
pub enum ServerError {
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error("input stream failed: {0}")]
  Read(String),
}

/// Why a request failed, mapped onto a JSON-RPC error code.
#[derive(Debug, Error)]
enum RequestError {
  #[error("invalid params: {0}")]
  InvalidParams(String),
  #[error("unhandled method {0}")]
  MethodNotFound(String),
  #[error("{0}")]
  Internal(String),
}

impl RequestError {
  fn code(&self) -> i64 {
    match self {
      Self::InvalidParams(_) => code::INVALID_PARAMS,
      Self::MethodNotFound(_) => code::METHOD_NOT_FOUND,
      Self::Internal(_) => code::INTERNAL_ERROR,
    }
  }

  fn internal(err: impl std::fmt::Display) -> Self {
    Self::Internal(err.to_string())
  }
}

impl From<CommandError> for RequestError {
  fn from(err: CommandError) -> Self {
    Self::InvalidParams(err.to_string())
  }
}

impl From<RenameError> for RequestError {
  fn from(err: RenameError) -> Self {
    match err {
      RenameError::NoIdentifier(_) | RenameError::InvalidName(_) => {
        Self::InvalidParams(err.to_string())
      },
      err => Self::internal(err),
    }
  }
}

type RequestResult = Result<Value, RequestError>;

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
  /// Replaces the user config file when set.
  pub config_file: Option<PathBuf>,
}

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
  /// `exit` after `shutdown`.
  Clean,
  /// `exit` without `shutdown`, or the client went away.
  Unclean,
}

pub struct Server {
  connection:         Connection,
  options:            ServerOptions,
  config:             ServerConfig,
  client:             ClientCapabilities,
  documents:          HashMap<String, Document>,
  initialized:        bool,
  shutdown_requested: bool,
  next_request_id:    u64,
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, RequestError> {
  serde_json::from_value(params.unwrap_or(Value::Null))
    .map_err(|err| RequestError::InvalidParams(err.to_string()))
}

impl Server {
  pub fn new(connection: Connection, options: ServerOptions) -> Self {
    Self {
      connection,
      options,
      config: ServerConfig::default(),
      client: ClientCapabilities::default(),
      documents: HashMap::new(),
      initialized: false,
      shutdown_requested: false,
      next_request_id: 0,
    }
  }

  pub fn config(&self) -> &ServerConfig {
    &self.config
  }

  pub fn run(mut self) -> Result<Exit, ServerError> {
    loop {
      match self.connection.recv() {
        TransportEvent::Message(Message::Request(request)) => {
          let response = self.handle_request(request);
          self.connection.send(&response)?;
        },
        TransportEvent::Message(Message::Notification(notification)) => {
          if notification.method == "exit" {
            info!(clean = self.shutdown_requested, "exit");
            return Ok(if self.shutdown_requested {
              Exit::Clean
            } else {
              Exit::Unclean
            });
          }
          self.handle_notification(&notification.method, notification.params);
        },
        TransportEvent::Message(Message::Response(response)) => {
          debug!(id = %response.id, error = response.is_error(), "client response");
        },
        TransportEvent::Malformed(err) => {
          warn!(%err, "malformed message");
          let response = Message::response_err(Id::Null, code::PARSE_ERROR, err);
          self.connection.send(&response)?;
        },
        TransportEvent::ReadError(err) => return Err(ServerError::Read(err)),
        TransportEvent::Closed => {
          info!("input closed");
          return Ok(Exit::Unclean);
        },
      }
    }
  }

  fn handle_request(&mut self, request: jsonrpc::Request) -> Message {
    let jsonrpc::Request {
      id, method, params, ..
    } = request;

    if !self.initialized && method != "initialize" {
      return Message::response_err(id, code::SERVER_NOT_INITIALIZED, "server not initialized");
    }
    if self.shutdown_requested {
      return Message::response_err(id, code::INVALID_REQUEST, "server is shutting down");
    }

    let cancel = self.connection.pending().token(&id);
    let result = match method.as_str() {
      "initialize" => self.initialize(params),
      "shutdown" => {
        self.shutdown_requested = true;
        Ok(Value::Null)
      },
      "textDocument/codeAction" => self.code_action(params),
      "textDocument/completion" => self.completion(params, &cancel),
      "textDocument/rename" => self.rename(params),
      "workspace/executeCommand" => self.execute_command(params),
      _ => Err(RequestError::MethodNotFound(method.clone())),
    };

    // A cancelled completion already answered with an empty list.
    if cancel.is_cancelled() && method != "textDocument/completion" {
      debug!(%id, method = %method, "request cancelled");
      return Message::response_err(id, code::REQUEST_CANCELLED, "request cancelled");
    }
    match result {
      Ok(value) => Message::response_ok(id, value),
      Err(err) => {
        warn!(%id, method = %method, %err, "request failed");
        Message::response_err(id, err.code(), err.to_string())
      },
    }
  }

  fn handle_notification(&mut self, method: &str, params: Option<Value>) {
    let result = match method {
      "initialized" => {
        info!("client initialized");
        Ok(())
      },
      "textDocument/didOpen" => self.did_open(params),
      "textDocument/didChange" => self.did_change(params),
      "textDocument/didClose" => self.did_close(params),
      _ => {
        debug!(method, "ignoring notification");
        Ok(())
      },
    };
    if let Err(err) = result {
      warn!(method, %err, "notification failed");
    }
  }

  fn initialize(&mut self, params: Option<Value>) -> RequestResult {
    if self.initialized {
      return Err(RequestError::InvalidParams("initialize sent twice".into()));
    }
    let params: InitializeParams = parse_params(params)?;
    let root = params
      .root_uri
      .as_deref()
      .and_then(path_for_file_uri)
      .or_else(|| params.root_path.as_ref().map(PathBuf::from))
      .map(|root| the_loader::find_workspace_in(root).0);

    let config_file = self.options.config_file.as_deref();
    let file = match the_loader::config::load_config(root.as_deref(), config_file) {
      Ok(file) => file,
      Err(err) => {
        warn!(err = %format!("{err:#}"), "failed to load config files, using defaults");
        toml::Value::Table(toml::Table::new())
      },
    };
    self.config = ServerConfig::resolve(file, params.initialization_options.as_ref())
      .unwrap_or_else(|err| {
        warn!(%err, "invalid configuration, using defaults");
        ServerConfig::default()
      });
    self.client = ClientCapabilities::from_raw(params.capabilities);
    self.initialized = true;
    info!(root = ?root, comment_token = %self.config.comment_token, "initialized");

    Ok(json!({
      "capabilities": server_capabilities(),
      "serverInfo": {
        "name": "the-scribe",
        "version": env!("CARGO_PKG_VERSION"),
      },
    }))
  }

  fn did_open(&mut self, params: Option<Value>) -> Result<(), RequestError> {
    let params: DidOpenParams = parse_params(params)?;
    let item = params.text_document;
    if !self.config.handles_language(&item.language_id) {
      debug!(uri = %item.uri, language = %item.language_id, "not tracking document");
      return Ok(());
    }
    debug!(uri = %item.uri, version = item.version, "open");
    let doc = Document::from(item.text.as_str()).with_version(item.version);
    self.documents.insert(item.uri, doc);
    Ok(())
  }

  fn did_change(&mut self, params: Option<Value>) -> Result<(), RequestError> {
    let params: DidChangeParams = parse_params(params)?;
    let uri = params.text_document.uri;
    let Some(doc) = self.documents.get_mut(&uri) else {
      return Ok(());
    };
    apply_content_changes(doc, &params.content_changes).map_err(RequestError::internal)?;
    if let Some(version) = params.text_document.version {
      doc.set_version(version);
    }
    debug!(uri = %uri, version = doc.version(), "change");
    Ok(())
  }

  fn did_close(&mut self, params: Option<Value>) -> Result<(), RequestError> {
    let params: DidCloseParams = parse_params(params)?;
    self.documents.remove(&params.text_document.uri);
    Ok(())
  }

  fn code_action(&mut self, params: Option<Value>) -> RequestResult {
    let params: CodeActionParams = parse_params(params)?;
    let uri = params.text_document.uri.as_str();
    let Some(doc) = self.documents.get(uri) else {
      return Ok(json!([]));
    };

    let mut actions = Vec::new();
    if self.config.features.refactor && params.context.admits(REFACTOR_KIND) {
      let row = to_position(doc.text(), params.range.start).row;
      for candidate in refactor::resolve(doc, row).map_err(RequestError::internal)? {
        let transaction = Transaction::change(doc.text(), [candidate.to_change(doc)])
          .map_err(RequestError::internal)?;
        let edit = editing::workspace_edit(uri, doc.text(), &transaction);
        actions.push(editing::code_action(&candidate.label, REFACTOR_KIND, edit, false));
      }
    }
    if self.config.features.annotations && params.context.admits(ANNOTATE_KIND) {
      let transaction = annotate::insert_annotations(doc, &self.config.comment_token)
        .map_err(RequestError::internal)?;
      if !transaction.is_empty() {
        let edit = editing::workspace_edit(uri, doc.text(), &transaction);
        actions.push(editing::code_action("Insert annotations", ANNOTATE_KIND, edit, false));
      }
    }

    debug!(uri, count = actions.len(), "code actions");
    Ok(Value::Array(actions))
  }

  fn completion(&mut self, params: Option<Value>, cancel: &CancelToken) -> RequestResult {
    let params: TextDocumentPositionParams = parse_params(params)?;
    let uri = params.text_document.uri.as_str();
    let Some(doc) = self
      .documents
      .get(uri)
      .filter(|_| self.config.features.completion)
    else {
      return Ok(editing::completion_list(Vec::new()));
    };

    let at = to_position(doc.text(), params.position);
    let candidates =
      completion::resolve(doc, at, &DeclarationSymbols, cancel).map_err(RequestError::internal)?;
    let snippets = self.client.supports(ClientCapability::SnippetCompletion);
    let items = candidates
      .iter()
      .map(|candidate| editing::completion_item(doc.text(), candidate, snippets))
      .collect();
    Ok(editing::completion_list(items))
  }

  fn rename(&mut self, params: Option<Value>) -> RequestResult {
    let params: RenameParams = parse_params(params)?;
    let uri = params.text_document.uri.as_str();
    let Some(doc) = self.documents.get(uri) else {
      return Ok(Value::Null);
    };

    let at = to_position(doc.text(), params.position);
    let outcome = rename::rename(doc, at, &params.new_name, &self.config)?;
    info!(
      uri,
      new_name = %params.new_name,
      rewrites = outcome.rewrites,
      cascades = outcome.cascades,
      "rename"
    );
    Ok(editing::workspace_edit(uri, doc.text(), &outcome.transaction))
  }

  fn execute_command(&mut self, params: Option<Value>) -> RequestResult {
    let params: ExecuteCommandParams = parse_params(params)?;
    let command = ScribeCommand::parse(&params.command, &params.arguments)?;
    debug!(command = command.name(), "execute command");

    match command {
      ScribeCommand::InsertAnnotations { uri } => {
        let Some(doc) = self.documents.get(&uri) else {
          return Ok(Value::Null);
        };
        let transaction = annotate::insert_annotations(doc, &self.config.comment_token)
          .map_err(RequestError::internal)?;
        let edit = editing::workspace_edit(&uri, doc.text(), &transaction);
        self.apply_edit("Insert annotations", edit)
      },
      ScribeCommand::SyncAnnotations { uri, old, new } => {
        let Some(doc) = self.documents.get(&uri) else {
          return Ok(Value::Null);
        };
        let outcome = rename::sync_annotations(doc, &old, &new, &self.config)?;
        let edit = editing::workspace_edit(&uri, doc.text(), &outcome.transaction);
        self.apply_edit("Synchronize annotations", edit)
      },
      ScribeCommand::GenerateUnitTest { text } => Ok(json!(scaffold::unit_test(&text))),
      ScribeCommand::ArrayMethodCallback { text } => {
        Ok(json!(scaffold::array_method_callback(&text)))
      },
      ScribeCommand::DeclarationAnnotation { text } => {
        Ok(json!(scaffold::declaration_annotation(
          &text,
          &self.config.comment_token
        )))
      },
    }
  }

  /// Asks the client to apply `edit`. Clients that cannot apply edits get the
  /// edit back as the command result.
  fn apply_edit(&mut self, label: &str, edit: Value) -> RequestResult {
    if !self.client.supports(ClientCapability::ApplyEdit) {
      return Ok(edit);
    }
    self.next_request_id += 1;
    let request = Message::request(
      self.next_request_id,
      "workspace/applyEdit",
      Some(editing::apply_edit_params(label, edit)),
    );
    self.connection.send(&request).map_err(RequestError::internal)?;
    Ok(Value::Null)
  }
}
