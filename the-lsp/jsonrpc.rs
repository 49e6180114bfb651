use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Value;

/// Error codes used in responses.
pub mod code {
  pub const PARSE_ERROR: i64 = -32700;
  pub const INVALID_REQUEST: i64 = -32600;
  pub const METHOD_NOT_FOUND: i64 = -32601;
  pub const INVALID_PARAMS: i64 = -32602;
  pub const INTERNAL_ERROR: i64 = -32603;
  pub const SERVER_NOT_INITIALIZED: i64 = -32002;
  pub const REQUEST_CANCELLED: i64 = -32800;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
  #[default]
  #[serde(rename = "2.0")]
  V2,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
  Null,
  Number(u64),
  String(String),
}

impl std::fmt::Display for Id {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Null => f.write_str("null"),
      Self::Number(id) => write!(f, "{id}"),
      Self::String(id) => f.write_str(id),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
  #[serde(default)]
  pub jsonrpc: Version,
  pub id:      Id,
  pub method:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub params:  Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  #[serde(default)]
  pub jsonrpc: Version,
  pub method:  String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub params:  Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
  pub code:    i64,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
  #[serde(default)]
  pub jsonrpc: Version,
  pub id:      Id,
  /// Serialized as `null` on success so a void result is still a result.
  #[serde(default)]
  pub result:  Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error:   Option<ResponseError>,
}

impl Response {
  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
  Request(Request),
  Notification(Notification),
  Response(Response),
}

impl Message {
  pub fn request(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
    Self::Request(Request {
      jsonrpc: Version::V2,
      id: Id::Number(id),
      method: method.into(),
      params,
    })
  }

  pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
    Self::Notification(Notification {
      jsonrpc: Version::V2,
      method: method.into(),
      params,
    })
  }

  pub fn response_ok(id: Id, result: Value) -> Self {
    Self::Response(Response {
      jsonrpc: Version::V2,
      id,
      result: Some(result),
      error: None,
    })
  }

  pub fn response_err(id: Id, code: i64, message: impl Into<String>) -> Self {
    Self::Response(Response {
      jsonrpc: Version::V2,
      id,
      result: None,
      error: Some(ResponseError {
        code,
        message: message.into(),
        data: None,
      }),
    })
  }

  pub fn id(&self) -> Option<&Id> {
    match self {
      Self::Request(request) => Some(&request.id),
      Self::Response(response) => Some(&response.id),
      Self::Notification(_) => None,
    }
  }
}
