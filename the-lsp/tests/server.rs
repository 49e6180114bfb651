use std::{
  io::{
    Cursor,
    Write,
  },
  path::PathBuf,
  sync::Arc,
};

use parking_lot::Mutex;
use serde_json::{
  Value,
  json,
};
use the_lsp::{
  Connection,
  Exit,
  Server,
  ServerOptions,
  transport::read_frame,
};

const URI: &str = "file:///tmp/the-scribe/app.js";

const SOURCE: &str = "// Let `elements` be a list.\n\
                      const elements = [];\n\
                      for (const element of elements) {\n\
                      }\n";

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.lock().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

fn request(id: u64, method: &str, params: Value) -> Value {
  json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

fn notification(method: &str, params: Value) -> Value {
  json!({"jsonrpc": "2.0", "method": method, "params": params})
}

fn frame(body: &str) -> String {
  format!("Content-Length: {}\r\n\r\n{body}", body.len())
}

fn initialize(id: u64) -> Value {
  request(
    id,
    "initialize",
    json!({
      "rootUri": null,
      "capabilities": {
        "textDocument": {"completion": {"completionItem": {"snippetSupport": true}}},
        "workspace": {"applyEdit": true},
      },
    }),
  )
}

fn did_open(uri: &str, text: &str) -> Value {
  notification(
    "textDocument/didOpen",
    json!({
      "textDocument": {"uri": uri, "languageId": "javascript", "version": 1, "text": text}
    }),
  )
}

/// Runs a whole session over in-memory streams and returns what the server
/// wrote, one JSON value per frame.
fn session(input: &str) -> (Exit, Vec<Value>) {
  let out = SharedBuf::default();
  let connection = Connection::new(Cursor::new(input.as_bytes().to_vec()), out.clone()).unwrap();
  let options = ServerOptions {
    config_file: Some(PathBuf::from("/nonexistent/the-scribe/config.toml")),
  };
  let exit = Server::new(connection, options).run().unwrap();

  let bytes = out.0.lock().clone();
  let mut reader = Cursor::new(bytes);
  let (mut header, mut body) = (String::new(), Vec::new());
  let mut frames = Vec::new();
  while let Some(message) = read_frame(&mut reader, &mut header, &mut body).unwrap() {
    frames.push(serde_json::to_value(message).unwrap());
  }
  (exit, frames)
}

fn run(messages: &[Value]) -> (Exit, Vec<Value>) {
  let input: String = messages
    .iter()
    .map(|message| frame(&message.to_string()))
    .collect();
  session(&input)
}

fn response(frames: &[Value], id: u64) -> &Value {
  frames
    .iter()
    .find(|frame| frame["id"] == id && frame.get("method").is_none())
    .unwrap_or_else(|| panic!("no response for {id}"))
}

fn new_texts(edit: &Value) -> Vec<String> {
  edit["changes"][URI]
    .as_array()
    .unwrap()
    .iter()
    .map(|edit| edit["newText"].as_str().unwrap().to_string())
    .collect()
}

#[test]
fn full_session() {
  let (exit, frames) = run(&[
    initialize(1),
    notification("initialized", json!({})),
    did_open(URI, SOURCE),
    did_open("file:///tmp/the-scribe/list.js", "items.forE"),
    request(
      2,
      "textDocument/codeAction",
      json!({
        "textDocument": {"uri": URI},
        "range": {"start": {"line": 1, "character": 0}, "end": {"line": 1, "character": 0}},
        "context": {"diagnostics": []},
      }),
    ),
    request(
      3,
      "textDocument/completion",
      json!({
        "textDocument": {"uri": "file:///tmp/the-scribe/list.js"},
        "position": {"line": 0, "character": 10},
      }),
    ),
    request(
      4,
      "textDocument/rename",
      json!({
        "textDocument": {"uri": URI},
        "position": {"line": 1, "character": 8},
        "newName": "values",
      }),
    ),
    request(
      5,
      "workspace/executeCommand",
      json!({"command": "scribe.arrayMethodCallback", "arguments": ["items.forEach"]}),
    ),
    request(
      6,
      "workspace/executeCommand",
      json!({"command": "scribe.insertAnnotations", "arguments": [URI]}),
    ),
    request(7, "textDocument/hover", json!({})),
    request(8, "textDocument/rename", json!({})),
    request(9, "shutdown", Value::Null),
    notification("exit", Value::Null),
  ]);
  assert_eq!(exit, Exit::Clean);

  let init = response(&frames, 1);
  assert_eq!(init["result"]["capabilities"]["renameProvider"], true);
  assert_eq!(init["result"]["serverInfo"]["name"], "the-scribe");

  let actions = response(&frames, 2)["result"].as_array().unwrap();
  let refactors: Vec<&Value> = actions
    .iter()
    .filter(|action| action["kind"] == "refactor.rewrite")
    .collect();
  assert_eq!(refactors.len(), 4);
  for action in &refactors {
    let texts = new_texts(&action["edit"]);
    assert!(texts.iter().all(|text| text.contains("elements")));
  }
  assert!(
    actions
      .iter()
      .any(|action| action["kind"] == "source.insertAnnotations")
  );

  let items = response(&frames, 3)["result"]["items"].as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["label"], "forEach");
  assert_eq!(
    items[0]["textEdit"]["newText"],
    "items.forEach((item) => item$1);"
  );

  let texts = new_texts(&response(&frames, 4)["result"]);
  assert!(texts.iter().any(|text| text == "// Let `values` be a list."));
  assert!(texts.iter().any(|text| text == "values"));
  assert!(texts.iter().any(|text| text == "value"));

  assert_eq!(response(&frames, 5)["result"], "(item => item);");

  let apply = frames
    .iter()
    .find(|frame| frame["method"] == "workspace/applyEdit")
    .unwrap();
  let texts = new_texts(&apply["params"]["edit"]);
  assert_eq!(texts, ["// For each `element` of `elements`.\n"]);
  assert_eq!(response(&frames, 6)["result"], Value::Null);

  assert_eq!(response(&frames, 7)["error"]["code"], -32601);
  assert_eq!(response(&frames, 8)["error"]["code"], -32602);
  assert_eq!(response(&frames, 9)["result"], Value::Null);
}

#[test]
fn incremental_changes_reach_code_actions() {
  let (_, frames) = run(&[
    initialize(1),
    did_open(URI, "let total = 0;\n"),
    notification(
      "textDocument/didChange",
      json!({
        "textDocument": {"uri": URI, "version": 2},
        "contentChanges": [{
          "range": {"start": {"line": 0, "character": 4}, "end": {"line": 0, "character": 9}},
          "text": "isValid",
        }],
      }),
    ),
    request(
      2,
      "textDocument/codeAction",
      json!({
        "textDocument": {"uri": URI},
        "range": {"start": {"line": 0, "character": 0}, "end": {"line": 0, "character": 0}},
        "context": {"diagnostics": [], "only": ["refactor"]},
      }),
    ),
    notification("exit", Value::Null),
  ]);

  let actions = response(&frames, 2)["result"].as_array().unwrap();
  assert_eq!(actions.len(), 1);
  assert_eq!(actions[0]["title"], "Guard on `isValid`");
  assert_eq!(new_texts(&actions[0]["edit"]), ["\nif (isValid) {\n\t\n}"]);
}

#[test]
fn requests_before_initialize_are_rejected() {
  let (exit, frames) = run(&[request(1, "shutdown", Value::Null)]);
  assert_eq!(exit, Exit::Unclean);
  assert_eq!(response(&frames, 1)["error"]["code"], -32002);
}

#[test]
fn malformed_frames_answer_parse_error() {
  let input = [
    frame("{not json"),
    frame(&initialize(1).to_string()),
    frame(&notification("exit", Value::Null).to_string()),
  ]
  .concat();
  let (exit, frames) = session(&input);
  assert_eq!(exit, Exit::Unclean);
  assert_eq!(frames[0]["error"]["code"], -32700);
  assert_eq!(frames[0]["id"], Value::Null);
  assert!(response(&frames, 1)["result"]["capabilities"].is_object());
}

#[test]
fn untracked_languages_get_empty_results() {
  let (_, frames) = run(&[
    initialize(1),
    notification(
      "textDocument/didOpen",
      json!({
        "textDocument": {"uri": URI, "languageId": "rust", "version": 1, "text": "let x = 1;"}
      }),
    ),
    request(
      2,
      "textDocument/completion",
      json!({"textDocument": {"uri": URI}, "position": {"line": 0, "character": 1}}),
    ),
    notification("exit", Value::Null),
  ]);
  assert_eq!(response(&frames, 2)["result"]["items"], json!([]));
}
