use std::collections::BTreeMap;
use std::io::Read as _;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const TOKEN: &str = "4242:stub-token";
pub const CHANNEL_ID: i64 = -100_777;
pub const ADMIN_ID: i64 = 42;

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub reply_markup: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub caption: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct StubState {
    next_message_id: i64,
    next_file_id: u64,
    /// Channel messages as Telegram would show them (entities stripped).
    pub channel: BTreeMap<i64, String>,
    /// Pinned message ids, oldest first. Channels keep several pins.
    pub pinned: Vec<i64>,
    pub sent: Vec<SentMessage>,
    pub files: BTreeMap<String, StoredFile>,
    pub methods: Vec<String>,
    pub fail_edits: bool,
}

impl StubState {
    /// The pin `getChat` reports: the most recent one still standing.
    pub fn newest_pin(&self) -> Option<i64> {
        self.pinned.last().copied()
    }
}

/// Minimal Bot API server: keeps channel messages, pins and uploaded files
/// in memory and records every call.
pub struct TelegramStub {
    pub api_base: String,
    state: Arc<Mutex<StubState>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TelegramStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start telegram stub server");
        let api_base = format!("http://{}", server.server_addr());
        let state = Arc::new(Mutex::new(StubState {
            next_message_id: 100,
            ..StubState::default()
        }));

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let thread_state = Arc::clone(&state);
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                let content_type = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Content-Type"))
                    .map(|h| h.value.as_str().to_owned())
                    .unwrap_or_default();
                let mut body = Vec::new();
                if request.as_reader().read_to_end(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let mut state = thread_state.lock().expect("stub state");
                let response = route(&mut state, &path, &content_type, &body);
                drop(state);
                let _ = request.respond(response);
            }
        });

        Self {
            api_base,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut StubState) -> T) -> T {
        let mut state = self.state.lock().expect("stub state");
        f(&mut state)
    }

    /// Plants a pinned channel message, as if left by a previous run.
    pub fn seed_pinned(&self, text: &str) -> i64 {
        self.with_state(|state| {
            state.next_message_id += 1;
            let id = state.next_message_id;
            state.channel.insert(id, text.to_owned());
            state.pinned.push(id);
            id
        })
    }

    pub fn pinned_text(&self) -> Option<String> {
        self.with_state(|state| {
            state
                .newest_pin()
                .and_then(|id| state.channel.get(&id).cloned())
        })
    }
}

impl Drop for TelegramStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

type StubResponse = tiny_http::Response<std::io::Cursor<Vec<u8>>>;

fn json_response(status: u16, body: Value) -> StubResponse {
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header)
}

fn ok(result: Value) -> StubResponse {
    json_response(200, json!({ "ok": true, "result": result }))
}

fn bad_request(description: &str) -> StubResponse {
    json_response(
        400,
        json!({ "ok": false, "error_code": 400, "description": format!("Bad Request: {description}") }),
    )
}

fn route(state: &mut StubState, path: &str, content_type: &str, body: &[u8]) -> StubResponse {
    let file_prefix = format!("/file/bot{TOKEN}/");
    if let Some(file_path) = path.strip_prefix(&file_prefix) {
        let file_id = file_path.rsplit('/').next().unwrap_or(file_path);
        return match state.files.get(file_id) {
            Some(file) => tiny_http::Response::from_data(file.bytes.clone()),
            None => tiny_http::Response::from_string("not found").with_status_code(404),
        };
    }

    let method_prefix = format!("/bot{TOKEN}/");
    let Some(method) = path.strip_prefix(&method_prefix) else {
        return json_response(404, json!({ "ok": false, "error_code": 404, "description": "Not Found" }));
    };
    state.methods.push(method.to_owned());

    if method == "sendDocument" {
        return send_document(state, content_type, body);
    }

    let params: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => return bad_request("invalid json"),
    };
    let chat_id = params.get("chat_id").and_then(Value::as_i64);
    let message_id = params.get("message_id").and_then(Value::as_i64);

    match method {
        "deleteWebhook" | "answerCallbackQuery" => ok(json!(true)),
        "getUpdates" => ok(json!([])),
        "sendMessage" => {
            let Some(chat_id) = chat_id else {
                return bad_request("chat_id is required");
            };
            let text = visible_text(&params);
            if text.chars().count() > 4096 {
                return bad_request("message is too long");
            }
            state.next_message_id += 1;
            let id = state.next_message_id;
            if chat_id == CHANNEL_ID {
                state.channel.insert(id, text.clone());
            } else {
                state.sent.push(SentMessage {
                    chat_id,
                    text: text.clone(),
                    reply_markup: params.get("reply_markup").cloned(),
                });
            }
            ok(json!({ "message_id": id, "chat": { "id": chat_id }, "text": text }))
        }
        "editMessageText" => {
            if state.fail_edits {
                return bad_request("message can't be edited");
            }
            let text = visible_text(&params);
            if text.chars().count() > 4096 {
                return bad_request("message is too long");
            }
            match message_id.and_then(|id| state.channel.get_mut(&id)) {
                Some(existing) => {
                    *existing = text.clone();
                    ok(json!({ "message_id": message_id, "chat": { "id": CHANNEL_ID }, "text": text }))
                }
                None => bad_request("message to edit not found"),
            }
        }
        "pinChatMessage" => match message_id {
            Some(id) if state.channel.contains_key(&id) => {
                state.pinned.retain(|pinned| *pinned != id);
                state.pinned.push(id);
                ok(json!(true))
            }
            _ => bad_request("message to pin not found"),
        },
        "unpinChatMessage" => {
            if let Some(id) = message_id
                && state.pinned.contains(&id)
            {
                state.pinned.retain(|pinned| *pinned != id);
                ok(json!(true))
            } else {
                bad_request("message to unpin not found")
            }
        }
        "deleteMessage" => match message_id.and_then(|id| state.channel.remove(&id).map(|_| id)) {
            Some(id) => {
                state.pinned.retain(|pinned| *pinned != id);
                ok(json!(true))
            }
            None => bad_request("message to delete not found"),
        },
        "getChat" => {
            let mut chat = json!({ "id": CHANNEL_ID, "type": "channel" });
            if let Some(id) = state.newest_pin()
                && let Some(text) = state.channel.get(&id)
            {
                chat["pinned_message"] =
                    json!({ "message_id": id, "chat": { "id": CHANNEL_ID }, "text": text });
            }
            ok(chat)
        }
        "getFile" => {
            let file_id = params.get("file_id").and_then(Value::as_str).unwrap_or("");
            if state.files.contains_key(file_id) {
                ok(json!({ "file_id": file_id, "file_path": format!("documents/{file_id}") }))
            } else {
                bad_request("invalid file_id")
            }
        }
        _ => bad_request("method not supported by stub"),
    }
}

/// Text as a chat client would display it: HTML entities parsed away.
fn visible_text(params: &Value) -> String {
    let raw = params.get("text").and_then(Value::as_str).unwrap_or("");
    if params.get("parse_mode").and_then(Value::as_str) != Some("HTML") {
        return raw.to_owned();
    }
    raw.replace("<code>", "")
        .replace("</code>", "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn send_document(state: &mut StubState, content_type: &str, body: &[u8]) -> StubResponse {
    let Some(boundary) = content_type.split("boundary=").nth(1) else {
        return bad_request("expected multipart body");
    };
    let boundary = format!("--{}", boundary.trim_matches('"'));

    let mut chat_id = None;
    let mut caption = String::new();
    let mut document = None;
    for part in split_on(body, boundary.as_bytes()) {
        let Some(header_end) = find(part, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&part[..header_end]).to_string();
        let mut content = &part[header_end + 4..];
        if content.ends_with(b"\r\n") {
            content = &content[..content.len() - 2];
        }
        let Some(name) = header_param(&headers, "name") else {
            continue;
        };
        match name.as_str() {
            "chat_id" => chat_id = String::from_utf8_lossy(content).parse::<i64>().ok(),
            "caption" => caption = String::from_utf8_lossy(content).to_string(),
            "document" => {
                let file_name = header_param(&headers, "filename").unwrap_or_default();
                document = Some((file_name, content.to_vec()));
            }
            _ => {}
        }
    }

    if chat_id != Some(CHANNEL_ID) {
        return bad_request("chat not found");
    }
    let Some((file_name, bytes)) = document else {
        return bad_request("there is no document in the request");
    };
    if file_name.starts_with("reject") {
        return bad_request("file type rejected");
    }

    state.next_file_id += 1;
    state.next_message_id += 1;
    let file_id = format!("file-{}", state.next_file_id);
    state.files.insert(
        file_id.clone(),
        StoredFile {
            file_name: file_name.clone(),
            caption,
            bytes,
        },
    );
    ok(json!({
        "message_id": state.next_message_id,
        "chat": { "id": CHANNEL_ID },
        "document": { "file_id": file_id, "file_name": file_name }
    }))
}

fn header_param(headers: &str, key: &str) -> Option<String> {
    let needle = format!("{key}=\"");
    headers
        .match_indices(&needle)
        .find(|(idx, _)| *idx == 0 || !headers[..*idx].ends_with(|c: char| c.is_alphanumeric()))
        .and_then(|(idx, _)| {
            let rest = &headers[idx + needle.len()..];
            rest.find('"').map(|end| rest[..end].to_owned())
        })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn split_on<'a>(body: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut rest = body;
    while let Some(idx) = find(rest, delimiter) {
        if idx > 0 {
            parts.push(&rest[..idx]);
        }
        rest = &rest[idx + delimiter.len()..];
    }
    parts
}
