//! Scripted in-memory transport for tests. No network involved.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::Transport;
use super::error::TransportError;

/// One recorded `send_form` invocation.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub method: String,
    pub form: Vec<(String, String)>,
}

enum Scripted {
    Body(Value),
    TransportFailure,
}

/// Transport fake: per-method response scripts with sensible defaults, plus
/// full call recording (methods, form params, virtual timestamps).
pub(crate) struct FakeTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    upload_scripts: Mutex<VecDeque<Result<Value, u16>>>,
    calls: Mutex<Vec<RecordedCall>>,
    call_times: Mutex<Vec<tokio::time::Instant>>,
    uploads: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            upload_scripts: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            call_times: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Queues a raw JSON body for the next call to `method`.
    pub fn script(&self, method: &str, body: Value) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(Scripted::Body(body));
    }

    /// Queues a provider error envelope for the next call to `method`.
    pub fn script_error(&self, method: &str, code: i64, message: &str) {
        self.script(
            method,
            json!({
                "error": {
                    "error_code": code,
                    "error_msg": message,
                    "request_params": []
                }
            }),
        );
    }

    /// Queues a transport-level failure for the next call to `method`.
    pub fn script_transport_failure(&self, method: &str) {
        self.scripts
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(Scripted::TransportFailure);
    }

    /// Queues a raw JSON body for the next upload.
    pub fn script_upload(&self, body: Value) {
        self.upload_scripts.lock().unwrap().push_back(Ok(body));
    }

    /// Queues a non-2xx status for the next upload.
    pub fn script_upload_failure(&self, status: u16) {
        self.upload_scripts.lock().unwrap().push_back(Err(status));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_times(&self) -> Vec<tokio::time::Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn methods_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.method.clone())
            .collect()
    }

    pub fn count_calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Returns the recorded form of the `index`-th call to `method`.
    pub fn form_of(&self, method: &str, index: usize) -> Option<Vec<(String, String)>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .nth(index)
            .map(|c| c.form.clone())
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    /// Minimal plausible payload for any method that was not scripted, so
    /// happy-path tests only script the calls they care about.
    fn default_body(method: &str) -> Value {
        match method {
            "groups.create" => json!({"response": {"id": 123}}),
            "photos.getOwnerPhotoUploadServer" | "photos.getOwnerCoverPhotoUploadServer" => {
                json!({"response": {"upload_url": "https://upload.vk.test/1"}})
            }
            "wall.post" => json!({"response": {"post_id": 1}}),
            "board.addTopic" => json!({"response": {"topic_id": 1}}),
            "market.add" => json!({"response": {"market_item_id": 1}}),
            _ => json!({"response": 1}),
        }
    }

    fn method_from_url(url: &str) -> String {
        url.rsplit("/method/")
            .next()
            .unwrap_or(url)
            .to_string()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<Value, TransportError> {
        let method = Self::method_from_url(url);
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.clone(),
            form: form.to_vec(),
        });
        self.call_times.lock().unwrap().push(tokio::time::Instant::now());

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&method)
            .and_then(|queue| queue.pop_front());

        match scripted {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::TransportFailure) => Err(TransportError::Status(503)),
            None => Ok(Self::default_body(&method)),
        }
    }

    async fn upload(
        &self,
        url: &str,
        _field_name: &str,
        _bytes: Vec<u8>,
    ) -> Result<Value, TransportError> {
        self.uploads.lock().unwrap().push(url.to_string());

        let scripted = self.upload_scripts.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(body)) => Ok(body),
            Some(Err(status)) => Err(TransportError::Status(status)),
            None => Ok(json!({"server": 1, "photo": "[]", "hash": "hash"})),
        }
    }
}
