//! Integration tests for the multipart upload core, driven against a
//! scripted in-memory storage client with per-part failure injection.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use s3upload::{
    Config, CompletedPartRecord, MultipartSession, ObjectSummary, ObjectUploader, PartStatus,
    PartTag, SessionHandle, SessionState, StorageClient, StorageError, UploadError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Initiate { key: String },
    UploadPart { part_number: i32, len: usize },
    Complete { part_numbers: Vec<i32> },
    Abort,
    Put { key: String, len: usize },
    Get { key: String },
    Delete { key: String },
    List { prefix: String },
}

/// In-memory storage client that records every call and fails scripted
/// part uploads a configured number of times.
#[derive(Default)]
struct MockStore {
    calls: Mutex<Vec<Call>>,
    // remaining injected failures per part number
    part_failures: Mutex<HashMap<i32, u32>>,
    fail_initiate: bool,
    fail_complete: bool,
    fail_abort: bool,
}

impl MockStore {
    fn new() -> Self {
        Self::default()
    }

    fn with_part_failures(self, part_number: i32, failures: u32) -> Self {
        self.part_failures
            .lock()
            .unwrap()
            .insert(part_number, failures);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

#[async_trait]
impl StorageClient for MockStore {
    async fn initiate_multipart(
        &self,
        key: &str,
        _expiry: DateTime<Utc>,
    ) -> Result<SessionHandle, StorageError> {
        self.record(Call::Initiate {
            key: key.to_string(),
        });
        if self.fail_initiate {
            return Err(StorageError::new("CreateMultipartUpload", "access denied"));
        }
        Ok(SessionHandle {
            upload_id: "upload-1".to_string(),
            key: key.to_string(),
        })
    }

    async fn upload_part(
        &self,
        _handle: &SessionHandle,
        part_number: i32,
        data: Bytes,
    ) -> Result<PartTag, StorageError> {
        self.record(Call::UploadPart {
            part_number,
            len: data.len(),
        });
        let mut failures = self.part_failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(&part_number) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::new("UploadPart", "connection reset"));
            }
        }
        Ok(PartTag(format!("etag-{}", part_number)))
    }

    async fn complete_multipart(
        &self,
        _handle: &SessionHandle,
        parts: &[CompletedPartRecord],
    ) -> Result<(), StorageError> {
        self.record(Call::Complete {
            part_numbers: parts.iter().map(|p| p.part_number).collect(),
        });
        if self.fail_complete {
            return Err(StorageError::new(
                "CompleteMultipartUpload",
                "InvalidPart: tag mismatch",
            ));
        }
        Ok(())
    }

    async fn abort_multipart(&self, _handle: &SessionHandle) -> Result<(), StorageError> {
        self.record(Call::Abort);
        if self.fail_abort {
            return Err(StorageError::new("AbortMultipartUpload", "expired"));
        }
        Ok(())
    }

    async fn put_object(&self, key: &str, data: Bytes) -> Result<(), StorageError> {
        self.record(Call::Put {
            key: key.to_string(),
            len: data.len(),
        });
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StorageError> {
        self.record(Call::Get {
            key: key.to_string(),
        });
        Ok(Bytes::from_static(b"payload"))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.record(Call::Delete {
            key: key.to_string(),
        });
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        self.record(Call::List {
            prefix: prefix.to_string(),
        });
        Ok(vec![])
    }
}

/// Config with a small part size so tests work on byte-scale payloads
fn test_config(part_size: usize) -> Config {
    let mut config = Config::default();
    config.upload.part_size_bytes = part_size;
    config
}

fn payload(len: usize) -> Bytes {
    Bytes::from(vec![0xabu8; len])
}

#[tokio::test]
async fn all_parts_succeed_then_complete_in_order() {
    init_tracing();
    let store = Arc::new(MockStore::new());
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    // 12 bytes with 5-byte parts mirrors the 12 MiB / 5 MiB scenario
    session.run(payload(12)).await.unwrap();

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(
        store.calls(),
        vec![
            Call::Initiate {
                key: "obj/key".to_string()
            },
            Call::UploadPart {
                part_number: 1,
                len: 5
            },
            Call::UploadPart {
                part_number: 2,
                len: 5
            },
            Call::UploadPart {
                part_number: 3,
                len: 2
            },
            Call::Complete {
                part_numbers: vec![1, 2, 3]
            },
        ]
    );
    assert!(session
        .parts()
        .iter()
        .all(|p| p.status == PartStatus::Uploaded && p.tag.is_some()));
}

#[tokio::test]
async fn retry_exhaustion_boundary_is_recoverable() {
    init_tracing();
    // retry budget 2: exactly 2 failures still succeed on the third attempt
    let store = Arc::new(MockStore::new().with_part_failures(2, 2));
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    session.run(payload(12)).await.unwrap();

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(
        store.count(|c| matches!(c, Call::UploadPart { part_number: 2, .. })),
        3
    );
    assert_eq!(store.count(|c| matches!(c, Call::Complete { .. })), 1);
    assert_eq!(store.count(|c| matches!(c, Call::Abort)), 0);
}

#[tokio::test]
async fn part_failure_aborts_session_once() {
    init_tracing();
    // 3 failures exceed the budget of 2
    let store = Arc::new(MockStore::new().with_part_failures(2, 3));
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    let err = session.run(payload(12)).await.unwrap_err();

    match err {
        UploadError::PartUploadFailed {
            part_number,
            attempts,
            abort_error,
            ..
        } => {
            assert_eq!(part_number, 2);
            assert_eq!(attempts, 3);
            assert!(abort_error.is_none());
        }
        other => panic!("expected PartUploadFailed, got {:?}", other),
    }

    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(store.count(|c| matches!(c, Call::Abort)), 1);
    assert_eq!(store.count(|c| matches!(c, Call::Complete { .. })), 0);
    // part 3 was never attempted
    assert_eq!(
        store.count(|c| matches!(c, Call::UploadPart { part_number: 3, .. })),
        0
    );
    assert_eq!(session.parts()[0].status, PartStatus::Uploaded);
    assert_eq!(session.parts()[1].status, PartStatus::Failed);
    assert_eq!(session.parts()[2].status, PartStatus::Pending);
}

#[tokio::test]
async fn abort_failure_is_surfaced_as_secondary_diagnostic() {
    init_tracing();
    let mut store = MockStore::new().with_part_failures(1, 3);
    store.fail_abort = true;
    let store = Arc::new(store);
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    let err = session.run(payload(12)).await.unwrap_err();

    match err {
        UploadError::PartUploadFailed {
            part_number,
            abort_error,
            ..
        } => {
            assert_eq!(part_number, 1);
            let abort_error = abort_error.expect("abort failure should be attached");
            assert_eq!(abort_error.operation, "AbortMultipartUpload");
        }
        other => panic!("expected PartUploadFailed, got {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Aborted);
}

#[tokio::test]
async fn terminal_session_rejects_reuse_without_store_calls() {
    init_tracing();
    let store = Arc::new(MockStore::new());
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    session.run(payload(12)).await.unwrap();
    let calls_before = store.calls().len();

    let err = session.run(payload(12)).await.unwrap_err();
    assert!(matches!(
        err,
        UploadError::InvalidState {
            state: SessionState::Completed
        }
    ));
    assert_eq!(store.calls().len(), calls_before);

    // aborted sessions are just as dead
    let store2 = Arc::new(MockStore::new().with_part_failures(1, 3));
    let mut session2 = MultipartSession::new(store2.clone(), &config.upload, "obj/key");
    session2.run(payload(12)).await.unwrap_err();
    let calls_before = store2.calls().len();
    let err = session2.run(payload(12)).await.unwrap_err();
    assert!(matches!(
        err,
        UploadError::InvalidState {
            state: SessionState::Aborted
        }
    ));
    assert_eq!(store2.calls().len(), calls_before);
}

#[tokio::test]
async fn caller_abort_releases_the_session() {
    init_tracing();
    let store = Arc::new(MockStore::new());
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    session.initiate().await.unwrap();
    session.abort().await.unwrap();

    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(store.count(|c| matches!(c, Call::Abort)), 1);
    assert!(matches!(
        session.run(payload(12)).await.unwrap_err(),
        UploadError::InvalidState { .. }
    ));

    // aborting a session that was never opened is a caller bug
    let mut fresh = MultipartSession::new(store.clone(), &config.upload, "obj/key2");
    assert!(matches!(
        fresh.abort().await.unwrap_err(),
        UploadError::InvalidState { .. }
    ));
}

#[tokio::test]
async fn initiation_failure_is_fatal_and_unretried() {
    init_tracing();
    let mut store = MockStore::new();
    store.fail_initiate = true;
    let store = Arc::new(store);
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    let err = session.run(payload(12)).await.unwrap_err();
    assert!(matches!(err, UploadError::Initiation { .. }));
    assert_eq!(store.count(|c| matches!(c, Call::Initiate { .. })), 1);
    assert_eq!(store.count(|c| matches!(c, Call::UploadPart { .. })), 0);
}

#[tokio::test]
async fn completion_rejection_is_fatal() {
    init_tracing();
    let mut store = MockStore::new();
    store.fail_complete = true;
    let store = Arc::new(store);
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    let err = session.run(payload(12)).await.unwrap_err();
    assert!(matches!(err, UploadError::Completion(_)));
    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(store.count(|c| matches!(c, Call::Complete { .. })), 1);
    // completion rejection does not trigger the abort call
    assert_eq!(store.count(|c| matches!(c, Call::Abort)), 0);
}

#[tokio::test]
async fn small_objects_take_the_direct_put_path() {
    init_tracing();
    let store = Arc::new(MockStore::new());
    let uploader = ObjectUploader::new(store.clone(), test_config(5));

    // at the threshold: still direct put
    uploader.upload_object("small", payload(5)).await.unwrap();
    // empty payloads too
    uploader.upload_object("empty", payload(0)).await.unwrap();

    assert_eq!(
        store.calls(),
        vec![
            Call::Put {
                key: "small".to_string(),
                len: 5
            },
            Call::Put {
                key: "empty".to_string(),
                len: 0
            },
        ]
    );
}

#[tokio::test]
async fn large_objects_take_the_multipart_path() {
    init_tracing();
    let store = Arc::new(MockStore::new());
    let uploader = ObjectUploader::new(store.clone(), test_config(5));

    uploader.upload_object("large", payload(6)).await.unwrap();

    assert_eq!(store.count(|c| matches!(c, Call::Put { .. })), 0);
    assert_eq!(store.count(|c| matches!(c, Call::UploadPart { .. })), 2);
    assert_eq!(store.count(|c| matches!(c, Call::Complete { .. })), 1);
}

#[tokio::test]
async fn part_limit_is_enforced_before_any_store_call() {
    init_tracing();
    let store = Arc::new(MockStore::new());
    let config = test_config(1);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    let err = session.run(payload(10_001)).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidRequest(_)));
    // rejected outright: no session was opened on the server
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn empty_multipart_payload_is_rejected_before_any_store_call() {
    init_tracing();
    let store = Arc::new(MockStore::new());
    let config = test_config(5);
    let mut session = MultipartSession::new(store.clone(), &config.upload, "obj/key");

    let err = session.run(payload(0)).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidRequest(_)));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn simple_operations_delegate_to_the_client() {
    init_tracing();
    let store = Arc::new(MockStore::new());
    let uploader = ObjectUploader::new(store.clone(), test_config(5));

    let body = uploader.get_object("a").await.unwrap();
    assert_eq!(body, Bytes::from_static(b"payload"));
    uploader.delete_object("a").await.unwrap();
    assert!(uploader.list_objects("pre/").await.unwrap().is_empty());

    assert_eq!(
        store.calls(),
        vec![
            Call::Get {
                key: "a".to_string()
            },
            Call::Delete {
                key: "a".to_string()
            },
            Call::List {
                prefix: "pre/".to_string()
            },
        ]
    );
}

#[test]
fn object_url_prefers_configured_base() {
    let mut config = test_config(5);
    config.storage.bucket = "blog-static".to_string();
    config.storage.public_base_url = Some("https://cdn.example.com/".to_string());
    let uploader = ObjectUploader::new(Arc::new(MockStore::new()), config);
    assert_eq!(
        uploader.object_url("img/a.png"),
        "https://cdn.example.com/img/a.png"
    );

    let mut config = test_config(5);
    config.storage.bucket = "blog-static".to_string();
    let uploader = ObjectUploader::new(Arc::new(MockStore::new()), config);
    assert_eq!(
        uploader.object_url("img/a.png"),
        "https://blog-static.s3.us-east-1.amazonaws.com/img/a.png"
    );
}
