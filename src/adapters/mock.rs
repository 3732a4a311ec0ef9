use std::{
    collections::{BTreeMap, BTreeSet},
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::SystemTime,
};

use crate::{adapters, model, util};

#[derive(Clone, Debug)]
struct MockObject {
    data: Vec<u8>,
    modified_time: Option<SystemTime>,
}

/// In-memory bucket. Keys are stored as wire keys, so `/a/b` and `a/b` name
/// the same object. Every store call is counted and get requests record the
/// key they were asked for.
#[derive(Default)]
pub struct MockClient {
    objects: BTreeMap<String, MockObject>,
    head_error: Option<String>,
    list_error: Option<String>,
    get_error: Option<String>,
    omit_content_length: bool,
    head_calls: AtomicUsize,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    requested_keys: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, key: &str, data: &[u8], modified_time: Option<SystemTime>) -> Self {
        self.objects.insert(
            util::object::wire_key(key).to_string(),
            MockObject {
                data: data.to_vec(),
                modified_time,
            },
        );
        self
    }

    pub fn with_head_error(mut self, message: &str) -> Self {
        self.head_error = Some(message.to_string());
        self
    }

    pub fn with_list_error(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    pub fn with_get_error(mut self, message: &str) -> Self {
        self.get_error = Some(message.to_string());
        self
    }

    pub fn without_content_length(mut self) -> Self {
        self.omit_content_length = true;
        self
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn store_calls(&self) -> usize {
        self.head_calls() + self.list_calls() + self.get_calls()
    }

    pub fn requested_keys(&self) -> Vec<String> {
        self.requested_keys
            .lock()
            .expect("failed to acquire `requested_keys` guard")
            .clone()
    }
}

impl adapters::Object for MockClient {
    fn fs_head_bucket(&self, _bucket: &str) -> Result<(), model::fs::FSError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);

        match &self.head_error {
            Some(message) => Err(model::fs::FSError {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn fs_list_objects(
        &self,
        _bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> Result<model::fs::FSListing, model::fs::FSError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.list_error {
            return Err(model::fs::FSError {
                message: message.clone(),
            });
        }

        let mut prefixes = BTreeSet::new();
        let mut objects = Vec::new();
        for (key, obj) in self.objects.range(prefix.to_string()..) {
            let rest = match key.strip_prefix(prefix) {
                None => break,
                Some(rest) => rest,
            };

            match rest.find(delimiter) {
                Some(pos) if !delimiter.is_empty() => {
                    prefixes.insert(format!("{}{}", prefix, &rest[..pos + delimiter.len()]));
                }
                _ => objects.push(model::fs::FSObject {
                    key: key.clone(),
                    size: obj.data.len() as u64,
                    modified_time: obj.modified_time,
                }),
            }
        }

        Ok(model::fs::FSListing {
            prefixes: prefixes.into_iter().collect(),
            objects,
        })
    }

    fn fs_get_object(
        &self,
        _bucket: &str,
        key: &str,
    ) -> Result<Option<model::fs::FSObjectBody>, model::fs::FSError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.requested_keys
            .lock()
            .expect("failed to acquire `requested_keys` guard")
            .push(key.to_string());

        if let Some(message) = &self.get_error {
            return Err(model::fs::FSError {
                message: message.clone(),
            });
        }

        let obj = match self.objects.get(util::object::wire_key(key)) {
            None => return Ok(None),
            Some(obj) => obj,
        };

        Ok(Some(model::fs::FSObjectBody {
            body: Box::new(Cursor::new(obj.data.clone())),
            content_length: if self.omit_content_length {
                None
            } else {
                Some(obj.data.len() as u64)
            },
            last_modified: obj.modified_time,
        }))
    }
}
