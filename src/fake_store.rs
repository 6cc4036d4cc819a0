// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`ClusterStore`] for unit tests.
//!
//! Objects are kept as JSON keyed by kind, namespace and name. Every mutating call is
//! appended to a write log so tests can assert on the exact order and number of
//! writes. Failures can be injected per verb and kind, and deletions of chosen objects
//! can be made to "hang" to simulate foreground deletion.

use crate::errors::StoreError;
use crate::store::{ClusterStore, StoreObject};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

type Key = (String, String, String);

/// One mutating call recorded by the fake store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub verb: &'static str,
    pub kind: String,
    pub name: String,
}

impl Write {
    pub fn new(verb: &'static str, kind: &str, name: &str) -> Self {
        Self {
            verb,
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Default)]
struct State {
    objects: BTreeMap<Key, Value>,
    writes: Vec<Write>,
    failures: HashMap<(&'static str, String), VecDeque<StoreError>>,
    stuck_deletes: HashSet<Key>,
    next_version: u64,
}

impl State {
    fn take_failure(&mut self, verb: &'static str, kind: &str) -> Option<StoreError> {
        self.failures
            .get_mut(&(verb, kind.to_string()))
            .and_then(VecDeque::pop_front)
    }

    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

fn key_of<K: StoreObject>(namespace: &str, name: &str) -> Key {
    (
        K::kind(&()).to_string(),
        namespace.to_string(),
        name.to_string(),
    )
}

fn decode<K: StoreObject>(value: &Value) -> K {
    serde_json::from_value(value.clone()).unwrap()
}

fn labels_match(value: &Value, selector: &str) -> bool {
    let labels = &value["metadata"]["labels"];
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels[k].as_str() == Some(v),
            None => !labels[term].is_null(),
        })
}

/// JSON merge patch (RFC 7386).
fn merge(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(fields) => {
            if !target.is_object() {
                *target = json!({});
            }
            for (k, v) in fields {
                if v.is_null() {
                    target.as_object_mut().unwrap().remove(k);
                } else {
                    merge(&mut target[k.as_str()], v);
                }
            }
        }
        other => *target = other.clone(),
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a write. Assigns a `resourceVersion` and,
    /// when missing, a `uid`.
    pub fn insert<K: StoreObject>(&self, object: &K) {
        let mut state = self.state.lock().unwrap();
        let mut value = serde_json::to_value(object).unwrap();
        let version = state.bump_version();
        value["metadata"]["resourceVersion"] = json!(version);
        if value["metadata"]["uid"].is_null() {
            value["metadata"]["uid"] = json!(format!("fake-uid-{version}"));
        }
        let meta = object.meta();
        let key = key_of::<K>(
            meta.namespace.as_deref().unwrap_or_default(),
            meta.name.as_deref().unwrap_or_default(),
        );
        state.objects.insert(key, value);
    }

    /// Read an object directly.
    pub fn object<K: StoreObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&key_of::<K>(namespace, name))
            .map(decode::<K>)
    }

    /// Remove an object behind the operator's back (no write recorded).
    pub fn remove<K: StoreObject>(&self, namespace: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.objects.remove(&key_of::<K>(namespace, name));
    }

    /// Make the next `verb` call on `K` fail with `error`.
    pub fn fail_next<K: StoreObject>(&self, verb: &'static str, error: StoreError) {
        let mut state = self.state.lock().unwrap();
        state
            .failures
            .entry((verb, K::kind(&()).to_string()))
            .or_default()
            .push_back(error);
    }

    /// Deletes of this object are accepted but the object stays.
    pub fn stick_delete<K: StoreObject>(&self, namespace: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.stuck_deletes.insert(key_of::<K>(namespace, name));
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }

    pub fn count<K: StoreObject>(&self, namespace: &str) -> usize {
        let kind = K::kind(&()).to_string();
        let state = self.state.lock().unwrap();
        state
            .objects
            .keys()
            .filter(|(k, ns, _)| *k == kind && ns == namespace)
            .count()
    }
}

#[async_trait]
impl ClusterStore for FakeStore {
    async fn get<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.take_failure("get", &K::kind(&())) {
            return Err(err);
        }
        Ok(state
            .objects
            .get(&key_of::<K>(namespace, name))
            .map(decode::<K>))
    }

    async fn list<K: StoreObject>(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<K>, StoreError> {
        let kind = K::kind(&()).to_string();
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.take_failure("list", &kind) {
            return Err(err);
        }
        Ok(state
            .objects
            .iter()
            .filter(|((k, ns, _), value)| {
                *k == kind && ns == namespace && labels_match(value, label_selector)
            })
            .map(|(_, value)| decode::<K>(value))
            .collect())
    }

    async fn create<K: StoreObject>(&self, namespace: &str, object: &K) -> Result<K, StoreError> {
        let kind = K::kind(&()).to_string();
        let name = object.meta().name.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.take_failure("create", &kind) {
            return Err(err);
        }
        let key = key_of::<K>(namespace, &name);
        if state.objects.contains_key(&key) {
            return Err(StoreError::Conflict {
                kind,
                namespace: namespace.to_string(),
                name,
                message: "already exists".to_string(),
            });
        }

        let mut value = serde_json::to_value(object).unwrap();
        let version = state.bump_version();
        value["metadata"]["namespace"] = json!(namespace);
        value["metadata"]["resourceVersion"] = json!(version);
        value["metadata"]["uid"] = json!(format!("fake-uid-{version}"));
        state.writes.push(Write::new("create", &kind, &name));
        state.objects.insert(key, value.clone());
        Ok(decode(&value))
    }

    async fn replace<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        object: &K,
    ) -> Result<K, StoreError> {
        let kind = K::kind(&()).to_string();
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.take_failure("replace", &kind) {
            return Err(err);
        }
        let key = key_of::<K>(namespace, name);
        let Some(current) = state.objects.get(&key).cloned() else {
            return Err(StoreError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        };

        let mut value = serde_json::to_value(object).unwrap();
        let expected = &value["metadata"]["resourceVersion"];
        if !expected.is_null() && *expected != current["metadata"]["resourceVersion"] {
            return Err(StoreError::Conflict {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: "the object has been modified".to_string(),
            });
        }

        let version = state.bump_version();
        value["metadata"]["resourceVersion"] = json!(version);
        value["metadata"]["uid"] = current["metadata"]["uid"].clone();
        state.writes.push(Write::new("replace", &kind, name));
        state.objects.insert(key, value.clone());
        Ok(decode(&value))
    }

    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let kind = K::kind(&()).to_string();
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.take_failure("delete", &kind) {
            return Err(err);
        }
        state.writes.push(Write::new("delete", &kind, name));
        let key = key_of::<K>(namespace, name);
        if !state.stuck_deletes.contains(&key) {
            state.objects.remove(&key);
        }
        Ok(())
    }

    async fn set_finalizers<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), StoreError> {
        let kind = K::kind(&()).to_string();
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.take_failure("finalizers", &kind) {
            return Err(err);
        }
        let key = key_of::<K>(namespace, name);
        let Some(value) = state.objects.get_mut(&key) else {
            return Err(StoreError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        };

        let terminating = !value["metadata"]["deletionTimestamp"].is_null();
        let released = finalizers.is_empty();
        value["metadata"]["finalizers"] = json!(finalizers);
        state.writes.push(Write::new("finalizers", &kind, name));

        // The API server removes a terminating object once its last finalizer is gone.
        if terminating && released {
            state.objects.remove(&key);
        }
        Ok(())
    }

    async fn patch_status<K: StoreObject>(
        &self,
        namespace: &str,
        name: &str,
        status: &Value,
    ) -> Result<(), StoreError> {
        let kind = K::kind(&()).to_string();
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.take_failure("status", &kind) {
            return Err(err);
        }
        let key = key_of::<K>(namespace, name);
        let Some(value) = state.objects.get_mut(&key) else {
            return Err(StoreError::NotFound {
                kind,
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        };

        merge(&mut value["status"], status);
        state.writes.push(Write::new("status", &kind, name));
        Ok(())
    }
}
