//! Mocking port and the in-memory mock engine.
//!
//! The engine and factory depend only on [`MockingPort`]; the shipped
//! [`MockEngine`] covers both double flavors:
//!
//! - **Stateless mocks** answer every method with a freshly generated
//!   plausible value for the declared return slot and record the
//!   invocation.
//! - **Stateful fakes** own an in-memory store and dispatch on CRUD
//!   naming heuristics: `save*`/`create*`/`register*` insert,
//!   `findById`/`getById` and single-argument `find*` without `By` look
//!   up, `findAll`/`list*`/`*All` list, `delete*`/`remove*` delete,
//!   `count` returns the size. Absent values surface as null, which is
//!   the optional mapping.
//!
//! The stubbing surface (`every(..).returns(..)` / `.throws(..)`)
//! overrides both flavors. Stores never leak across engines; one engine
//! belongs to one session.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::GenerationContext;
use crate::descriptor::TypeId;
use crate::error::{InvokeError, MockError};
use crate::generate::FixtureEngine;
use crate::registry::{InvokeResult, MethodSig};
use crate::value::Value;

/// External dependency port: creates doubles for abstract types.
pub trait MockingPort {
    /// Create a stateless mock stand-in.
    ///
    /// # Errors
    ///
    /// Returns [`MockError`] when the port cannot double the type.
    fn create_mock(&self, type_id: &TypeId) -> Result<Value, MockError>;

    /// Create a stateful fake with an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`MockError`] when the port cannot double the type.
    fn create_fake(&self, type_id: &TypeId) -> Result<Value, MockError>;
}

/// One recorded call on a double.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub type_id: TypeId,
    pub method: String,
    pub args: Vec<Value>,
}

/// Canned reply installed through the stubbing surface.
#[derive(Debug, Clone, PartialEq)]
enum StubReply {
    Returns(Value),
    Throws { class: String, message: String },
}

/// Fluent handle returned by [`MockEngine::every`].
pub struct Stubbing<'a> {
    engine: &'a MockEngine,
    type_id: TypeId,
    method: String,
}

impl Stubbing<'_> {
    /// Make the stubbed method return `value`.
    pub fn returns(self, value: Value) {
        self.engine
            .install_stub(self.type_id, self.method, StubReply::Returns(value));
    }

    /// Make the stubbed method throw.
    pub fn throws(self, class: impl Into<String>, message: impl Into<String>) {
        self.engine.install_stub(
            self.type_id,
            self.method,
            StubReply::Throws {
                class: class.into(),
                message: message.into(),
            },
        );
    }
}

/// In-memory mock engine: one per session.
#[derive(Debug, Default)]
pub struct MockEngine {
    stubs: Mutex<HashMap<(TypeId, String), StubReply>>,
    invocations: Mutex<Vec<InvocationRecord>>,
    fake_types: Mutex<HashSet<TypeId>>,
    stores: Mutex<HashMap<TypeId, BTreeMap<String, Value>>>,
}

impl MockEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stub a method on a doubled type.
    #[must_use]
    pub fn every(&self, type_id: &TypeId, method: &str) -> Stubbing<'_> {
        Stubbing {
            engine: self,
            type_id: type_id.clone(),
            method: method.to_string(),
        }
    }

    /// Recorded invocations, in call order.
    #[must_use]
    pub fn invocations(&self) -> Vec<InvocationRecord> {
        self.invocations
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Invoke a method on a double. Stubs win; fakes dispatch on the CRUD
    /// heuristics; plain mocks answer with a generated value for the
    /// declared return slot.
    ///
    /// # Errors
    ///
    /// Returns the stubbed throwable, or [`InvokeError::Failure`] when
    /// return-value synthesis fails.
    pub fn invoke(
        &self,
        type_id: &TypeId,
        sig: &MethodSig,
        args: &[Value],
        engine: &FixtureEngine<'_>,
        ctx: &GenerationContext,
    ) -> InvokeResult {
        self.record(type_id, &sig.name, args);

        if let Some(reply) = self.stub_for(type_id, &sig.name) {
            return match reply {
                StubReply::Returns(value) => Ok(value),
                StubReply::Throws { class, message } => {
                    Err(InvokeError::Failure { class, message })
                }
            };
        }

        if self.is_fake(type_id) {
            return Ok(self.dispatch_fake(type_id, &sig.name, args));
        }

        // Plain mock: freshly generated plausible return value.
        match &sig.ret {
            None => Ok(Value::Null),
            Some(ret) => {
                let request = ret.request(type_id.as_str());
                engine
                    .generate_unchecked(&request, ctx)
                    .map_err(|err| InvokeError::Failure {
                        class: "MockAnswerError".to_string(),
                        message: err.to_string(),
                    })
            }
        }
    }

    fn record(&self, type_id: &TypeId, method: &str, args: &[Value]) {
        if let Ok(mut log) = self.invocations.lock() {
            log.push(InvocationRecord {
                type_id: type_id.clone(),
                method: method.to_string(),
                args: args.to_vec(),
            });
        }
    }

    fn install_stub(&self, type_id: TypeId, method: String, reply: StubReply) {
        if let Ok(mut stubs) = self.stubs.lock() {
            stubs.insert((type_id, method), reply);
        }
    }

    fn stub_for(&self, type_id: &TypeId, method: &str) -> Option<StubReply> {
        self.stubs
            .lock()
            .ok()?
            .get(&(type_id.clone(), method.to_string()))
            .cloned()
    }

    fn is_fake(&self, type_id: &TypeId) -> bool {
        self.fake_types
            .lock()
            .map(|fakes| fakes.contains(type_id))
            .unwrap_or(false)
    }

    /// Key under which an entity is stored: its `id` field when present,
    /// else the whole value.
    fn storage_key(value: &Value) -> String {
        value
            .field("id")
            .map_or_else(|| value.canonical_key(), Value::canonical_key)
    }

    fn dispatch_fake(&self, type_id: &TypeId, method: &str, args: &[Value]) -> Value {
        let Ok(mut stores) = self.stores.lock() else {
            return Value::Null;
        };
        let store = stores.entry(type_id.clone()).or_default();

        if is_insert(method) {
            let Some(entity) = args.first() else {
                return Value::Null;
            };
            store.insert(Self::storage_key(entity), entity.clone());
            return entity.clone();
        }
        if is_list(method) {
            return Value::List(store.values().cloned().collect());
        }
        if is_lookup(method, args.len()) {
            let Some(key) = args.first() else {
                return Value::Null;
            };
            return store
                .get(&key.canonical_key())
                .or_else(|| store.get(&Self::storage_key(key)))
                .cloned()
                .unwrap_or(Value::Null);
        }
        if is_delete(method) {
            if let Some(key) = args.first() {
                let removed = store.remove(&key.canonical_key());
                if removed.is_none() {
                    let _ = store.remove(&Self::storage_key(key));
                }
            }
            return Value::Null;
        }
        if method == "count" {
            return Value::Long(i64::try_from(store.len()).unwrap_or(i64::MAX));
        }
        Value::Null
    }
}

fn is_insert(method: &str) -> bool {
    method.starts_with("save") || method.starts_with("create") || method.starts_with("register")
}

/// The documented naming list is normative: `findAll`, `list*`, and
/// `*All` enumerate the store. Deletion names win over the `*All`
/// suffix, so `removeAll` is not a listing.
fn is_list(method: &str) -> bool {
    method == "findAll"
        || method.starts_with("list")
        || (method.ends_with("All") && !is_delete(method))
}

fn is_lookup(method: &str, arity: usize) -> bool {
    if method == "findById" || method == "getById" {
        return true;
    }
    method.starts_with("find") && arity == 1 && !method.contains("By")
}

fn is_delete(method: &str) -> bool {
    method.starts_with("delete") || method.starts_with("remove")
}

impl MockingPort for MockEngine {
    fn create_mock(&self, type_id: &TypeId) -> Result<Value, MockError> {
        debug!(type_id = %type_id, "creating stateless mock");
        Ok(Value::Mock {
            type_id: type_id.clone(),
        })
    }

    fn create_fake(&self, type_id: &TypeId) -> Result<Value, MockError> {
        debug!(type_id = %type_id, "creating stateful fake");
        if let Ok(mut fakes) = self.fake_types.lock() {
            fakes.insert(type_id.clone());
        }
        Ok(Value::Mock {
            type_id: type_id.clone(),
        })
    }
}
