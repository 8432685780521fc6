//! The context store: tagging plain objects as contexts, snapshotting
//! their mutability policy, and the handle callers go through for every
//! read or write of context state.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use boa_engine::{JsObject, JsResult, JsString, JsValue};
use indexmap::IndexMap;

use crate::dom;
use crate::errors::{Result, VmError};
use crate::options::{CodeGeneration, ContextOptions, RunOptions};
use crate::reflect;
use crate::sandbox::Sandbox;

/// Mutability of a context, snapshotted from its seed object at creation.
/// Constrains what reconciliation and the handle may write, never what
/// code inside an environment may attempt.
#[derive(Debug, Clone)]
pub(crate) struct Policy {
    pub frozen: bool,
    pub sealed: bool,
    pub extensible: bool,
}

impl Policy {
    fn of(seed: &JsValue, realm: &mut boa_engine::Context) -> JsResult<Policy> {
        Ok(Policy {
            frozen: reflect::integrity_flag("isFrozen", seed, realm)?,
            sealed: reflect::integrity_flag("isSealed", seed, realm)?,
            extensible: reflect::integrity_flag("isExtensible", seed, realm)?,
        })
    }
}

struct Registered {
    token: JsObject,
    sandbox: Rc<RefCell<Sandbox>>,
}

// Side table mapping context tokens to their state, keyed by object
// identity. Entries live for the lifetime of the thread.
thread_local! {
    static CONTEXTS: RefCell<Vec<Registered>> = const { RefCell::new(Vec::new()) };
}

static CONTEXT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_context_name() -> String {
    format!("VM Context {}", CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Tags a copy of `seed` as a context.
///
/// Own enumerable keys are copied shallowly, so nested objects stay shared
/// with the seed. The frozen/sealed/extensible policy is read from the
/// seed's state at this moment and never changes afterwards.
pub fn create_context(seed: &JsValue, options: ContextOptions) -> Result<Context> {
    let name = options.name.unwrap_or_else(next_context_name);
    let code_generation = options.code_generation.unwrap_or_default();

    let (map, policy, token) = dom::with_window(|window| -> JsResult<_> {
        let mut map = IndexMap::new();
        if let Some(object) = seed.as_object().cloned() {
            for key in reflect::own_keys(seed, window)? {
                let value = object.get(JsString::from(key.as_str()), window)?;
                map.insert(key, value);
            }
        }
        let policy = Policy::of(seed, window)?;
        let token = JsObject::with_object_proto(window.intrinsics());
        Ok((map, policy, token))
    })
    .map_err(|source| VmError::Evaluation {
        filename: name.clone(),
        source,
    })?;

    let sandbox = Rc::new(RefCell::new(Sandbox::new(map, policy, name, code_generation)));
    CONTEXTS.with(|contexts| {
        contexts.borrow_mut().push(Registered {
            token: token.clone(),
            sandbox: Rc::clone(&sandbox),
        });
    });
    Ok(Context { token, sandbox })
}

/// Whether `value` is a context token. Never fails, whatever the input.
pub fn is_context(value: &JsValue) -> bool {
    resolve(value).is_some()
}

pub(crate) fn resolve(value: &JsValue) -> Option<Context> {
    let object = value.as_object()?;
    CONTEXTS.with(|contexts| {
        contexts
            .borrow()
            .iter()
            .find(|entry| JsObject::equals(&entry.token, object))
            .map(|entry| Context {
                token: entry.token.clone(),
                sandbox: Rc::clone(&entry.sandbox),
            })
    })
}

/// Handle to a context. Every access flushes reconciliation pending from
/// environments that have not been torn down yet, so state observed right
/// after a run is current even while a teardown is still deferred.
#[derive(Clone)]
pub struct Context {
    token: JsObject,
    sandbox: Rc<RefCell<Sandbox>>,
}

impl Context {
    /// The opaque token accepted by the run entry points. The underlying
    /// mapping is never exposed through it.
    pub fn as_value(&self) -> JsValue {
        self.token.clone().into()
    }

    /// Environment label this context was created with.
    pub fn name(&self) -> String {
        self.sandbox.borrow().name().to_string()
    }

    pub fn code_generation(&self) -> CodeGeneration {
        self.sandbox.borrow().code_generation()
    }

    pub fn is_frozen(&self) -> bool {
        self.sandbox.borrow().policy().frozen
    }

    pub fn is_sealed(&self) -> bool {
        self.sandbox.borrow().policy().sealed
    }

    pub fn is_extensible(&self) -> bool {
        self.sandbox.borrow().policy().extensible
    }

    pub fn get(&self, key: &str) -> Option<JsValue> {
        let mut sandbox = self.sandbox.borrow_mut();
        sandbox.flush();
        sandbox.local_get(key)
    }

    /// Writes a key, honoring the context's policy. Returns whether the
    /// write landed.
    pub fn set(&self, key: &str, value: JsValue) -> bool {
        let mut sandbox = self.sandbox.borrow_mut();
        sandbox.flush();
        sandbox.local_set(key, value)
    }

    pub fn has(&self, key: &str) -> bool {
        let mut sandbox = self.sandbox.borrow_mut();
        sandbox.flush();
        sandbox.local_contains(key)
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut sandbox = self.sandbox.borrow_mut();
        sandbox.flush();
        sandbox.local_delete(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut sandbox = self.sandbox.borrow_mut();
        sandbox.flush();
        sandbox.local_keys()
    }

    /// Tears down every environment still pending from earlier runs,
    /// reconciling their state first. Required after runs with the
    /// infinite timeout sentinel.
    pub fn close(&self) {
        self.sandbox.borrow_mut().close();
    }

    pub(crate) fn run(&self, code: &str, options: &RunOptions) -> Result<JsValue> {
        Sandbox::run_script(&self.sandbox, code, options)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sandbox = match self.sandbox.try_borrow() {
            Ok(sandbox) => sandbox,
            Err(_) => return f.write_str("Context { busy }"),
        };
        f.debug_struct("Context")
            .field("name", &sandbox.name())
            .field("keys", &sandbox.local_keys())
            .finish()
    }
}
