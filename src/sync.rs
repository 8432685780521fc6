//! Reconciliation of an environment's global scope back into the owning
//! context after a run.

use boa_engine::{JsResult, JsValue};
use indexmap::IndexMap;
use tracing::debug;

use crate::context::Policy;
use crate::environment::Environment;

/// Decides which environment keys propagate back into the context.
///
/// A key is copied when the context already owns it, or when it was
/// introduced by the executed code (not part of the environment's default
/// key set) and the context is extensible. Everything else is dropped.
/// A frozen context never reconciles.
pub(crate) fn plan(
    env_keys: &[String],
    context_keys: &[String],
    default_keys: &[String],
    policy: &Policy,
) -> Vec<String> {
    if policy.frozen {
        return Vec::new();
    }
    env_keys
        .iter()
        .filter(|key| {
            let owned = context_keys.contains(key);
            let fresh = !default_keys.contains(key);
            owned || (policy.extensible && fresh)
        })
        .cloned()
        .collect()
}

/// Applies [`plan`] to a live environment, overwriting the context mapping
/// key by key. Later writes win within a single reconciliation, and later
/// reconciliations win across environments.
pub(crate) fn reconcile(
    environment: &mut Environment,
    map: &mut IndexMap<String, JsValue>,
    policy: &Policy,
) -> JsResult<usize> {
    if policy.frozen {
        return Ok(0);
    }
    let env_keys = environment.global_keys()?;
    let context_keys: Vec<String> = map.keys().cloned().collect();
    let selected = plan(&env_keys, &context_keys, environment.default_keys(), policy);
    for key in &selected {
        let value = environment.global_get(key)?;
        map.insert(key.clone(), value);
    }
    debug!(frame = environment.id(), keys = selected.len(), "context reconciled");
    Ok(selected.len())
}
