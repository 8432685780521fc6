//! Small reflection helpers over a realm's `Object` builtins, shared by
//! the context store and the sync engine.

use boa_engine::{Context, JsNativeError, JsObject, JsResult, JsString, JsValue};

/// Looks up a static helper on the realm's `Object` constructor.
fn object_static(name: &str, realm: &mut Context) -> JsResult<JsObject> {
    let constructor = realm
        .global_object()
        .get(JsString::from("Object"), realm)?;
    let constructor = constructor
        .as_object()
        .cloned()
        .ok_or_else(|| JsNativeError::typ().with_message("Object constructor missing"))
        .map_err(Into::into)?;
    let method = constructor.get(JsString::from(name), realm)?;
    method
        .as_object()
        .cloned()
        .ok_or_else(|| JsNativeError::typ().with_message("Object helper missing"))
        .map_err(Into::into)
}

/// Own enumerable string keys of a value, in insertion order, as reported
/// by the realm's `Object.keys`.
pub(crate) fn own_keys(target: &JsValue, realm: &mut Context) -> JsResult<Vec<String>> {
    let keys = object_static("keys", realm)?;
    let keys = keys.call(&JsValue::undefined(), std::slice::from_ref(target), realm)?;
    let Some(array) = keys.as_object().cloned() else {
        return Ok(Vec::new());
    };
    let length = array.get(JsString::from("length"), realm)?.to_u32(realm)?;
    let mut out = Vec::with_capacity(length as usize);
    for index in 0..length {
        let key = array.get(index, realm)?;
        if let Some(text) = key.as_string() {
            out.push(text.to_std_string_escaped());
        }
    }
    Ok(out)
}

/// Evaluates one of the `Object.isFrozen` family of predicates.
pub(crate) fn integrity_flag(name: &str, target: &JsValue, realm: &mut Context) -> JsResult<bool> {
    let method = object_static(name, realm)?;
    let flag = method.call(&JsValue::undefined(), std::slice::from_ref(target), realm)?;
    Ok(flag.to_boolean())
}
