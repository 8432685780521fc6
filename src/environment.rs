//! Provisioning and teardown of the ephemeral environments code runs in.
//!
//! Each run gets a fresh engine realm registered as a frame of the hosting
//! document. The realm is prepared (ambient scheduling and network
//! primitives disabled, frame name set), its default key set is recorded,
//! and the owning context's snapshot is copied in. Environments never
//! escape the sandbox that provisioned them.

use boa_engine::object::FunctionObjectBuilder;
use boa_engine::property::Attribute;
use boa_engine::{
    Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction, Source,
};
use indexmap::IndexMap;
use tracing::debug;

use crate::dom;
use crate::errors::CODE_GENERATION_MESSAGE;
use crate::options::CodeGeneration;
use crate::reflect;

/// Globals a frame would otherwise inherit from the hosting document.
/// Defined as `undefined` so evaluated code cannot schedule work or reach
/// the network through them.
const DISABLED_HOST_GLOBALS: [&str; 5] = [
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
    "fetch",
];

pub(crate) struct Environment {
    frame: u64,
    realm: Context,
    default_keys: Vec<String>,
}

impl Environment {
    /// Provisions a frame seeded with the context snapshot.
    pub(crate) fn provision(
        name: &str,
        code_generation: CodeGeneration,
        snapshot: &IndexMap<String, JsValue>,
    ) -> JsResult<Environment> {
        let mut realm = Context::default();
        for key in DISABLED_HOST_GLOBALS {
            realm.register_global_property(JsString::from(key), JsValue::undefined(), Attribute::all())?;
        }
        // Like an iframe, the frame carries its name as a default global.
        realm.register_global_property(
            JsString::from("name"),
            JsString::from(name),
            Attribute::all(),
        )?;

        let global = realm.global_object();
        let default_keys = reflect::own_keys(&global.clone().into(), &mut realm)?;

        for (key, value) in snapshot {
            global.set(JsString::from(key.as_str()), value.clone(), false, &mut realm)?;
        }

        if !code_generation.strings {
            disable_code_generation(&mut realm)?;
        }

        let frame = dom::attach_frame(name);
        debug!(frame, name, seeded = snapshot.len(), "environment provisioned");
        Ok(Environment {
            frame,
            realm,
            default_keys,
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.frame
    }

    /// Keys that existed in the frame before seeding.
    pub(crate) fn default_keys(&self) -> &[String] {
        &self.default_keys
    }

    /// Evaluates through the realm's native entry point. The global `eval`
    /// stub installed for blocked contexts does not affect this path.
    pub(crate) fn run(&mut self, code: &str) -> JsResult<JsValue> {
        self.realm.eval(Source::from_bytes(code))
    }

    pub(crate) fn realm_mut(&mut self) -> &mut Context {
        &mut self.realm
    }

    /// Own enumerable keys of the frame's global scope.
    pub(crate) fn global_keys(&mut self) -> JsResult<Vec<String>> {
        let global = self.realm.global_object();
        reflect::own_keys(&global.into(), &mut self.realm)
    }

    pub(crate) fn global_get(&mut self, key: &str) -> JsResult<JsValue> {
        let global = self.realm.global_object();
        global.get(JsString::from(key), &mut self.realm)
    }

    /// Removes the frame from the hosting document and discards the realm.
    pub(crate) fn detach(self) {
        dom::detach_frame(self.frame);
    }
}

/// Replaces the frame's string-to-code primitives with stubs that fail
/// unconditionally, both for direct evaluation and for dynamic function
/// construction from a nonempty argument list.
fn disable_code_generation(realm: &mut Context) -> JsResult<()> {
    realm.register_global_builtin_callable(
        JsString::from("eval"),
        1,
        NativeFunction::from_fn_ptr(blocked_eval),
    )?;
    let function = FunctionObjectBuilder::new(
        realm.realm(),
        NativeFunction::from_fn_ptr(blocked_function),
    )
    .name(JsString::from("Function"))
    .length(1)
    .constructor(true)
    .build();
    // Non-enumerable, like the builtin it replaces; the stub must not be
    // picked up as a context key at reconciliation.
    realm.register_global_property(
        JsString::from("Function"),
        function,
        Attribute::WRITABLE | Attribute::CONFIGURABLE,
    )?;
    Ok(())
}

fn blocked_eval(_this: &JsValue, _args: &[JsValue], _realm: &mut Context) -> JsResult<JsValue> {
    Err(JsNativeError::eval().with_message(CODE_GENERATION_MESSAGE).into())
}

fn blocked_function(_this: &JsValue, args: &[JsValue], realm: &mut Context) -> JsResult<JsValue> {
    if !args.is_empty() {
        return Err(JsNativeError::eval().with_message(CODE_GENERATION_MESSAGE).into());
    }
    // `new Function()` compiles nothing, so an inert function is returned.
    let inert = FunctionObjectBuilder::new(realm.realm(), NativeFunction::from_fn_ptr(inert_body))
        .name(JsString::from("anonymous"))
        .build();
    Ok(inert.into())
}

fn inert_body(_this: &JsValue, _args: &[JsValue], _realm: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::undefined())
}
