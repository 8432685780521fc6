//! In-page sandboxed evaluation of JavaScript strings, shaped after a
//! host runtime's script-execution-context API.
//!
//! A context is an isolated variable scope created from a plain object.
//! Each run provisions a fresh, invisible frame of the hosting document,
//! projects the context into it, evaluates, and merges mutations back
//! while honoring the seed object's frozen/sealed/extensible state. The
//! frame is torn down immediately, after a timeout, or on explicit close;
//! context reads always observe post-run state either way.
//!
//! ```no_run
//! use browser_vm as vm;
//!
//! let seed = vm::dom::eval_in_window("({a: 2})").unwrap();
//! let context = vm::create_context(&seed, vm::ContextOptions::default()).unwrap();
//! let result = vm::run_in_context("a + 2", &context.as_value(), "demo.js").unwrap();
//! assert_eq!(result.as_number(), Some(4.0));
//! ```

pub mod context;
pub mod dom;
pub mod errors;
mod environment;
mod options;
mod reflect;
mod sandbox;
mod sync;

use boa_engine::{JsObject, JsValue, Source};

pub use boa_engine;
pub use context::{create_context, is_context, Context};
pub use errors::{Result, VmError};
pub use options::{
    CodeGeneration, ContextOptions, NewContextOptions, RunOptions, FILENAME_DEFAULT,
    TIMEOUT_INFINITE,
};

/// Runs `code` against a context previously created with
/// [`create_context`].
///
/// Fails with [`VmError::NotAContext`] when `context` is not a context
/// token, and propagates anything the evaluated code throws.
pub fn run_in_context(
    code: &str,
    context: &JsValue,
    options: impl Into<RunOptions>,
) -> Result<JsValue> {
    let options = options.into();
    match context::resolve(context) {
        Some(handle) => handle.run(code, &options),
        None => Err(VmError::not_a_context(context)),
    }
}

/// Creates a context from `seed` (an empty one for `None`) and runs `code`
/// against it.
pub fn run_in_new_context(
    code: &str,
    seed: Option<&JsValue>,
    options: impl Into<NewContextOptions>,
) -> Result<JsValue> {
    let (run_options, context_options) = options.into().split();
    let context = match seed {
        Some(seed) => create_context(seed, context_options)?,
        None => {
            let empty = dom::with_window(|window| JsObject::with_object_proto(window.intrinsics()));
            create_context(&empty.into(), context_options)?
        }
    };
    run_in_context(code, &context.as_value(), run_options)
}

/// Evaluates `code` in the caller's own global scope, the window realm.
/// No isolation, no context involved.
pub fn run_in_this_context(code: &str) -> Result<JsValue> {
    dom::with_window(|window| {
        window
            .eval(Source::from_bytes(code))
            .map_err(|source| VmError::from_run(source, window, FILENAME_DEFAULT))
    })
}

/// A reusable piece of code with a filename fixed at construction.
#[derive(Debug, Clone)]
pub struct Script {
    code: String,
    filename: String,
}

impl Script {
    pub fn new(code: impl Into<String>) -> Script {
        Script {
            code: code.into(),
            filename: FILENAME_DEFAULT.to_string(),
        }
    }

    /// Accepts the same option shapes as the free run functions, including
    /// the bare-filename shorthand.
    pub fn with_options(code: impl Into<String>, options: impl Into<RunOptions>) -> Script {
        let options = options.into();
        Script {
            code: code.into(),
            filename: options
                .filename
                .unwrap_or_else(|| FILENAME_DEFAULT.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The construction-time filename applies unless the per-call options
    /// name their own.
    pub fn run_in_context(
        &self,
        context: &JsValue,
        options: impl Into<RunOptions>,
    ) -> Result<JsValue> {
        let mut options = options.into();
        options.filename.get_or_insert_with(|| self.filename.clone());
        crate::run_in_context(&self.code, context, options)
    }

    pub fn run_in_new_context(
        &self,
        seed: Option<&JsValue>,
        options: impl Into<NewContextOptions>,
    ) -> Result<JsValue> {
        let mut options = options.into();
        options.filename.get_or_insert_with(|| self.filename.clone());
        crate::run_in_new_context(&self.code, seed, options)
    }

    pub fn run_in_this_context(&self) -> Result<JsValue> {
        crate::run_in_this_context(&self.code)
    }
}
