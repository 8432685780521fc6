use boa_engine::value::JsVariant;
use boa_engine::{Context, JsError, JsValue};
use thiserror::Error;

/// Message thrown by the code-generation stubs installed in environments
/// whose context forbids string evaluation.
pub(crate) const CODE_GENERATION_MESSAGE: &str =
    "Code generation from strings disallowed for this context";

#[derive(Debug, Error)]
pub enum VmError {
    /// A context-required entry point received something else.
    #[error("the contextified object must be a context, received an instance of {kind}")]
    NotAContext { kind: &'static str },

    /// The evaluated code reached for `eval` or `Function` in an
    /// environment whose context blocks string evaluation.
    #[error("{filename}: {}", CODE_GENERATION_MESSAGE)]
    EvalDisallowed { filename: String },

    /// An error raised by the evaluated code itself, attributed to the
    /// filename of the run that produced it.
    #[error("{filename}: {source}")]
    Evaluation {
        filename: String,
        #[source]
        source: JsError,
    },
}

pub type Result<T> = std::result::Result<T, VmError>;

impl VmError {
    pub(crate) fn not_a_context(value: &JsValue) -> Self {
        VmError::NotAContext {
            kind: value_kind(value),
        }
    }

    /// Classifies an engine error escaping a run. Stub errors from blocked
    /// code generation surface as `EvalDisallowed`, everything else is
    /// propagated verbatim with the run's filename attached.
    pub(crate) fn from_run(source: JsError, realm: &mut Context, filename: &str) -> Self {
        let text = match source.try_native(realm) {
            Ok(native) => native.to_string(),
            Err(_) => source.to_string(),
        };
        if text.contains(CODE_GENERATION_MESSAGE) {
            VmError::EvalDisallowed {
                filename: filename.to_string(),
            }
        } else {
            VmError::Evaluation {
                filename: filename.to_string(),
                source,
            }
        }
    }
}

/// Runtime kind of a value, as named in `NotAContext` messages.
fn value_kind(value: &JsValue) -> &'static str {
    match value.variant() {
        JsVariant::Undefined => "undefined",
        JsVariant::Null => "null",
        JsVariant::Boolean(_) => "boolean",
        JsVariant::Integer32(_) | JsVariant::Float64(_) => "number",
        JsVariant::BigInt(_) => "bigint",
        JsVariant::String(_) => "string",
        JsVariant::Symbol(_) => "symbol",
        JsVariant::Object(object) => {
            if object.is_callable() {
                "function"
            } else {
                "object"
            }
        }
    }
}
