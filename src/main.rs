use boa_engine::object::builtins::JsArray;
use boa_engine::{Context, JsObject, JsResult, JsString, JsValue};
use browser_vm as vm;
use clap::Parser;
use serde::Serialize;
use serde_json::Value;

/// Evaluate a JavaScript string against a fresh sandboxed context.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JavaScript source to evaluate
    code: String,
    /// JSON object used to seed the context
    #[arg(long)]
    context: Option<String>,
    /// Filename attributed to errors raised by the run
    #[arg(long)]
    filename: Option<String>,
    /// Milliseconds before the environment is torn down (0 = immediately)
    #[arg(long)]
    timeout: Option<u64>,
    /// Emit the result and the post-run context as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Outcome {
    result: Value,
    context: Value,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    // Validate the seed before touching the engine.
    let seed_json: Value = match args.context.as_deref() {
        Some(text) => match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                eprintln!("Invalid context JSON: {e}");
                std::process::exit(1);
            }
        },
        None => Value::Object(Default::default()),
    };
    if !seed_json.is_object() {
        eprintln!("Context must be a JSON object");
        std::process::exit(1);
    }

    let seed = match vm::dom::with_window(|window| json_to_js(&seed_json, window)) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Failed to build context seed: {e}");
            std::process::exit(1);
        }
    };

    let context = match vm::create_context(&seed, vm::ContextOptions::default()) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let options = vm::RunOptions {
        filename: args.filename,
        timeout: args.timeout,
    };
    match vm::run_in_context(&args.code, &context.as_value(), options) {
        Ok(result) => {
            if args.json {
                let outcome = Outcome {
                    result: vm::dom::with_window(|window| js_to_json(&result, window)),
                    context: dump_context(&context),
                };
                println!("{}", serde_json::to_string_pretty(&outcome).unwrap());
            } else {
                println!("{}", result.display());
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Builds a window-realm value from parsed JSON.
fn json_to_js(value: &Value, window: &mut Context) -> JsResult<JsValue> {
    Ok(match value {
        Value::Null => JsValue::null(),
        Value::Bool(b) => JsValue::from(*b),
        Value::Number(n) => JsValue::from(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => JsString::from(s.as_str()).into(),
        Value::Array(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                elements.push(json_to_js(item, window)?);
            }
            JsArray::from_iter(elements, window).into()
        }
        Value::Object(entries) => {
            let object = JsObject::with_object_proto(window.intrinsics());
            for (key, item) in entries {
                let item = json_to_js(item, window)?;
                object.set(JsString::from(key.as_str()), item, false, window)?;
            }
            object.into()
        }
    })
}

/// Serializes a value through the window realm's `JSON.stringify`.
/// Unserializable values (functions, undefined) come back as null.
fn js_to_json(value: &JsValue, window: &mut Context) -> Value {
    let text = stringify(value, window);
    match text {
        Some(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

fn stringify(value: &JsValue, window: &mut Context) -> Option<String> {
    let json = window
        .global_object()
        .get(JsString::from("JSON"), window)
        .ok()?;
    let stringify = json
        .as_object()
        .cloned()?
        .get(JsString::from("stringify"), window)
        .ok()?;
    let text = stringify
        .as_object()
        .cloned()?
        .call(&JsValue::undefined(), std::slice::from_ref(value), window)
        .ok()?;
    text.as_string().map(|s| s.to_std_string_escaped())
}

fn dump_context(context: &vm::Context) -> Value {
    let mut out = serde_json::Map::new();
    for key in context.keys() {
        if let Some(value) = context.get(&key) {
            let value = vm::dom::with_window(|window| js_to_json(&value, window));
            out.insert(key, value);
        }
    }
    Value::Object(out)
}
