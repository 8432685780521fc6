//! Option objects accepted by the run entry points, and their defaulting
//! rules. A bare `&str` stands in for `{ filename }` everywhere an option
//! object is accepted.

/// Filename attributed to run errors when the caller supplies none.
pub const FILENAME_DEFAULT: &str = "evalmachine.";

/// Timeout sentinel: the environment is never torn down automatically and
/// stays reconcilable until the context is explicitly closed.
pub const TIMEOUT_INFINITE: u64 = u64::MAX;

/// Per-invocation overrides for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Filename attributed to any error raised during the run.
    pub filename: Option<String>,
    /// Milliseconds before the environment is torn down. `0` tears it down
    /// as soon as the run completes, [`TIMEOUT_INFINITE`] never does.
    pub timeout: Option<u64>,
}

impl RunOptions {
    /// Fills unset fields with `{ timeout: 0, filename: "evalmachine." }`.
    pub(crate) fn normalized(&self) -> (String, u64) {
        let filename = self
            .filename
            .clone()
            .unwrap_or_else(|| FILENAME_DEFAULT.to_string());
        (filename, self.timeout.unwrap_or(0))
    }
}

impl From<&str> for RunOptions {
    fn from(filename: &str) -> Self {
        RunOptions {
            filename: Some(filename.to_string()),
            timeout: None,
        }
    }
}

/// Whether environments seeded from a context may turn strings into code.
#[derive(Debug, Clone, Copy)]
pub struct CodeGeneration {
    pub strings: bool,
}

impl Default for CodeGeneration {
    fn default() -> Self {
        CodeGeneration { strings: true }
    }
}

/// Options fixed at context creation.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Label used for environments seeded from the context. Defaults to a
    /// generated unique name.
    pub name: Option<String>,
    /// Defaults to `{ strings: true }`.
    pub code_generation: Option<CodeGeneration>,
}

/// Flat option set accepted by `run_in_new_context`, covering both the
/// implicit context creation and the run itself.
#[derive(Debug, Clone, Default)]
pub struct NewContextOptions {
    pub filename: Option<String>,
    pub timeout: Option<u64>,
    pub context_name: Option<String>,
    pub context_code_generation: Option<CodeGeneration>,
}

impl NewContextOptions {
    pub(crate) fn split(self) -> (RunOptions, ContextOptions) {
        (
            RunOptions {
                filename: self.filename,
                timeout: self.timeout,
            },
            ContextOptions {
                name: self.context_name,
                code_generation: self.context_code_generation,
            },
        )
    }
}

impl From<&str> for NewContextOptions {
    fn from(filename: &str) -> Self {
        NewContextOptions {
            filename: Some(filename.to_string()),
            ..NewContextOptions::default()
        }
    }
}

impl From<RunOptions> for NewContextOptions {
    fn from(options: RunOptions) -> Self {
        NewContextOptions {
            filename: options.filename,
            timeout: options.timeout,
            ..NewContextOptions::default()
        }
    }
}
