//! Per-context orchestration: provisioning an environment for each run,
//! scheduling its teardown, and keeping the context mapping in sync with
//! every environment still alive.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use boa_engine::JsValue;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::context::Policy;
use crate::dom;
use crate::environment::Environment;
use crate::errors::{Result, VmError};
use crate::options::{CodeGeneration, RunOptions, TIMEOUT_INFINITE};
use crate::sync;

pub(crate) struct Sandbox {
    name: String,
    code_generation: CodeGeneration,
    policy: Policy,
    map: IndexMap<String, JsValue>,
    environments: Vec<Environment>,
}

impl Sandbox {
    pub(crate) fn new(
        map: IndexMap<String, JsValue>,
        policy: Policy,
        name: String,
        code_generation: CodeGeneration,
    ) -> Sandbox {
        Sandbox {
            name,
            code_generation,
            policy,
            map,
            environments: Vec::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn code_generation(&self) -> CodeGeneration {
        self.code_generation
    }

    pub(crate) fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Runs `code` in a fresh environment seeded from the current mapping.
    ///
    /// On success the environment is torn down now (timeout 0), after the
    /// requested delay, or kept until [`Sandbox::close`] for the infinite
    /// sentinel. On error it is torn down immediately and reconciliation
    /// is skipped.
    pub(crate) fn run_script(
        cell: &Rc<RefCell<Sandbox>>,
        code: &str,
        options: &RunOptions,
    ) -> Result<JsValue> {
        let (filename, timeout) = options.normalized();
        let mut sandbox = cell.borrow_mut();
        let mut environment =
            Environment::provision(&sandbox.name, sandbox.code_generation, &sandbox.map).map_err(
                |source| VmError::Evaluation {
                    filename: filename.clone(),
                    source,
                },
            )?;

        match environment.run(code) {
            Ok(result) => {
                if timeout == 0 {
                    sandbox.teardown(environment, &filename)?;
                } else {
                    let frame = environment.id();
                    sandbox.environments.push(environment);
                    if timeout != TIMEOUT_INFINITE {
                        let handle = Rc::clone(cell);
                        dom::schedule(
                            Duration::from_millis(timeout),
                            Box::new(move || handle.borrow_mut().delete_frame(frame)),
                        );
                    }
                    debug!(frame, timeout, "environment teardown deferred");
                }
                Ok(result)
            }
            Err(source) => {
                let error = VmError::from_run(source, environment.realm_mut(), &filename);
                environment.detach();
                Err(error)
            }
        }
    }

    /// Reconciles and detaches one environment.
    fn teardown(&mut self, mut environment: Environment, filename: &str) -> Result<()> {
        let synced = sync::reconcile(&mut environment, &mut self.map, &self.policy);
        environment.detach();
        synced.map(|_| ()).map_err(|source| VmError::Evaluation {
            filename: filename.to_string(),
            source,
        })
    }

    /// Tears down the environment backing `frame`, if it is still alive.
    pub(crate) fn delete_frame(&mut self, frame: u64) {
        let Some(index) = self.environments.iter().position(|e| e.id() == frame) else {
            return;
        };
        let mut environment = self.environments.remove(index);
        if let Err(error) = sync::reconcile(&mut environment, &mut self.map, &self.policy) {
            warn!(frame, %error, "reconciliation failed during teardown");
        }
        environment.detach();
    }

    /// Flushes pending reconciliation from every live environment, oldest
    /// first, without tearing anything down.
    pub(crate) fn flush(&mut self) {
        for environment in &mut self.environments {
            if let Err(error) = sync::reconcile(environment, &mut self.map, &self.policy) {
                warn!(frame = environment.id(), %error, "reconciliation failed during flush");
            }
        }
    }

    /// Tears down every live environment, oldest first.
    pub(crate) fn close(&mut self) {
        for mut environment in std::mem::take(&mut self.environments) {
            if let Err(error) = sync::reconcile(&mut environment, &mut self.map, &self.policy) {
                warn!(frame = environment.id(), %error, "reconciliation failed during close");
            }
            environment.detach();
        }
    }

    // Mapping access used by the context handle. Callers flush first.

    pub(crate) fn local_get(&self, key: &str) -> Option<JsValue> {
        self.map.get(key).cloned()
    }

    pub(crate) fn local_contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub(crate) fn local_keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    /// Writes honoring the context's mutability policy. Returns whether
    /// the write landed, mirroring a sloppy-mode property assignment.
    pub(crate) fn local_set(&mut self, key: &str, value: JsValue) -> bool {
        if self.policy.frozen {
            return false;
        }
        if !self.map.contains_key(key) && !self.policy.extensible {
            return false;
        }
        self.map.insert(key.to_string(), value);
        true
    }

    /// Deletes honoring the policy; sealed and frozen contexts refuse.
    pub(crate) fn local_delete(&mut self, key: &str) -> bool {
        if self.policy.frozen || self.policy.sealed {
            return false;
        }
        self.map.shift_remove(key).is_some()
    }
}
