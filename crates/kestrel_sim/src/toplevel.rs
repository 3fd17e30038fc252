//! The host-facing handle around one root module.

use std::path::Path;

use kestrel_common::Value;
use kestrel_config::SimConfig;
use tracing::debug;

use crate::debug::{self, DebugInfo, DebugItems};
use crate::driver::{self, StepResult};
use crate::error::SimError;
use crate::module::Module;
use crate::signal::{SignalMut, SignalRef};

/// Exclusive owner of a root module, with stepping and debug access.
///
/// The debug registry is built on first use and kept for the lifetime of the
/// handle. Its entries locate signals by name, so they remain valid after
/// [`Toplevel::reset`] replaces the design's instances.
pub struct Toplevel<M: Module> {
    root: M,
    config: SimConfig,
    items: Option<DebugItems>,
    steps: u64,
}

impl<M: Module + Default> Toplevel<M> {
    /// Creates a handle around a default-constructed root.
    pub fn create() -> Self {
        Self::new(M::default())
    }
}

impl<M: Module> Toplevel<M> {
    /// Wraps `root` with the default configuration.
    pub fn new(root: M) -> Self {
        Self::with_config(root, SimConfig::default())
    }

    /// Wraps `root` with an explicit configuration.
    pub fn with_config(root: M, config: SimConfig) -> Self {
        debug!(
            max_iterations = config.settle.max_iterations,
            allow_state_writes = config.debug.allow_state_writes,
            "toplevel created"
        );
        Self {
            root,
            config,
            items: None,
            steps: 0,
        }
    }

    /// Wraps `root` with the configuration in `<dir>/kestrel.toml`.
    ///
    /// A missing file is an error; use [`Toplevel::new`] for defaults.
    pub fn from_config_dir(root: M, dir: &Path) -> Result<Self, SimError> {
        let config = kestrel_config::load_config(dir)?;
        Ok(Self::with_config(root, config))
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Settles and commits one clock step.
    pub fn step(&mut self) -> StepResult {
        let result = driver::step(&mut self.root, self.config.settle.max_iterations);
        if result.converged {
            self.steps += 1;
        }
        result
    }

    /// Steps `cycles` times, stopping at the first divergence.
    ///
    /// Returns the number of steps whose commit changed state.
    pub fn run(&mut self, cycles: u64) -> Result<u64, SimError> {
        let mut changed = 0;
        for _ in 0..cycles {
            let result = self.step();
            if !result.converged {
                return Err(SimError::Divergence {
                    iterations: result.iterations,
                });
            }
            if result.state_changed {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Restores the design's power-on state.
    ///
    /// Host-owned resources such as external memory images survive.
    pub fn reset(&mut self) {
        self.root.reset();
        self.steps = 0;
        debug!("toplevel reset");
    }

    /// Number of converged steps since creation or the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Returns the debug registry, building it on first use.
    pub fn debug_items(&mut self) -> Result<&DebugItems, SimError> {
        registry(&mut self.items, &self.root)
    }

    /// Describes every debug item in hierarchy order.
    pub fn get_debug_items(&mut self) -> Result<Vec<DebugInfo>, SimError> {
        let allow = self.config.debug.allow_state_writes;
        Ok(self.debug_items()?.infos(allow))
    }

    /// Reads the current value of a scalar signal.
    pub fn get(&mut self, path: &str) -> Result<Value, SimError> {
        let entry = registry(&mut self.items, &self.root)?.lookup(path)?;
        match debug::resolve(&self.root, entry) {
            Some(SignalRef::Memory(_)) => Err(SimError::IsAMemory {
                path: path.to_string(),
            }),
            Some(signal) => signal.current().cloned().ok_or_else(|| unknown(path)),
            None => Err(unknown(path)),
        }
    }

    /// Forces a scalar signal.
    ///
    /// Narrower values are zero-extended. Registers take the value on both
    /// sides, so it survives the next commit. The new value is visible to
    /// combinational logic after the next settle.
    pub fn set(&mut self, path: &str, value: &Value) -> Result<(), SimError> {
        let allow = self.config.debug.allow_state_writes;
        let entry = registry(&mut self.items, &self.root)?.lookup(path)?;
        if !entry.item().is_writable(allow) {
            return Err(SimError::NotWritable {
                path: path.to_string(),
            });
        }
        let value = fit(path, entry.item().width, value)?;
        match debug::resolve_mut(&mut self.root, entry) {
            Some(SignalMut::Value(target)) => {
                target.assign(&value);
            }
            Some(SignalMut::Wire(target)) => target.force(&value),
            Some(SignalMut::Memory(_)) => {
                return Err(SimError::IsAMemory {
                    path: path.to_string(),
                })
            }
            None => return Err(unknown(path)),
        }
        debug!(path, value = %format_args!("{value:x}"), "signal forced");
        Ok(())
    }

    /// Forces a scalar signal from an integer.
    pub fn set_u64(&mut self, path: &str, value: u64) -> Result<(), SimError> {
        let width = registry(&mut self.items, &self.root)?
            .lookup(path)?
            .item()
            .width;
        self.set(path, &Value::from_u64(value, width))
    }

    /// Reads one word of a memory.
    pub fn get_word(&mut self, path: &str, index: usize) -> Result<Value, SimError> {
        let entry = registry(&mut self.items, &self.root)?.lookup(path)?;
        match debug::resolve(&self.root, entry) {
            Some(SignalRef::Memory(memory)) => {
                check_index(path, index, memory.depth())?;
                Ok(memory.read(index).clone())
            }
            Some(_) => Err(SimError::NotAMemory {
                path: path.to_string(),
            }),
            None => Err(unknown(path)),
        }
    }

    /// Overwrites one word of a memory immediately.
    pub fn set_word(&mut self, path: &str, index: usize, value: &Value) -> Result<(), SimError> {
        let allow = self.config.debug.allow_state_writes;
        let entry = registry(&mut self.items, &self.root)?.lookup(path)?;
        let Some(SignalMut::Memory(memory)) = debug::resolve_mut(&mut self.root, entry) else {
            return Err(SimError::NotAMemory {
                path: path.to_string(),
            });
        };
        if !entry.item().is_writable(allow) {
            return Err(SimError::NotWritable {
                path: path.to_string(),
            });
        }
        check_index(path, index, memory.depth())?;
        let value = fit(path, memory.width(), value)?;
        memory.force(index, &value);
        debug!(path, index, "memory word forced");
        Ok(())
    }

    /// Borrows the root module.
    pub fn root(&self) -> &M {
        &self.root
    }

    /// Borrows the root module mutably.
    pub fn root_mut(&mut self) -> &mut M {
        &mut self.root
    }

    /// Consumes the handle, returning the root module.
    pub fn into_root(self) -> M {
        self.root
    }
}

fn registry<'a, M: Module + ?Sized>(
    cache: &'a mut Option<DebugItems>,
    root: &M,
) -> Result<&'a DebugItems, SimError> {
    let items = match cache.take() {
        Some(items) => items,
        None => debug::collect(root)?,
    };
    Ok(cache.insert(items))
}

fn unknown(path: &str) -> SimError {
    SimError::UnknownSignal {
        path: path.to_string(),
    }
}

fn fit(path: &str, width: u32, value: &Value) -> Result<Value, SimError> {
    if value.width() > width {
        return Err(SimError::WidthMismatch {
            path: path.to_string(),
            expected: width,
            actual: value.width(),
        });
    }
    Ok(value.zext(width))
}

fn check_index(path: &str, index: usize, depth: usize) -> Result<(), SimError> {
    if index >= depth {
        return Err(SimError::IndexOutOfRange {
            path: path.to_string(),
            index,
            depth,
        });
    }
    Ok(())
}
