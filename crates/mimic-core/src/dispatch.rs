//! Execution of a resolved method setup.
//!
//! Order of work for a matched call:
//!
//! 1. matcher monitoring callbacks, then setup callbacks in registration order
//! 2. the next producer of the return/throw sequence (a throw ends dispatch)
//! 3. out/ref write-backs
//! 4. call-base-class resolution: setup override, else the mock-wide default
//!
//! The call-base-class flag is advisory. Nothing here invokes a base
//! implementation; the proxy decides what to do with it.

use crate::{config::MockConfig, error::MockError, setup::MethodSetup, value::Value};

/// Outcome of dispatching one method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Produced result. `None` when no producer applied or nothing matched
    pub value: Option<Value>,
    /// Whether the proxy should also call the base implementation
    pub call_base_class: bool,
    /// Out/ref write-back for each actual argument position
    pub outputs: Vec<Option<Value>>,
}

impl Dispatch {
    /// Outcome of a call no setup matched, in loose mode.
    pub(crate) fn unmatched(arity: usize, config: &MockConfig) -> Self {
        Self { value: None, call_base_class: config.call_base_class_default, outputs: vec![None; arity] }
    }

    /// Write-back for argument `position`, if any.
    pub fn output(&self, position: usize) -> Option<&Value> {
        self.outputs.get(position).and_then(Option::as_ref)
    }
}

/// Dispatch a call to `name(args)` against the resolved setup, or apply the
/// not-set-up policy when there is none.
pub(crate) fn dispatch_method(
    setup: Option<&MethodSetup>,
    name: &str,
    args: &[Value],
    config: &MockConfig,
) -> Result<Dispatch, MockError> {
    let Some(setup) = setup else {
        if config.throw_when_not_setup {
            return Err(MockError::not_set_up(name, args));
        }
        return Ok(Dispatch::unmatched(args.len(), config));
    };

    setup.args.notify(args);
    let value = setup.behavior.run(args)?;
    let outputs = setup.args.outputs(args, config);
    let call_base_class =
        setup.behavior.call_base_class().unwrap_or(config.call_base_class_default);

    Ok(Dispatch { value, call_base_class, outputs })
}
