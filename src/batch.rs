//! Runs one verb against several targets concurrently.
//!
//! Every target gets a child [`Request`] of its own. A child starts from the
//! parent's callbacks, context and headers, runs the before-send hook, and
//! then inherits every option of the parent except the target, method and
//! body. On options set by both, the parent wins.
//!
//! All children are driven to completion by a single blocking call, after
//! which each of them is classified, in the order of the targets, and fires
//! its own callbacks. The parent's result fields are left alone.
use log::debug;

use crate::{
    request::{Request, State, Verb},
    transport::{ErrorCode, Exchange, TransportError},
    types::Payload,
    Result,
};

/// Run `verb` against `targets`, storing the children on `parent`.
///
/// # Errors
///
/// Returns [`ErrorKind::MultiAddHandle`](crate::ErrorKind::MultiAddHandle)
/// if a child cannot be registered with the transport. Nothing is executed
/// in that case.
pub(crate) fn run(parent: &mut Request, verb: Verb, targets: &[String], data: &Payload) -> Result<()> {
    let transport = parent.transport();
    let mut multi = transport.multi();

    let mut children = Vec::with_capacity(targets.len());
    let mut tokens = Vec::with_capacity(targets.len());
    for target in targets {
        let mut child = parent.spawn_child();
        child.configure(verb, target, data);
        child.set_data(data.clone());
        child.run_before_send();
        child.inherit(parent);

        tokens.push(multi.add(child.options())?);
        child.set_state(State::Executing);
        children.push(child);
    }

    debug!("Running a batch of {} requests", children.len());
    parent.set_state(State::Executing);
    loop {
        let progress = multi.perform();
        if progress.is_quiescent() {
            break;
        }
    }

    for (child, token) in children.iter_mut().zip(tokens) {
        let exchange = multi.take(token).unwrap_or_else(|| {
            Exchange::failed(TransportError::new(
                ErrorCode::GotNothing,
                "No response was received",
            ))
        });
        child.finish(exchange);
    }
    drop(multi);

    parent.set_state(State::Completed);
    parent.adopt(children)
}
