//! Fault containment for handler invocations.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::domain::{HandlerError, Outcome};

/// Drive a handler future to completion, turning a panic anywhere inside it
/// into `Outcome::Panicked` instead of unwinding into the caller.
///
/// The future is not reused after a panic, so observing it in a broken state
/// is impossible; that is what makes the `AssertUnwindSafe` sound here.
pub async fn invoke_contained<F>(fut: F) -> Outcome
where
    F: Future<Output = Result<(), HandlerError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => Outcome::from(result),
        Err(payload) => Outcome::Panicked(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}
