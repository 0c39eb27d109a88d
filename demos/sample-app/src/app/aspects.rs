//! Advice referenced from `woven.toml`.

use woven::runtime::{Failure, JoinPoint, Proceed};

use crate::trace::record;

/// Logs the call.
pub fn log_call(jp: &JoinPoint) {
    record(format!("log {}", jp.method()));
}

/// Records entry and exit around the call.
pub fn audit<R>(jp: &JoinPoint, proceed: Proceed<'_, R>) -> R {
    record(format!("audit enter {}", jp.method()));
    let result = proceed.proceed();
    record(format!("audit exit {}", jp.method()));
    result
}

/// Records entry and exit around the call.
pub fn log<R>(jp: &JoinPoint, proceed: Proceed<'_, R>) -> R {
    record(format!("log enter {}", jp.method()));
    let result = proceed.proceed();
    record(format!("log exit {}", jp.method()));
    result
}

/// Runs once the call is over.
pub fn done(jp: &JoinPoint) {
    record(format!("after {}", jp.method()));
}

/// Sees a panic leave the call.
pub fn on_panic(jp: &JoinPoint, failure: &Failure<'_>) {
    record(format!(
        "failed {}: {}",
        jp.method(),
        failure.message().unwrap_or("?")
    ));
}
