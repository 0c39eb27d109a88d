//! # woven-runtime
//!
//! The invocation chain that woven methods call into.
//!
//! The weaver rewrites a matched method body into a call like:
//!
//! ```ignore
//! ::woven::runtime::Invocation::new(::woven::runtime::JoinPoint::new(
//!     "crate::billing", "Billing", "charge", &["amount"],
//! ))
//! .around(crate::aspects::audit)
//! .before(crate::aspects::log_call)
//! .proceed(move || { /* original body */ })
//! ```
//!
//! Interceptors run in registration order, the first one outermost. Advice
//! are plain functions:
//!
//! | kind             | signature                                      |
//! |------------------|------------------------------------------------|
//! | `before`         | `fn(&JoinPoint)`                               |
//! | `after`          | `fn(&JoinPoint)`                               |
//! | `after-throwing` | `fn(&JoinPoint, &Failure<'_>)`                 |
//! | `around`         | `fn<R>(&JoinPoint, Proceed<'_, R>) -> R`       |
//!
//! `after-throwing` advice observes panics only; an `Err` return is a normal
//! return.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod invocation;
mod join_point;

pub use invocation::{
    AfterAdvice, AfterThrowingAdvice, AroundAdvice, BeforeAdvice, Failure, Invocation, Proceed,
};
pub use join_point::JoinPoint;
