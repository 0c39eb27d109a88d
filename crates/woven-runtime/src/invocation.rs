//! Ordered advice chain around a single method invocation.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::JoinPoint;

/// Advice run before the rest of the chain.
pub type BeforeAdvice = fn(&JoinPoint);

/// Advice run after the rest of the chain, whether it returned or unwound.
pub type AfterAdvice = fn(&JoinPoint);

/// Advice that observes a panic unwinding out of the rest of the chain.
///
/// Only panics count. A method returning `Err(..)` has returned normally and
/// does not trigger this advice; use `after` or `around` advice to inspect
/// results.
pub type AfterThrowingAdvice = fn(&JoinPoint, &Failure<'_>);

/// Advice that decides whether and how to continue the chain.
pub type AroundAdvice<R> = fn(&JoinPoint, Proceed<'_, R>) -> R;

/// A panic observed by `after-throwing` advice.
///
/// The panic is resumed once the advice returns.
pub struct Failure<'a> {
    payload: &'a (dyn Any + Send),
}

impl<'a> Failure<'a> {
    fn new(payload: &'a (dyn Any + Send)) -> Self {
        Self { payload }
    }

    /// Returns the panic message when the payload is a string.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        if let Some(s) = self.payload.downcast_ref::<&str>() {
            return Some(s);
        }
        self.payload.downcast_ref::<String>().map(String::as_str)
    }

    /// Returns the raw panic payload.
    #[must_use]
    pub fn payload(&self) -> &(dyn Any + Send) {
        self.payload
    }
}

impl fmt::Debug for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("message", &self.message())
            .finish()
    }
}

/// Continuation handed to `around` advice.
///
/// Consuming it runs the remaining interceptors and finally the original
/// method body. Dropping it without calling [`Proceed::proceed`] skips them.
pub struct Proceed<'a, R> {
    next: Box<dyn FnOnce() -> R + 'a>,
}

impl<'a, R> Proceed<'a, R> {
    fn new(next: impl FnOnce() -> R + 'a) -> Self {
        Self {
            next: Box::new(next),
        }
    }

    /// Runs the rest of the chain and returns its result.
    pub fn proceed(self) -> R {
        (self.next)()
    }
}

enum Interceptor<R> {
    Before(BeforeAdvice),
    After(AfterAdvice),
    AfterThrowing(AfterThrowingAdvice),
    Around(AroundAdvice<R>),
}

impl<R> Interceptor<R> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Before(_) => "before",
            Self::After(_) => "after",
            Self::AfterThrowing(_) => "after-throwing",
            Self::Around(_) => "around",
        }
    }
}

/// A method invocation with its ordered interceptors.
///
/// Interceptors are registered outermost first.
pub struct Invocation<R> {
    join_point: JoinPoint,
    chain: Vec<Interceptor<R>>,
}

impl<R> Invocation<R> {
    /// Creates an invocation with no interceptors.
    #[must_use]
    pub fn new(join_point: JoinPoint) -> Self {
        Self {
            join_point,
            chain: Vec::new(),
        }
    }

    /// Appends `before` advice.
    #[must_use]
    pub fn before(mut self, advice: BeforeAdvice) -> Self {
        self.chain.push(Interceptor::Before(advice));
        self
    }

    /// Appends `after` advice.
    #[must_use]
    pub fn after(mut self, advice: AfterAdvice) -> Self {
        self.chain.push(Interceptor::After(advice));
        self
    }

    /// Appends `after-throwing` advice.
    ///
    /// It runs when the rest of the chain panics, never for `Err` returns.
    #[must_use]
    pub fn after_throwing(mut self, advice: AfterThrowingAdvice) -> Self {
        self.chain.push(Interceptor::AfterThrowing(advice));
        self
    }

    /// Appends `around` advice.
    #[must_use]
    pub fn around(mut self, advice: AroundAdvice<R>) -> Self {
        self.chain.push(Interceptor::Around(advice));
        self
    }

    /// Returns the join point this invocation describes.
    #[must_use]
    pub fn join_point(&self) -> &JoinPoint {
        &self.join_point
    }

    /// Returns the number of registered interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns true if no interceptors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Runs the chain with `body` as the innermost step.
    pub fn proceed<F>(self, body: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.run(0, Box::new(body))
    }

    fn run<'a>(&'a self, index: usize, body: Box<dyn FnOnce() -> R + 'a>) -> R {
        let Some(interceptor) = self.chain.get(index) else {
            return body();
        };
        let rest = move || self.run(index + 1, body);

        match interceptor {
            Interceptor::Before(advice) => {
                advice(&self.join_point);
                rest()
            }
            Interceptor::After(advice) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(rest));
                advice(&self.join_point);
                outcome.unwrap_or_else(|payload| panic::resume_unwind(payload))
            }
            Interceptor::AfterThrowing(advice) => {
                match panic::catch_unwind(AssertUnwindSafe(rest)) {
                    Ok(value) => value,
                    Err(payload) => {
                        advice(&self.join_point, &Failure::new(payload.as_ref()));
                        panic::resume_unwind(payload)
                    }
                }
            }
            Interceptor::Around(advice) => advice(&self.join_point, Proceed::new(rest)),
        }
    }
}

impl<R> fmt::Debug for Invocation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("join_point", &self.join_point)
            .field(
                "chain",
                &self.chain.iter().map(Interceptor::kind).collect::<Vec<_>>(),
            )
            .finish()
    }
}
