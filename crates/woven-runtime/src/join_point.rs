//! Static description of the method an advice is running for.

use std::fmt;

/// The join point being executed.
///
/// All fields are string literals emitted by the weaver, so a join point is
/// free to construct and `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinPoint {
    module: &'static str,
    class: &'static str,
    method: &'static str,
    arguments: &'static [&'static str],
}

impl JoinPoint {
    /// Creates a join point description.
    #[must_use]
    pub const fn new(
        module: &'static str,
        class: &'static str,
        method: &'static str,
        arguments: &'static [&'static str],
    ) -> Self {
        Self {
            module,
            class,
            method,
            arguments,
        }
    }

    /// Module path of the unit the method was declared in (e.g. `crate::billing`).
    #[must_use]
    pub fn module(&self) -> &'static str {
        self.module
    }

    /// Name of the type the method belongs to.
    #[must_use]
    pub fn class(&self) -> &'static str {
        self.class
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Parameter names in declaration order, receiver excluded.
    ///
    /// Destructured parameters are reported as `_`.
    #[must_use]
    pub fn arguments(&self) -> &'static [&'static str] {
        self.arguments
    }

    /// Fully qualified method path, e.g. `crate::billing::Billing::charge`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}::{}::{}", self.module, self.class, self.method)
    }
}

impl fmt::Display for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}::{}({})",
            self.module,
            self.class,
            self.method,
            self.arguments.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHARGE: JoinPoint = JoinPoint::new("crate::billing", "Billing", "charge", &["amount"]);

    #[test]
    fn qualified_name_joins_segments() {
        assert_eq!(CHARGE.qualified_name(), "crate::billing::Billing::charge");
    }

    #[test]
    fn display_lists_arguments() {
        assert_eq!(
            CHARGE.to_string(),
            "crate::billing::Billing::charge(amount)"
        );
    }
}
