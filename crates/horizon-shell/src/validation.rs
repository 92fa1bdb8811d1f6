//! Validation rules attached to application components.
//!
//! Rule evaluation is deliberately simple: a rule is a named predicate over
//! whatever state the closure captures. Components decide when messages are
//! shown through [`ComponentCore::show_validation`](crate::ComponentCore::show_validation).

use std::fmt;

use parking_lot::Mutex;

type Check = Box<dyn Fn() -> bool + Send + Sync>;

struct ValidationRule {
    property: String,
    message: String,
    check: Check,
}

/// The outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// The property the rule applies to.
    pub property: String,
    /// Whether the rule is satisfied.
    pub success: bool,
    /// The message shown when the rule fails.
    pub message: String,
}

/// A set of validation rules.
#[derive(Default)]
pub struct ValidationRuleSet {
    rules: Mutex<Vec<ValidationRule>>,
}

impl ValidationRuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. `check` returns `true` when the property is valid.
    pub fn add<F>(&self, property: impl Into<String>, message: impl Into<String>, check: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.rules.lock().push(ValidationRule {
            property: property.into(),
            message: message.into(),
            check: Box::new(check),
        });
    }

    /// Evaluate every rule.
    pub fn results(&self) -> Vec<ValidationResult> {
        self.evaluate(|_| true)
    }

    /// Evaluate the rules for one property.
    pub fn results_for(&self, property: &str) -> Vec<ValidationResult> {
        self.evaluate(|rule| rule.property == property)
    }

    /// Whether any rule fails.
    pub fn has_errors(&self) -> bool {
        self.rules.lock().iter().any(|rule| !(rule.check)())
    }

    /// Failure messages for `property` joined by newlines, if any rule
    /// fails.
    pub fn message_for(&self, property: &str) -> Option<String> {
        let failures: Vec<String> = self
            .results_for(property)
            .into_iter()
            .filter(|result| !result.success)
            .map(|result| result.message)
            .collect();
        (!failures.is_empty()).then(|| failures.join("\n"))
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.lock().len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evaluate(&self, filter: impl Fn(&ValidationRule) -> bool) -> Vec<ValidationResult> {
        self.rules
            .lock()
            .iter()
            .filter(|rule| filter(rule))
            .map(|rule| ValidationResult {
                property: rule.property.clone(),
                success: (rule.check)(),
                message: rule.message.clone(),
            })
            .collect()
    }
}

impl fmt::Debug for ValidationRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRuleSet")
            .field("rules", &self.len())
            .finish()
    }
}
