//! Per-entity validation rule bags (spec §4.8). Rules never short-circuit:
//! every rule in the bag runs and all field errors are aggregated before the
//! caller sees anything.

use erm_core::FieldError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
}

pub trait Rule: Send + Sync {
    /// Validate `value` (absent when the field was omitted from the input)
    /// and push a [`FieldError`] onto `errors` for every violation found.
    fn check(&self, value: Option<&str>, errors: &mut Vec<FieldError>);

    /// The single record field this rule reads, when it has one. `None`
    /// rules (cross-field [`FnRule`]s) are handed `None` regardless of the
    /// input record.
    fn field_name(&self) -> Option<&str> {
        None
    }
}

/// A fluent rule builder over a single named field, e.g.
/// `StringRule::new("email").required().min_len(3).max_len(64)`.
pub struct StringRule {
    field: String,
    required: bool,
    min_len: Option<usize>,
    max_len: Option<usize>,
    pattern: Option<Regex>,
}

impl StringRule {
    pub fn new(field: impl Into<String>) -> Self {
        StringRule { field: field.into(), required: false, min_len: None, max_len: None, pattern: None }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_len(mut self, n: usize) -> Self {
        self.min_len = Some(n);
        self
    }

    pub fn max_len(mut self, n: usize) -> Self {
        self.max_len = Some(n);
        self
    }

    pub fn matches(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

impl Rule for StringRule {
    fn field_name(&self) -> Option<&str> {
        Some(&self.field)
    }

    fn check(&self, value: Option<&str>, errors: &mut Vec<FieldError>) {
        let Some(value) = value else {
            if self.required {
                errors.push(FieldError { field: self.field.clone(), message: "is required".to_string() });
            }
            return;
        };

        if let Some(min) = self.min_len {
            if value.len() < min {
                errors.push(FieldError {
                    field: self.field.clone(),
                    message: format!("must be at least {min} characters"),
                });
            }
        }
        if let Some(max) = self.max_len {
            if value.len() > max {
                errors.push(FieldError {
                    field: self.field.clone(),
                    message: format!("must be at most {max} characters"),
                });
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                errors.push(FieldError { field: self.field.clone(), message: "has an invalid format".to_string() });
            }
        }
    }
}

/// A plain function rule, for validations a declarative [`StringRule`]
/// can't express.
pub struct FnRule<F>(pub F)
where
    F: Fn(Option<&str>, &mut Vec<FieldError>) + Send + Sync;

impl<F> Rule for FnRule<F>
where
    F: Fn(Option<&str>, &mut Vec<FieldError>) + Send + Sync,
{
    fn check(&self, value: Option<&str>, errors: &mut Vec<FieldError>) {
        (self.0)(value, errors)
    }
}

#[derive(Default)]
struct RuleBag {
    create: Vec<Box<dyn Rule>>,
    update: Vec<Box<dyn Rule>>,
}

/// Validates `(entity, operation, field) -> value` records against
/// registered rule bags. Keyed by entity name; each entity keeps separate
/// rule lists for create and update.
#[derive(Default)]
pub struct ValidationRegistry {
    bags: RwLock<HashMap<String, RuleBag>>,
}

impl ValidationRegistry {
    pub fn register(&self, entity: impl Into<String>, operation: Operation, rule: Box<dyn Rule>) {
        let mut bags = self.bags.write().expect("validation registry lock poisoned");
        let bag = bags.entry(entity.into()).or_default();
        match operation {
            Operation::Create => bag.create.push(rule),
            Operation::Update => bag.update.push(rule),
        }
    }

    /// Run every rule registered for `(entity, operation)` against `record`
    /// (field name -> value, absent means omitted from the input) and
    /// aggregate all violations; never stops at the first failure.
    pub fn validate(
        &self,
        entity: &str,
        operation: Operation,
        record: &HashMap<String, String>,
    ) -> Vec<FieldError> {
        let bags = self.bags.read().expect("validation registry lock poisoned");
        let Some(bag) = bags.get(entity) else {
            return Vec::new();
        };
        let rules: &[Box<dyn Rule>] = match operation {
            Operation::Create => &bag.create,
            Operation::Update => &bag.update,
        };

        let mut errors = Vec::new();
        for rule in rules {
            let value = rule.field_name().and_then(|field| record.get(field)).map(|s| s.as_str());
            rule.check(value, &mut errors);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_every_violation_without_short_circuiting() {
        let rule = StringRule::new("email").required().min_len(5);
        let mut errors = Vec::new();
        rule.check(Some("a"), &mut errors);
        assert_eq!(errors.len(), 1);

        let mut errors = Vec::new();
        rule.check(None, &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "is required");
    }

    #[test]
    fn matches_checks_a_compiled_pattern() {
        let rule = StringRule::new("email").matches(Regex::new(r"^[^@]+@[^@]+$").unwrap());
        let mut errors = Vec::new();
        rule.check(Some("not-an-email"), &mut errors);
        assert_eq!(errors.len(), 1);
    }
}
