//! Cross-definition checks over a frozen [`Isa`].

use std::sync::Arc;

use crate::model::abi::Abi;
use crate::model::bitslice::{BitSlice, Part};
use crate::model::diagnostic::{ModelDiagnostic, Rule};
use crate::model::error::VerifyError;
use crate::model::format::Format;
use crate::model::identifier::Identifier;
use crate::model::resource::{ArtificialResource, Counter, RegisterTensor, Resource};
use crate::model::value::Value;

use super::Isa;

pub struct Verifier {
    diagnostics: Vec<ModelDiagnostic>,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Returns the warnings when no error-level diagnostic was raised.
    pub fn verify(&mut self, isa: &Isa) -> Result<Vec<ModelDiagnostic>, VerifyError> {
        for format in isa.formats() {
            self.verify_format(format);
        }
        for resource in isa.resources() {
            match resource {
                Resource::Register(tensor) => self.verify_constraints(tensor),
                Resource::Artificial(artificial) => self.verify_artificial(isa, artificial),
                Resource::Signal(_) | Resource::Memory(_) => {}
            }
        }
        for counter in isa.counters() {
            self.verify_counter(isa, counter);
        }
        for abi in isa.abis() {
            self.verify_abi(isa, abi);
        }
        self.verify_encodings(isa);

        let (errors, warnings): (Vec<_>, Vec<_>) = std::mem::take(&mut self.diagnostics)
            .into_iter()
            .partition(ModelDiagnostic::is_error);
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(VerifyError {
                diagnostics: errors,
            })
        }
    }

    fn verify_format(&mut self, format: &Format) {
        let uncovered = format.uncovered_bits();
        if let Some(slice) = group_bits(&uncovered) {
            self.push(
                Rule::UncoveredBits,
                format!(
                    "bits {slice} of format '{}' are not covered by any field",
                    format.identifier()
                ),
                format.identifier(),
            );
        }
        for (first, second) in format.overlapping_fields() {
            self.push(
                Rule::OverlappingFields,
                format!(
                    "fields '{}' {} and '{}' {} of format '{}' overlap",
                    first.name(),
                    first.bit_slice(),
                    second.name(),
                    second.bit_slice(),
                    format.identifier()
                ),
                second.identifier(),
            );
        }
    }

    fn verify_constraints(&mut self, tensor: &RegisterTensor) {
        let constraints = tensor.constraints();
        for (idx, constraint) in constraints.iter().enumerate() {
            let Some(previous) = constraints[..idx]
                .iter()
                .find(|other| other.indices() == constraint.indices())
            else {
                continue;
            };
            let indices = render_indices(constraint.indices().iter().map(Value::decimal));
            if previous.value().equal_value(constraint.value()) {
                self.push(
                    Rule::DuplicateConstraint,
                    format!(
                        "{}{indices} is constrained to {} more than once",
                        tensor.identifier(),
                        constraint.value().decimal()
                    ),
                    tensor.identifier(),
                );
            } else {
                self.push(
                    Rule::ConflictingConstraint,
                    format!(
                        "{}{indices} is constrained to both {} and {}",
                        tensor.identifier(),
                        previous.value().decimal(),
                        constraint.value().decimal()
                    ),
                    tensor.identifier(),
                );
            }
        }
    }

    fn verify_artificial(&mut self, isa: &Isa, artificial: &ArtificialResource) {
        let Some(inner) = artificial.inner() else {
            return;
        };
        if isa.resource(&inner.name()).is_none() {
            self.push(
                Rule::UnknownInnerResource,
                format!(
                    "artificial resource '{}' wraps '{inner}' which is not a resource of '{}'",
                    artificial.identifier(),
                    isa.identifier()
                ),
                artificial.identifier(),
            );
        }
    }

    fn verify_counter(&mut self, isa: &Isa, counter: &Counter) {
        if !owns_register(isa, counter.resource()) {
            self.push(
                Rule::UnownedCounterResource,
                format!(
                    "{} '{}' refers to '{}' which is not a resource of '{}'",
                    counter.kind(),
                    counter.identifier(),
                    counter.resource().identifier(),
                    isa.identifier()
                ),
                counter.identifier(),
            );
        }
    }

    fn verify_abi(&mut self, isa: &Isa, abi: &Abi) {
        for (usage, register) in abi.register_refs() {
            if !owns_register(isa, register.file()) {
                self.push(
                    Rule::UnownedAbiRegister,
                    format!(
                        "{usage} {register} of '{}' refers to '{}' which is not a resource of '{}'",
                        abi.identifier(),
                        register.file().identifier(),
                        isa.identifier()
                    ),
                    abi.identifier(),
                );
            }
        }
        for saved in abi.caller_saved() {
            if abi.callee_saved().iter().any(|other| other.same_element(saved)) {
                self.push(
                    Rule::AbiSavedTwice,
                    format!(
                        "{saved} of '{}' is both caller-saved and callee-saved",
                        abi.identifier()
                    ),
                    abi.identifier(),
                );
            }
        }
    }

    fn verify_encodings(&mut self, isa: &Isa) {
        let instructions = isa.instructions();
        for (idx, first) in instructions.iter().enumerate() {
            if first.pattern().specificity() == 0 {
                self.push(
                    Rule::EmptyEncoding,
                    format!("instruction '{}' does not fix any bit", first.identifier()),
                    first.identifier(),
                );
            }
            for second in &instructions[idx + 1..] {
                let (a, b) = (first.pattern(), second.pattern());
                if !a.overlaps(b) {
                    continue;
                }
                // A strictly more specific pattern refines the other one and wins on decode.
                let first_mask = a.mask();
                let second_mask = b.mask();
                let common = first_mask.and(&second_mask).ok();
                let refines = common.is_some_and(|common| {
                    (common.equal_value(&first_mask) || common.equal_value(&second_mask))
                        && a.specificity() != b.specificity()
                });
                if !refines {
                    self.push(
                        Rule::AmbiguousEncoding,
                        format!(
                            "encodings of '{}' {a} and '{}' {b} are ambiguous",
                            first.identifier(),
                            second.identifier()
                        ),
                        second.identifier(),
                    );
                }
            }
        }
    }

    fn push(&mut self, rule: Rule, message: impl Into<String>, definition: &Identifier) {
        self.diagnostics
            .push(ModelDiagnostic::verification(rule, message, definition));
    }
}

fn owns_register(isa: &Isa, tensor: &Arc<RegisterTensor>) -> bool {
    isa.resources().iter().any(|resource| {
        resource
            .as_register()
            .is_some_and(|owned| Arc::ptr_eq(owned, tensor))
    })
}

/// Groups ascending bit indices into a slice such as `[31..28, 14..12]`.
fn group_bits(bits: &[u32]) -> Option<BitSlice> {
    BitSlice::new(bits.iter().rev().map(|&bit| Part::index(bit))).ok()
}

fn render_indices(indices: impl Iterator<Item = String>) -> String {
    indices.map(|index| format!("({index})")).collect()
}
