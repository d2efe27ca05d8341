//! Data compliance: value-object equality and hash laws.
//!
//! Two instances are built from one generated argument set and checked
//! for the usual laws. Exceptions thrown inside equality or hash
//! implementations are themselves failed records; the suite never
//! crashes on a broken subject.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::context::GenerationContext;
use crate::descriptor::TypeId;
use crate::error::InvokeError;
use crate::factory::EphemeralContext;
use crate::generate::FixtureEngine;
use crate::mocking::MockEngine;
use crate::registry::{ObjectSchema, TypeRegistry};
use crate::trace::TraceEvent;
use crate::value::Value;
use crate::verdict::AssertionRecord;

use super::ConstructorComplianceExecutor;

const STRUCTURE_RULE: &str = "Structure";
const NOT_NULL_RULE: &str = "NotNullEquality";
const REFLEXIVITY_RULE: &str = "Reflexivity";
const SYMMETRY_RULE: &str = "Symmetry";
const CONSISTENCY_RULE: &str = "EqualsConsistency";
const HASH_STABILITY_RULE: &str = "HashStability";
const HASH_CONSISTENCY_RULE: &str = "HashConsistency";
const THREW: &str = "(THREW EXCEPTION)";

/// Verifies the value-object laws of one target.
pub struct DataComplianceExecutor<'a> {
    registry: &'a TypeRegistry,
    mocks: &'a MockEngine,
}

impl<'a> DataComplianceExecutor<'a> {
    #[must_use]
    pub const fn new(registry: &'a TypeRegistry, mocks: &'a MockEngine) -> Self {
        Self { registry, mocks }
    }

    /// Run structure, constructor, and equality/hash law checks.
    #[must_use]
    pub fn execute(
        &self,
        target: &TypeId,
        ephemeral: &EphemeralContext,
        ctx: &GenerationContext,
    ) -> Vec<AssertionRecord> {
        let location = target.as_str().to_string();
        let Some(schema) = self.registry.object(target) else {
            return vec![AssertionRecord::failed(
                STRUCTURE_RULE,
                format!("target {target} has no registered primary constructor"),
                &location,
            )];
        };

        let constructor_fuzz = ConstructorComplianceExecutor::new(self.registry, self.mocks);
        let mut records = constructor_fuzz.execute(&schema, ctx);

        let Some((a, b)) = self.build_pair(&schema, ctx, ephemeral, &mut records) else {
            return records;
        };

        self.check_not_null_equality(&schema, &a, &location, &mut records);
        self.check_reflexivity(&schema, &a, &location, &mut records);
        self.check_symmetry(&schema, &a, &b, &location, &mut records);
        self.check_consistency(&schema, &a, &b, &location, &mut records);
        self.check_hash_stability(&schema, &a, &location, &mut records);
        self.check_hash_consistency(&schema, &a, &b, &location, &mut records);

        for record in &records {
            let _ = ephemeral.trace.emit(TraceEvent::VerificationTrace {
                rule: record.rule.clone(),
                outcome: format!("{:?}", record.status),
            });
        }
        records
    }

    /// Two instances built from the same captured arguments. Argument
    /// renderings are preserved in the failure record for forensics.
    fn build_pair(
        &self,
        schema: &ObjectSchema,
        ctx: &GenerationContext,
        ephemeral: &EphemeralContext,
        records: &mut Vec<AssertionRecord>,
    ) -> Option<(Value, Value)> {
        let engine = FixtureEngine::new(self.registry, self.mocks);
        let fuzzer = ConstructorComplianceExecutor::new(self.registry, self.mocks);
        let args = match fuzzer.synthesise_valid(schema, &engine, ctx) {
            Ok(args) => args,
            Err(err) => {
                records.push(AssertionRecord::failed(
                    STRUCTURE_RULE,
                    format!("pair argument synthesis failed: {err}"),
                    schema.id.as_str(),
                ));
                return None;
            }
        };

        let rendered_args: Vec<String> = args.iter().map(Value::render).collect();
        let mut build = |label: &str| match schema.construct(&args, ctx.clock()) {
            Ok(value) if !value.is_null() => Some(value),
            Ok(_) => {
                records.push(
                    AssertionRecord::failed(
                        STRUCTURE_RULE,
                        format!("{label} instance was null"),
                        schema.id.as_str(),
                    )
                    .with_actual(format!("args: [{}]", rendered_args.join(", "))),
                );
                None
            }
            Err(err) => {
                let _ = ephemeral.trace.emit(TraceEvent::ExceptionTrace {
                    class: err.class_name().to_string(),
                    message: err.to_string(),
                });
                records.push(
                    AssertionRecord::failed(
                        STRUCTURE_RULE,
                        format!("{label} instance construction threw: {err}"),
                        schema.id.as_str(),
                    )
                    .with_actual(format!("args: [{}]", rendered_args.join(", "))),
                );
                None
            }
        };

        let a = build("first")?;
        let b = build("second")?;
        Some((a, b))
    }

    fn check_not_null_equality(
        &self,
        schema: &ObjectSchema,
        a: &Value,
        location: &str,
        records: &mut Vec<AssertionRecord>,
    ) {
        match schema.equality.equals(a, &Value::Null) {
            Ok(false) => records.push(AssertionRecord::passed(
                NOT_NULL_RULE,
                "instance does not equal null",
                location,
            )),
            Ok(true) => records.push(
                AssertionRecord::failed(NOT_NULL_RULE, "instance equals null", location)
                    .with_expected("false")
                    .with_actual("true"),
            ),
            Err(err) => records.push(threw_record(NOT_NULL_RULE, &err, location)),
        }
    }

    fn check_reflexivity(
        &self,
        schema: &ObjectSchema,
        a: &Value,
        location: &str,
        records: &mut Vec<AssertionRecord>,
    ) {
        match schema.equality.equals(a, a) {
            Ok(true) => records.push(AssertionRecord::passed(
                REFLEXIVITY_RULE,
                "instance equals itself",
                location,
            )),
            Ok(false) => records.push(
                AssertionRecord::failed(REFLEXIVITY_RULE, "instance differs from itself", location)
                    .with_expected("true")
                    .with_actual("false"),
            ),
            Err(err) => records.push(threw_record(REFLEXIVITY_RULE, &err, location)),
        }
    }

    fn check_symmetry(
        &self,
        schema: &ObjectSchema,
        a: &Value,
        b: &Value,
        location: &str,
        records: &mut Vec<AssertionRecord>,
    ) {
        let forward = schema.equality.equals(a, b);
        let backward = schema.equality.equals(b, a);
        match (forward, backward) {
            (Ok(ab), Ok(ba)) if ab == ba => records.push(AssertionRecord::passed(
                SYMMETRY_RULE,
                "equality is symmetric",
                location,
            )),
            (Ok(ab), Ok(ba)) => records.push(
                AssertionRecord::failed(SYMMETRY_RULE, "equality is asymmetric", location)
                    .with_expected("a==b and b==a agree")
                    .with_actual(format!("a==b: {ab}, b==a: {ba}")),
            ),
            (Err(err), _) | (_, Err(err)) => {
                records.push(threw_record(SYMMETRY_RULE, &err, location));
            }
        }
    }

    fn check_consistency(
        &self,
        schema: &ObjectSchema,
        a: &Value,
        b: &Value,
        location: &str,
        records: &mut Vec<AssertionRecord>,
    ) {
        let mut outcomes = Vec::with_capacity(3);
        for _ in 0..3 {
            match schema.equality.equals(a, b) {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    records.push(threw_record(CONSISTENCY_RULE, &err, location));
                    return;
                }
            }
        }
        if outcomes.windows(2).all(|w| w[0] == w[1]) {
            records.push(AssertionRecord::passed(
                CONSISTENCY_RULE,
                "repeated comparisons agree",
                location,
            ));
        } else {
            records.push(
                AssertionRecord::failed(
                    CONSISTENCY_RULE,
                    "repeated comparisons disagree",
                    location,
                )
                .with_actual(format!("{outcomes:?}")),
            );
        }
    }

    fn check_hash_stability(
        &self,
        schema: &ObjectSchema,
        a: &Value,
        location: &str,
        records: &mut Vec<AssertionRecord>,
    ) {
        let first = schema.equality.hash(a);
        let second = schema.equality.hash(a);
        match (first, second) {
            (Ok(h1), Ok(h2)) if h1 == h2 => records.push(AssertionRecord::passed(
                HASH_STABILITY_RULE,
                "hash is stable across calls",
                location,
            )),
            (Ok(h1), Ok(h2)) => records.push(
                AssertionRecord::failed(HASH_STABILITY_RULE, "hash drifts between calls", location)
                    .with_expected(h1.to_string())
                    .with_actual(h2.to_string()),
            ),
            (Err(err), _) | (_, Err(err)) => {
                records.push(threw_record(HASH_STABILITY_RULE, &err, location));
            }
        }
    }

    fn check_hash_consistency(
        &self,
        schema: &ObjectSchema,
        a: &Value,
        b: &Value,
        location: &str,
        records: &mut Vec<AssertionRecord>,
    ) {
        let equal = match schema.equality.equals(a, b) {
            Ok(equal) => equal,
            Err(err) => {
                records.push(
                    AssertionRecord::failed(
                        HASH_CONSISTENCY_RULE,
                        format!("equality prerequisite threw {THREW}: {err}"),
                        location,
                    )
                    .with_actual(err.class_name().to_string()),
                );
                return;
            }
        };
        if !equal {
            records.push(AssertionRecord::skipped(
                HASH_CONSISTENCY_RULE,
                "instances are unequal; hash agreement not required",
                location,
            ));
            return;
        }
        match (schema.equality.hash(a), schema.equality.hash(b)) {
            (Ok(ha), Ok(hb)) if ha == hb => records.push(AssertionRecord::passed(
                HASH_CONSISTENCY_RULE,
                "equal instances share a hash",
                location,
            )),
            (Ok(ha), Ok(hb)) => records.push(
                AssertionRecord::failed(
                    HASH_CONSISTENCY_RULE,
                    "equal instances hash differently",
                    location,
                )
                .with_expected(ha.to_string())
                .with_actual(hb.to_string()),
            ),
            (Err(err), _) | (_, Err(err)) => {
                records.push(threw_record(HASH_CONSISTENCY_RULE, &err, location));
            }
        }
    }
}

fn threw_record(rule: &str, err: &InvokeError, location: &str) -> AssertionRecord {
    AssertionRecord::failed(rule, format!("implementation threw {THREW}: {err}"), location)
        .with_actual(err.class_name().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::descriptor::TypeDescriptor;
    use crate::factory::{EntryPoint, EphemeralContext};
    use crate::registry::{EqualitySemantics, ParamSpec};
    use crate::trace::InMemorySink;
    use crate::verdict::RecordStatus;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(seed: u64) -> GenerationContext {
        let clock = DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        GenerationContext::new(seed, clock)
    }

    fn ephemeral(subject: Value) -> EphemeralContext {
        EphemeralContext {
            run_id: uuid::Uuid::new_v4(),
            subject,
            dependencies: HashMap::new(),
            entry_point: EntryPoint::Constructor,
            trace: Arc::new(InMemorySink::new()),
        }
    }

    fn money_schema() -> ObjectSchema {
        ObjectSchema::new(TypeId::parse("billing.Money").unwrap())
            .param(
                ParamSpec::new("amount", TypeDescriptor::Decimal)
                    .with(Constraint::PositiveOrZero),
            )
            .param(
                ParamSpec::new("currency", TypeDescriptor::Text).with(
                    Constraint::StringLength {
                        min: 3,
                        max: Some(3),
                    },
                ),
            )
            .validated()
    }

    fn run(schema: ObjectSchema, seed: u64) -> Vec<AssertionRecord> {
        let mut registry = TypeRegistry::new();
        let target = schema.id.clone();
        registry.register(schema);
        let mocks = MockEngine::new();
        let executor = DataComplianceExecutor::new(&registry, &mocks);
        executor.execute(&target, &ephemeral(Value::Null), &ctx(seed))
    }

    fn law_records(records: &[AssertionRecord]) -> Vec<&AssertionRecord> {
        records
            .iter()
            .filter(|r| {
                ![SANITY_RULE_NAME, DEFENSIVE_RULE_NAME].contains(&r.rule.as_str())
            })
            .collect()
    }

    const SANITY_RULE_NAME: &str = "ConstructorSanity";
    const DEFENSIVE_RULE_NAME: &str = "ConstructorDefensive";

    #[test]
    fn faithful_value_objects_pass_every_law() {
        let records = run(money_schema(), 42);
        let laws = law_records(&records);
        assert!(!laws.is_empty());
        assert!(
            laws.iter().all(|r| r.status != RecordStatus::Failed),
            "unexpected failures: {laws:?}"
        );
        assert!(laws.iter().any(|r| r.rule == REFLEXIVITY_RULE));
        assert!(laws.iter().any(|r| r.rule == SYMMETRY_RULE));
        assert!(laws.iter().any(|r| r.rule == HASH_STABILITY_RULE));
        assert!(laws.iter().any(|r| r.rule == HASH_CONSISTENCY_RULE
            && r.status == RecordStatus::Passed));
    }

    #[test]
    fn identity_hash_breaks_hash_consistency() {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

        let schema = ObjectSchema::new(TypeId::parse("p.P").unwrap())
            .param(ParamSpec::new("id", TypeDescriptor::Int))
            .equality(EqualitySemantics::custom(
                |a, b| Ok(a.field("id") == b.field("id")),
                // Fresh identity per call, the way a default identity
                // hash looks to a value-equal pair.
                |_| Ok(NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed)),
            ));
        let records = run(schema, 7);
        let hash_consistency: Vec<_> = records
            .iter()
            .filter(|r| r.rule == HASH_CONSISTENCY_RULE)
            .collect();
        assert_eq!(hash_consistency.len(), 1);
        assert!(hash_consistency[0].is_failed());
    }

    #[test]
    fn constant_hash_is_consistent_even_if_degenerate() {
        let schema = ObjectSchema::new(TypeId::parse("p.ZeroHash").unwrap())
            .param(ParamSpec::new("id", TypeDescriptor::Int))
            .equality(EqualitySemantics::custom(
                |a, b| Ok(a.field("id") == b.field("id")),
                |_| Ok(0),
            ));
        let records = run(schema, 7);
        assert!(records
            .iter()
            .filter(|r| r.rule == HASH_CONSISTENCY_RULE || r.rule == HASH_STABILITY_RULE)
            .all(|r| r.status == RecordStatus::Passed));
    }

    #[test]
    fn throwing_equality_fails_without_crashing() {
        let schema = ObjectSchema::new(TypeId::parse("p.Explosive").unwrap())
            .param(ParamSpec::new("id", TypeDescriptor::Int))
            .equality(EqualitySemantics::custom(
                |_, _| {
                    Err(InvokeError::Failure {
                        class: "NullPointerException".to_string(),
                        message: "boom".to_string(),
                    })
                },
                |_| Ok(0),
            ));
        let records = run(schema, 3);
        let thrown: Vec<_> = records
            .iter()
            .filter(|r| r.message.contains(THREW))
            .collect();
        assert!(!thrown.is_empty());
        assert!(thrown.iter().all(|r| r.is_failed()));
    }

    #[test]
    fn unregistered_targets_fail_structurally() {
        let registry = TypeRegistry::new();
        let mocks = MockEngine::new();
        let executor = DataComplianceExecutor::new(&registry, &mocks);
        let records = executor.execute(
            &TypeId::parse("ghost.Type").unwrap(),
            &ephemeral(Value::Null),
            &ctx(1),
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rule, STRUCTURE_RULE);
        assert!(records[0].is_failed());
    }

    #[test]
    fn unequal_pairs_skip_hash_consistency() {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        // Constructor salts a field so the two pair instances differ.
        let schema = ObjectSchema::new(TypeId::parse("p.Salted").unwrap())
            .param(ParamSpec::new("id", TypeDescriptor::Int))
            .constructor_body(|args| {
                let salt = COUNTER.fetch_add(1, Ordering::Relaxed);
                Ok(Value::Object {
                    type_id: TypeId::parse("p.Salted").unwrap(),
                    fields: vec![
                        ("id".to_string(), args[0].clone()),
                        ("salt".to_string(), Value::Long(i64::try_from(salt).unwrap())),
                    ],
                })
            });
        let records = run(schema, 5);
        assert!(records
            .iter()
            .any(|r| r.rule == HASH_CONSISTENCY_RULE && r.status == RecordStatus::Skipped));
    }
}
