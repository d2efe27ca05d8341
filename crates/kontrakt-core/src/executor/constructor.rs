//! Constructor compliance: sanity plus defensive fuzzing.
//!
//! Valid arguments must be accepted; each invalid substitution must be
//! rejected by a throw. A constructor that builds an instance from
//! invalid input fails the defensive check with
//! `expected = "Exception Thrown"`, `actual = "Instance Created"`.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::context::GenerationContext;
use crate::error::GenError;
use crate::generate::FixtureEngine;
use crate::mocking::MockEngine;
use crate::registry::{ObjectSchema, TypeRegistry};
use crate::value::Value;
use crate::verdict::AssertionRecord;

const SANITY_RULE: &str = "ConstructorSanity";
const DEFENSIVE_RULE: &str = "ConstructorDefensive";
const EXPECTED_THROW: &str = "Exception Thrown";
const ACTUAL_CREATED: &str = "Instance Created";

/// Fuzzes one primary constructor.
pub struct ConstructorComplianceExecutor<'a> {
    registry: &'a TypeRegistry,
    mocks: &'a MockEngine,
}

impl<'a> ConstructorComplianceExecutor<'a> {
    #[must_use]
    pub const fn new(registry: &'a TypeRegistry, mocks: &'a MockEngine) -> Self {
        Self { registry, mocks }
    }

    /// Run the sanity check and the per-parameter defensive fuzz.
    #[must_use]
    pub fn execute(&self, schema: &ObjectSchema, ctx: &GenerationContext) -> Vec<AssertionRecord> {
        let engine = FixtureEngine::new(self.registry, self.mocks);
        let location = schema.id.as_str().to_string();
        let mut records = Vec::new();

        let valid_args = match self.synthesise_valid(schema, &engine, ctx) {
            Ok(args) => args,
            Err(err) => {
                records.push(AssertionRecord::failed(
                    SANITY_RULE,
                    format!("argument synthesis failed: {err}"),
                    &location,
                ));
                return records;
            }
        };

        match schema.construct(&valid_args, ctx.clock()) {
            Ok(_) => records.push(AssertionRecord::passed(
                SANITY_RULE,
                "constructor accepted valid arguments",
                &location,
            )),
            Err(err) => {
                records.push(
                    AssertionRecord::failed(
                        SANITY_RULE,
                        format!("constructor rejected valid arguments: {err}"),
                        &location,
                    )
                    .with_actual(err.class_name().to_string()),
                );
                // No point fuzzing a constructor that rejects valid input.
                return records;
            }
        }

        for (index, param) in schema.params.iter().enumerate() {
            let request = param.request(schema.id.as_str());
            let invalid_values = match engine.generate_invalid(&request, ctx) {
                Ok(values) => values,
                Err(err) => {
                    records.push(AssertionRecord::failed(
                        DEFENSIVE_RULE,
                        format!("invalid-value synthesis failed: {err}"),
                        format!("{location}({})", param.name),
                    ));
                    continue;
                }
            };

            for invalid in invalid_values {
                let mut args = valid_args.clone();
                args[index] = invalid.clone();
                let case_location = format!("{location}({}={})", param.name, invalid.render());

                match schema.construct(&args, ctx.clock()) {
                    Err(err) => records.push(
                        AssertionRecord::passed(
                            DEFENSIVE_RULE,
                            "constructor rejected invalid input",
                            &case_location,
                        )
                        .with_expected(EXPECTED_THROW)
                        .with_actual(err.class_name().to_string()),
                    ),
                    Ok(_) => records.push(
                        AssertionRecord::failed(
                            DEFENSIVE_RULE,
                            "constructor accepted invalid input",
                            &case_location,
                        )
                        .with_expected(EXPECTED_THROW)
                        .with_actual(ACTUAL_CREATED),
                    ),
                }
            }
        }
        records
    }

    /// One valid argument per parameter.
    pub(crate) fn synthesise_valid(
        &self,
        schema: &ObjectSchema,
        engine: &FixtureEngine<'_>,
        ctx: &GenerationContext,
    ) -> Result<Vec<Value>, GenError> {
        schema
            .params
            .iter()
            .map(|param| engine.generate(&param.request(schema.id.as_str()), ctx))
            .collect()
    }
}
