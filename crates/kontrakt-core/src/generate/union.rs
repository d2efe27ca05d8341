//! Tagged-union ("sealed") strategy: pick one registered subtype.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use super::FixtureEngine;
use crate::context::GenerationContext;
use crate::descriptor::TypeDescriptor;
use crate::error::GenError;
use crate::request::GenerationRequest;
use crate::value::Value;

pub(super) fn generate(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Value, GenError> {
    let TypeDescriptor::Union { id, subtypes } = request.ty() else {
        return Err(GenError::failed(
            request.ty().label(),
            "union strategy dispatched on a non-union descriptor",
            None,
        ));
    };
    if subtypes.is_empty() {
        return Err(GenError::SealedClassHasNoSubclasses(id.clone()));
    }
    let subtype = subtypes[ctx.choose_index(subtypes.len())].clone();
    let derived = request.derived(TypeDescriptor::Object { id: subtype }, "case");
    engine.generate_unchecked(&derived, ctx)
}

/// One instance per subtype; nulls from sub-generation are filtered out.
pub(super) fn boundaries(
    request: &GenerationRequest,
    ctx: &GenerationContext,
    engine: &FixtureEngine<'_>,
) -> Result<Vec<Value>, GenError> {
    let TypeDescriptor::Union { id, subtypes } = request.ty() else {
        return Ok(Vec::new());
    };
    if subtypes.is_empty() {
        return Err(GenError::SealedClassHasNoSubclasses(id.clone()));
    }
    let mut values = Vec::with_capacity(subtypes.len());
    for subtype in subtypes {
        let derived = request
            .derived(TypeDescriptor::Object { id: subtype.clone() }, "case")
            .nullable();
        let value = engine.generate_unchecked(&derived, ctx)?;
        if !value.is_null() {
            values.push(value);
        }
    }
    Ok(values)
}
