//! Enum strategy: uniform choice over declared constants.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::context::GenerationContext;
use crate::descriptor::TypeDescriptor;
use crate::error::GenError;
use crate::request::GenerationRequest;
use crate::value::Value;

pub(super) fn generate(
    request: &GenerationRequest,
    ctx: &GenerationContext,
) -> Result<Value, GenError> {
    let TypeDescriptor::Enum { id, variants } = request.ty() else {
        return Err(GenError::failed(
            request.ty().label(),
            "enum strategy dispatched on a non-enum descriptor",
            None,
        ));
    };
    if variants.is_empty() {
        return Err(GenError::failed(
            request.ty().label(),
            "enum declares no constants",
            None,
        ));
    }
    let variant = variants[ctx.choose_index(variants.len())].clone();
    Ok(Value::EnumVariant {
        type_id: id.clone(),
        variant,
    })
}

pub(super) fn boundaries(request: &GenerationRequest) -> Result<Vec<Value>, GenError> {
    let TypeDescriptor::Enum { id, variants } = request.ty() else {
        return Ok(Vec::new());
    };
    Ok(variants
        .iter()
        .map(|variant| Value::EnumVariant {
            type_id: id.clone(),
            variant: variant.clone(),
        })
        .collect())
}
