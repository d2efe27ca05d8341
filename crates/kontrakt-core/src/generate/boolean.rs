//! Boolean strategy.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::constraint::ConstraintKind;
use crate::context::GenerationContext;
use crate::error::GenError;
use crate::request::GenerationRequest;
use crate::value::Value;

pub(super) fn generate(
    request: &GenerationRequest,
    ctx: &GenerationContext,
) -> Result<Value, GenError> {
    if request.has(ConstraintKind::AssertTrue) {
        return Ok(Value::Bool(true));
    }
    if request.has(ConstraintKind::AssertFalse) {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(ctx.gen_bool()))
}

pub(super) fn boundaries(request: &GenerationRequest) -> Result<Vec<Value>, GenError> {
    if request.has(ConstraintKind::AssertTrue) {
        return Ok(vec![Value::Bool(true)]);
    }
    if request.has(ConstraintKind::AssertFalse) {
        return Ok(vec![Value::Bool(false)]);
    }
    Ok(vec![Value::Bool(true), Value::Bool(false)])
}

pub(super) fn invalid(request: &GenerationRequest) -> Result<Vec<Value>, GenError> {
    if request.has(ConstraintKind::AssertTrue) {
        return Ok(vec![Value::Bool(false)]);
    }
    if request.has(ConstraintKind::AssertFalse) {
        return Ok(vec![Value::Bool(true)]);
    }
    Ok(Vec::new())
}
