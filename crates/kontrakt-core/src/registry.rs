//! Type registry - the adapter layer between host code and descriptors.
//!
//! Host types plug into the engine here: an [`ObjectSchema`] describes a
//! concrete type's primary constructor (parameter slots with constraints),
//! its methods, and its equality semantics; an [`InterfaceSchema`]
//! describes the contract surface used by contract-auto mode. Method and
//! constructor bodies are plain closures over [`Value`], so the core never
//! reflects.
//!
//! Constructor behavior comes in three flavors:
//! - `Structural` accepts anything and assembles the object value
//! - `Validated` rejects arguments that violate the declared parameter
//!   constraints, the way a guarded `init` block would
//! - `Custom` delegates to user code entirely

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::constraint::Constraint;
use crate::descriptor::{TypeDescriptor, TypeId};
use crate::error::InvokeError;
use crate::request::GenerationRequest;
use crate::validate;
use crate::value::Value;

/// Result of invoking user code through the adapter layer.
pub type InvokeResult = Result<Value, InvokeError>;

type ConstructorFn = Arc<dyn Fn(&[Value]) -> InvokeResult + Send + Sync>;
type MethodFn = Arc<dyn Fn(&Value, &[Value]) -> InvokeResult + Send + Sync>;
type EqFn = Arc<dyn Fn(&Value, &Value) -> Result<bool, InvokeError> + Send + Sync>;
type HashFn = Arc<dyn Fn(&Value) -> Result<u64, InvokeError> + Send + Sync>;

/// One constructor or method parameter slot.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub ty: TypeDescriptor,
    pub nullable: bool,
    pub constraints: Vec<Constraint>,
}

impl ParamSpec {
    /// Non-nullable unconstrained parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            constraints: Vec::new(),
        }
    }

    /// Mark the parameter nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attach a constraint.
    #[must_use]
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Generation request for this slot, scoped under `owner`.
    #[must_use]
    pub fn request(&self, owner: &str) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.ty.clone(), format!("{owner}.{}", self.name))
            .with_all(self.constraints.iter().cloned());
        if self.nullable {
            request = request.nullable();
        }
        request
    }
}

/// Signature of a method: parameter slots plus an optional constrained
/// return slot.
#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub ret: Option<ParamSpec>,
}

impl MethodSig {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret: None,
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn returns(mut self, ret: ParamSpec) -> Self {
        self.ret = Some(ret);
        self
    }
}

/// A callable method on a registered object.
#[derive(Clone)]
pub struct MethodSchema {
    pub sig: MethodSig,
    /// Marks user-scenario entry points
    pub test_marker: bool,
    body: MethodFn,
}

impl MethodSchema {
    #[must_use]
    pub fn new(
        sig: MethodSig,
        body: impl Fn(&Value, &[Value]) -> InvokeResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            sig,
            test_marker: false,
            body: Arc::new(body),
        }
    }

    /// Mark this method as a user-scenario entry point.
    #[must_use]
    pub fn marked(mut self) -> Self {
        self.test_marker = true;
        self
    }

    /// Invoke the method body.
    ///
    /// # Errors
    ///
    /// Propagates whatever the subject raised.
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> InvokeResult {
        (self.body)(receiver, args)
    }
}

impl fmt::Debug for MethodSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSchema")
            .field("sig", &self.sig)
            .field("test_marker", &self.test_marker)
            .finish_non_exhaustive()
    }
}

/// How instances of a registered type are constructed.
#[derive(Clone)]
pub enum ConstructorBehavior {
    /// Assemble the object value from arguments, accepting anything
    Structural,
    /// Reject arguments that violate the declared parameter constraints
    Validated,
    /// User-provided constructor body
    Custom(ConstructorFn),
}

impl fmt::Debug for ConstructorBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => f.write_str("Structural"),
            Self::Validated => f.write_str("Validated"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Equality and hash semantics of a registered type.
#[derive(Clone)]
pub enum EqualitySemantics {
    /// Structural value equality with the structural hash
    Structural,
    /// User-provided equality and hash, possibly broken on purpose
    Custom { eq: EqFn, hash: HashFn },
}

impl EqualitySemantics {
    /// Custom semantics from two closures.
    #[must_use]
    pub fn custom(
        eq: impl Fn(&Value, &Value) -> Result<bool, InvokeError> + Send + Sync + 'static,
        hash: impl Fn(&Value) -> Result<u64, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom {
            eq: Arc::new(eq),
            hash: Arc::new(hash),
        }
    }

    /// Evaluate equality under these semantics.
    ///
    /// # Errors
    ///
    /// Propagates exceptions thrown inside a custom implementation.
    pub fn equals(&self, a: &Value, b: &Value) -> Result<bool, InvokeError> {
        match self {
            Self::Structural => Ok(a == b),
            Self::Custom { eq, .. } => eq(a, b),
        }
    }

    /// Evaluate the hash under these semantics.
    ///
    /// # Errors
    ///
    /// Propagates exceptions thrown inside a custom implementation.
    pub fn hash(&self, value: &Value) -> Result<u64, InvokeError> {
        match self {
            Self::Structural => Ok(value.structural_hash()),
            Self::Custom { hash, .. } => hash(value),
        }
    }
}

impl fmt::Debug for EqualitySemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => f.write_str("Structural"),
            Self::Custom { .. } => f.write_str("Custom(..)"),
        }
    }
}

/// Schema of a concrete registered type.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    pub id: TypeId,
    pub params: Vec<ParamSpec>,
    pub constructor: ConstructorBehavior,
    pub methods: Vec<MethodSchema>,
    pub equality: EqualitySemantics,
    /// Interfaces this type implements, for contract-auto matching
    pub implements: Vec<TypeId>,
}

impl ObjectSchema {
    /// Schema with a structural constructor and structural equality.
    #[must_use]
    pub fn new(id: TypeId) -> Self {
        Self {
            id,
            params: Vec::new(),
            constructor: ConstructorBehavior::Structural,
            methods: Vec::new(),
            equality: EqualitySemantics::Structural,
            implements: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Switch to the constraint-validating constructor.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.constructor = ConstructorBehavior::Validated;
        self
    }

    /// Install a custom constructor body.
    #[must_use]
    pub fn constructor_body(
        mut self,
        body: impl Fn(&[Value]) -> InvokeResult + Send + Sync + 'static,
    ) -> Self {
        self.constructor = ConstructorBehavior::Custom(Arc::new(body));
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodSchema) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn equality(mut self, semantics: EqualitySemantics) -> Self {
        self.equality = semantics;
        self
    }

    #[must_use]
    pub fn implementing(mut self, interface: TypeId) -> Self {
        self.implements.push(interface);
        self
    }

    /// Descriptor for this type.
    #[must_use]
    pub fn descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::Object {
            id: self.id.clone(),
        }
    }

    /// Invoke the constructor with the session clock (the validated
    /// flavor needs it for temporal constraints).
    ///
    /// # Errors
    ///
    /// Returns whatever the constructor rejected or raised.
    pub fn construct(&self, args: &[Value], clock: DateTime<Utc>) -> InvokeResult {
        if args.len() != self.params.len() {
            return Err(InvokeError::Failure {
                class: "IllegalArgumentException".to_string(),
                message: format!(
                    "constructor of {} takes {} arguments, got {}",
                    self.id,
                    self.params.len(),
                    args.len()
                ),
            });
        }
        match &self.constructor {
            ConstructorBehavior::Structural => Ok(self.assemble(args)),
            ConstructorBehavior::Validated => {
                for (param, arg) in self.params.iter().zip(args) {
                    let request = param.request(self.id.as_str());
                    if let Err(breach) = validate::check(&request, arg, clock) {
                        return Err(InvokeError::rejection(breach.to_string()));
                    }
                }
                Ok(self.assemble(args))
            }
            ConstructorBehavior::Custom(body) => body(args),
        }
    }

    /// First method usable as a contract-auto or fallback entry point.
    #[must_use]
    pub fn first_method(&self) -> Option<&MethodSchema> {
        self.methods.first()
    }

    /// First method carrying the test marker.
    #[must_use]
    pub fn first_marked_method(&self) -> Option<&MethodSchema> {
        self.methods.iter().find(|m| m.test_marker)
    }

    /// Method lookup by name.
    #[must_use]
    pub fn method_named(&self, name: &str) -> Option<&MethodSchema> {
        self.methods.iter().find(|m| m.sig.name == name)
    }

    fn assemble(&self, args: &[Value]) -> Value {
        Value::Object {
            type_id: self.id.clone(),
            fields: self
                .params
                .iter()
                .zip(args)
                .map(|(param, arg)| (param.name.clone(), arg.clone()))
                .collect(),
        }
    }
}

/// Schema of an abstract contract surface.
#[derive(Debug, Clone)]
pub struct InterfaceSchema {
    pub id: TypeId,
    pub methods: Vec<MethodSig>,
}

impl InterfaceSchema {
    #[must_use]
    pub fn new(id: TypeId) -> Self {
        Self {
            id,
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(mut self, sig: MethodSig) -> Self {
        self.methods.push(sig);
        self
    }
}

/// Registry of every type the session may touch.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    objects: HashMap<TypeId, Arc<ObjectSchema>>,
    interfaces: HashMap<TypeId, Arc<InterfaceSchema>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concrete type schema, replacing any previous entry.
    pub fn register(&mut self, schema: ObjectSchema) {
        self.objects.insert(schema.id.clone(), Arc::new(schema));
    }

    /// Register an interface schema, replacing any previous entry.
    pub fn register_interface(&mut self, schema: InterfaceSchema) {
        self.interfaces.insert(schema.id.clone(), Arc::new(schema));
    }

    /// Look up a concrete schema.
    #[must_use]
    pub fn object(&self, id: &TypeId) -> Option<Arc<ObjectSchema>> {
        self.objects.get(id).cloned()
    }

    /// Look up an interface schema.
    #[must_use]
    pub fn interface(&self, id: &TypeId) -> Option<Arc<InterfaceSchema>> {
        self.interfaces.get(id).cloned()
    }
}
