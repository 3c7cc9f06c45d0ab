#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use sable_ast::Span;
use thiserror::Error;

/// A single typed checker diagnostic.
///
/// Every variant carries its primary span; `kind()` gives a fieldless
/// discriminant so callers can compare diagnostic lists positionally.
#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
#[allow(unused_assignments)]
pub enum SemanticError {
    // --- Declaration shape ---
    #[error("invalid access modifier for {declaration}: `{access}`")]
    #[diagnostic(code(sable::invalid_access_modifier), help("{explanation}"))]
    InvalidAccessModifier {
        declaration: String,
        access: String,
        explanation: String,
        #[label]
        span: Span,
    },

    #[error("missing access modifier for {declaration}")]
    #[diagnostic(code(sable::missing_access_modifier))]
    MissingAccessModifier {
        declaration: String,
        #[label("add an access modifier")]
        span: Span,
    },

    #[error("cannot redeclare {kind}: `{name}` is already declared")]
    #[diagnostic(code(sable::redeclaration))]
    Redeclaration {
        kind: &'static str,
        name: String,
        #[label("redeclared here")]
        span: Span,
        #[label("previously declared here")]
        previous: Option<Span>,
    },

    #[error("attachments are not enabled")]
    #[diagnostic(code(sable::attachments_not_enabled))]
    AttachmentsNotEnabled {
        #[label]
        span: Span,
    },

    #[error("{nested} declarations cannot be nested inside {container} declarations")]
    #[diagnostic(code(sable::invalid_nested_declaration))]
    InvalidNestedDeclaration {
        nested: String,
        container: String,
        #[label]
        span: Span,
    },

    #[error("missing initializer for `{name}`")]
    #[diagnostic(code(sable::missing_initializer))]
    MissingInitializer {
        name: String,
        #[label("declares fields but no initializer")]
        span: Span,
    },

    #[error("missing destructor for resource `{name}`")]
    #[diagnostic(
        code(sable::missing_destructor),
        help("resources with resource fields must declare a destructor")
    )]
    MissingDestructor {
        name: String,
        #[label]
        span: Span,
    },

    #[error("invalid destructor: only resources may declare one")]
    #[diagnostic(code(sable::invalid_destructor))]
    InvalidDestructor {
        #[label]
        span: Span,
    },

    #[error("invalid resource field `{name}` in {container}")]
    #[diagnostic(code(sable::invalid_resource_field))]
    InvalidResourceField {
        name: String,
        container: String,
        #[label]
        span: Span,
    },

    #[error("missing resource annotation: `@`")]
    #[diagnostic(code(sable::missing_resource_annotation))]
    MissingResourceAnnotation {
        #[label]
        span: Span,
    },

    #[error("invalid resource annotation: `@`")]
    #[diagnostic(code(sable::invalid_resource_annotation))]
    InvalidResourceAnnotation {
        #[label]
        span: Span,
    },

    #[error("missing function body")]
    #[diagnostic(code(sable::missing_function_body))]
    MissingFunctionBody {
        #[label]
        span: Span,
    },

    #[error("invalid raw type for enum: `{ty}`")]
    #[diagnostic(code(sable::invalid_enum_raw_type))]
    InvalidEnumRawType {
        ty: String,
        #[label]
        span: Span,
    },

    // --- Reference-site access ---
    #[error("cannot access `{name}`: {declaration} has {access} access")]
    #[diagnostic(code(sable::invalid_access))]
    InvalidAccess {
        name: String,
        declaration: String,
        access: String,
        #[label]
        span: Span,
    },

    #[error("cannot assign to `{name}`: {declaration} has {access} access")]
    #[diagnostic(
        code(sable::invalid_assignment_access),
        help("consider making it publicly settable")
    )]
    InvalidAssignmentAccess {
        name: String,
        declaration: String,
        access: String,
        #[label]
        span: Span,
    },

    #[error("cannot find declaration `{name}` in `{location}`")]
    #[diagnostic(code(sable::not_exported))]
    NotExported {
        name: String,
        location: String,
        #[label]
        span: Span,
    },

    #[error("import of location `{location}` could not be resolved")]
    #[diagnostic(code(sable::unresolved_import))]
    UnresolvedImport {
        location: String,
        #[label]
        span: Span,
    },

    #[error("checking of imported program `{location}` failed")]
    #[diagnostic(code(sable::imported_program))]
    ImportedProgram {
        location: String,
        #[label]
        span: Span,
    },

    // --- Types ---
    #[error("cannot find {kind} in this scope: `{name}`")]
    #[diagnostic(code(sable::not_declared))]
    NotDeclared {
        kind: &'static str,
        name: String,
        #[label("not found in this scope")]
        span: Span,
    },

    #[error("value of type `{ty}` has no member `{name}`")]
    #[diagnostic(code(sable::not_declared_member))]
    NotDeclaredMember {
        name: String,
        ty: String,
        #[label("unknown member")]
        span: Span,
    },

    #[error("mismatched types: expected `{expected}`, got `{actual}`")]
    #[diagnostic(code(sable::type_mismatch))]
    TypeMismatch {
        expected: String,
        actual: String,
        #[label]
        span: Span,
    },

    #[error("{kind} `{composite}` does not conform to {interface_kind} interface `{interface}`")]
    #[diagnostic(code(sable::conformance))]
    Conformance {
        kind: String,
        composite: String,
        interface_kind: String,
        interface: String,
        missing: Vec<String>,
        mismatched: Vec<String>,
        #[label]
        span: Span,
    },

    #[error("`{composite}` repeats conformance to `{interface}`")]
    #[diagnostic(code(sable::duplicate_conformance))]
    DuplicateConformance {
        composite: String,
        interface: String,
        #[label]
        span: Span,
    },

    #[error("cannot conform to non-interface type `{name}`")]
    #[diagnostic(code(sable::invalid_conformance))]
    InvalidConformance {
        name: String,
        #[label]
        span: Span,
    },

    #[error("mismatched composite kinds: expected `{expected}`, got `{actual}`")]
    #[diagnostic(code(sable::composite_kind_mismatch))]
    CompositeKindMismatch {
        expected: String,
        actual: String,
        #[label]
        span: Span,
    },

    #[error("duplicate intersected type `{name}`")]
    #[diagnostic(code(sable::invalid_intersection_type_duplicate))]
    InvalidIntersectionTypeDuplicate {
        name: String,
        #[label]
        span: Span,
    },

    #[error("ambiguous intersection type")]
    #[diagnostic(
        code(sable::ambiguous_intersection_type),
        help("use `AnyStruct` or `AnyResource` to denote any value")
    )]
    AmbiguousIntersectionType {
        #[label]
        span: Span,
    },

    #[error("cannot intersect non-interface type `{name}`")]
    #[diagnostic(code(sable::invalid_intersected_type))]
    InvalidIntersectedType {
        name: String,
        #[label]
        span: Span,
    },

    #[error("intersection mixes resource and struct interfaces")]
    #[diagnostic(code(sable::intersection_composite_kind_mismatch))]
    IntersectionCompositeKindMismatch {
        #[label]
        span: Span,
    },

    #[error("member `{member}` of `{first}` clashes with member of `{second}`")]
    #[diagnostic(code(sable::intersection_member_clash))]
    IntersectionMemberClash {
        member: String,
        first: String,
        second: String,
        #[label]
        span: Span,
    },

    #[error("cannot apply binary operation `{op}` to types `{left}` and `{right}`")]
    #[diagnostic(code(sable::invalid_binary_operands))]
    InvalidBinaryOperands {
        op: &'static str,
        left: String,
        right: String,
        #[label]
        span: Span,
    },

    #[error("cannot apply unary operation `{op}` to type `{ty}`")]
    #[diagnostic(code(sable::invalid_unary_operand))]
    InvalidUnaryOperand {
        op: &'static str,
        ty: String,
        #[label]
        span: Span,
    },

    #[error("cannot call type `{ty}`")]
    #[diagnostic(code(sable::not_callable))]
    NotCallable {
        ty: String,
        #[label]
        span: Span,
    },

    #[error("incorrect number of arguments: expected {expected}, got {actual}")]
    #[diagnostic(code(sable::argument_count))]
    ArgumentCount {
        expected: usize,
        actual: usize,
        #[label]
        span: Span,
    },

    #[error("missing argument label: `{label}`")]
    #[diagnostic(code(sable::missing_argument_label))]
    MissingArgumentLabel {
        label: String,
        #[label]
        span: Span,
    },

    #[error("incorrect argument label: expected `{expected}`, got `{actual}`")]
    #[diagnostic(code(sable::incorrect_argument_label))]
    IncorrectArgumentLabel {
        expected: String,
        actual: String,
        #[label]
        span: Span,
    },

    #[error("cannot index into value of type `{ty}`")]
    #[diagnostic(code(sable::not_indexable))]
    NotIndexable {
        ty: String,
        #[label]
        span: Span,
    },

    #[error("invalid optional chaining on non-optional type `{ty}`")]
    #[diagnostic(code(sable::invalid_optional_chaining))]
    InvalidOptionalChaining {
        ty: String,
        #[label]
        span: Span,
    },

    #[error("missing return value: expected `{expected}`")]
    #[diagnostic(code(sable::missing_return_value))]
    MissingReturnValue {
        expected: String,
        #[label]
        span: Span,
    },

    #[error("invalid return value: function does not return a value")]
    #[diagnostic(code(sable::invalid_return_value))]
    InvalidReturnValue {
        #[label]
        span: Span,
    },

    #[error("missing return statement")]
    #[diagnostic(code(sable::missing_return_statement))]
    MissingReturnStatement {
        #[label]
        span: Span,
    },

    #[error("cannot create value: `{name}` is not a resource")]
    #[diagnostic(code(sable::invalid_construction))]
    InvalidConstruction {
        name: String,
        #[label]
        span: Span,
    },

    #[error("cannot create resource: expected `create`")]
    #[diagnostic(code(sable::missing_create))]
    MissingCreate {
        #[label]
        span: Span,
    },

    #[error("cannot emit non-event type: `{ty}`")]
    #[diagnostic(code(sable::emit_non_event))]
    EmitNonEvent {
        ty: String,
        #[label]
        span: Span,
    },

    #[error("failable casting of resources is only allowed in optional bindings")]
    #[diagnostic(code(sable::invalid_failable_resource_downcast))]
    InvalidFailableResourceDowncastOutsideOptionalBinding {
        #[label]
        span: Span,
    },

    #[error("cannot create reference: expected reference type, got `{ty}`")]
    #[diagnostic(code(sable::non_reference_type_reference))]
    NonReferenceTypeReference {
        ty: String,
        #[label]
        span: Span,
    },

    #[error("cannot infer type parameter: `{name}`")]
    #[diagnostic(code(sable::type_parameter_type_inference))]
    TypeParameterTypeInference {
        name: String,
        #[label]
        span: Span,
    },

    #[error("incorrect number of type arguments: expected {expected}, got {actual}")]
    #[diagnostic(code(sable::invalid_type_argument_count))]
    InvalidTypeArgumentCount {
        expected: usize,
        actual: usize,
        #[label]
        span: Span,
    },

    // --- Assignment ---
    #[error("cannot assign to constant: `{name}`")]
    #[diagnostic(code(sable::assignment_to_constant))]
    AssignmentToConstant {
        name: String,
        #[label]
        span: Span,
    },

    #[error("cannot assign to constant member: `{name}`")]
    #[diagnostic(code(sable::assignment_to_constant_member))]
    AssignmentToConstantMember {
        name: String,
        #[label]
        span: Span,
    },

    #[error("cannot assign to unassignable expression")]
    #[diagnostic(code(sable::invalid_assignment_target))]
    InvalidAssignmentTarget {
        #[label]
        span: Span,
    },

    #[error("cannot swap with unassignable expression")]
    #[diagnostic(code(sable::invalid_swap_expression))]
    InvalidSwapExpression {
        #[label]
        span: Span,
    },

    // --- Linear types ---
    #[error("loss of resource")]
    #[diagnostic(
        code(sable::resource_loss),
        help("move or destroy the resource before it goes out of scope")
    )]
    ResourceLoss {
        #[label]
        span: Span,
    },

    #[error("{} use of invalidated resource `{name}`", invalidation_word(.maybe))]
    #[diagnostic(code(sable::resource_use_after_invalidation))]
    ResourceUseAfterInvalidation {
        name: String,
        maybe: bool,
        #[label]
        span: Span,
        #[label("resource invalidated here")]
        invalidated_at: Option<Span>,
    },

    #[error("invalid reference: referenced resource may have been moved or destroyed")]
    #[diagnostic(
        code(sable::invalidated_resource_reference),
        help("use the reference before the resource is moved or destroyed")
    )]
    InvalidatedResourceReference {
        #[label]
        span: Span,
        #[label("resource invalidated here")]
        invalidated_at: Option<Span>,
    },

    #[error("cannot capture resource `{name}` in a nested function")]
    #[diagnostic(code(sable::resource_capturing))]
    ResourceCapturing {
        name: String,
        #[label]
        span: Span,
    },

    #[error("cannot move or destroy `self`")]
    #[diagnostic(code(sable::invalid_self_invalidation))]
    InvalidSelfInvalidation {
        #[label]
        span: Span,
    },

    #[error("incorrect transfer operation: expected `{expected}`")]
    #[diagnostic(code(sable::incorrect_transfer_operation))]
    IncorrectTransferOperation {
        expected: &'static str,
        #[label]
        span: Span,
    },

    #[error("missing move operation: `<-`")]
    #[diagnostic(code(sable::missing_move_operation))]
    MissingMoveOperation {
        #[label]
        span: Span,
    },

    #[error("invalid move operation for non-resource")]
    #[diagnostic(code(sable::invalid_move_operation))]
    InvalidMoveOperation {
        #[label]
        span: Span,
    },

    #[error("cannot move nested resource")]
    #[diagnostic(
        code(sable::invalid_nested_resource_move),
        help("use a swap or a second transfer to replace the nested resource")
    )]
    InvalidNestedResourceMove {
        #[label]
        span: Span,
    },

    #[error("cannot assign to resource-typed target")]
    #[diagnostic(
        code(sable::invalid_resource_assignment),
        help("use a swap, a force assignment `<-!` for optionals, or a second transfer")
    )]
    InvalidResourceAssignment {
        #[label]
        span: Span,
    },

    #[error("field `{name}` of type `{ty}` is not invalidated (moved or destroyed)")]
    #[diagnostic(code(sable::resource_field_not_invalidated))]
    ResourceFieldNotInvalidated {
        name: String,
        ty: String,
        #[label]
        span: Span,
    },

    #[error("cannot destroy non-resource value of type `{ty}`")]
    #[diagnostic(code(sable::invalid_destruction))]
    InvalidDestruction {
        ty: String,
        #[label]
        span: Span,
    },

    // --- Initialization ---
    #[error("missing initialization of field `{name}` in `{container}`")]
    #[diagnostic(code(sable::field_uninitialized))]
    FieldUninitialized {
        name: String,
        container: String,
        #[label]
        span: Span,
    },

    #[error("cannot access uninitialized field: `{name}`")]
    #[diagnostic(code(sable::uninitialized_field_access))]
    UninitializedFieldAccess {
        name: String,
        #[label]
        span: Span,
    },

    #[error("cannot use incompletely initialized value: `{name}`")]
    #[diagnostic(code(sable::uninitialized_use))]
    UninitializedUse {
        name: String,
        #[label]
        span: Span,
    },

    // --- Control flow ---
    #[error("unreachable statement")]
    #[diagnostic(code(sable::unreachable_statement), severity(Warning))]
    UnreachableStatement {
        #[label]
        span: Span,
    },

    #[error("control statement `{control}` outside of loop")]
    #[diagnostic(code(sable::control_statement))]
    ControlStatement {
        control: &'static str,
        #[label]
        span: Span,
    },
}

fn invalidation_word(maybe: &bool) -> &'static str {
    if *maybe { "potentially invalid" } else { "invalid" }
}

/// Fieldless mirror of [`SemanticError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAccessModifier,
    MissingAccessModifier,
    Redeclaration,
    AttachmentsNotEnabled,
    InvalidNestedDeclaration,
    MissingInitializer,
    MissingDestructor,
    InvalidDestructor,
    InvalidResourceField,
    MissingResourceAnnotation,
    InvalidResourceAnnotation,
    MissingFunctionBody,
    InvalidEnumRawType,
    InvalidAccess,
    InvalidAssignmentAccess,
    NotExported,
    UnresolvedImport,
    ImportedProgram,
    NotDeclared,
    NotDeclaredMember,
    TypeMismatch,
    Conformance,
    DuplicateConformance,
    InvalidConformance,
    CompositeKindMismatch,
    InvalidIntersectionTypeDuplicate,
    AmbiguousIntersectionType,
    InvalidIntersectedType,
    IntersectionCompositeKindMismatch,
    IntersectionMemberClash,
    InvalidBinaryOperands,
    InvalidUnaryOperand,
    NotCallable,
    ArgumentCount,
    MissingArgumentLabel,
    IncorrectArgumentLabel,
    NotIndexable,
    InvalidOptionalChaining,
    MissingReturnValue,
    InvalidReturnValue,
    MissingReturnStatement,
    InvalidConstruction,
    MissingCreate,
    EmitNonEvent,
    InvalidFailableResourceDowncastOutsideOptionalBinding,
    NonReferenceTypeReference,
    TypeParameterTypeInference,
    InvalidTypeArgumentCount,
    AssignmentToConstant,
    AssignmentToConstantMember,
    InvalidAssignmentTarget,
    InvalidSwapExpression,
    ResourceLoss,
    ResourceUseAfterInvalidation,
    InvalidatedResourceReference,
    ResourceCapturing,
    InvalidSelfInvalidation,
    IncorrectTransferOperation,
    MissingMoveOperation,
    InvalidMoveOperation,
    InvalidNestedResourceMove,
    InvalidResourceAssignment,
    ResourceFieldNotInvalidated,
    InvalidDestruction,
    FieldUninitialized,
    UninitializedFieldAccess,
    UninitializedUse,
    UnreachableStatement,
    ControlStatement,
}

impl SemanticError {
    pub fn kind(&self) -> ErrorKind {
        use SemanticError as E;
        match self {
            E::InvalidAccessModifier { .. } => ErrorKind::InvalidAccessModifier,
            E::MissingAccessModifier { .. } => ErrorKind::MissingAccessModifier,
            E::Redeclaration { .. } => ErrorKind::Redeclaration,
            E::AttachmentsNotEnabled { .. } => ErrorKind::AttachmentsNotEnabled,
            E::InvalidNestedDeclaration { .. } => ErrorKind::InvalidNestedDeclaration,
            E::MissingInitializer { .. } => ErrorKind::MissingInitializer,
            E::MissingDestructor { .. } => ErrorKind::MissingDestructor,
            E::InvalidDestructor { .. } => ErrorKind::InvalidDestructor,
            E::InvalidResourceField { .. } => ErrorKind::InvalidResourceField,
            E::MissingResourceAnnotation { .. } => ErrorKind::MissingResourceAnnotation,
            E::InvalidResourceAnnotation { .. } => ErrorKind::InvalidResourceAnnotation,
            E::MissingFunctionBody { .. } => ErrorKind::MissingFunctionBody,
            E::InvalidEnumRawType { .. } => ErrorKind::InvalidEnumRawType,
            E::InvalidAccess { .. } => ErrorKind::InvalidAccess,
            E::InvalidAssignmentAccess { .. } => ErrorKind::InvalidAssignmentAccess,
            E::NotExported { .. } => ErrorKind::NotExported,
            E::UnresolvedImport { .. } => ErrorKind::UnresolvedImport,
            E::ImportedProgram { .. } => ErrorKind::ImportedProgram,
            E::NotDeclared { .. } => ErrorKind::NotDeclared,
            E::NotDeclaredMember { .. } => ErrorKind::NotDeclaredMember,
            E::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            E::Conformance { .. } => ErrorKind::Conformance,
            E::DuplicateConformance { .. } => ErrorKind::DuplicateConformance,
            E::InvalidConformance { .. } => ErrorKind::InvalidConformance,
            E::CompositeKindMismatch { .. } => ErrorKind::CompositeKindMismatch,
            E::InvalidIntersectionTypeDuplicate { .. } => {
                ErrorKind::InvalidIntersectionTypeDuplicate
            }
            E::AmbiguousIntersectionType { .. } => ErrorKind::AmbiguousIntersectionType,
            E::InvalidIntersectedType { .. } => ErrorKind::InvalidIntersectedType,
            E::IntersectionCompositeKindMismatch { .. } => {
                ErrorKind::IntersectionCompositeKindMismatch
            }
            E::IntersectionMemberClash { .. } => ErrorKind::IntersectionMemberClash,
            E::InvalidBinaryOperands { .. } => ErrorKind::InvalidBinaryOperands,
            E::InvalidUnaryOperand { .. } => ErrorKind::InvalidUnaryOperand,
            E::NotCallable { .. } => ErrorKind::NotCallable,
            E::ArgumentCount { .. } => ErrorKind::ArgumentCount,
            E::MissingArgumentLabel { .. } => ErrorKind::MissingArgumentLabel,
            E::IncorrectArgumentLabel { .. } => ErrorKind::IncorrectArgumentLabel,
            E::NotIndexable { .. } => ErrorKind::NotIndexable,
            E::InvalidOptionalChaining { .. } => ErrorKind::InvalidOptionalChaining,
            E::MissingReturnValue { .. } => ErrorKind::MissingReturnValue,
            E::InvalidReturnValue { .. } => ErrorKind::InvalidReturnValue,
            E::MissingReturnStatement { .. } => ErrorKind::MissingReturnStatement,
            E::InvalidConstruction { .. } => ErrorKind::InvalidConstruction,
            E::MissingCreate { .. } => ErrorKind::MissingCreate,
            E::EmitNonEvent { .. } => ErrorKind::EmitNonEvent,
            E::InvalidFailableResourceDowncastOutsideOptionalBinding { .. } => {
                ErrorKind::InvalidFailableResourceDowncastOutsideOptionalBinding
            }
            E::NonReferenceTypeReference { .. } => ErrorKind::NonReferenceTypeReference,
            E::TypeParameterTypeInference { .. } => ErrorKind::TypeParameterTypeInference,
            E::InvalidTypeArgumentCount { .. } => ErrorKind::InvalidTypeArgumentCount,
            E::AssignmentToConstant { .. } => ErrorKind::AssignmentToConstant,
            E::AssignmentToConstantMember { .. } => ErrorKind::AssignmentToConstantMember,
            E::InvalidAssignmentTarget { .. } => ErrorKind::InvalidAssignmentTarget,
            E::InvalidSwapExpression { .. } => ErrorKind::InvalidSwapExpression,
            E::ResourceLoss { .. } => ErrorKind::ResourceLoss,
            E::ResourceUseAfterInvalidation { .. } => ErrorKind::ResourceUseAfterInvalidation,
            E::InvalidatedResourceReference { .. } => ErrorKind::InvalidatedResourceReference,
            E::ResourceCapturing { .. } => ErrorKind::ResourceCapturing,
            E::InvalidSelfInvalidation { .. } => ErrorKind::InvalidSelfInvalidation,
            E::IncorrectTransferOperation { .. } => ErrorKind::IncorrectTransferOperation,
            E::MissingMoveOperation { .. } => ErrorKind::MissingMoveOperation,
            E::InvalidMoveOperation { .. } => ErrorKind::InvalidMoveOperation,
            E::InvalidNestedResourceMove { .. } => ErrorKind::InvalidNestedResourceMove,
            E::InvalidResourceAssignment { .. } => ErrorKind::InvalidResourceAssignment,
            E::ResourceFieldNotInvalidated { .. } => ErrorKind::ResourceFieldNotInvalidated,
            E::InvalidDestruction { .. } => ErrorKind::InvalidDestruction,
            E::FieldUninitialized { .. } => ErrorKind::FieldUninitialized,
            E::UninitializedFieldAccess { .. } => ErrorKind::UninitializedFieldAccess,
            E::UninitializedUse { .. } => ErrorKind::UninitializedUse,
            E::UnreachableStatement { .. } => ErrorKind::UnreachableStatement,
            E::ControlStatement { .. } => ErrorKind::ControlStatement,
        }
    }

    /// Warnings are reported but do not make an elaboration erroneous.
    pub fn is_warning(&self) -> bool {
        matches!(self, SemanticError::UnreachableStatement { .. })
    }

    /// Primary span of the diagnostic.
    pub fn span(&self) -> Span {
        use SemanticError as E;
        match self {
            E::InvalidAccessModifier { span, .. }
            | E::MissingAccessModifier { span, .. }
            | E::Redeclaration { span, .. }
            | E::AttachmentsNotEnabled { span }
            | E::InvalidNestedDeclaration { span, .. }
            | E::MissingInitializer { span, .. }
            | E::MissingDestructor { span, .. }
            | E::InvalidDestructor { span }
            | E::InvalidResourceField { span, .. }
            | E::MissingResourceAnnotation { span }
            | E::InvalidResourceAnnotation { span }
            | E::MissingFunctionBody { span }
            | E::InvalidEnumRawType { span, .. }
            | E::InvalidAccess { span, .. }
            | E::InvalidAssignmentAccess { span, .. }
            | E::NotExported { span, .. }
            | E::UnresolvedImport { span, .. }
            | E::ImportedProgram { span, .. }
            | E::NotDeclared { span, .. }
            | E::NotDeclaredMember { span, .. }
            | E::TypeMismatch { span, .. }
            | E::Conformance { span, .. }
            | E::DuplicateConformance { span, .. }
            | E::InvalidConformance { span, .. }
            | E::CompositeKindMismatch { span, .. }
            | E::InvalidIntersectionTypeDuplicate { span, .. }
            | E::AmbiguousIntersectionType { span }
            | E::InvalidIntersectedType { span, .. }
            | E::IntersectionCompositeKindMismatch { span }
            | E::IntersectionMemberClash { span, .. }
            | E::InvalidBinaryOperands { span, .. }
            | E::InvalidUnaryOperand { span, .. }
            | E::NotCallable { span, .. }
            | E::ArgumentCount { span, .. }
            | E::MissingArgumentLabel { span, .. }
            | E::IncorrectArgumentLabel { span, .. }
            | E::NotIndexable { span, .. }
            | E::InvalidOptionalChaining { span, .. }
            | E::MissingReturnValue { span, .. }
            | E::InvalidReturnValue { span }
            | E::MissingReturnStatement { span }
            | E::InvalidConstruction { span, .. }
            | E::MissingCreate { span }
            | E::EmitNonEvent { span, .. }
            | E::InvalidFailableResourceDowncastOutsideOptionalBinding { span }
            | E::NonReferenceTypeReference { span, .. }
            | E::TypeParameterTypeInference { span, .. }
            | E::InvalidTypeArgumentCount { span, .. }
            | E::AssignmentToConstant { span, .. }
            | E::AssignmentToConstantMember { span, .. }
            | E::InvalidAssignmentTarget { span }
            | E::InvalidSwapExpression { span }
            | E::ResourceLoss { span }
            | E::ResourceUseAfterInvalidation { span, .. }
            | E::InvalidatedResourceReference { span, .. }
            | E::ResourceCapturing { span, .. }
            | E::InvalidSelfInvalidation { span }
            | E::IncorrectTransferOperation { span, .. }
            | E::MissingMoveOperation { span }
            | E::InvalidMoveOperation { span }
            | E::InvalidNestedResourceMove { span }
            | E::InvalidResourceAssignment { span }
            | E::ResourceFieldNotInvalidated { span, .. }
            | E::InvalidDestruction { span, .. }
            | E::FieldUninitialized { span, .. }
            | E::UninitializedFieldAccess { span, .. }
            | E::UninitializedUse { span, .. }
            | E::UnreachableStatement { span }
            | E::ControlStatement { span, .. } => *span,
        }
    }
}

/// All diagnostics of a failed check, rendered together.
#[derive(Debug, Error, Diagnostic)]
#[error("checking failed with {} error(s)", errors.len())]
#[diagnostic(code(sable::check))]
pub struct CheckerError {
    #[related]
    pub errors: Vec<SemanticError>,
}
