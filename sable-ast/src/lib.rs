#![forbid(unsafe_code)]

use std::fmt;

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Smallest span covering both `a` and `b`.
pub fn join(a: Span, b: Span) -> Span {
    let start = a.offset().min(b.offset());
    let end = (a.offset() + a.len()).max(b.offset() + b.len());
    span_between(start, end)
}

pub type Ident = Spanned<String>;

/// Identity of an expression or declaration node.
///
/// Assigned by the parser in discovery order; the checker keys its
/// elaboration tables on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub span: Span,
    pub names: Vec<Ident>,
    pub location: ImportLocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportLocation {
    /// `import A from 0x1`
    Address(Spanned<u64>),
    /// `import A from "other"`
    Path(Spanned<String>),
}

// --- Access modifiers ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetKind {
    Conjunction,
    Disjunction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    NotSpecified,
    /// `access(self)` / `priv`
    Private,
    /// `access(contract)`
    Contract,
    /// `access(account)`
    Account,
    /// `access(all)` / `pub`
    All,
    /// `pub(set)`
    AllSettable,
    /// `access(E1, E2)` or `access(E1 | E2)`
    Entitlements { kind: SetKind, names: Vec<Ident> },
}

impl Access {
    pub fn keyword(&self) -> String {
        match self {
            Access::NotSpecified => String::new(),
            Access::Private => "access(self)".to_string(),
            Access::Contract => "access(contract)".to_string(),
            Access::Account => "access(account)".to_string(),
            Access::All => "access(all)".to_string(),
            Access::AllSettable => "pub(set)".to_string(),
            Access::Entitlements { kind, names } => {
                let sep = match kind {
                    SetKind::Conjunction => ", ",
                    SetKind::Disjunction => " | ",
                };
                let names = names
                    .iter()
                    .map(|n| n.node.as_str())
                    .collect::<Vec<_>>()
                    .join(sep);
                format!("access({names})")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessModifier {
    pub span: Span,
    pub access: Access,
}

impl AccessModifier {
    pub fn not_specified(span: Span) -> Self {
        Self {
            span,
            access: Access::NotSpecified,
        }
    }
}

// --- Declarations ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Struct,
    Resource,
    Contract,
    Event,
    Enum,
    Attachment,
}

impl CompositeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            CompositeKind::Struct => "struct",
            CompositeKind::Resource => "resource",
            CompositeKind::Contract => "contract",
            CompositeKind::Event => "event",
            CompositeKind::Enum => "enum",
            CompositeKind::Attachment => "attachment",
        }
    }
}

impl fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarKind {
    Let,
    Var,
}

impl VarKind {
    pub fn keyword(self) -> &'static str {
        match self {
            VarKind::Let => "let",
            VarKind::Var => "var",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Composite(CompositeDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
    Entitlement(EntitlementDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::Composite(d) => d.span,
            Decl::Function(d) => d.span,
            Decl::Variable(d) => d.span,
            Decl::Entitlement(d) => d.span,
        }
    }

    pub fn name(&self) -> &Ident {
        match self {
            Decl::Composite(d) => &d.name,
            Decl::Function(d) => &d.name,
            Decl::Variable(d) => &d.name,
            Decl::Entitlement(d) => &d.name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompositeDecl {
    pub id: NodeId,
    pub span: Span,
    pub access: AccessModifier,
    pub kind: CompositeKind,
    pub is_interface: bool,
    pub name: Ident,
    /// Conformances; for enums the first entry is the raw type.
    pub conformances: Vec<Ident>,
    /// Base type of an attachment (`attachment A for T`).
    pub base: Option<TypeAnnot>,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Function(FunctionDecl),
    Init(SpecialFunction),
    Destroy(SpecialFunction),
    Case(EnumCase),
    Nested(Decl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub span: Span,
    pub access: AccessModifier,
    pub kind: VarKind,
    pub name: Ident,
    pub ty: TypeAnnot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub span: Span,
    /// Argument label callers must write; `None` when declared with `_`.
    pub label: Option<Ident>,
    pub name: Ident,
    pub ty: TypeAnnot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub span: Span,
    pub access: AccessModifier,
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub params: Vec<Param>,
    pub ret: Option<TypeAnnot>,
    pub body: Option<Block>,
}

/// `init(...)` and `destroy()`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecialFunction {
    pub id: NodeId,
    pub span: Span,
    pub access: AccessModifier,
    pub params: Vec<Param>,
    pub body: Option<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumCase {
    pub id: NodeId,
    pub span: Span,
    pub access: AccessModifier,
    pub name: Ident,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableDecl {
    pub id: NodeId,
    pub span: Span,
    pub access: AccessModifier,
    pub kind: VarKind,
    pub name: Ident,
    pub ty: Option<TypeAnnot>,
    pub transfer: Transfer,
    pub value: Expr,
    /// `let old <- target <- second`
    pub second: Option<(Transfer, Expr)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntitlementDecl {
    pub id: NodeId,
    pub span: Span,
    pub access: AccessModifier,
    pub name: Ident,
}

// --- Types ---

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAnnot {
    pub span: Span,
    /// Leading `@`.
    pub is_resource: bool,
    pub ty: TypeExpr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Authorization {
    pub span: Span,
    pub kind: SetKind,
    pub entitlements: Vec<Ident>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExpr {
    Named(Ident),
    /// `T<A, B>` (only `Capability<...>` today)
    Instantiation {
        span: Span,
        base: Ident,
        args: Vec<TypeAnnot>,
    },
    Optional {
        span: Span,
        inner: Box<TypeExpr>,
    },
    VariableSized {
        span: Span,
        elem: Box<TypeAnnot>,
    },
    ConstantSized {
        span: Span,
        elem: Box<TypeAnnot>,
        size: u64,
    },
    Dictionary {
        span: Span,
        key: Box<TypeAnnot>,
        value: Box<TypeAnnot>,
    },
    Function {
        span: Span,
        params: Vec<TypeAnnot>,
        ret: Box<TypeAnnot>,
    },
    Reference {
        span: Span,
        auth: Option<Authorization>,
        referenced: Box<TypeExpr>,
    },
    Intersection {
        span: Span,
        types: Vec<Ident>,
    },
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named(n) => n.span,
            TypeExpr::Instantiation { span, .. }
            | TypeExpr::Optional { span, .. }
            | TypeExpr::VariableSized { span, .. }
            | TypeExpr::ConstantSized { span, .. }
            | TypeExpr::Dictionary { span, .. }
            | TypeExpr::Function { span, .. }
            | TypeExpr::Reference { span, .. }
            | TypeExpr::Intersection { span, .. } => *span,
        }
    }
}

// --- Statements ---

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transfer {
    /// `=`
    Copy,
    /// `<-`
    Move,
    /// `<-!`
    ForceMove,
}

impl Transfer {
    pub fn operator(self) -> &'static str {
        match self {
            Transfer::Copy => "=",
            Transfer::Move => "<-",
            Transfer::ForceMove => "<-!",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Variable(VariableDecl),
    Function(FunctionDecl),
    /// Composite declarations are only meaningful at the top level and in
    /// contracts; kept here so the checker can report misplaced ones.
    Composite(CompositeDecl),
    Assign(AssignStmt),
    Swap(SwapStmt),
    If(IfStmt),
    While(WhileStmt),
    Return(ReturnStmt),
    Break(Span),
    Continue(Span),
    Destroy(DestroyStmt),
    Emit(EmitStmt),
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Variable(s) => s.span,
            Stmt::Function(s) => s.span,
            Stmt::Composite(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Swap(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Break(span) | Stmt::Continue(span) => *span,
            Stmt::Destroy(s) => s.span,
            Stmt::Emit(s) => s.span,
            Stmt::Expr(e) => e.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub span: Span,
    pub target: Expr,
    pub transfer: Transfer,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwapStmt {
    pub span: Span,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IfTest {
    Expr(Expr),
    /// `if let x = e` / `if let x <- e`
    Binding(VariableDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub span: Span,
    pub test: IfTest,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfStmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub span: Span,
    pub cond: Expr,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DestroyStmt {
    pub span: Span,
    pub expr: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmitStmt {
    pub span: Span,
    pub event: Expr,
}

// --- Expressions ---

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub span: Span,
    pub label: Option<Ident>,
    pub value: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastKind {
    /// `as`
    Static,
    /// `as?`
    Failable,
    /// `as!`
    Force,
}

impl CastKind {
    pub fn operator(self) -> &'static str {
        match self {
            CastKind::Static => "as",
            CastKind::Failable => "as?",
            CastKind::Force => "as!",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    /// `self`
    SelfRef,
    Nil,
    Bool(bool),
    Int(u128),
    /// Fixed-point literal, as written.
    Fixed { text: String },
    String(String),
    Array(Vec<Expr>),
    Dictionary(Vec<(Expr, Expr)>),
    Member {
        base: Box<Expr>,
        optional: bool,
        member: Ident,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeAnnot>,
        args: Vec<Argument>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Force(Box<Expr>),
    Cast {
        expr: Box<Expr>,
        kind: CastKind,
        ty: TypeAnnot,
    },
    /// `create C(...)`; the inner expression is the constructor call.
    Create(Box<Expr>),
    /// `<-e`
    Move(Box<Expr>),
    /// `&e as T`; the target is the reference type annotation.
    Reference {
        expr: Box<Expr>,
        ty: TypeAnnot,
    },
    Function(Box<FunctionExpr>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionExpr {
    pub params: Vec<Param>,
    pub ret: Option<TypeAnnot>,
    pub body: Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,

    NilCoalesce,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::NilCoalesce => "??",
        }
    }
}
