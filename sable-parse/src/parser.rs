#![forbid(unsafe_code)]

use std::mem;

use sable_ast::{
    Access, AccessModifier, Argument, AssignStmt, Authorization, BinOp, Block, CastKind,
    CompositeDecl, CompositeKind, Decl, DestroyStmt, ElseBranch, EmitStmt, EntitlementDecl,
    EnumCase, Expr, ExprKind, FieldDecl, FunctionDecl, FunctionExpr, Ident, IfStmt, IfTest,
    Import, ImportLocation, Member, NodeId, Param, Program, ReturnStmt, SetKind,
    SpecialFunction, Span, Spanned, Stmt, SwapStmt, Transfer, TypeAnnot, TypeExpr, UnaryOp,
    VarKind, VariableDecl, WhileStmt, join, span_between,
};
use sable_lex::{Token, TokenKind};

use crate::error::ParseError;

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    next_node: u32,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            idx: 0,
            next_node: 0,
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut imports = Vec::new();
        let mut decls = Vec::new();
        loop {
            self.skip_semis();
            if self.at(TokenKind::Eof) {
                break;
            }
            if self.at(TokenKind::KwImport) {
                imports.push(self.parse_import()?);
            } else {
                decls.push(self.parse_decl()?);
            }
        }
        Ok(Program { imports, decls })
    }

    /// Parse a program while attempting to recover from errors.
    ///
    /// On a declaration parse error, skip tokens until the next token that can
    /// start a top-level declaration, then continue.
    pub fn parse_program_with_recovery(&mut self) -> (Program, Vec<ParseError>) {
        let mut imports = Vec::new();
        let mut decls = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_semis();
            if self.at(TokenKind::Eof) {
                break;
            }
            let result = if self.at(TokenKind::KwImport) {
                self.parse_import().map(|i| imports.push(i))
            } else {
                self.parse_decl().map(|d| decls.push(d))
            };
            if let Err(err) = result {
                errors.push(err);
                self.recover_to_decl_boundary();
            }
        }

        (Program { imports, decls }, errors)
    }

    fn recover_to_decl_boundary(&mut self) {
        // Always make progress.
        if !self.at(TokenKind::Eof) {
            self.next();
        }
        while let Some(kind) = self.peek_kind() {
            let boundary = matches!(
                kind,
                TokenKind::Eof
                    | TokenKind::KwImport
                    | TokenKind::KwStruct
                    | TokenKind::KwResource
                    | TokenKind::KwContract
                    | TokenKind::KwEvent
                    | TokenKind::KwEnum
                    | TokenKind::KwAttachment
                    | TokenKind::KwEntitlement
                    | TokenKind::KwFun
                    | TokenKind::KwAccess
                    | TokenKind::KwPub
                    | TokenKind::KwPriv
            );
            if boundary && self.peek().is_some_and(|t| t.newline_before) {
                break;
            }
            if matches!(kind, TokenKind::Eof) {
                break;
            }
            self.next();
        }
    }

    pub fn parse_expr_eof(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if !self.at(TokenKind::Eof) {
            return Err(ParseError {
                message: "expected end of input after expression".to_string(),
                span: self.peek_span(),
            });
        }
        Ok(expr)
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    // --- Imports ---

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        let kw = self.expect(TokenKind::KwImport)?;
        // `import "path"` takes every name the importer may see.
        let mut names = Vec::new();
        if !matches!(self.peek_kind(), Some(TokenKind::String(_))) {
            names.push(self.expect_ident()?);
            while self.at(TokenKind::Comma) {
                self.next();
                names.push(self.expect_ident()?);
            }
            self.expect_contextual("from")?;
        }
        let tok = self.expect_any()?;
        let location = match tok.kind {
            TokenKind::Int(n) => {
                let address = u64::try_from(n).map_err(|_| ParseError {
                    message: "address literal does not fit in 64 bits".to_string(),
                    span: tok.span,
                })?;
                ImportLocation::Address(Spanned::new(tok.span, address))
            }
            TokenKind::String(path) => ImportLocation::Path(Spanned::new(tok.span, path)),
            other => {
                return Err(ParseError {
                    message: format!(
                        "expected address or string location, found {}",
                        other.describe()
                    ),
                    span: tok.span,
                });
            }
        };
        Ok(Import {
            span: join(kw.span, tok.span),
            names,
            location,
        })
    }

    // --- Access modifiers ---

    fn parse_access(&mut self) -> Result<AccessModifier, ParseError> {
        let start = self.peek_span();
        match self.peek_kind() {
            Some(TokenKind::KwPriv) => {
                self.next();
                Ok(AccessModifier {
                    span: start,
                    access: Access::Private,
                })
            }
            Some(TokenKind::KwPub) => {
                self.next();
                let settable = self.at(TokenKind::LParen)
                    && matches!(self.peek_kind_n(1), Some(TokenKind::Ident(s)) if s == "set");
                if !settable {
                    return Ok(AccessModifier {
                        span: start,
                        access: Access::All,
                    });
                }
                self.next();
                self.next();
                let rp = self.expect(TokenKind::RParen)?;
                Ok(AccessModifier {
                    span: join(start, rp.span),
                    access: Access::AllSettable,
                })
            }
            Some(TokenKind::KwAccess) => {
                self.next();
                self.expect(TokenKind::LParen)?;
                let access = match self.peek_kind() {
                    Some(TokenKind::KwSelf) => {
                        self.next();
                        Access::Private
                    }
                    Some(TokenKind::KwContract) => {
                        self.next();
                        Access::Contract
                    }
                    Some(TokenKind::Ident(s)) if s == "account" => {
                        self.next();
                        Access::Account
                    }
                    Some(TokenKind::Ident(s)) if s == "all" => {
                        self.next();
                        Access::All
                    }
                    _ => {
                        let (kind, names) = self.parse_entitlement_list()?;
                        Access::Entitlements { kind, names }
                    }
                };
                let rp = self.expect(TokenKind::RParen)?;
                Ok(AccessModifier {
                    span: join(start, rp.span),
                    access,
                })
            }
            _ => Ok(AccessModifier::not_specified(span_between(
                start.offset(),
                start.offset(),
            ))),
        }
    }

    /// `E1, E2` or `E1 | E2`; mixing separators is rejected.
    fn parse_entitlement_list(&mut self) -> Result<(SetKind, Vec<Ident>), ParseError> {
        let mut names = vec![self.expect_ident()?];
        let mut kind: Option<SetKind> = None;
        loop {
            let sep = match self.peek_kind() {
                Some(TokenKind::Comma) => SetKind::Conjunction,
                Some(TokenKind::Pipe) => SetKind::Disjunction,
                _ => break,
            };
            let tok = self.expect_any()?;
            if kind.is_some_and(|k| k != sep) {
                return Err(ParseError {
                    message: "cannot mix `,` and `|` in an entitlement set".to_string(),
                    span: tok.span,
                });
            }
            kind = Some(sep);
            names.push(self.expect_ident()?);
        }
        Ok((kind.unwrap_or(SetKind::Conjunction), names))
    }

    // --- Declarations ---

    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        let access = self.parse_access()?;
        self.parse_decl_after_access(access)
    }

    fn parse_decl_after_access(&mut self, access: AccessModifier) -> Result<Decl, ParseError> {
        match self.peek_kind() {
            Some(
                TokenKind::KwStruct
                | TokenKind::KwResource
                | TokenKind::KwContract
                | TokenKind::KwEvent
                | TokenKind::KwEnum
                | TokenKind::KwAttachment,
            ) => Ok(Decl::Composite(self.parse_composite(access)?)),
            Some(TokenKind::KwFun) => Ok(Decl::Function(self.parse_function(access)?)),
            Some(TokenKind::KwLet | TokenKind::KwVar) => {
                Ok(Decl::Variable(self.parse_variable_decl(access)?))
            }
            Some(TokenKind::KwEntitlement) => {
                let kw = self.expect(TokenKind::KwEntitlement)?;
                let name = self.expect_ident()?;
                Ok(Decl::Entitlement(EntitlementDecl {
                    id: self.node_id(),
                    span: join(kw.span, name.span),
                    access,
                    name,
                }))
            }
            _ => {
                let tok = self.expect_any()?;
                Err(ParseError {
                    message: format!("expected declaration, found {}", tok.kind.describe()),
                    span: tok.span,
                })
            }
        }
    }

    fn parse_composite(&mut self, access: AccessModifier) -> Result<CompositeDecl, ParseError> {
        let kw = self.expect_any()?;
        let kind = match kw.kind {
            TokenKind::KwStruct => CompositeKind::Struct,
            TokenKind::KwResource => CompositeKind::Resource,
            TokenKind::KwContract => CompositeKind::Contract,
            TokenKind::KwEvent => CompositeKind::Event,
            TokenKind::KwEnum => CompositeKind::Enum,
            TokenKind::KwAttachment => CompositeKind::Attachment,
            other => {
                return Err(ParseError {
                    message: format!("expected composite kind, found {}", other.describe()),
                    span: kw.span,
                });
            }
        };
        let start = if access.access == Access::NotSpecified {
            kw.span
        } else {
            access.span
        };

        let is_interface = self.at(TokenKind::KwInterface);
        if is_interface {
            self.next();
        }
        let name = self.expect_ident()?;
        let id = self.node_id();

        // Events declare their fields through a parameter list.
        if kind == CompositeKind::Event {
            let params = self.parse_params()?;
            let end = self.prev_span();
            let span = join(start, end);
            let init = SpecialFunction {
                id: self.node_id(),
                span: join(name.span, end),
                access: AccessModifier::not_specified(name.span),
                params,
                body: None,
            };
            return Ok(CompositeDecl {
                id,
                span,
                access,
                kind,
                is_interface,
                name,
                conformances: Vec::new(),
                base: None,
                members: vec![Member::Init(init)],
            });
        }

        let base = if kind == CompositeKind::Attachment {
            self.expect(TokenKind::KwFor)?;
            Some(self.parse_type_annot()?)
        } else {
            None
        };

        let mut conformances = Vec::new();
        if self.at(TokenKind::Colon) {
            self.next();
            conformances.push(self.expect_ident()?);
            while self.at(TokenKind::Comma) {
                self.next();
                conformances.push(self.expect_ident()?);
            }
        }

        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        loop {
            self.skip_semis();
            if self.at(TokenKind::RBrace) || self.at(TokenKind::Eof) {
                break;
            }
            members.push(self.parse_member()?);
        }
        let rb = self.expect(TokenKind::RBrace)?;

        Ok(CompositeDecl {
            id,
            span: join(start, rb.span),
            access,
            kind,
            is_interface,
            name,
            conformances,
            base,
            members,
        })
    }

    fn parse_member(&mut self) -> Result<Member, ParseError> {
        let access = self.parse_access()?;
        match self.peek_kind() {
            Some(TokenKind::KwLet | TokenKind::KwVar) => {
                let kw = self.expect_any()?;
                let kind = if kw.kind == TokenKind::KwLet {
                    VarKind::Let
                } else {
                    VarKind::Var
                };
                let name = self.expect_ident()?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type_annot()?;
                let start = if access.access == Access::NotSpecified {
                    kw.span
                } else {
                    access.span
                };
                Ok(Member::Field(FieldDecl {
                    id: self.node_id(),
                    span: join(start, ty.span),
                    access,
                    kind,
                    name,
                    ty,
                }))
            }
            Some(TokenKind::KwFun) => Ok(Member::Function(self.parse_function(access)?)),
            Some(TokenKind::KwInit) => {
                let kw = self.expect_any()?;
                let params = self.parse_params()?;
                let body = self.parse_optional_body()?;
                Ok(Member::Init(SpecialFunction {
                    id: self.node_id(),
                    span: join(kw.span, self.prev_span()),
                    access,
                    params,
                    body,
                }))
            }
            Some(TokenKind::KwDestroy) => {
                let kw = self.expect_any()?;
                let params = self.parse_params()?;
                let body = self.parse_optional_body()?;
                Ok(Member::Destroy(SpecialFunction {
                    id: self.node_id(),
                    span: join(kw.span, self.prev_span()),
                    access,
                    params,
                    body,
                }))
            }
            Some(TokenKind::KwCase) => {
                let kw = self.expect_any()?;
                let name = self.expect_ident()?;
                Ok(Member::Case(EnumCase {
                    id: self.node_id(),
                    span: join(kw.span, name.span),
                    access,
                    name,
                }))
            }
            _ => Ok(Member::Nested(self.parse_decl_after_access(access)?)),
        }
    }

    fn parse_optional_body(&mut self) -> Result<Option<Block>, ParseError> {
        if self.at(TokenKind::LBrace) {
            Ok(Some(self.parse_block()?))
        } else {
            Ok(None)
        }
    }

    fn parse_function(&mut self, access: AccessModifier) -> Result<FunctionDecl, ParseError> {
        let kw = self.expect(TokenKind::KwFun)?;
        let name = self.expect_ident()?;

        let mut type_params = Vec::new();
        if self.at(TokenKind::Lt) {
            self.next();
            type_params.push(self.expect_ident()?);
            while self.at(TokenKind::Comma) {
                self.next();
                type_params.push(self.expect_ident()?);
            }
            self.expect(TokenKind::Gt)?;
        }

        let params = self.parse_params()?;
        let ret = if self.at(TokenKind::Colon) {
            self.next();
            Some(self.parse_type_annot()?)
        } else {
            None
        };
        let body = self.parse_optional_body()?;
        let start = if access.access == Access::NotSpecified {
            kw.span
        } else {
            access.span
        };

        Ok(FunctionDecl {
            id: self.node_id(),
            span: join(start, self.prev_span()),
            access,
            name,
            type_params,
            params,
            ret,
            body,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            let first = self.expect_ident()?;
            let (label, name) = if matches!(self.peek_kind(), Some(TokenKind::Ident(_))) {
                let name = self.expect_ident()?;
                let label = (first.node != "_").then_some(first);
                (label, name)
            } else {
                (Some(first.clone()), first)
            };
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type_annot()?;
            let start = label.as_ref().map_or(name.span, |l| l.span);
            params.push(Param {
                span: join(start, ty.span),
                label,
                name,
                ty,
            });
            if !self.at(TokenKind::Comma) {
                break;
            }
            self.next();
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_variable_decl(&mut self, access: AccessModifier) -> Result<VariableDecl, ParseError> {
        let kw = self.expect_any()?;
        let kind = match kw.kind {
            TokenKind::KwLet => VarKind::Let,
            TokenKind::KwVar => VarKind::Var,
            other => {
                return Err(ParseError {
                    message: format!("expected `let` or `var`, found {}", other.describe()),
                    span: kw.span,
                });
            }
        };
        let name = self.expect_ident()?;
        let ty = if self.at(TokenKind::Colon) {
            self.next();
            Some(self.parse_type_annot()?)
        } else {
            None
        };
        let transfer = self.expect_transfer()?;
        let value = self.parse_expr()?;

        let second = match self.peek_transfer() {
            Some(t) if !self.peek().is_some_and(|tok| tok.newline_before) => {
                self.next();
                Some((t, self.parse_expr()?))
            }
            _ => None,
        };

        let end = second.as_ref().map_or(value.span, |(_, e)| e.span);
        let start = if access.access == Access::NotSpecified {
            kw.span
        } else {
            access.span
        };
        Ok(VariableDecl {
            id: self.node_id(),
            span: join(start, end),
            access,
            kind,
            name,
            ty,
            transfer,
            value,
            second,
        })
    }

    fn peek_transfer(&self) -> Option<Transfer> {
        match self.peek_kind() {
            Some(TokenKind::Eq) => Some(Transfer::Copy),
            Some(TokenKind::Move) => Some(Transfer::Move),
            Some(TokenKind::ForceMove) => Some(Transfer::ForceMove),
            _ => None,
        }
    }

    fn expect_transfer(&mut self) -> Result<Transfer, ParseError> {
        match self.peek_transfer() {
            Some(t) => {
                self.next();
                Ok(t)
            }
            None => Err(ParseError {
                message: "expected transfer operation `=`, `<-` or `<-!`".to_string(),
                span: self.peek_span(),
            }),
        }
    }

    // --- Types ---

    fn parse_type_annot(&mut self) -> Result<TypeAnnot, ParseError> {
        let start = self.peek_span();
        let is_resource = self.at(TokenKind::At);
        if is_resource {
            self.next();
        }
        let ty = self.parse_type()?;
        Ok(TypeAnnot {
            span: join(start, ty.span()),
            is_resource,
            ty,
        })
    }

    /// `Name` or `Outer.Inner`, kept as one dotted identifier.
    fn parse_qualified_name(&mut self) -> Result<Ident, ParseError> {
        let mut name = self.expect_ident()?;
        while self.at(TokenKind::Dot) && matches!(self.peek_kind_n(1), Some(TokenKind::Ident(_))) {
            self.next();
            let part = self.expect_ident()?;
            name = Spanned::new(
                join(name.span, part.span),
                format!("{}.{}", name.node, part.node),
            );
        }
        Ok(name)
    }

    fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let mut ty = self.parse_type_primary()?;
        while self.at(TokenKind::Question) {
            let q = self.expect_any()?;
            ty = TypeExpr::Optional {
                span: join(ty.span(), q.span),
                inner: Box::new(ty),
            };
        }
        Ok(ty)
    }

    fn parse_type_primary(&mut self) -> Result<TypeExpr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Ident(s)) if s == "auth" => {
                let kw = self.expect_any()?;
                self.expect(TokenKind::LParen)?;
                let (kind, entitlements) = self.parse_entitlement_list()?;
                let rp = self.expect(TokenKind::RParen)?;
                let auth = Authorization {
                    span: join(kw.span, rp.span),
                    kind,
                    entitlements,
                };
                self.expect(TokenKind::Amp)?;
                let referenced = self.parse_type_primary()?;
                Ok(TypeExpr::Reference {
                    span: join(kw.span, referenced.span()),
                    auth: Some(auth),
                    referenced: Box::new(referenced),
                })
            }
            Some(TokenKind::Amp) => {
                let amp = self.expect_any()?;
                let referenced = self.parse_type_primary()?;
                Ok(TypeExpr::Reference {
                    span: join(amp.span, referenced.span()),
                    auth: None,
                    referenced: Box::new(referenced),
                })
            }
            Some(TokenKind::Ident(_)) => {
                let name = self.parse_qualified_name()?;
                if !self.at(TokenKind::Lt) {
                    return Ok(TypeExpr::Named(name));
                }
                self.next();
                let mut args = vec![self.parse_type_annot()?];
                while self.at(TokenKind::Comma) {
                    self.next();
                    args.push(self.parse_type_annot()?);
                }
                let gt = self.expect(TokenKind::Gt)?;
                Ok(TypeExpr::Instantiation {
                    span: join(name.span, gt.span),
                    base: name,
                    args,
                })
            }
            Some(TokenKind::LBracket) => {
                let lb = self.expect_any()?;
                let elem = Box::new(self.parse_type_annot()?);
                if self.at(TokenKind::Semi) {
                    self.next();
                    let tok = self.expect_any()?;
                    let TokenKind::Int(n) = tok.kind else {
                        return Err(ParseError {
                            message: "expected array size".to_string(),
                            span: tok.span,
                        });
                    };
                    let size = u64::try_from(n).map_err(|_| ParseError {
                        message: "array size is too large".to_string(),
                        span: tok.span,
                    })?;
                    let rb = self.expect(TokenKind::RBracket)?;
                    return Ok(TypeExpr::ConstantSized {
                        span: join(lb.span, rb.span),
                        elem,
                        size,
                    });
                }
                let rb = self.expect(TokenKind::RBracket)?;
                Ok(TypeExpr::VariableSized {
                    span: join(lb.span, rb.span),
                    elem,
                })
            }
            Some(TokenKind::LBrace) => {
                let lb = self.expect_any()?;
                if self.at(TokenKind::RBrace) {
                    let rb = self.expect_any()?;
                    return Ok(TypeExpr::Intersection {
                        span: join(lb.span, rb.span),
                        types: Vec::new(),
                    });
                }
                let first = self.parse_type_annot()?;
                if self.at(TokenKind::Colon) {
                    self.next();
                    let value = self.parse_type_annot()?;
                    let rb = self.expect(TokenKind::RBrace)?;
                    return Ok(TypeExpr::Dictionary {
                        span: join(lb.span, rb.span),
                        key: Box::new(first),
                        value: Box::new(value),
                    });
                }
                let mut types = vec![intersected_name(first)?];
                while self.at(TokenKind::Comma) {
                    self.next();
                    types.push(self.parse_qualified_name()?);
                }
                let rb = self.expect(TokenKind::RBrace)?;
                Ok(TypeExpr::Intersection {
                    span: join(lb.span, rb.span),
                    types,
                })
            }
            Some(TokenKind::KwFun) => {
                let kw = self.expect_any()?;
                self.expect(TokenKind::LParen)?;
                let mut params = Vec::new();
                while !self.at(TokenKind::RParen) {
                    params.push(self.parse_type_annot()?);
                    if !self.at(TokenKind::Comma) {
                        break;
                    }
                    self.next();
                }
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Colon)?;
                let ret = self.parse_type_annot()?;
                Ok(TypeExpr::Function {
                    span: join(kw.span, ret.span),
                    params,
                    ret: Box::new(ret),
                })
            }
            Some(TokenKind::LParen) => {
                self.next();
                let ty = self.parse_type()?;
                self.expect(TokenKind::RParen)?;
                Ok(ty)
            }
            _ => {
                let tok = self.expect_any()?;
                Err(ParseError {
                    message: format!("expected type, found {}", tok.kind.describe()),
                    span: tok.span,
                })
            }
        }
    }

    // --- Statements ---

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let lb = self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            self.skip_semis();
            if self.at(TokenKind::RBrace) || self.at(TokenKind::Eof) {
                break;
            }
            stmts.push(self.parse_stmt()?);
        }
        let rb = self.expect(TokenKind::RBrace)?;
        Ok(Block {
            span: join(lb.span, rb.span),
            stmts,
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwAccess | TokenKind::KwPub | TokenKind::KwPriv) => {
                let access = self.parse_access()?;
                self.parse_decl_stmt(access)
            }
            Some(
                TokenKind::KwLet
                | TokenKind::KwVar
                | TokenKind::KwStruct
                | TokenKind::KwResource
                | TokenKind::KwContract
                | TokenKind::KwEvent
                | TokenKind::KwEnum
                | TokenKind::KwAttachment,
            ) => {
                let access = self.parse_access()?;
                self.parse_decl_stmt(access)
            }
            Some(TokenKind::KwFun) if matches!(self.peek_kind_n(1), Some(TokenKind::Ident(_))) => {
                let access = self.parse_access()?;
                self.parse_decl_stmt(access)
            }
            Some(TokenKind::KwIf) => Ok(Stmt::If(self.parse_if()?)),
            Some(TokenKind::KwWhile) => {
                let kw = self.expect_any()?;
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                Ok(Stmt::While(WhileStmt {
                    span: join(kw.span, body.span),
                    cond,
                    body,
                }))
            }
            Some(TokenKind::KwReturn) => {
                let kw = self.expect_any()?;
                let has_value = self.peek().is_some_and(|t| {
                    !t.newline_before
                        && !matches!(t.kind, TokenKind::RBrace | TokenKind::Semi | TokenKind::Eof)
                });
                let value = if has_value {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                let span = value.as_ref().map_or(kw.span, |v| join(kw.span, v.span));
                Ok(Stmt::Return(ReturnStmt { span, value }))
            }
            Some(TokenKind::KwBreak) => Ok(Stmt::Break(self.expect_any()?.span)),
            Some(TokenKind::KwContinue) => Ok(Stmt::Continue(self.expect_any()?.span)),
            Some(TokenKind::KwDestroy) => {
                let kw = self.expect_any()?;
                let expr = self.parse_expr()?;
                Ok(Stmt::Destroy(DestroyStmt {
                    span: join(kw.span, expr.span),
                    expr,
                }))
            }
            Some(TokenKind::KwEmit) => {
                let kw = self.expect_any()?;
                let event = self.parse_expr()?;
                Ok(Stmt::Emit(EmitStmt {
                    span: join(kw.span, event.span),
                    event,
                }))
            }
            _ => self.parse_expr_or_assign_stmt(),
        }
    }

    fn parse_decl_stmt(&mut self, access: AccessModifier) -> Result<Stmt, ParseError> {
        match self.parse_decl_after_access(access)? {
            Decl::Variable(v) => Ok(Stmt::Variable(v)),
            Decl::Function(f) => Ok(Stmt::Function(f)),
            Decl::Composite(c) => Ok(Stmt::Composite(c)),
            Decl::Entitlement(e) => Err(ParseError {
                message: "entitlements can only be declared at the top level or in a contract"
                    .to_string(),
                span: e.span,
            }),
        }
    }

    fn parse_expr_or_assign_stmt(&mut self) -> Result<Stmt, ParseError> {
        let target = self.parse_expr()?;
        let continues_line = self.peek().is_some_and(|t| !t.newline_before);

        if continues_line && self.at(TokenKind::Swap) {
            self.next();
            let right = self.parse_expr()?;
            return Ok(Stmt::Swap(SwapStmt {
                span: join(target.span, right.span),
                left: target,
                right,
            }));
        }

        if continues_line {
            if let Some(transfer) = self.peek_transfer() {
                self.next();
                let value = self.parse_expr()?;
                return Ok(Stmt::Assign(AssignStmt {
                    span: join(target.span, value.span),
                    target,
                    transfer,
                    value,
                }));
            }
        }

        Ok(Stmt::Expr(target))
    }

    fn parse_if(&mut self) -> Result<IfStmt, ParseError> {
        let kw = self.expect(TokenKind::KwIf)?;
        let test = if self.at(TokenKind::KwLet) || self.at(TokenKind::KwVar) {
            let access = AccessModifier::not_specified(kw.span);
            IfTest::Binding(self.parse_variable_decl(access)?)
        } else {
            IfTest::Expr(self.parse_expr()?)
        };
        let then_block = self.parse_block()?;

        let else_branch = if self.at(TokenKind::KwElse) {
            self.next();
            if self.at(TokenKind::KwIf) {
                Some(ElseBranch::If(Box::new(self.parse_if()?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };

        let end = match &else_branch {
            Some(ElseBranch::Block(b)) => b.span,
            Some(ElseBranch::If(i)) => i.span,
            None => then_block.span,
        };
        Ok(IfStmt {
            span: join(kw.span, end),
            test,
            then_block,
            else_branch,
        })
    }

    // --- Expressions ---

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_conditional_expr()
    }

    fn mk(&mut self, span: Span, kind: ExprKind) -> Expr {
        Expr {
            id: self.node_id(),
            span,
            kind,
        }
    }

    fn binary(&mut self, left: Expr, op: BinOp, right: Expr) -> Expr {
        let span = join(left.span, right.span);
        self.mk(
            span,
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
        )
    }

    fn parse_conditional_expr(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_or_expr()?;
        if !self.at(TokenKind::Question) {
            return Ok(cond);
        }
        self.next();
        let then = self.parse_conditional_expr()?;
        self.expect(TokenKind::Colon)?;
        let otherwise = self.parse_conditional_expr()?;
        let span = join(cond.span, otherwise.span);
        Ok(self.mk(
            span,
            ExprKind::Conditional {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
        ))
    }

    fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;
        while self.at(TokenKind::OrOr) {
            self.next();
            let right = self.parse_and_expr()?;
            left = self.binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_cmp_expr()?;
        while self.at(TokenKind::AndAnd) {
            self.next();
            let right = self.parse_cmp_expr()?;
            left = self.binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_nil_coalescing_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinOp::Eq,
                Some(TokenKind::Neq) => BinOp::Ne,
                Some(TokenKind::Lt) => BinOp::Lt,
                Some(TokenKind::Gt) => BinOp::Gt,
                Some(TokenKind::Le) => BinOp::Le,
                Some(TokenKind::Ge) => BinOp::Ge,
                _ => break,
            };
            self.next();
            let right = self.parse_nil_coalescing_expr()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    /// `??` is right-associative.
    fn parse_nil_coalescing_expr(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_add_expr()?;
        if !self.at(TokenKind::QuestionQuestion) {
            return Ok(left);
        }
        self.next();
        let right = self.parse_nil_coalescing_expr()?;
        Ok(self.binary(left, BinOp::NilCoalesce, right))
    }

    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let right = self.parse_mul_expr()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_cast_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Percent) => BinOp::Mod,
                _ => break,
            };
            self.next();
            let right = self.parse_cast_expr()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_cast_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary_expr()?;
        while self.at(TokenKind::KwAs) {
            self.next();
            let kind = match self.peek_kind() {
                Some(TokenKind::Question) => {
                    self.next();
                    CastKind::Failable
                }
                Some(TokenKind::Bang) => {
                    self.next();
                    CastKind::Force
                }
                _ => CastKind::Static,
            };
            let ty = self.parse_type_annot()?;
            let span = join(expr.span, ty.span);
            expr = self.mk(
                span,
                ExprKind::Cast {
                    expr: Box::new(expr),
                    kind,
                    ty,
                },
            );
        }
        Ok(expr)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek_span();
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.next();
                let inner = self.parse_unary_expr()?;
                Ok(self.mk(
                    join(start, inner.span),
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        expr: Box::new(inner),
                    },
                ))
            }
            Some(TokenKind::Bang) => {
                self.next();
                let inner = self.parse_unary_expr()?;
                Ok(self.mk(
                    join(start, inner.span),
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        expr: Box::new(inner),
                    },
                ))
            }
            Some(TokenKind::Move) => {
                self.next();
                let inner = self.parse_unary_expr()?;
                Ok(self.mk(join(start, inner.span), ExprKind::Move(Box::new(inner))))
            }
            Some(TokenKind::KwCreate) => {
                self.next();
                let inner = self.parse_postfix_expr()?;
                Ok(self.mk(join(start, inner.span), ExprKind::Create(Box::new(inner))))
            }
            Some(TokenKind::Amp) => {
                self.next();
                let inner = self.parse_postfix_expr()?;
                self.expect(TokenKind::KwAs)?;
                let ty = self.parse_type_annot()?;
                Ok(self.mk(
                    join(start, ty.span),
                    ExprKind::Reference {
                        expr: Box::new(inner),
                        ty,
                    },
                ))
            }
            _ => self.parse_postfix_expr(),
        }
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            let same_line = self.peek().is_some_and(|t| !t.newline_before);
            match self.peek_kind() {
                Some(TokenKind::Dot | TokenKind::QuestionDot) => {
                    let optional = self.expect_any()?.kind == TokenKind::QuestionDot;
                    let member = self.expect_ident()?;
                    let span = join(expr.span, member.span);
                    expr = self.mk(
                        span,
                        ExprKind::Member {
                            base: Box::new(expr),
                            optional,
                            member,
                        },
                    );
                }
                Some(TokenKind::LBracket) if same_line => {
                    self.next();
                    let index = self.parse_expr()?;
                    let rb = self.expect(TokenKind::RBracket)?;
                    let span = join(expr.span, rb.span);
                    expr = self.mk(
                        span,
                        ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                    );
                }
                Some(TokenKind::LParen) if same_line => {
                    expr = self.parse_call(expr, Vec::new())?;
                }
                Some(TokenKind::Lt) if same_line => match self.try_parse_type_args()? {
                    Some(type_args) => expr = self.parse_call(expr, type_args)?,
                    None => break,
                },
                Some(TokenKind::Bang) if same_line => {
                    let bang = self.expect_any()?;
                    let span = join(expr.span, bang.span);
                    expr = self.mk(span, ExprKind::Force(Box::new(expr)));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call(&mut self, callee: Expr, type_args: Vec<TypeAnnot>) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) {
            let start = self.peek_span();
            let label = match (self.peek_kind(), self.peek_kind_n(1)) {
                (Some(TokenKind::Ident(_)), Some(TokenKind::Colon)) => {
                    let label = self.expect_ident()?;
                    self.next();
                    Some(label)
                }
                _ => None,
            };
            let value = self.parse_expr()?;
            args.push(Argument {
                span: join(start, value.span),
                label,
                value,
            });
            if !self.at(TokenKind::Comma) {
                break;
            }
            self.next();
        }
        let rp = self.expect(TokenKind::RParen)?;
        let span = join(callee.span, rp.span);
        Ok(self.mk(
            span,
            ExprKind::Call {
                callee: Box::new(callee),
                type_args,
                args,
            },
        ))
    }

    /// `<T, U>` is only treated as type arguments when immediately followed by
    /// `(`; otherwise the parser rewinds and `<` is a comparison.
    fn try_parse_type_args(&mut self) -> Result<Option<Vec<TypeAnnot>>, ParseError> {
        let save_idx = self.idx;
        let save_node = self.next_node;
        let attempt = (|| -> Result<Option<Vec<TypeAnnot>>, ParseError> {
            self.expect(TokenKind::Lt)?;
            let mut args = vec![self.parse_type_annot()?];
            while self.at(TokenKind::Comma) {
                self.next();
                args.push(self.parse_type_annot()?);
            }
            self.expect(TokenKind::Gt)?;
            Ok(self.at(TokenKind::LParen).then_some(args))
        })();
        match attempt {
            Ok(Some(args)) => Ok(Some(args)),
            _ => {
                self.idx = save_idx;
                self.next_node = save_node;
                Ok(None)
            }
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let tok = self.expect_any()?;
        let span = tok.span;
        match tok.kind {
            TokenKind::Ident(name) => Ok(self.mk(span, ExprKind::Ident(Spanned::new(span, name)))),
            TokenKind::KwSelf => Ok(self.mk(span, ExprKind::SelfRef)),
            TokenKind::KwNil => Ok(self.mk(span, ExprKind::Nil)),
            TokenKind::KwTrue => Ok(self.mk(span, ExprKind::Bool(true))),
            TokenKind::KwFalse => Ok(self.mk(span, ExprKind::Bool(false))),
            TokenKind::Int(n) => Ok(self.mk(span, ExprKind::Int(n))),
            TokenKind::Fixed(text) => Ok(self.mk(span, ExprKind::Fixed { text })),
            TokenKind::String(s) => Ok(self.mk(span, ExprKind::String(s))),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                let mut elems = Vec::new();
                while !self.at(TokenKind::RBracket) {
                    elems.push(self.parse_expr()?);
                    if !self.at(TokenKind::Comma) {
                        break;
                    }
                    self.next();
                }
                let rb = self.expect(TokenKind::RBracket)?;
                Ok(self.mk(join(span, rb.span), ExprKind::Array(elems)))
            }
            TokenKind::LBrace => {
                let mut entries = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    let key = self.parse_expr()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if !self.at(TokenKind::Comma) {
                        break;
                    }
                    self.next();
                }
                let rb = self.expect(TokenKind::RBrace)?;
                Ok(self.mk(join(span, rb.span), ExprKind::Dictionary(entries)))
            }
            TokenKind::KwFun => {
                let params = self.parse_params()?;
                let ret = if self.at(TokenKind::Colon) {
                    self.next();
                    Some(self.parse_type_annot()?)
                } else {
                    None
                };
                let body = self.parse_block()?;
                let full = join(span, body.span);
                Ok(self.mk(
                    full,
                    ExprKind::Function(Box::new(FunctionExpr { params, ret, body })),
                ))
            }
            other => Err(ParseError {
                message: format!("expected expression, found {}", other.describe()),
                span,
            }),
        }
    }

    // --- Token helpers ---

    fn skip_semis(&mut self) {
        while self.at(TokenKind::Semi) {
            self.next();
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Ident {
                span: tok.span,
                node: name,
            }),
            other => Err(ParseError {
                message: format!("expected identifier, found {}", other.describe()),
                span: tok.span,
            }),
        }
    }

    fn expect_contextual(&mut self, word: &str) -> Result<Token, ParseError> {
        let tok = self.expect_any()?;
        match &tok.kind {
            TokenKind::Ident(s) if s == word => Ok(tok),
            other => Err(ParseError {
                message: format!("expected `{word}`, found {}", other.describe()),
                span: tok.span,
            }),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.expect_any()?;
        if mem::discriminant(&tok.kind) == mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError {
                message: format!(
                    "expected {}, found {}",
                    expected.describe(),
                    tok.kind.describe()
                ),
                span: tok.span,
            })
        }
    }

    fn expect_any(&mut self) -> Result<Token, ParseError> {
        let eof = self.eof_span();
        self.next().ok_or(ParseError {
            message: "unexpected end of input".to_string(),
            span: eof,
        })
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        // Eof is sticky.
        if tok.kind != TokenKind::Eof {
            self.idx += 1;
        }
        Some(tok)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn peek_kind_n(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.idx + n).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.idx)
            .map_or_else(|| self.eof_span(), |t| t.span)
    }

    fn prev_span(&self) -> Span {
        self.idx
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(|| span_between(0, 0), |t| t.span)
    }

    fn eof_span(&self) -> Span {
        self.tokens
            .last()
            .map_or_else(|| span_between(0, 0), |t| t.span)
    }
}

fn intersected_name(annot: TypeAnnot) -> Result<Ident, ParseError> {
    match annot.ty {
        TypeExpr::Named(name) if !annot.is_resource => Ok(name),
        _ => Err(ParseError {
            message: "intersection types may only contain interface names".to_string(),
            span: annot.span,
        }),
    }
}
