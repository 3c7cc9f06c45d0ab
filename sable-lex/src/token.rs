#![forbid(unsafe_code)]

use sable_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwImport,
    KwStruct,
    KwResource,
    KwContract,
    KwEvent,
    KwEnum,
    KwAttachment,
    KwInterface,
    KwEntitlement,
    KwFor,
    KwCase,
    KwFun,
    KwInit,
    KwDestroy,
    KwLet,
    KwVar,
    KwIf,
    KwElse,
    KwWhile,
    KwReturn,
    KwBreak,
    KwContinue,
    KwCreate,
    KwEmit,
    KwAs,
    KwNil,
    KwTrue,
    KwFalse,
    KwSelf,
    KwAccess,
    KwPriv,
    KwPub,

    // Transfer operators
    /// `<-`
    Move,
    /// `<-!`
    ForceMove,
    /// `<->`
    Swap,

    // Operators / punctuation
    EqEq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    At,
    Question,
    QuestionDot,
    QuestionQuestion,

    Dot,
    Comma,
    Colon,
    Semi,
    Eq,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,

    // Literals / identifiers
    Ident(String),
    Int(u128),
    Fixed(String),
    String(String),
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(s) => format!("identifier `{s}`"),
            TokenKind::Int(n) => format!("integer `{n}`"),
            TokenKind::Fixed(s) => format!("fixed-point literal `{s}`"),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{other:?}"),
        }
    }
}
