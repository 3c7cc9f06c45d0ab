use sable_lex::{Lexer, TokenKind};

fn kinds(src: &str) -> Vec<TokenKind> {
    Lexer::new(src)
        .lex()
        .expect("lex")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Ident(name.to_string())
}

#[test]
fn declaration_keywords_and_resource_marker() {
    assert_eq!(
        kinds("access(all) resource interface Vault: Provider {}"),
        vec![
            TokenKind::KwAccess,
            TokenKind::LParen,
            ident("all"),
            TokenKind::RParen,
            TokenKind::KwResource,
            TokenKind::KwInterface,
            ident("Vault"),
            TokenKind::Colon,
            ident("Provider"),
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn keyword_prefixes_stay_identifiers() {
    assert_eq!(
        kinds("letter variable selfish important"),
        vec![
            ident("letter"),
            ident("variable"),
            ident("selfish"),
            ident("important"),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn optional_operators() {
    assert_eq!(
        kinds("a?.b ?? c as? @{I}"),
        vec![
            ident("a"),
            TokenKind::QuestionDot,
            ident("b"),
            TokenKind::QuestionQuestion,
            ident("c"),
            TokenKind::KwAs,
            TokenKind::Question,
            TokenKind::At,
            TokenKind::LBrace,
            ident("I"),
            TokenKind::RBrace,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn spans_point_at_source_bytes() {
    let src = "let r <- create R()";
    let tokens = Lexer::new(src).lex().expect("lex");
    let texts: Vec<&str> = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| &src[t.span.offset()..t.span.offset() + t.span.len()])
        .collect();
    assert_eq!(texts, vec!["let", "r", "<-", "create", "R", "(", ")"]);
}

#[test]
fn newlines_separate_statements() {
    let tokens = Lexer::new("destroy r\nreturn").lex().expect("lex");
    let flags: Vec<bool> = tokens.iter().map(|t| t.newline_before).collect();
    assert_eq!(flags[..3], [false, false, true]);
}

#[test]
fn unterminated_strings_are_errors() {
    assert!(Lexer::new("let s = \"open").lex().is_err());
}
