/*!
# Declaration File Parser

Recursive descent parser over the token stream produced by
[`super::lexer::tokenize`]. Errors inside one statement or member are
recovered locally: the parser skips to the next `;` or past the next
balanced block and keeps going, so only lexical errors fail a whole file.
*/

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::*;
use super::lexer::{tokenize, Token, TokenKind};
use crate::core::{DocsError, Result, Span};

const MEMBER_MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "readonly",
    "abstract",
    "declare",
    "override",
    "async",
    "accessor",
];

const PARAM_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

static COMMENT_OR_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`[^`]*`|/\*[\s\S]*?\*/|//[^\n]*"#)
        .expect("Invalid comment regex")
});

/// Parses a complete declaration file.
pub fn parse_source(source: &str) -> Result<SourceFile> {
    DtsParser::new(source)?.parse_file()
}

/// Parses a single type expression, e.g. `Promise<APIResponse<Kline[]>>`.
pub fn parse_type_str(source: &str) -> Result<TypeExpr> {
    let mut parser = DtsParser::new(source)?;
    let ty = parser.parse_type()?;
    if !parser.is_at_end() {
        return Err(parser.error("Unexpected trailing tokens after type"));
    }
    Ok(ty)
}

/// Whitespace-normalized source text with comments removed.
pub fn normalize_type_text(text: &str) -> String {
    let without_comments = COMMENT_OR_STRING.replace_all(text, |caps: &regex::Captures| {
        let matched = &caps[0];
        if matched.starts_with("/*") || matched.starts_with("//") {
            " ".to_string()
        } else {
            matched.to_string()
        }
    });
    without_comments.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct DtsParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    current_index: usize,
}

impl<'a> DtsParser<'a> {
    pub fn new(source: &'a str) -> Result<Self> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            current_index: 0,
        })
    }

    /// Parses all top-level statements
    pub fn parse_file(&mut self) -> Result<SourceFile> {
        let mut declarations = Vec::new();
        self.parse_statements(&mut declarations, false);
        Ok(SourceFile { declarations })
    }

    // ----- token helpers -----

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.current_index + offset).min(last)]
    }

    fn bump(&mut self) {
        if self.current_index < self.tokens.len() - 1 {
            self.current_index += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn match_token(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_ident(&self, text: &str) -> bool {
        self.peek().is_ident(text)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.match_token(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, text: &str) -> bool {
        if self.match_ident(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(&format!("Expected '{}'", kind)))
        }
    }

    fn consume_identifier(&mut self) -> Result<String> {
        if self.match_token(TokenKind::Identifier) {
            let name = self.peek().text.clone();
            self.bump();
            Ok(name)
        } else {
            Err(self.error("Expected identifier"))
        }
    }

    fn error(&self, message: &str) -> DocsError {
        let token = self.peek();
        let found = if token.kind == TokenKind::Eof {
            "end of file".to_string()
        } else {
            format!("'{}'", token.text)
        };
        DocsError::parse(token.position, format!("{}, found {}", message, found))
    }

    fn start_offset(&self) -> usize {
        self.peek().span.start
    }

    fn prev_end(&self) -> usize {
        if self.current_index == 0 {
            0
        } else {
            self.tokens[self.current_index - 1].span.end
        }
    }

    fn text_from(&self, start: usize) -> String {
        let end = self.prev_end().max(start);
        normalize_type_text(Span::new(start, end).slice(self.source))
    }

    fn finish(&self, kind: TypeKind, start: usize) -> TypeExpr {
        TypeExpr::new(kind, self.text_from(start))
    }

    // ----- recovery -----

    /// Skips to the end of the current statement or member. A `}` closing
    /// the enclosing block is left in place.
    fn skip_construct(&mut self, comma_ends: bool) {
        let mut depth = 0usize;
        loop {
            let kind = self.peek().kind;
            match kind {
                TokenKind::Eof => return,
                TokenKind::LeftBrace | TokenKind::LeftParen | TokenKind::LeftBracket => {
                    depth += 1;
                }
                TokenKind::RightBrace | TokenKind::RightParen | TokenKind::RightBracket => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 && kind == TokenKind::RightBrace {
                        self.bump();
                        return;
                    }
                }
                TokenKind::Semicolon if depth == 0 => {
                    self.bump();
                    return;
                }
                TokenKind::Comma if depth == 0 && comma_ends => {
                    self.bump();
                    return;
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Consumes a balanced `{}`/`()`/`[]` group starting at the current token.
    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::LeftBrace | TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
                TokenKind::RightBrace | TokenKind::RightParen | TokenKind::RightBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Skips an initializer up to (not including) `,` `;` `)` or `}` at depth 0.
    fn skip_initializer(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::LeftBrace | TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
                TokenKind::RightBrace | TokenKind::RightParen | TokenKind::RightBracket => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Comma | TokenKind::Semicolon if depth == 0 => return,
                _ => {}
            }
            self.bump();
        }
    }

    // ----- statements -----

    fn parse_statements(&mut self, out: &mut Vec<Declaration>, in_block: bool) {
        loop {
            if self.is_at_end() || (in_block && self.match_token(TokenKind::RightBrace)) {
                break;
            }
            let start = self.current_index;
            if let Err(e) = self.parse_statement(out) {
                tracing::debug!("Skipping declaration: {}", e);
                self.current_index = start;
                self.skip_construct(false);
            }
            if self.current_index == start {
                // stray closing token at top level
                self.bump();
            }
        }
    }

    /// Parses one statement, pushing any declarations it contains
    fn parse_statement(&mut self, out: &mut Vec<Declaration>) -> Result<()> {
        let doc = self.peek().leading_doc.clone();

        loop {
            if self.match_ident("export") {
                let next = self.peek_at(1);
                let reexport = matches!(
                    next.kind,
                    TokenKind::LeftBrace | TokenKind::Star | TokenKind::Equal
                ) || next.is_ident("as")
                    || (next.is_ident("type")
                        && matches!(self.peek_at(2).kind, TokenKind::LeftBrace | TokenKind::Star));
                if reexport {
                    self.skip_construct(false);
                    return Ok(());
                }
                self.bump();
                continue;
            }
            if self.match_ident("default") || self.match_ident("declare") {
                if self.peek_at(1).kind == TokenKind::Identifier {
                    self.bump();
                    continue;
                }
            }
            break;
        }

        if self.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        if !self.match_token(TokenKind::Identifier) {
            self.skip_construct(false);
            return Ok(());
        }

        let keyword = self.peek().text.clone();
        let next = self.peek_at(1).clone();
        match keyword.as_str() {
            "class" => {
                let class = self.parse_class(doc, false)?;
                out.push(Declaration::Class(class));
            }
            "abstract" if next.is_ident("class") => {
                self.bump();
                let class = self.parse_class(doc, true)?;
                out.push(Declaration::Class(class));
            }
            "interface" => {
                let iface = self.parse_interface(doc)?;
                out.push(Declaration::Interface(iface));
            }
            "type" if next.kind == TokenKind::Identifier => {
                let alias = self.parse_type_alias(doc)?;
                out.push(Declaration::TypeAlias(alias));
            }
            "const" if next.is_ident("enum") => {
                self.bump();
                let decl = self.parse_enum(doc, true)?;
                out.push(Declaration::Enum(decl));
            }
            "enum" => {
                let decl = self.parse_enum(doc, false)?;
                out.push(Declaration::Enum(decl));
            }
            "function" => {
                let func = self.parse_function(doc)?;
                out.push(Declaration::Function(func));
            }
            "const" | "let" | "var" => {
                for var in self.parse_variables(doc)? {
                    out.push(Declaration::Variable(var));
                }
            }
            "namespace" | "module" => self.parse_namespace(out)?,
            "global" if next.kind == TokenKind::LeftBrace => {
                self.bump();
                self.parse_block(out)?;
            }
            _ => self.skip_construct(false),
        }
        Ok(())
    }

    fn parse_block(&mut self, out: &mut Vec<Declaration>) -> Result<()> {
        self.expect(TokenKind::LeftBrace)?;
        self.parse_statements(out, true);
        self.expect(TokenKind::RightBrace)
    }

    /// Parses `namespace A.B { ... }` / `module "x" { ... }`; contents are flattened
    fn parse_namespace(&mut self, out: &mut Vec<Declaration>) -> Result<()> {
        self.bump();
        if !self.eat(TokenKind::StringLiteral) {
            self.consume_identifier()?;
            while self.eat(TokenKind::Dot) {
                self.consume_identifier()?;
            }
        }
        if self.match_token(TokenKind::LeftBrace) {
            self.parse_block(out)
        } else {
            self.eat(TokenKind::Semicolon);
            Ok(())
        }
    }

    /// Parses class declaration
    fn parse_class(&mut self, doc: Option<String>, is_abstract: bool) -> Result<ClassDecl> {
        let start = self.start_offset();
        self.bump(); // 'class'

        let name = if self.match_token(TokenKind::Identifier)
            && !self.match_ident("extends")
            && !self.match_ident("implements")
        {
            self.consume_identifier()?
        } else {
            "default".to_string()
        };

        let type_params = self.parse_type_params()?;

        let extends = if self.eat_ident("extends") {
            Some(self.parse_type()?)
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.eat_ident("implements") {
            loop {
                implements.push(self.parse_type()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let members = self.parse_members()?;

        Ok(ClassDecl {
            name,
            type_params,
            extends,
            implements,
            members,
            is_abstract,
            doc,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// Parses interface declaration
    fn parse_interface(&mut self, doc: Option<String>) -> Result<InterfaceDecl> {
        let start = self.start_offset();
        self.bump(); // 'interface'
        let name = self.consume_identifier()?;
        let type_params = self.parse_type_params()?;

        let mut extends = Vec::new();
        if self.eat_ident("extends") {
            loop {
                extends.push(self.parse_type()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let members = self.parse_members()?;

        Ok(InterfaceDecl {
            name,
            type_params,
            extends,
            members,
            doc,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn parse_type_alias(&mut self, doc: Option<String>) -> Result<TypeAliasDecl> {
        self.bump(); // 'type'
        let name = self.consume_identifier()?;
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::Equal)?;
        let target = self.parse_type()?;
        self.eat(TokenKind::Semicolon);
        Ok(TypeAliasDecl {
            name,
            type_params,
            target,
            doc,
        })
    }

    fn parse_enum(&mut self, doc: Option<String>, is_const: bool) -> Result<EnumDecl> {
        self.bump(); // 'enum'
        let name = self.consume_identifier()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut members = Vec::new();
        while !self.match_token(TokenKind::RightBrace) && !self.is_at_end() {
            let member_name = match self.peek().kind {
                TokenKind::Identifier => self.consume_identifier()?,
                TokenKind::StringLiteral => {
                    let text = unquote(&self.peek().text);
                    self.bump();
                    text
                }
                _ => return Err(self.error("Expected enum member name")),
            };

            let initializer = if self.eat(TokenKind::Equal) {
                let start = self.start_offset();
                self.skip_initializer();
                Some(self.text_from(start))
            } else {
                None
            };

            members.push(EnumMember {
                name: member_name,
                initializer,
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace)?;

        Ok(EnumDecl {
            name,
            is_const,
            members,
            doc,
        })
    }

    fn parse_function(&mut self, doc: Option<String>) -> Result<FunctionDecl> {
        self.bump(); // 'function'
        let name = self.consume_identifier()?;
        let signature = self.parse_signature()?;
        self.eat(TokenKind::Semicolon);
        Ok(FunctionDecl {
            name,
            signature,
            doc,
        })
    }

    fn parse_variables(&mut self, doc: Option<String>) -> Result<Vec<VariableDecl>> {
        let is_const = self.match_ident("const");
        self.bump();

        let mut vars = Vec::new();
        loop {
            let name = self.consume_identifier()?;
            let type_expr = if self.eat(TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            if self.eat(TokenKind::Equal) {
                self.skip_initializer();
            }
            vars.push(VariableDecl {
                name,
                type_expr,
                is_const,
                doc: doc.clone(),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        Ok(vars)
    }

    // ----- members -----

    /// Parses `{ member* }` of a class, interface or object literal type
    fn parse_members(&mut self) -> Result<Vec<Member>> {
        self.expect(TokenKind::LeftBrace)?;

        let mut members = Vec::new();
        while !self.match_token(TokenKind::RightBrace) && !self.is_at_end() {
            if self.eat(TokenKind::Semicolon) || self.eat(TokenKind::Comma) {
                continue;
            }
            let start = self.current_index;
            match self.parse_member() {
                Ok(Some(member)) => members.push(member),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("Skipping member: {}", e);
                    self.current_index = start;
                    self.skip_construct(true);
                }
            }
            if self.current_index == start {
                self.bump();
            }
        }

        self.expect(TokenKind::RightBrace)?;
        Ok(members)
    }

    /// True when the token at `offset` can start a member name
    fn starts_member_name(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset).kind,
            TokenKind::Identifier
                | TokenKind::StringLiteral
                | TokenKind::NumberLiteral
                | TokenKind::LeftBracket
                | TokenKind::Hash
        )
    }

    fn parse_member(&mut self) -> Result<Option<Member>> {
        let doc = self.peek().leading_doc.clone();

        if self.match_token(TokenKind::Hash) {
            self.skip_construct(true);
            return Ok(None);
        }

        let mut modifiers = Modifiers::default();
        while self.match_token(TokenKind::Identifier)
            && MEMBER_MODIFIERS.contains(&self.peek().text.as_str())
            && self.starts_member_name(1)
        {
            match self.peek().text.as_str() {
                "static" => modifiers.is_static = true,
                "readonly" => modifiers.is_readonly = true,
                "abstract" => modifiers.is_abstract = true,
                "private" => modifiers.visibility = Visibility::Private,
                "protected" => modifiers.visibility = Visibility::Protected,
                _ => {}
            }
            self.bump();
        }

        if (self.match_ident("get") || self.match_ident("set")) && self.starts_member_name(1) {
            let kind = if self.match_ident("get") {
                AccessorKind::Get
            } else {
                AccessorKind::Set
            };
            self.bump();
            let name = self.parse_member_name()?;
            let signature = self.parse_signature()?;
            let type_expr = match kind {
                AccessorKind::Get => signature.return_type,
                AccessorKind::Set => signature.params.into_iter().next().and_then(|p| p.type_expr),
            };
            self.end_member();
            return Ok(Some(Member::Accessor {
                name,
                kind,
                modifiers,
                type_expr,
                doc,
            }));
        }

        if self.match_token(TokenKind::LeftBracket) {
            let is_index = self.peek_at(1).kind == TokenKind::Identifier
                && self.peek_at(2).kind == TokenKind::Colon;
            if !is_index {
                // computed name such as [Symbol.iterator]
                self.skip_construct(true);
                return Ok(None);
            }
            self.bump();
            let key_name = self.consume_identifier()?;
            self.expect(TokenKind::Colon)?;
            let key_type = self.parse_type()?;
            self.expect(TokenKind::RightBracket)?;
            let value_type = if self.eat(TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            self.end_member();
            return Ok(Some(Member::Index {
                key_name,
                key_type,
                value_type,
            }));
        }

        if self.match_token(TokenKind::LeftParen) || self.match_token(TokenKind::Less) {
            let signature = self.parse_signature()?;
            self.end_member();
            return Ok(Some(Member::Call { signature }));
        }

        if self.match_ident("new")
            && matches!(self.peek_at(1).kind, TokenKind::LeftParen | TokenKind::Less)
        {
            self.bump();
            let signature = self.parse_signature()?;
            self.end_member();
            return Ok(Some(Member::Construct { signature }));
        }

        if self.match_ident("constructor") && self.peek_at(1).kind == TokenKind::LeftParen {
            self.bump();
            let params = self.parse_params()?;
            if self.eat(TokenKind::Colon) {
                self.parse_type()?;
            }
            self.end_member();
            return Ok(Some(Member::Constructor { params, doc }));
        }

        let name = self.parse_member_name()?;
        let optional = self.eat(TokenKind::Question);
        self.eat(TokenKind::Bang);

        if self.match_token(TokenKind::LeftParen) || self.match_token(TokenKind::Less) {
            let signature = self.parse_signature()?;
            self.end_member();
            return Ok(Some(Member::Method {
                name,
                modifiers,
                optional,
                signature,
                doc,
            }));
        }

        let type_expr = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        if self.eat(TokenKind::Equal) {
            self.skip_initializer();
        }
        self.end_member();

        Ok(Some(Member::Property {
            name,
            modifiers,
            optional,
            type_expr,
            doc,
        }))
    }

    fn parse_member_name(&mut self) -> Result<String> {
        let token = self.peek();
        let name = match token.kind {
            TokenKind::Identifier | TokenKind::NumberLiteral => token.text.clone(),
            TokenKind::StringLiteral => unquote(&token.text),
            _ => return Err(self.error("Expected member name")),
        };
        self.bump();
        Ok(name)
    }

    fn end_member(&mut self) {
        if !self.eat(TokenKind::Semicolon) {
            self.eat(TokenKind::Comma);
        }
    }

    // ----- signatures -----

    /// Parses `<T>(params): ReturnType`, return type optional
    fn parse_signature(&mut self) -> Result<Signature> {
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let return_type = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        Ok(Signature {
            type_params,
            params,
            return_type,
        })
    }

    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>> {
        let mut params = Vec::new();
        if !self.eat(TokenKind::Less) {
            return Ok(params);
        }

        while !self.match_token(TokenKind::Greater) && !self.is_at_end() {
            while (self.match_ident("in") || self.match_ident("out") || self.match_ident("const"))
                && self.peek_at(1).kind == TokenKind::Identifier
            {
                self.bump();
            }
            let name = self.consume_identifier()?;
            let constraint = if self.eat_ident("extends") {
                Some(self.parse_type()?)
            } else {
                None
            };
            let default = if self.eat(TokenKind::Equal) {
                Some(self.parse_type()?)
            } else {
                None
            };
            params.push(TypeParam {
                name,
                constraint,
                default,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::Greater)?;
        Ok(params)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>> {
        self.expect(TokenKind::LeftParen)?;

        let mut params = Vec::new();
        while !self.match_token(TokenKind::RightParen) && !self.is_at_end() {
            while self.match_token(TokenKind::Identifier)
                && PARAM_MODIFIERS.contains(&self.peek().text.as_str())
                && self.peek_at(1).kind == TokenKind::Identifier
            {
                self.bump();
            }

            let rest = self.eat(TokenKind::Ellipsis);
            let name = match self.peek().kind {
                TokenKind::Identifier => self.consume_identifier()?,
                TokenKind::LeftBrace | TokenKind::LeftBracket => {
                    let start = self.start_offset();
                    self.skip_balanced();
                    self.text_from(start)
                }
                _ => return Err(self.error("Expected parameter name")),
            };
            let optional = self.eat(TokenKind::Question);
            let type_expr = if self.eat(TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            if self.eat(TokenKind::Equal) {
                self.skip_initializer();
            }

            params.push(Param {
                name,
                type_expr,
                optional,
                rest,
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RightParen)?;
        Ok(params)
    }

    // ----- types -----

    /// Parses a full type, including function and conditional types
    pub fn parse_type(&mut self) -> Result<TypeExpr> {
        let start = self.start_offset();

        if self.is_start_of_function_type() {
            let signature = self.parse_arrow_signature()?;
            return Ok(self.finish(TypeKind::Function(Box::new(signature)), start));
        }

        let is_constructor_type = self.match_ident("new")
            || (self.match_ident("abstract") && self.peek_at(1).is_ident("new"));
        if is_constructor_type {
            self.eat_ident("abstract");
            self.bump(); // 'new'
            self.parse_arrow_signature()?;
            return Ok(self.finish(TypeKind::Opaque, start));
        }

        let check = self.parse_union()?;

        if self.match_ident("extends") {
            self.bump();
            self.parse_union()?;
            self.expect(TokenKind::Question)?;
            self.parse_type()?;
            self.expect(TokenKind::Colon)?;
            self.parse_type()?;
            return Ok(self.finish(TypeKind::Opaque, start));
        }

        Ok(check)
    }

    fn parse_arrow_signature(&mut self) -> Result<Signature> {
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        self.expect(TokenKind::Arrow)?;
        let return_type = Some(self.parse_type()?);
        Ok(Signature {
            type_params,
            params,
            return_type,
        })
    }

    /// `<T>(...) =>` or `(...) =>`: scans to the matching paren and looks for `=>`
    fn is_start_of_function_type(&self) -> bool {
        match self.peek().kind {
            TokenKind::Less => true,
            TokenKind::LeftParen => {
                let mut depth = 0usize;
                for (i, token) in self.tokens.iter().enumerate().skip(self.current_index) {
                    match token.kind {
                        TokenKind::LeftParen => depth += 1,
                        TokenKind::RightParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self
                                    .tokens
                                    .get(i + 1)
                                    .map_or(false, |t| t.kind == TokenKind::Arrow);
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn parse_union(&mut self) -> Result<TypeExpr> {
        self.eat(TokenKind::Pipe);
        let start = self.start_offset();
        let first = self.parse_intersection()?;
        if !self.match_token(TokenKind::Pipe) {
            return Ok(first);
        }
        let mut types = vec![first];
        while self.eat(TokenKind::Pipe) {
            types.push(self.parse_intersection()?);
        }
        Ok(self.finish(TypeKind::Union(types), start))
    }

    fn parse_intersection(&mut self) -> Result<TypeExpr> {
        self.eat(TokenKind::Ampersand);
        let start = self.start_offset();
        let first = self.parse_type_operator()?;
        if !self.match_token(TokenKind::Ampersand) {
            return Ok(first);
        }
        let mut types = vec![first];
        while self.eat(TokenKind::Ampersand) {
            types.push(self.parse_type_operator()?);
        }
        Ok(self.finish(TypeKind::Intersection(types), start))
    }

    fn can_start_type(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Identifier
                | TokenKind::LeftParen
                | TokenKind::LeftBracket
                | TokenKind::LeftBrace
                | TokenKind::StringLiteral
                | TokenKind::NumberLiteral
                | TokenKind::TemplateLiteral
                | TokenKind::Minus
                | TokenKind::Less
        )
    }

    fn parse_type_operator(&mut self) -> Result<TypeExpr> {
        let start = self.start_offset();
        let next_starts_type = Self::can_start_type(self.peek_at(1).kind);

        if next_starts_type
            && (self.match_ident("keyof") || self.match_ident("unique") || self.match_ident("readonly"))
        {
            let operator = self.peek().text.clone();
            self.bump();
            let target = self.parse_type_operator()?;
            return Ok(self.finish(
                TypeKind::Operator {
                    operator,
                    target: Box::new(target),
                },
                start,
            ));
        }

        if self.match_ident("infer") && self.peek_at(1).kind == TokenKind::Identifier {
            self.bump();
            self.bump();
            return Ok(self.finish(TypeKind::Opaque, start));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<TypeExpr> {
        let start = self.start_offset();
        let mut ty = self.parse_primary()?;

        while self.match_token(TokenKind::LeftBracket) {
            if self.peek_at(1).kind == TokenKind::RightBracket {
                self.bump();
                self.bump();
                ty = self.finish(TypeKind::Array(Box::new(ty)), start);
            } else {
                self.bump();
                self.parse_type()?;
                self.expect(TokenKind::RightBracket)?;
                ty = self.finish(TypeKind::Opaque, start);
            }
        }

        Ok(ty)
    }

    fn parse_primary(&mut self) -> Result<TypeExpr> {
        let start = self.start_offset();

        match self.peek().kind {
            TokenKind::LeftParen => {
                self.bump();
                let inner = self.parse_type()?;
                self.expect(TokenKind::RightParen)?;
                Ok(self.finish(TypeKind::Parenthesized(Box::new(inner)), start))
            }
            TokenKind::LeftBrace => {
                if self.is_mapped_type() {
                    self.skip_balanced();
                    Ok(self.finish(TypeKind::Opaque, start))
                } else {
                    let members = self.parse_members()?;
                    Ok(self.finish(TypeKind::Object(members), start))
                }
            }
            TokenKind::LeftBracket => self.parse_tuple(),
            TokenKind::StringLiteral | TokenKind::NumberLiteral => {
                self.bump();
                Ok(self.finish(TypeKind::Literal, start))
            }
            TokenKind::TemplateLiteral => {
                self.bump();
                Ok(self.finish(TypeKind::Opaque, start))
            }
            TokenKind::Minus => {
                self.bump();
                self.expect(TokenKind::NumberLiteral)?;
                Ok(self.finish(TypeKind::Literal, start))
            }
            TokenKind::Identifier => self.parse_identifier_type(),
            _ => Err(self.error("Expected type")),
        }
    }

    /// `{ [K in ...]: ... }`, optionally with `readonly`/`+`/`-` prefixes
    fn is_mapped_type(&self) -> bool {
        let mut offset = 1;
        if matches!(self.peek_at(offset).kind, TokenKind::Plus | TokenKind::Minus) {
            offset += 1;
        }
        if self.peek_at(offset).is_ident("readonly") {
            offset += 1;
        }
        self.peek_at(offset).kind == TokenKind::LeftBracket
            && self.peek_at(offset + 1).kind == TokenKind::Identifier
            && self.peek_at(offset + 2).is_ident("in")
    }

    fn parse_tuple(&mut self) -> Result<TypeExpr> {
        let start = self.start_offset();
        self.expect(TokenKind::LeftBracket)?;

        let mut elements = Vec::new();
        while !self.match_token(TokenKind::RightBracket) && !self.is_at_end() {
            self.eat(TokenKind::Ellipsis);
            let labeled = self.match_token(TokenKind::Identifier)
                && (self.peek_at(1).kind == TokenKind::Colon
                    || (self.peek_at(1).kind == TokenKind::Question
                        && self.peek_at(2).kind == TokenKind::Colon));
            if labeled {
                self.bump();
                self.eat(TokenKind::Question);
                self.bump();
            }
            elements.push(self.parse_type()?);
            self.eat(TokenKind::Question);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RightBracket)?;
        Ok(self.finish(TypeKind::Tuple(elements), start))
    }

    fn parse_identifier_type(&mut self) -> Result<TypeExpr> {
        let start = self.start_offset();
        let text = self.peek().text.clone();
        let next = self.peek_at(1).clone();

        // x is T / this is T
        if next.is_ident("is") {
            self.bump();
            self.bump();
            self.parse_type()?;
            return Ok(self.finish(TypeKind::Predicate, start));
        }

        match text.as_str() {
            "true" | "false" => {
                self.bump();
                Ok(self.finish(TypeKind::Literal, start))
            }
            "asserts" if next.kind == TokenKind::Identifier => {
                self.bump();
                self.bump();
                if self.eat_ident("is") {
                    self.parse_type()?;
                }
                Ok(self.finish(TypeKind::Predicate, start))
            }
            "typeof" if next.kind == TokenKind::Identifier => {
                self.bump();
                if self.match_ident("import") {
                    self.parse_import_reference()?;
                } else {
                    self.parse_qualified_name()?;
                }
                if self.match_token(TokenKind::Less) {
                    self.parse_type_args()?;
                }
                Ok(self.finish(TypeKind::Opaque, start))
            }
            "import" if next.kind == TokenKind::LeftParen => {
                let name = self.parse_import_reference()?;
                let args = if self.match_token(TokenKind::Less) {
                    self.parse_type_args()?
                } else {
                    Vec::new()
                };
                Ok(self.finish(TypeKind::Reference { name, args }, start))
            }
            _ => {
                if next.kind != TokenKind::Dot {
                    if let Some(keyword) = Keyword::from_ident(&text) {
                        self.bump();
                        return Ok(self.finish(TypeKind::Keyword(keyword), start));
                    }
                }
                let name = self.parse_qualified_name()?;
                let args = if self.match_token(TokenKind::Less) {
                    self.parse_type_args()?
                } else {
                    Vec::new()
                };
                Ok(self.finish(TypeKind::Reference { name, args }, start))
            }
        }
    }

    fn parse_qualified_name(&mut self) -> Result<String> {
        let mut name = self.consume_identifier()?;
        while self.match_token(TokenKind::Dot) && self.peek_at(1).kind == TokenKind::Identifier {
            self.bump();
            name.push('.');
            name.push_str(&self.consume_identifier()?);
        }
        Ok(name)
    }

    /// `import("module").A.B`: only the part after the module call is kept
    fn parse_import_reference(&mut self) -> Result<String> {
        self.bump(); // 'import'
        self.expect(TokenKind::LeftParen)?;
        self.expect(TokenKind::StringLiteral)?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::Dot)?;
        self.parse_qualified_name()
    }

    fn parse_type_args(&mut self) -> Result<Vec<TypeExpr>> {
        self.expect(TokenKind::Less)?;
        let mut args = Vec::new();
        while !self.match_token(TokenKind::Greater) && !self.is_at_end() {
            args.push(self.parse_type()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Greater)?;
        Ok(args)
    }
}

fn unquote(text: &str) -> String {
    if text.len() >= 2 {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn first_class(source: &str) -> ClassDecl {
        let file = parse_source(source).unwrap();
        let class = file.classes().next().cloned().expect("class parsed");
        class
    }

    fn method<'a>(class: &'a ClassDecl, name: &str) -> (&'a Signature, &'a Option<String>) {
        class
            .members
            .iter()
            .find_map(|m| match m {
                Member::Method {
                    name: n,
                    signature,
                    doc,
                    ..
                } if n == name => Some((signature, doc)),
                _ => None,
            })
            .expect("method present")
    }

    #[test]
    fn test_class_with_methods_and_docs() {
        let class = first_class(
            r#"
import { BaseRestClient } from './util/BaseRestClient';
/**
 * REST client for the v5 API
 */
export declare class RestClientV5 extends BaseRestClient {
    private readonly options;
    constructor(restClientOptions?: RestClientOptions, requestOptions?: AxiosRequestConfig);
    /** Get server time. */
    getServerTime(): Promise<APIResponseV3WithTime<{ timeSecond: string; timeNano: string; }>>;
    getKline(params: GetKlineParamsV5): Promise<APIResponseV3WithTime<CategorySymbolListV5<OHLCVKlineV5[], 'spot' | 'linear'>>>;
    get(endpoint: string, params?: any): Promise<any>;
}
"#,
        );

        assert_eq!(class.name, "RestClientV5");
        assert_eq!(class.extends.as_ref().map(|t| t.text.as_str()), Some("BaseRestClient"));
        assert_eq!(class.doc.as_deref(), Some("/**\n * REST client for the v5 API\n */"));
        assert_eq!(class.members.len(), 5);

        let (sig, doc) = method(&class, "getServerTime");
        assert_eq!(doc.as_deref(), Some("/** Get server time. */"));
        assert_eq!(
            sig.return_type.as_ref().unwrap().text,
            "Promise<APIResponseV3WithTime<{ timeSecond: string; timeNano: string; }>>"
        );

        let (sig, _) = method(&class, "getKline");
        assert_eq!(sig.params.len(), 1);
        assert_eq!(sig.params[0].name, "params");
        assert_eq!(sig.params[0].type_expr.as_ref().unwrap().text, "GetKlineParamsV5");

        // `get` followed by '(' is a method, not an accessor
        let (sig, _) = method(&class, "get");
        assert!(sig.params[1].optional);
    }

    #[test]
    fn test_type_precedence() {
        let ty = parse_type_str("A | B & C[]").unwrap();
        match ty.kind {
            TypeKind::Union(types) => {
                assert_eq!(types.len(), 2);
                match &types[1].kind {
                    TypeKind::Intersection(parts) => {
                        assert!(matches!(parts[1].kind, TypeKind::Array(_)));
                        assert_eq!(parts[1].text, "C[]");
                    }
                    other => panic!("expected intersection, got {other:?}"),
                }
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn test_function_vs_parenthesized() {
        let ty = parse_type_str("(a: string) => void").unwrap();
        assert!(matches!(ty.kind, TypeKind::Function(_)));

        let ty = parse_type_str("(string | number)[]").unwrap();
        match ty.kind {
            TypeKind::Array(inner) => {
                assert!(matches!(inner.kind, TypeKind::Parenthesized(_)));
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_leading_pipe_and_literals() {
        let ty = parse_type_str("\n | 'spot'\n | 'linear'\n | -1").unwrap();
        match ty.kind {
            TypeKind::Union(types) => {
                assert_eq!(types.len(), 3);
                assert!(types.iter().all(|t| t.kind == TypeKind::Literal));
                assert_eq!(types[2].text, "-1");
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn test_import_reference_keeps_only_name() {
        let ty = parse_type_str("import(\"./types/response\").OrderResult<string>").unwrap();
        assert_eq!(ty.reference_name(), Some("OrderResult"));
    }

    #[test]
    fn test_opaque_constructs() {
        for source in [
            "keyof typeof Foo",
            "T extends string ? A : B",
            "{ [K in keyof T]?: T[K] }",
            "Orders['list']",
            "`${Side}_${Type}`",
        ] {
            let ty = parse_type_str(source).unwrap();
            let is_opaque = matches!(ty.kind, TypeKind::Opaque | TypeKind::Operator { .. });
            assert!(is_opaque, "{source} parsed as {:?}", ty.kind);
        }
    }

    #[test]
    fn test_predicate_return_type() {
        let file = parse_source("declare function isSpot(x: unknown): x is SpotSymbol;").unwrap();
        match &file.declarations[0] {
            Declaration::Function(func) => {
                let ret = func.signature.return_type.as_ref().unwrap();
                assert_eq!(ret.kind, TypeKind::Predicate);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_modifier_keywords_as_member_names() {
        let file = parse_source(
            "interface Opts { readonly: boolean; static?: string; get: number; readonly key: string; }",
        )
        .unwrap();
        let iface = file.interfaces().next().unwrap();
        let names: Vec<_> = iface.members.iter().filter_map(|m| m.name()).collect();
        assert_eq!(names, vec!["readonly", "static", "get", "key"]);
    }

    #[test]
    fn test_namespaces_flattened_and_reexports_skipped() {
        let file = parse_source(
            r#"
export * from './types';
export { RestClient } from './rest-client';
declare namespace Api.V5 {
    interface Ticker { symbol: string; }
    namespace Inner { type Side = 'Buy' | 'Sell'; }
}
declare global { interface Window { x: number; } }
export default RestClient;
"#,
        )
        .unwrap();
        let names: Vec<_> = file.declarations.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["Ticker", "Side", "Window"]);
    }

    #[test]
    fn test_enums() {
        let file = parse_source(
            "export declare enum OrderSide { BUY = \"BUY\", SELL = 'SELL' }\ndeclare const enum Flag { A = 1 << 0, B }",
        )
        .unwrap();
        match &file.declarations[0] {
            Declaration::Enum(e) => {
                assert_eq!(e.name, "OrderSide");
                assert_eq!(e.members[0].initializer.as_deref(), Some("\"BUY\""));
            }
            other => panic!("expected enum, got {other:?}"),
        }
        match &file.declarations[1] {
            Declaration::Enum(e) => {
                assert!(e.is_const);
                assert_eq!(e.members[0].initializer.as_deref(), Some("1 << 0"));
                assert_eq!(e.members[1].initializer, None);
            }
            other => panic!("expected enum, got {other:?}"),
        }
    }

    #[test]
    fn test_recovers_from_unparsable_member() {
        let class = first_class(
            r#"declare class C {
    [Symbol.iterator](): Iterator<number>;
    #private;
    weird: %%;
    ok(): void;
}"#,
        );
        let names: Vec<_> = class.members.iter().filter_map(|m| m.name()).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn test_accessors_and_overloads() {
        let class = first_class(
            r#"declare class Client {
    get baseUrl(): string;
    set baseUrl(value: string);
    submitOrder(params: A): Promise<X>;
    submitOrder(params: B): Promise<Y>;
}"#,
        );
        let accessors = class
            .members
            .iter()
            .filter(|m| matches!(m, Member::Accessor { .. }))
            .count();
        assert_eq!(accessors, 2);
        let methods = class
            .members
            .iter()
            .filter(|m| matches!(m, Member::Method { .. }))
            .count();
        assert_eq!(methods, 2);
    }

    #[test]
    fn test_normalize_type_text() {
        assert_eq!(
            normalize_type_text("{\n  /** the symbol */\n  symbol: string; // trailing\n  url: 'http://x'\n}"),
            "{ symbol: string; url: 'http://x' }"
        );
    }
}
