//! Canonical layout for generated Go source.
//!
//! Understands the declaration subset the emitter produces: line comments,
//! the package clause and `type` declarations over named, qualified, pointer,
//! slice, array, map, empty interface and struct types. The layout follows
//! gofmt: tab indentation, struct fields aligned in columns with spaces, at
//! most one blank line between items. Input outside the subset, or input that
//! is not valid Go, is a [`FormatError`].

use unicode_general_category::{GeneralCategory, get_general_category};

/// Emitted text that is not well-formed Go.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct FormatError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// A Go letter: `_` or a character in Lu, Ll, Lt, Lm or Lo.
pub(crate) fn is_letter(c: char) -> bool {
    c == '_'
        || matches!(
            get_general_category(c),
            GeneralCategory::UppercaseLetter
                | GeneralCategory::LowercaseLetter
                | GeneralCategory::TitlecaseLetter
                | GeneralCategory::ModifierLetter
                | GeneralCategory::OtherLetter
        )
}

/// A Go decimal digit: a character in Nd.
pub(crate) fn is_digit(c: char) -> bool {
    matches!(get_general_category(c), GeneralCategory::DecimalNumber)
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// True when `name` is a Go identifier other than a keyword.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_letter)
        && chars.all(|c| is_letter(c) || is_digit(c))
        && !is_keyword(name)
}

/// True when `name` may follow `package`.
#[must_use]
pub fn is_package_name(name: &str) -> bool {
    name != "_" && is_identifier(name)
}

/// Parse `source` and print it in canonical layout.
///
/// # Errors
///
/// Returns [`FormatError`] with the 1-based position of the first token that
/// does not fit the grammar.
pub fn format_source(source: &str) -> Result<String, FormatError> {
    let tokens: Vec<Token> = Scanner::new(source).scan()?;
    let items: Vec<Item> = Parser::new(tokens).parse_file()?;
    Ok(print_file(&items))
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Ident(String),
    Int(String),
    /// String literal text including its quotes.
    Str(String),
    /// Line comment text including `//`.
    Comment(String),
    Punct(char),
    Semicolon,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    line: usize,
    column: usize,
    /// Line breaks between the previous token and this one.
    newlines_before: usize,
}

fn error_at(line: usize, column: usize, message: impl Into<String>) -> FormatError {
    FormatError {
        line,
        column,
        message: message.into(),
    }
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    newlines: usize,
    /// Go's automatic semicolon rule: a line break after an identifier,
    /// literal or closing bracket ends the statement.
    insert_semicolon: bool,
    tokens: Vec<Token>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            newlines: 0,
            insert_semicolon: false,
            tokens: Vec::new(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c: char = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: Kind, line: usize, column: usize) {
        self.insert_semicolon = match &kind {
            Kind::Ident(word) => {
                !is_keyword(word)
                    || matches!(word.as_str(), "break" | "continue" | "fallthrough" | "return")
            }
            Kind::Int(_) | Kind::Str(_) | Kind::Punct('}' | ']' | ')') => true,
            _ => false,
        };
        self.tokens.push(Token {
            kind,
            line,
            column,
            newlines_before: self.newlines,
        });
        self.newlines = 0;
    }

    fn implicit_semicolon(&mut self) {
        if self.insert_semicolon {
            self.tokens.push(Token {
                kind: Kind::Semicolon,
                line: self.line,
                column: self.column,
                newlines_before: 0,
            });
            self.insert_semicolon = false;
        }
    }

    fn scan(mut self) -> Result<Vec<Token>, FormatError> {
        while let Some(&c) = self.chars.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                '\n' => {
                    self.implicit_semicolon();
                    self.bump();
                    self.newlines += 1;
                }
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '/' => {
                    self.bump();
                    if self.chars.peek() != Some(&'/') {
                        return Err(error_at(line, column, "only line comments are supported"));
                    }
                    let mut text = String::from("/");
                    while let Some(&next) = self.chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        text.push(next);
                        self.bump();
                    }
                    self.implicit_semicolon();
                    self.push(Kind::Comment(text), line, column);
                }
                '`' => {
                    let text: String = self.raw_string(line, column)?;
                    self.push(Kind::Str(text), line, column);
                }
                '"' => {
                    let text: String = self.interpreted_string(line, column)?;
                    self.push(Kind::Str(text), line, column);
                }
                '0'..='9' => {
                    let text: String = self.take_while(|c| c.is_ascii_digit());
                    self.push(Kind::Int(text), line, column);
                }
                c if is_letter(c) => {
                    let text: String = self.take_while(|c| is_letter(c) || is_digit(c));
                    self.push(Kind::Ident(text), line, column);
                }
                '*' | '[' | ']' | '{' | '}' | '.' => {
                    self.bump();
                    self.push(Kind::Punct(c), line, column);
                }
                ';' => {
                    self.bump();
                    self.push(Kind::Semicolon, line, column);
                }
                other => {
                    return Err(error_at(
                        line,
                        column,
                        format!("unexpected character {other:?}"),
                    ));
                }
            }
        }
        self.implicit_semicolon();
        let (line, column) = (self.line, self.column);
        self.push(Kind::Eof, line, column);
        Ok(self.tokens)
    }

    fn take_while(&mut self, accept: fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if !accept(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn raw_string(&mut self, line: usize, column: usize) -> Result<String, FormatError> {
        self.bump();
        let mut text = String::from("`");
        loop {
            match self.bump() {
                None => return Err(error_at(line, column, "raw string literal not terminated")),
                Some('`') => break,
                // Carriage returns are discarded from raw strings.
                Some('\r') => {}
                Some(c) => text.push(c),
            }
        }
        text.push('`');
        Ok(text)
    }

    fn interpreted_string(&mut self, line: usize, column: usize) -> Result<String, FormatError> {
        self.bump();
        let mut text = String::from("\"");
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(error_at(line, column, "string literal not terminated"));
                }
                Some('"') => break,
                Some('\\') => {
                    text.push('\\');
                    self.escape(&mut text)?;
                }
                Some(c) => text.push(c),
            }
        }
        text.push('"');
        Ok(text)
    }

    fn escape(&mut self, text: &mut String) -> Result<(), FormatError> {
        let (line, column) = (self.line, self.column);
        let invalid = || error_at(line, column, "unknown escape sequence");
        let c: char = self.bump().ok_or_else(invalid)?;
        text.push(c);
        let (digits, radix): (usize, u32) = match c {
            'a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\' | '"' => (0, 16),
            'x' => (2, 16),
            'u' => (4, 16),
            'U' => (8, 16),
            '0'..='7' => (2, 8),
            _ => return Err(invalid()),
        };
        for _ in 0..digits {
            match self.bump() {
                Some(d) if d.is_digit(radix) => text.push(d),
                _ => return Err(invalid()),
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Item {
    kind: ItemKind,
    newlines_before: usize,
}

#[derive(Debug)]
enum ItemKind {
    Comment(String),
    Package(String),
    Type { name: String, ty: TypeExpr },
}

#[derive(Debug)]
enum TypeExpr {
    Named(String),
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array(String, Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Interface,
    Struct(StructType),
}

#[derive(Debug)]
struct StructType {
    members: Vec<Member>,
    /// `{` and `}` were on different lines.
    multiline: bool,
}

#[derive(Debug)]
struct Member {
    kind: MemberKind,
    newlines_before: usize,
}

#[derive(Debug)]
enum MemberKind {
    Field(FieldDecl),
    Comment(String),
}

#[derive(Debug)]
struct FieldDecl {
    /// `None` for an embedded field.
    name: Option<String>,
    ty: TypeExpr,
    tag: Option<String>,
    comment: Option<String>,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    eof: Token,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let eof: Token = tokens.last().cloned().unwrap_or(Token {
            kind: Kind::Eof,
            line: 1,
            column: 1,
            newlines_before: 0,
        });
        Self {
            tokens,
            pos: 0,
            eof,
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_kind_at(&self, ahead: usize) -> &Kind {
        self.tokens
            .get(self.pos + ahead)
            .map_or(&self.eof.kind, |token| &token.kind)
    }

    fn advance(&mut self) -> Token {
        let token: Token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn error(token: &Token, message: impl Into<String>) -> FormatError {
        error_at(token.line, token.column, message)
    }

    fn expect_punct(&mut self, punct: char) -> Result<Token, FormatError> {
        let token: Token = self.advance();
        if token.kind == Kind::Punct(punct) {
            Ok(token)
        } else {
            Err(Self::error(&token, format!("expected '{punct}'")))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, FormatError> {
        let token: Token = self.advance();
        match token.kind {
            Kind::Ident(ref word) if is_keyword(word) => Err(Self::error(
                &token,
                format!("expected {what}, found keyword '{word}'"),
            )),
            Kind::Ident(word) => Ok(word),
            _ => Err(Self::error(&token, format!("expected {what}"))),
        }
    }

    /// A declaration ends at `;`, a line break or the end of input.
    fn expect_terminator(&mut self) -> Result<(), FormatError> {
        match self.peek().kind {
            Kind::Semicolon => {
                self.advance();
                Ok(())
            }
            Kind::Eof => Ok(()),
            _ => Err(Self::error(self.peek(), "expected newline or ';'")),
        }
    }

    fn parse_file(mut self) -> Result<Vec<Item>, FormatError> {
        let mut items: Vec<Item> = Vec::new();
        let mut has_package: bool = false;
        loop {
            let token: Token = self.advance();
            let kind: ItemKind = match &token.kind {
                Kind::Eof => break,
                Kind::Comment(text) => ItemKind::Comment(text.clone()),
                Kind::Ident(word) if word == "package" && !has_package => {
                    let name: String = self.expect_identifier("package name")?;
                    if !is_package_name(&name) {
                        return Err(Self::error(&token, format!("invalid package name '{name}'")));
                    }
                    self.expect_terminator()?;
                    has_package = true;
                    ItemKind::Package(name)
                }
                Kind::Ident(word) if word == "type" && has_package => {
                    let name: String = self.expect_identifier("type name")?;
                    let ty: TypeExpr = self.parse_type()?;
                    self.expect_terminator()?;
                    ItemKind::Type { name, ty }
                }
                _ if has_package => return Err(Self::error(&token, "expected declaration")),
                _ => return Err(Self::error(&token, "expected 'package'")),
            };
            items.push(Item {
                kind,
                newlines_before: token.newlines_before,
            });
        }
        if !has_package {
            return Err(Self::error(&self.eof, "expected 'package'"));
        }
        Ok(items)
    }

    fn parse_type(&mut self) -> Result<TypeExpr, FormatError> {
        let token: Token = self.advance();
        match &token.kind {
            Kind::Ident(word) => match word.as_str() {
                "struct" => self.parse_struct(),
                "interface" => {
                    self.expect_punct('{')?;
                    self.expect_punct('}')?;
                    Ok(TypeExpr::Interface)
                }
                "map" => {
                    self.expect_punct('[')?;
                    let key: TypeExpr = self.parse_type()?;
                    self.expect_punct(']')?;
                    let value: TypeExpr = self.parse_type()?;
                    Ok(TypeExpr::Map(Box::new(key), Box::new(value)))
                }
                keyword if is_keyword(keyword) => Err(Self::error(
                    &token,
                    format!("unexpected keyword '{keyword}'"),
                )),
                package if self.peek().kind == Kind::Punct('.') => {
                    self.advance();
                    let member: String = self.expect_identifier("type name")?;
                    Ok(TypeExpr::Named(format!("{package}.{member}")))
                }
                name => Ok(TypeExpr::Named(name.to_string())),
            },
            Kind::Punct('*') => Ok(TypeExpr::Pointer(Box::new(self.parse_type()?))),
            Kind::Punct('[') => {
                let next: Token = self.advance();
                match next.kind {
                    Kind::Punct(']') => Ok(TypeExpr::Slice(Box::new(self.parse_type()?))),
                    Kind::Int(length) => {
                        self.expect_punct(']')?;
                        Ok(TypeExpr::Array(length, Box::new(self.parse_type()?)))
                    }
                    _ => Err(Self::error(&next, "expected ']' or array length")),
                }
            }
            _ => Err(Self::error(&token, "expected type")),
        }
    }

    fn parse_struct(&mut self) -> Result<TypeExpr, FormatError> {
        let open: Token = self.expect_punct('{')?;
        let mut members: Vec<Member> = Vec::new();
        loop {
            let token: Token = self.peek().clone();
            match &token.kind {
                Kind::Punct('}') => {
                    self.advance();
                    return Ok(TypeExpr::Struct(StructType {
                        members,
                        multiline: token.line != open.line,
                    }));
                }
                Kind::Comment(text) => {
                    self.advance();
                    if token.newlines_before == 0
                        && let Some(Member {
                            kind: MemberKind::Field(field),
                            ..
                        }) = members.last_mut()
                        && field.comment.is_none()
                    {
                        field.comment = Some(text.clone());
                    } else {
                        members.push(Member {
                            kind: MemberKind::Comment(text.clone()),
                            newlines_before: token.newlines_before,
                        });
                    }
                }
                Kind::Ident(_) | Kind::Punct('*') => {
                    let field: FieldDecl = self.parse_field()?;
                    members.push(Member {
                        kind: MemberKind::Field(field),
                        newlines_before: token.newlines_before,
                    });
                    match self.peek().kind {
                        Kind::Semicolon => {
                            self.advance();
                        }
                        Kind::Punct('}') => {}
                        _ => return Err(Self::error(self.peek(), "expected newline or ';'")),
                    }
                }
                Kind::Eof => return Err(Self::error(&token, "struct type not terminated")),
                _ => return Err(Self::error(&token, "expected field name or '}'")),
            }
        }
    }

    fn parse_field(&mut self) -> Result<FieldDecl, FormatError> {
        let first: Token = self.peek().clone();
        let embedded: bool = match &first.kind {
            Kind::Ident(word) if is_keyword(word) => {
                return Err(Self::error(
                    &first,
                    format!("expected field name, found keyword '{word}'"),
                ));
            }
            Kind::Ident(_) => matches!(
                self.peek_kind_at(1),
                Kind::Semicolon | Kind::Str(_) | Kind::Punct('}' | '.')
            ),
            _ => true,
        };
        let name: Option<String> = if embedded {
            None
        } else {
            Some(self.expect_identifier("field name")?)
        };
        let ty: TypeExpr = self.parse_type()?;
        let tag: Option<String> = match &self.peek().kind {
            Kind::Str(text) => {
                let text: String = text.clone();
                self.advance();
                Some(text)
            }
            _ => None,
        };
        Ok(FieldDecl {
            name,
            ty,
            tag,
            comment: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Printer
// ---------------------------------------------------------------------------

fn print_file(items: &[Item]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if let ItemKind::Comment(text) = &item.kind
            && index > 0
            && item.newlines_before == 0
            && let Some(last) = lines.last_mut()
        {
            last.push(' ');
            last.push_str(text.trim_end());
            continue;
        }
        if index > 0 && (item.newlines_before >= 2 || needs_blank_line(items, index)) {
            lines.push(String::new());
        }
        lines.push(match &item.kind {
            ItemKind::Comment(text) => text.trim_end().to_string(),
            ItemKind::Package(name) => format!("package {name}"),
            ItemKind::Type { name, ty } => format!("type {name} {}", render_type(ty, 0)),
        });
    }
    let mut out: String = lines.join("\n");
    out.push('\n');
    out
}

/// Blank lines gofmt inserts even when the source has none: before a
/// documented declaration's comment group, and between the package clause and
/// the first declaration.
fn needs_blank_line(items: &[Item], index: usize) -> bool {
    let previous_is_comment: bool = matches!(items[index - 1].kind, ItemKind::Comment(_));
    match &items[index].kind {
        ItemKind::Type { .. } => {
            !previous_is_comment
                && items[..index]
                    .iter()
                    .rev()
                    .find(|item| !matches!(item.kind, ItemKind::Comment(_)))
                    .is_none_or(|item| matches!(item.kind, ItemKind::Package(_)))
        }
        ItemKind::Comment(_) => !previous_is_comment && documents_type(items, index),
        ItemKind::Package(_) => false,
    }
}

/// The comment group starting at `start` sits directly above a `type`.
fn documents_type(items: &[Item], start: usize) -> bool {
    let mut index: usize = start + 1;
    while index < items.len()
        && matches!(items[index].kind, ItemKind::Comment(_))
        && items[index].newlines_before == 1
    {
        index += 1;
    }
    items.get(index).is_some_and(|item| {
        matches!(item.kind, ItemKind::Type { .. }) && item.newlines_before == 1
    })
}

fn indent(depth: usize) -> String {
    "\t".repeat(depth)
}

fn render_type(ty: &TypeExpr, depth: usize) -> String {
    match ty {
        TypeExpr::Named(name) => name.clone(),
        TypeExpr::Pointer(inner) => format!("*{}", render_type(inner, depth)),
        TypeExpr::Slice(inner) => format!("[]{}", render_type(inner, depth)),
        TypeExpr::Array(length, inner) => format!("[{length}]{}", render_type(inner, depth)),
        TypeExpr::Map(key, value) => format!(
            "map[{}]{}",
            render_type(key, depth),
            render_type(value, depth)
        ),
        TypeExpr::Interface => "interface{}".to_string(),
        TypeExpr::Struct(st) => render_struct(st, depth),
    }
}

fn render_struct(st: &StructType, depth: usize) -> String {
    if st.members.is_empty() {
        return if st.multiline {
            format!("struct {{\n{}}}", indent(depth))
        } else {
            "struct{}".to_string()
        };
    }

    let inner: String = indent(depth + 1);
    let mut out = String::from("struct {\n");
    let mut block: Vec<Vec<String>> = Vec::new();
    for (index, member) in st.members.iter().enumerate() {
        if index > 0 && member.newlines_before >= 2 {
            flush_block(&mut out, &mut block, &inner);
            out.push('\n');
        }
        match &member.kind {
            MemberKind::Comment(text) => {
                flush_block(&mut out, &mut block, &inner);
                out.push_str(&inner);
                out.push_str(text.trim_end());
                out.push('\n');
            }
            MemberKind::Field(field) => {
                let cells: Vec<String> = field_cells(field, depth + 1);
                if cells.iter().any(|cell| cell.contains('\n')) {
                    // A multi-line field gets a block of its own.
                    flush_block(&mut out, &mut block, &inner);
                    out.push_str(&inner);
                    out.push_str(cells.join(" ").trim_end());
                    out.push('\n');
                } else {
                    block.push(cells);
                }
            }
        }
    }
    flush_block(&mut out, &mut block, &inner);
    out.push_str(&indent(depth));
    out.push('}');
    out
}

/// Cells of a field line: name, type, tag, comment. A comment on an untagged
/// named field keeps an empty tag cell so comments line up.
fn field_cells(field: &FieldDecl, depth: usize) -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    if let Some(name) = &field.name {
        cells.push(name.clone());
    }
    cells.push(render_type(&field.ty, depth));
    if let Some(tag) = &field.tag {
        cells.push(tag.clone());
    }
    if let Some(comment) = &field.comment {
        if field.tag.is_none() && field.name.is_some() {
            cells.push(String::new());
        }
        cells.push(comment.trim_end().to_string());
    }
    cells
}

fn flush_block(out: &mut String, block: &mut Vec<Vec<String>>, indent: &str) {
    for line in align(block) {
        out.push_str(indent);
        out.push_str(&line);
        out.push('\n');
    }
    block.clear();
}

/// Align cells the way `text/tabwriter` does for gofmt: every cell but the
/// last of a row belongs to a column; a column block is a run of consecutive
/// rows sharing that column and is as wide as its widest cell plus one space.
/// Blocks whose cells are all empty take no space.
fn align(rows: &[Vec<String>]) -> Vec<String> {
    let width = |cell: &str| cell.chars().count();
    let mut widths: Vec<Vec<usize>> = rows
        .iter()
        .map(|row| vec![0; row.len().saturating_sub(1)])
        .collect();
    let columns: usize = widths.iter().map(Vec::len).max().unwrap_or(0);

    for column in 0..columns {
        let mut start: usize = 0;
        while start < rows.len() {
            if widths[start].len() <= column {
                start += 1;
                continue;
            }
            let mut end: usize = start;
            while end < rows.len() && widths[end].len() > column {
                end += 1;
            }
            let widest: usize = rows[start..end]
                .iter()
                .map(|row| width(&row[column]))
                .max()
                .unwrap_or(0);
            let column_width: usize = if widest == 0 { 0 } else { widest + 1 };
            for row_widths in &mut widths[start..end] {
                row_widths[column] = column_width;
            }
            start = end;
        }
    }

    rows.iter()
        .zip(widths)
        .map(|(row, row_widths)| {
            let mut line = String::new();
            for (index, cell) in row.iter().enumerate() {
                line.push_str(cell);
                if let Some(column_width) = row_widths.get(index) {
                    let padding: usize = column_width.saturating_sub(width(cell));
                    line.push_str(&" ".repeat(padding));
                }
            }
            line.trim_end().to_string()
        })
        .collect()
}
