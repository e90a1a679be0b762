//! Test utilities: a small source parser, the checking fixture and
//! snapshot macros.
//!
//! The parser covers the declaration subset the checker works on. Function
//! and accessor bodies are skipped; only their presence is recorded.

use std::fmt::Write as _;

use logos::Logos;
use rowan::{TextRange, TextSize};

use crate::ast::{
    AccessorKind, Accessibility, Arg, Ast, AstBuilder, AttrKind, Body, CtorKind, DeclContext,
    DeclId, DeclKind, DefaultArgKind, Expr, ExprKind, Failability, FileId, FileKind, NominalKind,
    ObjCName, Ownership, ParamSpec, Pattern, PatternKind, Span, StaticSpelling, TupleReprElement,
    TypeLoc, TypeRepr, TypeReprKind,
};
use crate::diagnostics::{DiagnosticKind, DiagnosticMessage};
use crate::{CheckedModule, SemaBuilder, SemaConfig};

/// Snapshot test for the diagnostics of a module.
#[macro_export]
macro_rules! shot_diagnostics {
    ($src:literal, @$snapshot:literal) => {{
        let src = indoc::indoc!($src).trim();
        let output = $crate::test_utils::Fixture::new(src).check().diagnostics();
        insta::with_settings!({ omit_expression => true }, {
            insta::assert_snapshot!(format!("{src}\n---\n{output}"), @$snapshot);
        });
    }};
}

/// Check a dedented main file and return the checked fixture.
#[macro_export]
macro_rules! checked {
    ($src:literal) => {{ $crate::test_utils::Fixture::new(indoc::indoc!($src).trim()).check() }};
}

pub const MAIN_FILE: &str = "main.ks";

/// An unchecked module built from source text.
pub struct Fixture {
    ast: Ast,
    main: FileId,
    config: SemaConfig,
}

impl Fixture {
    /// Parse `src` as the main file of a module.
    pub fn new(src: &str) -> Self {
        Self::with_kind(src, FileKind::Main)
    }

    /// Parse `src` as a library file, where globals need initializers.
    pub fn library(src: &str) -> Self {
        Self::with_kind(src, FileKind::Library)
    }

    fn with_kind(src: &str, kind: FileKind) -> Self {
        let mut ast = Ast::new();
        let main = ast.add_file(MAIN_FILE, src, kind);
        if let Err(err) = parse_into(&mut ast, main, src) {
            panic!("{}", err.render(src));
        }
        Self {
            ast,
            main,
            config: SemaConfig::default(),
        }
    }

    /// Add another library file to the module.
    pub fn file(mut self, name: &str, src: &str) -> Self {
        let file = self.ast.add_file(name, src, FileKind::Library);
        if let Err(err) = parse_into(&mut self.ast, file, src) {
            panic!("{name}: {}", err.render(src));
        }
        self
    }

    pub fn config(mut self, f: impl FnOnce(&mut SemaConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn main(&self) -> FileId {
        self.main
    }

    pub fn into_ast(self) -> Ast {
        self.ast
    }

    pub fn builder(self) -> SemaBuilder {
        SemaBuilder::new(self.ast).with_config(self.config)
    }

    pub fn check(self) -> Checked {
        let main = self.main;
        let module = self
            .builder()
            .check()
            .expect("checking must not abort");
        Checked { module, main }
    }
}

/// A checked fixture with lookup and rendering helpers.
pub struct Checked {
    pub module: CheckedModule,
    pub main: FileId,
}

impl Checked {
    pub fn ast(&self) -> &Ast {
        self.module.ast()
    }

    pub fn is_valid(&self) -> bool {
        self.module.is_valid()
    }

    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.module.diagnostics().iter().map(|d| d.kind).collect()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.module.diagnostics().count_of(kind)
    }

    /// One block per diagnostic, each location shown as its line and text:
    ///
    /// ```text
    /// error[3] `x`: invalid redeclaration of 'x'
    ///   note[1] `x`: 'x' previously declared here
    ///   fix[3] "override ": insert 'override'
    /// ```
    pub fn diagnostics(&self) -> String {
        let mut out = String::new();
        for d in self.module.diagnostics() {
            self.write_diagnostic(&mut out, d);
        }
        if out.is_empty() {
            out.push_str("<no diagnostics>\n");
        }
        out
    }

    fn write_diagnostic(&self, out: &mut String, d: &DiagnosticMessage) {
        let _ = writeln!(
            out,
            "{}{} {}: {}",
            d.severity(),
            self.location(d.span),
            self.excerpt(d.span),
            d.message
        );
        for related in &d.related {
            let _ = writeln!(
                out,
                "  note{} {}: {}",
                self.location(related.span),
                self.excerpt(related.span),
                related.message
            );
        }
        for fix in &d.fixes {
            let _ = writeln!(
                out,
                "  fix{} {:?}: {}",
                self.location(fix.span),
                fix.replacement,
                fix.description
            );
        }
    }

    fn location(&self, span: Span) -> String {
        let file = self.ast().file(span.file);
        let offset = usize::from(span.range.start()).min(file.text.len());
        let line = file.text[..offset].matches('\n').count() + 1;
        if span.file == self.main {
            format!("[{line}]")
        } else {
            format!("[{}:{line}]", file.name)
        }
    }

    /// Source text of `span`, cut at the first line break.
    fn excerpt(&self, span: Span) -> String {
        let text = self.ast().text(span);
        match text.split_once('\n') {
            Some((first, _)) => format!("`{}...`", first.trim_end()),
            None => format!("`{text}`"),
        }
    }

    /// Find a declaration by its path of display names, like
    /// `["D", "init(x:)"]`. Extensions are addressed by `extension`.
    pub fn decl(&self, path: &[&str]) -> DeclId {
        let ast = self.ast();
        let (first, rest) = path.split_first().expect("empty declaration path");
        let mut current = ast
            .files()
            .filter(|(_, f)| f.kind != FileKind::Prelude)
            .flat_map(|(_, f)| f.decls().iter().copied())
            .find(|&d| ast.name_of(d) == *first)
            .unwrap_or_else(|| panic!("no top-level declaration `{first}`"));
        for name in rest {
            current = ast
                .decl(current)
                .members()
                .iter()
                .copied()
                .find(|&m| ast.name_of(m) == *name)
                .unwrap_or_else(|| panic!("no member `{name}` in {path:?}"));
        }
        current
    }

    pub fn accessor(&self, path: &[&str], kind: AccessorKind) -> Option<DeclId> {
        let storage = self.decl(path);
        self.ast()
            .decl(storage)
            .storage()
            .and_then(|s| s.accessors.get(kind))
    }

    pub fn type_of(&self, path: &[&str]) -> String {
        self.module.type_of(self.decl(path))
    }

    pub fn interface_type_of(&self, path: &[&str]) -> String {
        match self.ast().decl(self.decl(path)).interface_ty {
            Some(ty) => self.module.display_type(ty),
            None => "<none>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

impl ParseError {
    fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }

    pub fn render(&self, src: &str) -> String {
        let start = usize::from(self.range.start()).min(src.len());
        let line = src[..start].matches('\n').count() + 1;
        format!("parse error on line {line}: {}", self.message)
    }
}

type PResult<T> = Result<T, ParseError>;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
enum Token<'src> {
    #[regex(r"//[^\n]*", logos::skip, allow_greedy = true)]
    Comment,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("->")]
    Arrow,
    #[token("?")]
    Question,
    #[token("!")]
    Bang,
    #[token("@")]
    At,
    #[token("-")]
    Minus,
    #[token("&")]
    Amp,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    Float(&'src str),
    #[regex(r"0x[0-9a-fA-F_]+|0o[0-7_]+|0b[01_]+|[0-9][0-9_]*", |lex| lex.slice())]
    Int(&'src str),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice())]
    Str(&'src str),
    #[regex(r"'[^']'", |lex| lex.slice())]
    Char(&'src str),
}

fn text_range(span: std::ops::Range<usize>) -> TextRange {
    TextRange::new(
        TextSize::from(span.start as u32),
        TextSize::from(span.end as u32),
    )
}

fn lex(src: &str) -> PResult<Vec<(Token<'_>, TextRange)>> {
    Token::lexer(src)
        .spanned()
        .map(|(token, span)| {
            let range = text_range(span.clone());
            token.map(|t| (t, range)).map_err(|_| {
                ParseError::new(format!("unexpected input {:?}", &src[span]), range)
            })
        })
        .collect()
}

/// Parse `src` into the top-level declarations of `file`.
pub fn parse_into(ast: &mut Ast, file: FileId, src: &str) -> PResult<()> {
    let tokens = lex(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: TextSize::from(src.len() as u32),
        b: AstBuilder::new(ast, file),
    };
    let root = parser.b.root();
    while parser.peek().is_some() {
        parser.decl(root)?;
    }
    Ok(())
}

/// Modifiers and attributes written before a declaration keyword.
#[derive(Debug, Default)]
struct Modifiers {
    attrs: Vec<(AttrKind, TextRange)>,
    static_spelling: Option<(StaticSpelling, TextRange)>,
}

impl Modifiers {
    fn has(&self, kind: &AttrKind) -> bool {
        self.attrs.iter().any(|(k, _)| k == kind)
    }
}

#[derive(Debug)]
enum RequirementSpec {
    Conformance(TypeRepr, TypeRepr),
    SameType(TypeRepr, TypeRepr),
}

/// `<T: P, U where T == U>` before it is attached to its owner.
#[derive(Debug)]
struct GenericClause<'src> {
    params: Vec<(&'src str, TextRange, Vec<TypeRepr>)>,
    requirements: Vec<RequirementSpec>,
    range: TextRange,
}

/// A parsed parameter and whether it has a default argument.
type ParamEntry = (ParamSpec, bool);

const ACCESSOR_WORDS: &[&str] = &[
    "get",
    "set",
    "willSet",
    "didSet",
    "address",
    "mutableAddress",
    "mutating",
    "nonmutating",
];

const CLASS_MEMBER_WORDS: &[&str] = &[
    "var", "let", "func", "subscript", "final", "override", "dynamic",
];

struct Parser<'a, 'src> {
    tokens: Vec<(Token<'src>, TextRange)>,
    pos: usize,
    end: TextSize,
    b: AstBuilder<'a>,
}

impl<'a, 'src> Parser<'a, 'src> {
    fn peek(&self) -> Option<Token<'src>> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<Token<'src>> {
        self.tokens.get(self.pos + n).map(|(t, _)| *t)
    }

    fn peek_ident(&self) -> Option<&'src str> {
        match self.peek() {
            Some(Token::Ident(s)) => Some(s),
            _ => None,
        }
    }

    fn at(&self, token: Token<'src>) -> bool {
        self.peek() == Some(token)
    }

    fn at_ident(&self, word: &str) -> bool {
        self.peek_ident() == Some(word)
    }

    fn current_range(&self) -> TextRange {
        self.tokens
            .get(self.pos)
            .map(|(_, r)| *r)
            .unwrap_or_else(|| TextRange::empty(self.end))
    }

    fn current_start(&self) -> TextSize {
        self.current_range().start()
    }

    fn prev_end(&self) -> TextSize {
        match self.pos.checked_sub(1).and_then(|p| self.tokens.get(p)) {
            Some((_, r)) => r.end(),
            None => TextSize::from(0),
        }
    }

    fn since(&self, start: TextSize) -> TextRange {
        TextRange::new(start, self.prev_end().max(start))
    }

    fn error<T>(&self, message: impl Into<String>) -> PResult<T> {
        Err(ParseError::new(message, self.current_range()))
    }

    fn bump(&mut self) -> PResult<(Token<'src>, TextRange)> {
        match self.tokens.get(self.pos).copied() {
            Some(entry) => {
                self.pos += 1;
                Ok(entry)
            }
            None => self.error("unexpected end of input"),
        }
    }

    fn eat(&mut self, token: Token<'src>) -> Option<TextRange> {
        if self.at(token) {
            self.pos += 1;
            return Some(self.tokens[self.pos - 1].1);
        }
        None
    }

    fn eat_ident(&mut self, word: &str) -> Option<TextRange> {
        if self.at_ident(word) {
            self.pos += 1;
            return Some(self.tokens[self.pos - 1].1);
        }
        None
    }

    fn expect(&mut self, token: Token<'src>) -> PResult<TextRange> {
        match self.eat(token) {
            Some(range) => Ok(range),
            None => self.error(format!("expected {token:?}, found {:?}", self.peek())),
        }
    }

    fn ident(&mut self) -> PResult<(&'src str, TextRange)> {
        match self.bump()? {
            (Token::Ident(name), range) => Ok((name, range)),
            (other, range) => Err(ParseError::new(
                format!("expected identifier, found {other:?}"),
                range,
            )),
        }
    }

    /// Skip a `{ ... }` block, returning its range.
    fn skip_block(&mut self) -> PResult<TextRange> {
        let open = self.expect(Token::LBrace)?;
        let close = self.skip_to_close()?;
        Ok(open.cover(close))
    }

    /// Skip past the `}` matching an already consumed `{`.
    fn skip_to_close(&mut self) -> PResult<TextRange> {
        let mut depth = 1usize;
        loop {
            match self.bump()? {
                (Token::LBrace, _) => depth += 1,
                (Token::RBrace, range) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(range);
                    }
                }
                _ => {}
            }
        }
    }

    fn modifiers(&mut self) -> PResult<Modifiers> {
        let mut mods = Modifiers::default();
        loop {
            let start = self.current_start();
            if self.eat(Token::At).is_some() {
                let (name, _) = self.ident()?;
                let kind = match name {
                    "objc" => AttrKind::ObjC(self.objc_name()?),
                    "noreturn" => AttrKind::NoReturn,
                    "transparent" => AttrKind::Transparent,
                    "unavailable" => AttrKind::Unavailable,
                    "managed" => AttrKind::Managed,
                    "copying" => AttrKind::CopyOnAssign,
                    "final" => AttrKind::Final,
                    _ => return self.error(format!("unknown attribute @{name}")),
                };
                mods.attrs.push((kind, self.since(start)));
                continue;
            }
            let Some(word) = self.peek_ident() else {
                return Ok(mods);
            };
            let kind = match word {
                "public" | "private" | "internal" => {
                    let level = match word {
                        "public" => Accessibility::Public,
                        "private" => Accessibility::Private,
                        _ => Accessibility::Internal,
                    };
                    if self.peek_at(1) == Some(Token::LParen)
                        && self.peek_at(2) == Some(Token::Ident("set"))
                    {
                        self.pos += 3;
                        self.expect(Token::RParen)?;
                        mods.attrs
                            .push((AttrKind::SetterAccessibility(level), self.since(start)));
                        continue;
                    }
                    AttrKind::Accessibility(level)
                }
                "final" => AttrKind::Final,
                "dynamic" => AttrKind::Dynamic,
                "override" => AttrKind::Override,
                "required" => AttrKind::Required,
                "convenience" => AttrKind::Convenience,
                "lazy" => AttrKind::Lazy,
                "mutating" => AttrKind::Mutating,
                "nonmutating" => AttrKind::NonMutating,
                "optional" => AttrKind::Optional,
                "prefix" => AttrKind::Prefix,
                "postfix" => AttrKind::Postfix,
                "infix" => AttrKind::Infix,
                "weak" => AttrKind::Ownership(Ownership::Weak),
                "unowned" => AttrKind::Ownership(Ownership::Unowned),
                "static" => {
                    let (_, range) = self.bump()?;
                    mods.static_spelling = Some((StaticSpelling::Static, range));
                    continue;
                }
                "class"
                    if matches!(
                        self.peek_at(1),
                        Some(Token::Ident(next)) if CLASS_MEMBER_WORDS.contains(&next)
                    ) =>
                {
                    let (_, range) = self.bump()?;
                    mods.static_spelling = Some((StaticSpelling::Class, range));
                    continue;
                }
                _ => return Ok(mods),
            };
            let (_, range) = self.bump()?;
            mods.attrs.push((kind, range));
        }
    }

    /// `(name)`, `(name:)` or `(a:b:)` after `@objc`.
    fn objc_name(&mut self) -> PResult<Option<ObjCName>> {
        if self.eat(Token::LParen).is_none() {
            return Ok(None);
        }
        let mut pieces = Vec::new();
        let mut num_args = 0;
        while !self.at(Token::RParen) {
            match self.bump()? {
                (Token::Ident(piece), _) => pieces.push(self.b.intern(piece)),
                (Token::Colon, _) => num_args += 1,
                (other, range) => {
                    return Err(ParseError::new(
                        format!("unexpected {other:?} in @objc name"),
                        range,
                    ));
                }
            }
        }
        self.expect(Token::RParen)?;
        Ok(Some(ObjCName { pieces, num_args }))
    }

    fn apply(&mut self, d: DeclId, mods: &Modifiers) {
        for (kind, range) in &mods.attrs {
            self.b.attr(d, kind.clone(), *range);
        }
    }

    fn set_range(&mut self, d: DeclId, start: TextSize) {
        let range = self.since(start);
        self.b.ast().decl_mut(d).range = range;
    }

    fn decl(&mut self, parent: DeclContext) -> PResult<()> {
        let start = self.current_start();
        let mods = self.modifiers()?;
        let Some(keyword) = self.peek_ident() else {
            return self.error(format!("expected declaration, found {:?}", self.peek()));
        };
        match keyword {
            "class" => self.nominal(parent, NominalKind::Class, &mods, start)?,
            "struct" => self.nominal(parent, NominalKind::Struct, &mods, start)?,
            "enum" => self.nominal(parent, NominalKind::Enum, &mods, start)?,
            "protocol" => self.nominal(parent, NominalKind::Protocol, &mods, start)?,
            "extension" => self.extension(&mods, start)?,
            "typealias" => self.type_alias(parent, &mods, start)?,
            "associatedtype" => self.associated_type(parent, &mods, start)?,
            "var" | "let" => self.binding(parent, &mods, start)?,
            "func" => self.func(parent, &mods, start)?,
            "init" => self.constructor(parent, &mods, start)?,
            "deinit" => self.destructor(parent, &mods, start)?,
            "subscript" => self.subscript(parent, &mods, start)?,
            "case" => self.enum_case(parent, &mods)?,
            "import" => self.import(start)?,
            other => return self.error(format!("unexpected `{other}`")),
        }
        self.eat(Token::Semi);
        Ok(())
    }

    fn nominal(
        &mut self,
        parent: DeclContext,
        kind: NominalKind,
        mods: &Modifiers,
        start: TextSize,
    ) -> PResult<()> {
        self.bump()?;
        let (name, name_range) = self.ident()?;
        let id = self.b.nominal(kind, parent, name, name_range, name_range);
        self.apply(id, mods);
        if let Some(clause) = self.generic_clause()? {
            self.attach_generics(id, clause);
        }
        if self.eat(Token::Colon).is_some() {
            self.inheritance(id)?;
        }
        self.where_clause(id)?;

        let open = self.expect(Token::LBrace)?;
        let context = DeclContext::Nominal(id);
        while !self.at(Token::RBrace) {
            self.decl(context)?;
        }
        let close = self.expect(Token::RBrace)?;
        self.set_range(id, start);
        if let Some(n) = self.b.ast().decl_mut(id).as_nominal_mut() {
            n.brace_range = open.cover(close);
        }
        Ok(())
    }

    fn extension(&mut self, mods: &Modifiers, start: TextSize) -> PResult<()> {
        self.bump()?;
        let extended = self.type_postfix()?;
        let range = self.since(start);
        let id = self.b.extension(extended, range);
        self.apply(id, mods);
        if self.eat(Token::Colon).is_some() {
            self.inheritance(id)?;
        }
        self.where_clause(id)?;
        self.expect(Token::LBrace)?;
        let context = DeclContext::Extension(id);
        while !self.at(Token::RBrace) {
            self.decl(context)?;
        }
        self.expect(Token::RBrace)?;
        self.set_range(id, start);
        Ok(())
    }

    fn inheritance(&mut self, owner: DeclId) -> PResult<()> {
        loop {
            let repr = self.ty()?;
            self.b.inherit(owner, repr);
            if self.eat(Token::Comma).is_none() {
                return Ok(());
            }
        }
    }

    fn generic_clause(&mut self) -> PResult<Option<GenericClause<'src>>> {
        let start = self.current_start();
        if self.eat(Token::LAngle).is_none() {
            return Ok(None);
        }
        let mut params = Vec::new();
        let mut requirements = Vec::new();
        loop {
            let (name, range) = self.ident()?;
            let mut bounds = Vec::new();
            if self.eat(Token::Colon).is_some() {
                bounds.push(self.ty()?);
            }
            params.push((name, range, bounds));
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        if self.eat_ident("where").is_some() {
            requirements = self.requirements()?;
        }
        self.expect(Token::RAngle)?;
        Ok(Some(GenericClause {
            params,
            requirements,
            range: self.since(start),
        }))
    }

    fn requirements(&mut self) -> PResult<Vec<RequirementSpec>> {
        let mut out = Vec::new();
        loop {
            let subject = self.ty()?;
            if self.eat(Token::EqEq).is_some() {
                out.push(RequirementSpec::SameType(subject, self.ty()?));
            } else {
                self.expect(Token::Colon)?;
                out.push(RequirementSpec::Conformance(subject, self.ty()?));
            }
            if self.eat(Token::Comma).is_none() {
                return Ok(out);
            }
        }
    }

    /// Trailing `where` clause of a type or function.
    fn where_clause(&mut self, owner: DeclId) -> PResult<()> {
        if self.eat_ident("where").is_none() {
            return Ok(());
        }
        for req in self.requirements()? {
            self.add_requirement(owner, req);
        }
        Ok(())
    }

    fn add_requirement(&mut self, owner: DeclId, req: RequirementSpec) {
        match req {
            RequirementSpec::Conformance(subject, constraint) => {
                self.b.conformance_requirement(owner, subject, constraint)
            }
            RequirementSpec::SameType(first, second) => {
                self.b.same_type_requirement(owner, first, second)
            }
        }
    }

    fn attach_generics(&mut self, owner: DeclId, clause: GenericClause<'src>) {
        let names: Vec<(&str, TextRange)> =
            clause.params.iter().map(|(n, r, _)| (*n, *r)).collect();
        let ids = self.b.generic_params(owner, &names, clause.range);
        for (id, (_, _, bounds)) in ids.into_iter().zip(clause.params) {
            for bound in bounds {
                self.b.inherit(id, bound);
            }
        }
        for req in clause.requirements {
            self.add_requirement(owner, req);
        }
    }

    fn type_alias(&mut self, parent: DeclContext, mods: &Modifiers, start: TextSize) -> PResult<()> {
        self.bump()?;
        let (name, name_range) = self.ident()?;
        self.expect(Token::Eq)?;
        let underlying = self.ty()?;
        let range = self.since(start);
        let id = self.b.type_alias(parent, name, underlying, range, name_range);
        self.apply(id, mods);
        Ok(())
    }

    fn associated_type(
        &mut self,
        parent: DeclContext,
        mods: &Modifiers,
        start: TextSize,
    ) -> PResult<()> {
        let DeclContext::Nominal(protocol) = parent else {
            return self.error("associated type outside of a protocol");
        };
        self.bump()?;
        let (name, name_range) = self.ident()?;
        let id = self.b.associated_type(protocol, name, name_range, name_range);
        self.apply(id, mods);
        if self.eat(Token::Colon).is_some() {
            self.inheritance(id)?;
        }
        if self.eat(Token::Eq).is_some() {
            let default = self.ty()?;
            if let DeclKind::AssociatedType(data) = &mut self.b.ast().decl_mut(id).kind {
                data.default = Some(TypeLoc::new(default));
            }
        }
        self.set_range(id, start);
        Ok(())
    }

    fn binding(&mut self, parent: DeclContext, mods: &Modifiers, start: TextSize) -> PResult<()> {
        let (keyword, _) = self.ident()?;
        let is_let = keyword == "let";
        loop {
            let entry_start = if self.pos > 0 && self.prev_is_comma() {
                self.current_start()
            } else {
                start
            };
            let pattern = self.pattern(parent, is_let)?;
            let init = match self.eat(Token::Eq) {
                Some(_) => Some(self.expr(parent)?),
                None => None,
            };
            let vars = pattern.bound_vars();
            let range = self.since(entry_start);
            let binding = self.b.binding(parent, pattern, init, range);
            if let Some((spelling, range)) = mods.static_spelling {
                self.b.set_static(binding, spelling, range);
            }
            for &var in &vars {
                self.apply(var, mods);
            }
            if let [var] = vars[..]
                && self.at(Token::LBrace)
            {
                self.accessors(var)?;
            }
            let range = self.since(entry_start);
            for d in std::iter::once(binding).chain(vars) {
                self.b.ast().decl_mut(d).range = range;
            }
            if self.eat(Token::Comma).is_none() {
                return Ok(());
            }
        }
    }

    fn prev_is_comma(&self) -> bool {
        matches!(self.tokens.get(self.pos - 1), Some((Token::Comma, _)))
    }

    fn pattern(&mut self, parent: DeclContext, is_let: bool) -> PResult<Pattern> {
        let start = self.current_start();
        let pattern = if self.eat(Token::LParen).is_some() {
            let mut elements = Vec::new();
            while !self.at(Token::RParen) {
                elements.push(self.pattern(parent, is_let)?);
                if self.eat(Token::Comma).is_none() {
                    break;
                }
            }
            self.expect(Token::RParen)?;
            Pattern::new(PatternKind::Tuple(elements), self.since(start))
        } else {
            let (name, range) = self.ident()?;
            if name == "_" {
                Pattern::new(PatternKind::Any, range)
            } else {
                let var = self.b.pattern_var(parent, name, is_let, range);
                Pattern::named(var, range)
            }
        };
        if self.eat(Token::Colon).is_some() {
            let annotation = self.ty()?;
            return Ok(Pattern::typed(pattern, TypeLoc::new(annotation)));
        }
        Ok(pattern)
    }

    fn at_accessor_list(&self) -> bool {
        match self.peek_at(1) {
            Some(Token::Ident(word)) if ACCESSOR_WORDS.contains(&word) => matches!(
                self.peek_at(2),
                Some(Token::LBrace | Token::RBrace | Token::LParen | Token::Ident(_))
            ),
            _ => false,
        }
    }

    /// `{ get { } set { } }`, `{ willSet { } }` or a getter body.
    fn accessors(&mut self, storage: DeclId) -> PResult<()> {
        let list = self.at_accessor_list();
        let open = self.expect(Token::LBrace)?;
        let close = if list {
            while !self.at(Token::RBrace) {
                let start = self.current_start();
                let mods = self.modifiers()?;
                let (word, _) = self.ident()?;
                let kind = match word {
                    "get" => AccessorKind::Getter,
                    "set" => AccessorKind::Setter,
                    "willSet" => AccessorKind::WillSet,
                    "didSet" => AccessorKind::DidSet,
                    "address" => AccessorKind::Addressor,
                    "mutableAddress" => AccessorKind::MutableAddressor,
                    other => return self.error(format!("unknown accessor `{other}`")),
                };
                if self.eat(Token::LParen).is_some() {
                    self.ident()?;
                    self.expect(Token::RParen)?;
                }
                let body = if self.at(Token::LBrace) {
                    self.skip_block()?;
                    Some(Body::new(Vec::new()))
                } else {
                    None
                };
                let range = self.since(start);
                let accessor = self.b.accessor(storage, kind, body, range);
                self.apply(accessor, &mods);
            }
            self.expect(Token::RBrace)?
        } else {
            let close = self.skip_to_close()?;
            self.b.accessor(
                storage,
                AccessorKind::Getter,
                Some(Body::new(Vec::new())),
                open.cover(close),
            );
            close
        };
        if let Some(data) = self.b.ast().decl_mut(storage).storage_mut() {
            data.accessors.brace_range = Some(open.cover(close));
        }
        Ok(())
    }

    /// `(label name: T = default, _ x: U...)`
    fn params(&mut self, labeled_by_default: bool) -> PResult<Vec<ParamEntry>> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        while !self.at(Token::RParen) {
            let start = self.current_start();
            let (first, _) = self.ident()?;
            let (api_label, name) = match self.peek_ident() {
                Some(second) => {
                    self.bump()?;
                    ((first != "_").then(|| first.to_string()), second)
                }
                None => (labeled_by_default.then(|| first.to_string()), first),
            };
            let names_range = self.since(start);
            self.expect(Token::Colon)?;
            let annotation = self.ty()?;
            let variadic = self.eat(Token::Ellipsis).is_some();
            let has_default = match self.eat(Token::Eq) {
                Some(_) => {
                    let root = self.b.root();
                    self.expr(root)?;
                    true
                }
                None => false,
            };
            let spec = ParamSpec {
                api_label,
                name: name.to_string(),
                annotation: Some(annotation),
                range: self.since(start),
                names_range: Some(names_range),
                variadic,
            };
            params.push((spec, has_default));
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(params)
    }

    fn mark_defaults(&mut self, owner: DeclId, params: &[ParamEntry]) {
        let ids = self.b.ast().decl(owner).params().to_vec();
        for (id, (_, has_default)) in ids.into_iter().zip(params) {
            if !has_default {
                continue;
            }
            if let DeclKind::Param(p) = &mut self.b.ast().decl_mut(id).kind {
                p.default_arg = DefaultArgKind::Normal;
            }
        }
    }

    fn body(&mut self, owner: DeclId) -> PResult<()> {
        if self.at(Token::LBrace) {
            self.skip_block()?;
            self.b.set_body(owner, Body::new(Vec::new()));
        }
        Ok(())
    }

    fn func(&mut self, parent: DeclContext, mods: &Modifiers, start: TextSize) -> PResult<()> {
        self.bump()?;
        let (name, name_range) = self.ident()?;
        let generics = self.generic_clause()?;
        let params = self.params(true)?;
        let result = match self.eat(Token::Arrow) {
            Some(_) => Some(self.ty()?),
            None => None,
        };
        let specs = params.iter().map(|(p, _)| p.clone()).collect();
        let range = self.since(start);
        let id = self.b.func(parent, name, specs, result, range, name_range);
        if let Some(clause) = generics {
            self.attach_generics(id, clause);
        }
        self.where_clause(id)?;
        self.mark_defaults(id, &params);
        self.apply(id, mods);
        if let Some((spelling, _)) = mods.static_spelling {
            self.b.set_static_func(id, spelling);
        }
        self.body(id)?;
        self.set_range(id, start);
        Ok(())
    }

    fn constructor(
        &mut self,
        parent: DeclContext,
        mods: &Modifiers,
        start: TextSize,
    ) -> PResult<()> {
        let (_, name_range) = self.bump()?;
        let failability = if self.eat(Token::Question).is_some() {
            Failability::Optional
        } else if self.eat(Token::Bang).is_some() {
            Failability::ImplicitlyUnwrapped
        } else {
            Failability::None
        };
        let generics = self.generic_clause()?;
        let params = self.params(true)?;
        let specs = params.iter().map(|(p, _)| p.clone()).collect();
        let range = self.since(start);
        let id = self.b.constructor(parent, specs, range, name_range);
        if let Some(clause) = generics {
            self.attach_generics(id, clause);
        }
        self.mark_defaults(id, &params);
        self.apply(id, mods);
        if let Some(c) = self.b.ast().decl_mut(id).as_ctor_mut() {
            c.failability = failability;
            if mods.has(&AttrKind::Convenience) {
                c.kind = CtorKind::Convenience;
            }
        }
        self.body(id)?;
        self.set_range(id, start);
        Ok(())
    }

    fn destructor(&mut self, parent: DeclContext, mods: &Modifiers, start: TextSize) -> PResult<()> {
        let (_, name_range) = self.bump()?;
        let range = self.since(start);
        let id = self.b.destructor(parent, range, name_range);
        self.apply(id, mods);
        self.body(id)?;
        self.set_range(id, start);
        Ok(())
    }

    fn subscript(&mut self, parent: DeclContext, mods: &Modifiers, start: TextSize) -> PResult<()> {
        let (_, name_range) = self.bump()?;
        let params = self.params(false)?;
        self.expect(Token::Arrow)?;
        let element = self.ty()?;
        let specs = params.iter().map(|(p, _)| p.clone()).collect();
        let range = self.since(start);
        let id = self.b.subscript(parent, specs, element, range, name_range);
        self.apply(id, mods);
        if self.at(Token::LBrace) {
            self.accessors(id)?;
        }
        self.set_range(id, start);
        Ok(())
    }

    fn enum_case(&mut self, parent: DeclContext, mods: &Modifiers) -> PResult<()> {
        let DeclContext::Nominal(owner) = parent else {
            return self.error("enum case outside of an enum");
        };
        self.bump()?;
        loop {
            let (name, name_range) = self.ident()?;
            let argument = if self.at(Token::LParen) {
                Some(self.type_primary()?)
            } else {
                None
            };
            let raw_value = match self.eat(Token::Eq) {
                Some(_) => Some(self.expr(parent)?),
                None => None,
            };
            let range = self.since(name_range.start());
            let id = self
                .b
                .enum_element(owner, name, argument, raw_value, range, name_range);
            self.apply(id, mods);
            if self.eat(Token::Comma).is_none() {
                return Ok(());
            }
        }
    }

    fn import(&mut self, start: TextSize) -> PResult<()> {
        self.bump()?;
        let mut path = vec![self.ident()?.0];
        while self.eat(Token::Dot).is_some() {
            path.push(self.ident()?.0);
        }
        self.b.import(&path, self.since(start));
        Ok(())
    }

    fn ty(&mut self) -> PResult<TypeRepr> {
        let start = self.current_start();
        let input = self.type_postfix()?;
        if self.eat(Token::Arrow).is_none() {
            return Ok(input);
        }
        let result = self.ty()?;
        Ok(TypeRepr {
            kind: TypeReprKind::Function {
                input: Box::new(input),
                result: Box::new(result),
            },
            range: self.since(start),
        })
    }

    fn type_postfix(&mut self) -> PResult<TypeRepr> {
        let start = self.current_start();
        let mut repr = self.type_primary()?;
        loop {
            if self.eat(Token::Question).is_some() {
                repr = TypeRepr::optional(repr, self.since(start));
            } else if self.eat(Token::Bang).is_some() {
                repr = TypeRepr {
                    kind: TypeReprKind::ImplicitlyUnwrappedOptional(Box::new(repr)),
                    range: self.since(start),
                };
            } else if self.at(Token::Dot) && self.peek_at(1) == Some(Token::Ident("Type")) {
                self.pos += 2;
                repr = TypeRepr {
                    kind: TypeReprKind::Metatype(Box::new(repr)),
                    range: self.since(start),
                };
            } else if self.eat(Token::Dot).is_some() {
                let (name, range) = self.ident()?;
                repr = self.b.member_ident(repr, name, range);
                let args = self.generic_args()?;
                if !args.is_empty() {
                    if let TypeReprKind::Ident(components) = &mut repr.kind
                        && let Some(last) = components.last_mut()
                    {
                        last.args = args;
                    }
                    repr.range = self.since(start);
                }
            } else {
                return Ok(repr);
            }
        }
    }

    fn generic_args(&mut self) -> PResult<Vec<TypeRepr>> {
        let mut args = Vec::new();
        if self.eat(Token::LAngle).is_none() {
            return Ok(args);
        }
        loop {
            args.push(self.ty()?);
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        self.expect(Token::RAngle)?;
        Ok(args)
    }

    fn type_primary(&mut self) -> PResult<TypeRepr> {
        let start = self.current_start();
        if self.eat(Token::LParen).is_some() {
            let mut elements = Vec::new();
            while !self.at(Token::RParen) {
                let label = match (self.peek(), self.peek_at(1)) {
                    (Some(Token::Ident(label)), Some(Token::Colon)) => {
                        self.pos += 2;
                        Some(self.b.intern(label))
                    }
                    _ => None,
                };
                let ty = self.ty()?;
                let variadic = self.eat(Token::Ellipsis).is_some();
                elements.push(TupleReprElement {
                    label,
                    ty,
                    variadic,
                });
                if self.eat(Token::Comma).is_none() {
                    break;
                }
            }
            self.expect(Token::RParen)?;
            if let [single] = &elements[..]
                && single.label.is_none()
                && !single.variadic
            {
                return Ok(single.ty.clone());
            }
            return Ok(TypeRepr {
                kind: TypeReprKind::Tuple(elements),
                range: self.since(start),
            });
        }

        let (name, range) = self.ident()?;
        match name {
            "protocol" if self.at(Token::LAngle) => {
                let members = self.generic_args()?;
                Ok(TypeRepr {
                    kind: TypeReprKind::Composition(members),
                    range: self.since(start),
                })
            }
            "inout" => {
                let inner = self.type_postfix()?;
                Ok(TypeRepr {
                    kind: TypeReprKind::InOut(Box::new(inner)),
                    range: self.since(start),
                })
            }
            _ => {
                let args = self.generic_args()?;
                if args.is_empty() {
                    Ok(self.b.ident(name, range))
                } else {
                    let range = self.since(start);
                    Ok(self.b.generic_ident(name, args, range))
                }
            }
        }
    }

    fn expr(&mut self, dc: DeclContext) -> PResult<Expr> {
        let start = self.current_start();
        let mut expr = self.expr_primary(dc)?;
        loop {
            if self.eat(Token::Dot).is_some() {
                let (name, _) = self.ident()?;
                let name = self.b.intern(name);
                expr = Expr::new(
                    ExprKind::UnresolvedMember {
                        base: Box::new(expr),
                        name,
                    },
                    self.since(start),
                );
            } else if self.at(Token::LParen) {
                let args = self.args(dc)?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    self.since(start),
                );
            } else if self.eat(Token::Bang).is_some() {
                expr = Expr::new(ExprKind::ForceUnwrap(Box::new(expr)), self.since(start));
            } else {
                return Ok(expr);
            }
        }
    }

    fn args(&mut self, dc: DeclContext) -> PResult<Vec<Arg>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        while !self.at(Token::RParen) {
            let label = match (self.peek(), self.peek_at(1)) {
                (Some(Token::Ident(label)), Some(Token::Colon)) => {
                    self.pos += 2;
                    Some(self.b.intern(label))
                }
                _ => None,
            };
            args.push(Arg::new(label, self.expr(dc)?));
            if self.eat(Token::Comma).is_none() {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn expr_primary(&mut self, dc: DeclContext) -> PResult<Expr> {
        let start = self.current_start();
        if self.at(Token::LParen) {
            let mut args = self.args(dc)?;
            if args.len() == 1 && args[0].label.is_none() {
                return Ok(args.remove(0).value);
            }
            return Ok(Expr::new(ExprKind::Tuple(args), self.since(start)));
        }
        if self.at(Token::LBrace) {
            let range = self.skip_block()?;
            let closure = self.b.closure(dc, range);
            return Ok(Expr::new(ExprKind::Closure(closure), range));
        }
        let negative = self.eat(Token::Minus).is_some();
        let (token, range) = self.bump()?;
        let kind = match token {
            Token::Int(text) => ExprKind::IntegerLiteral {
                text: text.to_string(),
                negative,
            },
            Token::Float(text) => ExprKind::FloatLiteral {
                text: text.to_string(),
                negative,
            },
            _ if negative => {
                return Err(ParseError::new("expected a number after `-`", range));
            }
            Token::Str(text) => ExprKind::StringLiteral(unquote(text)),
            Token::Char(text) => match text.chars().nth(1) {
                Some(c) => ExprKind::CharLiteral(c),
                None => return Err(ParseError::new("empty character literal", range)),
            },
            Token::Ident("true") => ExprKind::BooleanLiteral(true),
            Token::Ident("false") => ExprKind::BooleanLiteral(false),
            Token::Ident("nil") => ExprKind::NilLiteral,
            Token::Ident("self") => ExprKind::SelfRef,
            Token::Ident("super") => ExprKind::SuperRef,
            Token::Ident(name) => ExprKind::UnresolvedDeclRef(self.b.intern(name)),
            other => {
                return Err(ParseError::new(
                    format!("expected expression, found {other:?}"),
                    range,
                ));
            }
        };
        Ok(Expr::new(kind, self.since(start)))
    }
}

fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
