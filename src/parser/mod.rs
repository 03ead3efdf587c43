//! A hand-written precedence-climbing recursive-descent parser.
//!
//! Grounded in the teacher's `parser::direct_parsing::DirectParser`: no
//! combinator framework, just small `expect_*` helpers and functions that
//! call each other directly. `expect_*` is generated by a macro here
//! purely to avoid retyping the same three lines thirteen times; the
//! shape of each one is exactly the teacher's `expect_lparen`/
//! `expect_semicolon`/etc.

mod error;

pub use error::{ParseError, ParseResult};

use log::error;

use crate::ast::{
    AssignMode, BinaryOperator, Expression, FileNode, FnDeclParam, FunctionDecl, NodeIdGen, SourceFile, Step,
    StructDecl, StructDeclField, StructExprField, TyLabel, UnaryOperator,
};
use crate::diagnostics::Pos;
use crate::scanner::{LiteralKind, Scanner, Token};

/// Parses `source` into a [`SourceFile`]. Fails fatally on the first
/// scan or grammar error; there is no local recovery.
pub fn parse(source: &str, filename: &str) -> ParseResult<SourceFile> {
    let scanner = Scanner::new(source)?;
    let mut parser = Parser {
        scanner,
        ids: NodeIdGen::new(),
    };
    parser.parse_source_file(filename)
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    ids: NodeIdGen,
}

macro_rules! expect_fns {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            fn $name(&mut self) -> ParseResult<Pos> {
                self.bump_if(|t| matches!(t, Token::$variant { .. }))
            }
        )*
    };
}

impl<'a> Parser<'a> {
    expect_fns! {
        expect_fn => Fn,
        expect_var => Var,
        expect_struct => Struct,
        expect_new => New,
        expect_return => Return,
        expect_if_kw => If,
        expect_loop => Loop,
        expect_break => Break,
        expect_lparen => BeginParen,
        expect_rparen => EndParen,
        expect_lbrace => BeginBrace,
        expect_rbrace => EndBrace,
        expect_lbracket => BeginBracket,
        expect_rbracket => EndBracket,
        expect_colon => Colon,
        expect_semi => Semi,
    }

    fn bump_if(&mut self, matches: impl Fn(&Token) -> bool) -> ParseResult<Pos> {
        let tok = self.scanner.token();
        if matches(tok) {
            let pos = tok.position();
            self.scanner.advance()?;
            Ok(pos)
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ParseError {
        let tok = self.scanner.token();
        let err = ParseError {
            message: format!("unexpected token: {}", tok.describe()),
            position: tok.position(),
        };
        error!("{err}");
        err
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.scanner.token().clone() {
            Token::Ident { name, .. } => {
                self.scanner.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parses a comma-separated, optionally trailing-comma list of `T`
    /// until `is_end` matches the current token (not consumed).
    fn parse_comma_list<T>(
        &mut self,
        is_end: impl Fn(&Token) -> bool,
        mut parse_item: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        let mut items = Vec::new();
        if is_end(self.scanner.token()) {
            return Ok(items);
        }
        loop {
            items.push(parse_item(self)?);
            if matches!(self.scanner.token(), Token::Comma { .. }) {
                self.scanner.advance()?;
                if is_end(self.scanner.token()) {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(items)
    }

    fn parse_optional_ty_label(&mut self) -> ParseResult<Option<TyLabel>> {
        if matches!(self.scanner.token(), Token::Colon { .. }) {
            Ok(Some(self.parse_ty_label()?))
        } else {
            Ok(None)
        }
    }

    fn parse_ty_label(&mut self) -> ParseResult<TyLabel> {
        self.expect_colon()?;
        let position = self.scanner.pos();
        let name = self.expect_ident()?;
        Ok(TyLabel { name, position })
    }

    fn parse_source_file(&mut self, filename: &str) -> ParseResult<SourceFile> {
        let mut decls = Vec::new();
        while !matches!(self.scanner.token(), Token::Eof { .. }) {
            decls.push(self.parse_file_node()?);
        }
        Ok(SourceFile {
            filename: filename.to_owned(),
            decls,
        })
    }

    fn parse_file_node(&mut self) -> ParseResult<FileNode> {
        let exported = if matches!(self.scanner.token(), Token::Export { .. }) {
            self.scanner.advance()?;
            true
        } else {
            false
        };
        match self.scanner.token() {
            Token::Fn { .. } => Ok(FileNode::Function(self.parse_function_decl(exported)?)),
            Token::Struct { .. } => Ok(FileNode::Struct(self.parse_struct_decl(exported)?)),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_function_decl(&mut self, exported: bool) -> ParseResult<FunctionDecl> {
        let position = self.expect_fn()?;
        let id = self.ids.fresh();
        let name = self.expect_ident()?;
        self.expect_lparen()?;
        let params = self.parse_comma_list(
            |t| matches!(t, Token::EndParen { .. }),
            |p| p.parse_fn_decl_param(),
        )?;
        self.expect_rparen()?;
        let return_ty = self.parse_optional_ty_label()?;
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            id,
            name,
            params,
            body,
            return_ty,
            exported,
            position,
        })
    }

    fn parse_fn_decl_param(&mut self) -> ParseResult<FnDeclParam> {
        let position = self.scanner.pos();
        let id = self.ids.fresh();
        let name = self.expect_ident()?;
        let ty = self.parse_optional_ty_label()?;
        Ok(FnDeclParam { id, name, ty, position })
    }

    fn parse_struct_decl(&mut self, exported: bool) -> ParseResult<StructDecl> {
        let position = self.expect_struct()?;
        let id = self.ids.fresh();
        let name = self.expect_ident()?;
        self.expect_lbrace()?;
        let fields = self.parse_comma_list(
            |t| matches!(t, Token::EndBrace { .. }),
            |p| p.parse_struct_decl_field(),
        )?;
        self.expect_rbrace()?;
        Ok(StructDecl {
            id,
            name,
            fields,
            exported,
            position,
        })
    }

    fn parse_struct_decl_field(&mut self) -> ParseResult<StructDeclField> {
        let position = self.scanner.pos();
        let id = self.ids.fresh();
        let name = self.expect_ident()?;
        let ty = self.parse_ty_label()?;
        Ok(StructDeclField { id, name, ty, position })
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Step>> {
        self.expect_lbrace()?;
        let mut steps = Vec::new();
        while !matches!(self.scanner.token(), Token::EndBrace { .. }) {
            steps.push(self.parse_step()?);
        }
        self.expect_rbrace()?;
        Ok(steps)
    }

    fn parse_step(&mut self) -> ParseResult<Step> {
        match self.scanner.token() {
            Token::Var { .. } => self.parse_variable_decl(),
            Token::Loop { .. } => self.parse_loop_statement(),
            Token::Return { .. } => self.parse_return_statement(),
            Token::Break { .. } => self.parse_break_statement(),
            _ => self.parse_statement_start_with_expr(),
        }
    }

    fn parse_variable_decl(&mut self) -> ParseResult<Step> {
        let position = self.expect_var()?;
        let id = self.ids.fresh();
        let name = self.expect_ident()?;
        let ty = self.parse_optional_ty_label()?;
        let init = if matches!(self.scanner.token(), Token::Assign { .. }) {
            self.scanner.advance()?;
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect_semi()?;
        Ok(Step::VariableDecl {
            id,
            name,
            ty,
            init,
            position,
        })
    }

    fn parse_loop_statement(&mut self) -> ParseResult<Step> {
        let position = self.expect_loop()?;
        let id = self.ids.fresh();
        let block = self.parse_block()?;
        Ok(Step::LoopStatement { id, block, position })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Step> {
        let position = self.expect_return()?;
        let id = self.ids.fresh();
        let expr = if matches!(self.scanner.token(), Token::Semi { .. }) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_semi()?;
        Ok(Step::ReturnStatement { id, expr, position })
    }

    fn parse_break_statement(&mut self) -> ParseResult<Step> {
        let position = self.expect_break()?;
        let id = self.ids.fresh();
        self.expect_semi()?;
        Ok(Step::BreakStatement { id, position })
    }

    fn parse_statement_start_with_expr(&mut self) -> ParseResult<Step> {
        let position = self.scanner.pos();
        let id = self.ids.fresh();
        let expr = self.parse_expr()?;
        if let Some(mode) = self.match_assign_mode() {
            self.scanner.advance()?;
            let body = self.parse_expr()?;
            self.expect_semi()?;
            return Ok(Step::AssignStatement {
                id,
                target: expr,
                body,
                mode,
                position,
            });
        }
        if matches!(self.scanner.token(), Token::Semi { .. }) {
            self.scanner.advance()?;
            return Ok(Step::ExprStatement { id, expr, position });
        }
        Ok(Step::TrailingExpr { id, expr, position })
    }

    fn match_assign_mode(&self) -> Option<AssignMode> {
        match self.scanner.token() {
            Token::Assign { .. } => Some(AssignMode::Assign),
            Token::AddAssign { .. } => Some(AssignMode::Add),
            Token::SubAssign { .. } => Some(AssignMode::Sub),
            Token::MultAssign { .. } => Some(AssignMode::Mult),
            Token::DivAssign { .. } => Some(AssignMode::Div),
            Token::ModAssign { .. } => Some(AssignMode::Mod),
            _ => None,
        }
    }

    /// `Expr := Infix(0)`. Precedence climbing over the fixed six-level
    /// table; level 7 bottoms out at an atom.
    fn parse_expr(&mut self) -> ParseResult<Expression> {
        self.parse_infix(1)
    }

    fn parse_infix(&mut self, level: u8) -> ParseResult<Expression> {
        if level > 6 {
            return self.parse_atom();
        }
        let mut left = self.parse_infix(level + 1)?;
        while let Some(op) = operator_at_level(self.scanner.token(), level) {
            let position = self.scanner.token().position();
            self.scanner.advance()?;
            let right = self.parse_infix(level + 1)?;
            left = Expression::BinaryOp {
                id: self.ids.fresh(),
                op,
                left: Box::new(left),
                right: Box::new(right),
                position,
            };
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> ParseResult<Expression> {
        let inner = self.parse_atom_inner()?;
        self.parse_suffix_chain(inner)
    }

    fn parse_atom_inner(&mut self) -> ParseResult<Expression> {
        match self.scanner.token().clone() {
            Token::Literal {
                kind: LiteralKind::Number,
                text,
                position,
            } => {
                self.scanner.advance()?;
                let value: f64 = text.parse().map_err(|_| {
                    let err = ParseError {
                        message: format!("invalid number literal: {text}"),
                        position,
                    };
                    error!("{err}");
                    err
                })?;
                Ok(Expression::NumberLiteral {
                    id: self.ids.fresh(),
                    value,
                    position,
                })
            }
            Token::Literal {
                kind: LiteralKind::Bool,
                text,
                position,
            } => {
                self.scanner.advance()?;
                Ok(Expression::BoolLiteral {
                    id: self.ids.fresh(),
                    value: text == "true",
                    position,
                })
            }
            Token::Literal {
                kind: LiteralKind::Char,
                text,
                position,
            } => {
                self.scanner.advance()?;
                Ok(Expression::CharLiteral {
                    id: self.ids.fresh(),
                    value: text,
                    position,
                })
            }
            Token::Literal {
                kind: LiteralKind::String,
                text,
                position,
            } => {
                self.scanner.advance()?;
                Ok(Expression::StringLiteral {
                    id: self.ids.fresh(),
                    value: text,
                    position,
                })
            }
            Token::Ident { name, position } => {
                self.scanner.advance()?;
                Ok(Expression::Identifier {
                    id: self.ids.fresh(),
                    name,
                    position,
                })
            }
            Token::New { .. } => self.parse_struct_expr(),
            Token::BeginBracket { .. } => self.parse_array(),
            Token::If { .. } => self.parse_if_expr(),
            Token::Not { position } => {
                self.scanner.advance()?;
                let operand = self.parse_atom()?;
                Ok(Expression::UnaryOp {
                    id: self.ids.fresh(),
                    op: UnaryOperator::Not,
                    operand: Box::new(operand),
                    position,
                })
            }
            Token::Plus { position } => {
                self.scanner.advance()?;
                let operand = self.parse_atom()?;
                Ok(Expression::UnaryOp {
                    id: self.ids.fresh(),
                    op: UnaryOperator::Plus,
                    operand: Box::new(operand),
                    position,
                })
            }
            Token::Minus { position } => {
                self.scanner.advance()?;
                let operand = self.parse_atom()?;
                Ok(Expression::UnaryOp {
                    id: self.ids.fresh(),
                    op: UnaryOperator::Minus,
                    operand: Box::new(operand),
                    position,
                })
            }
            Token::BeginParen { .. } => {
                self.scanner.advance()?;
                let expr = self.parse_expr()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_suffix_chain(&mut self, mut expr: Expression) -> ParseResult<Expression> {
        loop {
            match self.scanner.token().clone() {
                Token::BeginParen { position } => {
                    self.scanner.advance()?;
                    let args = self.parse_comma_list(
                        |t| matches!(t, Token::EndParen { .. }),
                        |p| p.parse_expr(),
                    )?;
                    self.expect_rparen()?;
                    expr = Expression::Call {
                        id: self.ids.fresh(),
                        callee: Box::new(expr),
                        args,
                        position,
                    };
                }
                Token::Dot { position } => {
                    self.scanner.advance()?;
                    let name = self.expect_ident()?;
                    expr = Expression::FieldAccess {
                        id: self.ids.fresh(),
                        target: Box::new(expr),
                        name,
                        position,
                    };
                }
                Token::BeginBracket { position } => {
                    self.scanner.advance()?;
                    let index = self.parse_expr()?;
                    self.expect_rbracket()?;
                    expr = Expression::IndexAccess {
                        id: self.ids.fresh(),
                        target: Box::new(expr),
                        index: Box::new(index),
                        position,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_struct_expr(&mut self) -> ParseResult<Expression> {
        let position = self.expect_new()?;
        let id = self.ids.fresh();
        let name = self.expect_ident()?;
        self.expect_lbrace()?;
        let fields = self.parse_comma_list(
            |t| matches!(t, Token::EndBrace { .. }),
            |p| p.parse_struct_expr_field(),
        )?;
        self.expect_rbrace()?;
        Ok(Expression::StructExpr {
            id,
            name,
            fields,
            position,
        })
    }

    fn parse_struct_expr_field(&mut self) -> ParseResult<StructExprField> {
        let position = self.scanner.pos();
        let name = self.expect_ident()?;
        self.expect_colon()?;
        let body = self.parse_expr()?;
        Ok(StructExprField { name, body, position })
    }

    fn parse_array(&mut self) -> ParseResult<Expression> {
        let position = self.expect_lbracket()?;
        let id = self.ids.fresh();
        let items = self.parse_comma_list(
            |t| matches!(t, Token::EndBracket { .. }),
            |p| p.parse_expr(),
        )?;
        self.expect_rbracket()?;
        Ok(Expression::Array { id, items, position })
    }

    fn parse_if_expr(&mut self) -> ParseResult<Expression> {
        let position = self.expect_if_kw()?;
        let id = self.ids.fresh();
        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;
        let else_block = if matches!(self.scanner.token(), Token::Else { .. }) {
            self.scanner.advance()?;
            if matches!(self.scanner.token(), Token::If { .. }) {
                let nested = self.parse_if_expr()?;
                Some(vec![Step::TrailingExpr {
                    id: self.ids.fresh(),
                    position: nested.position(),
                    expr: nested,
                }])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(Expression::If {
            id,
            cond: Box::new(cond),
            then_block,
            else_block,
            position,
        })
    }
}

fn operator_at_level(token: &Token, level: u8) -> Option<BinaryOperator> {
    use BinaryOperator::*;
    match (level, token) {
        (1, Token::Or2 { .. }) => Some(Or),
        (2, Token::And2 { .. }) => Some(And),
        (3, Token::Eq2 { .. }) => Some(Eq),
        (3, Token::NotEq { .. }) => Some(NotEq),
        (4, Token::LessThan { .. }) => Some(LessThan),
        (4, Token::LessThanEq { .. }) => Some(LessThanEq),
        (4, Token::GreaterThan { .. }) => Some(GreaterThan),
        (4, Token::GreaterThanEq { .. }) => Some(GreaterThanEq),
        (5, Token::Plus { .. }) => Some(Add),
        (5, Token::Minus { .. }) => Some(Sub),
        (6, Token::Asterisk { .. }) => Some(Mult),
        (6, Token::Slash { .. }) => Some(Div),
        (6, Token::Percent { .. }) => Some(Mod),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_main() {
        let file = parse("fn main(){}", "t.ug").unwrap();
        assert_eq!(file.decls.len(), 1);
        assert_eq!(file.decls[0].name(), "main");
    }

    #[test]
    fn precedence_climbs_correctly() {
        let file = parse("fn main(){ 1 + 2 * 3; }", "t.ug").unwrap();
        let FileNode::Function(f) = &file.decls[0] else {
            panic!("expected function");
        };
        let Step::ExprStatement { expr, .. } = &f.body[0] else {
            panic!("expected expr statement");
        };
        let Expression::BinaryOp { op, left, right, .. } = expr else {
            panic!("expected binary op");
        };
        assert_eq!(*op, BinaryOperator::Add);
        assert!(matches!(**left, Expression::NumberLiteral { value, .. } if value == 1.0));
        assert!(matches!(**right, Expression::BinaryOp { op: BinaryOperator::Mult, .. }));
    }

    #[test]
    fn parses_assignment_and_suffix_chain() {
        let file = parse("fn main(){ a.b[0] = 1; }", "t.ug").unwrap();
        let FileNode::Function(f) = &file.decls[0] else {
            panic!("expected function");
        };
        assert!(matches!(f.body[0], Step::AssignStatement { mode: AssignMode::Assign, .. }));
    }

    #[test]
    fn parses_struct_decl_and_literal() {
        let file = parse(
            "struct A { value: number } fn main(){ var a = new A { value: 1 }; }",
            "t.ug",
        )
        .unwrap();
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn parses_if_else_chain() {
        let file = parse(
            "fn main(){ if true { 1; } else if false { 2; } else { 3; } }",
            "t.ug",
        )
        .unwrap();
        let FileNode::Function(f) = &file.decls[0] else {
            panic!("expected function");
        };
        assert!(matches!(f.body[0], Step::ExprStatement { .. }));
    }

    #[test]
    fn trailing_expression_only_valid_at_block_end() {
        let file = parse("fn main(){ 1 + 1 }", "t.ug").unwrap();
        let FileNode::Function(f) = &file.decls[0] else {
            panic!("expected function");
        };
        assert!(matches!(f.body[0], Step::TrailingExpr { .. }));
    }

    #[test]
    fn unexpected_token_is_a_fatal_error() {
        let err = parse("fn main(){ var = 1; }", "t.ug").unwrap_err();
        assert!(err.message.starts_with("unexpected token"));
    }

    #[test]
    fn parsing_same_source_twice_is_deterministic() {
        let source = "fn add(x:number,y:number):number{ return x+y; } fn main(){ assertEq(add(1,2), 3); }";
        let first = parse(source, "t.ug").unwrap();
        let second = parse(source, "t.ug").unwrap();
        assert_eq!(first, second);
    }
}
