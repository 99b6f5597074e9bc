//! Parser and AST for the fragment language.
//!
//! Recursive descent over the token stream from [`super::token`]. Anything
//! outside the supported statement/expression surface is reported as a
//! `SyntaxError` fault and contained like any runtime fault.

use super::fault::Fault;
use super::token::{Tok, TokKind};
use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtEq => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtEq => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuit chain: `a and b and c`.
    BoolChain {
        op: BoolOpKind,
        values: Vec<Expr>,
    },
    /// Chained comparison: `a < b <= c`.
    Compare {
        left: Box<Expr>,
        ops: Vec<CmpOp>,
        comparators: Vec<Expr>,
    },
    Index {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
}

/// Assignment target. Only names, name tuples, and single-level index
/// targets are supported.
#[derive(Debug, Clone)]
pub enum Target {
    Name(String),
    Tuple(Vec<String>),
    Index { base: String, index: Expr },
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Assign {
        target: Target,
        value: Expr,
    },
    AugAssign {
        target: Target,
        op: BinOp,
        value: Expr,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        target: Target,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Pass,
}

/// Parse a token stream into a list of statements.
pub fn parse(toks: Vec<Tok>) -> Result<Vec<Stmt>, Fault> {
    let mut parser = Parser { toks, pos: 0 };
    parser.program()
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokKind {
        &self.toks[self.pos.min(self.toks.len() - 1)].kind
    }

    fn peek_at(&self, offset: usize) -> &TokKind {
        &self.toks[(self.pos + offset).min(self.toks.len() - 1)].kind
    }

    fn line(&self) -> usize {
        self.toks[self.pos.min(self.toks.len() - 1)].line
    }

    fn advance(&mut self) -> TokKind {
        let kind = self.toks[self.pos.min(self.toks.len() - 1)].kind.clone();
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &TokKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokKind, what: &str) -> Result<(), Fault> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> Fault {
        Fault::syntax(format!("expected {what} (line {})", self.line()))
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), TokKind::Newline | TokKind::Semi) {
            self.advance();
        }
    }

    fn program(&mut self) -> Result<Vec<Stmt>, Fault> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !matches!(self.peek(), TokKind::EndOfInput) {
            stmts.push(self.statement()?);
            self.skip_separators();
        }
        Ok(stmts)
    }

    fn statement(&mut self) -> Result<Stmt, Fault> {
        match self.peek() {
            TokKind::If => self.if_statement(),
            TokKind::While => self.while_statement(),
            TokKind::For => self.for_statement(),
            _ => {
                let stmt = self.simple_statement()?;
                self.end_of_statement()?;
                Ok(stmt)
            }
        }
    }

    /// Statements must end at a separator, a dedent, or the end of input.
    fn end_of_statement(&mut self) -> Result<(), Fault> {
        match self.peek() {
            TokKind::Newline | TokKind::Semi => {
                self.advance();
                Ok(())
            }
            TokKind::Dedent | TokKind::EndOfInput => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn simple_statement(&mut self) -> Result<Stmt, Fault> {
        match self.peek() {
            TokKind::Break => {
                self.advance();
                return Ok(Stmt::Break);
            }
            TokKind::Continue => {
                self.advance();
                return Ok(Stmt::Continue);
            }
            TokKind::Pass => {
                self.advance();
                return Ok(Stmt::Pass);
            }
            _ => {}
        }

        let expr = self.expr_list()?;
        if let Some(op) = self.augmented_op() {
            self.advance();
            let target = self.as_aug_target(expr)?;
            let value = self.expr_list()?;
            return Ok(Stmt::AugAssign { target, op, value });
        }
        if self.eat(&TokKind::Assign) {
            let target = self.as_target(expr)?;
            let value = self.expr_list()?;
            if matches!(self.peek(), TokKind::Assign) {
                return Err(Fault::syntax(
                    "chained assignment is not supported".to_string(),
                ));
            }
            return Ok(Stmt::Assign { target, value });
        }
        Ok(Stmt::Expr(expr))
    }

    fn augmented_op(&self) -> Option<BinOp> {
        match self.peek() {
            TokKind::PlusAssign => Some(BinOp::Add),
            TokKind::MinusAssign => Some(BinOp::Sub),
            TokKind::StarAssign => Some(BinOp::Mul),
            TokKind::SlashAssign => Some(BinOp::Div),
            TokKind::DoubleSlashAssign => Some(BinOp::FloorDiv),
            TokKind::PercentAssign => Some(BinOp::Mod),
            _ => None,
        }
    }

    fn as_target(&self, expr: Expr) -> Result<Target, Fault> {
        match expr {
            Expr::Name(name) => Ok(Target::Name(name)),
            Expr::Tuple(items) if !items.is_empty() => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Expr::Name(name) => names.push(name),
                        _ => {
                            return Err(Fault::syntax(
                                "only names can appear in an unpacking target".to_string(),
                            ));
                        }
                    }
                }
                Ok(Target::Tuple(names))
            }
            Expr::Index { value, index } => match *value {
                Expr::Name(base) => Ok(Target::Index {
                    base,
                    index: *index,
                }),
                _ => Err(Fault::syntax(
                    "only a named container supports item assignment".to_string(),
                )),
            },
            _ => Err(Fault::syntax("cannot assign to expression".to_string())),
        }
    }

    fn as_aug_target(&self, expr: Expr) -> Result<Target, Fault> {
        let target = self.as_target(expr)?;
        if matches!(target, Target::Tuple(_)) {
            return Err(Fault::syntax(
                "cannot use augmented assignment with an unpacking target".to_string(),
            ));
        }
        Ok(target)
    }

    fn if_statement(&mut self) -> Result<Stmt, Fault> {
        self.advance(); // 'if'
        let mut branches = Vec::new();
        let cond = self.expression()?;
        branches.push((cond, self.suite()?));
        let mut orelse = Vec::new();
        loop {
            if self.eat(&TokKind::Elif) {
                let cond = self.expression()?;
                branches.push((cond, self.suite()?));
            } else if self.eat(&TokKind::Else) {
                orelse = self.suite()?;
                break;
            } else {
                break;
            }
        }
        Ok(Stmt::If { branches, orelse })
    }

    fn while_statement(&mut self) -> Result<Stmt, Fault> {
        self.advance(); // 'while'
        let cond = self.expression()?;
        let body = self.suite()?;
        Ok(Stmt::While { cond, body })
    }

    fn for_statement(&mut self) -> Result<Stmt, Fault> {
        self.advance(); // 'for'
        let target_expr = self.target_list()?;
        let target = self.as_target(target_expr)?;
        if matches!(target, Target::Index { .. }) {
            return Err(Fault::syntax(
                "only names can appear in a for target".to_string(),
            ));
        }
        self.expect(&TokKind::In, "'in'")?;
        let iter = self.expr_list()?;
        let body = self.suite()?;
        Ok(Stmt::For { target, iter, body })
    }

    /// Comma-separated names before `in`.
    fn target_list(&mut self) -> Result<Expr, Fault> {
        let first = self.postfix()?;
        if !matches!(self.peek(), TokKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokKind::Comma) {
            if matches!(self.peek(), TokKind::In) {
                break;
            }
            items.push(self.postfix()?);
        }
        Ok(Expr::Tuple(items))
    }

    /// A block after `:`, either indented lines or simple statements on the
    /// same line separated by `;`.
    fn suite(&mut self) -> Result<Vec<Stmt>, Fault> {
        self.expect(&TokKind::Colon, "':'")?;
        if self.eat(&TokKind::Newline) {
            self.expect(&TokKind::Indent, "an indented block")?;
            let mut stmts = Vec::new();
            self.skip_separators();
            while !matches!(self.peek(), TokKind::Dedent | TokKind::EndOfInput) {
                stmts.push(self.statement()?);
                self.skip_separators();
            }
            self.eat(&TokKind::Dedent);
            Ok(stmts)
        } else {
            // Inline suite: `if x: y = 1; z = 2`
            let mut stmts = vec![self.simple_statement()?];
            while self.eat(&TokKind::Semi) {
                if matches!(self.peek(), TokKind::Newline | TokKind::EndOfInput) {
                    break;
                }
                stmts.push(self.simple_statement()?);
            }
            if matches!(self.peek(), TokKind::Newline) {
                self.advance();
            }
            Ok(stmts)
        }
    }

    /// An expression list at statement level: commas build a tuple.
    fn expr_list(&mut self) -> Result<Expr, Fault> {
        let first = self.expression()?;
        if !matches!(self.peek(), TokKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokKind::Comma) {
            if self.starts_expression() {
                items.push(self.expression()?);
            } else {
                break; // trailing comma
            }
        }
        Ok(Expr::Tuple(items))
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            TokKind::Ident(_)
                | TokKind::Int(_)
                | TokKind::Float(_)
                | TokKind::Str(_)
                | TokKind::True
                | TokKind::False
                | TokKind::None
                | TokKind::Not
                | TokKind::Plus
                | TokKind::Minus
                | TokKind::LParen
                | TokKind::LBracket
                | TokKind::LBrace
        )
    }

    fn expression(&mut self) -> Result<Expr, Fault> {
        let value = self.or_expr()?;
        if self.eat(&TokKind::If) {
            let cond = self.or_expr()?;
            self.expect(&TokKind::Else, "'else'")?;
            let orelse = self.expression()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(value),
                orelse: Box::new(orelse),
            });
        }
        Ok(value)
    }

    fn or_expr(&mut self) -> Result<Expr, Fault> {
        let first = self.and_expr()?;
        if !matches!(self.peek(), TokKind::Or) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&TokKind::Or) {
            values.push(self.and_expr()?);
        }
        Ok(Expr::BoolChain {
            op: BoolOpKind::Or,
            values,
        })
    }

    fn and_expr(&mut self) -> Result<Expr, Fault> {
        let first = self.not_expr()?;
        if !matches!(self.peek(), TokKind::And) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&TokKind::And) {
            values.push(self.not_expr()?);
        }
        Ok(Expr::BoolChain {
            op: BoolOpKind::And,
            values,
        })
    }

    fn not_expr(&mut self) -> Result<Expr, Fault> {
        if self.eat(&TokKind::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, Fault> {
        let left = self.arith()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.peek() {
                TokKind::EqEq => CmpOp::Eq,
                TokKind::NotEq => CmpOp::NotEq,
                TokKind::Lt => CmpOp::Lt,
                TokKind::LtEq => CmpOp::LtEq,
                TokKind::Gt => CmpOp::Gt,
                TokKind::GtEq => CmpOp::GtEq,
                TokKind::In => CmpOp::In,
                TokKind::Not if *self.peek_at(1) == TokKind::In => CmpOp::NotIn,
                _ => break,
            };
            self.advance();
            if op == CmpOp::NotIn {
                self.advance(); // the 'in' after 'not'
            }
            ops.push(op);
            comparators.push(self.arith()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
        })
    }

    fn arith(&mut self) -> Result<Expr, Fault> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                TokKind::Plus => BinOp::Add,
                TokKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, Fault> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek() {
                TokKind::Star => BinOp::Mul,
                TokKind::Slash => BinOp::Div,
                TokKind::DoubleSlash => BinOp::FloorDiv,
                TokKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr, Fault> {
        let op = match self.peek() {
            TokKind::Minus => Some(UnaryOp::Neg),
            TokKind::Plus => Some(UnaryOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.factor()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, Fault> {
        let base = self.postfix()?;
        if self.eat(&TokKind::DoubleStar) {
            // Right-associative, and the exponent may carry a unary sign.
            let exponent = self.factor()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, Fault> {
        let mut value = self.atom()?;
        loop {
            if self.eat(&TokKind::LParen) {
                let (args, kwargs) = self.call_arguments()?;
                value = Expr::Call {
                    func: Box::new(value),
                    args,
                    kwargs,
                };
            } else if self.eat(&TokKind::LBracket) {
                if matches!(self.peek(), TokKind::Colon) {
                    return Err(Fault::syntax("slices are not supported".to_string()));
                }
                let index = self.expression()?;
                if matches!(self.peek(), TokKind::Colon) {
                    return Err(Fault::syntax("slices are not supported".to_string()));
                }
                self.expect(&TokKind::RBracket, "']'")?;
                value = Expr::Index {
                    value: Box::new(value),
                    index: Box::new(index),
                };
            } else {
                return Ok(value);
            }
        }
    }

    fn call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), Fault> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        if self.eat(&TokKind::RParen) {
            return Ok((args, kwargs));
        }
        loop {
            let is_kwarg = matches!(self.peek(), TokKind::Ident(_))
                && *self.peek_at(1) == TokKind::Assign;
            if is_kwarg {
                let TokKind::Ident(name) = self.advance() else {
                    unreachable!()
                };
                self.advance(); // '='
                let value = self.expression()?;
                kwargs.push((name, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(Fault::syntax(
                        "positional argument follows keyword argument".to_string(),
                    ));
                }
                args.push(self.expression()?);
            }
            if self.eat(&TokKind::Comma) {
                if self.eat(&TokKind::RParen) {
                    return Ok((args, kwargs)); // trailing comma
                }
                continue;
            }
            self.expect(&TokKind::RParen, "')'")?;
            return Ok((args, kwargs));
        }
    }

    fn atom(&mut self) -> Result<Expr, Fault> {
        match self.advance() {
            TokKind::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            TokKind::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            TokKind::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            TokKind::True => Ok(Expr::Literal(Value::Bool(true))),
            TokKind::False => Ok(Expr::Literal(Value::Bool(false))),
            TokKind::None => Ok(Expr::Literal(Value::None)),
            TokKind::Ident(name) => Ok(Expr::Name(name)),
            TokKind::LParen => self.paren_atom(),
            TokKind::LBracket => self.list_atom(),
            TokKind::LBrace => self.dict_atom(),
            _ => {
                // advance() pinned us at the offending token's position.
                self.pos = self.pos.saturating_sub(1);
                Err(self.unexpected("an expression"))
            }
        }
    }

    fn paren_atom(&mut self) -> Result<Expr, Fault> {
        if self.eat(&TokKind::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.expression()?;
        if !matches!(self.peek(), TokKind::Comma) {
            self.expect(&TokKind::RParen, "')'")?;
            return Ok(first); // plain grouping
        }
        let mut items = vec![first];
        while self.eat(&TokKind::Comma) {
            if matches!(self.peek(), TokKind::RParen) {
                break;
            }
            items.push(self.expression()?);
        }
        self.expect(&TokKind::RParen, "')'")?;
        Ok(Expr::Tuple(items))
    }

    fn list_atom(&mut self) -> Result<Expr, Fault> {
        let mut items = Vec::new();
        if self.eat(&TokKind::RBracket) {
            return Ok(Expr::List(items));
        }
        loop {
            items.push(self.expression()?);
            if self.eat(&TokKind::Comma) {
                if self.eat(&TokKind::RBracket) {
                    return Ok(Expr::List(items));
                }
                continue;
            }
            self.expect(&TokKind::RBracket, "']'")?;
            return Ok(Expr::List(items));
        }
    }

    fn dict_atom(&mut self) -> Result<Expr, Fault> {
        let mut entries = Vec::new();
        if self.eat(&TokKind::RBrace) {
            return Ok(Expr::Dict(entries));
        }
        loop {
            let key = self.expression()?;
            if !self.eat(&TokKind::Colon) {
                return Err(Fault::syntax("set literals are not supported".to_string()));
            }
            let value = self.expression()?;
            entries.push((key, value));
            if self.eat(&TokKind::Comma) {
                if self.eat(&TokKind::RBrace) {
                    return Ok(Expr::Dict(entries));
                }
                continue;
            }
            self.expect(&TokKind::RBrace, "'}'")?;
            return Ok(Expr::Dict(entries));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::token::tokenize;
    use super::*;

    fn parse_source(source: &str) -> Result<Vec<Stmt>, Fault> {
        parse(tokenize(source)?)
    }

    #[test]
    fn test_assignment() {
        let stmts = parse_source("x = 42").unwrap();
        assert_eq!(stmts.len(), 1);
        assert!(matches!(
            &stmts[0],
            Stmt::Assign {
                target: Target::Name(name),
                ..
            } if name == "x"
        ));
    }

    #[test]
    fn test_tuple_unpacking_target() {
        let stmts = parse_source("a, b = 1, 2").unwrap();
        assert!(matches!(
            &stmts[0],
            Stmt::Assign {
                target: Target::Tuple(names),
                ..
            } if names == &["a".to_string(), "b".to_string()]
        ));
    }

    #[test]
    fn test_index_assignment_target() {
        let stmts = parse_source("d['k'] = 1").unwrap();
        assert!(matches!(
            &stmts[0],
            Stmt::Assign {
                target: Target::Index { base, .. },
                ..
            } if base == "d"
        ));
    }

    #[test]
    fn test_if_elif_else() {
        let stmts = parse_source("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3").unwrap();
        let Stmt::If { branches, orelse } = &stmts[0] else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(orelse.len(), 1);
    }

    #[test]
    fn test_inline_suite() {
        let stmts = parse_source("if a: x = 1; y = 2\nz = 3").unwrap();
        let Stmt::If { branches, .. } = &stmts[0] else {
            panic!("expected if");
        };
        assert_eq!(branches[0].1.len(), 2);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let stmts = parse_source("1 + 2 * 3").unwrap();
        let Stmt::Expr(Expr::Binary { op, right, .. }) = &stmts[0] else {
            panic!("expected binary expr");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(**right, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_chained_comparison() {
        let stmts = parse_source("1 < x <= 10").unwrap();
        let Stmt::Expr(Expr::Compare { ops, .. }) = &stmts[0] else {
            panic!("expected comparison");
        };
        assert_eq!(ops, &[CmpOp::Lt, CmpOp::LtEq]);
    }

    #[test]
    fn test_not_in() {
        let stmts = parse_source("x not in [1, 2]").unwrap();
        let Stmt::Expr(Expr::Compare { ops, .. }) = &stmts[0] else {
            panic!("expected comparison");
        };
        assert_eq!(ops, &[CmpOp::NotIn]);
    }

    #[test]
    fn test_call_with_kwargs() {
        let stmts = parse_source("print(1, 2, sep=', ')").unwrap();
        let Stmt::Expr(Expr::Call { args, kwargs, .. }) = &stmts[0] else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 2);
        assert_eq!(kwargs[0].0, "sep");
    }

    #[test]
    fn test_slice_rejected() {
        let fault = parse_source("x[1:2]").unwrap_err();
        assert_eq!(fault.to_string(), "SyntaxError: slices are not supported");
    }

    #[test]
    fn test_set_literal_rejected() {
        let fault = parse_source("{1, 2}").unwrap_err();
        assert_eq!(
            fault.to_string(),
            "SyntaxError: set literals are not supported"
        );
    }

    #[test]
    fn test_single_element_tuple() {
        let stmts = parse_source("t = (1,)").unwrap();
        let Stmt::Assign { value: Expr::Tuple(items), .. } = &stmts[0] else {
            panic!("expected tuple");
        };
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_cannot_assign_to_literal() {
        let fault = parse_source("1 = 2").unwrap_err();
        assert_eq!(fault.to_string(), "SyntaxError: cannot assign to expression");
    }

    #[test]
    fn test_for_over_tuple_target() {
        let stmts = parse_source("for k, v in pairs:\n    x = k").unwrap();
        assert!(matches!(
            &stmts[0],
            Stmt::For {
                target: Target::Tuple(_),
                ..
            }
        ));
    }
}
