#![allow(clippy::result_large_err)]

use num_bigint::BigInt;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::errors::{ParseDiagnostic, ParseDiagnosticSeverity, ParseError};

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct SympathParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

fn span_from(pair: &Pair<'_>) -> Span {
    let s = pair.as_span();
    Span::new(s.start(), s.end())
}

/// Keyword and indentation tokens carry no information once the tree exists.
fn is_noise(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_def
            | Rule::kw_if
            | Rule::kw_elif
            | Rule::kw_else
            | Rule::kw_return
            | Rule::kw_assert
            | Rule::kw_and
            | Rule::kw_or
            | Rule::kw_not
            | Rule::indent
    )
}

fn children(pair: Pair<'_>) -> impl Iterator<Item = Pair<'_>> {
    pair.into_inner().filter(|p| !is_noise(p.as_rule()))
}

/// Replace `#` comments with spaces so byte offsets stay valid for the
/// original text.
fn blank_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_comment = false;
    for ch in source.chars() {
        match ch {
            '\n' | '\r' => {
                in_comment = false;
                out.push(ch);
            }
            '#' => {
                in_comment = true;
                out.push(' ');
            }
            c if in_comment => out.extend(std::iter::repeat(' ').take(c.len_utf8())),
            c => out.push(c),
        }
    }
    out
}

fn rule_name(rule: &Rule) -> String {
    match rule {
        Rule::or_test
        | Rule::and_test
        | Rule::not_test
        | Rule::comparison
        | Rule::shift_expr
        | Rule::arith_expr
        | Rule::term
        | Rule::factor
        | Rule::power
        | Rule::testlist => "expression".into(),
        Rule::function_def | Rule::def_header | Rule::kw_def => "`def name(...):`".into(),
        Rule::suite => "statement or indented block".into(),
        Rule::if_stmt
        | Rule::return_stmt
        | Rule::assert_stmt
        | Rule::assign_stmt
        | Rule::target
        | Rule::target_tuple => "statement".into(),
        Rule::elif_clause => "`elif`".into(),
        Rule::else_clause => "`else`".into(),
        Rule::comp_op => "comparison operator".into(),
        Rule::shift_op | Rule::add_op | Rule::mul_op => "operator".into(),
        Rule::unary_op => "unary operator".into(),
        Rule::param_list => "parameter list".into(),
        Rule::trailing_comma => "`,`".into(),
        Rule::EOI => "end of input".into(),
        other => format!("{other:?}"),
    }
}

fn pest_error(err: pest::error::Error<Rule>, source: &str, filename: &str) -> ParseError {
    let (start, end) = match err.location {
        pest::error::InputLocation::Pos(p) => {
            let width = source
                .get(p..)
                .and_then(|rest| rest.chars().next())
                .map_or(0, char::len_utf8);
            (p, p + width)
        }
        pest::error::InputLocation::Span((s, e)) => (s, e),
    };
    let err = err.renamed_rules(rule_name);
    ParseError::syntax(
        err.variant.message().into_owned(),
        Span::new(start, end.max(start)),
        source,
        filename,
    )
}

/// Parse a source file into an AST Program.
pub fn parse(source: &str, filename: &str) -> Result<Program, ParseError> {
    let (program, _) = parse_with_diagnostics(source, filename)?;
    Ok(program)
}

/// Parse a source file into an AST Program and emit parser diagnostics.
pub fn parse_with_diagnostics(
    source: &str,
    filename: &str,
) -> Result<(Program, Vec<ParseDiagnostic>), ParseError> {
    let cleaned = blank_comments(source);
    let mut pairs = SympathParser::parse(Rule::program, &cleaned)
        .map_err(|e| pest_error(e, source, filename))?;
    let program_pair = pairs.next().ok_or_else(|| {
        ParseError::syntax("empty parse tree", Span::new(0, 0), source, filename)
    })?;

    let mut builder = Builder {
        source,
        filename,
        next_assert: 0,
    };
    let mut functions: Vec<Spanned<FunctionDef>> = Vec::new();
    let mut name_spans: Vec<Span> = Vec::new();
    for pair in program_pair.into_inner() {
        if pair.as_rule() != Rule::function_def {
            continue;
        }
        let (function, name_span) = builder.function_def(pair)?;
        if let Some(idx) = functions
            .iter()
            .position(|f| f.node.name == function.node.name)
        {
            return Err(ParseError::duplicate(
                function.node.name,
                name_span,
                name_spans[idx],
                source,
                filename,
            ));
        }
        functions.push(function);
        name_spans.push(name_span);
    }

    let program = Program { functions };
    let diagnostics = collect_parser_diagnostics(&program);
    Ok((program, diagnostics))
}

struct Builder<'s> {
    source: &'s str,
    filename: &'s str,
    next_assert: u32,
}

impl Builder<'_> {
    fn error(&self, span: Span, message: impl Into<String>) -> ParseError {
        ParseError::syntax(message, span, self.source, self.filename)
    }

    /// Integer literals are unbounded.
    fn integer(&self, digits: &str, span: Span) -> Result<BigInt, ParseError> {
        digits
            .parse()
            .map_err(|_| self.error(span, format!("invalid integer literal {digits}")))
    }

    fn next_child<'a>(
        &self,
        iter: &mut impl Iterator<Item = Pair<'a>>,
        parent: Span,
        what: &str,
    ) -> Result<Pair<'a>, ParseError> {
        iter.next()
            .ok_or_else(|| self.error(parent, format!("expected {what}")))
    }

    fn function_def(&mut self, pair: Pair<'_>) -> Result<(Spanned<FunctionDef>, Span), ParseError> {
        let span = span_from(&pair);
        let mut inner = children(pair);
        let header = self.next_child(&mut inner, span, "function header")?;
        let suite = self.next_child(&mut inner, span, "function body")?;

        let header_span = span_from(&header);
        let mut header_inner = children(header);
        let name_pair = self.next_child(&mut header_inner, header_span, "function name")?;
        let name_span = span_from(&name_pair);
        let name = name_pair.as_str().to_string();

        let mut params: Vec<String> = Vec::new();
        if let Some(list) = header_inner.next() {
            for param in children(list) {
                let param_name = param.as_str().to_string();
                if params.contains(&param_name) {
                    return Err(self.error(
                        span_from(&param),
                        format!("duplicate parameter '{param_name}' in function '{name}'"),
                    ));
                }
                params.push(param_name);
            }
        }

        let body = self.suite(suite)?;
        Ok((
            Spanned::new(FunctionDef { name, params, body }, span),
            name_span,
        ))
    }

    fn suite(&mut self, pair: Pair<'_>) -> Result<Block, ParseError> {
        children(pair).map(|stmt| self.statement(stmt)).collect()
    }

    fn statement(&mut self, pair: Pair<'_>) -> Result<Spanned<Stmt>, ParseError> {
        let span = span_from(&pair);
        match pair.as_rule() {
            Rule::if_stmt => self.if_stmt(pair),
            Rule::return_stmt => {
                let value = match children(pair).next() {
                    Some(list) => Some(self.testlist(list)?),
                    None => None,
                };
                Ok(Spanned::new(Stmt::Return(value), span))
            }
            Rule::assert_stmt => {
                let mut inner = children(pair);
                let test_pair = self.next_child(&mut inner, span, "assert condition")?;
                let id = AssertId(self.next_assert);
                self.next_assert += 1;
                let test = self.expr(test_pair)?;
                Ok(Spanned::new(Stmt::Assert { id, test }, span))
            }
            Rule::assign_stmt => {
                let mut parts: Vec<Pair<'_>> = children(pair).collect();
                let value_pair = parts
                    .pop()
                    .ok_or_else(|| self.error(span, "expected assigned value"))?;
                let targets = parts
                    .into_iter()
                    .map(|t| self.target(t))
                    .collect::<Result<Vec<_>, _>>()?;
                let value = self.testlist(value_pair)?;
                Ok(Spanned::new(Stmt::Assign { targets, value }, span))
            }
            other => Err(self.error(span, format!("unexpected {}", rule_name(&other)))),
        }
    }

    fn if_stmt(&mut self, pair: Pair<'_>) -> Result<Spanned<Stmt>, ParseError> {
        let span = span_from(&pair);
        let mut inner = children(pair);
        let header = self.next_child(&mut inner, span, "if condition")?;
        let suite = self.next_child(&mut inner, span, "if body")?;
        let test = self.header_test(header)?;
        let body = self.suite(suite)?;

        // Clauses are built in source order so assert ids stay ordered, then
        // folded from the back into nested `If`s.
        let mut elifs: Vec<(Spanned<Expr>, Block, Span)> = Vec::new();
        let mut orelse: Block = Vec::new();
        for clause in inner {
            let clause_span = span_from(&clause);
            match clause.as_rule() {
                Rule::elif_clause => {
                    let mut parts = children(clause);
                    let header = self.next_child(&mut parts, clause_span, "elif condition")?;
                    let suite = self.next_child(&mut parts, clause_span, "elif body")?;
                    let start = header.as_span().start();
                    let test = self.header_test(header)?;
                    let body = self.suite(suite)?;
                    elifs.push((test, body, Span::new(start, clause_span.end)));
                }
                Rule::else_clause => {
                    let mut parts = children(clause);
                    let _header = self.next_child(&mut parts, clause_span, "else")?;
                    let suite = self.next_child(&mut parts, clause_span, "else body")?;
                    orelse = self.suite(suite)?;
                }
                other => {
                    return Err(self.error(clause_span, format!("unexpected {}", rule_name(&other))))
                }
            }
        }

        for (test, body, elif_span) in elifs.into_iter().rev() {
            let nested = Stmt::If { test, body, orelse };
            orelse = vec![Spanned::new(nested, elif_span)];
        }

        Ok(Spanned::new(Stmt::If { test, body, orelse }, span))
    }

    fn header_test(&mut self, header: Pair<'_>) -> Result<Spanned<Expr>, ParseError> {
        let span = span_from(&header);
        let mut inner = children(header);
        let test = self.next_child(&mut inner, span, "condition")?;
        self.expr(test)
    }

    fn target(&self, pair: Pair<'_>) -> Result<Spanned<AssignTarget>, ParseError> {
        let span = span_from(&pair);
        let mut inner = children(pair);
        let target = self.next_child(&mut inner, span, "assignment target")?;
        match target.as_rule() {
            Rule::identifier => Ok(Spanned::new(
                AssignTarget::Name(target.as_str().to_string()),
                span,
            )),
            Rule::target_tuple => {
                let has_comma = target.as_str().contains(',');
                let names: Vec<String> = children(target)
                    .map(|p| p.as_str().to_string())
                    .collect();
                match names.as_slice() {
                    [single] if !has_comma => {
                        Ok(Spanned::new(AssignTarget::Name(single.clone()), span))
                    }
                    _ => Ok(Spanned::new(AssignTarget::Tuple(names), span)),
                }
            }
            other => Err(self.error(span, format!("unexpected {}", rule_name(&other)))),
        }
    }

    /// `a, b` builds a tuple; a single expression without a trailing comma
    /// is returned as is.
    fn testlist(&self, pair: Pair<'_>) -> Result<Spanned<Expr>, ParseError> {
        let span = span_from(&pair);
        self.sequence(pair, span)
    }

    fn sequence(&self, pair: Pair<'_>, span: Span) -> Result<Spanned<Expr>, ParseError> {
        let mut trailing_comma = false;
        let mut items = Vec::new();
        for child in children(pair) {
            if child.as_rule() == Rule::trailing_comma {
                trailing_comma = true;
            } else {
                items.push(self.expr(child)?);
            }
        }
        if items.len() == 1 && !trailing_comma {
            if let Some(item) = items.pop() {
                return Ok(item);
            }
        }
        Ok(Spanned::new(Expr::Tuple(items), span))
    }

    fn expr(&self, pair: Pair<'_>) -> Result<Spanned<Expr>, ParseError> {
        let span = span_from(&pair);
        match pair.as_rule() {
            Rule::or_test => self.bool_op(pair, BoolOp::Or),
            Rule::and_test => self.bool_op(pair, BoolOp::And),
            Rule::not_test => {
                let negated = pair
                    .clone()
                    .into_inner()
                    .next()
                    .is_some_and(|p| p.as_rule() == Rule::kw_not);
                let mut inner = children(pair);
                let operand = self.next_child(&mut inner, span, "expression")?;
                let operand = self.expr(operand)?;
                if negated {
                    Ok(Spanned::new(
                        Expr::UnaryOp {
                            op: UnaryOp::Not,
                            operand: Box::new(operand),
                        },
                        span,
                    ))
                } else {
                    Ok(operand)
                }
            }
            Rule::comparison => {
                let mut inner = children(pair);
                let first = self.next_child(&mut inner, span, "expression")?;
                let left = self.expr(first)?;
                let mut ops = Vec::new();
                while let Some(op_pair) = inner.next() {
                    let op = cmp_op(op_pair.as_str())
                        .ok_or_else(|| self.error(span_from(&op_pair), "unknown comparison operator"))?;
                    let rhs = self.next_child(&mut inner, span, "right operand")?;
                    ops.push((op, self.expr(rhs)?));
                }
                if ops.is_empty() {
                    Ok(left)
                } else {
                    Ok(Spanned::new(
                        Expr::Compare {
                            left: Box::new(left),
                            ops,
                        },
                        span,
                    ))
                }
            }
            Rule::shift_expr | Rule::arith_expr | Rule::term => self.binary_chain(pair),
            Rule::factor => {
                let mut inner = children(pair);
                let first = self.next_child(&mut inner, span, "expression")?;
                if first.as_rule() != Rule::unary_op {
                    return self.expr(first);
                }
                let op = match first.as_str() {
                    "-" => UnaryOp::Neg,
                    _ => UnaryOp::Pos,
                };
                let operand_pair = self.next_child(&mut inner, span, "operand")?;
                let digits = operand_pair.as_str().trim();
                if op == UnaryOp::Neg && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                    return self
                        .integer(digits, span)
                        .map(|n| Spanned::new(Expr::Int(-n), span));
                }
                let operand = self.expr(operand_pair)?;
                Ok(Spanned::new(
                    Expr::UnaryOp {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            Rule::power => {
                let mut inner = children(pair);
                let base = self.next_child(&mut inner, span, "expression")?;
                let base = self.expr(base)?;
                match inner.next() {
                    Some(exponent) => Ok(Spanned::new(
                        Expr::BinOp {
                            op: BinOp::Pow,
                            left: Box::new(base),
                            right: Box::new(self.expr(exponent)?),
                        },
                        span,
                    )),
                    None => Ok(base),
                }
            }
            Rule::call => {
                let mut inner = children(pair);
                let name = self.next_child(&mut inner, span, "function name")?;
                let args = inner.map(|a| self.expr(a)).collect::<Result<Vec<_>, _>>()?;
                Ok(Spanned::new(
                    Expr::Call {
                        func: name.as_str().to_string(),
                        args,
                    },
                    span,
                ))
            }
            Rule::paren_expr => {
                if pair.clone().into_inner().next().is_none() {
                    return Ok(Spanned::new(Expr::Tuple(Vec::new()), span));
                }
                self.sequence(pair, span)
            }
            Rule::list_expr => {
                let items = children(pair)
                    .map(|item| self.expr(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Spanned::new(Expr::List(items), span))
            }
            Rule::integer => self
                .integer(pair.as_str(), span)
                .map(|n| Spanned::new(Expr::Int(n), span)),
            Rule::kw_true => Ok(Spanned::new(Expr::Bool(true), span)),
            Rule::kw_false => Ok(Spanned::new(Expr::Bool(false), span)),
            Rule::identifier => Ok(Spanned::new(Expr::Name(pair.as_str().to_string()), span)),
            other => Err(self.error(span, format!("unexpected {}", rule_name(&other)))),
        }
    }

    fn bool_op(&self, pair: Pair<'_>, op: BoolOp) -> Result<Spanned<Expr>, ParseError> {
        let span = span_from(&pair);
        let mut values = children(pair)
            .map(|p| self.expr(p))
            .collect::<Result<Vec<_>, _>>()?;
        match values.len() {
            0 => Err(self.error(span, "expected expression")),
            1 => Ok(values.remove(0)),
            _ => Ok(Spanned::new(Expr::BoolOp { op, values }, span)),
        }
    }

    /// Left-associative chain `e0 op1 e1 op2 e2 ...`.
    fn binary_chain(&self, pair: Pair<'_>) -> Result<Spanned<Expr>, ParseError> {
        let span = span_from(&pair);
        let mut inner = children(pair);
        let first = self.next_child(&mut inner, span, "expression")?;
        let mut acc = self.expr(first)?;
        while let Some(op_pair) = inner.next() {
            let op = bin_op(op_pair.as_str())
                .ok_or_else(|| self.error(span_from(&op_pair), "unknown operator"))?;
            let rhs = self.next_child(&mut inner, span, "right operand")?;
            let rhs = self.expr(rhs)?;
            let merged = acc.span.merge(rhs.span);
            acc = Spanned::new(
                Expr::BinOp {
                    op,
                    left: Box::new(acc),
                    right: Box::new(rhs),
                },
                merged,
            );
        }
        Ok(acc)
    }
}

fn bin_op(text: &str) -> Option<BinOp> {
    Some(match text {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "//" => BinOp::FloorDiv,
        "%" => BinOp::Mod,
        "<<" => BinOp::LShift,
        ">>" => BinOp::RShift,
        _ => return None,
    })
}

fn cmp_op(text: &str) -> Option<CmpOp> {
    Some(match text {
        "==" => CmpOp::Eq,
        "!=" => CmpOp::NotEq,
        "<" => CmpOp::Lt,
        "<=" => CmpOp::LtE,
        ">" => CmpOp::Gt,
        ">=" => CmpOp::GtE,
        _ => return None,
    })
}

/// True when every path through `block` ends in a `return`.
fn always_returns(block: &[Spanned<Stmt>]) -> bool {
    block.iter().any(|stmt| stmt_always_returns(&stmt.node))
}

fn stmt_always_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::If { body, orelse, .. } => {
            !orelse.is_empty() && always_returns(body) && always_returns(orelse)
        }
        Stmt::Assign { .. } | Stmt::Assert { .. } => false,
    }
}

fn collect_parser_diagnostics(program: &Program) -> Vec<ParseDiagnostic> {
    fn unreachable_in(block: &[Spanned<Stmt>], out: &mut Vec<ParseDiagnostic>) {
        if let Some(pos) = block.iter().position(|s| stmt_always_returns(&s.node)) {
            if let Some(dead) = block.get(pos + 1) {
                out.push(ParseDiagnostic {
                    code: "unreachable_code".into(),
                    severity: ParseDiagnosticSeverity::Warning,
                    message: "statement can never execute: every path before it returns".into(),
                    suggestion: Some("remove the statement or restructure the branches".into()),
                    span: Some(dead.span),
                });
            }
        }
        for stmt in block {
            if let Stmt::If { body, orelse, .. } = &stmt.node {
                unreachable_in(body, out);
                unreachable_in(orelse, out);
            }
        }
    }

    let mut diagnostics = Vec::new();
    for function in &program.functions {
        unreachable_in(&function.node.body, &mut diagnostics);
        if !always_returns(&function.node.body) {
            diagnostics.push(ParseDiagnostic {
                code: "missing_return".into(),
                severity: ParseDiagnosticSeverity::Warning,
                message: format!(
                    "function '{}' can finish without returning; such paths produce no result",
                    function.node.name
                ),
                suggestion: Some("add a final `return`".into()),
                span: Some(function.span),
            });
        }
    }
    diagnostics
}
