use std::fmt;

use num_bigint::BigInt;

/// Source span for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// 1-based line number of the span start within `source`.
    pub fn line_in(&self, source: &str) -> usize {
        let end = self.start.min(source.len());
        source.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
    }
}

/// A spanned AST node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Top-level program: function definitions in source order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Program {
    pub functions: Vec<Spanned<FunctionDef>>,
}

impl Program {
    /// Look up a function by name. Names are unique, so at most one matches.
    pub fn find_function(&self, name: &str) -> Option<&Spanned<FunctionDef>> {
        self.functions.iter().find(|f| f.node.name == name)
    }

    /// Number of `assert` statements in the whole program.
    pub fn assert_count(&self) -> usize {
        fn count(block: &[Spanned<Stmt>]) -> usize {
            block
                .iter()
                .map(|stmt| match &stmt.node {
                    Stmt::Assert { .. } => 1,
                    Stmt::If { body, orelse, .. } => count(body) + count(orelse),
                    Stmt::Assign { .. } | Stmt::Return(_) => 0,
                })
                .sum()
        }
        self.functions.iter().map(|f| count(&f.node.body)).sum()
    }
}

/// `def name(params): body`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

pub type Block = Vec<Spanned<Stmt>>;

/// Identity of one `assert` statement, assigned by the parser in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct AssertId(pub u32);

impl fmt::Display for AssertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "assert#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Stmt {
    /// `t1 = t2 = ... = value`. The parser keeps every target; the engine
    /// accepts exactly one.
    Assign {
        targets: Vec<Spanned<AssignTarget>>,
        value: Spanned<Expr>,
    },
    /// `if test: body else: orelse`. `elif` chains nest in `orelse`.
    If {
        test: Spanned<Expr>,
        body: Block,
        orelse: Block,
    },
    Return(Option<Spanned<Expr>>),
    Assert {
        id: AssertId,
        test: Spanned<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum AssignTarget {
    Name(String),
    Tuple(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Expr {
    Int(BigInt),
    Bool(bool),
    Name(String),
    Tuple(Vec<Spanned<Expr>>),
    List(Vec<Spanned<Expr>>),
    BinOp {
        op: BinOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    /// `left op1 e1 op2 e2 ...`; more than one operator is a chained comparison.
    Compare {
        left: Box<Spanned<Expr>>,
        ops: Vec<(CmpOp, Spanned<Expr>)>,
    },
    BoolOp {
        op: BoolOp,
        values: Vec<Spanned<Expr>>,
    },
    Call {
        func: String,
        args: Vec<Spanned<Expr>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum BoolOp {
    And,
    Or,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::LShift => "<<",
            BinOp::RShift => ">>",
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Not => "not ",
        })
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Eq => "==",
            CmpOp::NotEq => "!=",
            CmpOp::Lt => "<",
            CmpOp::LtE => "<=",
            CmpOp::Gt => ">",
            CmpOp::GtE => ">=",
        })
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        })
    }
}

/// Renders fully parenthesized source text that parses back to the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Bool(true) => f.write_str("True"),
            Expr::Bool(false) => f.write_str("False"),
            Expr::Name(name) => f.write_str(name),
            Expr::Tuple(items) => {
                f.write_str("(")?;
                write_comma_separated(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Expr::List(items) => {
                f.write_str("[")?;
                write_comma_separated(f, items)?;
                f.write_str("]")
            }
            Expr::BinOp { op, left, right } => {
                write!(f, "({} {op} {})", left.node, right.node)
            }
            Expr::UnaryOp { op, operand } => write!(f, "({op}{})", operand.node),
            Expr::Compare { left, ops } => {
                write!(f, "({}", left.node)?;
                for (op, rhs) in ops {
                    write!(f, " {op} {}", rhs.node)?;
                }
                f.write_str(")")
            }
            Expr::BoolOp { op, values } => {
                f.write_str("(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {op} ")?;
                    }
                    write!(f, "{}", value.node)?;
                }
                f.write_str(")")
            }
            Expr::Call { func, args } => {
                write!(f, "{func}(")?;
                write_comma_separated(f, args)?;
                f.write_str(")")
            }
        }
    }
}

fn write_comma_separated(f: &mut fmt::Formatter<'_>, items: &[Spanned<Expr>]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item.node)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp<T>(node: T) -> Spanned<T> {
        Spanned::new(node, Span::default())
    }

    #[test]
    fn span_merge_covers_both() {
        assert_eq!(Span::new(4, 6).merge(Span::new(1, 3)), Span::new(1, 6));
    }

    #[test]
    fn span_line_numbers_are_one_based() {
        let src = "def f():\n  return 1\n";
        assert_eq!(Span::new(0, 3).line_in(src), 1);
        assert_eq!(Span::new(11, 17).line_in(src), 2);
    }

    #[test]
    fn display_negative_literal_and_tuple() {
        let e = Expr::Tuple(vec![sp(Expr::Int((-3).into())), sp(Expr::Bool(true))]);
        assert_eq!(e.to_string(), "(-3, True)");
        let single = Expr::Tuple(vec![sp(Expr::Name("x".into()))]);
        assert_eq!(single.to_string(), "(x,)");
    }

    #[test]
    fn display_nested_operators() {
        let e = Expr::BoolOp {
            op: BoolOp::And,
            values: vec![
                sp(Expr::Compare {
                    left: Box::new(sp(Expr::Name("a".into()))),
                    ops: vec![(CmpOp::LtE, sp(Expr::Int(2.into())))],
                }),
                sp(Expr::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(sp(Expr::Call {
                        func: "f".into(),
                        args: vec![sp(Expr::Name("a".into()))],
                    })),
                }),
            ],
        };
        assert_eq!(e.to_string(), "((a <= 2) and (not f(a)))");
    }

    #[test]
    fn assert_ids_order_and_display() {
        assert!(AssertId(0) < AssertId(3));
        assert_eq!(AssertId(2).to_string(), "assert#2");
    }
}
