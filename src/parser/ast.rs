use serde_json::Value;

/// A member reference with optional call arguments: the head of a path or
/// any segment after a dot.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    /// Ruby-style keyword arguments, `name: value`
    pub kwargs: Vec<(String, Expr)>,
}

impl Call {
    pub fn bare(name: impl Into<String>) -> Call {
        Call { name: name.into(), args: vec![], kwargs: vec![] }
    }

    pub fn is_bare(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }
}

/// Comparison and logic operators usable in embedded expressions.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BinOp {
    /// ==
    Eq,
    /// !=
    NotEq,
    /// >
    Gt,
    /// >=
    Gte,
    /// <
    Lt,
    /// <=
    Lte,
    /// and, &&
    And,
    /// or, ||
    Or,
}

/// An embedded-code expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal: string, symbol, number, bool or nil
    Lit(Value),
    /// A head reference resolved through the scope, possibly with call
    /// arguments (`render :widget, title: title`)
    Var(Call),
    /// Member access, `base.member` or `base.member(args)`
    Attr { base: Box<Expr>, member: Call },
    /// Indexing, `base[index]`
    Index { base: Box<Expr>, index: Box<Expr> },
    /// Negation, `!expr`
    Not(Box<Expr>),
    /// A comparison or logic expression
    Binary { lhs: Box<Expr>, op: BinOp, rhs: Box<Expr> },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Var(Call::bare(name))
    }
}

/// A block-opening control construct.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockHead {
    /// `container.each do |var|`
    Each { target: Expr, var: String },
    /// `if condition`
    If(Expr),
}

/// One node of the template tree.
///
/// The parser produces only `Text`, `Stmt` and `Output`; the block filter
/// replaces those with classified nodes, and the escape filter turns
/// `Interp` into `Write`. The generator rejects anything a stage left
/// behind, so a misconfigured pipeline fails at compile time instead of
/// emitting unescaped output.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A literal text run
    Text(String),
    /// `<% code %>`, not yet classified
    Stmt { code: String, line: usize },
    /// `<%= code %>` (or `<%== code %>` when `raw`), not yet classified
    Output { code: String, raw: bool, line: usize },

    /// Opens a block construct
    Open(BlockHead),
    /// `elsif condition`
    Elsif(Expr),
    /// `else`
    Else,
    /// `end`
    End,
    /// A statement expression, evaluated for effect only
    Eval(Expr),
    /// An interpolated expression awaiting its escaping decision; when
    /// `block_open` the following nodes up to `end` form the callee's block
    Interp { expr: Expr, raw: bool, block_open: bool },

    /// An interpolated expression with its escaping decision made
    Write { expr: Expr, escape: bool, block_open: bool },
}

impl Node {
    /// Control nodes occupy no output of their own; the trim filter may
    /// collapse the line they sit on.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Node::Open(_) | Node::Elsif(_) | Node::Else | Node::End | Node::Eval(_)
        )
    }
}
