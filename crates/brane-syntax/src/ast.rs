//! Parse tree for BraneScript.
//!
//! Every node carries the `Span` of the source text it was parsed from;
//! the compiler threads those spans into diagnostics.

use brane_common::Span;

/// An identifier with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A string literal with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub span: Span,
}

/// A whole compilation unit.
#[derive(Debug, Clone)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Item {
    Struct(StructDef),
    Function(Function),
    Link(LinkDecl),
}

/// `packed? struct ID { declaration* }`
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: Ident,
    pub packed: bool,
    pub members: Vec<Declaration>,
    pub span: Span,
}

/// `const? ref? type ID`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub is_const: bool,
    pub is_ref: bool,
    pub ty: Ident,
    pub name: Ident,
    pub span: Span,
}

/// `type ID ( declaration,* ) { statement* }`
#[derive(Debug, Clone)]
pub struct Function {
    pub return_type: Ident,
    pub name: Ident,
    pub arguments: Vec<Declaration>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `link "name" (as "alias")? ;`
#[derive(Debug, Clone)]
pub struct LinkDecl {
    pub library: StringLit,
    pub alias: Option<StringLit>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `{ statement* }`
    Scope(Vec<Stmt>),
    /// Bare declaration statement.
    Decl(Declaration),
    If {
        cond: Expr,
        body: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    ReturnVoid,
    Return(Expr),
    /// Expression in statement position.
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    ConstBool(bool),
    ConstInt(i32),
    ConstFloat(f32),
    ConstChar(char),
    ConstString(String),
    /// Value reference by name.
    Id(String),
    /// Declaration in expression position (assignment destination).
    Decl(Box<Declaration>),
    /// `base.member` where `base` names a local.
    Member { base: Ident, member: Ident },
    Assign {
        dest: Box<Expr>,
        value: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `expr as type`
    Cast {
        value: Box<Expr>,
        ty: Ident,
    },
    /// `name(args)` or `lib.name(args)`.
    Call {
        namespace: Option<Ident>,
        name: Ident,
        args: Vec<Expr>,
    },
    New {
        ty: Ident,
    },
    Delete {
        ptr: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}
