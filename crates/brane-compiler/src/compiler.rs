//! Compilation driver.
//!
//! Walks the parse tree, building one AOT node per top-level statement,
//! then runs `optimize` and `emit` on it. Errors accumulate: a statement
//! that fails to build yields no node and is skipped, so a single run
//! reports as many diagnostics as it can find.

use crate::context::CompilerCtx;
use crate::error::{CompileError, ErrorKind};
use crate::linker::Linker;
use crate::node::{AotNode, ArithOp};
use crate::types::{native_type, unify_numeric, StructDef, TypeDef};
use crate::value::CompareType;
use brane_common::Span;
use brane_ir::{Constant, IRScript, IRStructDef, IRStructMember, ScriptFunction, ValueType};
use brane_syntax::ast;
use brane_syntax::{ParseError, ParseErrorKind};
use std::collections::HashMap;
use std::rc::Rc;

/// Parse and compile a source string in one step.
pub fn compile_source(
    source: &str,
    linker: Option<&dyn Linker>,
) -> Result<IRScript, Vec<CompileError>> {
    let (program, parse_errors) = brane_syntax::parse(source);
    let mut compiler = Compiler::new(linker);
    compiler
        .errors
        .extend(parse_errors.into_iter().map(convert_parse_error));
    compiler.compile(&program)
}

fn convert_parse_error(error: ParseError) -> CompileError {
    let kind = match error.kind {
        ParseErrorKind::UnknownToken(c) => ErrorKind::UnknownToken(format!("`{}`", c)),
        ParseErrorKind::Syntax(msg) => ErrorKind::SyntaxError(msg),
    };
    CompileError::new(kind, error.span)
}

/// A local binding: slot id, type, and qualifiers.
struct LocalValue {
    id: u16,
    ty: TypeDef,
    is_const: bool,
    is_ref: bool,
}

#[derive(Default)]
struct Scope {
    locals: HashMap<String, LocalValue>,
}

pub struct Compiler<'a> {
    linker: Option<&'a dyn Linker>,
    errors: Vec<CompileError>,
    scopes: Vec<Scope>,
    lvalue_count: u16,
    private_types: HashMap<String, TypeDef>,
    ctx: CompilerCtx,
}

impl<'a> Compiler<'a> {
    pub fn new(linker: Option<&'a dyn Linker>) -> Self {
        Self {
            linker,
            errors: Vec::new(),
            scopes: Vec::new(),
            lvalue_count: 0,
            private_types: HashMap::new(),
            ctx: CompilerCtx::new(),
        }
    }

    /// Compile a parse tree. Returns the script only if no error was
    /// recorded along the way.
    pub fn compile(mut self, program: &ast::Program) -> Result<IRScript, Vec<CompileError>> {
        for item in &program.items {
            match item {
                ast::Item::Struct(def) => self.visit_struct_def(def),
                ast::Item::Link(link) => self.visit_link(link),
                ast::Item::Function(function) => self.visit_function(function),
            }
        }
        if self.errors.is_empty() {
            Ok(self.ctx.script)
        } else {
            Err(self.errors)
        }
    }

    fn error(&mut self, kind: ErrorKind, span: Span) {
        self.errors.push(CompileError::new(kind, span));
    }

    // === Type & symbol resolution ===

    /// Locally declared structs first, then native types, then the linker.
    fn get_type(&self, name: &str) -> Option<TypeDef> {
        if let Some(ty) = self.private_types.get(name) {
            return Some(ty.clone());
        }
        if let Some(ty) = native_type(name) {
            return Some(ty);
        }
        self.linker.and_then(|l| l.get_type(name))
    }

    fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declaration is rejected when the name exists at any scope level.
    fn local_value_exists(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.locals.contains_key(name))
    }

    /// Innermost binding wins.
    fn lookup_local(&self, name: &str) -> Option<&LocalValue> {
        self.scopes.iter().rev().find_map(|s| s.locals.get(name))
    }

    fn register_local(&mut self, name: &str, ty: TypeDef, is_const: bool, is_ref: bool) -> u16 {
        let id = self.lvalue_count;
        self.lvalue_count += 1;
        self.scopes
            .last_mut()
            .expect("no scope pushed")
            .locals
            .insert(
                name.to_string(),
                LocalValue {
                    id,
                    ty,
                    is_const,
                    is_ref,
                },
            );
        id
    }

    /// A fresh `ValueRef` bound to the innermost binding of `name`.
    fn value_node(&mut self, name: &str, span: Span) -> Option<AotNode> {
        match self.lookup_local(name) {
            Some(local) => Some(AotNode::ValueRef {
                id: local.id,
                ty: local.ty.clone(),
                is_const: local.is_const,
                is_ref: local.is_ref,
            }),
            None => {
                self.error(ErrorKind::UndefinedIdentifier(name.to_string()), span);
                None
            }
        }
    }

    // === Items ===

    fn visit_struct_def(&mut self, def: &ast::StructDef) {
        if self.get_type(&def.name.name).is_some() {
            self.error(ErrorKind::NameInUse(def.name.name.clone()), def.name.span);
            return;
        }

        let mut layout = StructDef::new(&def.name.name);
        for member in &def.members {
            let Some(ty) = self.get_type(&member.ty.name) else {
                self.error(
                    ErrorKind::UndefinedType(member.ty.name.clone()),
                    member.ty.span,
                );
                continue;
            };
            if !layout.add_member(&member.name.name, ty) {
                self.error(
                    ErrorKind::NameInUse(member.name.name.clone()),
                    member.name.span,
                );
            }
        }
        if def.packed {
            layout.pack_members();
        } else {
            layout.pad_members();
        }

        let layout = Rc::new(layout);
        self.private_types
            .insert(def.name.name.clone(), TypeDef::Struct(layout.clone()));

        // The runtime needs its own copy of the committed layout.
        self.ctx.script.local_structs.push(IRStructDef {
            name: def.name.name.clone(),
            packed: def.packed,
            members: layout
                .members()
                .iter()
                .map(|m| IRStructMember {
                    name: m.name.clone(),
                    offset: m.offset,
                    type_name: m.ty.name().to_string(),
                })
                .collect(),
        });
    }

    fn visit_link(&mut self, link: &ast::LinkDecl) {
        let Some(linker) = self.linker else {
            self.error(ErrorKind::LinkerUnset, link.span);
            return;
        };
        if linker.get_library(&link.library.value).is_none() {
            self.error(
                ErrorKind::UnknownLibrary(link.library.value.clone()),
                link.library.span,
            );
            return;
        }
        self.ctx
            .script
            .linked_libraries
            .push(link.library.value.clone());
        let alias = link
            .alias
            .as_ref()
            .map(|a| a.value.clone())
            .unwrap_or_else(|| link.library.value.clone());
        let index = self.ctx.library_aliases.len() as u32;
        self.ctx.library_aliases.insert(alias, index);
    }

    fn visit_function(&mut self, function: &ast::Function) {
        let ret_name = function.return_type.name.clone();
        if ret_name != "void" && self.get_type(&ret_name).is_none() {
            self.error(
                ErrorKind::UndefinedType(ret_name),
                function.return_type.span,
            );
            return;
        }

        let mut arg_types = Vec::with_capacity(function.arguments.len());
        for arg in &function.arguments {
            let Some(ty) = self.get_type(&arg.ty.name) else {
                self.error(ErrorKind::UndefinedType(arg.ty.name.clone()), arg.ty.span);
                return;
            };
            if arg.is_ref && ty.value_type() != ValueType::ObjectRef {
                self.error(
                    ErrorKind::InvalidRefQualifier(arg.ty.name.clone()),
                    arg.span,
                );
                return;
            }
            arg_types.push(ty);
        }

        let mut func = ScriptFunction::new(mangle(
            &function.name.name,
            arg_types.iter().map(|t| t.name()),
        ));
        func.return_type = ret_name.clone();
        func.arguments = arg_types.iter().map(|t| t.name().to_string()).collect();
        self.ctx.begin_function(func);

        self.push_scope();
        for (arg, ty) in function.arguments.iter().zip(&arg_types) {
            if self.local_value_exists(&arg.name.name) {
                self.error(ErrorKind::NameInUse(arg.name.name.clone()), arg.name.span);
                continue;
            }
            let id = self.register_local(&arg.name.name, ty.clone(), arg.is_const, arg.is_ref);
            let value = self.ctx.new_reg(ty, 0);
            self.ctx.bind_local(id, value);
        }

        let previous_return = self.ctx.return_called;
        self.ctx.return_called = false;
        for stmt in &function.body {
            let Some(node) = self.visit_statement(stmt) else {
                continue;
            };
            let node = node.optimize();
            node.emit(&mut self.ctx);
        }
        if !self.ctx.return_called && ret_name != "void" {
            self.error(
                ErrorKind::MissingReturn(function.name.name.clone()),
                function.span,
            );
        }
        self.ctx.return_called = previous_return;
        self.pop_scope();
    }

    // === Statements ===

    fn visit_statement(&mut self, stmt: &ast::Stmt) -> Option<AotNode> {
        match &stmt.kind {
            ast::StmtKind::Scope(stmts) => {
                self.push_scope();
                let mut body = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    match self.visit_statement(stmt) {
                        Some(node) => body.push(node),
                        None => {
                            self.pop_scope();
                            return None;
                        }
                    }
                }
                self.pop_scope();
                Some(AotNode::Scope { body })
            }
            ast::StmtKind::Decl(decl) => self.visit_declaration(decl),
            ast::StmtKind::If { cond, body } => {
                let cond = self.visit_condition(cond)?;
                let body = self.visit_statement(body)?;
                Some(AotNode::If {
                    cond: Box::new(cond),
                    body: Box::new(body),
                })
            }
            ast::StmtKind::While { cond, body } => {
                let cond = self.visit_condition(cond)?;
                let body = self.visit_statement(body)?;
                Some(AotNode::While {
                    cond: Box::new(cond),
                    body: Box::new(body),
                })
            }
            ast::StmtKind::ReturnVoid => {
                let ret = self.ctx.function().return_type.clone();
                if ret != "void" {
                    self.error(
                        ErrorKind::TypeMismatch {
                            expected: ret,
                            found: "void".to_string(),
                        },
                        stmt.span,
                    );
                    return None;
                }
                self.ctx.return_called = true;
                Some(AotNode::ReturnVoid)
            }
            ast::StmtKind::Return(expr) => self.visit_return(expr),
            ast::StmtKind::Expr(expr) => self.visit_expr(expr),
        }
    }

    fn visit_condition(&mut self, expr: &ast::Expr) -> Option<AotNode> {
        let node = self.visit_expr(expr)?;
        if node.result_type().value_type() != ValueType::Bool {
            self.error(
                ErrorKind::TypeMismatch {
                    expected: "bool".to_string(),
                    found: node.result_type().name().to_string(),
                },
                expr.span,
            );
            return None;
        }
        Some(node)
    }

    fn visit_return(&mut self, expr: &ast::Expr) -> Option<AotNode> {
        let node = self.visit_expr(expr)?;
        let found = node.result_type();
        let expected = self.ctx.function().return_type.clone();
        if found.is_void() || expected == "void" {
            self.error(
                ErrorKind::TypeMismatch {
                    expected,
                    found: found.name().to_string(),
                },
                expr.span,
            );
            return None;
        }

        let node = if found.name() != expected {
            let target = self.get_type(&expected)?;
            if unify_numeric(found.value_type(), target.value_type()).is_none() {
                self.error(
                    ErrorKind::TypeMismatch {
                        expected,
                        found: found.name().to_string(),
                    },
                    expr.span,
                );
                return None;
            }
            AotNode::Cast {
                value: Box::new(node),
                ty: target,
            }
        } else {
            node
        };
        self.ctx.return_called = true;
        Some(AotNode::ReturnValue {
            value: Box::new(node),
        })
    }

    fn visit_declaration(&mut self, decl: &ast::Declaration) -> Option<AotNode> {
        let Some(ty) = self.get_type(&decl.ty.name) else {
            self.error(ErrorKind::UndefinedType(decl.ty.name.clone()), decl.ty.span);
            return None;
        };
        if self.local_value_exists(&decl.name.name) {
            self.error(ErrorKind::NameInUse(decl.name.name.clone()), decl.name.span);
            return None;
        }
        if decl.is_ref && ty.value_type() != ValueType::ObjectRef {
            self.error(ErrorKind::InvalidRefQualifier(decl.ty.name.clone()), decl.span);
            return None;
        }
        let id = self.register_local(&decl.name.name, ty.clone(), decl.is_const, decl.is_ref);
        Some(AotNode::ValueRef {
            id,
            ty,
            is_const: decl.is_const,
            is_ref: decl.is_ref,
        })
    }

    // === Expressions ===

    fn visit_expr(&mut self, expr: &ast::Expr) -> Option<AotNode> {
        match &expr.kind {
            ast::ExprKind::ConstBool(v) => Some(AotNode::Const {
                value: Constant::Bool(*v),
                ty: native_type("bool")?,
            }),
            ast::ExprKind::ConstInt(v) => Some(AotNode::Const {
                value: Constant::I32(*v),
                ty: native_type("int")?,
            }),
            ast::ExprKind::ConstFloat(v) => Some(AotNode::Const {
                value: Constant::F32(*v),
                ty: native_type("float")?,
            }),
            ast::ExprKind::ConstChar(v) => Some(AotNode::Const {
                value: Constant::Char(*v as u8),
                ty: native_type("char")?,
            }),
            ast::ExprKind::ConstString(_) => {
                self.error(
                    ErrorKind::UnsupportedConstruct("string literals in expressions".to_string()),
                    expr.span,
                );
                None
            }
            ast::ExprKind::Id(name) => self.value_node(name, expr.span),
            ast::ExprKind::Decl(decl) => self.visit_declaration(decl),
            ast::ExprKind::Member { base, member } => self.visit_member(base, member),
            ast::ExprKind::Assign { dest, value } => self.visit_assignment(dest, value),
            ast::ExprKind::Binary { op, left, right } => {
                self.visit_binary(*op, left, right, expr.span)
            }
            ast::ExprKind::Compare { op, left, right } => {
                self.visit_comparison(*op, left, right, expr.span)
            }
            ast::ExprKind::Cast { value, ty } => self.visit_cast(value, ty),
            ast::ExprKind::Call {
                namespace,
                name,
                args,
            } => self.visit_call(namespace.as_ref(), name, args, expr.span),
            ast::ExprKind::New { ty } => self.visit_new(ty),
            ast::ExprKind::Delete { ptr } => self.visit_delete(ptr),
        }
    }

    fn visit_member(&mut self, base: &ast::Ident, member: &ast::Ident) -> Option<AotNode> {
        let base_node = self.value_node(&base.name, base.span)?;
        let base_ty = base_node.result_type();
        let Some(def) = base_ty.as_struct().cloned() else {
            self.error(
                ErrorKind::TypeMismatch {
                    expected: "struct".to_string(),
                    found: base_ty.name().to_string(),
                },
                base.span,
            );
            return None;
        };
        let Some(found) = def.member(&member.name) else {
            self.error(
                ErrorKind::UndefinedIdentifier(format!("{}.{}", base.name, member.name)),
                member.span,
            );
            return None;
        };
        Some(AotNode::Deref {
            base: Box::new(base_node),
            ty: found.ty.clone(),
            offset: found.offset,
        })
    }

    fn visit_assignment(&mut self, dest: &ast::Expr, value: &ast::Expr) -> Option<AotNode> {
        let value_node = self.visit_expr(value)?;
        let dest_node = self.visit_expr(dest)?;

        // Reassigning an existing const binding is rejected; the
        // initializing assignment at a declaration site is not.
        if let ast::ExprKind::Id(name) = &dest.kind {
            if self.lookup_local(name).map(|l| l.is_const).unwrap_or(false) {
                self.error(ErrorKind::AssignToConst(name.clone()), dest.span);
                return None;
            }
        }
        if !matches!(dest_node, AotNode::ValueRef { .. } | AotNode::Deref { .. }) {
            self.error(
                ErrorKind::SyntaxError("invalid assignment target".to_string()),
                dest.span,
            );
            return None;
        }

        let dest_ty = dest_node.result_type();
        let value_ty = value_node.result_type();
        if dest_ty.name() != value_ty.name()
            && unify_numeric(dest_ty.value_type(), value_ty.value_type()).is_none()
        {
            self.error(
                ErrorKind::TypeMismatch {
                    expected: dest_ty.name().to_string(),
                    found: value_ty.name().to_string(),
                },
                value.span,
            );
            return None;
        }

        Some(AotNode::Assign {
            dest: Box::new(dest_node),
            value: Box::new(value_node),
        })
    }

    fn visit_binary(
        &mut self,
        op: ast::BinaryOp,
        left: &ast::Expr,
        right: &ast::Expr,
        span: Span,
    ) -> Option<AotNode> {
        let left_node = self.visit_expr(left)?;
        let right_node = self.visit_expr(right)?;
        let lt = left_node.result_type();
        let rt = right_node.result_type();
        if unify_numeric(lt.value_type(), rt.value_type()).is_none() {
            self.error(
                ErrorKind::TypeMismatch {
                    expected: lt.name().to_string(),
                    found: rt.name().to_string(),
                },
                span,
            );
            return None;
        }
        let op = match op {
            ast::BinaryOp::Add => ArithOp::Add,
            ast::BinaryOp::Sub => ArithOp::Sub,
            ast::BinaryOp::Mul => ArithOp::Mul,
            ast::BinaryOp::Div => ArithOp::Div,
        };
        Some(AotNode::Arith {
            op,
            left: Box::new(left_node),
            right: Box::new(right_node),
        })
    }

    fn visit_comparison(
        &mut self,
        op: ast::CompareOp,
        left: &ast::Expr,
        right: &ast::Expr,
        span: Span,
    ) -> Option<AotNode> {
        let mut left_node = self.visit_expr(left)?;
        let mut right_node = self.visit_expr(right)?;

        // `<` and `<=` lower to the swapped-operand `>` / `>=` forms.
        let mode = match op {
            ast::CompareOp::Eq => CompareType::Equal,
            ast::CompareOp::NotEq => CompareType::NotEqual,
            ast::CompareOp::Gt => CompareType::Greater,
            ast::CompareOp::GtEq => CompareType::GreaterEqual,
            ast::CompareOp::Lt => {
                std::mem::swap(&mut left_node, &mut right_node);
                CompareType::Greater
            }
            ast::CompareOp::LtEq => {
                std::mem::swap(&mut left_node, &mut right_node);
                CompareType::GreaterEqual
            }
        };

        let lt = left_node.result_type().value_type();
        let rt = right_node.result_type().value_type();
        if lt != rt && unify_numeric(lt, rt).is_none() {
            self.error(
                ErrorKind::TypeMismatch {
                    expected: left_node.result_type().name().to_string(),
                    found: right_node.result_type().name().to_string(),
                },
                span,
            );
            return None;
        }

        Some(AotNode::Compare {
            mode,
            left: Box::new(left_node),
            right: Box::new(right_node),
        })
    }

    fn visit_cast(&mut self, value: &ast::Expr, ty: &ast::Ident) -> Option<AotNode> {
        let Some(target) = self.get_type(&ty.name) else {
            self.error(ErrorKind::UndefinedType(ty.name.clone()), ty.span);
            return None;
        };
        let node = self.visit_expr(value)?;
        let from = node.result_type();
        if from.name() != target.name()
            && unify_numeric(from.value_type(), target.value_type()).is_none()
        {
            self.error(
                ErrorKind::TypeMismatch {
                    expected: target.name().to_string(),
                    found: from.name().to_string(),
                },
                value.span,
            );
            return None;
        }
        Some(AotNode::Cast {
            value: Box::new(node),
            ty: target,
        })
    }

    fn visit_call(
        &mut self,
        namespace: Option<&ast::Ident>,
        name: &ast::Ident,
        args: &[ast::Expr],
        span: Span,
    ) -> Option<AotNode> {
        let mut nodes = Vec::with_capacity(args.len());
        let mut arg_names = Vec::with_capacity(args.len());
        for arg in args {
            let node = self.visit_expr(arg)?;
            let ty = node.result_type();
            if ty.is_void() {
                self.error(ErrorKind::VoidArgument, arg.span);
                return None;
            }
            arg_names.push(ty.name().to_string());
            nodes.push(node);
        }
        let mangled = mangle(&name.name, arg_names.iter().map(|s| s.as_str()));

        if let Some(space) = namespace {
            let Some(&library) = self.ctx.library_aliases.get(&space.name) else {
                self.error(ErrorKind::UnknownLibrary(space.name.clone()), space.span);
                return None;
            };
            let lib_name = self.ctx.script.linked_libraries[library as usize].clone();
            let linker = self.linker.expect("aliases only registered with a linker");
            let Some(lib) = linker.get_library(&lib_name) else {
                self.error(ErrorKind::UnknownLibrary(lib_name), space.span);
                return None;
            };
            let Some(ret_name) = lib.function_return_type(&mangled) else {
                self.error(ErrorKind::UnknownFunction(mangled), span);
                return None;
            };
            let ret = if ret_name == "void" {
                TypeDef::VOID
            } else {
                match self.get_type(&ret_name) {
                    Some(ty) => ty,
                    None => {
                        self.error(ErrorKind::UndefinedType(ret_name), span);
                        return None;
                    }
                }
            };
            return Some(AotNode::ExtCall {
                library,
                name: mangled,
                ret,
                args: nodes,
            });
        }

        let Some(index) = self.ctx.script.find_function(&mangled) else {
            self.error(ErrorKind::UnknownFunction(mangled), span);
            return None;
        };
        let ret_name = self.ctx.script.local_functions[index].return_type.clone();
        let ret = if ret_name == "void" {
            TypeDef::VOID
        } else {
            self.get_type(&ret_name)?
        };
        Some(AotNode::Call {
            function: index as u32,
            ret,
            args: nodes,
        })
    }

    fn visit_new(&mut self, ty: &ast::Ident) -> Option<AotNode> {
        let Some(target) = self.get_type(&ty.name) else {
            self.error(ErrorKind::UndefinedType(ty.name.clone()), ty.span);
            return None;
        };
        let Some(def) = target.as_struct().cloned() else {
            self.error(ErrorKind::NonObjectNew(ty.name.clone()), ty.span);
            return None;
        };
        Some(AotNode::New { def })
    }

    fn visit_delete(&mut self, ptr: &ast::Expr) -> Option<AotNode> {
        let node = self.visit_expr(ptr)?;
        if node.result_type().value_type() != ValueType::ObjectRef {
            self.error(
                ErrorKind::NonObjectDelete(node.result_type().name().to_string()),
                ptr.span,
            );
            return None;
        }
        Some(AotNode::Delete {
            ptr: Box::new(node),
        })
    }
}

/// `base(argType,argType,...)` — the primary key for function lookup.
pub fn mangle<'n>(base: &str, arg_types: impl Iterator<Item = &'n str>) -> String {
    let mut out = String::from(base);
    out.push('(');
    for (i, ty) in arg_types.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(ty);
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::Library;
    use brane_ir::{ByteReader, Opcode};

    #[test]
    fn mangling_is_deterministic() {
        let args = ["int", "float", "bool"];
        let a = mangle("f", args.iter().copied());
        let b = mangle("f", args.iter().copied());
        assert_eq!(a, "f(int,float,bool)");
        assert_eq!(a, b);
    }

    #[test]
    fn mangling_no_args() {
        assert_eq!(mangle("main", std::iter::empty()), "main()");
    }

    struct GetLibrary;

    impl Library for GetLibrary {
        fn function_return_type(&self, mangled: &str) -> Option<String> {
            (mangled == "get()").then(|| "int".to_string())
        }
    }

    struct OrderLinker {
        lib: GetLibrary,
    }

    impl Linker for OrderLinker {
        fn get_type(&self, _name: &str) -> Option<TypeDef> {
            None
        }

        fn get_library(&self, name: &str) -> Option<&dyn Library> {
            matches!(name, "math" | "io").then_some(&self.lib as &dyn Library)
        }
    }

    /// The library index embedded in a function's first `EXT_CALL`.
    fn ext_call_library(func: &ScriptFunction) -> u32 {
        let mut r = ByteReader::new(&func.code);
        let op = Opcode::from_u8(r.read_u8().unwrap()).unwrap();
        assert_eq!(op, Opcode::ExtCall, "expected EXT_CALL first");
        r.read_u8().unwrap();
        r.read_u32().unwrap()
    }

    #[test]
    fn library_aliases_keep_insertion_order() {
        let linker = OrderLinker { lib: GetLibrary };
        let source = r#"
            link "math" as "m";
            link "io" as "i";

            int a() { return m.get(); }
            int b() { return i.get(); }
        "#;
        let script = compile_source(source, Some(&linker)).unwrap();

        assert_eq!(
            script.linked_libraries,
            vec!["math".to_string(), "io".to_string()]
        );
        // Indices embedded in the opcodes follow declaration order.
        assert_eq!(ext_call_library(&script.local_functions[0]), 0);
        assert_eq!(ext_call_library(&script.local_functions[1]), 1);
    }
}
