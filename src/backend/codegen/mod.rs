//! C4: the backend IR walker. One AST traversal shared by both concrete
//! emitters, parameterised over a [`Target`] capability table — the seam
//! called out in §9's design note (`emit type/identifier/literal/swizzle/
//! call/binding`). `hlsl`/`glsl` provide the backend-specific half; this
//! module owns everything that doesn't differ between them.

pub mod glsl;
pub mod hlsl;

use crate::ast::node::{BinaryOp, Case, JumpKind, Node, UnaryOp};
use crate::ast::symbol::{FunctionSymbol, VariableSymbol};
use crate::ast::{Ast, NodeId, Symbol, SymbolId, Type};
use crate::lexer::Literal;

/// Whether a compiled function is the vertex or pixel stage entry point.
/// Only the vertex stage gets the clip-space depth-range fixup (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Pixel,
}

/// The capability seam between the shared walker and a backend-specific
/// string builder.
pub trait Target {
    fn type_name(&self, ty: &Type) -> String;

    /// Renders a call to a named intrinsic given its already-rendered
    /// argument expressions, applying the per-backend intrinsic renames
    /// of §4.3 (`lerp`→`mix`, `saturate`→`clamp(·,0,1)`, `tex2D`→
    /// `texture`, …).
    fn intrinsic_call(&self, name: &str, args: &[String]) -> String;

    /// Renders a vertex shader's `return expr;`, including whatever
    /// clip-space fixup this target needs (none for HLSL).
    fn vertex_return(&self, expr: &str) -> String;

    fn uniform_block(&self, buffer: u32, name: &str, fields: &[(String, Type)]) -> String;
}

pub struct Walker<'a, T: Target> {
    ast: &'a Ast,
    target: T,
}

impl<'a, T: Target> Walker<'a, T> {
    pub fn new(ast: &'a Ast, target: T) -> Self {
        Self { ast, target }
    }

    fn symbol_name(&self, id: SymbolId) -> String {
        self.ast.symbols.get(id).name().to_string()
    }

    pub fn emit_expr(&self, id: NodeId) -> String {
        match self.ast.node(id) {
            Node::Literal { value, .. } => format_literal(value),
            Node::LValue { symbol, .. } => self.symbol_name(*symbol),
            Node::Unary { op, operand, ty } => self.emit_unary(*op, *operand, ty),
            Node::Binary { op, lhs, rhs, .. } => format!(
                "({} {} {})",
                self.emit_expr(*lhs),
                binary_op_str(*op),
                self.emit_expr(*rhs)
            ),
            Node::Assignment { op, lhs, rhs, .. } => {
                let op_str = match op {
                    Some(op) => format!("{}=", binary_op_str(*op)),
                    None => "=".to_string(),
                };
                format!("{} {} {}", self.emit_expr(*lhs), op_str, self.emit_expr(*rhs))
            }
            Node::Conditional { condition, then_branch, else_branch, .. } => format!(
                "({} ? {} : {})",
                self.emit_expr(*condition),
                self.emit_expr(*then_branch),
                self.emit_expr(*else_branch)
            ),
            Node::Call { callee, args, .. } => {
                let rendered: Vec<String> = args.iter().map(|&a| self.emit_expr(a)).collect();
                format!("{}({})", self.symbol_name(*callee), rendered.join(", "))
            }
            Node::Intrinsic { name, args, .. } => {
                let rendered: Vec<String> = args.iter().map(|&a| self.emit_expr(a)).collect();
                self.target.intrinsic_call(name, &rendered)
            }
            Node::Constructor { ty, args } => {
                let rendered: Vec<String> = args.iter().map(|&a| self.emit_expr(a)).collect();
                format!("{}({})", self.target.type_name(ty), rendered.join(", "))
            }
            Node::FieldSelection { base, field, .. } => format!("{}.{field}", self.emit_expr(*base)),
            Node::Swizzle { base, mask, .. } => format!("{}.{}", self.emit_expr(*base), swizzle_mask_str(mask)),
            Node::Subscript { base, index, .. } => {
                format!("{}[{}]", self.emit_expr(*base), self.emit_expr(*index))
            }
            Node::Sequence { items } => {
                let rendered: Vec<String> = items.iter().map(|&i| self.emit_expr(i)).collect();
                format!("({})", rendered.join(", "))
            }
            Node::InitializerList { items, .. } => {
                let rendered: Vec<String> = items.iter().map(|&i| self.emit_expr(i)).collect();
                format!("{{ {} }}", rendered.join(", "))
            }
            other => unreachable!("{other:?} is not an expression node"),
        }
    }

    fn emit_unary(&self, op: UnaryOp, operand: NodeId, ty: &Type) -> String {
        let inner = self.emit_expr(operand);
        match op {
            UnaryOp::Negate => format!("(-{inner})"),
            UnaryOp::Not => format!("(!{inner})"),
            UnaryOp::BitNot => format!("(~{inner})"),
            UnaryOp::PreIncrement => format!("(++{inner})"),
            UnaryOp::PreDecrement => format!("(--{inner})"),
            UnaryOp::PostIncrement => format!("({inner}++)"),
            UnaryOp::PostDecrement => format!("({inner}--)"),
            UnaryOp::Cast => format!("(({}){inner})", self.target.type_name(ty)),
        }
    }

    fn emit_declaration(&self, symbol: SymbolId) -> String {
        let Symbol::Variable(VariableSymbol { name, ty, initializer, .. }) = self.ast.symbols.get(symbol) else {
            return String::new();
        };
        match initializer {
            Some(init) => format!("{} {name} = {}", self.target.type_name(ty), self.emit_expr(*init)),
            None => format!("{} {name}", self.target.type_name(ty)),
        }
    }

    pub fn emit_stmt(&self, id: NodeId, out: &mut String, indent: usize, is_vertex: bool) {
        let pad = indent_str(indent);
        match self.ast.node(id) {
            Node::Compound { statements } => {
                out.push_str(&pad);
                out.push_str("{\n");
                for &s in statements {
                    self.emit_stmt(s, out, indent + 1, is_vertex);
                }
                out.push_str(&pad);
                out.push_str("}\n");
            }
            Node::ExpressionStatement { expr } => {
                out.push_str(&pad);
                out.push_str(&self.emit_expr(*expr));
                out.push_str(";\n");
            }
            Node::DeclarationStatement { symbol } => {
                out.push_str(&pad);
                out.push_str(&self.emit_declaration(*symbol));
                out.push_str(";\n");
            }
            Node::DeclaratorList { declarations } => {
                for &d in declarations {
                    self.emit_stmt(d, out, indent, is_vertex);
                }
            }
            Node::If { condition, then_branch, else_branch } => {
                out.push_str(&pad);
                out.push_str(&format!("if ({})\n", self.emit_expr(*condition)));
                self.emit_stmt(*then_branch, out, indent, is_vertex);
                if let Some(e) = else_branch {
                    out.push_str(&pad);
                    out.push_str("else\n");
                    self.emit_stmt(*e, out, indent, is_vertex);
                }
            }
            Node::Switch { value, cases } => {
                out.push_str(&pad);
                out.push_str(&format!("switch ({}) {{\n", self.emit_expr(*value)));
                for case in cases {
                    self.emit_case(case, out, indent + 1, is_vertex);
                }
                out.push_str(&pad);
                out.push_str("}\n");
            }
            Node::While { condition, body, is_do_while } => {
                if *is_do_while {
                    out.push_str(&pad);
                    out.push_str("do\n");
                    self.emit_stmt(*body, out, indent, is_vertex);
                    out.push_str(&pad);
                    out.push_str(&format!("while ({});\n", self.emit_expr(*condition)));
                } else {
                    out.push_str(&pad);
                    out.push_str(&format!("while ({})\n", self.emit_expr(*condition)));
                    self.emit_stmt(*body, out, indent, is_vertex);
                }
            }
            Node::For { init, condition, increment, body } => {
                let init_s = init.map(|i| self.emit_expr(i)).unwrap_or_default();
                let cond_s = condition.map(|c| self.emit_expr(c)).unwrap_or_default();
                let inc_s = increment.map(|i| self.emit_expr(i)).unwrap_or_default();
                out.push_str(&pad);
                out.push_str(&format!("for ({init_s}; {cond_s}; {inc_s})\n"));
                self.emit_stmt(*body, out, indent, is_vertex);
            }
            Node::Jump { kind } => {
                out.push_str(&pad);
                out.push_str(match kind {
                    JumpKind::Break => "break;\n",
                    JumpKind::Continue => "continue;\n",
                });
            }
            Node::Return { value, discard } => {
                out.push_str(&pad);
                if *discard {
                    out.push_str("discard;\n");
                    return;
                }
                match value {
                    Some(v) => {
                        let expr = self.emit_expr(*v);
                        if is_vertex {
                            out.push_str(&self.target.vertex_return(&expr));
                        } else {
                            out.push_str(&format!("return {expr};\n"));
                        }
                    }
                    None => out.push_str("return;\n"),
                }
            }
            other => unreachable!("{other:?} is not a statement node"),
        }
    }

    fn emit_case(&self, case: &Case, out: &mut String, indent: usize, is_vertex: bool) {
        let pad = indent_str(indent);
        for label in &case.labels {
            out.push_str(&pad);
            match label {
                Some(v) => out.push_str(&format!("case {v}:\n")),
                None => out.push_str("default:\n"),
            }
        }
        for &stmt in &case.body {
            self.emit_stmt(stmt, out, indent + 1, is_vertex);
        }
    }

    /// Emits one function's signature and body as a standalone declaration.
    pub fn compile_function(&self, id: SymbolId, stage: Stage) -> String {
        let Symbol::Function(func) = self.ast.symbols.get(id) else {
            return String::new();
        };
        self.compile_function_inner(func, stage)
    }

    fn compile_function_inner(&self, func: &FunctionSymbol, stage: Stage) -> String {
        let params: Vec<String> = func
            .parameters
            .iter()
            .map(|p| format!("{} {}{}", self.target.type_name(&p.ty), p.name, semantic_suffix(&p.semantic)))
            .collect();
        let mut out = format!(
            "{} {}({}){}\n",
            self.target.type_name(&func.return_type),
            func.name,
            params.join(", "),
            semantic_suffix(&func.return_semantic),
        );
        if let Some(body) = func.body {
            self.emit_stmt(body, &mut out, 0, stage == Stage::Vertex);
        }
        out
    }

    /// Emits the global uniform block plus every function belonging to
    /// `entry_points`, in declaration order. `entry_points` names the
    /// vertex/pixel entry point symbols so the vertex one gets the
    /// clip-space fixup; any other function referenced transitively is
    /// expected to already be present in `entry_points` — this walker does
    /// not perform call-graph reachability pruning.
    pub fn compile_program(&self, entry_points: &[(SymbolId, Stage)]) -> String {
        let mut out = String::new();

        let layout = crate::backend::layout::layout_globals(&self.ast.symbols, &self.ast.uniforms);
        if !layout.is_empty() {
            let fields: Vec<(String, Type)> = layout
                .iter()
                .filter_map(|(id, _)| match self.ast.symbols.get(*id) {
                    Symbol::Variable(v) => Some((v.name.clone(), v.ty.clone())),
                    _ => None,
                })
                .collect();
            out.push_str(&self.target.uniform_block(0, "GlobalUniforms", &fields));
            out.push('\n');
        }

        for &(id, stage) in entry_points {
            out.push_str(&self.compile_function(id, stage));
            out.push('\n');
        }
        out
    }
}

fn indent_str(n: usize) -> String {
    "    ".repeat(n)
}

fn semantic_suffix(semantic: &Option<String>) -> String {
    match semantic {
        Some(s) => format!(" : {s}"),
        None => String::new(),
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::Less => "<",
        BinaryOp::Greater => ">",
        BinaryOp::LessEqual => "<=",
        BinaryOp::GreaterEqual => ">=",
        BinaryOp::Equal => "==",
        BinaryOp::NotEqual => "!=",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitXor => "^",
        BinaryOp::BitOr => "|",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

/// Renders a swizzle mask: vector component offsets (0..=3) as `xyzw`
/// letters, matrix offsets (`row*4+col`, so >3 is possible for row>0) as
/// HLSL-style `_m{row}{col}` groups.
fn swizzle_mask_str(mask: &[u8]) -> String {
    const LETTERS: [char; 4] = ['x', 'y', 'z', 'w'];
    if mask.iter().all(|&m| m < 4) {
        mask.iter().map(|&m| LETTERS[m as usize]).collect()
    } else {
        mask.iter().map(|&m| format!("_m{}{}", m / 4, m % 4)).collect::<Vec<_>>().join("")
    }
}

fn format_literal(value: &Literal) -> String {
    match value {
        Literal::Bool(b) => b.to_string(),
        Literal::Int(i) => i.to_string(),
        Literal::Uint(u) => format!("{u}u"),
        Literal::Float(f) => {
            let s = format!("{f}");
            if s.contains('.') || s.contains('e') {
                s
            } else {
                format!("{s}.0")
            }
        }
        Literal::Double(d) => format!("{d}lf"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::node::{BinaryOp, Node};
    use crate::ast::{BaseClass, Qualifiers};
    use hlsl::Hlsl;

    #[test]
    fn emits_parenthesised_binary_expression() {
        let mut ast = Ast::new();
        let ty = Type::scalar(BaseClass::Float);
        let lhs = ast.nodes.insert(Node::Literal { value: Literal::Float(1.0), ty: ty.clone() });
        let rhs = ast.nodes.insert(Node::Literal { value: Literal::Float(2.0), ty: ty.clone() });
        let add = ast.nodes.insert(Node::Binary { op: BinaryOp::Add, lhs, rhs, ty });

        let walker = Walker::new(&ast, Hlsl);
        assert_eq!(walker.emit_expr(add), "(1.0 + 2.0)");
    }

    #[test]
    fn swizzle_mask_renders_component_letters() {
        assert_eq!(swizzle_mask_str(&[0, 1]), "xy");
        assert_eq!(swizzle_mask_str(&[2, 2, 2]), "zzz");
    }

    #[test]
    fn qualifiers_do_not_affect_expression_emission() {
        // sanity: Qualifiers import stays exercised for downstream callers
        // of Type::with_qualifiers when building test fixtures.
        let ty = Type::scalar(BaseClass::Int).with_qualifiers(Qualifiers::CONST);
        assert!(ty.qualifiers.contains(Qualifiers::CONST));
    }
}
