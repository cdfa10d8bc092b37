//! Expression grammar: precedence climbing over binary operators, with
//! unary/postfix/primary handled by recursive descent (§4.2). Each
//! production type-checks as it builds, folding constants where the whole
//! subtree is literal.

use super::fold::{fold_binary, fold_unary, Scalar};
use super::overload::{call_ranks, resolve_best, OverloadError};
use super::{intrinsics, Parser};
use crate::ast::node::{BinaryOp, Node, UnaryOp};
use crate::ast::symbol::Symbol;
use crate::ast::{BaseClass, NodeId, Qualifiers, SymbolId, Type};
use crate::error::codes;
use crate::lexer::{Literal, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_expression(&mut self) -> NodeId {
        let first = self.parse_assignment_expr();
        if !self.at(&TokenKind::Comma) {
            return first;
        }
        let mut items = vec![first];
        while self.accept(&TokenKind::Comma) {
            items.push(self.parse_assignment_expr());
        }
        self.ast.nodes.insert(Node::Sequence { items })
    }

    pub(super) fn parse_assignment_expr(&mut self) -> NodeId {
        let lhs = self.parse_conditional_expr();

        let op = match self.current.kind {
            TokenKind::Equal => None,
            TokenKind::PlusEqual => Some(BinaryOp::Add),
            TokenKind::MinusEqual => Some(BinaryOp::Sub),
            TokenKind::StarEqual => Some(BinaryOp::Mul),
            TokenKind::SlashEqual => Some(BinaryOp::Div),
            TokenKind::PercentEqual => Some(BinaryOp::Mod),
            TokenKind::AmpersandEqual => Some(BinaryOp::BitAnd),
            TokenKind::PipeEqual => Some(BinaryOp::BitOr),
            TokenKind::CaretEqual => Some(BinaryOp::BitXor),
            TokenKind::LessLessEqual => Some(BinaryOp::Shl),
            TokenKind::GreaterGreaterEqual => Some(BinaryOp::Shr),
            _ => return lhs,
        };
        self.bump();
        let rhs = self.parse_assignment_expr();

        if !self.is_lvalue(lhs) {
            self.error(codes::SYNTAX_ERROR, "left-hand side of assignment is not an lvalue");
        }
        let ty = self.node_type(lhs).clone();
        if ty.qualifiers.contains(Qualifiers::CONST) {
            self.error(codes::LVALUE_IS_CONST, "cannot assign to a const value");
        }
        self.ast.nodes.insert(Node::Assignment { op, lhs, rhs, ty })
    }

    fn is_lvalue(&self, id: NodeId) -> bool {
        matches!(
            self.ast.node(id),
            Node::LValue { .. } | Node::FieldSelection { .. } | Node::Swizzle { .. } | Node::Subscript { .. }
        )
    }

    fn parse_conditional_expr(&mut self) -> NodeId {
        let condition = self.parse_binary_expr(0);
        if !self.accept(&TokenKind::Question) {
            return condition;
        }
        let then_branch = self.parse_assignment_expr();
        self.expect(&TokenKind::Colon);
        let else_branch = self.parse_assignment_expr();

        let ty = self.unify(then_branch, else_branch);
        self.ast.nodes.insert(Node::Conditional {
            condition,
            then_branch,
            else_branch,
            ty,
        })
    }

    /// Binary operator precedence table, lowest level first: `||`, `&&`, `|`,
    /// `^`, `&`, equality, relational, shift, additive, multiplicative.
    fn parse_binary_expr(&mut self, level: usize) -> NodeId {
        const LEVELS: &[&[(TokenKind, BinaryOp)]] = &[
            &[(TokenKind::PipePipe, BinaryOp::Or)],
            &[(TokenKind::AmpersandAmpersand, BinaryOp::And)],
            &[(TokenKind::Pipe, BinaryOp::BitOr)],
            &[(TokenKind::Caret, BinaryOp::BitXor)],
            &[(TokenKind::Ampersand, BinaryOp::BitAnd)],
            &[
                (TokenKind::EqualEqual, BinaryOp::Equal),
                (TokenKind::ExclaimEqual, BinaryOp::NotEqual),
            ],
            &[
                (TokenKind::Less, BinaryOp::Less),
                (TokenKind::Greater, BinaryOp::Greater),
                (TokenKind::LessEqual, BinaryOp::LessEqual),
                (TokenKind::GreaterEqual, BinaryOp::GreaterEqual),
            ],
            &[
                (TokenKind::LessLess, BinaryOp::Shl),
                (TokenKind::GreaterGreater, BinaryOp::Shr),
            ],
            &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
        ];

        if level >= LEVELS.len() {
            return self.parse_unary_expr();
        }

        let mut lhs = self.parse_binary_expr(level + 1);
        'outer: loop {
            for (tok, op) in LEVELS[level] {
                if self.at(tok) {
                    self.bump();
                    let rhs = self.parse_binary_expr(level + 1);
                    lhs = self.make_binary(*op, lhs, rhs);
                    continue 'outer;
                }
            }
            break;
        }
        lhs
    }

    fn make_binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        let lty = self.node_type(lhs).clone();
        let rty = self.node_type(rhs).clone();

        if !lty.base_class.is_numeric() || !rty.base_class.is_numeric() {
            self.error(codes::TYPE_MISMATCH, "binary operator requires numeric operands");
        }
        let is_logical = matches!(op, BinaryOp::And | BinaryOp::Or);
        let is_relational = matches!(
            op,
            BinaryOp::Less
                | BinaryOp::Greater
                | BinaryOp::LessEqual
                | BinaryOp::GreaterEqual
                | BinaryOp::Equal
                | BinaryOp::NotEqual
        );
        let is_bitwise = matches!(
            op,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        );
        if is_bitwise && (!is_integral(lty.base_class) || !is_integral(rty.base_class)) {
            self.error(codes::TYPE_MISMATCH, "bitwise operator requires an integral operand");
        }

        let (rows, cols) = broadcast_shape(&lty, &rty);
        let base = if is_logical || is_relational {
            BaseClass::Bool
        } else {
            promote_base(lty.base_class, rty.base_class)
        };
        let ty = Type {
            base_class: base,
            rows,
            cols,
            array_length: 0,
            qualifiers: Qualifiers::empty(),
            definition: None,
        };

        if let (Node::Literal { value: lv, .. }, Node::Literal { value: rv, .. }) =
            (self.ast.node(lhs).clone(), self.ast.node(rhs).clone())
        {
            if let Some(folded) = fold_binary(op, Scalar::from_literal(&lv), Scalar::from_literal(&rv)) {
                return self.ast.nodes.insert(Node::Literal {
                    value: folded.into_literal(),
                    ty,
                });
            }
        }

        self.ast.nodes.insert(Node::Binary { op, lhs, rhs, ty })
    }

    fn unify(&mut self, a: NodeId, b: NodeId) -> Type {
        let ta = self.node_type(a).clone();
        let tb = self.node_type(b).clone();
        let (rows, cols) = broadcast_shape(&ta, &tb);
        Type {
            base_class: promote_base(ta.base_class, tb.base_class),
            rows,
            cols,
            array_length: 0,
            qualifiers: Qualifiers::empty(),
            definition: None,
        }
    }

    fn node_type(&self, id: NodeId) -> &Type {
        self.ast.node(id).ty().expect("expression node without a type")
    }

    fn parse_unary_expr(&mut self) -> NodeId {
        let op = match self.current.kind {
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Exclaim => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::PlusPlus => Some(UnaryOp::PreIncrement),
            TokenKind::MinusMinus => Some(UnaryOp::PreDecrement),
            TokenKind::Plus => {
                self.bump();
                return self.parse_unary_expr();
            }
            _ => None,
        };

        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary_expr();
            let ty = self.node_type(operand).clone();
            if op == UnaryOp::BitNot && !is_integral(ty.base_class) {
                self.error(codes::BITWISE_NOT_ON_NON_INTEGRAL, "bitwise not requires an integral operand");
            }
            if let Node::Literal { value, .. } = self.ast.node(operand).clone() {
                if let Some(folded) = fold_unary(op, Scalar::from_literal(&value), &ty) {
                    return self.ast.nodes.insert(Node::Literal {
                        value: folded.into_literal(),
                        ty,
                    });
                }
            }
            return self.ast.nodes.insert(Node::Unary { op, operand, ty });
        }

        if self.at(&TokenKind::ParenOpen) {
            let checkpoint = self.lexer.checkpoint();
            let saved = self.current.clone();
            self.bump();
            if let Some(ty) = self.parse_base_type() {
                if self.at(&TokenKind::ParenClose) {
                    self.bump();
                    let operand = self.parse_unary_expr();
                    let operand_value = if let Node::Literal { value, .. } = self.ast.node(operand).clone()
                    {
                        fold_unary(UnaryOp::Cast, Scalar::from_literal(&value), &ty)
                    } else {
                        None
                    };
                    return match operand_value {
                        Some(folded) => self.ast.nodes.insert(Node::Literal {
                            value: folded.into_literal(),
                            ty,
                        }),
                        None => self.ast.nodes.insert(Node::Unary {
                            op: UnaryOp::Cast,
                            operand,
                            ty,
                        }),
                    };
                }
            }
            self.lexer.restore(checkpoint);
            self.current = saved;
        }

        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> NodeId {
        let mut node = self.parse_primary_expr();
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.bump();
                    let field = self.ident();
                    node = self.build_field_access(node, field);
                }
                TokenKind::BracketOpen => {
                    self.bump();
                    let index = self.parse_expression();
                    self.expect(&TokenKind::BracketClose);
                    node = self.build_subscript(node, index);
                }
                TokenKind::PlusPlus => {
                    self.bump();
                    let ty = self.node_type(node).clone();
                    node = self.ast.nodes.insert(Node::Unary {
                        op: UnaryOp::PostIncrement,
                        operand: node,
                        ty,
                    });
                }
                TokenKind::MinusMinus => {
                    self.bump();
                    let ty = self.node_type(node).clone();
                    node = self.ast.nodes.insert(Node::Unary {
                        op: UnaryOp::PostDecrement,
                        operand: node,
                        ty,
                    });
                }
                _ => break,
            }
        }
        node
    }

    fn build_field_access(&mut self, base: NodeId, field: String) -> NodeId {
        let base_ty = self.node_type(base).clone();

        if base_ty.base_class == BaseClass::Struct {
            let field_ty = base_ty
                .definition
                .and_then(|key| {
                    if let Symbol::Struct(def) = self.ast.symbols.get(SymbolId(key)) {
                        def.fields.iter().find(|f| f.name == field).map(|f| f.ty.clone())
                    } else {
                        None
                    }
                })
                .unwrap_or_else(|| {
                    self.error(codes::UNDECLARED_IDENTIFIER, format!("unknown field '{field}'"));
                    Type::void()
                });
            return self.ast.nodes.insert(Node::FieldSelection {
                base,
                field,
                ty: field_ty,
            });
        }

        if base_ty.base_class.is_numeric() && base_ty.is_vector_or_scalar() {
            if let Some(mask) = swizzle_mask(&field) {
                if mask.iter().any(|&c| c as u8 >= base_ty.rows) {
                    self.error(codes::INVALID_SWIZZLE, "swizzle references a nonexistent component");
                }
                let ty = Type {
                    base_class: base_ty.base_class,
                    rows: mask.len() as u8,
                    cols: 1,
                    array_length: 0,
                    qualifiers: Qualifiers::empty(),
                    definition: None,
                };
                return self.ast.nodes.insert(Node::Swizzle { base, mask, ty });
            }
        }

        self.error(codes::INVALID_SWIZZLE, format!("invalid swizzle or field '{field}'"));
        self.ast.nodes.insert(Node::FieldSelection {
            base,
            field,
            ty: Type::void(),
        })
    }

    fn build_subscript(&mut self, base: NodeId, index: NodeId) -> NodeId {
        let base_ty = self.node_type(base).clone();
        let ty = if base_ty.is_array() {
            Type {
                array_length: 0,
                ..base_ty
            }
        } else if base_ty.is_matrix() {
            Type::vector(base_ty.base_class, base_ty.cols)
        } else if base_ty.is_vector() {
            Type::scalar(base_ty.base_class)
        } else {
            self.error(codes::TYPE_MISMATCH, "value is not subscriptable");
            Type::void()
        };
        self.ast.nodes.insert(Node::Subscript { base, index, ty })
    }

    fn parse_primary_expr(&mut self) -> NodeId {
        match self.current.kind.clone() {
            TokenKind::IntLiteral(v) => {
                self.bump();
                self.ast.nodes.insert(Node::Literal {
                    value: Literal::Int(v),
                    ty: Type::scalar(BaseClass::Int),
                })
            }
            TokenKind::UintLiteral(v) => {
                self.bump();
                self.ast.nodes.insert(Node::Literal {
                    value: Literal::Uint(v),
                    ty: Type::scalar(BaseClass::Uint),
                })
            }
            TokenKind::FloatLiteral(v) => {
                self.bump();
                self.ast.nodes.insert(Node::Literal {
                    value: Literal::Float(v),
                    ty: Type::scalar(BaseClass::Float),
                })
            }
            TokenKind::DoubleLiteral(v) => {
                self.bump();
                self.ast.nodes.insert(Node::Literal {
                    value: Literal::Double(v),
                    ty: Type::scalar(BaseClass::Double),
                })
            }
            TokenKind::BoolLiteral(v) => {
                self.bump();
                self.ast.nodes.insert(Node::Literal {
                    value: Literal::Bool(v),
                    ty: Type::scalar(BaseClass::Bool),
                })
            }
            TokenKind::ParenOpen => {
                self.bump();
                let inner = self.parse_expression();
                self.expect(&TokenKind::ParenClose);
                inner
            }
            TokenKind::Identifier(name) => self.parse_identifier_expr(name),
            TokenKind::Vector | TokenKind::Matrix => {
                if let Some(ty) = self.parse_base_type() {
                    self.parse_constructor(ty)
                } else {
                    self.error(codes::SYNTAX_ERROR, "expected a type");
                    self.ast.nodes.insert(Node::Literal {
                        value: Literal::Int(0),
                        ty: Type::scalar(BaseClass::Int),
                    })
                }
            }
            _ => {
                self.error(codes::SYNTAX_ERROR, format!("unexpected token {:?}", self.current.kind));
                self.bump();
                self.ast.nodes.insert(Node::Literal {
                    value: Literal::Int(0),
                    ty: Type::scalar(BaseClass::Int),
                })
            }
        }
    }

    fn parse_identifier_expr(&mut self, name: String) -> NodeId {
        if let Some(ty) = shorthand_type_from_name(&name) {
            self.bump();
            return self.parse_constructor(ty);
        }

        self.bump();

        if self.at(&TokenKind::ParenOpen) {
            return self.parse_call(name);
        }

        match self.ast.symbols.lookup(&name) {
            Some(id) => {
                let ty = match self.ast.symbols.get(id) {
                    Symbol::Variable(v) => v.ty.clone(),
                    _ => {
                        self.error(codes::UNDECLARED_IDENTIFIER, format!("'{name}' is not a value"));
                        Type::void()
                    }
                };
                self.ast.nodes.insert(Node::LValue { symbol: id, ty })
            }
            None => {
                self.error(codes::UNDECLARED_IDENTIFIER, format!("undeclared identifier '{name}'"));
                self.ast.nodes.insert(Node::Literal {
                    value: Literal::Int(0),
                    ty: Type::scalar(BaseClass::Int),
                })
            }
        }
    }

    fn parse_constructor(&mut self, ty: Type) -> NodeId {
        self.expect(&TokenKind::ParenOpen);
        let mut args = Vec::new();
        if !self.at(&TokenKind::ParenClose) {
            loop {
                args.push(self.parse_assignment_expr());
                if !self.accept(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::ParenClose);

        let provided: u32 = args
            .iter()
            .map(|&a| self.node_type(a).components().max(1))
            .sum();
        if provided != ty.components() && !(ty.components() == 1 && provided >= 1) {
            self.error(
                codes::TYPE_MISMATCH,
                format!("constructor for a {}-component type given {provided} components", ty.components()),
            );
        }

        self.ast.nodes.insert(Node::Constructor { ty, args })
    }

    fn parse_call(&mut self, name: String) -> NodeId {
        self.expect(&TokenKind::ParenOpen);
        let mut args = Vec::new();
        if !self.at(&TokenKind::ParenClose) {
            loop {
                args.push(self.parse_assignment_expr());
                if !self.accept(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::ParenClose);

        let arg_types: Vec<Type> = args.iter().map(|&a| self.node_type(a).clone()).collect();

        let overloads = self.ast.symbols.lookup_all(&name);
        if !overloads.is_empty() {
            return self.resolve_user_call(name, overloads, args, arg_types);
        }

        self.resolve_intrinsic_call(name, args, arg_types)
    }

    fn resolve_user_call(
        &mut self,
        name: String,
        overloads: Vec<SymbolId>,
        args: Vec<NodeId>,
        arg_types: Vec<Type>,
    ) -> NodeId {
        let mut candidates = Vec::new();
        let mut ranks = Vec::new();
        for &id in &overloads {
            if let Symbol::Function(f) = self.ast.symbols.get(id) {
                let formal: Vec<Type> = f.parameters.iter().map(|p| p.ty.clone()).collect();
                if let Some(r) = call_ranks(&arg_types, &formal) {
                    candidates.push(id);
                    ranks.push(r);
                }
            }
        }

        match resolve_best(&ranks) {
            Ok(index) => {
                let callee = candidates[index];
                let ty = match self.ast.symbols.get(callee) {
                    Symbol::Function(f) => f.return_type.clone(),
                    _ => unreachable!(),
                };
                self.ast.nodes.insert(Node::Call { callee, args, ty })
            }
            Err(OverloadError::NoMatch) => {
                self.error(codes::NO_MATCHING_OVERLOAD, format!("no overload of '{name}' matches these arguments"));
                self.ast.nodes.insert(Node::Call {
                    callee: overloads[0],
                    args,
                    ty: Type::void(),
                })
            }
            Err(OverloadError::Ambiguous) => {
                self.error(codes::AMBIGUOUS_OVERLOAD, format!("call to '{name}' is ambiguous"));
                self.ast.nodes.insert(Node::Call {
                    callee: overloads[0],
                    args,
                    ty: Type::void(),
                })
            }
        }
    }

    fn resolve_intrinsic_call(&mut self, name: String, args: Vec<NodeId>, arg_types: Vec<Type>) -> NodeId {
        let sigs: Vec<_> = intrinsics::lookup(&name).copied().collect();
        if sigs.is_empty() {
            self.error(codes::UNDECLARED_IDENTIFIER, format!("undeclared identifier '{name}'"));
            return self.ast.nodes.insert(Node::Literal {
                value: Literal::Int(0),
                ty: Type::scalar(BaseClass::Int),
            });
        }

        let mut ranks = Vec::new();
        let mut viable = Vec::new();
        for sig in &sigs {
            let formal = intrinsics::instantiate(sig, &arg_types);
            if let Some(r) = call_ranks(&arg_types, &formal) {
                ranks.push(r);
                viable.push(*sig);
            }
        }

        let sig = match resolve_best(&ranks) {
            Ok(i) => viable[i],
            Err(_) => {
                self.error(codes::NO_MATCHING_OVERLOAD, format!("no overload of '{name}' matches these arguments"));
                sigs[0]
            }
        };

        let ty = intrinsics::result_type(sig.name, &arg_types);

        if sig.foldable {
            let literals: Option<Vec<Scalar>> = args
                .iter()
                .map(|&a| match self.ast.node(a) {
                    Node::Literal { value, .. } => Some(Scalar::from_literal(value)),
                    _ => None,
                })
                .collect();
            if let Some(values) = literals {
                if let Some(folded) = super::fold::fold_intrinsic(sig.name, &values) {
                    return self.ast.nodes.insert(Node::Literal {
                        value: folded.into_literal(),
                        ty,
                    });
                }
            }
        }

        self.ast.nodes.insert(Node::Intrinsic { name: sig.name, args, ty })
    }
}

fn is_integral(base: BaseClass) -> bool {
    matches!(base, BaseClass::Int | BaseClass::Uint | BaseClass::Bool)
}

fn promote_base(a: BaseClass, b: BaseClass) -> BaseClass {
    if a.promotion_rank() >= b.promotion_rank() {
        a
    } else {
        b
    }
}

fn broadcast_shape(a: &Type, b: &Type) -> (u8, u8) {
    if a.is_scalar() {
        (b.rows, b.cols)
    } else {
        (a.rows, a.cols)
    }
}

fn swizzle_mask(field: &str) -> Option<Vec<u8>> {
    if field.is_empty() || field.len() > 4 {
        return None;
    }
    let xyzw = "xyzw";
    let rgba = "rgba";
    let mut mask = Vec::with_capacity(field.len());
    for c in field.chars() {
        let index = xyzw
            .find(c)
            .or_else(|| rgba.find(c))
            .map(|i| i as u8)?;
        mask.push(index);
    }
    Some(mask)
}

fn shorthand_type_from_name(name: &str) -> Option<Type> {
    super::shorthand_vector_type(name)
}

impl Type {
    fn is_vector_or_scalar(&self) -> bool {
        self.cols == 1
    }
}
