//! C2: the parser. Recursive-descent over the token stream, building a
//! typed AST with a scope-resolved symbol table (§4.2).

mod expr;
pub mod fold;
pub mod intrinsics;
pub mod overload;
pub mod properties;

use crate::ast::node::{Case, JumpKind, Node};
use crate::ast::pass::PassState;
use crate::ast::symbol::{Annotation, AnnotationValue, Field, FunctionSymbol, StructDef, VariableSymbol};
use crate::ast::{Ast, BaseClass, NodeId, Qualifiers, SamplerDescriptor, Symbol, SymbolId, TextureDescriptor, TextureFormat, Type};
use crate::error::{codes, DiagnosticSink};
use crate::lexer::{Lexer, Location, Token, TokenKind};

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    pub ast: Ast,
    pub diagnostics: DiagnosticSink,
}

/// Parses a complete effect source string, returning the resulting AST and
/// the accumulated diagnostics. The AST is only meaningful to the backend
/// walker if `diagnostics.is_viable()`.
pub fn parse(source: &str) -> (Ast, DiagnosticSink) {
    let mut parser = Parser::new(source);
    parser.parse_program();
    let diagnostics = std::mem::take(&mut parser.lexer.diagnostics);
    let mut all = parser.diagnostics;
    all.extend(diagnostics);
    (parser.ast, all)
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.lex();
        Self {
            lexer,
            current,
            ast: Ast::new(),
            diagnostics: DiagnosticSink::new(),
        }
    }

    fn loc(&self) -> Location {
        self.current.location
    }

    fn bump(&mut self) -> Token {
        let next = self.lexer.lex();
        std::mem::replace(&mut self.current, next)
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn accept(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) {
        if !self.accept(kind) {
            self.error(
                codes::SYNTAX_ERROR,
                format!("expected {:?}, found {:?}", kind, self.current.kind),
            );
        }
    }

    fn ident(&mut self) -> String {
        if let TokenKind::Identifier(name) = self.current.kind.clone() {
            self.bump();
            name
        } else {
            self.error(codes::SYNTAX_ERROR, "expected identifier");
            String::new()
        }
    }

    fn error(&mut self, code: u32, message: impl Into<String>) {
        self.diagnostics.error(self.loc(), code, message);
    }

    fn warning(&mut self, code: u32, message: impl Into<String>) {
        self.diagnostics.warning(self.loc(), code, message);
    }

    fn eof(&self) -> bool {
        self.at(&TokenKind::EndOfStream)
    }

    // ---- top level -----------------------------------------------------

    fn parse_program(&mut self) {
        while !self.eof() {
            self.parse_top_level_item();
        }
    }

    fn parse_top_level_item(&mut self) {
        match &self.current.kind {
            TokenKind::Struct => self.parse_struct(),
            TokenKind::Technique => self.parse_technique(),
            TokenKind::Texture1D | TokenKind::Texture2D | TokenKind::Texture3D => {
                self.parse_texture_decl()
            }
            TokenKind::Sampler1D | TokenKind::Sampler2D | TokenKind::Sampler3D => {
                self.parse_sampler_decl()
            }
            TokenKind::Semicolon => {
                self.bump();
            }
            _ => self.parse_global_declaration(),
        }
    }

    fn parse_struct(&mut self) {
        let location = self.loc();
        self.bump();
        let name = self.ident();
        self.expect(&TokenKind::BraceOpen);

        let mut fields = Vec::new();
        while !self.at(&TokenKind::BraceClose) && !self.eof() {
            let qualifiers = self.parse_qualifiers();
            let Some(mut ty) = self.parse_base_type() else {
                self.error(codes::SYNTAX_ERROR, "expected type in struct field");
                self.bump();
                continue;
            };
            ty.qualifiers = qualifiers;
            let field_name = self.ident();
            let semantic = self.parse_optional_semantic();
            self.expect(&TokenKind::Semicolon);
            fields.push(Field {
                name: field_name,
                ty,
                semantic,
            });
        }
        self.expect(&TokenKind::BraceClose);
        self.expect(&TokenKind::Semicolon);

        if fields.is_empty() {
            self.warning(codes::EMPTY_STRUCT, "struct has no fields");
        }

        let def = StructDef {
            name,
            fields,
            location,
        };
        if self.ast.symbols.insert(Symbol::Struct(def), true).is_err() {
            self.error(codes::SYNTAX_ERROR, "redeclaration of struct");
        }
    }

    fn parse_optional_semantic(&mut self) -> Option<String> {
        if self.accept(&TokenKind::Colon) {
            Some(self.ident())
        } else {
            None
        }
    }

    fn parse_qualifiers(&mut self) -> Qualifiers {
        let mut qualifiers = Qualifiers::empty();
        loop {
            let bit = match self.current.kind {
                TokenKind::Extern => Qualifiers::EXTERN,
                TokenKind::Static => Qualifiers::STATIC,
                TokenKind::Uniform => Qualifiers::UNIFORM,
                TokenKind::Const => Qualifiers::CONST,
                TokenKind::Volatile => Qualifiers::VOLATILE,
                TokenKind::Precise => Qualifiers::PRECISE,
                TokenKind::In => Qualifiers::IN,
                TokenKind::Out => Qualifiers::OUT,
                TokenKind::InOut => Qualifiers::INOUT,
                TokenKind::Linear => Qualifiers::LINEAR,
                TokenKind::NoPerspective => Qualifiers::NOPERSPECTIVE,
                TokenKind::Centroid => Qualifiers::CENTROID,
                TokenKind::NoInterpolation => Qualifiers::NOINTERPOLATION,
                TokenKind::RowMajor => Qualifiers::ROW_MAJOR,
                TokenKind::ColumnMajor => Qualifiers::COLUMN_MAJOR,
                TokenKind::Unorm => Qualifiers::UNORM,
                TokenKind::Snorm => Qualifiers::SNORM,
                TokenKind::GroupShared => Qualifiers::GROUPSHARED,
                _ => break,
            };
            if qualifiers.contains(bit) {
                self.warning(codes::DUPLICATE_QUALIFIER, "duplicate type qualifier");
            }
            qualifiers |= bit;
            self.bump();
        }
        qualifiers
    }

    /// Parses a base type: a built-in keyword, a `NxM` shorthand identifier
    /// (e.g. `float3`, `int2x2`), a `vector<T,N>`/`matrix<T,R,C>` generic, or
    /// a previously declared struct name.
    fn parse_base_type(&mut self) -> Option<Type> {
        let base = match self.current.kind {
            TokenKind::Void => Some(BaseClass::Void),
            TokenKind::Bool => Some(BaseClass::Bool),
            TokenKind::Int => Some(BaseClass::Int),
            TokenKind::Uint => Some(BaseClass::Uint),
            TokenKind::Half => Some(BaseClass::Half),
            TokenKind::Float => Some(BaseClass::Float),
            TokenKind::Double => Some(BaseClass::Double),
            TokenKind::String => Some(BaseClass::String),
            _ => None,
        };
        if let Some(base) = base {
            self.bump();
            return Some(Type::scalar(base));
        }

        match self.current.kind {
            TokenKind::Texture1D => {
                self.bump();
                return Some(Type::scalar(BaseClass::Texture1D));
            }
            TokenKind::Texture2D => {
                self.bump();
                return Some(Type::scalar(BaseClass::Texture2D));
            }
            TokenKind::Texture3D => {
                self.bump();
                return Some(Type::scalar(BaseClass::Texture3D));
            }
            TokenKind::Sampler1D => {
                self.bump();
                return Some(Type::scalar(BaseClass::Sampler1D));
            }
            TokenKind::Sampler2D => {
                self.bump();
                return Some(Type::scalar(BaseClass::Sampler2D));
            }
            TokenKind::Sampler3D => {
                self.bump();
                return Some(Type::scalar(BaseClass::Sampler3D));
            }
            TokenKind::Vector => {
                self.bump();
                self.expect(&TokenKind::Less);
                let base = self.parse_base_type()?;
                self.expect(&TokenKind::Comma);
                let n = self.parse_const_dimension();
                self.expect(&TokenKind::Greater);
                return Some(Type::vector(base.base_class, n));
            }
            TokenKind::Matrix => {
                self.bump();
                self.expect(&TokenKind::Less);
                let base = self.parse_base_type()?;
                self.expect(&TokenKind::Comma);
                let r = self.parse_const_dimension();
                self.expect(&TokenKind::Comma);
                let c = self.parse_const_dimension();
                self.expect(&TokenKind::Greater);
                return Some(Type::matrix(base.base_class, r, c));
            }
            _ => {}
        }

        if let TokenKind::Identifier(name) = self.current.kind.clone() {
            if let Some(ty) = shorthand_vector_type(&name) {
                self.bump();
                return Some(ty);
            }
            if let Some(id) = self.ast.symbols.lookup(&name) {
                if let Symbol::Struct(_) = self.ast.symbols.get(id) {
                    self.bump();
                    let mut ty = Type::scalar(BaseClass::Struct);
                    ty.definition = Some(id.0);
                    return Some(ty);
                }
            }
        }

        None
    }

    fn parse_const_dimension(&mut self) -> u8 {
        if let TokenKind::UintLiteral(n) = self.current.kind {
            self.bump();
            n as u8
        } else if let TokenKind::IntLiteral(n) = self.current.kind {
            self.bump();
            n as u8
        } else {
            self.error(codes::NON_LITERAL_ARRAY_DIM, "expected a literal dimension");
            1
        }
    }

    fn parse_global_declaration(&mut self) {
        let location = self.loc();
        let qualifiers = self.parse_qualifiers();
        let Some(mut ty) = self.parse_base_type() else {
            self.error(codes::SYNTAX_ERROR, "expected a declaration");
            self.bump();
            return;
        };
        ty.qualifiers = qualifiers;

        let name = self.ident();

        if self.at(&TokenKind::ParenOpen) {
            self.parse_function(name, ty, location);
            return;
        }

        let array_length = self.parse_optional_array_suffix();
        ty.array_length = array_length;
        let semantic = self.parse_optional_semantic();
        let annotations = self.parse_optional_annotations();

        let initializer = if self.accept(&TokenKind::Equal) {
            Some(self.parse_assignment_expr())
        } else {
            None
        };

        self.expect(&TokenKind::Semicolon);

        if !qualifiers.contains(Qualifiers::UNIFORM)
            && !qualifiers.contains(Qualifiers::STATIC)
            && !qualifiers.contains(Qualifiers::EXTERN)
        {
            self.warning(
                codes::GLOBALS_ARE_UNIFORM,
                "global variables are uniform by default",
            );
        }

        let symbol = VariableSymbol {
            name,
            ty,
            semantic,
            annotations,
            initializer,
            location,
        };
        match self.ast.symbols.insert(Symbol::Variable(symbol), true) {
            Ok(id) => self.ast.uniforms.push(id),
            Err(_) => self.error(codes::SYNTAX_ERROR, "redeclaration of global variable"),
        }
    }

    fn parse_optional_array_suffix(&mut self) -> i32 {
        if self.accept(&TokenKind::BracketOpen) {
            let length = if self.at(&TokenKind::BracketClose) {
                -1
            } else {
                self.parse_const_dimension() as i32
            };
            self.expect(&TokenKind::BracketClose);
            length
        } else {
            0
        }
    }

    fn parse_optional_annotations(&mut self) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        if self.accept(&TokenKind::Less) {
            while !self.at(&TokenKind::Greater) && !self.eof() {
                let _ = self.parse_base_type();
                let name = self.ident();
                self.expect(&TokenKind::Equal);
                let value = self.parse_annotation_value();
                self.expect(&TokenKind::Semicolon);
                annotations.push(Annotation { name, value });
            }
            self.expect(&TokenKind::Greater);
        }
        annotations
    }

    fn parse_annotation_value(&mut self) -> AnnotationValue {
        match self.current.kind.clone() {
            TokenKind::StringLiteral(s) => {
                self.bump();
                AnnotationValue::String(s)
            }
            TokenKind::BoolLiteral(b) => {
                self.bump();
                AnnotationValue::Bool(b)
            }
            TokenKind::IntLiteral(i) => {
                self.bump();
                AnnotationValue::Int(i)
            }
            TokenKind::UintLiteral(u) => {
                self.bump();
                AnnotationValue::Uint(u)
            }
            TokenKind::FloatLiteral(f) => {
                self.bump();
                AnnotationValue::Float(f)
            }
            TokenKind::DoubleLiteral(d) => {
                self.bump();
                AnnotationValue::Double(d)
            }
            _ => {
                self.error(codes::SYNTAX_ERROR, "expected an annotation literal");
                AnnotationValue::Bool(false)
            }
        }
    }

    // ---- texture / sampler declarations --------------------------------

    fn parse_texture_decl(&mut self) {
        let (dimension, base_class) = match self.current.kind {
            TokenKind::Texture1D => (1, BaseClass::Texture1D),
            TokenKind::Texture2D => (2, BaseClass::Texture2D),
            TokenKind::Texture3D => (3, BaseClass::Texture3D),
            _ => unreachable!(),
        };
        let location = self.loc();
        self.bump();
        let name = self.ident();
        let annotations = self.parse_optional_annotations();

        let mut width = 1u32;
        let mut height = 1u32;
        let mut depth = 1u32;
        let mut mip_levels = 1u32;
        let mut format = TextureFormat::RGBA8;

        if self.accept(&TokenKind::BraceOpen) {
            while !self.at(&TokenKind::BraceClose) && !self.eof() {
                let key = self.ident();
                self.expect(&TokenKind::Equal);
                match key.as_str() {
                    "Width" => width = self.parse_uint_value(),
                    "Height" => height = self.parse_uint_value(),
                    "Depth" => depth = self.parse_uint_value(),
                    "MipLevels" => mip_levels = self.parse_uint_value(),
                    "Format" => {
                        let ident = self.ident();
                        format = properties::texture_format(&ident).unwrap_or_else(|| {
                            self.error(codes::UNDECLARED_IDENTIFIER, "unknown texture format");
                            TextureFormat::Unknown
                        });
                    }
                    _ => {
                        self.error(codes::UNDECLARED_IDENTIFIER, format!("unknown texture property '{key}'"));
                        self.skip_to_semicolon();
                    }
                }
                self.expect(&TokenKind::Semicolon);
            }
            self.expect(&TokenKind::BraceClose);
        }
        self.expect(&TokenKind::Semicolon);

        let symbol = self
            .ast
            .symbols
            .insert(
                Symbol::Variable(VariableSymbol {
                    name: name.clone(),
                    ty: Type::scalar(base_class),
                    semantic: None,
                    annotations: annotations.clone(),
                    initializer: None,
                    location,
                }),
                true,
            )
            .unwrap_or_else(|id| id);

        self.ast.textures.push(TextureDescriptor {
            name,
            symbol,
            dimension,
            width,
            height,
            depth,
            mip_levels,
            format,
            annotations,
        });
    }

    fn parse_uint_value(&mut self) -> u32 {
        match self.current.kind {
            TokenKind::UintLiteral(n) => {
                self.bump();
                n
            }
            TokenKind::IntLiteral(n) => {
                self.bump();
                n as u32
            }
            _ => {
                self.error(codes::SYNTAX_ERROR, "expected an integer literal");
                1
            }
        }
    }

    fn skip_to_semicolon(&mut self) {
        while !self.at(&TokenKind::Semicolon) && !self.eof() {
            self.bump();
        }
    }

    fn parse_sampler_decl(&mut self) {
        self.bump(); // Sampler{1,2,3}D
        let name = self.ident();

        let mut texture = None;
        let mut min_filter = crate::ast::pass::FilterMode::Linear;
        let mut mag_filter = crate::ast::pass::FilterMode::Linear;
        let mut mip_filter = crate::ast::pass::FilterMode::Linear;
        let mut address_u = crate::ast::pass::AddressMode::Clamp;
        let mut address_v = crate::ast::pass::AddressMode::Clamp;
        let mut address_w = crate::ast::pass::AddressMode::Clamp;
        let mut min_lod = 0.0f32;
        let mut max_lod = f32::MAX;
        let mut lod_bias = 0.0f32;
        let mut max_anisotropy = 1u32;
        let mut srgb = false;

        self.expect(&TokenKind::BraceOpen);
        while !self.at(&TokenKind::BraceClose) && !self.eof() {
            let key = self.ident();
            self.expect(&TokenKind::Equal);
            match key.as_str() {
                "Texture" => {
                    let tex_name = self.ident();
                    texture = self.ast.symbols.lookup(&tex_name);
                    if texture.is_none() {
                        self.error(codes::UNDECLARED_IDENTIFIER, format!("undeclared texture '{tex_name}'"));
                    }
                }
                "MinFilter" => min_filter = self.parse_enum_value(properties::filter_mode),
                "MagFilter" => mag_filter = self.parse_enum_value(properties::filter_mode),
                "MipFilter" => mip_filter = self.parse_enum_value(properties::filter_mode),
                "AddressU" => address_u = self.parse_enum_value(properties::address_mode),
                "AddressV" => address_v = self.parse_enum_value(properties::address_mode),
                "AddressW" => address_w = self.parse_enum_value(properties::address_mode),
                "MinLOD" => min_lod = self.parse_float_value(),
                "MaxLOD" => max_lod = self.parse_float_value(),
                "MipLODBias" => lod_bias = self.parse_float_value(),
                "MaxAnisotropy" => max_anisotropy = self.parse_uint_value(),
                "SRGBTexture" => srgb = self.parse_bool_value(),
                _ => {
                    self.error(codes::UNDECLARED_IDENTIFIER, format!("unknown sampler property '{key}'"));
                    self.skip_to_semicolon();
                }
            }
            self.expect(&TokenKind::Semicolon);
        }
        self.expect(&TokenKind::BraceClose);
        self.expect(&TokenKind::Semicolon);

        let Some(texture) = texture else {
            return;
        };

        let symbol_id = self
            .ast
            .symbols
            .insert(
                Symbol::Variable(VariableSymbol {
                    name: name.clone(),
                    ty: Type::scalar(BaseClass::Sampler2D),
                    semantic: None,
                    annotations: Vec::new(),
                    initializer: None,
                    location: self.loc(),
                }),
                true,
            )
            .unwrap_or_else(|id| id);

        self.ast.samplers.push(SamplerDescriptor {
            name,
            texture,
            min_filter,
            mag_filter,
            mip_filter,
            address_u,
            address_v,
            address_w,
            min_lod,
            max_lod,
            lod_bias,
            max_anisotropy,
            srgb,
        });
        let _ = symbol_id;
    }

    fn parse_enum_value<T>(&mut self, resolve: fn(&str) -> Option<T>) -> T
    where
        T: Default,
    {
        let name = self.ident();
        resolve(&name).unwrap_or_else(|| {
            self.error(codes::UNDECLARED_IDENTIFIER, format!("unknown enum value '{name}'"));
            T::default()
        })
    }

    fn parse_float_value(&mut self) -> f32 {
        match self.current.kind {
            TokenKind::FloatLiteral(f) => {
                self.bump();
                f
            }
            TokenKind::IntLiteral(i) => {
                self.bump();
                i as f32
            }
            TokenKind::UintLiteral(u) => {
                self.bump();
                u as f32
            }
            _ => {
                self.error(codes::SYNTAX_ERROR, "expected a float literal");
                0.0
            }
        }
    }

    fn parse_bool_value(&mut self) -> bool {
        if let TokenKind::BoolLiteral(b) = self.current.kind {
            self.bump();
            b
        } else {
            self.error(codes::SYNTAX_ERROR, "expected a bool literal");
            false
        }
    }

    // ---- functions -------------------------------------------------------

    fn parse_function(&mut self, name: String, return_type: Type, location: Location) {
        self.expect(&TokenKind::ParenOpen);
        self.ast.symbols.enter_scope();
        let mut parameters = Vec::new();
        if !self.at(&TokenKind::ParenClose) {
            loop {
                let qualifiers = self.parse_qualifiers();
                let Some(mut ty) = self.parse_base_type() else {
                    self.error(codes::SYNTAX_ERROR, "expected parameter type");
                    break;
                };
                ty.qualifiers = qualifiers;
                let pname = self.ident();
                let semantic = self.parse_optional_semantic();
                let param = VariableSymbol {
                    name: pname,
                    ty,
                    semantic,
                    annotations: Vec::new(),
                    initializer: None,
                    location: self.loc(),
                };
                self.ast
                    .symbols
                    .insert(Symbol::Variable(param.clone()), true)
                    .ok();
                parameters.push(param);
                if !self.accept(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::ParenClose);
        let return_semantic = self.parse_optional_semantic();

        let body = if self.at(&TokenKind::BraceOpen) {
            Some(self.parse_compound())
        } else {
            None
        };
        self.ast.symbols.leave_scope();
        if body.is_none() {
            self.expect(&TokenKind::Semicolon);
        }

        let symbol = FunctionSymbol {
            name,
            return_type,
            return_semantic,
            parameters,
            body,
            location,
        };
        if let Ok(id) = self.ast.symbols.insert(Symbol::Function(symbol), false) {
            self.ast.functions.push(id);
        }
    }

    // ---- statements --------------------------------------------------

    fn parse_compound(&mut self) -> NodeId {
        self.expect(&TokenKind::BraceOpen);
        self.ast.symbols.enter_scope();
        let mut statements = Vec::new();
        while !self.at(&TokenKind::BraceClose) && !self.eof() {
            statements.push(self.parse_statement());
        }
        self.expect(&TokenKind::BraceClose);
        self.ast.symbols.leave_scope();
        self.ast.nodes.insert(Node::Compound { statements })
    }

    fn parse_statement(&mut self) -> NodeId {
        match &self.current.kind {
            TokenKind::BraceOpen => self.parse_compound(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Break => {
                self.bump();
                self.expect(&TokenKind::Semicolon);
                self.ast.nodes.insert(Node::Jump { kind: JumpKind::Break })
            }
            TokenKind::Continue => {
                self.bump();
                self.expect(&TokenKind::Semicolon);
                self.ast
                    .nodes
                    .insert(Node::Jump { kind: JumpKind::Continue })
            }
            TokenKind::Return => self.parse_return(false),
            TokenKind::Discard => self.parse_return(true),
            TokenKind::Semicolon => {
                self.bump();
                self.ast.nodes.insert(Node::Sequence { items: Vec::new() })
            }
            _ => self.parse_declaration_or_expression_statement(),
        }
    }

    fn parse_if(&mut self) -> NodeId {
        self.bump();
        self.expect(&TokenKind::ParenOpen);
        let condition = self.parse_expression();
        self.expect(&TokenKind::ParenClose);
        let then_branch = self.parse_statement();
        let else_branch = if self.accept(&TokenKind::Else) {
            Some(self.parse_statement())
        } else {
            None
        };
        self.ast.nodes.insert(Node::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> NodeId {
        self.bump();
        self.expect(&TokenKind::ParenOpen);
        let condition = self.parse_expression();
        self.expect(&TokenKind::ParenClose);
        let body = self.parse_statement();
        self.ast.nodes.insert(Node::While {
            condition,
            body,
            is_do_while: false,
        })
    }

    fn parse_do_while(&mut self) -> NodeId {
        self.bump();
        let body = self.parse_statement();
        self.expect(&TokenKind::While);
        self.expect(&TokenKind::ParenOpen);
        let condition = self.parse_expression();
        self.expect(&TokenKind::ParenClose);
        self.expect(&TokenKind::Semicolon);
        self.ast.nodes.insert(Node::While {
            condition,
            body,
            is_do_while: true,
        })
    }

    fn parse_for(&mut self) -> NodeId {
        self.bump();
        self.expect(&TokenKind::ParenOpen);
        self.ast.symbols.enter_scope();
        let init = if self.accept(&TokenKind::Semicolon) {
            None
        } else {
            let stmt = self.parse_declaration_or_expression_statement();
            Some(stmt)
        };
        let condition = if self.at(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(&TokenKind::Semicolon);
        let increment = if self.at(&TokenKind::ParenClose) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(&TokenKind::ParenClose);
        let body = self.parse_statement();
        self.ast.symbols.leave_scope();
        self.ast.nodes.insert(Node::For {
            init,
            condition,
            increment,
            body,
        })
    }

    fn parse_switch(&mut self) -> NodeId {
        self.bump();
        self.expect(&TokenKind::ParenOpen);
        let value = self.parse_expression();
        self.expect(&TokenKind::ParenClose);
        self.expect(&TokenKind::BraceOpen);

        let mut cases = Vec::new();
        while !self.at(&TokenKind::BraceClose) && !self.eof() {
            let mut labels = Vec::new();
            loop {
                if self.accept(&TokenKind::Case) {
                    let value_node = self.parse_const_case_label();
                    labels.push(Some(value_node));
                    self.expect(&TokenKind::Colon);
                } else if self.accept(&TokenKind::Default) {
                    labels.push(None);
                    self.expect(&TokenKind::Colon);
                } else {
                    break;
                }
            }
            let mut body = Vec::new();
            while !matches!(self.current.kind, TokenKind::Case | TokenKind::Default | TokenKind::BraceClose)
            {
                body.push(self.parse_statement());
            }
            cases.push(Case { labels, body });
        }
        self.expect(&TokenKind::BraceClose);
        if cases.is_empty() {
            self.warning(codes::SWITCH_NO_CASES, "switch statement has no cases");
        }
        self.ast.nodes.insert(Node::Switch { value, cases })
    }

    fn parse_const_case_label(&mut self) -> i64 {
        match self.current.kind {
            TokenKind::IntLiteral(i) => {
                self.bump();
                i as i64
            }
            TokenKind::UintLiteral(u) => {
                self.bump();
                u as i64
            }
            _ => {
                self.error(codes::NON_LITERAL_ARRAY_DIM, "case label must be a constant");
                0
            }
        }
    }

    fn parse_return(&mut self, discard: bool) -> NodeId {
        self.bump();
        let value = if self.at(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(&TokenKind::Semicolon);
        self.ast.nodes.insert(Node::Return { value, discard })
    }

    fn parse_declaration_or_expression_statement(&mut self) -> NodeId {
        let checkpoint = self.lexer.checkpoint();
        let saved = self.current.clone();

        let qualifiers = self.parse_qualifiers();
        if let Some(mut ty) = self.try_parse_local_type() {
            ty.qualifiers = qualifiers;
            return self.parse_local_declarations(ty);
        }

        self.lexer.restore(checkpoint);
        self.current = saved;

        let expr = self.parse_expression();
        self.expect(&TokenKind::Semicolon);
        self.ast.nodes.insert(Node::ExpressionStatement { expr })
    }

    /// Tries to parse a type at the start of a statement. Only succeeds for
    /// built-in keywords or known struct names, so `foo = 1;` (an
    /// assignment expression) is never misread as a declaration.
    fn try_parse_local_type(&mut self) -> Option<Type> {
        if let TokenKind::Identifier(name) = self.current.kind.clone() {
            if shorthand_vector_type(&name).is_some() {
                return self.parse_base_type();
            }
            if let Some(id) = self.ast.symbols.lookup(&name) {
                if matches!(self.ast.symbols.get(id), Symbol::Struct(_)) {
                    return self.parse_base_type();
                }
            }
            return None;
        }

        match self.current.kind {
            TokenKind::Void
            | TokenKind::Bool
            | TokenKind::Int
            | TokenKind::Uint
            | TokenKind::Half
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::String
            | TokenKind::Vector
            | TokenKind::Matrix => self.parse_base_type(),
            _ => None,
        }
    }

    fn parse_local_declarations(&mut self, base_ty: Type) -> NodeId {
        let mut declarations = Vec::new();
        loop {
            let name = self.ident();
            let mut ty = base_ty.clone();
            ty.array_length = self.parse_optional_array_suffix();
            let initializer = if self.accept(&TokenKind::Equal) {
                Some(self.parse_assignment_expr())
            } else {
                None
            };
            let location = self.loc();
            let symbol = VariableSymbol {
                name,
                ty,
                semantic: None,
                annotations: Vec::new(),
                initializer,
                location,
            };
            match self.ast.symbols.insert(Symbol::Variable(symbol), true) {
                Ok(id) => declarations.push(self.ast.nodes.insert(Node::DeclarationStatement { symbol: id })),
                Err(_) => self.error(codes::SYNTAX_ERROR, "redeclaration in the same scope"),
            }
            if !self.accept(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Semicolon);
        self.ast.nodes.insert(Node::DeclaratorList { declarations })
    }

    // ---- techniques / passes --------------------------------------------

    fn parse_technique(&mut self) {
        let location = self.loc();
        self.bump();
        let name = self.ident();
        let annotations = self.parse_optional_annotations();
        self.expect(&TokenKind::BraceOpen);
        let mut passes = Vec::new();
        while !self.at(&TokenKind::BraceClose) && !self.eof() {
            passes.push(self.parse_pass());
        }
        self.expect(&TokenKind::BraceClose);
        self.expect(&TokenKind::Semicolon);

        let node = self.ast.nodes.insert(Node::Technique {
            name,
            passes,
            annotations,
            location,
        });
        self.ast.techniques.push(node);
    }

    fn parse_pass(&mut self) -> NodeId {
        let location = self.loc();
        self.expect(&TokenKind::Pass);
        let name = if let TokenKind::Identifier(_) = self.current.kind {
            Some(self.ident())
        } else {
            None
        };
        self.expect(&TokenKind::BraceOpen);

        let mut state = PassState::default();
        while !self.at(&TokenKind::BraceClose) && !self.eof() {
            let key = self.ident();
            self.expect(&TokenKind::Equal);
            self.assign_pass_property(&mut state, &key);
            self.expect(&TokenKind::Semicolon);
        }
        self.expect(&TokenKind::BraceClose);

        self.ast.nodes.insert(Node::Pass { name, state, location })
    }

    fn assign_pass_property(&mut self, state: &mut PassState, key: &str) {
        if !properties::known_pass_state_keys().contains_key(key) {
            self.error(codes::UNDECLARED_IDENTIFIER, format!("unknown pass state '{key}'"));
            self.skip_to_semicolon();
            return;
        }

        match key {
            "VertexShader" | "PixelShader" => {
                let name = self.ident();
                let resolved = self.ast.symbols.lookup(&name);
                if resolved.is_none() {
                    self.error(codes::UNDECLARED_IDENTIFIER, format!("undeclared function '{name}'"));
                }
                if key == "VertexShader" {
                    state.vertex_shader = resolved;
                } else {
                    state.pixel_shader = resolved;
                }
            }
            k if k.starts_with("RenderTarget") => {
                let index: usize = k["RenderTarget".len()..].parse().unwrap_or(0);
                let name = self.ident();
                state.render_targets[index] = self.ast.symbols.lookup(&name);
            }
            "BlendEnable" => state.blend.enable = self.parse_bool_value(),
            "SrcBlend" => state.blend.src_rgb = self.parse_enum_value(properties::blend_factor),
            "DestBlend" => state.blend.dst_rgb = self.parse_enum_value(properties::blend_factor),
            "BlendOp" => state.blend.op_rgb = self.parse_enum_value(properties::blend_op),
            "BlendOpAlpha" => state.blend.op_alpha = self.parse_enum_value(properties::blend_op),
            "SRGBWriteEnable" => state.srgb_write = self.parse_bool_value(),
            "DepthEnable" => state.depth.enable = self.parse_bool_value(),
            "DepthFunc" => state.depth.func = self.parse_enum_value(properties::compare_func),
            "DepthWriteMask" => state.depth.write_mask = self.parse_bool_value(),
            "StencilEnable" => state.stencil.enable = self.parse_bool_value(),
            "StencilRef" => state.stencil.reference = self.parse_uint_value() as u8,
            "StencilReadMask" => state.stencil.read_mask = self.parse_uint_value() as u8,
            "StencilWriteMask" => state.stencil.write_mask = self.parse_uint_value() as u8,
            "StencilFunc" => state.stencil.func = self.parse_enum_value(properties::compare_func),
            "StencilPass" => state.stencil.op_pass = self.parse_enum_value(properties::stencil_op),
            "StencilFail" => state.stencil.op_fail = self.parse_enum_value(properties::stencil_op),
            "StencilZFail" => state.stencil.op_zfail = self.parse_enum_value(properties::stencil_op),
            "ScissorEnable" => state.rasterizer.scissor_enable = self.parse_bool_value(),
            "CullMode" => state.rasterizer.cull = self.parse_enum_value(properties::cull_mode),
            "FillMode" => state.rasterizer.fill = self.parse_enum_value(properties::fill_mode),
            "AlphaToCoverageEnable" => state.sample_alpha_to_coverage = self.parse_bool_value(),
            _ => unreachable!(),
        }
    }
}

/// Recognises HLSL-style shorthand type names (`float3`, `int2x2`, …)
/// without requiring a dedicated lexer token per arity.
fn shorthand_vector_type(name: &str) -> Option<Type> {
    let bases: &[(&str, BaseClass)] = &[
        ("bool", BaseClass::Bool),
        ("int", BaseClass::Int),
        ("uint", BaseClass::Uint),
        ("half", BaseClass::Half),
        ("float", BaseClass::Float),
        ("double", BaseClass::Double),
    ];
    for (prefix, base) in bases {
        if let Some(rest) = name.strip_prefix(prefix) {
            if rest.is_empty() {
                continue;
            }
            let mut chars = rest.chars();
            let rows = chars.next()?.to_digit(10)?;
            if !(1..=4).contains(&rows) {
                continue;
            }
            return match chars.next() {
                None => Some(Type::vector(*base, rows as u8)),
                Some('x') => {
                    let cols = chars.next()?.to_digit(10)?;
                    if chars.next().is_some() || !(1..=4).contains(&cols) {
                        continue;
                    }
                    Some(Type::matrix(*base, rows as u8, cols as u8))
                }
                _ => continue,
            };
        }
    }
    None
}

impl Default for crate::ast::pass::FilterMode {
    fn default() -> Self {
        crate::ast::pass::FilterMode::Linear
    }
}

impl Default for crate::ast::pass::AddressMode {
    fn default() -> Self {
        crate::ast::pass::AddressMode::Clamp
    }
}

impl Default for TextureFormat {
    fn default() -> Self {
        TextureFormat::Unknown
    }
}

impl Default for crate::ast::pass::BlendFactor {
    fn default() -> Self {
        crate::ast::pass::BlendFactor::One
    }
}

impl Default for crate::ast::pass::BlendOp {
    fn default() -> Self {
        crate::ast::pass::BlendOp::Add
    }
}

impl Default for crate::ast::pass::CompareFunc {
    fn default() -> Self {
        crate::ast::pass::CompareFunc::Always
    }
}

impl Default for crate::ast::pass::StencilOp {
    fn default() -> Self {
        crate::ast::pass::StencilOp::Keep
    }
}

impl Default for crate::ast::pass::CullMode {
    fn default() -> Self {
        crate::ast::pass::CullMode::None
    }
}

impl Default for crate::ast::pass::FillMode {
    fn default() -> Self {
        crate::ast::pass::FillMode::Solid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_uniform_and_function() {
        let (ast, diagnostics) = parse(
            r#"
            uniform float4 k;
            float4 main(float4 p : SV_POSITION) : SV_TARGET {
                return p;
            }
            "#,
        );
        assert!(diagnostics.is_viable());
        assert_eq!(ast.uniforms.len(), 1);
        assert_eq!(ast.functions.len(), 1);
    }

    #[test]
    fn parses_texture_sampler_technique() {
        let (ast, diagnostics) = parse(
            r#"
            texture2D T { Width = 4; Height = 4; Format = RGBA8; };
            sampler2D S { Texture = T; };
            float4 V(uint i : SV_VERTEXID) : SV_POSITION { return float4(0,0,0,1); }
            float4 P(float4 p : SV_POSITION) : SV_TARGET { return tex2D(S, p.xy); }
            technique X {
                pass { VertexShader = V; PixelShader = P; }
            };
            "#,
        );
        assert!(diagnostics.is_viable(), "{diagnostics}");
        assert_eq!(ast.textures.len(), 1);
        assert_eq!(ast.samplers.len(), 1);
        assert_eq!(ast.techniques.len(), 1);
    }

    #[test]
    fn unknown_pass_property_is_an_error() {
        let (_, diagnostics) = parse(
            r#"
            float4 V(uint i : SV_VERTEXID) : SV_POSITION { return float4(0,0,0,1); }
            technique X { pass { NotAProperty = 1; VertexShader = V; } };
            "#,
        );
        assert!(!diagnostics.is_viable());
    }
}
