//! Scoped symbol table: a flat hash map keyed by name, each entry carrying
//! the scope depth it was declared at. `leave_scope` drops every entry whose
//! depth is at least the scope being left, turning symbol lookup into an
//! O(1) amortised hash lookup instead of a walk over nested scope frames.

use hashbrown::HashMap;

use super::ty::Type;
use crate::lexer::Location;
use crate::util::Key;

#[derive(Debug, Clone)]
pub struct Annotation {
    pub name: String,
    pub value: AnnotationValue,
}

#[derive(Debug, Clone)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Float(f32),
    Double(f64),
    String(String),
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<Field>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub semantic: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    pub ty: Type,
    pub semantic: Option<String>,
    pub annotations: Vec<Annotation>,
    pub initializer: Option<Key>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub return_type: Type,
    /// The semantic attached after the parameter list, e.g. `: SV_TARGET`
    /// on a pixel shader entry point. `None` for ordinary helper functions.
    pub return_semantic: Option<String>,
    pub parameters: Vec<VariableSymbol>,
    pub body: Option<Key>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Struct(StructDef),
    Variable(VariableSymbol),
    Function(FunctionSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Struct(s) => &s.name,
            Symbol::Variable(v) => &v.name,
            Symbol::Function(f) => &f.name,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Function(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub Key);

struct Entry {
    depth: u32,
    id: SymbolId,
}

/// Scoped symbol table. Scope 0 is global scope and is never left.
pub struct SymbolTable {
    symbols: crate::util::Arena<Symbol>,
    by_name: HashMap<String, Vec<Entry>>,
    depth: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            symbols: crate::util::Arena::new(),
            by_name: HashMap::new(),
            depth: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn enter_scope(&mut self) {
        self.depth += 1;
    }

    pub fn leave_scope(&mut self) {
        debug_assert!(self.depth > 0);
        for entries in self.by_name.values_mut() {
            entries.retain(|e| e.depth < self.depth);
        }
        self.depth -= 1;
    }

    /// Inserts a symbol. If `exclusive` and a symbol of any kind with the same
    /// name already exists in the *current* scope, returns `Err` instead
    /// (functions are the one kind allowed to coexist under the same name —
    /// callers insert overloads with `exclusive = false`).
    pub fn insert(&mut self, symbol: Symbol, exclusive: bool) -> Result<SymbolId, SymbolId> {
        let name = symbol.name().to_string();
        if exclusive {
            if let Some(entries) = self.by_name.get(&name) {
                if let Some(existing) = entries.iter().rev().find(|e| e.depth == self.depth) {
                    return Err(existing.id);
                }
            }
        }

        let key = self.symbols.insert(symbol);
        let id = SymbolId(key);
        self.by_name
            .entry(name)
            .or_default()
            .push(Entry { depth: self.depth, id });
        Ok(id)
    }

    /// Returns the innermost-scope symbol with this name, if any.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name)?.last().map(|e| e.id)
    }

    /// Returns every symbol (in declaration order) registered under `name`,
    /// used by call resolution to collect all overload candidates.
    pub fn lookup_all(&self, name: &str) -> Vec<SymbolId> {
        self.by_name
            .get(name)
            .map(|entries| entries.iter().map(|e| e.id).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        self.symbols.get(id.0).expect("dangling SymbolId")
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        self.symbols.get_mut(id.0).expect("dangling SymbolId")
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ty::Type;

    fn var(name: &str) -> Symbol {
        Symbol::Variable(VariableSymbol {
            name: name.to_string(),
            ty: Type::scalar(crate::ast::ty::BaseClass::Float),
            semantic: None,
            annotations: Vec::new(),
            initializer: None,
            location: Location::default(),
        })
    }

    #[test]
    fn exclusive_insert_rejects_redeclaration_in_same_scope() {
        let mut table = SymbolTable::new();
        table.insert(var("x"), true).unwrap();
        assert!(table.insert(var("x"), true).is_err());
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut table = SymbolTable::new();
        let outer = table.insert(var("x"), true).unwrap();
        table.enter_scope();
        let inner = table.insert(var("x"), true).unwrap();
        assert_eq!(table.lookup("x"), Some(inner));
        table.leave_scope();
        assert_eq!(table.lookup("x"), Some(outer));
    }

    #[test]
    fn functions_may_overload() {
        let mut table = SymbolTable::new();
        let f1 = Symbol::Function(FunctionSymbol {
            name: "f".into(),
            return_type: Type::void(),
            return_semantic: None,
            parameters: vec![],
            body: None,
            location: Location::default(),
        });
        let f2 = f1.clone();
        table.insert(f1, false).unwrap();
        table.insert(f2, false).unwrap();
        assert_eq!(table.lookup_all("f").len(), 2);
    }
}
