//! Global symbol table of a shader.
//!
//! Maps the names of global variables and functions to their handles in
//! one [`ShaderIr`]. Built once per compiled unit and once per linked
//! shader; local scopes never appear here.

use alloc::{collections::BTreeMap, string::String};

use lpc_glir::{Func, Item, ShaderIr, Var};

/// Global-scope names of one shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    /// Global variables indexed by name
    variables: BTreeMap<String, Var>,
    /// Functions indexed by name
    functions: BTreeMap<String, Func>,
}

impl SymbolTable {
    /// Create an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every top-level declaration of `ir`.
    ///
    /// When a name is declared twice the first declaration wins.
    pub fn from_ir(ir: &ShaderIr) -> Self {
        let mut table = Self::new();
        for item in &ir.items {
            match item {
                Item::Variable(var) => {
                    table.add_variable(&ir.vars[*var].name, *var);
                }
                Item::Function(func) => {
                    table.add_function(&ir.funcs[*func].name, *func);
                }
                Item::Inst(_) => {}
            }
        }
        table
    }

    /// Add a variable. Returns `false` if the name is already taken.
    pub fn add_variable(&mut self, name: &str, var: Var) -> bool {
        if self.variables.contains_key(name) {
            return false;
        }
        self.variables.insert(String::from(name), var);
        true
    }

    /// Add a function. Returns `false` if the name is already taken.
    pub fn add_function(&mut self, name: &str, func: Func) -> bool {
        if self.functions.contains_key(name) {
            return false;
        }
        self.functions.insert(String::from(name), func);
        true
    }

    /// Look up a global variable.
    pub fn get_variable(&self, name: &str) -> Option<Var> {
        self.variables.get(name).copied()
    }

    /// Look up a function.
    pub fn get_function(&self, name: &str) -> Option<Func> {
        self.functions.get(name).copied()
    }

    /// Variables in name order.
    pub fn variables(&self) -> impl Iterator<Item = (&str, Var)> {
        self.variables.iter().map(|(name, var)| (name.as_str(), *var))
    }

    /// Functions in name order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, Func)> {
        self.functions.iter().map(|(name, func)| (name.as_str(), *func))
    }
}
