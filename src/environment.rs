use crate::types::Value;
use std::collections::{BTreeSet, HashMap};
use std::f64::consts;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("cannot assign to constant {0}")]
    CannotAssignToConstant(String),
    #[error("{0} is already bound in this scope")]
    AlreadyBound(String),
}

/// Index of a scope in the environment's arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone)]
struct Scope {
    store: HashMap<String, Value>,
    constants: HashMap<String, Value>,
    parent: Option<ScopeId>,
}

impl Scope {
    fn new(parent: Option<ScopeId>) -> Self {
        let constants = HashMap::from([
            ("pi".to_string(), Value::Float(consts::PI)),
            ("e".to_string(), Value::Float(consts::E)),
        ]);
        Scope {
            store: HashMap::new(),
            constants,
            parent,
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.store.get(name).or_else(|| self.constants.get(name))
    }
}

/// Variable bindings, organised as a chain of scopes stored in an arena.
///
/// Every scope starts with the constants `pi` and `e`. Lookups walk from the
/// current scope out to the global one; writes only ever touch the current
/// scope.
#[derive(Debug, Clone)]
pub struct Environment {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Creates an environment holding only the global scope.
    pub fn new() -> Self {
        Environment {
            scopes: vec![Scope::new(None)],
            current: ScopeId(0),
        }
    }

    #[cfg(test)]
    fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    #[cfg(test)]
    fn current(&self) -> ScopeId {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// Opens a child of the current scope and makes it current.
    pub fn enter_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(Some(self.current)));
        self.current = id;
        id
    }

    /// Returns to the parent scope, discarding the exited one when it is the
    /// newest. Does nothing at global scope and returns `None`.
    pub fn exit_scope(&mut self) -> Option<ScopeId> {
        let exited = self.current;
        let parent = self.scopes[exited.0].parent?;
        if exited.0 + 1 == self.scopes.len() {
            self.scopes.pop();
        }
        self.current = parent;
        Some(parent)
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    fn current_scope_mut(&mut self) -> &mut Scope {
        &mut self.scopes[self.current.0]
    }

    // Current scope first, then each parent out to the global scope.
    fn chain(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self.scope(self.current)), |scope| {
            scope.parent.map(|id| self.scope(id))
        })
    }

    /// Looks a name up: local store, then local constants, then the parents.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.chain().find_map(|scope| scope.lookup(name))
    }

    /// Binds or rebinds a mutable variable in the current scope.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), EnvError> {
        if self.is_constant(name) {
            return Err(EnvError::CannotAssignToConstant(name.to_string()));
        }
        self.current_scope_mut()
            .store
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Binds a constant in the current scope. The name must be unbound there.
    pub fn set_constant(&mut self, name: &str, value: Value) -> Result<(), EnvError> {
        if self.is_constant(name) {
            return Err(EnvError::CannotAssignToConstant(name.to_string()));
        }
        let scope = self.current_scope_mut();
        if scope.store.contains_key(name) {
            return Err(EnvError::AlreadyBound(name.to_string()));
        }
        scope.constants.insert(name.to_string(), value);
        Ok(())
    }

    /// Whether `name` is a constant of the current scope. Constants of outer
    /// scopes can still be shadowed.
    pub fn is_constant(&self, name: &str) -> bool {
        self.scope(self.current).constants.contains_key(name)
    }

    /// Every name visible from the current scope, sorted.
    pub fn identifiers(&self) -> BTreeSet<String> {
        self.chain()
            .flat_map(|scope| scope.store.keys().chain(scope.constants.keys()))
            .cloned()
            .collect()
    }
}
