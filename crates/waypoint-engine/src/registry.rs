use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use waypoint_core::{Action, ActionConfig, ExecutionContext, Result};

use crate::builtin::ConfiguredAction;

/// Registry of actions, keyed by the name blueprints refer to.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Register an action under a name, replacing any previous binding.
    pub fn register(&mut self, name: impl Into<String>, action: impl Action) {
        self.actions.insert(name.into(), Arc::new(action));
    }

    /// Register a synchronous closure as an action.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut ExecutionContext) -> Result<()> + Send + Sync + 'static,
    {
        self.register(name, FnAction(f));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, action: impl Action) -> Self {
        self.register(name, action);
        self
    }

    /// Unregister an action by name.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.actions.remove(name).is_some()
    }

    /// Get an action by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// List all registered action names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Create a registry holding the declared actions from configuration.
    pub fn from_config(actions: &[ActionConfig]) -> Self {
        let mut registry = Self::new();
        for action in actions {
            registry.register(action.name.clone(), ConfiguredAction::new(action.clone()));
        }
        registry
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.list())
            .finish()
    }
}

/// Adapter turning a closure into an [`Action`].
pub struct FnAction<F>(pub F);

impl<F> Action for FnAction<F>
where
    F: Fn(&mut ExecutionContext) -> Result<()> + Send + Sync + 'static,
{
    fn invoke<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { (self.0)(ctx) })
    }
}
