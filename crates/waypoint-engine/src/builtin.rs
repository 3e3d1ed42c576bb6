use futures::future::BoxFuture;

use waypoint_core::{Action, ActionConfig, ActionKind, ExecutionContext, Result, WaypointError};

/// An action declared in `waypoint.toml` rather than in host code.
#[derive(Debug, Clone)]
pub struct ConfiguredAction {
    config: ActionConfig,
}

impl ConfiguredAction {
    pub fn new(config: ActionConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn apply(&self, ctx: &mut ExecutionContext) -> Result<()> {
        match &self.config.kind {
            ActionKind::Noop => Ok(()),
            ActionKind::Assign { values } => {
                for (key, value) in values {
                    ctx.set(key.clone(), value.clone());
                }
                Ok(())
            }
            ActionKind::Remove { keys } => {
                for key in keys {
                    ctx.remove(key);
                }
                Ok(())
            }
            ActionKind::Fail { message } => {
                Err(WaypointError::action(self.config.name.clone(), message.clone()))
            }
        }
    }
}

impl Action for ConfiguredAction {
    fn invoke<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.apply(ctx) })
    }
}
