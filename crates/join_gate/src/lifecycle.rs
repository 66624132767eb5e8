use crate::level::TransitionContext;

/// Host lifecycle callback, as delivered by whatever hooks the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    TransitionBegin(TransitionContext),
    TransitionResolved(TransitionContext),
    LevelReady,
}

/// Consumer of level lifecycle callbacks.
///
/// Per real transition each callback fires at most once and in declaration
/// order, but `on_level_ready` may arrive arbitrarily late or never.
pub trait LevelLifecycleEvents {
    fn on_transition_begin(&mut self, ctx: TransitionContext);
    fn on_transition_resolved(&mut self, ctx: TransitionContext);
    fn on_level_ready(&mut self);

    fn handle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::TransitionBegin(ctx) => self.on_transition_begin(ctx),
            LifecycleEvent::TransitionResolved(ctx) => self.on_transition_resolved(ctx),
            LifecycleEvent::LevelReady => self.on_level_ready(),
        }
    }
}
