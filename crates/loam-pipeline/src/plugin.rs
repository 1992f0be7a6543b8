//! Plugin descriptors and their hook capability bags.
//!
//! A plugin is an opaque unit of behavior: a stable name plus zero or more
//! named hook implementations. Descriptors are immutable once constructed;
//! reordering only ever touches the containing list.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::assemble::RunMode;

/// Scheduling tier for a hook implementation.
///
/// Within one hook name, all `Pre` implementers run before untagged ones,
/// which run before all `Post` implementers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookOrder {
    Pre,
    Post,
}

/// Context handed to hook handlers by whoever invokes them.
#[derive(Debug, Clone, Copy)]
pub struct HookContext {
    /// The run mode the containing manifest was assembled for.
    pub mode: RunMode,
}

/// Shared hook handler. Hook bodies are externally authored and opaque to
/// the scheduler, so failures cross this boundary as `anyhow::Error`.
pub type HookHandler = Arc<dyn Fn(&mut HookContext) -> anyhow::Result<()> + Send + Sync>;

/// A hook implementation carried by a plugin: either a bare handler, or a
/// handler tagged with an explicit scheduling tier.
#[derive(Clone)]
pub enum HookImpl {
    Bare(HookHandler),
    Ordered(HookOrder, HookHandler),
}

impl HookImpl {
    /// The scheduling tier, if one was declared.
    pub fn order(&self) -> Option<HookOrder> {
        match self {
            HookImpl::Bare(_) => None,
            HookImpl::Ordered(order, _) => Some(*order),
        }
    }

    /// Borrow the underlying handler, ignoring any tier metadata.
    pub fn handler(&self) -> &HookHandler {
        match self {
            HookImpl::Bare(handler) | HookImpl::Ordered(_, handler) => handler,
        }
    }
}

impl fmt::Debug for HookImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookImpl::Bare(_) => f.write_str("Bare(..)"),
            HookImpl::Ordered(order, _) => write!(f, "Ordered({order:?}, ..)"),
        }
    }
}

/// Normalize a hook value into its bare handler.
///
/// Already-bare handlers pass through unchanged; tier metadata is dropped,
/// never consulted.
pub fn handler_of(hook: &HookImpl) -> HookHandler {
    Arc::clone(hook.handler())
}

/// Shared, immutable plugin value. Manifests and schedules hold these.
pub type SharedPlugin = Arc<PluginDescriptor>;

/// An opaque plugin: a stable name and a map from hook name to
/// implementation.
#[derive(Clone)]
pub struct PluginDescriptor {
    name: String,
    hooks: FxHashMap<String, HookImpl>,
}

impl PluginDescriptor {
    /// Create a descriptor with no hooks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: FxHashMap::default(),
        }
    }

    /// Attach a bare (untagged) hook implementation.
    pub fn with_hook<F>(mut self, hook: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.insert(hook.into(), HookImpl::Bare(Arc::new(handler)));
        self
    }

    /// Attach a hook implementation tagged with a scheduling tier.
    pub fn with_ordered_hook<F>(
        mut self,
        hook: impl Into<String>,
        order: HookOrder,
        handler: F,
    ) -> Self
    where
        F: Fn(&mut HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks
            .insert(hook.into(), HookImpl::Ordered(order, Arc::new(handler)));
        self
    }

    /// The plugin's stable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up this plugin's implementation of a named hook.
    pub fn hook(&self, name: &str) -> Option<&HookImpl> {
        self.hooks.get(name)
    }

    /// Whether this plugin implements the named hook at all.
    pub fn implements(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Wrap into the shared form used by manifests.
    pub fn into_shared(self) -> SharedPlugin {
        Arc::new(self)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hooks: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
        hooks.sort_unstable();
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("hooks", &hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_cx: &mut HookContext) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn handler_of_preserves_bare_handlers() {
        let plugin = PluginDescriptor::new("p").with_hook("transform", noop);
        let hook = plugin.hook("transform").unwrap();
        assert!(hook.order().is_none());

        let normalized = handler_of(hook);
        assert!(Arc::ptr_eq(hook.handler(), &normalized));
    }

    #[test]
    fn handler_of_unwraps_ordered_hooks() {
        let plugin = PluginDescriptor::new("p").with_ordered_hook("transform", HookOrder::Pre, noop);
        let hook = plugin.hook("transform").unwrap();
        assert_eq!(hook.order(), Some(HookOrder::Pre));

        let mut cx = HookContext {
            mode: RunMode::Build,
        };
        assert!(handler_of(hook)(&mut cx).is_ok());
    }

    #[test]
    fn hook_lookup_misses_are_none() {
        let plugin = PluginDescriptor::new("p").with_hook("load", noop);
        assert!(plugin.implements("load"));
        assert!(!plugin.implements("transform"));
        assert!(plugin.hook("transform").is_none());
    }
}
