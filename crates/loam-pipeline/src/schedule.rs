//! The pipeline manifest and its hook schedule.
//!
//! A [`PipelineManifest`] is built once per run and is immutable afterwards.
//! Hook schedules (the ordered subset of plugins implementing a given hook)
//! are derived lazily and cached inside the manifest; a new manifest is a
//! fresh cache namespace, so cache entries are only ever invalidated by
//! rebuilding the manifest wholesale.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::plugin::{HookHandler, HookOrder, SharedPlugin, handler_of};

/// The final ordered plugin list for one run, plus its hook-schedule cache.
pub struct PipelineManifest {
    plugins: Vec<SharedPlugin>,
    schedule: RwLock<FxHashMap<String, Arc<[SharedPlugin]>>>,
}

impl PipelineManifest {
    /// Wrap an already-ordered plugin list.
    pub fn new(plugins: Vec<SharedPlugin>) -> Self {
        Self {
            plugins,
            schedule: RwLock::new(FxHashMap::default()),
        }
    }

    /// The full ordered plugin list.
    pub fn plugins(&self) -> &[SharedPlugin] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// The ordered subset of plugins implementing `hook`.
    ///
    /// All `Pre`-tagged implementers precede untagged ones, which precede
    /// all `Post`-tagged implementers; within a tier, order matches the
    /// manifest. Results are cached per hook name for the lifetime of the
    /// manifest; concurrent readers share one cached slice.
    pub fn sorted_plugins(&self, hook: &str) -> Arc<[SharedPlugin]> {
        if let Some(cached) = self.schedule.read().get(hook) {
            return Arc::clone(cached);
        }

        let sorted: Arc<[SharedPlugin]> = sort_for_hook(&self.plugins, hook).into();
        Arc::clone(
            self.schedule
                .write()
                .entry(hook.to_owned())
                .or_insert(sorted),
        )
    }

    /// The normalized handlers for `hook`, in schedule order.
    pub fn sorted_handlers(&self, hook: &str) -> Vec<HookHandler> {
        self.sorted_plugins(hook)
            .iter()
            .filter_map(|plugin| plugin.hook(hook))
            .map(handler_of)
            .collect()
    }
}

impl fmt::Debug for PipelineManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| p.name()))
            .finish()
    }
}

/// Three-way stable partition of the manifest by hook tier.
fn sort_for_hook(plugins: &[SharedPlugin], hook: &str) -> Vec<SharedPlugin> {
    let mut pre = Vec::new();
    let mut normal = Vec::new();
    let mut post = Vec::new();

    for plugin in plugins {
        let Some(implementation) = plugin.hook(hook) else {
            continue;
        };
        match implementation.order() {
            Some(HookOrder::Pre) => pre.push(Arc::clone(plugin)),
            None => normal.push(Arc::clone(plugin)),
            Some(HookOrder::Post) => post.push(Arc::clone(plugin)),
        }
    }

    pre.extend(normal);
    pre.extend(post);
    pre
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{HookContext, PluginDescriptor};
    use crate::assemble::RunMode;

    fn plugin(name: &str, order: Option<HookOrder>) -> SharedPlugin {
        let descriptor = match order {
            None => PluginDescriptor::new(name).with_hook("transform", |_cx| Ok(())),
            Some(order) => {
                PluginDescriptor::new(name).with_ordered_hook("transform", order, |_cx| Ok(()))
            }
        };
        descriptor.into_shared()
    }

    fn names(plugins: &[SharedPlugin]) -> Vec<&str> {
        plugins.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn tiers_are_monotone() {
        let manifest = PipelineManifest::new(vec![
            plugin("n1", None),
            plugin("post1", Some(HookOrder::Post)),
            plugin("pre1", Some(HookOrder::Pre)),
            plugin("n2", None),
            plugin("pre2", Some(HookOrder::Pre)),
            plugin("post2", Some(HookOrder::Post)),
        ]);

        let sorted = manifest.sorted_plugins("transform");
        assert_eq!(
            names(&sorted),
            ["pre1", "pre2", "n1", "n2", "post1", "post2"]
        );
    }

    #[test]
    fn tiers_preserve_manifest_order_internally() {
        let manifest = PipelineManifest::new(vec![
            plugin("z", Some(HookOrder::Pre)),
            plugin("a", Some(HookOrder::Pre)),
            plugin("m", Some(HookOrder::Pre)),
        ]);

        // Stability: manifest order, not name order.
        assert_eq!(names(&manifest.sorted_plugins("transform")), ["z", "a", "m"]);
    }

    #[test]
    fn non_implementers_are_filtered() {
        let silent = PluginDescriptor::new("silent").into_shared();
        let manifest = PipelineManifest::new(vec![silent, plugin("loud", None)]);

        assert_eq!(names(&manifest.sorted_plugins("transform")), ["loud"]);
        assert!(manifest.sorted_plugins("load").is_empty());
    }

    #[test]
    fn schedule_is_cached_per_hook() {
        let manifest = PipelineManifest::new(vec![plugin("a", None), plugin("b", None)]);

        let first = manifest.sorted_plugins("transform");
        let second = manifest.sorted_plugins("transform");
        assert!(Arc::ptr_eq(&first, &second));

        // A new manifest is a fresh cache namespace.
        let rebuilt = PipelineManifest::new(manifest.plugins().to_vec());
        let third = rebuilt.sorted_plugins("transform");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(names(&first), names(&third));
    }

    #[test]
    fn sorted_handlers_are_invocable_in_order() {
        use std::sync::Mutex;

        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let record = |label: &'static str| {
            let seen = Arc::clone(&seen);
            move |_cx: &mut HookContext| {
                seen.lock().unwrap().push(label);
                Ok(())
            }
        };

        let manifest = PipelineManifest::new(vec![
            PluginDescriptor::new("late")
                .with_ordered_hook("buildStart", HookOrder::Post, record("late"))
                .into_shared(),
            PluginDescriptor::new("early")
                .with_ordered_hook("buildStart", HookOrder::Pre, record("early"))
                .into_shared(),
            PluginDescriptor::new("middle")
                .with_hook("buildStart", record("middle"))
                .into_shared(),
        ]);

        let mut cx = HookContext {
            mode: RunMode::Serve,
        };
        for handler in manifest.sorted_handlers("buildStart") {
            handler(&mut cx).unwrap();
        }

        assert_eq!(*seen.lock().unwrap(), ["early", "middle", "late"]);
    }
}
