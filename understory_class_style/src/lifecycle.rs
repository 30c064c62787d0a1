// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glue between a host framework's component lifecycle and style binders.
//!
//! The host describes its components through [`Component`] and its plugin
//! mechanism through [`PluginHost`]. Installing a [`StylePlugin`] registers a
//! [`StyleRuntime`] as the host's [`LifecycleHooks`]; from then on the host
//! calls the hooks and the runtime keeps one [`StyleBinder`] per styled
//! component.
//!
//! Invalidations are queued and coalesced: the host reports every reactive
//! change with [`LifecycleHooks::invalidated`] and calls
//! [`LifecycleHooks::flush`] once per tick, which recomputes each invalidated
//! component exactly once.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Ref, RefCell};
use core::fmt;

use hashbrown::HashMap;
use understory_class_registry::{RegistryBuilder, StyleDocument, StyleRegistry};

use crate::binder::{Reconciled, StyleBinder, UpdateStrategy};
use crate::declaration::StyleDeclaration;
use crate::error::StyleError;
use crate::queue::UpdateQueue;
use crate::style_map::StyleMap;

/// Event emitted on a component after every completed style update.
pub const STYLE_CHANGE_EVENT: &str = "styleChange";

/// Name the plugin is registered under with its [`PluginHost`].
pub const PLUGIN_NAME: &str = "understory_class_style";

/// Host-assigned identity of a component instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

/// A component instance as seen by the style runtime.
pub trait Component {
    /// Returns the instance's identity. It must not change while mounted.
    fn id(&self) -> ComponentId;

    /// Returns the instance's style declaration, if it has one.
    ///
    /// Called once per mount. Components without a declaration are left
    /// alone.
    fn style_declaration(&self) -> Option<Rc<dyn StyleDeclaration>>;

    /// Makes `map` the instance's read-only `$style` data source.
    fn expose_style_map(&mut self, map: StyleMap);

    /// Emits `event` on the instance for external observers.
    fn emit(&mut self, event: &str);

    /// Forwards a style failure to the host's error channel.
    fn report_error(&mut self, error: StyleError);
}

/// Resolves component ids to live instances during a [`flush`](LifecycleHooks::flush).
pub trait ComponentLookup {
    /// Returns the live component with `id`.
    fn component_mut(&mut self, id: ComponentId) -> Option<&mut dyn Component>;
}

/// The hook set a host framework calls for every component.
pub trait LifecycleHooks {
    /// The component was mounted.
    fn mounted(&self, component: &mut dyn Component);

    /// Reactive state read by the component's style declaration changed.
    fn invalidated(&self, id: ComponentId);

    /// Recomputes invalidated components. Called once per tick.
    fn flush(&self, components: &mut dyn ComponentLookup);

    /// Recomputes the component's style right away.
    fn updated(&self, component: &mut dyn Component);

    /// The component is being destroyed.
    fn destroyed(&self, component: &mut dyn Component);
}

/// A host framework's plugin registry, one per application root.
pub trait PluginHost {
    /// Returns `true` if a plugin named `name` is installed.
    fn has_plugin(&self, name: &str) -> bool;

    /// Registers `hooks` under `name` as a global hook set.
    fn add_plugin(&mut self, name: &'static str, hooks: Rc<dyn LifecycleHooks>);
}

/// Builder and install entry point for the style plugin.
///
/// # Example
///
/// ```rust
/// use std::rc::Rc;
///
/// use understory_class_registry::MemoryDocument;
/// use understory_class_style::{
///     Installation, LifecycleHooks, PluginHost, StylePlugin, UpdateStrategy,
/// };
///
/// #[derive(Default)]
/// struct App {
///     plugins: Vec<(&'static str, Rc<dyn LifecycleHooks>)>,
/// }
///
/// impl PluginHost for App {
///     fn has_plugin(&self, name: &str) -> bool {
///         self.plugins.iter().any(|(n, _)| *n == name)
///     }
///
///     fn add_plugin(&mut self, name: &'static str, hooks: Rc<dyn LifecycleHooks>) {
///         self.plugins.push((name, hooks));
///     }
/// }
///
/// let mut app = App::default();
/// let first = StylePlugin::new(MemoryDocument::new())
///     .class_prefix("app-")
///     .update_strategy(UpdateStrategy::InPlace)
///     .install(&mut app);
/// assert!(matches!(first, Installation::Installed(_)));
///
/// let second = StylePlugin::new(MemoryDocument::new()).install(&mut app);
/// assert!(matches!(second, Installation::AlreadyInstalled));
/// assert_eq!(app.plugins.len(), 1);
/// ```
#[derive(Debug)]
pub struct StylePlugin<D: StyleDocument> {
    document: D,
    registry: RegistryBuilder,
    strategy: UpdateStrategy,
}

/// Outcome of [`StylePlugin::install`].
pub enum Installation<D: StyleDocument> {
    /// The plugin was registered; the runtime is shared with the host.
    Installed(Rc<StyleRuntime<D>>),
    /// The host already had the plugin. Nothing was registered.
    AlreadyInstalled,
}

impl<D: StyleDocument + 'static> StylePlugin<D> {
    /// Creates a plugin that injects its rules into `document`.
    #[must_use]
    pub fn new(document: D) -> Self {
        Self {
            document,
            registry: RegistryBuilder::new(),
            strategy: UpdateStrategy::default(),
        }
    }

    /// Sets the prefix of generated class names.
    #[must_use]
    pub fn class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.registry = self.registry.class_prefix(prefix);
        self
    }

    /// Sets how changed keys get their new class.
    #[must_use]
    pub fn update_strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builds the runtime without registering it anywhere.
    ///
    /// # Panics
    ///
    /// Panics if the class prefix is invalid, see [`RegistryBuilder::build`].
    #[must_use]
    pub fn build(self) -> StyleRuntime<D> {
        StyleRuntime {
            state: RefCell::new(RuntimeState {
                registry: self.registry.build(self.document),
                binders: HashMap::new(),
                queue: UpdateQueue::new(),
                strategy: self.strategy,
            }),
        }
    }

    /// Registers the runtime with `host` unless it is already installed there.
    ///
    /// Installing twice on the same host is a no-op, so neither the hooks nor
    /// the injected sheet are duplicated.
    ///
    /// # Panics
    ///
    /// Panics if the class prefix is invalid, see [`RegistryBuilder::build`].
    pub fn install<H: PluginHost + ?Sized>(self, host: &mut H) -> Installation<D> {
        if host.has_plugin(PLUGIN_NAME) {
            tracing::debug!("style plugin already installed");
            return Installation::AlreadyInstalled;
        }
        let runtime = Rc::new(self.build());
        host.add_plugin(PLUGIN_NAME, runtime.clone());
        Installation::Installed(runtime)
    }
}

/// Installs the style plugin with default settings.
///
/// Shorthand for `StylePlugin::new(document).install(host)`.
pub fn install<H, D>(host: &mut H, document: D) -> Installation<D>
where
    H: PluginHost + ?Sized,
    D: StyleDocument + 'static,
{
    StylePlugin::new(document).install(host)
}

struct RuntimeState<D: StyleDocument> {
    registry: StyleRegistry<D>,
    binders: HashMap<ComponentId, StyleBinder>,
    queue: UpdateQueue<ComponentId>,
    strategy: UpdateStrategy,
}

/// The lifecycle hook set installed by [`StylePlugin`].
///
/// Owns the document's [`StyleRegistry`] and the binder of every mounted,
/// styled component. Hooks take `&self`; state lives behind a `RefCell` that
/// is never borrowed while a component callback runs, so components may
/// call back into the runtime from `emit` or `report_error`.
pub struct StyleRuntime<D: StyleDocument> {
    state: RefCell<RuntimeState<D>>,
}

impl<D: StyleDocument> StyleRuntime<D> {
    /// Returns the registry.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a hook that is mutating the registry.
    #[must_use]
    pub fn registry(&self) -> Ref<'_, StyleRegistry<D>> {
        Ref::map(self.state.borrow(), |state| &state.registry)
    }

    /// Returns the published style map of a mounted component.
    #[must_use]
    pub fn style_map(&self, id: ComponentId) -> Option<StyleMap> {
        let state = self.state.borrow();
        state.binders.get(&id).map(|b| b.style_map().clone())
    }

    /// Returns the number of components with a bound style.
    #[must_use]
    pub fn bound_components(&self) -> usize {
        self.state.borrow().binders.len()
    }

    /// Returns the number of components waiting for the next flush.
    #[must_use]
    pub fn pending_updates(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Returns the update strategy.
    #[must_use]
    pub fn update_strategy(&self) -> UpdateStrategy {
        self.state.borrow().strategy
    }

    fn recompute(&self, component: &mut dyn Component) {
        let id = component.id();
        let outcome = {
            let mut state = self.state.borrow_mut();
            let RuntimeState {
                registry,
                binders,
                queue,
                ..
            } = &mut *state;
            queue.remove(id);
            let Some(binder) = binders.get_mut(&id) else {
                return;
            };
            binder.update(registry)
        };
        if deliver(component, outcome) {
            component.emit(STYLE_CHANGE_EVENT);
        }
    }
}

/// Hands a mount or update outcome to the component. Returns `true` if a new
/// map was published.
fn deliver(component: &mut dyn Component, outcome: Result<Reconciled, StyleError>) -> bool {
    match outcome {
        Ok(Reconciled {
            style_map,
            rejected,
        }) => {
            component.expose_style_map(style_map);
            for err in rejected {
                component.report_error(err.into());
            }
            true
        }
        Err(err) => {
            component.report_error(err);
            false
        }
    }
}

impl<D: StyleDocument> LifecycleHooks for StyleRuntime<D> {
    fn mounted(&self, component: &mut dyn Component) {
        let Some(declaration) = component.style_declaration() else {
            return;
        };
        let id = component.id();
        let (outcome, published) = {
            let mut state = self.state.borrow_mut();
            let RuntimeState {
                registry,
                binders,
                strategy,
                ..
            } = &mut *state;
            let binder = binders.entry(id).or_insert_with(|| {
                tracing::trace!(component = id.0, "binding style declaration");
                StyleBinder::with_strategy(declaration, *strategy)
            });
            let outcome = binder.mount(registry);
            (outcome, binder.style_map().clone())
        };
        if outcome.is_err() {
            // A failed mount still publishes its (empty) map.
            component.expose_style_map(published);
        }
        deliver(component, outcome);
    }

    fn invalidated(&self, id: ComponentId) {
        let mut state = self.state.borrow_mut();
        if state.binders.contains_key(&id) {
            state.queue.mark(id);
        }
    }

    fn flush(&self, components: &mut dyn ComponentLookup) {
        let pending: Vec<ComponentId> = self.state.borrow_mut().queue.drain().collect();
        for id in pending {
            match components.component_mut(id) {
                Some(component) => self.recompute(component),
                None => tracing::debug!(component = id.0, "invalidated component is gone"),
            }
        }
    }

    fn updated(&self, component: &mut dyn Component) {
        self.recompute(component);
    }

    fn destroyed(&self, component: &mut dyn Component) {
        let id = component.id();
        let mut state = self.state.borrow_mut();
        let RuntimeState {
            registry,
            binders,
            queue,
            ..
        } = &mut *state;
        queue.remove(id);
        if let Some(mut binder) = binders.remove(&id) {
            binder.unmount(registry);
        }
    }
}

impl<D> fmt::Debug for Installation<D>
where
    D: StyleDocument + fmt::Debug,
    D::Sheet: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed(runtime) => f.debug_tuple("Installed").field(runtime).finish(),
            Self::AlreadyInstalled => f.write_str("AlreadyInstalled"),
        }
    }
}

impl<D> fmt::Debug for StyleRuntime<D>
where
    D: StyleDocument + fmt::Debug,
    D::Sheet: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("StyleRuntime")
                .field("registry", &state.registry)
                .field("binders", &state.binders.len())
                .field("queue", &state.queue)
                .field("strategy", &state.strategy)
                .finish(),
            Err(_) => f.write_str("StyleRuntime { <borrowed> }"),
        }
    }
}
