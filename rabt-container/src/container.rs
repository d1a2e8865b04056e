//! # The Container — heart of rabt
//!
//! Owns the binding registry, the singleton cache, the middleware chain and
//! the metadata provider, and orchestrates resolution: lookup → contextual
//! match → cycle guard → scope cache → recursive dependency resolution →
//! construction.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container ──create_scope()──> RequestScope
//! ```
//!
//! # Examples
//! ```rust
//! use rabt_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) { println!("{msg}"); }
//! }
//!
//! let container = Container::builder()
//!     .bind(
//!         Binding::dynamic(ServiceKey::of::<Arc<dyn Logger>>(), || {
//!             Ok(instance(Arc::new(ConsoleLogger) as Arc<dyn Logger>))
//!         })
//!         .in_scope(Scope::Singleton),
//!     )
//!     .build();
//!
//! let logger = container.get::<Arc<dyn Logger>>().expect("failed to resolve");
//! logger.log("container up");
//! ```

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace, warn};

use rabt_support::rendering::suggest_similar;

use crate::binding::{Binding, Instance, Provider, ResolvedDeps, instance};
use crate::cache::{CacheKey, Deferred, SingletonStore};
use crate::context::ResolutionContext;
use crate::error::{
    BoxError, CircularDependencyError, RabtError, Result, UnknownIdentifierError,
};
use crate::key::ServiceKey;
use crate::matcher;
use crate::metadata::{DependencySlot, EmptyMetadata, MetadataProvider};
use crate::middleware::{Middleware, Next, ResolveRequest};
use crate::module::ContainerModule;
use crate::qualifier::{MatchContext, Qualifier};
use crate::registry::Registry;
use crate::scope::Scope;

// ============================================================
// ContainerBuilder
// ============================================================

/// Configures and builds a [`Container`].
///
/// All registration methods are also available on the built container; the
/// builder is the convenient fluent surface for the configuration phase.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .metadata(app_metadata())
///     .constant(AppConfig::load())
///     .bind(Binding::class(key, service, construct).in_scope(Scope::Singleton))
///     .middleware(TimingMiddleware::default())
///     .build();
/// ```
pub struct ContainerBuilder {
    registry: Registry,
    metadata: Arc<dyn MetadataProvider>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            registry: Registry::new(),
            metadata: Arc::new(EmptyMetadata),
            middlewares: Vec::new(),
        }
    }

    /// Sets the metadata provider consulted for class-provider dependency
    /// slots. Defaults to [`EmptyMetadata`] (no dependencies anywhere).
    pub fn metadata(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.metadata = Arc::new(provider);
        self
    }

    /// Registers a binding.
    pub fn bind(mut self, binding: Binding) -> Self {
        self.register(binding);
        self
    }

    /// Registers a pre-built value under its type key, singleton-scoped.
    pub fn constant<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.bind(Binding::constant(ServiceKey::of::<T>(), instance(value)))
    }

    /// Loads a [`ContainerModule`]'s registrations.
    pub fn module(mut self, module: &dyn ContainerModule) -> Self {
        debug!(module = module.name(), "loading container module");
        module.register(&mut self);
        self
    }

    /// Appends a middleware; the first applied is the outermost.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Non-consuming registration, for use inside [`ContainerModule`]s.
    pub fn register(&mut self, binding: Binding) {
        self.registry.register(binding);
    }

    /// Builds the container.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Container {
        info!(
            identifiers = self.registry.len(),
            bindings = self.registry.binding_count(),
            middlewares = self.middlewares.len(),
            "building container"
        );
        Container {
            inner: Arc::new(ContainerInner {
                registry: RwLock::new(self.registry),
                singletons: Arc::new(SingletonStore::new()),
                middlewares: RwLock::new(self.middlewares),
                metadata: self.metadata,
            }),
        }
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Thread-safe dependency injection container.
///
/// Cheap to clone: clones share the same registry, singleton cache and
/// middleware chain. Independent containers never share state.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    registry: RwLock<Registry>,
    singletons: Arc<SingletonStore>,
    middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
    metadata: Arc<dyn MetadataProvider>,
}

impl Container {
    /// Creates a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    // ── Configuration ──

    /// Appends a binding to its identifier's candidate list.
    pub fn register(&self, binding: Binding) {
        self.inner.registry.write().register(binding);
    }

    /// Replaces every binding for the identifier and invalidates its
    /// cached singleton instances.
    pub fn rebind(&self, binding: Binding) {
        let key = binding.key().clone();
        self.inner.registry.write().rebind(binding);
        let dropped = self.inner.singletons.invalidate(&key);
        if dropped > 0 {
            debug!(key = %key, dropped, "invalidated singletons on rebind");
        }
    }

    /// Removes every binding for the identifier and invalidates its cached
    /// singleton instances.
    pub fn unbind(&self, key: &ServiceKey) {
        self.inner.registry.write().unbind(key);
        let dropped = self.inner.singletons.invalidate(key);
        if dropped > 0 {
            debug!(key = %key, dropped, "invalidated singletons on unbind");
        }
    }

    /// Appends a middleware to the chain; the first applied is outermost.
    pub fn apply_middleware(&self, middleware: impl Middleware + 'static) {
        self.inner.middlewares.write().push(Arc::new(middleware));
    }

    /// Releases all cached singleton instances.
    pub fn teardown(&self) {
        let released = self.inner.singletons.len();
        self.inner.singletons.clear();
        debug!(released, "container teardown");
    }

    // ── Resolution ──

    /// Resolves `T` by its type key.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.get_as(&ServiceKey::of::<T>(), &[])
    }

    /// Resolves `T` by its type key with a name qualifier.
    pub fn get_named<T: Send + Sync + 'static>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>> {
        self.get_as(&ServiceKey::of::<T>(), &[Qualifier::named(name)])
    }

    /// Resolves `T` by its type key with a tag qualifier.
    pub fn get_tagged<T: Send + Sync + 'static>(
        &self,
        tag: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>> {
        self.get_as(&ServiceKey::of::<T>(), &[Qualifier::tagged(tag, value)])
    }

    /// Resolves an identifier to a type-erased instance.
    ///
    /// Each call is one top-level request: it gets a fresh resolution
    /// context and runs the middleware chain exactly once.
    #[instrument(skip_all, fields(key = %key))]
    pub fn get_by(&self, key: &ServiceKey, qualifiers: &[Qualifier]) -> Result<Instance> {
        let mut ctx = ResolutionContext::new();
        let request = ResolveRequest::new(key.clone(), qualifiers.to_vec());
        self.dispatch(&mut ctx, &request)
    }

    /// Resolves an identifier and downcasts the instance to `T`.
    pub fn get_as<T: Send + Sync + 'static>(
        &self,
        key: &ServiceKey,
        qualifiers: &[Qualifier],
    ) -> Result<Arc<T>> {
        let found = self.get_by(key, qualifiers)?;
        downcast_instance(key, found)
    }

    /// Resolves every matching binding of an identifier, in registration
    /// order. Ambiguity rules are relaxed: name/tag constraints do not
    /// exclude bindings from an unqualified enumeration.
    pub fn get_all(&self, key: &ServiceKey) -> Result<Vec<Instance>> {
        self.get_all_by(key, &[])
    }

    /// [`get_all`](Container::get_all) with request qualifiers; bindings
    /// are filtered to those strictly matching the qualifiers.
    #[instrument(skip_all, fields(key = %key))]
    pub fn get_all_by(&self, key: &ServiceKey, qualifiers: &[Qualifier]) -> Result<Vec<Instance>> {
        let mut ctx = ResolutionContext::new();
        let candidates = self
            .candidates(key)
            .ok_or_else(|| self.unknown(key, &ctx))?;

        let selected = {
            let mctx = MatchContext {
                key,
                parent: None,
                path: &[],
                qualifiers,
                data: &ctx.data,
            };
            matcher::select_all(&candidates, &mctx)
        };

        let mut resolved = Vec::with_capacity(selected.len());
        for binding in selected {
            // Key each binding's cache entry by its own name/tag set so
            // enumeration and qualified resolution share instances.
            let cache_qualifiers = binding.canonical_qualifiers();
            ctx.guard.enter(key)?;
            let outcome = self.resolve_binding(&mut ctx, &binding, &cache_qualifiers);
            ctx.guard.exit(key);
            resolved.push(outcome?);
        }
        Ok(resolved)
    }

    /// Typed [`get_all`](Container::get_all).
    pub fn get_all_as<T: Send + Sync + 'static>(&self, key: &ServiceKey) -> Result<Vec<Arc<T>>> {
        self.get_all(key)?
            .into_iter()
            .map(|found| downcast_instance(key, found))
            .collect()
    }

    /// Creates a request scope: its resolutions share one request cache and
    /// one ambient data set until the scope is dropped.
    pub fn create_scope(&self) -> RequestScope<'_> {
        debug!("creating request scope");
        RequestScope {
            container: self,
            ctx: Mutex::new(ResolutionContext::new()),
        }
    }

    // ── Internals ──

    /// Runs one top-level request through the middleware chain into the
    /// resolver.
    fn dispatch(&self, ctx: &mut ResolutionContext, request: &ResolveRequest) -> Result<Instance> {
        ctx.guard.reset();
        let chain: Vec<Arc<dyn Middleware>> = self.inner.middlewares.read().clone();
        if chain.is_empty() {
            return self.resolve_in(ctx, &request.key, &request.qualifiers);
        }

        let cell = RefCell::new(ctx);
        let terminal = |req: &ResolveRequest| -> Result<Instance> {
            let mut borrowed = cell.borrow_mut();
            self.resolve_in(&mut **borrowed, &req.key, &req.qualifiers)
        };
        Next::new(&chain, &terminal).run(request)
    }

    /// Resolves one identifier inside an existing context. Entered both by
    /// top-level dispatch and by recursive dependency resolution.
    fn resolve_in(
        &self,
        ctx: &mut ResolutionContext,
        key: &ServiceKey,
        qualifiers: &[Qualifier],
    ) -> Result<Instance> {
        let candidates = self
            .candidates(key)
            .ok_or_else(|| self.unknown(key, ctx))?;

        let binding = {
            let mctx = MatchContext {
                key,
                parent: ctx.guard.parent(),
                path: ctx.guard.path(),
                qualifiers,
                data: &ctx.data,
            };
            matcher::select(&candidates, &mctx)?
        };

        ctx.guard.enter(key)?;
        let resolved = self.resolve_binding(ctx, &binding, qualifiers);
        ctx.guard.exit(key);
        resolved
    }

    /// Applies the binding's scope policy around construction.
    fn resolve_binding(
        &self,
        ctx: &mut ResolutionContext,
        binding: &Arc<Binding>,
        qualifiers: &[Qualifier],
    ) -> Result<Instance> {
        match binding.scope() {
            Scope::Transient => self.construct(ctx, binding),
            Scope::Request => {
                let cache_key = CacheKey::new(binding.key().clone(), qualifiers, binding);
                if let Some(hit) = ctx.cache.get(&cache_key) {
                    trace!(key = %binding.key(), "request cache hit");
                    return Ok(hit);
                }
                let built = self.construct(ctx, binding)?;
                ctx.cache.insert(cache_key, built.clone());
                Ok(built)
            }
            Scope::Singleton => {
                let cache_key = CacheKey::new(binding.key().clone(), qualifiers, binding);
                self.inner
                    .singletons
                    .get_or_create(&cache_key, || self.construct(ctx, binding))
            }
        }
    }

    /// Runs the binding's provider.
    fn construct(&self, ctx: &mut ResolutionContext, binding: &Binding) -> Result<Instance> {
        match binding.provider() {
            Provider::Constant(value) => Ok(value.clone()),
            Provider::Dynamic(produce) => {
                produce().map_err(|source| self.construction_failed(binding.key(), ctx, source))
            }
            Provider::Factory(make) => {
                make(self).map_err(|source| self.construction_failed(binding.key(), ctx, source))
            }
            Provider::Class { service, construct } => {
                let slots = self.inner.metadata.dependencies_of(service);
                trace!(service = %service, slots = slots.len(), "resolving dependency slots");

                let mut resolved = Vec::with_capacity(slots.len());
                for slot in &slots {
                    resolved.push(self.resolve_slot(ctx, binding, slot)?);
                }
                construct(service, ResolvedDeps::new(resolved))
                    .map_err(|source| self.construction_failed(binding.key(), ctx, source))
            }
        }
    }

    /// Resolves one dependency slot, substituting a deferred handle when a
    /// permitted singleton cycle is detected.
    fn resolve_slot(
        &self,
        ctx: &mut ResolutionContext,
        consumer: &Binding,
        slot: &DependencySlot,
    ) -> Result<Instance> {
        let slot_qualifiers = slot.request_qualifiers();

        if ctx.guard.contains(&slot.key) {
            if slot.lazy && consumer.scope() == Scope::Singleton {
                if let Some(target) = self.singleton_bound(ctx, slot, &slot_qualifiers)? {
                    trace!(key = %slot.key, "substituting deferred handle for in-progress singleton");
                    let cache_key = CacheKey::new(slot.key.clone(), &slot_qualifiers, &target);
                    let handle = Deferred::new(Arc::downgrade(&self.inner.singletons), cache_key);
                    return Ok(instance(handle));
                }
            }
            warn!(key = %slot.key, "circular dependency on resolution path");
            return Err(RabtError::CircularDependency(CircularDependencyError {
                chain: ctx.guard.chain_to(&slot.key),
            }));
        }

        self.resolve_in(ctx, &slot.key, &slot_qualifiers)
    }

    /// The slot's matched binding, if it is singleton-scoped. Decides
    /// whether a cycle may be bridged with a deferred handle, and supplies
    /// the identity for the handle's cache key.
    fn singleton_bound(
        &self,
        ctx: &ResolutionContext,
        slot: &DependencySlot,
        qualifiers: &[Qualifier],
    ) -> Result<Option<Arc<Binding>>> {
        let Some(candidates) = self.candidates(&slot.key) else {
            return Ok(None);
        };
        let mctx = MatchContext {
            key: &slot.key,
            parent: ctx.guard.parent(),
            path: ctx.guard.path(),
            qualifiers,
            data: &ctx.data,
        };
        let binding = matcher::select(&candidates, &mctx)?;
        Ok((binding.scope() == Scope::Singleton).then_some(binding))
    }

    fn candidates(&self, key: &ServiceKey) -> Option<Vec<Arc<Binding>>> {
        self.inner.registry.read().candidates(key)
    }

    fn unknown(&self, key: &ServiceKey, ctx: &ResolutionContext) -> RabtError {
        let known = self.inner.registry.read().keys();
        let names: Vec<String> = known
            .iter()
            .map(|k| k.display_name().to_string())
            .collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

        RabtError::UnknownIdentifier(UnknownIdentifierError {
            requested: key.clone(),
            required_by: ctx.guard.parent().cloned(),
            suggestions: suggest_similar(key.display_name(), &name_refs, 3),
        })
    }

    fn construction_failed(
        &self,
        key: &ServiceKey,
        ctx: &ResolutionContext,
        source: BoxError,
    ) -> RabtError {
        RabtError::ConstructionFailed {
            key: key.clone(),
            path: ctx.guard.path().to_vec(),
            source,
        }
    }
}

fn downcast_instance<T: Send + Sync + 'static>(
    key: &ServiceKey,
    found: Instance,
) -> Result<Arc<T>> {
    found.downcast::<T>().map_err(|_| RabtError::ConstructionFailed {
        key: key.clone(),
        path: Vec::new(),
        source: format!(
            "type mismatch: resolved instance is not a {}",
            std::any::type_name::<T>()
        )
        .into(),
    })
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Container")
            .field("identifiers", &registry.len())
            .field("bindings", &registry.binding_count())
            .field("singletons", &self.inner.singletons.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// RequestScope
// ═══════════════════════════════════════════

/// A resolution scope spanning several top-level calls.
///
/// Every `get` through the scope shares one request cache and one ambient
/// data set; the middleware chain still runs once per call. Dropping the
/// scope releases all request-scoped instances.
pub struct RequestScope<'a> {
    container: &'a Container,
    ctx: Mutex<ResolutionContext>,
}

impl RequestScope<'_> {
    /// Resolves `T` by its type key within this scope.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.get_as(&ServiceKey::of::<T>(), &[])
    }

    /// Resolves an identifier within this scope.
    pub fn get_by(&self, key: &ServiceKey, qualifiers: &[Qualifier]) -> Result<Instance> {
        let mut ctx = self.ctx.lock();
        let request = ResolveRequest::new(key.clone(), qualifiers.to_vec());
        self.container.dispatch(&mut ctx, &request)
    }

    /// Resolves an identifier within this scope and downcasts to `T`.
    pub fn get_as<T: Send + Sync + 'static>(
        &self,
        key: &ServiceKey,
        qualifiers: &[Qualifier],
    ) -> Result<Arc<T>> {
        let found = self.get_by(key, qualifiers)?;
        downcast_instance(key, found)
    }

    /// Attaches an ambient typed value visible to condition predicates on
    /// every resolution made through this scope.
    pub fn insert_data<T: Send + Sync + 'static>(&self, value: T) {
        self.ctx.lock().data.insert(value);
    }
}

impl fmt::Debug for RequestScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScope")
            .field("cached", &self.ctx.lock().cache.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, RequestScope};
    pub use crate::binding::{Binding, Instance, ResolvedDeps, instance};
    pub use crate::cache::Deferred;
    pub use crate::error::{BoxError, RabtError, Result};
    pub use crate::key::ServiceKey;
    pub use crate::metadata::{DependencySlot, EmptyMetadata, MetadataProvider, StaticMetadata};
    pub use crate::middleware::{Middleware, Next, ResolveRequest};
    pub use crate::module::ContainerModule;
    pub use crate::qualifier::{Constraint, MatchContext, Qualifier};
    pub use crate::scope::Scope;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
