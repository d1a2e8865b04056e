//! Middleware pipeline around top-level resolution.
//!
//! Interceptors compose continuation-style: each receives the request and a
//! [`Next`] handle over the rest of the chain, ending at the resolver. The
//! first middleware applied is the outermost. Returning without calling
//! `next.run` short-circuits resolution (overrides, mocking, auditing).

use std::sync::Arc;

use tracing::trace;

use crate::binding::Instance;
use crate::error::Result;
use crate::key::ServiceKey;
use crate::qualifier::Qualifier;

/// The top-level request traveling through the chain.
#[derive(Clone, Debug)]
pub struct ResolveRequest {
    pub key: ServiceKey,
    pub qualifiers: Vec<Qualifier>,
}

impl ResolveRequest {
    pub fn new(key: ServiceKey, qualifiers: Vec<Qualifier>) -> Self {
        Self { key, qualifiers }
    }
}

/// An interceptor wrapping the resolve operation.
pub trait Middleware: Send + Sync {
    /// Handles the request. Call `next.run(request)` to continue the chain;
    /// omit it to short-circuit with your own result.
    fn around(&self, request: &ResolveRequest, next: Next<'_>) -> Result<Instance>;

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The terminal of a chain: the resolver entry itself.
pub(crate) type Terminal<'a> = &'a dyn Fn(&ResolveRequest) -> Result<Instance>;

/// Continuation over the remaining interceptors.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    terminal: Terminal<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], terminal: Terminal<'a>) -> Self {
        Self { chain, terminal }
    }

    /// Invokes the rest of the chain and, ultimately, the resolver.
    pub fn run(self, request: &ResolveRequest) -> Result<Instance> {
        match self.chain.split_first() {
            Some((head, rest)) => {
                trace!(middleware = head.name(), key = %request.key, "entering middleware");
                head.around(request, Next::new(rest, self.terminal))
            }
            None => (self.terminal)(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::instance;
    use parking_lot::Mutex;

    struct Labeling {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Labeling {
        fn around(&self, request: &ResolveRequest, next: Next<'_>) -> Result<Instance> {
            self.log.lock().push(format!("{}:before", self.label));
            let result = next.run(request);
            self.log.lock().push(format!("{}:after", self.label));
            result
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn around(&self, _request: &ResolveRequest, _next: Next<'_>) -> Result<Instance> {
            Ok(instance("mock"))
        }
    }

    fn request() -> ResolveRequest {
        ResolveRequest::new(ServiceKey::symbol("Svc"), vec![])
    }

    #[test]
    fn chain_runs_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Labeling { label: "outer", log: log.clone() }),
            Arc::new(Labeling { label: "inner", log: log.clone() }),
        ];
        let terminal = |_: &ResolveRequest| -> Result<Instance> {
            log.lock().push("terminal".to_string());
            Ok(instance(()))
        };

        Next::new(&chain, &terminal).run(&request()).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["outer:before", "inner:before", "terminal", "inner:after", "outer:after"]
        );
    }

    #[test]
    fn empty_chain_hits_terminal() {
        let chain: Vec<Arc<dyn Middleware>> = vec![];
        let terminal =
            |_: &ResolveRequest| -> Result<Instance> { Ok(instance(1u8)) };

        let out = Next::new(&chain, &terminal).run(&request()).unwrap();
        assert_eq!(*out.downcast::<u8>().unwrap(), 1);
    }

    #[test]
    fn short_circuit_never_reaches_terminal() {
        let reached = Arc::new(Mutex::new(false));
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(ShortCircuit)];
        let reached_inner = reached.clone();
        let terminal = move |_: &ResolveRequest| -> Result<Instance> {
            *reached_inner.lock() = true;
            Ok(instance(()))
        };

        let out = Next::new(&chain, &terminal).run(&request()).unwrap();
        assert_eq!(*out.downcast::<&str>().unwrap(), "mock");
        assert!(!*reached.lock());
    }
}
