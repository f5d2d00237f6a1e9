//! Handle table for prepared expressions
//!
//! Callers that cannot hold an [`Expression`] directly (the JSON-RPC server,
//! foreign callers) address it through an opaque [`Handle`]. Handles are
//! never reused, so a released one stays recognisable: using it again is
//! reported as [`EvalError::UseAfterRelease`] instead of touching another
//! expression.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::EngineConfig;
use crate::expr::{Bindings, EvalError, Expression, ParseError, Value};

/// Opaque id of a prepared expression
pub type Handle = u64;

pub struct HandleTable {
    config: EngineConfig,
    expressions: RwLock<HashMap<Handle, Arc<Expression>>>,
    /// Next id to hand out; every id below it has been issued
    next: AtomicU64,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            expressions: RwLock::new(HashMap::new()),
            next: AtomicU64::new(1),
        }
    }

    /// Prepare `source` and register it. Nothing is allocated on failure.
    pub fn prepare(&self, source: &str) -> Result<Handle, ParseError> {
        let expression = Arc::new(Expression::prepare_with(source, &self.config)?);
        let mut expressions = self
            .expressions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = self.next.fetch_add(1, Ordering::SeqCst);
        expressions.insert(handle, expression);
        tracing::debug!(handle, "registered expression");
        Ok(handle)
    }

    /// Shared reference to a live expression
    pub fn get(&self, handle: Handle) -> Result<Arc<Expression>, EvalError> {
        let expressions = self
            .expressions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match expressions.get(&handle) {
            Some(expression) => Ok(Arc::clone(expression)),
            None => Err(self.dead_handle(handle)),
        }
    }

    pub fn identifiers(&self, handle: Handle) -> Result<Vec<String>, EvalError> {
        Ok(self.get(handle)?.identifiers().iter().cloned().collect())
    }

    pub fn evaluate<B: Bindings + ?Sized>(
        &self,
        handle: Handle,
        bindings: &B,
    ) -> Result<Value, EvalError> {
        // evaluation runs outside the lock
        self.get(handle)?.evaluate(bindings)
    }

    pub fn execute<B: Bindings + ?Sized>(
        &self,
        handle: Handle,
        bindings: &B,
    ) -> Result<String, EvalError> {
        self.get(handle)?.execute(bindings)
    }

    /// Release a handle.
    ///
    /// Returns `Ok(true)` when the expression was freed and `Ok(false)` when
    /// it had already been released. Evaluations already holding the
    /// expression finish normally.
    pub fn release(&self, handle: Handle) -> Result<bool, EvalError> {
        let mut expressions = self
            .expressions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if expressions.remove(&handle).is_some() {
            tracing::debug!(handle, "released expression");
            return Ok(true);
        }
        match self.dead_handle(handle) {
            EvalError::UseAfterRelease { .. } => Ok(false),
            other => Err(other),
        }
    }

    /// Number of live expressions
    pub fn len(&self) -> usize {
        self.expressions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dead_handle(&self, handle: Handle) -> EvalError {
        if handle >= 1 && handle < self.next.load(Ordering::SeqCst) {
            EvalError::UseAfterRelease { handle }
        } else {
            EvalError::InvalidHandle { handle }
        }
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
