//! Резолвер для многопоточного хоста.
//!
//! Каскад читает и меняет реестр и очередь ожидания много раз за одно
//! объявление, поэтому вся последовательность declare → cascade выполняется
//! под одной блокировкой.

use std::sync::Arc;

use parking_lot::Mutex;

use super::declaration::Dependencies;
use super::diagnostics::Blockage;
use super::{ModuleResolver, ResolverConfig};
use crate::error::ModuleResult;
use crate::value::{Artifact, Value};

/// Резолвер, защищённый мьютексом.
///
/// Фабрики выполняются под блокировкой и не должны обращаться к тому же
/// `SharedResolver`, иначе произойдёт взаимоблокировка.
#[derive(Debug)]
pub struct SharedResolver<T = Value> {
    inner: Mutex<ModuleResolver<T>>,
}

impl SharedResolver<Value> {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }
}

impl<T: Artifact> SharedResolver<T> {
    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            inner: Mutex::new(ModuleResolver::with_config(config)),
        }
    }

    /// Объявить модуль (см. [`ModuleResolver::declare`]).
    pub fn declare<D, F>(&self, name: impl Into<String>, dependencies: D, factory: F)
    where
        D: Into<Dependencies>,
        F: FnOnce(&[Arc<T>]) -> T + Send + 'static,
    {
        self.inner.lock().declare(name, dependencies, factory);
    }

    /// Получить разрешённый модуль (см. [`ModuleResolver::lookup`]).
    pub fn lookup(&self, name: &str) -> ModuleResult<Arc<T>> {
        self.inner.lock().lookup(name)
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.inner.lock().is_resolved(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.inner.lock().is_pending(name)
    }

    pub fn diagnose(&self, name: &str) -> Option<Blockage> {
        self.inner.lock().diagnose(name)
    }

    /// Выполнить несколько операций под одной блокировкой.
    pub fn with<R>(&self, f: impl FnOnce(&mut ModuleResolver<T>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut *guard)
    }

    pub fn into_inner(self) -> ModuleResolver<T> {
        self.inner.into_inner()
    }
}

impl<T: Artifact> Default for SharedResolver<T> {
    fn default() -> Self {
        Self::with_config(ResolverConfig::default())
    }
}

impl<T: Artifact> From<ModuleResolver<T>> for SharedResolver<T> {
    fn from(resolver: ModuleResolver<T>) -> Self {
        Self {
            inner: Mutex::new(resolver),
        }
    }
}
