//! Резолвер модулей.
//!
//! Объявление разрешается сразу, если все его зависимости уже в реестре;
//! иначе оно попадает в очередь ожидания. После каждого разрешения очередь
//! обходится заново, пока очередной проход не перестанет что-либо
//! разрешать (неподвижная точка).

use std::sync::Arc;

use log::{debug, trace, warn};

use super::declaration::{Dependencies, PendingDeclaration};
use super::diagnostics::{self, Blockage};
use super::registry::ModuleRegistry;
use super::{ResolverConfig, ScanOrder};
use crate::error::{ModuleError, ModuleResult};
use crate::value::{Artifact, Value};

/// Резолвер модулей.
///
/// Реестр создаётся при первом `declare`; до этого `lookup` возвращает
/// [`ModuleError::RegistryUninitialized`].
#[derive(Debug)]
pub struct ModuleResolver<T = Value> {
    /// Настройки
    config: ResolverConfig,
    /// Разрешённые модули
    registry: Option<ModuleRegistry<T>>,
    /// Объявления, ожидающие зависимостей (в порядке поступления)
    pending: Vec<PendingDeclaration<T>>,
}

impl ModuleResolver<Value> {
    /// Создать новый резолвер для [`Value`].
    ///
    /// Для других типов артефактов — [`with_config`](Self::with_config)
    /// или `Default`.
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }
}

impl<T: Artifact> ModuleResolver<T> {
    /// Создать резолвер с заданной конфигурацией.
    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            config,
            registry: None,
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Объявить модуль.
    ///
    /// Никогда не завершается ошибкой: объявление с недостижимыми
    /// зависимостями остаётся в очереди, пока кто-нибудь не запросит его
    /// через [`lookup`](Self::lookup).
    pub fn declare<D, F>(&mut self, name: impl Into<String>, dependencies: D, factory: F)
    where
        D: Into<Dependencies>,
        F: FnOnce(&[Arc<T>]) -> T + Send + 'static,
    {
        let declaration =
            PendingDeclaration::new(name.into(), dependencies.into(), Box::new(factory));
        self.registry.get_or_insert_with(ModuleRegistry::new);

        // Объявление сначала встаёт в очередь и покидает её только после
        // того, как фабрика вернула значение
        self.pending.push(declaration);
        let index = self.pending.len() - 1;

        if self.try_resolve_pending(index) {
            self.cascade();
        } else {
            self.defer(index);
        }
    }

    /// Получить разрешённый модуль по имени.
    ///
    /// Повторные вызовы возвращают один и тот же `Arc`.
    pub fn lookup(&self, name: &str) -> ModuleResult<Arc<T>> {
        let registry = self
            .registry
            .as_ref()
            .ok_or(ModuleError::RegistryUninitialized)?;

        if let Some(module) = registry.get(name) {
            return Ok(Arc::clone(module));
        }

        if self.is_pending(name) {
            Err(ModuleError::UnresolvedCircularDependency(name.to_string()))
        } else {
            Err(ModuleError::UndeclaredModule(name.to_string()))
        }
    }

    /// Проверить, разрешён ли модуль.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.registry
            .as_ref()
            .is_some_and(|registry| registry.contains(name))
    }

    /// Проверить, ждёт ли модуль своих зависимостей.
    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.iter().rev().any(|pending| pending.name == name)
    }

    /// Имена ожидающих модулей в порядке объявления.
    pub fn pending_names(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(|pending| pending.name.as_str())
    }

    /// Получить количество разрешённых модулей.
    pub fn resolved_count(&self) -> usize {
        self.registry.as_ref().map_or(0, ModuleRegistry::len)
    }

    /// Реестр, если хотя бы один модуль уже объявлялся.
    pub fn registry(&self) -> Option<&ModuleRegistry<T>> {
        self.registry.as_ref()
    }

    /// Объяснить, почему модуль не разрешён.
    ///
    /// `None` для разрешённых и необъявленных модулей.
    pub fn diagnose(&self, name: &str) -> Option<Blockage> {
        if self.is_resolved(name) || !self.is_pending(name) {
            return None;
        }
        Some(diagnostics::explain(name, &self.pending, self.registry.as_ref()))
    }

    fn defer(&self, index: usize) {
        let declaration = &self.pending[index];
        if declaration.has_failed() {
            return;
        }
        debug!(
            "Deferring module \"{}\" until {:?} are resolved",
            declaration.name,
            declaration.dependencies.names()
        );

        if self.config.warn_on_cycles {
            if let Some(Blockage::Cycle(path)) = self.diagnose(&declaration.name) {
                warn!(
                    "Module \"{}\" is part of a dependency cycle: {}",
                    declaration.name,
                    path.join(" -> ")
                );
            }
        }
    }

    /// Опубликовать значение модуля.
    fn publish(&mut self, name: String, mut module: T, dependency_count: usize) {
        if self.config.stamp_names && module.supports_name() && !module.has_name() {
            module.assign_name(&name);
        }

        debug!("Resolved module \"{}\" with {} dependencies", name, dependency_count);

        let registry = self.registry.get_or_insert_with(ModuleRegistry::new);
        if registry.publish(name.clone(), Arc::new(module)).is_some() {
            warn!("Module \"{}\" was declared again; previous value replaced", name);
        }
    }

    /// Разрешать ожидающие объявления, пока проход по очереди что-то меняет.
    fn cascade(&mut self) {
        let mut pass = 0;
        loop {
            pass += 1;
            let resolved = match self.config.scan_order {
                ScanOrder::NewestFirst => self.pass_newest_first(),
                ScanOrder::OldestFirst => self.pass_oldest_first(),
            };
            trace!(
                "Cascade pass {}: resolved {}, {} still pending",
                pass,
                resolved,
                self.pending.len()
            );
            if resolved == 0 {
                break;
            }
        }
    }

    fn pass_newest_first(&mut self) -> usize {
        let mut resolved = 0;
        for index in (0..self.pending.len()).rev() {
            if self.try_resolve_pending(index) {
                resolved += 1;
            }
        }
        resolved
    }

    fn pass_oldest_first(&mut self) -> usize {
        let mut resolved = 0;
        let mut index = 0;
        while index < self.pending.len() {
            if self.try_resolve_pending(index) {
                resolved += 1;
            } else {
                index += 1;
            }
        }
        resolved
    }

    /// Разрешить объявление из очереди, если оно готово.
    ///
    /// Объявление удаляется из очереди только после возврата фабрики. Если
    /// фабрика паникует, оно остаётся в очереди без фабрики и больше не
    /// разрешается: `lookup` сообщает о нём как о неразрешённом.
    fn try_resolve_pending(&mut self, index: usize) -> bool {
        let declaration = &self.pending[index];
        if declaration.has_failed() {
            return false;
        }
        let args = self
            .registry
            .as_ref()
            .and_then(|registry| registry.collect(declaration.dependencies.iter()));

        let Some(args) = args else {
            return false;
        };
        let Some(factory) = self.pending[index].factory.take() else {
            return false;
        };

        let module = factory(&args);
        let declaration = self.pending.remove(index);
        self.publish(declaration.name, module, declaration.dependencies.len());
        true
    }
}

impl<T: Artifact> Default for ModuleResolver<T> {
    fn default() -> Self {
        Self::with_config(ResolverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use parking_lot::Mutex;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Once;

    static WARNINGS: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());
    static LOGGER_INIT: Once = Once::new();

    /// Запоминает предупреждения и передаёт записи в env_logger.
    struct RecordingLogger {
        inner: env_logger::Logger,
    }

    impl Log for RecordingLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            if record.level() <= Level::Warn {
                WARNINGS.lock().push(record.args().to_string());
            }
            if self.inner.matches(record) {
                self.inner.log(record);
            }
        }

        fn flush(&self) {
            self.inner.flush();
        }
    }

    fn init_logger() {
        LOGGER_INIT.call_once(|| {
            let inner = env_logger::Builder::from_default_env().is_test(true).build();
            if log::set_boxed_logger(Box::new(RecordingLogger { inner })).is_ok() {
                log::set_max_level(LevelFilter::Trace);
            }
        });
    }

    /// Предупреждения, упоминающие модуль (имена в тестах уникальны).
    fn warnings_about(name: &str) -> Vec<String> {
        let needle = format!("\"{}\"", name);
        WARNINGS
            .lock()
            .iter()
            .filter(|message| message.contains(&needle))
            .cloned()
            .collect()
    }

    fn int_of(module: &Arc<Value>) -> i64 {
        module.as_int().unwrap()
    }

    #[test]
    fn test_lookup_before_declare() {
        let resolver = ModuleResolver::<Value>::new();
        assert_eq!(
            resolver.lookup("anything").unwrap_err(),
            ModuleError::RegistryUninitialized
        );
    }

    #[test]
    fn test_no_dependencies_resolves_immediately() {
        init_logger();
        let mut resolver = ModuleResolver::new();
        resolver.declare("answer", (), |_| Value::Int(42));

        assert_eq!(int_of(&resolver.lookup("answer").unwrap()), 42);
        assert_eq!(resolver.resolved_count(), 1);
    }

    #[test]
    fn test_undeclared_module() {
        let mut resolver = ModuleResolver::new();
        resolver.declare("a", (), |_| Value::Unit);

        assert_eq!(
            resolver.lookup("b").unwrap_err(),
            ModuleError::UndeclaredModule("b".to_string())
        );
    }

    #[test]
    fn test_dependencies_passed_in_order() {
        let mut resolver = ModuleResolver::new();
        resolver.declare("a", (), |_| Value::Int(1));
        resolver.declare("b", (), |_| Value::Int(2));
        resolver.declare("diff", ["b", "a"], |deps| {
            Value::Int(deps[0].as_int().unwrap() - deps[1].as_int().unwrap())
        });

        assert_eq!(int_of(&resolver.lookup("diff").unwrap()), 1);
    }

    #[test]
    fn test_order_independence() {
        let mut forward = ModuleResolver::new();
        forward.declare("a", (), |_| Value::Int(1));
        forward.declare("b", "a", |deps| Value::Int(deps[0].as_int().unwrap() + 1));

        let mut backward = ModuleResolver::new();
        backward.declare("b", "a", |deps| Value::Int(deps[0].as_int().unwrap() + 1));
        assert!(backward.is_pending("b"));
        backward.declare("a", (), |_| Value::Int(1));

        for name in ["a", "b"] {
            assert_eq!(forward.lookup(name).unwrap(), backward.lookup(name).unwrap());
        }
        assert_eq!(backward.pending_names().count(), 0);
    }

    #[test]
    fn test_name_stamping() {
        let mut resolver = ModuleResolver::new();
        resolver.declare("math", (), |_| Value::record().with_field("pi", 3.0));
        resolver.declare("named", (), |_| Value::record().with_field("name", "custom"));
        resolver.declare("scalar", (), |_| Value::Int(7));

        assert_eq!(resolver.lookup("math").unwrap().name(), Some("math"));
        assert_eq!(resolver.lookup("named").unwrap().name(), Some("custom"));
        assert_eq!(*resolver.lookup("scalar").unwrap(), Value::Int(7));
    }

    #[test]
    fn test_stamping_disabled() {
        let config = ResolverConfig {
            stamp_names: false,
            ..ResolverConfig::default()
        };
        let mut resolver = ModuleResolver::<Value>::with_config(config);
        resolver.declare("math", (), |_| Value::record());

        assert_eq!(resolver.lookup("math").unwrap().name(), None);
    }

    #[test]
    fn test_circular_dependency() {
        init_logger();
        let mut resolver = ModuleResolver::<Value>::new();
        resolver.declare("a", "b", |_| Value::Unit);
        resolver.declare("b", "a", |_| Value::Unit);

        assert!(resolver.is_pending("a"));
        assert!(resolver.is_pending("b"));
        assert_eq!(
            resolver.lookup("a").unwrap_err(),
            ModuleError::UnresolvedCircularDependency("a".to_string())
        );
        assert_eq!(
            resolver.lookup("b").unwrap_err(),
            ModuleError::UnresolvedCircularDependency("b".to_string())
        );
    }

    #[test]
    fn test_self_dependency_stays_pending() {
        let mut resolver = ModuleResolver::<Value>::new();
        resolver.declare("loop", "loop", |_| Value::Unit);

        assert_eq!(
            resolver.lookup("loop").unwrap_err(),
            ModuleError::UnresolvedCircularDependency("loop".to_string())
        );
    }

    #[test]
    fn test_chained_cascade() {
        init_logger();
        let mut resolver = ModuleResolver::new();
        resolver.declare("c", "b", |deps| Value::Int(deps[0].as_int().unwrap() * 10));
        resolver.declare("b", "a", |deps| Value::Int(deps[0].as_int().unwrap() + 1));
        assert_eq!(resolver.resolved_count(), 0);

        resolver.declare("a", (), |_| Value::Int(1));

        assert_eq!(int_of(&resolver.lookup("a").unwrap()), 1);
        assert_eq!(int_of(&resolver.lookup("b").unwrap()), 2);
        assert_eq!(int_of(&resolver.lookup("c").unwrap()), 20);
        assert_eq!(resolver.pending_names().count(), 0);
    }

    #[test]
    fn test_cascade_oldest_first() {
        let config = ResolverConfig {
            scan_order: ScanOrder::OldestFirst,
            ..ResolverConfig::default()
        };
        let mut resolver = ModuleResolver::<Value>::with_config(config);
        resolver.declare("b", "a", |deps| Value::Int(deps[0].as_int().unwrap() + 1));
        resolver.declare("c", "b", |deps| Value::Int(deps[0].as_int().unwrap() * 10));
        resolver.declare("a", (), |_| Value::Int(1));

        assert_eq!(int_of(&resolver.lookup("c").unwrap()), 20);
    }

    #[test]
    fn test_diamond_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut resolver = ModuleResolver::new();

        let counter = Arc::clone(&calls);
        resolver.declare("top", ["left", "right"], move |deps| {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::Int(deps[0].as_int().unwrap() + deps[1].as_int().unwrap())
        });
        resolver.declare("left", "base", |deps| Value::Int(deps[0].as_int().unwrap() + 1));
        resolver.declare("right", "base", |deps| Value::Int(deps[0].as_int().unwrap() + 2));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        resolver.declare("base", (), |_| Value::Int(10));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(int_of(&resolver.lookup("top").unwrap()), 23);
    }

    #[test]
    fn test_lookup_returns_same_instance() {
        let mut resolver = ModuleResolver::new();
        resolver.declare("config", (), |_| Value::record());

        let first = resolver.lookup("config").unwrap();
        let second = resolver.lookup("config").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_dependency_is_shared_instance() {
        let mut resolver = ModuleResolver::new();
        resolver.declare("shared", (), |_| Value::record());
        resolver.declare("holder", "shared", |deps| {
            Value::Array(vec![Value::Int(Arc::strong_count(&deps[0]) as i64)])
        });

        // Реестр и фабрика держат один и тот же экземпляр
        assert_eq!(
            *resolver.lookup("holder").unwrap(),
            Value::Array(vec![Value::Int(2)])
        );
    }

    #[test]
    fn test_redeclare_republishes() {
        let mut resolver = ModuleResolver::new();
        resolver.declare("a", (), |_| Value::Int(1));
        let old = resolver.lookup("a").unwrap();

        resolver.declare("a", (), |_| Value::Int(2));

        assert_eq!(*old, Value::Int(1));
        assert_eq!(int_of(&resolver.lookup("a").unwrap()), 2);
    }

    #[test]
    fn test_unrelated_pending_stays_pending() {
        let mut resolver = ModuleResolver::<Value>::new();
        resolver.declare("x", "missing", |_| Value::Unit);
        resolver.declare("y", (), |_| Value::Unit);

        assert!(resolver.is_resolved("y"));
        assert!(resolver.is_pending("x"));
        assert_eq!(resolver.pending_names().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn test_generic_artifact() {
        let mut resolver = ModuleResolver::<String>::default();
        resolver.declare("greeting", "who", |deps| format!("hello, {}", deps[0]));
        resolver.declare("who", (), |_| "world".to_string());

        assert_eq!(resolver.lookup("greeting").unwrap().as_str(), "hello, world");
    }

    #[test]
    fn test_cycle_warning_is_logged() {
        init_logger();
        let config = ResolverConfig {
            warn_on_cycles: true,
            ..ResolverConfig::default()
        };
        let mut resolver = ModuleResolver::<Value>::with_config(config);
        resolver.declare("loud_left", "loud_right", |_| Value::Unit);
        assert!(warnings_about("loud_left").is_empty());

        resolver.declare("loud_right", "loud_left", |_| Value::Unit);

        assert_eq!(resolver.pending_names().count(), 2);
        let warnings = warnings_about("loud_right");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("dependency cycle"));
        assert!(warnings[0].contains("loud_right -> loud_left -> loud_right"));
    }

    #[test]
    fn test_cycle_warning_off_by_default() {
        init_logger();
        let mut resolver = ModuleResolver::new();
        resolver.declare("quiet_left", "quiet_right", |_| Value::Unit);
        resolver.declare("quiet_right", "quiet_left", |_| Value::Unit);

        assert!(resolver.is_pending("quiet_right"));
        assert!(warnings_about("quiet_left").is_empty());
        assert!(warnings_about("quiet_right").is_empty());
    }

    #[test]
    fn test_redeclare_warning_is_logged() {
        init_logger();
        let mut resolver = ModuleResolver::new();
        resolver.declare("declared_twice", (), |_| Value::Int(1));
        assert!(warnings_about("declared_twice").is_empty());

        resolver.declare("declared_twice", (), |_| Value::Int(2));

        let warnings = warnings_about("declared_twice");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("declared again"));
    }

    #[test]
    fn test_panicking_factory_stays_declared() {
        let mut resolver = ModuleResolver::new();
        resolver.declare("broken", "base", |_| -> Value { panic!("factory failed") });

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            resolver.declare("base", (), |_| Value::Int(1));
        }));

        assert!(result.is_err());
        assert!(resolver.is_resolved("base"));
        assert!(resolver.is_pending("broken"));
        assert_eq!(
            resolver.lookup("broken").unwrap_err(),
            ModuleError::UnresolvedCircularDependency("broken".to_string())
        );
        assert_eq!(resolver.diagnose("broken"), Some(Blockage::FactoryPanicked));

        // Упавшая фабрика не вызывается повторно и не мешает каскаду
        resolver.declare("after", "base", |deps| Value::Int(deps[0].as_int().unwrap() + 1));
        assert_eq!(int_of(&resolver.lookup("after").unwrap()), 2);
        assert_eq!(resolver.pending_names().collect::<Vec<_>>(), vec!["broken"]);
    }

    #[test]
    fn test_panicking_immediate_factory() {
        let mut resolver = ModuleResolver::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            resolver.declare("eager", (), |_| -> Value { panic!("factory failed") });
        }));

        assert!(result.is_err());
        assert_eq!(
            resolver.lookup("eager").unwrap_err(),
            ModuleError::UnresolvedCircularDependency("eager".to_string())
        );
    }
}
