//! Система отложенных модулей.
//!
//! Модуль объявляется именем, списком зависимостей и фабрикой. Если все
//! зависимости уже разрешены, фабрика вызывается сразу; иначе объявление
//! ждёт в очереди и разрешается каскадом, как только последняя зависимость
//! появится в реестре.
//!
//! ```rust
//! use deferred_modules::{ModuleResolver, Value};
//!
//! let mut resolver = ModuleResolver::<Value>::new();
//!
//! // Зависимость может быть объявлена позже потребителя
//! resolver.declare("app", "config", |deps| {
//!     Value::record().with_field("port", deps[0].field("port").cloned().unwrap_or_default())
//! });
//! resolver.declare("config", (), |_| Value::record().with_field("port", 8080i64));
//!
//! let app = resolver.lookup("app").unwrap();
//! assert_eq!(app.name(), Some("app"));
//! ```

mod declaration;
mod diagnostics;
mod registry;
mod resolver;
mod shared;

pub use declaration::{Dependencies, Factory, PendingDeclaration};
pub use diagnostics::Blockage;
pub use registry::ModuleRegistry;
pub use resolver::ModuleResolver;
pub use shared::SharedResolver;

use serde::{Deserialize, Serialize};

/// Порядок обхода очереди ожидания.
///
/// На результат не влияет: разрешение зависит только от доступности
/// зависимостей.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOrder {
    /// От последнего объявления к первому
    #[default]
    NewestFirst,
    /// От первого объявления к последнему
    OldestFirst,
}

/// Конфигурация резолвера.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Порядок обхода очереди ожидания
    pub scan_order: ScanOrder,
    /// Присваивать артефактам имя модуля, если своего нет
    pub stamp_names: bool,
    /// Предупреждать в лог, если отложенное объявление замыкает цикл
    pub warn_on_cycles: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scan_order: ScanOrder::default(),
            stamp_names: true,
            warn_on_cycles: false,
        }
    }
}
