//! # Deferred Modules
//!
//! Регистрация модулей с отложенным разрешением зависимостей.
//!
//! Модуль объявляется именем, списком зависимостей и фабрикой. Объявления
//! могут приходить в любом порядке, в том числе раньше своих зависимостей:
//! фабрика вызывается, как только все зависимости разрешены.
//!
//! ## Основные модули
//!
//! - [`modules`] - реестр, резолвер и диагностика зависших объявлений
//! - [`value`] - динамический тип значений модулей
//! - [`error`] - ошибки поиска модулей
//!
//! ## Пример
//!
//! ```rust
//! use deferred_modules::{ModuleError, ModuleResolver, Value};
//!
//! let mut resolver = ModuleResolver::new();
//! resolver.declare("double", "base", |deps| {
//!     Value::Int(deps[0].as_int().unwrap_or(0) * 2)
//! });
//! resolver.declare("base", (), |_| Value::Int(21));
//!
//! assert_eq!(*resolver.lookup("double").unwrap(), Value::Int(42));
//! assert_eq!(
//!     resolver.lookup("missing").unwrap_err(),
//!     ModuleError::UndeclaredModule("missing".to_string())
//! );
//! ```

pub mod error;
pub mod modules;
pub mod value;

// === Re-exports для удобства ===
pub use error::{ModuleError, ModuleResult};
pub use modules::{
    Blockage, Dependencies, ModuleRegistry, ModuleResolver, ResolverConfig, ScanOrder,
    SharedResolver,
};
pub use value::{Artifact, Value};
