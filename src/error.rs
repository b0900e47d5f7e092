//! Определения ошибок для реестра модулей.

use thiserror::Error;

/// Основной тип `Result` для библиотеки.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Ошибки поиска модулей.
///
/// `declare` никогда не возвращает ошибок: неразрешимое объявление просто
/// остаётся в очереди ожидания. Все варианты возникают только в `lookup`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("No modules defined! Please first define a module using declare()")]
    RegistryUninitialized,

    #[error("Module \"{0}\" is not defined")]
    UndeclaredModule(String),

    #[error(
        "Module \"{0}\" was defined, but was not properly initialized. \
         There may be circular dependencies, please review your code design"
    )]
    UnresolvedCircularDependency(String),
}

impl ModuleError {
    /// Имя модуля, к которому относится ошибка.
    pub fn module_name(&self) -> Option<&str> {
        match self {
            Self::RegistryUninitialized => None,
            Self::UndeclaredModule(name) | Self::UnresolvedCircularDependency(name) => Some(name),
        }
    }
}
