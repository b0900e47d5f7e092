//! Объявления модулей.

use std::fmt;
use std::sync::Arc;

/// Фабрика модуля: получает значения зависимостей в порядке их объявления.
pub type Factory<T> = Box<dyn FnOnce(&[Arc<T>]) -> T + Send>;

/// Нормализованный список имён зависимостей.
///
/// Отсутствующий список (`()`, `None`, пустая строка) превращается в пустой,
/// одиночное имя — в список из одного элемента.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(Vec<String>);

impl Dependencies {
    /// Пустой список зависимостей.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<()> for Dependencies {
    fn from(_: ()) -> Self {
        Self::none()
    }
}

impl From<&str> for Dependencies {
    fn from(name: &str) -> Self {
        if name.is_empty() {
            Self::none()
        } else {
            Self(vec![name.to_string()])
        }
    }
}

impl From<String> for Dependencies {
    fn from(name: String) -> Self {
        if name.is_empty() {
            Self::none()
        } else {
            Self(vec![name])
        }
    }
}

impl<D: Into<Dependencies>> From<Option<D>> for Dependencies {
    fn from(deps: Option<D>) -> Self {
        deps.map(Into::into).unwrap_or_default()
    }
}

impl From<Vec<String>> for Dependencies {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for Dependencies {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Dependencies {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Dependencies {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

/// Объявление, ожидающее разрешения зависимостей.
pub struct PendingDeclaration<T> {
    /// Имя модуля
    pub name: String,
    /// Имена зависимостей
    pub dependencies: Dependencies,
    /// Фабрика, вызывается ровно один раз; `None` после паники фабрики
    pub(crate) factory: Option<Factory<T>>,
}

impl<T> PendingDeclaration<T> {
    pub(crate) fn new(name: String, dependencies: Dependencies, factory: Factory<T>) -> Self {
        Self {
            name,
            dependencies,
            factory: Some(factory),
        }
    }

    /// Фабрика была вызвана, но не вернула значение (паника).
    pub fn has_failed(&self) -> bool {
        self.factory.is_none()
    }
}

impl<T> fmt::Debug for PendingDeclaration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDeclaration")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("failed", &self.has_failed())
            .finish_non_exhaustive()
    }
}
