//! Реестр разрешённых модулей.

use std::collections::HashMap;
use std::sync::Arc;

/// Реестр разрешённых модулей: имя → значение.
///
/// Публикация доступна только резолверу; снаружи реестр только читается.
#[derive(Debug)]
pub struct ModuleRegistry<T> {
    modules: HashMap<String, Arc<T>>,
}

impl<T> ModuleRegistry<T> {
    pub(crate) fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Опубликовать модуль. Возвращает предыдущее значение под тем же именем.
    pub(crate) fn publish(&mut self, name: String, module: Arc<T>) -> Option<Arc<T>> {
        self.modules.insert(name, module)
    }

    /// Получить модуль по имени.
    pub fn get(&self, name: &str) -> Option<&Arc<T>> {
        self.modules.get(name)
    }

    /// Проверить, разрешён ли модуль.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Получить количество разрешённых модулей.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Имена всех разрешённых модулей (в произвольном порядке).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Собрать значения зависимостей в порядке имён.
    ///
    /// `None`, если хотя бы одна зависимость ещё не разрешена: частичной
    /// подстановки не бывает.
    pub(crate) fn collect<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Option<Vec<Arc<T>>> {
        names
            .into_iter()
            .map(|name| self.modules.get(name).cloned())
            .collect()
    }
}
