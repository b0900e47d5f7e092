//! Диагностика зависших объявлений.
//!
//! Резолвер не ищет циклы при объявлении. Этот модуль по запросу
//! объясняет, что именно держит модуль в очереди ожидания.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::declaration::PendingDeclaration;
use super::registry::ModuleRegistry;

/// Причина, по которой модуль не может быть разрешён.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blockage {
    /// Цикл через ожидающие объявления; путь начинается и заканчивается
    /// повторяющимся именем, например `["a", "b", "a"]`.
    Cycle(Vec<String>),
    /// Зависимости, которые никогда не объявлялись (отсортированы).
    Missing(Vec<String>),
    /// Зависимости были готовы, но фабрика запаниковала.
    FactoryPanicked,
}

/// Обход графа ожидающих объявлений.
struct Walker<'a> {
    /// Неразрешённые зависимости каждого ожидающего имени
    edges: HashMap<&'a str, Vec<&'a str>>,
    /// Текущий путь обхода
    path: Vec<&'a str>,
    /// Полностью обойдённые имена без циклов
    done: HashSet<&'a str>,
    /// Необъявленные зависимости, встреченные по пути
    missing: BTreeSet<&'a str>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, name: &'a str) -> Option<Vec<String>> {
        // Глубокие цепочки зависимостей не должны переполнять стек
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
            if let Some(start) = self.path.iter().position(|&n| n == name) {
                let mut cycle: Vec<String> =
                    self.path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(name.to_string());
                return Some(cycle);
            }
            if self.done.contains(name) {
                return None;
            }

            let Some(deps) = self.edges.get(name).cloned() else {
                self.missing.insert(name);
                return None;
            };

            self.path.push(name);
            for dep in deps {
                if let Some(cycle) = self.visit(dep) {
                    return Some(cycle);
                }
            }
            self.path.pop();
            self.done.insert(name);
            None
        })
    }
}

/// Объяснить, почему ожидающий модуль `name` не разрешён.
pub(super) fn explain<T>(
    name: &str,
    pending: &[PendingDeclaration<T>],
    registry: Option<&ModuleRegistry<T>>,
) -> Blockage {
    let mut own = pending.iter().filter(|d| d.name == name).peekable();
    if own.peek().is_some() && own.all(PendingDeclaration::has_failed) {
        return Blockage::FactoryPanicked;
    }

    let is_resolved = |dep: &str| registry.is_some_and(|r| r.contains(dep));

    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for declaration in pending {
        let unresolved = edges.entry(declaration.name.as_str()).or_default();
        unresolved.extend(declaration.dependencies.iter().filter(|&dep| !is_resolved(dep)));
    }

    let mut walker = Walker {
        edges,
        path: Vec::new(),
        done: HashSet::new(),
        missing: BTreeSet::new(),
    };

    match walker.visit(name) {
        Some(cycle) => Blockage::Cycle(cycle),
        None => Blockage::Missing(walker.missing.into_iter().map(str::to_string).collect()),
    }
}
