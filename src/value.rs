//! Значения модулей.
//!
//! [`Value`] — динамический тип артефакта по умолчанию. Резолвер работает с
//! любым типом, реализующим [`Artifact`]: трейт явно описывает, может ли
//! значение нести имя и есть ли оно уже.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Ключ записи, под которым хранится имя модуля.
pub const NAME_KEY: &str = "name";

/// Нативная функция, экспортируемая модулем.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Возможность артефакта принимать имя объявившего его модуля.
///
/// Реализация по умолчанию описывает значение без имени: резолвер
/// оставляет такие артефакты как есть.
pub trait Artifact {
    /// Может ли значение хранить имя.
    fn supports_name(&self) -> bool {
        false
    }

    /// Есть ли у значения собственное имя.
    fn has_name(&self) -> bool {
        false
    }

    /// Присвоить имя. Вызывается только если `supports_name()` истинно.
    fn assign_name(&mut self, _name: &str) {}
}

macro_rules! unnamed_artifact {
    ($($ty:ty),* $(,)?) => {
        $(impl Artifact for $ty {})*
    };
}

unnamed_artifact!((), bool, i32, i64, u32, u64, usize, f64, String, &'static str);

impl<T> Artifact for Vec<T> {}

/// Динамическое значение модуля.
#[derive(Clone, Serialize, Deserialize, Default)]
pub enum Value {
    /// Отсутствие значения
    #[default]
    Unit,
    /// Булево значение
    Bool(bool),
    /// Целое число
    Int(i64),
    /// Число с плавающей точкой
    Float(f64),
    /// Строка
    String(String),
    /// Массив
    Array(Vec<Value>),
    /// Запись (структура); единственный вариант, который может иметь имя
    Record(HashMap<String, Value>),
    /// Нативная функция
    #[serde(skip)]
    Function(NativeFn),
}

impl Value {
    /// Создать пустую запись.
    pub fn record() -> Self {
        Value::Record(HashMap::new())
    }

    /// Добавить поле в запись. Для остальных вариантов ничего не делает.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Value::Record(fields) = &mut self {
            fields.insert(key.into(), value.into());
        }
        self
    }

    /// Создать функцию из замыкания.
    pub fn function(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Value::Function(Arc::new(f))
    }

    /// Получить поле записи.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Имя модуля, если оно записано строкой.
    pub fn name(&self) -> Option<&str> {
        match self.field(NAME_KEY) {
            Some(Value::String(name)) => Some(name),
            _ => None,
        }
    }

    /// Вызвать функцию. Для остальных вариантов возвращает `None`.
    pub fn call(&self, args: &[Value]) -> Option<Value> {
        match self {
            Value::Function(f) => Some(f(args)),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Artifact for Value {
    fn supports_name(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    fn has_name(&self) -> bool {
        match self {
            Value::Record(fields) => fields.contains_key(NAME_KEY),
            _ => false,
        }
    }

    fn assign_name(&mut self, name: &str) {
        if let Value::Record(fields) = self {
            fields.insert(NAME_KEY.to_string(), Value::String(name.to_string()));
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Record(fields) => f.debug_tuple("Record").field(fields).finish(),
            Value::Function(_) => write!(f, "Function(<native>)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            // Функции равны только сами себе
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}
