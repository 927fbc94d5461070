use indexmap::IndexMap;

use crate::core::*;
use crate::utils::bug;

/// The global variables. A variable that was never assigned reads as the empty string
#[derive(Default, Debug, Clone)]
pub struct Memory {
    /// in the order the variables were first assigned at run time
    values: IndexMap<VariableId, Value>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: VariableId) -> Value {
        self.values.get(&id).cloned().unwrap_or_else(Value::empty)
    }

    pub fn set(&mut self, id: VariableId, value: Value) {
        self.values.insert(id, value);
    }

    /// `array[keys[0]][keys[1]]...`, missing elements read as the empty string
    pub fn get_element(&self, array: VariableId, keys: &[Value]) -> Value {
        let Some(mut current) = self.values.get(&array) else {
            return Value::empty();
        };
        for key in keys {
            let element = match current {
                Value::Array(a) => a.get(&key.to_display_string()),
                _ => None,
            };
            match element {
                Some(element) => current = element,
                None => return Value::empty(),
            }
        }
        current.clone()
    }

    /// `array[keys[0]][keys[1]]... = value`. Anything on the way that isn't an array yet
    /// is replaced by one
    pub fn set_element(&mut self, array: VariableId, keys: &[Value], value: Value) {
        let Some((last, path)) = keys.split_last() else {
            self.set(array, value);
            return;
        };
        let mut current = self.values.entry(array).or_insert_with(Value::empty);
        for key in path {
            current = as_array_mut(current).element_mut(key.to_display_string());
        }
        as_array_mut(current).set(last.to_display_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &Value)> {
        self.values.iter().map(|(id, v)| (*id, v))
    }
}

fn as_array_mut(value: &mut Value) -> &mut ArrayValue {
    if !matches!(value, Value::Array(_)) {
        *value = Value::Array(ArrayValue::new());
    }
    match value {
        Value::Array(a) => a,
        _ => bug!("value was just replaced by an array"),
    }
}
