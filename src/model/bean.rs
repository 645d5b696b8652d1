//! Beans: typed, dynamic property bags
//!
//! A [`Bean`] carries a bound type name and named property values. Object
//! graphs are built from [`SharedBean`] handles, so the same bean can appear
//! under several properties (or in a cycle) and stay one object.

use super::value::BeanValue;
use indexmap::IndexMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory bean state: the bound type name plus its property values,
/// in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bean {
    type_name: String,
    properties: IndexMap<String, BeanValue>,
}

impl Bean {
    pub fn new(type_name: impl Into<String>) -> Self {
        Bean {
            type_name: type_name.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&BeanValue> {
        self.properties.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<BeanValue>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<BeanValue> {
        self.properties.shift_remove(name)
    }

    /// Iterate over `(property name, value)` pairs in insertion order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &BeanValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Shared handle to a bean. Clones refer to the same underlying bean, which
/// is what lets marshalling walk cyclic graphs and unmarshalling rebuild
/// shared references.
///
/// Equality and hashing are by handle identity, not content, so they stay
/// well-defined on cyclic graphs.
#[derive(Debug, Clone)]
pub struct SharedBean(Arc<RwLock<Bean>>);

impl SharedBean {
    pub fn new(type_name: impl Into<String>) -> Self {
        SharedBean(Arc::new(RwLock::new(Bean::new(type_name))))
    }

    pub fn type_name(&self) -> String {
        self.read().type_name.clone()
    }

    /// Get a property value (cloned out of the bean)
    pub fn get(&self, name: &str) -> Option<BeanValue> {
        self.read().get(name).cloned()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<BeanValue>) {
        self.write().set(name, value);
    }

    pub fn remove(&self, name: &str) -> Option<BeanValue> {
        self.write().remove(name)
    }

    pub fn property_names(&self) -> Vec<String> {
        self.read().properties.keys().cloned().collect()
    }

    /// Copy of the current bean state
    pub fn snapshot(&self) -> Bean {
        self.read().clone()
    }

    /// Whether two handles point at the same bean
    pub fn ptr_eq(&self, other: &SharedBean) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable per-process address of the underlying bean, used as an
    /// identity key while a handle is alive
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Bean> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Bean> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Bean> for SharedBean {
    fn from(bean: Bean) -> Self {
        SharedBean(Arc::new(RwLock::new(bean)))
    }
}

impl PartialEq for SharedBean {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for SharedBean {}

impl Hash for SharedBean {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let bean = SharedBean::new("Person");
        bean.set("name", "Alice");
        bean.set("age", 30i64);

        assert_eq!(bean.type_name(), "Person");
        assert_eq!(bean.get("name").unwrap().as_str(), Some("Alice"));
        assert_eq!(bean.get("age").unwrap().as_int(), Some(30));
        assert!(bean.get("missing").is_none());
    }

    #[test]
    fn test_remove() {
        let bean = SharedBean::new("Person");
        bean.set("name", "Alice");
        let removed = bean.remove("name");
        assert_eq!(removed.unwrap().as_str(), Some("Alice"));
        assert!(bean.get("name").is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let bean = SharedBean::new("Person");
        let alias = bean.clone();
        alias.set("name", "Bob");
        assert_eq!(bean.get("name").unwrap().as_str(), Some("Bob"));
        assert!(bean.ptr_eq(&alias));
        assert_eq!(bean, alias);
    }

    #[test]
    fn test_distinct_beans_are_not_equal() {
        let a = SharedBean::new("Person");
        let b = SharedBean::new("Person");
        a.set("name", "Same");
        b.set("name", "Same");
        assert_ne!(a, b);
    }

    #[test]
    fn test_cyclic_graph_is_expressible() {
        let a = SharedBean::new("Person");
        let b = SharedBean::new("Person");
        a.set("knows", b.clone());
        b.set("knows", a.clone());

        let back = a.get("knows").unwrap();
        let back = back.as_bean().unwrap().get("knows").unwrap();
        assert!(back.as_bean().unwrap().ptr_eq(&a));
    }

    #[test]
    fn test_property_order_is_insertion_order() {
        let bean = SharedBean::new("Person");
        bean.set("z", 1i64);
        bean.set("a", 2i64);
        assert_eq!(bean.property_names(), vec!["z".to_string(), "a".to_string()]);
    }
}
