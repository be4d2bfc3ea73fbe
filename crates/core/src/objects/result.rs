use odatalink_domain::Value;

/// Holder for a service operation result that is not an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientResult {
    value: Option<Value>,
}

impl ClientResult {
    pub fn new(initial: Option<Value>) -> Self {
        Self { value: initial }
    }

    /// `None` until the owning query completed (or the server returned no body).
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }
}
