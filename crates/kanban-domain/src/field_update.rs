use serde::{Deserialize, Deserializer};

/// Three-state partial update for optional fields.
///
/// In JSON request bodies an absent key is `NoChange`, `null` is `Clear` and
/// any other value is `Set`. Fields must be annotated with `#[serde(default)]`
/// for the absent case to work.
///
/// # Example
///
/// ```
/// use kanban_domain::FieldUpdate;
///
/// let mut field = Some("old value".to_string());
/// FieldUpdate::Set("new value".to_string()).apply_to(&mut field);
/// assert_eq!(field, Some("new value".to_string()));
///
/// FieldUpdate::<String>::Clear.apply_to(&mut field);
/// assert_eq!(field, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    /// Keep the existing value
    NoChange,
    /// Replace the value
    Set(T),
    /// Set the field to None
    Clear,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::NoChange
    }
}

impl<T> FieldUpdate<T> {
    pub fn apply_to(self, field: &mut Option<T>) {
        match self {
            FieldUpdate::NoChange => {}
            FieldUpdate::Set(value) => *field = Some(value),
            FieldUpdate::Clear => *field = None,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, FieldUpdate::NoChange)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldUpdate::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Fallible transform of the `Set` payload, used for validation.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<FieldUpdate<U>, E> {
        Ok(match self {
            FieldUpdate::NoChange => FieldUpdate::NoChange,
            FieldUpdate::Set(value) => FieldUpdate::Set(f(value)?),
            FieldUpdate::Clear => FieldUpdate::Clear,
        })
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(FieldUpdate::from)
    }
}
