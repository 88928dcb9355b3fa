use std::path::PathBuf;

/// Data sent along with a request.
///
/// For `GET` and `DELETE` the payload becomes the query string; for `POST`,
/// `PUT` and `PATCH` it becomes the body. The same value is handed to every
/// callback of the request, unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Payload {
    /// No data
    #[default]
    Empty,
    /// Data which is sent verbatim, e.g. an already encoded body
    Raw(String),
    /// Structured form data
    Fields(Fields),
}

impl Payload {
    /// Whether there is nothing to send
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Empty => true,
            Payload::Raw(raw) => raw.is_empty(),
            Payload::Fields(fields) => fields.is_empty(),
        }
    }

    /// The structured fields, if this payload has any
    #[must_use]
    pub fn fields(&self) -> Option<&Fields> {
        match self {
            Payload::Fields(fields) => Some(fields),
            _ => None,
        }
    }
}

impl From<&str> for Payload {
    fn from(raw: &str) -> Self {
        Payload::Raw(raw.to_string())
    }
}

impl From<String> for Payload {
    fn from(raw: String) -> Self {
        Payload::Raw(raw)
    }
}

impl From<Fields> for Payload {
    fn from(fields: Fields) -> Self {
        Payload::Fields(fields)
    }
}

impl From<()> for Payload {
    fn from((): ()) -> Self {
        Payload::Empty
    }
}

impl<K: Into<String>, V: Into<Field>, const N: usize> From<[(K, V); N]> for Payload {
    fn from(pairs: [(K, V); N]) -> Self {
        Payload::Fields(pairs.into_iter().collect())
    }
}

impl<K: Into<String>, V: Into<Field>> From<Vec<(K, V)>> for Payload {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Payload::Fields(pairs.into_iter().collect())
    }
}

/// A single value inside [`Fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Plain text
    Text(String),
    /// A local file which is uploaded as a multipart file part
    File(PathBuf),
    /// Positional values, encoded as `name[]` or `name[0]`
    List(Vec<Field>),
    /// Named values, encoded as `name[key]`
    Map(Fields),
}

impl Field {
    /// Whether this is a list or map with at least one element
    #[must_use]
    pub fn is_nested(&self) -> bool {
        match self {
            Field::List(items) => !items.is_empty(),
            Field::Map(fields) => !fields.is_empty(),
            Field::Text(_) | Field::File(_) => false,
        }
    }
}

impl From<&str> for Field {
    fn from(text: &str) -> Self {
        Field::Text(text.to_string())
    }
}

impl From<String> for Field {
    fn from(text: String) -> Self {
        Field::Text(text)
    }
}

impl From<Fields> for Field {
    fn from(fields: Fields) -> Self {
        Field::Map(fields)
    }
}

impl From<PathBuf> for Field {
    fn from(path: PathBuf) -> Self {
        Field::File(path)
    }
}

impl<T: Into<Field>> From<Vec<T>> for Field {
    fn from(items: Vec<T>) -> Self {
        Field::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! field_from_display {
    ($($t:ty),*) => {
        $(impl From<$t> for Field {
            fn from(value: $t) -> Self {
                Field::Text(value.to_string())
            }
        })*
    };
}

field_from_display!(i32, i64, u16, u32, u64, usize, f64, bool);

/// Ordered list of named form values.
///
/// Names are kept exactly as given and may repeat.
///
/// ```
/// use volley::Fields;
///
/// let fields = Fields::new()
///     .text("username", "myusername")
///     .list("tags", ["a", "b"])
///     .map("more", Fields::new().text("param", "value"));
/// assert_eq!(fields.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, Field)>);

impl Fields {
    /// Create an empty set of fields
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Field>) {
        self.0.push((name.into(), value.into()));
    }

    /// Append any value convertible into a [`Field`]
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Field>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a text field
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, Field::Text(value.into()));
        self
    }

    /// Append a file field
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.push(name, Field::File(path.into()));
        self
    }

    /// Append a list of values
    #[must_use]
    pub fn list<I, T>(mut self, name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Field>,
    {
        self.push(name, Field::List(items.into_iter().map(Into::into).collect()));
        self
    }

    /// Append nested named values
    #[must_use]
    pub fn map(mut self, name: impl Into<String>, fields: Fields) -> Self {
        self.push(name, Field::Map(fields));
        self
    }

    /// Iterate over the fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of top-level fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any top-level value is a non-empty list or map
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.0.iter().any(|(_, value)| value.is_nested())
    }
}

impl<K: Into<String>, V: Into<Field>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Fields(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}
