use uuid::Uuid;

/// Pluggable id-generation policy. The core treats id generation as an
/// external collaborator (see crate docs); `InspectionServer` is handed an
/// `Arc<dyn IdGenerator>` at construction rather than hard-coding one.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// The default: a random v4 UUID, unprefixed.
#[derive(Debug, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Wraps another generator and prepends a fixed prefix, e.g.
/// `PrefixIdGenerator::new("inspection-", UuidIdGenerator)` yields ids like
/// `inspection-3fa85f64-...`.
pub struct PrefixIdGenerator {
    prefix: String,
    inner: Box<dyn IdGenerator>,
}

impl PrefixIdGenerator {
    pub fn new(prefix: impl Into<String>, inner: impl IdGenerator + 'static) -> PrefixIdGenerator {
        PrefixIdGenerator {
            prefix: prefix.into(),
            inner: Box::new(inner),
        }
    }
}

impl IdGenerator for PrefixIdGenerator {
    fn generate(&self) -> String {
        format!("{}{}", self.prefix, self.inner.generate())
    }
}
