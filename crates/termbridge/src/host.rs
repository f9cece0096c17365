use termbridge_protocol::ElementRef;
use uuid::Uuid;

const GENERATED_ID_PREFIX: &str = "_tb_";

/// Identity of the element that hosts a terminal.
///
/// A terminal created without an explicit id takes the id of its host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostElement {
    id: String,
}

impl Default for HostElement {
    fn default() -> Self {
        Self::new()
    }
}

impl HostElement {
    /// A host with a freshly generated, process-unique id.
    pub fn new() -> Self {
        Self {
            id: format!("{}{}", GENERATED_ID_PREFIX, Uuid::new_v4().simple()),
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn element_ref(&self) -> ElementRef {
        ElementRef {
            element_id: self.id.clone(),
        }
    }

    /// `requested` unless it is absent or blank, otherwise the host's own id.
    pub(crate) fn resolve_terminal_id(&self, requested: Option<&str>) -> String {
        match requested {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => self.id.clone(),
        }
    }
}
