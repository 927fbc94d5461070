//! Compile time description of the host libraries.
//!
//! A [`LibraryManifest`] lists every library a program may use, with the names and shapes of
//! their methods, properties and events. The binder resolves `Library.Member` syntax against
//! it and hands out index based identities ([`MethodId`], [`PropertyId`], [`EventId`]), so
//! nothing after binding ever looks a member up by its name again.

use serde::{Deserialize, Serialize};

/// Decides which library members are available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// e.g. running inside a browser, members that need the desktop are rejected
    #[default]
    Constrained,
    Desktop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub parameters: Vec<String>,
    pub returns_value: bool,
    pub needs_desktop: bool,
    pub is_deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySignature {
    pub name: String,
    pub has_getter: bool,
    pub has_setter: bool,
    pub needs_desktop: bool,
    pub is_deprecated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSignature {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibrarySignature {
    pub name: String,
    pub uses_text_window: bool,
    pub uses_graphics_window: bool,
    pub methods: Vec<MethodSignature>,
    pub properties: Vec<PropertySignature>,
    pub events: Vec<EventSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibraryManifest {
    pub libraries: Vec<LibrarySignature>,
}

/// Index of a library in the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LibraryId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId {
    pub library: LibraryId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId {
    pub library: LibraryId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub library: LibraryId,
    pub index: usize,
}

/// What a `Library.Member` reference resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRef {
    Method(MethodId),
    Property(PropertyId),
    Event(EventId),
}

impl LibraryManifest {
    pub fn new(libraries: Vec<LibrarySignature>) -> Self {
        Self { libraries }
    }

    pub fn find_library(&self, name: &str) -> Option<LibraryId> {
        self.libraries
            .iter()
            .position(|l| l.name.eq_ignore_ascii_case(name))
            .map(LibraryId)
    }

    pub fn library(&self, id: LibraryId) -> &LibrarySignature {
        &self.libraries[id.0]
    }

    /// looks up a member by name. Methods win over properties, properties over events
    pub fn find_member(&self, library: LibraryId, name: &str) -> Option<MemberRef> {
        let lib = self.library(library);
        let matches = |n: &String| n.eq_ignore_ascii_case(name);
        if let Some(index) = lib.methods.iter().position(|m| matches(&m.name)) {
            return Some(MemberRef::Method(MethodId { library, index }));
        }
        if let Some(index) = lib.properties.iter().position(|p| matches(&p.name)) {
            return Some(MemberRef::Property(PropertyId { library, index }));
        }
        lib.events
            .iter()
            .position(|e| matches(&e.name))
            .map(|index| MemberRef::Event(EventId { library, index }))
    }

    pub fn method(&self, id: MethodId) -> &MethodSignature {
        &self.library(id.library).methods[id.index]
    }

    pub fn property(&self, id: PropertyId) -> &PropertySignature {
        &self.library(id.library).properties[id.index]
    }

    pub fn event(&self, id: EventId) -> &EventSignature {
        &self.library(id.library).events[id.index]
    }

    pub fn find_event(&self, library: &str, event: &str) -> Option<EventId> {
        match self.find_member(self.find_library(library)?, event)? {
            MemberRef::Event(id) => Some(id),
            _ => None,
        }
    }

    /// `Library.Member`, for debugging output
    pub fn method_name(&self, id: MethodId) -> String {
        format!("{}.{}", self.library(id.library).name, self.method(id).name)
    }

    pub fn property_name(&self, id: PropertyId) -> String {
        format!("{}.{}", self.library(id.library).name, self.property(id).name)
    }

    pub fn event_name(&self, id: EventId) -> String {
        format!("{}.{}", self.library(id.library).name, self.event(id).name)
    }
}

// ==============================================================================
// Builders, so hosts can describe their libraries without spelling out every flag
// ==============================================================================
impl LibrarySignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn uses_text_window(mut self) -> Self {
        self.uses_text_window = true;
        self
    }

    pub fn uses_graphics_window(mut self) -> Self {
        self.uses_graphics_window = true;
        self
    }

    pub fn method(mut self, method: MethodSignature) -> Self {
        self.methods.push(method);
        self
    }

    pub fn property(mut self, property: PropertySignature) -> Self {
        self.properties.push(property);
        self
    }

    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.events.push(EventSignature { name: name.into() });
        self
    }
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, parameters: &[&str], returns_value: bool) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            returns_value,
            needs_desktop: false,
            is_deprecated: false,
        }
    }

    pub fn needs_desktop(mut self) -> Self {
        self.needs_desktop = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.is_deprecated = true;
        self
    }
}

impl PropertySignature {
    pub fn new(name: impl Into<String>, has_getter: bool, has_setter: bool) -> Self {
        Self {
            name: name.into(),
            has_getter,
            has_setter,
            needs_desktop: false,
            is_deprecated: false,
        }
    }

    pub fn needs_desktop(mut self) -> Self {
        self.needs_desktop = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.is_deprecated = true;
        self
    }
}
