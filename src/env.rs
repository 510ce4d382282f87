use std::collections::{BTreeMap, HashMap};

/// Read-only lookup of host environment variables.
///
/// Consulted during `$NAME` substitution when a name has not been defined by
/// an earlier line.
pub trait EnvLookup {
    fn get_var(&self, name: &str) -> Option<String>;
}

/// Source of host environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnv {
    kind: HostEnvKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostEnvKind {
    /// Read the current process environment on every lookup.
    Process,
    /// Read from an in-memory map.
    Memory(BTreeMap<String, String>),
    /// Resolve nothing.
    Empty,
}

impl Default for HostEnv {
    fn default() -> Self {
        Self::process()
    }
}

impl HostEnv {
    /// Look names up in the live process environment.
    ///
    /// Values that are not valid Unicode are decoded lossily.
    pub fn process() -> Self {
        Self {
            kind: HostEnvKind::Process,
        }
    }

    /// Copy the current process environment into memory.
    pub fn snapshot() -> Self {
        let map = std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .collect();
        Self::from_memory(map)
    }

    pub fn from_memory(map: BTreeMap<String, String>) -> Self {
        Self {
            kind: HostEnvKind::Memory(map),
        }
    }

    /// An environment in which every lookup misses.
    pub fn empty() -> Self {
        Self {
            kind: HostEnvKind::Empty,
        }
    }

    pub fn as_memory(&self) -> Option<&BTreeMap<String, String>> {
        match &self.kind {
            HostEnvKind::Memory(map) => Some(map),
            HostEnvKind::Process | HostEnvKind::Empty => None,
        }
    }
}

impl EnvLookup for HostEnv {
    fn get_var(&self, name: &str) -> Option<String> {
        match &self.kind {
            HostEnvKind::Process => {
                std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
            }
            HostEnvKind::Memory(map) => map.get(name).cloned(),
            HostEnvKind::Empty => None,
        }
    }
}

impl EnvLookup for BTreeMap<String, String> {
    fn get_var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<S: std::hash::BuildHasher> EnvLookup for HashMap<String, String, S> {
    fn get_var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: EnvLookup + ?Sized> EnvLookup for &T {
    fn get_var(&self, name: &str) -> Option<String> {
        (**self).get_var(name)
    }
}
