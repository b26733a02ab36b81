//! Method-spec registry: the YAML document that tells the translator how
//! many positional XML-RPC parameters a REST method name expects, their
//! names (used only for error messages and introspection), and their types.
//!
//! Loaded once at startup via `serde_yaml`.

use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Int,
    String,
    DateTime,
    /// Not read from the client request at all — materialized by the
    /// demultiplexer from the backend's own session state.
    SessionKey,
}

impl ParamType {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "int" => ParamType::Int,
            "datetime" => ParamType::DateTime,
            "sessionKey" => ParamType::SessionKey,
            _ => ParamType::String,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
}

pub struct MethodSpecRegistry {
    methods: BTreeMap<String, Vec<ParamSpec>>,
}

#[derive(Deserialize)]
struct RawDoc {
    xmlrpc: Vec<BTreeMap<String, Vec<BTreeMap<String, String>>>>,
}

impl MethodSpecRegistry {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading method spec {}: {e}", path.display()))?;
        Self::from_yaml(&raw)
    }

    /// Parse a method-spec document already read into memory — used by
    /// [`Self::load`] and directly by tests that don't want to touch disk.
    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let doc: RawDoc = serde_yaml::from_str(raw)?;
        let mut methods = BTreeMap::new();
        for entry in doc.xmlrpc {
            for (method, params) in entry {
                let specs = params
                    .into_iter()
                    .flat_map(|p| p.into_iter())
                    .map(|(name, tag)| ParamSpec { name, ty: ParamType::from_tag(&tag) })
                    .collect();
                methods.insert(method, specs);
            }
        }
        Ok(Self { methods })
    }

    pub fn params_of(&self, method: &str) -> Option<&[ParamSpec]> {
        self.methods.get(method).map(Vec::as_slice)
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
xmlrpc:
  - system.listSystems:
      - sessionKey: sessionKey
  - system.createSystemRecord:
      - sessionKey: sessionKey
      - name: string
      - id: int
      - created: datetime
"#;

    #[test]
    fn loads_params_in_declared_order() {
        let reg = MethodSpecRegistry::from_yaml(DOC).unwrap();
        let params = reg.params_of("system.createSystemRecord").unwrap();
        assert_eq!(params.len(), 4);
        assert_eq!(params[0].ty, ParamType::SessionKey);
        assert_eq!(params[1].ty, ParamType::String);
        assert_eq!(params[2].ty, ParamType::Int);
        assert_eq!(params[3].ty, ParamType::DateTime);
    }

    #[test]
    fn unknown_method_returns_none() {
        let reg = MethodSpecRegistry::from_yaml(DOC).unwrap();
        assert!(reg.params_of("system.doesNotExist").is_none());
    }
}
