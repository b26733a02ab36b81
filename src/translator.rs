//! Request translator: turns a REST call's flat string parameter map into
//! the positional argument list an XML-RPC method expects, per its
//! registered [`methodspec::ParamSpec`] list.
//!
//! Includes a permissive `int` coercion: a parameter typed `int` that
//! doesn't parse as one is passed through as a string rather than failing
//! the call.

use std::collections::BTreeMap;

use crate::{
    error::GatewayError,
    methodspec::{MethodSpecRegistry, ParamType},
    value::RpcValue,
};

/// A positional argument as produced by translation, before the
/// demultiplexer has a chance to materialize session tokens and rewrite
/// virtual IDs per backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Resolved independently by each backend from its own session state.
    SessionToken,
    Value(RpcValue),
}

/// Translate a REST call's parameter map into the positional argument list
/// for `method`.
pub fn translate(
    registry: &MethodSpecRegistry,
    method: &str,
    params: &BTreeMap<String, String>,
) -> Result<Vec<Arg>, GatewayError> {
    let specs = registry
        .params_of(method)
        .ok_or_else(|| GatewayError::UnknownMethod(method.to_string()))?;

    let mut out = Vec::with_capacity(specs.len());
    let mut looked_up = 0usize;
    for spec in specs {
        if spec.ty == ParamType::SessionKey {
            out.push(Arg::SessionToken);
            continue;
        }
        let raw = params.get(&spec.name).ok_or_else(|| GatewayError::MissingParam {
            method: method.to_string(),
            param: spec.name.clone(),
        })?;
        out.push(Arg::Value(coerce(raw, spec.ty)));
        looked_up += 1;
    }

    // Session-key placeholders are never supplied by the caller, so only the
    // params actually looked up from the request count toward arity.
    if looked_up != params.len() {
        return Err(GatewayError::ArityMismatch {
            method: method.to_string(),
            given: params.len(),
            expected: looked_up,
        });
    }

    Ok(out)
}

fn coerce(raw: &str, ty: ParamType) -> RpcValue {
    match ty {
        ParamType::Int => match raw.parse::<i64>() {
            Ok(n) => RpcValue::Int(n),
            Err(_) => RpcValue::String(raw.to_string()),
        },
        ParamType::DateTime => RpcValue::DateTime(raw.to_string()),
        ParamType::String | ParamType::SessionKey => RpcValue::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methodspec::MethodSpecRegistry;

    fn registry() -> MethodSpecRegistry {
        MethodSpecRegistry::from_yaml(
            r#"
xmlrpc:
  - system.getDetails:
      - sessionKey: sessionKey
      - sid: int
  - system.setDescription:
      - sessionKey: sessionKey
      - sid: int
      - description: string
"#,
        )
        .unwrap()
    }

    #[test]
    fn int_param_parses_successfully() {
        let reg = registry();
        let mut params = BTreeMap::new();
        params.insert("sid".to_string(), "1001".to_string());
        let args = translate(&reg, "system.getDetails", &params).unwrap();
        assert_eq!(args, vec![Arg::SessionToken, Arg::Value(RpcValue::Int(1001))]);
    }

    #[test]
    fn int_param_falls_back_to_string_when_not_numeric() {
        let reg = registry();
        let mut params = BTreeMap::new();
        params.insert("sid".to_string(), "not-a-number".to_string());
        let args = translate(&reg, "system.getDetails", &params).unwrap();
        assert_eq!(
            args,
            vec![Arg::SessionToken, Arg::Value(RpcValue::String("not-a-number".into()))]
        );
    }

    #[test]
    fn unknown_method_is_rejected() {
        let reg = registry();
        let params = BTreeMap::new();
        assert!(matches!(
            translate(&reg, "system.doesNotExist", &params),
            Err(GatewayError::UnknownMethod(_))
        ));
    }

    #[test]
    fn missing_required_param_is_rejected() {
        let reg = registry();
        let params = BTreeMap::new();
        assert!(matches!(
            translate(&reg, "system.getDetails", &params),
            Err(GatewayError::MissingParam { .. })
        ));
    }

    #[test]
    fn arity_mismatch_when_extra_param_supplied() {
        let reg = registry();
        let mut params = BTreeMap::new();
        params.insert("sid".to_string(), "1001".to_string());
        params.insert("extra".to_string(), "whatever".to_string());
        assert!(matches!(
            translate(&reg, "system.getDetails", &params),
            Err(GatewayError::ArityMismatch { .. })
        ));
    }
}
