//! Virtual-ID manager and per-backend context.
//!
//! A virtual ID multiplexes a backend-local object ID into one shared
//! namespace so a client can hold a single integer without needing to know
//! which backend it came from. The wire format is:
//!
//! ```text
//! 1 | <K-digit zero-padded context index> | <local id>
//! ```
//!
//! where `K` is the number of decimal digits needed to write `|contexts|`.
//! Contexts are registered once at startup, in a fixed order, and never
//! change afterward — `ListContexts` always returns that same order, which
//! is what gives the demultiplexer and aggregator their determinism.
//!
//! Every failure mode is a `Result` rather than a panic, and registration
//! order is an explicit `Vec` so it stays stable and reproducible.

use crate::error::GatewayError;

/// A registered backend context: its position in the virtual-ID namespace
/// and the FQDN it addresses.
#[derive(Debug, Clone)]
pub struct Context {
    index: u32,
    fqdn: String,
}

impl Context {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Encode a local ID as a virtual ID addressed to this context.
    pub fn to_virtual(&self, local_id: i64, digits: u32) -> i64 {
        encode(self.index, local_id, digits)
    }

    /// Decode a virtual ID, failing if it is not addressed to this context.
    pub fn to_local(&self, virtual_id: i64, digits: u32) -> Result<i64, GatewayError> {
        let (local_id, ctx_index) = decode(virtual_id, digits)?;
        if ctx_index != self.index {
            return Err(GatewayError::IdRouting(virtual_id));
        }
        Ok(local_id)
    }
}

/// Owns the registration order of every backend context and performs
/// virtual-ID encoding/decoding independent of which context is asking.
pub struct VidManager {
    contexts: Vec<Context>,
}

impl VidManager {
    pub fn new() -> Self {
        Self { contexts: Vec::new() }
    }

    /// Register a new backend context, assigning it the next index (1-based).
    /// Fails if `fqdn` is already registered.
    pub fn add_context(&mut self, fqdn: &str) -> Result<u32, GatewayError> {
        if self.contexts.iter().any(|c| c.fqdn == fqdn) {
            return Err(GatewayError::Config(anyhow::anyhow!(
                "backend context `{fqdn}` registered more than once"
            )));
        }
        let index = self.contexts.len() as u32 + 1;
        self.contexts.push(Context { index, fqdn: fqdn.to_string() });
        Ok(index)
    }

    /// Look up the context registered for `fqdn`.
    pub fn context_for(&self, fqdn: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.fqdn == fqdn)
    }

    fn context_by_index(&self, index: u32) -> Option<&Context> {
        self.contexts.iter().find(|c| c.index == index)
    }

    /// All registered FQDNs, in the fixed registration order.
    pub fn list_contexts(&self) -> Vec<String> {
        self.contexts.iter().map(|c| c.fqdn.clone()).collect()
    }

    fn digits(&self) -> u32 {
        digits_for(self.contexts.len().max(1))
    }

    /// Decode a virtual ID into its local ID and owning FQDN, independent of
    /// the caller's own context.
    pub fn to_local(&self, virtual_id: i64) -> Result<(i64, String), GatewayError> {
        let digits = self.digits();
        let (local_id, ctx_index) = decode(virtual_id, digits)?;
        let ctx = self
            .context_by_index(ctx_index)
            .ok_or(GatewayError::IdRouting(virtual_id))?;
        Ok((local_id, ctx.fqdn.clone()))
    }

    /// Encode `local_id` as a virtual ID addressed to `fqdn`.
    pub fn to_virtual(&self, fqdn: &str, local_id: i64) -> Option<i64> {
        let digits = self.digits();
        self.context_for(fqdn).map(|c| c.to_virtual(local_id, digits))
    }
}

impl Default for VidManager {
    fn default() -> Self {
        Self::new()
    }
}

fn digits_for(count: usize) -> u32 {
    count.to_string().len() as u32
}

fn encode(ctx_index: u32, local_id: i64, digits: u32) -> i64 {
    let padded = format!("{ctx_index:0width$}", width = digits as usize);
    format!("1{padded}{local_id}").parse().expect("encoded virtual id always fits in i64")
}

fn decode(virtual_id: i64, digits: u32) -> Result<(i64, u32), GatewayError> {
    if virtual_id <= 0 {
        return Err(GatewayError::IdRouting(virtual_id));
    }
    let s = virtual_id.to_string();
    let mut chars = s.chars();
    if chars.next() != Some('1') {
        return Err(GatewayError::IdRouting(virtual_id));
    }
    let rest = chars.as_str();
    let digits = digits as usize;
    if rest.len() <= digits {
        return Err(GatewayError::IdRouting(virtual_id));
    }
    let (ctx_str, local_str) = rest.split_at(digits);
    let ctx_index: u32 = ctx_str.parse().map_err(|_| GatewayError::IdRouting(virtual_id))?;
    let local_id: i64 = local_str.parse().map_err(|_| GatewayError::IdRouting(virtual_id))?;
    if ctx_index == 0 {
        return Err(GatewayError::IdRouting(virtual_id));
    }
    Ok((local_id, ctx_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(fqdns: &[&str]) -> VidManager {
        let mut vid = VidManager::new();
        for f in fqdns {
            vid.add_context(f).unwrap();
        }
        vid
    }

    #[test]
    fn round_trip_single_context() {
        let vid = manager_with(&["host-a.example.org"]);
        let virt = vid.to_virtual("host-a.example.org", 1000).unwrap();
        assert_eq!(virt, 11000);
        let (local, owner) = vid.to_local(virt).unwrap();
        assert_eq!(local, 1000);
        assert_eq!(owner, "host-a.example.org");
    }

    #[test]
    fn round_trip_multiple_contexts_uses_padded_index() {
        let vid = manager_with(&["host-a.example.org", "host-b.example.org"]);
        let virt_a = vid.to_virtual("host-a.example.org", 5).unwrap();
        let virt_b = vid.to_virtual("host-b.example.org", 7).unwrap();
        assert_eq!(virt_a, 115);
        assert_eq!(virt_b, 127);

        let (local, owner) = vid.to_local(virt_b).unwrap();
        assert_eq!(local, 7);
        assert_eq!(owner, "host-b.example.org");
    }

    #[test]
    fn context_rejects_virtual_id_from_another_context() {
        let vid = manager_with(&["host-a.example.org", "host-b.example.org"]);
        let ctx_a = vid.context_for("host-a.example.org").unwrap();
        let virt_b = vid.to_virtual("host-b.example.org", 7).unwrap();
        assert!(ctx_a.to_local(virt_b, vid.digits()).is_err());
    }

    #[test]
    fn rejects_non_positive_virtual_id() {
        let vid = manager_with(&["host-a.example.org"]);
        assert!(vid.to_local(0).is_err());
        assert!(vid.to_local(-5).is_err());
    }

    #[test]
    fn rejects_leading_digit_other_than_one() {
        let vid = manager_with(&["host-a.example.org"]);
        assert!(vid.to_local(21000).is_err());
    }

    #[test]
    fn rejects_out_of_range_context_index() {
        let vid = manager_with(&["host-a.example.org"]);
        // Context index 2 does not exist — only context 1 is registered.
        assert!(vid.to_local(12000).is_err());
    }

    #[test]
    fn duplicate_context_registration_fails() {
        let mut vid = VidManager::new();
        vid.add_context("host-a.example.org").unwrap();
        assert!(vid.add_context("host-a.example.org").is_err());
    }

    #[test]
    fn list_contexts_preserves_registration_order() {
        let vid = manager_with(&["z.example.org", "a.example.org", "m.example.org"]);
        assert_eq!(
            vid.list_contexts(),
            vec!["z.example.org", "a.example.org", "m.example.org"]
        );
    }
}
