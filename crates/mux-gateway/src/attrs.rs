//! Remote-attribute collaborator interface
//!
//! The attribute protocol (session handling, namespaces, wire encoding) is
//! an external capability; the gateway only needs the small surface below:
//! a hierarchical namespace of objects, typed read-only/writable variables,
//! and notifications for writes to watched nodes.

use async_trait::async_trait;

use crate::error::AttrError;

/// Opaque handle for a node in the remote attribute namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrId(pub u64);

/// Value carried by a remote attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Unsigned byte (channel numbers, set-channel trigger)
    Byte(u8),
    /// Unsigned 32-bit (board count)
    UInt(u32),
    /// Boolean (reset trigger)
    Bool(bool),
    /// Text (status labels)
    Text(String),
}

impl AttrValue {
    /// Interpret the value as a channel byte, if it fits
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            AttrValue::Byte(b) => Some(*b),
            AttrValue::UInt(n) => u8::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Interpret the value as a trigger: any non-zero/non-false is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Bool(b) => *b,
            AttrValue::Byte(b) => *b != 0,
            AttrValue::UInt(n) => *n != 0,
            AttrValue::Text(t) => !t.is_empty(),
        }
    }
}

/// Capability surface of the remote attribute server
///
/// Implementations wrap whatever session/namespace machinery the concrete
/// protocol brings; the reconciler never sees past this trait. The server
/// must support adding child objects at runtime; it need not support
/// removing objects with live subscriptions, and the gateway never asks it
/// to.
#[async_trait]
pub trait AttributeServer: Send + Sync {
    /// Add an object node under `parent` (or under the namespace root)
    async fn add_object(&self, parent: Option<AttrId>, name: &str) -> Result<AttrId, AttrError>;

    /// Add a variable node with an initial value
    ///
    /// `writable` controls whether remote clients may write it; read-only
    /// mirrors are written exclusively by the gateway through
    /// [`Self::write_value`].
    async fn add_variable(
        &self,
        parent: AttrId,
        name: &str,
        initial: AttrValue,
        writable: bool,
    ) -> Result<AttrId, AttrError>;

    /// Overwrite a node's value (gateway-side write, bypasses `writable`)
    async fn write_value(&self, node: AttrId, value: AttrValue) -> Result<(), AttrError>;

    /// Subscribe the gateway to remote writes of a node
    ///
    /// Accepted writes to watched nodes are delivered as
    /// [`RemoteEvent::AttributeWritten`].
    async fn watch(&self, node: AttrId) -> Result<(), AttrError>;
}

/// Remote activity delivered to the reconciler
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    /// A watched attribute was written by a remote client
    ///
    /// The gateway's own trigger-reset writes echo back through here as
    /// well; sentinel values filter them out.
    AttributeWritten {
        /// The written node
        node: AttrId,
        /// The accepted value
        value: AttrValue,
    },

    /// A remote client invoked the parameterless rescan procedure
    RescanRequested,

    /// Stop accepting events and shut the gateway down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_coercion() {
        assert_eq!(AttrValue::Byte(5).as_byte(), Some(5));
        assert_eq!(AttrValue::UInt(5).as_byte(), Some(5));
        assert_eq!(AttrValue::UInt(300).as_byte(), None);
        assert_eq!(AttrValue::Bool(true).as_byte(), None);
    }

    #[test]
    fn truthiness() {
        assert!(AttrValue::Bool(true).is_truthy());
        assert!(AttrValue::Byte(1).is_truthy());
        assert!(!AttrValue::Byte(0).is_truthy());
        assert!(!AttrValue::Bool(false).is_truthy());
    }
}
